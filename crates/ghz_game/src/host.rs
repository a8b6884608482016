//! Headless stand-in for the engine.
//!
//! It keeps just enough world state to drive the level without a renderer:
//! - arcade bodies that fall under gravity and land on a flat floor line;
//! - backdrop elements with a scroll factor;
//! - a camera that follows a target or is panned by hand, always clamped
//!   to its bounds;
//! - one clip player per entity.
//!
//! Tile collision is not modelled; the floor line stands in for it.

use std::collections::BTreeMap;
use std::time::Duration;

use ghz_core::animation::AnimationFile;
use glam::Vec2;

use crate::animation::{AnimationRegistry, ClipPlayer};
use crate::engine::{
    BackdropSpec, BodySpec, EngineHost, EntityId, Facing, PhysicalState, Rect, SceneHost,
};

#[derive(Debug)]
pub struct Sprite {
    pub name: String,
    pub position: Vec2,
    #[allow(dead_code)]
    pub origin: Vec2,
    #[allow(dead_code)]
    pub scale: f32,
    pub scroll_factor: f32,
    pub velocity: Vec2,
    pub grounded: bool,
    pub facing: Facing,
    /// Only bodies take part in the physics step.
    pub is_body: bool,
    pub clip: ClipPlayer,
}

#[derive(Debug, Clone)]
pub struct CameraRig {
    pub scroll: Vec2,
    pub viewport: Vec2,
    pub bounds: Option<Rect>,
    pub follow: Option<EntityId>,
}

impl CameraRig {
    fn new(viewport: Vec2) -> Self {
        Self {
            scroll: Vec2::ZERO,
            viewport,
            bounds: None,
            follow: None,
        }
    }

    fn clamp(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };
        // A viewport wider than the bounds pins scroll to the bounds' edge.
        let max_x = (bounds.x + bounds.width - self.viewport.x).max(bounds.x);
        let max_y = (bounds.y + bounds.height - self.viewport.y).max(bounds.y);
        self.scroll.x = self.scroll.x.clamp(bounds.x, max_x);
        self.scroll.y = self.scroll.y.clamp(bounds.y, max_y);
    }

    fn center_on(&mut self, target: Vec2) {
        self.scroll = target - self.viewport * 0.5;
        self.clamp();
    }
}

pub struct HeadlessHost {
    gravity_y: f32,
    floor_y: f32,
    next_id: u32,
    sprites: BTreeMap<EntityId, Sprite>,
    animations: AnimationRegistry,
    camera: CameraRig,
}

impl HeadlessHost {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            gravity_y: 300.0,
            floor_y: f32::MAX,
            next_id: 1,
            sprites: BTreeMap::new(),
            animations: AnimationRegistry::new(),
            camera: CameraRig::new(Vec2::new(viewport_width as f32, viewport_height as f32)),
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.camera.viewport = Vec2::new(width as f32, height as f32);
        self.camera.clamp();
    }

    pub fn sprite(&self, entity: EntityId) -> Option<&Sprite> {
        self.sprites.get(&entity)
    }

    #[allow(dead_code)]
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.sprites
            .iter()
            .find(|(_, sprite)| sprite.name == name)
            .map(|(&id, _)| id)
    }

    /// Where an entity lands on screen once parallax is applied. A scroll
    /// factor of 0 pins it to the viewport, 1 moves it with the world.
    pub fn screen_position(&self, entity: EntityId) -> Option<Vec2> {
        self.sprites
            .get(&entity)
            .map(|s| s.position - self.camera.scroll * s.scroll_factor)
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    #[allow(dead_code)]
    pub fn animations(&self) -> &AnimationRegistry {
        &self.animations
    }

    pub fn entity_count(&self) -> usize {
        self.sprites.len()
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn sprite_mut(&mut self, entity: EntityId, action: &str) -> Option<&mut Sprite> {
        let sprite = self.sprites.get_mut(&entity);
        if sprite.is_none() {
            log::warn!("{action} ignored: unknown entity {entity}");
        }
        sprite
    }

    fn step_bodies(&mut self, dt: f32) {
        let gravity = self.gravity_y;
        let floor = self.floor_y;
        for sprite in self.sprites.values_mut().filter(|s| s.is_body) {
            sprite.velocity.y += gravity * dt;
            sprite.position += sprite.velocity * dt;
            if sprite.position.y >= floor {
                sprite.position.y = floor;
                if sprite.velocity.y > 0.0 {
                    sprite.velocity.y = 0.0;
                }
                if !sprite.grounded {
                    log::trace!("{} landed at x={:.1}", sprite.name, sprite.position.x);
                }
                sprite.grounded = true;
            } else {
                sprite.grounded = false;
            }
        }
    }
}

impl EngineHost for HeadlessHost {
    fn physical_state(&self, entity: EntityId) -> PhysicalState {
        match self.sprites.get(&entity) {
            Some(sprite) => PhysicalState {
                velocity_x: sprite.velocity.x,
                grounded: sprite.grounded,
            },
            None => {
                log::warn!("physical_state of unknown entity {entity}");
                PhysicalState::default()
            }
        }
    }

    fn set_velocity_x(&mut self, entity: EntityId, vx: f32) {
        if let Some(sprite) = self.sprite_mut(entity, "set_velocity_x") {
            sprite.velocity.x = vx;
        }
    }

    fn set_velocity_y(&mut self, entity: EntityId, vy: f32) {
        if let Some(sprite) = self.sprite_mut(entity, "set_velocity_y") {
            sprite.velocity.y = vy;
        }
    }

    fn set_facing(&mut self, entity: EntityId, facing: Facing) {
        if let Some(sprite) = self.sprite_mut(entity, "set_facing") {
            sprite.facing = facing;
        }
    }

    fn play_clip(&mut self, entity: EntityId, clip: &str, looping: bool) -> bool {
        let Some(sprite) = self.sprites.get_mut(&entity) else {
            log::warn!("play_clip '{clip}' ignored: unknown entity {entity}");
            return false;
        };
        let restarted = sprite.clip.play(clip, looping, &self.animations);
        if restarted {
            log::debug!("{} plays '{}'", sprite.name, clip);
        }
        restarted
    }

    fn pan_camera(&mut self, dx: f32, dy: f32) {
        self.camera.scroll += Vec2::new(dx, dy);
        self.camera.clamp();
    }

    fn move_entity(&mut self, entity: EntityId, dx: f32, dy: f32) {
        if let Some(sprite) = self.sprite_mut(entity, "move_entity") {
            sprite.position += Vec2::new(dx, dy);
        }
    }
}

impl SceneHost for HeadlessHost {
    fn reset(&mut self) {
        self.sprites.clear();
        self.animations.clear();
        self.camera.bounds = None;
        self.camera.follow = None;
        self.camera.scroll = Vec2::ZERO;
    }

    fn configure_world(&mut self, gravity_y: f32, floor_y: f32) {
        self.gravity_y = gravity_y;
        self.floor_y = floor_y;
    }

    fn register_animations(&mut self, file: AnimationFile) {
        self.animations.insert_file(file);
    }

    fn spawn_backdrop(&mut self, spec: BackdropSpec) -> EntityId {
        let id = self.allocate_id();
        self.sprites.insert(
            id,
            Sprite {
                name: spec.name,
                position: spec.position,
                origin: spec.origin,
                scale: spec.scale,
                scroll_factor: spec.scroll_factor,
                velocity: Vec2::ZERO,
                grounded: false,
                facing: Facing::Right,
                is_body: false,
                clip: ClipPlayer::new(spec.animation_source),
            },
        );
        id
    }

    fn spawn_body(&mut self, spec: BodySpec) -> EntityId {
        let id = self.allocate_id();
        self.sprites.insert(
            id,
            Sprite {
                name: spec.name,
                position: spec.position,
                origin: Vec2::splat(0.5),
                scale: spec.scale,
                scroll_factor: 1.0,
                velocity: Vec2::ZERO,
                grounded: false,
                facing: Facing::Right,
                is_body: true,
                clip: ClipPlayer::new(spec.animation_source),
            },
        );
        id
    }

    fn set_camera_bounds(&mut self, bounds: Rect) {
        self.camera.bounds = Some(bounds);
        self.camera.clamp();
    }

    fn set_camera_follow(&mut self, target: Option<EntityId>) {
        self.camera.follow = target;
    }

    fn advance(&mut self, dt: Duration) {
        self.step_bodies(dt.as_secs_f32());

        let dt_us = dt.as_micros() as u64;
        for sprite in self.sprites.values_mut() {
            sprite.clip.tick(dt_us, &self.animations);
        }

        let target = self
            .camera
            .follow
            .and_then(|id| self.sprites.get(&id))
            .map(|sprite| sprite.position);
        match target {
            Some(position) => self.camera.center_on(position),
            None => self.camera.clamp(),
        }
    }
}
