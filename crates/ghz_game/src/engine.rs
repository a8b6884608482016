//! Capabilities the level asks of the engine.
//!
//! `EngineHost` is the per-tick surface the player controller drives.
//! `SceneHost` adds the one-shot setup calls a scene makes while it
//! initializes and the per-frame `advance` the main loop runs after it.
//! Every call succeeds; a host that cannot honor one logs and carries on.

use std::time::Duration;

use ghz_core::animation::AnimationFile;
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the physics side reports about a body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalState {
    pub velocity_x: f32,
    pub grounded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    /// Sprites are authored facing right, so left means mirrored.
    pub fn is_flipped(self) -> bool {
        matches!(self, Self::Left)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    #[default]
    Gameplay,
    FreeCam,
}

impl CameraMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Gameplay => Self::FreeCam,
            Self::FreeCam => Self::Gameplay,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gameplay => "gameplay",
            Self::FreeCam => "free camera",
        }
    }
}

impl std::fmt::Display for CameraMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub trait EngineHost {
    fn physical_state(&self, entity: EntityId) -> PhysicalState;

    fn set_velocity_x(&mut self, entity: EntityId, vx: f32);

    fn set_velocity_y(&mut self, entity: EntityId, vy: f32);

    fn set_facing(&mut self, entity: EntityId, facing: Facing);

    /// Start `clip` on `entity`. Asking for the clip that is already playing
    /// keeps its current frame. Returns true when playback (re)started.
    fn play_clip(&mut self, entity: EntityId, clip: &str, looping: bool) -> bool;

    fn pan_camera(&mut self, dx: f32, dy: f32);

    fn move_entity(&mut self, entity: EntityId, dx: f32, dy: f32);
}

/// Backdrop image placement, as authored in the level file.
#[derive(Debug, Clone, PartialEq)]
pub struct BackdropSpec {
    pub name: String,
    pub position: Vec2,
    pub origin: Vec2,
    pub scroll_factor: f32,
    pub scale: f32,
    pub animation_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    pub name: String,
    pub position: Vec2,
    pub scale: f32,
    pub animation_source: Option<String>,
}

pub trait SceneHost: EngineHost {
    /// Drop every entity and registered clip, ready for a fresh `on_init`.
    fn reset(&mut self);

    /// Downward gravity and the floor line bodies come to rest on.
    fn configure_world(&mut self, gravity_y: f32, floor_y: f32);

    fn register_animations(&mut self, file: AnimationFile);

    fn spawn_backdrop(&mut self, spec: BackdropSpec) -> EntityId;

    fn spawn_body(&mut self, spec: BodySpec) -> EntityId;

    fn set_camera_bounds(&mut self, bounds: Rect);

    /// `None` detaches the camera so only pans move it.
    fn set_camera_follow(&mut self, target: Option<EntityId>);

    /// Step physics, camera, and every running clip by `dt`.
    fn advance(&mut self, dt: Duration);
}
