//! Scene lifecycle and the Green Hill level.
//!
//! A scene is driven in three phases:
//!
//!   1. `on_load()` reads and validates every file the level needs. A load
//!      that fails leaves the previously loaded content in place.
//!   2. `on_init(host)` tells the engine about the level: backdrop, player,
//!      clips, camera.
//!   3. `on_tick(dt, input, host)` runs once per fixed step, before the host
//!      advances its own simulation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ghz_core::animation::{load_animation_file, AnimationFile};
use ghz_core::input::{InputState, Key};
use glam::Vec2;

use crate::animation::AnimationRegistry;
use crate::controller::{ControllerInput, PlayerController, TickOutcome};
use crate::engine::{BackdropSpec, BodySpec, CameraMode, EntityId, Rect, SceneHost};
use crate::level::{load_level_from_path, LevelFile, LevelWatcher};

/// Handles the controller needs, gathered in one place instead of living
/// as loose fields on the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    pub player: EntityId,
    /// Parallax elements dragged along by vertical free-camera pans.
    pub camera_locked: Vec<EntityId>,
    pub camera_mode: CameraMode,
}

pub trait Scene {
    fn on_load(&mut self) -> Result<(), String>;

    fn on_init(&mut self, host: &mut dyn SceneHost) -> Result<(), String>;

    fn on_tick(&mut self, dt: Duration, input: &InputState, host: &mut dyn SceneHost);
}

struct LoadedLevel {
    level: LevelFile,
    animations: Vec<AnimationFile>,
}

pub struct GreenHillScene {
    level_path: PathBuf,
    watcher: LevelWatcher,
    loaded: Option<LoadedLevel>,
    state: Option<SceneState>,
    controller: PlayerController,
    follow_player: bool,
    last_outcome: Option<TickOutcome>,
}

impl GreenHillScene {
    pub fn new(level_path: PathBuf) -> Self {
        Self {
            watcher: LevelWatcher::new(level_path.clone()),
            level_path,
            loaded: None,
            state: None,
            controller: PlayerController::default(),
            follow_player: true,
            last_outcome: None,
        }
    }

    pub fn level_path(&self) -> &Path {
        &self.level_path
    }

    pub fn state(&self) -> Option<&SceneState> {
        self.state.as_ref()
    }

    #[allow(dead_code)]
    pub fn last_outcome(&self) -> Option<&TickOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn level_id(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.level.level_id.as_str())
    }

    /// True once the level file changed on disk since the last check.
    pub fn level_changed(&mut self) -> bool {
        self.watcher.should_reload()
    }

    /// Switch camera mode from outside the controller.
    pub fn set_camera_mode(&mut self, mode: CameraMode, host: &mut dyn SceneHost) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.camera_mode == mode {
            return;
        }
        state.camera_mode = mode;
        let follow = (mode == CameraMode::Gameplay && self.follow_player).then_some(state.player);
        host.set_camera_follow(follow);
        log::info!("Camera mode: {mode}");
    }

    /// Load and re-initialize. A level that fails to load keeps the old one
    /// running.
    pub fn reload(&mut self, host: &mut dyn SceneHost, reason: &str) {
        if let Err(err) = self.on_load() {
            log::error!("Level reload failed ({reason}): {err}");
            return;
        }
        match self.on_init(host) {
            Ok(()) => log::info!(
                "Level reloaded ({reason}): {}",
                self.level_id().unwrap_or("<unknown>")
            ),
            Err(err) => log::error!("Level re-init failed ({reason}): {err}"),
        }
    }
}

impl Scene for GreenHillScene {
    fn on_load(&mut self) -> Result<(), String> {
        let level = load_level_from_path(&self.level_path)?;

        let mut animations = Vec::with_capacity(level.animations.len());
        let mut registry = AnimationRegistry::new();
        for path in &level.animations {
            let file = load_animation_file(Path::new(path))?;
            registry.insert_file(file.clone());
            animations.push(file);
        }
        registry.validate_player_clips(level.player.animation_source.as_deref())?;
        for layer in &level.layers {
            if let Some(animation) = &layer.animation {
                if registry
                    .resolve_clip(animation.source.as_deref(), &animation.clip)
                    .is_none()
                {
                    return Err(format!(
                        "Layer '{}' references missing clip '{}'",
                        layer.id, animation.clip
                    ));
                }
            }
        }

        for asset in level.asset_paths() {
            if !Path::new(asset).exists() {
                log::warn!("Level asset '{}' was not found", asset);
            }
        }

        log::info!(
            "Loaded level '{}' ({} layers, {} clips)",
            level.level_id,
            level.layers.len(),
            registry.clip_count()
        );
        self.loaded = Some(LoadedLevel { level, animations });
        Ok(())
    }

    fn on_init(&mut self, host: &mut dyn SceneHost) -> Result<(), String> {
        let Some(loaded) = &self.loaded else {
            return Err("Scene init before a level was loaded".to_string());
        };
        let level = &loaded.level;

        host.reset();
        host.configure_world(level.world.gravity_y, level.world.floor_y);
        for file in &loaded.animations {
            host.register_animations(file.clone());
        }

        if let Some(tilemap) = &level.tilemap {
            let colliding: Vec<&str> = tilemap
                .layers
                .iter()
                .filter(|l| l.collides)
                .map(|l| l.name.as_str())
                .collect();
            log::info!(
                "Tilemap '{}' with tileset '{}': {} layers, colliding {:?}",
                tilemap.key,
                tilemap.tileset,
                tilemap.layers.len(),
                colliding
            );
            for layer in &tilemap.layers {
                log::debug!(
                    "Tile layer '{}' at ({}, {}) scale {}",
                    layer.name,
                    layer.offset_x,
                    layer.offset_y,
                    layer.scale
                );
            }
        }

        let mut camera_locked = Vec::new();
        for layer in &level.layers {
            let id = host.spawn_backdrop(BackdropSpec {
                name: layer.id.clone(),
                position: Vec2::new(layer.x, layer.y),
                origin: Vec2::new(layer.origin_x, layer.origin_y),
                scroll_factor: layer.scroll_factor,
                scale: layer.scale,
                animation_source: layer.animation.as_ref().and_then(|a| a.source.clone()),
            });
            if let Some(animation) = &layer.animation {
                host.play_clip(id, &animation.clip, animation.looping);
            }
            if layer.camera_locked {
                camera_locked.push(id);
            }
        }

        let player_config = &level.player;
        let player = host.spawn_body(BodySpec {
            name: "player".to_string(),
            position: Vec2::new(player_config.spawn_x, player_config.spawn_y),
            scale: player_config.scale,
            animation_source: player_config.animation_source.clone(),
        });

        let bounds = level.camera.bounds;
        host.set_camera_bounds(Rect {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
        });

        let camera_mode = if level.camera.free_cam {
            CameraMode::FreeCam
        } else {
            CameraMode::Gameplay
        };
        self.follow_player = level.camera.follow;
        let follow =
            (camera_mode == CameraMode::Gameplay && self.follow_player).then_some(player);
        host.set_camera_follow(follow);

        self.controller = PlayerController::new(player_config.controller);
        self.last_outcome = None;
        self.state = Some(SceneState {
            player,
            camera_locked,
            camera_mode,
        });

        log::info!(
            "Scene '{}' ready: player {} at ({}, {}), background {}, camera {}",
            level.level_id,
            player,
            player_config.spawn_x,
            player_config.spawn_y,
            level.world.background_color,
            camera_mode
        );
        Ok(())
    }

    fn on_tick(&mut self, _dt: Duration, input: &InputState, host: &mut dyn SceneHost) {
        if input.is_just_pressed(Key::F2) {
            if let Some(mode) = self.state.as_ref().map(|s| s.camera_mode.toggled()) {
                self.set_camera_mode(mode, host);
            }
        }
        let Some(state) = self.state.as_ref() else {
            return;
        };

        let outcome = self
            .controller
            .tick(ControllerInput::from_keys(input), state, host);
        if outcome.clip_restarted {
            if let Some(clip) = outcome.clip {
                log::debug!(
                    "Player clip -> {} (vx={:?}, facing {:?}, {})",
                    clip.name(),
                    outcome.velocity_x,
                    outcome.facing,
                    outcome.mode
                );
            }
        }
        if let Some(vy) = outcome.velocity_y {
            log::trace!("Jump impulse vy={vy}");
        }
        if outcome.camera_pan != (0.0, 0.0) {
            log::trace!("Camera pan {:?}", outcome.camera_pan);
        }
        self.last_outcome = Some(outcome);
    }
}
