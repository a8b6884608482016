//! Player controller: one decision per fixed tick.
//!
//! In gameplay mode the tick issues a horizontal velocity, an optional jump
//! impulse, a facing, and at most one clip. The clip comes from `CLIP_RULES`,
//! a priority table where the last matching rule wins. In free-camera mode
//! the player is left alone and the arrows pan the viewport instead.

use ghz_core::input::{InputState, Key};
use serde::Deserialize;

use crate::engine::{CameraMode, EngineHost, Facing, PhysicalState};
use crate::scene::SceneState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump: bool,
}

impl ControllerInput {
    pub fn from_keys(input: &InputState) -> Self {
        Self {
            left: input.is_held(Key::Left),
            right: input.is_held(Key::Right),
            up: input.is_held(Key::Up),
            down: input.is_held(Key::Down),
            jump: input.is_held(Key::Space),
        }
    }

    /// Horizontal intent: -1, 0 or 1. Holding up suppresses walking and
    /// left is checked before right.
    fn walk_direction(&self) -> f32 {
        if self.left && !self.up {
            -1.0
        } else if self.right && !self.up {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    /// Magnitude of the jump; applied upward (negative y).
    #[serde(default = "default_jump_impulse")]
    pub jump_impulse: f32,
    #[serde(default = "default_pan_step")]
    pub pan_step: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            walk_speed: default_walk_speed(),
            jump_impulse: default_jump_impulse(),
            pan_step: default_pan_step(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerClip {
    Idle,
    Walk,
    Jump,
    Look,
}

impl PlayerClip {
    pub const ALL: &'static [PlayerClip] = &[
        PlayerClip::Idle,
        PlayerClip::Walk,
        PlayerClip::Jump,
        PlayerClip::Look,
    ];

    /// Name of the clip in the animation file.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk => "walk",
            Self::Jump => "jump",
            Self::Look => "look",
        }
    }
}

struct ClipRule {
    clip: PlayerClip,
    applies: fn(&ControllerInput, &PhysicalState) -> bool,
}

fn walking(input: &ControllerInput, body: &PhysicalState) -> bool {
    body.grounded && input.walk_direction() != 0.0
}

fn standing(input: &ControllerInput, body: &PhysicalState) -> bool {
    body.grounded && input.walk_direction() == 0.0
}

fn looking_up(input: &ControllerInput, body: &PhysicalState) -> bool {
    body.grounded && input.up
}

fn jumping(input: &ControllerInput, body: &PhysicalState) -> bool {
    body.grounded && input.jump
}

/// Evaluated top to bottom; the last rule that applies picks the clip.
/// Look overrides Idle/Walk, and Jump overrides Look.
const CLIP_RULES: &[ClipRule] = &[
    ClipRule {
        clip: PlayerClip::Walk,
        applies: walking,
    },
    ClipRule {
        clip: PlayerClip::Idle,
        applies: standing,
    },
    ClipRule {
        clip: PlayerClip::Look,
        applies: looking_up,
    },
    ClipRule {
        clip: PlayerClip::Jump,
        applies: jumping,
    },
];

pub fn select_clip(input: &ControllerInput, body: &PhysicalState) -> Option<PlayerClip> {
    CLIP_RULES
        .iter()
        .filter(|rule| (rule.applies)(input, body))
        .last()
        .map(|rule| rule.clip)
}

/// Everything one tick commanded, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub mode: CameraMode,
    pub velocity_x: Option<f32>,
    pub velocity_y: Option<f32>,
    pub clip: Option<PlayerClip>,
    pub clip_restarted: bool,
    pub facing: Facing,
    pub camera_pan: (f32, f32),
}

#[derive(Debug, Clone)]
pub struct PlayerController {
    pub config: ControllerConfig,
    facing: Facing,
}

impl PlayerController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            facing: Facing::default(),
        }
    }

    #[allow(dead_code)]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn tick<H: EngineHost + ?Sized>(
        &mut self,
        input: ControllerInput,
        scene: &SceneState,
        host: &mut H,
    ) -> TickOutcome {
        match scene.camera_mode {
            CameraMode::FreeCam => self.tick_free_cam(input, scene, host),
            CameraMode::Gameplay => self.tick_gameplay(input, scene, host),
        }
    }

    fn tick_free_cam<H: EngineHost + ?Sized>(
        &mut self,
        input: ControllerInput,
        scene: &SceneState,
        host: &mut H,
    ) -> TickOutcome {
        let step = self.config.pan_step;
        let dx = if input.left {
            -step
        } else if input.right {
            step
        } else {
            0.0
        };
        let dy = if input.up {
            -step
        } else if input.down {
            step
        } else {
            0.0
        };

        if dx != 0.0 || dy != 0.0 {
            host.pan_camera(dx, dy);
        }
        if dy != 0.0 {
            for &element in &scene.camera_locked {
                host.move_entity(element, 0.0, dy);
            }
        }

        TickOutcome {
            mode: CameraMode::FreeCam,
            velocity_x: None,
            velocity_y: None,
            clip: None,
            clip_restarted: false,
            facing: self.facing,
            camera_pan: (dx, dy),
        }
    }

    fn tick_gameplay<H: EngineHost + ?Sized>(
        &mut self,
        input: ControllerInput,
        scene: &SceneState,
        host: &mut H,
    ) -> TickOutcome {
        let player = scene.player;
        let body = host.physical_state(player);

        let velocity_x = input.walk_direction() * self.config.walk_speed;
        host.set_velocity_x(player, velocity_x);

        // Facing follows the body's velocity after the horizontal command and
        // before the jump impulse. Zero keeps the previous facing.
        let moved = host.physical_state(player);
        if moved.velocity_x > 0.0 {
            self.facing = Facing::Right;
            host.set_facing(player, self.facing);
        } else if moved.velocity_x < 0.0 {
            self.facing = Facing::Left;
            host.set_facing(player, self.facing);
        }

        let velocity_y = if input.jump && body.grounded {
            let vy = -self.config.jump_impulse;
            host.set_velocity_y(player, vy);
            Some(vy)
        } else {
            None
        };

        let clip = select_clip(&input, &body);
        let clip_restarted = clip.is_some_and(|clip| host.play_clip(player, clip.name(), true));

        TickOutcome {
            mode: CameraMode::Gameplay,
            velocity_x: Some(velocity_x),
            velocity_y,
            clip,
            clip_restarted,
            facing: self.facing,
            camera_pan: (0.0, 0.0),
        }
    }
}

impl Default for PlayerController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

const fn default_walk_speed() -> f32 {
    200.0
}

const fn default_jump_impulse() -> f32 {
    370.0
}

const fn default_pan_step() -> f32 {
    4.0
}
