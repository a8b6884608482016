//! Green Hill -- main loop and application entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. The window is the
//! keyboard source; the level itself runs against `HeadlessHost`. All
//! simulation happens inside `RedrawRequested` on a fixed timestep (see
//! `FixedClock`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. reload the level at the frame boundary if the file changed
//!   3. `while should_step()` -- R reload, scene tick, host advance, then
//!      clear input edges, per fixed slice
//!
//! Usage: `ghz_game [LEVEL_JSON]` (defaults to `assets/levels/green_hill.json`).

mod animation;
mod controller;
mod engine;
mod host;
mod level;
#[cfg(test)]
mod replay;
mod scene;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use engine::{EngineHost, SceneHost};
use ghz_core::input::{InputState, Key};
use ghz_core::time::{FixedClock, FIXED_DT_US};
use ghz_platform::window::PlatformConfig;
use host::HeadlessHost;
use scene::{GreenHillScene, Scene};

const DEFAULT_LEVEL_PATH: &str = "assets/levels/green_hill.json";

/// How often (in fixed steps) the player's whereabouts are logged at debug level.
const STATUS_LOG_INTERVAL: u64 = 120;

enum FrameExit {
    Continue,
    Quit,
}

/// Everything the fixed-step loop touches, kept apart from the window so a
/// frame can be driven without one.
struct Simulation {
    clock: FixedClock,
    input: InputState,
    scene: GreenHillScene,
    host: HeadlessHost,
}

impl Simulation {
    fn new(level_path: PathBuf, viewport_width: u32, viewport_height: u32) -> Result<Self, String> {
        let mut host = HeadlessHost::new(viewport_width, viewport_height);
        let mut scene = GreenHillScene::new(level_path);
        scene.on_load()?;
        scene.on_init(&mut host)?;
        // Swallow the mtime seen at startup so the first frame does not reload.
        scene.level_changed();
        log::info!(
            "Watching {} ({} entities)",
            scene.level_path().display(),
            host.entity_count()
        );

        Ok(Self {
            clock: FixedClock::new(),
            input: InputState::new(),
            scene,
            host,
        })
    }

    /// Drain the clock's accumulator in fixed steps. Edge-triggered input is
    /// cleared after every step, so a press is acted on by exactly one step.
    /// A frame that runs no step leaves the edges for the next frame.
    fn run_steps(&mut self) -> FrameExit {
        if self.scene.level_changed() {
            self.scene.reload(&mut self.host, "file watcher");
        }

        let step = Duration::from_micros(FIXED_DT_US);
        while self.clock.should_step() {
            if self.input.is_just_pressed(Key::Escape) {
                return FrameExit::Quit;
            }
            if self.input.is_just_pressed(Key::R) {
                self.scene.reload(&mut self.host, "manual trigger (R)");
            }
            self.scene.on_tick(step, &self.input, &mut self.host);
            self.host.advance(step);
            self.input.end_frame();

            if self.clock.fixed_step_count % STATUS_LOG_INTERVAL == 0 {
                self.log_status();
            }
        }
        FrameExit::Continue
    }

    fn log_status(&self) {
        let Some(state) = self.scene.state() else {
            return;
        };
        let body = self.host.physical_state(state.player);
        let Some(player) = self.host.sprite(state.player) else {
            return;
        };
        log::debug!(
            "step {}: player at ({:.1}, {:.1}) screen {:?} vx={:.1} grounded={} clip={:?}/{:?} flipped={} camera={:?} [{}]",
            self.clock.fixed_step_count,
            player.position.x,
            player.position.y,
            self.host.screen_position(state.player),
            body.velocity_x,
            body.grounded,
            player.clip.current_clip(),
            player.clip.current_sprite(),
            player.facing.is_flipped(),
            self.host.camera().scroll,
            state.camera_mode
        );
    }
}

struct EngineState {
    window: Arc<Window>,
    sim: Simulation,
}

impl EngineState {
    fn new(window: Arc<Window>, level_path: PathBuf) -> Result<Self, String> {
        let size = window.inner_size();
        let sim = Simulation::new(level_path, size.width, size.height)?;
        Ok(Self { window, sim })
    }
}

struct App {
    config: PlatformConfig,
    level_path: PathBuf,
    state: Option<EngineState>,
}

impl App {
    fn new(level_path: PathBuf) -> Self {
        Self {
            config: PlatformConfig::default(),
            level_path,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = match ghz_platform::window::create_window(event_loop, &self.config) {
            Ok(window) => window,
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        match EngineState::new(window, self.level_path.clone()) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!(
                    "Failed to start level {}: {err}",
                    self.level_path.display()
                );
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.sim.host.set_viewport(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                // Key-up events are not delivered while unfocused.
                state.sim.input.release_all();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.sim.input.key_down(engine_key),
                            ElementState::Released => state.sim.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                state.sim.clock.begin_frame();
                if let FrameExit::Quit = state.sim.run_steps() {
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::F2 => Some(Key::F2),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let level_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LEVEL_PATH));
    log::info!("Green Hill starting with level {}", level_path.display());

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(level_path);
    event_loop.run_app(&mut app).expect("Event loop error");
}
