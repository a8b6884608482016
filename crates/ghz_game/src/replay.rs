use crate::controller::ControllerInput;
use crate::engine::SceneHost;
use crate::scene::Scene;
use ghz_core::input::{InputState, Key};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub jump: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<ControllerInput> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(ControllerInput {
                    left: frame.left,
                    right: frame.right,
                    up: frame.up,
                    down: frame.down,
                    jump: frame.jump,
                });
            }
        }
        out
    }

    pub fn step(&self) -> Duration {
        Duration::from_secs_f32(self.fixed_dt)
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

/// Feed each input through the key state the way the main loop does:
/// press and release edges, one scene tick, one host advance, end of frame.
pub fn run_replay<S: Scene>(
    replay: &ReplaySequence,
    scene: &mut S,
    host: &mut dyn SceneHost,
    mut after_step: impl FnMut(&S, &dyn SceneHost),
) {
    let dt = replay.step();
    let mut keys = InputState::new();
    for input in replay.expanded_inputs() {
        apply_input(&mut keys, input);
        scene.on_tick(dt, &keys, host);
        host.advance(dt);
        after_step(scene, host);
        keys.end_frame();
    }
}

fn apply_input(keys: &mut InputState, input: ControllerInput) {
    for (key, held) in [
        (Key::Left, input.left),
        (Key::Right, input.right),
        (Key::Up, input.up),
        (Key::Down, input.down),
        (Key::Space, input.jump),
    ] {
        if held {
            keys.key_down(key);
        } else {
            keys.key_up(key);
        }
    }
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PlayerClip;
    use crate::engine::EngineHost;
    use crate::host::HeadlessHost;
    use crate::scene::test_support::{temp_dir, write_level};
    use crate::scene::GreenHillScene;
    use glam::Vec2;

    const WALK_JUMP_BACK: &str = r#"{
      "fixed_dt": 0.016666667,
      "frames": [
        { "repeat": 60 },
        { "right": true, "repeat": 60 },
        { "right": true, "jump": true },
        { "right": true, "repeat": 120 },
        { "left": true, "repeat": 45 },
        { "up": true, "repeat": 10 }
      ]
    }"#;

    fn fresh_scene(hint: &str) -> (GreenHillScene, HeadlessHost, std::path::PathBuf) {
        let dir = temp_dir(hint);
        let mut scene = GreenHillScene::new(write_level(&dir, false));
        let mut host = HeadlessHost::new(1280, 720);
        scene.on_load().expect("level loads");
        scene.on_init(&mut host).expect("scene initializes");
        (scene, host, dir)
    }

    fn player_position(scene: &GreenHillScene, host: &HeadlessHost) -> Vec2 {
        let player = scene.state().expect("scene ready").player;
        host.sprite(player).expect("player exists").position
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let dir = temp_dir("replay_parse");
        let path = dir.join("replay.json");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "right": true, "repeat": 3 },
                { "jump": true, "up": true }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 4);
        assert!(expanded[0].right && !expanded[0].jump);
        assert!(expanded[3].jump && expanded[3].up);
        assert!((replay.fixed_dt - 1.0 / 60.0).abs() < 1e-6);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn replay_rejects_empty_frames() {
        let dir = temp_dir("replay_empty");
        let path = dir.join("replay.json");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");

        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let replay: ReplaySequence =
            serde_json::from_str(WALK_JUMP_BACK).expect("replay parses");

        let run = |hint: &str| {
            let (mut scene, mut host, dir) = fresh_scene(hint);
            let mut trace = Vec::new();
            run_replay(&replay, &mut scene, &mut host, |scene, _| {
                trace.push(scene.last_outcome().copied());
            });
            let end = player_position(&scene, &host);
            let facing = host
                .sprite(scene.state().expect("scene ready").player)
                .expect("player exists")
                .facing;
            let _ = fs::remove_dir_all(dir);
            (trace, end, facing)
        };

        let (trace_a, end_a, facing_a) = run("det_a");
        let (trace_b, end_b, facing_b) = run("det_b");
        assert_eq!(trace_a, trace_b);
        assert!((end_a - end_b).length() < 0.0001);
        assert_eq!(facing_a, facing_b);
        assert!(facing_a.is_flipped(), "last horizontal input was left");
        assert_eq!(
            trace_a.last().copied().flatten().and_then(|o| o.clip),
            Some(PlayerClip::Look)
        );
    }

    #[test]
    fn airborne_player_keeps_jump_clip_while_steering() {
        let replay: ReplaySequence = serde_json::from_str(
            r#"{ "frames": [
                { "repeat": 90 },
                { "jump": true },
                { "left": true, "repeat": 20 },
                { "right": true, "up": true, "repeat": 20 }
            ] }"#,
        )
        .expect("replay parses");

        let (mut scene, mut host, dir) = fresh_scene("airborne");
        let mut clips_after_jump = Vec::new();
        let mut steps = 0;
        run_replay(&replay, &mut scene, &mut host, |scene, host| {
            steps += 1;
            if steps > 90 {
                let player = scene.state().expect("scene ready").player;
                assert!(!host.physical_state(player).grounded);
                clips_after_jump.push(scene.last_outcome().copied().and_then(|o| o.clip));
            }
        });

        assert_eq!(clips_after_jump.len(), 41);
        assert_eq!(clips_after_jump[0], Some(PlayerClip::Jump));
        assert!(clips_after_jump[1..].iter().all(Option::is_none));
        let player = scene.state().expect("scene ready").player;
        assert_eq!(
            host.sprite(player).and_then(|s| s.clip.current_clip()),
            Some("jump")
        );

        let _ = fs::remove_dir_all(dir);
    }
}
