//! Frame-based sprite animation: clip definitions, clip file loading, and
//! deterministic frame advancement.
//!
//! Timing is integer microseconds so a run of fixed steps lands on the same
//! frame on every platform. Clip files describe timing as a frame rate, the
//! way sprite sheets are usually authored, with an optional per-frame
//! `duration_ms` override.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const ANIMATION_FILE_VERSION: &str = "1.0";
const MICROS_PER_SECOND: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFrame {
    pub sprite_id: String,
    pub duration_us: u64,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub frames: Vec<AnimationFrame>,
    /// Default loop mode when the clip is started without an explicit one.
    pub looping: bool,
}

impl AnimationClip {
    pub fn total_duration_us(&self) -> u64 {
        self.frames.iter().map(|f| f.duration_us).sum()
    }
}

#[derive(Debug, Clone)]
pub struct AnimationFile {
    pub version: String,
    pub animation_id: String,
    pub animations: HashMap<String, AnimationClip>,
}

/// Playback cursor for one running clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationState {
    pub source_id: String,
    pub clip_name: String,
    pub looping: bool,
    pub frame_index: usize,
    pub elapsed_us: u64,
    pub finished: bool,
}

impl AnimationState {
    pub fn new(source_id: &str, clip_name: &str, looping: bool) -> Self {
        Self {
            source_id: source_id.to_string(),
            clip_name: clip_name.to_string(),
            looping,
            frame_index: 0,
            elapsed_us: 0,
            finished: false,
        }
    }

    /// Advance by `dt_us` and return the sprite id now showing.
    pub fn tick<'a>(&mut self, dt_us: u64, clip: &'a AnimationClip) -> &'a str {
        if clip.frames.is_empty() {
            return "";
        }
        if self.frame_index >= clip.frames.len() {
            // Clip was swapped for a shorter one under a live cursor.
            self.frame_index = clip.frames.len() - 1;
        }
        if self.finished {
            return &clip.frames[self.frame_index].sprite_id;
        }

        self.elapsed_us += dt_us;
        loop {
            let duration = clip.frames[self.frame_index].duration_us;
            if duration == 0 || self.elapsed_us < duration {
                break;
            }
            self.elapsed_us -= duration;
            self.frame_index += 1;

            if self.frame_index >= clip.frames.len() {
                if self.looping {
                    self.frame_index = 0;
                } else {
                    self.frame_index = clip.frames.len() - 1;
                    self.elapsed_us = 0;
                    self.finished = true;
                    break;
                }
            }
        }

        &clip.frames[self.frame_index].sprite_id
    }

    pub fn current_sprite<'a>(&self, clip: &'a AnimationClip) -> Option<&'a str> {
        clip.frames
            .get(self.frame_index)
            .map(|frame| frame.sprite_id.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct AnimationFileJson {
    version: String,
    animation_id: String,
    animations: HashMap<String, AnimationClipJson>,
}

#[derive(Debug, Deserialize)]
struct AnimationClipJson {
    #[serde(default)]
    frames: Option<Vec<AnimationFrameJson>>,
    #[serde(default)]
    prefix: Option<String>,
    /// First index of a generated range; 0 when omitted.
    #[serde(default)]
    start: Option<u32>,
    #[serde(default)]
    end: Option<u32>,
    #[serde(default = "default_frame_rate")]
    frame_rate: u32,
    #[serde(default)]
    looping: bool,
}

#[derive(Debug, Deserialize)]
struct AnimationFrameJson {
    sprite_id: String,
    #[serde(default)]
    duration_ms: Option<u64>,
}

pub fn load_animation_file(path: &Path) -> Result<AnimationFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read animation file {}: {e}", path.display()))?;
    parse_animation_file(&raw)
        .map_err(|e| format!("Invalid animation file {}: {e}", path.display()))
}

pub fn parse_animation_file(raw: &str) -> Result<AnimationFile, String> {
    let json: AnimationFileJson =
        serde_json::from_str(raw).map_err(|e| format!("JSON parse error: {e}"))?;
    if json.version != ANIMATION_FILE_VERSION {
        return Err(format!(
            "Animation validation failed: unsupported version '{}'",
            json.version
        ));
    }
    if json.animation_id.is_empty() {
        return Err("Animation validation failed: animation_id is empty".to_string());
    }

    let mut animations = HashMap::new();
    for (name, clip_json) in json.animations {
        let clip = build_clip(&name, clip_json)?;
        animations.insert(name, clip);
    }

    Ok(AnimationFile {
        version: json.version,
        animation_id: json.animation_id,
        animations,
    })
}

fn build_clip(name: &str, clip: AnimationClipJson) -> Result<AnimationClip, String> {
    if clip.frame_rate == 0 {
        return Err(format!(
            "Animation validation failed: clip '{name}' has zero frame_rate"
        ));
    }
    if u64::from(clip.frame_rate) > MICROS_PER_SECOND {
        return Err(format!(
            "Animation validation failed: clip '{name}' frame_rate {} exceeds {MICROS_PER_SECOND}",
            clip.frame_rate
        ));
    }
    let rate_duration_us = MICROS_PER_SECOND / u64::from(clip.frame_rate);

    let frames = match (clip.frames, clip.prefix) {
        (Some(_), Some(_)) => {
            return Err(format!(
                "Animation validation failed: clip '{name}' mixes 'frames' and 'prefix'"
            ));
        }
        (None, None) => {
            return Err(format!(
                "Animation validation failed: clip '{name}' needs 'frames' or 'prefix'"
            ));
        }
        (Some(frames), None) => {
            let mut out = Vec::with_capacity(frames.len());
            for (i, frame) in frames.into_iter().enumerate() {
                if frame.sprite_id.is_empty() {
                    return Err(format!(
                        "Animation validation failed: clip '{name}' frame {i} has empty sprite_id"
                    ));
                }
                let duration_us = match frame.duration_ms {
                    Some(0) => {
                        return Err(format!(
                            "Animation validation failed: clip '{name}' frame {i} has zero duration"
                        ));
                    }
                    Some(ms) => ms.checked_mul(1000).ok_or_else(|| {
                        format!(
                            "Animation validation failed: clip '{name}' frame {i} duration overflows"
                        )
                    })?,
                    None => rate_duration_us,
                };
                out.push(AnimationFrame {
                    sprite_id: frame.sprite_id,
                    duration_us,
                });
            }
            out
        }
        (None, Some(prefix)) => {
            let start = clip.start.unwrap_or(0);
            let end = clip.end.ok_or_else(|| {
                format!("Animation validation failed: clip '{name}' has 'prefix' but no 'end'")
            })?;
            if start > end {
                return Err(format!(
                    "Animation validation failed: clip '{name}' range {start}..={end} is empty"
                ));
            }
            (start..=end)
                .map(|n| AnimationFrame {
                    sprite_id: format!("{prefix}{n}"),
                    duration_us: rate_duration_us,
                })
                .collect()
        }
    };

    if frames.is_empty() {
        return Err(format!(
            "Animation validation failed: clip '{name}' has no frames"
        ));
    }

    Ok(AnimationClip {
        frames,
        looping: clip.looping,
    })
}

const fn default_frame_rate() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "ghz_anim_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn make_clip(durations_ms: &[u64], looping: bool) -> AnimationClip {
        AnimationClip {
            frames: durations_ms
                .iter()
                .enumerate()
                .map(|(i, &d)| AnimationFrame {
                    sprite_id: format!("frame_{}", i),
                    duration_us: d * 1000,
                })
                .collect(),
            looping,
        }
    }

    #[test]
    fn tick_advances_through_frames() {
        let clip = make_clip(&[100, 100, 100], true);
        let mut state = AnimationState::new("sonic", "walk", true);

        assert_eq!(state.tick(0, &clip), "frame_0");
        assert_eq!(state.tick(50_000, &clip), "frame_0");
        assert_eq!(state.tick(60_000, &clip), "frame_1");
    }

    #[test]
    fn looping_wraps_around() {
        let clip = make_clip(&[100, 100], true);
        let mut state = AnimationState::new("sonic", "walk", true);

        assert_eq!(state.tick(250_000, &clip), "frame_0");
        assert!(!state.finished);
    }

    #[test]
    fn loop_flag_on_state_overrides_clip_default() {
        let clip = make_clip(&[100, 100], false);
        let mut state = AnimationState::new("sonic", "jump", true);

        state.tick(250_000, &clip);
        assert!(!state.finished);
        assert_eq!(state.frame_index, 0);
    }

    #[test]
    fn one_shot_holds_last_frame() {
        let clip = make_clip(&[100, 100], false);
        let mut state = AnimationState::new("water", "wgo", false);

        assert_eq!(state.tick(300_000, &clip), "frame_1");
        assert!(state.finished);
        assert_eq!(state.tick(100_000, &clip), "frame_1");
    }

    #[test]
    fn identical_runs_stay_in_lockstep() {
        let clip = make_clip(&[100, 150, 80], true);
        let mut a = AnimationState::new("sonic", "walk", true);
        let mut b = AnimationState::new("sonic", "walk", true);
        for _ in 0..120 {
            assert_eq!(a.tick(16_667, &clip), b.tick(16_667, &clip));
        }
        assert_eq!(a, b);
    }

    #[test]
    fn parses_generated_and_explicit_frames() {
        let json = r#"
        {
          "version": "1.0",
          "animation_id": "sonic",
          "animations": {
            "walk": { "prefix": "SWalk_", "start": 1, "end": 6, "frame_rate": 10, "looping": true },
            "idle": { "frames": [{ "sprite_id": "SNeutral" }] },
            "wfgo": { "prefix": "waterfall_", "end": 3, "frame_rate": 16, "looping": true }
          }
        }
        "#;
        let file = parse_animation_file(json).expect("should parse");
        assert_eq!(file.animation_id, "sonic");

        let walk = &file.animations["walk"];
        assert!(walk.looping);
        assert_eq!(walk.frames.len(), 6);
        assert_eq!(walk.frames[0].sprite_id, "SWalk_1");
        assert_eq!(walk.frames[5].sprite_id, "SWalk_6");
        assert_eq!(walk.frames[0].duration_us, 100_000);

        let idle = &file.animations["idle"];
        assert!(!idle.looping);
        assert_eq!(idle.frames.len(), 1);
        assert_eq!(idle.frames[0].duration_us, 100_000);

        let wfgo = &file.animations["wfgo"];
        assert_eq!(wfgo.frames.len(), 4);
        assert_eq!(wfgo.frames[0].sprite_id, "waterfall_0");
        assert_eq!(wfgo.frames[0].duration_us, 62_500);
    }

    #[test]
    fn rejects_bad_version() {
        let json = r#"{ "version": "0.1", "animation_id": "sonic",
            "animations": { "idle": { "frames": [{ "sprite_id": "a" }] } } }"#;
        let err = parse_animation_file(json).expect_err("bad version should fail");
        assert!(err.contains("unsupported version"));
    }

    #[test]
    fn rejects_mixed_frame_forms() {
        let json = r#"{ "version": "1.0", "animation_id": "sonic",
            "animations": { "walk": { "frames": [{ "sprite_id": "a" }], "prefix": "SWalk_", "end": 2 } } }"#;
        let err = parse_animation_file(json).expect_err("mixed forms should fail");
        assert!(err.contains("mixes"));
    }

    #[test]
    fn rejects_empty_range_and_zero_rate() {
        let json = r#"{ "version": "1.0", "animation_id": "sonic",
            "animations": { "walk": { "prefix": "SWalk_", "start": 6, "end": 1 } } }"#;
        let err = parse_animation_file(json).expect_err("reversed range should fail");
        assert!(err.contains("is empty"));

        let json = r#"{ "version": "1.0", "animation_id": "sonic",
            "animations": { "walk": { "prefix": "SWalk_", "end": 1, "frame_rate": 0 } } }"#;
        let err = parse_animation_file(json).expect_err("zero rate should fail");
        assert!(err.contains("zero frame_rate"));
    }

    #[test]
    fn rejects_zero_duration_override() {
        let json = r#"{ "version": "1.0", "animation_id": "sonic",
            "animations": { "idle": { "frames": [{ "sprite_id": "a", "duration_ms": 0 }] } } }"#;
        let err = parse_animation_file(json).expect_err("zero duration should fail");
        assert!(err.contains("zero duration"));
    }

    #[test]
    fn rejects_overflowing_duration() {
        let json = r#"{ "version": "1.0", "animation_id": "sonic",
            "animations": { "idle": { "frames": [
                { "sprite_id": "a", "duration_ms": 18446744073709552 }] } } }"#;
        let err = parse_animation_file(json).expect_err("overflowing duration should fail");
        assert!(err.contains("frame 0 duration overflows"));
    }

    #[test]
    fn rejects_frame_rate_with_sub_microsecond_frames() {
        let json = r#"{ "version": "1.0", "animation_id": "sonic",
            "animations": { "walk": { "prefix": "SWalk_", "end": 1, "frame_rate": 2000000 } } }"#;
        let err = parse_animation_file(json).expect_err("frame rate too high should fail");
        assert!(err.contains("frame_rate 2000000 exceeds"));

        let json = r#"{ "version": "1.0", "animation_id": "sonic",
            "animations": { "walk": { "prefix": "SWalk_", "end": 1, "frame_rate": 1000000 } } }"#;
        let file = parse_animation_file(json).expect("one microsecond frames are allowed");
        assert_eq!(file.animations["walk"].frames[0].duration_us, 1);
    }

    #[test]
    fn load_reports_path_on_failure() {
        let path = temp_file_path("broken");
        fs::write(&path, "{ not json").expect("write temp file");
        let err = load_animation_file(&path).expect_err("broken json should fail");
        assert!(err.contains(&path.display().to_string()));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn total_duration_us() {
        let clip = make_clip(&[100, 200, 300], true);
        assert_eq!(clip.total_duration_us(), 600_000);
    }
}
