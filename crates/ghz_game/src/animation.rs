//! Clip registry and per-entity clip playback.
//!
//! The registry holds every loaded animation file keyed by `animation_id`.
//! A `ClipPlayer` is the playback slot of one entity: starting the clip that
//! is already running leaves it alone, and starting any other clip rewinds
//! to frame 0.

use std::collections::HashMap;

use ghz_core::animation::{AnimationClip, AnimationFile, AnimationState};

use crate::controller::PlayerClip;

#[derive(Debug, Default)]
pub struct AnimationRegistry {
    /// animation_id -> clip_name -> clip
    clips: HashMap<String, HashMap<String, AnimationClip>>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed file, replacing any earlier file with the same id.
    pub fn insert_file(&mut self, file: AnimationFile) {
        if self.clips.contains_key(&file.animation_id) {
            log::info!("Replacing animation set '{}'", file.animation_id);
        }
        self.clips.insert(file.animation_id, file.animations);
    }

    pub fn clear(&mut self) {
        self.clips.clear();
    }

    pub fn clip_count(&self) -> usize {
        self.clips.values().map(HashMap::len).sum()
    }

    /// With a source, search only that file. Without one, first match wins.
    pub fn resolve_clip(&self, source: Option<&str>, name: &str) -> Option<&AnimationClip> {
        if let Some(source_id) = source {
            return self.clips.get(source_id).and_then(|clips| clips.get(name));
        }
        self.clips.values().find_map(|clips| clips.get(name))
    }

    /// Every clip the player controller can ask for must exist.
    pub fn validate_player_clips(&self, source: Option<&str>) -> Result<(), String> {
        let missing: Vec<&str> = PlayerClip::ALL
            .iter()
            .map(|clip| clip.name())
            .filter(|name| self.resolve_clip(source, name).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "Animation set {:?} is missing player clips: {}",
                source.unwrap_or("<any>"),
                missing.join(", ")
            ))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClipPlayer {
    source_id: Option<String>,
    state: Option<AnimationState>,
    sprite_id: Option<String>,
}

impl ClipPlayer {
    pub fn new(source_id: Option<String>) -> Self {
        Self {
            source_id,
            state: None,
            sprite_id: None,
        }
    }

    /// Returns true when playback (re)started. A clip that is still running
    /// under the same name is left untouched; a finished one-shot restarts.
    pub fn play(&mut self, clip_name: &str, looping: bool, registry: &AnimationRegistry) -> bool {
        if let Some(state) = &self.state {
            if state.clip_name == clip_name && !state.finished {
                return false;
            }
        }
        let Some(clip) = registry.resolve_clip(self.source_id.as_deref(), clip_name) else {
            log::warn!(
                "Clip '{}' not found (source: {:?}); keeping current playback",
                clip_name,
                self.source_id
            );
            return false;
        };

        let source = self.source_id.as_deref().unwrap_or("");
        let state = AnimationState::new(source, clip_name, looping);
        self.sprite_id = state.current_sprite(clip).map(str::to_string);
        self.state = Some(state);
        true
    }

    pub fn tick(&mut self, dt_us: u64, registry: &AnimationRegistry) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        match registry.resolve_clip(self.source_id.as_deref(), &state.clip_name) {
            Some(clip) => {
                let sprite = state.tick(dt_us, clip);
                if self.sprite_id.as_deref() != Some(sprite) {
                    self.sprite_id = Some(sprite.to_string());
                }
            }
            None => {
                log::warn!(
                    "Running clip '{}' disappeared from the registry",
                    state.clip_name
                );
                self.state = None;
                self.sprite_id = None;
            }
        }
    }

    pub fn current_clip(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.clip_name.as_str())
    }

    pub fn current_sprite(&self) -> Option<&str> {
        self.sprite_id.as_deref()
    }

    #[allow(dead_code)]
    pub fn state(&self) -> Option<&AnimationState> {
        self.state.as_ref()
    }
}
