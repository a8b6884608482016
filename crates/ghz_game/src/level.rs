//! Level description: everything the engine is told once while the scene
//! initializes. Positions are in world pixels with y pointing down.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::controller::ControllerConfig;

pub const LEVEL_FILE_VERSION: &str = "1.0";

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    pub version: String,
    pub level_id: String,
    pub world: WorldConfig,
    #[serde(default)]
    pub tilemap: Option<TilemapConfig>,
    pub layers: Vec<BackdropLayer>,
    pub player: PlayerConfig,
    pub camera: CameraConfig,
    pub animations: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_gravity")]
    pub gravity_y: f32,
    /// Flat ground line used by the headless host in place of tile collision.
    pub floor_y: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TilemapConfig {
    pub key: String,
    pub path: String,
    pub tileset: String,
    pub tileset_image: String,
    pub layers: Vec<TileLayer>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TileLayer {
    pub name: String,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub collides: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackdropLayer {
    pub id: String,
    pub asset: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub origin_x: f32,
    #[serde(default)]
    pub origin_y: f32,
    #[serde(default = "default_scroll_factor")]
    pub scroll_factor: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Moves together with vertical free-camera pans.
    #[serde(default)]
    pub camera_locked: bool,
    #[serde(default)]
    pub animation: Option<LayerAnimation>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayerAnimation {
    #[serde(default)]
    pub source: Option<String>,
    pub clip: String,
    #[serde(default = "default_true")]
    pub looping: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlayerConfig {
    pub spawn_x: f32,
    pub spawn_y: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub animation_source: Option<String>,
    #[serde(default)]
    pub controller: ControllerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    pub bounds: BoundsConfig,
    #[serde(default = "default_true")]
    pub follow: bool,
    #[serde(default)]
    pub free_cam: bool,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BoundsConfig {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LevelFile {
    /// Image and tile files the level points at, for existence checks.
    pub fn asset_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.layers.iter().map(|l| l.asset.as_str()).collect();
        if let Some(tilemap) = &self.tilemap {
            paths.push(tilemap.path.as_str());
            paths.push(tilemap.tileset_image.as_str());
        }
        paths
    }
}

/// Polls a file's mtime so edits can be picked up at frame boundaries.
pub struct LevelWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl LevelWatcher {
    pub fn new(path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&path);
        Self {
            path,
            last_seen_modified,
        }
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

pub fn load_level_from_path(path: &Path) -> Result<LevelFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read level file {}: {e}", path.display()))?;
    let level: LevelFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse level JSON {}: {e}", path.display()))?;
    validate_level(&level)?;
    Ok(level)
}

fn validate_level(level: &LevelFile) -> Result<(), String> {
    if level.version != LEVEL_FILE_VERSION {
        return Err(format!(
            "Level validation failed: unsupported version '{}'",
            level.version
        ));
    }
    if level.layers.is_empty() {
        return Err("Level validation failed: layers array is empty".to_string());
    }
    if level.animations.is_empty() {
        return Err("Level validation failed: no animation files listed".to_string());
    }

    let mut layer_ids = HashSet::new();
    for layer in &level.layers {
        if !layer_ids.insert(layer.id.as_str()) {
            return Err(format!(
                "Level validation failed: duplicate layer id '{}'",
                layer.id
            ));
        }
        if layer.scroll_factor < 0.0 {
            return Err(format!(
                "Level validation failed: layer '{}' has negative scroll_factor {}",
                layer.id, layer.scroll_factor
            ));
        }
    }

    let bounds = level.camera.bounds;
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Err(format!(
            "Level validation failed: camera bounds must be positive, got {}x{}",
            bounds.width, bounds.height
        ));
    }

    if let Some(tilemap) = &level.tilemap {
        let mut names = HashSet::new();
        for layer in &tilemap.layers {
            if !names.insert(layer.name.as_str()) {
                return Err(format!(
                    "Level validation failed: duplicate tilemap layer '{}'",
                    layer.name
                ));
            }
        }
        if !tilemap.layers.iter().any(|l| l.collides) {
            log::warn!(
                "Tilemap '{}' has no colliding layer; the player will only stand on the floor line",
                tilemap.key
            );
        }
    }

    let controller = &level.player.controller;
    for (field, value) in [
        ("walk_speed", controller.walk_speed),
        ("jump_impulse", controller.jump_impulse),
        ("pan_step", controller.pan_step),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(format!(
                "Level validation failed: player.controller.{field} must be a positive number, got {value}"
            ));
        }
    }

    let world = &level.world;
    if bounds.x + bounds.width > world.width || bounds.y + bounds.height > world.height {
        log::warn!(
            "Camera bounds {}x{} at ({}, {}) reach past the {}x{} world",
            bounds.width,
            bounds.height,
            bounds.x,
            bounds.y,
            world.width,
            world.height
        );
    }

    if level.player.spawn_y > level.world.floor_y {
        log::warn!(
            "Player spawn y {} is below the floor line {}",
            level.player.spawn_y,
            level.world.floor_y
        );
    }

    Ok(())
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

fn default_background_color() -> String {
    "#000000".to_string()
}

const fn default_gravity() -> f32 {
    300.0
}

const fn default_scroll_factor() -> f32 {
    1.0
}

const fn default_scale() -> f32 {
    1.0
}

const fn default_true() -> bool {
    true
}
