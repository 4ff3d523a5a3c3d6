//! Simulation configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub point: PointConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

impl Config {
    /// Load configuration from `quadfield.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("quadfield.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No quadfield.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            field: FieldConfig::default(),
            grid: GridConfig::default(),
            point: PointConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

/// Play-field dimensions.
///
/// The quadtree's depth budget is derived from log2 of these sizes, so keep
/// the field and the minimum cell size at powers of two.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldConfig {
    #[serde(default = "default_field_size")]
    pub width: f32,
    #[serde(default = "default_field_size")]
    pub height: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: default_field_size(),
            height: default_field_size(),
        }
    }
}

fn default_field_size() -> f32 {
    800.0
}

/// Quadtree granularity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridConfig {
    /// Smallest cell half-extent the tree may subdivide down to. Cells of
    /// this size accept any number of points.
    #[serde(default = "default_min_cell_size")]
    pub min_cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_cell_size: default_min_cell_size(),
        }
    }
}

fn default_min_cell_size() -> f32 {
    16.0
}

/// Point kinematics and display.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PointConfig {
    /// Speed of a freshly spawned point, field units per second.
    #[serde(default = "default_point_speed")]
    pub speed: f32,
    /// Display radius.
    #[serde(default = "default_point_radius")]
    pub radius: f32,
}

impl Default for PointConfig {
    fn default() -> Self {
        Self {
            speed: default_point_speed(),
            radius: default_point_radius(),
        }
    }
}

fn default_point_speed() -> f32 {
    50.0
}

fn default_point_radius() -> f32 {
    2.0
}

/// Driver loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Points seeded at startup.
    #[serde(default = "default_initial_points")]
    pub initial_points: usize,
    /// Seconds between statistics log lines.
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    /// Stop after this many ticks. 0 runs until interrupted.
    #[serde(default)]
    pub run_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            initial_points: default_initial_points(),
            stats_interval_secs: default_stats_interval(),
            run_ticks: 0,
        }
    }
}

fn default_tick_interval() -> u64 {
    16
}

fn default_initial_points() -> usize {
    500
}

fn default_stats_interval() -> u64 {
    5
}
