use bevy::prelude::*;
use serde::{Deserialize, Serialize};

const MIN_GRID_SIZE: usize = 2;
const DEFAULT_TILE_SIZE: f32 = 1.0;
const MIN_DRAG_SPEED: f32 = 1.0;
const MIN_SPRING: f32 = 10.0;
const MIN_DAMPER: f32 = 0.5;
const MIN_DRAG_DISTANCE: f32 = 0.001;
const MIN_SNAP_DURATION: f32 = 0.05;

/// Tunables for the board, the placement pass and the drag controller.
#[derive(Reflect, Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct BlockSnapSettings {
    pub min_grid_size: usize,
    pub max_grid_size: usize,
    pub tile_size: f32,
    /// How fast the follow point catches up with the pointer, per second.
    pub drag_speed: f32,
    pub spring: f32,
    pub damper: f32,
    /// Longest stretch the elastic link allows between follow point and piece.
    pub max_drag_distance: f32,
    /// Seconds a released piece takes to ease onto its cell.
    pub snap_duration: f32,
    pub max_placement_attempts: u32,
    /// Seeds every random source of the bit. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for BlockSnapSettings {
    fn default() -> Self {
        Self {
            min_grid_size: 4,
            max_grid_size: 8,
            tile_size: DEFAULT_TILE_SIZE,
            drag_speed: 12.0,
            spring: 400.0,
            damper: 8.0,
            max_drag_distance: 0.5,
            snap_duration: 0.2,
            max_placement_attempts: 100,
            seed: None,
        }
    }
}

impl BlockSnapSettings {
    /// Clamps every field into its usable range, logging each adjustment.
    #[must_use]
    pub fn validated(mut self) -> Self {
        if self.min_grid_size < MIN_GRID_SIZE {
            warn!(
                "min_grid_size {} raised to {MIN_GRID_SIZE}",
                self.min_grid_size
            );
            self.min_grid_size = MIN_GRID_SIZE;
        }
        if self.max_grid_size < self.min_grid_size {
            warn!(
                "max_grid_size {} raised to min_grid_size {}",
                self.max_grid_size, self.min_grid_size
            );
            self.max_grid_size = self.min_grid_size;
        }
        // Any positive finite size is valid
        if !self.tile_size.is_finite() || self.tile_size <= 0.0 {
            warn!(
                "tile_size {} replaced with {DEFAULT_TILE_SIZE}",
                self.tile_size
            );
            self.tile_size = DEFAULT_TILE_SIZE;
        }

        self.drag_speed = at_least("drag_speed", self.drag_speed, MIN_DRAG_SPEED);
        self.spring = at_least("spring", self.spring, MIN_SPRING);
        self.damper = at_least("damper", self.damper, MIN_DAMPER);
        self.max_drag_distance =
            at_least("max_drag_distance", self.max_drag_distance, MIN_DRAG_DISTANCE);
        self.snap_duration = at_least("snap_duration", self.snap_duration, MIN_SNAP_DURATION);

        if self.max_placement_attempts == 0 {
            warn!("max_placement_attempts 0 raised to 1");
            self.max_placement_attempts = 1;
        }

        self
    }
}

fn at_least(field: &str, value: f32, min: f32) -> f32 {
    if value >= min {
        value
    } else {
        warn!("{field} {value} raised to {min}");
        min
    }
}
