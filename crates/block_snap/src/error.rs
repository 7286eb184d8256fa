use bevy::math::UVec2;
use thiserror::Error;

/// A required collaborator or parameter is missing or unusable. The
/// dependent feature is disabled; nothing else is affected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("grid of {columns}x{rows} cells is degenerate")]
    DegenerateGrid { columns: usize, rows: usize },
    #[error("tile size {0} must be positive")]
    InvalidTileSize(f32),
    #[error("no shape templates configured")]
    NoTemplates,
    #[error("no colors configured")]
    EmptyPalette,
    #[error("occupancy map is {occupancy} cells but the grid is {grid}")]
    OccupancyMismatch { grid: UVec2, occupancy: UVec2 },
    #[error("grid has not been generated")]
    MissingGrid,
    #[error("no board camera found")]
    MissingCamera,
}

/// A single shape could not be placed. The batch carries on without it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("no free anchor for shape `{template}` after {attempts} attempts")]
    AttemptsExhausted { template: String, attempts: u32 },
    #[error("shape `{template}` has no blocks")]
    EmptyTemplate { template: String },
}
