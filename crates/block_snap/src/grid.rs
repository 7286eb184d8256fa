use avian3d::prelude::*;
use bevy::color::palettes::css::{DARK_SLATE_GRAY, SLATE_GRAY};
use bevy::prelude::*;
use bevy_turborand::prelude::*;

use crate::config::BlockSnapSettings;
use crate::error::ConfigurationError;
use crate::occupancy::OccupancyMap;

const TILE_THICKNESS: f32 = 0.1;
const TILE_GAP: f32 = 0.04;

/// Square board of cells laid out on the XZ plane and centred on the origin.
///
/// The cell-centre table is computed once; it is stored row-major, so the
/// centre of `(col, row)` is at index `row * columns + col`.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Grid {
    columns: usize,
    rows: usize,
    tile_size: f32,
    cell_centers: Vec<Vec3>,
}

impl Grid {
    pub fn new(columns: usize, rows: usize, tile_size: f32) -> Result<Self, ConfigurationError> {
        if columns == 0 || rows == 0 {
            return Err(ConfigurationError::DegenerateGrid { columns, rows });
        }
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(ConfigurationError::InvalidTileSize(tile_size));
        }

        let offset_x = (columns - 1) as f32 * tile_size / 2.0;
        let offset_z = (rows - 1) as f32 * tile_size / 2.0;

        let cell_centers = (0..rows)
            .flat_map(|row| (0..columns).map(move |col| (col, row)))
            .map(|(col, row)| {
                Vec3::new(
                    (col as f32).mul_add(tile_size, -offset_x),
                    0.0,
                    (row as f32).mul_add(tile_size, -offset_z),
                )
            })
            .collect();

        Ok(Self {
            columns,
            rows,
            tile_size,
            cell_centers,
        })
    }

    /// Picks a side length uniformly in `[min_size, max_size]` and builds a
    /// square grid of that size.
    pub fn generate(
        rng: &mut impl DelegatedRng,
        min_size: usize,
        max_size: usize,
        tile_size: f32,
    ) -> Result<Self, ConfigurationError> {
        if min_size == 0 || max_size < min_size {
            return Err(ConfigurationError::DegenerateGrid {
                columns: min_size,
                rows: max_size,
            });
        }

        let side = rng.usize(min_size..=max_size);
        Self::new(side, side, tile_size)
    }

    pub const fn columns(&self) -> usize {
        self.columns
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub const fn cell_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Whether a signed cell coordinate falls inside `[0, columns) x [0, rows)`.
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && (cell.x as usize) < self.columns
            && (cell.y as usize) < self.rows
    }

    pub fn cell_center(&self, cell: UVec2) -> Option<Vec3> {
        let (col, row) = (cell.x as usize, cell.y as usize);
        if col >= self.columns || row >= self.rows {
            return None;
        }
        self.cell_centers.get(row * self.columns + col).copied()
    }

    pub fn cell_centers(&self) -> &[Vec3] {
        &self.cell_centers
    }

    pub fn cells(&self) -> impl Iterator<Item = (UVec2, Vec3)> + '_ {
        let columns = self.columns;
        self.cell_centers.iter().enumerate().map(move |(index, center)| {
            (
                UVec2::new((index % columns) as u32, (index / columns) as u32),
                *center,
            )
        })
    }

    /// Outer edge of the board on the XZ plane (`x` maps to world X, `y` to world Z).
    pub fn bounds(&self) -> Rect {
        let half_width = self.columns as f32 * self.tile_size / 2.0;
        let half_depth = self.rows as f32 * self.tile_size / 2.0;
        Rect::new(-half_width, -half_depth, half_width, half_depth)
    }

    /// Cell whose centre is closest to `point`. Linear scan; ties go to the
    /// lowest row-major index.
    pub fn nearest_cell(&self, point: Vec3) -> (UVec2, Vec3) {
        let mut best = (UVec2::ZERO, self.cell_centers.first().copied().unwrap_or_default());
        let mut best_distance = f32::INFINITY;

        for (cell, center) in self.cells() {
            let distance = center.distance_squared(point);
            if distance < best_distance {
                best_distance = distance;
                best = (cell, center);
            }
        }

        best
    }
}

/// Random source used only for board generation.
#[derive(Resource, Deref, DerefMut)]
pub struct GridRng(pub RngComponent);

/// Visual tile of the board.
#[derive(Component, Debug)]
pub struct Tile {
    pub cell: UVec2,
}

pub struct GridPlugin;

impl Plugin for GridPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (generate_grid, spawn_tiles).chain());
    }
}

pub fn generate_grid(
    mut commands: Commands,
    settings: Res<BlockSnapSettings>,
    mut rng: ResMut<GridRng>,
) {
    let grid = match Grid::generate(
        &mut **rng,
        settings.min_grid_size,
        settings.max_grid_size,
        settings.tile_size,
    ) {
        Ok(grid) => grid,
        Err(err) => {
            error!("Grid generation failed: {err}");
            return;
        }
    };

    info!(
        "Generated {}x{} grid, tile size {}",
        grid.columns(),
        grid.rows(),
        grid.tile_size()
    );

    commands.insert_resource(OccupancyMap::new(grid.columns(), grid.rows()));
    commands.insert_resource(grid);
}

fn spawn_tiles(
    mut commands: Commands,
    grid: Option<Res<Grid>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(grid) = grid else {
        return;
    };

    let tile_size = grid.tile_size();
    let visible_size = tile_size - TILE_GAP * tile_size;
    let mesh = meshes.add(Cuboid::new(visible_size, TILE_THICKNESS, visible_size));
    let light = materials.add(Color::from(SLATE_GRAY));
    let dark = materials.add(Color::from(DARK_SLATE_GRAY));

    for (cell, center) in grid.cells() {
        let material = if (cell.x + cell.y) % 2 == 0 {
            light.clone()
        } else {
            dark.clone()
        };

        commands.spawn((
            Name::new(format!("Tile {cell}")),
            Tile { cell },
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material),
            Transform::from_translation(center - Vec3::Y * (TILE_THICKNESS / 2.0)),
            RigidBody::Static,
            Collider::cuboid(tile_size, TILE_THICKNESS, tile_size),
        ));
    }
}
