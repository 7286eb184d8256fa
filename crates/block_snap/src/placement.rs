//! One-shot random layout of the starting pieces.
//!
//! Pieces are placed by rejection sampling: pick a random anchor cell, keep
//! it if the whole footprint is on the board and free, otherwise try again
//! until the attempt budget runs out. The number of pieces is capped by a
//! step function of the board area so sampling stays cheap on small boards.

use avian3d::prelude::*;
use bevy::color::palettes::css::{CORAL, GOLD, LIGHT_GREEN, MEDIUM_PURPLE, SKY_BLUE, TOMATO};
use bevy::prelude::*;
use bevy_turborand::prelude::*;

use crate::config::BlockSnapSettings;
use crate::error::{ConfigurationError, PlacementError};
use crate::grid::{Grid, generate_grid};
use crate::occupancy::OccupancyMap;
use crate::shape::{ShapeCatalog, ShapeTemplate};

/// Block edge as a fraction of the tile, leaving a visible seam between blocks.
const BLOCK_SCALE: f32 = 0.9;

const DEFAULT_COLOR: Color = Color::WHITE;

/// How many pieces a board of `cell_count` cells starts with.
pub const fn target_shape_count(cell_count: usize) -> usize {
    match cell_count {
        0..=9 => 1,
        10..=16 => 2,
        17..=36 => 3,
        37..=64 => 4,
        _ => 5,
    }
}

/// Uniform in-place permutation (Fisher–Yates).
pub fn shuffle<T>(rng: &mut impl DelegatedRng, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.usize(..=i);
        items.swap(i, j);
    }
}

/// Cells claimed by one successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub anchor: UVec2,
    pub cells: Vec<IVec2>,
}

/// Tries up to `max_attempts` random anchors for `template`. On success the
/// cells are marked in `occupancy`; on failure `occupancy` is untouched.
pub fn try_place(
    template: &ShapeTemplate,
    grid: &Grid,
    occupancy: &mut OccupancyMap,
    rng: &mut impl DelegatedRng,
    max_attempts: u32,
) -> Result<Placement, PlacementError> {
    if template.is_empty() {
        return Err(PlacementError::EmptyTemplate {
            template: template.name().to_string(),
        });
    }

    for attempt in 1..=max_attempts {
        let anchor = UVec2::new(
            rng.usize(..grid.columns()) as u32,
            rng.usize(..grid.rows()) as u32,
        );
        let cells = template.cells_at(anchor.as_ivec2());

        if cells.iter().all(|cell| grid.contains(*cell)) && occupancy.is_free(&cells) {
            occupancy.mark(&cells);
            debug!(
                "Placed `{}` at {anchor} on attempt {attempt}",
                template.name()
            );
            return Ok(Placement { anchor, cells });
        }
    }

    Err(PlacementError::AttemptsExhausted {
        template: template.name().to_string(),
        attempts: max_attempts,
    })
}

/// A piece the batch managed to place, indexing into the inputs of
/// [`place_shapes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedShape {
    pub template: usize,
    pub color: usize,
    pub anchor: UVec2,
    pub cells: Vec<IVec2>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementReport {
    pub attempted: usize,
    pub placed: Vec<PlacedShape>,
    pub failures: Vec<PlacementError>,
}

/// Shuffles templates and colors independently, pairs them up and places as
/// many pieces as the board size allows. A piece that cannot be placed is
/// logged and skipped.
pub fn place_shapes<C>(
    templates: &[ShapeTemplate],
    colors: &[C],
    grid: &Grid,
    occupancy: &mut OccupancyMap,
    rng: &mut impl DelegatedRng,
    max_attempts: u32,
) -> Result<PlacementReport, ConfigurationError> {
    if templates.is_empty() {
        return Err(ConfigurationError::NoTemplates);
    }
    if colors.is_empty() {
        return Err(ConfigurationError::EmptyPalette);
    }
    if occupancy.columns() != grid.columns() || occupancy.rows() != grid.rows() {
        return Err(ConfigurationError::OccupancyMismatch {
            grid: UVec2::new(grid.columns() as u32, grid.rows() as u32),
            occupancy: UVec2::new(occupancy.columns() as u32, occupancy.rows() as u32),
        });
    }

    let mut template_order: Vec<usize> = (0..templates.len()).collect();
    let mut color_order: Vec<usize> = (0..colors.len()).collect();
    shuffle(rng, &mut template_order);
    shuffle(rng, &mut color_order);

    let attempted = target_shape_count(grid.cell_count())
        .min(template_order.len())
        .min(color_order.len());

    let mut report = PlacementReport {
        attempted,
        ..default()
    };

    for (&template, &color) in template_order.iter().zip(&color_order).take(attempted) {
        let Some(shape) = templates.get(template) else {
            continue;
        };
        match try_place(shape, grid, occupancy, rng, max_attempts) {
            Ok(placement) => report.placed.push(PlacedShape {
                template,
                color,
                anchor: placement.anchor,
                cells: placement.cells,
            }),
            Err(err) => {
                warn!("{err}");
                report.failures.push(err);
            }
        }
    }

    Ok(report)
}

/// Colors paired with the shapes. Never empty.
#[derive(Resource, Debug, Clone)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        if colors.is_empty() {
            warn!("Empty palette, falling back to a single default color");
            return Self {
                colors: vec![DEFAULT_COLOR],
            };
        }
        Self { colors }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(
            [TOMATO, GOLD, LIGHT_GREEN, SKY_BLUE, MEDIUM_PURPLE, CORAL]
                .into_iter()
                .map(Color::from)
                .collect(),
        )
    }
}

/// Random source used only by the placement pass.
#[derive(Resource, Deref, DerefMut)]
pub struct PlacementRng(pub RngComponent);

/// Outcome of the last placement pass.
#[derive(Resource, Debug, Clone, Default)]
pub struct LastPlacement(pub PlacementReport);

/// A draggable polyomino body.
#[derive(Component, Debug, Clone)]
pub struct Piece {
    pub template: String,
    /// Cells claimed at spawn time. Not updated by dragging.
    pub cells: Vec<IVec2>,
}

/// One visible block of a piece.
#[derive(Component, Debug)]
pub struct PieceBlock;

pub struct PlacementPlugin;

impl Plugin for PlacementPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ShapeCatalog>()
            .init_resource::<Palette>()
            .init_resource::<LastPlacement>()
            .add_systems(Startup, spawn_pieces.after(generate_grid));
    }
}

fn spawn_pieces(
    mut commands: Commands,
    grid: Option<Res<Grid>>,
    occupancy: Option<ResMut<OccupancyMap>>,
    catalog: Res<ShapeCatalog>,
    palette: Res<Palette>,
    settings: Res<BlockSnapSettings>,
    mut rng: ResMut<PlacementRng>,
    mut last_placement: ResMut<LastPlacement>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let (Some(grid), Some(mut occupancy)) = (grid, occupancy) else {
        error_once!("Cannot place pieces: {}", ConfigurationError::MissingGrid);
        return;
    };

    let report = match place_shapes(
        &catalog.templates,
        palette.colors(),
        &grid,
        &mut occupancy,
        &mut **rng,
        settings.max_placement_attempts,
    ) {
        Ok(report) => report,
        Err(err) => {
            error_once!("Cannot place pieces: {err}");
            return;
        }
    };

    info!(
        "Placed {} of {} shapes",
        report.placed.len(),
        report.attempted
    );

    let tile_size = grid.tile_size();
    let block_size = tile_size * BLOCK_SCALE;
    let block_mesh = meshes.add(Cuboid::from_length(block_size));

    for placed in &report.placed {
        let (Some(center), Some(template), Some(&color)) = (
            grid.cell_center(placed.anchor),
            catalog.templates.get(placed.template),
            palette.colors().get(placed.color),
        ) else {
            continue;
        };
        let material = materials.add(color);

        commands
            .spawn((
                Name::new(format!("Piece {}", template.name())),
                Piece {
                    template: template.name().to_string(),
                    cells: placed.cells.clone(),
                },
                RigidBody::Dynamic,
                LockedAxes::ALL_LOCKED,
                Transform::from_translation(center),
                Visibility::default(),
            ))
            .with_children(|parent| {
                for offset in template.offsets() {
                    parent.spawn((
                        PieceBlock,
                        Mesh3d(block_mesh.clone()),
                        MeshMaterial3d(material.clone()),
                        Transform::from_xyz(
                            offset.x as f32 * tile_size,
                            tile_size / 2.0,
                            offset.y as f32 * tile_size,
                        ),
                        Collider::cuboid(block_size, block_size, block_size),
                    ));
                }
            });
    }

    last_placement.0 = report;
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;
    use crate::shape::ShapeKind;

    fn board_world(side: usize, seed: u64) -> World {
        let mut world = World::new();
        world.insert_resource(Grid::new(side, side, 1.0).unwrap());
        world.insert_resource(OccupancyMap::new(side, side));
        world.insert_resource(PlacementRng(RngComponent::with_seed(seed)));
        world.insert_resource(BlockSnapSettings::default());
        world.init_resource::<ShapeCatalog>();
        world.init_resource::<Palette>();
        world.init_resource::<LastPlacement>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world
    }

    #[test]
    fn shape_count_steps_at_boundaries() {
        assert_eq!(target_shape_count(4), 1);
        assert_eq!(target_shape_count(9), 1);
        assert_eq!(target_shape_count(10), 2);
        assert_eq!(target_shape_count(16), 2);
        assert_eq!(target_shape_count(17), 3);
        assert_eq!(target_shape_count(36), 3);
        assert_eq!(target_shape_count(37), 4);
        assert_eq!(target_shape_count(64), 4);
        assert_eq!(target_shape_count(65), 5);
        assert_eq!(target_shape_count(400), 5);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = RngComponent::with_seed(3);
        let mut items: Vec<usize> = (0..20).collect();
        shuffle(&mut rng, &mut items);

        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn single_cell_template_fills_a_free_cell() {
        let grid = Grid::new(2, 2, 1.0).unwrap();
        let mut occupancy = OccupancyMap::new(2, 2);
        occupancy.mark(&[IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(0, 1)]);
        let mut rng = RngComponent::with_seed(11);

        let placement = try_place(
            &ShapeKind::Monomino.template(),
            &grid,
            &mut occupancy,
            &mut rng,
            1_000,
        )
        .unwrap();

        assert_eq!(placement.anchor, UVec2::new(1, 1));
        assert_eq!(occupancy.occupied_count(), 4);
    }

    #[test]
    fn oversized_template_exhausts_attempts() {
        let grid = Grid::new(3, 3, 1.0).unwrap();
        let mut occupancy = OccupancyMap::new(3, 3);
        let mut rng = RngComponent::with_seed(5);

        let result = try_place(
            &ShapeKind::StraightTetromino.template(),
            &grid,
            &mut occupancy,
            &mut rng,
            50,
        );

        assert_eq!(
            result,
            Err(PlacementError::AttemptsExhausted {
                template: "straight_tetromino".to_string(),
                attempts: 50
            })
        );
        assert_eq!(occupancy.occupied_count(), 0);
    }

    #[test]
    fn empty_template_is_rejected() {
        let grid = Grid::new(3, 3, 1.0).unwrap();
        let mut occupancy = OccupancyMap::new(3, 3);
        let mut rng = RngComponent::with_seed(5);

        let result = try_place(
            &ShapeTemplate::new("nothing", []),
            &grid,
            &mut occupancy,
            &mut rng,
            10,
        );
        assert!(matches!(result, Err(PlacementError::EmptyTemplate { .. })));
    }

    #[test]
    fn missing_inputs_are_configuration_errors() {
        let grid = Grid::new(4, 4, 1.0).unwrap();
        let mut occupancy = OccupancyMap::new(4, 4);
        let mut rng = RngComponent::with_seed(1);
        let templates = vec![ShapeKind::Domino.template()];

        assert_eq!(
            place_shapes::<Color>(&[], &[Color::WHITE], &grid, &mut occupancy, &mut rng, 10),
            Err(ConfigurationError::NoTemplates)
        );
        assert_eq!(
            place_shapes::<Color>(&templates, &[], &grid, &mut occupancy, &mut rng, 10),
            Err(ConfigurationError::EmptyPalette)
        );
    }

    #[test]
    fn occupancy_must_match_the_grid() {
        let grid = Grid::new(4, 4, 1.0).unwrap();
        let mut occupancy = OccupancyMap::new(3, 4);
        let mut rng = RngComponent::with_seed(1);
        let templates = vec![ShapeKind::Monomino.template()];

        assert_eq!(
            place_shapes(&templates, &[Color::WHITE], &grid, &mut occupancy, &mut rng, 10),
            Err(ConfigurationError::OccupancyMismatch {
                grid: UVec2::new(4, 4),
                occupancy: UVec2::new(3, 4),
            })
        );
        assert_eq!(occupancy.occupied_count(), 0);
    }

    #[test]
    fn six_by_six_board_spawns_three_shapes() {
        let grid = Grid::new(6, 6, 1.0).unwrap();
        let templates: Vec<ShapeTemplate> = [
            ShapeKind::Monomino,
            ShapeKind::Domino,
            ShapeKind::CornerTromino,
            ShapeKind::Square,
        ]
        .into_iter()
        .map(ShapeKind::template)
        .collect();
        let colors = ["red", "green", "blue", "yellow"];
        let mut occupancy = OccupancyMap::new(6, 6);
        let mut rng = RngComponent::with_seed(2024);

        let report =
            place_shapes(&templates, &colors, &grid, &mut occupancy, &mut rng, 100).unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.placed.len(), 3);
        assert!(report.failures.is_empty());

        let expected_cells: usize = report
            .placed
            .iter()
            .filter_map(|placed| templates.get(placed.template).map(ShapeTemplate::len))
            .sum();
        assert_eq!(occupancy.occupied_count(), expected_cells);
    }

    #[test]
    fn template_count_caps_the_batch() {
        let grid = Grid::new(6, 6, 1.0).unwrap();
        let templates = vec![ShapeKind::Monomino.template(), ShapeKind::Domino.template()];
        let colors = ["red", "green", "blue"];
        let mut occupancy = OccupancyMap::new(6, 6);
        let mut rng = RngComponent::with_seed(8);

        let report =
            place_shapes(&templates, &colors, &grid, &mut occupancy, &mut rng, 100).unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.placed.len(), 2);
    }

    #[test]
    fn empty_palette_falls_back_to_default() {
        let palette = Palette::new(Vec::new());
        assert_eq!(palette.colors(), &[DEFAULT_COLOR]);
    }

    #[test]
    fn spawned_pieces_sit_on_their_anchor_cells() {
        let mut world = board_world(6, 42);
        world
            .run_system_once(spawn_pieces)
            .expect("spawn_pieces should run");

        let report = world.resource::<LastPlacement>().0.clone();
        let grid = world.resource::<Grid>().clone();
        let catalog = world.resource::<ShapeCatalog>().clone();
        let palette = world.resource::<Palette>().clone();
        assert!(!report.placed.is_empty(), "a 6x6 board has room for pieces");

        let mut pieces = world.query::<(&Piece, &Transform, &Children)>();
        let spawned: Vec<(Vec<IVec2>, Vec3, Vec<Entity>)> = pieces
            .iter(&world)
            .map(|(piece, transform, children)| {
                (piece.cells.clone(), transform.translation, children.to_vec())
            })
            .collect();
        assert_eq!(spawned.len(), report.placed.len());

        let materials = world.resource::<Assets<StandardMaterial>>();
        for (cells, translation, children) in spawned {
            let placed = report
                .placed
                .iter()
                .find(|placed| placed.cells == cells)
                .expect("every piece comes from the placement report");

            assert_eq!(Some(translation), grid.cell_center(placed.anchor));
            assert_eq!(
                Some(children.len()),
                catalog.templates.get(placed.template).map(ShapeTemplate::len)
            );

            for child in children {
                let material = world
                    .get::<MeshMaterial3d<StandardMaterial>>(child)
                    .expect("every block has a material");
                assert_eq!(
                    materials.get(&material.0).map(|material| material.base_color),
                    palette.colors().get(placed.color).copied()
                );
            }
        }

        let claimed: usize = report.placed.iter().map(|placed| placed.cells.len()).sum();
        assert_eq!(world.resource::<OccupancyMap>().occupied_count(), claimed);
    }

    #[test]
    fn no_pieces_without_a_grid() {
        let mut world = board_world(4, 1);
        world.remove_resource::<Grid>();

        world
            .run_system_once(spawn_pieces)
            .expect("spawn_pieces should run");

        assert_eq!(world.query::<&Piece>().iter(&world).count(), 0);
        assert_eq!(world.resource::<LastPlacement>().0, PlacementReport::default());
    }
}
