pub mod config;
pub mod drag;
pub mod easing;
pub mod error;
pub mod grid;
pub mod occupancy;
pub mod placement;
pub mod shape;

use avian3d::prelude::*;
use bevy::prelude::*;
use bevy_turborand::prelude::*;
use config::BlockSnapSettings;
use drag::{BoardCamera, DragAction, DragPlugin};
use grid::{Grid, GridPlugin, GridRng, generate_grid};
use leafwing_input_manager::prelude::*;
use placement::{PlacementPlugin, PlacementRng};

/// Camera height and pull-back as multiples of the board's side length.
const CAMERA_HEIGHT_FACTOR: f32 = 1.6;
const CAMERA_DISTANCE_FACTOR: f32 = 0.9;

pub fn run() {
    bits_helpers::get_default_app(env!("CARGO_PKG_NAME"))
        .add_plugins(PhysicsPlugins::default())
        // .add_plugins(PhysicsDebugPlugin::default()) // Activate when you need to debug physics
        .add_plugins(BlockSnapPlugin::default())
        .run();
}

/// Board, starting pieces and drag controller.
#[derive(Default)]
pub struct BlockSnapPlugin {
    pub settings: BlockSnapSettings,
}

impl Plugin for BlockSnapPlugin {
    fn build(&self, app: &mut App) {
        let settings = self.settings.clone().validated();

        // Each subsystem draws from its own fork so they stay independently reproducible
        let mut global_rng = settings.seed.map_or_else(GlobalRng::new, GlobalRng::with_seed);
        let grid_rng = GridRng(RngComponent::from(&mut global_rng));
        let placement_rng = PlacementRng(RngComponent::from(&mut global_rng));

        app.register_type::<BlockSnapSettings>()
            .insert_resource(settings)
            .insert_resource(global_rng)
            .insert_resource(grid_rng)
            .insert_resource(placement_rng)
            .insert_resource(AmbientLight {
                color: Color::WHITE,
                brightness: 400.0,
            })
            .add_plugins((GridPlugin, PlacementPlugin, DragPlugin))
            .add_systems(Startup, setup_scene.after(generate_grid));
    }
}

fn setup_scene(mut commands: Commands, grid: Option<Res<Grid>>) {
    let side = grid.map_or(1.0, |grid| grid.columns().max(grid.rows()) as f32 * grid.tile_size());

    commands.spawn((
        Name::new("Board camera"),
        BoardCamera,
        Camera3d::default(),
        Transform::from_xyz(
            0.0,
            side * CAMERA_HEIGHT_FACTOR,
            side * CAMERA_DISTANCE_FACTOR,
        )
        .looking_at(Vec3::ZERO, Vec3::Y),
        drag::create_input_map(),
        ActionState::<DragAction>::default(),
    ));

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(2.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
