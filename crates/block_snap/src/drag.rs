//! Pointer-driven dragging of pieces.
//!
//! A press over a piece attaches it to a kinematic follow point through an
//! elastic distance joint. The follow point trails the pointer on the
//! piece's horizontal plane while every physics step keeps the piece's
//! footprint inside the board. On release the piece eases onto the nearest
//! cell centre and is frozen there.

use avian3d::prelude::*;
use bevy::prelude::*;
use bevy::render::primitives::Aabb;
use bits_helpers::input::{
    pointer_world_ray, touch_just_pressed_position, touch_just_released_position,
};
use leafwing_input_manager::prelude::*;

use crate::config::BlockSnapSettings;
use crate::easing::{SnapMotion, SnapStep};
use crate::error::ConfigurationError;
use crate::grid::Grid;
use crate::placement::{Piece, PieceBlock};

const MAX_PICK_DISTANCE: f32 = 1_000.0;

#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum DragAction {
    Grab,
}

pub fn create_input_map() -> InputMap<DragAction> {
    let mut input_map = InputMap::default();

    input_map.insert(DragAction::Grab, MouseButton::Left);

    input_map
}

/// Camera the pointer is projected through. Also carries the drag input map.
#[derive(Component, Debug, Default)]
pub struct BoardCamera;

/// Kinematic point the dragged piece is pulled toward.
#[derive(Component, Debug)]
pub struct FollowPoint;

/// A piece that finished snapping. It no longer reacts to the pointer.
#[derive(Component, Debug)]
pub struct Settled;

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiecePickedUp {
    pub body: Entity,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSnapped {
    pub body: Entity,
    /// `None` when no grid was available and the piece stayed where it was dropped.
    pub cell: Option<UVec2>,
}

/// Spring/damper coupling between the follow point and the dragged piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticLink {
    pub stiffness: f32,
    pub damping: f32,
    pub max_stretch: f32,
}

impl ElasticLink {
    pub const fn from_settings(settings: &BlockSnapSettings) -> Self {
        Self {
            stiffness: settings.spring,
            damping: settings.damper,
            max_stretch: settings.max_drag_distance,
        }
    }

    /// Inverse stiffness, as the joint solver expects it.
    pub fn compliance(&self) -> f32 {
        self.stiffness.recip()
    }

    /// Joint pulling `body_anchor` (in the body's local frame) toward the
    /// follow point, never letting it stretch past `max_stretch`.
    pub fn joint(&self, follow_point: Entity, body: Entity, body_anchor: Vec3) -> DistanceJoint {
        DistanceJoint::new(follow_point, body)
            .with_local_anchor_2(body_anchor)
            .with_rest_length(0.0)
            .with_limits(0.0, self.max_stretch)
            .with_compliance(self.compliance())
            .with_linear_velocity_damping(self.damping)
    }
}

/// Point `distance` along the pointer ray, held at `height`.
pub fn pointer_target(ray: Ray3d, distance: f32, height: f32) -> Vec3 {
    let point = ray.get_point(distance);
    Vec3::new(point.x, height, point.z)
}

/// Moves `current` a frame's worth toward `target`. Never overshoots.
pub fn follow_step(current: Vec3, target: Vec3, drag_speed: f32, delta_secs: f32) -> Vec3 {
    current.lerp(target, (drag_speed * delta_secs).clamp(0.0, 1.0))
}

/// Axis-aligned box around every visible part of a body, relative to the
/// body's origin and in world orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub min: Vec3,
    pub max: Vec3,
}

impl Footprint {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(
            Self {
                min: first,
                max: first,
            },
            |footprint, point| Self {
                min: footprint.min.min(point),
                max: footprint.max.max(point),
            },
        ))
    }

    /// Footprint of parts given by their transform relative to the body and
    /// their local mesh bounds, with the body turned by `rotation`.
    pub fn from_parts(
        rotation: Quat,
        parts: impl IntoIterator<Item = (Transform, Aabb)>,
    ) -> Option<Self> {
        Self::from_points(parts.into_iter().flat_map(|(transform, aabb)| {
            let center = Vec3::from(aabb.center);
            let half = Vec3::from(aabb.half_extents);
            [-1.0, 1.0].into_iter().flat_map(move |x| {
                [-1.0, 1.0].into_iter().flat_map(move |y| {
                    [-1.0, 1.0].into_iter().map(move |z| {
                        rotation * transform.transform_point(center + half * Vec3::new(x, y, z))
                    })
                })
            })
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) / 2.0
    }
}

/// Shifts `position` on X/Z so the footprint stays inside `bounds`. The
/// offset between origin and footprint centre is kept. A footprint wider
/// than the board is centred on it along that axis.
pub fn clamp_to_grid(position: Vec3, footprint: Footprint, bounds: Rect) -> Vec3 {
    let center = position + footprint.center();
    let half = footprint.half_extents();

    let x = clamp_axis(center.x, half.x, bounds.min.x, bounds.max.x);
    let z = clamp_axis(center.z, half.z, bounds.min.y, bounds.max.y);

    Vec3::new(
        position.x + (x - center.x),
        position.y,
        position.z + (z - center.z),
    )
}

fn clamp_axis(value: f32, half: f32, min: f32, max: f32) -> f32 {
    let (low, high) = (min + half, max - half);
    if low > high {
        (min + max) / 2.0
    } else {
        value.clamp(low, high)
    }
}

/// Nearest cell and its centre, or `position` unchanged without a grid.
pub fn nearest_cell_or_passthrough(grid: Option<&Grid>, position: Vec3) -> (Option<UVec2>, Vec3) {
    grid.map_or((None, position), |grid| {
        let (cell, center) = grid.nearest_cell(position);
        (Some(cell), center)
    })
}

/// Entities that make up an active grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grab {
    pub body: Entity,
    pub follow_point: Entity,
    pub joint: Entity,
    /// Distance from the camera to the grab point along the pick ray.
    pub ray_distance: f32,
}

/// Result of advancing or completing a snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapUpdate {
    pub body: Entity,
    pub cell: Option<UVec2>,
    pub step: SnapStep,
}

/// The single drag session of the board. `Idle -> Dragging -> Snapping -> Idle`.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging(Grab),
    Snapping {
        body: Entity,
        cell: Option<UVec2>,
        motion: SnapMotion,
    },
}

impl DragSession {
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub const fn grab(&self) -> Option<&Grab> {
        match self {
            Self::Dragging(grab) => Some(grab),
            _ => None,
        }
    }

    /// Starts dragging. Refused unless idle.
    pub fn begin(&mut self, grab: Grab) -> bool {
        if !self.is_idle() {
            return false;
        }
        *self = Self::Dragging(grab);
        true
    }

    /// Switches from dragging to snapping toward `target`. Returns the grab
    /// so its follow point and joint can be torn down.
    pub fn release(
        &mut self,
        start: Vec3,
        target: Vec3,
        cell: Option<UVec2>,
        duration: f32,
    ) -> Option<Grab> {
        let Self::Dragging(grab) = *self else {
            return None;
        };
        *self = Self::Snapping {
            body: grab.body,
            cell,
            motion: SnapMotion::new(start, target, duration),
        };
        Some(grab)
    }

    /// Advances a running snap; goes idle once it finishes.
    pub fn advance(&mut self, delta_secs: f32) -> Option<SnapUpdate> {
        let Self::Snapping { body, cell, motion } = self else {
            return None;
        };
        let update = SnapUpdate {
            body: *body,
            cell: *cell,
            step: motion.tick(delta_secs),
        };
        if update.step.finished {
            *self = Self::Idle;
        }
        Some(update)
    }

    /// Ends a running snap on its target right away.
    pub fn complete(&mut self) -> Option<SnapUpdate> {
        let Self::Snapping { body, cell, motion } = self else {
            return None;
        };
        let update = SnapUpdate {
            body: *body,
            cell: *cell,
            step: motion.finish(),
        };
        *self = Self::Idle;
        Some(update)
    }

    /// Drops the session whatever its state, returning a grab to tear down.
    pub fn abandon(&mut self) -> Option<Grab> {
        let grab = self.grab().copied();
        *self = Self::Idle;
        grab
    }
}

pub struct DragPlugin;

impl Plugin for DragPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<DragAction>::default())
            .init_resource::<DragSession>()
            .add_event::<PiecePickedUp>()
            .add_event::<PieceSnapped>()
            .add_systems(
                Update,
                (
                    finish_snap_on_press,
                    pick_up,
                    follow_pointer,
                    release,
                    advance_snap,
                )
                    .chain(),
            )
            .add_systems(
                FixedPostUpdate,
                clamp_dragged_body
                    .after(PhysicsSet::StepSimulation)
                    .before(PhysicsSet::Sync),
            );
    }
}

fn grab_just_pressed(actions: &ActionState<DragAction>, touches: &Touches) -> bool {
    // Leafwing Input Manager doesn't support touch input, so we need to check for it here
    actions.just_pressed(&DragAction::Grab) || touch_just_pressed_position(touches).is_some()
}

fn grab_just_released(actions: &ActionState<DragAction>, touches: &Touches) -> bool {
    actions.just_released(&DragAction::Grab) || touch_just_released_position(touches).is_some()
}

fn write_snap_step(
    commands: &mut Commands,
    update: SnapUpdate,
    bodies: &mut Query<(&mut Transform, &mut Position), With<Piece>>,
    snapped: &mut EventWriter<PieceSnapped>,
) {
    let Ok((mut transform, mut position)) = bodies.get_mut(update.body) else {
        // The piece went away mid-snap; nothing left to move.
        return;
    };

    transform.translation = update.step.position;
    position.0 = update.step.position;

    if update.step.finished {
        commands.entity(update.body).insert((
            Settled,
            LockedAxes::ALL_LOCKED,
            LinearVelocity::ZERO,
            AngularVelocity::ZERO,
        ));
        snapped.send(PieceSnapped {
            body: update.body,
            cell: update.cell,
        });
    }
}

/// Pose of `body` if it is a piece that can still be picked up.
fn grabbable_piece(
    pieces: &Query<(&Position, &Rotation, Has<Settled>), With<Piece>>,
    body: Entity,
) -> Option<(Vec3, Quat)> {
    let Ok((position, rotation, settled)) = pieces.get(body) else {
        debug!("Press hit {body}, which is not a piece");
        return None;
    };
    if settled {
        debug!("Press hit settled piece {body}");
        return None;
    }
    Some((position.0, rotation.0))
}

/// A new press supersedes a running snap: it lands on its target first.
fn finish_snap_on_press(
    mut commands: Commands,
    cameras: Query<&ActionState<DragAction>, With<BoardCamera>>,
    touches: Res<Touches>,
    mut session: ResMut<DragSession>,
    mut bodies: Query<(&mut Transform, &mut Position), With<Piece>>,
    mut snapped: EventWriter<PieceSnapped>,
) {
    let Ok(actions) = cameras.get_single() else {
        return;
    };
    if !grab_just_pressed(actions, &touches) {
        return;
    }

    if let Some(update) = session.complete() {
        write_snap_step(&mut commands, update, &mut bodies, &mut snapped);
    }
}

fn pick_up(
    mut commands: Commands,
    windows: Query<&Window>,
    touches: Res<Touches>,
    cameras: Query<(&Camera, &GlobalTransform, &ActionState<DragAction>), With<BoardCamera>>,
    spatial_query: SpatialQuery,
    collider_parents: Query<&ColliderParent>,
    pieces: Query<(&Position, &Rotation, Has<Settled>), With<Piece>>,
    settings: Res<BlockSnapSettings>,
    mut session: ResMut<DragSession>,
    mut picked_up: EventWriter<PiecePickedUp>,
) {
    let Ok((camera, camera_transform, actions)) = cameras.get_single() else {
        error_once!("Dragging disabled: {}", ConfigurationError::MissingCamera);
        return;
    };
    if !grab_just_pressed(actions, &touches) || !session.is_idle() {
        return;
    }

    let Some(ray) = pointer_world_ray(&windows, &touches, camera, camera_transform) else {
        return;
    };

    let Some(hit) = spatial_query.cast_ray(
        ray.origin,
        ray.direction,
        MAX_PICK_DISTANCE,
        true,
        &SpatialQueryFilter::default(),
    ) else {
        debug!("Press hit nothing");
        return;
    };

    let Ok(body) = collider_parents.get(hit.entity).map(ColliderParent::get) else {
        debug!("Press hit a collider without a body");
        return;
    };

    let Some((position, rotation)) = grabbable_piece(&pieces, body) else {
        return;
    };

    let hit_point = ray.get_point(hit.distance);
    let body_anchor = rotation.inverse() * (hit_point - position);
    let link = ElasticLink::from_settings(&settings);

    let follow_point = commands
        .spawn((
            Name::new("Follow point"),
            FollowPoint,
            RigidBody::Kinematic,
            Transform::from_translation(hit_point),
        ))
        .id();
    let joint = commands
        .spawn(link.joint(follow_point, body, body_anchor))
        .id();

    commands.entity(body).insert((
        LockedAxes::ROTATION_LOCKED.lock_translation_y(),
        SleepingDisabled,
    ));

    session.begin(Grab {
        body,
        follow_point,
        joint,
        ray_distance: hit.distance,
    });
    picked_up.send(PiecePickedUp { body });
    debug!("Picked up {body} at {hit_point}");
}

fn follow_pointer(
    windows: Query<&Window>,
    touches: Res<Touches>,
    cameras: Query<(&Camera, &GlobalTransform), With<BoardCamera>>,
    session: Res<DragSession>,
    settings: Res<BlockSnapSettings>,
    time: Res<Time>,
    mut follow_points: Query<&mut Transform, With<FollowPoint>>,
) {
    let Some(grab) = session.grab() else {
        return;
    };
    let Ok((camera, camera_transform)) = cameras.get_single() else {
        return;
    };
    let Ok(mut transform) = follow_points.get_mut(grab.follow_point) else {
        return;
    };
    let Some(ray) = pointer_world_ray(&windows, &touches, camera, camera_transform) else {
        return;
    };

    let target = pointer_target(ray, grab.ray_distance, transform.translation.y);
    transform.translation = follow_step(
        transform.translation,
        target,
        settings.drag_speed,
        time.delta_secs(),
    );
}

fn release(
    mut commands: Commands,
    touches: Res<Touches>,
    cameras: Query<&ActionState<DragAction>, With<BoardCamera>>,
    grid: Option<Res<Grid>>,
    settings: Res<BlockSnapSettings>,
    mut session: ResMut<DragSession>,
    bodies: Query<&Position, With<Piece>>,
) {
    let Some(grab) = session.grab().copied() else {
        return;
    };
    let Ok(actions) = cameras.get_single() else {
        return;
    };
    if !grab_just_released(actions, &touches) {
        return;
    }

    commands.entity(grab.joint).despawn_recursive();
    commands.entity(grab.follow_point).despawn_recursive();

    let Ok(position) = bodies.get(grab.body) else {
        warn!("Dragged piece {} vanished before release", grab.body);
        session.abandon();
        return;
    };

    if grid.is_none() {
        error_once!("Snapping disabled: {}", ConfigurationError::MissingGrid);
    }
    let (cell, target) = nearest_cell_or_passthrough(grid.as_deref(), position.0);

    commands.entity(grab.body).insert((
        LockedAxes::ALL_LOCKED,
        LinearVelocity::ZERO,
        AngularVelocity::ZERO,
    ));
    commands.entity(grab.body).remove::<SleepingDisabled>();

    session.release(position.0, target, cell, settings.snap_duration);
    debug!("Released {} toward {target}", grab.body);
}

fn advance_snap(
    mut commands: Commands,
    time: Res<Time>,
    mut session: ResMut<DragSession>,
    mut bodies: Query<(&mut Transform, &mut Position), With<Piece>>,
    mut snapped: EventWriter<PieceSnapped>,
) {
    if let Some(update) = session.advance(time.delta_secs()) {
        write_snap_step(&mut commands, update, &mut bodies, &mut snapped);
    }
}

fn clamp_dragged_body(
    grid: Option<Res<Grid>>,
    session: Res<DragSession>,
    mut bodies: Query<(&mut Position, &Rotation, &Children), With<Piece>>,
    parts: Query<(&Transform, &Aabb), With<PieceBlock>>,
) {
    let Some(grab) = session.grab() else {
        return;
    };
    let Some(grid) = grid else {
        warn_once!("Bounds clamping disabled: {}", ConfigurationError::MissingGrid);
        return;
    };
    let Ok((mut position, rotation, children)) = bodies.get_mut(grab.body) else {
        return;
    };

    // Bounds appear after the first render frame
    let Some(footprint) = Footprint::from_parts(
        rotation.0,
        parts
            .iter_many(children)
            .map(|(transform, aabb)| (*transform, *aabb)),
    ) else {
        return;
    };

    let clamped = clamp_to_grid(position.0, footprint, grid.bounds());
    if clamped != position.0 {
        position.0 = clamped;
    }
}
