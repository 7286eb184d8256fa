//! Pointer source shared by the bits: one pointer, either the mouse cursor
//! or the first active touch, projected into the world through a camera.

use bevy::input::touch::Touch;
use bevy::prelude::*;

/// Current screen position of the pointer, if the cursor is inside the
/// window or a finger is on the screen.
pub fn pointer_screen_position(windows: &Query<&Window>, touches: &Touches) -> Option<Vec2> {
    if let Some(touch) = touches.iter().next() {
        return Some(touch.position());
    }

    windows.get_single().ok()?.cursor_position()
}

/// Screen position of a touch that started this frame.
pub fn touch_just_pressed_position(touches: &Touches) -> Option<Vec2> {
    touches.iter_just_pressed().next().map(Touch::position)
}

/// Screen position of a touch that ended this frame.
pub fn touch_just_released_position(touches: &Touches) -> Option<Vec2> {
    touches.iter_just_released().next().map(Touch::position)
}

/// Projects a screen position through the camera into a world-space ray.
pub fn pointer_ray(
    camera: &Camera,
    camera_transform: &GlobalTransform,
    screen_position: Vec2,
) -> Option<Ray3d> {
    camera
        .viewport_to_world(camera_transform, screen_position)
        .ok()
}

/// World-space ray under the pointer, if both a pointer and a camera exist.
pub fn pointer_world_ray(
    windows: &Query<&Window>,
    touches: &Touches,
    camera: &Camera,
    camera_transform: &GlobalTransform,
) -> Option<Ray3d> {
    let position = pointer_screen_position(windows, touches)?;
    pointer_ray(camera, camera_transform, position)
}
