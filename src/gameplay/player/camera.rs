//! Camera framing: zoom out with the locked target's distance and lead the
//! view toward where the action is.

use bevy::prelude::*;

use super::{Player, PlayerInput};
use crate::config::CombatConfig;
use crate::gameplay::weapons::Aim;
use crate::gameplay::{CurrentTarget, Movement};
use crate::{GameSet, gameplay_running};

/// Where the camera should look and how far out, recomputed every frame.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Reflect)]
#[reflect(Component)]
pub struct CameraFraming {
    /// Orthographic scale: world units per pixel.
    pub zoom: f32,
    pub focus: Vec2,
}

/// Frame `position`. A target within lock distance widens the view and pulls
/// focus halfway along the aim; otherwise the view leads the movement.
#[must_use]
pub fn frame_camera(
    position: Vec2,
    input: Vec2,
    speed: f32,
    target: Option<Vec2>,
    aim_direction: Vec2,
    config: &CombatConfig,
) -> CameraFraming {
    let locked = target
        .map(|t| position.distance(t))
        .filter(|&distance| distance < config.camera_lock_distance);

    match locked {
        Some(distance) => CameraFraming {
            zoom: (config.default_zoom + distance * config.zoom_per_unit)
                .clamp(config.default_zoom, config.zoom_cap),
            focus: position + aim_direction * distance / 2.0,
        },
        None => CameraFraming {
            zoom: config.default_zoom,
            focus: position + input * speed / 2.0,
        },
    }
}

// === Systems ===

fn update_camera_framing(
    config: Res<CombatConfig>,
    mut players: Query<
        (
            &GlobalTransform,
            &PlayerInput,
            &Movement,
            &CurrentTarget,
            &Aim,
            &mut CameraFraming,
        ),
        With<Player>,
    >,
    positions: Query<&GlobalTransform>,
) {
    for (transform, input, movement, target, aim, mut framing) in &mut players {
        let target_position = target
            .0
            .and_then(|t| positions.get(t).ok())
            .map(|t| t.translation().xy());
        *framing = frame_camera(
            transform.translation().xy(),
            input.resolve_input(),
            movement.speed,
            target_position,
            aim.direction,
            &config,
        );
    }
}

/// Push the player's framing onto the 2D camera.
pub fn apply_camera_framing(
    framing: Single<&CameraFraming, With<Player>>,
    mut camera: Single<(&mut Transform, &mut Projection), With<Camera2d>>,
) {
    let (transform, projection) = &mut *camera;
    transform.translation.x = framing.focus.x;
    transform.translation.y = framing.focus.y;
    if let Projection::Orthographic(ref mut ortho) = **projection {
        ortho.scale = framing.zoom;
    }
}

pub(super) fn plugin(app: &mut App) {
    app.register_type::<CameraFraming>();

    app.add_systems(
        Update,
        (update_camera_framing, apply_camera_framing)
            .chain()
            .in_set(GameSet::Movement)
            .run_if(gameplay_running),
    );
}
