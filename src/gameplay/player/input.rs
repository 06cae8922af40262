//! Keyboard reader: WASD/arrows into [`PlayerInput`], Space and Q into
//! [`PlayerCommand`]s, Escape toggles the simulation.

use bevy::prelude::*;

use super::{Player, PlayerInput};
use crate::gameplay::events::PlayerCommand;
use crate::{GameSet, SimulationState, gameplay_running};

/// Unit movement vector from the held direction keys.
#[must_use]
pub fn movement_axis(keyboard: &ButtonInput<KeyCode>) -> Vec2 {
    let mut axis = Vec2::ZERO;
    if keyboard.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]) {
        axis.x += 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]) {
        axis.x -= 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]) {
        axis.y += 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]) {
        axis.y -= 1.0;
    }
    axis.normalize_or_zero()
}

/// Edge-triggered commands for this frame, in press order.
#[must_use]
pub fn edge_commands(keyboard: &ButtonInput<KeyCode>) -> Vec<PlayerCommand> {
    let mut commands = Vec::new();
    if keyboard.just_pressed(KeyCode::Space) {
        commands.push(PlayerCommand::Fire);
    }
    if keyboard.just_released(KeyCode::Space) {
        commands.push(PlayerCommand::ReleaseFire);
    }
    if keyboard.just_pressed(KeyCode::KeyQ) {
        commands.push(PlayerCommand::SwitchWeapon);
    }
    commands
}

fn read_keyboard(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut players: Query<&mut PlayerInput, With<Player>>,
    mut commands: MessageWriter<PlayerCommand>,
) {
    let axis = movement_axis(&keyboard);
    for mut input in &mut players {
        input.device = axis;
    }
    commands.write_batch(edge_commands(&keyboard));
}

fn toggle_pause(
    keyboard: Res<ButtonInput<KeyCode>>,
    state: Res<State<SimulationState>>,
    mut next: ResMut<NextState<SimulationState>>,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }
    match state.get() {
        SimulationState::Running => next.set(SimulationState::Paused),
        SimulationState::Paused => next.set(SimulationState::Running),
    }
}

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        (
            read_keyboard
                .in_set(GameSet::Input)
                .run_if(gameplay_running),
            toggle_pause.run_if(resource_exists::<State<SimulationState>>),
        )
            .run_if(resource_exists::<ButtonInput<KeyCode>>),
    );
}
