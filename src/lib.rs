//! Arena skirmish: combat, targeting, and AI decision logic for a top-down 2D shooter.

pub mod config;
pub mod gameplay;
pub mod prelude;
pub mod tasks;
#[cfg(test)]
pub mod testing;
pub mod third_party;

use bevy::ecs::schedule::ScheduleLabel;
use bevy::prelude::*;

/// Whether the simulation advances. Decision loops, cooldowns, and
/// projectiles all stop while paused.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum SimulationState {
    #[default]
    Running,
    Paused,
}

/// Ordering of gameplay systems within a frame. Configured identically in
/// `Update` (frame tick) and `FixedUpdate` (decision tick).
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameSet {
    /// Player input and edge-triggered commands.
    Input,
    /// Detection, target acquisition, and agent decisions.
    Ai,
    /// Steering and velocity output.
    Movement,
    /// Fire control, projectiles, damage resolution.
    Combat,
    /// Death transitions and removal.
    Death,
}

/// Run condition shared by every gameplay system.
/// Missing state (e.g. bare test apps) counts as running.
#[must_use]
pub fn gameplay_running(state: Option<Res<State<SimulationState>>>) -> bool {
    state.is_none_or(|s| *s.get() == SimulationState::Running)
}

/// Gameplay without the physics backend. Used by the demo through [`plugin`]
/// and directly by headless tests.
pub fn core_plugin(app: &mut App) {
    app.init_state::<SimulationState>()
        .register_type::<SimulationState>();

    configure_game_sets(app, Update);
    configure_game_sets(app, FixedUpdate);

    app.add_plugins((config::plugin, gameplay::plugin));
}

fn configure_game_sets(app: &mut App, schedule: impl ScheduleLabel) {
    app.configure_sets(
        schedule,
        (
            GameSet::Input,
            GameSet::Ai,
            GameSet::Movement,
            GameSet::Combat,
            GameSet::Death,
        )
            .chain(),
    );
}

/// Full game: gameplay plus avian2d physics and line-of-sight detection.
pub fn plugin(app: &mut App) {
    app.add_plugins((core_plugin, third_party::plugin));
}
