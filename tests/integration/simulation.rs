//! Tests for the simulation state and the combined gameplay plugins.

use std::time::Duration;

use arena_skirmish::gameplay::player::PlayerInput;
use arena_skirmish::gameplay::targeting::CombatantIndex;
use arena_skirmish::prelude::*;
use avian2d::prelude::LinearVelocity;
use bevy::input::InputPlugin;
use bevy::state::app::StatesPlugin;
use bevy::time::TimeUpdateStrategy;
use bevy::transform::TransformPlugin;
use pretty_assertions::assert_eq;

fn create_game_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins((StatesPlugin, InputPlugin, TransformPlugin));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(
        100,
    )));
    app.add_plugins(arena_skirmish::core_plugin);
    app.insert_resource(GameRng::seeded(7));
    app
}

fn spawn_player_at(app: &mut App, position: Vec2) -> Entity {
    let world = app.world_mut();
    let entity = {
        let mut commands = world.commands();
        spawn_player(
            &mut commands,
            &EntityTemplate::player(),
            position,
            &WeaponCatalog::default(),
            &CombatConfig::default(),
        )
    };
    world.flush();
    entity
}

fn spawn_grunt_at(app: &mut App, position: Vec2) -> Entity {
    let world = app.world_mut();
    let mut rng = GameRng::seeded(11);
    let entity = {
        let mut commands = world.commands();
        spawn_agent(
            &mut commands,
            &EntityTemplate::grunt(),
            position,
            &WeaponCatalog::default(),
            &CombatConfig::default(),
            &mut rng.0,
        )
    };
    world.flush();
    entity
}

fn pause(app: &mut App) {
    app.world_mut()
        .resource_mut::<NextState<SimulationState>>()
        .set(SimulationState::Paused);
}

#[test]
fn simulation_initializes_running() {
    let app = create_game_app();
    let state = app.world().resource::<State<SimulationState>>();
    assert_eq!(*state.get(), SimulationState::Running);
}

#[test]
fn can_pause_and_resume() {
    let mut app = create_game_app();
    pause(&mut app);
    app.update();
    assert_eq!(
        *app.world().resource::<State<SimulationState>>().get(),
        SimulationState::Paused
    );

    app.world_mut()
        .resource_mut::<NextState<SimulationState>>()
        .set(SimulationState::Running);
    app.update();
    assert_eq!(
        *app.world().resource::<State<SimulationState>>().get(),
        SimulationState::Running
    );
}

#[test]
fn player_moves_with_stick_input() {
    let mut app = create_game_app();
    let player = spawn_player_at(&mut app, Vec2::ZERO);
    app.world_mut()
        .get_mut::<PlayerInput>(player)
        .unwrap()
        .virtual_stick = Vec2::X;
    app.update();

    let velocity = app.world().get::<LinearVelocity>(player).unwrap();
    assert_eq!(velocity.0, Vec2::X * EntityTemplate::player().speed);
}

#[test]
fn paused_simulation_holds_player_still() {
    let mut app = create_game_app();
    let player = spawn_player_at(&mut app, Vec2::ZERO);
    pause(&mut app);
    app.world_mut()
        .get_mut::<PlayerInput>(player)
        .unwrap()
        .virtual_stick = Vec2::X;
    app.update();

    let velocity = app.world().get::<LinearVelocity>(player).unwrap();
    assert_eq!(velocity.0, Vec2::ZERO);
}

#[test]
fn combatants_are_indexed_at_their_positions() {
    let mut app = create_game_app();
    let player = spawn_player_at(&mut app, Vec2::ZERO);
    let grunt = spawn_grunt_at(&mut app, Vec2::new(3.0, 0.0));
    // Transforms propagate in PostUpdate; the index reads them next frame.
    app.update();
    app.update();

    let index = app.world().resource::<CombatantIndex>();
    let near_grunt: Vec<Entity> = index
        .within(Vec2::new(3.0, 0.0), 0.5)
        .iter()
        .map(|c| c.entity)
        .collect();
    assert_eq!(near_grunt, vec![grunt]);

    let everyone = index.within(Vec2::ZERO, 5.0);
    assert_eq!(everyone.len(), 2);
    assert!(everyone.iter().any(|c| c.entity == player));
}
