//! Testing utilities for Bevy systems.

#![cfg(test)]

use std::time::Duration;

use bevy::ecs::query::QueryFilter;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{CombatConfig, GameRng};
use crate::gameplay::events;
use crate::gameplay::templates::EntityTemplate;
use crate::gameplay::vitals::Vitals;
use crate::gameplay::vitals::death::LootTable;
use crate::gameplay::vitals::effects::StatusEffects;
use crate::gameplay::weapons::{WeaponCatalog, spawn_loadout};
use crate::gameplay::{CurrentTarget, IgnoreFactions, Movement, Targetable};

/// Seed shared by every deterministic test.
pub const TEST_SEED: u64 = 0x5EED;

/// Fixed frame length of test apps.
pub const TEST_FRAME: Duration = Duration::from_millis(100);

/// Creates a minimal app for testing with essential plugins.
pub fn create_test_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app
}

/// Minimal app with the message bus, combat resources, and a fixed 100ms
/// frame so timers advance deterministically.
pub fn create_combat_test_app() -> App {
    let mut app = create_test_app();
    app.insert_resource(TimeUpdateStrategy::ManualDuration(TEST_FRAME));
    events::plugin(&mut app);
    app.init_resource::<CombatConfig>()
        .insert_resource(GameRng::seeded(TEST_SEED))
        .init_resource::<LootTable>();
    app
}

/// Deterministic generator for pure-function tests.
pub fn seeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(TEST_SEED)
}

/// Helper to advance the app by multiple frames.
pub fn tick_multiple(app: &mut App, count: usize) {
    for _ in 0..count {
        app.update();
    }
}

/// Assert how many entities match the query filter `F`.
pub fn assert_entity_count<F: QueryFilter>(app: &mut App, expected: usize) {
    let world = app.world_mut();
    let count = world.query_filtered::<Entity, F>().iter(world).count();
    assert_eq!(
        count,
        expected,
        "expected {expected} entities matching {}, found {count}",
        std::any::type_name::<F>()
    );
}

/// Spawn a combatant with the components decision loops and fire control
/// expect, minus physics.
pub fn spawn_test_combatant(world: &mut World, template: &EntityTemplate, position: Vec2) -> Entity {
    let catalog = WeaponCatalog::default();
    world
        .spawn((
            Name::new(template.name.clone()),
            template.faction,
            IgnoreFactions::allies_of(template.faction),
            Vitals::from_template(template),
            StatusEffects::default(),
            CurrentTarget::default(),
            Movement {
                speed: template.speed,
            },
            Targetable,
            spawn_loadout(template, &catalog),
            Transform::from_translation(position.extend(0.0)),
            GlobalTransform::from_translation(position.extend(0.0)),
        ))
        .id()
}

// === Message Capture ===

/// Every `T` seen since the app started.
#[derive(Resource)]
pub struct Captured<T: Message>(pub Vec<T>);

impl<T: Message> Default for Captured<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

fn collect_messages<T: Message + Clone>(
    mut reader: MessageReader<T>,
    mut captured: ResMut<Captured<T>>,
) {
    captured.0.extend(reader.read().cloned());
}

/// Record every `T` written during updates, readable through [`captured`].
/// The message type must already be registered.
pub fn capture_messages<T: Message + Clone>(app: &mut App) {
    app.init_resource::<Captured<T>>();
    app.add_systems(Last, collect_messages::<T>);
}

pub fn captured<T: Message + Clone>(app: &App) -> Vec<T> {
    app.world()
        .get_resource::<Captured<T>>()
        .map(|captured| captured.0.clone())
        .unwrap_or_default()
}
