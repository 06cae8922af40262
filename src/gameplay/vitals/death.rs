//! Death resolution: the one-shot terminal transition, loot, and removal.

use bevy::prelude::*;
use rand::Rng;

use super::effects::StatusEffects;
use super::{DamageType, Vitals};
use crate::config::{CombatConfig, GameRng};
use crate::gameplay::Faction;
use crate::gameplay::events::{
    DeathRequested, DeathVisualRequested, EntityDespawned, EntityDied, ExplosionOccurred,
    LootDropped,
};
use crate::gameplay::weapons::Aim;
use crate::{GameSet, gameplay_running};

/// `SystemSet` for death resolution. Other systems order against this
/// instead of referencing the function directly.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeathCheck;

// === Components ===

/// Area burst released when the carrier dies.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Detonation {
    pub radius: f32,
    pub force: f32,
    pub damage: f32,
    pub damage_type: DamageType,
}

// === Resources ===

/// Items non-player entities may drop. Each entry rolls independently.
#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct LootTable {
    pub entries: Vec<String>,
}

impl Default for LootTable {
    fn default() -> Self {
        Self {
            entries: vec!["energy_cell".to_string(), "med_kit".to_string()],
        }
    }
}

/// Roll the loot for one corpse: each entry drops 1–2 items when its roll
/// beats `chance`, scattered up to `scatter` around `position`.
pub fn roll_loot(
    table: &LootTable,
    position: Vec2,
    chance: f32,
    scatter: f32,
    rng: &mut impl Rng,
) -> Vec<LootDropped> {
    let mut drops = Vec::new();
    for item in &table.entries {
        if rng.random::<f32>() <= chance {
            continue;
        }
        let count = rng.random_range(1..3);
        for _ in 0..count {
            let offset = Vec2::new(
                rng.random_range(-scatter..=scatter),
                rng.random_range(-scatter..=scatter),
            );
            drops.push(LootDropped {
                item: item.clone(),
                position: position + offset,
            });
        }
    }
    drops
}

// === Systems ===

/// Performs the terminal transition for every `DeathRequested`. Requests for
/// entities already dead (or gone) are ignored, so repeated requests yield a
/// single set of notifications.
fn resolve_deaths(
    mut requests: MessageReader<DeathRequested>,
    config: Res<CombatConfig>,
    loot_table: Res<LootTable>,
    mut rng: ResMut<GameRng>,
    mut dying: Query<(
        &mut Vitals,
        Option<&GlobalTransform>,
        Option<&Aim>,
        Option<&Detonation>,
        Option<&mut StatusEffects>,
    )>,
    mut died: MessageWriter<EntityDied>,
    mut visuals: MessageWriter<DeathVisualRequested>,
    mut loot: MessageWriter<LootDropped>,
    mut explosions: MessageWriter<ExplosionOccurred>,
    mut despawned: MessageWriter<EntityDespawned>,
    mut commands: Commands,
) {
    for request in requests.read() {
        let Ok((mut vitals, transform, aim, detonation, effects)) = dying.get_mut(request.entity)
        else {
            continue;
        };
        if !vitals.die() {
            continue;
        }
        if let Some(mut effects) = effects {
            effects.clear();
        }

        let position = transform.map(|t| t.translation().xy()).unwrap_or_default();
        let faction = vitals.faction();
        info!("{faction:?} {:?} died at {position}", request.entity);

        died.write(EntityDied {
            entity: request.entity,
            faction,
            position,
        });
        visuals.write(DeathVisualRequested {
            entity: request.entity,
            position,
            flipped: aim.is_some_and(|a| a.flipped),
        });

        if faction != Faction::Player {
            loot.write_batch(roll_loot(
                &loot_table,
                position,
                config.loot_chance,
                config.loot_scatter,
                &mut rng.0,
            ));
        }

        if let Some(detonation) = detonation {
            explosions.write(ExplosionOccurred {
                position,
                radius: detonation.radius,
                force: detonation.force,
                damage: detonation.damage,
                damage_type: detonation.damage_type,
                source: Some(request.entity),
                from_player: faction == Faction::Player,
            });
        }

        despawned.write(EntityDespawned {
            entity: request.entity,
        });
        commands.entity(request.entity).despawn();
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Detonation>()
        .register_type::<LootTable>()
        .init_resource::<LootTable>();

    app.add_systems(
        Update,
        resolve_deaths
            .in_set(DeathCheck)
            .in_set(GameSet::Death)
            .run_if(gameplay_running),
    );
}
