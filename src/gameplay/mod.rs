//! Gameplay domain: combat stats, weapons, targeting, agent AI, and the player.

pub mod agents;
pub mod events;
pub mod player;
pub mod targeting;
pub mod templates;
pub mod vitals;
pub mod weapons;

use bevy::prelude::*;
use bitflags::bitflags;

use self::events::EntitySpawned;
use self::vitals::Vitals;

// === Shared Components ===

/// Side a combatant fights for. Player-faction entities get an invincibility
/// window, a finite energy pool, and a delayed death.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
#[reflect(Component)]
pub enum Faction {
    Player,
    Enemy,
}

impl Faction {
    #[must_use]
    pub const fn mask(self) -> FactionMask {
        match self {
            Self::Player => FactionMask::PLAYER,
            Self::Enemy => FactionMask::ENEMY,
        }
    }

    #[must_use]
    pub const fn opposing(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

bitflags! {
    /// Set of factions, used to filter targeting candidates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FactionMask: u8 {
        const PLAYER = 1;
        const ENEMY = 1 << 1;
    }
}

/// Factions this entity never considers as targets.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IgnoreFactions(pub FactionMask);

impl IgnoreFactions {
    /// Ignore the entity's own side.
    #[must_use]
    pub const fn allies_of(faction: Faction) -> Self {
        Self(faction.mask())
    }
}

/// Entity this combatant is currently aiming at.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct CurrentTarget(pub Option<Entity>);

/// Movement speed in world units per second.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Movement {
    pub speed: f32,
}

/// Marker: can be detected and targeted.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Targetable;

// === Observers ===

fn announce_spawn(
    add: On<Add, Vitals>,
    factions: Query<&Faction>,
    mut spawned: MessageWriter<EntitySpawned>,
) {
    if let Ok(&faction) = factions.get(add.entity) {
        spawned.write(EntitySpawned {
            entity: add.entity,
            faction,
        });
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Faction>()
        .register_type::<CurrentTarget>()
        .register_type::<Movement>()
        .register_type::<Targetable>();

    app.add_observer(announce_spawn);

    app.add_plugins((
        events::plugin,
        vitals::plugin,
        weapons::plugin,
        targeting::plugin,
        agents::plugin,
        player::plugin,
    ));
}
