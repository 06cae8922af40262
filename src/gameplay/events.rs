//! Message bus between the combat core and everything around it.
//!
//! Requests flow in (damage, death, revive, equip, player commands);
//! broadcasts flow out (deaths, health, energy, shots, drops, animation cues).
//! Every channel is a Bevy `Message`, so subscribers are plain systems with a
//! `MessageReader` and publishers are injected a `MessageWriter`.

use bevy::prelude::*;

use super::Faction;
use super::vitals::{DamageType, Hit};
use super::weapons::WeaponRef;

// === Requests ===

/// The damage sink: the only way hits reach `Vitals`.
#[derive(Message, Debug, Clone, Copy)]
pub struct DamageRequest {
    pub target: Entity,
    pub hit: Hit,
}

impl DamageRequest {
    #[must_use]
    pub const fn new(target: Entity, hit: Hit) -> Self {
        Self { target, hit }
    }
}

#[derive(Message, Debug, Clone, Copy)]
pub struct HealRequest {
    pub target: Entity,
    pub amount: f32,
}

/// Ask for the terminal death transition. Repeats are harmless.
#[derive(Message, Debug, Clone, Copy)]
pub struct DeathRequested {
    pub entity: Entity,
}

/// Pull a dying player back before removal.
#[derive(Message, Debug, Clone, Copy)]
pub struct ReviveRequested {
    pub entity: Entity,
}

/// A weapon pickup handed to an arsenal.
#[derive(Message, Debug, Clone)]
pub struct EquipWeapon {
    pub entity: Entity,
    pub weapon: WeaponRef,
}

/// Time-boxed crit chance bonus.
#[derive(Message, Debug, Clone, Copy)]
pub struct CritBonusGranted {
    pub entity: Entity,
    pub amount: f32,
    pub duration: f32,
}

/// Edge-triggered player commands.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Fire,
    ReleaseFire,
    SwitchWeapon,
}

// === Broadcasts ===

#[derive(Message, Debug, Clone, Copy)]
pub struct EntitySpawned {
    pub entity: Entity,
    pub faction: Faction,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct EntityDespawned {
    pub entity: Entity,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct EntityDied {
    pub entity: Entity,
    pub faction: Faction,
    pub position: Vec2,
}

/// Player health as a fraction of max.
#[derive(Message, Debug, Clone, Copy)]
pub struct PlayerHealthChanged {
    pub entity: Entity,
    pub ratio: f32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct EnergyChanged {
    pub entity: Entity,
    pub current: f32,
    pub max: f32,
}

/// An agent committed to a shot. Listeners use it to desynchronize fire.
#[derive(Message, Debug, Clone, Copy)]
pub struct ShotFired {
    pub shooter: Entity,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct ExplosionOccurred {
    pub position: Vec2,
    pub radius: f32,
    pub force: f32,
    pub damage: f32,
    pub damage_type: DamageType,
    pub source: Option<Entity>,
    pub from_player: bool,
}

/// An evicted weapon left in the world.
#[derive(Message, Debug, Clone)]
pub struct WeaponDropped {
    pub owner: Entity,
    pub weapon: WeaponRef,
    pub prefab: String,
    pub position: Vec2,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct DeathVisualRequested {
    pub entity: Entity,
    pub position: Vec2,
    pub flipped: bool,
}

#[derive(Message, Debug, Clone)]
pub struct LootDropped {
    pub item: String,
    pub position: Vec2,
}

/// The player's revive window reached its second stage.
#[derive(Message, Debug, Clone, Copy)]
pub struct DeathScreenRequested {
    pub entity: Entity,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct PlayerRevived {
    pub entity: Entity,
}

/// Damage the player dealt, for popups.
#[derive(Message, Debug, Clone, Copy)]
pub struct DamageDealt {
    pub target: Entity,
    pub amount: f32,
    pub position: Vec2,
}

// === Animation Sink ===

/// Visual command for an entity. Fire-and-forget; nothing reads back.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct AnimationCue {
    pub entity: Entity,
    pub cue: Cue,
}

impl AnimationCue {
    #[must_use]
    pub const fn new(entity: Entity, cue: Cue) -> Self {
        Self { entity, cue }
    }
}

/// Closed set of animation commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cue {
    /// Run cycle scaled by speed.
    Run { speed: f32 },
    Face { flipped: bool },
    Jump { active: bool },
    Shoot,
    StopShooting,
    Dead,
    Frozen { active: bool },
    HitFlash { color: Color, duration: f32 },
    /// Beam endpoint while a beam is held without a target.
    Beam { end: Vec2 },
}

impl Cue {
    /// Animator trigger driven by this cue, if any. Cues without a trigger
    /// carry parameters only (flip, tint, beam geometry).
    #[must_use]
    pub const fn trigger(&self) -> Option<&'static str> {
        match self {
            Self::Run { .. } => Some("Run"),
            Self::Jump { .. } => Some("Jump"),
            Self::Shoot => Some("Shoot"),
            Self::StopShooting => Some("StopShoot"),
            Self::Dead => Some("Dead"),
            Self::Frozen { .. } => Some("Frozen"),
            Self::Face { .. } | Self::HitFlash { .. } | Self::Beam { .. } => None,
        }
    }
}

// === Plugin ===

pub(crate) fn plugin(app: &mut App) {
    app.add_message::<DamageRequest>()
        .add_message::<HealRequest>()
        .add_message::<DeathRequested>()
        .add_message::<ReviveRequested>()
        .add_message::<EquipWeapon>()
        .add_message::<CritBonusGranted>()
        .add_message::<PlayerCommand>()
        .add_message::<EntitySpawned>()
        .add_message::<EntityDespawned>()
        .add_message::<EntityDied>()
        .add_message::<PlayerHealthChanged>()
        .add_message::<EnergyChanged>()
        .add_message::<ShotFired>()
        .add_message::<ExplosionOccurred>()
        .add_message::<WeaponDropped>()
        .add_message::<DeathVisualRequested>()
        .add_message::<LootDropped>()
        .add_message::<DeathScreenRequested>()
        .add_message::<PlayerRevived>()
        .add_message::<DamageDealt>()
        .add_message::<AnimationCue>();
}
