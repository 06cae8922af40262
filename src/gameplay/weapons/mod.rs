//! Weapon inventory and fire control: definitions, the per-owner arsenal,
//! crit rolls, projectiles, and the systems that drive them.

pub mod arsenal;
pub mod crit;
mod fire;
pub mod projectile;

use std::sync::Arc;

use bevy::prelude::*;
use thiserror::Error;

use super::vitals::DamageType;

pub use self::arsenal::{
    AimContext, Arsenal, FireOutcome, FireTask, FiringParams, Shot, SlotId, SlotRing, TargetPoint,
    WeaponSlot,
};
pub use self::fire::{FireTrigger, spawn_loadout};

/// `SystemSet` where fired shots turn into damage requests. Vitals reads
/// damage after it; status effects write theirs before it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct HitResolution;

// === Constants ===

/// Slots an arsenal holds unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 2;

/// Lifetime of a melee strike hitbox, in seconds.
pub const MELEE_STRIKE_LIFETIME: f32 = 0.1;

/// Blast radius of explosive projectiles.
pub const EXPLOSION_RADIUS: f32 = 2.0;

/// Knockback force of explosive projectiles.
pub const EXPLOSION_FORCE: f32 = 40.0;

// === Errors ===

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FireError {
    #[error("no weapon equipped")]
    NoWeapon,
    #[error("weapon is cooling down")]
    CoolingDown,
    #[error("not enough energy")]
    InsufficientEnergy,
    #[error("weapon `{weapon}` has no projectile prototype")]
    MissingProjectile { weapon: String },
    #[error("shooter is frozen")]
    Frozen,
}

impl FireError {
    /// Whether the failure should be surfaced as a warning. Cooldown and energy
    /// gates are normal play and stay silent.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::MissingProjectile { .. })
    }
}

// === Definitions ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum WeaponKind {
    /// One projectile per trigger pull.
    Single,
    /// `bullet_count` projectiles spaced by `time_between_shots`.
    Burst,
    /// `bullet_count` simultaneous projectiles with independent spread.
    Shotgun,
    /// Continuous link gated by energy instead of a cooldown.
    Beam,
    /// Instantaneous short-lived strike.
    Melee,
}

/// Collider prototype for projectile-based weapons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectilePrototype {
    pub radius: f32,
}

/// Immutable weapon template, shared between every slot holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponDefinition {
    pub name: String,
    pub kind: WeaponKind,
    pub damage: f32,
    /// Cooldown between trigger pulls, in seconds. Beam tick interval for beams.
    pub fire_rate: f32,
    /// Max deviation in degrees, either side of the aim vector.
    pub spread: f32,
    pub bullet_count: u32,
    pub time_between_shots: f32,
    pub energy_cost: f32,
    pub crit_chance: f32,
    pub aim_range: f32,
    /// Projectiles home on the current target.
    pub autotarget: bool,
    pub explosive: bool,
    /// Player trigger stays held after a shot.
    pub fully_auto: bool,
    pub bullet_speed: f32,
    pub bullet_lifetime: f32,
    pub damage_type: DamageType,
    pub effect_chance: f32,
    /// World prefab left behind when this weapon is evicted.
    pub drop_prefab: Option<String>,
    pub projectile: Option<ProjectilePrototype>,
}

/// Shared handle to a weapon definition.
pub type WeaponRef = Arc<WeaponDefinition>;

impl WeaponDefinition {
    #[must_use]
    pub fn pistol() -> Self {
        Self {
            name: "pistol".to_string(),
            kind: WeaponKind::Single,
            damage: 6.0,
            fire_rate: 0.35,
            spread: 3.0,
            bullet_count: 1,
            time_between_shots: 0.0,
            energy_cost: 1.0,
            crit_chance: 0.05,
            aim_range: 10.0,
            autotarget: false,
            explosive: false,
            fully_auto: false,
            bullet_speed: 18.0,
            bullet_lifetime: 1.5,
            damage_type: DamageType::Physical,
            effect_chance: 0.0,
            drop_prefab: Some("pickup_pistol".to_string()),
            projectile: Some(ProjectilePrototype { radius: 0.15 }),
        }
    }

    #[must_use]
    pub fn smg() -> Self {
        Self {
            name: "smg".to_string(),
            kind: WeaponKind::Burst,
            damage: 3.0,
            fire_rate: 0.5,
            spread: 6.0,
            bullet_count: 3,
            time_between_shots: 0.08,
            energy_cost: 2.0,
            fully_auto: true,
            drop_prefab: Some("pickup_smg".to_string()),
            ..Self::pistol()
        }
    }

    #[must_use]
    pub fn shotgun() -> Self {
        Self {
            name: "shotgun".to_string(),
            kind: WeaponKind::Shotgun,
            damage: 4.0,
            fire_rate: 0.8,
            spread: 15.0,
            bullet_count: 5,
            energy_cost: 3.0,
            aim_range: 6.0,
            bullet_lifetime: 0.5,
            drop_prefab: Some("pickup_shotgun".to_string()),
            ..Self::pistol()
        }
    }

    #[must_use]
    pub fn laser() -> Self {
        Self {
            name: "laser".to_string(),
            kind: WeaponKind::Beam,
            damage: 2.0,
            fire_rate: 0.1,
            spread: 0.0,
            energy_cost: 0.5,
            crit_chance: 0.02,
            aim_range: 12.0,
            fully_auto: true,
            damage_type: DamageType::Electric,
            effect_chance: 0.1,
            drop_prefab: Some("pickup_laser".to_string()),
            projectile: None,
            ..Self::pistol()
        }
    }

    #[must_use]
    pub fn sword() -> Self {
        Self {
            name: "sword".to_string(),
            kind: WeaponKind::Melee,
            damage: 12.0,
            fire_rate: 0.6,
            spread: 0.0,
            energy_cost: 2.0,
            crit_chance: 0.1,
            aim_range: 1.5,
            bullet_speed: 0.0,
            bullet_lifetime: MELEE_STRIKE_LIFETIME,
            drop_prefab: Some("pickup_sword".to_string()),
            projectile: Some(ProjectilePrototype { radius: 0.8 }),
            ..Self::pistol()
        }
    }

    #[must_use]
    pub fn rocket_launcher() -> Self {
        Self {
            name: "rocket_launcher".to_string(),
            kind: WeaponKind::Burst,
            damage: 15.0,
            fire_rate: 1.5,
            spread: 2.0,
            bullet_count: 2,
            time_between_shots: 0.25,
            energy_cost: 8.0,
            autotarget: true,
            explosive: true,
            bullet_speed: 9.0,
            bullet_lifetime: 2.5,
            damage_type: DamageType::Fire,
            effect_chance: 0.3,
            drop_prefab: Some("pickup_rocket_launcher".to_string()),
            projectile: Some(ProjectilePrototype { radius: 0.3 }),
            ..Self::pistol()
        }
    }

    /// Always-available unarmed strike. Never dropped.
    #[must_use]
    pub fn fists() -> Self {
        Self {
            name: "fists".to_string(),
            damage: 4.0,
            fire_rate: 0.4,
            energy_cost: 0.0,
            crit_chance: 0.05,
            aim_range: 1.2,
            drop_prefab: None,
            projectile: Some(ProjectilePrototype { radius: 0.5 }),
            ..Self::sword()
        }
    }

    /// Whether firing spawns projectiles (everything except beams).
    #[must_use]
    pub const fn uses_projectile(&self) -> bool {
        !matches!(self.kind, WeaponKind::Beam)
    }
}

/// Named weapon definitions. Templates refer to weapons by name.
#[derive(Resource, Debug, Clone)]
pub struct WeaponCatalog {
    weapons: Vec<WeaponRef>,
}

impl Default for WeaponCatalog {
    fn default() -> Self {
        Self::new([
            WeaponDefinition::pistol(),
            WeaponDefinition::smg(),
            WeaponDefinition::shotgun(),
            WeaponDefinition::laser(),
            WeaponDefinition::sword(),
            WeaponDefinition::rocket_launcher(),
            WeaponDefinition::fists(),
        ])
    }
}

impl WeaponCatalog {
    pub fn new(definitions: impl IntoIterator<Item = WeaponDefinition>) -> Self {
        Self {
            weapons: definitions.into_iter().map(Arc::new).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<WeaponRef> {
        self.weapons.iter().find(|w| w.name == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeaponRef> {
        self.weapons.iter()
    }
}

// === Aim ===

/// Facing toward the current target. Pure orientation; decisions never read it
/// back except for flipping death visuals.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Aim {
    /// Unit vector.
    pub direction: Vec2,
    /// Degrees, counter-clockwise from +X.
    pub angle: f32,
    pub flipped: bool,
}

impl Default for Aim {
    fn default() -> Self {
        Self {
            direction: Vec2::X,
            angle: 0.0,
            flipped: false,
        }
    }
}

impl Aim {
    /// Point toward `target`, or drop to the idle pose when there is none.
    /// The idle pose keeps the last horizontal facing.
    pub fn point_at(&mut self, origin: Vec2, target: Option<Vec2>) {
        match target.and_then(|t| (t - origin).try_normalize()) {
            Some(direction) => self.face(direction),
            None => {
                self.angle = 0.0;
                self.direction = if self.flipped { Vec2::NEG_X } else { Vec2::X };
            }
        }
    }

    /// Point along an explicit direction. Zero vectors are ignored.
    pub fn face(&mut self, direction: Vec2) {
        let Some(direction) = direction.try_normalize() else {
            return;
        };
        self.direction = direction;
        self.angle = direction.y.atan2(direction.x).to_degrees();
        if direction.x != 0.0 {
            self.flipped = direction.x < 0.0;
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Aim>()
        .register_type::<WeaponKind>()
        .init_resource::<WeaponCatalog>();

    app.add_plugins((fire::plugin, projectile::plugin));
}
