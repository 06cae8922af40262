//! Spawn templates: the immutable data a combatant is built from.

use super::Faction;
use super::vitals::DamageType;

/// Impulse-based dash used by agents that can jump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpProfile {
    /// Seconds between jumps.
    pub cooldown: f32,
    pub force: f32,
    /// Seconds the impulse is held.
    pub duration: f32,
}

/// Jump duration shared by every jumping template.
pub const JUMP_DURATION: f32 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Archetype {
    Standard,
    /// Self-destructs next to the player and explodes on death.
    Kamikaze {
        damage: f32,
        damage_type: DamageType,
    },
}

/// Everything copied onto a combatant when it spawns.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTemplate {
    pub name: String,
    pub faction: Faction,
    pub max_health: f32,
    pub resistances: Vec<DamageType>,
    pub speed: f32,
    /// Aim range is rolled uniformly in `[min, max)` at spawn.
    pub aim_range: (f32, f32),
    /// Detector reach.
    pub search_range: f32,
    /// Upper bound (exclusive, whole seconds) of the post-shot cooldown roll.
    pub attack_delay: u32,
    /// Player energy pool. Ignored for enemies, whose energy is unbounded.
    pub max_energy: f32,
    pub permanent_crit: f32,
    /// Catalogue name of the starting weapon.
    pub weapon: Option<&'static str>,
    /// Catalogue name of the unarmed fallback (player only).
    pub unarmed: Option<&'static str>,
    pub jump: Option<JumpProfile>,
    pub archetype: Archetype,
}

impl EntityTemplate {
    #[must_use]
    pub fn player() -> Self {
        Self {
            name: "Player".to_string(),
            faction: Faction::Player,
            max_health: 100.0,
            resistances: vec![DamageType::Fire, DamageType::Poison, DamageType::Ice],
            speed: 5.0,
            aim_range: (10.0, 10.0),
            search_range: 10.0,
            attack_delay: 0,
            max_energy: 200.0,
            permanent_crit: 0.0,
            weapon: Some("pistol"),
            unarmed: Some("fists"),
            jump: None,
            archetype: Archetype::Standard,
        }
    }

    #[must_use]
    pub fn grunt() -> Self {
        Self {
            name: "Grunt".to_string(),
            faction: Faction::Enemy,
            max_health: 30.0,
            resistances: vec![DamageType::Fire, DamageType::Electric],
            speed: 2.5,
            aim_range: (4.0, 6.0),
            search_range: 14.0,
            attack_delay: 2,
            max_energy: 0.0,
            permanent_crit: 0.0,
            weapon: Some("pistol"),
            unarmed: None,
            jump: None,
            archetype: Archetype::Standard,
        }
    }

    #[must_use]
    pub fn sniper() -> Self {
        Self {
            name: "Sniper".to_string(),
            max_health: 20.0,
            speed: 2.0,
            aim_range: (9.0, 12.0),
            search_range: 16.0,
            attack_delay: 3,
            weapon: Some("laser"),
            ..Self::grunt()
        }
    }

    #[must_use]
    pub fn kamikaze() -> Self {
        Self {
            name: "Kamikaze".to_string(),
            max_health: 15.0,
            speed: 4.0,
            aim_range: (0.5, 1.0),
            weapon: None,
            archetype: Archetype::Kamikaze {
                damage: 25.0,
                damage_type: DamageType::Fire,
            },
            ..Self::grunt()
        }
    }

    #[must_use]
    pub fn jumper() -> Self {
        Self {
            name: "Jumper".to_string(),
            max_health: 40.0,
            speed: 3.0,
            aim_range: (2.0, 3.0),
            weapon: Some("sword"),
            jump: Some(JumpProfile {
                cooldown: 3.0,
                force: 9.0,
                duration: JUMP_DURATION,
            }),
            ..Self::grunt()
        }
    }

    #[must_use]
    pub fn with_resistances(mut self, resistances: Vec<DamageType>) -> Self {
        self.resistances = resistances;
        self
    }

    #[must_use]
    pub fn with_weapon(mut self, weapon: Option<&'static str>) -> Self {
        self.weapon = weapon;
        self
    }
}
