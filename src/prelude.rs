//! Common imports for the entire crate.

pub use bevy::prelude::*;

pub use crate::config::{CombatConfig, GameRng};
pub use crate::gameplay::agents::spawn_agent;
pub use crate::gameplay::events::{AnimationCue, Cue, DamageRequest, PlayerCommand};
pub use crate::gameplay::player::{Player, spawn_player};
pub use crate::gameplay::templates::EntityTemplate;
pub use crate::gameplay::weapons::WeaponCatalog;
pub use crate::gameplay::{CurrentTarget, Faction};
pub use crate::third_party::CollisionLayer;
pub use crate::{GameSet, SimulationState};
