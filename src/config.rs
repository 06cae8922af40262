//! Tuning values and the shared random source.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// === Constants ===

/// Post-hit invincibility granted to the player by a non-effect hit (seconds).
pub const INVINCIBILITY_WINDOW: f32 = 0.4;

/// First stage of the player's delayed death, before the dead screen (seconds).
pub const DEATH_SCREEN_DELAY: f32 = 2.0;

/// Second stage of the player's delayed death, before removal (seconds).
pub const REMOVAL_DELAY: f32 = 1.0;

/// Impulse applied away from the damage source.
pub const KNOCKBACK_IMPULSE: f32 = 16.0;

/// Seconds an approach may run before an unreached target is dropped.
pub const REACH_TIMEOUT: f32 = 5.0;

/// Seconds between player target-acquisition polls.
pub const ACQUISITION_INTERVAL: f32 = 0.1;

/// Seconds between detector sweeps.
pub const DETECTION_INTERVAL: f32 = 0.05;

/// Distance at which a kamikaze agent detonates on a player.
pub const KAMIKAZE_RADIUS: f32 = 1.0;

/// Seed used when none is configured, so a fresh run is reproducible.
pub const DEFAULT_SEED: u64 = 0x5eed_cafe;

// === Resources ===

/// Global combat tuning. Systems read this instead of module constants so the
/// demo and tests can override individual values.
#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct CombatConfig {
    pub invincibility_window: f32,
    pub death_screen_delay: f32,
    pub removal_delay: f32,
    pub knockback_impulse: f32,
    /// Duration of the white flash on typed damage that applied no effect.
    pub hit_flash_duration: f32,
    /// Duration of the green flash on a successful heal.
    pub heal_flash_duration: f32,
    pub kamikaze_radius: f32,
    /// Blast radius of a kamikaze's death explosion.
    pub kamikaze_explosion_radius: f32,
    pub kamikaze_explosion_force: f32,
    pub reach_timeout: f32,
    pub acquisition_interval: f32,
    pub detection_interval: f32,
    /// Jitter added to a listening agent's shot cooldown on `ShotFired`.
    pub stagger_min: f32,
    pub stagger_max: f32,
    /// Only cooldowns strictly below this are staggered.
    pub stagger_threshold: f32,
    /// A loot entry drops when a uniform roll exceeds this.
    pub loot_chance: f32,
    /// Max offset of each dropped item from the corpse.
    pub loot_scatter: f32,
    /// Random additive speed range for non-player spawns.
    pub enemy_speed_jitter: (f32, f32),
    /// Upper bound of the wander re-roll while searching.
    pub wander_reroll: f32,
    /// Upper bound of the wander re-roll while shooting.
    pub micro_wander_reroll: f32,
    /// Steering stops pulling once this close to the target.
    pub arrive_distance: f32,
    /// Camera locks onto targets closer than this.
    pub camera_lock_distance: f32,
    pub default_zoom: f32,
    pub zoom_per_unit: f32,
    pub zoom_cap: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            invincibility_window: INVINCIBILITY_WINDOW,
            death_screen_delay: DEATH_SCREEN_DELAY,
            removal_delay: REMOVAL_DELAY,
            knockback_impulse: KNOCKBACK_IMPULSE,
            hit_flash_duration: 0.1,
            heal_flash_duration: 0.15,
            kamikaze_radius: KAMIKAZE_RADIUS,
            kamikaze_explosion_radius: 1.0,
            kamikaze_explosion_force: 70.0,
            reach_timeout: REACH_TIMEOUT,
            acquisition_interval: ACQUISITION_INTERVAL,
            detection_interval: DETECTION_INTERVAL,
            stagger_min: 0.2,
            stagger_max: 1.0,
            stagger_threshold: 1.0,
            loot_chance: 0.5,
            loot_scatter: 0.5,
            enemy_speed_jitter: (-0.2, 1.0),
            wander_reroll: 2.0,
            micro_wander_reroll: 1.0,
            arrive_distance: 0.5,
            camera_lock_distance: 12.0,
            default_zoom: 0.02,
            zoom_per_unit: 0.003,
            zoom_cap: 0.035,
        }
    }
}

/// Deterministic random source shared by every gameplay system.
#[derive(Resource, Debug, Clone, Deref, DerefMut)]
pub struct GameRng(pub ChaCha8Rng);

impl GameRng {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Fresh seed from the thread-local generator, for non-reproducible runs.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::seeded(rand::rng().random())
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::seeded(DEFAULT_SEED)
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<CombatConfig>()
        .init_resource::<CombatConfig>()
        .init_resource::<GameRng>();
}
