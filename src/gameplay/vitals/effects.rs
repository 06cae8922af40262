//! Status effects inflicted by typed damage: damage over time and freezing.

use bevy::prelude::*;

use super::{DamageType, Hit};
use crate::gameplay::events::{AnimationCue, Cue, DamageRequest};
use crate::{GameSet, gameplay_running};

/// Tuning for the effect a damage type inflicts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectProfile {
    /// Number of damage ticks. Zero for pure crowd control.
    pub ticks: u32,
    pub interval: f32,
    pub damage_per_tick: f32,
    /// Seconds the target cannot act.
    pub freeze: f32,
}

impl DamageType {
    /// Effect inflicted when a hit of this type lands a status roll.
    #[must_use]
    pub const fn effect_profile(self) -> Option<EffectProfile> {
        match self {
            Self::None | Self::Physical => None,
            Self::Fire => Some(EffectProfile {
                ticks: 3,
                interval: 0.5,
                damage_per_tick: 5.0,
                freeze: 0.0,
            }),
            Self::Poison => Some(EffectProfile {
                ticks: 5,
                interval: 1.0,
                damage_per_tick: 3.0,
                freeze: 0.0,
            }),
            Self::Electric => Some(EffectProfile {
                ticks: 2,
                interval: 0.25,
                damage_per_tick: 8.0,
                freeze: 0.0,
            }),
            Self::Ice => Some(EffectProfile {
                ticks: 0,
                interval: 0.0,
                damage_per_tick: 0.0,
                freeze: 1.5,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveEffect {
    kind: DamageType,
    ticks_left: u32,
    next_tick_in: f32,
    profile: EffectProfile,
}

/// Effects currently running on an entity.
#[derive(Component, Debug, Clone, Default)]
pub struct StatusEffects {
    active: Vec<ActiveEffect>,
    frozen_for: f32,
}

impl StatusEffects {
    /// Start (or restart) the effect of `kind`. Returns false for types with no effect.
    pub fn apply(&mut self, kind: DamageType) -> bool {
        let Some(profile) = kind.effect_profile() else {
            return false;
        };
        self.frozen_for = self.frozen_for.max(profile.freeze);
        if profile.ticks == 0 {
            return true;
        }

        let fresh = ActiveEffect {
            kind,
            ticks_left: profile.ticks,
            next_tick_in: profile.interval,
            profile,
        };
        match self.active.iter_mut().find(|e| e.kind == kind) {
            Some(existing) => *existing = fresh,
            None => self.active.push(fresh),
        }
        true
    }

    /// Advance all effects. Returns the damage ticks that came due.
    pub fn tick(&mut self, dt: f32) -> Vec<(DamageType, f32)> {
        self.frozen_for = (self.frozen_for - dt).max(0.0);

        let mut due = Vec::new();
        for effect in &mut self.active {
            effect.next_tick_in -= dt;
            while effect.next_tick_in <= 0.0 && effect.ticks_left > 0 {
                due.push((effect.kind, effect.profile.damage_per_tick));
                effect.ticks_left -= 1;
                effect.next_tick_in += effect.profile.interval;
            }
        }
        self.active.retain(|e| e.ticks_left > 0);
        due
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen_for > 0.0
    }

    #[must_use]
    pub fn is_active(&self, kind: DamageType) -> bool {
        self.active.iter().any(|e| e.kind == kind)
            || (kind.effect_profile().is_some_and(|p| p.freeze > 0.0) && self.is_frozen())
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.frozen_for = 0.0;
    }
}

/// Turns due effect ticks into damage requests. Ticks bypass invincibility
/// and never roll further effects.
fn tick_status_effects(
    time: Res<Time>,
    mut sufferers: Query<(Entity, &mut StatusEffects)>,
    mut damage: MessageWriter<DamageRequest>,
    mut cues: MessageWriter<AnimationCue>,
) {
    let dt = time.delta_secs();
    for (entity, mut effects) in &mut sufferers {
        let was_frozen = effects.is_frozen();
        for (kind, amount) in effects.tick(dt) {
            damage.write(DamageRequest::new(
                entity,
                Hit::new(amount).typed(kind, 0.0).effect_tick(),
            ));
        }
        if was_frozen != effects.is_frozen() {
            cues.write(AnimationCue::new(
                entity,
                Cue::Frozen {
                    active: effects.is_frozen(),
                },
            ));
        }
    }
}

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        tick_status_effects
            .in_set(GameSet::Combat)
            .before(crate::gameplay::weapons::HitResolution)
            .run_if(gameplay_running),
    );
}
