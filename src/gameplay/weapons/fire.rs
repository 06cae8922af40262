//! Systems driving the arsenal: pickups, aiming, cooldowns, and trigger pulls.

use bevy::prelude::*;

use super::arsenal::{AimContext, Arsenal, FireOutcome, TargetPoint};
use super::projectile::spawn_shot;
use super::{Aim, HitResolution, WeaponCatalog};
use crate::config::GameRng;
use crate::gameplay::events::{
    AnimationCue, CritBonusGranted, Cue, DamageRequest, EnergyChanged, EquipWeapon,
    WeaponDropped,
};
use crate::gameplay::templates::EntityTemplate;
use crate::gameplay::vitals::effects::StatusEffects;
use crate::gameplay::vitals::{Hit, Vitals};
use crate::gameplay::{CurrentTarget, Faction};
use crate::{GameSet, gameplay_running};

// === Components ===

/// Intent to fire, written by decision loops and read by [`fire_weapons`].
///
/// `held` keeps firing every frame (player trigger). `pulled` fires once
/// (agent shot decision). `released` asks fire control to stop.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct FireTrigger {
    pub held: bool,
    pub pulled: bool,
    pub released: bool,
}

impl FireTrigger {
    pub fn pull(&mut self) {
        self.pulled = true;
    }

    pub fn hold(&mut self) {
        self.held = true;
    }

    pub fn release(&mut self) {
        self.held = false;
        self.pulled = false;
        self.released = true;
    }

    fn take_pull(&mut self) -> bool {
        std::mem::take(&mut self.pulled)
    }

    fn take_release(&mut self) -> bool {
        std::mem::take(&mut self.released)
    }
}

/// Weapon components for a fresh combatant.
pub fn spawn_loadout(template: &EntityTemplate, catalog: &WeaponCatalog) -> impl Bundle {
    (
        Arsenal::for_template(template, catalog),
        FireTrigger::default(),
        Aim::default(),
    )
}

fn aim_context(
    origin: Vec2,
    aim: &Aim,
    target: &CurrentTarget,
    positions: &Query<&GlobalTransform>,
    effects: Option<&StatusEffects>,
) -> AimContext {
    let target = target.0.and_then(|entity| {
        positions.get(entity).ok().map(|transform| TargetPoint {
            entity,
            position: transform.translation().xy(),
        })
    });
    AimContext::new(origin, aim.direction)
        .with_target(target)
        .frozen(effects.is_some_and(StatusEffects::is_frozen))
}

fn report_energy(
    entity: Entity,
    arsenal: &Arsenal,
    before: f32,
    energy: &mut MessageWriter<EnergyChanged>,
) {
    if arsenal.energy() != before && arsenal.max_energy().is_finite() {
        energy.write(EnergyChanged {
            entity,
            current: arsenal.energy(),
            max: arsenal.max_energy(),
        });
    }
}

// === Systems ===

fn handle_equip_requests(
    mut requests: MessageReader<EquipWeapon>,
    mut arsenals: Query<(&mut Arsenal, Option<&GlobalTransform>)>,
    mut dropped: MessageWriter<WeaponDropped>,
) {
    for request in requests.read() {
        let Ok((mut arsenal, transform)) = arsenals.get_mut(request.entity) else {
            warn!("equip request for {:?} without an arsenal", request.entity);
            continue;
        };
        let Some(evicted) = arsenal.equip(request.weapon.clone()) else {
            continue;
        };
        match evicted.drop_prefab.clone() {
            Some(prefab) => {
                let position = transform.map(|t| t.translation().xy()).unwrap_or_default();
                info!("{:?} dropped {} at {position}", request.entity, evicted.name);
                dropped.write(WeaponDropped {
                    owner: request.entity,
                    weapon: evicted,
                    prefab,
                    position,
                });
            }
            None => warn!("{} has no drop prefab; discarded", evicted.name),
        }
    }
}

fn grant_crit_bonus(
    mut grants: MessageReader<CritBonusGranted>,
    mut arsenals: Query<&mut Arsenal>,
) {
    for grant in grants.read() {
        if let Ok(mut arsenal) = arsenals.get_mut(grant.entity) {
            arsenal.add_temp_crit_chance(grant.amount, grant.duration);
        }
    }
}

/// Points every live, unfrozen shooter at its target, or back to the idle
/// pose once the target is gone. Facing changes are forwarded to the
/// animation sink.
fn aim_weapons(
    mut shooters: Query<(
        Entity,
        &GlobalTransform,
        &CurrentTarget,
        &mut Aim,
        Option<&StatusEffects>,
        Option<&Vitals>,
    )>,
    positions: Query<&GlobalTransform>,
    mut cues: MessageWriter<AnimationCue>,
) {
    for (entity, transform, target, mut aim, effects, vitals) in &mut shooters {
        if effects.is_some_and(StatusEffects::is_frozen) || vitals.is_some_and(|v| !v.is_alive())
        {
            continue;
        }
        let was_flipped = aim.flipped;
        let target_position = target
            .0
            .and_then(|t| positions.get(t).ok())
            .map(|t| t.translation().xy());
        aim.point_at(transform.translation().xy(), target_position);
        if aim.flipped != was_flipped {
            cues.write(AnimationCue::new(
                entity,
                Cue::Face {
                    flipped: aim.flipped,
                },
            ));
        }
    }
}

/// Cooldowns, crit bonus expiry, and burst continuations.
fn advance_arsenals(
    time: Res<Time>,
    mut rng: ResMut<GameRng>,
    mut shooters: Query<(
        Entity,
        &mut Arsenal,
        &GlobalTransform,
        &Aim,
        &CurrentTarget,
        &Faction,
        Option<&StatusEffects>,
        Option<&Vitals>,
    )>,
    positions: Query<&GlobalTransform>,
    mut commands: Commands,
) {
    let dt = time.delta_secs();
    for (entity, mut arsenal, transform, aim, target, &faction, effects, vitals) in &mut shooters
    {
        if vitals.is_some_and(|v| !v.is_alive()) {
            arsenal.cancel_all();
            continue;
        }
        let ctx = aim_context(transform.translation().xy(), aim, target, &positions, effects);
        for shot in arsenal.advance(dt, &ctx, &mut rng.0) {
            spawn_shot(&mut commands, entity, faction, &shot);
        }
    }
}

/// Turns trigger state into fire attempts and routes the outcome: shots become
/// projectiles, beam ticks go straight to the damage sink.
fn fire_weapons(
    mut rng: ResMut<GameRng>,
    mut shooters: Query<(
        Entity,
        &mut Arsenal,
        &mut FireTrigger,
        &GlobalTransform,
        &Aim,
        &CurrentTarget,
        &Faction,
        Option<&StatusEffects>,
        Option<&Vitals>,
    )>,
    positions: Query<&GlobalTransform>,
    mut damage: MessageWriter<DamageRequest>,
    mut energy: MessageWriter<EnergyChanged>,
    mut cues: MessageWriter<AnimationCue>,
    mut commands: Commands,
) {
    for (entity, mut arsenal, mut trigger, transform, aim, target, &faction, effects, vitals) in
        &mut shooters
    {
        if vitals.is_some_and(|v| !v.is_alive()) {
            continue;
        }

        if trigger.take_release() && (arsenal.is_firing() || arsenal.is_beaming()) {
            arsenal.stop_firing();
            cues.write(AnimationCue::new(entity, Cue::StopShooting));
        }

        let pulled = trigger.take_pull();
        if !(trigger.held || pulled) {
            continue;
        }

        let ctx = aim_context(transform.translation().xy(), aim, target, &positions, effects);
        let before = arsenal.energy();
        let from_player = faction == Faction::Player;

        match arsenal.fire(&ctx, &mut rng.0) {
            Ok(FireOutcome::Volley(shots)) => {
                for shot in &shots {
                    spawn_shot(&mut commands, entity, faction, shot);
                }
                cues.write(AnimationCue::new(entity, Cue::Shoot));
                let semi_auto = arsenal.active_weapon().is_some_and(|w| !w.fully_auto);
                if from_player && semi_auto {
                    trigger.held = false;
                }
            }
            Ok(FireOutcome::Unarmed(shot)) => {
                spawn_shot(&mut commands, entity, faction, &shot);
                cues.write(AnimationCue::new(entity, Cue::Shoot));
            }
            Ok(FireOutcome::BeamTick {
                target,
                damage: amount,
                damage_type,
                effect_chance,
                ..
            }) => {
                damage.write(DamageRequest::new(
                    target,
                    Hit::new(amount)
                        .from_position(ctx.origin)
                        .typed(damage_type, effect_chance)
                        .by_player(from_player),
                ));
                let end = ctx
                    .target
                    .map_or(ctx.origin, |point| point.position);
                cues.write(AnimationCue::new(entity, Cue::Beam { end }));
            }
            Ok(FireOutcome::BeamSweep { end }) => {
                cues.write(AnimationCue::new(entity, Cue::Beam { end }));
            }
            Err(error) if error.is_warning() => warn!("{entity:?} cannot fire: {error}"),
            Err(_) => {}
        }

        report_energy(entity, &arsenal, before, &mut energy);
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<FireTrigger>();

    app.add_systems(
        Update,
        (
            handle_equip_requests,
            grant_crit_bonus,
            aim_weapons,
            advance_arsenals,
            fire_weapons,
        )
            .chain()
            .in_set(GameSet::Combat)
            .before(HitResolution)
            .run_if(gameplay_running),
    );
}
