//! Per-tick agent state machine.
//!
//! [`decide`] maps what the agent perceives to an [`Intent`]; the systems
//! below apply it to velocity, the fire trigger, and the agent's bookkeeping.
//! Countdowns (shot cooldown, wander leg, jump, watchdog) advance on the
//! frame tick in [`tick_agents`]; decisions run on the fixed tick.

use avian2d::prelude::*;
use bevy::prelude::*;
use rand::Rng;

use super::{AgentMode, AgentProfile, AgentState, Brain, MICRO_WANDER_SCALE, Steering};
use crate::config::{CombatConfig, GameRng};
use crate::gameplay::events::{AnimationCue, Cue, DeathRequested, ShotFired};
use crate::gameplay::targeting::{Detection, SightTag};
use crate::gameplay::vitals::Vitals;
use crate::gameplay::vitals::effects::StatusEffects;
use crate::gameplay::weapons::{Arsenal, FireTrigger};
use crate::gameplay::{CurrentTarget, Faction, Movement};
use crate::{GameSet, gameplay_running};

/// Agent decisions. Steering runs before, staggering after.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentDecision;

// === Decision ===

/// The agent's current target as seen this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    pub entity: Entity,
    pub faction: Faction,
    pub distance: f32,
    /// Tag of the first thing the sight probe toward the target hit.
    pub sight: Option<SightTag>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perception {
    pub faction: Faction,
    pub target: Option<TargetView>,
    /// Steering direction toward the target.
    pub steer: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Kamikaze next to a player: die and explode.
    Detonate,
    /// Nothing to fight: stop shooting and roam.
    Idle,
    /// A target without a clear shot or a heading: stop shooting and roam.
    Wander,
    /// In range with a clear shot: shoot and strafe.
    Hold,
    /// Close the distance, shooting on the way when `shoot` is set.
    Approach { shoot: bool },
}

/// Pick this tick's intent. Pure; the caller applies it.
#[must_use]
pub fn decide(profile: &AgentProfile, perception: &Perception, kamikaze_radius: f32) -> Intent {
    let Some(target) = perception.target else {
        return Intent::Idle;
    };

    if profile.kamikaze && target.faction == Faction::Player && target.distance <= kamikaze_radius
    {
        return Intent::Detonate;
    }

    let heading = perception.steer != Vec2::ZERO;
    let Some(sight) = target.sight else {
        return if heading {
            Intent::Approach { shoot: false }
        } else {
            Intent::Wander
        };
    };

    let visible = sight == SightTag::of(perception.faction.opposing());
    if visible && target.distance < profile.aim_range {
        return Intent::Hold;
    }
    if (visible && target.distance > profile.aim_range) || heading {
        return Intent::Approach {
            shoot: visible && target.distance < profile.secondary_aim_range,
        };
    }
    Intent::Wander
}

// === Systems ===

/// Advance every agent's countdowns and resolve due watchdogs.
fn tick_agents(
    time: Res<Time>,
    mut agents: Query<(
        Entity,
        &AgentProfile,
        &mut AgentState,
        &mut CurrentTarget,
        &Vitals,
    )>,
    mut cues: MessageWriter<AnimationCue>,
) {
    let dt = time.delta_secs();
    for (entity, profile, mut state, mut target, vitals) in &mut agents {
        if !vitals.is_alive() {
            state.tasks.clear();
            continue;
        }
        let was_jumping = state.is_jumping();
        if state.tick(dt, profile, target.0) {
            debug!("{entity:?} never reached {:?}; dropping it", target.0);
            target.0 = None;
        }
        if was_jumping && !state.is_jumping() {
            cues.write(AnimationCue::new(entity, Cue::Jump { active: false }));
        }
    }
}

fn lookup_target(
    entity: Entity,
    origin: Vec2,
    detection: &Detection,
    targets: &Query<(&GlobalTransform, &Faction, &Vitals)>,
) -> Option<TargetView> {
    let (transform, &faction, vitals) = targets.get(entity).ok()?;
    if !vitals.is_alive() {
        return None;
    }
    Some(TargetView {
        entity,
        faction,
        distance: origin.distance(transform.translation().xy()),
        sight: detection
            .get(entity)
            .and_then(|candidate| candidate.sight)
            .map(|hit| hit.tag),
    })
}

fn roam(state: &mut AgentState, steering: &mut Steering, max_leg: f32, rng: &mut impl Rng) -> Vec2 {
    if let Some(heading) = state.wander_leg(max_leg, rng) {
        steering.wander = heading;
    }
    steering.wander
}

#[allow(clippy::type_complexity)]
fn decide_agents(
    config: Res<CombatConfig>,
    mut rng: ResMut<GameRng>,
    mut agents: Query<(
        Entity,
        (&Brain, &AgentProfile, &Movement, &Faction),
        &mut AgentState,
        &mut CurrentTarget,
        (&Detection, &mut Steering),
        (&Vitals, Option<&StatusEffects>),
        &GlobalTransform,
        (&Arsenal, &mut FireTrigger),
        &mut LinearVelocity,
    )>,
    targets: Query<(&GlobalTransform, &Faction, &Vitals)>,
    mut deaths: MessageWriter<DeathRequested>,
    mut shots: MessageWriter<ShotFired>,
    mut cues: MessageWriter<AnimationCue>,
) {
    for (
        entity,
        (brain, profile, movement, &faction),
        mut state,
        mut current,
        (detection, mut steering),
        (vitals, effects),
        transform,
        (arsenal, mut trigger),
        mut velocity,
    ) in &mut agents
    {
        let frozen = effects.is_some_and(StatusEffects::is_frozen);
        if !brain.enabled || !vitals.is_alive() || frozen {
            velocity.0 = Vec2::ZERO;
            continue;
        }
        let origin = transform.translation().xy();

        let mut view = current
            .0
            .and_then(|target| lookup_target(target, origin, detection, &targets));
        if current.0.is_some() && view.is_none() {
            current.0 = None;
            state.retarget();
        }
        if current.0.is_none() {
            if let Some(head) = detection.head() {
                current.0 = Some(head.entity);
                state.retarget();
                view = lookup_target(head.entity, origin, detection, &targets);
                debug!("{entity:?} acquired {:?}", head.entity);
            }
        }

        let perception = Perception {
            faction,
            target: view,
            steer: steering.to_target,
        };
        let previous_mode = state.mode;
        let speed = movement.speed;

        match decide(profile, &perception, config.kamikaze_radius) {
            Intent::Detonate => {
                velocity.0 = Vec2::ZERO;
                deaths.write(DeathRequested { entity });
                continue;
            }
            Intent::Idle => {
                state.mode = AgentMode::Idle;
                state.reached = true;
                state.aiming = false;
                if state.stop_shooting() {
                    trigger.release();
                }
                velocity.0 = roam(&mut state, &mut steering, config.wander_reroll, &mut rng.0) * speed;
            }
            Intent::Wander => {
                state.mode = AgentMode::Wandering;
                state.aiming = true;
                if state.stop_shooting() {
                    trigger.release();
                }
                velocity.0 = roam(&mut state, &mut steering, config.wander_reroll, &mut rng.0) * speed;
            }
            Intent::Hold => {
                state.mode = AgentMode::Aiming;
                state.aiming = true;
                state.reached = true;
                let sight = view.and_then(|v| v.sight);
                if state.try_shoot(profile, faction, sight, arsenal.has_weapon(), &mut rng.0) {
                    trigger.pull();
                    shots.write(ShotFired { shooter: entity });
                }
                velocity.0 = roam(&mut state, &mut steering, config.micro_wander_reroll, &mut rng.0)
                    * speed
                    * MICRO_WANDER_SCALE;
            }
            Intent::Approach { shoot } => {
                state.aiming = true;
                if let Some(target) = current.0 {
                    state.begin_approach(target, perception.steer, config.reach_timeout);
                }
                velocity.0 = perception.steer * speed;

                let sight = view.and_then(|v| v.sight);
                if shoot {
                    if state.try_shoot(profile, faction, sight, arsenal.has_weapon(), &mut rng.0) {
                        trigger.pull();
                        shots.write(ShotFired { shooter: entity });
                    }
                } else if state.stop_shooting() {
                    trigger.release();
                }

                if state.try_jump(profile) {
                    cues.write(AnimationCue::new(entity, Cue::Jump { active: true }));
                }
            }
        }

        if let Some(impulse) = state.jump_velocity(profile) {
            state.mode = AgentMode::Jumping;
            velocity.0 = impulse;
        }

        if state.mode != previous_mode {
            cues.write(AnimationCue::new(
                entity,
                Cue::Run {
                    speed: velocity.0.length(),
                },
            ));
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.configure_sets(FixedUpdate, AgentDecision.in_set(GameSet::Ai));

    app.add_systems(
        Update,
        tick_agents.in_set(GameSet::Ai).run_if(gameplay_running),
    );
    app.add_systems(
        FixedUpdate,
        decide_agents.in_set(AgentDecision).run_if(gameplay_running),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile() -> AgentProfile {
        AgentProfile {
            aim_range: 5.0,
            secondary_aim_range: 7.0,
            attack_delay: 2,
            jump: None,
            kamikaze: false,
        }
    }

    fn seen(distance: f32, sight: Option<SightTag>) -> Perception {
        Perception {
            faction: Faction::Enemy,
            target: Some(TargetView {
                entity: Entity::from_bits(1),
                faction: Faction::Player,
                distance,
                sight,
            }),
            steer: Vec2::X,
        }
    }

    #[test]
    fn no_target_is_idle() {
        let perception = Perception {
            faction: Faction::Enemy,
            target: None,
            steer: Vec2::ZERO,
        };
        assert_eq!(decide(&profile(), &perception, 1.0), Intent::Idle);
    }

    #[test]
    fn visible_target_in_range_is_held() {
        let perception = seen(3.0, Some(SightTag::Player));
        assert_eq!(decide(&profile(), &perception, 1.0), Intent::Hold);
    }

    #[test]
    fn visible_target_out_of_range_is_approached_with_fire() {
        let perception = seen(6.0, Some(SightTag::Player));
        assert_eq!(
            decide(&profile(), &perception, 1.0),
            Intent::Approach { shoot: true }
        );
    }

    #[test]
    fn beyond_secondary_range_approaches_without_fire() {
        let perception = seen(9.0, Some(SightTag::Player));
        assert_eq!(
            decide(&profile(), &perception, 1.0),
            Intent::Approach { shoot: false }
        );
    }

    #[test]
    fn blocked_sight_approaches_without_fire() {
        let perception = seen(3.0, Some(SightTag::Obstacle));
        assert_eq!(
            decide(&profile(), &perception, 1.0),
            Intent::Approach { shoot: false }
        );
    }

    #[test]
    fn point_blank_visible_target_is_held_without_heading() {
        let mut close = seen(0.3, Some(SightTag::Player));
        close.steer = Vec2::ZERO;
        assert_eq!(decide(&profile(), &close, 1.0), Intent::Hold);
    }

    #[test]
    fn heading_without_sight_approaches_without_fire() {
        assert_eq!(
            decide(&profile(), &seen(3.0, None), 1.0),
            Intent::Approach { shoot: false }
        );
    }

    #[test]
    fn missing_sight_and_heading_wanders() {
        let mut lost = seen(3.0, None);
        lost.steer = Vec2::ZERO;
        assert_eq!(decide(&profile(), &lost, 1.0), Intent::Wander);

        let mut blocked = seen(3.0, Some(SightTag::Obstacle));
        blocked.steer = Vec2::ZERO;
        assert_eq!(decide(&profile(), &blocked, 1.0), Intent::Wander);
    }

    #[test]
    fn kamikaze_detonates_next_to_player() {
        let kamikaze = AgentProfile {
            kamikaze: true,
            ..profile()
        };
        assert_eq!(decide(&kamikaze, &seen(0.8, None), 1.0), Intent::Detonate);
        assert_ne!(decide(&kamikaze, &seen(1.5, None), 1.0), Intent::Detonate);
    }

    #[test]
    fn kamikaze_ignores_non_player_targets() {
        let kamikaze = AgentProfile {
            kamikaze: true,
            ..profile()
        };
        let mut perception = seen(0.5, Some(SightTag::Player));
        if let Some(target) = perception.target.as_mut() {
            target.faction = Faction::Enemy;
        }
        assert_ne!(decide(&kamikaze, &perception, 1.0), Intent::Detonate);
    }
}
