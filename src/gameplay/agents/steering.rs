//! Context steering: interest toward the target, danger away from crowding.

use std::f32::consts::TAU;

use bevy::prelude::*;

use super::AgentState;
use super::decision::AgentDecision;
use crate::config::CombatConfig;
use crate::gameplay::CurrentTarget;
use crate::gameplay::targeting::CombatantIndex;
use crate::{GameSet, gameplay_running};

/// Number of sampled headings.
pub const STEERING_DIRECTIONS: usize = 8;

/// Combatants closer than this push the heading away.
pub const DANGER_RADIUS: f32 = 1.5;

/// Movement aggregate consumed by the decision loop.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Steering {
    /// Unit heading toward the target, or zero when there is none or it is
    /// within arrive distance.
    pub to_target: Vec2,
    /// Unit heading of the current wander leg.
    pub wander: Vec2,
}

#[allow(clippy::cast_precision_loss)]
fn headings() -> impl Iterator<Item = Vec2> {
    (0..STEERING_DIRECTIONS).map(|i| Vec2::from_angle(TAU * i as f32 / STEERING_DIRECTIONS as f32))
}

/// Blend the sampled headings: each scores its alignment with the target minus
/// its alignment with nearby obstacles, scaled by proximity.
pub fn context_steer(
    origin: Vec2,
    target: Option<Vec2>,
    arrive_distance: f32,
    neighbors: impl IntoIterator<Item = Vec2>,
) -> Vec2 {
    let Some(target) = target else {
        return Vec2::ZERO;
    };
    let offset = target - origin;
    if offset.length() <= arrive_distance {
        return Vec2::ZERO;
    }
    let Some(desired) = offset.try_normalize() else {
        return Vec2::ZERO;
    };

    let mut danger = [0.0_f32; STEERING_DIRECTIONS];
    for neighbor in neighbors {
        let away = neighbor - origin;
        let distance = away.length();
        if distance >= DANGER_RADIUS {
            continue;
        }
        let Some(toward) = away.try_normalize() else {
            continue;
        };
        let proximity = 1.0 - distance / DANGER_RADIUS;
        for (slot, heading) in danger.iter_mut().zip(headings()) {
            *slot = slot.max(heading.dot(toward).max(0.0) * proximity);
        }
    }

    let blended: Vec2 = headings()
        .zip(danger)
        .map(|(heading, danger)| heading * (heading.dot(desired).max(0.0) - danger).max(0.0))
        .sum();

    blended.try_normalize().unwrap_or(desired)
}

// === Systems ===

fn steer_agents(
    config: Res<CombatConfig>,
    index: Res<CombatantIndex>,
    positions: Query<&GlobalTransform>,
    mut agents: Query<(Entity, &GlobalTransform, &CurrentTarget, &mut Steering), With<AgentState>>,
) {
    for (entity, transform, target, mut steering) in &mut agents {
        let origin = transform.translation().xy();
        let target_position = target
            .0
            .and_then(|t| positions.get(t).ok())
            .map(|t| t.translation().xy());
        let neighbors = index
            .within(origin, DANGER_RADIUS)
            .into_iter()
            .filter(|c| c.entity != entity && Some(c.entity) != target.0)
            .map(|c| c.position);
        steering.to_target =
            context_steer(origin, target_position, config.arrive_distance, neighbors);
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        FixedUpdate,
        steer_agents
            .in_set(GameSet::Ai)
            .before(AgentDecision)
            .run_if(gameplay_running),
    );
}
