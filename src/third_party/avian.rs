//! Avian2d physics configuration for top-down combat.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::gameplay::Faction;
use crate::gameplay::targeting::{
    CombatantIndex, Detection, DetectionFeed, Detector, SightHit, SightTag, detection_candidates,
};
use crate::{GameSet, gameplay_running};

// === Collision Layers ===

/// Physics collision layers for the hitbox/hurtbox system.
///
/// - **Pushbox**: Physical presence.
/// - **Hitbox**: Attack collider (projectiles, melee strikes).
/// - **Hurtbox**: Damageable surface (every combatant).
/// - **Obstacle**: Level geometry that blocks sight.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum CollisionLayer {
    #[default]
    Pushbox,
    Hitbox,
    Hurtbox,
    Obstacle,
}

/// Layers a combatant body lives on.
#[must_use]
pub fn combatant_layers() -> CollisionLayers {
    CollisionLayers::new(
        [CollisionLayer::Pushbox, CollisionLayer::Hurtbox],
        [
            CollisionLayer::Pushbox,
            CollisionLayer::Hitbox,
            CollisionLayer::Obstacle,
        ],
    )
}

// === Line of Sight ===

/// Ray filter for sight probes: bodies and obstacles, never the prober.
#[must_use]
pub fn sight_filter(exclude: Entity) -> SpatialQueryFilter {
    SpatialQueryFilter::from_mask([CollisionLayer::Hurtbox, CollisionLayer::Obstacle])
        .with_excluded_entities([exclude])
}

/// Tag for whatever a probe hit: combatants by faction, anything else is an obstacle.
#[must_use]
pub fn tag_hit(faction: Option<Faction>) -> SightTag {
    faction.map_or(SightTag::Obstacle, SightTag::of)
}

/// Cast a ray from `origin` toward `target` and report the first thing hit
/// within `range`. `None` when nothing was hit or the points coincide.
pub fn line_of_sight(
    spatial: &SpatialQuery,
    origin: Vec2,
    target: Vec2,
    range: f32,
    exclude: Entity,
    factions: &Query<&Faction>,
) -> Option<SightHit> {
    let direction = Dir2::new(target - origin).ok()?;
    let hit = spatial.cast_ray(origin, direction, range, true, &sight_filter(exclude))?;
    Some(SightHit {
        entity: hit.entity,
        tag: tag_hit(factions.get(hit.entity).ok().copied()),
    })
}

// === Systems ===

/// Rebuilds every detector's [`Detection`] once its poll interval elapses.
pub fn detect_targets(
    time: Res<Time>,
    spatial: SpatialQuery,
    index: Res<CombatantIndex>,
    factions: Query<&Faction>,
    mut detectors: Query<(
        Entity,
        &GlobalTransform,
        &Faction,
        &mut Detector,
        &mut Detection,
    )>,
) {
    let dt = time.delta_secs();
    for (entity, transform, &faction, mut detector, mut detection) in &mut detectors {
        detector.poll.tick(dt);
        if !detector.poll.try_begin() {
            continue;
        }
        let origin = transform.translation().xy();
        let range = detector.range;
        detection.candidates =
            detection_candidates(&index, entity, faction, origin, range, |target| {
                line_of_sight(&spatial, origin, target, range, entity, &factions)
            });
        detector.poll.finish();
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(PhysicsPlugins::default());
    app.insert_resource(Gravity::ZERO);

    app.add_systems(
        Update,
        detect_targets
            .in_set(DetectionFeed)
            .in_set(GameSet::Ai)
            .run_if(gameplay_running),
    );
}
