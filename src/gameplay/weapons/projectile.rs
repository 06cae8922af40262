//! Projectiles, melee strikes, and explosions: shots in flight and how they
//! become damage requests.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::arsenal::Shot;
use super::{EXPLOSION_FORCE, HitResolution};
use crate::gameplay::events::{DamageRequest, ExplosionOccurred};
use crate::gameplay::vitals::{DamageType, Hit, Vitals};
use crate::gameplay::Faction;
use crate::third_party::CollisionLayer;
use crate::{GameSet, gameplay_running};

// === Constants ===

/// Draw depth of projectiles, above combatants.
const PROJECTILE_Z: f32 = 2.0;

// === Components ===

/// A shot in flight. Spawned by fire control, moved by `move_projectiles`,
/// resolved by `handle_projectile_hits`.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Projectile {
    pub shooter: Entity,
    /// Unit vector.
    pub direction: Vec2,
    pub speed: f32,
    /// Seconds left before the projectile fizzles.
    pub lifetime: f32,
    pub damage: f32,
    pub critical: bool,
    pub damage_type: DamageType,
    pub effect_chance: f32,
    pub homing: Option<Entity>,
    pub explosion_radius: Option<f32>,
    pub from_player: bool,
}

/// Marker for attack colliders that damage hurtboxes.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Hitbox;

/// Spawn the entity for one shot.
pub fn spawn_shot(commands: &mut Commands, shooter: Entity, faction: Faction, shot: &Shot) {
    let name = if shot.speed > 0.0 { "Projectile" } else { "Strike" };
    commands.spawn((
        Name::new(name),
        Projectile {
            shooter,
            direction: shot.direction,
            speed: shot.speed,
            lifetime: shot.lifetime,
            damage: shot.damage,
            critical: shot.critical,
            damage_type: shot.damage_type,
            effect_chance: shot.effect_chance,
            homing: shot.homing,
            explosion_radius: shot.explosion_radius,
            from_player: shot.from_player,
        },
        faction,
        Hitbox,
        Transform::from_translation(shot.origin.extend(PROJECTILE_Z)),
        RigidBody::Kinematic,
        Collider::circle(shot.radius),
        Sensor,
        CollisionLayers::new(CollisionLayer::Hitbox, CollisionLayer::Hurtbox),
        CollisionEventsEnabled,
        CollidingEntities::default(),
    ));
}

/// Damage requests for every hostile combatant caught in a blast.
pub fn blast_damage(
    explosion: &ExplosionOccurred,
    combatants: impl IntoIterator<Item = (Entity, Vec2, Faction)>,
) -> Vec<DamageRequest> {
    let hostile = if explosion.from_player {
        Faction::Enemy
    } else {
        Faction::Player
    };
    combatants
        .into_iter()
        .filter(|&(entity, position, faction)| {
            faction == hostile
                && Some(entity) != explosion.source
                && position.distance(explosion.position) <= explosion.radius
        })
        .map(|(entity, _, _)| {
            DamageRequest::new(
                entity,
                Hit::new(explosion.damage)
                    .from_position(explosion.position)
                    .typed(explosion.damage_type, 0.0)
                    .by_player(explosion.from_player),
            )
        })
        .collect()
}

// === Systems ===

/// Moves projectiles along their direction, steering homing ones toward a
/// live target. Expired projectiles are despawned.
fn move_projectiles(
    time: Res<Time>,
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Projectile, &mut Transform)>,
    positions: Query<&GlobalTransform>,
) {
    let dt = time.delta_secs();
    for (entity, mut projectile, mut transform) in &mut projectiles {
        projectile.lifetime -= dt;
        if projectile.lifetime <= 0.0 {
            commands.entity(entity).despawn();
            continue;
        }

        if let Some(target) = projectile.homing {
            if let Ok(target_pos) = positions.get(target) {
                let toward = target_pos.translation().xy() - transform.translation.xy();
                projectile.direction = toward.normalize_or(projectile.direction);
            }
        }

        let step = projectile.direction * projectile.speed * dt;
        transform.translation.x += step.x;
        transform.translation.y += step.y;
    }
}

/// Checks hitbox overlaps via `CollidingEntities`. The first live hostile
/// combatant hit takes the damage and the projectile is consumed. Explosive
/// projectiles deal their damage through the blast instead.
fn handle_projectile_hits(
    mut commands: Commands,
    projectiles: Query<(Entity, &Projectile, &Faction, &CollidingEntities, &Transform), With<Hitbox>>,
    targets: Query<(&Faction, &Vitals)>,
    mut damage: MessageWriter<DamageRequest>,
    mut explosions: MessageWriter<ExplosionOccurred>,
) {
    for (entity, projectile, projectile_faction, colliding, transform) in &projectiles {
        let position = transform.translation.xy();
        for &hit in &colliding.0 {
            if hit == projectile.shooter {
                continue;
            }
            let Ok((hit_faction, vitals)) = targets.get(hit) else {
                continue;
            };
            // No friendly fire
            if hit_faction == projectile_faction || !vitals.is_alive() {
                continue;
            }

            match projectile.explosion_radius {
                Some(radius) => {
                    explosions.write(ExplosionOccurred {
                        position,
                        radius,
                        force: EXPLOSION_FORCE,
                        damage: projectile.damage,
                        damage_type: projectile.damage_type,
                        source: Some(projectile.shooter),
                        from_player: projectile.from_player,
                    });
                }
                None => {
                    damage.write(DamageRequest::new(
                        hit,
                        Hit::new(projectile.damage)
                            .from_position(position)
                            .typed(projectile.damage_type, projectile.effect_chance)
                            .by_player(projectile.from_player),
                    ));
                }
            }
            commands.entity(entity).despawn();
            break; // One hit per projectile
        }
    }
}

/// Resolves explosions into damage for hostile combatants in range and a
/// push for every body in range.
fn resolve_explosions(
    mut explosions: MessageReader<ExplosionOccurred>,
    combatants: Query<(Entity, &GlobalTransform, &Faction), With<Vitals>>,
    mut bodies: Query<(&GlobalTransform, &mut LinearVelocity)>,
    mut damage: MessageWriter<DamageRequest>,
) {
    for explosion in explosions.read() {
        let in_range = combatants
            .iter()
            .map(|(entity, transform, &faction)| (entity, transform.translation().xy(), faction));
        damage.write_batch(blast_damage(explosion, in_range));

        for (transform, mut velocity) in &mut bodies {
            let position = transform.translation().xy();
            if position.distance(explosion.position) > explosion.radius {
                continue;
            }
            if let Some(away) = (position - explosion.position).try_normalize() {
                velocity.0 += away * explosion.force;
            }
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Projectile>().register_type::<Hitbox>();

    // move → check hits → blasts. chain_ignore_deferred so a projectile
    // consumed this frame cannot also be moved again.
    app.add_systems(
        Update,
        (move_projectiles, handle_projectile_hits, resolve_explosions)
            .chain_ignore_deferred()
            .in_set(HitResolution)
            .in_set(GameSet::Combat)
            .run_if(gameplay_running),
    );
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::gameplay::templates::EntityTemplate;
    use crate::gameplay::weapons::WeaponDefinition;
    use crate::gameplay::weapons::arsenal::{AimContext, Arsenal, FireOutcome};
    use crate::testing::{
        assert_entity_count, capture_messages, captured, create_combat_test_app, seeded_rng,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn create_projectile_test_app() -> App {
        let mut app = create_combat_test_app();
        app.add_systems(
            Update,
            (move_projectiles, handle_projectile_hits, resolve_explosions).chain_ignore_deferred(),
        );
        capture_messages::<DamageRequest>(&mut app);
        capture_messages::<ExplosionOccurred>(&mut app);
        app.update(); // Initialize time
        app
    }

    fn fire_once(weapon: WeaponDefinition, faction: Faction) -> Shot {
        let mut arsenal = Arsenal::new(faction);
        arsenal.set_energy(100.0);
        arsenal.equip(Arc::new(weapon));
        match arsenal.fire(&AimContext::new(Vec2::ZERO, Vec2::X), &mut seeded_rng()) {
            Ok(FireOutcome::Volley(mut shots)) => shots.remove(0),
            other => panic!("expected a volley, got {other:?}"),
        }
    }

    fn spawn_projectile(app: &mut App, shot: &Shot, faction: Faction) -> Entity {
        let shooter = app.world_mut().spawn_empty().id();
        {
            let mut commands = app.world_mut().commands();
            spawn_shot(&mut commands, shooter, faction, shot);
        }
        app.world_mut().flush();
        let mut query = app.world_mut().query_filtered::<Entity, With<Projectile>>();
        query.iter(app.world()).last().unwrap()
    }

    fn spawn_combatant(app: &mut App, template: &EntityTemplate, position: Vec2) -> Entity {
        app.world_mut()
            .spawn((
                template.faction,
                Vitals::from_template(template),
                GlobalTransform::from_translation(position.extend(0.0)),
            ))
            .id()
    }

    /// Stand-in for the physics step: mark the projectile as overlapping `hit`.
    fn overlap(app: &mut App, projectile: Entity, hit: Entity) {
        app.world_mut()
            .entity_mut(projectile)
            .get_mut::<CollidingEntities>()
            .unwrap()
            .0
            .insert(hit);
    }

    #[test]
    fn projectile_moves_along_direction() {
        let mut app = create_projectile_test_app();
        let shot = Shot {
            direction: Vec2::X,
            ..fire_once(WeaponDefinition::pistol(), Faction::Player)
        };
        let projectile = spawn_projectile(&mut app, &shot, Faction::Player);

        app.update();

        let x = app.world().get::<Transform>(projectile).unwrap().translation.x;
        assert!((x - shot.speed * 0.1).abs() < 1e-4);
    }

    #[test]
    fn projectile_expires_after_lifetime() {
        let mut app = create_projectile_test_app();
        let shot = Shot {
            lifetime: 0.15,
            ..fire_once(WeaponDefinition::pistol(), Faction::Player)
        };
        spawn_projectile(&mut app, &shot, Faction::Player);

        app.update();
        assert_entity_count::<With<Projectile>>(&mut app, 1);
        app.update();
        assert_entity_count::<With<Projectile>>(&mut app, 0);
    }

    #[test]
    fn hit_on_hostile_requests_damage_and_consumes_projectile() {
        let mut app = create_projectile_test_app();
        let shot = fire_once(WeaponDefinition::pistol(), Faction::Player);
        let projectile = spawn_projectile(&mut app, &shot, Faction::Player);
        let grunt = spawn_combatant(&mut app, &EntityTemplate::grunt(), Vec2::new(3.0, 0.0));
        overlap(&mut app, projectile, grunt);

        app.update();

        let requests = captured::<DamageRequest>(&app);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, grunt);
        assert_eq!(requests[0].hit.amount, shot.damage);
        assert!(requests[0].hit.from_player);
        assert_entity_count::<With<Projectile>>(&mut app, 0);
    }

    #[test]
    fn no_friendly_fire() {
        let mut app = create_projectile_test_app();
        let shot = fire_once(WeaponDefinition::pistol(), Faction::Enemy);
        let projectile = spawn_projectile(&mut app, &shot, Faction::Enemy);
        let ally = spawn_combatant(&mut app, &EntityTemplate::grunt(), Vec2::new(1.0, 0.0));
        overlap(&mut app, projectile, ally);

        app.update();

        assert!(captured::<DamageRequest>(&app).is_empty());
        assert_entity_count::<With<Projectile>>(&mut app, 1);
    }

    #[test]
    fn explosive_hit_damages_through_blast() {
        let mut app = create_projectile_test_app();
        let shot = Shot {
            homing: None,
            ..fire_once(WeaponDefinition::rocket_launcher(), Faction::Enemy)
        };
        let projectile = spawn_projectile(&mut app, &shot, Faction::Enemy);
        let player = spawn_combatant(&mut app, &EntityTemplate::player(), Vec2::new(0.5, 0.0));
        overlap(&mut app, projectile, player);

        app.update();

        assert_eq!(captured::<ExplosionOccurred>(&app).len(), 1);
        let requests = captured::<DamageRequest>(&app);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, player);
        assert!(!requests[0].hit.from_player);
    }

    #[test]
    fn death_explosion_pushes_nearby_bodies() {
        let mut app = create_projectile_test_app();
        let body = app
            .world_mut()
            .spawn((
                GlobalTransform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
                LinearVelocity::default(),
            ))
            .id();
        app.world_mut().write_message(ExplosionOccurred {
            position: Vec2::ZERO,
            radius: 2.0,
            force: 70.0,
            damage: 25.0,
            damage_type: DamageType::Fire,
            source: None,
            from_player: false,
        });

        app.update();

        let velocity = app.world().get::<LinearVelocity>(body).unwrap();
        assert!(velocity.x > 0.0);
    }
}
