//! The player: input-driven movement, automatic target acquisition, and
//! edge-triggered fire commands.

pub mod camera;
pub mod input;

use avian2d::prelude::*;
use bevy::prelude::*;

use super::events::PlayerCommand;
use super::targeting::{
    AcquisitionPoll, Detection, DetectionFeed, Detector, SightTag, find_best_target,
};
use super::templates::EntityTemplate;
use super::vitals::Vitals;
use super::vitals::effects::StatusEffects;
use super::weapons::{Arsenal, FireTrigger, WeaponCatalog, spawn_loadout};
use super::{CurrentTarget, Faction, IgnoreFactions, Movement, Targetable};
use crate::config::CombatConfig;
use crate::third_party::combatant_layers;
use crate::{GameSet, gameplay_running};

pub use self::camera::CameraFraming;

/// Body radius of the player.
pub const PLAYER_RADIUS: f32 = 0.45;

// === Components ===

#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// Movement intent from the two input sources.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct PlayerInput {
    /// Keyboard or gamepad.
    pub device: Vec2,
    /// On-screen stick.
    pub virtual_stick: Vec2,
}

impl PlayerInput {
    /// The device wins whenever it reports any input.
    #[must_use]
    pub fn resolve_input(&self) -> Vec2 {
        if self.device == Vec2::ZERO {
            self.virtual_stick
        } else {
            self.device
        }
    }
}

/// Attention target for framing, and the acquisition poll that feeds it.
#[derive(Component, Debug, Clone, Copy)]
pub struct PlayerFocus {
    /// Nearest detected enemy, visible or not.
    pub soft_focus: Option<Entity>,
    pub poll: AcquisitionPoll,
}

impl PlayerFocus {
    #[must_use]
    pub const fn new(interval: f32) -> Self {
        Self {
            soft_focus: None,
            poll: AcquisitionPoll::new(interval),
        }
    }
}

// === Spawning ===

pub fn spawn_player(
    commands: &mut Commands,
    template: &EntityTemplate,
    position: Vec2,
    catalog: &WeaponCatalog,
    config: &CombatConfig,
) -> Entity {
    commands
        .spawn((
            Name::new(template.name.clone()),
            Player,
            template.faction,
            IgnoreFactions::allies_of(template.faction),
            Vitals::from_template(template),
            StatusEffects::default(),
            CurrentTarget::default(),
            Movement {
                speed: template.speed,
            },
            Targetable,
            spawn_loadout(template, catalog),
            (
                PlayerInput::default(),
                PlayerFocus::new(config.acquisition_interval),
                CameraFraming::default(),
                Detection::default(),
                Detector::new(template.search_range, config.detection_interval),
            ),
            (
                RigidBody::Kinematic,
                Collider::circle(PLAYER_RADIUS),
                combatant_layers(),
                LinearVelocity::ZERO,
            ),
            Transform::from_translation(position.extend(0.0)),
        ))
        .id()
}

// === Systems ===

/// `velocity = input × speed`, or zero while frozen or not alive.
fn move_player(
    mut players: Query<
        (
            &PlayerInput,
            &Movement,
            &Vitals,
            Option<&StatusEffects>,
            &mut LinearVelocity,
        ),
        With<Player>,
    >,
) {
    for (input, movement, vitals, effects, mut velocity) in &mut players {
        let frozen = effects.is_some_and(StatusEffects::is_frozen);
        velocity.0 = if frozen || !vitals.is_alive() {
            Vec2::ZERO
        } else {
            input.resolve_input() * movement.speed
        };
    }
}

/// Rank the detection set on the poll interval: the visible pick becomes the
/// attack target, the nearest overall becomes the soft focus.
fn acquire_player_target(
    time: Res<Time>,
    mut players: Query<
        (
            Entity,
            &GlobalTransform,
            &Faction,
            &IgnoreFactions,
            &Detection,
            &mut CurrentTarget,
            &mut PlayerFocus,
        ),
        With<Player>,
    >,
) {
    let dt = time.delta_secs();
    for (entity, transform, &faction, ignore, detection, mut target, mut focus) in &mut players {
        focus.poll.tick(dt);
        if !focus.poll.try_begin() {
            continue;
        }
        let acquisition = find_best_target(
            &detection.candidates,
            transform.translation().xy(),
            ignore.0,
            SightTag::of(faction.opposing()),
            |candidate| candidate.sight,
        );
        if target.0 != acquisition.visible {
            debug!("{entity:?} now targets {:?}", acquisition.visible);
            target.0 = acquisition.visible;
        }
        focus.soft_focus = acquisition.soft_focus;
        focus.poll.finish();
    }
}

fn handle_player_commands(
    mut commands: MessageReader<PlayerCommand>,
    mut players: Query<(Entity, &mut FireTrigger, &mut Arsenal), With<Player>>,
) {
    for command in commands.read() {
        for (entity, mut trigger, mut arsenal) in &mut players {
            match command {
                PlayerCommand::Fire => trigger.hold(),
                PlayerCommand::ReleaseFire => trigger.release(),
                PlayerCommand::SwitchWeapon => {
                    if arsenal.switch_weapon() {
                        let name = arsenal.active_weapon().map(|w| w.name.clone());
                        debug!("{entity:?} switched to {name:?}");
                    }
                }
            }
        }
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Player>()
        .register_type::<PlayerInput>();

    app.add_plugins((input::plugin, camera::plugin));

    app.add_systems(
        FixedUpdate,
        move_player
            .in_set(GameSet::Movement)
            .run_if(gameplay_running),
    );
    app.add_systems(
        Update,
        (
            handle_player_commands.in_set(GameSet::Input),
            acquire_player_target
                .in_set(GameSet::Ai)
                .after(DetectionFeed),
        )
            .run_if(gameplay_running),
    );
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::gameplay::targeting::{Candidate, SightHit};
    use crate::gameplay::vitals::DamageType;
    use crate::gameplay::weapons::WeaponDefinition;
    use crate::testing::create_combat_test_app;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn spawn(app: &mut App) -> Entity {
        let world = app.world_mut();
        let entity = {
            let mut commands = world.commands();
            spawn_player(
                &mut commands,
                &EntityTemplate::player(),
                Vec2::ZERO,
                &WeaponCatalog::default(),
                &CombatConfig::default(),
            )
        };
        world.flush();
        entity
    }

    fn candidate(entity: Entity, x: f32, visible: bool) -> Candidate {
        Candidate {
            entity,
            position: Vec2::new(x, 0.0),
            faction: Faction::Enemy,
            sight: Some(SightHit {
                entity,
                tag: if visible {
                    SightTag::Enemy
                } else {
                    SightTag::Obstacle
                },
            }),
        }
    }

    #[test]
    fn movement_follows_input() {
        let mut app = create_combat_test_app();
        app.add_systems(Update, move_player);
        let player = spawn(&mut app);
        app.world_mut().get_mut::<PlayerInput>(player).unwrap().device = Vec2::X;
        app.update();

        let velocity = app.world().get::<LinearVelocity>(player).unwrap();
        assert_eq!(velocity.0, Vec2::X * EntityTemplate::player().speed);
    }

    #[test]
    fn frozen_player_does_not_move() {
        let mut app = create_combat_test_app();
        app.add_systems(Update, move_player);
        let player = spawn(&mut app);
        app.world_mut().get_mut::<PlayerInput>(player).unwrap().device = Vec2::X;
        app.world_mut()
            .get_mut::<StatusEffects>(player)
            .unwrap()
            .apply(DamageType::Ice);
        app.update();

        assert_eq!(app.world().get::<LinearVelocity>(player).unwrap().0, Vec2::ZERO);
    }

    #[test]
    fn acquisition_splits_target_and_focus() {
        let mut app = create_combat_test_app();
        app.add_systems(Update, acquire_player_target);
        let player = spawn(&mut app);
        let near = app.world_mut().spawn_empty().id();
        let far = app.world_mut().spawn_empty().id();
        app.world_mut().get_mut::<Detection>(player).unwrap().candidates =
            vec![candidate(near, 3.0, false), candidate(far, 8.0, true)];
        app.update();

        assert_eq!(app.world().get::<CurrentTarget>(player).unwrap().0, Some(far));
        assert_eq!(app.world().get::<PlayerFocus>(player).unwrap().soft_focus, Some(near));
    }

    #[test]
    fn acquisition_waits_for_poll_interval() {
        let mut app = create_combat_test_app();
        app.add_systems(Update, acquire_player_target);
        let player = spawn(&mut app);
        app.update();

        let enemy = app.world_mut().spawn_empty().id();
        app.world_mut().get_mut::<Detection>(player).unwrap().candidates =
            vec![candidate(enemy, 2.0, true)];
        // Polled on the first frame; the 0.1s interval runs out on this one.
        app.update();
        assert_eq!(app.world().get::<CurrentTarget>(player).unwrap().0, Some(enemy));
    }

    #[test]
    fn fire_commands_drive_trigger() {
        let mut app = create_combat_test_app();
        app.add_systems(Update, handle_player_commands);
        let player = spawn(&mut app);

        app.world_mut().write_message(PlayerCommand::Fire);
        app.update();
        assert!(app.world().get::<FireTrigger>(player).unwrap().held);

        app.world_mut().write_message(PlayerCommand::ReleaseFire);
        app.update();
        let trigger = app.world().get::<FireTrigger>(player).unwrap();
        assert!(!trigger.held);
        assert!(trigger.released);
    }

    #[test]
    fn switch_command_cycles_weapons() {
        let mut app = create_combat_test_app();
        app.add_systems(Update, handle_player_commands);
        let player = spawn(&mut app);
        app.world_mut()
            .get_mut::<Arsenal>(player)
            .unwrap()
            .equip(Arc::new(WeaponDefinition::shotgun()));
        let before = active_name(&app, player);

        app.world_mut().write_message(PlayerCommand::SwitchWeapon);
        app.update();

        assert_ne!(active_name(&app, player), before);
    }

    fn active_name(app: &App, player: Entity) -> Option<String> {
        app.world()
            .get::<Arsenal>(player)
            .and_then(|a| a.active_weapon().map(|w| w.name.clone()))
    }
}
