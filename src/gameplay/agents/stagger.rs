//! Shot staggering: every shot nudges nearly-ready listeners back so a group
//! never volleys in lockstep.

use bevy::prelude::*;
use rand::Rng;

use super::decision::AgentDecision;
use super::{AgentState, Brain};
use crate::config::{CombatConfig, GameRng};
use crate::gameplay::events::ShotFired;
use crate::gameplay::vitals::Vitals;
use crate::{GameSet, gameplay_running};

/// Extra cooldown for a listener whose shot is due within the threshold.
/// `None` when the listener is ready or far from ready.
pub fn stagger_delay(next_shot_in: f32, config: &CombatConfig, rng: &mut impl Rng) -> Option<f32> {
    (next_shot_in > 0.0 && next_shot_in < config.stagger_threshold)
        .then(|| rng.random_range(config.stagger_min..config.stagger_max))
}

fn stagger_on_shot(
    mut shots: MessageReader<ShotFired>,
    config: Res<CombatConfig>,
    mut rng: ResMut<GameRng>,
    mut listeners: Query<(Entity, &Brain, &Vitals, &mut AgentState)>,
) {
    for shot in shots.read() {
        for (entity, brain, vitals, mut state) in &mut listeners {
            if entity == shot.shooter || !brain.enabled || !vitals.is_alive() {
                continue;
            }
            if let Some(extra) = stagger_delay(state.next_shot_in, &config, &mut rng.0) {
                state.next_shot_in += extra;
            }
        }
    }
}

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        FixedUpdate,
        stagger_on_shot
            .in_set(GameSet::Ai)
            .after(AgentDecision)
            .run_if(gameplay_running),
    );
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::gameplay::templates::EntityTemplate;
    use crate::testing::create_combat_test_app;
    use pretty_assertions::assert_eq;

    fn spawn_listener(app: &mut App, next_shot_in: f32) -> Entity {
        app.world_mut()
            .spawn((
                Brain::default(),
                Vitals::from_template(&EntityTemplate::grunt()),
                AgentState {
                    next_shot_in,
                    ..default()
                },
            ))
            .id()
    }

    fn cooldown(app: &App, entity: Entity) -> f32 {
        app.world().get::<AgentState>(entity).unwrap().next_shot_in
    }

    #[test]
    fn shot_staggers_only_other_nearly_ready_agents() {
        let mut app = create_combat_test_app();
        app.add_systems(Update, stagger_on_shot);

        let shooter = spawn_listener(&mut app, 0.5);
        let nearly_ready = spawn_listener(&mut app, 0.5);
        let ready = spawn_listener(&mut app, 0.0);
        let far = spawn_listener(&mut app, 1.5);
        let asleep = spawn_listener(&mut app, 0.5);
        app.world_mut().get_mut::<Brain>(asleep).unwrap().enabled = false;

        app.world_mut().write_message(ShotFired { shooter });
        app.update();

        assert_eq!(cooldown(&app, shooter), 0.5);
        let staggered = cooldown(&app, nearly_ready) - 0.5;
        assert!((0.2..1.0).contains(&staggered), "{staggered}");
        assert_eq!(cooldown(&app, ready), 0.0);
        assert_eq!(cooldown(&app, far), 1.5);
        assert_eq!(cooldown(&app, asleep), 0.5);
    }

    #[test]
    fn dead_listeners_are_skipped() {
        let mut app = create_combat_test_app();
        app.add_systems(Update, stagger_on_shot);

        let shooter = spawn_listener(&mut app, 0.0);
        let corpse = spawn_listener(&mut app, 0.5);
        app.world_mut().get_mut::<Vitals>(corpse).unwrap().die();

        app.world_mut().write_message(ShotFired { shooter });
        app.update();

        assert_eq!(cooldown(&app, corpse), 0.5);
    }
}
