//! Enemy agents: per-tick decisions, steering, and shot staggering.

pub mod decision;
pub mod steering;
pub mod stagger;

use avian2d::prelude::*;
use bevy::prelude::*;
use rand::Rng;

use super::targeting::{Detection, Detector, SightTag};
use super::templates::{Archetype, EntityTemplate, JumpProfile};
use super::vitals::Vitals;
use super::vitals::death::Detonation;
use super::vitals::effects::StatusEffects;
use super::weapons::{WeaponCatalog, spawn_loadout};
use super::{CurrentTarget, Faction, IgnoreFactions, Movement, Targetable};
use crate::config::CombatConfig;
use crate::tasks::Scheduler;
use crate::third_party::combatant_layers;

pub use self::steering::Steering;

/// Body radius of every agent.
pub const AGENT_RADIUS: f32 = 0.4;

/// Fraction of full speed used while strafing in place.
pub const MICRO_WANDER_SCALE: f32 = 0.3;

// === Components ===

/// Switch for the decision loop. Disabled agents keep their state but stop
/// deciding, shooting, and listening for staggers.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Brain {
    pub enabled: bool,
}

impl Default for Brain {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Per-agent values rolled once at spawn.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AgentProfile {
    pub aim_range: f32,
    /// Approaching agents still shoot inside this range.
    pub secondary_aim_range: f32,
    /// Exclusive upper bound, in whole seconds, of the post-shot cooldown.
    pub attack_delay: u32,
    #[reflect(ignore)]
    pub jump: Option<JumpProfile>,
    pub kamikaze: bool,
}

impl AgentProfile {
    pub fn roll(template: &EntityTemplate, rng: &mut impl Rng) -> Self {
        let (min, max) = template.aim_range;
        let aim_range = if min < max {
            rng.random_range(min..max)
        } else {
            min
        };
        let secondary = rng.random_range(0..=2_u8);
        Self {
            aim_range,
            secondary_aim_range: aim_range + f32::from(secondary),
            attack_delay: template.attack_delay,
            jump: template.jump,
            kamikaze: matches!(template.archetype, Archetype::Kamikaze { .. }),
        }
    }

    /// Roll the cooldown after a shot: a whole number of seconds below `attack_delay`.
    #[allow(clippy::cast_precision_loss)]
    pub fn roll_shot_cooldown(&self, rng: &mut impl Rng) -> f32 {
        if self.attack_delay == 0 {
            0.0
        } else {
            rng.random_range(0..self.attack_delay) as f32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum AgentMode {
    #[default]
    Idle,
    Aiming,
    Approaching,
    Wandering,
    Jumping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentTask {
    /// Give up on `target` if it still has not been reached.
    ReachWatchdog { target: Entity },
}

/// Mutable decision state of one agent.
#[derive(Component, Debug, Clone, Default)]
pub struct AgentState {
    pub mode: AgentMode,
    pub aiming: bool,
    pub shooting: bool,
    /// Seconds until the agent may shoot again.
    pub next_shot_in: f32,
    /// Seconds until the wander direction is re-rolled.
    pub wander_in: f32,
    /// Seconds accumulated toward the next jump.
    pub jump_charge: f32,
    /// Seconds of jump impulse left.
    pub jump_left: f32,
    pub last_dir: Vec2,
    pub reached: bool,
    pub tasks: Scheduler<AgentTask>,
}

impl AgentState {
    #[must_use]
    pub const fn is_jumping(&self) -> bool {
        self.jump_left > 0.0
    }

    /// Advance countdowns. Returns `true` when a reach watchdog expired for
    /// `current` while it was still unreached.
    pub fn tick(&mut self, dt: f32, profile: &AgentProfile, current: Option<Entity>) -> bool {
        self.next_shot_in = (self.next_shot_in - dt).max(0.0);
        self.wander_in = (self.wander_in - dt).max(0.0);
        if let Some(jump) = profile.jump {
            self.jump_charge = (self.jump_charge + dt).min(jump.cooldown);
        }
        self.jump_left = (self.jump_left - dt).max(0.0);

        let mut drop_target = false;
        for task in self.tasks.advance(dt) {
            match task {
                AgentTask::ReachWatchdog { target } => {
                    if !self.reached && current == Some(target) {
                        drop_target = true;
                    }
                }
            }
        }
        drop_target
    }

    /// Commit to moving toward `target` along `direction`. Starts the reach
    /// watchdog unless one is already in flight.
    pub fn begin_approach(&mut self, target: Entity, direction: Vec2, timeout: f32) {
        self.mode = AgentMode::Approaching;
        self.reached = false;
        self.last_dir = direction;
        if !self
            .tasks
            .contains(|task| matches!(task, AgentTask::ReachWatchdog { .. }))
        {
            self.tasks
                .schedule(timeout, AgentTask::ReachWatchdog { target });
        }
    }

    /// Forget per-target bookkeeping after the target changed.
    pub fn retarget(&mut self) {
        self.tasks
            .cancel_where(|task| matches!(task, AgentTask::ReachWatchdog { .. }));
    }

    /// Decide whether to pull the trigger now. Never shoots through an ally.
    pub fn try_shoot(
        &mut self,
        profile: &AgentProfile,
        faction: Faction,
        sight: Option<SightTag>,
        armed: bool,
        rng: &mut impl Rng,
    ) -> bool {
        if sight == Some(SightTag::of(faction)) {
            return false;
        }
        if !armed || self.next_shot_in > 0.0 {
            return false;
        }
        self.next_shot_in = profile.roll_shot_cooldown(rng);
        self.shooting = true;
        true
    }

    /// Returns whether the agent was shooting.
    pub fn stop_shooting(&mut self) -> bool {
        std::mem::take(&mut self.shooting)
    }

    /// New wander heading once the current leg ran out.
    pub fn wander_leg(&mut self, max_leg: f32, rng: &mut impl Rng) -> Option<Vec2> {
        if self.wander_in > 0.0 {
            return None;
        }
        self.wander_in = if max_leg > 0.0 {
            rng.random_range(0.0..max_leg)
        } else {
            0.0
        };
        Some(Vec2::from_angle(rng.random_range(0.0..std::f32::consts::TAU)))
    }

    /// Start a jump if charged and there is a heading to jump along.
    pub fn try_jump(&mut self, profile: &AgentProfile) -> bool {
        let Some(jump) = profile.jump else {
            return false;
        };
        if self.is_jumping() || self.jump_charge < jump.cooldown || self.last_dir == Vec2::ZERO {
            return false;
        }
        self.jump_charge = 0.0;
        self.jump_left = jump.duration;
        self.mode = AgentMode::Jumping;
        true
    }

    /// Impulse velocity while a jump is held.
    #[must_use]
    pub fn jump_velocity(&self, profile: &AgentProfile) -> Option<Vec2> {
        let jump = profile.jump?;
        self.is_jumping().then(|| self.last_dir * jump.force)
    }
}

// === Spawning ===

/// Spawn a fully equipped agent. Non-player agents get a random speed offset;
/// kamikaze templates carry a [`Detonation`].
pub fn spawn_agent(
    commands: &mut Commands,
    template: &EntityTemplate,
    position: Vec2,
    catalog: &WeaponCatalog,
    config: &CombatConfig,
    rng: &mut impl Rng,
) -> Entity {
    let mut speed = template.speed;
    if template.faction != Faction::Player {
        let (low, high) = config.enemy_speed_jitter;
        speed += rng.random_range(low..high);
    }
    let profile = AgentProfile::roll(template, rng);

    let mut agent = commands.spawn((
        Name::new(template.name.clone()),
        template.faction,
        IgnoreFactions::allies_of(template.faction),
        Vitals::from_template(template),
        StatusEffects::default(),
        CurrentTarget::default(),
        Movement { speed },
        Targetable,
        spawn_loadout(template, catalog),
        (
            Brain::default(),
            profile,
            AgentState::default(),
            Steering::default(),
            Detection::default(),
            Detector::new(template.search_range, config.detection_interval),
        ),
        (
            RigidBody::Kinematic,
            Collider::circle(AGENT_RADIUS),
            combatant_layers(),
            LinearVelocity::ZERO,
        ),
        Transform::from_translation(position.extend(0.0)),
    ));

    if let Archetype::Kamikaze {
        damage,
        damage_type,
    } = template.archetype
    {
        agent.insert(Detonation {
            radius: config.kamikaze_explosion_radius,
            force: config.kamikaze_explosion_force,
            damage,
            damage_type,
        });
    }
    agent.id()
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Brain>()
        .register_type::<AgentProfile>()
        .register_type::<AgentMode>()
        .register_type::<Steering>();

    app.add_plugins((decision::plugin, steering::plugin, stagger::plugin));
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::config::GameRng;
    use crate::testing::{assert_entity_count, create_combat_test_app};

    fn spawn(app: &mut App, template: &EntityTemplate) -> Entity {
        let world = app.world_mut();
        let catalog = WeaponCatalog::default();
        let config = CombatConfig::default();
        let mut rng = world.resource::<GameRng>().clone();
        let entity = {
            let mut commands = world.commands();
            spawn_agent(
                &mut commands,
                template,
                Vec2::new(1.0, 2.0),
                &catalog,
                &config,
                &mut rng.0,
            )
        };
        world.flush();
        entity
    }

    #[test]
    fn spawned_agent_has_all_components() {
        let mut app = create_combat_test_app();
        let agent = spawn(&mut app, &EntityTemplate::grunt());

        let world = app.world();
        assert!(world.get::<Brain>(agent).is_some_and(|b| b.enabled));
        assert!(world.get::<AgentState>(agent).is_some());
        assert!(world.get::<Detector>(agent).is_some());
        assert!(world.get::<Targetable>(agent).is_some());
        assert!(world.get::<Detonation>(agent).is_none());
        assert_eq!(
            world.get::<Transform>(agent).map(|t| t.translation.xy()),
            Some(Vec2::new(1.0, 2.0))
        );
        assert_entity_count::<With<AgentProfile>>(&mut app, 1);
    }

    #[test]
    fn enemy_speed_is_jittered_within_range() {
        let mut app = create_combat_test_app();
        let template = EntityTemplate::grunt();
        let agent = spawn(&mut app, &template);

        let speed = app.world().get::<Movement>(agent).map(|m| m.speed);
        let (low, high) = CombatConfig::default().enemy_speed_jitter;
        assert!(speed.is_some_and(|s| s >= template.speed + low && s < template.speed + high));
    }

    #[test]
    fn kamikaze_carries_detonation() {
        let mut app = create_combat_test_app();
        let agent = spawn(&mut app, &EntityTemplate::kamikaze());

        let detonation = app.world().get::<Detonation>(agent).copied();
        assert!(detonation.is_some_and(|d| d.radius == 1.0 && d.force == 70.0 && d.damage == 25.0));
    }
}
