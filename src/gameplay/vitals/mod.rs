//! Combat stats: health, resistances, invincibility, damage, heal, and the
//! player's delayed death.

pub mod death;
pub mod effects;

use avian2d::prelude::*;
use bevy::prelude::*;
use rand::Rng;
use thiserror::Error;

use crate::config::{CombatConfig, GameRng};
use crate::gameplay::events::{
    AnimationCue, Cue, DamageDealt, DamageRequest, DeathRequested, DeathScreenRequested,
    HealRequest, PlayerHealthChanged, PlayerRevived, ReviveRequested,
};
use crate::gameplay::templates::EntityTemplate;
use crate::gameplay::weapons::Arsenal;
use crate::gameplay::Faction;
use crate::tasks::Scheduler;
use crate::{GameSet, gameplay_running};

use self::effects::StatusEffects;

// === Constants ===

/// Flash shown when typed damage lands without applying an effect.
pub const HIT_FLASH_COLOR: Color = Color::WHITE;

/// Flash shown on a successful heal.
pub const HEAL_FLASH_COLOR: Color = Color::srgba(0.0, 1.0, 0.65, 0.55);

// === Errors ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CombatError {
    #[error("vitals used before a template was applied")]
    TemplateNotApplied,
    #[error("revive requested but the entity is not dying")]
    NotDying,
}

// === Types ===

/// Elemental type of a hit. `None` and `Physical` never inflict status effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum DamageType {
    #[default]
    None,
    Physical,
    Fire,
    Poison,
    Electric,
    Ice,
}

impl DamageType {
    /// Whether a hit of this type rolls for status effects.
    #[must_use]
    pub const fn inflicts_effects(self) -> bool {
        !matches!(self, Self::None | Self::Physical)
    }
}

/// One damage application, as delivered through the damage sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub amount: f32,
    /// World position the hit came from. `Vec2::ZERO` means no knockback.
    pub source_position: Vec2,
    pub damage_type: DamageType,
    pub effect_chance: f32,
    /// Damage-over-time ticks bypass and do not refresh invincibility.
    pub is_effect_tick: bool,
    pub from_player: bool,
}

impl Hit {
    /// Untyped hit with no source, effects, or knockback.
    #[must_use]
    pub const fn new(amount: f32) -> Self {
        Self {
            amount,
            source_position: Vec2::ZERO,
            damage_type: DamageType::None,
            effect_chance: 0.0,
            is_effect_tick: false,
            from_player: false,
        }
    }

    #[must_use]
    pub const fn from_position(mut self, position: Vec2) -> Self {
        self.source_position = position;
        self
    }

    #[must_use]
    pub const fn typed(mut self, damage_type: DamageType, effect_chance: f32) -> Self {
        self.damage_type = damage_type;
        self.effect_chance = effect_chance;
        self
    }

    #[must_use]
    pub const fn effect_tick(mut self) -> Self {
        self.is_effect_tick = true;
        self
    }

    #[must_use]
    pub const fn by_player(mut self, from_player: bool) -> Self {
        self.from_player = from_player;
        self
    }
}

/// How a lethal hit resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lethal {
    /// Non-player: dies this frame.
    Immediate,
    /// Player: enters the delayed-death sequence.
    Delayed,
}

/// Result of [`Vitals::damage`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DamageReport {
    /// False when the hit was swallowed by invincibility.
    pub applied: bool,
    /// Status effects rolled successfully (each is the hit's own type).
    pub effects_applied: u32,
    pub lethal: Option<Lethal>,
    /// Request for the short white flash.
    pub hit_flash: bool,
    pub health_ratio: f32,
}

impl DamageReport {
    #[must_use]
    pub fn ignored() -> Self {
        Self::default()
    }
}

/// Where an entity is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum Lifecycle {
    #[default]
    Alive,
    /// Player only: waiting out the revive window.
    Dying,
    Dead,
}

/// Steps of the player's delayed death.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathStage {
    ShowDeadScreen,
    Remove,
}

// === Components ===

/// Health, resistances, and life state of a combatant.
///
/// Starts without a template; [`Vitals::apply_template`] must run before any
/// damage or heal call.
#[derive(Component, Debug, Clone)]
pub struct Vitals {
    current: f32,
    max: f32,
    faction: Faction,
    resistances: Vec<DamageType>,
    applied: bool,
    lifecycle: Lifecycle,
    invincible_for: f32,
    always_invincible: bool,
    stages: Scheduler<DeathStage>,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            current: 0.0,
            max: 0.0,
            faction: Faction::Enemy,
            resistances: Vec::new(),
            applied: false,
            lifecycle: Lifecycle::Alive,
            invincible_for: 0.0,
            always_invincible: false,
            stages: Scheduler::new(),
        }
    }
}

impl Vitals {
    #[must_use]
    pub fn from_template(template: &EntityTemplate) -> Self {
        let mut vitals = Self::default();
        vitals.apply_template(template);
        vitals
    }

    /// Copy health, resistances, and faction from `template` and restore full
    /// health. Calling again acts as a respawn.
    pub fn apply_template(&mut self, template: &EntityTemplate) {
        self.max = template.max_health;
        self.current = template.max_health;
        self.faction = template.faction;
        self.resistances.clone_from(&template.resistances);
        self.applied = true;
        self.lifecycle = Lifecycle::Alive;
        self.invincible_for = 0.0;
        self.stages.clear();
    }

    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Alive)
    }

    #[must_use]
    pub fn is_invincible(&self) -> bool {
        self.always_invincible || self.invincible_for > 0.0
    }

    /// Toggle the always-invincible override. Independent of the post-hit window.
    pub const fn set_invincibility(&mut self, permanent: bool) {
        self.always_invincible = permanent;
    }

    pub fn damage(
        &mut self,
        hit: &Hit,
        config: &CombatConfig,
        rng: &mut impl Rng,
    ) -> Result<DamageReport, CombatError> {
        if !self.applied {
            return Err(CombatError::TemplateNotApplied);
        }

        let is_player = self.faction == Faction::Player;
        if is_player && !hit.is_effect_tick {
            if self.is_invincible() {
                return Ok(DamageReport::ignored());
            }
            self.invincible_for = config.invincibility_window;
        }

        self.current -= hit.amount;

        let lethal = if self.current <= 0.0 && self.is_alive() {
            if is_player {
                self.begin_dying(config);
                Some(Lethal::Delayed)
            } else {
                Some(Lethal::Immediate)
            }
        } else {
            None
        };

        let mut effects_applied = 0;
        if hit.damage_type.inflicts_effects() {
            for &entry in &self.resistances {
                if entry != hit.damage_type && rng.random::<f32>() <= hit.effect_chance {
                    effects_applied += 1;
                }
            }
        }

        Ok(DamageReport {
            applied: true,
            effects_applied,
            lethal,
            hit_flash: effects_applied == 0 && hit.damage_type != DamageType::None,
            health_ratio: self.ratio(),
        })
    }

    /// Restore up to `amount`. Returns `Ok(false)` when already at max.
    pub fn heal(&mut self, amount: f32) -> Result<bool, CombatError> {
        if !self.applied {
            return Err(CombatError::TemplateNotApplied);
        }
        if self.current >= self.max {
            return Ok(false);
        }
        self.current = (self.current + amount).min(self.max);
        Ok(true)
    }

    /// Terminal transition. Returns `true` only the first time.
    pub fn die(&mut self) -> bool {
        if self.lifecycle == Lifecycle::Dead {
            return false;
        }
        self.lifecycle = Lifecycle::Dead;
        self.stages.clear();
        true
    }

    /// Leave the delayed-death window alive at full health.
    pub fn revive(&mut self) -> Result<(), CombatError> {
        if self.lifecycle != Lifecycle::Dying {
            return Err(CombatError::NotDying);
        }
        self.stages.clear();
        self.lifecycle = Lifecycle::Alive;
        self.current = self.max;
        Ok(())
    }

    /// Count down invincibility and advance the delayed-death sequence.
    pub fn tick(&mut self, dt: f32) -> Vec<DeathStage> {
        self.invincible_for = (self.invincible_for - dt).max(0.0);
        self.stages.advance(dt)
    }

    /// Whether a death stage is still pending.
    #[must_use]
    pub fn death_pending(&self) -> bool {
        !self.stages.is_empty()
    }

    fn begin_dying(&mut self, config: &CombatConfig) {
        self.lifecycle = Lifecycle::Dying;
        self.stages.clear();
        self.stages
            .schedule(config.death_screen_delay, DeathStage::ShowDeadScreen);
        self.stages.schedule(
            config.death_screen_delay + config.removal_delay,
            DeathStage::Remove,
        );
    }
}

/// Knockback impulse pushing `target` away from `source`. `None` when there is
/// no source or the two coincide.
#[must_use]
pub fn knockback(target: Vec2, source: Vec2, impulse: f32) -> Option<Vec2> {
    if source == Vec2::ZERO {
        return None;
    }
    (target - source).try_normalize().map(|dir| dir * impulse)
}

// === Systems ===

/// Damage sink: applies every `DamageRequest` to its target's `Vitals`.
/// Runs in `GameSet::Combat`, after projectile and explosion resolution.
fn apply_damage(
    mut requests: MessageReader<DamageRequest>,
    config: Res<CombatConfig>,
    mut rng: ResMut<GameRng>,
    mut targets: Query<(
        &mut Vitals,
        Option<&mut StatusEffects>,
        Option<&mut LinearVelocity>,
        Option<&GlobalTransform>,
    )>,
    mut health_changed: MessageWriter<PlayerHealthChanged>,
    mut dealt: MessageWriter<DamageDealt>,
    mut deaths: MessageWriter<DeathRequested>,
    mut cues: MessageWriter<AnimationCue>,
) {
    for request in requests.read() {
        let Ok((mut vitals, effects, velocity, transform)) = targets.get_mut(request.target)
        else {
            continue;
        };
        if vitals.lifecycle() == Lifecycle::Dead {
            continue;
        }

        let report = match vitals.damage(&request.hit, &config, &mut rng.0) {
            Ok(report) => report,
            Err(err) => {
                warn!("Damage on {:?} rejected: {err}", request.target);
                continue;
            }
        };
        if !report.applied {
            continue;
        }

        let position = transform.map(|t| t.translation().xy());
        if let (Some(position), Some(mut velocity)) = (position, velocity) {
            if let Some(impulse) = knockback(
                position,
                request.hit.source_position,
                config.knockback_impulse,
            ) {
                velocity.0 += impulse;
            }
        }

        if report.effects_applied > 0 {
            if let Some(mut effects) = effects {
                effects.apply(request.hit.damage_type);
            }
        }

        if vitals.faction() == Faction::Player {
            health_changed.write(PlayerHealthChanged {
                entity: request.target,
                ratio: report.health_ratio,
            });
        } else if request.hit.from_player {
            dealt.write(DamageDealt {
                target: request.target,
                amount: request.hit.amount,
                position: position.unwrap_or_default(),
            });
        }

        if report.hit_flash {
            cues.write(AnimationCue::new(
                request.target,
                Cue::HitFlash {
                    color: HIT_FLASH_COLOR,
                    duration: config.hit_flash_duration,
                },
            ));
        }

        match report.lethal {
            Some(Lethal::Immediate) => {
                deaths.write(DeathRequested {
                    entity: request.target,
                });
            }
            Some(Lethal::Delayed) => {
                info!("Player {:?} is down, revive window open", request.target);
                cues.write(AnimationCue::new(request.target, Cue::Dead));
            }
            None => {}
        }
    }
}

/// Applies `HealRequest`s. Runs in `GameSet::Combat`.
fn apply_heal(
    mut requests: MessageReader<HealRequest>,
    config: Res<CombatConfig>,
    mut targets: Query<&mut Vitals>,
    mut health_changed: MessageWriter<PlayerHealthChanged>,
    mut cues: MessageWriter<AnimationCue>,
) {
    for request in requests.read() {
        let Ok(mut vitals) = targets.get_mut(request.target) else {
            continue;
        };
        if !vitals.is_alive() {
            continue;
        }
        match vitals.heal(request.amount) {
            Ok(true) => {
                cues.write(AnimationCue::new(
                    request.target,
                    Cue::HitFlash {
                        color: HEAL_FLASH_COLOR,
                        duration: config.heal_flash_duration,
                    },
                ));
                if vitals.faction() == Faction::Player {
                    health_changed.write(PlayerHealthChanged {
                        entity: request.target,
                        ratio: vitals.ratio(),
                    });
                }
            }
            Ok(false) => {}
            Err(err) => warn!("Heal on {:?} rejected: {err}", request.target),
        }
    }
}

/// Counts down invincibility and drives the player's delayed death.
/// Runs in `GameSet::Death`.
fn tick_vitals(
    time: Res<Time>,
    mut vitals: Query<(Entity, &mut Vitals)>,
    mut dead_screen: MessageWriter<DeathScreenRequested>,
    mut deaths: MessageWriter<DeathRequested>,
) {
    let dt = time.delta_secs();
    for (entity, mut vitals) in &mut vitals {
        for stage in vitals.tick(dt) {
            match stage {
                DeathStage::ShowDeadScreen => {
                    dead_screen.write(DeathScreenRequested { entity });
                }
                DeathStage::Remove => {
                    deaths.write(DeathRequested { entity });
                }
            }
        }
    }
}

/// Revives a dying player: full health, full energy, pending stages cancelled.
fn revive(
    mut requests: MessageReader<ReviveRequested>,
    mut players: Query<(&mut Vitals, Option<&mut Arsenal>)>,
    mut revived: MessageWriter<PlayerRevived>,
    mut health_changed: MessageWriter<PlayerHealthChanged>,
) {
    for request in requests.read() {
        let Ok((mut vitals, arsenal)) = players.get_mut(request.entity) else {
            continue;
        };
        if vitals.revive().is_err() {
            continue;
        }
        if let Some(mut arsenal) = arsenal {
            let max = arsenal.max_energy();
            arsenal.add_energy(max);
        }
        info!("Revived {:?}", request.entity);
        health_changed.write(PlayerHealthChanged {
            entity: request.entity,
            ratio: vitals.ratio(),
        });
        revived.write(PlayerRevived {
            entity: request.entity,
        });
    }
}

// === Plugin ===

pub(super) fn plugin(app: &mut App) {
    app.register_type::<DamageType>()
        .register_type::<Lifecycle>();

    app.add_plugins((effects::plugin, death::plugin));

    app.add_systems(
        Update,
        (
            (revive, apply_heal, apply_damage)
                .chain()
                .in_set(GameSet::Combat)
                .after(crate::gameplay::weapons::HitResolution),
            tick_vitals.in_set(GameSet::Death).before(death::DeathCheck),
        )
            .run_if(gameplay_running),
    );
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::gameplay::templates::EntityTemplate;
    use crate::testing::{capture_messages, captured, create_combat_test_app};
    use pretty_assertions::assert_eq;

    fn create_damage_test_app() -> App {
        let mut app = create_combat_test_app();
        app.add_systems(Update, (revive, apply_heal, apply_damage).chain());
        capture_messages::<PlayerHealthChanged>(&mut app);
        capture_messages::<DeathRequested>(&mut app);
        capture_messages::<DamageDealt>(&mut app);
        capture_messages::<AnimationCue>(&mut app);
        capture_messages::<PlayerRevived>(&mut app);
        app
    }

    fn spawn_with(app: &mut App, template: &EntityTemplate, position: Vec2) -> Entity {
        app.world_mut()
            .spawn((
                Vitals::from_template(template),
                StatusEffects::default(),
                LinearVelocity::ZERO,
                Transform::from_translation(position.extend(0.0)),
                GlobalTransform::from(Transform::from_translation(position.extend(0.0))),
            ))
            .id()
    }

    #[test]
    fn damage_request_reduces_health() {
        let mut app = create_damage_test_app();
        let grunt = spawn_with(&mut app, &EntityTemplate::grunt(), Vec2::ZERO);
        let max = app.world().get::<Vitals>(grunt).unwrap().max();

        app.world_mut()
            .write_message(DamageRequest::new(grunt, Hit::new(4.0)));
        app.update();

        assert_eq!(app.world().get::<Vitals>(grunt).unwrap().current(), max - 4.0);
    }

    #[test]
    fn lethal_request_asks_for_death_once() {
        let mut app = create_damage_test_app();
        let grunt = spawn_with(&mut app, &EntityTemplate::grunt(), Vec2::ZERO);

        app.world_mut()
            .write_message(DamageRequest::new(grunt, Hit::new(1000.0)));
        app.update();

        assert_eq!(captured::<DeathRequested>(&app).len(), 1);
    }

    #[test]
    fn player_damage_reports_health_ratio() {
        let mut app = create_damage_test_app();
        let player = spawn_with(&mut app, &EntityTemplate::player(), Vec2::ZERO);
        let max = app.world().get::<Vitals>(player).unwrap().max();

        app.world_mut()
            .write_message(DamageRequest::new(player, Hit::new(max / 4.0)));
        app.update();

        let changes = captured::<PlayerHealthChanged>(&app);
        assert_eq!(changes.len(), 1);
        assert!((changes[0].ratio - 0.75).abs() < 1e-5);
    }

    #[test]
    fn player_hit_on_enemy_feeds_damage_popup() {
        let mut app = create_damage_test_app();
        let grunt = spawn_with(&mut app, &EntityTemplate::grunt(), Vec2::ZERO);

        app.world_mut().write_message(DamageRequest::new(
            grunt,
            Hit::new(3.0).by_player(true),
        ));
        app.update();

        let dealt = captured::<DamageDealt>(&app);
        assert_eq!(dealt.len(), 1);
        assert_eq!(dealt[0].amount, 3.0);
    }

    #[test]
    fn knockback_pushes_velocity() {
        let mut app = create_damage_test_app();
        let grunt = spawn_with(&mut app, &EntityTemplate::grunt(), Vec2::new(5.0, 0.0));

        app.world_mut().write_message(DamageRequest::new(
            grunt,
            Hit::new(1.0).from_position(Vec2::new(4.0, 0.0)),
        ));
        app.update();

        let velocity = app.world().get::<LinearVelocity>(grunt).unwrap();
        assert!(velocity.x > 0.0, "pushed away from source, got {velocity:?}");
    }

    #[test]
    fn missing_template_is_logged_not_applied() {
        let mut app = create_damage_test_app();
        let blank = app.world_mut().spawn(Vitals::default()).id();

        app.world_mut()
            .write_message(DamageRequest::new(blank, Hit::new(1000.0)));
        app.update();

        assert!(captured::<DeathRequested>(&app).is_empty());
    }

    #[test]
    fn typed_hit_applies_status_effect() {
        let mut app = create_damage_test_app();
        let template = EntityTemplate::grunt().with_resistances(vec![DamageType::Ice]);
        let grunt = spawn_with(&mut app, &template, Vec2::ZERO);

        app.world_mut().write_message(DamageRequest::new(
            grunt,
            Hit::new(1.0).typed(DamageType::Fire, 1.0),
        ));
        app.update();

        let effects = app.world().get::<StatusEffects>(grunt).unwrap();
        assert!(effects.is_active(DamageType::Fire));
    }

    #[test]
    fn heal_request_flashes_green() {
        let mut app = create_damage_test_app();
        let grunt = spawn_with(&mut app, &EntityTemplate::grunt(), Vec2::ZERO);
        app.world_mut()
            .get_mut::<Vitals>(grunt)
            .unwrap()
            .damage(&Hit::new(5.0), &CombatConfig::default(), &mut crate::testing::seeded_rng())
            .unwrap();

        app.world_mut().write_message(HealRequest {
            target: grunt,
            amount: 2.0,
        });
        app.update();

        let flashes: Vec<_> = captured::<AnimationCue>(&app)
            .into_iter()
            .filter(|c| matches!(c.cue, Cue::HitFlash { color, .. } if color == HEAL_FLASH_COLOR))
            .collect();
        assert_eq!(flashes.len(), 1);
    }

    #[test]
    fn revive_request_restores_dying_player() {
        let mut app = create_damage_test_app();
        let player = spawn_with(&mut app, &EntityTemplate::player(), Vec2::ZERO);

        app.world_mut()
            .write_message(DamageRequest::new(player, Hit::new(1000.0)));
        app.update();
        assert_eq!(
            app.world().get::<Vitals>(player).unwrap().lifecycle(),
            Lifecycle::Dying
        );

        app.world_mut()
            .write_message(ReviveRequested { entity: player });
        app.update();

        let vitals = app.world().get::<Vitals>(player).unwrap();
        assert!(vitals.is_alive());
        assert_eq!(vitals.current(), vitals.max());
        assert_eq!(captured::<PlayerRevived>(&app).len(), 1);
    }
}
