//! The weapon inventory a combatant carries: slot ring, energy pool, crit
//! bonuses, and the fire-control state machine.
//!
//! Everything here is plain data driven by the systems in `fire`. A single
//! [`Arsenal::fire`] call either commits fully (energy taken, cooldown started)
//! or changes nothing.

use bevy::prelude::*;
use rand::Rng;

use super::crit::{CritResult, RandomDice, roll_crit};
use super::{
    DEFAULT_CAPACITY, EXPLOSION_RADIUS, FireError, ProjectilePrototype, WeaponCatalog,
    WeaponDefinition, WeaponKind, WeaponRef,
};
use crate::gameplay::Faction;
use crate::gameplay::templates::EntityTemplate;
use crate::gameplay::vitals::DamageType;
use crate::tasks::Scheduler;

// === Slots ===

/// Stable identity of a slot. Survives reordering, so tasks scheduled for an
/// evicted slot can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u32);

#[derive(Debug, Clone)]
pub struct WeaponSlot {
    pub id: SlotId,
    pub weapon: WeaponRef,
    /// False for `fire_rate` seconds after each shot.
    pub ready: bool,
}

/// Ordered, bounded slot list with a named active index.
///
/// Equipping below capacity follows a round-robin policy: the active index
/// advances by one, wrapping to 0 when it was on the last slot. A fresh pickup
/// is therefore not necessarily the active weapon.
#[derive(Debug, Clone)]
pub struct SlotRing {
    slots: Vec<WeaponSlot>,
    active: usize,
    capacity: usize,
    next_id: u32,
}

impl Default for SlotRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SlotRing {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            active: 0,
            capacity: capacity.max(1),
            next_id: 0,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        (!self.slots.is_empty()).then_some(self.active)
    }

    #[must_use]
    pub fn active(&self) -> Option<&WeaponSlot> {
        self.slots.get(self.active)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut WeaponSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeaponSlot> {
        self.slots.iter()
    }

    /// Insert `weapon`, returning the evicted slot when the ring was full.
    pub fn equip(&mut self, weapon: WeaponRef) -> Option<WeaponSlot> {
        if self.slots.is_empty() {
            self.push(weapon);
            self.active = 0;
            return None;
        }

        if self.is_full() {
            let evicted = self.slots.remove(self.active);
            self.push(weapon);
            self.active = self.slots.len() - 1;
            return Some(evicted);
        }

        let was_last = self.active + 1 == self.slots.len();
        self.push(weapon);
        self.active = if was_last { 0 } else { self.active + 1 };
        None
    }

    /// Step the active index circularly. No-op with one slot or fewer.
    pub fn advance(&mut self) -> bool {
        if self.slots.len() <= 1 {
            return false;
        }
        self.active = (self.active + 1) % self.slots.len();
        true
    }

    fn push(&mut self, weapon: WeaponRef) {
        self.slots.push(WeaponSlot {
            id: SlotId(self.next_id),
            weapon,
            ready: true,
        });
        self.next_id += 1;
    }
}

// === Firing ===

/// Parameters derived from the active definition on every equip or switch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiringParams {
    pub damage: f32,
    pub fire_rate: f32,
    pub spread: f32,
    pub aim_range: f32,
    pub bullet_count: u32,
    pub time_between_shots: f32,
}

impl From<&WeaponDefinition> for FiringParams {
    fn from(weapon: &WeaponDefinition) -> Self {
        Self {
            damage: weapon.damage,
            fire_rate: weapon.fire_rate,
            spread: weapon.spread,
            aim_range: weapon.aim_range,
            bullet_count: weapon.bullet_count.max(1),
            time_between_shots: weapon.time_between_shots,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPoint {
    pub entity: Entity,
    pub position: Vec2,
}

/// Where the shooter stands and what it is pointing at this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimContext {
    pub origin: Vec2,
    /// Aim vector. Need not be normalised.
    pub direction: Vec2,
    pub target: Option<TargetPoint>,
    pub frozen: bool,
}

impl AimContext {
    #[must_use]
    pub const fn new(origin: Vec2, direction: Vec2) -> Self {
        Self {
            origin,
            direction,
            target: None,
            frozen: false,
        }
    }

    #[must_use]
    pub const fn with_target(mut self, target: Option<TargetPoint>) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub const fn frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    fn unit_direction(&self) -> Vec2 {
        self.direction.try_normalize().unwrap_or(Vec2::X)
    }
}

/// A projectile or strike ready to be spawned.
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub origin: Vec2,
    /// Unit vector.
    pub direction: Vec2,
    pub damage: f32,
    pub critical: bool,
    pub speed: f32,
    pub lifetime: f32,
    pub radius: f32,
    pub damage_type: DamageType,
    pub effect_chance: f32,
    /// Target the projectile steers toward, for autotarget weapons.
    pub homing: Option<Entity>,
    pub explosion_radius: Option<f32>,
    pub from_player: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    /// Projectiles from the equipped weapon. Bursts continue via tasks.
    Volley(Vec<Shot>),
    /// The unarmed fallback strike.
    Unarmed(Shot),
    /// One beam damage tick against the target.
    BeamTick {
        target: Entity,
        damage: f32,
        critical: bool,
        damage_type: DamageType,
        effect_chance: f32,
    },
    /// Beam held with no tick due; visual only.
    BeamSweep { end: Vec2 },
}

/// Continuations owned by an arsenal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireTask {
    /// Next shot of a burst from `slot`, with `remaining` shots still to go.
    Burst { slot: SlotId, remaining: u32 },
    BeamReady,
    SlotReady(SlotId),
    UnarmedReady,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TempCrit {
    amount: f32,
    remaining: f32,
}

// === Arsenal ===

/// Weapon inventory plus fire control for one combatant.
#[derive(Component, Debug, Clone)]
pub struct Arsenal {
    ring: SlotRing,
    params: Option<FiringParams>,
    faction: Faction,
    energy: f32,
    max_energy: f32,
    permanent_crit: f32,
    temp_crit: Vec<TempCrit>,
    unarmed: Option<WeaponRef>,
    unarmed_ready: bool,
    beam_active: bool,
    beam_tick_pending: bool,
    firing: bool,
    tasks: Scheduler<FireTask>,
}

impl Arsenal {
    /// Empty arsenal. Non-player energy is unbounded; the player starts at
    /// zero until [`Arsenal::set_energy`].
    #[must_use]
    pub fn new(faction: Faction) -> Self {
        Self::with_capacity(faction, DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(faction: Faction, capacity: usize) -> Self {
        let energy = match faction {
            Faction::Player => 0.0,
            Faction::Enemy => f32::INFINITY,
        };
        Self {
            ring: SlotRing::new(capacity),
            params: None,
            faction,
            energy,
            max_energy: energy,
            permanent_crit: 0.0,
            temp_crit: Vec::new(),
            unarmed: None,
            unarmed_ready: true,
            beam_active: false,
            beam_tick_pending: false,
            firing: false,
            tasks: Scheduler::new(),
        }
    }

    /// Loadout described by a template. Unknown weapon names are skipped with
    /// a warning.
    #[must_use]
    pub fn for_template(template: &EntityTemplate, catalog: &WeaponCatalog) -> Self {
        let mut arsenal = Self::new(template.faction);
        arsenal.set_energy(template.max_energy);
        arsenal.permanent_crit = template.permanent_crit;

        if let Some(name) = template.weapon {
            match catalog.get(name) {
                Some(weapon) => {
                    arsenal.equip(weapon);
                }
                None => warn!("{}: unknown weapon `{name}`", template.name),
            }
        }
        if template.faction == Faction::Player {
            if let Some(name) = template.unarmed {
                arsenal.unarmed = catalog.get(name);
                if arsenal.unarmed.is_none() {
                    warn!("{}: unknown unarmed weapon `{name}`", template.name);
                }
            }
        }
        arsenal
    }

    // --- Slots ---

    #[must_use]
    pub const fn slots(&self) -> &SlotRing {
        &self.ring
    }

    #[must_use]
    pub fn active_weapon(&self) -> Option<&WeaponRef> {
        self.ring.active().map(|slot| &slot.weapon)
    }

    #[must_use]
    pub const fn params(&self) -> Option<FiringParams> {
        self.params
    }

    #[must_use]
    pub fn has_weapon(&self) -> bool {
        !self.ring.is_empty()
    }

    /// Add `weapon` to the ring. Returns the evicted weapon when the ring was
    /// full; the caller turns it into a world drop.
    pub fn equip(&mut self, weapon: WeaponRef) -> Option<WeaponRef> {
        let evicted = self.ring.equip(weapon);
        self.loadout_changed();
        evicted.map(|slot| slot.weapon)
    }

    /// Cycle to the next slot. `false` with one slot or fewer.
    pub fn switch_weapon(&mut self) -> bool {
        if !self.ring.advance() {
            return false;
        }
        self.loadout_changed();
        true
    }

    pub fn set_unarmed(&mut self, weapon: Option<WeaponRef>) {
        self.unarmed = weapon;
    }

    #[must_use]
    pub const fn unarmed(&self) -> Option<&WeaponRef> {
        self.unarmed.as_ref()
    }

    fn loadout_changed(&mut self) {
        self.params = self.ring.active().map(|slot| FiringParams::from(&*slot.weapon));
        self.stop_firing();
    }

    // --- Energy ---

    #[must_use]
    pub const fn energy(&self) -> f32 {
        self.energy
    }

    #[must_use]
    pub const fn max_energy(&self) -> f32 {
        self.max_energy
    }

    /// Player only: set the pool size and fill it.
    pub fn set_energy(&mut self, max: f32) {
        if self.faction != Faction::Player {
            return;
        }
        self.max_energy = max;
        self.energy = max;
    }

    /// Refill up to max. `false` and unchanged when already full.
    pub fn add_energy(&mut self, amount: f32) -> bool {
        if self.energy >= self.max_energy {
            return false;
        }
        self.energy = (self.energy + amount).min(self.max_energy);
        true
    }

    pub fn take_energy(&mut self, amount: f32) {
        self.energy = (self.energy - amount).max(0.0);
    }

    fn can_afford(&self, weapon: &WeaponDefinition) -> bool {
        self.energy - weapon.energy_cost >= 0.0
    }

    // --- Crit ---

    pub fn add_permanent_crit(&mut self, amount: f32) {
        self.permanent_crit += amount;
    }

    /// Additive crit bonus that expires after `duration` seconds.
    pub fn add_temp_crit_chance(&mut self, amount: f32, duration: f32) {
        self.temp_crit.push(TempCrit {
            amount,
            remaining: duration,
        });
    }

    #[must_use]
    pub fn crit_total(&self, weapon: &WeaponDefinition) -> f32 {
        weapon.crit_chance
            + self.permanent_crit
            + self.temp_crit.iter().map(|bonus| bonus.amount).sum::<f32>()
    }

    // --- Fire control ---

    #[must_use]
    pub const fn is_firing(&self) -> bool {
        self.firing
    }

    #[must_use]
    pub const fn is_beaming(&self) -> bool {
        self.beam_active
    }

    /// Cancel the beam and pending burst continuations. Always safe.
    pub fn stop_firing(&mut self) {
        self.firing = false;
        self.beam_active = false;
        self.tasks
            .cancel_where(|task| matches!(task, FireTask::Burst { .. }));
    }

    /// Drop every in-flight continuation. Used on death.
    pub fn cancel_all(&mut self) {
        self.stop_firing();
        self.tasks.clear();
    }

    /// Attempt one trigger pull. All gates are checked before anything
    /// changes.
    pub fn fire(
        &mut self,
        ctx: &AimContext,
        rng: &mut impl Rng,
    ) -> Result<FireOutcome, FireError> {
        if ctx.frozen {
            return Err(FireError::Frozen);
        }

        if let Some(unarmed) = self.unarmed_fallback(ctx) {
            return self.strike_unarmed(&unarmed, ctx, rng);
        }

        let (slot_id, ready, weapon) = match self.ring.active() {
            Some(slot) => (slot.id, slot.ready, slot.weapon.clone()),
            None => return Err(FireError::NoWeapon),
        };
        let params = self
            .params
            .unwrap_or_else(|| FiringParams::from(&*weapon));

        if weapon.kind == WeaponKind::Beam {
            return self.fire_beam(&weapon, &params, ctx, rng);
        }

        if !ready {
            return Err(FireError::CoolingDown);
        }
        if !self.can_afford(&weapon) {
            return Err(FireError::InsufficientEnergy);
        }
        let Some(prototype) = weapon.projectile else {
            return Err(FireError::MissingProjectile {
                weapon: weapon.name.clone(),
            });
        };

        self.take_energy(weapon.energy_cost);
        if let Some(slot) = self.ring.get_mut(slot_id) {
            slot.ready = false;
        }
        self.tasks.schedule(params.fire_rate, FireTask::SlotReady(slot_id));
        self.firing = true;

        let shots = match weapon.kind {
            WeaponKind::Shotgun => (0..params.bullet_count)
                .map(|_| self.make_shot(&weapon, &params, prototype, ctx, true, rng))
                .collect(),
            WeaponKind::Melee => {
                vec![self.make_shot(&weapon, &params, prototype, ctx, false, rng)]
            }
            _ => {
                if params.bullet_count > 1 {
                    self.tasks.schedule(
                        params.time_between_shots,
                        FireTask::Burst {
                            slot: slot_id,
                            remaining: params.bullet_count - 1,
                        },
                    );
                }
                vec![self.make_shot(&weapon, &params, prototype, ctx, true, rng)]
            }
        };
        Ok(FireOutcome::Volley(shots))
    }

    /// Advance cooldowns, bonuses, and burst continuations by `dt`. Returns the
    /// burst shots that came due.
    pub fn advance(&mut self, dt: f32, ctx: &AimContext, rng: &mut impl Rng) -> Vec<Shot> {
        self.temp_crit.retain_mut(|bonus| {
            bonus.remaining -= dt;
            bonus.remaining > 0.0
        });

        let mut shots = Vec::new();
        for task in self.tasks.advance(dt) {
            match task {
                FireTask::SlotReady(id) => {
                    if let Some(slot) = self.ring.get_mut(id) {
                        slot.ready = true;
                    }
                }
                FireTask::UnarmedReady => self.unarmed_ready = true,
                FireTask::BeamReady => self.beam_tick_pending = false,
                FireTask::Burst { slot, remaining } => {
                    let Some(weapon) = self
                        .ring
                        .active()
                        .filter(|active| active.id == slot)
                        .map(|active| active.weapon.clone())
                    else {
                        continue;
                    };
                    let Some(prototype) = weapon.projectile else {
                        continue;
                    };
                    let params = self
                        .params
                        .unwrap_or_else(|| FiringParams::from(&*weapon));
                    shots.push(self.make_shot(&weapon, &params, prototype, ctx, true, rng));
                    if remaining > 1 {
                        self.tasks.schedule(
                            params.time_between_shots,
                            FireTask::Burst {
                                slot,
                                remaining: remaining - 1,
                            },
                        );
                    }
                }
            }
        }
        shots
    }

    /// The unarmed strike wins when a target is within its reach and the
    /// equipped weapon is not an affordable melee weapon. Player only.
    fn unarmed_fallback(&self, ctx: &AimContext) -> Option<WeaponRef> {
        if self.faction != Faction::Player {
            return None;
        }
        let unarmed = self.unarmed.as_ref()?;
        let target = ctx.target?;
        if ctx.origin.distance(target.position) >= unarmed.aim_range {
            return None;
        }
        let melee_ready = self
            .active_weapon()
            .is_some_and(|weapon| weapon.kind == WeaponKind::Melee && self.can_afford(weapon));
        (!melee_ready).then(|| unarmed.clone())
    }

    fn strike_unarmed(
        &mut self,
        unarmed: &WeaponRef,
        ctx: &AimContext,
        rng: &mut impl Rng,
    ) -> Result<FireOutcome, FireError> {
        if !self.unarmed_ready {
            return Err(FireError::CoolingDown);
        }
        let Some(prototype) = unarmed.projectile else {
            return Err(FireError::MissingProjectile {
                weapon: unarmed.name.clone(),
            });
        };

        self.stop_firing();
        self.unarmed_ready = false;
        self.tasks.schedule(unarmed.fire_rate, FireTask::UnarmedReady);

        let mut strike_ctx = *ctx;
        if let Some(target) = ctx.target {
            strike_ctx.direction = target.position - ctx.origin;
        }
        let params = FiringParams::from(&**unarmed);
        Ok(FireOutcome::Unarmed(self.make_shot(
            unarmed,
            &params,
            prototype,
            &strike_ctx,
            false,
            rng,
        )))
    }

    fn fire_beam(
        &mut self,
        weapon: &WeaponDefinition,
        params: &FiringParams,
        ctx: &AimContext,
        rng: &mut impl Rng,
    ) -> Result<FireOutcome, FireError> {
        if !self.can_afford(weapon) {
            self.firing = false;
            self.beam_active = false;
            return Err(FireError::InsufficientEnergy);
        }
        self.beam_active = true;
        self.firing = true;

        match ctx.target {
            Some(target) if !self.beam_tick_pending => {
                let CritResult {
                    damage, critical, ..
                } = roll_crit(params.damage, self.crit_total(weapon), &mut RandomDice(rng));
                self.take_energy(weapon.energy_cost);
                self.beam_tick_pending = true;
                self.tasks.schedule(params.fire_rate, FireTask::BeamReady);
                if self.energy - weapon.energy_cost <= 0.0 {
                    self.firing = false;
                    self.beam_active = false;
                }
                Ok(FireOutcome::BeamTick {
                    target: target.entity,
                    damage,
                    critical,
                    damage_type: weapon.damage_type,
                    effect_chance: weapon.effect_chance,
                })
            }
            Some(target) => Ok(FireOutcome::BeamSweep {
                end: target.position,
            }),
            None => Ok(FireOutcome::BeamSweep {
                end: ctx.origin + ctx.unit_direction() * params.aim_range,
            }),
        }
    }

    fn make_shot(
        &self,
        weapon: &WeaponDefinition,
        params: &FiringParams,
        prototype: ProjectilePrototype,
        ctx: &AimContext,
        spread: bool,
        rng: &mut impl Rng,
    ) -> Shot {
        let aim = ctx.unit_direction();
        let direction = if spread && params.spread > 0.0 {
            let deviation = rng.random_range(-params.spread..=params.spread);
            Vec2::from_angle(deviation.to_radians()).rotate(aim)
        } else {
            aim
        };
        let crit = roll_crit(params.damage, self.crit_total(weapon), &mut RandomDice(rng));
        if crit.critical {
            debug!("{} crit for {:.1}", weapon.name, crit.damage);
        }

        Shot {
            origin: ctx.origin,
            direction,
            damage: crit.damage,
            critical: crit.critical,
            speed: weapon.bullet_speed,
            lifetime: weapon.bullet_lifetime,
            radius: prototype.radius,
            damage_type: weapon.damage_type,
            effect_chance: weapon.effect_chance,
            homing: if weapon.autotarget {
                ctx.target.map(|t| t.entity)
            } else {
                None
            },
            explosion_radius: weapon.explosive.then_some(EXPLOSION_RADIUS),
            from_player: self.faction == Faction::Player,
        }
    }
}
