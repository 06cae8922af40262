//! Target acquisition: ranking detected candidates into an attack target and a
//! softer attention focus.
//!
//! The detector feed (see `third_party::avian`) fills [`Detection`] at a fixed
//! poll rate. Everything here only reads it.

pub mod index;

use bevy::prelude::*;

use super::{Faction, FactionMask};
use crate::{GameSet, gameplay_running};

pub use self::index::CombatantIndex;

// === Types ===

/// Tag of whatever a line-of-sight probe hit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum SightTag {
    Player,
    Enemy,
    Obstacle,
}

impl SightTag {
    #[must_use]
    pub const fn of(faction: Faction) -> Self {
        match faction {
            Faction::Player => Self::Player,
            Faction::Enemy => Self::Enemy,
        }
    }
}

/// Nearest hit reported by the line-of-sight probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SightHit {
    pub entity: Entity,
    pub tag: SightTag,
}

/// One detected combatant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub entity: Entity,
    pub position: Vec2,
    pub faction: Faction,
    /// First thing the probe toward this candidate hit. `None` when nothing
    /// was hit within range.
    pub sight: Option<SightHit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Acquisition {
    /// Nearest candidate with a clear shot. The attack target.
    pub visible: Option<Entity>,
    /// Nearest candidate regardless of sight. Attention and camera framing only.
    pub soft_focus: Option<Entity>,
}

// === Components ===

/// What this combatant's detector saw on its last poll, nearest first is not
/// guaranteed; order is the detector's iteration order.
#[derive(Component, Debug, Clone, Default)]
pub struct Detection {
    pub candidates: Vec<Candidate>,
}

impl Detection {
    /// First candidate in queue order.
    #[must_use]
    pub fn head(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.entity == entity)
    }
}

/// Rate limiter and reentrancy guard for one acquisition loop.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct AcquisitionPoll {
    interval: f32,
    cooldown: f32,
    in_flight: bool,
}

impl AcquisitionPoll {
    #[must_use]
    pub const fn new(interval: f32) -> Self {
        Self {
            interval,
            cooldown: 0.0,
            in_flight: false,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    /// Claim the next poll. `false` while one is in flight or the interval
    /// has not elapsed.
    pub fn try_begin(&mut self) -> bool {
        if self.in_flight || self.cooldown > 0.0 {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Release the claim and start the interval.
    pub fn finish(&mut self) {
        self.in_flight = false;
        self.cooldown = self.interval;
    }

    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Periodic detector: rebuilds [`Detection`] from nearby opposing combatants.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Detector {
    pub range: f32,
    pub poll: AcquisitionPoll,
}

impl Detector {
    #[must_use]
    pub const fn new(range: f32, interval: f32) -> Self {
        Self {
            range,
            poll: AcquisitionPoll::new(interval),
        }
    }
}

// === Ranking ===

/// Rank `candidates` seen from `origin`.
///
/// Candidates whose faction is in `ignore` are skipped. `soft_focus` is the
/// nearest remaining candidate; `visible` the nearest whose probe hit a
/// `wanted`-tagged object. Equal distances keep the first seen.
pub fn find_best_target<'a>(
    candidates: impl IntoIterator<Item = &'a Candidate>,
    origin: Vec2,
    ignore: FactionMask,
    wanted: SightTag,
    mut line_of_sight: impl FnMut(&Candidate) -> Option<SightHit>,
) -> Acquisition {
    let mut nearest_any: Option<(Entity, f32)> = None;
    let mut nearest_visible: Option<(Entity, f32)> = None;

    for candidate in candidates {
        if ignore.intersects(candidate.faction.mask()) {
            continue;
        }
        let distance = origin.distance(candidate.position);

        if nearest_any.is_none_or(|(_, best)| distance < best) {
            nearest_any = Some((candidate.entity, distance));
        }

        let clear = line_of_sight(candidate).is_some_and(|hit| hit.tag == wanted);
        if clear && nearest_visible.is_none_or(|(_, best)| distance < best) {
            nearest_visible = Some((candidate.entity, distance));
        }
    }

    Acquisition {
        visible: nearest_visible.map(|(entity, _)| entity),
        soft_focus: nearest_any.map(|(entity, _)| entity),
    }
}

/// Opposing combatants within `range` of `origin`, each probed for sight.
/// `probe` receives the candidate position.
pub fn detection_candidates(
    index: &CombatantIndex,
    detector: Entity,
    faction: Faction,
    origin: Vec2,
    range: f32,
    mut probe: impl FnMut(Vec2) -> Option<SightHit>,
) -> Vec<Candidate> {
    index
        .within(origin, range)
        .into_iter()
        .filter(|c| c.entity != detector && c.faction != faction)
        .map(|c| Candidate {
            entity: c.entity,
            position: c.position,
            faction: c.faction,
            sight: probe(c.position),
        })
        .collect()
}

// === Plugin ===

/// Systems writing [`Detection`]. Consumers order after this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetectionFeed;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Detector>()
        .init_resource::<CombatantIndex>();

    app.configure_sets(Update, DetectionFeed.in_set(GameSet::Ai));

    app.add_systems(
        Update,
        index::rebuild_index
            .in_set(GameSet::Ai)
            .before(DetectionFeed)
            .run_if(gameplay_running),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(id: u64, x: f32, faction: Faction, clear: bool) -> Candidate {
        let entity = Entity::from_bits(id);
        Candidate {
            entity,
            position: Vec2::new(x, 0.0),
            faction,
            sight: Some(SightHit {
                entity,
                tag: if clear {
                    SightTag::of(faction)
                } else {
                    SightTag::Obstacle
                },
            }),
        }
    }

    fn rank(candidates: &[Candidate], ignore: FactionMask) -> Acquisition {
        find_best_target(candidates, Vec2::ZERO, ignore, SightTag::Enemy, |c| c.sight)
    }

    #[test]
    fn visible_and_soft_focus_split() {
        let candidates = [
            candidate(1, 5.0, Faction::Enemy, false),
            candidate(2, 3.0, Faction::Enemy, false),
            candidate(3, 8.0, Faction::Enemy, true),
        ];
        let result = rank(&candidates, FactionMask::PLAYER);
        assert_eq!(result.visible, Some(Entity::from_bits(3)));
        assert_eq!(result.soft_focus, Some(Entity::from_bits(2)));
    }

    #[test]
    fn ignored_factions_are_skipped() {
        let candidates = [
            candidate(1, 1.0, Faction::Player, true),
            candidate(2, 4.0, Faction::Enemy, true),
        ];
        let result = rank(&candidates, FactionMask::PLAYER);
        assert_eq!(result.visible, Some(Entity::from_bits(2)));
        assert_eq!(result.soft_focus, Some(Entity::from_bits(2)));
    }

    #[test]
    fn ties_keep_first_seen() {
        let candidates = [
            candidate(1, 2.0, Faction::Enemy, true),
            candidate(2, 2.0, Faction::Enemy, true),
        ];
        let result = rank(&candidates, FactionMask::empty());
        assert_eq!(result.visible, Some(Entity::from_bits(1)));
        assert_eq!(result.soft_focus, Some(Entity::from_bits(1)));
    }

    #[test]
    fn nothing_visible_without_clear_probe() {
        let mut blind = candidate(1, 2.0, Faction::Enemy, true);
        blind.sight = None;
        let result = rank(&[blind], FactionMask::empty());
        assert_eq!(result.visible, None);
        assert_eq!(result.soft_focus, Some(Entity::from_bits(1)));
    }

    #[test]
    fn empty_candidates_give_nothing() {
        assert_eq!(rank(&[], FactionMask::empty()), Acquisition::default());
    }

    #[test]
    fn detection_keeps_opposing_combatants_in_range() {
        let detector = Entity::from_bits(1);
        let mut index = CombatantIndex::default();
        index.insert(detector, Vec2::ZERO, Faction::Enemy);
        index.insert(Entity::from_bits(2), Vec2::new(3.0, 0.0), Faction::Player);
        index.insert(Entity::from_bits(3), Vec2::new(2.0, 0.0), Faction::Enemy);
        index.insert(Entity::from_bits(4), Vec2::new(30.0, 0.0), Faction::Player);

        let mut probed = Vec::new();
        let candidates =
            detection_candidates(&index, detector, Faction::Enemy, Vec2::ZERO, 10.0, |at| {
                probed.push(at);
                None
            });

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].entity, Entity::from_bits(2));
        assert_eq!(candidates[0].sight, None);
        assert_eq!(probed, vec![Vec2::new(3.0, 0.0)]);
    }

    #[test]
    fn poll_waits_out_interval() {
        let mut poll = AcquisitionPoll::new(0.1);
        assert!(poll.try_begin());
        poll.finish();
        assert!(!poll.try_begin());
        poll.tick(0.1);
        assert!(poll.try_begin());
    }

    #[test]
    fn poll_rejects_reentrant_begin() {
        let mut poll = AcquisitionPoll::new(0.0);
        assert!(poll.try_begin());
        assert!(poll.in_flight());
        assert!(!poll.try_begin());
        poll.finish();
        assert!(poll.try_begin());
    }
}
