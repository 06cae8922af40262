//! Uniform-grid index of living combatants for radius queries.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::gameplay::vitals::Vitals;
use crate::gameplay::{Faction, Targetable};

/// Default cell edge in world units. Roughly one detector radius.
pub const INDEX_CELL_SIZE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedCombatant {
    pub entity: Entity,
    pub position: Vec2,
    pub faction: Faction,
}

/// Spatial hash over every living [`Targetable`]. Rebuilt every frame.
#[derive(Resource, Debug)]
pub struct CombatantIndex {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<IndexedCombatant>>,
}

impl Default for CombatantIndex {
    fn default() -> Self {
        Self::new(INDEX_CELL_SIZE)
    }
}

impl CombatantIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Empty every bucket, keeping allocations.
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
    }

    pub fn insert(&mut self, entity: Entity, position: Vec2, faction: Faction) {
        let coords = self.cell_coords(position);
        self.cells.entry(coords).or_default().push(IndexedCombatant {
            entity,
            position,
            faction,
        });
    }

    /// Combatants within `radius` of `position`, by true distance.
    pub fn within(&self, position: Vec2, radius: f32) -> Vec<IndexedCombatant> {
        let min = self.cell_coords(position - Vec2::splat(radius));
        let max = self.cell_coords(position + Vec2::splat(radius));
        let mut result = Vec::new();
        for x in min.0..=max.0 {
            for y in min.1..=max.1 {
                if let Some(bucket) = self.cells.get(&(x, y)) {
                    result.extend(
                        bucket
                            .iter()
                            .filter(|c| c.position.distance(position) <= radius),
                    );
                }
            }
        }
        result
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_coords(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }
}

pub(super) fn rebuild_index(
    mut index: ResMut<CombatantIndex>,
    combatants: Query<(Entity, &GlobalTransform, &Faction, &Vitals), With<Targetable>>,
) {
    index.clear();
    for (entity, transform, &faction, vitals) in &combatants {
        if !vitals.is_alive() {
            continue;
        }
        index.insert(entity, transform.translation().truncate(), faction);
    }
}
