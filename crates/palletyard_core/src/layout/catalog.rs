//! Catalog of valid slots grouped by lane.
//!
//! # Invariants
//! - Only `C<lane>-<index>` identifiers with positive numbers are kept.
//! - Malformed identifiers are dropped without error.
//! - The catalog is immutable; a layout reload builds a new one.

use crate::model::slot::{Lane, SlotId};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutCatalog {
    lanes: BTreeMap<Lane, BTreeSet<u32>>,
}

impl LayoutCatalog {
    /// Builds a catalog from raw slot identifiers.
    pub fn ingest<I, S>(raw_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lanes: BTreeMap<Lane, BTreeSet<u32>> = BTreeMap::new();
        let mut dropped = 0usize;
        for raw in raw_ids {
            match raw.as_ref().parse::<SlotId>() {
                Ok(slot) => {
                    lanes.entry(slot.lane).or_default().insert(slot.index);
                }
                Err(_) => dropped += 1,
            }
        }

        let catalog = Self { lanes };
        debug!(
            "event=layout_ingest module=layout status=ok lanes={} slots={} dropped={}",
            catalog.lanes.len(),
            catalog.slot_count(),
            dropped
        );
        catalog
    }

    /// Distinct lanes in ascending order.
    pub fn lanes(&self) -> Vec<Lane> {
        self.lanes.keys().copied().collect()
    }

    /// Slots of `lane` by ascending index. Empty for unknown lanes.
    pub fn slots_for_lane(&self, lane: Lane) -> Vec<SlotId> {
        self.lanes
            .get(&lane)
            .map(|indexes| indexes.iter().map(|&index| SlotId::new(lane, index)).collect())
            .unwrap_or_default()
    }

    /// Lowest-index slot of `lane`.
    pub fn first_slot(&self, lane: Lane) -> Option<SlotId> {
        self.lanes
            .get(&lane)
            .and_then(|indexes| indexes.iter().next())
            .map(|&index| SlotId::new(lane, index))
    }

    pub fn has_lane(&self, lane: Lane) -> bool {
        self.lanes.contains_key(&lane)
    }

    pub fn contains(&self, slot: &SlotId) -> bool {
        self.lanes
            .get(&slot.lane)
            .is_some_and(|indexes| indexes.contains(&slot.index))
    }

    pub fn slot_count(&self) -> usize {
        self.lanes.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Every slot, ordered by lane then index.
    pub fn slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.lanes
            .iter()
            .flat_map(|(&lane, indexes)| indexes.iter().map(move |&index| SlotId::new(lane, index)))
    }
}

#[cfg(test)]
mod tests {
    use super::LayoutCatalog;
    use crate::model::slot::SlotId;

    #[test]
    fn ingest_groups_by_lane_and_sorts_numerically() {
        let catalog = LayoutCatalog::ingest(["C2-1", "C1-10", "C1-2", "C1-1"]);
        assert_eq!(catalog.lanes(), vec![1, 2]);
        assert_eq!(
            catalog.slots_for_lane(1),
            vec![SlotId::new(1, 1), SlotId::new(1, 2), SlotId::new(1, 10)]
        );
        assert_eq!(catalog.first_slot(2), Some(SlotId::new(2, 1)));
        assert_eq!(
            catalog.slots().collect::<Vec<_>>(),
            vec![
                SlotId::new(1, 1),
                SlotId::new(1, 2),
                SlotId::new(1, 10),
                SlotId::new(2, 1)
            ]
        );
    }

    #[test]
    fn ingest_drops_malformed_entries_silently() {
        let catalog = LayoutCatalog::ingest(["C1-1", "door", "C-1", "C3-", "C0-4", " C4-2 ", ""]);
        assert_eq!(catalog.lanes(), vec![1, 4]);
        assert_eq!(catalog.slot_count(), 2);
        assert!(catalog.contains(&SlotId::new(4, 2)));
    }

    #[test]
    fn duplicates_collapse() {
        let catalog = LayoutCatalog::ingest(["C1-1", "C1-1", "C1-2"]);
        assert_eq!(catalog.slot_count(), 2);
    }

    #[test]
    fn empty_input_is_an_empty_catalog() {
        let catalog = LayoutCatalog::ingest(Vec::<String>::new());
        assert!(catalog.is_empty());
        assert!(catalog.lanes().is_empty());
        assert!(catalog.slots_for_lane(1).is_empty());
        assert_eq!(catalog.first_slot(1), None);
    }
}
