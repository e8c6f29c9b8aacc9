//! Schedule model: items, date buckets, and the in-memory board
//!
//! A schedule item is one physical building element assigned to an
//! installation date. Items are grouped into per-date buckets; within a
//! bucket the `position` values always form a dense zero-based sequence.
//! Every mutation on [`ScheduleBoard`] restores that invariant.

mod drag;
mod engine;
mod reorder;

pub use drag::{hover_index, DragGesture, DragState, DropTarget};
pub use engine::{CommitOutcome, RecordStoreSchedule, ScheduleEngine, ScheduleStore};
pub use reorder::{plan_cross_move, plan_reorder, ItemPatch, MovePlan};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::guid;

/// One building element scheduled for installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// Record id in the backing store
    pub id: i64,
    /// Compact element identifier from the host model (authoritative form)
    pub element_guid: String,
    /// Assigned installation date (the bucket key)
    #[serde(rename = "scheduled_date")]
    pub date: NaiveDate,
    /// Sort position within the date bucket, dense and zero-based
    #[serde(rename = "sort_position")]
    pub position: u32,
    /// Crew / equipment assigned to this installation
    #[serde(default)]
    pub resources: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ScheduleItem {
    /// The element identifier in canonical UUID form, if the compact form
    /// is well-formed
    pub fn element_uuid(&self) -> Option<String> {
        guid::compact_to_uuid(&self.element_guid)
    }
}

/// Fields for an item about to be created (the store assigns the id)
#[derive(Debug, Clone, Serialize)]
pub struct NewScheduleItem {
    pub element_guid: String,
    #[serde(rename = "scheduled_date")]
    pub date: NaiveDate,
    #[serde(rename = "sort_position")]
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// In-memory, date-bucketed view of the schedule
///
/// The board is the optimistic local truth: drag commits mutate it
/// synchronously, persistence catches up asynchronously.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleBoard {
    buckets: BTreeMap<NaiveDate, Vec<ScheduleItem>>,
}

impl ScheduleBoard {
    /// Build a board from a flat item list
    ///
    /// Items are grouped by date and ordered by stored position; ties and
    /// gaps are resolved by insertion order, then positions are renumbered
    /// to the dense form.
    pub fn from_items(items: Vec<ScheduleItem>) -> Self {
        let mut buckets: BTreeMap<NaiveDate, Vec<ScheduleItem>> = BTreeMap::new();
        for item in items {
            buckets.entry(item.date).or_default().push(item);
        }
        for bucket in buckets.values_mut() {
            bucket.sort_by_key(|item| item.position);
            renumber(bucket);
        }
        Self { buckets }
    }

    /// All dates that currently have at least one item
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.buckets.keys().copied().collect()
    }

    /// The items of one date bucket, in order
    pub fn bucket(&self, date: NaiveDate) -> &[ScheduleItem] {
        self.buckets.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All items, bucket by bucket in date order
    pub fn items(&self) -> Vec<ScheduleItem> {
        self.buckets.values().flatten().cloned().collect()
    }

    /// Total item count
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The bucket containing the given item id
    pub fn date_of(&self, id: i64) -> Option<NaiveDate> {
        self.buckets
            .iter()
            .find(|(_, bucket)| bucket.iter().any(|item| item.id == id))
            .map(|(date, _)| *date)
    }

    /// Append items at the tail of a bucket, assigning dense positions
    pub fn insert(&mut self, items: Vec<ScheduleItem>) {
        for item in items {
            let bucket = self.buckets.entry(item.date).or_default();
            bucket.push(item);
        }
        for bucket in self.buckets.values_mut() {
            renumber(bucket);
        }
    }

    /// Remove items by id, renumbering the affected buckets
    ///
    /// Returns patches for the remaining items whose positions shifted.
    pub fn remove(&mut self, ids: &[i64]) -> Vec<ItemPatch> {
        let mut patches = Vec::new();
        for bucket in self.buckets.values_mut() {
            let before = bucket.len();
            bucket.retain(|item| !ids.contains(&item.id));
            if bucket.len() != before {
                patches.extend(renumber(bucket));
            }
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        patches
    }

    /// Replace the affected buckets with a plan's new arrangement
    pub fn apply(&mut self, plan: &MovePlan) {
        for (date, items) in &plan.buckets {
            if items.is_empty() {
                self.buckets.remove(date);
            } else {
                self.buckets.insert(*date, items.clone());
            }
        }
    }
}

/// Renumber a bucket to dense zero-based positions
///
/// Returns one patch per item whose stored position changed.
pub(crate) fn renumber(bucket: &mut [ScheduleItem]) -> Vec<ItemPatch> {
    let mut patches = Vec::new();
    for (index, item) in bucket.iter_mut().enumerate() {
        let position = index as u32;
        if item.position != position {
            item.position = position;
            patches.push(ItemPatch {
                id: item.id,
                date: None,
                position,
            });
        }
    }
    patches
}

#[cfg(test)]
pub(crate) fn test_item(id: i64, date: &str, position: u32) -> ScheduleItem {
    ScheduleItem {
        id,
        element_guid: format!("2O2Fr$t4X7Zf8NOew3FL{:02}", id % 100),
        date: date.parse().expect("valid test date"),
        position,
        resources: None,
        notes: None,
    }
}
