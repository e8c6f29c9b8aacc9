//! Reorder and cross-bucket move planning
//!
//! Pure functions: they take the current bucket contents and produce a
//! [`MovePlan`] — the new arrangement plus the minimal set of field writes
//! needed to persist it. Applying the plan to local state and shipping the
//! patches to the store are the engine's job; nothing here does I/O.

use chrono::NaiveDate;

use super::{renumber, ScheduleItem};

/// One field-level write against a stored item
///
/// `date` is `None` for a same-bucket position change and `Some` when the
/// item moved to another bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPatch {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub position: u32,
}

/// The outcome of planning a drag: new bucket contents and the writes that
/// make the store match them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovePlan {
    /// New contents of every affected bucket (empty vec = bucket dissolved)
    pub buckets: Vec<(NaiveDate, Vec<ScheduleItem>)>,
    pub patches: Vec<ItemPatch>,
}

impl MovePlan {
    /// A drop that changes nothing
    pub fn is_noop(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Plan a reorder within a single bucket
///
/// `target_index` is the nominal insertion slot in the bucket as the user
/// sees it before anything is removed. The dragged items are pulled out in
/// their source order and reinserted at the adjusted slot: the target moves
/// back one step for every dragged item that originally sat before it.
/// Counting against the *pre-removal* contents is what keeps a drag past
/// several selected items from landing off by one.
pub fn plan_reorder(
    date: NaiveDate,
    items: &[ScheduleItem],
    dragged_ids: &[i64],
    target_index: usize,
) -> MovePlan {
    let dragged_before_target = items
        .iter()
        .take(target_index.min(items.len()))
        .filter(|item| dragged_ids.contains(&item.id))
        .count();

    let (dragged, kept): (Vec<ScheduleItem>, Vec<ScheduleItem>) = items
        .iter()
        .cloned()
        .partition(|item| dragged_ids.contains(&item.id));

    if dragged.is_empty() {
        return MovePlan::default();
    }

    let insert_at = target_index
        .saturating_sub(dragged_before_target)
        .min(kept.len());

    let mut arranged = Vec::with_capacity(items.len());
    arranged.extend_from_slice(&kept[..insert_at]);
    arranged.extend(dragged);
    arranged.extend_from_slice(&kept[insert_at..]);

    let patches = renumber(&mut arranged);
    MovePlan {
        buckets: vec![(date, arranged)],
        patches,
    }
}

/// Plan a move from one bucket into another
///
/// The dragged items leave the source bucket (which is renumbered densely)
/// and enter the destination in their source relative order. `insert_at`
/// picks the slot in the destination's pre-drop contents; `None` appends
/// after the destination's current maximum position.
pub fn plan_cross_move(
    source_date: NaiveDate,
    source_items: &[ScheduleItem],
    dest_date: NaiveDate,
    dest_items: &[ScheduleItem],
    dragged_ids: &[i64],
    insert_at: Option<usize>,
) -> MovePlan {
    let (dragged, mut remaining): (Vec<ScheduleItem>, Vec<ScheduleItem>) = source_items
        .iter()
        .cloned()
        .partition(|item| dragged_ids.contains(&item.id));

    if dragged.is_empty() {
        return MovePlan::default();
    }

    let mut patches = renumber(&mut remaining);

    let slot = insert_at.unwrap_or(dest_items.len()).min(dest_items.len());
    let mut dest = Vec::with_capacity(dest_items.len() + dragged.len());
    dest.extend_from_slice(&dest_items[..slot]);
    dest.extend(dragged.iter().cloned().map(|mut item| {
        item.date = dest_date;
        item
    }));
    dest.extend_from_slice(&dest_items[slot..]);

    for (index, item) in dest.iter_mut().enumerate() {
        let position = index as u32;
        let moved_in = dragged_ids.contains(&item.id);
        if moved_in || item.position != position {
            item.position = position;
            patches.push(ItemPatch {
                id: item.id,
                // Moved items always persist their new bucket key.
                date: moved_in.then_some(dest_date),
                position,
            });
        }
    }

    MovePlan {
        buckets: vec![(source_date, remaining), (dest_date, dest)],
        patches,
    }
}
