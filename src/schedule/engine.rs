//! Optimistic commit engine
//!
//! The engine owns the in-memory [`ScheduleBoard`] and a handle to the
//! backing store. Drag commits mutate the board synchronously, then persist
//! asynchronously; any persistence failure throws the optimistic state away
//! and reloads the authoritative list wholesale. There is no retry and no
//! partial-success state: one reload is the entire recovery strategy.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::json;

use super::{
    plan_cross_move, plan_reorder, DropTarget, ItemPatch, NewScheduleItem, ScheduleBoard,
    ScheduleItem,
};
use crate::error::Error;
use sitesched_recordstore::{RecordStoreClient, SortOrder};

/// How a commit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The optimistic state is now the persisted state
    Persisted,
    /// Persistence failed; local state was replaced by a fresh fetch
    Reverted,
    /// The drop changed nothing, no write was issued
    Noop,
}

/// The slice of the backing store the engine needs
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Authoritative item list for the project, ordered by date and position
    async fn fetch_items(&self) -> Result<Vec<ScheduleItem>, Error>;

    /// Persist position and bucket-key writes
    async fn apply_patches(&self, patches: &[ItemPatch]) -> Result<(), Error>;

    /// Create items, returning them with store-assigned ids
    async fn insert_items(&self, items: &[NewScheduleItem]) -> Result<Vec<ScheduleItem>, Error>;

    /// Delete items and their annotations
    async fn delete_items(&self, ids: &[i64]) -> Result<(), Error>;
}

/// Optimistic scheduling engine over a store
pub struct ScheduleEngine<S: ScheduleStore> {
    board: ScheduleBoard,
    store: S,
}

impl<S: ScheduleStore> ScheduleEngine<S> {
    /// Build an engine by loading the current schedule from the store
    pub async fn load(store: S) -> Result<Self, Error> {
        let items = store.fetch_items().await?;
        Ok(Self {
            board: ScheduleBoard::from_items(items),
            store,
        })
    }

    /// The current local (optimistic) state
    pub fn board(&self) -> &ScheduleBoard {
        &self.board
    }

    /// Replace local state with a fresh fetch
    pub async fn refresh(&mut self) -> Result<(), Error> {
        let items = self.store.fetch_items().await?;
        self.board = ScheduleBoard::from_items(items);
        Ok(())
    }

    /// Commit a finished drag gesture
    ///
    /// The plan is applied to the board before the store round-trip starts,
    /// so the caller can re-render immediately. The returned outcome says
    /// whether the optimistic state survived.
    pub async fn commit_drop(&mut self, target: DropTarget) -> Result<CommitOutcome, Error> {
        // A multi-selection always lives in one bucket; the source is
        // wherever the first dragged item currently sits.
        let source_date = match target.items.first().and_then(|id| self.board.date_of(*id)) {
            Some(date) => date,
            None => return Ok(CommitOutcome::Noop),
        };

        let plan = if source_date == target.date {
            plan_reorder(
                source_date,
                self.board.bucket(source_date),
                &target.items,
                target.index,
            )
        } else {
            plan_cross_move(
                source_date,
                self.board.bucket(source_date),
                target.date,
                self.board.bucket(target.date),
                &target.items,
                Some(target.index),
            )
        };

        if plan.is_noop() {
            return Ok(CommitOutcome::Noop);
        }

        self.board.apply(&plan);
        self.persist(&plan.patches).await
    }

    /// Attach newly selected elements to a date, appended at the tail
    pub async fn attach(
        &mut self,
        date: NaiveDate,
        element_guids: Vec<String>,
    ) -> Result<CommitOutcome, Error> {
        if element_guids.is_empty() {
            return Ok(CommitOutcome::Noop);
        }

        let base = self.board.bucket(date).len() as u32;
        let new_items: Vec<NewScheduleItem> = element_guids
            .into_iter()
            .enumerate()
            .map(|(offset, element_guid)| NewScheduleItem {
                element_guid,
                date,
                position: base + offset as u32,
                resources: None,
                notes: None,
            })
            .collect();

        match self.store.insert_items(&new_items).await {
            Ok(created) => {
                self.board.insert(created);
                Ok(CommitOutcome::Persisted)
            }
            Err(err) => {
                log::warn!("attach failed, reloading schedule: {}", err);
                self.refresh().await?;
                Ok(CommitOutcome::Reverted)
            }
        }
    }

    /// Remove items from the schedule, cascading to their annotations
    pub async fn detach(&mut self, ids: &[i64]) -> Result<CommitOutcome, Error> {
        if ids.is_empty() {
            return Ok(CommitOutcome::Noop);
        }

        let patches = self.board.remove(ids);

        if let Err(err) = self.store.delete_items(ids).await {
            log::warn!("detach failed, reloading schedule: {}", err);
            self.refresh().await?;
            return Ok(CommitOutcome::Reverted);
        }
        self.persist(&patches).await
    }

    /// Ship patches, reloading on failure
    async fn persist(&mut self, patches: &[ItemPatch]) -> Result<CommitOutcome, Error> {
        if patches.is_empty() {
            return Ok(CommitOutcome::Persisted);
        }
        match self.store.apply_patches(patches).await {
            Ok(()) => Ok(CommitOutcome::Persisted),
            Err(err) => {
                log::warn!("persist failed, reloading schedule: {}", err);
                self.refresh().await?;
                Ok(CommitOutcome::Reverted)
            }
        }
    }
}

/// [`ScheduleStore`] backed by the hosted record store
///
/// All reads and writes are scoped to one project. Deleting items also
/// deletes their annotation rows.
#[derive(Clone)]
pub struct RecordStoreSchedule {
    base_url: String,
    api_key: String,
    project_id: String,
    schedule_table: String,
    annotation_table: String,
    http_client: Client,
}

impl RecordStoreSchedule {
    pub fn new(
        base_url: &str,
        api_key: &str,
        project_id: &str,
        schedule_table: &str,
        annotation_table: &str,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            project_id: project_id.to_string(),
            schedule_table: schedule_table.to_string(),
            annotation_table: annotation_table.to_string(),
            http_client,
        }
    }

    fn items(&self) -> RecordStoreClient {
        RecordStoreClient::new(
            &self.base_url,
            &self.api_key,
            &self.schedule_table,
            self.http_client.clone(),
        )
        .scope_project(&self.project_id)
    }

    fn annotations(&self) -> RecordStoreClient {
        RecordStoreClient::new(
            &self.base_url,
            &self.api_key,
            &self.annotation_table,
            self.http_client.clone(),
        )
        .scope_project(&self.project_id)
    }
}

#[async_trait]
impl ScheduleStore for RecordStoreSchedule {
    async fn fetch_items(&self) -> Result<Vec<ScheduleItem>, Error> {
        let items = self
            .items()
            .select("*")
            .order_by2("scheduled_date", "sort_position", SortOrder::Ascending)
            .execute::<ScheduleItem>()
            .await?;
        Ok(items)
    }

    async fn apply_patches(&self, patches: &[ItemPatch]) -> Result<(), Error> {
        for patch in patches {
            let mut body = json!({ "sort_position": patch.position });
            if let Some(date) = patch.date {
                body["scheduled_date"] = json!(date.to_string());
            }
            self.items()
                .eq("id", &patch.id.to_string())
                .update(body)
                .await?;
        }
        Ok(())
    }

    async fn insert_items(&self, items: &[NewScheduleItem]) -> Result<Vec<ScheduleItem>, Error> {
        let rows: Vec<serde_json::Value> = items
            .iter()
            .map(|item| {
                let mut row = serde_json::to_value(item)?;
                row["project_id"] = json!(self.project_id);
                Ok(row)
            })
            .collect::<Result<_, serde_json::Error>>()?;

        let created = self.items().insert(rows).await?;
        let created: Vec<ScheduleItem> = serde_json::from_value(created)?;
        Ok(created)
    }

    async fn delete_items(&self, ids: &[i64]) -> Result<(), Error> {
        let id_strings: Vec<String> = ids.iter().map(i64::to_string).collect();
        let id_refs: Vec<&str> = id_strings.iter().map(String::as_str).collect();

        // Annotations cascade first so no orphan rows survive a partial
        // failure between the two deletes.
        self.annotations()
            .in_list("item_id", &id_refs)
            .delete()
            .await?;
        self.items().in_list("id", &id_refs).delete().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_item;
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory store that can be told to fail its next write
    struct FakeStore {
        rows: Mutex<Vec<ScheduleItem>>,
        fail_writes: AtomicBool,
    }

    impl FakeStore {
        fn new(rows: Vec<ScheduleItem>) -> Self {
            Self {
                rows: Mutex::new(rows),
                fail_writes: AtomicBool::new(false),
            }
        }

        fn lock_rows(&self) -> std::sync::MutexGuard<'_, Vec<ScheduleItem>> {
            self.rows.lock().expect("store mutex poisoned")
        }
    }

    #[async_trait]
    impl ScheduleStore for FakeStore {
        async fn fetch_items(&self) -> Result<Vec<ScheduleItem>, Error> {
            Ok(self.lock_rows().clone())
        }

        async fn apply_patches(&self, patches: &[ItemPatch]) -> Result<(), Error> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::general("simulated write failure"));
            }
            let mut rows = self.lock_rows();
            for patch in patches {
                if let Some(row) = rows.iter_mut().find(|row| row.id == patch.id) {
                    row.position = patch.position;
                    if let Some(date) = patch.date {
                        row.date = date;
                    }
                }
            }
            Ok(())
        }

        async fn insert_items(
            &self,
            items: &[NewScheduleItem],
        ) -> Result<Vec<ScheduleItem>, Error> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::general("simulated write failure"));
            }
            let mut rows = self.lock_rows();
            let mut next_id = rows.iter().map(|row| row.id).max().unwrap_or(0) + 1;
            let mut created = Vec::new();
            for item in items {
                created.push(ScheduleItem {
                    id: next_id,
                    element_guid: item.element_guid.clone(),
                    date: item.date,
                    position: item.position,
                    resources: item.resources.clone(),
                    notes: item.notes.clone(),
                });
                next_id += 1;
            }
            rows.extend(created.clone());
            Ok(created)
        }

        async fn delete_items(&self, ids: &[i64]) -> Result<(), Error> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::general("simulated write failure"));
            }
            self.lock_rows().retain(|row| !ids.contains(&row.id));
            Ok(())
        }
    }

    fn seed() -> Vec<ScheduleItem> {
        vec![
            test_item(1, "2024-05-06", 0),
            test_item(2, "2024-05-06", 1),
            test_item(3, "2024-05-06", 2),
            test_item(4, "2024-05-07", 0),
        ]
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().expect("valid test date")
    }

    fn ids_of(board: &ScheduleBoard, date: NaiveDate) -> Vec<i64> {
        board.bucket(date).iter().map(|item| item.id).collect()
    }

    #[tokio::test]
    async fn commit_persists_a_reorder() {
        let mut engine = ScheduleEngine::load(FakeStore::new(seed()))
            .await
            .expect("load");

        let outcome = engine
            .commit_drop(DropTarget {
                items: vec![1],
                date: d("2024-05-06"),
                index: 3,
            })
            .await
            .expect("commit");

        assert_eq!(outcome, CommitOutcome::Persisted);
        assert_eq!(ids_of(engine.board(), d("2024-05-06")), vec![2, 3, 1]);
        // The store saw the same arrangement.
        engine.refresh().await.expect("refresh");
        assert_eq!(ids_of(engine.board(), d("2024-05-06")), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn unchanged_drop_is_a_noop() {
        let mut engine = ScheduleEngine::load(FakeStore::new(seed()))
            .await
            .expect("load");

        let outcome = engine
            .commit_drop(DropTarget {
                items: vec![1],
                date: d("2024-05-06"),
                index: 0,
            })
            .await
            .expect("commit");

        assert_eq!(outcome, CommitOutcome::Noop);
        assert_eq!(ids_of(engine.board(), d("2024-05-06")), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn cross_bucket_commit_moves_and_renumbers() {
        let mut engine = ScheduleEngine::load(FakeStore::new(seed()))
            .await
            .expect("load");

        let outcome = engine
            .commit_drop(DropTarget {
                items: vec![2],
                date: d("2024-05-07"),
                index: 0,
            })
            .await
            .expect("commit");

        assert_eq!(outcome, CommitOutcome::Persisted);
        assert_eq!(ids_of(engine.board(), d("2024-05-06")), vec![1, 3]);
        assert_eq!(ids_of(engine.board(), d("2024-05-07")), vec![2, 4]);
        let positions: Vec<u32> = engine
            .board()
            .bucket(d("2024-05-06"))
            .iter()
            .map(|item| item.position)
            .collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn failed_persist_reloads_ground_truth() {
        let store = FakeStore::new(seed());
        store.fail_writes.store(true, Ordering::SeqCst);
        let mut engine = ScheduleEngine::load(store).await.expect("load");

        let outcome = engine
            .commit_drop(DropTarget {
                items: vec![1],
                date: d("2024-05-06"),
                index: 3,
            })
            .await
            .expect("commit itself should not error");

        assert_eq!(outcome, CommitOutcome::Reverted);
        // No residue of the optimistic move: the board matches the store.
        assert_eq!(ids_of(engine.board(), d("2024-05-06")), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn attach_appends_after_current_maximum() {
        let mut engine = ScheduleEngine::load(FakeStore::new(seed()))
            .await
            .expect("load");

        let outcome = engine
            .attach(
                d("2024-05-07"),
                vec!["1bFg8qsj95M98$ykEubJd_".to_string()],
            )
            .await
            .expect("attach");

        assert_eq!(outcome, CommitOutcome::Persisted);
        let bucket = engine.board().bucket(d("2024-05-07"));
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[1].position, 1);
        assert_eq!(bucket[1].element_guid, "1bFg8qsj95M98$ykEubJd_");
    }

    #[tokio::test]
    async fn detach_renumbers_survivors() {
        let mut engine = ScheduleEngine::load(FakeStore::new(seed()))
            .await
            .expect("load");

        let outcome = engine.detach(&[2]).await.expect("detach");

        assert_eq!(outcome, CommitOutcome::Persisted);
        assert_eq!(ids_of(engine.board(), d("2024-05-06")), vec![1, 3]);
        engine.refresh().await.expect("refresh");
        let positions: Vec<u32> = engine
            .board()
            .bucket(d("2024-05-06"))
            .iter()
            .map(|item| item.position)
            .collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn failed_detach_reloads_ground_truth() {
        let store = FakeStore::new(seed());
        store.fail_writes.store(true, Ordering::SeqCst);
        let mut engine = ScheduleEngine::load(store).await.expect("load");

        let outcome = engine.detach(&[2]).await.expect("detach");

        assert_eq!(outcome, CommitOutcome::Reverted);
        assert_eq!(ids_of(engine.board(), d("2024-05-06")), vec![1, 2, 3]);
    }
}
