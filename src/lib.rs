//! Sitesched client library
//!
//! Client-side core of a construction-site logistics panel embedded in a 3D
//! model viewer: scheduling installation of prefabricated building elements
//! into calendar-date buckets, keeping the persisted order consistent
//! through optimistic drag-and-drop edits, assigning deterministic per-date
//! colors, converting element identifiers between compact and UUID form,
//! and driving time-stepped playback of viewer highlighting.

pub mod config;
pub mod error;
pub mod guid;
pub mod palette;
pub mod playback;
pub mod schedule;
pub mod viewer;

use reqwest::Client;
use tokio::sync::mpsc;

use crate::config::PanelOptions;
use crate::playback::{Player, PlaybackFrame};
use crate::schedule::{RecordStoreSchedule, ScheduleBoard, ScheduleEngine};
use sitesched_recordstore::RecordStoreClient;

/// The main entry point for the sitesched panel client
pub struct SchedulePanel {
    /// The base URL of the hosted record store
    pub url: String,
    /// The API key for the hosted record store
    pub key: String,
    /// The project every read and write is scoped to
    pub project_id: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Client options
    pub options: PanelOptions,
}

impl SchedulePanel {
    /// Create a new panel client with default options
    ///
    /// # Example
    ///
    /// ```
    /// use sitesched::SchedulePanel;
    ///
    /// let panel = SchedulePanel::new("https://store.example.com", "anon-key", "project-1");
    /// ```
    pub fn new(url: &str, key: &str, project_id: &str) -> Self {
        Self::new_with_options(url, key, project_id, PanelOptions::default())
    }

    /// Create a new panel client with custom options
    pub fn new_with_options(
        url: &str,
        key: &str,
        project_id: &str,
        options: PanelOptions,
    ) -> Self {
        let http_client = options
            .request_timeout
            .and_then(|timeout| Client::builder().timeout(timeout).build().ok())
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            key: key.to_string(),
            project_id: project_id.to_string(),
            http_client,
            options,
        }
    }

    /// Raw record-store client for an arbitrary table, project-scoped
    pub fn from(&self, table: &str) -> RecordStoreClient {
        RecordStoreClient::new(&self.url, &self.key, table, self.http_client.clone())
            .scope_project(&self.project_id)
    }

    /// The store handle the schedule engine persists through
    pub fn store(&self) -> RecordStoreSchedule {
        RecordStoreSchedule::new(
            &self.url,
            &self.key,
            &self.project_id,
            &self.options.schedule_table,
            &self.options.annotation_table,
            self.http_client.clone(),
        )
    }

    /// Load the schedule and build an optimistic engine over it
    pub async fn engine(&self) -> Result<ScheduleEngine<RecordStoreSchedule>, error::Error> {
        ScheduleEngine::load(self.store()).await
    }

    /// Build a playback driver over a board, emitting frames into `sink`
    pub fn player(&self, board: &ScheduleBoard, sink: mpsc::Sender<PlaybackFrame>) -> Player {
        Player::from_board(board, self.options.playback_tick, sink)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::PanelOptions;
    pub use crate::error::Error;
    pub use crate::guid::{compact_to_uuid, uuid_to_compact};
    pub use crate::palette::{contrast_text, date_palette, Rgb};
    pub use crate::schedule::{
        CommitOutcome, DragGesture, DropTarget, ScheduleBoard, ScheduleEngine, ScheduleItem,
        ScheduleStore,
    };
    pub use crate::viewer::{EffectDispatcher, ViewerHost, ViewerIntent};
    pub use crate::SchedulePanel;
}
