//! Viewer effect layer
//!
//! The scheduling core never talks to the 3D viewer directly. It emits
//! [`ViewerIntent`] values ("select these elements", "color this date's
//! elements"), and an [`EffectDispatcher`] translates them into host API
//! calls through whatever [`ViewerHost`] the embedding provides. The
//! schedule data is authoritative; viewer calls are best-effort and a
//! failed one is logged and skipped, never propagated into the data model.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Error;
use crate::palette::{date_palette, Rgb};
use crate::schedule::ScheduleBoard;

/// Viewer-internal handle for one selectable object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

/// One side effect the panel wants the viewer to perform
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerIntent {
    /// Make these elements the current selection
    Select { guids: Vec<String> },
    /// Show only these elements
    Isolate { guids: Vec<String> },
    /// Paint these elements in one color
    Colorize { guids: Vec<String>, color: Rgb },
    /// Restore original model colors
    ClearColors,
    /// Frame the camera on these elements
    FitCamera { guids: Vec<String> },
}

/// The host 3D-viewer API surface the panel consumes
#[async_trait]
pub trait ViewerHost: Send + Sync {
    /// Resolve a compact element identifier to a selectable handle
    ///
    /// Fails when the element is not part of the currently loaded model.
    async fn resolve(&self, guid: &str) -> Result<ObjectHandle, Error>;

    /// Apply one intent to the viewer
    async fn apply(&self, intent: &ViewerIntent) -> Result<(), Error>;
}

/// Applies intents to a host, swallowing individual failures
pub struct EffectDispatcher<H: ViewerHost> {
    host: H,
}

impl<H: ViewerHost> EffectDispatcher<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Apply every intent in order, returning how many succeeded
    ///
    /// A failing intent is logged and skipped; later intents still run.
    pub async fn dispatch_all(&self, intents: &[ViewerIntent]) -> usize {
        let mut applied = 0;
        for intent in intents {
            match self.host.apply(intent).await {
                Ok(()) => applied += 1,
                Err(err) => {
                    log::warn!("viewer intent {:?} failed: {}", intent, err);
                }
            }
        }
        applied
    }
}

/// Intents that paint every date bucket in its palette color
///
/// One `Colorize` per date, in date order, preceded by a `ClearColors` so
/// stale paint from a previous schedule state never lingers.
pub fn colorize_schedule(board: &ScheduleBoard) -> Vec<ViewerIntent> {
    let palette = date_palette(board.dates());

    let mut intents = vec![ViewerIntent::ClearColors];
    for (date, color) in palette {
        let guids = bucket_guids(board, date);
        if !guids.is_empty() {
            intents.push(ViewerIntent::Colorize { guids, color });
        }
    }
    intents
}

/// Intents that highlight a single date during playback
pub fn highlight_date(board: &ScheduleBoard, date: NaiveDate, color: Rgb) -> Vec<ViewerIntent> {
    let guids = bucket_guids(board, date);
    vec![
        ViewerIntent::Colorize {
            guids: guids.clone(),
            color,
        },
        ViewerIntent::Select { guids },
    ]
}

fn bucket_guids(board: &ScheduleBoard, date: NaiveDate) -> Vec<String> {
    board
        .bucket(date)
        .iter()
        .map(|item| item.element_guid.clone())
        .collect()
}
