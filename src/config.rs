//! Configuration options for the sitesched panel client

use std::time::Duration;

/// Configuration options for the panel client
#[derive(Debug, Clone)]
pub struct PanelOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The table holding schedule items
    pub schedule_table: String,

    /// The table holding item annotations (notes attached to items)
    pub annotation_table: String,

    /// Interval between playback steps
    pub playback_tick: Duration,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            schedule_table: "schedule_items".to_string(),
            annotation_table: "item_annotations".to_string(),
            playback_tick: Duration::from_millis(1500),
        }
    }
}

impl PanelOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the schedule items table
    pub fn with_schedule_table(mut self, value: &str) -> Self {
        self.schedule_table = value.to_string();
        self
    }

    /// Set the annotations table
    pub fn with_annotation_table(mut self, value: &str) -> Self {
        self.annotation_table = value.to_string();
        self
    }

    /// Set the interval between playback steps
    pub fn with_playback_tick(mut self, value: Duration) -> Self {
        self.playback_tick = value;
        self
    }
}
