//! Drag gesture state machine
//!
//! One gesture runs Idle → Dragging → Hovering → drop (or cancel). The
//! machine only tracks what is being dragged and where it would land; the
//! actual arrangement change is planned in [`super::reorder`] and committed
//! by the engine.

use chrono::NaiveDate;

/// Where a drop would land: a date bucket and an insertion slot in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub items: Vec<i64>,
    pub date: NaiveDate,
    pub index: usize,
}

/// Gesture phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState {
    Idle,
    /// Pointer is down and moving, no drop zone under it yet
    Dragging { items: Vec<i64> },
    /// Pointer is over a candidate slot
    Hovering {
        items: Vec<i64>,
        date: NaiveDate,
        index: usize,
    },
}

/// One drag gesture from pointer-down to drop or cancel
#[derive(Debug, Clone, Default)]
pub struct DragGesture {
    state: DragState,
}

impl Default for DragState {
    fn default() -> Self {
        DragState::Idle
    }
}

impl DragGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Begin dragging
    ///
    /// If the grabbed item belongs to the active multi-selection the whole
    /// selection drags as a unit; otherwise only the grabbed item moves.
    /// Starting a new gesture discards any gesture in progress.
    pub fn begin(&mut self, grabbed: i64, selection: &[i64]) {
        let items = if selection.len() > 1 && selection.contains(&grabbed) {
            selection.to_vec()
        } else {
            vec![grabbed]
        };
        self.state = DragState::Dragging { items };
    }

    /// Record the candidate drop slot under the pointer
    ///
    /// Ignored when no gesture is in progress.
    pub fn hover(&mut self, date: NaiveDate, index: usize) {
        let items = match &self.state {
            DragState::Dragging { items } | DragState::Hovering { items, .. } => items.clone(),
            DragState::Idle => return,
        };
        self.state = DragState::Hovering { items, date, index };
    }

    /// The pointer left every drop zone; keep dragging without a target
    pub fn leave(&mut self) {
        if let DragState::Hovering { items, .. } = &self.state {
            self.state = DragState::Dragging {
                items: items.clone(),
            };
        }
    }

    /// Release over the current slot, ending the gesture
    ///
    /// Returns the drop target when the pointer was over one, `None` when
    /// the release happened outside every drop zone.
    pub fn release(&mut self) -> Option<DropTarget> {
        match std::mem::take(&mut self.state) {
            DragState::Hovering { items, date, index } => Some(DropTarget { items, date, index }),
            _ => None,
        }
    }

    /// Abort the gesture without dropping
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

/// Insertion slot for a pointer over a list row
///
/// Above the row's vertical midpoint the drop lands before the row, below
/// it the drop lands after.
pub fn hover_index(pointer_y: f64, row_top: f64, row_height: f64, row_index: usize) -> usize {
    if pointer_y < row_top + row_height / 2.0 {
        row_index
    } else {
        row_index + 1
    }
}
