//! Installation-sequence playback
//!
//! Steps through the schedule one date per tick, emitting viewer intents
//! that highlight that date's elements in its palette color. The driver
//! runs on a spawned task; state changes are broadcast so the panel can
//! render play/pause controls, and cancellation is cooperative: a stop
//! request never interrupts the frame being emitted, it only prevents
//! further frames from being scheduled.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::palette::date_palette;
use crate::schedule::ScheduleBoard;
use crate::viewer::{highlight_date, ViewerIntent};

/// How often the paused loop re-checks for resume or stop
const PAUSE_POLL: Duration = Duration::from_millis(25);

/// Playback phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// One playback step: a date and the intents that highlight it
#[derive(Debug, Clone)]
pub struct PlaybackFrame {
    pub date: NaiveDate,
    pub intents: Vec<ViewerIntent>,
}

/// Drives time-stepped highlighting of the schedule
pub struct Player {
    frames: Vec<PlaybackFrame>,
    tick: Duration,
    sink: mpsc::Sender<PlaybackFrame>,
    state: Arc<RwLock<PlaybackState>>,
    stop_requested: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    state_change: broadcast::Sender<PlaybackState>,
}

impl Player {
    /// Build a player over the board's current dates
    ///
    /// Frames are precomputed from the date palette, so the playback
    /// sequence is fixed at construction and unaffected by later edits.
    pub fn from_board(
        board: &ScheduleBoard,
        tick: Duration,
        sink: mpsc::Sender<PlaybackFrame>,
    ) -> Self {
        let palette = date_palette(board.dates());
        let frames = palette
            .into_iter()
            .map(|(date, color)| PlaybackFrame {
                date,
                intents: highlight_date(board, date, color),
            })
            .collect();

        let (state_change, _) = broadcast::channel(16);
        Self {
            frames,
            tick,
            sink,
            state: Arc::new(RwLock::new(PlaybackState::Stopped)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            state_change,
        }
    }

    /// The precomputed sequence, in date order
    pub fn frames(&self) -> &[PlaybackFrame] {
        &self.frames
    }

    /// Current playback state
    pub async fn state(&self) -> PlaybackState {
        *self.state.read().await
    }

    /// Receiver for state-change notifications
    pub fn on_state_change(&self) -> broadcast::Receiver<PlaybackState> {
        self.state_change.subscribe()
    }

    /// Start playback on a background task
    ///
    /// The task emits one frame per tick into the sink and broadcasts
    /// `Stopped` when the sequence ends, the sink closes, or `stop` is
    /// called.
    pub fn play(&self) -> JoinHandle<()> {
        self.stop_requested.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);

        let frames = self.frames.clone();
        let tick = self.tick;
        let sink = self.sink.clone();
        let state = self.state.clone();
        let stop_requested = self.stop_requested.clone();
        let paused = self.paused.clone();
        let state_change = self.state_change.clone();

        tokio::spawn(async move {
            Self::set_state(&state, &state_change, PlaybackState::Playing).await;

            for frame in frames {
                while paused.load(Ordering::SeqCst) && !stop_requested.load(Ordering::SeqCst) {
                    sleep(PAUSE_POLL).await;
                }
                if stop_requested.load(Ordering::SeqCst) {
                    break;
                }

                log::debug!("playback step: {}", frame.date);
                if sink.send(frame).await.is_err() {
                    log::warn!("playback sink closed, stopping");
                    break;
                }

                sleep(tick).await;
            }

            Self::set_state(&state, &state_change, PlaybackState::Stopped).await;
        })
    }

    /// Hold the current position; the in-flight frame still completes
    pub async fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        Self::set_state(&self.state, &self.state_change, PlaybackState::Paused).await;
    }

    /// Continue from the held position
    pub async fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        Self::set_state(&self.state, &self.state_change, PlaybackState::Playing).await;
    }

    /// Request a stop; no further frames are scheduled
    pub async fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        Self::set_state(&self.state, &self.state_change, PlaybackState::Stopped).await;
    }

    async fn set_state(
        state: &Arc<RwLock<PlaybackState>>,
        state_change: &broadcast::Sender<PlaybackState>,
        next: PlaybackState,
    ) {
        let mut current = state.write().await;
        if *current != next {
            log::debug!("playback state {:?} -> {:?}", *current, next);
            *current = next;
            // Ignore send errors when nobody is listening.
            let _ = state_change.send(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduleItem;

    fn board(dates: &[&str]) -> ScheduleBoard {
        let items = dates
            .iter()
            .enumerate()
            .map(|(index, date)| ScheduleItem {
                id: index as i64 + 1,
                element_guid: format!("0EdO2uEPv65OBRiGnlPw{:02}", index),
                date: date.parse().expect("valid test date"),
                position: 0,
                resources: None,
                notes: None,
            })
            .collect();
        ScheduleBoard::from_items(items)
    }

    #[tokio::test]
    async fn plays_every_date_in_order_then_stops() {
        let board = board(&["2024-05-07", "2024-05-06", "2024-05-08"]);
        let (tx, mut rx) = mpsc::channel(16);
        let player = Player::from_board(&board, Duration::from_millis(1), tx);

        let handle = player.play();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let frame = rx.recv().await.expect("frame emitted");
            seen.push(frame.date.to_string());
        }
        assert_eq!(seen, vec!["2024-05-06", "2024-05-07", "2024-05-08"]);

        handle.await.expect("playback task");
        assert_eq!(player.state().await, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn frames_carry_highlight_intents() {
        let board = board(&["2024-05-06"]);
        let (tx, _rx) = mpsc::channel(4);
        let player = Player::from_board(&board, Duration::from_millis(1), tx);

        let frame = &player.frames()[0];
        assert_eq!(frame.intents.len(), 2);
        match &frame.intents[1] {
            ViewerIntent::Select { guids } => assert_eq!(guids.len(), 1),
            other => panic!("expected Select, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stop_prevents_further_frames() {
        let dates: Vec<String> = (1..=20)
            .map(|day| format!("2024-05-{:02}", day))
            .collect();
        let date_refs: Vec<&str> = dates.iter().map(String::as_str).collect();
        let board = board(&date_refs);

        let (tx, mut rx) = mpsc::channel(64);
        let player = Player::from_board(&board, Duration::from_millis(20), tx);

        let handle = player.play();
        let _first = rx.recv().await.expect("first frame");
        player.stop().await;
        handle.await.expect("playback task");

        // A frame already in flight may still have landed, but the bulk of
        // the sequence was never scheduled.
        let mut leftover = 0;
        while rx.try_recv().is_ok() {
            leftover += 1;
        }
        assert!(leftover < 19, "stop should cut the sequence short");
        assert_eq!(player.state().await, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn state_changes_are_broadcast() {
        let board = board(&["2024-05-06"]);
        let (tx, mut rx) = mpsc::channel(4);
        let player = Player::from_board(&board, Duration::from_millis(1), tx);
        let mut states = player.on_state_change();

        let handle = player.play();
        assert_eq!(states.recv().await.expect("state"), PlaybackState::Playing);
        let _ = rx.recv().await;
        handle.await.expect("playback task");
        assert_eq!(states.recv().await.expect("state"), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn pause_and_resume_flip_state() {
        let board = board(&["2024-05-06"]);
        let (tx, _rx) = mpsc::channel(4);
        let player = Player::from_board(&board, Duration::from_millis(1), tx);

        player.pause().await;
        assert_eq!(player.state().await, PlaybackState::Paused);
        player.resume().await;
        assert_eq!(player.state().await, PlaybackState::Playing);
        player.stop().await;
        assert_eq!(player.state().await, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn empty_schedule_stops_immediately() {
        let board = ScheduleBoard::default();
        let (tx, mut rx) = mpsc::channel(4);
        let player = Player::from_board(&board, Duration::from_millis(1), tx);

        player.play().await.expect("playback task");
        assert_eq!(player.state().await, PlaybackState::Stopped);
        assert!(rx.try_recv().is_err());
    }
}
