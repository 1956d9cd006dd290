//! Login flow and the result/added merge.
//!
//! A successful login is answered with two frames that share no
//! correlation id:
//!
//! 1. `result` for the login's own id, whose `result.id` names a session
//!    document created by the server;
//! 2. an `added` (or `changed`) frame, pushed on the general stream, whose
//!    own `id` is that document id.
//!
//! Servers send them in either order. [`LoginMerge`] reconciles both into
//! one sequence:
//!
//! ```text
//!                 result (ok, result.id = Y)
//! AwaitingResult ─────────────────────────────► AwaitingAdded ──frame.id == Y──► Done
//!    │   │   backlog holds Y already ──────────────────────────────────────────►  ▲
//!    │   └── result with error / without result.id ─────────────────────────────► │
//!    └────── (buffers id-bearing frames, bounded)    limit or deadline ─────────► ┘
//! ```
//!
//! Every frame carrying the login id is passed through as it arrives. The
//! merged stream ends once the machine is [`LoginState::Done`] or the
//! channel completes.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace, warn};

use crate::identifiers::CorrelationId;
use crate::protocol::Frame;
use crate::transport::Inbound;

use super::router::{FrameStream, recv_inbound};

// ============================================================================
// Constants
// ============================================================================

/// Method name used by every login mechanism.
pub const LOGIN_METHOD: &str = "login";

// ============================================================================
// LoginState
// ============================================================================

/// Progress of one login merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// No `result` for the login id yet; id-bearing frames are buffered.
    AwaitingResult,
    /// `result` seen; waiting for the document named by `result_id`.
    AwaitingAdded {
        /// Document id taken from `result.id`.
        result_id: String,
        /// Non-matching frames scanned so far.
        scanned: usize,
    },
    /// Nothing more will be emitted.
    Done,
}

// ============================================================================
// LoginMerge
// ============================================================================

/// Finite-state merge of a login's `result` frame with its `added` frame.
///
/// Pure and synchronous: feed it inbound frames in arrival order and emit
/// what it returns.
#[derive(Debug)]
pub struct LoginMerge {
    login_id: CorrelationId,
    state: LoginState,
    backlog: VecDeque<Frame>,
    limit: usize,
}

impl LoginMerge {
    /// Starts a merge for the login sent with `login_id`.
    ///
    /// `limit` bounds both the pre-result backlog and the post-result scan;
    /// it is clamped to at least 1.
    #[must_use]
    pub fn new(login_id: CorrelationId, limit: usize) -> Self {
        Self {
            login_id,
            state: LoginState::AwaitingResult,
            backlog: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// Returns `true` once nothing more will be emitted.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == LoginState::Done
    }

    /// Number of frames currently buffered while awaiting the result.
    #[inline]
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Gives up waiting. Used when a deadline passes.
    pub fn expire(&mut self) {
        if !self.is_done() {
            debug!(login_id = %self.login_id, state = ?self.state, "Login merge expired");
            self.finish();
        }
    }

    /// Feeds one inbound frame; returns the frames to emit, in order.
    pub fn feed(&mut self, frame: Frame) -> Vec<Frame> {
        if self.is_done() {
            return Vec::new();
        }

        if frame.id() == Some(self.login_id.as_str()) {
            return self.on_own_frame(frame);
        }

        match &mut self.state {
            LoginState::AwaitingResult => {
                if frame.id().is_some() {
                    if self.backlog.len() == self.limit {
                        self.backlog.pop_front();
                        trace!(login_id = %self.login_id, "Login backlog full, dropped oldest");
                    }
                    self.backlog.push_back(frame);
                }
                Vec::new()
            }

            LoginState::AwaitingAdded { result_id, scanned } => {
                if frame.id() == Some(result_id.as_str()) {
                    debug!(login_id = %self.login_id, %result_id, "Login document received");
                    self.finish();
                    return vec![frame];
                }

                *scanned += 1;
                if *scanned >= self.limit {
                    warn!(
                        login_id = %self.login_id,
                        %result_id,
                        scanned = *scanned,
                        "Login document not seen within backlog limit"
                    );
                    self.finish();
                }
                Vec::new()
            }

            LoginState::Done => Vec::new(),
        }
    }

    /// Handles a frame carrying the login's own id.
    fn on_own_frame(&mut self, frame: Frame) -> Vec<Frame> {
        if self.state != LoginState::AwaitingResult || !matches!(frame, Frame::Result { .. }) {
            return vec![frame];
        }

        if !frame.is_successful_result() {
            debug!(login_id = %self.login_id, "Login result carries an error");
            self.finish();
            return vec![frame];
        }

        let Some(result_id) = frame.result_id().map(str::to_string) else {
            debug!(login_id = %self.login_id, "Login result without result.id");
            self.finish();
            return vec![frame];
        };

        let mut out = vec![frame];

        if let Some(pos) = self
            .backlog
            .iter()
            .position(|buffered| buffered.id() == Some(result_id.as_str()))
        {
            if let Some(document) = self.backlog.remove(pos) {
                out.push(document);
            }
            self.finish();
        } else {
            self.backlog.clear();
            self.state = LoginState::AwaitingAdded {
                result_id,
                scanned: 0,
            };
        }

        out
    }

    fn finish(&mut self) {
        self.backlog.clear();
        self.state = LoginState::Done;
    }
}

// ============================================================================
// Merged Stream
// ============================================================================

/// Drives a [`LoginMerge`] from an inbound receiver.
///
/// `rx` must have been opened before the login frame was sent.
pub(crate) fn merged_stream(
    rx: broadcast::Receiver<Inbound>,
    merge: LoginMerge,
    added_timeout: Option<Duration>,
) -> FrameStream {
    struct Driver {
        rx: broadcast::Receiver<Inbound>,
        merge: LoginMerge,
        ready: VecDeque<Frame>,
        added_timeout: Option<Duration>,
        deadline: Option<Instant>,
    }

    let driver = Driver {
        rx,
        merge,
        ready: VecDeque::new(),
        added_timeout,
        deadline: None,
    };

    stream::unfold(driver, |mut d| async move {
        loop {
            if let Some(frame) = d.ready.pop_front() {
                return Some((frame, d));
            }
            if d.merge.is_done() {
                return None;
            }

            if d.deadline.is_none()
                && let (LoginState::AwaitingAdded { .. }, Some(t)) =
                    (d.merge.state(), d.added_timeout)
            {
                d.deadline = Some(Instant::now() + t);
            }

            let next = match d.deadline {
                Some(deadline) => match timeout_at(deadline, recv_inbound(&mut d.rx)).await {
                    Ok(next) => next,
                    Err(_) => {
                        d.merge.expire();
                        continue;
                    }
                },
                None => recv_inbound(&mut d.rx).await,
            };

            match next {
                Some(Inbound::Frame(frame)) => d.ready.extend(d.merge.feed(frame)),
                Some(Inbound::Error(e)) => trace!(error = %e, "Transport error during login"),
                None => return None,
            }
        }
    })
    .boxed()
}

// ============================================================================
// Tests
// ============================================================================
