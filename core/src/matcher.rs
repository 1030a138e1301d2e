//! Incremental marker search and fixed-length capture over a chunked stream.
//!
//! # Design
//! The body of the login page arrives as arbitrary byte chunks. The matcher
//! walks every byte exactly once through a small state machine:
//!
//! ```text
//! Scanning --marker--> Skipping --offset-1 bytes--> Capturing --token_len bytes-->
//!     AwaitingTerminator --terminator--> Captured
//! ```
//!
//! Marker search uses a Knuth-Morris-Pratt failure table, so a near-match
//! that diverges falls back to the longest viable overlap instead of
//! rescanning. Every phase keeps its progress in `self`, which makes the
//! result independent of where chunk boundaries fall. State is bounded by the
//! marker and token lengths; the stream itself is never buffered.
//!
//! `offset` counts from the marker's last byte, as the service's page is laid
//! out: with `name="csrfauth" value="`, the token starts ten bytes past the
//! final `h`.

use crate::config::LoginConfig;
use crate::error::MatchError;
use crate::transport::ResponseSink;
use crate::types::CsrfToken;

/// Progress reported after each `feed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    /// No part of the marker is pending.
    NoMatch,
    /// A marker prefix is matched, or the marker was found and the token is
    /// still being read.
    PartialMatch,
    /// The token is complete. Repeated on every later `feed`.
    TokenCaptured(CsrfToken),
}

#[derive(Debug)]
enum Phase {
    Scanning { matched: usize },
    Skipping { remaining: usize },
    Capturing { buf: Vec<u8> },
    AwaitingTerminator { token: CsrfToken },
    Captured(CsrfToken),
    Failed(MatchError),
}

#[derive(Debug)]
pub struct StreamMatcher {
    marker: Vec<u8>,
    failure: Vec<usize>,
    skip: usize,
    token_len: usize,
    terminator: Option<u8>,
    phase: Phase,
}

impl StreamMatcher {
    pub fn new(marker: &str, offset: usize, token_len: usize) -> Self {
        let skip = offset.saturating_sub(1);
        let marker = marker.as_bytes().to_vec();
        let failure = failure_table(&marker);
        let phase = if marker.is_empty() {
            Phase::Skipping { remaining: skip }
        } else {
            Phase::Scanning { matched: 0 }
        };
        let mut matcher = Self {
            marker,
            failure,
            skip,
            token_len,
            terminator: None,
            phase,
        };
        matcher.settle();
        matcher
    }

    /// Require `terminator` right after the token and forbid it inside.
    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = Some(terminator);
        self
    }

    pub fn from_config(config: &LoginConfig) -> Self {
        let matcher = Self::new(&config.marker, config.offset, config.token_len);
        match config.terminator_byte() {
            Some(t) => matcher.with_terminator(t),
            None => matcher,
        }
    }

    /// Consume the next chunk of the stream.
    ///
    /// Once the token is captured (or the input was found malformed) the
    /// matcher stops reading and returns the same outcome for every call.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<MatchEvent, MatchError> {
        let mut rest = chunk;
        while !rest.is_empty() && !self.is_terminal() {
            let consumed = self.step(rest);
            rest = &rest[consumed..];
            self.settle();
        }
        self.event()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Captured(_))
    }

    /// End of stream. Returns the token if one was fully captured; partial
    /// progress is discarded.
    pub fn finish(self) -> Result<Option<CsrfToken>, MatchError> {
        match self.phase {
            Phase::Captured(token) => Ok(Some(token)),
            Phase::Failed(err) => Err(err),
            _ => Ok(None),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Captured(_) | Phase::Failed(_))
    }

    fn event(&self) -> Result<MatchEvent, MatchError> {
        match &self.phase {
            Phase::Scanning { matched: 0 } => Ok(MatchEvent::NoMatch),
            Phase::Scanning { .. }
            | Phase::Skipping { .. }
            | Phase::Capturing { .. }
            | Phase::AwaitingTerminator { .. } => Ok(MatchEvent::PartialMatch),
            Phase::Captured(token) => Ok(MatchEvent::TokenCaptured(token.clone())),
            Phase::Failed(err) => Err(err.clone()),
        }
    }

    /// Advance through `input` within the current phase. Returns the number
    /// of bytes consumed, always at least one for a settled, non-terminal
    /// phase.
    fn step(&mut self, input: &[u8]) -> usize {
        match &mut self.phase {
            Phase::Scanning { matched } => {
                for (i, &byte) in input.iter().enumerate() {
                    *matched = advance(&self.marker, &self.failure, *matched, byte);
                    if *matched == self.marker.len() {
                        self.phase = Phase::Skipping {
                            remaining: self.skip,
                        };
                        return i + 1;
                    }
                }
                input.len()
            }
            Phase::Skipping { remaining } => {
                let n = (*remaining).min(input.len());
                *remaining -= n;
                n
            }
            Phase::Capturing { buf } => {
                let want = self.token_len - buf.len();
                let window = &input[..want.min(input.len())];
                if let Some(term) = self.terminator {
                    if let Some(pos) = window.iter().position(|&b| b == term) {
                        let captured = buf.len() + pos;
                        self.phase = Phase::Failed(MatchError::Truncated { captured });
                        return pos + 1;
                    }
                }
                buf.extend_from_slice(window);
                window.len()
            }
            Phase::AwaitingTerminator { token } => {
                if Some(input[0]) == self.terminator {
                    let token = token.clone();
                    self.phase = Phase::Captured(token);
                } else {
                    self.phase = Phase::Failed(MatchError::Overrun {
                        token_len: self.token_len,
                    });
                }
                1
            }
            Phase::Captured(_) | Phase::Failed(_) => input.len(),
        }
    }

    /// Apply transitions that need no further input.
    fn settle(&mut self) {
        loop {
            let next = match &mut self.phase {
                Phase::Skipping { remaining: 0 } => Phase::Capturing {
                    buf: Vec::with_capacity(self.token_len),
                },
                Phase::Capturing { buf } if buf.len() == self.token_len => {
                    match String::from_utf8(std::mem::take(buf)) {
                        Ok(value) => {
                            let token = CsrfToken::new(value);
                            if self.terminator.is_some() {
                                Phase::AwaitingTerminator { token }
                            } else {
                                Phase::Captured(token)
                            }
                        }
                        Err(_) => Phase::Failed(MatchError::InvalidUtf8),
                    }
                }
                _ => return,
            };
            self.phase = next;
        }
    }
}

impl ResponseSink for StreamMatcher {
    fn on_chunk(&mut self, chunk: &[u8]) {
        // Failures stay in the phase and surface through `finish`.
        let _ = self.feed(chunk);
    }
}

/// `failure[i]` is the length of the longest proper prefix of
/// `marker[..=i]` that is also its suffix.
fn failure_table(marker: &[u8]) -> Vec<usize> {
    let mut failure = vec![0; marker.len()];
    let mut k = 0;
    for i in 1..marker.len() {
        while k > 0 && marker[i] != marker[k] {
            k = failure[k - 1];
        }
        if marker[i] == marker[k] {
            k += 1;
        }
        failure[i] = k;
    }
    failure
}

/// One automaton step. `matched` must be below `marker.len()`.
fn advance(marker: &[u8], failure: &[usize], matched: usize, byte: u8) -> usize {
    let mut m = matched;
    while m > 0 && marker[m] != byte {
        m = failure[m - 1];
    }
    if marker[m] == byte {
        m + 1
    } else {
        0
    }
}
