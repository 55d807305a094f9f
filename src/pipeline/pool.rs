//! Session-scoped queue of filtered pieces with at-most-once delivery.
//!
//! A [`PiecePool`] is owned by exactly one session. It is not internally
//! synchronized: callers that share a session must serialize access, e.g.
//! behind a `tokio::sync::Mutex`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::PoolConfig;
use crate::model::{Piece, Quadrant, QuadrantMap};
use crate::util::text::normalize_text;

/// Result of one [`PiecePool::enqueue`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnqueueOutcome {
    pub accepted: usize,
    pub skipped: usize,
}

/// Snapshot for status displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub session_id: Uuid,
    pub queued: QuadrantMap<usize>,
    pub used_texts: usize,
    /// Delivered pieces per fragment, sorted by identifier.
    pub fragment_usage: BTreeMap<String, usize>,
}

impl PoolStats {
    #[must_use]
    pub fn total_queued(&self) -> usize {
        self.queued.iter().map(|(_, count)| *count).sum()
    }
}

/// A pool shared by several tasks of the same session.
pub type SharedPool = Arc<Mutex<PiecePool>>;

#[derive(Debug, Clone)]
pub struct PiecePool {
    session_id: Uuid,
    quota: usize,
    used_texts: FxHashSet<String>,
    fragment_usage: FxHashMap<String, usize>,
    queues: QuadrantMap<VecDeque<Piece>>,
}

impl PiecePool {
    /// Start a fresh session.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self::with_session_id(Uuid::new_v4(), config)
    }

    #[must_use]
    pub fn with_session_id(session_id: Uuid, config: PoolConfig) -> Self {
        Self {
            session_id,
            quota: config.fragment_quota,
            used_texts: FxHashSet::default(),
            fragment_usage: FxHashMap::default(),
            queues: QuadrantMap::default(),
        }
    }

    /// Wrap the pool for callers that drive one session from several tasks.
    #[must_use]
    pub fn into_shared(self) -> SharedPool {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Queue a batch for `quadrant`.
    ///
    /// A piece is skipped when its normalized text was already delivered or
    /// is already pending, or when its fragment's delivered plus pending
    /// count has reached the quota. Pieces are retagged with `quadrant`.
    pub fn enqueue(&mut self, quadrant: Quadrant, pieces: Vec<Piece>) -> EnqueueOutcome {
        let mut pending_texts: FxHashSet<String> = self
            .queues
            .iter()
            .flat_map(|(_, queue)| queue.iter())
            .map(|piece| normalize_text(&piece.text))
            .collect();
        let mut pending_usage: FxHashMap<String, usize> = FxHashMap::default();
        for piece in self.queues.iter().flat_map(|(_, queue)| queue.iter()) {
            if let Some(fragment_id) = piece.fragment_id() {
                *pending_usage.entry(fragment_id.to_string()).or_insert(0) += 1;
            }
        }

        let mut outcome = EnqueueOutcome::default();
        for mut piece in pieces {
            let key = normalize_text(&piece.text);
            if self.used_texts.contains(&key) || pending_texts.contains(&key) {
                outcome.skipped += 1;
                continue;
            }
            if let Some(fragment_id) = piece.fragment_id() {
                let reserved = self.usage(fragment_id)
                    + pending_usage.get(fragment_id).copied().unwrap_or(0);
                if reserved >= self.quota {
                    outcome.skipped += 1;
                    continue;
                }
                *pending_usage.entry(fragment_id.to_string()).or_insert(0) += 1;
            }
            pending_texts.insert(key);
            piece.quadrant = quadrant;
            self.queues[quadrant].push_back(piece);
            outcome.accepted += 1;
        }

        tracing::debug!(
            session_id = %self.session_id,
            quadrant = %quadrant,
            accepted = outcome.accepted,
            skipped = outcome.skipped,
            "pool enqueue"
        );
        outcome
    }

    /// Deliver the first eligible piece for `quadrant`.
    ///
    /// Ineligible pieces stay queued in place. The delivered piece's text is
    /// marked used and its fragment's usage incremented.
    pub fn next(&mut self, quadrant: Quadrant) -> Option<Piece> {
        let position = self.queues[quadrant]
            .iter()
            .position(|piece| self.is_eligible(piece))?;
        let piece = self.queues[quadrant].remove(position)?;

        self.used_texts.insert(normalize_text(&piece.text));
        if let Some(fragment_id) = piece.fragment_id() {
            *self.fragment_usage.entry(fragment_id.to_string()).or_insert(0) += 1;
        }
        Some(piece)
    }

    /// Up to `limit` queued pieces for `quadrant`, without consuming them.
    #[must_use]
    pub fn peek(&self, quadrant: Quadrant, limit: usize) -> Vec<&Piece> {
        self.queues[quadrant].iter().take(limit).collect()
    }

    /// Reset to an empty session, keeping the session id.
    pub fn clear(&mut self) {
        self.used_texts.clear();
        self.fragment_usage.clear();
        for quadrant in Quadrant::ALL {
            self.queues[quadrant].clear();
        }
        tracing::info!(session_id = %self.session_id, "pool cleared");
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            session_id: self.session_id,
            queued: self.queues.map_ref(|_, queue| queue.len()),
            used_texts: self.used_texts.len(),
            fragment_usage: self
                .fragment_usage
                .iter()
                .map(|(id, count)| (id.clone(), *count))
                .collect(),
        }
    }

    /// Delivered count for a fragment.
    #[must_use]
    pub fn usage(&self, fragment_id: &str) -> usize {
        self.fragment_usage.get(fragment_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_text_used(&self, text: &str) -> bool {
        self.used_texts.contains(&normalize_text(text))
    }

    fn is_eligible(&self, piece: &Piece) -> bool {
        if self.used_texts.contains(&normalize_text(&piece.text)) {
            return false;
        }
        piece
            .fragment_id()
            .is_none_or(|fragment_id| self.usage(fragment_id) < self.quota)
    }
}

impl Default for PiecePool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}
