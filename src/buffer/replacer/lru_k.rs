//! LRU-K replacement policy.
//!
//! Ranks evictable frames by the recency of their K-th most recent access.
//! Frames with fewer than K recorded accesses live on a *history* list and
//! are always preferred as victims over frames on the *cache* list: a page
//! touched fewer than K times leaves before any page with a real access
//! pattern, which is what makes LRU-K scan-resistant.

use std::collections::{HashMap, VecDeque};

use crate::common::FrameId;

/// An LRU-K eviction policy over frame indices.
///
/// The replacer is pure bookkeeping: it never touches frames, only ranks
/// their indices. The buffer pool drives it through `record_access` /
/// `set_evictable` and asks for victims with `evict`.
///
/// Frames with access count < K sit on the history list; the K-th access
/// migrates a frame to the cache list. Both lists are kept in eviction
/// order at their head. While a frame is on the history list, a repeat
/// access refreshes its position to the tail.
pub struct LruKReplacer {
    /// Frames seen fewer than K times, eviction candidate first.
    history: VecDeque<FrameId>,

    /// Frames seen at least K times, ordered by K-th most recent access.
    cache: VecDeque<FrameId>,

    /// Recorded accesses per tracked frame.
    access_counts: HashMap<FrameId, usize>,

    /// Evictable flag per frame. May hold frames with no accesses yet.
    evictable: HashMap<FrameId, bool>,

    /// Number of frames currently marked evictable.
    curr_size: usize,

    /// Exclusive upper bound on valid frame indices.
    replacer_size: usize,

    k: usize,
}

impl LruKReplacer {
    /// Create a replacer tracking frames `0..num_frames` with parameter `k`.
    ///
    /// # Panics
    /// Panics if `k` is 0.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "k must be > 0");

        Self {
            history: VecDeque::new(),
            cache: VecDeque::new(),
            access_counts: HashMap::new(),
            evictable: HashMap::new(),
            curr_size: 0,
            replacer_size: num_frames,
            k,
        }
    }

    /// Record one access to `frame`, updating its list membership.
    ///
    /// # Panics
    /// Panics if `frame` is out of range.
    pub fn record_access(&mut self, frame: FrameId) {
        self.check_frame(frame);

        let count = {
            let count = self.access_counts.entry(frame).or_insert(0);
            *count += 1;
            *count
        };

        if count == 1 {
            self.history.push_back(frame);
        } else if count < self.k {
            Self::detach(&mut self.history, frame);
            self.history.push_back(frame);
        } else if count == self.k {
            Self::detach(&mut self.history, frame);
            self.cache.push_back(frame);
        } else {
            Self::detach(&mut self.cache, frame);
            self.cache.push_back(frame);
        }
    }

    /// Toggle whether `frame` may be returned from [`evict`](Self::evict).
    ///
    /// The first call for a frame the replacer has never seen establishes
    /// the flag.
    ///
    /// # Panics
    /// Panics if `frame` is out of range.
    pub fn set_evictable(&mut self, frame: FrameId, evictable: bool) {
        self.check_frame(frame);

        let flag = self.evictable.entry(frame).or_insert(false);
        if *flag != evictable {
            *flag = evictable;
            if evictable {
                self.curr_size += 1;
            } else {
                self.curr_size -= 1;
            }
        }
    }

    /// Pick a victim and drop all bookkeeping for it.
    ///
    /// The history list is scanned head to tail before the cache list is
    /// considered at all; among frames with at least K accesses, the one
    /// with the oldest K-th most recent access goes first.
    pub fn evict(&mut self) -> Option<FrameId> {
        if self.curr_size == 0 {
            return None;
        }

        let victim = Self::scan(&mut self.history, &self.evictable)
            .or_else(|| Self::scan(&mut self.cache, &self.evictable))?;

        self.access_counts.remove(&victim);
        self.evictable.remove(&victim);
        self.curr_size -= 1;
        Some(victim)
    }

    /// Forcibly drop `frame` from all structures.
    ///
    /// No-op for frames that are unknown or not currently evictable.
    ///
    /// # Panics
    /// Panics if `frame` is out of range.
    pub fn remove(&mut self, frame: FrameId) {
        self.check_frame(frame);

        if !self.evictable.get(&frame).copied().unwrap_or(false) {
            return;
        }

        let count = self.access_counts.remove(&frame).unwrap_or(0);
        if count < self.k {
            Self::detach(&mut self.history, frame);
        } else {
            Self::detach(&mut self.cache, frame);
        }

        self.evictable.remove(&frame);
        self.curr_size -= 1;
    }

    /// Number of currently evictable frames.
    pub fn size(&self) -> usize {
        self.curr_size
    }

    /// First evictable entry of `list`, head to tail.
    fn scan(list: &mut VecDeque<FrameId>, evictable: &HashMap<FrameId, bool>) -> Option<FrameId> {
        let pos = list
            .iter()
            .position(|f| evictable.get(f).copied().unwrap_or(false))?;
        list.remove(pos)
    }

    fn detach(list: &mut VecDeque<FrameId>, frame: FrameId) {
        if let Some(pos) = list.iter().position(|&f| f == frame) {
            list.remove(pos);
        }
    }

    fn check_frame(&self, frame: FrameId) {
        assert!(
            frame.0 < self.replacer_size,
            "frame index {} out of range (replacer size {})",
            frame.0,
            self.replacer_size
        );
    }
}
