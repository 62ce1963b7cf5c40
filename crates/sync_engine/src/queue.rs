//! Per-stream FIFO queue.
//!
//! Insertion order is the only order: samples are never re-sorted. An
//! arrival older than its predecessor is counted for diagnostics and
//! still appended at the back.

use std::collections::VecDeque;
use std::fmt;

use contracts::{AccelSample, PulseSample, Timestamp};

/// Anything queued by the synchronizer carries a device timestamp
pub(crate) trait Timestamped {
    fn ts(&self) -> Timestamp;
}

impl Timestamped for PulseSample {
    fn ts(&self) -> Timestamp {
        self.ts
    }
}

impl Timestamped for AccelSample {
    fn ts(&self) -> Timestamp {
        self.ts
    }
}

pub(crate) struct StreamQueue<T> {
    items: VecDeque<T>,
    last_timestamp: Option<Timestamp>,
    out_of_order_count: u64,
    max_depth: usize,
}

impl<T> fmt::Debug for StreamQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamQueue")
            .field("len", &self.items.len())
            .field("max_depth", &self.max_depth)
            .field("out_of_order", &self.out_of_order_count)
            .finish()
    }
}

impl<T: Timestamped> StreamQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: VecDeque::new(),
            last_timestamp: None,
            out_of_order_count: 0,
            max_depth: 0,
        }
    }

    /// Append at the back. Returns `true` if the sample is older than
    /// the previous arrival.
    #[inline]
    pub(crate) fn push(&mut self, item: T) -> bool {
        let ts = item.ts();
        let out_of_order = self.last_timestamp.is_some_and(|last| ts < last);
        if out_of_order {
            self.out_of_order_count += 1;
        }
        self.last_timestamp = Some(ts);

        self.items.push_back(item);
        self.max_depth = self.max_depth.max(self.items.len());
        out_of_order
    }

    #[inline]
    pub(crate) fn front(&self) -> Option<&T> {
        self.items.front()
    }

    #[inline]
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub(crate) fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }

    #[inline]
    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }
}
