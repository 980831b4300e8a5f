use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::watch;

/// A retained message
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub seq: u64,
    pub stored_at: Instant,
    pub payload: Bytes,
}

/// Append-only, time-bounded message log for one stream.
///
/// Sequence numbers start at 1 and are contiguous, so a retained entry is found by offset from
/// the oldest one. `head` carries the last appended sequence and wakes followers.
#[derive(Debug)]
pub(crate) struct StreamLog {
    max_age: Duration,
    next_seq: u64,
    entries: VecDeque<Entry>,
    head: watch::Sender<u64>,
}

impl StreamLog {
    pub fn new(max_age: Duration) -> Self {
        let (head, _) = watch::channel(0);
        Self {
            max_age,
            next_seq: 1,
            entries: VecDeque::new(),
            head,
        }
    }

    pub fn append(&mut self, payload: Bytes, now: Instant) -> u64 {
        self.prune(now);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(Entry {
            seq,
            stored_at: now,
            payload,
        });
        self.head.send_replace(seq);
        seq
    }

    /// Drops entries older than the retention window
    pub fn prune(&mut self, now: Instant) -> usize {
        let mut dropped = 0;
        while let Some(front) = self.entries.front() {
            if now.saturating_duration_since(front.stored_at) <= self.max_age {
                break;
            }
            self.entries.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn watch(&self) -> watch::Receiver<u64> {
        self.head.subscribe()
    }

    pub fn first_seq(&self) -> Option<u64> {
        self.entries.front().map(|entry| entry.seq)
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn read_from(&self, from_seq: u64, limit: usize) -> Vec<Entry> {
        self.entries
            .iter()
            .skip_while(|entry| entry.seq < from_seq)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get(&self, seq: u64) -> Option<Bytes> {
        let first = self.first_seq()?;
        if seq < first {
            return None;
        }
        self.entries
            .get((seq - first) as usize)
            .map(|entry| entry.payload.clone())
    }
}
