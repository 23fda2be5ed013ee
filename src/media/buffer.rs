use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// What happened to buffered data while pushing a fragment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Oldest fragments evicted to make room
    pub evicted_fragments: usize,

    /// Bytes lost to eviction
    pub evicted_bytes: usize,

    /// The fragment alone exceeds the ceiling and was not buffered
    pub rejected: bool,
}

impl PushReport {
    pub fn lost_data(&self) -> bool {
        self.evicted_fragments > 0 || self.rejected
    }
}

/// In-memory capture buffer for one participant, bounded by a byte ceiling
#[derive(Debug)]
pub struct MediaBuffer {
    fragments: VecDeque<Vec<u8>>,
    size: usize,
    ceiling: usize,
    paused: bool,
    started_at: DateTime<Utc>,
}

impl MediaBuffer {
    pub fn new(ceiling: usize) -> Self {
        Self {
            fragments: VecDeque::new(),
            size: 0,
            ceiling,
            paused: false,
            started_at: Utc::now(),
        }
    }

    /// Append a fragment, evicting from the front until it fits
    pub fn push(&mut self, fragment: Vec<u8>) -> PushReport {
        let mut report = PushReport::default();

        if fragment.len() > self.ceiling {
            report.rejected = true;
            return report;
        }

        while self.size + fragment.len() > self.ceiling {
            match self.fragments.pop_front() {
                Some(oldest) => {
                    self.size -= oldest.len();
                    report.evicted_fragments += 1;
                    report.evicted_bytes += oldest.len();
                }
                None => break,
            }
        }

        self.size += fragment.len();
        self.fragments.push_back(fragment);
        report
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Concatenate every fragment in arrival order
    pub fn into_bytes(self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.size);
        for fragment in self.fragments {
            data.extend_from_slice(&fragment);
        }
        data
    }
}
