//! Per-session output batching
//!
//! Chunks read from a PTY are queued and delivered as one concatenated
//! message at most once per interval. The buffer keeps a deadline instead of
//! a timer task: the deadline is set exactly when the queue is non-empty.

use std::time::Duration;
use tokio::time::Instant;

/// Default batching interval, about one frame at 60 Hz
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(16);

/// Queue of undelivered output for one session
#[derive(Debug)]
pub struct OutputBuffer {
    chunks: Vec<String>,
    deadline: Option<Instant>,
    interval: Duration,
}

impl OutputBuffer {
    /// Empty buffer flushing every `interval`
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            chunks: Vec::new(),
            deadline: None,
            interval,
        }
    }

    /// Queue a chunk; arms the deadline if none is pending.
    ///
    /// Returns `true` when this call armed a new deadline.
    pub fn push(&mut self, chunk: String, now: Instant) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.chunks.push(chunk);
        if self.deadline.is_none() {
            self.deadline = Some(now + self.interval);
            true
        } else {
            false
        }
    }

    /// Pending flush deadline
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the pending deadline has passed
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| d <= now)
    }

    /// Drain the queue as one string and disarm the deadline
    pub fn take(&mut self) -> Option<String> {
        self.deadline = None;
        if self.chunks.is_empty() {
            return None;
        }
        let data = self.chunks.concat();
        self.chunks.clear();
        Some(data)
    }

    /// Drop everything without delivering
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.deadline = None;
    }

    /// Number of queued chunks
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_armed_iff_non_empty(buf: &OutputBuffer) {
        assert_eq!(buf.deadline().is_some(), !buf.is_empty());
    }

    #[test]
    fn test_first_chunk_arms_deadline() {
        let now = Instant::now();
        let mut buf = OutputBuffer::new(DEFAULT_FLUSH_INTERVAL);
        assert_armed_iff_non_empty(&buf);

        assert!(buf.push("a".into(), now));
        assert!(!buf.push("b".into(), now + Duration::from_millis(5)));
        assert_eq!(buf.deadline(), Some(now + DEFAULT_FLUSH_INTERVAL));
        assert_armed_iff_non_empty(&buf);
    }

    #[test]
    fn test_take_concatenates_in_order() {
        let now = Instant::now();
        let mut buf = OutputBuffer::new(DEFAULT_FLUSH_INTERVAL);
        for chunk in ["ls", "\r\n", "src"] {
            buf.push(chunk.into(), now);
        }

        assert!(!buf.is_due(now));
        assert!(buf.is_due(now + DEFAULT_FLUSH_INTERVAL));
        assert_eq!(buf.take().as_deref(), Some("ls\r\nsrc"));
        assert_armed_iff_non_empty(&buf);
        assert_eq!(buf.take(), None);
    }

    #[test]
    fn test_chunk_after_flush_rearms() {
        let start = Instant::now();
        let mut buf = OutputBuffer::new(DEFAULT_FLUSH_INTERVAL);
        buf.push("x".into(), start);
        buf.take();

        let later = start + Duration::from_millis(40);
        assert!(buf.push("y".into(), later));
        assert_eq!(buf.deadline(), Some(later + DEFAULT_FLUSH_INTERVAL));
    }

    #[test]
    fn test_empty_chunk_is_ignored() {
        let mut buf = OutputBuffer::new(DEFAULT_FLUSH_INTERVAL);
        assert!(!buf.push(String::new(), Instant::now()));
        assert_armed_iff_non_empty(&buf);
    }

    #[test]
    fn test_clear_disarms() {
        let mut buf = OutputBuffer::new(DEFAULT_FLUSH_INTERVAL);
        buf.push("x".into(), Instant::now());
        buf.clear();
        assert!(buf.is_empty());
        assert_armed_iff_non_empty(&buf);
    }
}
