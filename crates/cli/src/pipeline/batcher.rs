//! Line batcher - groups input lines into dispatch batches.

use contracts::{Batch, Message};

/// Accumulates lines until a batch is full.
///
/// Blank lines are skipped; the queue does not accept empty bodies.
#[derive(Debug)]
pub struct LineBatcher {
    max_batch_size: usize,
    pending: Vec<Message>,
}

impl LineBatcher {
    pub fn new(max_batch_size: usize) -> Self {
        let max_batch_size = max_batch_size.max(1);
        Self {
            max_batch_size,
            pending: Vec::with_capacity(max_batch_size),
        }
    }

    /// Add a line; returns a batch once `max_batch_size` lines are pending.
    ///
    /// Returns `None` for blank lines without changing state.
    pub fn push(&mut self, line: String) -> Option<Batch> {
        if line.trim().is_empty() {
            return None;
        }
        self.pending.push(Message::from(line));
        if self.pending.len() >= self.max_batch_size {
            return self.flush();
        }
        None
    }

    /// Take whatever is pending as a (possibly short) batch
    pub fn flush(&mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            return None;
        }
        let messages = std::mem::replace(&mut self.pending, Vec::with_capacity(self.max_batch_size));
        Some(Batch::new(messages))
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
