// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FIFO of conversations waiting for an agent.

use std::collections::VecDeque;

/// Conversation ids in arrival order. An id is present exactly while its
/// conversation is `Queued`.
#[derive(Debug, Default)]
pub struct WaitingQueue {
    entries: VecDeque<String>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` and returns the new length. A length of 1 means the queue
    /// just went from empty to non-empty.
    pub fn push(&mut self, id: impl Into<String>) -> usize {
        self.entries.push_back(id.into());
        self.entries.len()
    }

    pub fn peek_head(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    /// Pops the head only if it is `id`. At most one caller can win per head.
    pub fn claim_head(&mut self, id: &str) -> bool {
        if self.peek_head() == Some(id) {
            self.entries.pop_front();
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
