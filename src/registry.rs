//! Subscription table owned by the agent-execution component.
//!
//! The table maps topic filters to incoming-message callbacks. It is mutated
//! only from command execution on the single agent thread (add on a
//! successful subscribe, remove on a successful unsubscribe), so it carries
//! no locking of its own; whatever owns the agent decides how tests or
//! monitoring may peek at it.
//!
//! Per-filter lifecycle as observed through the table:
//! unregistered → pending(subscribe) → registered on success, back to
//! unregistered on failure; registered → pending(unsubscribe) → unregistered
//! on success, back to registered on failure.

use crate::agent::IncomingCallback;
use crate::message::PublishView;

pub struct SubscriptionRegistry {
    entries: Vec<Entry>,
    max_entries: usize,
}

struct Entry {
    filter: String,
    on_message: IncomingCallback,
}

impl SubscriptionRegistry {
    /// Creates a table that holds at most `max_entries` subscriptions.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Registers `on_message` for `filter`.
    ///
    /// Returns `false` when the table is full or the filter is already
    /// registered; one entry per filter keeps the per-filter lifecycle
    /// single-writer.
    pub fn add(&mut self, filter: &str, on_message: IncomingCallback) -> bool {
        if self.entries.len() == self.max_entries || self.contains(filter) {
            return false;
        }
        self.entries.push(Entry {
            filter: filter.to_string(),
            on_message,
        });
        true
    }

    /// Removes the entry for `filter`, if present.
    pub fn remove(&mut self, filter: &str) {
        self.entries.retain(|entry| entry.filter != filter);
    }

    pub fn contains(&self, filter: &str) -> bool {
        self.entries.iter().any(|entry| entry.filter == filter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fans an incoming publish out to every entry whose filter matches the
    /// topic. Returns whether at least one callback ran, so the agent can
    /// log unsolicited publishes.
    pub fn dispatch(&self, publish: &PublishView<'_>) -> bool {
        let mut handled = false;
        for entry in &self.entries {
            if matches_filter(&entry.filter, publish.topic) {
                (entry.on_message)(publish);
                handled = true;
            }
        }
        handled
    }
}

/// Topic filter matching with `+` (one level) and `#` (remaining levels)
/// wildcards. A trailing `#` also matches the parent level itself, so
/// `device/#` matches `device`.
pub fn matches_filter(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(level), Some(name)) if level == name => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
