//! Sliding time windows for rate-based detectors.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

/// Time-bounded set of event timestamps.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindow {
    events: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and drop everything older than `window`.
    pub fn note(&mut self, now: DateTime<Utc>, window: Duration) {
        self.events.push_back(now);
        self.prune(now, window);
    }

    /// Events currently inside the window.
    pub fn count(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        self.prune(now, window);
        self.events.len()
    }

    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        let cutoff = now - window;
        while self.events.front().is_some_and(|t| *t < cutoff) {
            self.events.pop_front();
        }
    }
}

/// Time-bounded set of (timestamp, key) pairs; counts distinct keys.
///
/// Used by the scraping detector, where the interesting quantity is how many
/// distinct normalized paths a subject touched recently, not how often.
#[derive(Debug, Clone, Default)]
pub struct KeyedWindow {
    entries: VecDeque<(DateTime<Utc>, String)>,
}

impl KeyedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, now: DateTime<Utc>, key: String, window: Duration) {
        self.entries.push_back((now, key));
        self.prune(now, window);
    }

    /// Distinct keys currently inside the window.
    pub fn distinct(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        self.prune(now, window);
        let mut seen: Vec<&str> = Vec::with_capacity(self.entries.len());
        for (_, key) in &self.entries {
            if !seen.contains(&key.as_str()) {
                seen.push(key.as_str());
            }
        }
        seen.len()
    }

    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        let cutoff = now - window;
        while self.entries.front().is_some_and(|(t, _)| *t < cutoff) {
            self.entries.pop_front();
        }
    }
}

/// Collapse volatile path segments so enumerated IDs don't inflate the
/// distinct-path count: any segment containing a digit becomes `:id`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.split('?').next().unwrap_or(path);
    let mut out = String::with_capacity(trimmed.len());
    for segment in trimmed.split('/') {
        if segment.is_empty() {
            continue;
        }
        out.push('/');
        if segment.bytes().any(|b| b.is_ascii_digit()) {
            out.push_str(":id");
        } else {
            out.push_str(segment);
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_drops_expired_events() {
        let mut w = SlidingWindow::new();
        let t0 = Utc::now();
        let window = Duration::seconds(2);

        for i in 0..5 {
            w.note(t0 + Duration::milliseconds(i * 100), window);
        }
        assert_eq!(w.count(t0 + Duration::milliseconds(500), window), 5);
        assert_eq!(w.count(t0 + Duration::seconds(10), window), 0);
    }

    #[test]
    fn keyed_window_counts_distinct() {
        let mut w = KeyedWindow::new();
        let t0 = Utc::now();
        let window = Duration::seconds(60);

        w.note(t0, "/invoices/:id".to_string(), window);
        w.note(t0, "/invoices/:id".to_string(), window);
        w.note(t0, "/customers/:id".to_string(), window);
        assert_eq!(w.distinct(t0, window), 2);
    }

    #[test]
    fn paths_with_ids_normalize_together() {
        assert_eq!(normalize_path("/invoices/inv-123"), "/invoices/:id");
        assert_eq!(normalize_path("/invoices/inv-456?page=2"), "/invoices/:id");
        assert_eq!(normalize_path("/invoices/42/lines/7"), "/invoices/:id/lines/:id");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/"), "/");
    }
}
