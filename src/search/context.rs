//! Conversational context
//!
//! A `ContextWindow` keeps recent queries of one conversation and folds the
//! last few into the string that actually gets searched. Windows are owned
//! per session; `SessionRegistry` hands them out by session id.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::core::error::{RagError, Result};

pub const DEFAULT_TURNS: usize = 3;
pub const DEFAULT_MAX_HISTORY: usize = 50;

#[derive(Debug, Clone)]
pub struct ContextWindow {
    history: VecDeque<String>,
    turns: usize,
    max_history: usize,
}

impl ContextWindow {
    /// `turns` queries feed the effective query; at most `max_history` are kept.
    pub fn new(turns: usize, max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            history: VecDeque::new(),
            turns: turns.clamp(1, max_history),
            max_history,
        }
    }

    /// Record a query. Empty or whitespace-only input is rejected.
    pub fn append(&mut self, query: &str) -> Result<()> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::required("Query"));
        }

        self.history.push_back(query.to_string());
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        Ok(())
    }

    /// The last `turns` queries, oldest first, joined by single spaces.
    pub fn effective_query(&self) -> String {
        let skip = self.history.len().saturating_sub(self.turns);
        self.history
            .iter()
            .skip(skip)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn history(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&str> {
        self.history.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_TURNS, DEFAULT_MAX_HISTORY)
    }
}

/// Conversation windows keyed by session id
///
/// The map lock is only held to look a window up; each window has its own
/// lock, so searches in different sessions run concurrently.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Mutex<ContextWindow>>>>,
    turns: usize,
    max_history: usize,
}

impl SessionRegistry {
    pub fn new(turns: usize, max_history: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            turns,
            max_history,
        }
    }

    /// Window of `session`, created on first use.
    pub fn session(&self, session: &str) -> Arc<Mutex<ContextWindow>> {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(session.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ContextWindow::new(self.turns, self.max_history))))
            .clone()
    }

    /// Run `f` against the window of `session`, creating it if needed.
    pub fn with_session<T>(&self, session: &str, f: impl FnOnce(&mut ContextWindow) -> T) -> T {
        let window = self.session(session);
        let mut window = window.lock();
        f(&mut *window)
    }

    /// Forget a session. Returns whether it existed.
    pub fn reset(&self, session: &str) -> bool {
        self.sessions.lock().remove(session).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TURNS, DEFAULT_MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_query_uses_last_three() {
        let mut window = ContextWindow::default();
        window.append("java developer").unwrap();
        window.append("5 years experience").unwrap();
        window.append("remote").unwrap();
        assert_eq!(
            window.effective_query(),
            "java developer 5 years experience remote"
        );

        window.append("senior").unwrap();
        assert_eq!(window.effective_query(), "5 years experience remote senior");
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_short_history() {
        let mut window = ContextWindow::default();
        assert_eq!(window.effective_query(), "");
        window.append("  rust  ").unwrap();
        assert_eq!(window.effective_query(), "rust");
        assert_eq!(window.latest(), Some("rust"));
    }

    #[test]
    fn test_rejects_blank_query() {
        let mut window = ContextWindow::default();
        assert!(window.append("").is_err());
        assert!(window.append(" \t\n").is_err());
        assert!(window.is_empty());
    }

    #[test]
    fn test_history_is_capped() {
        let mut window = ContextWindow::new(3, 5);
        for i in 0..8 {
            window.append(&format!("q{}", i)).unwrap();
        }
        assert_eq!(window.history(), vec!["q3", "q4", "q5", "q6", "q7"]);
        assert_eq!(window.effective_query(), "q5 q6 q7");

        window.clear();
        assert!(window.is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let registry = SessionRegistry::default();

        registry.with_session("alice", |w| w.append("golang").unwrap());
        registry.with_session("bob", |w| w.append("nurse").unwrap());
        registry.with_session("alice", |w| w.append("remote").unwrap());

        assert_eq!(
            registry.with_session("alice", |w| w.effective_query()),
            "golang remote"
        );
        assert_eq!(registry.with_session("bob", |w| w.effective_query()), "nurse");
        assert_eq!(registry.session_count(), 2);

        assert!(registry.reset("alice"));
        assert!(!registry.reset("alice"));
        assert!(registry.with_session("alice", |w| w.is_empty()));
    }

    #[test]
    fn test_other_sessions_usable_while_one_is_busy() {
        let registry = SessionRegistry::default();

        let nested = registry.with_session("alice", |alice| {
            alice.append("kotlin").unwrap();
            registry.with_session("bob", |bob| {
                bob.append("designer").unwrap();
                bob.effective_query()
            })
        });
        assert_eq!(nested, "designer");

        let held = registry.session("alice");
        let _guard = held.lock();
        assert_eq!(registry.with_session("carol", |w| w.len()), 0);
        assert_eq!(registry.session_count(), 3);
    }
}
