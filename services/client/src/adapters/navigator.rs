//! services/client/src/adapters/navigator.rs
//!
//! An in-process implementation of the `Navigator` port. It tracks the current route and
//! every route committed so far, which is all a terminal front end needs.

use std::sync::RwLock;
use tracing::debug;
use voice_word_core::ports::Navigator;

#[derive(Debug)]
pub struct HistoryNavigator {
    history: RwLock<Vec<String>>,
}

impl HistoryNavigator {
    /// Starts at `initial` with a one-entry history.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: RwLock::new(vec![initial.into()]),
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.history.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for HistoryNavigator {
    fn push(&self, path: &str) {
        debug!("Navigating to {}", path);
        self.history
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
    }

    fn current(&self) -> String {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }
}
