use serde::{Deserialize, Serialize};

use crate::error::{ViewerError, ViewerResult};
use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub page_index: usize,
    pub rect: Rect,
}

/// Ordered matches for one query plus a wrapping cursor.
#[derive(Debug, Default)]
pub struct SearchSession {
    query: String,
    matches: Vec<SearchMatch>,
    cursor: Option<usize>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the session with the provider's results for `query`. On a
    /// provider failure the previous results are kept.
    pub fn start<F>(&mut self, query: &str, provider: F) -> ViewerResult<usize>
    where
        F: FnOnce(&str) -> ViewerResult<Vec<SearchMatch>>,
    {
        let matches = provider(query)?;
        self.query = query.to_owned();
        self.cursor = if matches.is_empty() { None } else { Some(0) };
        self.matches = matches;
        Ok(self.matches.len())
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<SearchMatch> {
        self.cursor.and_then(|i| self.matches.get(i)).copied()
    }

    pub fn next(&mut self) -> ViewerResult<SearchMatch> {
        let len = self.matches.len();
        if len == 0 {
            return Err(ViewerError::NoMatches);
        }
        let cursor = self.cursor.map_or(0, |c| (c + 1) % len);
        self.cursor = Some(cursor);
        Ok(self.matches[cursor])
    }

    pub fn previous(&mut self) -> ViewerResult<SearchMatch> {
        let len = self.matches.len();
        if len == 0 {
            return Err(ViewerError::NoMatches);
        }
        let cursor = self.cursor.map_or(len - 1, |c| (c + len - 1) % len);
        self.cursor = Some(cursor);
        Ok(self.matches[cursor])
    }
}
