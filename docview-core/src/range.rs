use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::{ViewerError, ViewerResult};

/// Inclusive, 0-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, page: usize) -> bool {
        self.start <= page && page <= self.end
    }

    pub fn validate(&self, page_count: usize) -> ViewerResult<()> {
        if self.start > self.end || self.end >= page_count {
            return Err(ViewerError::InvalidRange {
                start: self.start,
                end: self.end,
                page_count,
            });
        }
        Ok(())
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start + 1, self.end + 1)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseRangeError {
    #[error("empty page range")]
    Empty,
    #[error("invalid page number {0:?}")]
    InvalidNumber(String),
    #[error("page numbers start at 1")]
    Zero,
}

impl FromStr for PageRange {
    type Err = ParseRangeError;

    /// Parses the 1-based forms `"3"` and `"1-3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseRangeError::Empty);
        }
        let (start, end) = match s.split_once('-') {
            Some((start, end)) => (parse_page_number(start)?, parse_page_number(end)?),
            None => {
                let page = parse_page_number(s)?;
                (page, page)
            }
        };
        // Inverted ranges survive parsing so validation can report them against
        // the open document.
        Ok(PageRange::new(start - 1, end - 1))
    }
}

fn parse_page_number(s: &str) -> Result<usize, ParseRangeError> {
    let s = s.trim();
    let value: usize = s
        .parse()
        .map_err(|_| ParseRangeError::InvalidNumber(s.to_owned()))?;
    if value == 0 {
        return Err(ParseRangeError::Zero);
    }
    Ok(value)
}

/// Parses a comma separated list such as `"1-3, 5-7, 9"`.
pub fn parse_page_ranges(s: &str) -> Result<Vec<PageRange>, ParseRangeError> {
    s.split(',').map(str::parse).collect()
}
