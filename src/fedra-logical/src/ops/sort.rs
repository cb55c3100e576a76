//! Sort operator with optional LIMIT / OFFSET.

use serde::{Deserialize, Serialize};

/// One ordering column.
///
/// Nulls sort last ascending and first descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub column: usize,
    pub ascending: bool,
}

impl SortKey {
    pub const fn asc(column: usize) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub const fn desc(column: usize) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "${} {}", self.column, dir)
    }
}

/// Sort operator.
///
/// A sort may carry no keys at all, in which case it only applies
/// `offset` and `fetch` (a bare `LIMIT`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortOp {
    pub keys: Vec<SortKey>,
    /// Rows skipped before emitting.
    pub offset: usize,
    /// Maximum rows emitted; `None` is unlimited.
    pub fetch: Option<usize>,
}

impl SortOp {
    pub const fn new(keys: Vec<SortKey>) -> Self {
        Self {
            keys,
            offset: 0,
            fetch: None,
        }
    }

    /// `LIMIT fetch OFFSET offset` without ordering.
    pub const fn limit(offset: usize, fetch: Option<usize>) -> Self {
        Self {
            keys: Vec::new(),
            offset,
            fetch,
        }
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn with_fetch(mut self, fetch: usize) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Rows a source must return so that `offset` and `fetch` can be applied locally.
    pub fn offset_plus_fetch(&self) -> Option<usize> {
        self.fetch.map(|f| f.saturating_add(self.offset))
    }
}
