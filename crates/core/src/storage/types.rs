use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PaginationError;

/// Primary key of a persisted record.
pub type RecordId = i64;

/// Column values of a record, keyed by column name.
pub type Attributes = serde_json::Map<String, Value>;

/// A persisted record: its id plus its column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RecordId,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Row {
    /// Creates a row with no attributes.
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    /// Returns the value of `column`, if set.
    pub fn attribute(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    /// Keeps only the selected columns. The id is always kept.
    pub fn project(mut self, columns: &Columns) -> Self {
        if let Columns::Only(selected) = columns {
            self.attributes
                .retain(|column, _| selected.iter().any(|s| s == column));
        }
        self
    }
}

/// Either the identifier of a record or the record itself.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordRef<R> {
    Id(RecordId),
    Record(R),
}

impl<R> From<RecordId> for RecordRef<R> {
    fn from(id: RecordId) -> Self {
        RecordRef::Id(id)
    }
}

/// Column projection of a read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Columns {
    /// Every column (`*`).
    #[default]
    All,
    /// Only the listed columns.
    Only(Vec<String>),
}

impl Columns {
    /// Creates a projection over the given columns.
    ///
    /// An empty list or a list containing `*` selects every column.
    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() || columns.iter().any(|c| c == "*") {
            Columns::All
        } else {
            Columns::Only(columns)
        }
    }

    /// Returns true if `column` is part of the projection.
    pub fn includes(&self, column: &str) -> bool {
        match self {
            Columns::All => true,
            Columns::Only(columns) => column == "id" || columns.iter().any(|c| c == column),
        }
    }
}

impl fmt::Display for Columns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Columns::All => f.write_str("*"),
            Columns::Only(columns) => f.write_str(&columns.join(",")),
        }
    }
}

/// Default number of records per page.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Validated pagination parameters. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    per_page: u32,
    page: u32,
}

impl Pagination {
    /// Creates pagination parameters, rejecting zero values.
    pub fn new(per_page: u32, page: u32) -> Result<Self, PaginationError> {
        if per_page == 0 {
            return Err(PaginationError::InvalidPerPage);
        }
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        Ok(Self { per_page, page })
    }

    /// First page with the given page size.
    pub fn per_page_of(per_page: u32) -> Result<Self, PaginationError> {
        Self::new(per_page, 1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Number of records skipped before this page.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            page: 1,
        }
    }
}

/// One page of results plus the total count of the unpaginated query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub total: u64,
    pub per_page: u32,
    pub current_page: u32,
}

impl<R> Page<R> {
    /// Builds a page from its items and the total count.
    pub fn new(items: Vec<R>, total: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            per_page: pagination.per_page(),
            current_page: pagination.page(),
        }
    }

    /// Last page number, at least 1.
    pub fn last_page(&self) -> u32 {
        let per_page = u64::from(self.per_page.max(1));
        let pages = self.total.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }
}
