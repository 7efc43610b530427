mod error;
mod traits;
mod types;

pub use error::{PaginationError, RepositoryError, Result};
pub use traits::{Model, RecordRepository};
pub use types::{
    Attributes, Columns, Page, Pagination, RecordId, RecordRef, Row, DEFAULT_PER_PAGE,
};
