mod fetched;
mod result_set;
mod row;

pub use fetched::FetchedRow;
pub use result_set::ResultSet;
pub use row::DbRow;

pub(crate) use row::column_index;
