//! Heuristic layout parsing over cell grids
//!
//! Each report parser chains the same steps: metadata from the leading rows,
//! a section or header anchor, the rows below the header, and per-column
//! coercion into typed values.
pub mod coerce;
pub mod header;
pub mod metadata;
pub mod rows;
pub mod section;
pub mod table;

pub use coerce::ColumnKind;
pub use coerce::ColumnRules;
pub use coerce::Value;
pub use metadata::MetadataValue;
pub use metadata::ReportMetadata;
pub use rows::EmptyRowPolicy;
pub use section::SectionOverwrite;
pub use table::ExtractedTable;
