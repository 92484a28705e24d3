pub mod name_extractor;
pub mod name_filter;

pub use name_extractor::{ExtractionStats, NameExtractor};
pub use name_filter::NameFilter;
