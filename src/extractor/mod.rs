pub mod manifest_writer;
pub mod relocator;
pub mod report;

pub use manifest_writer::{render_manifest, write_manifest};
pub use relocator::{ManifestRelocator, RelocationReport};
pub use report::{RunReport, SourceReport};
