pub mod config;
pub mod errors;
pub mod models;

pub use config::{DbCredentials, ExporterConfig, RunConfig};
pub use errors::{ExportError, ExportResult};
pub use models::{CourseKey, ExportId, RunState, Stage};
