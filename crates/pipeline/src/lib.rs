pub mod extraction;
pub mod packaging;
pub mod paths;
pub mod runner;
pub mod source_loader;
pub mod test_utils;
pub mod validation;

pub use extraction::ExtractionJobDriver;
pub use packaging::PackagingStage;
pub use paths::RunPaths;
pub use runner::PipelineRunner;
pub use source_loader::{SourceDataLoader, SourceStore};
pub use validation::ValidationStage;
