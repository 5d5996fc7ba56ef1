pub mod course;
pub mod export;
pub mod stage;

pub use course::CourseKey;
pub use export::{archive_key, encrypted_entry, exported_filename, url_path_join, ExportId};
pub use stage::{RunState, Stage};
