pub mod database;
pub mod process;
pub mod storage;

pub use database::{parse_statements, SourceDatabase};
pub use process::{ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use storage::{parse_s3_uri, read_url, ObjectStorage};
