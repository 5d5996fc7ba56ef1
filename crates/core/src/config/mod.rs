pub mod credentials;
pub mod exporter;
pub mod run;

pub use credentials::DbCredentials;
pub use exporter::{EnvironmentConfig, ExporterConfig, ExporterDefaults, OrganizationConfig};
pub use run::RunConfig;
