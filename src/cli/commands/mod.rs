//! CLI command implementations.

mod analyze;
mod config;
mod doctor;
mod init;
mod serve;

pub use analyze::run_analyze;
pub use config::run_config;
pub use doctor::run_doctor;
pub use init::run_init;
pub use serve::run_serve;
