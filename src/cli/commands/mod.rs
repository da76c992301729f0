//! CLI command implementations.

mod browse;
mod config;
mod doctor;
mod fetch;
mod process;
mod run;

pub use browse::run_browse;
pub use config::run_config;
pub use doctor::run_doctor;
pub use fetch::run_fetch;
pub use process::run_process;
pub use run::run_bot;
