//! CLI command implementations.

mod biorxiv;
mod classify;
mod config;
mod lookup;

pub use biorxiv::run_biorxiv;
pub use classify::run_classify;
pub use config::run_config;
pub use lookup::run_lookup;
