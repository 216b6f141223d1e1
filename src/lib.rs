//! Client-side data orchestration for the payroll reporting dashboard:
//! the employee directory with its payroll detail panel, the two-phase
//! dashboard loader, and the import history.

pub mod config;
pub mod controllers;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use errors::{AppError, AppResult};
pub use state::AppState;
