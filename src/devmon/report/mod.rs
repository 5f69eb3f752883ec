pub mod api;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod extract;
pub mod flatten;
pub mod io;
pub mod model;
pub mod run;

pub use error::{ReportError, Result};
