//! Core library for the devmon-report command line application.
//!
//! The library queries a compliance platform's people API across several
//! tenant workspaces and turns each person's device-monitoring task into
//! flat and per-email reports. API access lives under
//! [`devmon::report::api`], record types inside [`devmon::report::model`],
//! the per-email merge in [`devmon::report::consolidate`], and the end-to-end
//! driver under [`devmon::report::run`].

pub mod devmon;

pub use devmon::report::{
    ReportError, Result, api, config, consolidate, error, extract, flatten, io, model, run,
};
