//! Demonstration resources and drivers for `scopestack`
//!
//! Every resource here is an ordinary [`scopestack::ResourceFactory`]:
//!
//! - [`journal`]: timestamped append-only log file
//! - [`session`]: journal bracketed by `SESSION START` / `SESSION ...` markers
//! - [`source`]: two-column `operation,params` record file
//! - [`connection`]: stand-in service connection that reports failures
//! - [`tempfiles`]: files written inside a scope, optionally deleted on exit
//!
//! [`scenarios::Demo`] composes them into the scenarios run by the
//! `scopestack-demo` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod errors;
pub mod journal;
pub mod scenarios;
pub mod session;
pub mod source;
pub mod tempfiles;

pub use config::DemoConfig;
pub use errors::DemoError;
pub use scenarios::{BatchSummary, Demo, ScenarioOutcome, ScenarioReport};
