//! # vigil-server
//!
//! Runtime host for the vigil event pipeline.
//!
//! This library provides the control API handlers, application state and
//! logging setup used by the `vigil-server` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
