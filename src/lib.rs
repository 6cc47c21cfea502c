//! Offshore safety-event exploration and weak-signal tagging.
//!
//! The dashboard binary and the headless `tag` command both drive a
//! [`session::Session`]; everything below it is plain data in, data out.

pub mod config;
pub mod data;
pub mod error;
pub mod session;
pub mod signal;
