//! Username reservation client library modules.

pub mod config;
pub mod domain;
pub mod outbound;
