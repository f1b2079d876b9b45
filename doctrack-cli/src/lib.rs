//! `doctrack` command-line interface.
//!
//! The binary is a thin shell over [`doctrack_fields`] and [`doctrack_store`]:
//! it resolves [`DoctrackConfig`], opens the schema and the value database,
//! and dispatches one [`Commands`] variant through [`commands::run`].

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Commands};
pub use config::{CliOverrides, ConfigError, DoctrackConfig};
