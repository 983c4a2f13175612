//! Command-line interface and composition root for tengen.

pub mod bootstrap;
pub mod config;
pub mod parser;

pub use parser::{Cli, Commands};
