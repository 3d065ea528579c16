//! Library side of the `csvts` command-line tool.

pub mod commands;
pub mod logging;
