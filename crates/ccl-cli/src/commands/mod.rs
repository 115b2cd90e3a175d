//! Command implementations for the ccl CLI

pub mod check;
pub mod common;
pub mod tables;

// Re-export command functions
pub use check::check_command;
pub use tables::tables_command;
