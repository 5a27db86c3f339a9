//! Terminal output
//!
//! - [`theme`] - Colors, icons and size formatting
//! - [`reporter`] - [`bootdist_core::Reporter`] implementation for the terminal

pub mod reporter;
pub mod theme;

pub use reporter::TerminalReporter;
pub use theme::Theme;
