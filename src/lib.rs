//! Client support library for the PersonaMem web front end.
//!
//! The authenticated request executor lives in [`api`]; the remaining modules
//! are the small UI helpers every page relies on.

pub mod api;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod debounce;
pub mod format;
pub mod navigation;
pub mod notify;
pub mod session;
pub mod state;
