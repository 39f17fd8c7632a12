//! Shared types for the tv-dream screensaver: catalog items, display
//! content, configuration and platform paths.

pub mod config;
pub mod platform;
pub mod protocol;
