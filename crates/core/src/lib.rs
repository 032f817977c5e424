//! Roster, availability windows, mention classification and shared event types.

pub mod availability;
pub mod classify;
pub mod config;
pub mod error;
pub mod event;
pub mod roster;

pub use config::Config;
pub use error::*;
pub use event::*;
pub use roster::*;
