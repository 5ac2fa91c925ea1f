//! Per-connection session state machine
//!
//! A session is a pure `Model` driven by `Event`s and rendered by `view`.
//! [`SessionRunner`] drives it against its connection.

mod model;
mod runner;
mod style;
mod view;

pub use runner::{SessionExit, SessionRunner};
pub use style::{SessionStyle, Theme};
