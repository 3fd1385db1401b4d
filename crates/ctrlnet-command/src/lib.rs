//! Control-system command vocabulary and dispatch.
//!
//! Messages popped from a link are opaque bytes. This crate interprets
//! them as ASCII commands and routes recognized ones to a
//! [`CommandHandler`].

pub mod actions;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod projector;

pub use actions::{ConsoleActions, DEFAULT_SETTLE_TIME};
pub use command::{
    Command, DEBUG_OFF, DEBUG_ON, GET_CONTENT, SHOW_SCENE, SOFT_RESET, START, STOP,
};
pub use dispatch::{CommandHandler, Dispatcher};
pub use error::{CommandError, Result};
pub use projector::{projector_reply, POWER_QUERY, POWER_REPLY};
