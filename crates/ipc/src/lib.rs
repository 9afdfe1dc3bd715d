//! Message protocol for Holoavatar
//!
//! Defines the messages exchanged between the avatar view (which owns the
//! holographic effect session) and the UI shell, plus the value types they
//! carry. Messages travel as JSON; see [`UiToAvatar`] and [`AvatarToUi`].

pub mod error;
pub mod messages;
pub mod types;

pub use error::IpcError;
pub use messages::{AvatarToUi, UiToAvatar};
pub use types::*;
