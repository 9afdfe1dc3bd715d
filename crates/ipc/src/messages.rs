//! Message enums exchanged between the avatar view and the UI shell.

use holoavatar_config::QualityLevel;
use serde::{Deserialize, Serialize};

use crate::error::IpcError;
use crate::types::Rgb;

/// Messages from the UI shell to the avatar view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UiToAvatar {
    /// Flip the holographic effect on or off
    ToggleHolographic,

    /// Live color edit from the color picker
    SetHolographicColor { color: Rgb },

    /// User picked a quality tier
    SetQuality { level: QualityLevel },

    /// UI (re)mounted and wants the current state pushed to it
    RequestState,
}

/// Messages from the avatar view to the UI shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AvatarToUi {
    /// Effect was enabled, disabled or recolored
    HolographicChanged { active: bool, color: Rgb },

    /// Active quality tier changed
    QualityChanged { level: QualityLevel },

    /// Error notification
    Error { code: String, message: String },
}

impl UiToAvatar {
    /// Decode a message from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, IpcError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl AvatarToUi {
    /// Error notification with a stable machine-readable `code`
    pub fn error(code: impl Into<String>, message: impl ToString) -> Self {
        AvatarToUi::Error {
            code: code.into(),
            message: message.to_string(),
        }
    }

    /// Encode the message into its JSON wire form.
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }
}
