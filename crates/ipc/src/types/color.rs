//! RGB color as carried between the UI color picker and the shader uniforms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IpcError;

/// Linear 8-bit RGB triple.
///
/// Serialized as a `#rrggbb` string so it round-trips through an HTML color
/// input unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Default holographic tint (`#70c1ff`)
    pub const HOLOGRAM_BLUE: Rgb = Rgb::new(0x70, 0xc1, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(input: &str) -> Result<Self, IpcError> {
        let invalid = || IpcError::InvalidColor(input.to_string());
        let trimmed = input.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match hex.len() {
            3 => {
                let digit = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| invalid())
                };
                Ok(Self::new(digit(0)?, digit(1)?, digit(2)?))
            }
            6 => {
                let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
                Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
            }
            _ => Err(invalid()),
        }
    }

    /// Lowercase `#rrggbb` form
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Normalized channels (0.0-1.0) for a `vec3` uniform
    pub fn to_vec3(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::HOLOGRAM_BLUE
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = IpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
