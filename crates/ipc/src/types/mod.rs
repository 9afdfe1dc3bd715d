//! Value types shared by protocol messages.

mod color;

pub use color::*;
