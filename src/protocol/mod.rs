//! Application protocol definitions
//!
//! This module provides:
//! - Protocol identifier and frame geometry constants
//! - The `PeerId` type shared by every layer

pub mod constants;
pub mod peer;

pub use peer::PeerId;
