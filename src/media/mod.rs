//! Frame handling
//!
//! This module provides:
//! - Fixed-geometry RGBA frame buffers
//! - Inbound frame assembly with deferred identity binding
//! - The frame source and frame sink seams to capture and display

pub mod assembler;
pub mod frame;
pub mod sink;
pub mod source;

pub use assembler::{AssemblerPhase, FrameAssembler};
pub use frame::{FrameBuffer, FrameGeometry};
pub use sink::{FrameSink, MemorySink, TargetState};
pub use source::{FrameSource, TestPatternSource};
