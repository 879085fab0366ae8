//! Media framing
//!
//! This module provides:
//! - The [`AccessUnit`] record handed to subscribers
//! - Annex-B start code scanning shared by H.264 and H.265
//! - Per-codec framers (H.264, H.265, MPEG-4 visual, AMR, AAC pass-through)
//!   with key frame classification
//!
//! Framers are stateless: one raw chunk in, an ordered list of units out.
//! Units borrow the chunk's allocation through `Bytes::slice`.

pub mod amr;
pub mod framer;
pub mod h264;
pub mod h265;
pub mod mpeg4;
pub mod nal;
pub mod unit;

pub use framer::{Codec, SyncPolicy};
pub use h264::NaluType;
pub use h265::HevcNalKind;
pub use unit::{AccessUnit, UNASSIGNED_SOURCE_ID};
