//! Configuration frame images for Xilinx 7-series block-RAM patching.
//!
//! A [`FrameImage`] holds the raw 32-bit words of every configuration frame
//! found in a bitstream. [`read_frames`] walks the packet stream of a BIT
//! file after its sync word and cuts FDRI payloads into frames;
//! [`write_debug_bit`] emits a per-frame debug bitstream (FAR, FDRI and CRC
//! for each frame) that [`read_frames`] reads back.

#![warn(missing_docs)]

pub mod bit;
pub mod crc;
pub mod error;
pub mod frames;

pub use bit::{load_frames, read_frames, write_debug_bit};
pub use error::BitstreamError;
pub use frames::{FrameImage, FRAME_WORDS};
