//! Errors raised while reading or assembling configuration frames.

/// Errors from frame images and BIT file parsing.
#[derive(Debug, thiserror::Error)]
pub enum BitstreamError {
    /// The bitstream file could not be read.
    #[error("failed to read bitstream: {0}")]
    Io(#[from] std::io::Error),

    /// No `0xAA995566` sync word was found.
    #[error("no sync word found in bitstream")]
    NoSyncWord,

    /// A packet announced more payload than the file contains.
    #[error("bitstream truncated: packet at byte {offset} needs {needed} more words")]
    Truncated {
        /// Byte offset of the packet header.
        offset: usize,
        /// Number of payload words missing.
        needed: usize,
    },

    /// A type-2 packet appeared without a preceding type-1 header.
    #[error("type-2 packet at byte {offset} has no preceding type-1 register")]
    OrphanType2 {
        /// Byte offset of the packet header.
        offset: usize,
    },

    /// An FDRI payload is not a whole number of frames.
    #[error("FDRI payload of {words} words is not a multiple of {words_per_frame}")]
    PartialFrame {
        /// Payload length.
        words: usize,
        /// Frame length.
        words_per_frame: u32,
    },

    /// A frame was inserted with the wrong number of words.
    #[error("frame 0x{frame:08x} has {found} words, expected {expected}")]
    FrameLength {
        /// Frame address.
        frame: u32,
        /// Configured frame length.
        expected: u32,
        /// Supplied length.
        found: usize,
    },

    /// A bit offset lies past the end of a frame.
    #[error("bit offset {bit_offset} is outside frame 0x{frame:08x}")]
    BitOutOfFrame {
        /// Frame address.
        frame: u32,
        /// Offending bit offset.
        bit_offset: u32,
    },
}
