use super::fourcc::FourCC;
use std::collections::TryReserveError;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io;

/// Error category of the last operation on a `WavFile`.
///
/// Mirrors the stdio-style `errno` of the handle: `Ok` after a successful
/// operation, otherwise the category of the `Error` that was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No error
    Ok,

    /// A buffer allocation failed
    NoMem,

    /// The underlying byte stream reported an error
    Os,

    /// Not a wave file, or an unsupported wave format
    Format,

    /// The operation is not allowed in the current open mode or state
    Mode,

    /// A parameter passed to the operation is out of range
    Param,
}

/// Errors returned by methods in this crate.
#[derive(Debug)]
pub enum Error {
    /// An `io::Error` occurred
    IOError(io::Error),

    /// A scratch buffer could not be reserved
    OutOfMemory(TryReserveError),

    /// The stream does not begin with a `RIFF....WAVE` header
    HeaderNotRecognized,

    /// A chunk required to interpret the file is not present
    ChunkMissing { signature: FourCC },

    /// A chunk that may only appear once was found twice
    DuplicateChunk { signature: FourCC },

    /// The `fmt ` chunk size is not one of the known layouts
    InvalidFmtSize { size: u32 },

    /// A chunk's declared size runs past the end of the stream
    ChunkOverrun {
        signature: FourCC,
        declared: u64,
        available: u64,
    },

    /// The format tag is not one this crate handles
    UnsupportedFormatTag { tag: u16 },

    /// Bits per sample is zero or not a multiple of 8
    InvalidBitsPerSample { bits: u16 },

    /// The `fmt ` chunk is internally inconsistent
    InvalidFormat { reason: &'static str },

    /// Per-channel transfer was attempted on an extensible-format file
    ExtensibleTransfer,

    /// The mode string passed to open is not recognized
    InvalidMode { mode: String },

    /// The handle was not opened for reading
    NotReadable,

    /// The handle was not opened for writing
    NotWritable,

    /// The handle has been closed
    Closed,

    /// The handle failed to open and holds no stream
    Invalid,

    /// A parameter is out of its valid range
    InvalidParameter { reason: &'static str },

    /// A channel buffer list is the wrong shape for the transfer
    InvalidBufferSize {
        buffer_count: usize,
        channel_count: u16,
        required_len: usize,
    },

    /// The sample type's width does not match the file's sample size
    SampleWidthMismatch { sample_size: u16, type_size: usize },
}

impl Error {
    /// The stdio-style category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IOError(_) => ErrorKind::Os,
            Error::OutOfMemory(_) => ErrorKind::NoMem,
            Error::HeaderNotRecognized
            | Error::ChunkMissing { .. }
            | Error::DuplicateChunk { .. }
            | Error::InvalidFmtSize { .. }
            | Error::ChunkOverrun { .. }
            | Error::UnsupportedFormatTag { .. }
            | Error::InvalidBitsPerSample { .. }
            | Error::InvalidFormat { .. }
            | Error::ExtensibleTransfer => ErrorKind::Format,
            Error::InvalidMode { .. }
            | Error::NotReadable
            | Error::NotWritable
            | Error::Closed
            | Error::Invalid => ErrorKind::Mode,
            Error::InvalidParameter { .. }
            | Error::InvalidBufferSize { .. }
            | Error::SampleWidthMismatch { .. } => ErrorKind::Param,
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::IOError(e) => Some(e),
            Error::OutOfMemory(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IOError(e) => write!(f, "I/O error: {}", e),
            Error::OutOfMemory(e) => write!(f, "allocation failed: {}", e),
            Error::HeaderNotRecognized => write!(f, "not a RIFF/WAVE stream"),
            Error::ChunkMissing { signature } => write!(f, "missing chunk {:?}", signature),
            Error::DuplicateChunk { signature } => write!(f, "duplicate chunk {:?}", signature),
            Error::InvalidFmtSize { size } => write!(f, "fmt chunk has unknown size {}", size),
            Error::ChunkOverrun {
                signature,
                declared,
                available,
            } => write!(
                f,
                "chunk {:?} declares {} bytes but only {} remain",
                signature, declared, available
            ),
            Error::UnsupportedFormatTag { tag } => write!(f, "unsupported format tag {:#06x}", tag),
            Error::InvalidBitsPerSample { bits } => write!(f, "invalid bits per sample {}", bits),
            Error::InvalidFormat { reason } => write!(f, "invalid fmt chunk: {}", reason),
            Error::ExtensibleTransfer => {
                write!(f, "per-channel transfer is not supported for extensible format")
            }
            Error::InvalidMode { mode } => write!(f, "unrecognized open mode {:?}", mode),
            Error::NotReadable => write!(f, "handle is not open for reading"),
            Error::NotWritable => write!(f, "handle is not open for writing"),
            Error::Closed => write!(f, "handle is closed"),
            Error::Invalid => write!(f, "handle failed to open"),
            Error::InvalidParameter { reason } => write!(f, "invalid parameter: {}", reason),
            Error::InvalidBufferSize {
                buffer_count,
                channel_count,
                required_len,
            } => write!(
                f,
                "got {} channel buffers for {} channels, each needing {} bytes",
                buffer_count, channel_count, required_len
            ),
            Error::SampleWidthMismatch {
                sample_size,
                type_size,
            } => write!(
                f,
                "sample type is {} bytes wide, file samples are {} bytes",
                type_size, sample_size
            ),
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::IOError(error)
    }
}

impl From<TryReserveError> for Error {
    fn from(error: TryReserveError) -> Error {
        Error::OutOfMemory(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourcc::DATA_SIG;

    #[test]
    fn test_kinds() {
        let e: Error = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert_eq!(e.kind(), ErrorKind::Os);
        assert!(e.source().is_some());

        assert_eq!(
            Error::ChunkMissing { signature: DATA_SIG }.kind(),
            ErrorKind::Format
        );
        assert_eq!(Error::Closed.kind(), ErrorKind::Mode);
        assert_eq!(
            Error::InvalidParameter { reason: "x" }.kind(),
            ErrorKind::Param
        );
    }

    #[test]
    fn test_display() {
        let e = Error::UnsupportedFormatTag { tag: 0x50 };
        assert_eq!(e.to_string(), "unsupported format tag 0x0050");
    }
}
