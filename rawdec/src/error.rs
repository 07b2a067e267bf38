//! Error types for RAW decompression.

use core::fmt;

/// The main error type for decompression operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Errors related to reading the compressed stream.
    Stream(StreamError),
    /// Errors related to vendor headers.
    Format(FormatError),
    /// Errors related to image, strip and block geometry.
    Geometry(GeometryError),
    /// Errors related to value remap tables.
    Table(TableError),
    /// Errors related to buffer allocation.
    Alloc(AllocError),
    /// Errors related to decoding operations.
    Decoding(DecodingError),
}

/// Errors related to reading the compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// Unexpected end of data.
    UnexpectedEof,
}

/// Errors related to vendor headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// Invalid header signature.
    InvalidSignature,
    /// Unsupported compression version.
    UnsupportedVersion,
    /// Unsupported sensor layout.
    UnsupportedRawType,
    /// Unsupported sample bit depth.
    UnsupportedBitDepth,
    /// The header dimensions are out of range or inconsistent.
    InvalidDimensions,
    /// The block size or the number of blocks per row is invalid.
    InvalidBlockLayout,
    /// The number of lines does not match the image height.
    InvalidLineCount,
    /// A strip size is invalid or exceeds the available data.
    InvalidStripSize,
}

/// Errors related to image, strip and block geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// Image dimensions are zero or odd.
    InvalidDimensions,
    /// Image dimensions exceed supported limits.
    ImageTooLarge,
    /// The destination buffer does not match the image dimensions.
    DestinationMismatch,
    /// A block width is not a multiple of the minimal coding unit.
    InvalidBlockWidth,
}

/// Errors related to value remap tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// No tables were requested.
    NoTables,
    /// The curve has more entries than a table can hold.
    TooManyEntries,
    /// The table index is out of range.
    InvalidIndex,
    /// The curve is empty.
    EmptyCurve,
}

/// Errors related to buffer allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The allocator could not provide the requested memory.
    OutOfMemory {
        /// The number of requested bytes.
        bytes: usize,
    },
    /// The requested size overflows the address space.
    SizeOverflow,
}

/// Errors related to decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingError {
    /// A prefix code decoded to a value outside of the valid range.
    InvalidCode,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(e) => write!(f, "{e}"),
            Self::Format(e) => write!(f, "{e}"),
            Self::Geometry(e) => write!(f, "{e}"),
            Self::Table(e) => write!(f, "{e}"),
            Self::Alloc(e) => write!(f, "{e}"),
            Self::Decoding(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of data"),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid header signature"),
            Self::UnsupportedVersion => write!(f, "unsupported compression version"),
            Self::UnsupportedRawType => write!(f, "unsupported sensor layout"),
            Self::UnsupportedBitDepth => write!(f, "unsupported bit depth"),
            Self::InvalidDimensions => write!(f, "invalid header dimensions"),
            Self::InvalidBlockLayout => write!(f, "invalid block layout"),
            Self::InvalidLineCount => write!(f, "line count does not match image height"),
            Self::InvalidStripSize => write!(f, "invalid strip size"),
        }
    }
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions => write!(f, "invalid image dimensions"),
            Self::ImageTooLarge => write!(f, "image is too large"),
            Self::DestinationMismatch => {
                write!(f, "destination buffer does not match image dimensions")
            }
            Self::InvalidBlockWidth => {
                write!(f, "block width is not a multiple of the minimal coding unit")
            }
        }
    }
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTables => write!(f, "at least one table is required"),
            Self::TooManyEntries => write!(f, "curve has too many entries"),
            Self::InvalidIndex => write!(f, "table index out of range"),
            Self::EmptyCurve => write!(f, "curve is empty"),
        }
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { bytes } => write!(f, "failed to allocate {bytes} bytes"),
            Self::SizeOverflow => write!(f, "allocation size overflow"),
        }
    }
}

impl fmt::Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCode => write!(f, "invalid prefix code"),
        }
    }
}

impl std::error::Error for DecodeError {}
impl std::error::Error for StreamError {}
impl std::error::Error for FormatError {}
impl std::error::Error for GeometryError {}
impl std::error::Error for TableError {}
impl std::error::Error for AllocError {}
impl std::error::Error for DecodingError {}

impl From<StreamError> for DecodeError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<FormatError> for DecodeError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

impl From<GeometryError> for DecodeError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

impl From<TableError> for DecodeError {
    fn from(e: TableError) -> Self {
        Self::Table(e)
    }
}

impl From<AllocError> for DecodeError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

impl From<DecodingError> for DecodeError {
    fn from(e: DecodingError) -> Self {
        Self::Decoding(e)
    }
}

/// Result type for decompression operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

pub(crate) use bail;
