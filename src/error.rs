//! Unified error types for mu-reader
//!
//! Provides a top-level `ReaderError` that wraps module-specific errors,
//! plus `From` impls so `?` works across module boundaries.
//!
//! Most malformed input never reaches this type: settings and progress
//! values are coerced to defaults instead of failing.

use core::fmt;

/// Top-level error type for mu-reader operations
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReaderError {
    /// Book markup could not be scanned for chapter markers
    Parse(String),
    /// Persistence layer rejected a read or write
    Storage(StoreError),
    /// A record could not be encoded or decoded as JSON
    Serialize(String),
    /// Chapter id is not present in the open book
    UnknownChapter {
        /// Requested chapter id.
        id: String,
    },
    /// Cached book content does not match its stored checksum
    CacheCorrupt {
        /// Checksum recorded when the cache was written.
        expected: u32,
        /// Checksum of the content actually read back.
        actual: u32,
    },
    /// The render-settled signal source went away before layout settled
    LayoutSignalClosed,
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ReaderError::Storage(kind) => write!(f, "Storage error: {}", kind),
            ReaderError::Serialize(msg) => write!(f, "Serialize error: {}", msg),
            ReaderError::UnknownChapter { id } => {
                write!(f, "Chapter '{}' does not exist in this book", id)
            }
            ReaderError::CacheCorrupt { expected, actual } => write!(
                f,
                "Cached book checksum mismatch (expected {:08x}, got {:08x})",
                expected, actual
            ),
            ReaderError::LayoutSignalClosed => write!(f, "Layout signal closed before settling"),
        }
    }
}

/// Persistence-layer failure kinds
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// Write rejected because the backing store is full
    QuotaExceeded,
    /// Backing store cannot be reached at all
    Unavailable,
    /// Any other backend-specific failure
    Other(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::QuotaExceeded => write!(f, "storage quota exceeded"),
            StoreError::Unavailable => write!(f, "storage unavailable"),
            StoreError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ReaderError {}

impl std::error::Error for StoreError {}

impl From<StoreError> for ReaderError {
    fn from(err: StoreError) -> Self {
        ReaderError::Storage(err)
    }
}

impl From<serde_json::Error> for ReaderError {
    fn from(err: serde_json::Error) -> Self {
        ReaderError::Serialize(err.to_string())
    }
}

impl From<quick_xml::Error> for ReaderError {
    fn from(err: quick_xml::Error) -> Self {
        ReaderError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_error_display() {
        let err = ReaderError::Parse("unclosed tag".into());
        assert_eq!(format!("{}", err), "Parse error: unclosed tag");
    }

    #[test]
    fn test_store_error_converts_with_question_mark() {
        fn write() -> Result<(), ReaderError> {
            Err::<(), _>(StoreError::QuotaExceeded)?;
            Ok(())
        }
        let err = write().unwrap_err();
        assert_eq!(err, ReaderError::Storage(StoreError::QuotaExceeded));
        assert!(format!("{}", err).contains("quota"));
    }

    #[test]
    fn test_cache_corrupt_display_is_hex() {
        let err = ReaderError::CacheCorrupt {
            expected: 0xdead_beef,
            actual: 1,
        };
        let display = format!("{}", err);
        assert!(display.contains("deadbeef"));
        assert!(display.contains("00000001"));
    }
}
