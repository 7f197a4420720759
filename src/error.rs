use thiserror::Error;

use crate::metadata::cilassembly::BuildState;

macro_rules! corrupt_blob {
    // Single string version
    ($msg:expr) => {
        crate::Error::CorruptBlob($msg.to_string())
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::CorruptBlob(format!($fmt, $($arg)*))
    };
}

macro_rules! unresolved {
    ($msg:expr) => {
        crate::Error::Unresolved($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Unresolved(format!($fmt, $($arg)*))
    };
}

/// The error type covering every failure mode of the metadata engine.
///
/// The variants follow the taxonomy of the serialization core: corruption
/// detected while reading, truncation in either direction, lifecycle misuse
/// of the build-side container and limits of the compressed encodings.
///
/// # Examples
///
/// ```rust
/// use cilforge::{CilView, Error};
///
/// match CilView::read(&[0u8; 4]) {
///     Err(Error::ShortRead) => {}
///     Err(e) => panic!("unexpected error: {e}"),
///     Ok(_) => panic!("4 bytes are not a metadata root"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A raw row index, coded-index tag or heap offset was out of range.
    ///
    /// Carries the table name, 1-based row and column name so a reader
    /// diagnostic can pinpoint the offending cell.
    #[error("corrupt index - {table} row {row}, column '{column}'")]
    CorruptIndex {
        /// Name of the table in which the bad index was found
        table: &'static str,
        /// 1-based row number of the offending row
        row: u32,
        /// Column that held the out-of-range value
        column: &'static str,
    },

    /// A compressed integer was malformed or a blob length exceeded the
    /// bounds of the `#Blob` heap.
    #[error("corrupt blob - {0}")]
    CorruptBlob(String),

    /// The Valid bitmask of the `#~` header names a table id this engine
    /// does not know.
    #[error("unsupported table id {0:#04x} in valid mask")]
    UnsupportedTable(u8),

    /// The input ended before a complete structure could be read.
    #[error("unexpected end of input")]
    ShortRead,

    /// The output buffer ended before a complete structure could be written.
    #[error("output truncated")]
    ShortWrite,

    /// A mutation was attempted after finalization began, or finalize was
    /// invoked twice.
    #[error("operation not permitted in the {0} state")]
    InvalidState(BuildState),

    /// A duplicate class or member was added where the engine's contract
    /// forbids duplicates.
    #[error("duplicate descriptor - {0}")]
    DescriptorConflict(String),

    /// A value would need more than four bytes of compressed-unsigned
    /// encoding (limit `0x1FFF_FFFF`).
    #[error("value {0:#x} does not fit the compressed integer range")]
    SignatureTooLarge(u32),

    /// A descriptor reference could not be bound during resolution.
    #[error("unresolved reference - {0}")]
    Unresolved(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_table_row_column() {
        let err = Error::CorruptIndex {
            table: "TypeDef",
            row: 3,
            column: "Extends",
        };
        assert_eq!(err.to_string(), "corrupt index - TypeDef row 3, column 'Extends'");
    }

    #[test]
    fn corrupt_blob_macro_formats() {
        let err: Error = corrupt_blob!("length {} exceeds heap of {}", 10, 4);
        assert!(matches!(err, Error::CorruptBlob(_)));
        assert_eq!(err.to_string(), "corrupt blob - length 10 exceeds heap of 4");
    }
}
