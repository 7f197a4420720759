//! The physical stream layer: the metadata root with its stream directory,
//! and the `#~` table stream in both directions.
//!
//! A serialized CLI metadata section starts with the BSJB root header, whose
//! directory locates the five streams (`#~`, `#Strings`, `#US`, `#GUID`,
//! `#Blob`) relative to the root. [`Root`] parses and emits that container;
//! [`TablesHeader`] reads the `#~` stream and [`TablesWriter`] produces it.

mod root;
mod tablesheader;
mod tableswriter;

pub use root::{Root, StreamHeader, METADATA_SIGNATURE};
pub use tablesheader::TablesHeader;
pub use tableswriter::TablesWriter;
