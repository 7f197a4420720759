//! The metadata table catalogue and its supporting machinery.
//!
//! # Architecture
//!
//! The `#~` stream organizes metadata as ~40 heterogenous row tables whose
//! column widths depend on heap sizes and on other tables' row counts. This
//! module provides:
//!
//! - [`TableId`] - the catalogue of table identifiers (0x00..=0x2C)
//! - [`TableInfo`] - the index planner deriving every column width
//! - [`CodedIndex`] / [`CodedIndexType`] - packed cross-table references
//! - [`RowReadable`] / [`RowWritable`] - the per-row codec traits
//! - [`MetadataTable`] - a typed lazy view over one serialized table
//! - [`TableStore`] - the build-side growable row store with the required
//!   sort pass
//! - [`rows`] - the concrete row types, one per catalogue entry
//!
//! # Reference
//! - [ECMA-335 Partition II, Section 22](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

mod attributes;
mod codedindex;
mod id;
mod info;
pub mod rows;
mod store;
mod table;

pub use attributes::{
    EventAttributes, FieldAttributes, MethodAttributes, MethodImplAttributes, PInvokeAttributes,
    ParamAttributes, PropertyAttributes, TypeAttributes,
};
pub use codedindex::{CodedIndex, CodedIndexType};
pub use id::{TableId, SORTED_TABLES_MASK};
pub use info::{TableInfo, TableInfoRef, TableRowInfo};
pub(crate) use info::TABLE_SLOTS;
pub use store::TableStore;
pub use table::{MetadataTable, TableIterator};

use crate::{file::Writer, Result};

/// Codec trait for parsing one table row out of a byte buffer.
///
/// Implementations size their columns through the shared [`TableInfoRef`],
/// so the same code handles narrow and wide layouts.
pub trait RowReadable: Sized + Send {
    /// Byte size of a single row under the given width plan.
    fn row_size(sizes: &TableInfoRef) -> u32;

    /// Parse one row, advancing `offset` past it.
    ///
    /// ## Arguments
    /// * 'data'   - The table bytes
    /// * 'offset' - Read position, advanced by `row_size`
    /// * 'sizes'  - Width planner output
    ///
    /// # Errors
    /// Returns [`crate::Error::ShortRead`] on truncation or a decode error
    /// for invalid coded-index tags
    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self>;
}

/// Codec trait for serializing one table row.
///
/// Row and heap references must already be final when this runs; the writer
/// emits each column at the width the planner chose.
pub trait RowWritable {
    /// Append this row to the output buffer.
    ///
    /// ## Arguments
    /// * 'writer' - The output buffer
    /// * 'sizes'  - Width planner output
    ///
    /// # Errors
    /// Returns an encode error if a coded index holds a table outside its
    /// family
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()>;
}
