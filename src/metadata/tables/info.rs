//! The index planner: row counts, heap largeness and the derived 2-vs-4-byte
//! column widths.
//!
//! Every size decision is fixed here before any row is written or read.
//! Widths fall out of three inputs: the byte size of each heap, the row count
//! of each table, and the tag width of each coded-index family.

use std::sync::Arc;

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{CodedIndexType, TableId},
    Error::ShortRead,
    Result,
};

/// Size of the largest catalogue id plus one, for direct-indexed lookup vecs.
pub(crate) const TABLE_SLOTS: usize = TableId::GenericParamConstraint as usize + 1;

/// Row count and derived index width of a single table.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// The count of rows in this table
    pub rows: u32,
    /// Number of bits required to represent any valid row index
    pub bits: u8,
    /// True when indices into this table take 4 bytes instead of 2
    pub is_large: bool,
}

impl TableRowInfo {
    /// Derive the index width for a table of `rows` rows.
    ///
    /// ## Arguments
    /// * 'rows' - The number of rows in the table
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: bits > 16,
        }
    }
}

/// Width planner output: per-table row counts and index widths, per-heap
/// largeness and per-family coded-index widths.
///
/// Computed once — on the read path from the `#~` header, on the write path
/// from the final table store after all rows are inserted and all heap
/// appends are done — and then shared immutably.
#[derive(Clone, Default, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Cheap-copy reference to a [`TableInfo`].
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Parse the planner inputs out of a serialized `#~` header.
    ///
    /// ## Arguments
    /// * 'data' - The full `#~` stream, starting at the reserved u32
    /// * '`valid_bitvec`' - The Valid mask naming the present tables
    ///
    /// # Errors
    /// Returns [`ShortRead`] if the header is truncated, or
    /// [`crate::Error::UnsupportedTable`] if the mask names a table outside
    /// the catalogue
    pub fn new(data: &[u8], valid_bitvec: u64) -> Result<Self> {
        if data.len() < 24 {
            return Err(ShortRead);
        }

        let mut rows = vec![TableRowInfo::default(); TABLE_SLOTS];
        let mut next_row_offset = 24;

        for bit in 0..64u8 {
            if (valid_bitvec & (1u64 << bit)) == 0 {
                continue;
            }

            let Some(table_id) = TableId::from_id(bit) else {
                return Err(crate::Error::UnsupportedTable(bit));
            };

            if data.len() < next_row_offset {
                return Err(ShortRead);
            }

            let row_count = read_le_at::<u32>(data, &mut next_row_offset)?;
            if row_count == 0 {
                // Present-but-empty tables carry no rows; nothing to size
                continue;
            }

            rows[table_id as usize] = TableRowInfo::new(row_count);
        }

        let heap_size_flags = read_le::<u8>(&data[6..])?;
        let mut table_info = TableInfo {
            rows,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & 0x01 != 0,
            is_large_index_guid: heap_size_flags & 0x02 != 0,
            is_large_index_blob: heap_size_flags & 0x04 != 0,
        };

        table_info.calculate_coded_index_bits();

        Ok(table_info)
    }

    /// Build planner output from explicit row counts and heap largeness.
    ///
    /// This is the write-path constructor, executed once after the table
    /// store is final.
    ///
    /// ## Arguments
    /// * '`table_rows`' - (table, row count) pairs for the populated tables
    /// * '`large_str`'  - True if `#Strings` indices take 4 bytes
    /// * '`large_guid`' - True if `#GUID` indices take 4 bytes
    /// * '`large_blob`' - True if `#Blob` indices take 4 bytes
    #[must_use]
    pub fn with_counts(
        table_rows: &[(TableId, u32)],
        large_str: bool,
        large_guid: bool,
        large_blob: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TABLE_SLOTS],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for &(table, rows) in table_rows {
            table_info.rows[table as usize] = TableRowInfo::new(rows);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Split a raw coded-index value into its target table and row.
    ///
    /// ## Arguments
    /// * 'value' - The encoded value to decode
    /// * '`coded_index_type`' - The family being decoded
    ///
    /// # Errors
    /// Returns [`crate::Error::Unresolved`] if the tag selects no member
    /// table
    pub fn decode_coded_index(
        &self,
        value: u32,
        coded_index_type: CodedIndexType,
    ) -> Result<(TableId, u32)> {
        let tables = coded_index_type.tables();
        let tag_bits = coded_index_type.tag_bits();
        let tag_mask = (1u32 << tag_bits) - 1;

        let tag = value & tag_mask;
        let index = value >> tag_bits;

        if tag as usize >= tables.len() {
            return Err(unresolved!(
                "tag {} is out of range for the {:?} family",
                tag,
                coded_index_type
            ));
        }

        Ok((tables[tag as usize], index))
    }

    /// True if indices into the given table take 4 bytes.
    ///
    /// ## Arguments
    /// * 'id' - The `TableId` to query
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.rows[id as usize].is_large
    }

    /// True if `#Strings` heap indices take 4 bytes.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// True if `#GUID` heap indices take 4 bytes.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// True if `#Blob` heap indices take 4 bytes.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Byte width of a `#Strings` index.
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Byte width of a `#GUID` index.
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Byte width of a `#Blob` index.
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Planner record for one table.
    ///
    /// ## Arguments
    /// * 'table' - The `TableId` to look up
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Bits required for an index into the given table.
    #[must_use]
    pub fn table_index_bits(&self, table_id: TableId) -> u8 {
        self.rows[table_id as usize].bits
    }

    /// Byte width of an index into the given table.
    #[must_use]
    pub fn table_index_bytes(&self, table_id: TableId) -> u8 {
        if self.rows[table_id as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Bits required for a coded index of the given family (tag included).
    #[must_use]
    pub fn coded_index_bits(&self, coded_index_type: CodedIndexType) -> u8 {
        self.coded_indexes[coded_index_type as usize]
    }

    /// Byte width of a coded index of the given family.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    fn calculate_coded_index_size(&self, coded_index_type: CodedIndexType) -> u8 {
        let max_bits = coded_index_type
            .tables()
            .iter()
            .map(|table| self.table_index_bits(*table))
            .max()
            .unwrap_or(1);

        max_bits + coded_index_type.tag_bits()
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            self.coded_indexes[coded_index as usize] = self.calculate_coded_index_size(coded_index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_index_width_thresholds() {
        let info = TableInfo::with_counts(
            &[(TableId::Field, 0xFFFF), (TableId::MethodDef, 0x1_0000)],
            false,
            false,
            false,
        );

        assert_eq!(info.table_index_bytes(TableId::Field), 2);
        assert_eq!(info.table_index_bytes(TableId::MethodDef), 4);
        // Absent tables index narrow
        assert_eq!(info.table_index_bytes(TableId::Param), 2);
    }

    #[test]
    fn coded_index_width_threshold_is_two_to_the_fourteen() {
        // TypeDefOrRef has 2 tag bits, so 14 bits remain for the row
        let small = TableInfo::with_counts(&[(TableId::TypeDef, 16_383)], false, false, false);
        assert_eq!(small.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);

        let boundary = TableInfo::with_counts(&[(TableId::TypeDef, 16_384)], false, false, false);
        assert_eq!(boundary.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);

        let large = TableInfo::with_counts(&[(TableId::TypeDef, 16_385)], false, false, false);
        assert_eq!(large.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
    }

    #[test]
    fn widest_family_member_wins() {
        // A huge TypeRef table widens TypeDefOrRef even when TypeDef is tiny
        let info = TableInfo::with_counts(
            &[(TableId::TypeDef, 3), (TableId::TypeRef, 20_000)],
            false,
            false,
            false,
        );
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);

        // HasCustomAttribute has 5 tag bits, so 2^11 rows flip it
        let info = TableInfo::with_counts(&[(TableId::Param, 2_048)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasCustomAttribute), 4);
        let info = TableInfo::with_counts(&[(TableId::Param, 2_047)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasCustomAttribute), 2);
    }

    #[test]
    fn heap_flags_pass_through() {
        let info = TableInfo::with_counts(&[], true, false, true);
        assert_eq!(info.str_bytes(), 4);
        assert_eq!(info.guid_bytes(), 2);
        assert_eq!(info.blob_bytes(), 4);
    }

    #[test]
    fn header_parse_rejects_unknown_table_bit() {
        // Header with bit 0x3F set in the valid mask
        let mut data = vec![0u8; 32];
        data[8..16].copy_from_slice(&(1u64 << 0x3F).to_le_bytes());

        let result = TableInfo::new(&data, 1u64 << 0x3F);
        assert!(matches!(result, Err(crate::Error::UnsupportedTable(0x3F))));
    }

    #[test]
    fn decode_rejects_dead_tag() {
        let info = TableInfo::with_counts(&[], false, false, false);
        // TypeDefOrRef tag 3 selects nothing
        assert!(info.decode_coded_index(0x07, CodedIndexType::TypeDefOrRef).is_err());
    }
}
