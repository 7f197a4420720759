//! Writer for the `#~` table stream (ECMA-335 II.24.2.6).
//!
//! Emission is two-phase: the index planner fixes every column width from
//! the final row counts and heap sizes, then the header and all rows are
//! written in one pass. Nothing is written before all sizes are known.

use std::sync::Arc;

use crate::{
    file::Writer,
    metadata::tables::{TableInfo, TableInfoRef, TableStore, SORTED_TABLES_MASK},
    Result,
};

/// Serializer producing a complete `#~` stream from a finalized table store.
pub struct TablesWriter;

impl TablesWriter {
    /// Serialize the `#~` stream.
    ///
    /// The header layout, in order: reserved u32, major 2, minor 0, the
    /// HeapSizes byte, reserved u8 = 1, the Valid mask, the fixed Sorted
    /// mask, one u32 row count per set Valid bit, then every present table's
    /// rows in catalogue order at planned widths.
    ///
    /// ## Arguments
    /// * 'store'        - The sorted, final table store
    /// * '`large_str`'  - True if `#Strings` indices take 4 bytes
    /// * '`large_guid`' - True if `#GUID` indices take 4 bytes
    /// * '`large_blob`' - True if `#Blob` indices take 4 bytes
    ///
    /// # Errors
    /// Returns an encode error if any row holds an invalid coded index
    pub fn write(
        store: &TableStore,
        large_str: bool,
        large_guid: bool,
        large_blob: bool,
    ) -> Result<(Vec<u8>, TableInfoRef)> {
        let present = store.present_counts();
        let info: TableInfoRef = Arc::new(TableInfo::with_counts(
            &present, large_str, large_guid, large_blob,
        ));

        let mut heap_sizes = 0u8;
        if large_str {
            heap_sizes |= 0x01;
        }
        if large_guid {
            heap_sizes |= 0x02;
        }
        if large_blob {
            heap_sizes |= 0x04;
        }

        let mut writer = Writer::new();
        writer.write_u32(0); // reserved
        writer.write_u8(2); // major version
        writer.write_u8(0); // minor version
        writer.write_u8(heap_sizes);
        writer.write_u8(1); // reserved
        writer.write_u64(store.valid_mask());
        writer.write_u64(SORTED_TABLES_MASK);

        for (_, rows) in &present {
            writer.write_u32(*rows);
        }

        store.write_tables(&mut writer, &info)?;
        writer.align(4, 0);

        Ok((writer.into_inner(), info))
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::streams::TablesHeader;
    use crate::metadata::tables::rows::ModuleRaw;

    use super::*;

    #[test]
    fn single_module_stream_layout() {
        let mut store = TableStore::new();
        store.module.push(ModuleRaw {
            generation: 0,
            name: 1,
            mvid: 1,
            enc_id: 0,
            enc_base_id: 0,
        });

        let (stream, _info) = TablesWriter::write(&store, false, false, false).unwrap();

        // reserved u32
        assert_eq!(&stream[0..4], &[0, 0, 0, 0]);
        // major 2, minor 0, heap sizes 0, reserved 1
        assert_eq!(&stream[4..8], &[2, 0, 0, 1]);
        // valid mask: only bit 0
        assert_eq!(u64::from_le_bytes(stream[8..16].try_into().unwrap()), 1);
        // sorted mask is the fixed catalogue constant
        assert_eq!(
            u64::from_le_bytes(stream[16..24].try_into().unwrap()),
            0x0000_1600_3325_FA00
        );
        // exactly one row count
        assert_eq!(u32::from_le_bytes(stream[24..28].try_into().unwrap()), 1);

        // And the stream parses back
        let header = TablesHeader::from(&stream).unwrap();
        let module = header.module().unwrap().unwrap();
        assert_eq!(module.get(1).unwrap().unwrap().name, 1);
    }

    #[test]
    fn heap_size_flags_are_encoded() {
        let mut store = TableStore::new();
        store.module.push(ModuleRaw {
            generation: 0,
            name: 1,
            mvid: 1,
            enc_id: 0,
            enc_base_id: 0,
        });

        let (stream, info) = TablesWriter::write(&store, true, false, true).unwrap();
        assert_eq!(stream[6], 0x05);
        assert!(info.is_large_str());
        assert!(!info.is_large_guid());
        assert!(info.is_large_blob());
    }
}
