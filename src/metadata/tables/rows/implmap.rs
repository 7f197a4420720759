use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{
        CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef,
    },
    Result,
};

/// The `ImplMap` table forwards managed members to unmanaged code
/// (P/Invoke). `TableId` = 0x1C, sorted by `member_forwarded`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImplMapRaw {
    /// A 2-byte bitmask of `PInvokeAttributes`
    pub mapping_flags: u16,
    /// A `MemberForwarded` coded index naming the forwarded member
    pub member_forwarded: CodedIndex,
    /// An index into the `#Strings` heap holding the entry point name
    pub import_name: u32,
    /// An index into the `ModuleRef` table naming the target module
    pub import_scope: u32,
}

impl RowReadable for ImplMapRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* mapping_flags */    2 +
            /* member_forwarded */ sizes.coded_index_bytes(CodedIndexType::MemberForwarded) +
            /* import_name */      sizes.str_bytes() +
            /* import_scope */     sizes.table_index_bytes(TableId::ModuleRef)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ImplMapRaw {
            mapping_flags: read_le_at::<u16>(data, offset)?,
            member_forwarded: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberForwarded)?,
            import_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            import_scope: read_le_at_dyn(data, offset, sizes.is_large(TableId::ModuleRef))?,
        })
    }
}

impl RowWritable for ImplMapRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.mapping_flags);
        self.member_forwarded
            .write(writer, sizes, CodedIndexType::MemberForwarded)?;
        writer.write_index(self.import_name, sizes.is_large_str());
        writer.write_index(self.import_scope, sizes.is_large(TableId::ModuleRef));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn write_read_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::MethodDef, 4), (TableId::ModuleRef, 2)],
            false,
            false,
            false,
        ));
        let row = ImplMapRaw {
            mapping_flags: 0x0102,
            member_forwarded: CodedIndex::new(TableId::MethodDef, 4),
            import_name: 31,
            import_scope: 2,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(ImplMapRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
