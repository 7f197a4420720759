use crate::{
    file::io::read_le_at_dyn,
    file::Writer,
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `TypeRef` table references types defined in external scopes.
/// `TableId` = 0x01
#[derive(Clone, Debug, PartialEq)]
pub struct TypeRefRaw {
    /// A `ResolutionScope` coded index naming where the type lives
    pub resolution_scope: CodedIndex,
    /// An index into the `#Strings` heap holding the type name
    pub name: u32,
    /// An index into the `#Strings` heap holding the namespace, 0 for global
    pub namespace: u32,
}

impl RowReadable for TypeRefRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* resolution_scope */ sizes.coded_index_bytes(CodedIndexType::ResolutionScope) +
            /* name */             sizes.str_bytes() +
            /* namespace */        sizes.str_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeRefRaw {
            resolution_scope: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::ResolutionScope,
            )?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowWritable for TypeRefRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        self.resolution_scope
            .write(writer, sizes, CodedIndexType::ResolutionScope)?;
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.namespace, sizes.is_large_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::{TableId, TableInfo};

    use super::*;

    #[test]
    fn crafted_short() {
        let data = [
            0x0A, 0x00, // resolution_scope: AssemblyRef row 2 (tag 2)
            0x42, 0x00, // name
            0x43, 0x00, // namespace
        ];

        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::AssemblyRef, 4)],
            false,
            false,
            false,
        ));
        let mut offset = 0;
        let row = TypeRefRaw::read_row(&data, &mut offset, &sizes).unwrap();

        assert_eq!(row.resolution_scope, CodedIndex::new(TableId::AssemblyRef, 2));
        assert_eq!(row.name, 0x42);
        assert_eq!(row.namespace, 0x43);
    }

    #[test]
    fn write_read_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::AssemblyRef, 1)],
            false,
            false,
            false,
        ));
        let row = TypeRefRaw {
            resolution_scope: CodedIndex::new(TableId::AssemblyRef, 1),
            name: 7,
            namespace: 19,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        let read = TypeRefRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap();
        assert_eq!(read, row);
    }
}
