use crate::{
    file::io::read_le_at_dyn,
    file::Writer,
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `CustomAttribute` table attaches attribute blobs to metadata items.
/// `TableId` = 0x0C, sorted by `parent`.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomAttributeRaw {
    /// A `HasCustomAttribute` coded index naming the decorated item
    pub parent: CodedIndex,
    /// A `CustomAttributeType` coded index naming the attribute constructor
    pub constructor: CodedIndex,
    /// An index into the `#Blob` heap holding the serialized arguments
    pub value: u32,
}

impl RowReadable for CustomAttributeRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* parent */      sizes.coded_index_bytes(CodedIndexType::HasCustomAttribute) +
            /* constructor */ sizes.coded_index_bytes(CodedIndexType::CustomAttributeType) +
            /* value */       sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(CustomAttributeRaw {
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasCustomAttribute)?,
            constructor: CodedIndex::read(data, offset, sizes, CodedIndexType::CustomAttributeType)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for CustomAttributeRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        self.parent
            .write(writer, sizes, CodedIndexType::HasCustomAttribute)?;
        self.constructor
            .write(writer, sizes, CodedIndexType::CustomAttributeType)?;
        writer.write_index(self.value, sizes.is_large_blob());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::{TableId, TableInfo};

    use super::*;

    #[test]
    fn write_read_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::TypeDef, 4), (TableId::MemberRef, 6)],
            false,
            false,
            false,
        ));
        let row = CustomAttributeRaw {
            parent: CodedIndex::new(TableId::TypeDef, 2),
            constructor: CodedIndex::new(TableId::MemberRef, 6),
            value: 40,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(
            CustomAttributeRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(),
            row
        );
    }
}
