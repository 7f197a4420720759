use crate::{
    file::io::read_le_at_dyn,
    file::Writer,
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `FieldMarshal` table attaches native marshalling descriptors to
/// fields and parameters. `TableId` = 0x0D, sorted by `parent`.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMarshalRaw {
    /// A `HasFieldMarshal` coded index naming the marshalled item
    pub parent: CodedIndex,
    /// An index into the `#Blob` heap holding the marshalling descriptor
    pub native_type: u32,
}

impl RowReadable for FieldMarshalRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* parent */      sizes.coded_index_bytes(CodedIndexType::HasFieldMarshal) +
            /* native_type */ sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FieldMarshalRaw {
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasFieldMarshal)?,
            native_type: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for FieldMarshalRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        self.parent
            .write(writer, sizes, CodedIndexType::HasFieldMarshal)?;
        writer.write_index(self.native_type, sizes.is_large_blob());
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
            &[(TableId::Field, 4), (TableId::Param, 4)],
            false,
            false,
            false,
        ));
        let row = FieldMarshalRaw {
            parent: CodedIndex::new(TableId::Param, 1),
            native_type: 9,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), 4);

        let mut offset = 0;
        assert_eq!(
            FieldMarshalRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(),
            row
        );
    }
}
