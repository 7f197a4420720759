use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `Constant` table stores compile-time constants of fields, params and
/// properties. `TableId` = 0x0B, sorted by `parent`.
///
/// The type column carries the `ELEMENT_TYPE` of the value; the padding byte
/// is always zero.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantRaw {
    /// `ELEMENT_TYPE` code of the constant value
    pub value_type: u8,
    /// Reserved, written as 0
    pub padding: u8,
    /// A `HasConstant` coded index naming the owner
    pub parent: CodedIndex,
    /// An index into the `#Blob` heap holding the value bytes
    pub value: u32,
}

impl RowReadable for ConstantRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* value_type + padding */ 2 +
            /* parent */               sizes.coded_index_bytes(CodedIndexType::HasConstant) +
            /* value */                sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ConstantRaw {
            value_type: read_le_at::<u8>(data, offset)?,
            padding: read_le_at::<u8>(data, offset)?,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasConstant)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for ConstantRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u8(self.value_type);
        writer.write_u8(self.padding);
        self.parent
            .write(writer, sizes, CodedIndexType::HasConstant)?;
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
            &[(TableId::Field, 4), (TableId::Param, 2)],
            false,
            false,
            false,
        ));
        let row = ConstantRaw {
            value_type: 0x08, // I4
            padding: 0,
            parent: CodedIndex::new(TableId::Field, 3),
            value: 21,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), ConstantRaw::row_size(&sizes) as usize);

        let mut offset = 0;
        assert_eq!(ConstantRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
