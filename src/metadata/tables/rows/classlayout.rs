use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{RowReadable, RowWritable, TableId, TableInfoRef},
    Result,
};

/// The `ClassLayout` table records explicit packing and size of types.
/// `TableId` = 0x0F, sorted by `parent`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassLayoutRaw {
    /// Field alignment in bytes, a power of two up to 128
    pub packing_size: u16,
    /// Total byte size of the type, 0 to defer to the loader
    pub class_size: u32,
    /// An index into the `TypeDef` table
    pub parent: u32,
}

impl RowReadable for ClassLayoutRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(2 + 4 + sizes.table_index_bytes(TableId::TypeDef))
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ClassLayoutRaw {
            packing_size: read_le_at::<u16>(data, offset)?,
            class_size: read_le_at::<u32>(data, offset)?,
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
        })
    }
}

impl RowWritable for ClassLayoutRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.packing_size);
        writer.write_u32(self.class_size);
        writer.write_index(self.parent, sizes.is_large(TableId::TypeDef));
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
        let sizes = Arc::new(TableInfo::with_counts(&[(TableId::TypeDef, 3)], false, false, false));
        let row = ClassLayoutRaw {
            packing_size: 8,
            class_size: 64,
            parent: 2,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), 8);

        let mut offset = 0;
        assert_eq!(
            ClassLayoutRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(),
            row
        );
    }
}
