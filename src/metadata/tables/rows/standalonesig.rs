use crate::{
    file::io::read_le_at_dyn,
    file::Writer,
    metadata::tables::{RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `StandAloneSig` table holds signatures not attached to any
/// definition, typically local-variable signatures referenced by method
/// bodies. `TableId` = 0x11
#[derive(Clone, Debug, PartialEq)]
pub struct StandAloneSigRaw {
    /// An index into the `#Blob` heap holding the signature
    pub signature: u32,
}

impl RowReadable for StandAloneSigRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(sizes.blob_bytes())
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(StandAloneSigRaw {
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for StandAloneSigRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.signature, sizes.is_large_blob());
        Ok(())
    }
}

/// The `TypeSpec` table carries type shapes that need a full signature blob,
/// such as generic instantiations and array types. `TableId` = 0x1B
#[derive(Clone, Debug, PartialEq)]
pub struct TypeSpecRaw {
    /// An index into the `#Blob` heap holding the type signature
    pub signature: u32,
}

impl RowReadable for TypeSpecRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(sizes.blob_bytes())
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeSpecRaw {
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for TypeSpecRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.signature, sizes.is_large_blob());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn blob_index_widens_with_heap() {
        let narrow = Arc::new(TableInfo::with_counts(&[], false, false, false));
        let wide = Arc::new(TableInfo::with_counts(&[], false, false, true));

        assert_eq!(StandAloneSigRaw::row_size(&narrow), 2);
        assert_eq!(StandAloneSigRaw::row_size(&wide), 4);

        let row = TypeSpecRaw { signature: 0x1_2345 };
        let mut writer = Writer::new();
        row.write_row(&mut writer, &wide).unwrap();

        let mut offset = 0;
        assert_eq!(TypeSpecRaw::read_row(writer.as_slice(), &mut offset, &wide).unwrap(), row);
    }
}
