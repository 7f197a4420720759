use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{RowReadable, RowWritable, TableId, TableInfoRef},
    Result,
};

/// The `Field` table defines the fields owned by `TypeDef` rows.
/// `TableId` = 0x04
#[derive(Clone, Debug, PartialEq)]
pub struct FieldRaw {
    /// A 2-byte bitmask of `FieldAttributes`
    pub flags: u16,
    /// An index into the `#Strings` heap holding the field name
    pub name: u32,
    /// An index into the `#Blob` heap holding the field signature
    pub signature: u32,
}

impl RowReadable for FieldRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */     2 +
            /* name */      sizes.str_bytes() +
            /* signature */ sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FieldRaw {
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for FieldRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.flags);
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.signature, sizes.is_large_blob());
        Ok(())
    }
}

/// The `FieldLayout` table records explicit byte offsets of fields within
/// explicitly laid out types. `TableId` = 0x10, sorted by `field`.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldLayoutRaw {
    /// Byte offset of the field within its type
    pub offset: u32,
    /// An index into the `Field` table
    pub field: u32,
}

impl RowReadable for FieldLayoutRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(4 + sizes.table_index_bytes(TableId::Field))
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FieldLayoutRaw {
            offset: read_le_at::<u32>(data, offset)?,
            field: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
        })
    }
}

impl RowWritable for FieldLayoutRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.offset);
        writer.write_index(self.field, sizes.is_large(TableId::Field));
        Ok(())
    }
}

/// The `FieldRVA` table maps fields with initial data to their location in
/// the image. `TableId` = 0x1D, sorted by `field`.
///
/// The RVA value itself is supplied by the external image layout; the engine
/// carries it opaquely.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldRvaRaw {
    /// Relative virtual address of the field's mapped data
    pub rva: u32,
    /// An index into the `Field` table
    pub field: u32,
}

impl RowReadable for FieldRvaRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(4 + sizes.table_index_bytes(TableId::Field))
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FieldRvaRaw {
            rva: read_le_at::<u32>(data, offset)?,
            field: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
        })
    }
}

impl RowWritable for FieldRvaRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.rva);
        writer.write_index(self.field, sizes.is_large(TableId::Field));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn field_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(&[], false, false, false));
        let row = FieldRaw {
            flags: 0x0006,
            name: 0x42,
            signature: 0x10,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), 6);

        let mut offset = 0;
        assert_eq!(FieldRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }

    #[test]
    fn field_rva_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::Field, 0x1_0000)],
            false,
            false,
            false,
        ));
        let row = FieldRvaRaw {
            rva: 0x2050,
            field: 0x1_0000,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), 8);

        let mut offset = 0;
        assert_eq!(FieldRvaRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
