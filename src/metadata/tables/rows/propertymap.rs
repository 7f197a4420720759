use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{RowReadable, RowWritable, TableId, TableInfoRef},
    Result,
};

/// The `PropertyMap` table maps a type to its contiguous run of `Property`
/// rows. `TableId` = 0x15, sorted by `parent`.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyMapRaw {
    /// An index into the `TypeDef` table
    pub parent: u32,
    /// An index into the `Property` table, first of this type's property run
    pub property_list: u32,
}

impl RowReadable for PropertyMapRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            sizes.table_index_bytes(TableId::TypeDef) + sizes.table_index_bytes(TableId::Property),
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(PropertyMapRaw {
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            property_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Property))?,
        })
    }
}

impl RowWritable for PropertyMapRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.parent, sizes.is_large(TableId::TypeDef));
        writer.write_index(self.property_list, sizes.is_large(TableId::Property));
        Ok(())
    }
}

/// The `Property` table defines the properties of a type. `TableId` = 0x17
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyRaw {
    /// A 2-byte bitmask of `PropertyAttributes`
    pub flags: u16,
    /// An index into the `#Strings` heap holding the property name
    pub name: u32,
    /// An index into the `#Blob` heap holding the property signature
    pub signature: u32,
}

impl RowReadable for PropertyRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */     2 +
            /* name */      sizes.str_bytes() +
            /* signature */ sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(PropertyRaw {
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for PropertyRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.flags);
        writer.write_index(self.name, sizes.is_large_str());
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
    fn property_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(&[], false, false, false));
        let row = PropertyRaw {
            flags: 0,
            name: 23,
            signature: 8,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), 6);

        let mut offset = 0;
        assert_eq!(PropertyRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
