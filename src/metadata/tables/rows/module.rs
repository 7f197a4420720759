use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `Module` table describes the current module. `TableId` = 0x00
///
/// Exactly one row per module; the Mvid distinguishes otherwise identical
/// builds from each other.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleRaw {
    /// Reserved generation counter, written as 0
    pub generation: u16,
    /// An index into the `#Strings` heap holding the module name
    pub name: u32,
    /// An index into the `#GUID` heap holding the module version id
    pub mvid: u32,
    /// An index into the `#GUID` heap, edit-and-continue id, written as 0
    pub enc_id: u32,
    /// An index into the `#GUID` heap, edit-and-continue base id, written as 0
    pub enc_base_id: u32,
}

impl RowReadable for ModuleRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* generation */  2 +
            /* name */        sizes.str_bytes() +
            /* mvid */        sizes.guid_bytes() +
            /* enc_id */      sizes.guid_bytes() +
            /* enc_base_id */ sizes.guid_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ModuleRaw {
            generation: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            mvid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            enc_id: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            enc_base_id: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
        })
    }
}

impl RowWritable for ModuleRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.generation);
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.mvid, sizes.is_large_guid());
        writer.write_index(self.enc_id, sizes.is_large_guid());
        writer.write_index(self.enc_base_id, sizes.is_large_guid());
        Ok(())
    }
}

/// The `ModuleRef` table names external modules, primarily for P/Invoke
/// scopes. `TableId` = 0x1A
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleRefRaw {
    /// An index into the `#Strings` heap holding the module file name
    pub name: u32,
}

impl RowReadable for ModuleRefRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(sizes.str_bytes())
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ModuleRefRaw {
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowWritable for ModuleRefRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.name, sizes.is_large_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn crafted_short() {
        let data = [
            0x00, 0x00, // generation
            0x01, 0x00, // name
            0x01, 0x00, // mvid
            0x00, 0x00, // enc_id
            0x00, 0x00, // enc_base_id
        ];

        let sizes = Arc::new(TableInfo::with_counts(&[], false, false, false));
        let mut offset = 0;
        let row = ModuleRaw::read_row(&data, &mut offset, &sizes).unwrap();

        assert_eq!(offset, ModuleRaw::row_size(&sizes) as usize);
        assert_eq!(row.generation, 0);
        assert_eq!(row.name, 1);
        assert_eq!(row.mvid, 1);
    }

    #[test]
    fn write_read_round_trip_wide() {
        let sizes = Arc::new(TableInfo::with_counts(&[], true, true, false));
        let row = ModuleRaw {
            generation: 0,
            name: 0x0001_2345,
            mvid: 0x0002_0000,
            enc_id: 0,
            enc_base_id: 0,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), ModuleRaw::row_size(&sizes) as usize);

        let mut offset = 0;
        let read = ModuleRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap();
        assert_eq!(read, row);
    }
}
