use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{RowReadable, RowWritable, TableId, TableInfoRef},
    Result,
};

/// The `Assembly` table carries the manifest of the current assembly.
/// `TableId` = 0x20
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyRaw {
    /// Hash algorithm id used over the assembly's files
    pub hash_alg_id: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// A 4-byte bitmask of `AssemblyFlags`
    pub flags: u32,
    /// An index into the `#Blob` heap holding the public key, 0 for none
    pub public_key: u32,
    /// An index into the `#Strings` heap holding the assembly name
    pub name: u32,
    /// An index into the `#Strings` heap holding the culture, 0 for neutral
    pub culture: u32,
}

impl RowReadable for AssemblyRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* hash_alg_id */ 4u8 +
            /* versions */    8 +
            /* flags */       4 +
            /* public_key */  sizes.blob_bytes() +
            /* name */        sizes.str_bytes() +
            /* culture */     sizes.str_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyRaw {
            hash_alg_id: read_le_at::<u32>(data, offset)?,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowWritable for AssemblyRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.hash_alg_id);
        writer.write_u16(self.major_version);
        writer.write_u16(self.minor_version);
        writer.write_u16(self.build_number);
        writer.write_u16(self.revision_number);
        writer.write_u32(self.flags);
        writer.write_index(self.public_key, sizes.is_large_blob());
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.culture, sizes.is_large_str());
        Ok(())
    }
}

/// The `AssemblyProcessor` table (0x21), rarely emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyProcessorRaw {
    /// Processor architecture id
    pub processor: u32,
}

impl RowReadable for AssemblyProcessorRaw {
    fn row_size(_sizes: &TableInfoRef) -> u32 {
        4
    }

    fn read_row(data: &[u8], offset: &mut usize, _sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyProcessorRaw {
            processor: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for AssemblyProcessorRaw {
    fn write_row(&self, writer: &mut Writer, _sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.processor);
        Ok(())
    }
}

/// The `AssemblyOS` table (0x22), rarely emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyOsRaw {
    /// OS platform id
    pub os_platform_id: u32,
    /// OS major version
    pub os_major_version: u32,
    /// OS minor version
    pub os_minor_version: u32,
}

impl RowReadable for AssemblyOsRaw {
    fn row_size(_sizes: &TableInfoRef) -> u32 {
        12
    }

    fn read_row(data: &[u8], offset: &mut usize, _sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyOsRaw {
            os_platform_id: read_le_at::<u32>(data, offset)?,
            os_major_version: read_le_at::<u32>(data, offset)?,
            os_minor_version: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for AssemblyOsRaw {
    fn write_row(&self, writer: &mut Writer, _sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.os_platform_id);
        writer.write_u32(self.os_major_version);
        writer.write_u32(self.os_minor_version);
        Ok(())
    }
}

/// The `AssemblyRef` table references the external assemblies this module
/// depends on. `TableId` = 0x23
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyRefRaw {
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// A 4-byte bitmask of `AssemblyFlags`
    pub flags: u32,
    /// An index into the `#Blob` heap: full key or 8-byte token, 0 for none
    pub public_key_or_token: u32,
    /// An index into the `#Strings` heap holding the assembly name
    pub name: u32,
    /// An index into the `#Strings` heap holding the culture, 0 for neutral
    pub culture: u32,
    /// An index into the `#Blob` heap holding a hash of the referenced
    /// assembly, 0 for none
    pub hash_value: u32,
}

impl RowReadable for AssemblyRefRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* versions */            8u8 +
            /* flags */               4 +
            /* public_key_or_token */ sizes.blob_bytes() +
            /* name */                sizes.str_bytes() +
            /* culture */             sizes.str_bytes() +
            /* hash_value */          sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyRefRaw {
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key_or_token: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            hash_value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for AssemblyRefRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.major_version);
        writer.write_u16(self.minor_version);
        writer.write_u16(self.build_number);
        writer.write_u16(self.revision_number);
        writer.write_u32(self.flags);
        writer.write_index(self.public_key_or_token, sizes.is_large_blob());
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.culture, sizes.is_large_str());
        writer.write_index(self.hash_value, sizes.is_large_blob());
        Ok(())
    }
}

/// The `AssemblyRefProcessor` table (0x24), rarely emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyRefProcessorRaw {
    /// Processor architecture id
    pub processor: u32,
    /// An index into the `AssemblyRef` table
    pub assembly_ref: u32,
}

impl RowReadable for AssemblyRefProcessorRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(4 + sizes.table_index_bytes(TableId::AssemblyRef))
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyRefProcessorRaw {
            processor: read_le_at::<u32>(data, offset)?,
            assembly_ref: read_le_at_dyn(data, offset, sizes.is_large(TableId::AssemblyRef))?,
        })
    }
}

impl RowWritable for AssemblyRefProcessorRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.processor);
        writer.write_index(self.assembly_ref, sizes.is_large(TableId::AssemblyRef));
        Ok(())
    }
}

/// The `AssemblyRefOS` table (0x25), rarely emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyRefOsRaw {
    /// OS platform id
    pub os_platform_id: u32,
    /// OS major version
    pub os_major_version: u32,
    /// OS minor version
    pub os_minor_version: u32,
    /// An index into the `AssemblyRef` table
    pub assembly_ref: u32,
}

impl RowReadable for AssemblyRefOsRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(12 + sizes.table_index_bytes(TableId::AssemblyRef))
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyRefOsRaw {
            os_platform_id: read_le_at::<u32>(data, offset)?,
            os_major_version: read_le_at::<u32>(data, offset)?,
            os_minor_version: read_le_at::<u32>(data, offset)?,
            assembly_ref: read_le_at_dyn(data, offset, sizes.is_large(TableId::AssemblyRef))?,
        })
    }
}

impl RowWritable for AssemblyRefOsRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.os_platform_id);
        writer.write_u32(self.os_major_version);
        writer.write_u32(self.os_minor_version);
        writer.write_index(self.assembly_ref, sizes.is_large(TableId::AssemblyRef));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn assembly_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(&[], false, false, false));
        let row = AssemblyRaw {
            hash_alg_id: 0x8004,
            major_version: 4,
            minor_version: 0,
            build_number: 30319,
            revision_number: 0,
            flags: 0,
            public_key: 0,
            name: 12,
            culture: 0,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), AssemblyRaw::row_size(&sizes) as usize);

        let mut offset = 0;
        assert_eq!(AssemblyRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }

    #[test]
    fn assembly_ref_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(&[], false, false, true));
        let row = AssemblyRefRaw {
            major_version: 6,
            minor_version: 0,
            build_number: 0,
            revision_number: 0,
            flags: 0,
            public_key_or_token: 0x1_0000,
            name: 3,
            culture: 0,
            hash_value: 0,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(AssemblyRefRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
