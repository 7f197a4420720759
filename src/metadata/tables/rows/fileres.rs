use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `File` table names the files of a multi-file assembly.
/// `TableId` = 0x26
#[derive(Clone, Debug, PartialEq)]
pub struct FileRaw {
    /// A 4-byte bitmask of `FileAttributes` (bit 0: contains no metadata)
    pub flags: u32,
    /// An index into the `#Strings` heap holding the file name
    pub name: u32,
    /// An index into the `#Blob` heap holding the file's hash
    pub hash_value: u32,
}

impl RowReadable for FileRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */      4 +
            /* name */       sizes.str_bytes() +
            /* hash_value */ sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FileRaw {
            flags: read_le_at::<u32>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            hash_value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for FileRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.flags);
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.hash_value, sizes.is_large_blob());
        Ok(())
    }
}

/// The `ExportedType` table lists types exported from other files of the
/// assembly or forwarded to other assemblies. `TableId` = 0x27
#[derive(Clone, Debug, PartialEq)]
pub struct ExportedTypeRaw {
    /// A 4-byte bitmask of `TypeAttributes`
    pub flags: u32,
    /// Hint: the `TypeDef` row id of this type in its defining file
    pub type_def_id: u32,
    /// An index into the `#Strings` heap holding the type name
    pub name: u32,
    /// An index into the `#Strings` heap holding the namespace
    pub namespace: u32,
    /// An `Implementation` coded index naming where the type lives
    pub implementation: CodedIndex,
}

impl RowReadable for ExportedTypeRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */          4u8 +
            /* type_def_id */    4 +
            /* name */           sizes.str_bytes() +
            /* namespace */      sizes.str_bytes() +
            /* implementation */ sizes.coded_index_bytes(CodedIndexType::Implementation)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ExportedTypeRaw {
            flags: read_le_at::<u32>(data, offset)?,
            type_def_id: read_le_at::<u32>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            implementation: CodedIndex::read(data, offset, sizes, CodedIndexType::Implementation)?,
        })
    }
}

impl RowWritable for ExportedTypeRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.flags);
        writer.write_u32(self.type_def_id);
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.namespace, sizes.is_large_str());
        self.implementation
            .write(writer, sizes, CodedIndexType::Implementation)?;
        Ok(())
    }
}

/// The `ManifestResource` table describes embedded and linked resources.
/// `TableId` = 0x28
///
/// The offset is relative to the resource area of the image for embedded
/// resources and supplied by the external layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestResourceRaw {
    /// Byte offset of the resource data
    pub offset: u32,
    /// A 4-byte bitmask: 1 public, 2 private
    pub flags: u32,
    /// An index into the `#Strings` heap holding the resource name
    pub name: u32,
    /// An `Implementation` coded index, row 0 for an embedded resource
    pub implementation: CodedIndex,
}

impl RowReadable for ManifestResourceRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* offset */         4 +
            /* flags */          4 +
            /* name */           sizes.str_bytes() +
            /* implementation */ sizes.coded_index_bytes(CodedIndexType::Implementation)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ManifestResourceRaw {
            offset: read_le_at::<u32>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            implementation: CodedIndex::read(data, offset, sizes, CodedIndexType::Implementation)?,
        })
    }
}

impl RowWritable for ManifestResourceRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.offset);
        writer.write_u32(self.flags);
        writer.write_index(self.name, sizes.is_large_str());
        self.implementation
            .write(writer, sizes, CodedIndexType::Implementation)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::{TableId, TableInfo};

    use super::*;

    #[test]
    fn manifest_resource_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(&[(TableId::File, 1)], false, false, false));
        let row = ManifestResourceRaw {
            offset: 0x100,
            flags: 1,
            name: 44,
            implementation: CodedIndex::new(TableId::File, 1),
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(
            ManifestResourceRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(),
            row
        );
    }
}
