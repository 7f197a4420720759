use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `DeclSecurity` table carries declarative security permission sets.
/// `TableId` = 0x0E, sorted by `parent`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeclSecurityRaw {
    /// Security action code
    pub action: u16,
    /// A `HasDeclSecurity` coded index naming the protected item
    pub parent: CodedIndex,
    /// An index into the `#Blob` heap holding the permission set
    pub permission_set: u32,
}

impl RowReadable for DeclSecurityRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* action */         2 +
            /* parent */         sizes.coded_index_bytes(CodedIndexType::HasDeclSecurity) +
            /* permission_set */ sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(DeclSecurityRaw {
            action: read_le_at::<u16>(data, offset)?,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasDeclSecurity)?,
            permission_set: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for DeclSecurityRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.action);
        self.parent
            .write(writer, sizes, CodedIndexType::HasDeclSecurity)?;
        writer.write_index(self.permission_set, sizes.is_large_blob());
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
            &[(TableId::TypeDef, 2), (TableId::Assembly, 1)],
            false,
            false,
            false,
        ));
        let row = DeclSecurityRaw {
            action: 8,
            parent: CodedIndex::new(TableId::Assembly, 1),
            permission_set: 77,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(
            DeclSecurityRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(),
            row
        );
    }
}
