use crate::{
    file::io::read_le_at_dyn,
    file::Writer,
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `MemberRef` table references methods and fields of external types.
/// `TableId` = 0x0A
#[derive(Clone, Debug, PartialEq)]
pub struct MemberRefRaw {
    /// A `MemberRefParent` coded index naming the owner
    pub class: CodedIndex,
    /// An index into the `#Strings` heap holding the member name
    pub name: u32,
    /// An index into the `#Blob` heap holding the member signature
    pub signature: u32,
}

impl RowReadable for MemberRefRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* class */     sizes.coded_index_bytes(CodedIndexType::MemberRefParent) +
            /* name */      sizes.str_bytes() +
            /* signature */ sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MemberRefRaw {
            class: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberRefParent)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for MemberRefRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        self.class
            .write(writer, sizes, CodedIndexType::MemberRefParent)?;
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.signature, sizes.is_large_blob());
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
            &[(TableId::TypeRef, 3)],
            false,
            false,
            false,
        ));
        let row = MemberRefRaw {
            class: CodedIndex::new(TableId::TypeRef, 2),
            name: 17,
            signature: 5,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(MemberRefRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
