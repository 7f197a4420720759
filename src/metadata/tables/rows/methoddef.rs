use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{RowReadable, RowWritable, TableId, TableInfoRef},
    Result,
};

/// The `MethodDef` table defines the methods owned by `TypeDef` rows.
/// `TableId` = 0x06
///
/// The RVA points at the method body in the image and is supplied by the
/// external body emitter; 0 for abstract, runtime and P/Invoke methods.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodDefRaw {
    /// Relative virtual address of the method body, 0 when there is none
    pub rva: u32,
    /// A 2-byte bitmask of `MethodImplAttributes`
    pub impl_flags: u16,
    /// A 2-byte bitmask of `MethodAttributes`
    pub flags: u16,
    /// An index into the `#Strings` heap holding the method name
    pub name: u32,
    /// An index into the `#Blob` heap holding the method signature
    pub signature: u32,
    /// An index into the `Param` table, first of this method's param run
    pub param_list: u32,
}

impl RowReadable for MethodDefRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* rva */        4 +
            /* impl_flags */ 2 +
            /* flags */      2 +
            /* name */       sizes.str_bytes() +
            /* signature */  sizes.blob_bytes() +
            /* param_list */ sizes.table_index_bytes(TableId::Param)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MethodDefRaw {
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Param))?,
        })
    }
}

impl RowWritable for MethodDefRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.rva);
        writer.write_u16(self.impl_flags);
        writer.write_u16(self.flags);
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.signature, sizes.is_large_blob());
        writer.write_index(self.param_list, sizes.is_large(TableId::Param));
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
            0x50, 0x20, 0x00, 0x00, // rva
            0x00, 0x00, // impl_flags
            0x86, 0x00, // flags
            0x42, 0x00, // name
            0x10, 0x00, // signature
            0x01, 0x00, // param_list
        ];

        let sizes = Arc::new(TableInfo::with_counts(&[(TableId::Param, 2)], false, false, false));
        let mut offset = 0;
        let row = MethodDefRaw::read_row(&data, &mut offset, &sizes).unwrap();

        assert_eq!(offset, MethodDefRaw::row_size(&sizes) as usize);
        assert_eq!(row.rva, 0x2050);
        assert_eq!(row.flags, 0x0086);
        assert_eq!(row.param_list, 1);
    }

    #[test]
    fn write_read_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(&[(TableId::Param, 5)], false, false, false));
        let row = MethodDefRaw {
            rva: 0,
            impl_flags: 0x0001,
            flags: 0x01C6,
            name: 99,
            signature: 33,
            param_list: 4,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(MethodDefRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
