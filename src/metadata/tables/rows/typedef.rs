use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{
        CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef,
    },
    Result,
};

/// The `TypeDef` table defines the types of the current module (classes,
/// interfaces, value types, enums). `TableId` = 0x02
///
/// `field_list` and `method_list` mark the first of a contiguous ascending
/// run of children; the run ends where the next `TypeDef` row's list begins,
/// or at `size(child table) + 1` for the last row.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDefRaw {
    /// A 4-byte bitmask of `TypeAttributes`
    pub flags: u32,
    /// An index into the `#Strings` heap holding the type name
    pub name: u32,
    /// An index into the `#Strings` heap holding the namespace, 0 for global
    pub namespace: u32,
    /// A `TypeDefOrRef` coded index naming the base type, row 0 for none
    pub extends: CodedIndex,
    /// An index into the `Field` table, first of this type's field run
    pub field_list: u32,
    /// An index into the `MethodDef` table, first of this type's method run
    pub method_list: u32,
}

impl RowReadable for TypeDefRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */       4 +
            /* name */        sizes.str_bytes() +
            /* namespace */   sizes.str_bytes() +
            /* extends */     sizes.coded_index_bytes(CodedIndexType::TypeDefOrRef) +
            /* field_list */  sizes.table_index_bytes(TableId::Field) +
            /* method_list */ sizes.table_index_bytes(TableId::MethodDef)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeDefRaw {
            flags: read_le_at::<u32>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            extends: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
            method_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
        })
    }
}

impl RowWritable for TypeDefRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u32(self.flags);
        writer.write_index(self.name, sizes.is_large_str());
        writer.write_index(self.namespace, sizes.is_large_str());
        self.extends
            .write(writer, sizes, CodedIndexType::TypeDefOrRef)?;
        writer.write_index(self.field_list, sizes.is_large(TableId::Field));
        writer.write_index(self.method_list, sizes.is_large(TableId::MethodDef));
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
            0x01, 0x00, 0x10, 0x00, // flags
            0x42, 0x00, // name
            0x43, 0x00, // namespace
            0x05, 0x00, // extends: TypeRef row 1 (tag 1)
            0x01, 0x00, // field_list
            0x01, 0x00, // method_list
        ];

        let sizes = Arc::new(TableInfo::with_counts(
            &[
                (TableId::Field, 1),
                (TableId::MethodDef, 1),
                (TableId::TypeRef, 1),
            ],
            false,
            false,
            false,
        ));
        let mut offset = 0;
        let row = TypeDefRaw::read_row(&data, &mut offset, &sizes).unwrap();

        assert_eq!(offset, TypeDefRaw::row_size(&sizes) as usize);
        assert_eq!(row.flags, 0x0010_0001);
        assert_eq!(row.name, 0x42);
        assert_eq!(row.namespace, 0x43);
        assert_eq!(row.extends, CodedIndex::new(TableId::TypeRef, 1));
        assert_eq!(row.field_list, 1);
        assert_eq!(row.method_list, 1);
    }

    #[test]
    fn crafted_long() {
        let data = [
            0x01, 0x00, 0x00, 0x00, // flags
            0x00, 0x00, 0x00, 0x02, // name
            0x00, 0x00, 0x00, 0x03, // namespace
            0x04, 0x00, 0x00, 0x00, // extends: TypeDef row 1 (tag 0)
            0x00, 0x00, 0x01, 0x00, // field_list
            0x00, 0x00, 0x01, 0x00, // method_list
        ];

        let sizes = Arc::new(TableInfo::with_counts(
            &[
                (TableId::Field, 0x1_0001),
                (TableId::MethodDef, 0x1_0001),
                (TableId::TypeDef, 0x1_0001),
            ],
            true,
            true,
            true,
        ));
        let mut offset = 0;
        let row = TypeDefRaw::read_row(&data, &mut offset, &sizes).unwrap();

        assert_eq!(offset, 24);
        assert_eq!(row.name, 0x0200_0000);
        assert_eq!(row.extends, CodedIndex::new(TableId::TypeDef, 1));
        assert_eq!(row.field_list, 0x0001_0000);
    }

    #[test]
    fn write_read_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::Field, 9), (TableId::MethodDef, 4), (TableId::TypeRef, 2)],
            false,
            false,
            false,
        ));
        let row = TypeDefRaw {
            flags: 0x0010_0001,
            name: 10,
            namespace: 0,
            extends: CodedIndex::new(TableId::TypeRef, 2),
            field_list: 3,
            method_list: 2,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), TypeDefRaw::row_size(&sizes) as usize);

        let mut offset = 0;
        let read = TypeDefRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap();
        assert_eq!(read, row);
    }
}
