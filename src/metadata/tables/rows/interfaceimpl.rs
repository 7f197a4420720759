use crate::{
    file::io::read_le_at_dyn,
    file::Writer,
    metadata::tables::{
        CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef,
    },
    Result,
};

/// The `InterfaceImpl` table records which interfaces a type implements.
/// `TableId` = 0x09, sorted by `class`.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceImplRaw {
    /// An index into the `TypeDef` table, the implementing type
    pub class: u32,
    /// A `TypeDefOrRef` coded index naming the implemented interface
    pub interface: CodedIndex,
}

impl RowReadable for InterfaceImplRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* class */     sizes.table_index_bytes(TableId::TypeDef) +
            /* interface */ sizes.coded_index_bytes(CodedIndexType::TypeDefOrRef)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(InterfaceImplRaw {
            class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            interface: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

impl RowWritable for InterfaceImplRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.class, sizes.is_large(TableId::TypeDef));
        self.interface
            .write(writer, sizes, CodedIndexType::TypeDefOrRef)?;
        Ok(())
    }
}

/// The `NestedClass` table records type nesting relationships.
/// `TableId` = 0x29, sorted by `nested_class`.
#[derive(Clone, Debug, PartialEq)]
pub struct NestedClassRaw {
    /// An index into the `TypeDef` table, the nested type
    pub nested_class: u32,
    /// An index into the `TypeDef` table, the enclosing type
    pub enclosing_class: u32,
}

impl RowReadable for NestedClassRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(sizes.table_index_bytes(TableId::TypeDef) * 2)
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(NestedClassRaw {
            nested_class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            enclosing_class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
        })
    }
}

impl RowWritable for NestedClassRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.nested_class, sizes.is_large(TableId::TypeDef));
        writer.write_index(self.enclosing_class, sizes.is_large(TableId::TypeDef));
        Ok(())
    }
}
