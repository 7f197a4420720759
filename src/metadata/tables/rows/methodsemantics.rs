use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{
        CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef,
    },
    Result,
};

/// The `MethodSemantics` table associates accessor methods with properties
/// and events. `TableId` = 0x18, sorted by `method`.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSemanticsRaw {
    /// Bitmask: 0x01 setter, 0x02 getter, 0x04 other, 0x08 add, 0x10 remove, 0x20 fire
    pub semantics: u16,
    /// An index into the `MethodDef` table, the accessor
    pub method: u32,
    /// A `HasSemantics` coded index naming the property or event
    pub association: CodedIndex,
}

impl RowReadable for MethodSemanticsRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* semantics */   2 +
            /* method */      sizes.table_index_bytes(TableId::MethodDef) +
            /* association */ sizes.coded_index_bytes(CodedIndexType::HasSemantics)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MethodSemanticsRaw {
            semantics: read_le_at::<u16>(data, offset)?,
            method: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
            association: CodedIndex::read(data, offset, sizes, CodedIndexType::HasSemantics)?,
        })
    }
}

impl RowWritable for MethodSemanticsRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.semantics);
        writer.write_index(self.method, sizes.is_large(TableId::MethodDef));
        self.association
            .write(writer, sizes, CodedIndexType::HasSemantics)?;
        Ok(())
    }
}

/// The `MethodImpl` table records explicit overrides: which body implements
/// which declaration for a class. `TableId` = 0x19, sorted by `class`.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodImplRaw {
    /// An index into the `TypeDef` table, the class owning the override
    pub class: u32,
    /// A `MethodDefOrRef` coded index naming the implementing body
    pub method_body: CodedIndex,
    /// A `MethodDefOrRef` coded index naming the overridden declaration
    pub method_declaration: CodedIndex,
}

impl RowReadable for MethodImplRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* class */              sizes.table_index_bytes(TableId::TypeDef) +
            /* method_body */        sizes.coded_index_bytes(CodedIndexType::MethodDefOrRef) +
            /* method_declaration */ sizes.coded_index_bytes(CodedIndexType::MethodDefOrRef)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MethodImplRaw {
            class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            method_body: CodedIndex::read(data, offset, sizes, CodedIndexType::MethodDefOrRef)?,
            method_declaration: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::MethodDefOrRef,
            )?,
        })
    }
}

impl RowWritable for MethodImplRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.class, sizes.is_large(TableId::TypeDef));
        self.method_body
            .write(writer, sizes, CodedIndexType::MethodDefOrRef)?;
        self.method_declaration
            .write(writer, sizes, CodedIndexType::MethodDefOrRef)?;
        Ok(())
    }
}

/// The `MethodSpec` table instantiates generic methods with concrete type
/// arguments. `TableId` = 0x2B
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSpecRaw {
    /// A `MethodDefOrRef` coded index naming the generic method
    pub method: CodedIndex,
    /// An index into the `#Blob` heap holding the instantiation signature
    pub instantiation: u32,
}

impl RowReadable for MethodSpecRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* method */        sizes.coded_index_bytes(CodedIndexType::MethodDefOrRef) +
            /* instantiation */ sizes.blob_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MethodSpecRaw {
            method: CodedIndex::read(data, offset, sizes, CodedIndexType::MethodDefOrRef)?,
            instantiation: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for MethodSpecRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        self.method
            .write(writer, sizes, CodedIndexType::MethodDefOrRef)?;
        writer.write_index(self.instantiation, sizes.is_large_blob());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn method_semantics_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::MethodDef, 9), (TableId::Property, 3)],
            false,
            false,
            false,
        ));
        let row = MethodSemanticsRaw {
            semantics: 0x0002, // getter
            method: 7,
            association: CodedIndex::new(TableId::Property, 3),
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(
            MethodSemanticsRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(),
            row
        );
    }

    #[test]
    fn method_impl_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::TypeDef, 2), (TableId::MethodDef, 6), (TableId::MemberRef, 2)],
            false,
            false,
            false,
        ));
        let row = MethodImplRaw {
            class: 2,
            method_body: CodedIndex::new(TableId::MethodDef, 5),
            method_declaration: CodedIndex::new(TableId::MemberRef, 1),
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(MethodImplRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
