use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{
        CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef,
    },
    Result,
};

/// The `GenericParam` table defines the generic parameters of types and
/// methods. `TableId` = 0x2A, sorted by (`owner`, `number`).
#[derive(Clone, Debug, PartialEq)]
pub struct GenericParamRaw {
    /// Zero-based position of the parameter in its owner's parameter list
    pub number: u16,
    /// A 2-byte bitmask of `GenericParamAttributes` (variance, constraints)
    pub flags: u16,
    /// A `TypeOrMethodDef` coded index naming the owner
    pub owner: CodedIndex,
    /// An index into the `#Strings` heap holding the parameter name
    pub name: u32,
}

impl RowReadable for GenericParamRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* number */ 2 +
            /* flags */  2 +
            /* owner */  sizes.coded_index_bytes(CodedIndexType::TypeOrMethodDef) +
            /* name */   sizes.str_bytes()
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(GenericParamRaw {
            number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            owner: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeOrMethodDef)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowWritable for GenericParamRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.number);
        writer.write_u16(self.flags);
        self.owner
            .write(writer, sizes, CodedIndexType::TypeOrMethodDef)?;
        writer.write_index(self.name, sizes.is_large_str());
        Ok(())
    }
}

/// The `GenericParamConstraint` table attaches class and interface
/// constraints to generic parameters. `TableId` = 0x2C, sorted by `owner`.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericParamConstraintRaw {
    /// An index into the `GenericParam` table
    pub owner: u32,
    /// A `TypeDefOrRef` coded index naming the constraining type
    pub constraint: CodedIndex,
}

impl RowReadable for GenericParamConstraintRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* owner */      sizes.table_index_bytes(TableId::GenericParam) +
            /* constraint */ sizes.coded_index_bytes(CodedIndexType::TypeDefOrRef)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(GenericParamConstraintRaw {
            owner: read_le_at_dyn(data, offset, sizes.is_large(TableId::GenericParam))?,
            constraint: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

impl RowWritable for GenericParamConstraintRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.owner, sizes.is_large(TableId::GenericParam));
        self.constraint
            .write(writer, sizes, CodedIndexType::TypeDefOrRef)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn generic_param_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::TypeDef, 4), (TableId::MethodDef, 4)],
            false,
            false,
            false,
        ));
        let row = GenericParamRaw {
            number: 1,
            flags: 0x0010,
            owner: CodedIndex::new(TableId::MethodDef, 3),
            name: 29,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(
            GenericParamRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(),
            row
        );
    }
}
