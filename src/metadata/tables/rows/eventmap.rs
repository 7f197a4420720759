use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{
        CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef,
    },
    Result,
};

/// The `EventMap` table maps a type to its contiguous run of `Event` rows.
/// `TableId` = 0x12, sorted by `parent`.
#[derive(Clone, Debug, PartialEq)]
pub struct EventMapRaw {
    /// An index into the `TypeDef` table
    pub parent: u32,
    /// An index into the `Event` table, first of this type's event run
    pub event_list: u32,
}

impl RowReadable for EventMapRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(sizes.table_index_bytes(TableId::TypeDef) + sizes.table_index_bytes(TableId::Event))
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(EventMapRaw {
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            event_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Event))?,
        })
    }
}

impl RowWritable for EventMapRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_index(self.parent, sizes.is_large(TableId::TypeDef));
        writer.write_index(self.event_list, sizes.is_large(TableId::Event));
        Ok(())
    }
}

/// The `Event` table defines the events of a type. `TableId` = 0x14
#[derive(Clone, Debug, PartialEq)]
pub struct EventRaw {
    /// A 2-byte bitmask of `EventAttributes`
    pub flags: u16,
    /// An index into the `#Strings` heap holding the event name
    pub name: u32,
    /// A `TypeDefOrRef` coded index naming the delegate type
    pub event_type: CodedIndex,
}

impl RowReadable for EventRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */      2 +
            /* name */       sizes.str_bytes() +
            /* event_type */ sizes.coded_index_bytes(CodedIndexType::TypeDefOrRef)
        )
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(EventRaw {
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            event_type: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

impl RowWritable for EventRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.flags);
        writer.write_index(self.name, sizes.is_large_str());
        self.event_type
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
    fn event_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(
            &[(TableId::TypeRef, 6), (TableId::Event, 2)],
            false,
            false,
            false,
        ));
        let row = EventRaw {
            flags: 0,
            name: 11,
            event_type: CodedIndex::new(TableId::TypeRef, 6),
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();

        let mut offset = 0;
        assert_eq!(EventRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
