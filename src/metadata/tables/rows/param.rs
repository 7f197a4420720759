use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    file::Writer,
    metadata::tables::{RowReadable, RowWritable, TableInfoRef},
    Result,
};

/// The `Param` table describes the parameters of `MethodDef` rows.
/// `TableId` = 0x08
///
/// Sequence 0 names the return value; real parameters count from 1.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamRaw {
    /// A 2-byte bitmask of `ParamAttributes`
    pub flags: u16,
    /// Parameter position, 0 for the return value
    pub sequence: u16,
    /// An index into the `#Strings` heap holding the parameter name
    pub name: u32,
}

impl RowReadable for ParamRaw {
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(2 + 2 + sizes.str_bytes())
    }

    fn read_row(data: &[u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ParamRaw {
            flags: read_le_at::<u16>(data, offset)?,
            sequence: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowWritable for ParamRaw {
    fn write_row(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        writer.write_u16(self.flags);
        writer.write_u16(self.sequence);
        writer.write_index(self.name, sizes.is_large_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn write_read_round_trip() {
        let sizes = Arc::new(TableInfo::with_counts(&[], false, false, false));
        let row = ParamRaw {
            flags: 0x0010,
            sequence: 2,
            name: 0x55,
        };

        let mut writer = Writer::new();
        row.write_row(&mut writer, &sizes).unwrap();
        assert_eq!(writer.len(), 6);

        let mut offset = 0;
        assert_eq!(ParamRaw::read_row(writer.as_slice(), &mut offset, &sizes).unwrap(), row);
    }
}
