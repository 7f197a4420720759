//! Generic read container for one metadata table.
//!
//! [`MetadataTable`] lays a typed view over the raw bytes of a single table
//! in the `#~` stream. Rows are parsed on access; nothing is materialized up
//! front.

use std::marker::PhantomData;

use crate::{
    metadata::tables::{RowReadable, TableInfoRef},
    Error::ShortRead,
    Result,
};

/// A typed, lazily-parsed view over the rows of one table.
///
/// The lifetime ties the view to the stream buffer it was created over.
pub struct MetadataTable<'a, T: RowReadable> {
    data: &'a [u8],
    row_count: u32,
    info: TableInfoRef,
    _marker: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Create a table view over `row_count` rows starting at `data`.
    ///
    /// ## Arguments
    /// * 'data' - Buffer positioned at the first row of this table
    /// * '`row_count`' - Number of rows the header declared
    /// * 'info' - Width planner output for sizing columns
    ///
    /// # Errors
    /// Returns [`ShortRead`] if the buffer cannot hold all declared rows
    pub fn new(data: &'a [u8], row_count: u32, info: TableInfoRef) -> Result<Self> {
        let table_size = row_count as usize * T::row_size(&info) as usize;
        if data.len() < table_size {
            return Err(ShortRead);
        }

        Ok(MetadataTable {
            data,
            row_count,
            info,
            _marker: PhantomData,
        })
    }

    /// Number of rows in this table.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Total byte size of this table within the stream.
    #[must_use]
    pub fn size(&self) -> usize {
        self.row_count as usize * T::row_size(&self.info) as usize
    }

    /// Parse the row with the given 1-based index.
    ///
    /// ## Arguments
    /// * 'rid' - The 1-based row id; 0 and out-of-range ids yield `None`
    ///
    /// # Errors
    /// Returns a decode error if the row bytes are corrupt
    pub fn get(&self, rid: u32) -> Result<Option<T>> {
        if rid == 0 || rid > self.row_count {
            return Ok(None);
        }

        let mut offset = (rid - 1) as usize * T::row_size(&self.info) as usize;
        Ok(Some(T::read_row(self.data, &mut offset, &self.info)?))
    }

    /// Iterate all rows in physical order.
    pub fn iter(&self) -> TableIterator<'a, '_, T> {
        TableIterator {
            table: self,
            next_rid: 1,
        }
    }
}

/// Sequential iterator over the rows of a [`MetadataTable`].
pub struct TableIterator<'a, 't, T: RowReadable> {
    table: &'t MetadataTable<'a, T>,
    next_rid: u32,
}

impl<T: RowReadable> Iterator for TableIterator<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_rid > self.table.row_count {
            return None;
        }

        let rid = self.next_rid;
        self.next_rid += 1;

        match self.table.get(rid) {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::{rows::ParamRaw, TableInfo};

    use super::*;

    #[test]
    fn bounds_are_validated_up_front() {
        let info = Arc::new(TableInfo::with_counts(&[], false, false, false));

        // Param rows are 6 bytes narrow; 11 bytes cannot hold two rows
        let data = [0u8; 11];
        assert!(MetadataTable::<ParamRaw>::new(&data, 2, info.clone()).is_err());

        let data = [0u8; 12];
        let table = MetadataTable::<ParamRaw>::new(&data, 2, info).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.size(), 12);
    }

    #[test]
    fn get_is_one_based() {
        let info = Arc::new(TableInfo::with_counts(&[], false, false, false));
        #[rustfmt::skip]
        let data = [
            0x10, 0x00, 0x01, 0x00, 0x05, 0x00, // row 1
            0x20, 0x00, 0x02, 0x00, 0x09, 0x00, // row 2
        ];

        let table = MetadataTable::<ParamRaw>::new(&data, 2, info).unwrap();
        assert!(table.get(0).unwrap().is_none());
        assert_eq!(table.get(1).unwrap().unwrap().sequence, 1);
        assert_eq!(table.get(2).unwrap().unwrap().sequence, 2);
        assert!(table.get(3).unwrap().is_none());

        let sequences: Vec<u16> = table.iter().map(|r| r.unwrap().sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }
}
