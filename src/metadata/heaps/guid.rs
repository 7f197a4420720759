//! GUID Heap (`#GUID`): a sequence of 16-byte records with 1-based indexing.
//!
//! Module version identifiers (Mvid) and edit-and-continue ids live here.
//! Index 0 denotes "no GUID"; the first record has index 1.
//!
//! # Reference
//! - [ECMA-335 II.24.2.5](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{Error::ShortRead, Result};

/// Read view over a serialized `#GUID` heap.
///
/// # Examples
///
/// ```rust
/// use cilforge::metadata::heaps::Guid;
/// let data = &[0u8; 16];
/// let guids = Guid::from(data)?;
/// assert_eq!(guids.get(1)?, uguid::Guid::ZERO);
/// # Ok::<(), cilforge::Error>(())
/// ```
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Create a `Guid` view from a sequence of bytes
    ///
    /// ## Arguments
    /// * 'data' - The byte slice from which this view shall be created
    ///
    /// # Errors
    /// Returns an error if the heap is not a whole number of 16-byte records
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % 16 != 0 {
            return Err(corrupt_blob!("#GUID heap size {} is not a multiple of 16", data.len()));
        }

        Ok(Guid { data })
    }

    /// Number of records in the heap.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len() / 16
    }

    /// Returns the GUID at the specified 1-based index.
    ///
    /// ## Arguments
    /// * 'index' - The 1-based record index (comes from metadata tables)
    ///
    /// # Errors
    /// Returns [`ShortRead`] if the index is 0 or past the last record
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index < 1 || index * 16 > self.data.len() {
            return Err(ShortRead);
        }

        let start = (index - 1) * 16;
        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[start..start + 16]);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}

/// Append-only builder for the `#GUID` heap.
#[derive(Debug, Default)]
pub struct GuidBuilder {
    data: Vec<u8>,
}

impl GuidBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        GuidBuilder { data: Vec::new() }
    }

    /// Append a GUID record and return its 1-based index.
    ///
    /// ## Arguments
    /// * 'guid' - The 16-byte record to append
    #[allow(clippy::cast_possible_truncation)]
    pub fn add(&mut self, guid: uguid::Guid) -> u32 {
        self.data.extend_from_slice(&guid.to_bytes());
        (self.data.len() / 16) as u32
    }

    /// Current heap size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True once indices into this heap must be written as 4 bytes.
    #[must_use]
    pub fn is_large(&self) -> bool {
        super::is_large(self.data.len())
    }

    /// The serialized heap bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use uguid::guid;

    use super::*;

    #[test]
    fn view_indexing_is_one_based() {
        let mut data = vec![0u8; 32];
        data[16] = 0xAA;

        let view = Guid::from(&data).unwrap();
        assert_eq!(view.count(), 2);
        assert_eq!(view.get(1).unwrap(), uguid::Guid::ZERO);
        assert_eq!(view.get(2).unwrap().to_bytes()[0], 0xAA);

        assert!(view.get(0).is_err());
        assert!(view.get(3).is_err());
    }

    #[test]
    fn view_rejects_partial_record() {
        assert!(Guid::from(&[0u8; 17]).is_err());
    }

    #[test]
    fn builder_assigns_sequential_indices() {
        let mut builder = GuidBuilder::new();

        let mvid = guid!("01020304-0506-0708-090a-0b0c0d0e0f10");
        assert_eq!(builder.add(mvid), 1);
        assert_eq!(builder.add(uguid::Guid::ZERO), 2);

        let view = Guid::from(builder.as_slice()).unwrap();
        assert_eq!(view.get(1).unwrap(), mvid);
    }
}
