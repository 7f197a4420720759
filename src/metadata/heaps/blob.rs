//! Blob Heap (`#Blob`): length-prefixed opaque byte sequences.
//!
//! Signatures, constant values, public keys and marshalling descriptors are
//! stored here as `compressed_length | bytes`. The builder deduplicates by
//! content so equal blobs share one offset.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use rustc_hash::FxHashMap;

use crate::{file::Parser, file::Writer, Error::ShortRead, Result};

/// Read view over a serialized `#Blob` heap.
///
/// # Examples
///
/// ```rust
/// use cilforge::metadata::heaps::Blob;
/// let data = &[0u8, 0x03, 0x41, 0x42, 0x43];
/// let blob = Blob::from(data)?;
/// assert_eq!(blob.get(1)?, &[0x41, 0x42, 0x43]);
/// # Ok::<(), cilforge::Error>(())
/// ```
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Create a `Blob` view from a sequence of bytes
    ///
    /// ## Arguments
    /// * 'data' - The byte slice from which this view shall be created
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the
    /// reserved zero byte
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(corrupt_blob!("#Blob heap must start with a zero byte"));
        }

        Ok(Blob { data })
    }

    /// Get the blob starting at the provided heap offset.
    ///
    /// ## Arguments
    /// * 'index' - The offset within the heap (comes from metadata tables)
    ///
    /// # Errors
    /// Returns an error if the offset is out of bounds, the length prefix is
    /// malformed, or the declared length exceeds the heap
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(ShortRead);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let length = parser.read_compressed_uint()? as usize;

        let data_start = index + parser.pos();
        let Some(data_end) = data_start.checked_add(length) else {
            return Err(corrupt_blob!("blob length overflow at offset {}", index));
        };

        if data_end > self.data.len() {
            return Err(corrupt_blob!(
                "blob length {} exceeds heap bounds at offset {}",
                length,
                index
            ));
        }

        Ok(&self.data[data_start..data_end])
    }
}

/// Append-only builder for the `#Blob` heap, deduplicated by content.
#[derive(Debug, Default)]
pub struct BlobBuilder {
    data: Vec<u8>,
    interned: FxHashMap<Vec<u8>, u32>,
}

impl BlobBuilder {
    /// Create a builder holding only the reserved leading zero byte.
    #[must_use]
    pub fn new() -> Self {
        BlobBuilder {
            data: vec![0],
            interned: FxHashMap::default(),
        }
    }

    /// Intern a blob and return its heap offset.
    ///
    /// Equal byte sequences share one offset; the empty blob maps to the
    /// reserved offset 0.
    ///
    /// ## Arguments
    /// * 'bytes' - The blob content, without length prefix
    ///
    /// # Errors
    /// Returns [`crate::Error::SignatureTooLarge`] for blobs past the
    /// compressed length limit
    #[allow(clippy::cast_possible_truncation)]
    pub fn intern(&mut self, bytes: &[u8]) -> Result<u32> {
        if bytes.is_empty() {
            return Ok(0);
        }

        if let Some(&offset) = self.interned.get(bytes) {
            return Ok(offset);
        }

        let offset = self.data.len() as u32;
        let mut prefix = Writer::new();
        prefix.write_compressed_uint(bytes.len() as u32)?;

        self.data.extend_from_slice(prefix.as_slice());
        self.data.extend_from_slice(bytes);
        self.interned.insert(bytes.to_vec(), offset);

        Ok(offset)
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

    /// The serialized heap bytes, without stream-level alignment padding.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted_view() {
        #[rustfmt::skip]
        let data = {
            let mut data = vec![0u8; 280];
            /* offset 1  - len 10  */ data[1] = 0x0A;
            /* offset 1  - payload */ data[2..12].copy_from_slice(&[0x0A; 10]);
            /* offset 12 - len 5   */ data[12] = 0x05;
            /* offset 12 - payload */ data[13..18].copy_from_slice(&[0xAB; 5]);
            /* offset 18 - invalid */ data[18] = 0xFF;
            /* offset 19 - len 257 */ data[19] = 0x81;
            /* offset 19 - len 257 */ data[20] = 0x01;
            /* offset 19 - payload */ data[21..278].copy_from_slice(&[0xBA; 257]);
            data
        };

        let blob = Blob::from(&data).unwrap();

        assert_eq!(blob.get(0).unwrap().len(), 0);
        assert_eq!(blob.get(1).unwrap(), &[0x0A; 10]);
        assert_eq!(blob.get(12).unwrap(), &[0xAB; 5]);
        assert!(blob.get(18).is_err());
        assert_eq!(blob.get(19).unwrap(), &[0xBA; 257][..]);
    }

    #[test]
    fn view_rejects_overlong_entry() {
        // Declared length 0x20 with only 2 bytes of payload present
        let data = [0x00, 0x20, 0x01, 0x02];
        let blob = Blob::from(&data).unwrap();
        assert!(blob.get(1).is_err());
    }

    #[test]
    fn builder_dedups() {
        let mut builder = BlobBuilder::new();

        let first = builder.intern(&[1, 2, 3, 4, 5]).unwrap();
        let size_after_first = builder.size();
        let second = builder.intern(&[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(first, second);
        // Heap grew once, by len_prefix + 5
        assert_eq!(size_after_first, builder.size());
        assert_eq!(builder.size(), 1 + 1 + 5);
    }

    #[test]
    fn builder_empty_blob() {
        let mut builder = BlobBuilder::new();
        assert_eq!(builder.intern(&[]).unwrap(), 0);
        assert_eq!(builder.size(), 1);
    }

    #[test]
    fn builder_round_trips_through_view() {
        let mut builder = BlobBuilder::new();
        let offset = builder.intern(&[0x06, 0x08]).unwrap();

        let view = Blob::from(builder.as_slice()).unwrap();
        assert_eq!(view.get(offset as usize).unwrap(), &[0x06, 0x08]);
    }
}
