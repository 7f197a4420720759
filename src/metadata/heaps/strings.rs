//! String Heap (`#Strings`): null-terminated UTF-8 identifier strings.
//!
//! Identifiers referenced from metadata tables (type names, member names,
//! namespaces) live here. Offset 0 is the reserved leading zero byte and
//! doubles as the "empty string" index.
//!
//! # Reference
//! - [ECMA-335 II.24.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::ffi::CStr;

use rustc_hash::FxHashMap;

use crate::{Error::ShortRead, Result};

/// Read view over a serialized `#Strings` heap.
///
/// # Examples
///
/// ```rust
/// use cilforge::metadata::heaps::Strings;
/// let data = &[0u8, b'H', b'e', b'l', b'l', b'o', 0u8];
/// let strings = Strings::from(data)?;
/// assert_eq!(strings.get(1)?, "Hello");
/// # Ok::<(), cilforge::Error>(())
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Create a `Strings` view from a sequence of bytes
    ///
    /// ## Arguments
    /// * 'data' - The byte slice from which this view shall be created
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the
    /// reserved zero byte
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(corrupt_blob!("#Strings heap must start with a zero byte"));
        }

        Ok(Strings { data })
    }

    /// Get the string starting at the provided heap offset.
    ///
    /// ## Arguments
    /// * 'index' - The offset within the heap (comes from metadata tables)
    ///
    /// # Errors
    /// Returns an error if the index is out of bounds, unterminated, or the
    /// bytes are not valid UTF-8
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(ShortRead);
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => result
                .to_str()
                .map_err(|_| corrupt_blob!("invalid UTF-8 string at offset {}", index)),
            Err(_) => Err(corrupt_blob!("unterminated string at offset {}", index)),
        }
    }
}

/// Append-only builder for the `#Strings` heap with exact-byte interning.
///
/// Appending the same string twice returns the offset of the first append;
/// the empty string always maps to the reserved offset 0.
#[derive(Debug, Default)]
pub struct StringsBuilder {
    data: Vec<u8>,
    interned: FxHashMap<String, u32>,
}

impl StringsBuilder {
    /// Create a builder holding only the reserved leading zero byte.
    #[must_use]
    pub fn new() -> Self {
        StringsBuilder {
            data: vec![0],
            interned: FxHashMap::default(),
        }
    }

    /// Intern a string and return its heap offset.
    ///
    /// Returns 0 for the empty string. For any other value the offset of the
    /// first equal append is returned; a fresh value lands at the current
    /// heap size and grows the heap by `len(utf8) + 1` bytes.
    ///
    /// ## Arguments
    /// * 's' - The identifier to intern
    #[allow(clippy::cast_possible_truncation)]
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        if let Some(&offset) = self.interned.get(s) {
            return offset;
        }

        let offset = self.data.len() as u32;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.interned.insert(s.to_string(), offset);

        offset
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
        let data: [u8; 24] = [
            0x00,
            0x3c, 0x4d, 0x6f, 0x64, 0x75, 0x6c, 0x65, 0x3e, 0x00,
            0x53, 0x79, 0x73, 0x74, 0x65, 0x6d, 0x00,
            0x4f, 0x62, 0x6a, 0x65, 0x63, 0x74, 0x00,
        ];

        let view = Strings::from(&data).unwrap();
        assert_eq!(view.get(1).unwrap(), "<Module>");
        assert_eq!(view.get(10).unwrap(), "System");
        assert_eq!(view.get(17).unwrap(), "Object");
        assert_eq!(view.get(0).unwrap(), "");
        assert!(view.get(24).is_err());
    }

    #[test]
    fn invalid_view() {
        assert!(Strings::from(&[]).is_err());
        assert!(Strings::from(&[0x41, 0x00]).is_err());
    }

    #[test]
    fn builder_interns() {
        let mut builder = StringsBuilder::new();

        assert_eq!(builder.intern(""), 0);
        assert_eq!(builder.size(), 1);

        let a = builder.intern("Alpha");
        assert_eq!(a, 1);
        assert_eq!(builder.size(), 7);

        let b = builder.intern("Beta");
        assert_eq!(b, 7);

        // Equal keys return the original offset without growth
        assert_eq!(builder.intern("Alpha"), a);
        assert_eq!(builder.size(), 12);
    }

    #[test]
    fn builder_round_trips_through_view() {
        let mut builder = StringsBuilder::new();
        let offset = builder.intern("MyClass");

        let view = Strings::from(builder.as_slice()).unwrap();
        assert_eq!(view.get(offset as usize).unwrap(), "MyClass");
    }
}
