//! User String Heap (`#US`): length-prefixed UTF-16 string literals.
//!
//! Each entry is `compressed_length | utf16le code units | terminal byte`,
//! where the length counts the UTF-16 bytes plus the terminal byte. The
//! terminal byte is 1 when any code unit carries a non-zero high byte or
//! falls into the designated low control set, 0 otherwise.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use rustc_hash::FxHashMap;
use widestring::U16Str;

use crate::{file::Parser, file::Writer, Error::ShortRead, Result};

/// Read view over a serialized `#US` heap.
///
/// # Examples
///
/// ```rust
/// use cilforge::metadata::heaps::UserStrings;
/// let data = &[0u8, 0x03, b'A', 0, 0];
/// let us = UserStrings::from(data)?;
/// assert_eq!(us.get(1)?.to_string_lossy(), "A");
/// # Ok::<(), cilforge::Error>(())
/// ```
pub struct UserStrings<'a> {
    data: &'a [u8],
}

impl<'a> UserStrings<'a> {
    /// Create a `UserStrings` view from a sequence of bytes
    ///
    /// ## Arguments
    /// * 'data' - The byte slice from which this view shall be created
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the
    /// reserved zero byte
    pub fn from(data: &'a [u8]) -> Result<UserStrings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(corrupt_blob!("#US heap must start with a zero byte"));
        }

        Ok(UserStrings { data })
    }

    /// Get the string entry at the provided heap offset.
    ///
    /// The returned slice covers the UTF-16 code units without the terminal
    /// byte.
    ///
    /// ## Arguments
    /// * 'index' - The offset within the heap (comes from `ldstr` tokens)
    ///
    /// # Errors
    /// Returns an error if the offset is out of bounds, the length prefix is
    /// malformed, or the entry is not a whole number of code units
    pub fn get(&self, index: usize) -> Result<&'a U16Str> {
        if index >= self.data.len() {
            return Err(ShortRead);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let length = parser.read_compressed_uint()? as usize;

        let data_start = index + parser.pos();
        let Some(data_end) = data_start.checked_add(length) else {
            return Err(corrupt_blob!("user string length overflow at offset {}", index));
        };
        if data_end > self.data.len() {
            return Err(corrupt_blob!(
                "user string length {} exceeds heap bounds at offset {}",
                length,
                index
            ));
        }

        // The terminal byte is not part of the character data
        let char_bytes = if length == 0 { 0 } else { length - 1 };
        if char_bytes % 2 != 0 {
            return Err(corrupt_blob!("user string at offset {} is not UTF-16 sized", index));
        }

        let code_units: &[u8] = &self.data[data_start..data_start + char_bytes];

        // View the little-endian code units as u16 without copying
        let slice = unsafe {
            #[allow(clippy::cast_ptr_alignment)]
            core::slice::from_raw_parts(code_units.as_ptr().cast::<u16>(), char_bytes / 2)
        };

        Ok(U16Str::from_slice(slice))
    }
}

/// Append-only builder for the `#US` heap with interning.
#[derive(Debug, Default)]
pub struct UserStringsBuilder {
    data: Vec<u8>,
    interned: FxHashMap<String, u32>,
}

impl UserStringsBuilder {
    /// Create a builder holding only the reserved leading zero byte.
    #[must_use]
    pub fn new() -> Self {
        UserStringsBuilder {
            data: vec![0],
            interned: FxHashMap::default(),
        }
    }

    /// Intern a string literal and return its heap offset.
    ///
    /// ## Arguments
    /// * 's' - The literal to intern
    ///
    /// # Errors
    /// Returns [`crate::Error::SignatureTooLarge`] if the encoded entry would
    /// exceed the compressed length range
    #[allow(clippy::cast_possible_truncation)]
    pub fn intern(&mut self, s: &str) -> Result<u32> {
        if let Some(&offset) = self.interned.get(s) {
            return Ok(offset);
        }

        let units: Vec<u16> = s.encode_utf16().collect();

        let offset = self.data.len() as u32;
        let mut writer = Writer::new();
        writer.write_compressed_uint((units.len() * 2 + 1) as u32)?;
        for unit in &units {
            writer.write_u16(*unit);
        }
        writer.write_u8(if units.iter().any(|&u| has_special_char(u)) {
            1
        } else {
            0
        });

        self.data.extend_from_slice(writer.as_slice());
        self.interned.insert(s.to_string(), offset);

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

/// II.24.2.4: code units that force the terminal byte to 1.
fn has_special_char(unit: u16) -> bool {
    matches!(unit, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F) || unit >= 0x80
}

#[cfg(test)]
mod tests {
    use widestring::u16str;

    use super::*;

    #[test]
    fn crafted_view() {
        #[rustfmt::skip]
        let data: [u8; 30] = [
            0x00, 0x1b, 0x48, 0x00, 0x65, 0x00, 0x6c, 0x00, 0x6c, 0x00, 0x6f, 0x00, 0x2c, 0x00,
            0x20, 0x00, 0x57, 0x00, 0x6f, 0x00, 0x72, 0x00, 0x6c, 0x00, 0x64, 0x00, 0x21, 0x00,
            0x00, 0x00,
        ];

        let view = UserStrings::from(&data).unwrap();
        assert_eq!(view.get(1).unwrap(), u16str!("Hello, World!"));
    }

    #[test]
    fn invalid_view() {
        assert!(UserStrings::from(&[]).is_err());
        assert!(UserStrings::from(&[0x22, 0x00]).is_err());

        // Length prefix runs past the heap
        let data = [0x00, 0xCC, 0xCC, 0xCC, 0xCC, 0xCC];
        let view = UserStrings::from(&data).unwrap();
        assert!(view.get(1).is_err());
    }

    #[test]
    fn builder_terminal_byte() {
        let mut builder = UserStringsBuilder::new();

        // Pure ASCII gets terminal byte 0
        let plain = builder.intern("AB").unwrap() as usize;
        assert_eq!(&builder.as_slice()[plain..plain + 6], &[0x05, 0x41, 0x00, 0x42, 0x00, 0x00]);

        // A code unit with a non-zero high byte flips it to 1
        let wide = builder.intern("\u{4E2D}").unwrap() as usize;
        assert_eq!(builder.as_slice()[wide], 0x03);
        assert_eq!(builder.as_slice()[wide + 3], 0x01);

        // The designated low set also flips it
        let apostrophe = builder.intern("'").unwrap() as usize;
        assert_eq!(builder.as_slice()[apostrophe + 3], 0x01);
    }

    #[test]
    fn builder_interns_and_round_trips() {
        let mut builder = UserStringsBuilder::new();
        let first = builder.intern("Hello").unwrap();
        let second = builder.intern("Hello").unwrap();
        assert_eq!(first, second);

        let view = UserStrings::from(builder.as_slice()).unwrap();
        assert_eq!(view.get(first as usize).unwrap().to_string_lossy(), "Hello");
    }
}
