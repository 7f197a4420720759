//! Metadata root header and stream directory (ECMA-335 II.24.2.1).
//!
//! The root is the entry point of a serialized metadata section: the BSJB
//! signature, a length-prefixed version string, and the directory naming
//! every stream with its offset and size relative to the root.

use crate::{
    file::io::{read_le, read_le_at},
    file::Writer,
    Error::ShortRead,
    Result,
};

/// The magic value opening a CLI metadata root ("BSJB").
pub const METADATA_SIGNATURE: u32 = 0x424A_5342;

/// One entry of the stream directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Byte offset of the stream, relative to the start of the root
    pub offset: u32,
    /// Byte size of the stream
    pub size: u32,
    /// Stream name, e.g. `#~` or `#Strings`
    pub name: String,
}

/// The parsed metadata root: version fields plus the stream directory.
///
/// # Example
///
/// ```rust
/// use cilforge::metadata::streams::Root;
///
/// let image = Root::write("v4.0.30319", &[("#~", &[0u8; 4])])?;
/// let root = Root::read(&image)?;
/// assert_eq!(root.version, "v4.0.30319");
/// assert!(root.stream("#~").is_some());
/// # Ok::<(), cilforge::Error>(())
/// ```
#[derive(Debug)]
pub struct Root {
    /// `MajorVersion`, written as 1
    pub major_version: u16,
    /// `MinorVersion`, written as 1
    pub minor_version: u16,
    /// The version string, without padding or terminator
    pub version: String,
    /// Reserved flags, written as 0
    pub flags: u16,
    /// The stream directory
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse a metadata root from a byte slice.
    ///
    /// ## Arguments
    /// * 'data' - A buffer starting at the BSJB signature
    ///
    /// # Errors
    /// Returns an error if the signature does not match, the version string
    /// or directory is malformed, or the buffer is truncated
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(ShortRead);
        }

        let signature = read_le::<u32>(data)?;
        if signature != METADATA_SIGNATURE {
            return Err(corrupt_blob!(
                "metadata signature {:#010x} does not match BSJB",
                signature
            ));
        }

        let mut offset = 4;
        let major_version = read_le_at::<u16>(data, &mut offset)?;
        let minor_version = read_le_at::<u16>(data, &mut offset)?;
        let _reserved = read_le_at::<u32>(data, &mut offset)?;

        let version_length = read_le_at::<u32>(data, &mut offset)? as usize;
        if version_length > 255 {
            return Err(corrupt_blob!(
                "version string length {} exceeds the format limit",
                version_length
            ));
        }
        if offset + version_length > data.len() {
            return Err(ShortRead);
        }

        let version_bytes = &data[offset..offset + version_length];
        let terminator = version_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(version_length);
        let version = std::str::from_utf8(&version_bytes[..terminator])
            .map_err(|_| corrupt_blob!("version string is not UTF-8"))?
            .to_string();
        offset += version_length;

        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 || stream_count > 6 {
            return Err(corrupt_blob!("stream count {} is out of range", stream_count));
        }

        let mut stream_headers = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            let stream_offset = read_le_at::<u32>(data, &mut offset)?;
            let stream_size = read_le_at::<u32>(data, &mut offset)?;

            let name_start = offset;
            let mut name_end = offset;
            while name_end < data.len() && data[name_end] != 0 {
                name_end += 1;
            }
            if name_end >= data.len() || name_end - name_start > 31 {
                return Err(corrupt_blob!("unterminated stream name in directory"));
            }

            let name = std::str::from_utf8(&data[name_start..name_end])
                .map_err(|_| corrupt_blob!("stream name is not UTF-8"))?
                .to_string();

            // Names pad with zeros to the next 4-byte boundary
            offset = name_start + (name.len() / 4 + 1) * 4;

            let end = stream_offset
                .checked_add(stream_size)
                .ok_or_else(|| corrupt_blob!("stream '{}' overflows the root", name))?;
            if end as usize > data.len() {
                return Err(ShortRead);
            }

            stream_headers.push(StreamHeader {
                offset: stream_offset,
                size: stream_size,
                name,
            });
        }

        Ok(Root {
            major_version,
            minor_version,
            version,
            flags,
            stream_headers,
        })
    }

    /// Look up a stream by name.
    ///
    /// ## Arguments
    /// * 'name' - The stream name, e.g. `#Strings`
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }

    /// Serialize a metadata root holding the given streams.
    ///
    /// Each stream lands 4-aligned; directory offsets are relative to the
    /// start of the returned buffer.
    ///
    /// ## Arguments
    /// * 'version' - The runtime version string, e.g. `v4.0.30319`
    /// * 'streams' - (name, content) pairs in directory order
    ///
    /// # Errors
    /// Returns an error if a stream exceeds the u32 size range
    #[allow(clippy::cast_possible_truncation)]
    pub fn write(version: &str, streams: &[(&str, &[u8])]) -> Result<Vec<u8>> {
        let version_padded = (version.len() + 1).div_ceil(4) * 4;

        // Directory entries carry their name zero-padded to 4 bytes
        let directory_size: usize = streams
            .iter()
            .map(|(name, _)| 8 + (name.len() / 4 + 1) * 4)
            .sum();
        let header_size = 16 + version_padded + 4 + directory_size;

        let mut writer = Writer::with_capacity(
            header_size + streams.iter().map(|(_, data)| data.len() + 3).sum::<usize>(),
        );

        writer.write_u32(METADATA_SIGNATURE);
        writer.write_u16(1); // MajorVersion
        writer.write_u16(1); // MinorVersion
        writer.write_u32(0); // Reserved
        writer.write_u32(version_padded as u32);
        writer.write_bytes(version.as_bytes());
        for _ in version.len()..version_padded {
            writer.write_u8(0);
        }
        writer.write_u16(0); // Flags
        writer.write_u16(streams.len() as u16);

        let mut stream_offset = header_size;
        for (name, data) in streams {
            if u32::try_from(data.len()).is_err() {
                return Err(crate::Error::ShortWrite);
            }

            writer.write_u32(stream_offset as u32);
            writer.write_u32(data.len() as u32);
            writer.write_bytes(name.as_bytes());
            for _ in name.len()..(name.len() / 4 + 1) * 4 {
                writer.write_u8(0);
            }

            stream_offset += data.len().div_ceil(4) * 4;
        }

        for (_, data) in streams {
            writer.write_bytes(data);
            writer.align(4, 0);
        }

        Ok(writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted_read() {
        let root = Root::read(&[
            0x42, 0x53, 0x4A, 0x42, // BSJB
            0x01, 0x00, // major
            0x01, 0x00, // minor
            0x00, 0x00, 0x00, 0x00, // reserved
            0x04, 0x00, 0x00, 0x00, // version length
            b'v', b'4', b'.', 0x00, // version
            0x00, 0x00, // flags
            0x01, 0x00, // one stream
            0x24, 0x00, 0x00, 0x00, // offset
            0x04, 0x00, 0x00, 0x00, // size
            0x23, 0x7E, 0x00, 0x00, // "#~"
            0xAA, 0xBB, 0xCC, 0xDD, // stream content
        ])
        .unwrap();

        assert_eq!(root.version, "v4.");
        assert_eq!(root.stream_headers.len(), 1);
        assert_eq!(root.stream("#~").unwrap().offset, 0x24);
        assert_eq!(root.stream("#~").unwrap().size, 4);
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut data = vec![0u8; 32];
        data[0] = 0x42;
        assert!(Root::read(&data).is_err());
    }

    #[test]
    fn write_read_round_trip() {
        let strings = [0u8, b'a', 0u8];
        let tables = [1u8, 2, 3, 4, 5];
        let image = Root::write(
            "v4.0.30319",
            &[("#~", &tables[..]), ("#Strings", &strings[..])],
        )
        .unwrap();

        let root = Root::read(&image).unwrap();
        assert_eq!(root.version, "v4.0.30319");
        assert_eq!(root.stream_headers.len(), 2);

        let tables_header = root.stream("#~").unwrap();
        assert_eq!(
            &image[tables_header.offset as usize..(tables_header.offset + tables_header.size) as usize],
            &tables
        );

        let strings_header = root.stream("#Strings").unwrap();
        // Streams land 4-aligned
        assert_eq!(strings_header.offset % 4, 0);
        assert_eq!(
            &image[strings_header.offset as usize..(strings_header.offset + strings_header.size) as usize],
            &strings
        );
    }
}
