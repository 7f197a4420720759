//! Endian-aware safe reading of primitive types from byte slices.
//!
//! This module provides the [`CilIO`] trait plus free functions for bounds
//! checked little-endian access. It is used throughout the stream readers to
//! ensure truncated input surfaces as [`ShortRead`] instead of a panic.

use crate::{
    Error::{ShortRead, ShortWrite},
    Result,
};

/// Trait abstracting over primitive types that can be read from and written
/// to little-endian byte buffers.
///
/// Implemented for the integer and float widths that occur in CLI metadata
/// structures.
pub trait CilIO: Sized + Copy {
    #[allow(missing_docs)]
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]> + AsRef<[u8]>;

    /// Decode `Self` from its little-endian byte representation
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Encode `Self` into its little-endian byte representation
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($t:ty),*) => {
        $(
            impl CilIO for $t {
                type Bytes = [u8; std::mem::size_of::<$t>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$t>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Safely read T in little-endian from the start of a data stream.
///
/// ## Arguments
/// * 'data' - The data buffer / stream to read from
///
/// # Errors
/// Returns [`ShortRead`] if the buffer holds fewer bytes than `T` needs
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely read T in little-endian from an offset within a data stream.
///
/// ## Arguments
/// * 'data'    - The data buffer / stream to read from
/// * 'offset'  - An offset to read from, advanced by the amount of bytes read
///
/// # Errors
/// Returns [`ShortRead`] if the read would run past the end of the buffer
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if type_len + *offset > data.len() {
        return Err(ShortRead);
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(ShortRead);
    };

    *offset += type_len;

    Ok(T::from_le_bytes(read))
}

/// Safely read 4 or 2 bytes in little-endian, widened to `u32`.
///
/// ## Arguments
/// * 'data'        - The data buffer / stream to read from
/// * 'offset'      - An offset to read from, advanced by the amount of bytes read
/// * `is_large`    - Indicates if 4 or 2 bytes should be read
///
/// # Errors
/// Returns [`ShortRead`] if the read would run past the end of the buffer
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

/// Safely write T in little-endian at an offset within a data stream.
///
/// ## Arguments
/// * 'data'    - The mutable buffer to write into
/// * 'offset'  - An offset to write at, advanced by the amount of bytes written
/// * 'value'   - The value to write
///
/// # Errors
/// Returns [`ShortWrite`] if the write would run past the end of the buffer
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let type_len = bytes.as_ref().len();
    if type_len + *offset > data.len() {
        return Err(ShortWrite);
    }

    data[*offset..*offset + type_len].copy_from_slice(bytes.as_ref());
    *offset += type_len;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_u8() {
        let result = read_le::<u8>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x01);
    }

    #[test]
    fn read_le_u16() {
        let result = read_le::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0201);
    }

    #[test]
    fn read_le_u32() {
        let result = read_le::<u32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0403_0201);
    }

    #[test]
    fn read_le_u64() {
        let result = read_le::<u64>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0807_0605_0403_0201);
    }

    #[test]
    fn read_le_from_offset() {
        let mut offset = 2_usize;
        let result = read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(result, 0x0403);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_le_dyn() {
        let mut offset = 0;

        let res_1 = read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap();
        assert_eq!(res_1, 0x0403_0201);

        offset = 0;
        let res_2 = read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap();
        assert_eq!(res_2, 0x0201);
    }

    #[test]
    fn write_le_round_trip() {
        let mut buffer = [0u8; 8];
        let mut offset = 0;
        write_le_at::<u32>(&mut buffer, &mut offset, 0xDEAD_BEEF).unwrap();
        write_le_at::<u16>(&mut buffer, &mut offset, 0x1234).unwrap();
        assert_eq!(offset, 6);

        let mut read_offset = 0;
        assert_eq!(read_le_at::<u32>(&buffer, &mut read_offset).unwrap(), 0xDEAD_BEEF);
        assert_eq!(read_le_at::<u16>(&buffer, &mut read_offset).unwrap(), 0x1234);
    }

    #[test]
    fn errors() {
        let buffer = [0xFF, 0xFF, 0xFF, 0xFF];

        let result = read_le::<u64>(&buffer);
        assert!(matches!(result, Err(ShortRead)));

        let mut out = [0u8; 2];
        let result = write_le_at::<u32>(&mut out, &mut 0, 1);
        assert!(matches!(result, Err(ShortWrite)));
    }
}
