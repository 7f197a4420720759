//! Native-type marshalling descriptors (`FieldMarshal` blobs).
//!
//! Marshalling descriptors tell the interop layer how a managed field or
//! parameter converts to its unmanaged shape. A descriptor is a native-type
//! byte followed by kind-specific parameters: size counts, parameter
//! indices, an element descriptor for arrays, or the four strings of a
//! custom marshaler.
//!
//! # Reference
//! - [ECMA-335 II.23.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::Parser, file::Writer, Result};

#[allow(non_snake_case)]
/// Native type constants as defined in ECMA-335 II.23.4 and the CoreCLR
/// extensions.
pub mod NATIVE_TYPE {
    /// End of a descriptor
    pub const END: u8 = 0x00;
    /// No type / void
    pub const VOID: u8 = 0x01;
    /// 1-byte boolean
    pub const BOOLEAN: u8 = 0x02;
    /// Signed 8-bit integer
    pub const I1: u8 = 0x03;
    /// Unsigned 8-bit integer
    pub const U1: u8 = 0x04;
    /// Signed 16-bit integer
    pub const I2: u8 = 0x05;
    /// Unsigned 16-bit integer
    pub const U2: u8 = 0x06;
    /// Signed 32-bit integer
    pub const I4: u8 = 0x07;
    /// Unsigned 32-bit integer
    pub const U4: u8 = 0x08;
    /// Signed 64-bit integer
    pub const I8: u8 = 0x09;
    /// Unsigned 64-bit integer
    pub const U8: u8 = 0x0a;
    /// 32-bit float
    pub const R4: u8 = 0x0b;
    /// 64-bit float
    pub const R8: u8 = 0x0c;
    /// Platform character
    pub const SYSCHAR: u8 = 0x0d;
    /// COM VARIANT
    pub const VARIANT: u8 = 0x0e;
    /// OLE currency
    pub const CURRENCY: u8 = 0x0f;
    /// Raw pointer
    pub const PTR: u8 = 0x10;
    /// .NET decimal
    pub const DECIMAL: u8 = 0x11;
    /// OLE date
    pub const DATE: u8 = 0x12;
    /// OLE BSTR
    pub const BSTR: u8 = 0x13;
    /// Null-terminated ANSI string
    pub const LPSTR: u8 = 0x14;
    /// Null-terminated UTF-16 string
    pub const LPWSTR: u8 = 0x15;
    /// Null-terminated platform string
    pub const LPTSTR: u8 = 0x16;
    /// Fixed-length system string
    pub const FIXEDSYSSTRING: u8 = 0x17;
    /// IUnknown interface pointer
    pub const IUNKNOWN: u8 = 0x19;
    /// IDispatch interface pointer
    pub const IDISPATCH: u8 = 0x1a;
    /// Native struct
    pub const STRUCT: u8 = 0x1b;
    /// COM interface pointer
    pub const INTERFACE: u8 = 0x1c;
    /// COM safe array
    pub const SAFEARRAY: u8 = 0x1d;
    /// Fixed-size array
    pub const FIXEDARRAY: u8 = 0x1e;
    /// Platform-sized signed integer
    pub const INT: u8 = 0x1f;
    /// Platform-sized unsigned integer
    pub const UINT: u8 = 0x20;
    /// By-value fixed string
    pub const BYVALSTR: u8 = 0x22;
    /// ANSI BSTR
    pub const ANSIBSTR: u8 = 0x23;
    /// Platform BSTR
    pub const TBSTR: u8 = 0x24;
    /// 16-bit VARIANT_BOOL
    pub const VARIANTBOOL: u8 = 0x25;
    /// Function pointer
    pub const FUNC: u8 = 0x26;
    /// Marshal as any
    pub const ASANY: u8 = 0x28;
    /// Variable-size array
    pub const ARRAY: u8 = 0x2a;
    /// Pointer to struct
    pub const LPSTRUCT: u8 = 0x2b;
    /// User-supplied marshaler
    pub const CUSTOMMARSHALER: u8 = 0x2c;
    /// HRESULT / SCODE
    pub const ERROR: u8 = 0x2d;
    /// IInspectable interface pointer (WinRT)
    pub const IINSPECTABLE: u8 = 0x2e;
    /// HSTRING (WinRT)
    pub const HSTRING: u8 = 0x2f;
    /// Null-terminated UTF-8 string
    pub const LPUTF8STR: u8 = 0x30;
}

/// A decoded marshalling descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    /// No type / void
    Void,
    /// 1-byte boolean
    Boolean,
    /// Signed 8-bit integer
    I1,
    /// Unsigned 8-bit integer
    U1,
    /// Signed 16-bit integer
    I2,
    /// Unsigned 16-bit integer
    U2,
    /// Signed 32-bit integer
    I4,
    /// Unsigned 32-bit integer
    U4,
    /// Signed 64-bit integer
    I8,
    /// Unsigned 64-bit integer
    U8,
    /// 32-bit float
    R4,
    /// 64-bit float
    R8,
    /// Platform character
    SysChar,
    /// COM VARIANT
    Variant,
    /// OLE currency
    Currency,
    /// .NET decimal
    Decimal,
    /// OLE date
    Date,
    /// Platform-sized signed integer
    Int,
    /// Platform-sized unsigned integer
    UInt,
    /// HRESULT / SCODE
    Error,
    /// OLE BSTR
    BStr,
    /// ANSI BSTR
    AnsiBStr,
    /// Platform BSTR
    TBStr,
    /// 16-bit VARIANT_BOOL
    VariantBool,
    /// Function pointer
    Func,
    /// Marshal as any
    AsAny,
    /// Native struct
    Struct,
    /// COM interface pointer
    Interface,
    /// IUnknown interface pointer
    IUnknown,
    /// IDispatch interface pointer
    IDispatch,
    /// IInspectable interface pointer
    IInspectable,
    /// WinRT HSTRING
    HString,
    /// Pointer to struct
    LPStruct,
    /// Raw pointer
    Ptr,
    /// Null-terminated ANSI string with optional length parameter index
    LPStr {
        /// Index of the parameter carrying the string length, if any
        size_param_index: Option<u32>,
    },
    /// Null-terminated UTF-16 string with optional length parameter index
    LPWStr {
        /// Index of the parameter carrying the string length, if any
        size_param_index: Option<u32>,
    },
    /// Null-terminated platform string with optional length parameter index
    LPTStr {
        /// Index of the parameter carrying the string length, if any
        size_param_index: Option<u32>,
    },
    /// Null-terminated UTF-8 string with optional length parameter index
    LPUtf8Str {
        /// Index of the parameter carrying the string length, if any
        size_param_index: Option<u32>,
    },
    /// Fixed-length system string embedded in a struct
    FixedSysString {
        /// Buffer size in characters
        size: u32,
    },
    /// By-value fixed string embedded in a struct
    ByValStr {
        /// Buffer size in characters
        size: u32,
    },
    /// Fixed-size array embedded in a struct
    FixedArray {
        /// Element count
        size: u32,
        /// Element descriptor, if declared
        element_type: Option<Box<NativeType>>,
    },
    /// Variable-size array
    Array {
        /// Element descriptor
        element_type: Box<NativeType>,
        /// Index of the parameter carrying the element count, if any
        num_param: Option<u32>,
        /// Fixed element count, if any
        num_element: Option<u32>,
    },
    /// COM safe array
    SafeArray {
        /// VARIANT element type, if declared
        variant_type: Option<u32>,
        /// User-defined element type name, if declared
        user_defined_name: Option<String>,
    },
    /// User-supplied marshaler, named by four strings
    CustomMarshaler {
        /// GUID string (historical, usually empty)
        guid: String,
        /// Unmanaged type name (historical, usually empty)
        native_type_name: String,
        /// Assembly-qualified marshaler type name
        marshaler_type: String,
        /// Cookie string handed to the marshaler
        cookie: String,
    },
}

/// Decoder for marshalling descriptor blobs.
pub struct MarshallingParser<'a> {
    parser: Parser<'a>,
}

impl<'a> MarshallingParser<'a> {
    /// Create a parser over a descriptor blob
    ///
    /// ## Arguments
    /// * 'data' - The blob content
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        MarshallingParser {
            parser: Parser::new(data),
        }
    }

    fn read_prefixed_string(&mut self) -> Result<String> {
        let length = self.parser.read_compressed_uint()? as usize;
        let mut bytes = Vec::with_capacity(length);
        for _ in 0..length {
            bytes.push(self.parser.read_le::<u8>()?);
        }

        String::from_utf8(bytes)
            .map_err(|_| corrupt_blob!("marshalling descriptor string is not UTF-8"))
    }

    fn read_optional_uint(&mut self) -> Result<Option<u32>> {
        if self.parser.has_more_data() {
            Ok(Some(self.parser.read_compressed_uint()?))
        } else {
            Ok(None)
        }
    }

    /// Decode one native type, consuming its parameters.
    ///
    /// # Errors
    /// Returns an error for unknown native type bytes or truncated
    /// parameters
    pub fn parse_native_type(&mut self) -> Result<NativeType> {
        let type_byte = self.parser.read_le::<u8>()?;

        let native = match type_byte {
            NATIVE_TYPE::VOID => NativeType::Void,
            NATIVE_TYPE::BOOLEAN => NativeType::Boolean,
            NATIVE_TYPE::I1 => NativeType::I1,
            NATIVE_TYPE::U1 => NativeType::U1,
            NATIVE_TYPE::I2 => NativeType::I2,
            NATIVE_TYPE::U2 => NativeType::U2,
            NATIVE_TYPE::I4 => NativeType::I4,
            NATIVE_TYPE::U4 => NativeType::U4,
            NATIVE_TYPE::I8 => NativeType::I8,
            NATIVE_TYPE::U8 => NativeType::U8,
            NATIVE_TYPE::R4 => NativeType::R4,
            NATIVE_TYPE::R8 => NativeType::R8,
            NATIVE_TYPE::SYSCHAR => NativeType::SysChar,
            NATIVE_TYPE::VARIANT => NativeType::Variant,
            NATIVE_TYPE::CURRENCY => NativeType::Currency,
            NATIVE_TYPE::DECIMAL => NativeType::Decimal,
            NATIVE_TYPE::DATE => NativeType::Date,
            NATIVE_TYPE::INT => NativeType::Int,
            NATIVE_TYPE::UINT => NativeType::UInt,
            NATIVE_TYPE::ERROR => NativeType::Error,
            NATIVE_TYPE::BSTR => NativeType::BStr,
            NATIVE_TYPE::ANSIBSTR => NativeType::AnsiBStr,
            NATIVE_TYPE::TBSTR => NativeType::TBStr,
            NATIVE_TYPE::VARIANTBOOL => NativeType::VariantBool,
            NATIVE_TYPE::FUNC => NativeType::Func,
            NATIVE_TYPE::ASANY => NativeType::AsAny,
            NATIVE_TYPE::STRUCT => NativeType::Struct,
            NATIVE_TYPE::INTERFACE => NativeType::Interface,
            NATIVE_TYPE::IUNKNOWN => NativeType::IUnknown,
            NATIVE_TYPE::IDISPATCH => NativeType::IDispatch,
            NATIVE_TYPE::IINSPECTABLE => NativeType::IInspectable,
            NATIVE_TYPE::HSTRING => NativeType::HString,
            NATIVE_TYPE::LPSTRUCT => NativeType::LPStruct,
            NATIVE_TYPE::PTR => NativeType::Ptr,
            NATIVE_TYPE::LPSTR => NativeType::LPStr {
                size_param_index: self.read_optional_uint()?,
            },
            NATIVE_TYPE::LPWSTR => NativeType::LPWStr {
                size_param_index: self.read_optional_uint()?,
            },
            NATIVE_TYPE::LPTSTR => NativeType::LPTStr {
                size_param_index: self.read_optional_uint()?,
            },
            NATIVE_TYPE::LPUTF8STR => NativeType::LPUtf8Str {
                size_param_index: self.read_optional_uint()?,
            },
            NATIVE_TYPE::FIXEDSYSSTRING => NativeType::FixedSysString {
                size: self.parser.read_compressed_uint()?,
            },
            NATIVE_TYPE::BYVALSTR => NativeType::ByValStr {
                size: self.parser.read_compressed_uint()?,
            },
            NATIVE_TYPE::FIXEDARRAY => {
                let size = self.parser.read_compressed_uint()?;
                let element_type = if self.parser.has_more_data() {
                    Some(Box::new(self.parse_native_type()?))
                } else {
                    None
                };

                NativeType::FixedArray { size, element_type }
            }
            NATIVE_TYPE::ARRAY => {
                let element_type = Box::new(self.parse_native_type()?);
                let num_param = self.read_optional_uint()?;
                let num_element = self.read_optional_uint()?;

                NativeType::Array {
                    element_type,
                    num_param,
                    num_element,
                }
            }
            NATIVE_TYPE::SAFEARRAY => {
                let variant_type = self.read_optional_uint()?;
                let user_defined_name = if self.parser.has_more_data() {
                    Some(self.read_prefixed_string()?)
                } else {
                    None
                };

                NativeType::SafeArray {
                    variant_type,
                    user_defined_name,
                }
            }
            NATIVE_TYPE::CUSTOMMARSHALER => NativeType::CustomMarshaler {
                guid: self.read_prefixed_string()?,
                native_type_name: self.read_prefixed_string()?,
                marshaler_type: self.read_prefixed_string()?,
                cookie: self.read_prefixed_string()?,
            },
            _ => {
                return Err(corrupt_blob!("unknown native type {:#04x}", type_byte));
            }
        };

        Ok(native)
    }
}

/// Parse a complete marshalling descriptor blob.
///
/// ## Arguments
/// * 'data' - The blob content
///
/// # Errors
/// Returns an error for empty input, unknown native types or truncated
/// parameters
pub fn parse_marshalling_descriptor(data: &[u8]) -> Result<NativeType> {
    if data.is_empty() {
        return Err(corrupt_blob!("marshalling descriptor is empty"));
    }

    MarshallingParser::new(data).parse_native_type()
}

fn write_prefixed_string(s: &str, writer: &mut Writer) -> Result<()> {
    #[allow(clippy::cast_possible_truncation)]
    writer.write_compressed_uint(s.len() as u32)?;
    writer.write_bytes(s.as_bytes());
    Ok(())
}

fn encode_into(native: &NativeType, writer: &mut Writer) -> Result<()> {
    match native {
        NativeType::Void => writer.write_u8(NATIVE_TYPE::VOID),
        NativeType::Boolean => writer.write_u8(NATIVE_TYPE::BOOLEAN),
        NativeType::I1 => writer.write_u8(NATIVE_TYPE::I1),
        NativeType::U1 => writer.write_u8(NATIVE_TYPE::U1),
        NativeType::I2 => writer.write_u8(NATIVE_TYPE::I2),
        NativeType::U2 => writer.write_u8(NATIVE_TYPE::U2),
        NativeType::I4 => writer.write_u8(NATIVE_TYPE::I4),
        NativeType::U4 => writer.write_u8(NATIVE_TYPE::U4),
        NativeType::I8 => writer.write_u8(NATIVE_TYPE::I8),
        NativeType::U8 => writer.write_u8(NATIVE_TYPE::U8),
        NativeType::R4 => writer.write_u8(NATIVE_TYPE::R4),
        NativeType::R8 => writer.write_u8(NATIVE_TYPE::R8),
        NativeType::SysChar => writer.write_u8(NATIVE_TYPE::SYSCHAR),
        NativeType::Variant => writer.write_u8(NATIVE_TYPE::VARIANT),
        NativeType::Currency => writer.write_u8(NATIVE_TYPE::CURRENCY),
        NativeType::Decimal => writer.write_u8(NATIVE_TYPE::DECIMAL),
        NativeType::Date => writer.write_u8(NATIVE_TYPE::DATE),
        NativeType::Int => writer.write_u8(NATIVE_TYPE::INT),
        NativeType::UInt => writer.write_u8(NATIVE_TYPE::UINT),
        NativeType::Error => writer.write_u8(NATIVE_TYPE::ERROR),
        NativeType::BStr => writer.write_u8(NATIVE_TYPE::BSTR),
        NativeType::AnsiBStr => writer.write_u8(NATIVE_TYPE::ANSIBSTR),
        NativeType::TBStr => writer.write_u8(NATIVE_TYPE::TBSTR),
        NativeType::VariantBool => writer.write_u8(NATIVE_TYPE::VARIANTBOOL),
        NativeType::Func => writer.write_u8(NATIVE_TYPE::FUNC),
        NativeType::AsAny => writer.write_u8(NATIVE_TYPE::ASANY),
        NativeType::Struct => writer.write_u8(NATIVE_TYPE::STRUCT),
        NativeType::Interface => writer.write_u8(NATIVE_TYPE::INTERFACE),
        NativeType::IUnknown => writer.write_u8(NATIVE_TYPE::IUNKNOWN),
        NativeType::IDispatch => writer.write_u8(NATIVE_TYPE::IDISPATCH),
        NativeType::IInspectable => writer.write_u8(NATIVE_TYPE::IINSPECTABLE),
        NativeType::HString => writer.write_u8(NATIVE_TYPE::HSTRING),
        NativeType::LPStruct => writer.write_u8(NATIVE_TYPE::LPSTRUCT),
        NativeType::Ptr => writer.write_u8(NATIVE_TYPE::PTR),
        NativeType::LPStr { size_param_index } => {
            writer.write_u8(NATIVE_TYPE::LPSTR);
            if let Some(index) = size_param_index {
                writer.write_compressed_uint(*index)?;
            }
        }
        NativeType::LPWStr { size_param_index } => {
            writer.write_u8(NATIVE_TYPE::LPWSTR);
            if let Some(index) = size_param_index {
                writer.write_compressed_uint(*index)?;
            }
        }
        NativeType::LPTStr { size_param_index } => {
            writer.write_u8(NATIVE_TYPE::LPTSTR);
            if let Some(index) = size_param_index {
                writer.write_compressed_uint(*index)?;
            }
        }
        NativeType::LPUtf8Str { size_param_index } => {
            writer.write_u8(NATIVE_TYPE::LPUTF8STR);
            if let Some(index) = size_param_index {
                writer.write_compressed_uint(*index)?;
            }
        }
        NativeType::FixedSysString { size } => {
            writer.write_u8(NATIVE_TYPE::FIXEDSYSSTRING);
            writer.write_compressed_uint(*size)?;
        }
        NativeType::ByValStr { size } => {
            writer.write_u8(NATIVE_TYPE::BYVALSTR);
            writer.write_compressed_uint(*size)?;
        }
        NativeType::FixedArray { size, element_type } => {
            writer.write_u8(NATIVE_TYPE::FIXEDARRAY);
            writer.write_compressed_uint(*size)?;
            if let Some(element) = element_type {
                encode_into(element, writer)?;
            }
        }
        NativeType::Array {
            element_type,
            num_param,
            num_element,
        } => {
            writer.write_u8(NATIVE_TYPE::ARRAY);
            encode_into(element_type, writer)?;
            if let Some(param) = num_param {
                writer.write_compressed_uint(*param)?;
            } else if num_element.is_some() {
                // The element count is positional behind the parameter index
                writer.write_compressed_uint(0)?;
            }
            if let Some(count) = num_element {
                writer.write_compressed_uint(*count)?;
            }
        }
        NativeType::SafeArray {
            variant_type,
            user_defined_name,
        } => {
            writer.write_u8(NATIVE_TYPE::SAFEARRAY);
            if let Some(vt) = variant_type {
                writer.write_compressed_uint(*vt)?;
            } else if user_defined_name.is_some() {
                writer.write_compressed_uint(0)?;
            }
            if let Some(name) = user_defined_name {
                write_prefixed_string(name, writer)?;
            }
        }
        NativeType::CustomMarshaler {
            guid,
            native_type_name,
            marshaler_type,
            cookie,
        } => {
            writer.write_u8(NATIVE_TYPE::CUSTOMMARSHALER);
            write_prefixed_string(guid, writer)?;
            write_prefixed_string(native_type_name, writer)?;
            write_prefixed_string(marshaler_type, writer)?;
            write_prefixed_string(cookie, writer)?;
        }
    }

    Ok(())
}

/// Encode a marshalling descriptor into its blob form.
///
/// ## Arguments
/// * 'native' - The descriptor to encode
///
/// # Errors
/// Returns an error if an embedded count exceeds the compressed integer
/// range
pub fn encode_marshalling_descriptor(native: &NativeType) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    encode_into(native, &mut writer)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_types_are_single_bytes() {
        assert_eq!(
            encode_marshalling_descriptor(&NativeType::I4).unwrap(),
            vec![NATIVE_TYPE::I4]
        );
        assert_eq!(
            parse_marshalling_descriptor(&[NATIVE_TYPE::BSTR]).unwrap(),
            NativeType::BStr
        );
    }

    #[test]
    fn lpstr_with_size_param() {
        let descriptor = &[NATIVE_TYPE::LPSTR, 0x05];
        let parsed = parse_marshalling_descriptor(descriptor).unwrap();
        assert_eq!(
            parsed,
            NativeType::LPStr {
                size_param_index: Some(5)
            }
        );
        assert_eq!(encode_marshalling_descriptor(&parsed).unwrap(), descriptor);
    }

    #[test]
    fn array_round_trip() {
        let descriptor = &[NATIVE_TYPE::ARRAY, NATIVE_TYPE::I4, 0x03, 0x0A];
        let parsed = parse_marshalling_descriptor(descriptor).unwrap();
        assert_eq!(
            parsed,
            NativeType::Array {
                element_type: Box::new(NativeType::I4),
                num_param: Some(3),
                num_element: Some(10),
            }
        );
        assert_eq!(encode_marshalling_descriptor(&parsed).unwrap(), descriptor);
    }

    #[test]
    fn fixed_array_round_trip() {
        let parsed = parse_marshalling_descriptor(&[NATIVE_TYPE::FIXEDARRAY, 0x08]).unwrap();
        assert_eq!(
            parsed,
            NativeType::FixedArray {
                size: 8,
                element_type: None
            }
        );

        let nested = NativeType::FixedArray {
            size: 4,
            element_type: Some(Box::new(NativeType::U2)),
        };
        let encoded = encode_marshalling_descriptor(&nested).unwrap();
        assert_eq!(parse_marshalling_descriptor(&encoded).unwrap(), nested);
    }

    #[test]
    fn custom_marshaler_round_trip() {
        let marshaler = NativeType::CustomMarshaler {
            guid: String::new(),
            native_type_name: String::new(),
            marshaler_type: "My.Marshaler, MyAssembly".to_string(),
            cookie: "cookie".to_string(),
        };

        let encoded = encode_marshalling_descriptor(&marshaler).unwrap();
        assert_eq!(encoded[0], NATIVE_TYPE::CUSTOMMARSHALER);
        assert_eq!(parse_marshalling_descriptor(&encoded).unwrap(), marshaler);
    }

    #[test]
    fn unknown_native_type_is_corrupt() {
        assert!(parse_marshalling_descriptor(&[0x50]).is_err());
        assert!(parse_marshalling_descriptor(&[]).is_err());
    }
}
