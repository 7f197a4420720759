//! Custom attribute value blobs (ECMA-335 II.23.3).
//!
//! A custom attribute value is a prolog, the constructor's fixed arguments
//! serialized by the types of its signature, and a tagged list of named
//! field/property arguments. The codec is keyed off the constructor's
//! [`SignatureMethod`]: everything decidable from the signature alone is
//! parsed and encoded; constructor parameters that need type resolution
//! beyond the signature (class and value-type tokens) are rejected rather
//! than guessed.

use crate::{
    file::{Parser, Writer},
    metadata::signatures::{SignatureMethod, TypeSignature},
    Result,
};

/// Maximum recursion depth for custom attribute parsing
const MAX_RECURSION_DEPTH: usize = 50;

#[allow(non_snake_case)]
/// Serialization type tags used by named arguments and boxed values
/// (ECMA-335 II.23.3).
pub mod SERIALIZATION_TYPE {
    /// bool
    pub const BOOLEAN: u8 = 0x02;
    /// char
    pub const CHAR: u8 = 0x03;
    /// int8
    pub const I1: u8 = 0x04;
    /// uint8
    pub const U1: u8 = 0x05;
    /// int16
    pub const I2: u8 = 0x06;
    /// uint16
    pub const U2: u8 = 0x07;
    /// int32
    pub const I4: u8 = 0x08;
    /// uint32
    pub const U4: u8 = 0x09;
    /// int64
    pub const I8: u8 = 0x0A;
    /// uint64
    pub const U8: u8 = 0x0B;
    /// float32
    pub const R4: u8 = 0x0C;
    /// float64
    pub const R8: u8 = 0x0D;
    /// System.String
    pub const STRING: u8 = 0x0E;
    /// Single-dimensional array, followed by the element tag
    pub const SZARRAY: u8 = 0x1D;
    /// System.Type, stored as its serialized name
    pub const TYPE: u8 = 0x50;
    /// A boxed value: tag then value
    pub const TAGGED_OBJECT: u8 = 0x51;
    /// Named argument names a field
    pub const FIELD: u8 = 0x53;
    /// Named argument names a property
    pub const PROPERTY: u8 = 0x54;
    /// An enum, followed by its serialized type name
    pub const ENUM: u8 = 0x55;
}

/// A parsed custom attribute value: the constructor's fixed arguments plus
/// any named field/property arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomAttributeValue {
    /// Fixed arguments, one per constructor parameter
    pub fixed_args: Vec<CustomAttributeArgument>,
    /// Named arguments following the fixed list
    pub named_args: Vec<CustomAttributeNamedArgument>,
}

/// A single custom attribute argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomAttributeArgument {
    /// Boolean value
    Bool(bool),
    /// Character value (one UTF-16 code unit)
    Char(u16),
    /// Signed 8-bit integer
    I1(i8),
    /// Unsigned 8-bit integer
    U1(u8),
    /// Signed 16-bit integer
    I2(i16),
    /// Unsigned 16-bit integer
    U2(u16),
    /// Signed 32-bit integer
    I4(i32),
    /// Unsigned 32-bit integer
    U4(u32),
    /// Signed 64-bit integer
    I8(i64),
    /// Unsigned 64-bit integer
    U8(u64),
    /// 32-bit floating point
    R4(f32),
    /// 64-bit floating point
    R8(f64),
    /// A string, `None` for null
    String(Option<String>),
    /// A type, stored by serialized name, `None` for null
    Type(Option<String>),
    /// A boxed value carrying its own tag
    Boxed(Box<CustomAttributeArgument>),
    /// An enum value: serialized type name plus the underlying constant
    Enum(String, Box<CustomAttributeArgument>),
    /// An array of arguments, `None` for a null array
    Array(Option<Vec<CustomAttributeArgument>>),
}

/// A named field or property argument.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeNamedArgument {
    /// True for a field, false for a property
    pub is_field: bool,
    /// The field or property name
    pub name: String,
    /// The argument value
    pub value: CustomAttributeArgument,
}

/// Decoder for custom attribute value blobs, in the style of the signature
/// and marshalling parsers.
pub struct CustomAttributeParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> CustomAttributeParser<'a> {
    /// Create a parser over a value blob
    ///
    /// ## Arguments
    /// * 'data' - The blob content
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        CustomAttributeParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Parse a complete value blob against the constructor signature.
    ///
    /// ## Arguments
    /// * 'constructor' - The attribute constructor's method signature
    ///
    /// # Errors
    /// Returns an error for a bad prolog, truncation, or a constructor
    /// parameter type the blob grammar cannot express
    pub fn parse(&mut self, constructor: &SignatureMethod) -> Result<CustomAttributeValue> {
        let prolog = self.parser.read_le::<u16>()?;
        if prolog != 0x0001 {
            return Err(corrupt_blob!(
                "custom attribute prolog {:#06x} is not 0x0001",
                prolog
            ));
        }

        let mut fixed_args = Vec::with_capacity(constructor.params.len());
        for param in &constructor.params {
            fixed_args.push(self.parse_fixed_argument(&param.base)?);
        }

        let num_named = self.parser.read_le::<u16>()?;
        let mut named_args = Vec::with_capacity(num_named as usize);
        for _ in 0..num_named {
            named_args.push(self.parse_named_argument()?);
        }

        Ok(CustomAttributeValue {
            fixed_args,
            named_args,
        })
    }

    fn parse_fixed_argument(&mut self, ty: &TypeSignature) -> Result<CustomAttributeArgument> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(corrupt_blob!(
                "custom attribute nesting exceeds the recursion limit of {}",
                MAX_RECURSION_DEPTH
            ));
        }

        let result = match ty {
            TypeSignature::Boolean => {
                CustomAttributeArgument::Bool(self.parser.read_le::<u8>()? != 0)
            }
            TypeSignature::Char => CustomAttributeArgument::Char(self.parser.read_le::<u16>()?),
            TypeSignature::I1 => CustomAttributeArgument::I1(self.parser.read_le::<i8>()?),
            TypeSignature::U1 => CustomAttributeArgument::U1(self.parser.read_le::<u8>()?),
            TypeSignature::I2 => CustomAttributeArgument::I2(self.parser.read_le::<i16>()?),
            TypeSignature::U2 => CustomAttributeArgument::U2(self.parser.read_le::<u16>()?),
            TypeSignature::I4 => CustomAttributeArgument::I4(self.parser.read_le::<i32>()?),
            TypeSignature::U4 => CustomAttributeArgument::U4(self.parser.read_le::<u32>()?),
            TypeSignature::I8 => CustomAttributeArgument::I8(self.parser.read_le::<i64>()?),
            TypeSignature::U8 => CustomAttributeArgument::U8(self.parser.read_le::<u64>()?),
            TypeSignature::R4 => CustomAttributeArgument::R4(self.parser.read_le::<f32>()?),
            TypeSignature::R8 => CustomAttributeArgument::R8(self.parser.read_le::<f64>()?),
            TypeSignature::String => CustomAttributeArgument::String(self.parse_ser_string()?),
            TypeSignature::Object => {
                CustomAttributeArgument::Boxed(Box::new(self.parse_tagged_value()?))
            }
            TypeSignature::SzArray(array) => {
                let count = self.parser.read_le::<u32>()?;
                if count == u32::MAX {
                    CustomAttributeArgument::Array(None)
                } else {
                    let mut elements = Vec::with_capacity(count.min(0x1_0000) as usize);
                    for _ in 0..count {
                        elements.push(self.parse_fixed_argument(&array.base)?);
                    }
                    CustomAttributeArgument::Array(Some(elements))
                }
            }
            other => {
                // Class and value-type parameters need resolution beyond the
                // signature; the engine does not guess enum underlying types
                return Err(corrupt_blob!(
                    "constructor parameter type {:?} is not decidable from the signature",
                    other
                ));
            }
        };

        self.depth -= 1;
        Ok(result)
    }

    fn parse_tagged_value(&mut self) -> Result<CustomAttributeArgument> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(corrupt_blob!(
                "custom attribute nesting exceeds the recursion limit of {}",
                MAX_RECURSION_DEPTH
            ));
        }

        let result = self.parse_tagged_value_inner();
        self.depth -= 1;
        result
    }

    fn parse_tagged_value_inner(&mut self) -> Result<CustomAttributeArgument> {
        let tag = self.parser.read_le::<u8>()?;

        let value = match tag {
            SERIALIZATION_TYPE::BOOLEAN => {
                CustomAttributeArgument::Bool(self.parser.read_le::<u8>()? != 0)
            }
            SERIALIZATION_TYPE::CHAR => {
                CustomAttributeArgument::Char(self.parser.read_le::<u16>()?)
            }
            SERIALIZATION_TYPE::I1 => CustomAttributeArgument::I1(self.parser.read_le::<i8>()?),
            SERIALIZATION_TYPE::U1 => CustomAttributeArgument::U1(self.parser.read_le::<u8>()?),
            SERIALIZATION_TYPE::I2 => CustomAttributeArgument::I2(self.parser.read_le::<i16>()?),
            SERIALIZATION_TYPE::U2 => CustomAttributeArgument::U2(self.parser.read_le::<u16>()?),
            SERIALIZATION_TYPE::I4 => CustomAttributeArgument::I4(self.parser.read_le::<i32>()?),
            SERIALIZATION_TYPE::U4 => CustomAttributeArgument::U4(self.parser.read_le::<u32>()?),
            SERIALIZATION_TYPE::I8 => CustomAttributeArgument::I8(self.parser.read_le::<i64>()?),
            SERIALIZATION_TYPE::U8 => CustomAttributeArgument::U8(self.parser.read_le::<u64>()?),
            SERIALIZATION_TYPE::R4 => CustomAttributeArgument::R4(self.parser.read_le::<f32>()?),
            SERIALIZATION_TYPE::R8 => CustomAttributeArgument::R8(self.parser.read_le::<f64>()?),
            SERIALIZATION_TYPE::STRING => {
                CustomAttributeArgument::String(self.parse_ser_string()?)
            }
            SERIALIZATION_TYPE::TYPE => CustomAttributeArgument::Type(self.parse_ser_string()?),
            SERIALIZATION_TYPE::ENUM => {
                let Some(enum_type) = self.parse_ser_string()? else {
                    return Err(corrupt_blob!("enum tag with a null type name"));
                };
                // Underlying constants of serialized enums are int32
                let value = CustomAttributeArgument::I4(self.parser.read_le::<i32>()?);
                CustomAttributeArgument::Enum(enum_type, Box::new(value))
            }
            SERIALIZATION_TYPE::SZARRAY => {
                let element_tag = self.parser.read_le::<u8>()?;
                let count = self.parser.read_le::<u32>()?;
                if count == u32::MAX {
                    CustomAttributeArgument::Array(None)
                } else {
                    let mut elements = Vec::with_capacity(count.min(0x1_0000) as usize);
                    for _ in 0..count {
                        elements.push(self.parse_value_of_tag(element_tag)?);
                    }
                    CustomAttributeArgument::Array(Some(elements))
                }
            }
            SERIALIZATION_TYPE::TAGGED_OBJECT => {
                CustomAttributeArgument::Boxed(Box::new(self.parse_tagged_value()?))
            }
            _ => {
                return Err(corrupt_blob!("unknown serialization tag {:#04x}", tag));
            }
        };

        Ok(value)
    }

    fn parse_value_of_tag(&mut self, tag: u8) -> Result<CustomAttributeArgument> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(corrupt_blob!(
                "custom attribute nesting exceeds the recursion limit of {}",
                MAX_RECURSION_DEPTH
            ));
        }

        // Delegate through the tagged grammar by faking a one-tag stream
        let result = match tag {
            SERIALIZATION_TYPE::TAGGED_OBJECT => {
                CustomAttributeArgument::Boxed(Box::new(self.parse_tagged_value()?))
            }
            _ => self.parse_tagged_payload(tag)?,
        };

        self.depth -= 1;
        Ok(result)
    }

    fn parse_tagged_payload(&mut self, tag: u8) -> Result<CustomAttributeArgument> {
        match tag {
            SERIALIZATION_TYPE::BOOLEAN => Ok(CustomAttributeArgument::Bool(
                self.parser.read_le::<u8>()? != 0,
            )),
            SERIALIZATION_TYPE::CHAR => {
                Ok(CustomAttributeArgument::Char(self.parser.read_le::<u16>()?))
            }
            SERIALIZATION_TYPE::I1 => Ok(CustomAttributeArgument::I1(self.parser.read_le::<i8>()?)),
            SERIALIZATION_TYPE::U1 => Ok(CustomAttributeArgument::U1(self.parser.read_le::<u8>()?)),
            SERIALIZATION_TYPE::I2 => {
                Ok(CustomAttributeArgument::I2(self.parser.read_le::<i16>()?))
            }
            SERIALIZATION_TYPE::U2 => {
                Ok(CustomAttributeArgument::U2(self.parser.read_le::<u16>()?))
            }
            SERIALIZATION_TYPE::I4 => {
                Ok(CustomAttributeArgument::I4(self.parser.read_le::<i32>()?))
            }
            SERIALIZATION_TYPE::U4 => {
                Ok(CustomAttributeArgument::U4(self.parser.read_le::<u32>()?))
            }
            SERIALIZATION_TYPE::I8 => {
                Ok(CustomAttributeArgument::I8(self.parser.read_le::<i64>()?))
            }
            SERIALIZATION_TYPE::U8 => {
                Ok(CustomAttributeArgument::U8(self.parser.read_le::<u64>()?))
            }
            SERIALIZATION_TYPE::R4 => {
                Ok(CustomAttributeArgument::R4(self.parser.read_le::<f32>()?))
            }
            SERIALIZATION_TYPE::R8 => {
                Ok(CustomAttributeArgument::R8(self.parser.read_le::<f64>()?))
            }
            SERIALIZATION_TYPE::STRING => {
                Ok(CustomAttributeArgument::String(self.parse_ser_string()?))
            }
            SERIALIZATION_TYPE::TYPE => {
                Ok(CustomAttributeArgument::Type(self.parse_ser_string()?))
            }
            _ => Err(corrupt_blob!("unknown serialization tag {:#04x}", tag)),
        }
    }

    fn parse_named_argument(&mut self) -> Result<CustomAttributeNamedArgument> {
        let kind = self.parser.read_le::<u8>()?;
        let is_field = match kind {
            SERIALIZATION_TYPE::FIELD => true,
            SERIALIZATION_TYPE::PROPERTY => false,
            _ => {
                return Err(corrupt_blob!(
                    "named argument kind {:#04x} is neither field nor property",
                    kind
                ));
            }
        };

        let tag = self.parser.read_le::<u8>()?;

        // Enum and array carry extra type information ahead of the name
        let (enum_type, element_tag) = match tag {
            SERIALIZATION_TYPE::ENUM => (self.parse_ser_string()?, None),
            SERIALIZATION_TYPE::SZARRAY => (None, Some(self.parser.read_le::<u8>()?)),
            _ => (None, None),
        };

        let Some(name) = self.parse_ser_string()? else {
            return Err(corrupt_blob!("named argument with a null name"));
        };

        let value = match tag {
            SERIALIZATION_TYPE::ENUM => {
                let Some(enum_type) = enum_type else {
                    return Err(corrupt_blob!("enum named argument with a null type name"));
                };
                let value = CustomAttributeArgument::I4(self.parser.read_le::<i32>()?);
                CustomAttributeArgument::Enum(enum_type, Box::new(value))
            }
            SERIALIZATION_TYPE::SZARRAY => {
                let element_tag = element_tag.unwrap_or_default();
                let count = self.parser.read_le::<u32>()?;
                if count == u32::MAX {
                    CustomAttributeArgument::Array(None)
                } else {
                    let mut elements = Vec::with_capacity(count.min(0x1_0000) as usize);
                    for _ in 0..count {
                        elements.push(self.parse_value_of_tag(element_tag)?);
                    }
                    CustomAttributeArgument::Array(Some(elements))
                }
            }
            SERIALIZATION_TYPE::TAGGED_OBJECT => {
                CustomAttributeArgument::Boxed(Box::new(self.parse_tagged_value()?))
            }
            _ => self.parse_tagged_payload(tag)?,
        };

        Ok(CustomAttributeNamedArgument {
            is_field,
            name,
            value,
        })
    }

    /// SerString: compressed length + UTF-8 bytes, 0xFF for null.
    fn parse_ser_string(&mut self) -> Result<Option<String>> {
        if self.parser.peek_byte()? == 0xFF {
            self.parser.advance()?;
            return Ok(None);
        }

        let length = self.parser.read_compressed_uint()? as usize;
        let mut bytes = Vec::with_capacity(length);
        for _ in 0..length {
            bytes.push(self.parser.read_le::<u8>()?);
        }

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| corrupt_blob!("custom attribute string is not UTF-8"))
    }
}

/// Parse a custom attribute value blob against its constructor signature.
///
/// ## Arguments
/// * 'data' - The blob content
/// * 'constructor' - The attribute constructor's method signature
///
/// # Errors
/// Returns an error for malformed blobs or constructor parameter types the
/// blob grammar cannot express
pub fn parse_custom_attribute_value(
    data: &[u8],
    constructor: &SignatureMethod,
) -> Result<CustomAttributeValue> {
    CustomAttributeParser::new(data).parse(constructor)
}

fn tag_of(argument: &CustomAttributeArgument) -> u8 {
    match argument {
        CustomAttributeArgument::Bool(_) => SERIALIZATION_TYPE::BOOLEAN,
        CustomAttributeArgument::Char(_) => SERIALIZATION_TYPE::CHAR,
        CustomAttributeArgument::I1(_) => SERIALIZATION_TYPE::I1,
        CustomAttributeArgument::U1(_) => SERIALIZATION_TYPE::U1,
        CustomAttributeArgument::I2(_) => SERIALIZATION_TYPE::I2,
        CustomAttributeArgument::U2(_) => SERIALIZATION_TYPE::U2,
        CustomAttributeArgument::I4(_) => SERIALIZATION_TYPE::I4,
        CustomAttributeArgument::U4(_) => SERIALIZATION_TYPE::U4,
        CustomAttributeArgument::I8(_) => SERIALIZATION_TYPE::I8,
        CustomAttributeArgument::U8(_) => SERIALIZATION_TYPE::U8,
        CustomAttributeArgument::R4(_) => SERIALIZATION_TYPE::R4,
        CustomAttributeArgument::R8(_) => SERIALIZATION_TYPE::R8,
        CustomAttributeArgument::String(_) => SERIALIZATION_TYPE::STRING,
        CustomAttributeArgument::Type(_) => SERIALIZATION_TYPE::TYPE,
        CustomAttributeArgument::Boxed(_) => SERIALIZATION_TYPE::TAGGED_OBJECT,
        CustomAttributeArgument::Enum(_, _) => SERIALIZATION_TYPE::ENUM,
        CustomAttributeArgument::Array(_) => SERIALIZATION_TYPE::SZARRAY,
    }
}

fn write_ser_string(value: Option<&str>, writer: &mut Writer) -> Result<()> {
    match value {
        None => writer.write_u8(0xFF),
        Some(value) => {
            #[allow(clippy::cast_possible_truncation)]
            writer.write_compressed_uint(value.len() as u32)?;
            writer.write_bytes(value.as_bytes());
        }
    }
    Ok(())
}

fn write_plain_value(argument: &CustomAttributeArgument, writer: &mut Writer) -> Result<()> {
    match argument {
        CustomAttributeArgument::Bool(value) => writer.write_u8(u8::from(*value)),
        CustomAttributeArgument::Char(value) => writer.write_u16(*value),
        CustomAttributeArgument::I1(value) => writer.write_u8(*value as u8),
        CustomAttributeArgument::U1(value) => writer.write_u8(*value),
        CustomAttributeArgument::I2(value) => writer.write_u16(*value as u16),
        CustomAttributeArgument::U2(value) => writer.write_u16(*value),
        CustomAttributeArgument::I4(value) => writer.write_u32(*value as u32),
        CustomAttributeArgument::U4(value) => writer.write_u32(*value),
        CustomAttributeArgument::I8(value) => writer.write_u64(*value as u64),
        CustomAttributeArgument::U8(value) => writer.write_u64(*value),
        CustomAttributeArgument::R4(value) => writer.write_bytes(&value.to_le_bytes()),
        CustomAttributeArgument::R8(value) => writer.write_bytes(&value.to_le_bytes()),
        CustomAttributeArgument::String(value) => {
            write_ser_string(value.as_deref(), writer)?;
        }
        CustomAttributeArgument::Type(value) => {
            write_ser_string(value.as_deref(), writer)?;
        }
        CustomAttributeArgument::Boxed(inner) => {
            writer.write_u8(tag_of(inner));
            if let CustomAttributeArgument::Enum(enum_type, value) = inner.as_ref() {
                write_ser_string(Some(enum_type), writer)?;
                write_plain_value(value, writer)?;
            } else {
                write_plain_value(inner, writer)?;
            }
        }
        CustomAttributeArgument::Enum(_, value) => {
            write_plain_value(value, writer)?;
        }
        CustomAttributeArgument::Array(elements) => {
            match elements {
                None => writer.write_u32(u32::MAX),
                Some(elements) => {
                    #[allow(clippy::cast_possible_truncation)]
                    writer.write_u32(elements.len() as u32);
                    for element in elements {
                        write_plain_value(element, writer)?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Encode a custom attribute value into its blob form.
///
/// The fixed arguments must match the constructor's parameter list; named
/// arguments follow with their tags.
///
/// ## Arguments
/// * 'value' - The value to encode
/// * 'constructor' - The attribute constructor's method signature
///
/// # Errors
/// Returns an error if the fixed argument count does not match the
/// constructor, or a string exceeds the compressed length range
pub fn encode_custom_attribute_value(
    value: &CustomAttributeValue,
    constructor: &SignatureMethod,
) -> Result<Vec<u8>> {
    if value.fixed_args.len() != constructor.params.len() {
        return Err(unresolved!(
            "attribute carries {} fixed arguments but the constructor takes {}",
            value.fixed_args.len(),
            constructor.params.len()
        ));
    }

    let mut writer = Writer::new();
    writer.write_u16(0x0001); // prolog

    for argument in &value.fixed_args {
        write_plain_value(argument, &mut writer)?;
    }

    #[allow(clippy::cast_possible_truncation)]
    writer.write_u16(value.named_args.len() as u16);
    for named in &value.named_args {
        writer.write_u8(if named.is_field {
            SERIALIZATION_TYPE::FIELD
        } else {
            SERIALIZATION_TYPE::PROPERTY
        });

        let tag = tag_of(&named.value);
        writer.write_u8(tag);
        match &named.value {
            CustomAttributeArgument::Enum(enum_type, _) => {
                write_ser_string(Some(enum_type), &mut writer)?;
            }
            CustomAttributeArgument::Array(elements) => {
                let element_tag = elements
                    .as_ref()
                    .and_then(|elements| elements.first())
                    .map_or(SERIALIZATION_TYPE::TAGGED_OBJECT, tag_of);
                writer.write_u8(element_tag);
            }
            _ => {}
        }

        write_ser_string(Some(&named.name), &mut writer)?;
        write_plain_value(&named.value, &mut writer)?;
    }

    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use crate::metadata::signatures::SignatureMethod;

    use super::*;

    #[test]
    fn fixed_arguments_round_trip() {
        let constructor = SignatureMethod::new(TypeSignature::Void)
            .with_param(TypeSignature::I4)
            .with_param(TypeSignature::String)
            .with_param(TypeSignature::Boolean)
            .instance();

        let value = CustomAttributeValue {
            fixed_args: vec![
                CustomAttributeArgument::I4(-7),
                CustomAttributeArgument::String(Some("hello".to_string())),
                CustomAttributeArgument::Bool(true),
            ],
            named_args: Vec::new(),
        };

        let encoded = encode_custom_attribute_value(&value, &constructor).unwrap();
        assert_eq!(&encoded[0..2], &[0x01, 0x00]);

        let decoded = parse_custom_attribute_value(&encoded, &constructor).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn null_string_round_trips() {
        let constructor = SignatureMethod::new(TypeSignature::Void)
            .with_param(TypeSignature::String)
            .instance();

        let value = CustomAttributeValue {
            fixed_args: vec![CustomAttributeArgument::String(None)],
            named_args: Vec::new(),
        };

        let encoded = encode_custom_attribute_value(&value, &constructor).unwrap();
        assert_eq!(encoded, vec![0x01, 0x00, 0xFF, 0x00, 0x00]);
        assert_eq!(
            parse_custom_attribute_value(&encoded, &constructor).unwrap(),
            value
        );
    }

    #[test]
    fn named_arguments_round_trip() {
        let constructor = SignatureMethod::new(TypeSignature::Void).instance();

        let value = CustomAttributeValue {
            fixed_args: Vec::new(),
            named_args: vec![
                CustomAttributeNamedArgument {
                    is_field: false,
                    name: "Level".to_string(),
                    value: CustomAttributeArgument::I4(3),
                },
                CustomAttributeNamedArgument {
                    is_field: true,
                    name: "Name".to_string(),
                    value: CustomAttributeArgument::String(Some("x".to_string())),
                },
            ],
        };

        let encoded = encode_custom_attribute_value(&value, &constructor).unwrap();
        assert_eq!(
            parse_custom_attribute_value(&encoded, &constructor).unwrap(),
            value
        );
    }

    #[test]
    fn boxed_and_array_round_trip() {
        use crate::metadata::signatures::SignatureSzArray;

        let constructor = SignatureMethod::new(TypeSignature::Void)
            .with_param(TypeSignature::Object)
            .with_param(TypeSignature::SzArray(SignatureSzArray {
                modifiers: Vec::new(),
                base: Box::new(TypeSignature::U1),
            }))
            .instance();

        let value = CustomAttributeValue {
            fixed_args: vec![
                CustomAttributeArgument::Boxed(Box::new(CustomAttributeArgument::I2(-2))),
                CustomAttributeArgument::Array(Some(vec![
                    CustomAttributeArgument::U1(1),
                    CustomAttributeArgument::U1(2),
                ])),
            ],
            named_args: Vec::new(),
        };

        let encoded = encode_custom_attribute_value(&value, &constructor).unwrap();
        assert_eq!(
            parse_custom_attribute_value(&encoded, &constructor).unwrap(),
            value
        );
    }

    #[test]
    fn wrong_prolog_is_corrupt() {
        let constructor = SignatureMethod::new(TypeSignature::Void);
        assert!(parse_custom_attribute_value(&[0x02, 0x00, 0x00, 0x00], &constructor).is_err());
    }

    #[test]
    fn fixed_argument_count_must_match() {
        let constructor = SignatureMethod::new(TypeSignature::Void)
            .with_param(TypeSignature::I4)
            .instance();

        let value = CustomAttributeValue::default();
        assert!(encode_custom_attribute_value(&value, &constructor).is_err());
    }
}
