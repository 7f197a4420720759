//! Signature encoders: the inverse of the parser, producing the
//! tag-length-value blob forms of ECMA-335 II.23.2.
//!
//! Every encoder writes through [`Writer`], so compressed integers and
//! compressed type tokens share one implementation with the rest of the
//! engine. Encoded blobs round-trip through the parser bit-exactly.

use crate::{
    file::Writer,
    metadata::signatures::{
        CallingConvention, CustomModifier, SignatureField, SignatureLocalVariables,
        SignatureMethod, SignatureMethodSpec, SignatureParameter, SignatureProperty,
        SignatureTypeSpec, TypeSignature, CALLING_CONVENTION, ELEMENT_TYPE, SIGNATURE_HEADER,
    },
    Result,
};

fn encode_custom_modifier(modifier: &CustomModifier, writer: &mut Writer) -> Result<()> {
    writer.write_u8(if modifier.required {
        ELEMENT_TYPE::CMOD_REQD
    } else {
        ELEMENT_TYPE::CMOD_OPT
    });
    writer.write_compressed_token(modifier.modifier_type)
}

fn encode_parameter(parameter: &SignatureParameter, writer: &mut Writer) -> Result<()> {
    for modifier in &parameter.modifiers {
        encode_custom_modifier(modifier, writer)?;
    }

    if parameter.by_ref {
        writer.write_u8(ELEMENT_TYPE::BYREF);
    }

    encode_type_signature(&parameter.base, writer)
}

/// Encode a single type position into its element-type byte form.
///
/// ## Arguments
/// * 'signature' - The type shape to encode
/// * 'writer'    - The output buffer
///
/// # Errors
/// Returns an error if an embedded token is not a type token or a count
/// exceeds the compressed integer range
#[allow(clippy::cast_possible_truncation)]
pub fn encode_type_signature(signature: &TypeSignature, writer: &mut Writer) -> Result<()> {
    match signature {
        TypeSignature::Void => writer.write_u8(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => writer.write_u8(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => writer.write_u8(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => writer.write_u8(ELEMENT_TYPE::I1),
        TypeSignature::U1 => writer.write_u8(ELEMENT_TYPE::U1),
        TypeSignature::I2 => writer.write_u8(ELEMENT_TYPE::I2),
        TypeSignature::U2 => writer.write_u8(ELEMENT_TYPE::U2),
        TypeSignature::I4 => writer.write_u8(ELEMENT_TYPE::I4),
        TypeSignature::U4 => writer.write_u8(ELEMENT_TYPE::U4),
        TypeSignature::I8 => writer.write_u8(ELEMENT_TYPE::I8),
        TypeSignature::U8 => writer.write_u8(ELEMENT_TYPE::U8),
        TypeSignature::R4 => writer.write_u8(ELEMENT_TYPE::R4),
        TypeSignature::R8 => writer.write_u8(ELEMENT_TYPE::R8),
        TypeSignature::String => writer.write_u8(ELEMENT_TYPE::STRING),
        TypeSignature::TypedByRef => writer.write_u8(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::I => writer.write_u8(ELEMENT_TYPE::I),
        TypeSignature::U => writer.write_u8(ELEMENT_TYPE::U),
        TypeSignature::Object => writer.write_u8(ELEMENT_TYPE::OBJECT),
        TypeSignature::Ptr(pointer) => {
            writer.write_u8(ELEMENT_TYPE::PTR);
            for modifier in &pointer.modifiers {
                encode_custom_modifier(modifier, writer)?;
            }
            encode_type_signature(&pointer.base, writer)?;
        }
        TypeSignature::ByRef(base) => {
            writer.write_u8(ELEMENT_TYPE::BYREF);
            encode_type_signature(base, writer)?;
        }
        TypeSignature::ValueType(token) => {
            writer.write_u8(ELEMENT_TYPE::VALUETYPE);
            writer.write_compressed_token(*token)?;
        }
        TypeSignature::Class(token) => {
            writer.write_u8(ELEMENT_TYPE::CLASS);
            writer.write_compressed_token(*token)?;
        }
        TypeSignature::GenericParamType(number) => {
            writer.write_u8(ELEMENT_TYPE::VAR);
            writer.write_compressed_uint(*number)?;
        }
        TypeSignature::GenericParamMethod(number) => {
            writer.write_u8(ELEMENT_TYPE::MVAR);
            writer.write_compressed_uint(*number)?;
        }
        TypeSignature::Array(array) => {
            writer.write_u8(ELEMENT_TYPE::ARRAY);
            encode_type_signature(&array.base, writer)?;
            writer.write_compressed_uint(array.rank)?;

            let sizes: Vec<u32> = array.dimensions.iter().filter_map(|d| d.size).collect();
            writer.write_compressed_uint(sizes.len() as u32)?;
            for size in sizes {
                writer.write_compressed_uint(size)?;
            }

            let lo_bounds: Vec<u32> = array
                .dimensions
                .iter()
                .filter_map(|d| d.lower_bound)
                .collect();
            writer.write_compressed_uint(lo_bounds.len() as u32)?;
            for bound in lo_bounds {
                writer.write_compressed_uint(bound)?;
            }
        }
        TypeSignature::GenericInst(base, args) => {
            writer.write_u8(ELEMENT_TYPE::GENERICINST);
            encode_type_signature(base, writer)?;
            writer.write_compressed_uint(args.len() as u32)?;
            for arg in args {
                encode_type_signature(arg, writer)?;
            }
        }
        TypeSignature::FnPtr(method) => {
            writer.write_u8(ELEMENT_TYPE::FNPTR);
            encode_method_signature_into(method, writer)?;
        }
        TypeSignature::SzArray(array) => {
            writer.write_u8(ELEMENT_TYPE::SZARRAY);
            for modifier in &array.modifiers {
                encode_custom_modifier(modifier, writer)?;
            }
            encode_type_signature(&array.base, writer)?;
        }
    }

    Ok(())
}

fn encode_method_signature_into(signature: &SignatureMethod, writer: &mut Writer) -> Result<()> {
    let mut convention_byte = match signature.convention {
        CallingConvention::Default => CALLING_CONVENTION::DEFAULT,
        CallingConvention::C => CALLING_CONVENTION::C,
        CallingConvention::StdCall => CALLING_CONVENTION::STDCALL,
        CallingConvention::ThisCall => CALLING_CONVENTION::THISCALL,
        CallingConvention::FastCall => CALLING_CONVENTION::FASTCALL,
        CallingConvention::VarArg => CALLING_CONVENTION::VARARG,
    };

    if signature.has_this {
        convention_byte |= CALLING_CONVENTION::HASTHIS;
    }
    if signature.explicit_this {
        convention_byte |= CALLING_CONVENTION::EXPLICITTHIS;
    }
    if signature.generic_param_count > 0 {
        convention_byte |= CALLING_CONVENTION::GENERIC;
    }

    writer.write_u8(convention_byte);

    if signature.generic_param_count > 0 {
        writer.write_compressed_uint(signature.generic_param_count)?;
    }

    #[allow(clippy::cast_possible_truncation)]
    let param_count = (signature.params.len() + signature.varargs.len()) as u32;
    writer.write_compressed_uint(param_count)?;

    encode_parameter(&signature.return_type, writer)?;
    for param in &signature.params {
        encode_parameter(param, writer)?;
    }

    if !signature.varargs.is_empty() {
        writer.write_u8(ELEMENT_TYPE::SENTINEL);
        for param in &signature.varargs {
            encode_parameter(param, writer)?;
        }
    }

    Ok(())
}

/// Encode a method signature blob.
///
/// # Errors
/// Returns an error if any embedded type fails to encode
pub fn encode_method_signature(signature: &SignatureMethod) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    encode_method_signature_into(signature, &mut writer)?;
    Ok(writer.into_inner())
}

/// Encode a field signature blob.
///
/// # Errors
/// Returns an error if the field type fails to encode
pub fn encode_field_signature(signature: &SignatureField) -> Result<Vec<u8>> {
    let mut writer = Writer::new();

    writer.write_u8(SIGNATURE_HEADER::FIELD);
    for modifier in &signature.modifiers {
        encode_custom_modifier(modifier, &mut writer)?;
    }
    encode_type_signature(&signature.base, &mut writer)?;

    Ok(writer.into_inner())
}

/// Encode a property signature blob.
///
/// # Errors
/// Returns an error if the property type or an indexer parameter fails to
/// encode
#[allow(clippy::cast_possible_truncation)]
pub fn encode_property_signature(signature: &SignatureProperty) -> Result<Vec<u8>> {
    let mut writer = Writer::new();

    let mut prolog = SIGNATURE_HEADER::PROPERTY;
    if signature.has_this {
        prolog |= CALLING_CONVENTION::HASTHIS;
    }
    writer.write_u8(prolog);

    writer.write_compressed_uint(signature.params.len() as u32)?;

    for modifier in &signature.modifiers {
        encode_custom_modifier(modifier, &mut writer)?;
    }
    encode_type_signature(&signature.base, &mut writer)?;

    for param in &signature.params {
        encode_parameter(param, &mut writer)?;
    }

    Ok(writer.into_inner())
}

/// Encode a local variable signature blob.
///
/// # Errors
/// Returns an error if a slot type fails to encode
#[allow(clippy::cast_possible_truncation)]
pub fn encode_local_var_signature(signature: &SignatureLocalVariables) -> Result<Vec<u8>> {
    let mut writer = Writer::new();

    writer.write_u8(SIGNATURE_HEADER::LOCAL_SIG);
    writer.write_compressed_uint(signature.locals.len() as u32)?;

    for local in &signature.locals {
        if local.base == TypeSignature::TypedByRef {
            writer.write_u8(ELEMENT_TYPE::TYPEDBYREF);
            continue;
        }

        for modifier in &local.modifiers {
            encode_custom_modifier(modifier, &mut writer)?;
        }

        if local.is_pinned {
            writer.write_u8(ELEMENT_TYPE::PINNED);
        }

        if local.is_byref {
            writer.write_u8(ELEMENT_TYPE::BYREF);
        }

        encode_type_signature(&local.base, &mut writer)?;
    }

    Ok(writer.into_inner())
}

/// Encode a type specification signature blob.
///
/// # Errors
/// Returns an error if the type shape fails to encode
pub fn encode_typespec_signature(signature: &SignatureTypeSpec) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    encode_type_signature(&signature.base, &mut writer)?;
    Ok(writer.into_inner())
}

/// Encode a method specification (generic instantiation) signature blob.
///
/// # Errors
/// Returns an error if a type argument fails to encode
#[allow(clippy::cast_possible_truncation)]
pub fn encode_method_spec_signature(signature: &SignatureMethodSpec) -> Result<Vec<u8>> {
    let mut writer = Writer::new();

    writer.write_u8(SIGNATURE_HEADER::METHOD_SPEC);
    writer.write_compressed_uint(signature.generic_args.len() as u32)?;
    for arg in &signature.generic_args {
        encode_type_signature(arg, &mut writer)?;
    }

    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use crate::metadata::signatures::{
        parse_field_signature, parse_local_var_signature, parse_method_signature,
        parse_method_spec_signature, parse_property_signature, parse_type_spec_signature,
        ArrayDimension, SignatureArray, SignatureLocalVariable, SignatureSzArray,
    };
    use crate::metadata::token::Token;

    use super::*;

    #[test]
    fn method_signature_round_trip() {
        let signature = SignatureMethod::new(TypeSignature::Void)
            .with_param(TypeSignature::I4)
            .with_param(TypeSignature::String)
            .instance();

        let encoded = encode_method_signature(&signature).unwrap();
        assert_eq!(encoded[0], 0x20); // HASTHIS | DEFAULT

        let decoded = parse_method_signature(&encoded).unwrap();
        assert_eq!(decoded, signature);
    }

    #[test]
    fn generic_method_signature_round_trip() {
        let signature = SignatureMethod {
            generic_param_count: 2,
            return_type: SignatureParameter::new(TypeSignature::GenericParamMethod(0)),
            params: vec![SignatureParameter::new(TypeSignature::GenericParamMethod(1))],
            ..SignatureMethod::default()
        };

        let encoded = encode_method_signature(&signature).unwrap();
        assert_eq!(encoded[0], 0x10); // GENERIC

        assert_eq!(parse_method_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn vararg_signature_round_trip() {
        let signature = SignatureMethod {
            convention: CallingConvention::VarArg,
            return_type: SignatureParameter::new(TypeSignature::Void),
            params: vec![SignatureParameter::new(TypeSignature::I4)],
            varargs: vec![SignatureParameter::new(TypeSignature::R8)],
            ..SignatureMethod::default()
        };

        let encoded = encode_method_signature(&signature).unwrap();
        assert_eq!(parse_method_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn field_signature_round_trip() {
        let signature = SignatureField {
            modifiers: vec![CustomModifier {
                required: true,
                modifier_type: Token::new(0x0100_0002),
            }],
            base: TypeSignature::SzArray(SignatureSzArray {
                modifiers: Vec::new(),
                base: Box::new(TypeSignature::Class(Token::new(0x0200_0001))),
            }),
        };

        let encoded = encode_field_signature(&signature).unwrap();
        assert_eq!(encoded[0], SIGNATURE_HEADER::FIELD);
        assert_eq!(parse_field_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn property_signature_round_trip() {
        let signature = SignatureProperty {
            has_this: true,
            modifiers: Vec::new(),
            base: TypeSignature::String,
            params: vec![SignatureParameter::new(TypeSignature::I4)],
        };

        let encoded = encode_property_signature(&signature).unwrap();
        assert_eq!(encoded[0], 0x28);
        assert_eq!(parse_property_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn local_var_signature_round_trip() {
        let signature = SignatureLocalVariables {
            locals: vec![
                SignatureLocalVariable {
                    modifiers: Vec::new(),
                    is_byref: true,
                    is_pinned: false,
                    base: TypeSignature::I4,
                },
                SignatureLocalVariable {
                    modifiers: Vec::new(),
                    is_byref: false,
                    is_pinned: true,
                    base: TypeSignature::Object,
                },
                SignatureLocalVariable {
                    modifiers: Vec::new(),
                    is_byref: false,
                    is_pinned: false,
                    base: TypeSignature::TypedByRef,
                },
            ],
        };

        let encoded = encode_local_var_signature(&signature).unwrap();
        assert_eq!(encoded[0], SIGNATURE_HEADER::LOCAL_SIG);
        assert_eq!(parse_local_var_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn typespec_signature_round_trip() {
        let signature = SignatureTypeSpec {
            base: TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(Token::new(0x0100_0003))),
                vec![TypeSignature::I4, TypeSignature::String],
            ),
        };

        let encoded = encode_typespec_signature(&signature).unwrap();
        assert_eq!(parse_type_spec_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn array_shape_round_trip() {
        let signature = SignatureTypeSpec {
            base: TypeSignature::Array(SignatureArray {
                base: Box::new(TypeSignature::R8),
                rank: 2,
                dimensions: vec![
                    ArrayDimension {
                        size: Some(3),
                        lower_bound: Some(0),
                    },
                    ArrayDimension {
                        size: Some(4),
                        lower_bound: Some(1),
                    },
                ],
            }),
        };

        let encoded = encode_typespec_signature(&signature).unwrap();
        assert_eq!(parse_type_spec_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn method_spec_round_trip() {
        let signature = SignatureMethodSpec {
            generic_args: vec![TypeSignature::I4, TypeSignature::Object],
        };

        let encoded = encode_method_spec_signature(&signature).unwrap();
        assert_eq!(encoded[0], SIGNATURE_HEADER::METHOD_SPEC);
        assert_eq!(parse_method_spec_signature(&encoded).unwrap(), signature);
    }

    #[test]
    fn fn_ptr_round_trip() {
        let signature = SignatureTypeSpec {
            base: TypeSignature::FnPtr(Box::new(
                SignatureMethod::new(TypeSignature::Void).with_param(TypeSignature::I),
            )),
        };

        let encoded = encode_typespec_signature(&signature).unwrap();
        assert_eq!(encoded[0], ELEMENT_TYPE::FNPTR);
        assert_eq!(parse_type_spec_signature(&encoded).unwrap(), signature);
    }
}
