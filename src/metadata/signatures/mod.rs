//! Signature blob codec for .NET metadata.
//!
//! Signatures encode type shapes, method parameter lists, calling
//! conventions and generic instantiations in the compact binary form of
//! ECMA-335 II.23.2: a leading kind byte, compressed integers for counts and
//! a recursive element-type grammar for types.
//!
//! The [`SignatureParser`] decodes blobs into the `Signature*` types of this
//! module; the `encode_*` functions produce blobs from them. Both directions
//! are exact inverses: every encoded blob parses back to the value it came
//! from, and the decoder rejects malformed input instead of guessing.
//!
//! # Examples
//!
//! ```rust
//! use cilforge::metadata::signatures::parse_method_signature;
//!
//! // instance string-returning method with one int32 parameter
//! let method_sig = parse_method_signature(&[0x20, 0x01, 0x0E, 0x08])?;
//! assert!(method_sig.has_this);
//! assert_eq!(method_sig.params.len(), 1);
//! # Ok::<(), cilforge::Error>(())
//! ```

mod encoders;
mod parser;
mod types;

pub use encoders::{
    encode_field_signature, encode_local_var_signature, encode_method_signature,
    encode_method_spec_signature, encode_property_signature, encode_type_signature,
    encode_typespec_signature,
};
pub use parser::SignatureParser;
pub use types::*;

use crate::Result;

/// Parse a method signature from a byte slice
///
/// ## Arguments
/// * 'data' - The input slice to parse
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}

/// Parse a field signature from a byte slice
///
/// ## Arguments
/// * 'data' - The input slice to parse
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    let mut parser = SignatureParser::new(data);
    parser.parse_field_signature()
}

/// Parse a property signature from a byte slice
///
/// ## Arguments
/// * 'data' - The input slice to parse
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_property_signature(data: &[u8]) -> Result<SignatureProperty> {
    let mut parser = SignatureParser::new(data);
    parser.parse_property_signature()
}

/// Parse a local variable signature from a byte slice
///
/// ## Arguments
/// * 'data' - The input slice to parse
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_local_var_signature(data: &[u8]) -> Result<SignatureLocalVariables> {
    let mut parser = SignatureParser::new(data);
    parser.parse_local_var_signature()
}

/// Parse a type specification signature from a byte slice
///
/// ## Arguments
/// * 'data' - The input slice to parse
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_type_spec_signature(data: &[u8]) -> Result<SignatureTypeSpec> {
    let mut parser = SignatureParser::new(data);
    parser.parse_type_spec_signature()
}

/// Parse a method specification signature from a byte slice
///
/// ## Arguments
/// * 'data' - The input slice to parse
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_method_spec_signature(data: &[u8]) -> Result<SignatureMethodSpec> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_spec_signature()
}
