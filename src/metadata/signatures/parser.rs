use crate::{
    file::Parser,
    metadata::signatures::{
        ArrayDimension, CallingConvention, CustomModifier, SignatureArray, SignatureField,
        SignatureLocalVariable, SignatureLocalVariables, SignatureMethod, SignatureMethodSpec,
        SignatureParameter, SignaturePointer, SignatureProperty, SignatureSzArray,
        SignatureTypeSpec, TypeSignature, CALLING_CONVENTION, ELEMENT_TYPE, SIGNATURE_HEADER,
    },
    Result,
};

/// Maximum recursion depth for signature parsing
const MAX_RECURSION_DEPTH: usize = 50;

/// Single-pass decoder over a signature blob.
///
/// # Example
///
/// ```rust
/// use cilforge::metadata::signatures::SignatureParser;
/// let data = &[0x20, 0x01, 0x01, 0x0E];
/// let mut parser = SignatureParser::new(data);
/// let sig = parser.parse_method_signature()?;
/// assert_eq!(sig.params.len(), 1);
/// # Ok::<(), cilforge::Error>(())
/// ```
///
/// ## Notes:
/// - Do not re-use a parser instance across multiple signatures; create one
///   per blob.
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a new `SignatureParser` from a byte slice
    ///
    /// ## Arguments
    /// * 'data' - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Parse a single type from the signature blob
    ///
    /// # Errors
    /// Returns an error on truncation, malformed element codes, or when the
    /// nesting depth exceeds the recursion limit
    pub fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(corrupt_blob!(
                "signature nesting exceeds the recursion limit of {}",
                MAX_RECURSION_DEPTH
            ));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.parser.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::PTR => Ok(TypeSignature::Ptr(SignaturePointer {
                modifiers: self.parse_custom_mods()?,
                base: Box::new(self.parse_type()?),
            })),
            ELEMENT_TYPE::BYREF => Ok(TypeSignature::ByRef(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(
                self.parser.read_compressed_token()?,
            )),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.parser.read_compressed_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::ARRAY => {
                let elem_type = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                let num_sizes = self.parser.read_compressed_uint()?;
                let mut dimensions: Vec<ArrayDimension> = Vec::with_capacity(num_sizes as usize);
                for _ in 0..num_sizes {
                    dimensions.push(ArrayDimension {
                        size: Some(self.parser.read_compressed_uint()?),
                        lower_bound: None,
                    });
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                for i in 0..num_lo_bounds {
                    let lower_bound = self.parser.read_compressed_uint()?;
                    if let Some(dimension) = dimensions.get_mut(i as usize) {
                        dimension.lower_bound = Some(lower_bound);
                    } else {
                        dimensions.push(ArrayDimension {
                            size: None,
                            lower_bound: Some(lower_bound),
                        });
                    }
                }

                Ok(TypeSignature::Array(SignatureArray {
                    base: Box::new(elem_type),
                    rank,
                    dimensions,
                }))
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.parser.peek_byte()?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(corrupt_blob!(
                        "GENERICINST must instantiate a class or value type, found {:#04x}",
                        peek_byte
                    ));
                }

                let base_type = self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;

                let mut type_args = Vec::with_capacity(arg_count as usize);
                for _ in 0..arg_count {
                    type_args.push(self.parse_type()?);
                }

                Ok(TypeSignature::GenericInst(Box::new(base_type), type_args))
            }
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSignature::TypedByRef),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::FNPTR => Ok(TypeSignature::FnPtr(Box::new(
                self.parse_method_signature()?,
            ))),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::SZARRAY => Ok(TypeSignature::SzArray(SignatureSzArray {
                modifiers: self.parse_custom_mods()?,
                base: Box::new(self.parse_type()?),
            })),
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.parser.read_compressed_uint()?,
            )),
            _ => Err(corrupt_blob!(
                "unsupported element type {:#04x}",
                current_byte
            )),
        }
    }

    /// Parse zero or more custom modifiers (`CMOD_REQD` / `CMOD_OPT`)
    fn parse_custom_mods(&mut self) -> Result<Vec<CustomModifier>> {
        let mut mods = Vec::new();

        while self.parser.has_more_data() {
            let next_byte = self.parser.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_OPT && next_byte != ELEMENT_TYPE::CMOD_REQD {
                break;
            }

            self.parser.advance()?;

            mods.push(CustomModifier {
                required: next_byte == ELEMENT_TYPE::CMOD_REQD,
                modifier_type: self.parser.read_compressed_token()?,
            });
        }

        Ok(mods)
    }

    /// Parse a parameter or return position
    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let custom_mods = self.parse_custom_mods()?;

        let mut by_ref = false;
        if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance()?;
            by_ref = true;
        }

        Ok(SignatureParameter {
            modifiers: custom_mods,
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Parse a method signature - `MethodDefSig`, `MethodRefSig` or
    /// `StandAloneMethodSig`
    ///
    /// # Errors
    /// Returns an error if the signature data is malformed or truncated
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;

        let convention = match convention_byte & CALLING_CONVENTION::MASK {
            CALLING_CONVENTION::DEFAULT => CallingConvention::Default,
            CALLING_CONVENTION::C => CallingConvention::C,
            CALLING_CONVENTION::STDCALL => CallingConvention::StdCall,
            CALLING_CONVENTION::THISCALL => CallingConvention::ThisCall,
            CALLING_CONVENTION::FASTCALL => CallingConvention::FastCall,
            CALLING_CONVENTION::VARARG => CallingConvention::VarArg,
            other => {
                return Err(corrupt_blob!("unknown calling convention {:#04x}", other));
            }
        };

        let generic_param_count = if convention_byte & CALLING_CONVENTION::GENERIC != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };

        let param_count = self.parser.read_compressed_uint()?;

        let mut method = SignatureMethod {
            convention,
            has_this: convention_byte & CALLING_CONVENTION::HASTHIS != 0,
            explicit_this: convention_byte & CALLING_CONVENTION::EXPLICITTHIS != 0,
            generic_param_count,
            return_type: self.parse_param()?,
            params: Vec::new(),
            varargs: Vec::new(),
        };

        let mut past_sentinel = false;
        for _ in 0..param_count {
            if !past_sentinel && self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                // The remaining positions are the call-site vararg list
                self.parser.advance()?;
                past_sentinel = true;
            }

            let param = self.parse_param()?;
            if past_sentinel {
                method.varargs.push(param);
            } else {
                method.params.push(param);
            }
        }

        Ok(method)
    }

    /// Parse a field signature (II.23.2.4)
    ///
    /// # Errors
    /// Returns an error if the leading byte is not the field marker or the
    /// type cannot be parsed
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::FIELD {
            return Err(corrupt_blob!(
                "field signature must start with {:#04x}, found {:#04x}",
                SIGNATURE_HEADER::FIELD,
                head_byte
            ));
        }

        let custom_mods = self.parse_custom_mods()?;
        let type_sig = self.parse_type()?;

        Ok(SignatureField {
            modifiers: custom_mods,
            base: type_sig,
        })
    }

    /// Parse a property signature (II.23.2.5)
    ///
    /// # Errors
    /// Returns an error if the leading byte is not the property marker or a
    /// contained type cannot be parsed
    pub fn parse_property_signature(&mut self) -> Result<SignatureProperty> {
        let head_byte = self.parser.read_le::<u8>()?;
        if (head_byte & SIGNATURE_HEADER::PROPERTY) == 0 {
            return Err(corrupt_blob!(
                "property signature must carry the {:#04x} marker, found {:#04x}",
                SIGNATURE_HEADER::PROPERTY,
                head_byte
            ));
        }

        let has_this = (head_byte & CALLING_CONVENTION::HASTHIS) != 0;

        let param_count = self.parser.read_compressed_uint()?;
        let custom_mods = self.parse_custom_mods()?;
        let type_sig = self.parse_type()?;

        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            params.push(self.parse_param()?);
        }

        Ok(SignatureProperty {
            has_this,
            modifiers: custom_mods,
            base: type_sig,
            params,
        })
    }

    /// Parse a local variable signature (II.23.2.6)
    ///
    /// # Errors
    /// Returns an error if the leading byte is not the locals marker or a
    /// slot cannot be parsed
    pub fn parse_local_var_signature(&mut self) -> Result<SignatureLocalVariables> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::LOCAL_SIG {
            return Err(corrupt_blob!(
                "local variable signature must start with {:#04x}, found {:#04x}",
                SIGNATURE_HEADER::LOCAL_SIG,
                head_byte
            ));
        }

        let count = self.parser.read_compressed_uint()?;

        let mut locals = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::TYPEDBYREF {
                self.parser.advance()?;
                locals.push(SignatureLocalVariable {
                    modifiers: Vec::new(),
                    is_byref: false,
                    is_pinned: false,
                    base: TypeSignature::TypedByRef,
                });

                continue;
            }

            // Modifiers and the pinning constraint may interleave ahead of
            // the optional BYREF marker
            let mut custom_mods = Vec::new();
            let mut pinned = false;

            while self.parser.has_more_data() {
                match self.parser.peek_byte()? {
                    ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                        let required = self.parser.peek_byte()? == ELEMENT_TYPE::CMOD_REQD;
                        self.parser.advance()?;
                        custom_mods.push(CustomModifier {
                            required,
                            modifier_type: self.parser.read_compressed_token()?,
                        });
                    }
                    ELEMENT_TYPE::PINNED => {
                        self.parser.advance()?;
                        pinned = true;
                    }
                    _ => break,
                }
            }

            let by_ref = if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
                self.parser.advance()?;
                true
            } else {
                false
            };

            locals.push(SignatureLocalVariable {
                modifiers: custom_mods,
                is_byref: by_ref,
                is_pinned: pinned,
                base: self.parse_type()?,
            });
        }

        Ok(SignatureLocalVariables { locals })
    }

    /// Parse a type specification signature (II.23.2.14)
    ///
    /// # Errors
    /// Returns an error if the type shape cannot be parsed
    pub fn parse_type_spec_signature(&mut self) -> Result<SignatureTypeSpec> {
        Ok(SignatureTypeSpec {
            base: self.parse_type()?,
        })
    }

    /// Parse a method specification signature (II.23.2.15)
    ///
    /// # Errors
    /// Returns an error if the leading byte is not the method-spec marker or
    /// a type argument cannot be parsed
    pub fn parse_method_spec_signature(&mut self) -> Result<SignatureMethodSpec> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::METHOD_SPEC {
            return Err(corrupt_blob!(
                "method spec signature must start with {:#04x}, found {:#04x}",
                SIGNATURE_HEADER::METHOD_SPEC,
                head_byte
            ));
        }

        let arg_count = self.parser.read_compressed_uint()?;
        let mut generic_args = Vec::with_capacity(arg_count as usize);
        for _ in 0..arg_count {
            generic_args.push(self.parse_type()?);
        }

        Ok(SignatureMethodSpec { generic_args })
    }
}
