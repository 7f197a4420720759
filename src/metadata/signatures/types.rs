use crate::metadata::token::Token;

#[allow(non_snake_case)]
/// Element type constants used in signature blobs (ECMA-335 II.23.1.16).
pub mod ELEMENT_TYPE {
    /// Marks end of a list
    pub const END: u8 = 0x00;
    /// void
    pub const VOID: u8 = 0x01;
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
    pub const I8: u8 = 0x0a;
    /// uint64
    pub const U8: u8 = 0x0b;
    /// float32
    pub const R4: u8 = 0x0c;
    /// float64
    pub const R8: u8 = 0x0d;
    /// System.String
    pub const STRING: u8 = 0x0e;
    /// Unmanaged pointer, followed by type
    pub const PTR: u8 = 0x0f;
    /// Managed by-reference, followed by type
    pub const BYREF: u8 = 0x10;
    /// Value type, followed by TypeDefOrRef token
    pub const VALUETYPE: u8 = 0x11;
    /// Class, followed by TypeDefOrRef token
    pub const CLASS: u8 = 0x12;
    /// Generic parameter of a type, followed by number
    pub const VAR: u8 = 0x13;
    /// Multi-dimensional array with full shape
    pub const ARRAY: u8 = 0x14;
    /// Generic instantiation
    pub const GENERICINST: u8 = 0x15;
    /// System.TypedReference
    pub const TYPEDBYREF: u8 = 0x16;
    /// System.IntPtr
    pub const I: u8 = 0x18;
    /// System.UIntPtr
    pub const U: u8 = 0x19;
    /// Function pointer, followed by a full method signature
    pub const FNPTR: u8 = 0x1b;
    /// System.Object
    pub const OBJECT: u8 = 0x1c;
    /// Single-dimensional zero-based array
    pub const SZARRAY: u8 = 0x1d;
    /// Generic parameter of a method, followed by number
    pub const MVAR: u8 = 0x1e;
    /// Required custom modifier, followed by TypeDefOrRef token
    pub const CMOD_REQD: u8 = 0x1f;
    /// Optional custom modifier, followed by TypeDefOrRef token
    pub const CMOD_OPT: u8 = 0x20;
    /// Implemented within the CLI
    pub const INTERNAL: u8 = 0x21;
    /// Or'd with following element types
    pub const MODIFIER: u8 = 0x40;
    /// Sentinel separating fixed from vararg parameters
    pub const SENTINEL: u8 = 0x41;
    /// Local variable pinning constraint
    pub const PINNED: u8 = 0x45;
}

#[allow(non_snake_case)]
/// Calling convention bits of the leading method signature byte
/// (ECMA-335 II.23.2.1 and II.15.3).
pub mod CALLING_CONVENTION {
    /// Managed default convention
    pub const DEFAULT: u8 = 0x00;
    /// Unmanaged cdecl
    pub const C: u8 = 0x01;
    /// Unmanaged stdcall
    pub const STDCALL: u8 = 0x02;
    /// Unmanaged thiscall
    pub const THISCALL: u8 = 0x03;
    /// Unmanaged fastcall
    pub const FASTCALL: u8 = 0x04;
    /// Managed vararg convention
    pub const VARARG: u8 = 0x05;
    /// Mask selecting the convention kind
    pub const MASK: u8 = 0x0F;
    /// Method carries generic parameters
    pub const GENERIC: u8 = 0x10;
    /// Instance method ('this' is passed)
    pub const HASTHIS: u8 = 0x20;
    /// 'this' appears explicitly in the parameter list
    pub const EXPLICITTHIS: u8 = 0x40;
}

#[allow(non_snake_case)]
/// Leading bytes distinguishing the non-method signature kinds
/// (ECMA-335 II.23.2).
pub mod SIGNATURE_HEADER {
    /// Field signature
    pub const FIELD: u8 = 0x06;
    /// Local variable signature
    pub const LOCAL_SIG: u8 = 0x07;
    /// Property signature
    pub const PROPERTY: u8 = 0x08;
    /// Method specification (generic instantiation)
    pub const METHOD_SPEC: u8 = 0x0A;
}

/// The managed or unmanaged calling convention of a method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConvention {
    /// Managed default
    #[default]
    Default,
    /// Unmanaged cdecl
    C,
    /// Unmanaged stdcall
    StdCall,
    /// Unmanaged thiscall
    ThisCall,
    /// Unmanaged fastcall
    FastCall,
    /// Managed vararg
    VarArg,
}

/// A required or optional custom modifier attached to a type position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomModifier {
    /// True for `modreq`, false for `modopt`
    pub required: bool,
    /// `TypeDef`, `TypeRef` or `TypeSpec` token of the modifier type
    pub modifier_type: Token,
}

/// One dimension of a general array shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayDimension {
    /// Declared element count, if present
    pub size: Option<u32>,
    /// Declared lower bound, if present
    pub lower_bound: Option<u32>,
}

/// A parsed type position in a signature blob.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSignature {
    /// void
    #[default]
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// A pointer to a type
    Ptr(SignaturePointer),
    /// Type passed by reference
    ByRef(Box<TypeSignature>),
    /// A value type named by its token
    ValueType(Token),
    /// A class named by its token
    Class(Token),
    /// Generic parameter of the enclosing type, by position
    GenericParamType(u32),
    /// Multi-dimensional array with explicit shape
    Array(SignatureArray),
    /// A generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// System.TypedReference
    TypedByRef,
    /// Platform-sized signed integer
    I,
    /// Platform-sized unsigned integer
    U,
    /// Function pointer carrying a full method signature
    FnPtr(Box<SignatureMethod>),
    /// System.Object
    Object,
    /// Single-dimensional zero-based array
    SzArray(SignatureSzArray),
    /// Generic parameter of the enclosing method, by position
    GenericParamMethod(u32),
}

/// A multi-dimensional array shape: element type, rank and per-dimension
/// sizes and lower bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureArray {
    /// The element type
    pub base: Box<TypeSignature>,
    /// The number of dimensions
    pub rank: u32,
    /// Declared dimensions; may cover fewer than `rank` dimensions
    pub dimensions: Vec<ArrayDimension>,
}

/// A single-dimensional zero-based array.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureSzArray {
    /// Custom modifiers preceding the element type
    pub modifiers: Vec<CustomModifier>,
    /// The element type
    pub base: Box<TypeSignature>,
}

/// An unmanaged pointer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignaturePointer {
    /// Custom modifiers preceding the pointee type
    pub modifiers: Vec<CustomModifier>,
    /// The pointee type
    pub base: Box<TypeSignature>,
}

/// A parameter or return position: custom modifiers, optional by-ref marker
/// and the type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureParameter {
    /// Custom modifiers of this position
    pub modifiers: Vec<CustomModifier>,
    /// True if passed by reference
    pub by_ref: bool,
    /// The type of this position
    pub base: TypeSignature,
}

impl SignatureParameter {
    /// A plain by-value position of the given type.
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: false,
            base,
        }
    }
}

/// A method signature (ECMA-335 II.23.2.1 - II.23.2.3).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureMethod {
    /// The calling convention kind from the low nibble
    pub convention: CallingConvention,
    /// Instance method: an implicit 'this' is passed
    pub has_this: bool,
    /// 'this' appears explicitly in the parameter list
    pub explicit_this: bool,
    /// Number of generic parameters, 0 for non-generic methods
    pub generic_param_count: u32,
    /// The return position
    pub return_type: SignatureParameter,
    /// The fixed parameters
    pub params: Vec<SignatureParameter>,
    /// The vararg parameters following the sentinel, if any
    pub varargs: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// A static default-convention method with the given return type.
    #[must_use]
    pub fn new(return_type: TypeSignature) -> Self {
        SignatureMethod {
            return_type: SignatureParameter::new(return_type),
            ..SignatureMethod::default()
        }
    }

    /// Append a by-value parameter.
    #[must_use]
    pub fn with_param(mut self, param: TypeSignature) -> Self {
        self.params.push(SignatureParameter::new(param));
        self
    }

    /// Mark as an instance method.
    #[must_use]
    pub fn instance(mut self) -> Self {
        self.has_this = true;
        self
    }
}

/// A field signature (II.23.2.4).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureField {
    /// Custom modifiers preceding the field type
    pub modifiers: Vec<CustomModifier>,
    /// The field type
    pub base: TypeSignature,
}

impl SignatureField {
    /// A plain field of the given type.
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureField {
            modifiers: Vec::new(),
            base,
        }
    }
}

/// A property signature (II.23.2.5).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureProperty {
    /// Instance property: accessors take 'this'
    pub has_this: bool,
    /// Custom modifiers preceding the property type
    pub modifiers: Vec<CustomModifier>,
    /// The property type
    pub base: TypeSignature,
    /// Indexer parameters, empty for plain properties
    pub params: Vec<SignatureParameter>,
}

impl SignatureProperty {
    /// A plain instance property of the given type.
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureProperty {
            has_this: true,
            modifiers: Vec::new(),
            base,
            params: Vec::new(),
        }
    }
}

/// A local variable signature (II.23.2.6).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariables {
    /// The local variables, in slot order
    pub locals: Vec<SignatureLocalVariable>,
}

/// One local variable slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariable {
    /// Custom modifiers of this slot
    pub modifiers: Vec<CustomModifier>,
    /// True if the slot holds a by-reference
    pub is_byref: bool,
    /// True if the slot is pinned for the garbage collector
    pub is_pinned: bool,
    /// The slot type
    pub base: TypeSignature,
}

/// A type specification signature (II.23.2.14).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureTypeSpec {
    /// The specified type shape
    pub base: TypeSignature,
}

/// A method specification signature (II.23.2.15).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureMethodSpec {
    /// The generic argument types
    pub generic_args: Vec<TypeSignature>,
}
