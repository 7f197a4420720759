//! Attribute bitmasks carried by table rows.
//!
//! The flag columns of the catalogue are plain integers on the wire; these
//! bitflag sets give builder clients named values for the common masks.
//! Rows keep storing the raw integers, so unknown or future bits pass
//! through both directions untouched.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `TypeAttributes` for the `TypeDef` flags column (II.23.1.15).
    pub struct TypeAttributes: u32 {
        /// Type is not visible outside the assembly
        const NOT_PUBLIC = 0x0000_0000;
        /// Type is visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested type with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested type with private visibility
        const NESTED_PRIVATE = 0x0000_0003;
        /// Class semantics (as opposed to interface)
        const CLASS = 0x0000_0000;
        /// Interface semantics
        const INTERFACE = 0x0000_0020;
        /// Type is abstract
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Fields are laid out at explicit offsets
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Type name is special, e.g. `<Module>`
        const SPECIAL_NAME = 0x0000_0400;
        /// Strings are interpreted as ANSI for interop
        const ANSI_CLASS = 0x0000_0000;
        /// Strings are interpreted as Unicode for interop
        const UNICODE_CLASS = 0x0001_0000;
        /// Initialization runs any time before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `FieldAttributes` for the `Field` flags column (II.23.1.5).
    pub struct FieldAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by anyone in the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by anyone who can see this scope
        const PUBLIC = 0x0006;
        /// Field belongs to the type, not to instances
        const STATIC = 0x0010;
        /// Field can only be initialized, not written after
        const INIT_ONLY = 0x0020;
        /// Field is a compile-time constant
        const LITERAL = 0x0040;
        /// Field is not serialized when the type is remoted
        const NOT_SERIALIZED = 0x0080;
        /// Field name is special
        const SPECIAL_NAME = 0x0200;
        /// Field implementation is forwarded through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Field has a default value row
        const HAS_DEFAULT = 0x8000;
        /// Field has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Field has a mapped data RVA
        const HAS_FIELD_RVA = 0x0100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `MethodAttributes` for the `MethodDef` flags column (II.23.1.10).
    pub struct MethodAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by anyone in the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by anyone who can see this scope
        const PUBLIC = 0x0006;
        /// Method belongs to the type, not to instances
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method name is special, e.g. accessors
        const SPECIAL_NAME = 0x0800;
        /// CLI provides special behavior depending on the name
        const RT_SPECIAL_NAME = 0x1000;
        /// Method implementation is forwarded through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Method has declarative security
        const HAS_SECURITY = 0x4000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `ParamAttributes` for the `Param` flags column (II.23.1.13).
    pub struct ParamAttributes: u16 {
        /// Parameter is an input
        const IN = 0x0001;
        /// Parameter is an output
        const OUT = 0x0002;
        /// Parameter is optional
        const OPTIONAL = 0x0010;
        /// Parameter has a default value row
        const HAS_DEFAULT = 0x1000;
        /// Parameter has marshalling information
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `MethodImplAttributes` for the `MethodDef` impl-flags column (II.23.1.11).
    pub struct MethodImplAttributes: u16 {
        /// Method body is CIL
        const IL = 0x0000;
        /// Method body is native code
        const NATIVE = 0x0001;
        /// Method implementation is provided by the runtime
        const RUNTIME = 0x0003;
        /// Method body is unmanaged
        const UNMANAGED = 0x0004;
        /// Method is defined, used primarily in merge scenarios
        const FORWARD_REF = 0x0010;
        /// Method signature must not be mangled for interop
        const PRESERVE_SIG = 0x0080;
        /// Reserved for internal calls into the runtime
        const INTERNAL_CALL = 0x1000;
        /// Method is single-threaded through its body
        const SYNCHRONIZED = 0x0020;
        /// Method may not be inlined
        const NO_INLINING = 0x0008;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `PInvokeAttributes` for the `ImplMap` mapping-flags column (II.23.1.8).
    pub struct PInvokeAttributes: u16 {
        /// Member name is used as-is for lookup
        const NO_MANGLE = 0x0001;
        /// Strings marshal as ANSI
        const CHAR_SET_ANSI = 0x0002;
        /// Strings marshal as Unicode
        const CHAR_SET_UNICODE = 0x0004;
        /// Strings marshal platform-dependently
        const CHAR_SET_AUTO = 0x0006;
        /// The callee may set the last error
        const SUPPORTS_LAST_ERROR = 0x0040;
        /// Platform API calling convention
        const CALL_CONV_WINAPI = 0x0100;
        /// cdecl calling convention
        const CALL_CONV_CDECL = 0x0200;
        /// stdcall calling convention
        const CALL_CONV_STDCALL = 0x0300;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `EventAttributes` for the `Event` flags column (II.23.1.4).
    pub struct EventAttributes: u16 {
        /// Event name is special
        const SPECIAL_NAME = 0x0200;
        /// CLI provides special behavior depending on the name
        const RT_SPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `PropertyAttributes` for the `Property` flags column (II.23.1.14).
    pub struct PropertyAttributes: u16 {
        /// Property name is special
        const SPECIAL_NAME = 0x0200;
        /// CLI provides special behavior depending on the name
        const RT_SPECIAL_NAME = 0x0400;
        /// Property has a default value row
        const HAS_DEFAULT = 0x1000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_masks_match_wire_values() {
        let public_class =
            TypeAttributes::PUBLIC | TypeAttributes::CLASS | TypeAttributes::BEFORE_FIELD_INIT;
        assert_eq!(public_class.bits(), 0x0010_0001);

        let accessor = MethodAttributes::PUBLIC
            | MethodAttributes::HIDE_BY_SIG
            | MethodAttributes::SPECIAL_NAME;
        assert_eq!(accessor.bits(), 0x0886);

        let pinvoke = MethodAttributes::STATIC
            | MethodAttributes::PUBLIC
            | MethodAttributes::HIDE_BY_SIG
            | MethodAttributes::PINVOKE_IMPL;
        assert_eq!(pinvoke.bits(), 0x2096);
    }

    #[test]
    fn unknown_bits_survive_retain() {
        // Wire values may carry bits outside the named set
        let raw = 0x0886u16 | 0x0008;
        let known = MethodAttributes::from_bits_truncate(raw);
        assert!(known.contains(MethodAttributes::PUBLIC));
        assert_eq!(known.bits(), 0x0886);
    }
}
