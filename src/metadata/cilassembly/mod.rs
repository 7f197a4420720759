//! The build-side root container: a descriptor graph that commits into the
//! metadata table catalogue.
//!
//! # Architecture
//!
//! Client code creates a [`CilAssembly`], wires descriptors together through
//! copyable handles (types own their fields, methods, params, properties and
//! events; cross-references go through interned `TypeRef` / `AssemblyRef` /
//! `ModuleRef` / `MemberRef` arenas), then commits the graph once:
//!
//! 1. [`CilAssembly::finalize`] - normalize descriptors into table rows,
//!    intern heaps, encode signatures, sort the sort-required tables and fix
//!    every row id.
//! 2. [`CilAssembly::write`] - plan column widths and emit the metadata root
//!    with all five streams.
//!
//! The lifecycle is a one-way three-state machine ([`BuildState`]): all
//! mutators are rejected once finalization begins.
//!
//! Handles into the `TypeDef`, `TypeRef` and `TypeSpec` arenas have final
//! row ids from the moment of insertion (those tables emit in insertion
//! order), which is what lets signature blobs embed type tokens before the
//! commit. Member row ids (fields, methods, params) depend on preceding
//! types and are assigned during the commit walk.

mod finalize;

use std::fmt;

use rustc_hash::FxHashMap;

use crate::{
    metadata::heaps::UserStringsBuilder,
    metadata::marshalling::NativeType,
    metadata::signatures::{
        SignatureField, SignatureLocalVariables, SignatureMethod, SignatureMethodSpec,
        SignatureProperty, SignatureTypeSpec, ELEMENT_TYPE,
    },
    metadata::token::Token,
    Error::{DescriptorConflict, InvalidState},
    Result,
};

pub(crate) use finalize::EmitState;

/// Lifecycle of a [`CilAssembly`]: Building (mutable), Finalizing (frozen,
/// rows and heaps committed) and Written (stream emitted). Transitions are
/// one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Descriptors and heaps are mutable
    Building,
    /// The graph is frozen and committed to rows; only `write` may follow
    Finalizing,
    /// The stream has been emitted; only reads remain valid
    Written,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildState::Building => "building",
            BuildState::Finalizing => "finalizing",
            BuildState::Written => "written",
        })
    }
}

macro_rules! arena_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) u32);
    };
}

arena_handle!(
    /// Handle to a type definition owned by the assembly.
    TypeDefHandle
);
arena_handle!(
    /// Handle to an interned external type reference.
    TypeRefHandle
);
arena_handle!(
    /// Handle to an interned type specification.
    TypeSpecHandle
);
arena_handle!(
    /// Handle to an interned external assembly reference.
    AssemblyRefHandle
);
arena_handle!(
    /// Handle to an interned external module reference.
    ModuleRefHandle
);
arena_handle!(
    /// Handle to an external member reference.
    MemberRefHandle
);
arena_handle!(
    /// Handle to a generic method instantiation.
    MethodSpecHandle
);
arena_handle!(
    /// Handle to a standalone (local variable) signature.
    StandAloneSigHandle
);
arena_handle!(
    /// Handle to a generic parameter.
    GenericParamHandle
);
arena_handle!(
    /// Handle to a file record of a multi-file assembly.
    FileHandle
);

/// Handle to a field, scoped to its owning type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle {
    pub(crate) ty: u32,
    pub(crate) index: u32,
}

/// Handle to a method, scoped to its owning type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    pub(crate) ty: u32,
    pub(crate) index: u32,
}

/// Handle to a parameter, scoped to its owning method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamHandle {
    pub(crate) ty: u32,
    pub(crate) method: u32,
    pub(crate) index: u32,
}

/// Handle to a property, scoped to its owning type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyHandle {
    pub(crate) ty: u32,
    pub(crate) index: u32,
}

/// Handle to an event, scoped to its owning type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    pub(crate) ty: u32,
    pub(crate) index: u32,
}

/// A reference to a type: defined here, referenced externally, or carried as
/// a specification blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRefOrDef {
    /// A type defined in this module
    Def(TypeDefHandle),
    /// A type in an external scope
    Ref(TypeRefHandle),
    /// A constructed type carried as a signature
    Spec(TypeSpecHandle),
}

impl TypeRefOrDef {
    /// The metadata token of this reference.
    ///
    /// Valid from the moment the referent was created: the three type arenas
    /// emit in insertion order, so row ids never move.
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            TypeRefOrDef::Def(handle) => Token::new(0x0200_0000 | (handle.0 + 1)),
            TypeRefOrDef::Ref(handle) => Token::new(0x0100_0000 | (handle.0 + 1)),
            TypeRefOrDef::Spec(handle) => Token::new(0x1B00_0000 | (handle.0 + 1)),
        }
    }
}

/// A reference to a method: defined here or referenced externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodRef {
    /// A method defined in this module
    Def(MethodHandle),
    /// A member of an external type
    Ref(MemberRefHandle),
}

/// The scope a `TypeRef` resolves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionScope {
    /// The current module
    Module,
    /// An external module of this assembly
    ModuleRef(ModuleRefHandle),
    /// An external assembly
    AssemblyRef(AssemblyRefHandle),
    /// An enclosing type (for references to nested types)
    TypeRef(TypeRefHandle),
}

/// The owner of an external member reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRefParentRef {
    /// A type (definition, reference or specification)
    Type(TypeRefOrDef),
    /// A module, for global members
    ModuleRef(ModuleRefHandle),
    /// A method definition, for vararg call sites
    Method(MethodHandle),
}

/// The signature carried by an external member reference.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberRefSig {
    /// A method reference
    Method(SignatureMethod),
    /// A field reference
    Field(SignatureField),
}

/// Where an exported type or resource actually lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImplementationRef {
    /// In another file of this assembly
    File(FileHandle),
    /// In another assembly
    AssemblyRef(AssemblyRefHandle),
}

/// The owner of a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    /// A generic type
    Type(TypeDefHandle),
    /// A generic method
    Method(MethodHandle),
}

/// A descriptor a custom attribute can decorate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeOwner {
    /// The assembly manifest
    Assembly,
    /// The module
    Module,
    /// A type definition
    Type(TypeDefHandle),
    /// A field
    Field(FieldHandle),
    /// A method
    Method(MethodHandle),
    /// A parameter
    Param(ParamHandle),
    /// A property
    Property(PropertyHandle),
    /// An event
    Event(EventHandle),
    /// A generic parameter
    GenericParam(GenericParamHandle),
}

/// A descriptor a security declaration can protect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityOwner {
    /// The assembly manifest
    Assembly,
    /// A type definition
    Type(TypeDefHandle),
    /// A method
    Method(MethodHandle),
}

/// A compile-time constant attached to a field, parameter or property.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// bool
    Boolean(bool),
    /// char (a UTF-16 code unit)
    Char(u16),
    /// int8
    I1(i8),
    /// uint8
    U1(u8),
    /// int16
    I2(i16),
    /// uint16
    U2(u16),
    /// int32
    I4(i32),
    /// uint32
    U4(u32),
    /// int64
    I8(i64),
    /// uint64
    U8(u64),
    /// float32
    R4(f32),
    /// float64
    R8(f64),
    /// A string literal
    String(String),
    /// The null reference
    Null,
}

impl ConstantValue {
    /// The `ELEMENT_TYPE` code stored in the Constant row.
    #[must_use]
    pub fn element_type(&self) -> u8 {
        match self {
            ConstantValue::Boolean(_) => ELEMENT_TYPE::BOOLEAN,
            ConstantValue::Char(_) => ELEMENT_TYPE::CHAR,
            ConstantValue::I1(_) => ELEMENT_TYPE::I1,
            ConstantValue::U1(_) => ELEMENT_TYPE::U1,
            ConstantValue::I2(_) => ELEMENT_TYPE::I2,
            ConstantValue::U2(_) => ELEMENT_TYPE::U2,
            ConstantValue::I4(_) => ELEMENT_TYPE::I4,
            ConstantValue::U4(_) => ELEMENT_TYPE::U4,
            ConstantValue::I8(_) => ELEMENT_TYPE::I8,
            ConstantValue::U8(_) => ELEMENT_TYPE::U8,
            ConstantValue::R4(_) => ELEMENT_TYPE::R4,
            ConstantValue::R8(_) => ELEMENT_TYPE::R8,
            ConstantValue::String(_) => ELEMENT_TYPE::STRING,
            // Null constants store a zeroed 4-byte CLASS reference
            ConstantValue::Null => ELEMENT_TYPE::CLASS,
        }
    }

    /// The little-endian value bytes stored in the `#Blob` heap.
    #[must_use]
    pub fn to_blob_bytes(&self) -> Vec<u8> {
        match self {
            ConstantValue::Boolean(value) => vec![u8::from(*value)],
            ConstantValue::Char(value) => value.to_le_bytes().to_vec(),
            ConstantValue::I1(value) => value.to_le_bytes().to_vec(),
            ConstantValue::U1(value) => value.to_le_bytes().to_vec(),
            ConstantValue::I2(value) => value.to_le_bytes().to_vec(),
            ConstantValue::U2(value) => value.to_le_bytes().to_vec(),
            ConstantValue::I4(value) => value.to_le_bytes().to_vec(),
            ConstantValue::U4(value) => value.to_le_bytes().to_vec(),
            ConstantValue::I8(value) => value.to_le_bytes().to_vec(),
            ConstantValue::U8(value) => value.to_le_bytes().to_vec(),
            ConstantValue::R4(value) => value.to_le_bytes().to_vec(),
            ConstantValue::R8(value) => value.to_le_bytes().to_vec(),
            ConstantValue::String(value) => {
                value.encode_utf16().flat_map(u16::to_le_bytes).collect()
            }
            ConstantValue::Null => vec![0, 0, 0, 0],
        }
    }
}

/// The one module descriptor of a build.
#[derive(Debug, Clone)]
pub struct ModuleDesc {
    /// Reserved generation counter
    pub generation: u16,
    /// The module file name
    pub name: String,
    /// The module version id
    pub mvid: uguid::Guid,
}

/// The assembly manifest descriptor.
#[derive(Debug, Clone)]
pub struct AssemblyDesc {
    /// Hash algorithm over the assembly's files (0x8004 = SHA-1)
    pub hash_alg_id: u32,
    /// (major, minor, build, revision)
    pub version: (u16, u16, u16, u16),
    /// `AssemblyFlags` bitmask
    pub flags: u32,
    /// Full public key, empty for unsigned assemblies
    pub public_key: Vec<u8>,
    /// Simple assembly name
    pub name: String,
    /// Culture, empty for neutral
    pub culture: String,
    /// Optional OS record (platform id, major, minor)
    pub os: Option<(u32, u32, u32)>,
    /// Optional processor record
    pub processor: Option<u32>,
}

/// An external assembly reference descriptor.
#[derive(Debug, Clone)]
pub struct AssemblyRefDesc {
    /// (major, minor, build, revision)
    pub version: (u16, u16, u16, u16),
    /// `AssemblyFlags` bitmask
    pub flags: u32,
    /// Full public key or 8-byte token, empty for none
    pub public_key_or_token: Vec<u8>,
    /// Simple assembly name
    pub name: String,
    /// Culture, empty for neutral
    pub culture: String,
    /// Hash of the referenced assembly, empty for none
    pub hash_value: Vec<u8>,
    /// Optional OS record (platform id, major, minor)
    pub os: Option<(u32, u32, u32)>,
    /// Optional processor record
    pub processor: Option<u32>,
}

pub(crate) struct TypeRefDesc {
    pub(crate) scope: ResolutionScope,
    pub(crate) name: String,
    pub(crate) namespace: String,
}

pub(crate) struct TypeDefDesc {
    pub(crate) flags: u32,
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) extends: Option<TypeRefOrDef>,
    pub(crate) fields: Vec<FieldDesc>,
    pub(crate) methods: Vec<MethodDesc>,
    pub(crate) interfaces: Vec<TypeRefOrDef>,
    pub(crate) properties: Vec<PropertyDesc>,
    pub(crate) events: Vec<EventDesc>,
    pub(crate) class_layout: Option<(u16, u32)>,
    pub(crate) enclosing: Option<TypeDefHandle>,
    pub(crate) overrides: Vec<(MethodRef, MethodRef)>,
}

pub(crate) struct FieldDesc {
    pub(crate) flags: u16,
    pub(crate) name: String,
    pub(crate) signature: SignatureField,
    pub(crate) constant: Option<ConstantValue>,
    pub(crate) marshalling: Option<NativeType>,
    pub(crate) layout_offset: Option<u32>,
    pub(crate) rva: Option<u32>,
}

pub(crate) struct MethodDesc {
    pub(crate) rva: u32,
    pub(crate) impl_flags: u16,
    pub(crate) flags: u16,
    pub(crate) name: String,
    pub(crate) signature: SignatureMethod,
    pub(crate) params: Vec<ParamDesc>,
    pub(crate) pinvoke: Option<PInvokeDesc>,
}

pub(crate) struct ParamDesc {
    pub(crate) flags: u16,
    pub(crate) sequence: u16,
    pub(crate) name: String,
    pub(crate) constant: Option<ConstantValue>,
    pub(crate) marshalling: Option<NativeType>,
}

pub(crate) struct PInvokeDesc {
    pub(crate) flags: u16,
    pub(crate) module: ModuleRefHandle,
    pub(crate) import_name: String,
}

pub(crate) struct PropertyDesc {
    pub(crate) flags: u16,
    pub(crate) name: String,
    pub(crate) signature: SignatureProperty,
    pub(crate) getter: Option<MethodHandle>,
    pub(crate) setter: Option<MethodHandle>,
    pub(crate) constant: Option<ConstantValue>,
}

pub(crate) struct EventDesc {
    pub(crate) flags: u16,
    pub(crate) name: String,
    pub(crate) event_type: TypeRefOrDef,
    pub(crate) add: Option<MethodHandle>,
    pub(crate) remove: Option<MethodHandle>,
    pub(crate) raise: Option<MethodHandle>,
}

pub(crate) struct GenericParamDesc {
    pub(crate) owner: GenericOwner,
    pub(crate) number: u16,
    pub(crate) flags: u16,
    pub(crate) name: String,
    pub(crate) constraints: Vec<TypeRefOrDef>,
}

pub(crate) struct MemberRefDesc {
    pub(crate) parent: MemberRefParentRef,
    pub(crate) name: String,
    pub(crate) signature: MemberRefSig,
}

pub(crate) struct MethodSpecDesc {
    pub(crate) method: MethodRef,
    pub(crate) instantiation: SignatureMethodSpec,
}

pub(crate) struct FileDesc {
    pub(crate) flags: u32,
    pub(crate) name: String,
    pub(crate) hash_value: Vec<u8>,
}

pub(crate) struct ExportedTypeDesc {
    pub(crate) flags: u32,
    pub(crate) type_def_id: u32,
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) implementation: ImplementationRef,
}

pub(crate) struct ManifestResourceDesc {
    pub(crate) offset: u32,
    pub(crate) flags: u32,
    pub(crate) name: String,
    pub(crate) implementation: Option<ImplementationRef>,
}

pub(crate) struct CustomAttributeDesc {
    pub(crate) owner: AttributeOwner,
    pub(crate) constructor: MethodRef,
    pub(crate) value: Vec<u8>,
}

pub(crate) struct DeclSecurityDesc {
    pub(crate) owner: SecurityOwner,
    pub(crate) action: u16,
    pub(crate) permission_set: Vec<u8>,
}

/// The build-side root container.
///
/// See the [module documentation](self) for the overall flow.
pub struct CilAssembly {
    pub(crate) state: BuildState,
    pub(crate) runtime_version: String,
    pub(crate) module: ModuleDesc,
    pub(crate) assembly: Option<AssemblyDesc>,
    pub(crate) types: Vec<TypeDefDesc>,
    pub(crate) type_refs: Vec<TypeRefDesc>,
    type_ref_index: FxHashMap<(ResolutionScope, String, String), u32>,
    pub(crate) type_specs: Vec<SignatureTypeSpec>,
    pub(crate) assembly_refs: Vec<AssemblyRefDesc>,
    assembly_ref_index: FxHashMap<(String, (u16, u16, u16, u16)), u32>,
    pub(crate) module_refs: Vec<String>,
    module_ref_index: FxHashMap<String, u32>,
    pub(crate) member_refs: Vec<MemberRefDesc>,
    pub(crate) method_specs: Vec<MethodSpecDesc>,
    pub(crate) standalone_sigs: Vec<SignatureLocalVariables>,
    pub(crate) generic_params: Vec<GenericParamDesc>,
    pub(crate) files: Vec<FileDesc>,
    pub(crate) exported_types: Vec<ExportedTypeDesc>,
    pub(crate) resources: Vec<ManifestResourceDesc>,
    pub(crate) custom_attributes: Vec<CustomAttributeDesc>,
    pub(crate) decl_security: Vec<DeclSecurityDesc>,
    pub(crate) user_strings: UserStringsBuilder,
    pub(crate) emit: Option<EmitState>,
}

impl CilAssembly {
    /// Create a new build for a module of the given name.
    ///
    /// The Mvid starts zeroed; set it with [`CilAssembly::set_mvid`] when a
    /// stable identity is wanted.
    ///
    /// ## Arguments
    /// * 'module_name' - The module file name, e.g. `m.dll`
    #[must_use]
    pub fn new(module_name: &str) -> Self {
        CilAssembly {
            state: BuildState::Building,
            runtime_version: "v4.0.30319".to_string(),
            module: ModuleDesc {
                generation: 0,
                name: module_name.to_string(),
                mvid: uguid::Guid::ZERO,
            },
            assembly: None,
            types: Vec::new(),
            type_refs: Vec::new(),
            type_ref_index: FxHashMap::default(),
            type_specs: Vec::new(),
            assembly_refs: Vec::new(),
            assembly_ref_index: FxHashMap::default(),
            module_refs: Vec::new(),
            module_ref_index: FxHashMap::default(),
            member_refs: Vec::new(),
            method_specs: Vec::new(),
            standalone_sigs: Vec::new(),
            generic_params: Vec::new(),
            files: Vec::new(),
            exported_types: Vec::new(),
            resources: Vec::new(),
            custom_attributes: Vec::new(),
            decl_security: Vec::new(),
            user_strings: UserStringsBuilder::new(),
            emit: None,
        }
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    fn ensure_building(&self) -> Result<()> {
        if self.state != BuildState::Building {
            return Err(InvalidState(self.state));
        }
        Ok(())
    }

    /// Set the module version id.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_mvid(&mut self, mvid: uguid::Guid) -> Result<()> {
        self.ensure_building()?;
        self.module.mvid = mvid;
        Ok(())
    }

    /// Set the runtime version string written into the metadata root.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_runtime_version(&mut self, version: &str) -> Result<()> {
        self.ensure_building()?;
        self.runtime_version = version.to_string();
        Ok(())
    }

    /// Attach the assembly manifest.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began, or
    /// [`DescriptorConflict`] if a manifest is already attached
    pub fn set_assembly(&mut self, assembly: AssemblyDesc) -> Result<()> {
        self.ensure_building()?;
        if self.assembly.is_some() {
            return Err(DescriptorConflict("assembly manifest already set".to_string()));
        }
        self.assembly = Some(assembly);
        Ok(())
    }

    /// Define a new type.
    ///
    /// A type's identity is `(namespace, name)` while it stays top-level and
    /// `(enclosing type, name)` once [`CilAssembly::add_nested_type`] nests
    /// it. Because nesting is declared after definition, duplicate identities
    /// are rejected by [`CilAssembly::finalize`], when every type's final
    /// identity is known.
    ///
    /// ## Arguments
    /// * 'namespace' - The namespace, empty for the global namespace
    /// * 'name'      - The simple type name
    /// * 'flags'     - `TypeAttributes` bitmask
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_type(&mut self, namespace: &str, name: &str, flags: u32) -> Result<TypeDefHandle> {
        self.ensure_building()?;

        let handle = TypeDefHandle(self.types.len() as u32);
        self.types.push(TypeDefDesc {
            flags,
            name: name.to_string(),
            namespace: namespace.to_string(),
            extends: None,
            fields: Vec::new(),
            methods: Vec::new(),
            interfaces: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            class_layout: None,
            enclosing: None,
            overrides: Vec::new(),
        });

        Ok(handle)
    }

    /// Set the base type of a type.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_extends(&mut self, ty: TypeDefHandle, extends: TypeRefOrDef) -> Result<()> {
        self.ensure_building()?;
        self.types[ty.0 as usize].extends = Some(extends);
        Ok(())
    }

    /// Record that `ty` implements `interface`.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn add_interface_impl(&mut self, ty: TypeDefHandle, interface: TypeRefOrDef) -> Result<()> {
        self.ensure_building()?;
        self.types[ty.0 as usize].interfaces.push(interface);
        Ok(())
    }

    /// Nest `nested` inside `enclosing`.
    ///
    /// Nesting rekeys the type's identity from `(namespace, name)` to
    /// `(enclosing type, name)`, so same-named types under different
    /// enclosing types coexist; duplicates under one enclosing type are
    /// rejected by [`CilAssembly::finalize`].
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began, or
    /// [`DescriptorConflict`] if the type is already nested
    pub fn add_nested_type(
        &mut self,
        nested: TypeDefHandle,
        enclosing: TypeDefHandle,
    ) -> Result<()> {
        self.ensure_building()?;
        let desc = &mut self.types[nested.0 as usize];
        if desc.enclosing.is_some() {
            return Err(DescriptorConflict(format!(
                "type {} is already nested",
                desc.name
            )));
        }
        desc.enclosing = Some(enclosing);
        Ok(())
    }

    /// Set explicit packing and size for a type.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_class_layout(
        &mut self,
        ty: TypeDefHandle,
        packing_size: u16,
        class_size: u32,
    ) -> Result<()> {
        self.ensure_building()?;
        self.types[ty.0 as usize].class_layout = Some((packing_size, class_size));
        Ok(())
    }

    /// Add a field to a type.
    ///
    /// ## Arguments
    /// * 'ty'        - The owning type
    /// * 'name'      - The field name
    /// * 'flags'     - `FieldAttributes` bitmask
    /// * 'signature' - The field signature
    ///
    /// # Errors
    /// Returns [`DescriptorConflict`] for a duplicate (name, signature) pair
    /// within the type
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_field(
        &mut self,
        ty: TypeDefHandle,
        name: &str,
        flags: u16,
        signature: SignatureField,
    ) -> Result<FieldHandle> {
        self.ensure_building()?;

        let desc = &mut self.types[ty.0 as usize];
        if desc
            .fields
            .iter()
            .any(|field| field.name == name && field.signature == signature)
        {
            return Err(DescriptorConflict(format!(
                "field {} is already defined on {}",
                name, desc.name
            )));
        }

        let handle = FieldHandle {
            ty: ty.0,
            index: desc.fields.len() as u32,
        };
        desc.fields.push(FieldDesc {
            flags,
            name: name.to_string(),
            signature,
            constant: None,
            marshalling: None,
            layout_offset: None,
            rva: None,
        });

        Ok(handle)
    }

    /// Add a method to a type.
    ///
    /// ## Arguments
    /// * 'ty'         - The owning type
    /// * 'name'       - The method name
    /// * 'flags'      - `MethodAttributes` bitmask
    /// * '`impl_flags`' - `MethodImplAttributes` bitmask
    /// * 'signature'  - The method signature
    ///
    /// # Errors
    /// Returns [`DescriptorConflict`] for a duplicate (name, signature) pair
    /// within the type
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_method(
        &mut self,
        ty: TypeDefHandle,
        name: &str,
        flags: u16,
        impl_flags: u16,
        signature: SignatureMethod,
    ) -> Result<MethodHandle> {
        self.ensure_building()?;

        let desc = &mut self.types[ty.0 as usize];
        if desc
            .methods
            .iter()
            .any(|method| method.name == name && method.signature == signature)
        {
            return Err(DescriptorConflict(format!(
                "method {} is already defined on {}",
                name, desc.name
            )));
        }

        let handle = MethodHandle {
            ty: ty.0,
            index: desc.methods.len() as u32,
        };
        desc.methods.push(MethodDesc {
            rva: 0,
            impl_flags,
            flags,
            name: name.to_string(),
            signature,
            params: Vec::new(),
            pinvoke: None,
        });

        Ok(handle)
    }

    /// Set the method body RVA, as assigned by the external image layout.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_method_rva(&mut self, method: MethodHandle, rva: u32) -> Result<()> {
        self.ensure_building()?;
        self.types[method.ty as usize].methods[method.index as usize].rva = rva;
        Ok(())
    }

    /// Add a parameter row to a method.
    ///
    /// ## Arguments
    /// * 'method'   - The owning method
    /// * 'sequence' - Parameter position, 0 for the return value
    /// * 'name'     - The parameter name
    /// * 'flags'    - `ParamAttributes` bitmask
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_param(
        &mut self,
        method: MethodHandle,
        sequence: u16,
        name: &str,
        flags: u16,
    ) -> Result<ParamHandle> {
        self.ensure_building()?;

        let desc = &mut self.types[method.ty as usize].methods[method.index as usize];
        let handle = ParamHandle {
            ty: method.ty,
            method: method.index,
            index: desc.params.len() as u32,
        };
        desc.params.push(ParamDesc {
            flags,
            sequence,
            name: name.to_string(),
            constant: None,
            marshalling: None,
        });

        Ok(handle)
    }

    /// Add a property to a type.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_property(
        &mut self,
        ty: TypeDefHandle,
        name: &str,
        flags: u16,
        signature: SignatureProperty,
    ) -> Result<PropertyHandle> {
        self.ensure_building()?;

        let desc = &mut self.types[ty.0 as usize];
        let handle = PropertyHandle {
            ty: ty.0,
            index: desc.properties.len() as u32,
        };
        desc.properties.push(PropertyDesc {
            flags,
            name: name.to_string(),
            signature,
            getter: None,
            setter: None,
            constant: None,
        });

        Ok(handle)
    }

    /// Wire accessor methods to a property.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_property_accessors(
        &mut self,
        property: PropertyHandle,
        getter: Option<MethodHandle>,
        setter: Option<MethodHandle>,
    ) -> Result<()> {
        self.ensure_building()?;
        let desc = &mut self.types[property.ty as usize].properties[property.index as usize];
        desc.getter = getter;
        desc.setter = setter;
        Ok(())
    }

    /// Add an event to a type.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_event(
        &mut self,
        ty: TypeDefHandle,
        name: &str,
        flags: u16,
        event_type: TypeRefOrDef,
    ) -> Result<EventHandle> {
        self.ensure_building()?;

        let desc = &mut self.types[ty.0 as usize];
        let handle = EventHandle {
            ty: ty.0,
            index: desc.events.len() as u32,
        };
        desc.events.push(EventDesc {
            flags,
            name: name.to_string(),
            event_type,
            add: None,
            remove: None,
            raise: None,
        });

        Ok(handle)
    }

    /// Wire accessor methods to an event.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_event_accessors(
        &mut self,
        event: EventHandle,
        add: Option<MethodHandle>,
        remove: Option<MethodHandle>,
        raise: Option<MethodHandle>,
    ) -> Result<()> {
        self.ensure_building()?;
        let desc = &mut self.types[event.ty as usize].events[event.index as usize];
        desc.add = add;
        desc.remove = remove;
        desc.raise = raise;
        Ok(())
    }

    /// Attach a constant to a field.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_field_constant(&mut self, field: FieldHandle, value: ConstantValue) -> Result<()> {
        self.ensure_building()?;
        self.types[field.ty as usize].fields[field.index as usize].constant = Some(value);
        Ok(())
    }

    /// Attach a constant to a parameter.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_param_constant(&mut self, param: ParamHandle, value: ConstantValue) -> Result<()> {
        self.ensure_building()?;
        self.types[param.ty as usize].methods[param.method as usize].params
            [param.index as usize]
            .constant = Some(value);
        Ok(())
    }

    /// Attach a constant to a property.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_property_constant(
        &mut self,
        property: PropertyHandle,
        value: ConstantValue,
    ) -> Result<()> {
        self.ensure_building()?;
        self.types[property.ty as usize].properties[property.index as usize].constant =
            Some(value);
        Ok(())
    }

    /// Attach a marshalling descriptor to a field.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_field_marshalling(
        &mut self,
        field: FieldHandle,
        native_type: NativeType,
    ) -> Result<()> {
        self.ensure_building()?;
        self.types[field.ty as usize].fields[field.index as usize].marshalling = Some(native_type);
        Ok(())
    }

    /// Attach a marshalling descriptor to a parameter.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_param_marshalling(
        &mut self,
        param: ParamHandle,
        native_type: NativeType,
    ) -> Result<()> {
        self.ensure_building()?;
        self.types[param.ty as usize].methods[param.method as usize].params
            [param.index as usize]
            .marshalling = Some(native_type);
        Ok(())
    }

    /// Set the explicit byte offset of a field.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_field_offset(&mut self, field: FieldHandle, offset: u32) -> Result<()> {
        self.ensure_building()?;
        self.types[field.ty as usize].fields[field.index as usize].layout_offset = Some(offset);
        Ok(())
    }

    /// Map a field to initial data at the given RVA.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_field_rva(&mut self, field: FieldHandle, rva: u32) -> Result<()> {
        self.ensure_building()?;
        self.types[field.ty as usize].fields[field.index as usize].rva = Some(rva);
        Ok(())
    }

    /// Forward a method to unmanaged code.
    ///
    /// ## Arguments
    /// * 'method'      - The forwarded method
    /// * 'module'      - The target module
    /// * '`import_name`' - The unmanaged entry point name
    /// * 'flags'       - `PInvokeAttributes` bitmask
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn set_pinvoke(
        &mut self,
        method: MethodHandle,
        module: ModuleRefHandle,
        import_name: &str,
        flags: u16,
    ) -> Result<()> {
        self.ensure_building()?;
        self.types[method.ty as usize].methods[method.index as usize].pinvoke = Some(PInvokeDesc {
            flags,
            module,
            import_name: import_name.to_string(),
        });
        Ok(())
    }

    /// Record an explicit override: `body` implements `declaration` on `ty`.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn add_method_impl(
        &mut self,
        ty: TypeDefHandle,
        body: MethodRef,
        declaration: MethodRef,
    ) -> Result<()> {
        self.ensure_building()?;
        self.types[ty.0 as usize].overrides.push((body, declaration));
        Ok(())
    }

    /// Add a generic parameter to a type or method.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_generic_param(
        &mut self,
        owner: GenericOwner,
        number: u16,
        flags: u16,
        name: &str,
    ) -> Result<GenericParamHandle> {
        self.ensure_building()?;

        let handle = GenericParamHandle(self.generic_params.len() as u32);
        self.generic_params.push(GenericParamDesc {
            owner,
            number,
            flags,
            name: name.to_string(),
            constraints: Vec::new(),
        });

        Ok(handle)
    }

    /// Constrain a generic parameter to a type.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn add_generic_constraint(
        &mut self,
        param: GenericParamHandle,
        constraint: TypeRefOrDef,
    ) -> Result<()> {
        self.ensure_building()?;
        self.generic_params[param.0 as usize].constraints.push(constraint);
        Ok(())
    }

    /// Intern a reference to a type in an external scope.
    ///
    /// A given (scope, namespace, name) referent has one identity per build;
    /// repeated calls return the original handle.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn type_ref(
        &mut self,
        scope: ResolutionScope,
        namespace: &str,
        name: &str,
    ) -> Result<TypeRefHandle> {
        self.ensure_building()?;

        let key = (scope, namespace.to_string(), name.to_string());
        if let Some(&index) = self.type_ref_index.get(&key) {
            return Ok(TypeRefHandle(index));
        }

        let handle = TypeRefHandle(self.type_refs.len() as u32);
        self.type_refs.push(TypeRefDesc {
            scope,
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
        self.type_ref_index.insert(key, handle.0);

        Ok(handle)
    }

    /// Intern a type specification.
    ///
    /// Structurally equal signatures share one row.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn type_spec(&mut self, signature: SignatureTypeSpec) -> Result<TypeSpecHandle> {
        self.ensure_building()?;

        if let Some(index) = self.type_specs.iter().position(|spec| *spec == signature) {
            return Ok(TypeSpecHandle(index as u32));
        }

        let handle = TypeSpecHandle(self.type_specs.len() as u32);
        self.type_specs.push(signature);

        Ok(handle)
    }

    /// Intern a reference to an external assembly.
    ///
    /// Identity is the (name, version) pair.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn assembly_ref(&mut self, desc: AssemblyRefDesc) -> Result<AssemblyRefHandle> {
        self.ensure_building()?;

        let key = (desc.name.clone(), desc.version);
        if let Some(&index) = self.assembly_ref_index.get(&key) {
            return Ok(AssemblyRefHandle(index));
        }

        let handle = AssemblyRefHandle(self.assembly_refs.len() as u32);
        self.assembly_refs.push(desc);
        self.assembly_ref_index.insert(key, handle.0);

        Ok(handle)
    }

    /// Intern a reference to an external module.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn module_ref(&mut self, name: &str) -> Result<ModuleRefHandle> {
        self.ensure_building()?;

        if let Some(&index) = self.module_ref_index.get(name) {
            return Ok(ModuleRefHandle(index));
        }

        let handle = ModuleRefHandle(self.module_refs.len() as u32);
        self.module_refs.push(name.to_string());
        self.module_ref_index.insert(name.to_string(), handle.0);

        Ok(handle)
    }

    /// Add a reference to a member of an external type.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn member_ref(
        &mut self,
        parent: MemberRefParentRef,
        name: &str,
        signature: MemberRefSig,
    ) -> Result<MemberRefHandle> {
        self.ensure_building()?;

        let handle = MemberRefHandle(self.member_refs.len() as u32);
        self.member_refs.push(MemberRefDesc {
            parent,
            name: name.to_string(),
            signature,
        });

        Ok(handle)
    }

    /// Add a generic method instantiation.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn method_spec(
        &mut self,
        method: MethodRef,
        instantiation: SignatureMethodSpec,
    ) -> Result<MethodSpecHandle> {
        self.ensure_building()?;

        let handle = MethodSpecHandle(self.method_specs.len() as u32);
        self.method_specs.push(MethodSpecDesc {
            method,
            instantiation,
        });

        Ok(handle)
    }

    /// Add a standalone local-variable signature.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_standalone_sig(
        &mut self,
        signature: SignatureLocalVariables,
    ) -> Result<StandAloneSigHandle> {
        self.ensure_building()?;

        let handle = StandAloneSigHandle(self.standalone_sigs.len() as u32);
        self.standalone_sigs.push(signature);

        Ok(handle)
    }

    /// Add a file record to the assembly manifest.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_file(&mut self, name: &str, flags: u32, hash_value: Vec<u8>) -> Result<FileHandle> {
        self.ensure_building()?;

        let handle = FileHandle(self.files.len() as u32);
        self.files.push(FileDesc {
            flags,
            name: name.to_string(),
            hash_value,
        });

        Ok(handle)
    }

    /// Export or forward a type through the assembly manifest.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn add_exported_type(
        &mut self,
        namespace: &str,
        name: &str,
        flags: u32,
        type_def_id: u32,
        implementation: ImplementationRef,
    ) -> Result<()> {
        self.ensure_building()?;
        self.exported_types.push(ExportedTypeDesc {
            flags,
            type_def_id,
            name: name.to_string(),
            namespace: namespace.to_string(),
            implementation,
        });
        Ok(())
    }

    /// Add a manifest resource.
    ///
    /// ## Arguments
    /// * 'name'   - The resource name
    /// * 'flags'  - 1 public, 2 private
    /// * 'offset' - Offset in the image's resource area, supplied externally
    /// * 'implementation' - Where the resource lives, `None` for embedded
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn add_resource(
        &mut self,
        name: &str,
        flags: u32,
        offset: u32,
        implementation: Option<ImplementationRef>,
    ) -> Result<()> {
        self.ensure_building()?;
        self.resources.push(ManifestResourceDesc {
            offset,
            flags,
            name: name.to_string(),
            implementation,
        });
        Ok(())
    }

    /// Attach a custom attribute to a descriptor.
    ///
    /// ## Arguments
    /// * 'owner'       - The decorated descriptor
    /// * 'constructor' - The attribute constructor
    /// * 'value'       - The serialized attribute arguments
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn add_custom_attribute(
        &mut self,
        owner: AttributeOwner,
        constructor: MethodRef,
        value: Vec<u8>,
    ) -> Result<()> {
        self.ensure_building()?;
        self.custom_attributes.push(CustomAttributeDesc {
            owner,
            constructor,
            value,
        });
        Ok(())
    }

    /// Attach a custom attribute from a typed value, serializing it against
    /// the constructor's signature.
    ///
    /// ## Arguments
    /// * 'owner'             - The decorated descriptor
    /// * 'constructor'       - The attribute constructor
    /// * '`constructor_sig`' - The constructor's method signature
    /// * 'value'             - The typed fixed and named arguments
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began, or an encode error
    /// if the value does not fit the constructor
    pub fn add_custom_attribute_value(
        &mut self,
        owner: AttributeOwner,
        constructor: MethodRef,
        constructor_sig: &SignatureMethod,
        value: &crate::metadata::customattributes::CustomAttributeValue,
    ) -> Result<()> {
        let blob =
            crate::metadata::customattributes::encode_custom_attribute_value(value, constructor_sig)?;
        self.add_custom_attribute(owner, constructor, blob)
    }

    /// Attach a declarative security permission set.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn add_decl_security(
        &mut self,
        owner: SecurityOwner,
        action: u16,
        permission_set: Vec<u8>,
    ) -> Result<()> {
        self.ensure_building()?;
        self.decl_security.push(DeclSecurityDesc {
            owner,
            action,
            permission_set,
        });
        Ok(())
    }

    /// Intern a string literal into the `#US` heap and return its offset,
    /// for use in `ldstr` tokens.
    ///
    /// # Errors
    /// Returns [`InvalidState`] after finalization began
    pub fn add_user_string(&mut self, value: &str) -> Result<u32> {
        self.ensure_building()?;
        self.user_strings.intern(value)
    }
}
