//! The commit pipeline: descriptor graph to serialized metadata root.
//!
//! Finalization runs in fixed phases. The table walk creates every row and
//! interns names, GUIDs and token-free blobs; the signature walk encodes and
//! patches the signature blobs (type tokens are final from insertion, so
//! nothing here waits on the sort); the sorter establishes the mandated
//! orderings; width planning runs once all heap appends are done. `write`
//! then emits the `#~` stream and wraps all five streams into the root.
//!
//! Row ids for members are planned up front from the descriptor counts, so
//! every cross-reference the walk emits is already final. Tables whose rows
//! other tables index by row id (`GenericParam` under its constraints) are
//! emitted pre-ordered, which keeps the sort pass a pure reordering with no
//! reference fixups.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::{
    metadata::heaps::{BlobBuilder, GuidBuilder, StringsBuilder},
    metadata::marshalling::encode_marshalling_descriptor,
    metadata::signatures::{
        encode_field_signature, encode_local_var_signature, encode_method_signature,
        encode_method_spec_signature, encode_property_signature, encode_typespec_signature,
    },
    metadata::streams::{Root, TablesWriter},
    metadata::tables::{
        rows::{
            AssemblyOsRaw, AssemblyProcessorRaw, AssemblyRaw, AssemblyRefOsRaw,
            AssemblyRefProcessorRaw, AssemblyRefRaw, ClassLayoutRaw, ConstantRaw,
            CustomAttributeRaw, DeclSecurityRaw, EventMapRaw, EventRaw, ExportedTypeRaw,
            FieldLayoutRaw, FieldMarshalRaw, FieldRaw, FieldRvaRaw, FileRaw,
            GenericParamConstraintRaw, GenericParamRaw, ImplMapRaw, InterfaceImplRaw,
            ManifestResourceRaw, MemberRefRaw, MethodDefRaw, MethodImplRaw, MethodSemanticsRaw,
            MethodSpecRaw, ModuleRaw, ModuleRefRaw, NestedClassRaw, ParamRaw, PropertyMapRaw,
            PropertyRaw, StandAloneSigRaw, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
        },
        CodedIndex, CodedIndexType, TableId, TableInfo, TableInfoRef, TableStore,
    },
    metadata::token::Token,
    Error::{DescriptorConflict, InvalidState},
    Result,
};

use super::{
    AttributeOwner, BuildState, CilAssembly, EventHandle, FieldHandle, GenericOwner,
    GenericParamHandle, ImplementationRef, MemberRefParentRef, MemberRefSig, MethodHandle,
    MethodRef, ParamHandle, PropertyHandle, ResolutionScope, SecurityOwner,
};

/// Accessor semantics bits of the `MethodSemantics` table.
mod semantics {
    pub const SETTER: u16 = 0x0001;
    pub const GETTER: u16 = 0x0002;
    pub const ADD_ON: u16 = 0x0008;
    pub const REMOVE_ON: u16 = 0x0010;
    pub const FIRE: u16 = 0x0020;
}

/// Everything finalization produces: the heap builders, the row store and
/// the planned row ids of every member descriptor.
pub(crate) struct EmitState {
    pub(crate) strings: StringsBuilder,
    pub(crate) blobs: BlobBuilder,
    pub(crate) guids: GuidBuilder,
    pub(crate) store: TableStore,
    pub(crate) info: Option<TableInfoRef>,
    first_field_rid: Vec<u32>,
    first_method_rid: Vec<u32>,
    first_param_rid: Vec<Vec<u32>>,
    property_rid: Vec<Vec<u32>>,
    event_rid: Vec<Vec<u32>>,
    generic_param_rid: Vec<u32>,
}

impl EmitState {
    fn field_rid(&self, handle: FieldHandle) -> u32 {
        self.first_field_rid[handle.ty as usize] + handle.index
    }

    fn method_rid(&self, handle: MethodHandle) -> u32 {
        self.first_method_rid[handle.ty as usize] + handle.index
    }

    fn param_rid(&self, handle: ParamHandle) -> u32 {
        self.first_param_rid[handle.ty as usize][handle.method as usize] + handle.index
    }

    fn property_rid(&self, handle: PropertyHandle) -> u32 {
        self.property_rid[handle.ty as usize][handle.index as usize]
    }

    fn event_rid(&self, handle: EventHandle) -> u32 {
        self.event_rid[handle.ty as usize][handle.index as usize]
    }

    fn generic_param_rid(&self, handle: GenericParamHandle) -> u32 {
        self.generic_param_rid[handle.0 as usize]
    }

    fn method_def_or_ref(&self, method: MethodRef) -> CodedIndex {
        match method {
            MethodRef::Def(handle) => CodedIndex::new(TableId::MethodDef, self.method_rid(handle)),
            MethodRef::Ref(handle) => CodedIndex::new(TableId::MemberRef, handle.0 + 1),
        }
    }
}

fn type_def_or_ref(reference: Option<super::TypeRefOrDef>) -> CodedIndex {
    match reference {
        None => CodedIndex::null(CodedIndexType::TypeDefOrRef),
        Some(super::TypeRefOrDef::Def(handle)) => CodedIndex::new(TableId::TypeDef, handle.0 + 1),
        Some(super::TypeRefOrDef::Ref(handle)) => CodedIndex::new(TableId::TypeRef, handle.0 + 1),
        Some(super::TypeRefOrDef::Spec(handle)) => CodedIndex::new(TableId::TypeSpec, handle.0 + 1),
    }
}

fn resolution_scope(scope: ResolutionScope) -> CodedIndex {
    match scope {
        ResolutionScope::Module => CodedIndex::new(TableId::Module, 1),
        ResolutionScope::ModuleRef(handle) => CodedIndex::new(TableId::ModuleRef, handle.0 + 1),
        ResolutionScope::AssemblyRef(handle) => CodedIndex::new(TableId::AssemblyRef, handle.0 + 1),
        ResolutionScope::TypeRef(handle) => CodedIndex::new(TableId::TypeRef, handle.0 + 1),
    }
}

fn implementation(reference: Option<ImplementationRef>) -> CodedIndex {
    match reference {
        None => CodedIndex::null(CodedIndexType::Implementation),
        Some(ImplementationRef::File(handle)) => CodedIndex::new(TableId::File, handle.0 + 1),
        Some(ImplementationRef::AssemblyRef(handle)) => {
            CodedIndex::new(TableId::AssemblyRef, handle.0 + 1)
        }
    }
}

impl CilAssembly {
    /// Commit the descriptor graph: rows, heaps, signatures, sorting and the
    /// width plan. One-shot; mutators are rejected from here on.
    ///
    /// # Errors
    /// Returns [`InvalidState`] when called twice, [`DescriptorConflict`]
    /// for duplicate type identities, or an encode error from the signature
    /// and blob codecs
    pub fn finalize(&mut self) -> Result<()> {
        if self.state != BuildState::Building {
            return Err(InvalidState(self.state));
        }
        self.state = BuildState::Finalizing;

        self.validate_type_identities()?;

        let mut emit = self.build_tables()?;
        self.build_signatures(&mut emit)?;

        emit.store.sort_required_tables();

        // Width planning comes last: every row and every heap byte is in
        emit.info = Some(Arc::new(TableInfo::with_counts(
            &emit.store.present_counts(),
            emit.strings.is_large(),
            emit.guids.is_large(),
            emit.blobs.is_large(),
        )));

        self.emit = Some(emit);
        Ok(())
    }

    /// Serialize the committed graph into a metadata root image.
    ///
    /// # Errors
    /// Returns [`InvalidState`] unless `finalize` ran exactly once before,
    /// or an encode error from the stream writer
    pub fn write(&mut self) -> Result<Vec<u8>> {
        if self.state != BuildState::Finalizing {
            return Err(InvalidState(self.state));
        }

        let emit = self
            .emit
            .as_ref()
            .ok_or(InvalidState(BuildState::Building))?;

        let (tables_stream, _info) = TablesWriter::write(
            &emit.store,
            emit.strings.is_large(),
            emit.guids.is_large(),
            emit.blobs.is_large(),
        )?;

        let image = Root::write(
            &self.runtime_version,
            &[
                ("#~", &tables_stream),
                ("#Strings", emit.strings.as_slice()),
                ("#US", self.user_strings.as_slice()),
                ("#GUID", emit.guids.as_slice()),
                ("#Blob", emit.blobs.as_slice()),
            ],
        )?;

        self.state = BuildState::Written;
        Ok(image)
    }

    /// Reject duplicate type identities once every type's final identity is
    /// known: `(namespace, name)` for top-level types, `(enclosing, name)`
    /// for nested ones. Deferred to finalize because nesting is declared
    /// after definition.
    fn validate_type_identities(&self) -> Result<()> {
        let mut top_level: FxHashSet<(&str, &str)> = FxHashSet::default();
        let mut nested: FxHashSet<(u32, &str)> = FxHashSet::default();

        for ty in &self.types {
            match ty.enclosing {
                None => {
                    if !top_level.insert((ty.namespace.as_str(), ty.name.as_str())) {
                        return Err(DescriptorConflict(format!(
                            "type {}{}{} is already defined",
                            ty.namespace,
                            if ty.namespace.is_empty() { "" } else { "." },
                            ty.name
                        )));
                    }
                }
                Some(enclosing) => {
                    if !nested.insert((enclosing.0, ty.name.as_str())) {
                        return Err(DescriptorConflict(format!(
                            "type {} is already nested in {}",
                            ty.name, self.types[enclosing.0 as usize].name
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Plan member row ids from descriptor counts, before any row exists.
    #[allow(clippy::cast_possible_truncation)]
    fn plan_rids(&self) -> EmitState {
        let mut first_field_rid = Vec::with_capacity(self.types.len());
        let mut first_method_rid = Vec::with_capacity(self.types.len());
        let mut first_param_rid = Vec::with_capacity(self.types.len());
        let mut property_rid = Vec::with_capacity(self.types.len());
        let mut event_rid = Vec::with_capacity(self.types.len());

        let mut next_field = 1u32;
        let mut next_method = 1u32;
        let mut next_param = 1u32;
        let mut next_property = 1u32;
        let mut next_event = 1u32;

        for ty in &self.types {
            first_field_rid.push(next_field);
            next_field += ty.fields.len() as u32;

            first_method_rid.push(next_method);
            next_method += ty.methods.len() as u32;

            let mut params = Vec::with_capacity(ty.methods.len());
            for method in &ty.methods {
                params.push(next_param);
                next_param += method.params.len() as u32;
            }
            first_param_rid.push(params);

            let mut properties = Vec::with_capacity(ty.properties.len());
            for _ in &ty.properties {
                properties.push(next_property);
                next_property += 1;
            }
            property_rid.push(properties);

            let mut events = Vec::with_capacity(ty.events.len());
            for _ in &ty.events {
                events.push(next_event);
                next_event += 1;
            }
            event_rid.push(events);
        }

        // GenericParam emits pre-ordered by (owner, number) so constraint
        // rows can hold final row ids
        let mut order: Vec<usize> = (0..self.generic_params.len()).collect();
        order.sort_by_key(|&index| {
            let param = &self.generic_params[index];
            let owner = match param.owner {
                GenericOwner::Type(handle) => CodedIndex::new(TableId::TypeDef, handle.0 + 1),
                GenericOwner::Method(handle) => CodedIndex::new(
                    TableId::MethodDef,
                    first_method_rid[handle.ty as usize] + handle.index,
                ),
            };
            (owner.sort_key(CodedIndexType::TypeOrMethodDef), param.number)
        });

        let mut generic_param_rid = vec![0u32; self.generic_params.len()];
        for (position, &index) in order.iter().enumerate() {
            generic_param_rid[index] = position as u32 + 1;
        }

        EmitState {
            strings: StringsBuilder::new(),
            blobs: BlobBuilder::new(),
            guids: GuidBuilder::new(),
            store: TableStore::new(),
            info: None,
            first_field_rid,
            first_method_rid,
            first_param_rid,
            property_rid,
            event_rid,
            generic_param_rid,
        }
    }

    /// The table walk: every descriptor becomes its row(s), names and
    /// token-free blobs land in the heaps. Signature columns stay 0 until
    /// the signature walk patches them.
    #[allow(clippy::cast_possible_truncation, clippy::too_many_lines)]
    fn build_tables(&self) -> Result<EmitState> {
        let mut emit = self.plan_rids();

        let module_name = emit.strings.intern(&self.module.name);
        let mvid = emit.guids.add(self.module.mvid);
        emit.store.module.push(ModuleRaw {
            generation: self.module.generation,
            name: module_name,
            mvid,
            enc_id: 0,
            enc_base_id: 0,
        });

        for type_ref in &self.type_refs {
            let name = emit.strings.intern(&type_ref.name);
            let namespace = emit.strings.intern(&type_ref.namespace);
            emit.store.type_ref.push(TypeRefRaw {
                resolution_scope: resolution_scope(type_ref.scope),
                name,
                namespace,
            });
        }

        for (index, ty) in self.types.iter().enumerate() {
            let name = emit.strings.intern(&ty.name);
            let namespace = emit.strings.intern(&ty.namespace);
            emit.store.type_def.push(TypeDefRaw {
                flags: ty.flags,
                name,
                namespace,
                extends: type_def_or_ref(ty.extends),
                field_list: emit.first_field_rid[index],
                method_list: emit.first_method_rid[index],
            });

            for field in &ty.fields {
                let name = emit.strings.intern(&field.name);
                emit.store.field.push(FieldRaw {
                    flags: field.flags,
                    name,
                    signature: 0,
                });
            }

            for (method_index, method) in ty.methods.iter().enumerate() {
                let name = emit.strings.intern(&method.name);
                emit.store.method_def.push(MethodDefRaw {
                    rva: method.rva,
                    impl_flags: method.impl_flags,
                    flags: method.flags,
                    name,
                    signature: 0,
                    param_list: emit.first_param_rid[index][method_index],
                });

                for param in &method.params {
                    let name = emit.strings.intern(&param.name);
                    emit.store.param.push(ParamRaw {
                        flags: param.flags,
                        sequence: param.sequence,
                        name,
                    });
                }
            }
        }

        // Children of one parent occupy a contiguous ascending run by
        // construction; assert the planned totals agree
        debug_assert_eq!(
            emit.store.field.len() as u32 + 1,
            self.types
                .last()
                .map_or(1, |_| emit.first_field_rid.last().unwrap()
                    + self.types.last().unwrap().fields.len() as u32)
        );

        for (index, ty) in self.types.iter().enumerate() {
            let class = index as u32 + 1;

            for interface in &ty.interfaces {
                emit.store.interface_impl.push(InterfaceImplRaw {
                    class,
                    interface: type_def_or_ref(Some(*interface)),
                });
            }

            if let Some((packing_size, class_size)) = ty.class_layout {
                emit.store.class_layout.push(ClassLayoutRaw {
                    packing_size,
                    class_size,
                    parent: class,
                });
            }

            if let Some(enclosing) = ty.enclosing {
                emit.store.nested_class.push(NestedClassRaw {
                    nested_class: class,
                    enclosing_class: enclosing.0 + 1,
                });
            }

            for (body, declaration) in &ty.overrides {
                emit.store.method_impl.push(MethodImplRaw {
                    class,
                    method_body: emit.method_def_or_ref(*body),
                    method_declaration: emit.method_def_or_ref(*declaration),
                });
            }

            if !ty.events.is_empty() {
                emit.store.event_map.push(EventMapRaw {
                    parent: class,
                    event_list: emit.event_rid[index][0],
                });
                for event in &ty.events {
                    let name = emit.strings.intern(&event.name);
                    emit.store.event.push(EventRaw {
                        flags: event.flags,
                        name,
                        event_type: type_def_or_ref(Some(event.event_type)),
                    });
                }
            }

            if !ty.properties.is_empty() {
                emit.store.property_map.push(PropertyMapRaw {
                    parent: class,
                    property_list: emit.property_rid[index][0],
                });
                for property in &ty.properties {
                    let name = emit.strings.intern(&property.name);
                    emit.store.property.push(PropertyRaw {
                        flags: property.flags,
                        name,
                        signature: 0,
                    });
                }
            }
        }

        self.build_constants(&mut emit)?;
        self.build_marshalling(&mut emit)?;
        self.build_semantics(&mut emit);
        self.build_pinvoke(&mut emit);
        self.build_field_layout(&mut emit);
        self.build_generics(&mut emit);

        for member_ref in &self.member_refs {
            let class = match member_ref.parent {
                MemberRefParentRef::Type(reference) => {
                    let coded = type_def_or_ref(Some(reference));
                    // MemberRefParent shares tags with TypeDefOrRef targets
                    CodedIndex::new(coded.tag, coded.row)
                }
                MemberRefParentRef::ModuleRef(handle) => {
                    CodedIndex::new(TableId::ModuleRef, handle.0 + 1)
                }
                MemberRefParentRef::Method(handle) => {
                    CodedIndex::new(TableId::MethodDef, emit.method_rid(handle))
                }
            };

            let name = emit.strings.intern(&member_ref.name);
            emit.store.member_ref.push(MemberRefRaw {
                class,
                name,
                signature: 0,
            });
        }

        for _ in &self.type_specs {
            emit.store.type_spec.push(TypeSpecRaw { signature: 0 });
        }

        for method_spec in &self.method_specs {
            emit.store.method_spec.push(MethodSpecRaw {
                method: emit.method_def_or_ref(method_spec.method),
                instantiation: 0,
            });
        }

        for _ in &self.standalone_sigs {
            emit.store.standalone_sig.push(StandAloneSigRaw { signature: 0 });
        }

        for name in &self.module_refs {
            let name = emit.strings.intern(name);
            emit.store.module_ref.push(ModuleRefRaw { name });
        }

        if let Some(assembly) = &self.assembly {
            let public_key = emit.blobs.intern(&assembly.public_key)?;
            let name = emit.strings.intern(&assembly.name);
            let culture = emit.strings.intern(&assembly.culture);
            emit.store.assembly.push(AssemblyRaw {
                hash_alg_id: assembly.hash_alg_id,
                major_version: assembly.version.0,
                minor_version: assembly.version.1,
                build_number: assembly.version.2,
                revision_number: assembly.version.3,
                flags: assembly.flags,
                public_key,
                name,
                culture,
            });

            if let Some(processor) = assembly.processor {
                emit.store
                    .assembly_processor
                    .push(AssemblyProcessorRaw { processor });
            }
            if let Some((platform, major, minor)) = assembly.os {
                emit.store.assembly_os.push(AssemblyOsRaw {
                    os_platform_id: platform,
                    os_major_version: major,
                    os_minor_version: minor,
                });
            }
        }

        for (index, assembly_ref) in self.assembly_refs.iter().enumerate() {
            let public_key_or_token = emit.blobs.intern(&assembly_ref.public_key_or_token)?;
            let hash_value = emit.blobs.intern(&assembly_ref.hash_value)?;
            let name = emit.strings.intern(&assembly_ref.name);
            let culture = emit.strings.intern(&assembly_ref.culture);
            emit.store.assembly_ref.push(AssemblyRefRaw {
                major_version: assembly_ref.version.0,
                minor_version: assembly_ref.version.1,
                build_number: assembly_ref.version.2,
                revision_number: assembly_ref.version.3,
                flags: assembly_ref.flags,
                public_key_or_token,
                name,
                culture,
                hash_value,
            });

            if let Some(processor) = assembly_ref.processor {
                emit.store
                    .assembly_ref_processor
                    .push(AssemblyRefProcessorRaw {
                        processor,
                        assembly_ref: index as u32 + 1,
                    });
            }
            if let Some((platform, major, minor)) = assembly_ref.os {
                emit.store.assembly_ref_os.push(AssemblyRefOsRaw {
                    os_platform_id: platform,
                    os_major_version: major,
                    os_minor_version: minor,
                    assembly_ref: index as u32 + 1,
                });
            }
        }

        for file in &self.files {
            let name = emit.strings.intern(&file.name);
            let hash_value = emit.blobs.intern(&file.hash_value)?;
            emit.store.file.push(FileRaw {
                flags: file.flags,
                name,
                hash_value,
            });
        }

        for exported in &self.exported_types {
            let name = emit.strings.intern(&exported.name);
            let namespace = emit.strings.intern(&exported.namespace);
            emit.store.exported_type.push(ExportedTypeRaw {
                flags: exported.flags,
                type_def_id: exported.type_def_id,
                name,
                namespace,
                implementation: implementation(Some(exported.implementation)),
            });
        }

        for resource in &self.resources {
            let name = emit.strings.intern(&resource.name);
            emit.store.manifest_resource.push(ManifestResourceRaw {
                offset: resource.offset,
                flags: resource.flags,
                name,
                implementation: implementation(resource.implementation),
            });
        }

        for security in &self.decl_security {
            let parent = match security.owner {
                SecurityOwner::Assembly => CodedIndex::new(TableId::Assembly, 1),
                SecurityOwner::Type(handle) => CodedIndex::new(TableId::TypeDef, handle.0 + 1),
                SecurityOwner::Method(handle) => {
                    CodedIndex::new(TableId::MethodDef, emit.method_rid(handle))
                }
            };
            let permission_set = emit.blobs.intern(&security.permission_set)?;
            emit.store.decl_security.push(DeclSecurityRaw {
                action: security.action,
                parent,
                permission_set,
            });
        }

        for attribute in &self.custom_attributes {
            let parent = match attribute.owner {
                AttributeOwner::Assembly => CodedIndex::new(TableId::Assembly, 1),
                AttributeOwner::Module => CodedIndex::new(TableId::Module, 1),
                AttributeOwner::Type(handle) => CodedIndex::new(TableId::TypeDef, handle.0 + 1),
                AttributeOwner::Field(handle) => {
                    CodedIndex::new(TableId::Field, emit.field_rid(handle))
                }
                AttributeOwner::Method(handle) => {
                    CodedIndex::new(TableId::MethodDef, emit.method_rid(handle))
                }
                AttributeOwner::Param(handle) => {
                    CodedIndex::new(TableId::Param, emit.param_rid(handle))
                }
                AttributeOwner::Property(handle) => {
                    CodedIndex::new(TableId::Property, emit.property_rid(handle))
                }
                AttributeOwner::Event(handle) => {
                    CodedIndex::new(TableId::Event, emit.event_rid(handle))
                }
                AttributeOwner::GenericParam(handle) => {
                    CodedIndex::new(TableId::GenericParam, emit.generic_param_rid(handle))
                }
            };

            let value = emit.blobs.intern(&attribute.value)?;
            emit.store.custom_attribute.push(CustomAttributeRaw {
                parent,
                constructor: emit.method_def_or_ref(attribute.constructor),
                value,
            });
        }

        Ok(emit)
    }

    fn build_constants(&self, emit: &mut EmitState) -> Result<()> {
        for (index, ty) in self.types.iter().enumerate() {
            for (field_index, field) in ty.fields.iter().enumerate() {
                if let Some(constant) = &field.constant {
                    let value = emit.blobs.intern(&constant.to_blob_bytes())?;
                    emit.store.constant.push(ConstantRaw {
                        value_type: constant.element_type(),
                        padding: 0,
                        parent: CodedIndex::new(
                            TableId::Field,
                            emit.first_field_rid[index] + field_index as u32,
                        ),
                        value,
                    });
                }
            }

            for (method_index, method) in ty.methods.iter().enumerate() {
                for (param_index, param) in method.params.iter().enumerate() {
                    if let Some(constant) = &param.constant {
                        let value = emit.blobs.intern(&constant.to_blob_bytes())?;
                        emit.store.constant.push(ConstantRaw {
                            value_type: constant.element_type(),
                            padding: 0,
                            parent: CodedIndex::new(
                                TableId::Param,
                                emit.first_param_rid[index][method_index] + param_index as u32,
                            ),
                            value,
                        });
                    }
                }
            }

            for (property_index, property) in ty.properties.iter().enumerate() {
                if let Some(constant) = &property.constant {
                    let value = emit.blobs.intern(&constant.to_blob_bytes())?;
                    emit.store.constant.push(ConstantRaw {
                        value_type: constant.element_type(),
                        padding: 0,
                        parent: CodedIndex::new(
                            TableId::Property,
                            emit.property_rid[index][property_index],
                        ),
                        value,
                    });
                }
            }
        }

        Ok(())
    }

    fn build_marshalling(&self, emit: &mut EmitState) -> Result<()> {
        for (index, ty) in self.types.iter().enumerate() {
            for (field_index, field) in ty.fields.iter().enumerate() {
                if let Some(native) = &field.marshalling {
                    let native_type = emit.blobs.intern(&encode_marshalling_descriptor(native)?)?;
                    emit.store.field_marshal.push(FieldMarshalRaw {
                        parent: CodedIndex::new(
                            TableId::Field,
                            emit.first_field_rid[index] + field_index as u32,
                        ),
                        native_type,
                    });
                }
            }

            for (method_index, method) in ty.methods.iter().enumerate() {
                for (param_index, param) in method.params.iter().enumerate() {
                    if let Some(native) = &param.marshalling {
                        let native_type =
                            emit.blobs.intern(&encode_marshalling_descriptor(native)?)?;
                        emit.store.field_marshal.push(FieldMarshalRaw {
                            parent: CodedIndex::new(
                                TableId::Param,
                                emit.first_param_rid[index][method_index] + param_index as u32,
                            ),
                            native_type,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn build_semantics(&self, emit: &mut EmitState) {
        for (index, ty) in self.types.iter().enumerate() {
            for (property_index, property) in ty.properties.iter().enumerate() {
                let association =
                    CodedIndex::new(TableId::Property, emit.property_rid[index][property_index]);
                if let Some(getter) = property.getter {
                    emit.store.method_semantics.push(MethodSemanticsRaw {
                        semantics: semantics::GETTER,
                        method: emit.method_rid(getter),
                        association,
                    });
                }
                if let Some(setter) = property.setter {
                    emit.store.method_semantics.push(MethodSemanticsRaw {
                        semantics: semantics::SETTER,
                        method: emit.method_rid(setter),
                        association,
                    });
                }
            }

            for (event_index, event) in ty.events.iter().enumerate() {
                let association = CodedIndex::new(TableId::Event, emit.event_rid[index][event_index]);
                if let Some(add) = event.add {
                    emit.store.method_semantics.push(MethodSemanticsRaw {
                        semantics: semantics::ADD_ON,
                        method: emit.method_rid(add),
                        association,
                    });
                }
                if let Some(remove) = event.remove {
                    emit.store.method_semantics.push(MethodSemanticsRaw {
                        semantics: semantics::REMOVE_ON,
                        method: emit.method_rid(remove),
                        association,
                    });
                }
                if let Some(raise) = event.raise {
                    emit.store.method_semantics.push(MethodSemanticsRaw {
                        semantics: semantics::FIRE,
                        method: emit.method_rid(raise),
                        association,
                    });
                }
            }
        }
    }

    fn build_pinvoke(&self, emit: &mut EmitState) {
        for (index, ty) in self.types.iter().enumerate() {
            for (method_index, method) in ty.methods.iter().enumerate() {
                if let Some(pinvoke) = &method.pinvoke {
                    let import_name = emit.strings.intern(&pinvoke.import_name);
                    emit.store.impl_map.push(ImplMapRaw {
                        mapping_flags: pinvoke.flags,
                        member_forwarded: CodedIndex::new(
                            TableId::MethodDef,
                            emit.first_method_rid[index] + method_index as u32,
                        ),
                        import_name,
                        import_scope: pinvoke.module.0 + 1,
                    });
                }
            }
        }
    }

    fn build_field_layout(&self, emit: &mut EmitState) {
        for (index, ty) in self.types.iter().enumerate() {
            for (field_index, field) in ty.fields.iter().enumerate() {
                let field_rid = emit.first_field_rid[index] + field_index as u32;

                if let Some(offset) = field.layout_offset {
                    emit.store.field_layout.push(FieldLayoutRaw {
                        offset,
                        field: field_rid,
                    });
                }

                if let Some(rva) = field.rva {
                    emit.store.field_rva.push(FieldRvaRaw {
                        rva,
                        field: field_rid,
                    });
                }
            }
        }
    }

    fn build_generics(&self, emit: &mut EmitState) {
        // Rows emit pre-ordered by (owner, number); walk the planned rids
        let mut order: Vec<usize> = (0..self.generic_params.len()).collect();
        order.sort_by_key(|&index| emit.generic_param_rid[index]);

        for &index in &order {
            let param = &self.generic_params[index];
            let owner = match param.owner {
                GenericOwner::Type(handle) => CodedIndex::new(TableId::TypeDef, handle.0 + 1),
                GenericOwner::Method(handle) => {
                    CodedIndex::new(TableId::MethodDef, emit.method_rid(handle))
                }
            };

            let name = emit.strings.intern(&param.name);
            emit.store.generic_param.push(GenericParamRaw {
                number: param.number,
                flags: param.flags,
                owner,
                name,
            });
        }

        for &index in &order {
            let param = &self.generic_params[index];
            for constraint in &param.constraints {
                emit.store
                    .generic_param_constraint
                    .push(GenericParamConstraintRaw {
                        owner: emit.generic_param_rid[index],
                        constraint: type_def_or_ref(Some(*constraint)),
                    });
            }
        }
    }

    /// The signature walk: encode every deferred signature blob and patch
    /// the owning rows. Runs after the table walk so all type tokens exist,
    /// and before width planning so the blob heap size is final.
    fn build_signatures(&self, emit: &mut EmitState) -> Result<()> {
        let mut field_cursor = 0usize;
        let mut method_cursor = 0usize;
        let mut property_cursor = 0usize;

        for ty in &self.types {
            for field in &ty.fields {
                let blob = encode_field_signature(&field.signature)?;
                emit.store.field[field_cursor].signature = emit.blobs.intern(&blob)?;
                field_cursor += 1;
            }

            for method in &ty.methods {
                let blob = encode_method_signature(&method.signature)?;
                emit.store.method_def[method_cursor].signature = emit.blobs.intern(&blob)?;
                method_cursor += 1;
            }

            for property in &ty.properties {
                let blob = encode_property_signature(&property.signature)?;
                emit.store.property[property_cursor].signature = emit.blobs.intern(&blob)?;
                property_cursor += 1;
            }
        }

        for (index, member_ref) in self.member_refs.iter().enumerate() {
            let blob = match &member_ref.signature {
                MemberRefSig::Method(signature) => encode_method_signature(signature)?,
                MemberRefSig::Field(signature) => encode_field_signature(signature)?,
            };
            emit.store.member_ref[index].signature = emit.blobs.intern(&blob)?;
        }

        for (index, type_spec) in self.type_specs.iter().enumerate() {
            let blob = encode_typespec_signature(type_spec)?;
            emit.store.type_spec[index].signature = emit.blobs.intern(&blob)?;
        }

        for (index, method_spec) in self.method_specs.iter().enumerate() {
            let blob = encode_method_spec_signature(&method_spec.instantiation)?;
            emit.store.method_spec[index].instantiation = emit.blobs.intern(&blob)?;
        }

        for (index, signature) in self.standalone_sigs.iter().enumerate() {
            let blob = encode_local_var_signature(signature)?;
            emit.store.standalone_sig[index].signature = emit.blobs.intern(&blob)?;
        }

        Ok(())
    }

    fn emit_state(&self) -> Result<&EmitState> {
        self.emit.as_ref().ok_or(InvalidState(self.state))
    }

    /// The stamped token of a field. Stable for the rest of the engine's
    /// lifetime once finalize has run.
    ///
    /// # Errors
    /// Returns [`InvalidState`] before finalization
    pub fn field_token(&self, field: FieldHandle) -> Result<Token> {
        Ok(Token::new(0x0400_0000 | self.emit_state()?.field_rid(field)))
    }

    /// The stamped token of a method.
    ///
    /// # Errors
    /// Returns [`InvalidState`] before finalization
    pub fn method_token(&self, method: MethodHandle) -> Result<Token> {
        Ok(Token::new(0x0600_0000 | self.emit_state()?.method_rid(method)))
    }

    /// The stamped token of a parameter.
    ///
    /// # Errors
    /// Returns [`InvalidState`] before finalization
    pub fn param_token(&self, param: ParamHandle) -> Result<Token> {
        Ok(Token::new(0x0800_0000 | self.emit_state()?.param_rid(param)))
    }

    /// The stamped token of a property.
    ///
    /// # Errors
    /// Returns [`InvalidState`] before finalization
    pub fn property_token(&self, property: PropertyHandle) -> Result<Token> {
        Ok(Token::new(
            0x1700_0000 | self.emit_state()?.property_rid(property),
        ))
    }

    /// The stamped token of an event.
    ///
    /// # Errors
    /// Returns [`InvalidState`] before finalization
    pub fn event_token(&self, event: EventHandle) -> Result<Token> {
        Ok(Token::new(0x1400_0000 | self.emit_state()?.event_rid(event)))
    }

    /// The stamped token of a generic parameter.
    ///
    /// # Errors
    /// Returns [`InvalidState`] before finalization
    pub fn generic_param_token(&self, param: GenericParamHandle) -> Result<Token> {
        Ok(Token::new(
            0x2A00_0000 | self.emit_state()?.generic_param_rid(param),
        ))
    }

    /// The stamped token of a standalone signature.
    ///
    /// # Errors
    /// Returns [`InvalidState`] before finalization
    pub fn standalone_sig_token(&self, sig: super::StandAloneSigHandle) -> Result<Token> {
        self.emit_state()?;
        Ok(Token::new(0x1100_0000 | (sig.0 + 1)))
    }

    /// The token of an external member reference. Row ids of the `MemberRef`
    /// arena are final at insertion.
    #[must_use]
    pub fn member_ref_token(&self, member: super::MemberRefHandle) -> Token {
        Token::new(0x0A00_0000 | (member.0 + 1))
    }
}
