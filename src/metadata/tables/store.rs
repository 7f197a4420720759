//! The build-side table store: one growable row sequence per catalogue
//! entry, plus the sort pass the format requires.
//!
//! Rows accumulate in insertion order while the descriptor graph is walked.
//! Once all rows are in, [`TableStore::sort_required_tables`] establishes the
//! mandated ordering for the sixteen sort-required tables, and the store can
//! report the row counts the index planner and stream writer need.

use strum::IntoEnumIterator;

use crate::{
    file::Writer,
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
        CodedIndexType, RowWritable, TableId, TableInfoRef,
    },
    Result,
};

/// Growable row storage for every table in the catalogue.
///
/// Emission order within each `Vec` is the physical row order; 1-based row
/// ids are `index + 1`.
#[derive(Default)]
pub struct TableStore {
    pub(crate) module: Vec<ModuleRaw>,
    pub(crate) type_ref: Vec<TypeRefRaw>,
    pub(crate) type_def: Vec<TypeDefRaw>,
    pub(crate) field: Vec<FieldRaw>,
    pub(crate) method_def: Vec<MethodDefRaw>,
    pub(crate) param: Vec<ParamRaw>,
    pub(crate) interface_impl: Vec<InterfaceImplRaw>,
    pub(crate) member_ref: Vec<MemberRefRaw>,
    pub(crate) constant: Vec<ConstantRaw>,
    pub(crate) custom_attribute: Vec<CustomAttributeRaw>,
    pub(crate) field_marshal: Vec<FieldMarshalRaw>,
    pub(crate) decl_security: Vec<DeclSecurityRaw>,
    pub(crate) class_layout: Vec<ClassLayoutRaw>,
    pub(crate) field_layout: Vec<FieldLayoutRaw>,
    pub(crate) standalone_sig: Vec<StandAloneSigRaw>,
    pub(crate) event_map: Vec<EventMapRaw>,
    pub(crate) event: Vec<EventRaw>,
    pub(crate) property_map: Vec<PropertyMapRaw>,
    pub(crate) property: Vec<PropertyRaw>,
    pub(crate) method_semantics: Vec<MethodSemanticsRaw>,
    pub(crate) method_impl: Vec<MethodImplRaw>,
    pub(crate) module_ref: Vec<ModuleRefRaw>,
    pub(crate) type_spec: Vec<TypeSpecRaw>,
    pub(crate) impl_map: Vec<ImplMapRaw>,
    pub(crate) field_rva: Vec<FieldRvaRaw>,
    pub(crate) assembly: Vec<AssemblyRaw>,
    pub(crate) assembly_processor: Vec<AssemblyProcessorRaw>,
    pub(crate) assembly_os: Vec<AssemblyOsRaw>,
    pub(crate) assembly_ref: Vec<AssemblyRefRaw>,
    pub(crate) assembly_ref_processor: Vec<AssemblyRefProcessorRaw>,
    pub(crate) assembly_ref_os: Vec<AssemblyRefOsRaw>,
    pub(crate) file: Vec<FileRaw>,
    pub(crate) exported_type: Vec<ExportedTypeRaw>,
    pub(crate) manifest_resource: Vec<ManifestResourceRaw>,
    pub(crate) nested_class: Vec<NestedClassRaw>,
    pub(crate) generic_param: Vec<GenericParamRaw>,
    pub(crate) method_spec: Vec<MethodSpecRaw>,
    pub(crate) generic_param_constraint: Vec<GenericParamConstraintRaw>,
}

impl TableStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        TableStore::default()
    }

    /// Number of rows currently in a table.
    ///
    /// ## Arguments
    /// * 'table' - The `TableId` to query
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn row_count(&self, table: TableId) -> u32 {
        (match table {
            TableId::Module => self.module.len(),
            TableId::TypeRef => self.type_ref.len(),
            TableId::TypeDef => self.type_def.len(),
            TableId::Field => self.field.len(),
            TableId::MethodDef => self.method_def.len(),
            TableId::Param => self.param.len(),
            TableId::InterfaceImpl => self.interface_impl.len(),
            TableId::MemberRef => self.member_ref.len(),
            TableId::Constant => self.constant.len(),
            TableId::CustomAttribute => self.custom_attribute.len(),
            TableId::FieldMarshal => self.field_marshal.len(),
            TableId::DeclSecurity => self.decl_security.len(),
            TableId::ClassLayout => self.class_layout.len(),
            TableId::FieldLayout => self.field_layout.len(),
            TableId::StandAloneSig => self.standalone_sig.len(),
            TableId::EventMap => self.event_map.len(),
            TableId::Event => self.event.len(),
            TableId::PropertyMap => self.property_map.len(),
            TableId::Property => self.property.len(),
            TableId::MethodSemantics => self.method_semantics.len(),
            TableId::MethodImpl => self.method_impl.len(),
            TableId::ModuleRef => self.module_ref.len(),
            TableId::TypeSpec => self.type_spec.len(),
            TableId::ImplMap => self.impl_map.len(),
            TableId::FieldRVA => self.field_rva.len(),
            TableId::Assembly => self.assembly.len(),
            TableId::AssemblyProcessor => self.assembly_processor.len(),
            TableId::AssemblyOS => self.assembly_os.len(),
            TableId::AssemblyRef => self.assembly_ref.len(),
            TableId::AssemblyRefProcessor => self.assembly_ref_processor.len(),
            TableId::AssemblyRefOS => self.assembly_ref_os.len(),
            TableId::File => self.file.len(),
            TableId::ExportedType => self.exported_type.len(),
            TableId::ManifestResource => self.manifest_resource.len(),
            TableId::NestedClass => self.nested_class.len(),
            TableId::GenericParam => self.generic_param.len(),
            TableId::MethodSpec => self.method_spec.len(),
            TableId::GenericParamConstraint => self.generic_param_constraint.len(),
        }) as u32
    }

    /// The Valid bitmask: one bit per populated table.
    #[must_use]
    pub fn valid_mask(&self) -> u64 {
        let mut mask = 0u64;
        for table in TableId::iter() {
            if self.row_count(table) > 0 {
                mask |= 1u64 << (table as u8);
            }
        }
        mask
    }

    /// (table, row count) pairs for every populated table, in catalogue
    /// order.
    #[must_use]
    pub fn present_counts(&self) -> Vec<(TableId, u32)> {
        TableId::iter()
            .filter_map(|table| {
                let rows = self.row_count(table);
                (rows > 0).then_some((table, rows))
            })
            .collect()
    }

    /// Establish the mandated ordering of every sort-required table.
    ///
    /// All sorts are stable, so rows with equal keys keep their insertion
    /// order. Coded-index keys order tag-major: all rows of one member table
    /// precede rows of the next, with row numbers ascending within a tag.
    /// `GenericParam` alone uses the two-level (owner, number) key.
    ///
    /// Must run before tokens are stamped: sorting renumbers rows.
    pub fn sort_required_tables(&mut self) {
        self.interface_impl.sort_by_key(|row| row.class);
        self.constant
            .sort_by_key(|row| row.parent.sort_key(CodedIndexType::HasConstant));
        self.custom_attribute
            .sort_by_key(|row| row.parent.sort_key(CodedIndexType::HasCustomAttribute));
        self.field_marshal
            .sort_by_key(|row| row.parent.sort_key(CodedIndexType::HasFieldMarshal));
        self.decl_security
            .sort_by_key(|row| row.parent.sort_key(CodedIndexType::HasDeclSecurity));
        self.class_layout.sort_by_key(|row| row.parent);
        self.field_layout.sort_by_key(|row| row.field);
        self.event_map.sort_by_key(|row| row.parent);
        self.property_map.sort_by_key(|row| row.parent);
        self.method_semantics.sort_by_key(|row| row.method);
        self.method_impl.sort_by_key(|row| row.class);
        self.impl_map
            .sort_by_key(|row| row.member_forwarded.sort_key(CodedIndexType::MemberForwarded));
        self.field_rva.sort_by_key(|row| row.field);
        self.nested_class.sort_by_key(|row| row.nested_class);
        self.generic_param.sort_by_key(|row| {
            (row.owner.sort_key(CodedIndexType::TypeOrMethodDef), row.number)
        });
        self.generic_param_constraint.sort_by_key(|row| row.owner);
    }

    /// Serialize every populated table in catalogue order.
    ///
    /// ## Arguments
    /// * 'writer' - The output buffer, positioned after the row counts
    /// * 'sizes'  - Width planner output
    ///
    /// # Errors
    /// Returns an encode error if any row holds an invalid coded index
    pub fn write_tables(&self, writer: &mut Writer, sizes: &TableInfoRef) -> Result<()> {
        fn write_all<T: RowWritable>(
            rows: &[T],
            writer: &mut Writer,
            sizes: &TableInfoRef,
        ) -> Result<()> {
            for row in rows {
                row.write_row(writer, sizes)?;
            }
            Ok(())
        }

        for table in TableId::iter() {
            match table {
                TableId::Module => write_all(&self.module, writer, sizes)?,
                TableId::TypeRef => write_all(&self.type_ref, writer, sizes)?,
                TableId::TypeDef => write_all(&self.type_def, writer, sizes)?,
                TableId::Field => write_all(&self.field, writer, sizes)?,
                TableId::MethodDef => write_all(&self.method_def, writer, sizes)?,
                TableId::Param => write_all(&self.param, writer, sizes)?,
                TableId::InterfaceImpl => write_all(&self.interface_impl, writer, sizes)?,
                TableId::MemberRef => write_all(&self.member_ref, writer, sizes)?,
                TableId::Constant => write_all(&self.constant, writer, sizes)?,
                TableId::CustomAttribute => write_all(&self.custom_attribute, writer, sizes)?,
                TableId::FieldMarshal => write_all(&self.field_marshal, writer, sizes)?,
                TableId::DeclSecurity => write_all(&self.decl_security, writer, sizes)?,
                TableId::ClassLayout => write_all(&self.class_layout, writer, sizes)?,
                TableId::FieldLayout => write_all(&self.field_layout, writer, sizes)?,
                TableId::StandAloneSig => write_all(&self.standalone_sig, writer, sizes)?,
                TableId::EventMap => write_all(&self.event_map, writer, sizes)?,
                TableId::Event => write_all(&self.event, writer, sizes)?,
                TableId::PropertyMap => write_all(&self.property_map, writer, sizes)?,
                TableId::Property => write_all(&self.property, writer, sizes)?,
                TableId::MethodSemantics => write_all(&self.method_semantics, writer, sizes)?,
                TableId::MethodImpl => write_all(&self.method_impl, writer, sizes)?,
                TableId::ModuleRef => write_all(&self.module_ref, writer, sizes)?,
                TableId::TypeSpec => write_all(&self.type_spec, writer, sizes)?,
                TableId::ImplMap => write_all(&self.impl_map, writer, sizes)?,
                TableId::FieldRVA => write_all(&self.field_rva, writer, sizes)?,
                TableId::Assembly => write_all(&self.assembly, writer, sizes)?,
                TableId::AssemblyProcessor => write_all(&self.assembly_processor, writer, sizes)?,
                TableId::AssemblyOS => write_all(&self.assembly_os, writer, sizes)?,
                TableId::AssemblyRef => write_all(&self.assembly_ref, writer, sizes)?,
                TableId::AssemblyRefProcessor => {
                    write_all(&self.assembly_ref_processor, writer, sizes)?;
                }
                TableId::AssemblyRefOS => write_all(&self.assembly_ref_os, writer, sizes)?,
                TableId::File => write_all(&self.file, writer, sizes)?,
                TableId::ExportedType => write_all(&self.exported_type, writer, sizes)?,
                TableId::ManifestResource => write_all(&self.manifest_resource, writer, sizes)?,
                TableId::NestedClass => write_all(&self.nested_class, writer, sizes)?,
                TableId::GenericParam => write_all(&self.generic_param, writer, sizes)?,
                TableId::MethodSpec => write_all(&self.method_spec, writer, sizes)?,
                TableId::GenericParamConstraint => {
                    write_all(&self.generic_param_constraint, writer, sizes)?;
                }
            }
        }

        Ok(())
    }
}
