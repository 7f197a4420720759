//! Reader for the `#~` table stream (ECMA-335 II.24.2.6).
//!
//! Parses the stream header, derives every column width through the index
//! planner, then exposes a typed lazy view per present table. Nothing is
//! materialized until rows are accessed.

use std::sync::Arc;

use strum::IntoEnumIterator;

use crate::{
    file::io::read_le,
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
        MetadataTable, RowReadable, TableId, TableInfo, TableInfoRef, TABLE_SLOTS,
    },
    Error::ShortRead,
    Result,
};

/// Byte size of one row of the given table under the given width plan.
pub(crate) fn row_size_of(table: TableId, info: &TableInfoRef) -> u32 {
    match table {
        TableId::Module => ModuleRaw::row_size(info),
        TableId::TypeRef => TypeRefRaw::row_size(info),
        TableId::TypeDef => TypeDefRaw::row_size(info),
        TableId::Field => FieldRaw::row_size(info),
        TableId::MethodDef => MethodDefRaw::row_size(info),
        TableId::Param => ParamRaw::row_size(info),
        TableId::InterfaceImpl => InterfaceImplRaw::row_size(info),
        TableId::MemberRef => MemberRefRaw::row_size(info),
        TableId::Constant => ConstantRaw::row_size(info),
        TableId::CustomAttribute => CustomAttributeRaw::row_size(info),
        TableId::FieldMarshal => FieldMarshalRaw::row_size(info),
        TableId::DeclSecurity => DeclSecurityRaw::row_size(info),
        TableId::ClassLayout => ClassLayoutRaw::row_size(info),
        TableId::FieldLayout => FieldLayoutRaw::row_size(info),
        TableId::StandAloneSig => StandAloneSigRaw::row_size(info),
        TableId::EventMap => EventMapRaw::row_size(info),
        TableId::Event => EventRaw::row_size(info),
        TableId::PropertyMap => PropertyMapRaw::row_size(info),
        TableId::Property => PropertyRaw::row_size(info),
        TableId::MethodSemantics => MethodSemanticsRaw::row_size(info),
        TableId::MethodImpl => MethodImplRaw::row_size(info),
        TableId::ModuleRef => ModuleRefRaw::row_size(info),
        TableId::TypeSpec => TypeSpecRaw::row_size(info),
        TableId::ImplMap => ImplMapRaw::row_size(info),
        TableId::FieldRVA => FieldRvaRaw::row_size(info),
        TableId::Assembly => AssemblyRaw::row_size(info),
        TableId::AssemblyProcessor => AssemblyProcessorRaw::row_size(info),
        TableId::AssemblyOS => AssemblyOsRaw::row_size(info),
        TableId::AssemblyRef => AssemblyRefRaw::row_size(info),
        TableId::AssemblyRefProcessor => AssemblyRefProcessorRaw::row_size(info),
        TableId::AssemblyRefOS => AssemblyRefOsRaw::row_size(info),
        TableId::File => FileRaw::row_size(info),
        TableId::ExportedType => ExportedTypeRaw::row_size(info),
        TableId::ManifestResource => ManifestResourceRaw::row_size(info),
        TableId::NestedClass => NestedClassRaw::row_size(info),
        TableId::GenericParam => GenericParamRaw::row_size(info),
        TableId::MethodSpec => MethodSpecRaw::row_size(info),
        TableId::GenericParamConstraint => GenericParamConstraintRaw::row_size(info),
    }
}

/// Parsed header of the `#~` stream, with lazily-decoded table views.
#[derive(Debug)]
pub struct TablesHeader<'a> {
    /// Major version of the table schema, 2 for all known images
    pub major_version: u8,
    /// Minor version of the table schema, 0 for all known images
    pub minor_version: u8,
    /// HeapSizes flags: bit 0 strings-wide, bit 1 guid-wide, bit 2 blob-wide
    pub heap_sizes: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sort-required tables, as written by the producer
    pub sorted: u64,
    /// Width planner output shared by every table view
    pub info: TableInfoRef,
    data: &'a [u8],
    offsets: Vec<usize>,
}

macro_rules! table_accessor {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $id:expr) => {
        $(#[$doc])*
        ///
        /// # Errors
        /// Returns [`ShortRead`] if the declared rows run past the stream
        pub fn $name(&self) -> Result<Option<MetadataTable<'a, $ty>>> {
            self.table_view::<$ty>($id)
        }
    };
}

impl<'a> TablesHeader<'a> {
    /// Parse a `#~` stream header and size all tables.
    ///
    /// ## Arguments
    /// * 'data' - The complete `#~` stream
    ///
    /// # Errors
    /// Returns [`ShortRead`] on truncation,
    /// [`crate::Error::UnsupportedTable`] if the Valid mask names a table
    /// outside the catalogue, or [`crate::Error::CorruptBlob`] if no table
    /// has rows
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(ShortRead);
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(corrupt_blob!("the valid mask names no populated table"));
        }

        let info = Arc::new(TableInfo::new(data, valid)?);

        let mut header = TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            heap_sizes: read_le::<u8>(&data[6..])?,
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            data,
            offsets: vec![0; TABLE_SLOTS],
        };

        let mut current = 24 + valid.count_ones() as usize * 4;
        for table in TableId::iter() {
            let rows = header.info.get(table).rows;
            if rows == 0 {
                continue;
            }

            header.offsets[table as usize] = current;
            current += rows as usize * row_size_of(table, &header.info) as usize;
            if current > data.len() {
                return Err(ShortRead);
            }
        }

        Ok(header)
    }

    /// Number of populated tables.
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// True if the given table is populated.
    ///
    /// ## Arguments
    /// * '`table_id`' - The table to check
    #[must_use]
    pub fn has_table(&self, table_id: TableId) -> bool {
        (self.valid & (1u64 << (table_id as u8))) != 0
    }

    /// Row count of the given table, 0 when absent.
    ///
    /// ## Arguments
    /// * '`table_id`' - The table to query
    #[must_use]
    pub fn table_row_count(&self, table_id: TableId) -> u32 {
        self.info.get(table_id).rows
    }

    /// Iterator over the populated tables in catalogue order.
    pub fn present_tables(&self) -> impl Iterator<Item = TableId> + '_ {
        TableId::iter().filter(|&table_id| self.has_table(table_id))
    }

    fn table_view<T: RowReadable>(&self, table_id: TableId) -> Result<Option<MetadataTable<'a, T>>> {
        let rows = self.info.get(table_id).rows;
        if rows == 0 {
            return Ok(None);
        }

        let offset = self.offsets[table_id as usize];
        Ok(Some(MetadataTable::new(
            &self.data[offset..],
            rows,
            self.info.clone(),
        )?))
    }

    table_accessor!(
        /// Typed view over the `Module` table.
        module, ModuleRaw, TableId::Module);
    table_accessor!(
        /// Typed view over the `TypeRef` table.
        type_ref, TypeRefRaw, TableId::TypeRef);
    table_accessor!(
        /// Typed view over the `TypeDef` table.
        type_def, TypeDefRaw, TableId::TypeDef);
    table_accessor!(
        /// Typed view over the `Field` table.
        field, FieldRaw, TableId::Field);
    table_accessor!(
        /// Typed view over the `MethodDef` table.
        method_def, MethodDefRaw, TableId::MethodDef);
    table_accessor!(
        /// Typed view over the `Param` table.
        param, ParamRaw, TableId::Param);
    table_accessor!(
        /// Typed view over the `InterfaceImpl` table.
        interface_impl, InterfaceImplRaw, TableId::InterfaceImpl);
    table_accessor!(
        /// Typed view over the `MemberRef` table.
        member_ref, MemberRefRaw, TableId::MemberRef);
    table_accessor!(
        /// Typed view over the `Constant` table.
        constant, ConstantRaw, TableId::Constant);
    table_accessor!(
        /// Typed view over the `CustomAttribute` table.
        custom_attribute, CustomAttributeRaw, TableId::CustomAttribute);
    table_accessor!(
        /// Typed view over the `FieldMarshal` table.
        field_marshal, FieldMarshalRaw, TableId::FieldMarshal);
    table_accessor!(
        /// Typed view over the `DeclSecurity` table.
        decl_security, DeclSecurityRaw, TableId::DeclSecurity);
    table_accessor!(
        /// Typed view over the `ClassLayout` table.
        class_layout, ClassLayoutRaw, TableId::ClassLayout);
    table_accessor!(
        /// Typed view over the `FieldLayout` table.
        field_layout, FieldLayoutRaw, TableId::FieldLayout);
    table_accessor!(
        /// Typed view over the `StandAloneSig` table.
        standalone_sig, StandAloneSigRaw, TableId::StandAloneSig);
    table_accessor!(
        /// Typed view over the `EventMap` table.
        event_map, EventMapRaw, TableId::EventMap);
    table_accessor!(
        /// Typed view over the `Event` table.
        event, EventRaw, TableId::Event);
    table_accessor!(
        /// Typed view over the `PropertyMap` table.
        property_map, PropertyMapRaw, TableId::PropertyMap);
    table_accessor!(
        /// Typed view over the `Property` table.
        property, PropertyRaw, TableId::Property);
    table_accessor!(
        /// Typed view over the `MethodSemantics` table.
        method_semantics, MethodSemanticsRaw, TableId::MethodSemantics);
    table_accessor!(
        /// Typed view over the `MethodImpl` table.
        method_impl, MethodImplRaw, TableId::MethodImpl);
    table_accessor!(
        /// Typed view over the `ModuleRef` table.
        module_ref, ModuleRefRaw, TableId::ModuleRef);
    table_accessor!(
        /// Typed view over the `TypeSpec` table.
        type_spec, TypeSpecRaw, TableId::TypeSpec);
    table_accessor!(
        /// Typed view over the `ImplMap` table.
        impl_map, ImplMapRaw, TableId::ImplMap);
    table_accessor!(
        /// Typed view over the `FieldRVA` table.
        field_rva, FieldRvaRaw, TableId::FieldRVA);
    table_accessor!(
        /// Typed view over the `Assembly` table.
        assembly, AssemblyRaw, TableId::Assembly);
    table_accessor!(
        /// Typed view over the `AssemblyProcessor` table.
        assembly_processor, AssemblyProcessorRaw, TableId::AssemblyProcessor);
    table_accessor!(
        /// Typed view over the `AssemblyOS` table.
        assembly_os, AssemblyOsRaw, TableId::AssemblyOS);
    table_accessor!(
        /// Typed view over the `AssemblyRef` table.
        assembly_ref, AssemblyRefRaw, TableId::AssemblyRef);
    table_accessor!(
        /// Typed view over the `AssemblyRefProcessor` table.
        assembly_ref_processor, AssemblyRefProcessorRaw, TableId::AssemblyRefProcessor);
    table_accessor!(
        /// Typed view over the `AssemblyRefOS` table.
        assembly_ref_os, AssemblyRefOsRaw, TableId::AssemblyRefOS);
    table_accessor!(
        /// Typed view over the `File` table.
        file, FileRaw, TableId::File);
    table_accessor!(
        /// Typed view over the `ExportedType` table.
        exported_type, ExportedTypeRaw, TableId::ExportedType);
    table_accessor!(
        /// Typed view over the `ManifestResource` table.
        manifest_resource, ManifestResourceRaw, TableId::ManifestResource);
    table_accessor!(
        /// Typed view over the `NestedClass` table.
        nested_class, NestedClassRaw, TableId::NestedClass);
    table_accessor!(
        /// Typed view over the `GenericParam` table.
        generic_param, GenericParamRaw, TableId::GenericParam);
    table_accessor!(
        /// Typed view over the `MethodSpec` table.
        method_spec, MethodSpecRaw, TableId::MethodSpec);
    table_accessor!(
        /// Typed view over the `GenericParamConstraint` table.
        generic_param_constraint, GenericParamConstraintRaw, TableId::GenericParamConstraint);
}
