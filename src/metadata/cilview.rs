//! The read-side root container: a serialized metadata root resolved back
//! into descriptors.
//!
//! # Architecture
//!
//! [`CilView::read`] runs the reader in three phases. First the metadata
//! root and its stream directory are parsed and the five streams located.
//! Second, the `#~` header is read and every table sized through the same
//! index planner the writer uses. Third, the resolution pass materializes
//! descriptors: names come out of `#Strings` eagerly, raw list columns turn
//! into row ranges (a type owns the fields from its `FieldList` up to the
//! next type's, the last type running to the end of the table), and every
//! cross-table index is bounds-checked with a diagnostic naming table, row
//! and column on failure.
//!
//! Signature blobs stay as heap offsets until a descriptor is asked for its
//! signature; the decoded form is cached on first access. Descriptors
//! borrow the input buffer, so the buffer must outlive the view.
//!
//! [`CilView::read_lenient`] continues past corrupt rows, collecting the
//! per-row diagnostics instead of failing fast; skipped descriptors get
//! neutral placeholder values.

use std::cell::OnceCell;
use std::ops::Range;

use crate::{
    metadata::heaps::{Blob, Guid, Strings, UserStrings},
    metadata::signatures::{
        parse_field_signature, parse_method_signature, parse_property_signature, SignatureField,
        SignatureMethod, SignatureProperty,
    },
    metadata::streams::{Root, TablesHeader},
    metadata::tables::{CodedIndex, TableId},
    metadata::token::Token,
    Error::{CorruptIndex, ShortRead},
    Result,
};

/// The resolved module descriptor.
#[derive(Debug, Clone)]
pub struct ModuleView {
    /// The module name
    pub name: String,
    /// The module version id, zero when the row held no Mvid
    pub mvid: uguid::Guid,
}

/// A resolved type definition with its member ranges back-patched.
#[derive(Debug)]
pub struct TypeView {
    /// The type's metadata token
    pub token: Token,
    /// `TypeAttributes` bitmask
    pub flags: u32,
    /// The simple type name
    pub name: String,
    /// The namespace, empty for global
    pub namespace: String,
    /// The base type reference, `None` for no base
    pub extends: Option<CodedIndex>,
    /// 1-based `Field` row ids owned by this type
    pub field_range: Range<u32>,
    /// 1-based `MethodDef` row ids owned by this type
    pub method_range: Range<u32>,
    /// 1-based `Property` row ids owned by this type
    pub property_range: Range<u32>,
    /// 1-based `Event` row ids owned by this type
    pub event_range: Range<u32>,
}

/// A resolved field with its signature decoded on demand.
#[derive(Debug)]
pub struct FieldView {
    /// The field's metadata token
    pub token: Token,
    /// `FieldAttributes` bitmask
    pub flags: u16,
    /// The field name
    pub name: String,
    sig_offset: u32,
    signature: OnceCell<SignatureField>,
}

/// A resolved method with its signature decoded on demand.
#[derive(Debug)]
pub struct MethodView {
    /// The method's metadata token
    pub token: Token,
    /// Body RVA, 0 when the method has no body
    pub rva: u32,
    /// `MethodImplAttributes` bitmask
    pub impl_flags: u16,
    /// `MethodAttributes` bitmask
    pub flags: u16,
    /// The method name
    pub name: String,
    /// 1-based `Param` row ids owned by this method
    pub param_range: Range<u32>,
    sig_offset: u32,
    signature: OnceCell<SignatureMethod>,
}

/// A resolved parameter row.
#[derive(Debug, Clone)]
pub struct ParamView {
    /// The parameter's metadata token
    pub token: Token,
    /// `ParamAttributes` bitmask
    pub flags: u16,
    /// Position, 0 for the return value
    pub sequence: u16,
    /// The parameter name
    pub name: String,
}

/// A resolved property with its signature decoded on demand.
#[derive(Debug)]
pub struct PropertyView {
    /// The property's metadata token
    pub token: Token,
    /// `PropertyAttributes` bitmask
    pub flags: u16,
    /// The property name
    pub name: String,
    sig_offset: u32,
    signature: OnceCell<SignatureProperty>,
}

/// A resolved event row.
#[derive(Debug)]
pub struct EventView {
    /// The event's metadata token
    pub token: Token,
    /// `EventAttributes` bitmask
    pub flags: u16,
    /// The event name
    pub name: String,
    /// The delegate type backing the event
    pub event_type: Option<CodedIndex>,
}

/// A parsed and resolved metadata root, borrowing the input buffer.
#[derive(Debug)]
pub struct CilView<'a> {
    root: Root,
    tables: TablesHeader<'a>,
    strings_data: &'a [u8],
    userstrings_data: &'a [u8],
    blob_data: &'a [u8],
    guid_data: &'a [u8],
    module: ModuleView,
    types: Vec<TypeView>,
    fields: Vec<FieldView>,
    methods: Vec<MethodView>,
    params: Vec<ParamView>,
    properties: Vec<PropertyView>,
    events: Vec<EventView>,
    diagnostics: Vec<crate::Error>,
}

fn stream_slice<'a>(data: &'a [u8], root: &Root, name: &str) -> Result<&'a [u8]> {
    match root.stream(name) {
        Some(header) => {
            let start = header.offset as usize;
            let end = start + header.size as usize;
            if end > data.len() {
                return Err(ShortRead);
            }
            Ok(&data[start..end])
        }
        None => Ok(&[]),
    }
}

impl<'a> CilView<'a> {
    /// Parse and resolve a metadata root, failing on the first corrupt row.
    ///
    /// ## Arguments
    /// * 'data' - A buffer starting at the BSJB signature
    ///
    /// # Errors
    /// Returns the reader failure taxonomy: [`ShortRead`] on truncation,
    /// [`crate::Error::UnsupportedTable`] for unknown Valid bits,
    /// [`CorruptIndex`] / [`crate::Error::CorruptBlob`] for bad references
    pub fn read(data: &'a [u8]) -> Result<CilView<'a>> {
        Self::read_with(data, false)
    }

    /// Parse and resolve a metadata root, continuing past corrupt rows.
    ///
    /// Rows that fail to resolve are replaced by neutral placeholders and
    /// their diagnostics collected on [`CilView::diagnostics`]. Structural
    /// failures (a truncated stream, an unknown table) still fail.
    ///
    /// ## Arguments
    /// * 'data' - A buffer starting at the BSJB signature
    ///
    /// # Errors
    /// Returns structural failures only
    pub fn read_lenient(data: &'a [u8]) -> Result<CilView<'a>> {
        Self::read_with(data, true)
    }

    fn read_with(data: &'a [u8], lenient: bool) -> Result<CilView<'a>> {
        let root = Root::read(data)?;

        let tables_data = stream_slice(data, &root, "#~")?;
        if tables_data.is_empty() {
            return Err(corrupt_blob!("metadata root carries no #~ stream"));
        }
        let tables = TablesHeader::from(tables_data)?;

        let strings_data = stream_slice(data, &root, "#Strings")?;
        let userstrings_data = stream_slice(data, &root, "#US")?;
        let blob_data = stream_slice(data, &root, "#Blob")?;
        let guid_data = stream_slice(data, &root, "#GUID")?;

        let mut view = CilView {
            root,
            tables,
            strings_data,
            userstrings_data,
            blob_data,
            guid_data,
            module: ModuleView {
                name: String::new(),
                mvid: uguid::Guid::ZERO,
            },
            types: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            params: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            diagnostics: Vec::new(),
        };

        view.resolve(lenient)?;
        Ok(view)
    }

    fn fail_or_collect<T>(
        &mut self,
        lenient: bool,
        error: crate::Error,
        placeholder: T,
    ) -> Result<T> {
        if lenient {
            self.diagnostics.push(error);
            Ok(placeholder)
        } else {
            Err(error)
        }
    }

    /// Back-patch containment and materialize descriptors.
    #[allow(clippy::too_many_lines)]
    fn resolve(&mut self, lenient: bool) -> Result<()> {
        let strings = Strings::from(if self.strings_data.is_empty() {
            &[0]
        } else {
            self.strings_data
        })?;

        // Module: exactly one row expected
        if let Some(module_table) = self.tables.module()? {
            if let Some(row) = module_table.get(1)? {
                self.module.name = match strings.get(row.name as usize) {
                    Ok(name) => name.to_string(),
                    Err(_) => {
                        let error = CorruptIndex {
                            table: "Module",
                            row: 1,
                            column: "Name",
                        };
                        self.fail_or_collect(lenient, error, String::new())?
                    }
                };

                if row.mvid != 0 {
                    let guids = Guid::from(self.guid_data)?;
                    self.module.mvid = match guids.get(row.mvid as usize) {
                        Ok(mvid) => mvid,
                        Err(_) => {
                            let error = CorruptIndex {
                                table: "Module",
                                row: 1,
                                column: "Mvid",
                            };
                            self.fail_or_collect(lenient, error, uguid::Guid::ZERO)?
                        }
                    };
                }
            }
        }

        let field_count = self.tables.table_row_count(TableId::Field);
        let method_count = self.tables.table_row_count(TableId::MethodDef);
        let param_count = self.tables.table_row_count(TableId::Param);
        let property_count = self.tables.table_row_count(TableId::Property);
        let event_count = self.tables.table_row_count(TableId::Event);

        // Phase: raw TypeDef rows into placeholder list columns. Skipped
        // rows keep their slot so row ids stay aligned.
        let mut raw_types = Vec::new();
        if let Some(type_table) = self.tables.type_def()? {
            for (index, row) in type_table.iter().enumerate() {
                let rid = index as u32 + 1;
                match row {
                    Ok(row) => raw_types.push((rid, row)),
                    Err(error) => {
                        self.fail_or_collect(lenient, error, ())?;
                        raw_types.push((
                            rid,
                            crate::metadata::tables::rows::TypeDefRaw {
                                flags: 0,
                                name: 0,
                                namespace: 0,
                                extends: CodedIndex::null(
                                    crate::metadata::tables::CodedIndexType::TypeDefOrRef,
                                ),
                                field_list: 0,
                                method_list: 0,
                            },
                        ));
                    }
                }
            }
        }

        // Range back-patch: a run ends where the next row's run begins; the
        // sentinel for the last row is size(child table) + 1
        for position in 0..raw_types.len() {
            let (rid, ref row) = raw_types[position];
            let (field_end, method_end) = match raw_types.get(position + 1) {
                Some((_, next)) => (next.field_list, next.method_list),
                None => (field_count + 1, method_count + 1),
            };

            let field_range = self.resolve_range(
                lenient,
                "TypeDef",
                rid,
                "FieldList",
                row.field_list,
                field_end,
                field_count,
            )?;
            let method_range = self.resolve_range(
                lenient,
                "TypeDef",
                rid,
                "MethodList",
                row.method_list,
                method_end,
                method_count,
            )?;

            let extends = if row.extends.row == 0 {
                None
            } else {
                let target_rows = self.tables.table_row_count(row.extends.tag);
                if row.extends.row > target_rows {
                    let error = CorruptIndex {
                        table: "TypeDef",
                        row: rid,
                        column: "Extends",
                    };
                    self.fail_or_collect(lenient, error, None)?
                } else {
                    Some(row.extends)
                }
            };

            let name = self.resolve_string(lenient, &strings, "TypeDef", rid, "Name", row.name)?;
            let namespace =
                self.resolve_string(lenient, &strings, "TypeDef", rid, "Namespace", row.namespace)?;

            self.types.push(TypeView {
                token: Token::new(0x0200_0000 | rid),
                flags: row.flags,
                name,
                namespace,
                extends,
                field_range,
                method_range,
                property_range: 1..1,
                event_range: 1..1,
            });
        }

        // Property and event ownership arrives through the map tables
        if let Some(map_table) = self.tables.property_map()? {
            let mut raw_maps = Vec::new();
            for row in map_table.iter() {
                raw_maps.push(row?);
            }
            for position in 0..raw_maps.len() {
                let row = &raw_maps[position];
                let end = raw_maps
                    .get(position + 1)
                    .map_or(property_count + 1, |next| next.property_list);
                let range = self.resolve_range(
                    lenient,
                    "PropertyMap",
                    position as u32 + 1,
                    "PropertyList",
                    row.property_list,
                    end,
                    property_count,
                )?;

                let parent = row
                    .parent
                    .checked_sub(1)
                    .and_then(|index| self.types.get_mut(index as usize));
                match parent {
                    Some(ty) => ty.property_range = range,
                    None => {
                        let error = CorruptIndex {
                            table: "PropertyMap",
                            row: position as u32 + 1,
                            column: "Parent",
                        };
                        self.fail_or_collect(lenient, error, ())?;
                    }
                }
            }
        }

        if let Some(map_table) = self.tables.event_map()? {
            let mut raw_maps = Vec::new();
            for row in map_table.iter() {
                raw_maps.push(row?);
            }
            for position in 0..raw_maps.len() {
                let row = &raw_maps[position];
                let end = raw_maps
                    .get(position + 1)
                    .map_or(event_count + 1, |next| next.event_list);
                let range = self.resolve_range(
                    lenient,
                    "EventMap",
                    position as u32 + 1,
                    "EventList",
                    row.event_list,
                    end,
                    event_count,
                )?;

                let parent = row
                    .parent
                    .checked_sub(1)
                    .and_then(|index| self.types.get_mut(index as usize));
                match parent {
                    Some(ty) => ty.event_range = range,
                    None => {
                        let error = CorruptIndex {
                            table: "EventMap",
                            row: position as u32 + 1,
                            column: "Parent",
                        };
                        self.fail_or_collect(lenient, error, ())?;
                    }
                }
            }
        }

        if let Some(field_table) = self.tables.field()? {
            for (index, row) in field_table.iter().enumerate() {
                let rid = index as u32 + 1;
                let (flags, name_offset, sig_offset) = match row {
                    Ok(row) => (row.flags, row.name, row.signature),
                    Err(error) => {
                        self.fail_or_collect(lenient, error, ())?;
                        (0, 0, 0)
                    }
                };

                let name =
                    self.resolve_string(lenient, &strings, "Field", rid, "Name", name_offset)?;
                self.fields.push(FieldView {
                    token: Token::new(0x0400_0000 | rid),
                    flags,
                    name,
                    sig_offset,
                    signature: OnceCell::new(),
                });
            }
        }

        // Param ranges use the same sentinel scheme as the TypeDef lists
        let mut raw_methods = Vec::new();
        if let Some(method_table) = self.tables.method_def()? {
            for (index, row) in method_table.iter().enumerate() {
                let rid = index as u32 + 1;
                match row {
                    Ok(row) => raw_methods.push((rid, row)),
                    Err(error) => {
                        self.fail_or_collect(lenient, error, ())?;
                        raw_methods.push((
                            rid,
                            crate::metadata::tables::rows::MethodDefRaw {
                                rva: 0,
                                impl_flags: 0,
                                flags: 0,
                                name: 0,
                                signature: 0,
                                param_list: 0,
                            },
                        ));
                    }
                }
            }
        }

        for position in 0..raw_methods.len() {
            let (rid, ref row) = raw_methods[position];
            let param_end = raw_methods
                .get(position + 1)
                .map_or(param_count + 1, |(_, next)| next.param_list);

            let param_range = self.resolve_range(
                lenient,
                "MethodDef",
                rid,
                "ParamList",
                row.param_list,
                param_end,
                param_count,
            )?;

            let name = self.resolve_string(lenient, &strings, "MethodDef", rid, "Name", row.name)?;
            self.methods.push(MethodView {
                token: Token::new(0x0600_0000 | rid),
                rva: row.rva,
                impl_flags: row.impl_flags,
                flags: row.flags,
                name,
                param_range,
                sig_offset: row.signature,
                signature: OnceCell::new(),
            });
        }

        if let Some(param_table) = self.tables.param()? {
            for (index, row) in param_table.iter().enumerate() {
                let rid = index as u32 + 1;
                let (flags, sequence, name_offset) = match row {
                    Ok(row) => (row.flags, row.sequence, row.name),
                    Err(error) => {
                        self.fail_or_collect(lenient, error, ())?;
                        (0, 0, 0)
                    }
                };

                let name =
                    self.resolve_string(lenient, &strings, "Param", rid, "Name", name_offset)?;
                self.params.push(ParamView {
                    token: Token::new(0x0800_0000 | rid),
                    flags,
                    sequence,
                    name,
                });
            }
        }

        if let Some(property_table) = self.tables.property()? {
            for (index, row) in property_table.iter().enumerate() {
                let rid = index as u32 + 1;
                let (flags, name_offset, sig_offset) = match row {
                    Ok(row) => (row.flags, row.name, row.signature),
                    Err(error) => {
                        self.fail_or_collect(lenient, error, ())?;
                        (0, 0, 0)
                    }
                };

                let name =
                    self.resolve_string(lenient, &strings, "Property", rid, "Name", name_offset)?;
                self.properties.push(PropertyView {
                    token: Token::new(0x1700_0000 | rid),
                    flags,
                    name,
                    sig_offset,
                    signature: OnceCell::new(),
                });
            }
        }

        if let Some(event_table) = self.tables.event()? {
            for (index, row) in event_table.iter().enumerate() {
                let rid = index as u32 + 1;
                let (flags, name_offset, event_type) = match row {
                    Ok(row) => {
                        let event_type = if row.event_type.row == 0 {
                            None
                        } else {
                            Some(row.event_type)
                        };
                        (row.flags, row.name, event_type)
                    }
                    Err(error) => {
                        self.fail_or_collect(lenient, error, ())?;
                        (0, 0, None)
                    }
                };

                let name =
                    self.resolve_string(lenient, &strings, "Event", rid, "Name", name_offset)?;
                self.events.push(EventView {
                    token: Token::new(0x1400_0000 | rid),
                    flags,
                    name,
                    event_type,
                });
            }
        }

        Ok(())
    }

    fn resolve_string(
        &mut self,
        lenient: bool,
        strings: &Strings<'_>,
        table: &'static str,
        row: u32,
        column: &'static str,
        offset: u32,
    ) -> Result<String> {
        match strings.get(offset as usize) {
            Ok(value) => Ok(value.to_string()),
            Err(_) => {
                let error = CorruptIndex { table, row, column };
                self.fail_or_collect(lenient, error, String::new())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_range(
        &mut self,
        lenient: bool,
        table: &'static str,
        row: u32,
        column: &'static str,
        start: u32,
        end: u32,
        child_count: u32,
    ) -> Result<Range<u32>> {
        if start == 0 || start > child_count + 1 || end < start || end > child_count + 1 {
            let error = CorruptIndex { table, row, column };
            return self.fail_or_collect(lenient, error, 1..1);
        }

        Ok(start..end)
    }

    /// The parsed metadata root header.
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The parsed `#~` header with its typed table views.
    #[must_use]
    pub fn tables(&self) -> &TablesHeader<'a> {
        &self.tables
    }

    /// Diagnostics collected by a lenient read; empty after a strict read.
    #[must_use]
    pub fn diagnostics(&self) -> &[crate::Error] {
        &self.diagnostics
    }

    /// The resolved module descriptor.
    #[must_use]
    pub fn module(&self) -> &ModuleView {
        &self.module
    }

    /// The resolved type definitions, in row order.
    #[must_use]
    pub fn types(&self) -> &[TypeView] {
        &self.types
    }

    /// All resolved fields, in row order.
    #[must_use]
    pub fn fields(&self) -> &[FieldView] {
        &self.fields
    }

    /// All resolved methods, in row order.
    #[must_use]
    pub fn methods(&self) -> &[MethodView] {
        &self.methods
    }

    /// All resolved params, in row order.
    #[must_use]
    pub fn params(&self) -> &[ParamView] {
        &self.params
    }

    /// All resolved properties, in row order.
    #[must_use]
    pub fn properties(&self) -> &[PropertyView] {
        &self.properties
    }

    /// All resolved events, in row order.
    #[must_use]
    pub fn events(&self) -> &[EventView] {
        &self.events
    }

    /// The fields owned by a type.
    #[must_use]
    pub fn fields_of(&self, ty: &TypeView) -> &[FieldView] {
        &self.fields[(ty.field_range.start - 1) as usize..(ty.field_range.end - 1) as usize]
    }

    /// The methods owned by a type.
    #[must_use]
    pub fn methods_of(&self, ty: &TypeView) -> &[MethodView] {
        &self.methods[(ty.method_range.start - 1) as usize..(ty.method_range.end - 1) as usize]
    }

    /// The params owned by a method.
    #[must_use]
    pub fn params_of(&self, method: &MethodView) -> &[ParamView] {
        &self.params[(method.param_range.start - 1) as usize..(method.param_range.end - 1) as usize]
    }

    /// The properties owned by a type.
    #[must_use]
    pub fn properties_of(&self, ty: &TypeView) -> &[PropertyView] {
        &self.properties
            [(ty.property_range.start - 1) as usize..(ty.property_range.end - 1) as usize]
    }

    /// The events owned by a type.
    #[must_use]
    pub fn events_of(&self, ty: &TypeView) -> &[EventView] {
        &self.events[(ty.event_range.start - 1) as usize..(ty.event_range.end - 1) as usize]
    }

    /// Decode a field's signature, caching the result on the descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptBlob`] for a malformed blob
    pub fn field_signature<'s>(&'s self, field: &'s FieldView) -> Result<&'s SignatureField> {
        if let Some(signature) = field.signature.get() {
            return Ok(signature);
        }

        let blob = Blob::from(self.blob_data)?;
        let signature = parse_field_signature(blob.get(field.sig_offset as usize)?)?;
        Ok(field.signature.get_or_init(|| signature))
    }

    /// Decode a method's signature, caching the result on the descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptBlob`] for a malformed blob
    pub fn method_signature<'s>(&'s self, method: &'s MethodView) -> Result<&'s SignatureMethod> {
        if let Some(signature) = method.signature.get() {
            return Ok(signature);
        }

        let blob = Blob::from(self.blob_data)?;
        let signature = parse_method_signature(blob.get(method.sig_offset as usize)?)?;
        Ok(method.signature.get_or_init(|| signature))
    }

    /// Decode a property's signature, caching the result on the descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptBlob`] for a malformed blob
    pub fn property_signature<'s>(
        &'s self,
        property: &'s PropertyView,
    ) -> Result<&'s SignatureProperty> {
        if let Some(signature) = property.signature.get() {
            return Ok(signature);
        }

        let blob = Blob::from(self.blob_data)?;
        let signature = parse_property_signature(blob.get(property.sig_offset as usize)?)?;
        Ok(property.signature.get_or_init(|| signature))
    }

    /// View over the `#Strings` heap.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptBlob`] for a malformed heap
    pub fn strings(&self) -> Result<Strings<'a>> {
        Strings::from(self.strings_data)
    }

    /// View over the `#US` heap, `None` when the stream is absent.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptBlob`] for a malformed heap
    pub fn userstrings(&self) -> Result<Option<UserStrings<'a>>> {
        if self.userstrings_data.is_empty() {
            return Ok(None);
        }
        Ok(Some(UserStrings::from(self.userstrings_data)?))
    }

    /// View over the `#Blob` heap.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptBlob`] for a malformed heap
    pub fn blobs(&self) -> Result<Blob<'a>> {
        Blob::from(self.blob_data)
    }

    /// View over the `#GUID` heap.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptBlob`] for a malformed heap
    pub fn guids(&self) -> Result<Guid<'a>> {
        Guid::from(self.guid_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_a_short_read() {
        assert!(matches!(CilView::read(&[0u8; 4]), Err(ShortRead)));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        let data = vec![0xFFu8; 64];
        assert!(CilView::read(&data).is_err());
    }
}
