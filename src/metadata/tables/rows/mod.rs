//! Concrete row types for every table in the catalogue.
//!
//! Each row type is a plain record of its columns — heap offsets and table
//! indices stay raw `u32`s, coded columns are [`crate::metadata::tables::CodedIndex`] —
//! and implements the [`crate::metadata::tables::RowReadable`] /
//! [`crate::metadata::tables::RowWritable`] codec pair. Resolution into
//! descriptors happens a layer above, in the read-side container.

mod assembly;
mod classlayout;
mod constant;
mod customattribute;
mod declsecurity;
mod eventmap;
mod field;
mod fieldmarshal;
mod fileres;
mod genericparam;
mod implmap;
mod interfaceimpl;
mod memberref;
mod methoddef;
mod methodsemantics;
mod module;
mod param;
mod propertymap;
mod standalonesig;
mod typedef;
mod typeref;

pub use assembly::{
    AssemblyOsRaw, AssemblyProcessorRaw, AssemblyRaw, AssemblyRefOsRaw, AssemblyRefProcessorRaw,
    AssemblyRefRaw,
};
pub use classlayout::ClassLayoutRaw;
pub use constant::ConstantRaw;
pub use customattribute::CustomAttributeRaw;
pub use declsecurity::DeclSecurityRaw;
pub use eventmap::{EventMapRaw, EventRaw};
pub use field::{FieldLayoutRaw, FieldRaw, FieldRvaRaw};
pub use fieldmarshal::FieldMarshalRaw;
pub use fileres::{ExportedTypeRaw, FileRaw, ManifestResourceRaw};
pub use genericparam::{GenericParamConstraintRaw, GenericParamRaw};
pub use implmap::ImplMapRaw;
pub use interfaceimpl::{InterfaceImplRaw, NestedClassRaw};
pub use memberref::MemberRefRaw;
pub use methoddef::MethodDefRaw;
pub use methodsemantics::{MethodImplRaw, MethodSemanticsRaw, MethodSpecRaw};
pub use module::{ModuleRaw, ModuleRefRaw};
pub use param::ParamRaw;
pub use propertymap::{PropertyMapRaw, PropertyRaw};
pub use standalonesig::{StandAloneSigRaw, TypeSpecRaw};
pub use typedef::TypeDefRaw;
pub use typeref::TypeRefRaw;
