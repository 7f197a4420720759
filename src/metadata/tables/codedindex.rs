//! Coded indices: packed references into a fixed family of tables.
//!
//! A coded index stores a small table tag in its low bits and a 1-based row
//! index above them. Which tables a tag selects, and how many bits the tag
//! occupies, is fixed per family by ECMA-335 II.24.2.6.

use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at,
    file::Writer,
    metadata::{
        tables::{TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// The coded-index families of the `#~` stream.
///
/// Every variant carries a fixed ordered list of member tables; the tag value
/// of an encoded index is the member's position in that list.
///
/// ## Reference
/// - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef` or `TypeSpec` (2 tag bits).
    TypeDefOrRef,
    /// `Field`, `Param` or `Property` (2 tag bits).
    HasConstant,
    /// Any of the 22 attribute-carrying tables (5 tag bits).
    HasCustomAttribute,
    /// `Field` or `Param` (1 tag bit).
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef` or `Assembly` (2 tag bits).
    HasDeclSecurity,
    /// `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef` or `TypeSpec` (3 tag bits).
    MemberRefParent,
    /// `Event` or `Property` (1 tag bit).
    HasSemantics,
    /// `MethodDef` or `MemberRef` (1 tag bit).
    MethodDefOrRef,
    /// `Field` or `MethodDef` (1 tag bit).
    MemberForwarded,
    /// `File`, `AssemblyRef` or `ExportedType` (2 tag bits).
    Implementation,
    /// `MethodDef` (tag 2) or `MemberRef` (tag 3); tags 0, 1 and 4 are
    /// reserved by the standard (3 tag bits).
    CustomAttributeType,
    /// `Module`, `ModuleRef`, `AssemblyRef` or `TypeRef` (2 tag bits).
    ResolutionScope,
    /// `TypeDef` or `MethodDef` (1 tag bit).
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The ordered member tables of this family; a tag value indexes this
    /// slice.
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity, // labeled 'Permission' in the standard PDF
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexType::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexType::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexType::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::Implementation => {
                &[TableId::File, TableId::AssemblyRef, TableId::ExportedType]
            }
            // Tags 0, 1 and 4 are 'not used' per the standard; the slots are
            // filled so position math still covers tags 2 and 3.
            CodedIndexType::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// Number of low bits the tag occupies for this family.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn tag_bits(&self) -> u8 {
        (self.tables().len() as f32).log2().ceil() as u8
    }

    /// The tag value a target table encodes as within this family.
    ///
    /// ## Arguments
    /// * 'table' - The member table to encode
    ///
    /// # Errors
    /// Returns [`crate::Error::Unresolved`] if the table is not a member of
    /// this family
    pub fn tag_of(&self, table: TableId) -> Result<u32> {
        // The reserved low slots of CustomAttributeType never encode; the
        // live tags start at MethodDef = 2.
        let position = match self {
            CodedIndexType::CustomAttributeType => match table {
                TableId::MethodDef => Some(2),
                TableId::MemberRef => Some(3),
                _ => None,
            },
            _ => self.tables().iter().position(|&t| t == table),
        };

        match position {
            Some(position) => Ok(position as u32),
            None => Err(unresolved!(
                "table {} is not a member of the {:?} family",
                table.name(),
                self
            )),
        }
    }
}

/// A decoded coded-index value: the target table, the 1-based row, and the
/// equivalent metadata token.
///
/// A row of 0 denotes "none" regardless of tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodedIndex {
    /// The [`TableId`] this index refers to.
    pub tag: TableId,
    /// The 1-based row this index points at; 0 is the null reference.
    pub row: u32,
}

impl CodedIndex {
    /// Create a coded index from its components.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex { tag, row }
    }

    /// The null reference of a family (tag 0, row 0).
    #[must_use]
    pub fn null(ci_type: CodedIndexType) -> CodedIndex {
        CodedIndex {
            tag: ci_type.tables()[0],
            row: 0,
        }
    }

    /// The metadata token equivalent of this index.
    #[must_use]
    pub fn token(&self) -> Token {
        Token::new(((self.tag as u32) << 24) | self.row)
    }

    /// Build a coded index from a token.
    ///
    /// ## Arguments
    /// * 'token' - Any non-null token whose table is in the catalogue
    ///
    /// # Errors
    /// Returns [`crate::Error::Unresolved`] for null tokens or unknown table
    /// ids
    pub fn from_token(token: Token) -> Result<CodedIndex> {
        if token.is_null() {
            return Err(unresolved!("cannot convert a null token to a coded index"));
        }

        match TableId::from_id(token.table()) {
            Some(tag) => Ok(CodedIndex::new(tag, token.row())),
            None => Err(unresolved!("unknown table id {:#04x} in token {}", token.table(), token)),
        }
    }

    /// Read and decode a coded index from a row buffer.
    ///
    /// Reads 2 or 4 bytes depending on the planned width of the family, then
    /// splits tag and row.
    ///
    /// ## Arguments
    /// * 'data'    - The row buffer to read from
    /// * 'offset'  - Read position, advanced past the index
    /// * 'info'    - Width planner output
    /// * '`ci_type`' - The family being decoded
    ///
    /// # Errors
    /// Returns [`crate::Error::ShortRead`] on truncation or
    /// [`crate::Error::Unresolved`] for an out-of-range tag
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfoRef,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let coded_index = if info.coded_index_bits(ci_type) > 16 {
            read_le_at::<u32>(data, offset)?
        } else {
            u32::from(read_le_at::<u16>(data, offset)?)
        };

        let (tag, row) = info.decode_coded_index(coded_index, ci_type)?;
        Ok(CodedIndex::new(tag, row))
    }

    /// Encode and append this index to a row buffer.
    ///
    /// ## Arguments
    /// * 'writer'  - The output buffer
    /// * 'info'    - Width planner output
    /// * '`ci_type`' - The family being encoded
    ///
    /// # Errors
    /// Returns [`crate::Error::Unresolved`] if the tag table is not a member
    /// of the family
    pub fn write(
        &self,
        writer: &mut Writer,
        info: &TableInfoRef,
        ci_type: CodedIndexType,
    ) -> Result<()> {
        let tag = ci_type.tag_of(self.tag)?;
        let value = (self.row << ci_type.tag_bits()) | tag;

        writer.write_index(value, info.coded_index_bits(ci_type) > 16);
        Ok(())
    }

    /// The key this index sorts under: tag-major, row within a tag.
    #[must_use]
    pub(crate) fn sort_key(&self, ci_type: CodedIndexType) -> u64 {
        let tag = ci_type.tag_of(self.tag).unwrap_or(u32::MAX);
        (u64::from(tag) << 32) | u64::from(self.row)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strum::IntoEnumIterator;

    use crate::metadata::tables::TableInfo;

    use super::*;

    #[test]
    fn tag_bits_match_catalogue() {
        let expected = [
            (CodedIndexType::TypeDefOrRef, 2),
            (CodedIndexType::HasConstant, 2),
            (CodedIndexType::HasCustomAttribute, 5),
            (CodedIndexType::HasFieldMarshal, 1),
            (CodedIndexType::HasDeclSecurity, 2),
            (CodedIndexType::MemberRefParent, 3),
            (CodedIndexType::HasSemantics, 1),
            (CodedIndexType::MethodDefOrRef, 1),
            (CodedIndexType::MemberForwarded, 1),
            (CodedIndexType::Implementation, 2),
            (CodedIndexType::CustomAttributeType, 3),
            (CodedIndexType::ResolutionScope, 2),
            (CodedIndexType::TypeOrMethodDef, 1),
        ];

        for (family, bits) in expected {
            assert_eq!(family.tag_bits(), bits, "{family:?}");
        }
    }

    #[test]
    fn encode_decode_inverts() {
        let info = Arc::new(TableInfo::with_counts(
            &[
                (TableId::TypeDef, 100),
                (TableId::TypeRef, 50),
                (TableId::TypeSpec, 10),
            ],
            false,
            false,
            false,
        ));

        for family in CodedIndexType::iter() {
            for (position, &table) in family.tables().iter().enumerate() {
                // Reserved CustomAttributeType slots do not round-trip
                if family == CodedIndexType::CustomAttributeType && !(2..=3).contains(&position) {
                    continue;
                }

                let index = CodedIndex::new(table, 7);
                let mut writer = Writer::new();
                index.write(&mut writer, &info, family).unwrap();

                let mut offset = 0;
                let decoded =
                    CodedIndex::read(writer.as_slice(), &mut offset, &info, family).unwrap();
                assert_eq!(decoded, index, "{family:?} / {table:?}");
            }
        }
    }

    #[test]
    fn custom_attribute_type_uses_live_tags() {
        let family = CodedIndexType::CustomAttributeType;
        assert_eq!(family.tag_of(TableId::MethodDef).unwrap(), 2);
        assert_eq!(family.tag_of(TableId::MemberRef).unwrap(), 3);
        assert!(family.tag_of(TableId::TypeDef).is_err());
    }

    #[test]
    fn sort_key_is_tag_major() {
        let family = CodedIndexType::HasFieldMarshal;
        let field_one = CodedIndex::new(TableId::Field, 1).sort_key(family);
        let field_three = CodedIndex::new(TableId::Field, 3).sort_key(family);
        let param_one = CodedIndex::new(TableId::Param, 1).sort_key(family);

        assert!(field_one < field_three);
        assert!(field_three < param_one);
    }

    #[test]
    fn token_round_trip() {
        let index = CodedIndex::new(TableId::TypeSpec, 5);
        assert_eq!(index.token(), Token::new(0x1B00_0005));
        assert_eq!(CodedIndex::from_token(Token::new(0x1B00_0005)).unwrap(), index);
        assert!(CodedIndex::from_token(Token::new(0)).is_err());
        assert!(CodedIndex::from_token(Token::new(0x1E00_0001)).is_err());
    }
}
