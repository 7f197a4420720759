//! Scenario tests for the serialization engine: fixed byte layouts, width
//! flips and sort behavior observable through the public API.

use cilforge::file::{Parser, Writer};
use cilforge::metadata::heaps::BlobBuilder;
use cilforge::metadata::signatures::{SignatureField, TypeSignature};
use cilforge::metadata::streams::{Root, TablesHeader};
use cilforge::metadata::tables::{CodedIndexType, TableId};
use cilforge::{CilAssembly, CilView, Error};

fn tables_stream(image: &[u8]) -> Vec<u8> {
    let root = Root::read(image).unwrap();
    let header = root.stream("#~").unwrap();
    image[header.offset as usize..(header.offset + header.size) as usize].to_vec()
}

#[test]
fn empty_module() {
    let mut asm = CilAssembly::new("m.dll");
    asm.finalize().unwrap();
    let image = asm.write().unwrap();

    let stream = tables_stream(&image);

    // Valid mask has only bit 0 (Module)
    assert_eq!(u64::from_le_bytes(stream[8..16].try_into().unwrap()), 1);
    // Sorted mask is the fixed catalogue constant, regardless of population
    assert_eq!(
        u64::from_le_bytes(stream[16..24].try_into().unwrap()),
        0x0000_1600_3325_FA00
    );
    // Exactly one row count: 1
    assert_eq!(u32::from_le_bytes(stream[24..28].try_into().unwrap()), 1);

    let header = TablesHeader::from(&stream).unwrap();
    let module = header.module().unwrap().unwrap();
    let row = module.get(1).unwrap().unwrap();

    // Name points at "m.dll" at Strings offset 1, Mvid at GUID index 1
    assert_eq!(row.name, 1);
    assert_eq!(row.mvid, 1);
    assert_eq!(row.enc_id, 0);
    assert_eq!(row.enc_base_id, 0);
    assert_eq!(row.generation, 0);

    let view = CilView::read(&image).unwrap();
    assert_eq!(view.module().name, "m.dll");
    assert!(view.types().is_empty());
}

#[test]
fn typedef_with_two_fields_in_order() {
    let mut asm = CilAssembly::new("m.dll");
    let class = asm.add_type("", "C", 0x0010_0001).unwrap();
    asm.add_field(class, "a", 0x0006, SignatureField::new(TypeSignature::I4))
        .unwrap();
    asm.add_field(class, "b", 0x0006, SignatureField::new(TypeSignature::I4))
        .unwrap();
    asm.finalize().unwrap();
    let image = asm.write().unwrap();

    let stream = tables_stream(&image);
    let header = TablesHeader::from(&stream).unwrap();

    let type_row = header.type_def().unwrap().unwrap().get(1).unwrap().unwrap();
    assert_eq!(type_row.field_list, 1);

    let view = CilView::read(&image).unwrap();
    let class = &view.types()[0];
    assert_eq!(class.name, "C");
    // The class owns field rows 1..3 (exclusive end)
    assert_eq!(class.field_range, 1..3);

    let fields = view.fields_of(class);
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "a");
    assert_eq!(fields[1].name, "b");
}

#[test]
fn coded_index_width_flip() {
    // TypeDefOrRef carries 2 tag bits, so the threshold sits at 2^14 rows
    let build = |count: u32| {
        let mut asm = CilAssembly::new("m.dll");
        let first = asm.add_type("", "T0", 0).unwrap();
        for index in 1..count {
            let ty = asm.add_type("", &format!("T{index}"), 0).unwrap();
            asm.set_extends(ty, cilforge::metadata::cilassembly::TypeRefOrDef::Def(first))
                .unwrap();
        }
        asm.finalize().unwrap();
        asm.write().unwrap()
    };

    let below = tables_stream(&build(16_383));
    let header = TablesHeader::from(&below).unwrap();
    assert_eq!(header.info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);

    let above = tables_stream(&build(16_385));
    let header = TablesHeader::from(&above).unwrap();
    assert_eq!(header.info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);

    // The widened stream still resolves
    let image = build(16_385);
    let view = CilView::read(&image).unwrap();
    assert_eq!(view.types().len(), 16_385);
    assert_eq!(
        view.types()[1].extends.unwrap(),
        cilforge::metadata::tables::CodedIndex::new(TableId::TypeDef, 1)
    );
}

#[test]
fn blob_dedup() {
    let mut blobs = BlobBuilder::new();

    let first = blobs.intern(&[1, 2, 3, 4, 5]).unwrap();
    let second = blobs.intern(&[1, 2, 3, 4, 5]).unwrap();

    assert_eq!(first, second);
    // Reserved byte + len prefix + 5 payload bytes, nothing more
    assert_eq!(blobs.size(), 1 + 1 + 5);
}

#[test]
fn compressed_integer_encoding() {
    let cases: &[(u32, &[u8])] = &[
        (0x03, &[0x03]),
        (0x7F, &[0x7F]),
        (0x80, &[0x80, 0x80]),
        (0x2E57, &[0xAE, 0x57]),
        (0x3FFF, &[0xBF, 0xFF]),
        (0x4000, &[0xC0, 0x00, 0x40, 0x00]),
    ];

    for (value, expected) in cases {
        let mut writer = Writer::new();
        writer.write_compressed_uint(*value).unwrap();
        assert_eq!(writer.as_slice(), *expected, "value {value:#x}");

        let mut parser = Parser::new(expected);
        assert_eq!(parser.read_compressed_uint().unwrap(), *value);
    }

    // Values past 2^29 - 1 are unrepresentable
    let mut writer = Writer::new();
    assert!(matches!(
        writer.write_compressed_uint(0x2000_0000),
        Err(Error::SignatureTooLarge(_))
    ));
}

#[test]
fn field_marshal_sort_order() {
    use cilforge::metadata::marshalling::NativeType;
    use cilforge::metadata::signatures::SignatureMethod;

    // Marshalled members across two tag families: all Field parents must
    // precede all Param parents, row order ascending within a tag
    let mut asm = CilAssembly::new("m.dll");
    let class = asm.add_type("", "C", 0).unwrap();

    let f1 = asm
        .add_field(class, "f1", 0, SignatureField::new(TypeSignature::I4))
        .unwrap();
    asm.add_field(class, "f2", 0, SignatureField::new(TypeSignature::I4))
        .unwrap();
    let f3 = asm
        .add_field(class, "f3", 0, SignatureField::new(TypeSignature::String))
        .unwrap();

    let method = asm
        .add_method(
            class,
            "M",
            0,
            0,
            SignatureMethod::new(TypeSignature::Void).with_param(TypeSignature::String),
        )
        .unwrap();
    let p1 = asm.add_param(method, 1, "s", 0).unwrap();

    // Attach in scrambled order; the sorter owns the final layout
    asm.set_field_marshalling(f3, NativeType::LPWStr { size_param_index: None })
        .unwrap();
    asm.set_param_marshalling(p1, NativeType::LPStr { size_param_index: None })
        .unwrap();
    asm.set_field_marshalling(f1, NativeType::I4).unwrap();

    asm.finalize().unwrap();
    let image = asm.write().unwrap();

    let stream = tables_stream(&image);
    let header = TablesHeader::from(&stream).unwrap();
    let marshal = header.field_marshal().unwrap().unwrap();

    let parents: Vec<(TableId, u32)> = marshal
        .iter()
        .map(|row| {
            let row = row.unwrap();
            (row.parent.tag, row.parent.row)
        })
        .collect();
    assert_eq!(
        parents,
        vec![
            (TableId::Field, 1),
            (TableId::Field, 3),
            (TableId::Param, 1),
        ]
    );
}

#[test]
fn lifecycle_is_one_way() {
    let mut asm = CilAssembly::new("m.dll");

    // write before finalize is a state error
    assert!(matches!(asm.write(), Err(Error::InvalidState(_))));

    asm.finalize().unwrap();
    assert!(matches!(asm.finalize(), Err(Error::InvalidState(_))));
    assert!(matches!(asm.add_type("", "C", 0), Err(Error::InvalidState(_))));

    let _image = asm.write().unwrap();
    assert!(matches!(asm.write(), Err(Error::InvalidState(_))));
}

#[test]
fn unknown_valid_bit_is_unsupported_table() {
    let mut asm = CilAssembly::new("m.dll");
    asm.finalize().unwrap();
    let image = asm.write().unwrap();

    let mut stream = tables_stream(&image);
    let mut valid = u64::from_le_bytes(stream[8..16].try_into().unwrap());
    valid |= 1 << 0x1F; // EncMap lives outside the catalogue
    stream[8..16].copy_from_slice(&valid.to_le_bytes());

    assert!(matches!(
        TablesHeader::from(&stream),
        Err(Error::UnsupportedTable(0x1F))
    ));
}
