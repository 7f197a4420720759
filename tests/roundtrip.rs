//! Round-trip tests: a built graph, written and read back, resolves to an
//! equivalent graph.

use cilforge::metadata::cilassembly::{
    AssemblyDesc, AssemblyRefDesc, AttributeOwner, ConstantValue, GenericOwner, MemberRefParentRef,
    MemberRefSig, MethodRef, ResolutionScope, SecurityOwner, TypeRefOrDef,
};
use cilforge::metadata::marshalling::NativeType;
use cilforge::metadata::signatures::{
    SignatureField, SignatureLocalVariable, SignatureLocalVariables, SignatureMethod,
    SignatureMethodSpec, SignatureProperty, SignatureTypeSpec, SignatureSzArray, TypeSignature,
};
use cilforge::metadata::tables::{
    MethodAttributes, PInvokeAttributes, TableId, TypeAttributes,
};
use cilforge::{CilAssembly, CilView};

fn mscorlib(asm: &mut CilAssembly) -> cilforge::metadata::cilassembly::AssemblyRefHandle {
    asm.assembly_ref(AssemblyRefDesc {
        version: (4, 0, 0, 0),
        flags: 0,
        public_key_or_token: vec![0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89],
        name: "mscorlib".to_string(),
        culture: String::new(),
        hash_value: Vec::new(),
        os: None,
        processor: None,
    })
    .unwrap()
}

#[test]
fn full_graph_round_trip() {
    let mut asm = CilAssembly::new("app.exe");
    asm.set_mvid(uguid::guid!("12345678-9abc-def0-1234-56789abcdef0"))
        .unwrap();
    asm.set_assembly(AssemblyDesc {
        hash_alg_id: 0x8004,
        version: (1, 2, 3, 4),
        flags: 0,
        public_key: Vec::new(),
        name: "app".to_string(),
        culture: String::new(),
        os: None,
        processor: None,
    })
    .unwrap();

    let corlib = mscorlib(&mut asm);
    let object = asm
        .type_ref(ResolutionScope::AssemblyRef(corlib), "System", "Object")
        .unwrap();
    let handler = asm
        .type_ref(ResolutionScope::AssemblyRef(corlib), "System", "EventHandler")
        .unwrap();

    // A class with fields, methods, a property and an event
    let class_flags = TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT;
    let class = asm.add_type("App", "Widget", class_flags.bits()).unwrap();
    asm.set_extends(class, TypeRefOrDef::Ref(object)).unwrap();

    let count_field = asm
        .add_field(class, "count", 0x0001, SignatureField::new(TypeSignature::I4))
        .unwrap();
    let names_field = asm
        .add_field(
            class,
            "names",
            0x0001,
            SignatureField::new(TypeSignature::SzArray(SignatureSzArray {
                modifiers: Vec::new(),
                base: Box::new(TypeSignature::String),
            })),
        )
        .unwrap();
    asm.set_field_constant(count_field, ConstantValue::I4(42))
        .unwrap();

    let accessor_flags =
        MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG | MethodAttributes::SPECIAL_NAME;
    let get_count = asm
        .add_method(
            class,
            "get_Count",
            accessor_flags.bits(),
            0,
            SignatureMethod::new(TypeSignature::I4).instance(),
        )
        .unwrap();
    let resize = asm
        .add_method(
            class,
            "Resize",
            (MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG).bits(),
            0,
            SignatureMethod::new(TypeSignature::Void)
                .with_param(TypeSignature::I4)
                .with_param(TypeSignature::String)
                .instance(),
        )
        .unwrap();
    asm.set_method_rva(resize, 0x2050).unwrap();

    let size_param = asm.add_param(resize, 1, "size", 0).unwrap();
    asm.add_param(resize, 2, "label", 0).unwrap();
    asm.set_param_constant(size_param, ConstantValue::I4(16))
        .unwrap();

    let count_property = asm
        .add_property(class, "Count", 0, SignatureProperty::new(TypeSignature::I4))
        .unwrap();
    asm.set_property_accessors(count_property, Some(get_count), None)
        .unwrap();

    let changed_event = asm
        .add_event(class, "Changed", 0, TypeRefOrDef::Ref(handler))
        .unwrap();
    let add_changed = asm
        .add_method(
            class,
            "add_Changed",
            accessor_flags.bits(),
            0,
            SignatureMethod::new(TypeSignature::Void)
                .with_param(TypeSignature::Class(TypeRefOrDef::Ref(handler).token()))
                .instance(),
        )
        .unwrap();
    asm.set_event_accessors(changed_event, Some(add_changed), None, None)
        .unwrap();

    // Interop surface
    let kernel32 = asm.module_ref("kernel32.dll").unwrap();
    let beep = asm
        .add_method(
            class,
            "Beep",
            (MethodAttributes::STATIC
                | MethodAttributes::PUBLIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::PINVOKE_IMPL)
                .bits(),
            0,
            SignatureMethod::new(TypeSignature::Boolean)
                .with_param(TypeSignature::U4)
                .with_param(TypeSignature::U4),
        )
        .unwrap();
    asm.set_pinvoke(
        beep,
        kernel32,
        "Beep",
        (PInvokeAttributes::CHAR_SET_ANSI | PInvokeAttributes::CALL_CONV_WINAPI).bits(),
    )
    .unwrap();

    let buffer = asm
        .add_field(class, "buffer", 0x0001, SignatureField::new(TypeSignature::String))
        .unwrap();
    asm.set_field_marshalling(buffer, NativeType::LPWStr { size_param_index: None })
        .unwrap();

    // A generic container with a constrained parameter
    let container = asm.add_type("App", "Container", 0x0010_0001).unwrap();
    let gp = asm
        .add_generic_param(GenericOwner::Type(container), 0, 0, "T")
        .unwrap();
    asm.add_generic_constraint(gp, TypeRefOrDef::Ref(object))
        .unwrap();

    // Interfaces, nesting, layout
    let disposable = asm
        .type_ref(ResolutionScope::AssemblyRef(corlib), "System", "IDisposable")
        .unwrap();
    asm.add_interface_impl(class, TypeRefOrDef::Ref(disposable))
        .unwrap();

    let nested = asm.add_type("", "Inner", 0x0000_0002).unwrap();
    asm.add_nested_type(nested, class).unwrap();

    asm.set_class_layout(container, 8, 64).unwrap();
    asm.set_field_offset(count_field, 0).unwrap();
    asm.set_field_rva(names_field, 0x4000).unwrap();

    // External member references and specs
    let ctor = asm
        .member_ref(
            MemberRefParentRef::Type(TypeRefOrDef::Ref(object)),
            ".ctor",
            MemberRefSig::Method(SignatureMethod::new(TypeSignature::Void).instance()),
        )
        .unwrap();
    asm.add_custom_attribute(AttributeOwner::Type(class), MethodRef::Ref(ctor), vec![1, 0, 0, 0])
        .unwrap();

    let list_of_int = asm
        .type_spec(SignatureTypeSpec {
            base: TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(TypeRefOrDef::Ref(object).token())),
                vec![TypeSignature::I4],
            ),
        })
        .unwrap();
    let _ = list_of_int;

    asm.method_spec(
        MethodRef::Def(resize),
        SignatureMethodSpec {
            generic_args: vec![TypeSignature::I4],
        },
    )
    .unwrap();

    asm.add_standalone_sig(SignatureLocalVariables {
        locals: vec![SignatureLocalVariable {
            modifiers: Vec::new(),
            is_byref: false,
            is_pinned: false,
            base: TypeSignature::I4,
        }],
    })
    .unwrap();

    asm.add_decl_security(SecurityOwner::Assembly, 8, vec![0x2E, 0x01])
        .unwrap();
    asm.add_resource("app.resources", 1, 0, None).unwrap();

    let literal = asm.add_user_string("hello world").unwrap();
    assert!(literal > 0);

    asm.finalize().unwrap();

    // Token stability: stamped tokens answer the same after finalize
    let resize_token = asm.method_token(resize).unwrap();
    let count_token = asm.field_token(count_field).unwrap();
    assert_eq!(resize_token, asm.method_token(resize).unwrap());

    let image = asm.write().unwrap();
    let view = CilView::read(&image).unwrap();

    // Module and manifest
    assert_eq!(view.module().name, "app.exe");
    assert_eq!(
        view.module().mvid,
        uguid::guid!("12345678-9abc-def0-1234-56789abcdef0")
    );
    assert_eq!(view.tables().table_row_count(TableId::Assembly), 1);
    assert_eq!(view.tables().table_row_count(TableId::AssemblyRef), 1);

    // Types in insertion order
    let types: Vec<&str> = view.types().iter().map(|ty| ty.name.as_str()).collect();
    assert_eq!(types, vec!["Widget", "Container", "Inner"]);

    let widget = &view.types()[0];
    assert_eq!(widget.namespace, "App");
    assert_eq!(widget.flags, 0x0010_0001);

    // extends resolves to the interned System.Object TypeRef
    let extends = widget.extends.unwrap();
    assert_eq!(extends.tag, TableId::TypeRef);

    // Fields with signatures decoded on demand
    let fields = view.fields_of(widget);
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0].name, "count");
    assert_eq!(
        view.field_signature(&fields[0]).unwrap().base,
        TypeSignature::I4
    );
    assert!(matches!(
        view.field_signature(&fields[1]).unwrap().base,
        TypeSignature::SzArray(_)
    ));
    assert_eq!(fields[0].token, count_token);

    // Methods, params, ranges
    let methods = view.methods_of(widget);
    assert_eq!(methods.len(), 4);
    assert_eq!(methods[1].name, "Resize");
    assert_eq!(methods[1].rva, 0x2050);
    assert_eq!(methods[1].token, resize_token);

    let resize_view = &methods[1];
    let params = view.params_of(resize_view);
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name, "size");
    assert_eq!(params[1].sequence, 2);

    let resize_sig = view.method_signature(resize_view).unwrap();
    assert!(resize_sig.has_this);
    assert_eq!(resize_sig.params.len(), 2);

    // Property and event wiring
    let properties = view.properties_of(widget);
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].name, "Count");
    assert_eq!(
        view.property_signature(&properties[0]).unwrap().base,
        TypeSignature::I4
    );

    let events = view.events_of(widget);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "Changed");
    assert_eq!(events[0].event_type.unwrap().tag, TableId::TypeRef);

    // Auxiliary tables made it through with their expected populations
    let tables = view.tables();
    assert_eq!(tables.table_row_count(TableId::InterfaceImpl), 1);
    assert_eq!(tables.table_row_count(TableId::Constant), 2);
    assert_eq!(tables.table_row_count(TableId::CustomAttribute), 1);
    assert_eq!(tables.table_row_count(TableId::FieldMarshal), 1);
    assert_eq!(tables.table_row_count(TableId::DeclSecurity), 1);
    assert_eq!(tables.table_row_count(TableId::ClassLayout), 1);
    assert_eq!(tables.table_row_count(TableId::FieldLayout), 1);
    assert_eq!(tables.table_row_count(TableId::FieldRVA), 1);
    assert_eq!(tables.table_row_count(TableId::ImplMap), 1);
    assert_eq!(tables.table_row_count(TableId::ModuleRef), 1);
    assert_eq!(tables.table_row_count(TableId::NestedClass), 1);
    assert_eq!(tables.table_row_count(TableId::GenericParam), 1);
    assert_eq!(tables.table_row_count(TableId::GenericParamConstraint), 1);
    assert_eq!(tables.table_row_count(TableId::MethodSemantics), 2);
    assert_eq!(tables.table_row_count(TableId::MemberRef), 1);
    assert_eq!(tables.table_row_count(TableId::MethodSpec), 1);
    assert_eq!(tables.table_row_count(TableId::TypeSpec), 1);
    assert_eq!(tables.table_row_count(TableId::StandAloneSig), 1);
    assert_eq!(tables.table_row_count(TableId::ManifestResource), 1);

    // The user string survived in #US
    let userstrings = view.userstrings().unwrap().unwrap();
    assert_eq!(
        userstrings.get(literal as usize).unwrap().to_string_lossy(),
        "hello world"
    );
}

#[test]
fn sorted_tables_come_back_sorted() {
    let mut asm = CilAssembly::new("m.dll");

    // Constants attach to fields of two types; the second type's fields have
    // higher row ids, so insertion order across types is already scrambled
    // relative to the (tag, row) sort key when we attach to the later type
    // first
    let first = asm.add_type("", "A", 0).unwrap();
    let second = asm.add_type("", "B", 0).unwrap();

    let a_field = asm
        .add_field(first, "x", 0, SignatureField::new(TypeSignature::I4))
        .unwrap();
    let b_field = asm
        .add_field(second, "y", 0, SignatureField::new(TypeSignature::I4))
        .unwrap();

    // Attachment order must not matter
    asm.set_field_constant(b_field, ConstantValue::I4(2)).unwrap();
    asm.set_field_constant(a_field, ConstantValue::I4(1)).unwrap();

    asm.finalize().unwrap();
    let image = asm.write().unwrap();

    let view = CilView::read(&image).unwrap();
    let constants = view.tables().constant().unwrap().unwrap();
    let parents: Vec<u32> = constants
        .iter()
        .map(|row| row.unwrap().parent.row)
        .collect();
    assert_eq!(parents, vec![1, 2]);
}

#[test]
fn generic_params_sort_by_owner_then_number() {
    let mut asm = CilAssembly::new("m.dll");

    let first = asm.add_type("", "A", 0).unwrap();
    let second = asm.add_type("", "B", 0).unwrap();

    // Declared out of order on purpose
    asm.add_generic_param(GenericOwner::Type(second), 1, 0, "U").unwrap();
    asm.add_generic_param(GenericOwner::Type(second), 0, 0, "T").unwrap();
    asm.add_generic_param(GenericOwner::Type(first), 0, 0, "T").unwrap();

    asm.finalize().unwrap();
    let image = asm.write().unwrap();

    let view = CilView::read(&image).unwrap();
    let rows: Vec<(u32, u16)> = view
        .tables()
        .generic_param()
        .unwrap()
        .unwrap()
        .iter()
        .map(|row| {
            let row = row.unwrap();
            (row.owner.row, row.number)
        })
        .collect();
    assert_eq!(rows, vec![(1, 0), (2, 0), (2, 1)]);
}

#[test]
fn same_named_nested_types_round_trip() {
    // List<T>.Enumerator and Dictionary<K,V>.Enumerator both carry the
    // identity ("", "Enumerator") until nesting splits them
    let mut asm = CilAssembly::new("m.dll");
    let list = asm
        .add_type("System.Collections.Generic", "List", 0x0010_0001)
        .unwrap();
    let dictionary = asm
        .add_type("System.Collections.Generic", "Dictionary", 0x0010_0001)
        .unwrap();

    let list_enumerator = asm.add_type("", "Enumerator", 0x0000_0102).unwrap();
    let dictionary_enumerator = asm.add_type("", "Enumerator", 0x0000_0102).unwrap();
    asm.add_nested_type(list_enumerator, list).unwrap();
    asm.add_nested_type(dictionary_enumerator, dictionary).unwrap();

    asm.finalize().unwrap();
    let image = asm.write().unwrap();

    let view = CilView::read(&image).unwrap();
    let names: Vec<&str> = view.types().iter().map(|ty| ty.name.as_str()).collect();
    assert_eq!(names, vec!["List", "Dictionary", "Enumerator", "Enumerator"]);

    // Each enumerator nests under its own enclosing type
    let nested: Vec<(u32, u32)> = view
        .tables()
        .nested_class()
        .unwrap()
        .unwrap()
        .iter()
        .map(|row| {
            let row = row.unwrap();
            (row.nested_class, row.enclosing_class)
        })
        .collect();
    assert_eq!(nested, vec![(3, 1), (4, 2)]);
}

#[test]
fn lenient_read_collects_diagnostics() {
    let mut asm = CilAssembly::new("m.dll");
    let class = asm.add_type("", "C", 0).unwrap();
    asm.add_field(class, "a", 0, SignatureField::new(TypeSignature::I4))
        .unwrap();
    asm.finalize().unwrap();
    let image = asm.write().unwrap();

    // Damage the TypeDef name offset so string resolution fails
    let root = cilforge::metadata::streams::Root::read(&image).unwrap();
    let header = root.stream("#~").unwrap();
    let tables_start = header.offset as usize;
    // header: 24 fixed + 3 row counts (Module, TypeDef, Field), then the
    // Module row (10 bytes), then the TypeDef row: flags(4) name(2)
    let name_offset = tables_start + 24 + 12 + 10 + 4;
    let mut corrupt = image.clone();
    corrupt[name_offset..name_offset + 2].copy_from_slice(&0xFFFFu16.to_le_bytes());

    // Strict read names table, row and column
    let error = CilView::read(&corrupt).unwrap_err();
    assert_eq!(
        error.to_string(),
        "corrupt index - TypeDef row 1, column 'Name'"
    );

    // Lenient read carries on and reports
    let view = CilView::read_lenient(&corrupt).unwrap();
    assert_eq!(view.diagnostics().len(), 1);
    assert_eq!(view.types().len(), 1);
    assert_eq!(view.types()[0].name, "");
    assert_eq!(view.fields_of(&view.types()[0]).len(), 1);
}
