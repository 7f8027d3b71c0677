#![allow(dead_code)]
use abixml::model::*;

use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .is_test(true)
            .init();
    });
}

pub fn class_mut(unit: &mut TranslationUnit, id: NodeId) -> &mut ClassDecl {
    match unit.arena_mut().get_mut(id) {
        Some(Node::Class(class)) => class,
        other => panic!("expected a class, found {:?}", other),
    }
}

/// Add `node` to namespace `scope`, which must be a namespace of `unit`.
pub fn in_scope(unit: &mut TranslationUnit, scope: NodeId, node: impl Into<Node>) -> NodeId {
    unit.add_to_scope(scope, node).expect("scope to be a namespace")
}

/// A unit touching every node kind and most optional attributes.
pub fn rich_unit() -> TranslationUnit {
    let mut unit = TranslationUnit::new("src/widget.cc");
    unit.language = Some("LANG_C_plus_plus".to_owned());
    unit.address_size = 64;

    let header = unit.create_location("include/widget.h", 10, 7);
    let source = unit.create_location("src/widget.cc", 42, 1);

    let int = unit.add_decl(BasicType {
        name: "int".to_owned(),
        size_in_bits: 32,
        alignment_in_bits: 32,
        location: Location::NONE,
    });
    let char_ = unit.add_decl(BasicType::new("char", 8));
    let ns = unit.add_decl(NamespaceDecl::new("gui"));

    let const_char = in_scope(
        &mut unit,
        ns,
        QualifiedType::new(char_, CvQualifiers::CONST),
    );
    let c_str = in_scope(&mut unit, ns, PointerType::new(const_char, 64));
    in_scope(&mut unit, ns, ReferenceType::new(int, ReferenceKind::LValue, 64));

    let mut color = EnumDecl::new("color", int)
        .with_enumerator("red", 0)
        .with_enumerator("green", 1)
        .with_enumerator("blue", -1);
    color.location = header;
    let color = in_scope(&mut unit, ns, color);

    in_scope(&mut unit, ns, TypedefDecl::new("color_t", color));

    // Forward declaration, completed below.
    let widget_decl = in_scope(&mut unit, ns, ClassDecl::declaration("widget"));

    let base = in_scope(
        &mut unit,
        ns,
        ClassDecl {
            is_struct: true,
            ..ClassDecl::new("base", 64)
        },
    );

    let widget = in_scope(
        &mut unit,
        ns,
        ClassDecl {
            location: header,
            visibility: Visibility::Default,
            earlier_declaration: Some(widget_decl),
            ..ClassDecl::new("widget", 192)
        },
    );
    let widget_ptr = in_scope(&mut unit, ns, PointerType::new(widget, 64));

    let nested = unit.alloc(TypedefDecl::new("size_type", int));
    let count = unit.alloc(VarDecl::new("count_", int));
    let instances = unit.alloc(VarDecl {
        mangled_name: Some("_ZN3gui6widget9instancesE".to_owned()),
        binding: Binding::Global,
        ..VarDecl::new("instances", int)
    });

    let ctor = unit.alloc(FunctionDecl {
        parameters: vec![Parameter::new(widget_ptr), Parameter::named(c_str, "title")],
        is_method: true,
        ..FunctionDecl::new("widget")
    });
    let size = unit.alloc(FunctionDecl {
        mangled_name: Some("_ZNK3gui6widget4sizeEv".to_owned()),
        declared_inline: true,
        parameters: vec![Parameter::new(widget_ptr)],
        return_type: Some(int),
        is_method: true,
        ..FunctionDecl::new("size")
    });

    let t = unit.alloc(TypeTemplateParameter::new("T"));
    let t_ref = unit.alloc(ReferenceType::new(t, ReferenceKind::RValue, 64));
    let composition = unit.alloc(TypeComposition { composed: t_ref });
    let emplace = unit.alloc(FunctionDecl {
        parameters: vec![Parameter::new(widget_ptr), Parameter::new(t_ref)],
        is_method: true,
        ..FunctionDecl::new("emplace")
    });
    let emplace = unit.alloc(FunctionTemplate::new(vec![t, composition], emplace));

    {
        let class = class_mut(&mut unit, widget);
        class.bases.push(BaseSpec {
            base,
            access: AccessSpecifier::Public,
            offset_in_bits: Some(0),
            is_virtual: true,
        });
        class.member_types.push(MemberType {
            access: AccessSpecifier::Public,
            decl: nested,
        });
        class.data_members.push(DataMember {
            access: AccessSpecifier::Private,
            is_static: false,
            offset_in_bits: Some(128),
            var: count,
        });
        class.data_members.push(DataMember {
            access: AccessSpecifier::Public,
            is_static: true,
            offset_in_bits: None,
            var: instances,
        });
        class.member_functions.push(MemberFunction {
            is_constructor: true,
            ..MemberFunction::new(AccessSpecifier::Public, ctor)
        });
        class.member_functions.push(MemberFunction {
            is_const: true,
            vtable_offset: Some(2),
            ..MemberFunction::new(AccessSpecifier::Public, size)
        });
        class.member_function_templates.push(MemberTemplate {
            access: AccessSpecifier::Public,
            is_constructor: false,
            is_static: false,
            template: emplace,
        });
    }

    in_scope(
        &mut unit,
        ns,
        VarDecl {
            location: source,
            visibility: Visibility::Default,
            binding: Binding::Weak,
            ..VarDecl::new("default_widget", widget)
        },
    );

    unit.add_decl(FunctionDecl {
        mangled_name: Some("printf".to_owned()),
        visibility: Visibility::Default,
        binding: Binding::Global,
        parameters: vec![Parameter::named(c_str, "format"), Parameter::variadic()],
        return_type: Some(int),
        ..FunctionDecl::new("printf")
    });

    let u = unit.alloc(TypeTemplateParameter::new("U"));
    let n = unit.alloc(NonTypeTemplateParameter {
        name: "N".to_owned(),
        ty: int,
        location: Location::NONE,
    });
    let container = unit.alloc(TypeTemplateParameter::new("C"));
    let tt = unit.alloc(TemplateTemplateParameter {
        name: "Alloc".to_owned(),
        location: Location::NONE,
        parameters: vec![container],
    });
    let array = unit.alloc(ClassDecl::new("array", 0));
    let elems = unit.alloc(VarDecl::new("elems", u));
    class_mut(&mut unit, array).data_members.push(DataMember {
        access: AccessSpecifier::Public,
        is_static: false,
        offset_in_bits: Some(0),
        var: elems,
    });
    unit.add_decl(ClassTemplate::new(vec![u, n, tt], array));

    let v = unit.alloc(TypeTemplateParameter::new("V"));
    let identity = unit.alloc(FunctionDecl {
        parameters: vec![Parameter::named(v, "value")],
        return_type: Some(v),
        ..FunctionDecl::new("identity")
    });
    unit.add_decl(FunctionTemplate {
        location: source,
        visibility: Visibility::Hidden,
        binding: Binding::Local,
        ..FunctionTemplate::new(vec![v], identity)
    });

    unit
}
