use super::*;
use crate::{
    ast::{DeclNode, MethodData, RecordData, TemplateStatus},
    test_support::Fixture,
};

#[test]
fn records_are_qualified_by_their_scopes() {
    let mut fx = Fixture::new();
    let ns_loc = fx.at(0, 10, 6);
    let ns = fx.add(None, DeclKind::Namespace, "shapes", ns_loc);
    let outer = fx.record(Some(ns), "Outer", 1, 7);
    let inner = fx.record(Some(outer), "Inner", 2, 9);
    let tree = fx.finish();

    assert_eq!(symbol_id(&tree, ns), Some(SymbolId::new("n:shapes")));
    assert_eq!(symbol_id(&tree, inner).unwrap().as_str(), "c:shapes::Outer::Inner");
}

#[test]
fn overloads_are_distinguished_by_type() {
    let mut fx = Fixture::new();
    let a_loc = fx.at(0, 5, 4);
    let a = fx.builder.add_decl(None, DeclNode::new(DeclKind::Function).named("draw").at(a_loc).with_type("void (int)"));
    let b_loc = fx.at(1, 5, 4);
    let b = fx.builder.add_decl(None, DeclNode::new(DeclKind::Function).named("draw").at(b_loc).with_type("void (float)"));
    let tree = fx.finish();

    assert_eq!(symbol_id(&tree, a).unwrap().to_string(), "f:draw#void (int)");
    assert_ne!(symbol_id(&tree, a), symbol_id(&tree, b));
}

#[test]
fn methods_and_member_specializations_share_a_prefix() {
    let mut fx = Fixture::new();
    let record = fx.record(None, "Shape", 0, 7);
    let method = fx.method(record, "area", 1, 9, false);
    let spec_loc = fx.at(2, 9, 4);
    let specialized = fx.builder.add_decl(
        Some(record),
        DeclNode::new(DeclKind::FunctionSpecialization {
            status: TemplateStatus::ExplicitSpecialization,
            method: Some(MethodData::default()),
        })
        .named("area")
        .at(spec_loc)
        .with_type("void ()"),
    );
    let tree = fx.finish();

    assert_eq!(symbol_id(&tree, method).unwrap().as_str(), "m:Shape::area#void ()");
    assert_eq!(symbol_id(&tree, specialized), symbol_id(&tree, method));
}

#[test]
fn template_wrappers_share_their_pattern_identity() {
    let mut fx = Fixture::new();
    let loc = fx.at(0, 29, 3);
    let template = fx.add(
        None,
        DeclKind::Template {
            pattern: None,
        },
        "Vec",
        loc,
    );
    let pattern = fx.add(Some(template), DeclKind::Record(RecordData::default()), "Vec", loc);
    let bare_loc = fx.at(1, 29, 5);
    let bare = fx.add(
        None,
        DeclKind::Template {
            pattern: None,
        },
        "Alias",
        bare_loc,
    );
    fx.builder.set_pattern(template, pattern);
    let tree = fx.finish();

    assert_eq!(symbol_id(&tree, template), symbol_id(&tree, pattern));
    assert_eq!(symbol_id(&tree, pattern).unwrap().as_str(), "c:Vec");
    assert_eq!(symbol_id(&tree, bare).unwrap().as_str(), "t:Alias");
}

#[test]
fn anonymous_declarations_have_no_identity() {
    let mut fx = Fixture::new();
    let anon = fx.builder.add_decl(None, DeclNode::new(DeclKind::Record(RecordData::default())));
    let tree = fx.finish();
    assert_eq!(symbol_id(&tree, anon), None);
}
