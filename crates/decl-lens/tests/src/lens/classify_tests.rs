use super::*;
use crate::{
    ast::{MethodData, RecordData},
    test_support::Fixture,
};

fn flags(kind: &DeclKind) -> (bool, bool) {
    let class = classify(kind);
    (class.emit_self, class.visit_children)
}

#[test]
fn template_with_pattern_is_replaced_by_it() {
    let mut fx = Fixture::new();
    let pattern = fx.record(None, "Vec", 0, 29);
    let class = classify(&DeclKind::Template {
        pattern: Some(pattern),
    });
    assert_eq!(class.substitute, Some(pattern));
    assert!(!class.emit_self);
    assert!(!class.is_skip());
}

#[test]
fn template_without_pattern_is_emitted_alone() {
    assert_eq!(
        flags(&DeclKind::Template {
            pattern: None
        }),
        (true, false)
    );
}

#[test]
fn namespaces_are_transparent() {
    assert_eq!(flags(&DeclKind::Namespace), (false, true));
    assert_eq!(flags(&DeclKind::NamespaceAlias), (false, true));
}

#[test]
fn functions_do_not_expose_their_bodies() {
    assert_eq!(flags(&DeclKind::Function), (true, false));
    assert_eq!(flags(&DeclKind::Method(MethodData::default())), (true, false));
}

#[test]
fn records_and_other_declarations_are_emitted_and_entered() {
    assert_eq!(flags(&DeclKind::Record(RecordData::default())), (true, true));
    assert_eq!(flags(&DeclKind::Other), (true, true));
}

#[test]
fn class_specializations_follow_their_status() {
    let specialized = |status| DeclKind::ClassSpecialization {
        status,
        record: RecordData::default(),
    };
    assert!(classify(&specialized(TemplateStatus::ImplicitInstantiation)).is_skip());
    assert_eq!(flags(&specialized(TemplateStatus::ExplicitInstantiation)), (true, false));
    assert_eq!(flags(&specialized(TemplateStatus::ExplicitSpecialization)), (true, true));
}

#[test]
fn function_specializations_need_to_be_written() {
    let specialized = |status| DeclKind::FunctionSpecialization {
        status,
        method: None,
    };
    assert!(classify(&specialized(TemplateStatus::ImplicitInstantiation)).is_skip());
    assert_eq!(flags(&specialized(TemplateStatus::ExplicitInstantiation)), (true, false));
    assert_eq!(flags(&specialized(TemplateStatus::ExplicitSpecialization)), (true, false));
}

#[test]
fn skip_is_skip() {
    assert!(Classification::SKIP.is_skip());
}
