use std::{path::Path, sync::Mutex};

use expect_test::expect;

use super::*;
use crate::{
    ast::{DeclKind, DeclNode, MethodData, RecordData, TemplateStatus},
    ide::navigation::{IdeLocation, IdePosition, IdeRange},
    index::{IndexedSymbol, ProjectIndex, RelationKind, RelationsRequest, SymbolId},
    lens::types::SHOW_REFERENCES,
    test_support::{Fixture, HEADER, MAIN, base_derived_tree, main_path, render},
};

/// Index double that answers every query with `results` objects, ignoring
/// the requested limit, and remembers what it was asked.
struct RecordingIndex {
    results: usize,
    requests: Mutex<Vec<RelationsRequest>>,
}

impl RecordingIndex {
    fn new(results: usize) -> Self {
        Self {
            results,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<RelationsRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SymbolIndex for RecordingIndex {
    fn relations(
        &self,
        request: &RelationsRequest,
        callback: &mut dyn FnMut(&SymbolId, &IndexedSymbol),
    ) {
        self.requests.lock().unwrap().push(request.clone());
        for i in 0..self.results {
            let object = IndexedSymbol {
                id: SymbolId::new(format!("c:Other{i}")),
                name: format!("Other{i}"),
                canonical_declaration: IdeLocation::new(
                    "/decl-lens-test/other.cpp",
                    IdeRange::new(IdePosition::new(i as u32, 7), IdePosition::new(i as u32, 12)),
                ),
            };
            callback(&request.subjects[0], &object);
        }
    }
}

fn lenses(
    tree: &DeclTree,
    index: Option<&dyn SymbolIndex>,
    options: LensOptions,
) -> Vec<Lens> {
    document_lenses(tree, index, &options, main_path())
}

#[test]
fn base_and_derived_classes_get_markers_and_hierarchy_commands() {
    let tree = base_derived_tree();
    let index = ProjectIndex::new();
    index.index_tree(Path::new(MAIN), &tree);

    let lenses = lenses(&tree, Some(&index), LensOptions::default());
    expect![[r#"
        0:7 <marker>
        0:7 1 derived
        1:15 <marker>
        1:15 1 derived
        3:7 <marker>
        3:7 1 base
        4:7 <marker>
        4:7 1 base
    "#]]
    .assert_eq(&render(&lenses));
}

#[test]
fn repeated_computation_is_identical() {
    let tree = base_derived_tree();
    let index = ProjectIndex::new();
    index.index_tree(Path::new(MAIN), &tree);

    let first = lenses(&tree, Some(&index), LensOptions::default());
    let second = lenses(&tree, Some(&index), LensOptions::default());
    assert_eq!(first, second);
}

#[test]
fn markers_carry_the_document_and_commands_their_locations() {
    let tree = base_derived_tree();
    let index = ProjectIndex::new();
    index.index_tree(Path::new(MAIN), &tree);
    let lenses = lenses(&tree, Some(&index), LensOptions::default());

    assert_eq!(lenses[0].resolve_data().map(|data| data.path.as_path()), Some(main_path()));
    assert!(!lenses[0].is_resolved());

    let derived = lenses[1].command().unwrap();
    assert_eq!(derived.command, SHOW_REFERENCES);
    assert_eq!(derived.argument.path, main_path());
    assert_eq!(derived.argument.position, IdePosition::new(0, 7));
    assert_eq!(derived.argument.locations[0].range.start, IdePosition::new(3, 7));
    assert_eq!(lenses[1].range(), lenses[0].range());
}

#[test]
fn namespaces_are_entered_but_never_annotated() {
    let mut fx = Fixture::new();
    let ns_loc = fx.at(0, 10, 2);
    let ns = fx.add(None, DeclKind::Namespace, "ns", ns_loc);
    fx.record(Some(ns), "A", 1, 7);
    let alias_loc = fx.at(3, 10, 5);
    fx.add(None, DeclKind::NamespaceAlias, "short", alias_loc);
    let tree = fx.finish();

    expect![[r#"
        1:7 <marker>
    "#]]
    .assert_eq(&render(&lenses(&tree, None, LensOptions::default())));
}

#[test]
fn declarations_sharing_a_name_token_are_annotated_once() {
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
    fx.builder.set_pattern(template, pattern);
    // A second top-level entry for the same written declaration.
    fx.add(None, DeclKind::Record(RecordData::default()), "Vec", loc);
    let tree = fx.finish();

    let index = RecordingIndex::new(0);
    let lenses = lenses(&tree, Some(&index), LensOptions::default());
    assert_eq!(render(&lenses), "0:29 <marker>\n");
    assert_eq!(index.requests().len(), 1);
}

#[test]
fn implicit_macro_anonymous_and_foreign_declarations_are_ignored() {
    let mut fx = Fixture::new();
    let implicit_loc = fx.at(0, 7, 1);
    let implicit = DeclNode::new(DeclKind::Record(RecordData::default())).named("A").at(implicit_loc).implicit();
    fx.builder.add_decl(None, implicit);
    let macro_loc = fx.at(1, 0, 4).from_macro();
    fx.add(None, DeclKind::Record(RecordData::default()), "Gen", macro_loc);
    let anon_loc = fx.at(2, 0, 6);
    let anonymous = DeclNode::new(DeclKind::Record(RecordData::default())).at(anon_loc);
    fx.builder.add_decl(None, anonymous);
    let header_loc = fx.at_in(HEADER, 3, 7, 4);
    fx.add(None, DeclKind::Record(RecordData::default()), "Base", header_loc);
    let tree = fx.finish();

    assert!(lenses(&tree, None, LensOptions::default()).is_empty());
}

#[test]
fn explicit_instantiations_and_specializations_are_annotated() {
    let mut fx = Fixture::new();
    // template <typename T> struct Vec { T x; };
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
    fx.builder.set_pattern(template, pattern);
    let x_loc = fx.at(0, 37, 1);
    fx.add(Some(pattern), DeclKind::Other, "x", x_loc);
    fx.add(
        Some(template),
        DeclKind::ClassSpecialization {
            status: TemplateStatus::ImplicitInstantiation,
            record: RecordData::default(),
        },
        "Vec",
        loc,
    );
    // template struct Vec<int>;
    let inst_loc = fx.at(1, 16, 3);
    let inst = fx.add(
        None,
        DeclKind::ClassSpecialization {
            status: TemplateStatus::ExplicitInstantiation,
            record: RecordData::default(),
        },
        "Vec",
        inst_loc,
    );
    let inst_x = fx.at(1, 40, 1);
    fx.add(Some(inst), DeclKind::Other, "x", inst_x);
    // template <> struct Vec<bool> { bool y; };
    let spec_loc = fx.at(2, 19, 3);
    let specialized = fx.add(
        None,
        DeclKind::ClassSpecialization {
            status: TemplateStatus::ExplicitSpecialization,
            record: RecordData::default(),
        },
        "Vec",
        spec_loc,
    );
    let y_loc = fx.at(2, 37, 1);
    fx.add(Some(specialized), DeclKind::Other, "y", y_loc);
    let tree = fx.finish();

    expect![[r#"
        0:29 <marker>
        0:37 <marker>
        1:16 <marker>
        2:19 <marker>
        2:37 <marker>
    "#]]
    .assert_eq(&render(&lenses(&tree, None, LensOptions::default())));
}

#[test]
fn function_bodies_are_not_entered() {
    let mut fx = Fixture::new();
    let f = fx.function(None, "f", 0, 5);
    fx.record(Some(f), "Local", 1, 9);
    let tree = fx.finish();

    assert_eq!(render(&lenses(&tree, None, LensOptions::default())), "0:5 <marker>\n");
}

#[test]
fn base_commands_do_not_need_an_index() {
    let tree = base_derived_tree();

    expect![[r#"
        0:7 <marker>
        1:15 <marker>
        3:7 <marker>
        3:7 1 base
        4:7 <marker>
        4:7 1 base
    "#]]
    .assert_eq(&render(&lenses(&tree, None, LensOptions::default())));
}

#[test]
fn final_classes_and_non_virtual_methods_skip_the_derived_query() {
    let mut fx = Fixture::new();
    let leaf = fx.record(None, "Leaf", 0, 7);
    fx.builder.set_final(leaf);
    fx.method(leaf, "area", 1, 9, false);
    let open = fx.record(None, "Open", 3, 7);
    fx.method(open, "draw", 4, 17, true);
    let tree = fx.finish();

    let index = RecordingIndex::new(0);
    lenses(&tree, Some(&index), LensOptions::default());
    let asked: Vec<(RelationKind, String)> =
        index.requests().into_iter().map(|r| (r.predicate, r.subjects[0].to_string())).collect();
    assert_eq!(
        asked,
        vec![
            (RelationKind::BaseOf, "c:Open".to_string()),
            (RelationKind::OverriddenBy, "m:Open::draw#void ()".to_string()),
        ]
    );
}

#[test]
fn derived_results_are_capped_by_the_limit() {
    let mut fx = Fixture::new();
    fx.record(None, "Shape", 0, 7);
    let tree = fx.finish();

    let index = RecordingIndex::new(10);
    let options = LensOptions {
        limit: 3,
        hierarchy: true,
    };
    let lenses = lenses(&tree, Some(&index), options);

    assert_eq!(render(&lenses), "0:7 <marker>\n0:7 3 derived\n");
    assert_eq!(lenses[1].command().unwrap().argument.locations.len(), 3);
    assert_eq!(index.requests()[0].limit, 3);
}

#[test]
fn zero_limit_is_unbounded() {
    let mut fx = Fixture::new();
    fx.record(None, "Shape", 0, 7);
    let tree = fx.finish();

    let index = RecordingIndex::new(10);
    let lenses = lenses(&tree, Some(&index), LensOptions::default());
    assert_eq!(lenses[1].command().unwrap().title, "10 derived");
}

#[test]
fn disabling_hierarchy_leaves_only_markers() {
    let tree = base_derived_tree();
    let index = RecordingIndex::new(4);
    let options = LensOptions {
        limit: 0,
        hierarchy: false,
    };
    let lenses = lenses(&tree, Some(&index), options);

    assert_eq!(lenses.len(), 4);
    assert!(lenses.iter().all(|lens| !lens.is_resolved()));
    assert!(index.requests().is_empty());
}

#[test]
fn method_specializations_carry_hierarchy_too() {
    let mut fx = Fixture::new();
    let record = fx.record(None, "Shape", 0, 7);
    let loc = fx.at(1, 17, 4);
    fx.add(
        Some(record),
        DeclKind::FunctionSpecialization {
            status: TemplateStatus::ExplicitSpecialization,
            method: Some(MethodData {
                is_virtual: true,
                overridden: Vec::new(),
            }),
        },
        "draw",
        loc,
    );
    let tree = fx.finish();

    let index = RecordingIndex::new(2);
    let rendered = render(&lenses(&tree, Some(&index), LensOptions::default()));
    assert_eq!(rendered, "0:7 <marker>\n0:7 2 derived\n1:17 <marker>\n1:17 2 derived\n");
}
