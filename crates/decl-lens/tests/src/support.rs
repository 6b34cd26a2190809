//! Hand-built declaration trees shared by the unit tests.

use std::path::Path;

use crate::{
    ast::{DeclId, DeclKind, DeclNode, DeclTree, DeclTreeBuilder, MethodData, NameLoc, RecordData},
    lens::Lens,
};

pub(crate) const MAIN: &str = "/decl-lens-test/main.cpp";
pub(crate) const HEADER: &str = "/decl-lens-test/shapes.h";

/// Builder wrapper that fabricates name locations from 0-based
/// line/column pairs, mirroring editor coordinates.
pub(crate) struct Fixture {
    pub(crate) builder: DeclTreeBuilder,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_main(MAIN)
    }

    pub(crate) fn with_main(main: &str) -> Self {
        Self {
            builder: DeclTreeBuilder::new(main),
        }
    }

    /// Name token at 0-based `line`/`character` in the main file.
    pub(crate) fn at(
        &self,
        line: u32,
        character: u32,
        len: u32,
    ) -> NameLoc {
        let file = self.builder.main_file();
        NameLoc::new(file, line * 1000 + character, line + 1, character + 1, len)
    }

    pub(crate) fn at_in(
        &mut self,
        path: &str,
        line: u32,
        character: u32,
        len: u32,
    ) -> NameLoc {
        let file = self.builder.file(path);
        NameLoc::new(file, line * 1000 + character, line + 1, character + 1, len)
    }

    pub(crate) fn add(
        &mut self,
        parent: Option<DeclId>,
        kind: DeclKind,
        name: &str,
        loc: NameLoc,
    ) -> DeclId {
        self.builder.add_decl(parent, DeclNode::new(kind).named(name).at(loc))
    }

    pub(crate) fn record(
        &mut self,
        parent: Option<DeclId>,
        name: &str,
        line: u32,
        character: u32,
    ) -> DeclId {
        let loc = self.at(line, character, name.len() as u32);
        self.add(parent, DeclKind::Record(RecordData::default()), name, loc)
    }

    pub(crate) fn method(
        &mut self,
        parent: DeclId,
        name: &str,
        line: u32,
        character: u32,
        is_virtual: bool,
    ) -> DeclId {
        let loc = self.at(line, character, name.len() as u32);
        let kind = DeclKind::Method(MethodData {
            is_virtual,
            overridden: Vec::new(),
        });
        self.builder.add_decl(Some(parent), DeclNode::new(kind).named(name).at(loc).with_type("void ()"))
    }

    pub(crate) fn function(
        &mut self,
        parent: Option<DeclId>,
        name: &str,
        line: u32,
        character: u32,
    ) -> DeclId {
        let loc = self.at(line, character, name.len() as u32);
        self.builder.add_decl(parent, DeclNode::new(DeclKind::Function).named(name).at(loc).with_type("void ()"))
    }

    pub(crate) fn finish(self) -> DeclTree {
        self.builder.finish()
    }
}

/// `struct Base { virtual void draw(); };`
/// `struct Derived : Base { void draw() override; };`
pub(crate) fn base_derived_tree() -> DeclTree {
    let mut fx = Fixture::new();
    let base = fx.record(None, "Base", 0, 7);
    let base_draw = fx.method(base, "draw", 1, 15, true);
    let derived = fx.record(None, "Derived", 3, 7);
    let derived_draw = fx.method(derived, "draw", 4, 7, true);
    fx.builder.add_base(derived, base);
    fx.builder.add_overridden(derived_draw, base_draw);
    fx.finish()
}

/// One line per lens: `line:col title`, `<marker>` for unresolved lenses.
pub(crate) fn render(lenses: &[Lens]) -> String {
    let mut out = String::new();
    for lens in lenses {
        let start = lens.range().start;
        let title = lens.command().map_or("<marker>", |command| command.title.as_str());
        out.push_str(&format!("{}:{} {title}\n", start.line, start.character));
    }
    out
}

pub(crate) fn main_path() -> &'static Path {
    Path::new(MAIN)
}
