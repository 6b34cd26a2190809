use tower_lsp::lsp_types::Range;

use super::*;

fn test_doc(text: &str) -> Document {
    Document::new(Url::parse("file:///work/main.cpp").unwrap(), text.to_string(), 1)
}

#[test]
fn line_offsets_empty() {
    let doc = test_doc("");
    assert_eq!(doc.line_count(), 1);
    assert_eq!(doc.line_text(0), Some(""));
}

#[test]
fn line_offsets_basic() {
    let doc = test_doc("struct A {};\r\nint b;\n");
    assert_eq!(doc.line_count(), 3);
    assert_eq!(doc.line_text(0), Some("struct A {};"));
    assert_eq!(doc.line_text(1), Some("int b;"));
    assert_eq!(doc.line_text(2), Some(""));
    assert_eq!(doc.line_text(3), None);
}

#[test]
fn offset_roundtrip() {
    let doc = test_doc("struct A {};\nint b;\n");
    let pos = Position {
        line: 1,
        character: 4,
    };
    let off = doc.offset_of(pos).unwrap();
    assert_eq!(off, 17);
    assert_eq!(doc.position_of(off), pos);
}

#[test]
fn position_of_snaps_to_char_boundary() {
    // `é` is two bytes; offset 5 falls inside it.
    let doc = test_doc("int é;");
    assert_eq!(doc.position_of(5), Position::new(0, 4));
    assert_eq!(doc.position_of(6), Position::new(0, 5));
    assert_eq!(doc.position_of(100), Position::new(0, 6));
}

#[test]
fn byte_columns_convert_to_utf16() {
    // ü and ß are 2 bytes and 1 unit, 𝑥 is 4 bytes and 2 units.
    let doc = test_doc("// ü\nstruct Grüße { int 𝑥; };\n");
    assert_eq!(doc.to_utf16(IdePosition::new(0, 3)), IdePosition::new(0, 3));
    assert_eq!(doc.to_utf16(IdePosition::new(0, 5)), IdePosition::new(0, 4));
    // `Grüße` starts at byte 7; the name token ends at byte 14.
    let range = IdeRange::new(IdePosition::new(1, 7), IdePosition::new(1, 14));
    assert_eq!(doc.to_utf16_range(range), IdeRange::new(IdePosition::new(1, 7), IdePosition::new(1, 12)));
    // `𝑥` at byte 21, ends at byte 25.
    assert_eq!(doc.to_utf16(IdePosition::new(1, 25)), IdePosition::new(1, 21));
}

#[test]
fn out_of_range_positions_are_left_alone() {
    let doc = test_doc("int a;\n");
    assert_eq!(doc.to_utf16(IdePosition::new(0, 40)), IdePosition::new(0, 40));
    assert_eq!(doc.to_utf16(IdePosition::new(9, 2)), IdePosition::new(9, 2));
    assert_eq!(doc.to_byte_column(IdePosition::new(9, 2)), IdePosition::new(9, 2));
}

#[test]
fn utf16_columns_convert_back_to_bytes() {
    let doc = test_doc("// ü\nstruct Grüße { int 𝑥; };\n");
    assert_eq!(doc.to_byte_column(IdePosition::new(1, 12)), IdePosition::new(1, 14));
    assert_eq!(doc.to_byte_column(IdePosition::new(1, 21)), IdePosition::new(1, 25));
    assert_eq!(doc.to_byte_column(IdePosition::new(0, 2)), IdePosition::new(0, 2));
}

#[test]
fn apply_incremental_change() {
    let mut doc = test_doc("struct A {};\nint b;\n");
    doc.apply_changes(
        vec![TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(1, 4), Position::new(1, 5))),
            range_length: None,
            text: "count".to_string(),
        }],
        2,
    );
    assert_eq!(doc.text, "struct A {};\nint count;\n");
    assert_eq!(doc.version, 2);
    assert_eq!(doc.line_text(1), Some("int count;"));
}

#[test]
fn apply_full_change() {
    let mut doc = test_doc("struct A {};");
    doc.apply_changes(
        vec![TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "struct B {};\nstruct C {};".to_string(),
        }],
        3,
    );
    assert_eq!(doc.text, "struct B {};\nstruct C {};");
    assert_eq!(doc.line_count(), 2);
    assert_eq!(doc.version, 3);
}

#[test]
fn set_content_rebuilds_lines() {
    let mut doc = test_doc("a");
    doc.set_content("a\nb\nc".to_string(), 5);
    assert_eq!(doc.line_count(), 3);
    assert_eq!(doc.line_text(2), Some("c"));
    assert_eq!(doc.version, 5);
}
