use super::*;

#[test]
fn canonical_path_rejects_empty_and_relative_paths() {
    assert_eq!(canonical_path(""), None);
    assert_eq!(canonical_path("src/main.cpp"), None);
    assert_eq!(canonical_path("./main.cpp"), None);
}

#[test]
fn canonical_path_keeps_missing_absolute_paths() {
    assert_eq!(canonical_path("/decl-lens-missing/a.cpp"), Some(PathBuf::from("/decl-lens-missing/a.cpp")));
}

#[test]
fn canonical_path_resolves_existing_files() {
    let dir = std::env::temp_dir().join(format!("decl-lens-vfs-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("a.cpp");
    std::fs::write(&file, "int a;").unwrap();

    let dotted = dir.join(".").join("a.cpp");
    let expected = std::fs::canonicalize(&file).unwrap();
    assert_eq!(canonical_path(&dotted.display().to_string()), Some(expected));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn file_id_is_the_normalized_path() {
    let path = Path::new("/decl-lens-missing/b.cpp");
    assert_eq!(FileId::from_path(path).as_str(), "/decl-lens-missing/b.cpp");
    assert_eq!(FileId::from_path(path).to_string(), "/decl-lens-missing/b.cpp");
}
