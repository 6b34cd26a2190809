use serde_json::json;

use super::*;

#[test]
fn defaults_enable_lenses_and_indexing() {
    let settings = ServerSettings::from_lsp_payload(None);
    assert!(settings.lens.enable);
    assert_eq!(settings.lens.limit, 0);
    assert!(settings.lens.hierarchy);
    assert_eq!(settings.compiler.command, DEFAULT_COMPILER_COMMAND);
    assert!(settings.indexing.enable);
    assert_eq!(settings.indexing.max_files, 2000);
    assert_eq!(settings.logging.level, LogLevel::Info);
}

#[test]
fn parses_namespaced_payload() {
    let payload = json!({
        "decl-lens": {
            "lens": {
                "enable": false,
                "limit": 50,
                "hierarchy": false
            },
            "compiler": {
                "command": "clang++-18",
                "includePaths": ["/opt/include", " "],
                "extraFlags": ["-std=c++20", " -DNDEBUG "]
            },
            "indexing": {
                "maxFiles": 500,
                "excludePaths": ["third_party", " third_party ", "/tmp/generated"]
            },
            "logging": {
                "level": "debug"
            }
        }
    });

    let settings = ServerSettings::from_lsp_payload(Some(&payload));
    assert!(!settings.lens.enable);
    assert_eq!(settings.lens.limit, 50);
    assert!(!settings.lens.hierarchy);
    assert_eq!(settings.compiler.command, "clang++-18");
    assert_eq!(settings.compiler.include_paths, vec!["/opt/include"]);
    assert_eq!(settings.compiler.extra_flags, vec!["-std=c++20", "-DNDEBUG"]);
    assert_eq!(settings.indexing.max_files, 500);
    assert_eq!(settings.indexing.exclude_paths, vec!["third_party".to_string(), "/tmp/generated".to_string()]);
    assert_eq!(settings.logging.level, LogLevel::Debug);
}

#[test]
fn parses_direct_payload() {
    let payload = json!({
        "lens": { "limit": 7 },
        "indexing": { "enable": false }
    });

    let settings = ServerSettings::from_lsp_payload(Some(&payload));
    assert_eq!(settings.lens.limit, 7);
    assert!(settings.lens.enable);
    assert!(!settings.indexing.enable);
}

#[test]
fn clamps_numeric_values() {
    let payload = json!({
        "lens": { "limit": 1_000_000 },
        "indexing": { "maxFiles": 0 }
    });

    let settings = ServerSettings::from_lsp_payload(Some(&payload));
    assert_eq!(settings.lens.limit, MAX_LENS_LIMIT);
    assert_eq!(settings.indexing.max_files, MIN_INDEXED_FILES);

    let payload = json!({ "indexing": { "maxFiles": 10_000_000 } });
    let settings = ServerSettings::from_lsp_payload(Some(&payload));
    assert_eq!(settings.indexing.max_files, MAX_INDEXED_FILES);
}

#[test]
fn blank_compiler_command_falls_back_to_default() {
    let payload = json!({ "compiler": { "command": "   " } });

    let settings = ServerSettings::from_lsp_payload(Some(&payload));
    assert_eq!(settings.compiler.command, DEFAULT_COMPILER_COMMAND);
}

#[test]
fn ignores_unknown_keys() {
    let payload = json!({
        "somethingElse": true,
        "lens": { "limit": 3, "style": "inline" },
        "decl-lens": { "experimental": { "x": 1 } }
    });

    let settings = ServerSettings::from_lsp_payload(Some(&payload));
    assert_eq!(settings.lens.limit, 3);
}

#[test]
fn invalid_values_leave_settings_unchanged() {
    let base = ServerSettings::from_lsp_payload(Some(&json!({ "lens": { "limit": 12 } })));
    let payload = json!({ "lens": { "limit": "lots" } });

    let merged = base.merged_with_payload(&payload);
    assert_eq!(merged, base);
}

#[test]
fn merging_keeps_unmentioned_values() {
    let base = ServerSettings::from_lsp_payload(Some(&json!({ "compiler": { "extraFlags": ["-std=c++17"] } })));

    let merged = base.merged_with_payload(&json!({ "lens": { "hierarchy": false } }));
    assert_eq!(merged.compiler.extra_flags, vec!["-std=c++17"]);
    assert!(!merged.lens.hierarchy);
}

#[test]
fn lens_settings_map_to_options() {
    let settings = LensSettings {
        enable: true,
        limit: 25,
        hierarchy: false,
    };
    let options = settings.options();
    assert_eq!(options.limit, 25);
    assert!(!options.hierarchy);
}

#[test]
fn log_levels_are_ordered() {
    assert!(LogLevel::Info.allows_info());
    assert!(LogLevel::Trace.allows_info());
    assert!(!LogLevel::Warn.allows_info());
}
