use std::path::Path;

use super::*;

fn settings(
    include_paths: &[&str],
    extra_flags: &[&str],
) -> CompilerSettings {
    CompilerSettings {
        include_paths: include_paths.iter().map(|p| p.to_string()).collect(),
        extra_flags: extra_flags.iter().map(|f| f.to_string()).collect(),
        ..CompilerSettings::default()
    }
}

#[test]
fn args_put_the_source_file_last() {
    let args = ast_dump_args(
        &settings(&["/opt/include", "/usr/local/include", "/opt/include"], &["-std=c++20"]),
        Path::new("/tmp/decl-lens-1/unit-1.cpp"),
        Path::new("/work/src/main.cpp"),
    );

    assert_eq!(args, vec![
        "-Xclang",
        "-ast-dump=json",
        "-fsyntax-only",
        "-fno-color-diagnostics",
        "-iquote",
        "/work/src",
        "-I",
        "/opt/include",
        "-I",
        "/usr/local/include",
        "-std=c++20",
        "/tmp/decl-lens-1/unit-1.cpp",
    ]);
}

#[test]
fn args_skip_iquote_for_bare_file_names() {
    let args = ast_dump_args(&settings(&[], &[]), Path::new("unit-2.cpp"), Path::new("main.cpp"));

    assert!(!args.iter().any(|arg| arg == "-iquote"));
    assert_eq!(args.last().map(String::as_str), Some("unit-2.cpp"));
}

#[tokio::test]
async fn missing_compiler_is_reported_by_name() {
    let settings = CompilerSettings {
        command: "decl-lens-no-such-compiler".to_string(),
        ..CompilerSettings::default()
    };
    let result = run_ast_dump(&settings, "struct A {};\n", Path::new("/work/src/main.cpp")).await;

    match result {
        Err(AstDumpError::CommandNotFound(command)) => assert_eq!(command, "decl-lens-no-such-compiler"),
        other => panic!("expected CommandNotFound, got {other:?}"),
    }
}

#[test]
fn errors_describe_the_failure() {
    assert_eq!(AstDumpError::CommandNotFound("clang++".into()).to_string(), "compiler `clang++` not found");
    let launch = AstDumpError::LaunchFailed {
        command: "clang++".into(),
        reason: "permission denied".into(),
    };
    assert_eq!(launch.to_string(), "failed to run `clang++`: permission denied");
    assert_eq!(AstDumpError::NoUsableJson.to_string(), "compiler produced no usable AST");
}
