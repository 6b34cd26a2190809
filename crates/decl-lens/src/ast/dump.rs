use std::{
    collections::HashSet,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::CompilerSettings;

static NEXT_AST_DUMP_ID: AtomicU64 = AtomicU64::new(1);

/// Raw output of one compiler invocation.
#[derive(Debug, Clone)]
pub struct AstDump {
    pub json: String,
    /// Paths the buffer was compiled from; locations in these files belong
    /// to the original document.
    pub tmp_files: Vec<String>,
}

#[derive(Debug)]
pub enum AstDumpError {
    CommandNotFound(String),
    LaunchFailed {
        command: String,
        reason: String,
    },
    NoUsableJson,
}

impl std::fmt::Display for AstDumpError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::CommandNotFound(command) => write!(f, "compiler `{command}` not found"),
            Self::LaunchFailed {
                command,
                reason,
            } => write!(f, "failed to run `{command}`: {reason}"),
            Self::NoUsableJson => write!(f, "compiler produced no usable AST"),
        }
    }
}

impl std::error::Error for AstDumpError {}

fn compiler_command(
    program: &str,
    args: &[String],
) -> Command {
    let mut command = Command::new(program);
    command.kill_on_drop(true).args(args);
    command
}

/// Build the compiler argument list for dumping `src_file`, which stands in
/// for `original`.
pub(crate) fn ast_dump_args(
    settings: &CompilerSettings,
    src_file: &Path,
    original: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-Xclang".to_string(),
        "-ast-dump=json".to_string(),
        "-fsyntax-only".to_string(),
        "-fno-color-diagnostics".to_string(),
    ];

    // The buffer is compiled from the temp dir; quoted includes must still
    // resolve next to the original file.
    if let Some(parent) = original.parent().filter(|p| !p.as_os_str().is_empty()) {
        args.push("-iquote".to_string());
        args.push(parent.display().to_string());
    }

    let mut seen_includes = HashSet::with_capacity(settings.include_paths.len());
    for p in &settings.include_paths {
        if seen_includes.insert(p.as_str()) {
            args.push("-I".to_string());
            args.push(p.clone());
        }
    }
    args.extend(settings.extra_flags.iter().cloned());
    args.push(src_file.display().to_string());
    args
}

/// Run the configured compiler's JSON AST dump over `source`.
///
/// The buffer is written to a unique file under the system temp dir
/// (keeping `path`'s extension so the compiler picks the right language)
/// and removed afterwards. A non-zero exit status is not an error: Clang
/// still emits the AST of code that fails to type-check.
pub async fn run_ast_dump(
    settings: &CompilerSettings,
    source: &str,
    path: &Path,
) -> Result<AstDump, AstDumpError> {
    let tmp_dir = std::env::temp_dir().join(format!("decl-lens-{}", std::process::id()));
    tokio::fs::create_dir_all(&tmp_dir).await.map_err(|e| AstDumpError::LaunchFailed {
        command: settings.command.clone(),
        reason: format!("cannot create temp dir: {e}"),
    })?;

    let dump_id = NEXT_AST_DUMP_ID.fetch_add(1, Ordering::Relaxed);
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("cpp");
    let src_file = tmp_dir.join(format!("unit-{dump_id}.{extension}"));
    if let Err(e) = tokio::fs::write(&src_file, source).await {
        return Err(AstDumpError::LaunchFailed {
            command: settings.command.clone(),
            reason: format!("cannot write temp file: {e}"),
        });
    }

    let args = ast_dump_args(settings, &src_file, path);
    debug!("[ast-dump] {} {}", settings.command, args.join(" "));

    let output = compiler_command(&settings.command, &args).output().await;

    let mut tmp_files = vec![src_file.display().to_string()];
    if let Ok(canon) = std::fs::canonicalize(&src_file).map(|p| p.display().to_string())
        && !tmp_files.contains(&canon)
    {
        tmp_files.push(canon);
    }
    let _ = tokio::fs::remove_file(&src_file).await;

    let output = match output {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AstDumpError::CommandNotFound(settings.command.clone()));
        },
        Err(e) => {
            return Err(AstDumpError::LaunchFailed {
                command: settings.command.clone(),
                reason: e.to_string(),
            });
        },
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|line| line.contains("error:")) {
            debug!("[ast-dump] compiler error: {line}");
        }
        debug!("[ast-dump] exited with {} (partial AST may still be usable)", output.status);
    }

    let json = String::from_utf8(output.stdout).map_err(|_| AstDumpError::NoUsableJson)?;
    if !json.trim_start().starts_with('{') {
        warn!("[ast-dump] produced no usable JSON for {}", path.display());
        return Err(AstDumpError::NoUsableJson);
    }

    debug!("[ast-dump] produced {} bytes of JSON for {}", json.len(), path.display());
    Ok(AstDump {
        json,
        tmp_files,
    })
}

#[cfg(test)]
#[path = "../../tests/src/ast/dump_tests.rs"]
mod tests;
