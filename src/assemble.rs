//! External assembler invocation (spec §6 "Assembly output", §5
//! "Concurrency & resource model")
//!
//! Spawns the configured assembler/linker (`gcc` by default,
//! overridable via `CC`) the same way the teacher's driver spawns
//! `clang`: write the generated text to a uniquely-named temp file,
//! run the tool synchronously, capture stdout/stderr on failure into
//! a [`LotusError::Tool`], and best-effort delete the temp file
//! afterward.

use crate::diagnostics::LotusError;
use std::io::Write;
use std::path::Path;
use std::process::Command;

/// Assembles `asm` into a native executable at `output_path` using
/// `assembler -nostartfiles -no-pie -o <output> <temp.s>` (spec §6).
pub fn assemble(asm: &str, output_path: &Path, assembler: &str, verbose: bool) -> Result<(), LotusError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".s")
        .tempfile()
        .map_err(|e| LotusError::io(format!("failed to create temporary assembly file: {}", e)))?;
    tmp.write_all(asm.as_bytes())
        .map_err(|e| LotusError::io(format!("failed to write temporary assembly file: {}", e)))?;
    let tmp_path = tmp.into_temp_path();

    if verbose {
        eprintln!("assembling with: {} -nostartfiles -no-pie -o {} {}", assembler, output_path.display(), tmp_path.display());
    }

    let result = Command::new(assembler)
        .arg("-nostartfiles")
        .arg("-no-pie")
        .arg("-o")
        .arg(output_path)
        .arg(&tmp_path)
        .output()
        .map_err(|e| LotusError::tool(format!("failed to run '{}': {}", assembler, e), String::new()))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr).into_owned();
        return Err(LotusError::tool(
            format!("'{}' exited with status {:?}", assembler, result.status.code()),
            stderr,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_assembler_binary_is_a_tool_error() {
        let dir = std::env::temp_dir().join("lotus_assemble_test_missing_binary");
        let err = assemble("", &dir, "lotus-nonexistent-assembler-xyz", false).unwrap_err();
        assert!(matches!(err, LotusError::Tool { .. }));
    }
}
