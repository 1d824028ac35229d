//! Spawns the external `acme` assembler to turn emitted ACME text into a
//! `.prg` binary.
//!
//! A synchronous subprocess call behind an availability check, wrapped so a
//! missing or failing external tool degrades to a warning rather than an
//! `Err`. Scratch files are scoped to one [`tempfile::TempDir`]
//! so they're removed whether `acme` succeeds, fails, or panics.

use std::process::Command;

use crate::config::CompileOptions;
use crate::error::Result;

/// Result of one assembly attempt.
#[derive(Debug, Clone)]
pub enum AssembleOutcome {
    /// `acme` ran successfully; the finished `.prg` bytes (load address
    /// little-endian, then the program image).
    Binary(Vec<u8>),
    /// `acme` was not available or exited non-zero; only the source text
    /// was produced. `warning` is a human-readable explanation.
    TextOnly { warning: String },
}

/// Writes `source` to a scratch file and invokes `acme` to assemble it.
///
/// Returns `Ok(AssembleOutcome::TextOnly { .. })`, never `Err`, when the
/// external tool is unavailable or fails — this is a warning, not a fatal
/// pipeline error. `Err` is reserved for I/O failures writing
/// the scratch files themselves, which indicate a broken environment
/// rather than a problem with the assembly.
pub fn assemble(source: &str, options: &CompileOptions) -> Result<AssembleOutcome> {
    let dir = tempfile::tempdir().map_err(|e| crate::error::Error::internal(format!("scratch directory I/O failed: {e}")))?;
    let input_path = dir.path().join("out.asm");
    let output_path = dir.path().join("out.prg");
    std::fs::write(&input_path, source).map_err(|e| crate::error::Error::internal(format!("scratch directory I/O failed: {e}")))?;

    let output = Command::new(&options.acme_path)
        .arg("-o")
        .arg(&output_path)
        .arg(&input_path)
        .output();

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            let warning = format!("could not spawn `{}`: {e}", options.acme_path.display());
            tracing::warn!("{warning}");
            return Ok(AssembleOutcome::TextOnly { warning });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let warning = format!("acme exited with {}: {stderr}", output.status);
        tracing::warn!("{warning}");
        return Ok(AssembleOutcome::TextOnly { warning });
    }

    match std::fs::read(&output_path) {
        Ok(bytes) => Ok(AssembleOutcome::Binary(bytes)),
        Err(e) => Ok(AssembleOutcome::TextOnly {
            warning: format!("acme reported success but `{}` could not be read: {e}", output_path.display()),
        }),
    }
    // `dir` drops here, cleaning up the scratch files regardless of outcome.
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_acme_binary_degrades_to_text_only_warning() {
        let mut options = CompileOptions::default();
        options.acme_path = PathBuf::from("definitely-not-a-real-acme-binary-xyz");
        let outcome = assemble("!to \"x.prg\", cbm\n* = $0801\n", &options).unwrap();
        match outcome {
            AssembleOutcome::TextOnly { warning } => assert!(warning.contains("spawn")),
            AssembleOutcome::Binary(_) => panic!("expected a text-only outcome"),
        }
    }
}
