//! Compilation options.
//!
//! A plain, serializable options struct consumed by [`crate::pipeline`];
//! [`crate::pipeline::CompileResult`] carries the binary and compile-time
//! metadata produced from it.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// Compilation target. Only the Commodore 64 is implemented today; the
/// enum exists so a second target is additive rather than a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Target {
    /// Commodore 64 `.prg` with an optional BASIC autostart stub.
    #[default]
    C64,
}

/// Compilation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Compilation target.
    pub target: Target,
    /// ACME `!to` / `* =` origin address.
    pub origin: u16,
    /// Address the BASIC stub's `SYS` line jumps to. Only meaningful when
    /// `emit_basic_stub` is set.
    pub code_start: u16,
    /// Emit the 12-byte `10 SYS <code_start>` BASIC autostart stub.
    pub emit_basic_stub: bool,
    /// Zero-page addresses available for `@zp` globals.
    pub zero_page_range: Range<u8>,
    /// Base address for `@ram` globals.
    pub ram_globals_base: u16,
    /// Emit a VICE monitor label file alongside the assembly text.
    pub emit_vice_labels: bool,
    /// Spawn the external `acme` assembler to produce a `.prg`. When
    /// `false`, only the ACME source text is produced.
    pub invoke_acme: bool,
    /// Path (or bare name, resolved via `$PATH`) of the `acme` executable.
    pub acme_path: PathBuf,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            target: Target::C64,
            origin: 0x0801,
            code_start: 0x080D,
            emit_basic_stub: true,
            zero_page_range: 0x02..0xFA,
            ram_globals_base: 0xC000,
            emit_vice_labels: false,
            invoke_acme: true,
            acme_path: PathBuf::from("acme"),
        }
    }
}

impl CompileOptions {
    /// Options for tests and environments without the `acme` binary
    /// installed: everything else default, but the external process is
    /// never spawned.
    pub fn text_only() -> Self {
        Self {
            invoke_acme: false,
            ..Self::default()
        }
    }

    /// Number of zero-page bytes available to `@zp` globals.
    pub fn zero_page_capacity(&self) -> usize {
        (self.zero_page_range.end as usize).saturating_sub(self.zero_page_range.start as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_c64_conventions() {
        let opts = CompileOptions::default();
        assert_eq!(opts.origin, 0x0801);
        assert_eq!(opts.code_start, 0x080D);
        assert!(opts.emit_basic_stub);
    }

    #[test]
    fn round_trips_through_json() {
        let opts = CompileOptions::default();
        let json = serde_json::to_string(&opts).unwrap();
        let back: CompileOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(opts, back);
    }
}
