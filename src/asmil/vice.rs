//! VICE monitor label export: one `al C:$xxxx .name`
//! line per label, for loading into the VICE emulator's monitor with
//! `l <file>` so breakpoints and the disassembly view show source names
//! instead of raw addresses.

use super::module::AsmModule;

/// Renders every labelled address in `module` as a VICE label file.
/// Labels without a resolved address (shouldn't happen once the module is
/// finished building, but the field is `Option` for the in-progress state)
/// are skipped rather than emitting a bogus `$0000`.
pub fn export(module: &AsmModule) -> String {
    let mut names: Vec<&String> = module.labels.keys().collect();
    names.sort();
    let mut out = String::new();
    for name in names {
        if let Some(address) = module.labels[name].address {
            out.push_str(&format!("al C:{address:04X} .{name}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asmil::{AsmBuilder, LabelType};
    use crate::config::Target;

    #[test]
    fn exports_one_line_per_resolved_label() {
        let mut b = AsmBuilder::new("demo", 0x0801, Target::C64);
        b.label("_main", LabelType::Function, true);
        b.rts();
        let module = b.finish();
        let text = export(&module);
        assert_eq!(text.trim(), "al C:0801 ._main");
    }
}
