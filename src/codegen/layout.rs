//! Static address assignment for globals and function-local virtual
//! registers.
//!
//! A single pre-pass assigns every value a fixed location before any
//! instruction is emitted, rather than interleaving allocation with
//! selection.

use crate::ast::StorageClass;
use crate::config::CompileOptions;
use crate::error::{Error, Result};
use crate::il::{IlModule, IlType};
use std::collections::HashMap;

/// Where one global lives and how it was placed.
#[derive(Debug, Clone, Copy)]
pub struct GlobalSlot {
    pub address: u16,
    pub size: u16,
}

/// Address assignment for every `@zp`/`@ram`/`@data`/plain global in one
/// module. `@map` globals carry no storage and are never registered here.
#[derive(Debug, Default)]
pub struct GlobalLayout {
    slots: HashMap<String, GlobalSlot>,
    pub zp_bytes_used: usize,
    pub ram_bytes_used: usize,
    /// First RAM address after every global, where the return-value slot
    /// and per-function frames are placed.
    pub ram_cursor: u16,
}

impl GlobalLayout {
    pub fn build(module: &IlModule, options: &CompileOptions) -> Result<Self> {
        let mut layout = GlobalLayout {
            ram_cursor: options.ram_globals_base,
            ..Default::default()
        };
        let mut zp_cursor = options.zero_page_range.start as u16;

        let mut names: Vec<&String> = module.globals.keys().collect();
        names.sort();

        for name in names {
            let global = &module.globals[name];
            if matches!(global.storage, StorageClass::Map) {
                continue;
            }
            let size = global.ty.size_bytes().max(1) as u16;
            match global.storage {
                StorageClass::Zp => {
                    if zp_cursor as usize + size as usize > options.zero_page_range.end as usize {
                        return Err(Error::StorageOverflow {
                            region: "zero page".to_string(),
                            requested: layout.zp_bytes_used + size as usize,
                            available: options.zero_page_capacity(),
                        });
                    }
                    layout.slots.insert(name.clone(), GlobalSlot { address: zp_cursor, size });
                    zp_cursor += size;
                    layout.zp_bytes_used += size as usize;
                }
                StorageClass::None | StorageClass::Ram | StorageClass::Data => {
                    layout.slots.insert(name.clone(), GlobalSlot { address: layout.ram_cursor, size });
                    layout.ram_cursor += size;
                    layout.ram_bytes_used += size as usize;
                }
                StorageClass::Map => unreachable!("filtered above"),
            }
        }

        Ok(layout)
    }

    pub fn slot(&self, name: &str) -> Option<GlobalSlot> {
        self.slots.get(name).copied()
    }

    /// Overrides a global's address after the fact. `@data` globals need
    /// real bytes in the finished image, so the orchestrator places them
    /// contiguously right after the program's code and corrects their
    /// address here rather than at the far-away `ram_globals_base` this
    /// pass otherwise assigns them.
    pub fn set_slot(&mut self, name: &str, address: u16, size: u16) {
        self.slots.insert(name.to_string(), GlobalSlot { address, size });
    }

    /// Names in registration (sorted) order, for deterministic emission.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

/// One function's virtual-register home addresses, plus its entry label.
#[derive(Debug, Clone)]
pub struct FunctionLayout {
    pub label: String,
    /// Home address (and width) of each parameter, by parameter index —
    /// this is the calling convention a `Call` site writes arguments into.
    pub param_homes: Vec<(u16, IlType)>,
    /// Home address (and width) of every virtual register in the function,
    /// keyed by `VReg::id`.
    pub homes: HashMap<u32, (u16, IlType)>,
    pub frame_size: u16,
}

/// Assigns every function a disjoint, statically-addressed frame.
///
/// SFA's non-recursion guarantee would in principle let two functions that
/// can never be mutually active share one frame (the call graph already
/// proves this); this implementation takes the simpler, always-correct
/// choice of giving every function its own frame, deferring frame-sharing
/// as a follow-on optimization.
pub fn build_function_layouts(module: &IlModule, start_address: u16) -> HashMap<String, FunctionLayout> {
    let mut layouts = HashMap::new();
    let mut cursor = start_address;

    let mut names: Vec<&String> = module.functions.keys().collect();
    names.sort();

    for name in names {
        let function = &module.functions[name];
        let mut homes = HashMap::new();
        for vreg in function.defined_registers() {
            if homes.contains_key(&vreg.id) {
                continue;
            }
            let size = vreg.ty.size_bytes().max(1) as u16;
            homes.insert(vreg.id, (cursor, vreg.ty));
            cursor += size;
        }
        // Parameters are bound to the function's first N vregs in
        // declaration order (see `ilgen::function::lower_body`), so their
        // homes are already in `homes`; params without a use inside the
        // body (dead but declared) still need a home reserved for them.
        let mut param_homes = Vec::with_capacity(function.param_types.len());
        for (i, ty) in function.param_types.iter().enumerate() {
            let entry = homes.entry(i as u32).or_insert_with(|| {
                let addr = cursor;
                cursor += ty.size_bytes().max(1) as u16;
                (addr, *ty)
            });
            param_homes.push(*entry);
        }

        let frame_start = homes.values().map(|(addr, _)| *addr).min().unwrap_or(cursor);
        let frame_size = cursor - frame_start.min(cursor);
        layouts.insert(
            name.clone(),
            FunctionLayout {
                label: format!("_{name}"),
                param_homes,
                homes,
                frame_size,
            },
        );
    }

    layouts
}
