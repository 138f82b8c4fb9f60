//! Build-time layout of the configuration port.
//!
//! The port lives in a small physical window. Every register is a plain byte
//! range of that window, described by a [`RegisterSpec`]. The table is
//! checked once with [`RegisterTable::new`] before any register is touched.

use std::collections::{BTreeMap, HashSet};

use crate::err::TableError;
use crate::regs::Endianness;

/// Physical base address of the configuration port.
pub const CONFPORT_BASE_ADDRESS: u64 = 0x8000_0000;
/// Size of the configuration port window in bytes.
pub const CONFPORT_SIZE_BYTES: usize = 48;
/// Byte order of the memory behind the port.
pub const TARGET_ENDIANNESS: Endianness = Endianness::Little;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub size_bytes: usize,
    pub offset: usize,
    pub read_only: bool,
}

impl RegisterSpec {
    pub const fn new(name: &'static str, size_bytes: usize, offset: usize, read_only: bool) -> Self {
        Self {
            name,
            size_bytes,
            offset,
            read_only,
        }
    }

    /// One past the last byte of the register, relative to the window.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.size_bytes)
    }
}

/// The registers of the configuration port, in index order.
pub static REGISTERS: [RegisterSpec; 5] = [
    RegisterSpec::new("pgd", 8, 0x00, false),
    RegisterSpec::new("va", 8, 0x08, false),
    RegisterSpec::new("pa", 8, 0x10, false),
    RegisterSpec::new("offset", 8, 0x28, false),
    RegisterSpec::new("active", 1, 0x18, false),
];

/// A register table that has been checked against a window size.
#[derive(Debug, Clone, Copy)]
pub struct RegisterTable<'a> {
    specs: &'a [RegisterSpec],
}

impl<'a> RegisterTable<'a> {
    pub fn new(specs: &'a [RegisterSpec], window_size: usize) -> Result<Self, TableError> {
        let mut names = HashSet::new();
        // Sorted by offset
        let mut ranges: BTreeMap<usize, &RegisterSpec> = BTreeMap::new();

        for spec in specs {
            if spec.size_bytes == 0 {
                return Err(TableError::ZeroSize { name: spec.name });
            }
            if !names.insert(spec.name) {
                return Err(TableError::DuplicateName { name: spec.name });
            }
            if spec.offset.checked_add(spec.size_bytes).is_none_or(|end| end > window_size) {
                return Err(TableError::OutOfWindow {
                    name: spec.name,
                    offset: spec.offset,
                    end: spec.end(),
                    window: window_size,
                });
            }
            if let Some(existing) = find_overlap(&ranges, spec) {
                return Err(TableError::overlap(
                    (existing.name, existing.offset, existing.end()),
                    (spec.name, spec.offset, spec.end()),
                ));
            }
            ranges.insert(spec.offset, spec);
        }

        log::debug!(
            "register table validated: {} registers in a {window_size}-byte window",
            specs.len()
        );
        Ok(Self { specs })
    }

    pub fn get(&self, index: usize) -> Option<&'a RegisterSpec> {
        self.specs.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'a, RegisterSpec> {
        self.specs.iter()
    }
}

/// Find a register already in `ranges` that shares a byte with `spec`, O(log n).
fn find_overlap<'s>(
    ranges: &BTreeMap<usize, &'s RegisterSpec>,
    spec: &RegisterSpec,
) -> Option<&'s RegisterSpec> {
    let new_end = spec.end();

    if let Some((_, next)) = ranges.range(spec.offset..).next() {
        if next.offset < new_end {
            return Some(*next);
        }
    }

    if let Some((_, prev)) = ranges.range(..spec.offset).next_back() {
        if prev.end() > spec.offset {
            return Some(*prev);
        }
    }

    None
}
