//! Per-function frame state and process-wide symbol tables (component C6)
//!
//! A [`Frame`] tracks one function's local variables as monotonically
//! increasing, 8-byte-aligned stack offsets below `%rbp` (spec §3
//! invariant 2) and rounds the total frame size up to 16 bytes (spec
//! §3 invariant 3). [`ConstantsTable`] and [`LabelCounter`] are
//! process-wide (one instance per compilation) but live as fields on
//! [`crate::codegen::CodeGen`] rather than process-wide statics, per
//! spec §9's "Global label counter" redesign note — this keeps
//! compilation deterministic and reentrant.

use crate::ast::TypeAnnotation;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: TypeAnnotation,
    /// Positive byte offset below `%rbp`.
    pub offset: usize,
    /// Recorded length of a string variable's contents at the point it
    /// was last assigned, used by `%s`/`%q` lowering when no length is
    /// otherwise known (spec §4.3 "printf lowering", §9 "string-length
    /// shadow table" — kept on the variable record itself rather than
    /// a parallel map, per the redesign note).
    pub known_string_len: Option<usize>,
}

/// One function's local-variable stack frame.
#[derive(Debug, Default)]
pub struct Frame {
    vars: Vec<Variable>,
    scopes: Vec<usize>,
    next_offset: usize,
}

impl Frame {
    pub fn new() -> Self {
        Frame::default()
    }

    /// Enter a lexical scope (block); variables declared within it are
    /// removed from name resolution on `pop_scope`, but their stack
    /// slots are never reused — offsets stay monotonic for the whole
    /// function (spec §3 invariant 2).
    pub fn push_scope(&mut self) {
        self.scopes.push(self.vars.len());
    }

    pub fn pop_scope(&mut self) {
        if let Some(mark) = self.scopes.pop() {
            self.vars.truncate(mark);
        }
    }

    /// Allocate a new local variable, returning its stack offset.
    pub fn declare(&mut self, name: &str, ty: TypeAnnotation) -> usize {
        let size = crate::types::primitive_size(&ty).unwrap_or(8).max(1);
        let aligned = size.div_ceil(8) * 8;
        self.next_offset += aligned;
        let offset = self.next_offset;
        self.vars.push(Variable { name: name.to_string(), ty, offset, known_string_len: None });
        offset
    }

    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.vars.iter().rev().find(|v| v.name == name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.vars.iter_mut().rev().find(|v| v.name == name)
    }

    /// Total bytes to subtract from `%rsp` in the prologue, rounded up
    /// to a multiple of 16 (spec §3 invariant 3).
    pub fn frame_size(&self) -> usize {
        self.next_offset.div_ceil(16) * 16
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub ty: TypeAnnotation,
    pub data_label: String,
}

/// Process-wide table of `const` declarations, emitted into the data
/// section and referenced via RIP-relative addressing (spec §3
/// "Constant").
#[derive(Debug, Default)]
pub struct ConstantsTable {
    entries: HashMap<String, Constant>,
}

impl ConstantsTable {
    pub fn new() -> Self {
        ConstantsTable::default()
    }

    pub fn define(&mut self, name: &str, ty: TypeAnnotation, data_label: String) {
        self.entries.insert(name.to_string(), Constant { name: name.to_string(), ty, data_label });
    }

    pub fn get(&self, name: &str) -> Option<&Constant> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Monotonic label generator. Every label emitted in the output is
/// unique across the whole compilation (spec §3 invariant 5).
#[derive(Debug, Default)]
pub struct LabelCounter {
    local: usize,
    strings: usize,
    consts: usize,
}

impl LabelCounter {
    pub fn new() -> Self {
        LabelCounter::default()
    }

    pub fn fresh_local(&mut self, purpose: &str) -> String {
        let n = self.local;
        self.local += 1;
        format!(".L{}_{}", purpose, n)
    }

    pub fn fresh_string(&mut self) -> String {
        let n = self.strings;
        self.strings += 1;
        format!(".str{}", n)
    }

    pub fn fresh_const(&mut self) -> String {
        let n = self.consts;
        self.consts += 1;
        format!(".const_{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_monotonic_and_8_aligned() {
        let mut frame = Frame::new();
        let a = frame.declare("a", TypeAnnotation::Bool);
        let b = frame.declare("b", TypeAnnotation::Int);
        let c = frame.declare("c", TypeAnnotation::Int);
        assert!(a % 8 == 0 && b % 8 == 0 && c % 8 == 0);
        assert!(a < b && b < c);
    }

    #[test]
    fn frame_size_is_16_aligned_and_covers_last_var() {
        let mut frame = Frame::new();
        frame.declare("a", TypeAnnotation::Int);
        let last = frame.declare("b", TypeAnnotation::Int);
        assert_eq!(frame.frame_size() % 16, 0);
        assert!(frame.frame_size() >= last);
    }

    #[test]
    fn scopes_hide_but_do_not_reuse_offsets() {
        let mut frame = Frame::new();
        frame.declare("a", TypeAnnotation::Int);
        frame.push_scope();
        let b = frame.declare("b", TypeAnnotation::Int);
        frame.pop_scope();
        assert!(frame.lookup("b").is_none());
        let c = frame.declare("c", TypeAnnotation::Int);
        assert!(c > b, "offsets never go backwards even after a scope pops");
    }

    #[test]
    fn labels_are_unique() {
        let mut labels = LabelCounter::new();
        let l1 = labels.fresh_local("if");
        let l2 = labels.fresh_local("if");
        assert_ne!(l1, l2);
    }
}
