//! The assembler's two label-tracking structures: a name-to-offset table
//! for definitions, and the ordered sequence of names referenced by
//! operands (see `SPEC_FULL.md` §3).

use std::collections::HashMap;

/// Maps a label name to the byte offset — relative to the start of the
/// code section — of the first instruction following its definition.
#[derive(Debug, Default)]
pub struct LabelTable {
    offsets: HashMap<String, u64>,
}

impl LabelTable {
    pub fn new() -> LabelTable {
        LabelTable::default()
    }

    /// Records a definition. Returns `false` without modifying the table
    /// if the name is already defined, so the caller can report a
    /// duplicate-label error at the right source location.
    pub fn define(&mut self, name: String, local_offset: u64) -> bool {
        if self.offsets.contains_key(&name) {
            return false;
        }
        self.offsets.insert(name, local_offset);
        true
    }

    pub fn local_offset(&self, name: &str) -> Option<u64> {
        self.offsets.get(name).copied()
    }
}

/// The ordered sequence of label names appearing as instruction operands.
/// A reference's position in this sequence is the id stored on its
/// `Operand::Label`; the packer resolves each entry independently against
/// `LabelTable` rather than mutating any shared offset in place (see
/// `DESIGN.md`'s note on the accumulation bug this avoids).
#[derive(Debug, Default)]
pub struct LabelRefs {
    names: Vec<String>,
}

impl LabelRefs {
    pub fn new() -> LabelRefs {
        LabelRefs::default()
    }

    pub fn push(&mut self, name: String) -> usize {
        let id = self.names.len();
        self.names.push(name);
        id
    }

    pub fn name(&self, id: usize) -> &str {
        &self.names[id]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duplicate_definition_is_rejected() {
        let mut labels = LabelTable::new();
        assert!(labels.define("A".to_owned(), 0));
        assert!(!labels.define("A".to_owned(), 10));
        assert_eq!(labels.local_offset("A"), Some(0));
    }

    #[test]
    fn references_keep_first_occurrence_order() {
        let mut refs = LabelRefs::new();
        let a = refs.push("A".to_owned());
        let b = refs.push("B".to_owned());
        let a_again = refs.push("A".to_owned());
        assert_eq!(refs.name(a), "A");
        assert_eq!(refs.name(b), "B");
        assert_eq!(refs.name(a_again), "A");
        assert_ne!(a, a_again, "each occurrence gets its own sequence id");
    }
}
