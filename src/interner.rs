//! String interning for trace storage.
//!
//! Every string that lands in a table (track names, log tags, package names,
//! log messages) is deduplicated into a dense [`StringId`]. Ids are assigned
//! in first-seen order and stay valid for the lifetime of the storage.

use std::collections::HashMap;

/// Dense identifier for an interned string.
///
/// Id 0 is reserved for the empty string and doubles as the null id, matching
/// how absent tag/message fields are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    pub const NULL: StringId = StringId(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
pub struct StringInterner {
    strings: Vec<String>,
    index: HashMap<String, StringId>,
}

impl StringInterner {
    pub fn new() -> Self {
        let mut interner = StringInterner {
            strings: Vec::new(),
            index: HashMap::new(),
        };
        // Reserve id 0 for the empty string.
        interner.intern("");
        interner
    }

    /// Return the id for `s`, interning it if this is the first occurrence.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), id);
        id
    }

    /// Resolve an id back to its content.
    pub fn get(&self, id: StringId) -> &str {
        &self.strings[id.0 as usize]
    }

    /// Number of distinct strings interned, including the empty string.
    pub fn len(&self) -> usize {
        self.strings.len()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
