//! Two-way interning of strings as dense integer IDs.

use std::{
    borrow::Cow,
    collections::HashMap,
    fmt::{Debug, Display, Formatter},
};

/// A dense integer ID interning a string in a [`SymbolTable`].
///
/// ID 0 is reserved as [`Symbol::NONE`] ("no value / empty code"); every interned string gets an
/// ID of 1 or above.  Once assigned, an ID is never reused or changed, so `Symbol`s can be stored
/// and compared freely for the lifetime of the table that produced them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    /// The reserved "no value" ID.
    pub const NONE: Symbol = Symbol(0);

    /// The raw integer value of this ID.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Does this `Symbol` hold a real ID (i.e. is it not [`Symbol::NONE`])?
    #[inline]
    pub fn is_some(self) -> bool {
        self.0 != 0
    }

    pub(crate) fn from_raw(id: u32) -> Self {
        Symbol(id)
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A two-way `String` <-> [`Symbol`] mapping.
///
/// IDs are handed out in interning order, starting from 1.  Cloning a `SymbolTable` is the
/// intended way to hand a private copy to each mining worker: the clones may diverge in the IDs
/// they assign to *new* strings, which is fine as long as no ID crosses a worker boundary.  All
/// shared IDs (schema terms) must be interned before cloning, e.g. via [`Self::load_terms`].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    ids: HashMap<String, Symbol>,
    // **Invariant**: `strings[i]` is the string interned as `Symbol(i + 1)`
    strings: Vec<String>,
}

impl SymbolTable {
    /// Creates a `SymbolTable` containing no strings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the [`Symbol`] for `s`, interning it if it hasn't been seen before.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.ids.get(s) {
            return sym;
        }
        self.strings.push(s.to_owned());
        let sym = Symbol(self.strings.len() as u32);
        self.ids.insert(s.to_owned(), sym);
        sym
    }

    /// Returns the string interned as `sym`, or the decimal form of the ID if `sym` was never
    /// assigned by this table.
    pub fn resolve(&self, sym: Symbol) -> Cow<'_, str> {
        match sym.0 {
            0 => Cow::Owned(0.to_string()),
            id => match self.strings.get(id as usize - 1) {
                Some(s) => Cow::Borrowed(s.as_str()),
                None => Cow::Owned(id.to_string()),
            },
        }
    }

    /// Returns the [`Symbol`] for `s` without interning it.
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        self.ids.get(s).copied()
    }

    /// Bulk-intern a set of known terms up front, freezing their IDs before the table is cloned
    /// into workers.
    pub fn load_terms<'s>(&mut self, terms: impl IntoIterator<Item = &'s str>) {
        for term in terms {
            self.intern(term);
        }
    }

    /// The number of strings interned so far.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn intern_resolve_roundtrip(strings: Vec<String>) -> bool {
        let mut table = SymbolTable::new();
        strings.iter().all(|s| {
            let sym = table.intern(s);
            table.resolve(sym) == s.as_str()
        })
    }

    #[quickcheck]
    fn interning_is_idempotent(s: String) -> bool {
        let mut table = SymbolTable::new();
        table.intern(&s) == table.intern(&s)
    }

    #[test]
    fn ids_are_dense() {
        let mut table = SymbolTable::new();
        let a = table.intern("a");
        let b = table.intern("b");
        let a2 = table.intern("a");
        let c = table.intern("c");
        assert_eq!(a.as_u32(), 1);
        assert_eq!(b.as_u32(), 2);
        assert_eq!(a2, a);
        assert_eq!(c.as_u32(), 3);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn resolve_falls_back_to_decimal() {
        let table = SymbolTable::new();
        assert_eq!(table.resolve(Symbol::from_raw(17)), "17");
        assert_eq!(table.resolve(Symbol::NONE), "0");
    }

    #[test]
    fn load_terms_freezes_ids() {
        let mut table = SymbolTable::new();
        table.load_terms(["User", "Movie"]);
        let mut clone = table.clone();
        clone.intern("only-in-clone");
        assert_eq!(table.lookup("User"), clone.lookup("User"));
        assert_eq!(table.lookup("Movie"), clone.lookup("Movie"));
        assert_eq!(table.lookup("only-in-clone"), None);
    }
}
