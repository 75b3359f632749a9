//! Per-user storage of instance triples, indexed by property name and by start class.

use std::collections::BTreeMap;

use crate::{
    symbol::{Symbol, SymbolTable},
    triple::{Triple, TripleRow},
};

/// The set of triples belonging to one user, owned for the duration of that user's mining run.
///
/// Triples are keyed by their interned index symbol and additionally indexed by property-name
/// symbol.  The property index keeps *every* stored triple, even ones the miner later drops from
/// its working set: path instantiation walks the unfiltered index.
///
/// Ordered maps are used throughout so that every iteration the miner performs over this store is
/// deterministic (ascending symbol ID).
#[derive(Debug, Clone, Default)]
pub struct TripleStore {
    triples: BTreeMap<Symbol, Triple>,
    by_prop: BTreeMap<Symbol, Vec<Symbol>>,
    start_instances: Vec<Symbol>,
}

impl TripleStore {
    /// Interns and stores a user's triple rows, collecting the individuals of `start_class` in
    /// first-seen order.
    pub fn from_rows<'r>(
        rows: impl IntoIterator<Item = &'r TripleRow>,
        start_class: Symbol,
        symbols: &mut SymbolTable,
    ) -> Self {
        let mut store = Self::default();
        for row in rows {
            // Intern in field order so that two runs over the same rows assign identical IDs
            let idx = symbols.intern(&row.idx);
            let subj_cl = symbols.intern(&row.subj_class);
            let subj_inst = symbols.intern(&row.subj_instance);
            let prop = symbols.intern(&row.property);
            let obj_cl = symbols.intern(&row.obj_class);
            let obj_inst = symbols.intern(&row.obj_instance);
            let triple = Triple::new(idx, subj_cl, subj_inst, prop, obj_cl, obj_inst);

            // Object side before subject side; this order fixes the start-instance collection
            if obj_cl == start_class && !store.start_instances.contains(&obj_inst) {
                store.start_instances.push(obj_inst);
            }
            if subj_cl == start_class && !store.start_instances.contains(&subj_inst) {
                store.start_instances.push(subj_inst);
            }

            store.by_prop.entry(prop).or_default().push(idx);
            store.triples.insert(idx, triple);
        }
        store
    }

    pub fn get(&self, tid: Symbol) -> Option<&Triple> {
        self.triples.get(&tid)
    }

    /// An [`Iterator`] over all stored triples, ascending by triple ID.
    pub fn triples(&self) -> impl Iterator<Item = (Symbol, &Triple)> {
        self.triples.iter().map(|(&tid, t)| (tid, t))
    }

    /// The IDs of all triples whose property name interned as `prop`, in storage order.
    pub fn with_property(&self, prop: Symbol) -> &[Symbol] {
        self.by_prop.get(&prop).map_or(&[], Vec::as_slice)
    }

    /// Does any stored triple use this property name?
    pub fn has_property(&self, prop: Symbol) -> bool {
        self.by_prop.contains_key(&prop)
    }

    /// The individuals of the start class, in first-seen order.
    pub fn start_instances(&self) -> &[Symbol] {
        &self.start_instances
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<TripleRow> {
        vec![
            TripleRow::new("0", "User", "u1", "watches", "Movie", "m1"),
            TripleRow::new("1", "Movie", "m1", "hasGenre", "Genre", "g1"),
            TripleRow::new("2", "User", "u1", "watches", "Movie", "m2"),
        ]
    }

    #[test]
    fn indexes_by_property_name() {
        let mut symbols = SymbolTable::new();
        let user = symbols.intern("User");
        let store = TripleStore::from_rows(&rows(), user, &mut symbols);

        let watches = symbols.lookup("watches").unwrap();
        let has_genre = symbols.lookup("hasGenre").unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.with_property(watches).len(), 2);
        assert_eq!(store.with_property(has_genre).len(), 1);
        assert!(!store.has_property(symbols.intern("unknown")));
    }

    #[test]
    fn collects_start_instances_once() {
        let mut symbols = SymbolTable::new();
        let user = symbols.intern("User");
        let store = TripleStore::from_rows(&rows(), user, &mut symbols);
        assert_eq!(store.start_instances(), &[symbols.intern("u1")]);
    }
}
