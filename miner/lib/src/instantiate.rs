//! Instantiation of schema paths as concrete triple sequences, and the transactions built from
//! them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use kgraph::{Symbol, TripleStore};

use crate::{paths::SchemaPath, query::Query, Result};

/// A queue entry while walking one schema path: the class and instance reached, plus the triple
/// IDs crossed so far.
type WalkFront = (Symbol, Symbol, Vec<Symbol>);

/// Produces every concrete triple-ID sequence realising any of `paths` from `start_instance`.
///
/// Each path is walked level by level: the first property seeds the queue with every triple whose
/// start-class instance matches `start_instance`; each further property drains the current level
/// and extends the entries whose reached instance matches.  A property with no triples in the
/// store kills the whole path.
pub(crate) fn triple_paths(
    query: &Query,
    store: &TripleStore,
    paths: &[SchemaPath],
    start_instance: Symbol,
) -> Result<Vec<Vec<Symbol>>> {
    let start_class = query.start_class;
    let mut out = Vec::new();

    for path in paths {
        let Some((&first, rest)) = path.split_first() else {
            continue;
        };

        let first_prop = query.schema[first];
        let first_tids = store.with_property(first_prop.name);
        if first_tids.is_empty() {
            continue;
        }

        let mut queue: VecDeque<WalkFront> = VecDeque::new();
        for &tid in first_tids {
            let triple = store.get(tid).expect("property index lists stored triples");
            let other_class = if first_prop.dom == start_class {
                first_prop.ran
            } else {
                first_prop.dom
            };
            if triple.instance_of(start_class)? == start_instance {
                queue.push_back((other_class, triple.instance_of(other_class)?, vec![tid]));
            }
        }

        for &pid in rest {
            let prop = query.schema[pid];
            let tids = store.with_property(prop.name);
            if tids.is_empty() {
                queue.clear();
                break;
            }
            let level: Vec<WalkFront> = queue.drain(..).collect();
            for (class, instance, acc) in level {
                for &tid in tids {
                    let triple = store.get(tid).expect("property index lists stored triples");
                    let next_class = if prop.dom == class { prop.ran } else { prop.dom };
                    if triple.instance_of(class)? == instance {
                        let mut next_acc = acc.clone();
                        next_acc.push(tid);
                        queue.push_back((next_class, triple.instance_of(next_class)?, next_acc));
                    }
                }
            }
        }

        out.extend(queue.into_iter().map(|(_, _, acc)| acc));
    }

    Ok(out)
}

/// The transaction structure of one user's triple set.
#[derive(Debug, Clone, Default)]
pub(crate) struct Transactions {
    /// Triple ID -> the start instances whose transaction contains it.
    pub it_trs: BTreeMap<Symbol, BTreeSet<Symbol>>,
    /// Triple ID -> one witnessing transaction: the numerically smallest start instance.
    pub itid_tr: BTreeMap<Symbol, Symbol>,
}

impl Transactions {
    /// Instantiates `paths` from every start instance in the store and inverts the result.
    /// Triples reachable from no start instance simply don't appear.
    pub fn collect(query: &Query, store: &TripleStore, paths: &[SchemaPath]) -> Result<Self> {
        let mut it_trs: BTreeMap<Symbol, BTreeSet<Symbol>> = BTreeMap::new();
        for &start_instance in store.start_instances() {
            let realised = triple_paths(query, store, paths, start_instance)?;
            let transaction: BTreeSet<Symbol> = realised.into_iter().flatten().collect();
            for tid in transaction {
                it_trs.entry(tid).or_default().insert(start_instance);
            }
        }

        let itid_tr = it_trs
            .iter()
            .filter_map(|(&tid, insts)| insts.iter().next().map(|&inst| (tid, inst)))
            .collect();

        Ok(Self { it_trs, itid_tr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Parameters;
    use kgraph::{Schema, SymbolTable, TripleRow};

    fn setup(
        schema_src: &str,
        rows: &[TripleRow],
    ) -> (Query, TripleStore, SymbolTable) {
        let mut symbols = SymbolTable::new();
        let schema = Schema::parse(schema_src, &mut symbols).unwrap();
        let params = Parameters {
            start_class: "User".to_owned(),
            end_classes: vec!["Genre".to_owned()],
            option_classes: vec!["Movie".to_owned()],
            max_depth: 4,
        };
        let query = Query::new(schema, &params, &mut symbols);
        let store = TripleStore::from_rows(rows, query.start_class(), &mut symbols);
        (query, store, symbols)
    }

    fn scenario_rows() -> Vec<TripleRow> {
        vec![
            TripleRow::new("0", "User", "u1", "watches", "Movie", "m1"),
            TripleRow::new("1", "Movie", "m1", "hasGenre", "Genre", "g1"),
            TripleRow::new("2", "User", "u1", "watches", "Movie", "m2"),
            TripleRow::new("3", "Movie", "m2", "hasGenre", "Genre", "g1"),
        ]
    }

    #[test]
    fn realises_every_branch() {
        let (query, store, symbols) = setup(
            "1^User^watches^Movie\n2^Movie^hasGenre^Genre\n",
            &scenario_rows(),
        );
        let u1 = symbols.lookup("u1").unwrap();
        let paths = query.paths().to_vec();
        let realised = triple_paths(&query, &store, &paths, u1).unwrap();

        let t = |s: &str| symbols.lookup(s).unwrap();
        assert_eq!(realised, vec![vec![t("0"), t("1")], vec![t("2"), t("3")]]);
    }

    #[test]
    fn dead_property_kills_the_path() {
        // `hasGenre` has no triples, so the walk dies after the first level
        let rows = vec![TripleRow::new("0", "User", "u1", "watches", "Movie", "m1")];
        let (query, store, symbols) = setup(
            "1^User^watches^Movie\n2^Movie^hasGenre^Genre\n",
            &rows,
        );
        let u1 = symbols.lookup("u1").unwrap();
        let paths = query.paths().to_vec();
        assert_eq!(triple_paths(&query, &store, &paths, u1).unwrap(), Vec::<Vec<Symbol>>::new());
    }

    #[test]
    fn transactions_cover_exactly_the_reachable_triples() {
        let (query, store, symbols) = setup(
            "1^User^watches^Movie\n2^Movie^hasGenre^Genre\n",
            &scenario_rows(),
        );
        let paths = query.paths().to_vec();
        let transactions = Transactions::collect(&query, &store, &paths).unwrap();

        let u1 = symbols.lookup("u1").unwrap();
        assert_eq!(transactions.it_trs.len(), 4);
        for (tid, insts) in &transactions.it_trs {
            // Closure: every transaction member is a stored triple with a real witness
            assert!(store.get(*tid).is_some());
            assert_eq!(insts.iter().copied().collect::<Vec<_>>(), vec![u1]);
        }
        assert!(transactions.itid_tr.values().all(|&inst| inst == u1));
    }

    #[test]
    fn witness_is_the_smallest_start_instance() {
        let rows = vec![
            TripleRow::new("0", "User", "u2", "watches", "Movie", "m1"),
            TripleRow::new("1", "Movie", "m1", "hasGenre", "Genre", "g1"),
            TripleRow::new("2", "User", "u1", "watches", "Movie", "m1"),
        ];
        let (query, store, symbols) = setup(
            "1^User^watches^Movie\n2^Movie^hasGenre^Genre\n",
            &rows,
        );
        let paths = query.paths().to_vec();
        let transactions = Transactions::collect(&query, &store, &paths).unwrap();

        // Triple 1 is reachable from both users; u2 interned first, so it has the smaller ID
        let t1 = symbols.lookup("1").unwrap();
        let u2 = symbols.lookup("u2").unwrap();
        assert_eq!(transactions.it_trs[&t1].len(), 2);
        assert_eq!(transactions.itid_tr[&t1], u2);
    }
}
