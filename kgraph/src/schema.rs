//! The ontology schema: a property table plus an undirected class graph.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use index_vec::IndexVec;
use itertools::Itertools;

use crate::symbol::{Symbol, SymbolTable};

index_vec::define_index_type! {
    /// The index of a [`Property`] within a [`Schema`].
    pub struct PropIdx = usize;
}

pub type PropVec<T> = IndexVec<PropIdx, T>;

/// A directed schema edge: domain class, property name, range class (all interned).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    pub dom: Symbol,
    pub name: Symbol,
    pub ran: Symbol,
}

/// The parsed ontology schema.
///
/// The class graph is undirected: every non-self-edge property appears in the adjacency lists of
/// both its endpoints.  Entries are appended as they are read, without deduplication; the path
/// enumerator's "no repeated property" rule is what keeps walks free of duplicates.  Self-edges
/// (`dom == ran`) are kept in the property table but excluded from the graph.
///
/// Built once per run and read-only during mining; workers share it by reference.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: PropVec<Property>,
    adjacency: BTreeMap<Symbol, Vec<(PropIdx, Symbol)>>,
    class_nos: BTreeMap<Symbol, usize>,
}

impl Schema {
    /// Parses a schema from `^`-separated text: one `idx^dom^prop^ran` record per line, trailing
    /// newlines permitted.  All four fields of every record are interned (the record index too,
    /// so its ID is frozen along with the rest of the schema terms).
    pub fn parse(src: &str, symbols: &mut SymbolTable) -> Result<Self, ParseError> {
        let mut schema = Self::default();
        for (line_no, line) in src.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields = line.split('^').collect_vec();
            let [idx, dom, name, ran] = match fields.as_slice() {
                [idx, dom, name, ran] => [*idx, *dom, *name, *ran],
                _ => {
                    return Err(ParseError::FieldCount {
                        line: line_no + 1,
                        count: fields.len(),
                    })
                }
            };

            symbols.intern(idx);
            let property = Property {
                dom: symbols.intern(dom),
                name: symbols.intern(name),
                ran: symbols.intern(ran),
            };
            let pid = schema.properties.push(property);

            schema.class_no_or_insert(property.dom);
            schema.class_no_or_insert(property.ran);

            if property.dom == property.ran {
                continue; // Self-edges stay out of the class graph
            }
            schema
                .adjacency
                .entry(property.dom)
                .or_default()
                .push((pid, property.ran));
            schema
                .adjacency
                .entry(property.ran)
                .or_default()
                .push((pid, property.dom));
        }
        Ok(schema)
    }

    fn class_no_or_insert(&mut self, class: Symbol) -> usize {
        let next = self.class_nos.len();
        *self.class_nos.entry(class).or_insert(next)
    }

    pub fn property(&self, idx: PropIdx) -> &Property {
        &self.properties[idx]
    }

    pub fn num_properties(&self) -> usize {
        self.properties.len()
    }

    /// An [`Iterator`] over every property with its index.
    pub fn properties(&self) -> impl Iterator<Item = (PropIdx, &Property)> {
        self.properties.iter_enumerated()
    }

    /// The `(property, neighbour class)` pairs adjacent to `class` in the class graph.
    pub fn neighbours(&self, class: Symbol) -> &[(PropIdx, Symbol)] {
        self.adjacency.get(&class).map_or(&[], Vec::as_slice)
    }

    /// The dense number assigned to `class`, in first-seen order.
    pub fn class_no(&self, class: Symbol) -> Option<usize> {
        self.class_nos.get(&class).copied()
    }

    pub fn num_classes(&self) -> usize {
        self.class_nos.len()
    }
}

impl std::ops::Index<PropIdx> for Schema {
    type Output = Property;

    fn index(&self, index: PropIdx) -> &Self::Output {
        &self.properties[index]
    }
}

/// The ways a schema file can fail to parse.  Any parse failure aborts the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A record had other than four `^`-separated fields.
    FieldCount { line: usize, count: usize },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::FieldCount { line, count } => write!(
                f,
                "schema line {} has {} `^`-separated fields, expected 4",
                line, count
            ),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_builds_both_directions() {
        let mut symbols = SymbolTable::new();
        let schema =
            Schema::parse("1^User^watches^Movie\n2^Movie^hasGenre^Genre\n", &mut symbols).unwrap();

        let user = symbols.lookup("User").unwrap();
        let movie = symbols.lookup("Movie").unwrap();
        let genre = symbols.lookup("Genre").unwrap();

        assert_eq!(schema.num_properties(), 2);
        assert_eq!(schema.neighbours(user), &[(PropIdx::new(0), movie)]);
        assert_eq!(
            schema.neighbours(movie),
            &[(PropIdx::new(0), user), (PropIdx::new(1), genre)]
        );
        assert_eq!(schema.class_no(user), Some(0));
        assert_eq!(schema.class_no(movie), Some(1));
        assert_eq!(schema.class_no(genre), Some(2));
    }

    #[test]
    fn self_edges_stay_out_of_the_graph() {
        let mut symbols = SymbolTable::new();
        let schema = Schema::parse("1^A^rel^A\n", &mut symbols).unwrap();
        let a = symbols.lookup("A").unwrap();

        assert_eq!(schema.num_properties(), 1);
        assert_eq!(schema.neighbours(a), &[]);
    }

    #[test]
    fn duplicate_edges_are_appended() {
        let mut symbols = SymbolTable::new();
        let schema = Schema::parse("1^A^p^B\n2^A^q^B\n", &mut symbols).unwrap();
        let a = symbols.lookup("A").unwrap();
        assert_eq!(schema.neighbours(a).len(), 2);
    }

    #[test]
    fn wrong_field_count_is_an_error() {
        let mut symbols = SymbolTable::new();
        let err = Schema::parse("1^A^p\n", &mut symbols).unwrap_err();
        assert_eq!(err, ParseError::FieldCount { line: 1, count: 3 });
    }

    #[test]
    fn trailing_newlines_are_permitted() {
        let mut symbols = SymbolTable::new();
        let schema = Schema::parse("1^A^p^B\n\n", &mut symbols).unwrap();
        assert_eq!(schema.num_properties(), 1);
    }
}
