//! Instance-level edges of the knowledge graph.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::symbol::Symbol;

/// The canonical code of a [`Triple`]: the five semantic fields as a fixed-arity key.
pub type Code = [Symbol; 5];

/// An instance-level edge: a subject individual linked to an object individual by a property,
/// with both endpoints typed by a class.
///
/// `idx` is the triple's unique (per-user) ID and `same_code` is a mutable isomorphism-group tag
/// ([`Symbol::NONE`] = unset); neither takes part in value equality.
#[derive(Debug, Clone)]
pub struct Triple {
    pub idx: Symbol,
    pub subj_cl: Symbol,
    pub subj_inst: Symbol,
    pub prop: Symbol,
    pub obj_cl: Symbol,
    pub obj_inst: Symbol,
    pub same_code: Symbol,
}

impl Triple {
    pub fn new(
        idx: Symbol,
        subj_cl: Symbol,
        subj_inst: Symbol,
        prop: Symbol,
        obj_cl: Symbol,
        obj_inst: Symbol,
    ) -> Self {
        Self {
            idx,
            subj_cl,
            subj_inst,
            prop,
            obj_cl,
            obj_inst,
            same_code: Symbol::NONE,
        }
    }

    /// The isomorphism key of this triple: `(subj_cl, subj_inst, prop, obj_cl, obj_inst)`.
    pub fn code(&self) -> Code {
        [
            self.subj_cl,
            self.subj_inst,
            self.prop,
            self.obj_cl,
            self.obj_inst,
        ]
    }

    /// Returns the instance of this triple typed by `class`: the subject instance if `class` is
    /// the subject class, the object instance if it is the object class.  A self-typed triple
    /// (both classes equal to `class`) resolves to the subject side; this is unreachable through
    /// schema paths, which exclude self-edges.
    ///
    /// A `class` matching neither endpoint is a bug in the caller, reported as
    /// [`MissingInstance`] with the triple and class attached.
    pub fn instance_of(&self, class: Symbol) -> Result<Symbol, MissingInstance> {
        if class == self.subj_cl {
            Ok(self.subj_inst)
        } else if class == self.obj_cl {
            Ok(self.obj_inst)
        } else {
            Err(MissingInstance {
                tid: self.idx,
                class,
            })
        }
    }
}

impl PartialEq for Triple {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Triple {}

/// The raw string fields of one instance record, as produced by the data pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleRow {
    pub idx: String,
    pub subj_class: String,
    pub subj_instance: String,
    pub property: String,
    pub obj_class: String,
    pub obj_instance: String,
}

impl TripleRow {
    pub fn new(
        idx: impl Into<String>,
        subj_class: impl Into<String>,
        subj_instance: impl Into<String>,
        property: impl Into<String>,
        obj_class: impl Into<String>,
        obj_instance: impl Into<String>,
    ) -> Self {
        Self {
            idx: idx.into(),
            subj_class: subj_class.into(),
            subj_instance: subj_instance.into(),
            property: property.into(),
            obj_class: obj_class.into(),
            obj_instance: obj_instance.into(),
        }
    }

    /// Parses a `^`-separated record line with exactly six fields.
    pub fn parse(line: &str) -> Result<Self, RowParseError> {
        let fields = line.split('^').collect_vec();
        match fields.as_slice() {
            [idx, subj_class, subj_instance, property, obj_class, obj_instance] => {
                Ok(Self::new(
                    *idx,
                    *subj_class,
                    *subj_instance,
                    *property,
                    *obj_class,
                    *obj_instance,
                ))
            }
            _ => Err(RowParseError {
                num_fields: fields.len(),
            }),
        }
    }
}

////////////
// ERRORS //
////////////

/// Error returned by [`Triple::instance_of`] when the class matches neither endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingInstance {
    pub tid: Symbol,
    pub class: Symbol,
}

impl Display for MissingInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "triple {} has no instance of class {}",
            self.tid, self.class
        )
    }
}

impl std::error::Error for MissingInstance {}

/// Error returned by [`TripleRow::parse`] when a line doesn't have exactly six fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowParseError {
    pub num_fields: usize,
}

impl Display for RowParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "triple records need exactly 6 `^`-separated fields, found {}",
            self.num_fields
        )
    }
}

impl std::error::Error for RowParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolTable;

    fn triple(table: &mut SymbolTable, fields: [&str; 6]) -> Triple {
        let [idx, subj_cl, subj_inst, prop, obj_cl, obj_inst] =
            fields.map(|s| table.intern(s));
        Triple::new(idx, subj_cl, subj_inst, prop, obj_cl, obj_inst)
    }

    #[test]
    fn equality_ignores_idx_and_same_code() {
        let mut table = SymbolTable::new();
        let a = triple(&mut table, ["0", "User", "u1", "watches", "Movie", "m1"]);
        let mut b = triple(&mut table, ["1", "User", "u1", "watches", "Movie", "m1"]);
        b.same_code = table.intern("same_1");
        assert_eq!(a, b);

        let c = triple(&mut table, ["2", "User", "u2", "watches", "Movie", "m1"]);
        assert_ne!(a, c);
    }

    #[test]
    fn instance_of_picks_the_matching_side() {
        let mut table = SymbolTable::new();
        let t = triple(&mut table, ["0", "User", "u1", "watches", "Movie", "m1"]);
        let user = table.intern("User");
        let movie = table.intern("Movie");
        let genre = table.intern("Genre");

        assert_eq!(t.instance_of(user), Ok(table.intern("u1")));
        assert_eq!(t.instance_of(movie), Ok(table.intern("m1")));
        assert_eq!(
            t.instance_of(genre),
            Err(MissingInstance {
                tid: t.idx,
                class: genre
            })
        );
    }

    #[test]
    fn parse_row() {
        let row = TripleRow::parse("0^User^u1^watches^Movie^m1").unwrap();
        assert_eq!(row.idx, "0");
        assert_eq!(row.obj_instance, "m1");
        assert_eq!(
            TripleRow::parse("0^User^u1^watches^Movie"),
            Err(RowParseError { num_fields: 5 })
        );
    }
}
