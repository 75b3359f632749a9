//! Mining parameters and the shared, read-only query built from them.

use std::collections::BTreeSet;

use kgraph::{PropIdx, Schema, Symbol, SymbolTable};

use crate::paths::{self, SchemaPath};

/// Driver-facing mining parameters, as plain strings.
///
/// These are resolved against a [`SymbolTable`] by [`Query::new`]; keeping the raw strings here
/// means a `Parameters` can be built (e.g. deserialised from a config file) before any interning
/// has happened.
#[derive(Debug, Clone)]
pub struct Parameters {
    /// The class whose individuals root the transactions.
    pub start_class: String,
    /// The classes at which a schema path may end.
    pub end_classes: Vec<String>,
    /// Classes whose individuals are collapsed to the class before isomorphism testing, so that
    /// patterns generalise across instances.
    pub option_classes: Vec<String>,
    /// The maximum number of properties in a schema path.
    pub max_depth: usize,
}

/// Everything shared between workers for one run: the parsed schema, the resolved parameters and
/// the enumerated schema paths.  Immutable after construction; workers hold it by reference and
/// clone only the [`SymbolTable`].
#[derive(Debug)]
pub struct Query {
    pub(crate) schema: Schema,
    pub(crate) start_class: Symbol,
    pub(crate) end_classes: BTreeSet<Symbol>,
    pub(crate) option_classes: BTreeSet<Symbol>,
    pub(crate) paths: Vec<SchemaPath>,
    pub(crate) path_properties: BTreeSet<PropIdx>,
}

impl Query {
    /// Resolves `params` against `symbols` and enumerates every schema path from the start class
    /// to an end class.  All class names are interned here, before the table is cloned into
    /// workers, so their IDs are frozen across the run.
    pub fn new(schema: Schema, params: &Parameters, symbols: &mut SymbolTable) -> Self {
        let start_class = symbols.intern(&params.start_class);
        let end_classes: BTreeSet<Symbol> = params
            .end_classes
            .iter()
            .map(|c| symbols.intern(c))
            .collect();
        let option_classes: BTreeSet<Symbol> = params
            .option_classes
            .iter()
            .map(|c| symbols.intern(c))
            .collect();

        let (paths, path_properties) =
            paths::enumerate(&schema, start_class, &end_classes, params.max_depth);
        log::debug!(
            "enumerated {} schema paths over {} properties",
            paths.len(),
            path_properties.len()
        );

        Self {
            schema,
            start_class,
            end_classes,
            option_classes,
            paths,
            path_properties,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The enumerated schema paths, in enumeration (stack) order.  Consumers treat this as a set.
    pub fn paths(&self) -> &[SchemaPath] {
        &self.paths
    }

    /// Every property used by at least one schema path.
    pub fn path_properties(&self) -> &BTreeSet<PropIdx> {
        &self.path_properties
    }

    pub fn start_class(&self) -> Symbol {
        self.start_class
    }

    pub fn is_option_class(&self, class: Symbol) -> bool {
        self.option_classes.contains(&class)
    }
}

/// The per-user support threshold, derived from the number of watching events `w`: 4 for large
/// histories, `⌊ln w⌋` for medium ones, 2 for small ones.  `None` means the user has too little
/// data to mine and should be skipped.
pub fn support_threshold(watch_count: usize) -> Option<usize> {
    match watch_count {
        0..=2 => None,
        3..=7 => Some(2),
        8..=100 => Some((watch_count as f64).ln() as usize),
        _ => Some(4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_threshold_bands() {
        assert_eq!(support_threshold(0), None);
        assert_eq!(support_threshold(2), None);
        assert_eq!(support_threshold(3), Some(2));
        assert_eq!(support_threshold(7), Some(2));
        assert_eq!(support_threshold(8), Some(2)); // ln 8 = 2.07
        assert_eq!(support_threshold(20), Some(2)); // ln 20 = 2.99
        assert_eq!(support_threshold(21), Some(3)); // ln 21 = 3.04
        assert_eq!(support_threshold(100), Some(4)); // ln 100 = 4.6
        assert_eq!(support_threshold(101), Some(4));
        assert_eq!(support_threshold(10_000), Some(4));
    }
}
