//! Enumeration of schema-level paths through the class graph.

use std::collections::BTreeSet;

use itertools::Itertools;
use kgraph::{PropIdx, Schema, Symbol};

/// A walk in the class graph, as the sequence of properties it crosses.
pub type SchemaPath = Vec<PropIdx>;

/// A frontier entry of the depth-bounded DFS: the class reached, the properties crossed to reach
/// it, and the classes visited along the way.
struct Frontier {
    class: Symbol,
    path: SchemaPath,
    route: Vec<Symbol>,
}

/// Enumerates every path from `start` to any class in `ends`, at most `max_depth` properties
/// long and never crossing the same property twice.  Also returns the set of properties used by
/// at least one path.
///
/// The search runs on an explicit stack, so the output is in LIFO order; no consumer depends on
/// the order.  Termination: paths are depth-bounded and a property is never repeated.
pub(crate) fn enumerate(
    schema: &Schema,
    start: Symbol,
    ends: &BTreeSet<Symbol>,
    max_depth: usize,
) -> (Vec<SchemaPath>, BTreeSet<PropIdx>) {
    let mut result = Vec::new();
    let mut properties = BTreeSet::new();

    let mut stack = vec![Frontier {
        class: start,
        path: Vec::new(),
        route: vec![start],
    }];
    while let Some(Frontier { class, path, route }) = stack.pop() {
        if path.len() >= max_depth {
            continue;
        }
        // The start class may itself be an end class; the empty walk it would produce is not a
        // path and is never recorded.
        if ends.contains(&class) && !path.is_empty() {
            log::trace!(
                "schema path {:?} via classes {:?}",
                path.iter().map(|p| p.index()).collect_vec(),
                route
            );
            properties.extend(path.iter().copied());
            result.push(path);
        } else {
            for &(pid, neighbour) in schema.neighbours(class) {
                if path.contains(&pid) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(pid);
                let mut next_route = route.clone();
                next_route.push(neighbour);
                stack.push(Frontier {
                    class: neighbour,
                    path: next_path,
                    route: next_route,
                });
            }
        }
    }

    (result, properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgraph::SymbolTable;

    fn enumerate_from(
        schema_src: &str,
        start: &str,
        ends: &[&str],
        max_depth: usize,
    ) -> (Vec<SchemaPath>, BTreeSet<PropIdx>) {
        let mut symbols = SymbolTable::new();
        let schema = Schema::parse(schema_src, &mut symbols).unwrap();
        let start = symbols.intern(start);
        let ends = ends.iter().map(|e| symbols.intern(e)).collect();
        enumerate(&schema, start, &ends, max_depth)
    }

    #[test]
    fn single_chain() {
        let (paths, props, ..) = enumerate_from(
            "1^User^watches^Movie\n2^Movie^hasGenre^Genre\n",
            "User",
            &["Genre"],
            4,
        );
        assert_eq!(paths, vec![vec![PropIdx::new(0), PropIdx::new(1)]]);
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn paths_stop_at_end_classes() {
        // Genre is an end class, so the walk User -> Movie -> Genre is never extended to Keyword
        let (paths, ..) = enumerate_from(
            "1^User^watches^Movie\n2^Movie^hasGenre^Genre\n3^Genre^related^Keyword\n",
            "User",
            &["Genre", "Keyword"],
            6,
        );
        assert_eq!(paths, vec![vec![PropIdx::new(0), PropIdx::new(1)]]);
    }

    #[test]
    fn max_depth_bounds_the_walk() {
        let (paths, ..) = enumerate_from(
            "1^User^watches^Movie\n2^Movie^hasGenre^Genre\n",
            "User",
            &["Genre"],
            3,
        );
        assert_eq!(paths.len(), 1);

        // A frontier entry already at the depth bound is discarded before the end-class check
        let (paths, ..) = enumerate_from(
            "1^User^watches^Movie\n2^Movie^hasGenre^Genre\n",
            "User",
            &["Genre"],
            2,
        );
        assert!(paths.is_empty());
    }

    #[test]
    fn self_edges_yield_no_paths() {
        let (paths, props, ..) = enumerate_from("1^A^rel^A\n", "A", &["A"], 4);
        assert!(paths.is_empty());
        assert!(props.is_empty());
    }

    #[test]
    fn properties_never_repeat() {
        // A diamond with a cycle: every enumerated path must be duplicate-free and within depth
        let (paths, ..) = enumerate_from(
            "1^A^p^B\n2^B^q^C\n3^C^r^A\n4^B^s^D\n",
            "A",
            &["D"],
            10,
        );
        assert!(!paths.is_empty());
        for path in &paths {
            assert!(path.len() <= 10);
            let unique: BTreeSet<_> = path.iter().collect();
            assert_eq!(unique.len(), path.len());
        }
    }
}
