//! Classification of path properties by how their endpoints relate to the option classes.

use std::collections::BTreeMap;

use kgraph::PropIdx;

use crate::query::Query;

/// How a property's endpoints relate to the option-class set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingType {
    /// Exactly one endpoint class is an option class.
    Either,
    /// Both endpoint classes are option classes.
    Both,
}

/// Tags each path property of `query` whose endpoints touch the option classes; properties with
/// no option-class endpoint are absent from the result.
pub fn classify(query: &Query) -> BTreeMap<PropIdx, ChunkingType> {
    classify_props(query, query.path_properties.iter().copied())
}

/// As [`classify`], over an explicit property set (the miner narrows to the properties live in
/// one user's data).
pub(crate) fn classify_props(
    query: &Query,
    props: impl IntoIterator<Item = PropIdx>,
) -> BTreeMap<PropIdx, ChunkingType> {
    let mut types = BTreeMap::new();
    for pid in props {
        let prop = query.schema[pid];
        let dom_opt = query.is_option_class(prop.dom);
        let ran_opt = query.is_option_class(prop.ran);
        match (dom_opt, ran_opt) {
            (true, true) => {
                types.insert(pid, ChunkingType::Both);
            }
            (true, false) | (false, true) => {
                types.insert(pid, ChunkingType::Either);
            }
            (false, false) => {}
        }
    }
    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Parameters;
    use kgraph::{Schema, SymbolTable};

    #[test]
    fn tags_follow_the_option_classes() {
        let mut symbols = SymbolTable::new();
        let schema = Schema::parse(
            "1^User^watches^Movie\n2^Movie^similarTo^Collection\n3^Collection^rated^Rating\n",
            &mut symbols,
        )
        .unwrap();
        let params = Parameters {
            start_class: "User".to_owned(),
            end_classes: vec!["Rating".to_owned()],
            option_classes: vec!["Movie".to_owned(), "Collection".to_owned()],
            max_depth: 5,
        };
        let query = Query::new(schema, &params, &mut symbols);

        let types = classify(&query);
        assert_eq!(types[&PropIdx::new(0)], ChunkingType::Either); // User - Movie
        assert_eq!(types[&PropIdx::new(1)], ChunkingType::Both); // Movie - Collection
        assert_eq!(types[&PropIdx::new(2)], ChunkingType::Either); // Collection - Rating
    }

    #[test]
    fn plain_properties_are_unclassified() {
        let mut symbols = SymbolTable::new();
        let schema = Schema::parse("1^User^rated^Rating\n", &mut symbols).unwrap();
        let params = Parameters {
            start_class: "User".to_owned(),
            end_classes: vec!["Rating".to_owned()],
            option_classes: vec!["Movie".to_owned()],
            max_depth: 5,
        };
        let query = Query::new(schema, &params, &mut symbols);
        assert!(classify(&query).is_empty());
    }
}
