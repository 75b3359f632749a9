//! The per-user mining state machine and its final output.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use kgraph::{PropIdx, Symbol, SymbolTable, Triple, TripleRow, TripleStore};

use crate::{
    candidates::{Candidates, FreqDepth},
    chunk::ChunkRecord,
    classify,
    instantiate::Transactions,
    paths::SchemaPath,
    query::Query,
    Result,
};

/// The miner's working set: triple ID -> triple, ordered so every "first element" choice is the
/// smallest ID.
pub(crate) type WorkingSet = BTreeMap<Symbol, Triple>;

/// Mines one user's triples against a shared [`Query`].
///
/// A `Miner` owns all per-user state (a private clone of the run's [`SymbolTable`], the chunk
/// label registry, the frequency/depth memo and the chunk records) and is consumed by
/// [`Self::mine`], so nothing can leak from one user into the next.
#[derive(Debug)]
pub struct Miner<'q> {
    pub(crate) query: &'q Query,
    pub(crate) symbols: SymbolTable,
    /// Composite chunk-node ID -> the label shared by its isomorphism bucket (`ChunkID_Label`).
    pub(crate) chunk_labels: BTreeMap<Symbol, Symbol>,
    /// Cross-round frequency/depth memo, keyed by triple ID.
    pub(crate) freq_depth: BTreeMap<Symbol, FreqDepth>,
    /// The current chunk nesting depth; 0 outside of [`Self::chunk`].
    pub(crate) depth_chunk: u32,
    /// Every chunked triple so far (`Chunking_Result`).
    pub(crate) records: BTreeMap<Symbol, ChunkRecord>,
}

impl<'q> Miner<'q> {
    /// Creates a miner for one user.  `symbols` should be a clone of the run's table, with all
    /// schema terms already interned; IDs this miner assigns on top of it stay private to it.
    pub fn new(query: &'q Query, symbols: SymbolTable) -> Self {
        Self {
            query,
            symbols,
            chunk_labels: BTreeMap::new(),
            freq_depth: BTreeMap::new(),
            depth_chunk: 0,
            records: BTreeMap::new(),
        }
    }

    /// Mines `rows` with the given support threshold, consuming the miner.
    pub fn mine(mut self, rows: &[TripleRow], threshold: usize) -> Result<Mined> {
        self.run(rows, threshold)
    }

    pub(crate) fn run(&mut self, rows: &[TripleRow], threshold: usize) -> Result<Mined> {
        let store = TripleStore::from_rows(rows, self.query.start_class, &mut self.symbols);
        log::debug!(
            "stored {} triples, {} start instances, support threshold {}",
            store.len(),
            store.start_instances().len(),
            threshold
        );

        // Working set: only triples whose property name the schema knows about
        let schema_props: BTreeSet<Symbol> = self
            .query
            .schema
            .properties()
            .map(|(_, prop)| prop.name)
            .collect();
        let mut working: WorkingSet = store
            .triples()
            .filter(|(_, triple)| schema_props.contains(&triple.prop))
            .map(|(tid, triple)| (tid, triple.clone()))
            .collect();

        // Live schema paths: those whose every property has at least one triple in this user's
        // data.  Dead paths can realise nothing and are skipped wholesale.
        let live_paths: Vec<SchemaPath> = self
            .query
            .paths
            .iter()
            .filter(|path| {
                path.iter()
                    .all(|&pid| store.has_property(self.query.schema[pid].name))
            })
            .cloned()
            .collect();
        let live_props: BTreeSet<PropIdx> = self
            .query
            .path_properties
            .iter()
            .copied()
            .filter(|&pid| store.has_property(self.query.schema[pid].name))
            .collect();

        let transactions = Transactions::collect(self.query, &store, &live_paths)?;
        working.retain(|tid, _| transactions.it_trs.contains_key(tid));
        log::debug!(
            "{} live paths, {} reachable triples",
            live_paths.len(),
            working.len()
        );

        let chunk_types = classify::classify_props(self.query, live_props.iter().copied());
        log::debug!(
            "chunking types: {}",
            chunk_types
                .iter()
                .map(|(pid, ty)| {
                    let name = self.symbols.resolve(self.query.schema[*pid].name);
                    format!("{}: {:?}", name, ty)
                })
                .join(", ")
        );

        let candidates = self.generate_candidates(&working, &transactions.itid_tr, threshold);
        if candidates.is_empty() {
            // No pattern reaches the threshold; a normal outcome, not an error
            log::debug!("no candidate reaches support {}", threshold);
            return Ok(Mined::default());
        }
        self.tag_same_codes(&mut working, &candidates);

        // The top-level chunking round takes every accepted candidate (the union of all tying
        // buckets); recursive rounds narrow to a single bucket.
        let accepted: BTreeSet<Symbol> = candidates.witnesses.keys().copied().collect();
        self.chunk(&accepted, &working, &transactions.itid_tr, threshold);
        debug_assert_eq!(self.depth_chunk, 0);

        Ok(self.finalise(&transactions.itid_tr))
    }

    /// Stamps each isomorphism bucket of the first candidate round with a shared `same_<n>` tag.
    fn tag_same_codes(&mut self, working: &mut WorkingSet, candidates: &Candidates) {
        let mut group_no = 1u32;
        for (tid, bucket) in &candidates.buckets {
            if working[tid].same_code != Symbol::NONE {
                continue;
            }
            let code = self.symbols.intern(&format!("same_{}", group_no));
            for member in bucket {
                let triple = working
                    .get_mut(member)
                    .expect("bucket members are in the working set");
                if triple.same_code == Symbol::NONE {
                    triple.same_code = code;
                }
            }
            group_no += 1;
        }
    }

    /// Turns the chunk records into the final per-user output: records whose composite was folded
    /// into a later chunk are demoted from top level, everything is materialised back to strings,
    /// and each remaining top-level pattern gets its transitive member stack.
    ///
    /// This is a pure function of the records; running it twice gives identical output.
    pub(crate) fn finalise(&self, itid_tr: &BTreeMap<Symbol, Symbol>) -> Mined {
        // A record endpoint referencing a chunked triple is the bare decimal form of that
        // triple's symbol ID (the part after ":" of its composite node ID)
        let keys_by_id: BTreeMap<u32, Symbol> = self
            .records
            .keys()
            .map(|&tid| (tid.as_u32(), tid))
            .collect();

        let mut demoted: BTreeSet<Symbol> = BTreeSet::new();
        for record in self.records.values() {
            for side in [record.left, record.right] {
                if let Some(tid) = self.digit_reference(side, &keys_by_id) {
                    demoted.insert(tid);
                }
            }
        }
        let mut final_records = self.records.clone();
        for (tid, record) in final_records.iter_mut() {
            if demoted.contains(tid) {
                record.top_level = false;
            }
        }

        let mut stacks = Vec::new();
        for (&tid, record) in &final_records {
            if !record.top_level {
                continue;
            }
            let mut members = Vec::new();
            let mut ancestors = BTreeSet::new();
            self.find_result(tid, &final_records, &keys_by_id, &mut ancestors, &mut members);
            stacks.push(PatternStack {
                freq: self.freq_depth.get(&tid).map_or(0, |fd| fd.freq),
                witness: self.symbols.resolve(itid_tr[&tid]).into_owned(),
                members: members
                    .iter()
                    .map(|&member| self.symbols.resolve(member).into_owned())
                    .collect(),
            });
        }

        let patterns = final_records
            .iter()
            .map(|(&tid, record)| {
                (
                    self.symbols.resolve(tid).into_owned(),
                    PatternRecord {
                        depth: record.depth.to_string(),
                        left: self.symbols.resolve(record.left).into_owned(),
                        property: self.symbols.resolve(record.prop).into_owned(),
                        right: self.symbols.resolve(record.right).into_owned(),
                        witness: self.symbols.resolve(record.witness).into_owned(),
                        active: if record.top_level { "1".to_owned() } else { String::new() },
                    },
                )
            })
            .collect();

        Mined { patterns, stacks }
    }

    /// Resolves a record endpoint to the chunk record it references, if its interned string is
    /// the bare decimal ID of a recorded triple.
    fn digit_reference(&self, side: Symbol, keys_by_id: &BTreeMap<u32, Symbol>) -> Option<Symbol> {
        let s = self.symbols.resolve(side);
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        s.parse().ok().and_then(|id| keys_by_id.get(&id)).copied()
    }

    /// Depth-first collection of a pattern's transitive members: the triple itself, then every
    /// recorded triple its endpoints reference.  `ancestors` guards against reference cycles.
    fn find_result(
        &self,
        tid: Symbol,
        final_records: &BTreeMap<Symbol, ChunkRecord>,
        keys_by_id: &BTreeMap<u32, Symbol>,
        ancestors: &mut BTreeSet<Symbol>,
        out: &mut Vec<Symbol>,
    ) {
        out.push(tid);
        let Some(record) = final_records.get(&tid) else {
            return;
        };
        ancestors.insert(tid);
        for side in [record.left, record.right] {
            if let Some(child) = self.digit_reference(side, keys_by_id) {
                if !ancestors.contains(&child) {
                    self.find_result(child, final_records, keys_by_id, ancestors, out);
                }
            }
        }
        ancestors.remove(&tid);
    }
}

/// The mined patterns of one user, materialised back to strings for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mined {
    /// Triple index -> its chunk record (`chunking_result_final`).
    pub patterns: BTreeMap<String, PatternRecord>,
    /// One entry per top-level pattern (`chunk_stack_list`).
    pub stacks: Vec<PatternStack>,
}

impl Mined {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// One chunked triple, as strings: `[depth, left, property, right, witness, active]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRecord {
    pub depth: String,
    pub left: String,
    pub property: String,
    pub right: String,
    pub witness: String,
    /// `"1"` for a top-level pattern, `""` for one subsumed as a child of another chunk.
    pub active: String,
}

/// A top-level pattern with its bucket frequency, witnessing transaction and transitive member
/// triples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternStack {
    pub freq: usize,
    pub witness: String,
    pub members: Vec<String>,
}
