//! Recursive collapse of accepted pattern triples into composite chunk nodes.

use std::collections::{BTreeMap, BTreeSet};

use kgraph::Symbol;

use crate::miner::{Miner, WorkingSet};

/// One chunked triple: the pattern depth it was collapsed at, its display endpoints, the
/// witnessing transaction, and whether it is still a top-level pattern (`false` once it has been
/// subsumed as a child of another chunk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkRecord {
    pub depth: u32,
    pub left: Symbol,
    pub prop: Symbol,
    pub right: Symbol,
    pub witness: Symbol,
    pub top_level: bool,
}

impl Miner<'_> {
    /// Collapses every triple in `candidates`, rewrites the triples adjacent to each collapse,
    /// and recurses while the shrunken working set still yields candidates.
    ///
    /// The chunk depth is incremented on entry and decremented before every return, so it is
    /// always balanced across the recursion.  Termination: every level removes at least one
    /// triple from the working set.
    pub(crate) fn chunk(
        &mut self,
        candidates: &BTreeSet<Symbol>,
        h: &WorkingSet,
        itid_tr: &BTreeMap<Symbol, Symbol>,
        threshold: usize,
    ) {
        self.depth_chunk += 1;

        let mut h_work = h.clone();
        let mut itid_work = itid_tr.clone();
        // Transaction -> the triples witnessed by it, ascending by triple ID
        let mut tr_buckets: BTreeMap<Symbol, Vec<Symbol>> = BTreeMap::new();
        for (&tid, &transaction) in &itid_work {
            tr_buckets.entry(transaction).or_default().push(tid);
        }

        for &cand in candidates {
            let composite = self
                .symbols
                .intern(&format!("_{}:{}", self.depth_chunk, cand));
            let witness = itid_work[&cand];
            let working = &h_work[&cand];
            let (cand_subj, cand_obj) = (working.subj_inst, working.obj_inst);

            // Display endpoints come from the incoming (pre-round) triple, not the working copy
            let original = &h[&cand];
            let (subj_inst, subj_cl) = (original.subj_inst, original.subj_cl);
            let (obj_inst, obj_cl) = (original.obj_inst, original.obj_cl);
            let prop = original.prop;
            let left = self.display_endpoint(subj_inst, subj_cl);
            let right = self.display_endpoint(obj_inst, obj_cl);
            self.records.insert(
                cand,
                ChunkRecord {
                    depth: self.depth_chunk,
                    left,
                    prop,
                    right,
                    witness,
                    top_level: true,
                },
            );

            if let Some(bucket) = tr_buckets.get_mut(&witness) {
                bucket.retain(|&tid| tid != cand);
            }
            h_work.remove(&cand);
            itid_work.remove(&cand);

            let label = self.chunk_labels[&composite];
            if let Some(siblings) = tr_buckets.get(&witness) {
                for &sibling in siblings {
                    let triple = h_work
                        .get_mut(&sibling)
                        .expect("transaction bucket members stay in the working set");
                    let shares_subj =
                        triple.subj_inst == cand_subj || triple.subj_inst == cand_obj;
                    let shares_obj = triple.obj_inst == cand_subj || triple.obj_inst == cand_obj;
                    if shares_subj {
                        // A sibling sharing *both* endpoints also takes this branch: only its
                        // subject side is folded into the chunk.
                        triple.subj_inst = composite;
                        triple.subj_cl = label;
                    } else if shares_obj {
                        triple.obj_inst = composite;
                        triple.obj_cl = label;
                    }
                }
            }
        }

        let next = self.generate_candidates(&h_work, &itid_work, threshold);
        if let Some(first) = next.first_tid() {
            let next_candidates = next.buckets[&first].clone();
            self.chunk(&next_candidates, &h_work, &itid_work, threshold);
        }
        self.depth_chunk -= 1;
    }

    /// The display value of a chunked triple's endpoint: the part after the `":"` of a composite
    /// node ID (re-interned), overridden by the class itself for option classes, and otherwise
    /// the instance unchanged.
    fn display_endpoint(&mut self, instance: Symbol, class: Symbol) -> Symbol {
        let mut value = instance;
        let reference = self
            .symbols
            .resolve(instance)
            .split(':')
            .nth(1)
            .map(str::to_owned);
        if let Some(reference) = reference {
            value = self.symbols.intern(&reference);
        }
        if self.query.is_option_class(class) {
            value = class;
        }
        value
    }
}
