//! Candidate generation: canonical codes, isomorphism buckets and frequency/depth selection.

use std::collections::{BTreeMap, BTreeSet};

use kgraph::{triple::Code, Symbol};

use crate::miner::{Miner, WorkingSet};

/// One round's verdict on a triple: the size of its isomorphism bucket, whether it has been
/// accepted as a pattern (a cross-round memo), and the chunk depth of its canonical endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FreqDepth {
    pub freq: usize,
    pub accepted: bool,
    pub depth: u32,
}

/// The accepted candidates of one generation round.
#[derive(Debug, Clone, Default)]
pub(crate) struct Candidates {
    /// Accepted triple ID -> its witnessing transaction.
    pub witnesses: BTreeMap<Symbol, Symbol>,
    /// Accepted triple ID -> the full isomorphism bucket it belongs to.
    pub buckets: BTreeMap<Symbol, BTreeSet<Symbol>>,
}

impl Candidates {
    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }

    /// The smallest accepted triple ID, the pinned choice for "the first" candidate.
    pub fn first_tid(&self) -> Option<Symbol> {
        self.witnesses.keys().next().copied()
    }
}

/// Parses the chunk depth out of a composite node or label string of the form `"_<d>:…"`.
/// Anything that doesn't parse as a number between the underscore and the colon (including the
/// absence of a colon) silently yields depth 0.
pub(crate) fn composite_depth(s: &str) -> u32 {
    let Some(colon) = s.find(':') else {
        return 0;
    };
    let start = s.find('_').map_or(0, |u| u + 1);
    s.get(start..colon)
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

impl Miner<'_> {
    /// Runs one candidate-generation round over the working set `h`.
    ///
    /// Triples are canonicalised (option-class collapse, then chunk-label substitution keyed on
    /// the *pre-collapse* instance), coded, and bucketed by code.  A triple is accepted iff its
    /// bucket is at least `threshold` big, ties the maximum bucket size, and sits at the minimum
    /// unaccepted chunk depth.  Accepted buckets get a fresh label interned and a composite node
    /// ID registered per member.
    pub(crate) fn generate_candidates(
        &mut self,
        h: &WorkingSet,
        itid_tr: &BTreeMap<Symbol, Symbol>,
        threshold: usize,
    ) -> Candidates {
        // Canonicalise a copy of the working set
        let mut canonical = h.clone();
        for triple in canonical.values_mut() {
            let (orig_subj, orig_obj) = (triple.subj_inst, triple.obj_inst);
            if self.query.is_option_class(triple.subj_cl) {
                triple.subj_inst = triple.subj_cl;
            }
            if self.query.is_option_class(triple.obj_cl) {
                triple.obj_inst = triple.obj_cl;
            }
            if let Some(&label) = self.chunk_labels.get(&orig_subj) {
                triple.subj_inst = label;
            }
            if let Some(&label) = self.chunk_labels.get(&orig_obj) {
                triple.obj_inst = label;
            }
        }

        // Bucket triple IDs by canonical code
        let mut iso_buckets: BTreeMap<Code, Vec<Symbol>> = BTreeMap::new();
        for (&tid, triple) in &canonical {
            iso_buckets.entry(triple.code()).or_default().push(tid);
        }
        let Some(max_freq) = iso_buckets.values().map(Vec::len).max() else {
            return Candidates::default();
        };

        let mut bucket_of: BTreeMap<Symbol, &[Symbol]> = BTreeMap::new();
        for bucket in iso_buckets.values() {
            for &tid in bucket {
                bucket_of.insert(tid, bucket.as_slice());
            }
        }

        // Refresh the memo for every triple still in the working set.  Entries of previously
        // chunked triples survive untouched; their accepted flag keeps them out of `min_depth`.
        for (&tid, bucket) in &bucket_of {
            let triple = &canonical[&tid];
            let depth = composite_depth(&self.symbols.resolve(triple.subj_inst))
                .max(composite_depth(&self.symbols.resolve(triple.obj_inst)));
            self.freq_depth.insert(
                tid,
                FreqDepth {
                    freq: bucket.len(),
                    accepted: false,
                    depth,
                },
            );
        }

        let min_depth = self
            .freq_depth
            .values()
            .filter(|fd| fd.freq == max_freq && !fd.accepted)
            .map(|fd| fd.depth)
            .min()
            .unwrap_or(0);

        let mut candidates = Candidates::default();
        for (&tid, bucket) in &bucket_of {
            let fd = self.freq_depth[&tid];
            if fd.freq >= threshold && fd.freq == max_freq && fd.depth == min_depth {
                candidates.witnesses.insert(tid, itid_tr[&tid]);
                candidates
                    .buckets
                    .insert(tid, bucket.iter().copied().collect());
                self.freq_depth.insert(tid, FreqDepth { accepted: true, ..fd });
            }
        }

        // One label per accepted bucket; one composite node ID per member
        let mut labelled: Vec<&BTreeSet<Symbol>> = Vec::new();
        let mut label_no = 0u32;
        for bucket in candidates.buckets.values() {
            if labelled.contains(&bucket) {
                continue;
            }
            labelled.push(bucket);
            let label = self
                .symbols
                .intern(&format!("_{}:{}", self.depth_chunk + 1, label_no));
            for &member in bucket {
                let composite = self
                    .symbols
                    .intern(&format!("_{}:{}", self.depth_chunk + 1, member));
                self.chunk_labels.insert(composite, label);
            }
            label_no += 1;
        }

        log::debug!(
            "candidate round at depth {}: {} buckets, max frequency {}, {} accepted",
            self.depth_chunk,
            iso_buckets.len(),
            max_freq,
            candidates.witnesses.len()
        );
        candidates
    }
}
