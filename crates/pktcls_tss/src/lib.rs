//! # Tuple Space Search
//!
//! Prefix rules are grouped by their tuple: the vector of per-dimension
//! prefix lengths. All rules of one tuple live in a hash table keyed by
//! the five-tuple key masked to those lengths, so a probe per tuple is one
//! masked lookup. Search probes every tuple and keeps the
//! highest-priority (numerically smallest) match; insertion locates or
//! creates the tuple bucket, which is what makes incremental updates
//! cheap.
//!
//! ## Example
//! ```
//! use pktcls_core::prelude::*;
//! use pktcls_tss::TupleSpace;
//!
//! let rules = vec![PrefixRule {
//!     value: [0, 0, 0, 0, 6],
//!     len: [0, 0, 0, 0, 8],
//!     priority: 0,
//! }];
//! let space = TupleSpace::build(&rules).unwrap();
//! assert_eq!(space.lookup(&Packet::new([1, 2, 3, 4, 6])), Some(0));
//! assert_eq!(space.lookup(&Packet::new([1, 2, 3, 4, 17])), None);
//! ```

use fxhash::{FxBuildHasher, FxHashMap};
use indexmap::IndexMap;

use pktcls_core::{
    dim::{prefix_mask, Dim, DIM_NUM},
    engine::{Classifier, EngineError},
    rule::{Packet, PrefixRule},
};

/// The tuple shared by all rules of one bucket: per-dimension prefix
/// lengths.
pub type TupleLens = [u8; DIM_NUM];

type MaskedKey = [u32; DIM_NUM];

/// One tuple bucket: a hash table over masked keys, with per-key chains
/// sorted by ascending priority so a probe needs only the chain head.
#[derive(Debug)]
struct TupleTable {
    masks: [u32; DIM_NUM],
    slots: FxHashMap<MaskedKey, Vec<u32>>,
}

impl TupleTable {
    fn new(lens: TupleLens) -> Self {
        let mut masks = [0u32; DIM_NUM];
        for d in Dim::ALL {
            masks[d.index()] = prefix_mask(d.width(), lens[d.index()]);
        }
        TupleTable {
            masks,
            slots: FxHashMap::default(),
        }
    }

    #[inline]
    fn masked(&self, val: &[u32; DIM_NUM]) -> MaskedKey {
        let mut key = [0u32; DIM_NUM];
        for i in 0..DIM_NUM {
            key[i] = val[i] & self.masks[i];
        }
        key
    }

    fn insert(&mut self, rule: &PrefixRule) {
        debug_assert_eq!(self.masked(&rule.value), rule.value);
        let chain = self.slots.entry(rule.value).or_default();
        let at = chain
            .binary_search(&rule.priority)
            .unwrap_or_else(|pos| pos);
        chain.insert(at, rule.priority);
    }

    #[inline]
    fn probe(&self, pkt: &Packet) -> Option<u32> {
        self.slots
            .get(&self.masked(&pkt.val))
            .and_then(|chain| chain.first())
            .copied()
    }
}

/// A Tuple Space Search index over a prefix-form rule set.
#[derive(Debug)]
pub struct TupleSpace {
    tuples: IndexMap<TupleLens, TupleTable, FxBuildHasher>,
    len: usize,
}

impl TupleSpace {
    fn empty() -> Self {
        TupleSpace {
            tuples: IndexMap::default(),
            len: 0,
        }
    }

    fn insert_rule(&mut self, rule: &PrefixRule) {
        self.tuples
            .entry(rule.len)
            .or_insert_with(|| TupleTable::new(rule.len))
            .insert(rule);
        self.len += 1;
    }

    /// Number of distinct tuples (buckets).
    pub fn tuple_count(&self) -> usize {
        self.tuples.len()
    }

    /// Number of rules held across all buckets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Classifier for TupleSpace {
    type Rule = PrefixRule;

    fn build(rules: &[PrefixRule]) -> Result<Self, EngineError> {
        if rules.is_empty() {
            return Err(EngineError::EmptyRuleSet);
        }
        let mut space = Self::empty();
        for rule in rules {
            space.insert_rule(rule);
        }
        log::info!(
            "tuple space built: {} rules across {} tuples",
            space.len,
            space.tuples.len()
        );
        Ok(space)
    }

    fn insert_update(&mut self, rules: &[PrefixRule]) -> Result<(), EngineError> {
        for rule in rules {
            self.insert_rule(rule);
        }
        log::info!(
            "tuple space updated: now {} rules across {} tuples",
            self.len,
            self.tuples.len()
        );
        Ok(())
    }

    fn lookup(&self, pkt: &Packet) -> Option<u32> {
        let mut best: Option<u32> = None;
        for table in self.tuples.values() {
            if let Some(priority) = table.probe(pkt) {
                if best.map_or(true, |b| priority < b) {
                    best = Some(priority);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkt(sip: u32, dip: u32, sport: u32, dport: u32, proto: u32) -> Packet {
        Packet::new([sip, dip, sport, dport, proto])
    }

    fn sip_rule(sip: u32, len: u8, priority: u32) -> PrefixRule {
        PrefixRule {
            value: [sip & prefix_mask(32, len), 0, 0, 0, 0],
            len: [len, 0, 0, 0, 0],
            priority,
        }
    }

    fn proto_rule(proto: u32, priority: u32) -> PrefixRule {
        PrefixRule {
            value: [0, 0, 0, 0, proto],
            len: [0, 0, 0, 0, 8],
            priority,
        }
    }

    fn wildcard(priority: u32) -> PrefixRule {
        PrefixRule {
            value: [0; DIM_NUM],
            len: [0; DIM_NUM],
            priority,
        }
    }

    #[test]
    fn test_proto_exact_beats_wildcard() {
        let rules = vec![proto_rule(6, 0), wildcard(1)];
        let space = TupleSpace::build(&rules).unwrap();
        assert_eq!(space.tuple_count(), 2);
        assert_eq!(space.lookup(&pkt(0, 0, 0, 0, 6)), Some(0));
        assert_eq!(space.lookup(&pkt(0, 0, 0, 0, 17)), Some(1));
    }

    #[test]
    fn test_priority_wins_over_specificity() {
        // 10.0.0.0/8 (id 1), 10.1.0.0/16 (id 2), 10.1.2.3/32 (id 3): the
        // /32 is the most specific but the /8 carries the smallest id.
        let rules = vec![
            sip_rule(0x0a00_0000, 8, 0),
            sip_rule(0x0a01_0000, 16, 1),
            sip_rule(0x0a01_0203, 32, 2),
        ];
        let space = TupleSpace::build(&rules).unwrap();
        assert_eq!(space.tuple_count(), 3);
        assert_eq!(space.lookup(&pkt(0x0a01_0203, 0, 0, 0, 0)), Some(0));
        assert_eq!(space.lookup(&pkt(0x0a01_ffff, 0, 0, 0, 0)), Some(0));
        assert_eq!(space.lookup(&pkt(0x0b01_0203, 0, 0, 0, 0)), None);
    }

    #[test]
    fn test_chain_is_priority_sorted() {
        // same tuple, same masked key, inserted out of priority order
        let rules = vec![proto_rule(6, 5), proto_rule(6, 2), proto_rule(6, 9)];
        let space = TupleSpace::build(&rules).unwrap();
        assert_eq!(space.tuple_count(), 1);
        assert_eq!(space.len(), 3);
        assert_eq!(space.lookup(&pkt(0, 0, 0, 0, 6)), Some(2));
    }

    #[test]
    fn test_incremental_insert_takes_over() {
        // R2 then an update that wins on proto 6
        let rules = vec![proto_rule(6, 1), wildcard(2)];
        let mut space = TupleSpace::build(&rules).unwrap();
        assert_eq!(space.lookup(&pkt(0, 0, 0, 0, 6)), Some(1));

        space.insert_update(&[proto_rule(6, 0)]).unwrap();
        assert_eq!(space.lookup(&pkt(0, 0, 0, 0, 6)), Some(0));
        // unrelated traffic is untouched
        assert_eq!(space.lookup(&pkt(0, 0, 0, 0, 17)), Some(2));
    }

    #[test]
    fn test_update_monotonicity() {
        let rules = vec![sip_rule(0x0a00_0000, 8, 3), wildcard(4)];
        let mut space = TupleSpace::build(&rules).unwrap();
        let probes = [
            pkt(0x0a01_0203, 0, 0, 0, 6),
            pkt(0x0b00_0000, 0, 0, 0, 17),
        ];
        let before: Vec<_> = probes.iter().map(|p| space.lookup(p)).collect();

        // the delta matches only 10.0.0.0/8 traffic and wins by id
        space.insert_update(&[sip_rule(0x0a00_0000, 8, 1)]).unwrap();

        assert_eq!(space.lookup(&probes[0]), Some(1));
        assert_eq!(space.lookup(&probes[1]), before[1]);
    }

    #[test]
    fn test_new_tuple_created_by_update() {
        let mut space = TupleSpace::build(&[wildcard(0)]).unwrap();
        assert_eq!(space.tuple_count(), 1);
        space
            .insert_update(&[sip_rule(0xc0a8_0101, 32, 1)])
            .unwrap();
        assert_eq!(space.tuple_count(), 2);
        assert_eq!(space.len(), 2);
        assert_eq!(space.lookup(&pkt(0xc0a8_0101, 0, 0, 0, 0)), Some(0));
    }

    #[test]
    fn test_empty_rule_set_is_a_build_failure() {
        assert_eq!(
            TupleSpace::build(&[]).unwrap_err(),
            EngineError::EmptyRuleSet
        );
    }

    #[test]
    fn test_multi_dimension_tuple() {
        // sip/16 + dport/16 + proto exact
        let rule = PrefixRule {
            value: [0x0a01_0000, 0, 0, 443, 6],
            len: [16, 0, 0, 16, 8],
            priority: 0,
        };
        let space = TupleSpace::build(&[rule]).unwrap();
        assert_eq!(space.lookup(&pkt(0x0a01_ffff, 9, 1234, 443, 6)), Some(0));
        assert_eq!(space.lookup(&pkt(0x0a01_ffff, 9, 1234, 444, 6)), None);
        assert_eq!(space.lookup(&pkt(0x0a02_0000, 9, 1234, 443, 6)), None);
        assert_eq!(space.lookup(&pkt(0x0a01_ffff, 9, 1234, 443, 17)), None);
    }
}
