//! Rule and packet records.
//!
//! A rule constrains every dimension of the five-tuple, either as an
//! inclusive range per dimension ([`RangeRule`], consumed by HyperSplit) or
//! as a value/prefix-length pair per dimension ([`PrefixRule`], consumed by
//! Tuple Space Search). Every rule carries a 0-based priority; the smaller
//! value wins when several rules match a packet.

use crate::dim::{prefix_mask, Dim, DimRange, DIM_NUM};

/// A rule with an inclusive low/high interval in every dimension.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RangeRule {
    pub dims: [DimRange; DIM_NUM],
    pub priority: u32,
}

impl RangeRule {
    /// The match-anything rule: wildcard in every dimension.
    pub fn any(priority: u32) -> Self {
        RangeRule {
            dims: [
                DimRange::full(Dim::Sip),
                DimRange::full(Dim::Dip),
                DimRange::full(Dim::Sport),
                DimRange::full(Dim::Dport),
                DimRange::full(Dim::Proto),
            ],
            priority,
        }
    }

    /// Whether the packet lies within the rule's interval in every
    /// dimension.
    #[inline]
    pub fn matches(&self, pkt: &Packet) -> bool {
        Dim::ALL
            .iter()
            .all(|d| self.dims[d.index()].contains(pkt.val[d.index()]))
    }
}

/// A rule with a masked value and prefix length in every dimension.
///
/// Invariant: `value[d] == value[d] & mask(len[d])` and
/// `len[d] <= W[d]`; the protocol length is either 8 (exact) or 0
/// (wildcard).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PrefixRule {
    pub value: [u32; DIM_NUM],
    pub len: [u8; DIM_NUM],
    pub priority: u32,
}

impl PrefixRule {
    /// The prefix mask of this rule in dimension `dim`.
    #[inline]
    pub fn mask(&self, dim: Dim) -> u32 {
        prefix_mask(dim.width(), self.len[dim.index()])
    }

    /// Whether the packet equals the rule value under the rule's mask in
    /// every dimension.
    #[inline]
    pub fn matches(&self, pkt: &Packet) -> bool {
        Dim::ALL
            .iter()
            .all(|d| pkt.val[d.index()] & self.mask(*d) == self.value[d.index()])
    }

    /// Convert to range form: per dimension `low = v & mask(l)`,
    /// `high = v | (!mask(l) & width_mask)`.
    pub fn to_range(&self) -> RangeRule {
        let mut dims = [DimRange { low: 0, high: 0 }; DIM_NUM];
        for d in Dim::ALL {
            let i = d.index();
            let mask = self.mask(d);
            dims[i] = DimRange {
                low: self.value[i] & mask,
                high: self.value[i] | (!mask & d.max_point()),
            };
        }
        RangeRule {
            dims,
            priority: self.priority,
        }
    }
}

/// A trace packet: one point value per dimension plus the priority of the
/// rule the trace generator expects to match (`None` when the packet is
/// expected to fall through all rules).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Packet {
    pub val: [u32; DIM_NUM],
    pub expected: Option<u32>,
}

impl Packet {
    pub fn new(val: [u32; DIM_NUM]) -> Self {
        Packet {
            val,
            expected: None,
        }
    }

    pub fn with_expected(val: [u32; DIM_NUM], expected: Option<u32>) -> Self {
        Packet { val, expected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(sip: (u32, u8), proto: (u32, u8), priority: u32) -> PrefixRule {
        PrefixRule {
            value: [sip.0, 0, 0, 0, proto.0],
            len: [sip.1, 0, 0, 0, proto.1],
            priority,
        }
    }

    #[test]
    fn test_range_match() {
        let mut r = RangeRule::any(0);
        r.dims[Dim::Sport.index()] = DimRange {
            low: 1000,
            high: 2000,
        };
        assert!(r.matches(&Packet::new([1, 2, 1500, 4, 6])));
        assert!(r.matches(&Packet::new([1, 2, 1000, 4, 6])));
        assert!(!r.matches(&Packet::new([1, 2, 999, 4, 6])));
        assert!(!r.matches(&Packet::new([1, 2, 2001, 4, 6])));
    }

    #[test]
    fn test_prefix_match() {
        // 10.0.0.0/8, proto exact 6
        let r = prefix((0x0a00_0000, 8), (6, 8), 0);
        assert!(r.matches(&Packet::new([0x0a01_0203, 0, 0, 0, 6])));
        assert!(!r.matches(&Packet::new([0x0b01_0203, 0, 0, 0, 6])));
        assert!(!r.matches(&Packet::new([0x0a01_0203, 0, 0, 0, 17])));
    }

    #[test]
    fn test_prefix_to_range() {
        let r = prefix((0x0a01_0000, 16), (0, 0), 3);
        let rr = r.to_range();
        assert_eq!(
            rr.dims[Dim::Sip.index()],
            DimRange {
                low: 0x0a01_0000,
                high: 0x0a01_ffff
            }
        );
        assert_eq!(rr.dims[Dim::Proto.index()], DimRange { low: 0, high: 0xff });
        assert_eq!(rr.dims[Dim::Sport.index()], DimRange::full(Dim::Sport));
        assert_eq!(rr.priority, 3);

        // a /32 collapses to a point
        let exact = prefix((0xc0a8_0101, 32), (6, 8), 0).to_range();
        assert_eq!(
            exact.dims[Dim::Sip.index()],
            DimRange::point(0xc0a8_0101)
        );
        assert_eq!(exact.dims[Dim::Proto.index()], DimRange::point(6));
    }

    #[test]
    fn test_prefix_and_range_agree() {
        let rules = [
            prefix((0x0a00_0000, 8), (0, 0), 0),
            prefix((0x0a01_0000, 16), (6, 8), 1),
            prefix((0, 0), (17, 8), 2),
        ];
        let probes = [
            Packet::new([0x0a01_0203, 0, 0, 0, 6]),
            Packet::new([0x0a01_0203, 0, 0, 0, 17]),
            Packet::new([0xc0a8_0101, 0, 0, 0, 17]),
            Packet::new([0xc0a8_0101, 0, 0, 0, 6]),
        ];
        for r in &rules {
            let rr = r.to_range();
            for p in &probes {
                assert_eq!(r.matches(p), rr.matches(p), "rule {:?} pkt {:?}", r, p);
            }
        }
    }
}
