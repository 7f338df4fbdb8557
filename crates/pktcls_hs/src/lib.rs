//! # HyperSplit
//!
//! A recursive space-decomposition classifier over the five-tuple key
//! space. Build chooses, at every node, the dimension and threshold whose
//! split minimizes the combined rule count of the two children, and
//! recurses until subsets fall under the small-leaf threshold. Search
//! descends the resulting binary tree and scans the leaf's priority-ordered
//! rule list for the first full match.
//!
//! ## Example
//! ```
//! use pktcls_core::prelude::*;
//! use pktcls_hs::HyperSplit;
//!
//! let rules = vec![RangeRule::any(0)];
//! let index = HyperSplit::build(&rules).unwrap();
//! assert_eq!(index.lookup(&Packet::new([1, 2, 3, 4, 5])), Some(0));
//! ```

mod tree;

pub use tree::{HyperSplit, HyperSplitConfig, TreeStats};
