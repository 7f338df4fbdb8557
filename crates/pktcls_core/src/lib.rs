//! Core model of the pktcls framework: the five-tuple dimension schema,
//! range- and prefix-form rules, packets, and the engine capability trait
//! every classification engine implements.

pub mod dim;
pub mod engine;
pub mod rule;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        dim::{prefix_mask, Dim, DimRange, DIM_NUM},
        engine::{Classifier, EngineError},
        rule::{Packet, PrefixRule, RangeRule},
    };
}
