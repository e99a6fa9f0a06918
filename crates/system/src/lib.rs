//! Host network counters and the sampler that normalizes them.

pub mod sampler;
pub mod source;

pub use sampler::Sampler;
pub use source::{FixedSource, InterfaceCounters, NetworkSource, SysinfoSource};
