//! Sampling, retention and fan-out of network samples.
//!
//! A [`Monitor`] owns the sampler, the rolling [`SeriesStore`] and the
//! [`Publisher`]; its [`Scheduler`] ties them together on a timer.

pub mod context;
pub mod publisher;
pub mod scheduler;
pub mod store;

pub use context::Monitor;
pub use publisher::{ChannelListener, Listener, ListenerId, PublishReport, Publisher};
pub use scheduler::{PrunePolicy, Scheduler};
pub use store::SeriesStore;
