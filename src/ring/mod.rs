//! Lock-free per-topic rings.
//!
//! - [`RingView`] - offset-addressed view over a ring's descriptor and slots
//! - [`SwmrPublisher`] - wait-free single-writer append
//! - [`MwmrPublisher`] - multi-writer append with a generation wait
//! - [`Subscriber`] - seqlock-verified consume with lag recovery
//!
//! Both publish variants share the same reserve/commit core; the subscriber
//! side is identical for either writer discipline.

pub mod mwmr;
pub mod subscriber;
pub mod swmr;
pub mod view;

pub use mwmr::MwmrPublisher;
pub use subscriber::{Consumed, Subscriber};
pub use swmr::SwmrPublisher;
pub use view::RingView;

/// Sequence number type for ring positions.
///
/// Sequences are 1-based, unique per publish, monotone, and never wrap in
/// practice; slot index is `(seq - 1) & (slot_count - 1)`.
pub type Sequence = u64;
