//! # surge - shared-memory publish/subscribe fabric
//!
//! A named shared-memory region carved into per-topic ring buffers.
//! Publishers append fixed-slot messages; subscribers read them concurrently
//! without copying through the kernel. The whole protocol runs on two atomic
//! words per ring - the write head and each slot's sequence - plus a
//! seqlock bracket around every payload copy.
//!
//! ```no_run
//! use surge::{Consumed, RegionBuilder, RingKind, SharedRegion, TopicConfig};
//!
//! // Owner process: carve the region
//! let region = RegionBuilder::new("/surge-demo", 1 << 20)
//!     .topic(TopicConfig::new("ticks", 1024, 64, RingKind::SingleWriter))
//!     .create()?;
//!
//! let mut publisher = region.swmr_publisher("ticks", 1)?;
//! publisher.publish(b"hello")?;
//!
//! // Any process: attach and read
//! let attached = SharedRegion::open("/surge-demo")?;
//! let mut subscriber = attached.subscriber("ticks")?;
//! let mut buf = [0u8; 64];
//! if let Consumed::Delivered { len, .. } = subscriber.consume(&mut buf) {
//!     assert_eq!(&buf[..len], b"hello");
//! }
//! # Ok::<(), surge::SurgeError>(())
//! ```
//!
//! Delivery is at-most-once with detectable gaps: a reader that falls more
//! than a ring behind jumps forward and tallies what it missed on its
//! `skipped` counter. Peers may crash at any point without poisoning the
//! region.

pub mod constants;
pub mod error;
pub mod health;
pub mod layout;
pub mod metrics;
pub mod region;
pub mod ring;
pub mod time;
pub mod wait;

pub use error::{Result, RetCode, SurgeError};
pub use health::{HealthProbe, HealthReport};
pub use layout::RingKind;
pub use metrics::{Metrics, MetricsSnapshot, METRICS};
pub use region::{RegionBuilder, SharedRegion, TopicConfig, TopicHandle};
pub use ring::{Consumed, MwmrPublisher, RingView, Sequence, Subscriber, SwmrPublisher};
pub use wait::{Backoff, Blocking, BusySpin, IdleStrategy, Sleeping, Yielding};
