//! Distributed render/composite protocol (spec.md §4.I): partitions the
//! primitive set across `W` workers via a distributed depth sort, renders
//! each worker's slice with `splat_render::render_frame`, and tree-reduces
//! the per-worker framebuffers back to rank 0.

pub mod channel_transport;
pub mod driver;
pub mod reduce;
pub mod sort;
pub mod transport;

pub use channel_transport::ChannelTransport;
pub use driver::{DriverError, run_frame};
pub use transport::{TAG_FRAMEBUFFER_ALPHA, TAG_FRAMEBUFFER_COLOR, TAG_SORT, Tag, Transport, TransportError};
