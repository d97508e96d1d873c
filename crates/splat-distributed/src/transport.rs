//! Abstract inter-worker message transport (spec.md §6: "modeled here as an
//! abstract `Transport` with send/receive of byte buffers between ranks").
//!
//! The core never depends on a concrete network layer, only on this trait,
//! so the same driver runs against MPI, TCP, or an in-process channel pair.

/// Opaque per-message tag. The distributed sort and the framebuffer
/// reduction each reserve their own tag so unrelated exchanges between the
/// same pair of ranks can never be confused.
pub type Tag = u32;

pub const TAG_SORT: Tag = 0;
pub const TAG_FRAMEBUFFER_COLOR: Tag = 1;
pub const TAG_FRAMEBUFFER_ALPHA: Tag = 2;

/// Everything that can go wrong at the transport boundary. Fatal per spec.md
/// §7: "Transport send/recv failure ... fatal; abort frame."
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("send to rank {dest} (tag {tag}) failed: {reason}")]
    Send {
        dest: usize,
        tag: Tag,
        reason: String,
    },
    #[error("recv from rank {src} (tag {tag}) failed: {reason}")]
    Recv {
        src: usize,
        tag: Tag,
        reason: String,
    },
    #[error("recv from rank {src} (tag {tag}) returned {got} bytes, expected {expected}")]
    ShortRead {
        src: usize,
        tag: Tag,
        expected: usize,
        got: usize,
    },
}

/// Minimal blocking message-passing interface between `size()` peer workers
/// (spec.md §6). All sends/receives are paired and typed by `(source, dest,
/// tag)`. `barrier()` is optional in the sense that no operation in this
/// crate currently requires it, but it is part of the contract.
pub trait Transport {
    /// This process's rank in `[0, size())`.
    fn rank(&self) -> usize;

    /// Total number of cooperating workers.
    fn size(&self) -> usize;

    /// Blocking send of `buf` to `dest`, tagged `tag`.
    fn send(&self, buf: &[u8], dest: usize, tag: Tag) -> Result<(), TransportError>;

    /// Blocking receive of exactly `buf.len()` bytes from `src`, tagged `tag`.
    fn recv(&self, buf: &mut [u8], src: usize, tag: Tag) -> Result<(), TransportError>;

    /// Synchronizes all workers. A no-op is a valid implementation when the
    /// driver's send/recv pairing already enforces the needed ordering.
    fn barrier(&self) {}
}
