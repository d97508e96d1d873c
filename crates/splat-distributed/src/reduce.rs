//! Tree reduction of per-worker framebuffers (spec.md §4.I step 6),
//! grounded on `examples/original_source/src/main_mpi.cpp`'s `jump` loop.
//!
//! Each round doubles `jump`; a rank either receives from `rank + jump` and
//! folds it in with [`Framebuffer::combine`], or sends to `rank - jump` and
//! drops out of the reduction. After `ceil(log2(size))` rounds rank 0 holds
//! the fully composited image. The distributed depth sort guarantees that
//! whatever a higher rank holds is strictly farther from the camera, so
//! `combine(received)` always composites in the correct front-to-back order.

use splat_render::Framebuffer;

use crate::transport::{TAG_FRAMEBUFFER_ALPHA, TAG_FRAMEBUFFER_COLOR, Transport, TransportError};

fn send_framebuffer(fb: &Framebuffer, dest: usize, transport: &dyn Transport) -> Result<(), TransportError> {
    transport.send(&fb.image_to_bytes(), dest, TAG_FRAMEBUFFER_COLOR)?;
    transport.send(&fb.alpha_to_bytes(), dest, TAG_FRAMEBUFFER_ALPHA)?;
    Ok(())
}

fn recv_framebuffer(
    width: u32,
    height: u32,
    src: usize,
    transport: &dyn Transport,
) -> Result<Framebuffer, TransportError> {
    let mut image_bytes = vec![0u8; (width as usize) * (height as usize) * 12];
    let mut alpha_bytes = vec![0u8; (width as usize) * (height as usize) * 4];
    transport.recv(&mut image_bytes, src, TAG_FRAMEBUFFER_COLOR)?;
    transport.recv(&mut alpha_bytes, src, TAG_FRAMEBUFFER_ALPHA)?;
    Ok(Framebuffer::from_raw_bytes(width, height, &image_bytes, &alpha_bytes))
}

/// Performs the tree reduction, consuming `local` (this rank's rendered
/// framebuffer). Returns `Some(composited)` on rank 0, `None` on every
/// other rank, which has sent its contribution upstream and dropped out.
pub fn tree_reduce_framebuffers(
    mut local: Framebuffer,
    transport: &dyn Transport,
) -> Result<Option<Framebuffer>, TransportError> {
    let rank = transport.rank();
    let size = transport.size();
    let (width, height) = (local.width(), local.height());

    let mut jump = 1;
    while jump < size {
        let _span = tracing::trace_span!("tree_reduce_round", jump).entered();
        if rank % (jump * 2) == 0 {
            let sender = rank + jump;
            if sender < size {
                let behind = recv_framebuffer(width, height, sender, transport)?;
                local.combine(&behind);
            }
        } else if rank % (jump * 2) == jump {
            send_framebuffer(&local, rank - jump, transport)?;
            return Ok(None);
        }
        jump *= 2;
    }

    if rank == 0 { Ok(Some(local)) } else { Ok(None) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_transport::ChannelTransport;
    use std::thread;

    /// A one-pixel framebuffer with `alpha = remaining_alpha` and whatever
    /// color that residual weight implies was already composited, built via
    /// the public byte round-trip rather than the crate-private `accumulate`.
    fn one_pixel(color: (f32, f32, f32), alpha: f32) -> Framebuffer {
        let mut image_bytes = Vec::new();
        image_bytes.extend_from_slice(&color.0.to_le_bytes());
        image_bytes.extend_from_slice(&color.1.to_le_bytes());
        image_bytes.extend_from_slice(&color.2.to_le_bytes());
        let alpha_bytes = alpha.to_le_bytes().to_vec();
        Framebuffer::from_raw_bytes(1, 1, &image_bytes, &alpha_bytes)
    }

    #[test]
    fn two_workers_reduce_to_rank_zero() {
        let transports = ChannelTransport::mesh(2);
        let mut iter = transports.into_iter();
        let rank0 = iter.next().expect("rank 0");
        let rank1 = iter.next().expect("rank 1");

        let near = Framebuffer::new(1, 1); // rank 0: nothing drawn yet
        let far = one_pixel((0.0, 0.0, 0.5), 0.5); // rank 1: behind content

        let handle1 = thread::spawn(move || tree_reduce_framebuffers(far, &rank1));
        let near_result = tree_reduce_framebuffers(near, &rank0).expect("rank 0 reduce");
        let far_result = handle1.join().expect("rank 1 thread").expect("rank 1 reduce");

        assert!(far_result.is_none(), "non-zero rank returns None");
        let composited = near_result.expect("rank 0 returns Some");
        assert_eq!(composited.image_at(0, 0), (0.0, 0.0, 0.5));
        assert_eq!(composited.alpha_at(0, 0), 0.5);
    }

    #[test]
    fn single_worker_reduces_to_itself() {
        let transports = ChannelTransport::mesh(1);
        let transport = transports.into_iter().next().expect("rank 0");
        let fb = one_pixel((1.0, 1.0, 1.0), 0.0);
        let result = tree_reduce_framebuffers(fb, &transport).expect("reduce");
        assert!(result.is_some());
    }
}
