//! In-process [`Transport`] over `std::sync::mpsc`, simulating `W` workers as
//! `W` OS threads within a single process. The spec treats the transport as
//! an external collaborator specified only at its interface (spec.md §6);
//! this is this repo's concrete instance of that interface, used by the CLI
//! for single-machine runs and by tests that exercise multi-rank behavior
//! without an actual MPI install.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::transport::{Tag, Transport, TransportError};

struct Envelope {
    tag: Tag,
    bytes: Vec<u8>,
}

/// One rank's endpoint into an all-to-all mesh of channels built by
/// [`ChannelTransport::mesh`].
pub struct ChannelTransport {
    rank: usize,
    size: usize,
    senders: Vec<Option<Sender<Envelope>>>,
    receivers: Vec<Option<Mutex<Receiver<Envelope>>>>,
    // Messages received out of tag order are buffered here per source rank;
    // the protocols in this crate never interleave more than two tags
    // between the same pair of ranks, so this never grows unbounded.
    pending: Vec<Mutex<VecDeque<Envelope>>>,
}

impl ChannelTransport {
    /// Builds `size` endpoints wired into a full mesh: every ordered pair
    /// `(src, dest)` with `src != dest` gets its own channel.
    pub fn mesh(size: usize) -> Vec<ChannelTransport> {
        assert!(size > 0, "a transport mesh needs at least one rank");

        let mut senders: Vec<Vec<Option<Sender<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for src in 0..size {
            for dest in 0..size {
                if src == dest {
                    continue;
                }
                let (tx, rx) = channel();
                senders[src][dest] = Some(tx);
                receivers[dest][src] = Some(rx);
            }
        }

        (0..size)
            .map(|rank| ChannelTransport {
                rank,
                size,
                senders: std::mem::take(&mut senders[rank]),
                receivers: std::mem::take(&mut receivers[rank])
                    .into_iter()
                    .map(|r| r.map(Mutex::new))
                    .collect(),
                pending: (0..size).map(|_| Mutex::new(VecDeque::new())).collect(),
            })
            .collect()
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, buf: &[u8], dest: usize, tag: Tag) -> Result<(), TransportError> {
        let sender = self.senders[dest].as_ref().ok_or_else(|| TransportError::Send {
            dest,
            tag,
            reason: "no channel to destination rank".to_string(),
        })?;
        sender
            .send(Envelope {
                tag,
                bytes: buf.to_vec(),
            })
            .map_err(|e| TransportError::Send {
                dest,
                tag,
                reason: e.to_string(),
            })
    }

    fn recv(&self, buf: &mut [u8], src: usize, tag: Tag) -> Result<(), TransportError> {
        let mut pending = self.pending[src].lock().expect("pending queue poisoned");
        if let Some(pos) = pending.iter().position(|e| e.tag == tag) {
            let envelope = pending.remove(pos).expect("position was just found");
            return copy_into(buf, envelope, src, tag);
        }
        drop(pending);

        let receiver = self.receivers[src].as_ref().ok_or_else(|| TransportError::Recv {
            src,
            tag,
            reason: "no channel from source rank".to_string(),
        })?;
        let receiver = receiver.lock().expect("receiver mutex poisoned");
        loop {
            let envelope = receiver.recv().map_err(|e| TransportError::Recv {
                src,
                tag,
                reason: e.to_string(),
            })?;
            if envelope.tag == tag {
                return copy_into(buf, envelope, src, tag);
            }
            self.pending[src]
                .lock()
                .expect("pending queue poisoned")
                .push_back(envelope);
        }
    }
}

fn copy_into(buf: &mut [u8], envelope: Envelope, src: usize, tag: Tag) -> Result<(), TransportError> {
    if envelope.bytes.len() != buf.len() {
        return Err(TransportError::ShortRead {
            src,
            tag,
            expected: buf.len(),
            got: envelope.bytes.len(),
        });
    }
    buf.copy_from_slice(&envelope.bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_round_trips_a_message() {
        let mut ranks = ChannelTransport::mesh(2);
        let rank1 = ranks.pop().expect("rank 1");
        let rank0 = ranks.pop().expect("rank 0");

        let sender = std::thread::spawn(move || {
            rank0.send(&[1, 2, 3, 4], 1, 7).unwrap();
        });
        let mut buf = [0u8; 4];
        rank1.recv(&mut buf, 0, 7).unwrap();
        sender.join().unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn out_of_order_tags_are_buffered() {
        let mut ranks = ChannelTransport::mesh(2);
        let rank1 = ranks.pop().expect("rank 1");
        let rank0 = ranks.pop().expect("rank 0");

        let sender = std::thread::spawn(move || {
            rank0.send(&[9], 1, 2).unwrap();
            rank0.send(&[5], 1, 1).unwrap();
        });
        let mut buf = [0u8; 1];
        // Ask for tag 1 first even though tag 2 arrives first on the wire.
        rank1.recv(&mut buf, 0, 1).unwrap();
        assert_eq!(buf, [5]);
        rank1.recv(&mut buf, 0, 2).unwrap();
        assert_eq!(buf, [9]);
        sender.join().unwrap();
    }
}
