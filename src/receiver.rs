//! Receiver state machine: accept data packets into a sliding window,
//! write each chunk at its correct offset, slide the window forward as
//! the base fills in, and reply with a selective-ack bit map each time.

use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::channel::DatagramChannel;
use crate::err::Error;
use crate::io::ByteSink;
use crate::seq::{Seq, WINDOW};
use crate::wire::{decode_data_packet, AckHeader, SeqOrEof, MAX_PACKET, MAX_PAYLOAD};

pub struct Receiver<C, K> {
    channel: C,
    sink: K,
    idle_timeout: Duration,

    next_seq: Option<Seq>,
    window: u64,
    sink_pos: u64,
}

impl<C: DatagramChannel, K: ByteSink> Receiver<C, K> {
    pub fn new(channel: C, sink: K, idle_timeout: Duration) -> Self {
        Receiver {
            channel,
            sink,
            idle_timeout,
            next_seq: None,
            window: 0,
            sink_pos: 0,
        }
    }

    /// Consumes the receiver, yielding the underlying sink. Useful once
    /// `run` has returned and the transferred bytes need inspecting.
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Runs until the sender's EOF marker arrives or the peer goes
    /// quiet for longer than `idle_timeout`.
    pub fn run(&mut self) -> Result<(), Error> {
        self.channel.set_recv_timeout(self.idle_timeout)?;
        let mut buf = vec![0u8; MAX_PACKET];
        let start = Instant::now();

        loop {
            let n = match self.channel.recv_timeout(&mut buf)? {
                None => {
                    warn!("idle for {:?}, giving up on peer", self.idle_timeout);
                    return Ok(());
                }
                Some(n) => n,
            };

            let (header, payload) = decode_data_packet(&buf[..n])
                .map_err(|e| Error::MalformedPacket(e.to_string()))?;

            if self.next_seq.is_none() {
                self.channel.pin_peer_to_last_sender();
            }

            if header.seq == SeqOrEof::Eof {
                info!("eof received after {:?}", start.elapsed());
                return Ok(());
            }

            let seq = match header.seq {
                SeqOrEof::Data(s) => s,
                SeqOrEof::Eof => unreachable!(),
            };

            self.save_data(seq, payload)?;
            self.respond(header.timestamp)?;
        }
    }

    fn save_data(&mut self, seq: Seq, payload: &[u8]) -> Result<(), Error> {
        let base = *self.next_seq.get_or_insert(seq);
        let offset = seq.sub(base);

        if offset as u16 >= WINDOW as u16 {
            trace!("discarding out-of-window packet seq={:?}", seq);
            return Ok(());
        }
        if (self.window >> offset) & 1 == 1 {
            trace!("discarding duplicate packet seq={:?}", seq);
            return Ok(());
        }

        if offset == 0 {
            self.window |= 1;
            self.sink.write_at(self.sink_pos, payload)?;
            let slide = self.window.trailing_ones().min(WINDOW as u32) as u8;
            self.window = self.window.checked_shr(slide as u32).unwrap_or(0);
            self.sink_pos += slide as u64 * MAX_PAYLOAD as u64;
            self.next_seq = Some(base.add(slide));
            debug!("window advanced by {} to {:?}", slide, self.next_seq);
        } else {
            let pos = self.sink_pos + offset as u64 * MAX_PAYLOAD as u64;
            self.sink.write_at(pos, payload)?;
            self.window |= 1 << offset;
        }

        Ok(())
    }

    fn respond(&mut self, echoed_timestamp: crate::wire::Timestamp) -> Result<(), Error> {
        let header = AckHeader {
            next_seq: self.next_seq.expect("set by save_data before respond is called"),
            timestamp: echoed_timestamp,
            window: self.window,
        };
        self.channel.send(&header.to_bytes())?;
        Ok(())
    }
}
