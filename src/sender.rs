//! Sender state machine: burst, wait for acks, adapt, slide, repeat,
//! until the source is exhausted, then emit the end-of-stream marker.

use std::time::Instant;

use log::{debug, info, trace, warn};
use rand::random;

use crate::channel::DatagramChannel;
use crate::congestion::CongestionController;
use crate::err::Error;
use crate::io::ByteSource;
use crate::rtt::RttEstimator;
use crate::seq::Seq;
use crate::wire::{encode_data_packet, AckHeader, DataHeader, SeqOrEof, Timestamp, ACK_HEADER_LEN, MAX_PAYLOAD};

/// What the adapt phase should do after a burst, in strict priority
/// order: a burst-wide timeout always wins, then a fast-recovery
/// trigger observed during the burst, otherwise normal progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstOutcome {
    TimedOut,
    FastRecovery,
    Normal,
}

pub struct Sender<C, S> {
    channel: C,
    source: S,
    transfer_size: u64,
    clock: Instant,

    start_seq: Seq,
    start_file_pos: u64,
    last_ack: Seq,
    recvr_window: u64,

    rtt: RttEstimator,
    cc: CongestionController,
}

impl<C: DatagramChannel, S: ByteSource> Sender<C, S> {
    pub fn new(channel: C, source: S, transfer_size: u64) -> Self {
        let start_seq = Seq::new(random());
        Sender {
            channel,
            source,
            transfer_size,
            clock: Instant::now(),
            start_seq,
            start_file_pos: 0,
            last_ack: start_seq,
            recvr_window: 0,
            rtt: RttEstimator::new(),
            cc: CongestionController::new(),
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.clock.elapsed().as_micros() as i64)
    }

    /// Current congestion window, in packets. Exposed for observability
    /// and tests; not needed by the protocol itself once `run` returns.
    pub fn congestion_window(&self) -> u32 {
        self.cc.window()
    }

    /// Drives the transfer to completion: sends the whole source up to
    /// `transfer_size` bytes and the terminating EOF marker.
    pub fn run(&mut self) -> Result<(), Error> {
        self.channel.set_recv_timeout(self.rtt.timeout())?;
        self.source.seek_to(0)?;

        while self.start_file_pos < self.transfer_size {
            let packets_sent = self.transmit_burst()?;
            let outcome = self.collect_acks(packets_sent)?;

            match outcome {
                BurstOutcome::TimedOut => {
                    warn!("burst timed out, entering slow-start");
                    self.rtt.double_on_timeout();
                    if let Err((est, cap)) = self.rtt.check_terminal_cap() {
                        return Err(Error::RttExceeded(est, cap));
                    }
                }
                BurstOutcome::FastRecovery => debug!("fast recovery triggered"),
                BurstOutcome::Normal => trace!("burst completed normally"),
            }
            self.adapt(outcome);
            self.slide()?;
            self.channel.set_recv_timeout(self.rtt.timeout())?;
        }

        self.send_eof()?;
        info!("transfer complete, {} bytes sent", self.transfer_size);
        Ok(())
    }

    fn adapt(&mut self, outcome: BurstOutcome) {
        match outcome {
            BurstOutcome::TimedOut => self.cc.on_timeout(),
            BurstOutcome::FastRecovery => self.cc.on_fast_recovery(),
            BurstOutcome::Normal => self.cc.on_increase(),
        }
    }

    /// Sends as much of the current window as still needs sending.
    /// Returns the number of packets actually transmitted (slots the
    /// receiver has already acked are skipped and not counted).
    fn transmit_burst(&mut self) -> Result<u32, Error> {
        let window = self.cc.window();
        let mut packets_sent = 0u32;

        for i in 0..window as u8 {
            let slot_pos = self.start_file_pos + i as u64 * MAX_PAYLOAD as u64;
            if slot_pos >= self.transfer_size {
                break;
            }
            if (self.recvr_window >> i) & 1 == 1 {
                continue;
            }

            let seq = self.start_seq.add(i);
            self.send_chunk_at(seq, slot_pos)?;
            packets_sent += 1;
        }

        trace!("burst: window={} sent={}", window, packets_sent);
        Ok(packets_sent)
    }

    fn send_chunk_at(&mut self, seq: Seq, pos: u64) -> Result<(), Error> {
        self.source.seek_to(pos)?;
        let remaining = self.transfer_size - pos;
        let len = (MAX_PAYLOAD as u64).min(remaining) as usize;
        let chunk = self.source.read_chunk(len)?;

        let header = DataHeader {
            seq: SeqOrEof::Data(seq),
            timestamp: self.now(),
        };
        let packet = encode_data_packet(&header, &chunk);
        self.channel.send(&packet)?;
        Ok(())
    }

    fn collect_acks(&mut self, packets_sent: u32) -> Result<BurstOutcome, Error> {
        let mut buf = vec![0u8; ACK_HEADER_LEN];
        let mut dup_count = 0u32;
        let mut fast_recovery = false;

        let mut received = 0u32;
        while received < packets_sent {
            match self.channel.recv_timeout(&mut buf)? {
                None => return Ok(BurstOutcome::TimedOut),
                Some(n) => {
                    received += 1;
                    let ack = AckHeader::from_bytes(&buf[..n])
                        .map_err(|e| Error::MalformedPacket(e.to_string()))?;

                    let is_dup = ack.next_seq == self.last_ack;
                    if is_dup {
                        dup_count += 1;
                        if dup_count == 2 {
                            debug!("second duplicate ack for {:?}, fast retransmit", ack.next_seq);
                            self.fast_retransmit(ack.next_seq)?;
                            fast_recovery = true;
                        }
                    } else {
                        dup_count = 0;
                        let rtt_sample = self.now().as_micros() - ack.timestamp.as_micros();
                        self.rtt.sample(rtt_sample.max(0));
                    }

                    self.last_ack = ack.next_seq;
                    self.recvr_window = ack.window;
                }
            }
        }

        if fast_recovery {
            Ok(BurstOutcome::FastRecovery)
        } else {
            Ok(BurstOutcome::Normal)
        }
    }

    fn fast_retransmit(&mut self, expected: Seq) -> Result<(), Error> {
        let offset = expected.sub(self.start_seq) as u64;
        let pos = self.start_file_pos + offset * MAX_PAYLOAD as u64;
        if pos < self.transfer_size {
            self.send_chunk_at(expected, pos)?;
        }
        Ok(())
    }

    fn slide(&mut self) -> Result<(), Error> {
        let advance = self.last_ack.sub(self.start_seq) as u64;
        self.start_file_pos += advance * MAX_PAYLOAD as u64;
        self.start_seq = self.last_ack;
        self.source.seek_to(self.start_file_pos)?;
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), Error> {
        let header = DataHeader {
            seq: SeqOrEof::Eof,
            timestamp: self.now(),
        };
        let packet = encode_data_packet(&header, &[]);
        for _ in 0..4 {
            self.channel.send(&packet)?;
        }
        Ok(())
    }
}
