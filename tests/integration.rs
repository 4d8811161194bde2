//! End-to-end scenarios driving a real `Sender`/`Receiver` pair over an
//! in-memory, shapeable link: one thread per peer, connected through
//! `std::sync::mpsc` channels that can drop, duplicate, or reorder the
//! sender's data packets before they reach the receiver. Acks flow back
//! unshaped, since none of the scenarios below exercise ack loss.

use std::io;
use std::net::SocketAddr;
use std::sync::mpsc::{channel, Receiver as MpscReceiver, Sender as MpscSender};
use std::thread;
use std::time::Duration;

use rudp::channel::DatagramChannel;
use rudp::io::{MemSink, MemSource};
use rudp::receiver::Receiver as RudpReceiver;
use rudp::sender::Sender as RudpSender;
use rudp::wire::MAX_PAYLOAD;

/// One packet arriving at the shaping relay: its zero-based send index
/// and its bytes. A shaper decides how many copies (zero, one, or more)
/// actually make it to the other side, and in what order.
trait Shaper: Send {
    fn on_packet(&mut self, index: usize, packet: Vec<u8>) -> Vec<Vec<u8>>;

    /// Called once the sender side has hung up; lets a shaper that is
    /// holding packets back (for reordering) flush them.
    fn on_flush(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }
}

struct Identity;
impl Shaper for Identity {
    fn on_packet(&mut self, _index: usize, packet: Vec<u8>) -> Vec<Vec<u8>> {
        vec![packet]
    }
}

struct DropIndices(Vec<usize>);
impl Shaper for DropIndices {
    fn on_packet(&mut self, index: usize, packet: Vec<u8>) -> Vec<Vec<u8>> {
        if self.0.contains(&index) {
            Vec::new()
        } else {
            vec![packet]
        }
    }
}

struct DuplicateAll;
impl Shaper for DuplicateAll {
    fn on_packet(&mut self, _index: usize, packet: Vec<u8>) -> Vec<Vec<u8>> {
        vec![packet.clone(), packet]
    }
}

/// Swaps every adjacent pair of packets: 0,1,2,3,... is delivered as
/// 1,0,3,2,... A trailing unpaired packet is released on flush.
#[derive(Default)]
struct ReorderAdjacentPairs {
    held: Option<Vec<u8>>,
}
impl Shaper for ReorderAdjacentPairs {
    fn on_packet(&mut self, _index: usize, packet: Vec<u8>) -> Vec<Vec<u8>> {
        match self.held.take() {
            Some(prev) => vec![packet, prev],
            None => {
                self.held = Some(packet);
                Vec::new()
            }
        }
    }

    fn on_flush(&mut self) -> Vec<Vec<u8>> {
        self.held.take().into_iter().collect()
    }
}

struct LinkEndpoint {
    tx: MpscSender<Vec<u8>>,
    rx: MpscReceiver<Vec<u8>>,
    timeout: Duration,
}

impl DatagramChannel for LinkEndpoint {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.tx
            .send(bytes.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
    }

    fn recv_timeout(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.rx.recv_timeout(self.timeout) {
            Ok(datagram) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(Some(n))
            }
            Err(_) => Ok(None),
        }
    }

    fn set_recv_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn set_peer(&mut self, _addr: SocketAddr) {}
    fn pin_peer_to_last_sender(&mut self) {}
}

/// Builds a sender-side and receiver-side endpoint connected through a
/// relay thread that applies `shaper` to every sender->receiver
/// datagram. Acks (receiver->sender) pass straight through.
fn make_link(mut shaper: impl Shaper + 'static) -> (LinkEndpoint, LinkEndpoint) {
    let (s2r_tx, s2r_rx) = channel::<Vec<u8>>();
    let (shaped_tx, shaped_rx) = channel::<Vec<u8>>();
    let (r2s_tx, r2s_rx) = channel::<Vec<u8>>();

    thread::spawn(move || {
        let mut index = 0usize;
        loop {
            match s2r_rx.recv() {
                Ok(packet) => {
                    for copy in shaper.on_packet(index, packet) {
                        if shaped_tx.send(copy).is_err() {
                            return;
                        }
                    }
                    index += 1;
                }
                Err(_) => {
                    for copy in shaper.on_flush() {
                        let _ = shaped_tx.send(copy);
                    }
                    return;
                }
            }
        }
    });

    let sender_side = LinkEndpoint {
        tx: s2r_tx,
        rx: r2s_rx,
        timeout: Duration::from_millis(500),
    };
    let receiver_side = LinkEndpoint {
        tx: r2s_tx,
        rx: shaped_rx,
        timeout: Duration::from_millis(500),
    };
    (sender_side, receiver_side)
}

/// Runs a sender over `data` and a receiver against each other through
/// a shaped link. Returns the bytes the receiver actually wrote and the
/// sender's congestion window as it stood after the last burst, so
/// callers can assert on the controller's trajectory, not just delivery.
fn run_transfer(data: Vec<u8>, shaper: impl Shaper + 'static) -> (Vec<u8>, u32) {
    let (sender_chan, receiver_chan) = make_link(shaper);
    let len = data.len() as u64;

    let sender_thread = thread::spawn(move || {
        let mut sender = RudpSender::new(sender_chan, MemSource::new(data), len);
        sender.run().expect("sender failed");
        sender.congestion_window()
    });

    let receiver_thread = thread::spawn(move || {
        let mut receiver = RudpReceiver::new(receiver_chan, MemSink::new(), Duration::from_secs(2));
        receiver.run().expect("receiver failed");
        receiver.into_sink().data
    });

    let final_window = sender_thread.join().expect("sender panicked");
    let received = receiver_thread.join().expect("receiver panicked");
    (received, final_window)
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn s1_perfect_channel_small_file() {
    let data = pattern(3_000);
    let (received, window) = run_transfer(data.clone(), Identity);
    assert_eq!(received, data);
    // two data packets, no loss: window starts at 1 and doubles once.
    assert!(
        (2..=3).contains(&window),
        "expected window_size in 2..=3, got {window}"
    );
}

#[test]
fn s2_single_packet_loss_mid_stream() {
    let data = pattern(200_000);
    // drop the 50th data packet (0-indexed 49)
    let (received, window) = run_transfer(data.clone(), DropIndices(vec![49]));
    assert_eq!(received, data);
    // a fast retransmit halves window/optimal but never collapses to 1.
    assert!(window >= 1, "fast recovery should not collapse below 1, got {window}");
}

#[test]
fn s3_burst_loss_of_ten_consecutive_packets() {
    let data = pattern(200_000);
    let dropped: Vec<usize> = (100..110).collect();
    let (received, window) = run_transfer(data.clone(), DropIndices(dropped));
    assert_eq!(received, data);
    // the burst-wide timeout this induces forces slow-start (window = 1)
    // at least once; by the end of the transfer it has grown back up,
    // but never past the hard cap W = 64.
    assert!(
        (1..=64).contains(&window),
        "window_size must stay within [1, 64], got {window}"
    );
}

#[test]
fn s4_full_reordering() {
    let data = pattern(100_000);
    let (received, _window) = run_transfer(data.clone(), ReorderAdjacentPairs::default());
    assert_eq!(received, data);
}

#[test]
fn s5_full_duplication() {
    let data = pattern(100_000);
    let (received, _window) = run_transfer(data.clone(), DuplicateAll);
    assert_eq!(received, data);
}

#[test]
fn s6_sequence_wrap_around() {
    // at least 2 * MODULUS * MAX_PAYLOAD so the sequence space wraps twice
    let len = 2 * 256 * MAX_PAYLOAD + 12_345;
    let data = pattern(len);
    let (received, _window) = run_transfer(data.clone(), Identity);
    assert_eq!(received, data);
}
