use std::process;
use std::time::Duration;

use rudp::channel::UdpChannel;
use rudp::io::FileSink;
use rudp::receiver::Receiver;

const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: {} <udp_port> <filename_to_write>", args[0]);
        process::exit(1);
    }

    let port: u16 = match args[1].parse() {
        Ok(p) => p,
        Err(_) => {
            eprintln!("udp_port must be a valid port number");
            process::exit(1);
        }
    };
    let path = &args[2];

    let channel = match UdpChannel::bind(port) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to bind udp port {port}: {e}");
            process::exit(1);
        }
    };

    let sink = match FileSink::create(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to create {path}: {e}");
            process::exit(1);
        }
    };

    let mut receiver = Receiver::new(channel, sink, IDLE_TIMEOUT);
    if let Err(e) = receiver.run() {
        eprintln!("receive failed: {e}");
        process::exit(1);
    }
}
