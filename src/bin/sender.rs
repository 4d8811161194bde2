use std::process;

use rudp::channel::UdpChannel;
use rudp::io::FileSource;
use rudp::sender::Sender;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 {
        eprintln!(
            "usage: {} <receiver_host> <receiver_port> <filename_to_xfer> <bytes_to_xfer>",
            args[0]
        );
        process::exit(1);
    }

    let host = &args[1];
    let port: u16 = match args[2].parse() {
        Ok(p) => p,
        Err(_) => {
            eprintln!("receiver_port must be a valid port number");
            process::exit(1);
        }
    };
    let path = &args[3];
    let bytes_to_xfer: u64 = match args[4].parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("bytes_to_xfer must be a non-negative integer");
            process::exit(1);
        }
    };

    let channel = match UdpChannel::connect(0, (host.as_str(), port)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to open udp channel: {e}");
            process::exit(1);
        }
    };

    let source = match FileSource::open(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to open {path}: {e}");
            process::exit(1);
        }
    };

    let mut sender = Sender::new(channel, source, bytes_to_xfer);
    if let Err(e) = sender.run() {
        eprintln!("transfer failed: {e}");
        process::exit(1);
    }
}
