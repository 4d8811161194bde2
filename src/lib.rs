pub mod channel;
pub mod congestion;
pub mod err;
pub mod io;
pub mod receiver;
pub mod rtt;
pub mod sender;
pub mod seq;
pub mod wire;

pub use channel::{DatagramChannel, UdpChannel};
pub use err::Error;
pub use io::{ByteSink, ByteSource, FileSink, FileSource};
pub use receiver::Receiver;
pub use sender::Sender;
