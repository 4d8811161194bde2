#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("rtt estimate exceeded terminal cap ({0:?} > {1:?})")]
    RttExceeded(std::time::Duration, std::time::Duration),
}
