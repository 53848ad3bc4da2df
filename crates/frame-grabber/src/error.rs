use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("device yielded no initial frame: {0}")]
    NoFrame(String),
    #[error("end of stream")]
    EndOfStream,
    #[error("grabber already stopped")]
    Stopped,
    #[error("worker error: {0}")]
    Worker(String),
    #[error("backend error: {0}")]
    Backend(String),
}
