use std::error;
use std::fmt::{self, Display};
use std::io;

/// Errors raised while loading the inputs of the compositor.
///
/// The per-pixel pipeline itself is total and never produces one of these.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Image(image::ImageError),
    Json(serde_json::Error),
    /// The atlas image cannot be split into the requested tile grid.
    InvalidTileset(String),
    InvalidConfig(String),
    /// No usable adapter or device.
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Image(err) => write!(f, "image error: {err}"),
            Error::Json(err) => write!(f, "config parse error: {err}"),
            Error::InvalidTileset(msg) => write!(f, "invalid tileset: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::Gpu(msg) => write!(f, "gpu error: {msg}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Image(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::InvalidTileset(_) | Error::InvalidConfig(_) | Error::Gpu(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
