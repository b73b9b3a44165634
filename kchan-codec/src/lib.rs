//! Wire framing and message model of the kernel messaging protocol.
//!
//! The `codec` module frames multipart messages on a byte stream and `session`
//! turns messages into multipart frames and back. Outgoing messages for kernels
//! speaking an older protocol version are rendered by `adapter`.
pub mod adapter;
pub mod codec;
pub mod content;
pub mod message;
pub mod session;
pub mod validate;


use std::fmt;

pub use message::{Header, Message, MAJOR_PROTOCOL_VERSION, PROTOCOL_VERSION};
pub use session::{Session, DELIM};
pub use validate::{validate_string_dict, validate_string_list, ValueError};

/// Type alias for a simplified Result with `WireError`.
pub type Result<T> = std::result::Result<T, WireError>;

/// Error of turning frames into messages or messages into frames.
#[derive(Debug)]
pub struct WireError {
    pub message: String,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wire error: {}", self.message)
    }
}

impl std::error::Error for WireError {}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        WireError {
            message: format!("invalid JSON part: {err}"),
        }
    }
}

/// Shorthand for making wire errors with a formatted message.
///
/// ```no_run
/// use kchan_codec::wire_error;
///
/// fn part(frames: &[Vec<u8>], index: usize) -> kchan_codec::Result<&[u8]> {
///     match frames.get(index) {
///         Some(f) => Ok(f.as_slice()),
///         None => wire_error!("missing part {}", index),
///     }
/// }
/// ```
#[macro_export]
macro_rules! wire_error {
    ($($arg:tt)*) => {
        ::std::result::Result::Err($crate::WireError {
            message: ::std::format!($($arg)*),
        })
    };
}
