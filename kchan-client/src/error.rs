use std::fmt;

/// Errors of the channel layer.
///
/// Functions return them wrapped in `anyhow::Error`, callers who need to tell them
/// apart downcast the error (see [`is_empty`]).
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelError {
    /// The port of a channel address is 0.
    InvalidPortNumber(String),
    /// No message is ready at the moment. It is not a failure, the caller should
    /// try again later.
    Empty,
    /// The channel has no socket, it is not started or already closed.
    NotConnected(String),
    /// The other end of the socket is gone, no message will arrive any more.
    Disconnected(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::InvalidPortNumber(msg) => write!(f, "invalid port number: {}", msg),
            ChannelError::Empty => f.write_str("no message is ready"),
            ChannelError::NotConnected(address) => write!(f, "channel {} is not connected", address),
            ChannelError::Disconnected(role) => write!(f, "peer of the {} socket disconnected", role),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Shorthand for returning channel errors.
#[macro_export]
macro_rules! channel_error {
    ($err:expr) => {
        ::std::result::Result::Err(anyhow::Error::new($err))
    };
}

/// Is this error the `Empty` signal of a receive?
pub fn is_empty(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ChannelError>(), Some(ChannelError::Empty))
}
