use crate::channel_error;
use crate::error::ChannelError;
use anyhow::{anyhow, Result};
use url::{Host, Url};

/// Where a channel connects to, either a ready URL like `tcp://127.0.0.1:5555`
/// or a host and a port pair.
#[derive(Clone, Debug, PartialEq)]
pub enum Endpoint {
    Url(String),
    HostPort(String, u16),
}

impl From<&str> for Endpoint {
    fn from(value: &str) -> Self {
        Endpoint::Url(value.to_owned())
    }
}

impl From<String> for Endpoint {
    fn from(value: String) -> Self {
        Endpoint::Url(value)
    }
}

impl From<(&str, u16)> for Endpoint {
    fn from((host, port): (&str, u16)) -> Self {
        Endpoint::HostPort(host.to_owned(), port)
    }
}

impl From<(String, u16)> for Endpoint {
    fn from((host, port): (String, u16)) -> Self {
        Endpoint::HostPort(host, port)
    }
}

impl Endpoint {
    /// Turns the endpoint into a connection URL. Port 0 cannot be connected to.
    pub fn into_url(self) -> Result<String> {
        match self {
            Endpoint::HostPort(host, 0) => channel_error!(ChannelError::InvalidPortNumber(format!(
                "The port number for a channel cannot be 0 (host {})",
                host
            ))),
            Endpoint::HostPort(host, port) => Ok(format!("tcp://{}:{}", host, port)),
            Endpoint::Url(url) => {
                if let Ok(parsed) = Url::parse(&url) {
                    if parsed.port() == Some(0) {
                        return channel_error!(ChannelError::InvalidPortNumber(format!(
                            "The port number for a channel cannot be 0 ({})",
                            url
                        )));
                    }
                }

                Ok(url)
            }
        }
    }
}

/// Splits a `tcp://host:port` URL to host and port.
pub(crate) fn tcp_host_port(address: &str) -> Result<(String, u16)> {
    let url = Url::parse(address)?;

    if url.scheme() != "tcp" {
        return Err(anyhow!("Unsupported transport {} in {}", url.scheme(), address));
    }

    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_owned(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => return Err(anyhow!("No host in {}", address)),
    };
    let port = url.port().ok_or_else(|| anyhow!("No port in {}", address))?;

    Ok((host, port))
}
