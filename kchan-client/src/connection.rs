use crate::address::Endpoint;
use anyhow::{Context, Result};
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

/// Content of a kernel connection file: where the kernel listens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default = "default_transport")]
    pub transport: String,
    pub shell_port: u16,
    pub iopub_port: u16,
    pub stdin_port: u16,
    #[serde(default)]
    pub control_port: u16,
    pub hb_port: u16,
    /// Key of message signing, empty if messages are not signed.
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_signature_scheme")]
    pub signature_scheme: String,
    #[serde(default)]
    pub kernel_name: String,
}

fn default_ip() -> String {
    "127.0.0.1".to_owned()
}

fn default_transport() -> String {
    "tcp".to_owned()
}

fn default_signature_scheme() -> String {
    "hmac-sha256".to_owned()
}

impl ConnectionInfo {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read connection file {}", path.display()))?;

        Self::from_json(&json).with_context(|| format!("Invalid connection file {}", path.display()))
    }

    /// Endpoint of a port with the transport of the kernel.
    pub fn endpoint(&self, port: u16) -> Endpoint {
        match self.transport.as_str() {
            "tcp" => Endpoint::HostPort(self.ip.clone(), port),
            transport => Endpoint::Url(format!("{}://{}-{}", transport, self.ip, port)),
        }
    }

    pub fn shell_endpoint(&self) -> Endpoint {
        self.endpoint(self.shell_port)
    }

    pub fn iopub_endpoint(&self) -> Endpoint {
        self.endpoint(self.iopub_port)
    }

    pub fn stdin_endpoint(&self) -> Endpoint {
        self.endpoint(self.stdin_port)
    }

    pub fn hb_endpoint(&self) -> Endpoint {
        self.endpoint(self.hb_port)
    }
}
