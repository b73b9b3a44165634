use anyhow::Result;
use kchan_client::{BlockingClient, ConnectionInfo, Session, TcpContext};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "kernel.json".to_owned());
    let info = ConnectionInfo::from_file(&path)?;

    let mut client = BlockingClient::new(Arc::new(TcpContext::new()?), Arc::new(Session::new()), &info)?;

    client.start_channels()?;
    client.wait_for_ready(Duration::from_secs(10))?;

    let msg_id = client.kernel_info()?;
    let reply = client.get_shell_reply(&msg_id, Some(Duration::from_secs(5)))?;

    println!("{}", serde_json::to_string_pretty(&reply.content)?);
    println!("adapted to protocol {:?}", client.session().adapt_version());

    client.stop_channels();

    Ok(())
}
