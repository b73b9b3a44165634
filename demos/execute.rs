use anyhow::Result;
use kchan_client::{is_empty, BlockingClient, ConnectionInfo, ExecuteOptions, Session, TcpContext};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "kernel.json".to_owned());
    let info = ConnectionInfo::from_file(&path)?;

    let mut client = BlockingClient::new(Arc::new(TcpContext::new()?), Arc::new(Session::new()), &info)?;

    client.start_channels()?;
    client.wait_for_ready(Duration::from_secs(10))?;

    let options = ExecuteOptions::default().user_expressions(json!({"double": "x * 2"}));
    let msg_id = client.execute("x = 21", &options)?;

    let reply = client.get_shell_reply(&msg_id, Some(Duration::from_secs(10)))?;
    println!("status: {}", reply.content_str("status").unwrap_or("?"));
    println!("user expressions: {}", reply.content["user_expressions"]);

    loop {
        match client.get_iopub_msg(true, Some(Duration::from_millis(500))) {
            Ok(msg) => println!("iopub {} {}", msg.msg_type(), msg.content),
            Err(e) if is_empty(&e) => break,
            Err(e) => return Err(e),
        }
    }

    client.stop_channels();

    Ok(())
}
