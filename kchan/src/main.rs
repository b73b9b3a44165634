mod config;
mod console;

use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use kchan_client::{BlockingClient, ConnectionInfo, Session, TcpContext};
use log::{info, warn};
use std::io::Write;
use std::sync::Arc;

fn setup_logger() {
    let mut builder = Builder::from_default_env();

    builder
        .format_timestamp_millis()
        .format(|buf, record| {
            let lvl = buf.default_level_style(record.level()).bold();

            writeln!(
                buf,
                "{} - [{lvl}{:5}{lvl:#}] {}:{} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or_default(),
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Always)
        .init();
}

fn main() -> Result<()> {
    setup_logger();

    let cli = config::Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    let info = ConnectionInfo::from_file(&cli.existing)?;
    if !info.key.is_empty() {
        warn!("Messages are not signed, the kernel may reject them");
    }

    let heartbeat = config.heartbeat.config();
    let context = Arc::new(TcpContext::new()?);
    let mut client = BlockingClient::with_heartbeat(context, Arc::new(Session::new()), &info, heartbeat)?;

    client.start_channels()?;
    client.wait_for_ready(config.timeouts.ready())?;

    let msg_id = client.kernel_info()?;
    let reply = client.get_shell_reply(&msg_id, Some(config.timeouts.reply()))?;

    info!(
        "Connected to {} kernel, protocol {}",
        reply.content["implementation"].as_str().unwrap_or("unknown"),
        reply.content_str("protocol_version").unwrap_or("?")
    );

    if let Some(banner) = reply.content_str("banner") {
        println!("{}", banner);
    }

    let res = match cli.execute {
        Some(code) => console::run_cell(&mut client, &config, &code).map(|_| ()),
        None => console::repl(&mut client, &config),
    };

    client.stop_channels();

    res
}
