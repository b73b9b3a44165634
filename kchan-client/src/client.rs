use crate::channel::{HeartbeatChannel, HeartbeatConfig, IOPubChannel, KernelChannel, ShellChannel, StdInChannel};
use crate::connection::ConnectionInfo;
use crate::error::is_empty;
use crate::socket::SocketFactory;
use anyhow::{anyhow, Result};
use kchan_codec::content::{self, ExecuteOptions, HistoryAccess};
use kchan_codec::message::{
    COMPLETE_REQUEST, EXECUTE_REQUEST, HISTORY_REQUEST, INSPECT_REQUEST, KERNEL_INFO_REPLY, KERNEL_INFO_REQUEST,
    SHUTDOWN_REQUEST,
};
use kchan_codec::{Message, Session};
use log::{debug, info, trace};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A client of one kernel, owning the shell, iopub, stdin and heartbeat channels.
///
/// Requests are sent on the shell channel and return the id of the request
/// message, the replies have to be picked up from the channels.
///
/// ```no_run
/// use kchan_client::{BlockingClient, ConnectionInfo, Session, TcpContext};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// fn kernel_banner(path: &str) -> anyhow::Result<String> {
///     let info = ConnectionInfo::from_file(path)?;
///     let mut client = BlockingClient::new(Arc::new(TcpContext::new()?), Arc::new(Session::new()), &info)?;
///
///     client.start_channels()?;
///     client.wait_for_ready(Duration::from_secs(10))?;
///
///     let msg_id = client.kernel_info()?;
///     let reply = client.get_shell_reply(&msg_id, Some(Duration::from_secs(5)))?;
///
///     Ok(reply.content_str("banner").unwrap_or_default().to_owned())
/// }
/// ```
#[derive(Debug)]
pub struct BlockingClient {
    session: Arc<Session>,
    shell: ShellChannel,
    iopub: IOPubChannel,
    stdin: StdInChannel,
    heartbeat: HeartbeatChannel,
}

impl BlockingClient {
    pub fn new(context: Arc<dyn SocketFactory>, session: Arc<Session>, info: &ConnectionInfo) -> Result<Self> {
        Self::with_heartbeat(context, session, info, HeartbeatConfig::blocking())
    }

    pub fn with_heartbeat(
        context: Arc<dyn SocketFactory>,
        session: Arc<Session>,
        info: &ConnectionInfo,
        heartbeat: HeartbeatConfig,
    ) -> Result<Self> {
        Ok(BlockingClient {
            shell: ShellChannel::new(context.clone(), session.clone(), info.shell_endpoint())?,
            iopub: IOPubChannel::new(context.clone(), session.clone(), info.iopub_endpoint())?,
            stdin: StdInChannel::new(context.clone(), session.clone(), info.stdin_endpoint())?,
            heartbeat: HeartbeatChannel::new(context, session.clone(), info.hb_endpoint(), heartbeat)?,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Starts all the channels and the heartbeat.
    pub fn start_channels(&mut self) -> Result<()> {
        self.shell.start()?;
        self.iopub.start()?;
        self.stdin.start()?;
        self.heartbeat.start()?;
        self.heartbeat.unpause();

        info!("Channels started, shell on {}", self.shell.address());

        Ok(())
    }

    pub fn stop_channels(&mut self) {
        self.shell.stop();
        self.iopub.stop();
        self.stdin.stop();
        self.heartbeat.stop();
    }

    /// Are any of the channels running?
    pub fn channels_running(&self) -> bool {
        self.shell.is_alive() || self.iopub.is_alive() || self.stdin.is_alive() || self.heartbeat.is_alive()
    }

    /// Is the kernel answering the heartbeat? Without a running heartbeat the
    /// kernel is believed to be alive.
    pub fn is_alive(&self) -> bool {
        if self.heartbeat.is_alive() {
            self.heartbeat.is_beating()
        } else {
            true
        }
    }

    pub fn shell_channel(&mut self) -> &mut ShellChannel {
        &mut self.shell
    }

    pub fn iopub_channel(&mut self) -> &mut IOPubChannel {
        &mut self.iopub
    }

    pub fn stdin_channel(&mut self) -> &mut StdInChannel {
        &mut self.stdin
    }

    pub fn hb_channel(&mut self) -> &mut HeartbeatChannel {
        &mut self.heartbeat
    }

    pub fn get_shell_msg(&mut self, block: bool, timeout: Option<Duration>) -> Result<Message> {
        self.shell.get_msg(block, timeout)
    }

    pub fn get_iopub_msg(&mut self, block: bool, timeout: Option<Duration>) -> Result<Message> {
        self.iopub.get_msg(block, timeout)
    }

    pub fn get_stdin_msg(&mut self, block: bool, timeout: Option<Duration>) -> Result<Message> {
        self.stdin.get_msg(block, timeout)
    }

    /// Waits for the reply of the request `msg_id` on the shell channel, other
    /// shell messages are dropped.
    pub fn get_shell_reply(&mut self, msg_id: &str, timeout: Option<Duration>) -> Result<Message> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let msg = self.shell.get_msg(true, remaining)?;

            if msg.is_child_of(msg_id) {
                return Ok(msg);
            }

            trace!("Dropping {} while waiting for the reply of {}", msg.msg_type(), msg_id);
        }
    }

    fn send_shell(&mut self, msg_type: &str, content: Value) -> Result<String> {
        let msg = self.session.msg(msg_type, content, None);

        self.shell.queue_send(&msg)?;

        Ok(msg.header.msg_id)
    }

    /// Executes code in the kernel.
    pub fn execute(&mut self, code: &str, options: &ExecuteOptions) -> Result<String> {
        let content = content::execute_request(code, options)?;

        self.send_shell(EXECUTE_REQUEST, content)
    }

    /// Asks for completions of the code at the cursor position.
    pub fn complete(&mut self, code: &str, cursor_pos: Option<usize>) -> Result<String> {
        self.send_shell(COMPLETE_REQUEST, content::complete_request(code, cursor_pos))
    }

    /// Asks for information about the code at the cursor position.
    pub fn inspect(&mut self, code: &str, cursor_pos: Option<usize>, detail_level: u8) -> Result<String> {
        self.send_shell(INSPECT_REQUEST, content::inspect_request(code, cursor_pos, detail_level))
    }

    pub fn history(&mut self, raw: bool, output: bool, access: &HistoryAccess) -> Result<String> {
        self.send_shell(HISTORY_REQUEST, content::history_request(raw, output, access))
    }

    pub fn kernel_info(&mut self) -> Result<String> {
        self.send_shell(KERNEL_INFO_REQUEST, content::kernel_info_request())
    }

    /// Asks the kernel to shut down, or to restart if `restart` is true.
    pub fn shutdown(&mut self, restart: bool) -> Result<String> {
        self.send_shell(SHUTDOWN_REQUEST, content::shutdown_request(restart))
    }

    /// Sends user input to the kernel on the stdin channel.
    pub fn input(&mut self, text: &str) -> Result<()> {
        self.stdin.input(text)
    }

    /// Waits until the kernel answers a kernel info request, then flushes the
    /// iopub channel.
    pub fn wait_for_ready(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(anyhow!("Kernel didn't respond in {:?}", timeout));
            }

            self.kernel_info()?;

            let wait = (deadline - now).min(Duration::from_secs(1));

            match self.shell.get_msg(true, Some(wait)) {
                Ok(msg) if msg.msg_type() == KERNEL_INFO_REPLY => break,
                Ok(msg) => debug!("Dropping {} while waiting for the kernel", msg.msg_type()),
                Err(e) if is_empty(&e) => (),
                Err(e) => return Err(e),
            }
        }

        loop {
            match self.iopub.get_msg(true, Some(Duration::from_millis(200))) {
                Ok(msg) => trace!("Flushing {} from iopub", msg.msg_type()),
                Err(e) if is_empty(&e) => break,
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}
