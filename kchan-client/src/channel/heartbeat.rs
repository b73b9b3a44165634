use crate::address::Endpoint;
use crate::channel_error;
use crate::error::ChannelError;
use crate::socket::{ChannelRole, Socket, SocketFactory};
use anyhow::{anyhow, Result};
use bytes::Bytes;
use kchan_codec::Session;
use log::{debug, error, trace, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// What happens when the kernel doesn't answer a ping in time.
pub enum MissedBeat {
    /// Logs a warning with the time since the last ping.
    Log,
    /// Nothing, callers check `is_beating` themselves.
    Ignore,
    /// Calls the function with the time since the last ping.
    Callback(Box<dyn Fn(Duration) + Send + Sync>),
}

impl fmt::Debug for MissedBeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissedBeat::Log => f.write_str("Log"),
            MissedBeat::Ignore => f.write_str("Ignore"),
            MissedBeat::Callback(_) => f.write_str("Callback"),
        }
    }
}

impl MissedBeat {
    fn call(&self, since_last_heartbeat: Duration) {
        match self {
            MissedBeat::Log => warn!("Kernel missed heartbeat, no answer in {:?}", since_last_heartbeat),
            MissedBeat::Ignore => (),
            MissedBeat::Callback(f) => f(since_last_heartbeat),
        }
    }
}

/// Settings of the heartbeat.
#[derive(Debug)]
pub struct HeartbeatConfig {
    /// No answer within this time means the kernel is dead. Less than half a
    /// second gives false alarms.
    pub time_to_dead: Duration,
    pub missed_beat: MissedBeat,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            time_to_dead: Duration::from_secs(3),
            missed_beat: MissedBeat::Log,
        }
    }
}

impl HeartbeatConfig {
    /// Quicker monitoring for blocking clients, which poll `is_beating`
    /// instead of reacting to missed beats.
    pub fn blocking() -> Self {
        Self {
            time_to_dead: Duration::from_secs(1),
            missed_beat: MissedBeat::Ignore,
        }
    }

    pub fn with_time_to_dead(mut self, time_to_dead: Duration) -> Self {
        self.time_to_dead = time_to_dead;
        self
    }

    pub fn with_missed_beat(mut self, missed_beat: MissedBeat) -> Self {
        self.missed_beat = missed_beat;
        self
    }
}

/// Flags shared by the channel and its beating thread.
#[derive(Debug)]
struct BeatState {
    running: AtomicBool,
    paused: AtomicBool,
    beating: AtomicBool,
    last_beat: Mutex<Option<Instant>>,
}

/// The heartbeat channel which monitors the kernel heartbeat.
///
/// A thread sends pings and waits for the answers. It starts paused, call
/// `unpause` to start beating.
pub struct HeartbeatChannel {
    context: Arc<dyn SocketFactory>,
    session: Arc<Session>,
    address: String,
    time_to_dead: Duration,
    missed_beat: Arc<MissedBeat>,
    state: Arc<BeatState>,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for HeartbeatChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatChannel")
            .field("address", &self.address)
            .field("time_to_dead", &self.time_to_dead)
            .field("missed_beat", &self.missed_beat)
            .field("state", &self.state)
            .finish()
    }
}

impl HeartbeatChannel {
    pub fn new(
        context: Arc<dyn SocketFactory>,
        session: Arc<Session>,
        endpoint: impl Into<Endpoint>,
        config: HeartbeatConfig,
    ) -> Result<Self> {
        if config.time_to_dead.is_zero() {
            return Err(anyhow!("Time to dead of the heartbeat cannot be zero"));
        }

        Ok(HeartbeatChannel {
            context,
            session,
            address: endpoint.into().into_url()?,
            time_to_dead: config.time_to_dead,
            missed_beat: Arc::new(config.missed_beat),
            state: Arc::new(BeatState {
                running: AtomicBool::new(false),
                paused: AtomicBool::new(true),
                beating: AtomicBool::new(false),
                last_beat: Mutex::new(None),
            }),
            thread: None,
        })
    }

    /// Heartbeat of blocking clients: 1 second to dead, missed beats are ignored.
    pub fn blocking(
        context: Arc<dyn SocketFactory>,
        session: Arc<Session>,
        endpoint: impl Into<Endpoint>,
    ) -> Result<Self> {
        Self::new(context, session, endpoint, HeartbeatConfig::blocking())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn time_to_dead(&self) -> Duration {
        self.time_to_dead
    }

    /// Connects the socket and starts the beating thread.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Err(anyhow!("Heartbeat of {} is already started", self.address));
        }

        let socket = self
            .context
            .connect(ChannelRole::Heartbeat, self.session.bsession(), &self.address)?;

        self.state.running.store(true, Ordering::SeqCst);
        self.state.beating.store(true, Ordering::SeqCst);

        let beater = Beater {
            context: self.context.clone(),
            identity: self.session.bsession().to_vec(),
            address: self.address.clone(),
            time_to_dead: self.time_to_dead,
            missed_beat: self.missed_beat.clone(),
            state: self.state.clone(),
            socket: Some(socket),
        };

        let thread = thread::Builder::new()
            .name("kchan-heartbeat".to_owned())
            .spawn(move || beater.run());

        match thread {
            Ok(handle) => {
                self.thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Pauses the heartbeat.
    pub fn pause(&self) {
        self.state.paused.store(true, Ordering::SeqCst);
    }

    /// Unpauses the heartbeat.
    pub fn unpause(&self) {
        self.state.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    /// Is the heartbeat running and responsive (and not paused)?
    pub fn is_beating(&self) -> bool {
        self.is_alive() && !self.is_paused() && self.state.beating.load(Ordering::SeqCst)
    }

    /// Time elapsed since the last answered ping, `None` if there was no answer yet.
    pub fn since_last_beat(&self) -> Option<Duration> {
        self.state
            .last_beat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|t| t.elapsed())
    }

    pub fn is_alive(&self) -> bool {
        self.thread.is_some() && self.state.running.load(Ordering::SeqCst)
    }

    /// Stops the beating thread and waits for it. Safe to call more than once.
    pub fn stop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Heartbeat thread of {} panicked", self.address);
            }
        }
    }

    pub fn close(&mut self) {
        self.stop()
    }
}

impl Drop for HeartbeatChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The beating thread, it owns the heartbeat socket.
struct Beater {
    context: Arc<dyn SocketFactory>,
    identity: Vec<u8>,
    address: String,
    time_to_dead: Duration,
    missed_beat: Arc<MissedBeat>,
    state: Arc<BeatState>,
    socket: Option<Box<dyn Socket>>,
}

impl Beater {
    fn run(mut self) {
        debug!("Heartbeat of {} started", self.address);

        while self.state.running.load(Ordering::SeqCst) {
            if self.state.paused.load(Ordering::SeqCst) {
                thread::sleep(self.time_to_dead);
                continue;
            }

            let request_time = Instant::now();

            match self.ping(request_time) {
                Ok(true) => {
                    self.state.beating.store(true, Ordering::SeqCst);
                    *self.state.last_beat.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

                    let remainder = self.time_to_dead.saturating_sub(request_time.elapsed());
                    if !remainder.is_zero() {
                        thread::sleep(remainder);
                    }
                }
                result => {
                    if let Err(e) = result {
                        debug!("Heartbeat ping failed {:?}", e);
                    }

                    self.state.beating.store(false, Ordering::SeqCst);
                    self.missed_beat.call(request_time.elapsed());
                    self.reconnect();
                }
            }
        }

        self.close_socket();

        debug!("Heartbeat of {} stopped", self.address);
    }

    /// Sends a ping and waits for the answer until the kernel is considered dead.
    fn ping(&mut self, request_time: Instant) -> Result<bool> {
        let until_dead = self.time_to_dead.saturating_sub(request_time.elapsed());

        let socket = match self.socket.as_mut() {
            Some(socket) => socket,
            None => return channel_error!(ChannelError::NotConnected(self.address.clone())),
        };

        socket.send_multipart(vec![Bytes::from_static(b"ping")])?;

        if socket.poll(Some(until_dead))? {
            // the answer is discarded
            socket.recv_multipart()?;

            trace!("Heartbeat of {} answered", self.address);

            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// The socket may have pending pings, a fresh one is needed.
    fn reconnect(&mut self) {
        self.close_socket();

        match self
            .context
            .connect(ChannelRole::Heartbeat, &self.identity, &self.address)
        {
            Ok(socket) => self.socket = Some(socket),
            Err(e) => {
                debug!("Cannot reconnect heartbeat to {} {:?}", self.address, e);

                // Connection attempts are not faster than the beats.
                thread::sleep(self.time_to_dead);
            }
        }
    }

    fn close_socket(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(Duration::ZERO) {
                warn!("Error closing heartbeat socket {:?}", e);
            }
        }
    }
}
