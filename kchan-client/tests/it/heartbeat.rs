use crate::helper::setup;
use kchan_client::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn blocking_heartbeat_settings() {
    let config = HeartbeatConfig::blocking();

    assert_eq!(config.time_to_dead, Duration::from_secs(1));
    assert!(matches!(config.missed_beat, MissedBeat::Ignore));

    let config = HeartbeatConfig::default();

    assert_eq!(config.time_to_dead, Duration::from_secs(3));
    assert!(matches!(config.missed_beat, MissedBeat::Log));
}

#[test]
fn not_beating_before_start() {
    let (context, session) = setup();
    let hb = HeartbeatChannel::blocking(context, session, ("127.0.0.1", 5558)).unwrap();

    assert_eq!(hb.time_to_dead(), Duration::from_secs(1));
    assert!(hb.is_paused());
    assert!(!hb.is_alive());
    assert!(!hb.is_beating());
    assert!(hb.since_last_beat().is_none());
}

#[test]
fn answered_pings_keep_beating() {
    let (context, session) = setup();
    let config = HeartbeatConfig::blocking().with_time_to_dead(Duration::from_millis(200));
    let mut hb = HeartbeatChannel::new(context.clone(), session, ("127.0.0.1", 5558), config).unwrap();

    hb.start().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let echo_done = done.clone();
    let peer = context.accept(ChannelRole::Heartbeat).unwrap();

    let echo = thread::spawn(move || {
        while !echo_done.load(Ordering::SeqCst) {
            if let Some(frames) = peer.recv_timeout(Duration::from_millis(20)) {
                let _ = peer.send(frames);
            }
        }
    });

    // paused heartbeat doesn't count as beating
    assert!(!hb.is_beating());

    hb.unpause();
    thread::sleep(Duration::from_millis(800));

    assert!(hb.is_alive());
    assert!(hb.is_beating());
    assert!(hb.since_last_beat().unwrap() < Duration::from_millis(500));

    hb.pause();
    assert!(!hb.is_beating());

    hb.stop();
    done.store(true, Ordering::SeqCst);
    echo.join().unwrap();

    assert!(!hb.is_alive());
}

#[test]
fn missed_beats_call_the_handler() {
    let (context, session) = setup();
    let missed = Arc::new(AtomicUsize::new(0));
    let counter = missed.clone();

    let config = HeartbeatConfig::default()
        .with_time_to_dead(Duration::from_millis(100))
        .with_missed_beat(MissedBeat::Callback(Box::new(move |_since| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
    let mut hb = HeartbeatChannel::new(context, session, ("127.0.0.1", 5558), config).unwrap();

    hb.start().unwrap();
    hb.unpause();

    thread::sleep(Duration::from_millis(700));

    assert!(missed.load(Ordering::SeqCst) >= 1);
    assert!(hb.is_alive());
    assert!(!hb.is_beating());
    assert!(hb.since_last_beat().is_none());

    hb.stop();
    hb.close();

    assert!(!hb.is_alive());
}

#[test]
fn start_twice_fails() {
    let (context, session) = setup();
    let mut hb = HeartbeatChannel::blocking(context, session, ("127.0.0.1", 5558)).unwrap();

    hb.start().unwrap();

    assert!(hb.start().is_err());

    hb.stop();
}

#[test]
fn reconnects_do_not_pile_up_sockets() {
    let (context, session) = setup();
    let config = HeartbeatConfig::blocking().with_time_to_dead(Duration::from_millis(20));
    let mut hb = HeartbeatChannel::new(context.clone(), session, ("127.0.0.1", 5558), config).unwrap();

    hb.start().unwrap();
    hb.unpause();

    thread::sleep(Duration::from_millis(600));

    assert!(!hb.is_beating());
    assert!(context.pending(ChannelRole::Heartbeat) <= 1);

    hb.stop();

    assert_eq!(context.pending(ChannelRole::Heartbeat), 0);
}

#[test]
fn beating_resumes_when_the_kernel_answers_again() {
    let (context, session) = setup();
    let config = HeartbeatConfig::blocking().with_time_to_dead(Duration::from_millis(100));
    let mut hb = HeartbeatChannel::new(context.clone(), session, ("127.0.0.1", 5558), config).unwrap();

    hb.start().unwrap();
    hb.unpause();

    thread::sleep(Duration::from_millis(400));

    assert!(!hb.is_beating());
    assert!(hb.since_last_beat().is_none());

    let done = Arc::new(AtomicBool::new(false));
    let echo_done = done.clone();
    let echo_context = context.clone();

    // every missed beat makes a new socket, the echo follows the newest one
    let echo = thread::spawn(move || {
        let mut peer = None;

        while !echo_done.load(Ordering::SeqCst) {
            if let Some(newer) = echo_context.accept(ChannelRole::Heartbeat) {
                peer = Some(newer);
            }

            match &peer {
                Some(p) => {
                    if let Some(frames) = p.recv_timeout(Duration::from_millis(10)) {
                        let _ = p.send(frames);
                    }
                }
                None => thread::sleep(Duration::from_millis(10)),
            }
        }
    });

    thread::sleep(Duration::from_millis(800));

    assert!(hb.is_beating());
    assert!(hb.since_last_beat().is_some());

    hb.stop();
    done.store(true, Ordering::SeqCst);
    echo.join().unwrap();
}

#[test]
fn zero_time_to_dead_is_rejected() {
    let (context, session) = setup();
    let config = HeartbeatConfig::blocking().with_time_to_dead(Duration::ZERO);

    assert!(HeartbeatChannel::new(context, session, ("127.0.0.1", 5558), config).is_err());
}
