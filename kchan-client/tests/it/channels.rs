use crate::helper::{setup, to_channel_error, Kernel};
use kchan_client::*;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn started_iopub() -> (IOPubChannel, Kernel) {
    let (context, session) = setup();
    let mut channel = IOPubChannel::new(context.clone(), session, ("127.0.0.1", 5556)).unwrap();

    channel.start().unwrap();

    let kernel = Kernel::accept(&context, ChannelRole::IOPub);

    (channel, kernel)
}

#[test]
fn address_of_host_and_port() {
    let (context, session) = setup();

    for (host, port) in [("127.0.0.1", 5555u16), ("localhost", 1), ("10.1.2.3", 65535)] {
        let shell = ShellChannel::new(context.clone(), session.clone(), (host, port)).unwrap();
        let stdin = StdInChannel::new(context.clone(), session.clone(), (host, port)).unwrap();
        let hb = HeartbeatChannel::blocking(context.clone(), session.clone(), (host, port)).unwrap();

        let expected = format!("tcp://{}:{}", host, port);

        assert_eq!(shell.address(), expected);
        assert_eq!(stdin.address(), expected);
        assert_eq!(hb.address(), expected);
        assert!(!shell.is_alive());
    }
}

#[test]
fn port_zero_fails_construction() {
    let (context, session) = setup();

    for host in ["127.0.0.1", "localhost"] {
        let err = to_channel_error(IOPubChannel::new(context.clone(), session.clone(), (host, 0)));

        assert!(matches!(err, ChannelError::InvalidPortNumber(_)));

        let hb = HeartbeatChannel::blocking(context.clone(), session.clone(), (host, 0));
        assert!(hb.is_err());
    }
}

#[test]
fn non_blocking_get_on_empty_channel() {
    let (mut channel, _kernel) = started_iopub();

    let start = Instant::now();
    let err = to_channel_error(channel.get_msg(false, Some(Duration::from_secs(10))));

    assert_eq!(err, ChannelError::Empty);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn drain_empty_channel() {
    let (mut channel, _kernel) = started_iopub();

    assert!(channel.get_msgs().unwrap().is_empty());
}

#[test]
fn drain_returns_messages_in_arrival_order() {
    let (mut channel, kernel) = started_iopub();

    let sent: Vec<String> = (0..5)
        .map(|i| kernel.send("stream", json!({"name": "stdout", "text": i.to_string()}), None))
        .map(|msg| msg.header.msg_id)
        .collect();

    let msgs = channel.get_msgs().unwrap();
    let received: Vec<String> = msgs.iter().map(|m| m.msg_id().to_owned()).collect();

    assert_eq!(received, sent);
    assert_eq!(msgs[3].content_str("text"), Some("3"));

    assert!(channel.get_msgs().unwrap().is_empty());
}

#[test]
fn msg_ready_does_not_consume() {
    let (mut channel, kernel) = started_iopub();

    assert!(!channel.msg_ready().unwrap());

    let sent = kernel.send("status", json!({"execution_state": "idle"}), None);

    assert!(channel.msg_ready().unwrap());
    assert!(channel.msg_ready().unwrap());

    let msg = channel.get_msg(false, None).unwrap();
    assert_eq!(msg.msg_id(), sent.msg_id());

    assert!(!channel.msg_ready().unwrap());
}

#[test]
fn blocking_get_waits_for_timeout() {
    let (mut channel, _kernel) = started_iopub();

    let start = Instant::now();
    let res = channel.get_msg(true, Some(Duration::from_millis(150)));

    assert!(is_empty(&res.unwrap_err()));
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[test]
fn blocking_get_returns_late_message() {
    let (mut channel, kernel) = started_iopub();

    let publisher = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        kernel.send("status", json!({"execution_state": "busy"}), None);
        kernel
    });

    let msg = channel.get_msg(true, Some(Duration::from_secs(5))).unwrap();

    assert_eq!(msg.content_str("execution_state"), Some("busy"));

    publisher.join().unwrap();
}

#[test]
fn close_twice() {
    let (mut channel, _kernel) = started_iopub();

    assert!(channel.is_alive());

    channel.close();
    channel.close();

    assert!(!channel.is_alive());

    let err = to_channel_error(channel.get_msg(false, None));
    assert!(matches!(err, ChannelError::NotConnected(_)));
}

#[test]
fn input_sends_reply_on_stdin() {
    let (context, session) = setup();
    let mut stdin = StdInChannel::new(context.clone(), session.clone(), "tcp://127.0.0.1:5557").unwrap();

    stdin.start().unwrap();

    let kernel = Kernel::accept(&context, ChannelRole::StdIn);
    assert_eq!(kernel.peer().identity(), session.bsession());

    let request = kernel.send("input_request", json!({"prompt": "name: ", "password": false}), None);
    let msg = stdin.get_msg(true, Some(Duration::from_secs(1))).unwrap();
    assert_eq!(msg.msg_id(), request.msg_id());

    stdin.input("Richard").unwrap();

    let reply = kernel.recv();
    assert_eq!(reply.msg_type(), "input_reply");
    assert_eq!(reply.content, json!({"value": "Richard"}));
    assert_eq!(reply.header.session, session.session_id());
}

#[test]
fn send_on_closed_channel() {
    let (context, session) = setup();
    let mut stdin = StdInChannel::new(context, Arc::clone(&session), "tcp://127.0.0.1:5557").unwrap();

    assert!(stdin.input("x").is_err());
}

#[test]
fn blocking_get_fails_when_the_kernel_is_gone() {
    let (mut channel, kernel) = started_iopub();

    let sent = kernel.send("status", json!({"execution_state": "idle"}), None);
    drop(kernel);

    // queued messages are still delivered
    let msg = channel.get_msg(true, None).unwrap();
    assert_eq!(msg.msg_id(), sent.msg_id());

    let start = Instant::now();

    for (block, timeout) in [(true, None), (true, Some(Duration::from_secs(5))), (false, None)] {
        let err = to_channel_error(channel.get_msg(block, timeout));

        assert!(matches!(err, ChannelError::Disconnected(_)));
    }

    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(channel.msg_ready().is_err());
}
