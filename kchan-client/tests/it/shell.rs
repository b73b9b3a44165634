use crate::helper::{setup, Kernel};
use kchan_client::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn started_shell() -> (ShellChannel, Arc<Session>, Kernel) {
    let (context, session) = setup();
    let mut shell = ShellChannel::new(context.clone(), session.clone(), ("127.0.0.1", 5555)).unwrap();

    shell.start().unwrap();

    let kernel = Kernel::accept(&context, ChannelRole::Shell);

    (shell, session, kernel)
}

#[test]
fn older_kernel_adapts_session() {
    let (mut shell, session, kernel) = started_shell();

    kernel.send("kernel_info_reply", json!({"protocol_version": "4.1"}), None);
    shell.get_msg(true, Some(Duration::from_secs(1))).unwrap();

    assert_eq!(session.adapt_version(), Some(4));
}

#[test]
fn current_kernel_leaves_session_alone() {
    let (mut shell, session, kernel) = started_shell();

    kernel.send("kernel_info_reply", json!({"protocol_version": "5.0"}), None);
    shell.get_msg(true, Some(Duration::from_secs(1))).unwrap();

    assert_eq!(session.adapt_version(), None);
}

#[test]
fn only_kernel_info_reply_is_inspected() {
    let (mut shell, session, kernel) = started_shell();

    kernel.send("execute_reply", json!({"status": "ok", "protocol_version": "4.0"}), None);
    kernel.send("kernel_info_reply", json!({"banner": "no version"}), None);
    kernel.send("kernel_info_reply", json!({"protocol_version": "four"}), None);

    assert_eq!(shell.get_msgs().unwrap().len(), 3);
    assert_eq!(session.adapt_version(), None);
}

#[test]
fn every_kernel_info_reply_is_evaluated() {
    let (mut shell, session, kernel) = started_shell();

    kernel.send("kernel_info_reply", json!({"protocol_version": "4.0"}), None);
    kernel.send("kernel_info_reply", json!({"protocol_version": "3.0"}), None);

    shell.get_msgs().unwrap();

    assert_eq!(session.adapt_version(), Some(3));
}

#[test]
fn kernel_info_negotiation() {
    let (mut shell, session, kernel) = started_shell();

    let request = session.msg("kernel_info_request", json!({}), None);
    shell.queue_send(&request).unwrap();

    let received = kernel.recv();
    assert_eq!(received.msg_type(), "kernel_info_request");
    assert_eq!(received.header.version.as_deref(), Some("5.0"));

    kernel.send(
        "kernel_info_reply",
        json!({"protocol_version": "4.0", "implementation": "fake"}),
        Some(&received.header),
    );

    let reply = shell.get_msg(true, Some(Duration::from_secs(1))).unwrap();

    assert_eq!(reply.msg_type(), "kernel_info_reply");
    assert!(reply.is_child_of(request.msg_id()));
    assert_eq!(session.adapt_version(), Some(4));

    // From now on requests go out in the old format
    let inspect = session.msg("inspect_request", json!({"code": "len", "cursor_pos": 3, "detail_level": 0}), None);
    shell.queue_send(&inspect).unwrap();

    let received = kernel.recv();
    assert_eq!(received.msg_type(), "object_info_request");
    assert_eq!(received.content["oname"], "len");
    assert_eq!(received.header.version, None);
}
