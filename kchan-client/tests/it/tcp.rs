use futures::{SinkExt, StreamExt};
use kchan_client::*;
use kchan_codec::codec::MultipartCodec;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio_util::codec::Framed;

/// Starts a kernel which answers one kernel info request on the shell port.
fn fake_kernel(protocol_version: &'static str) -> (u16, thread::JoinHandle<()>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    listener.set_nonblocking(true).unwrap();

    let handle = thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let (socket, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(socket, MultipartCodec {});
            let session = Session::with_username("kernel");

            let frames = framed.next().await.unwrap().unwrap();
            let (identities, frames) = session.feed_identities(frames).unwrap();
            let request = session.deserialize(frames).unwrap();

            assert_eq!(request.msg_type(), "kernel_info_request");

            let reply = session.msg(
                "kernel_info_reply",
                json!({"protocol_version": protocol_version}),
                Some(&request.header),
            );
            let frames = session.serialize(&reply, &identities).unwrap();

            framed.send(frames).await.unwrap();

            // wait for the client to hang up
            while let Some(Ok(_)) = framed.next().await {}
        });
    });

    (port, handle)
}

#[test]
fn kernel_info_over_tcp() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (port, kernel) = fake_kernel("4.1");

    let context = Arc::new(TcpContext::new().unwrap());
    let session = Arc::new(Session::with_username("client"));
    let mut shell = ShellChannel::new(context, session.clone(), ("127.0.0.1", port)).unwrap();

    shell.start().unwrap();
    assert!(shell.is_alive());

    let request = session.msg("kernel_info_request", json!({}), None);
    shell.queue_send(&request).unwrap();

    let reply = shell.get_msg(true, Some(Duration::from_secs(5))).unwrap();

    assert!(reply.is_child_of(request.msg_id()));
    assert_eq!(reply.content_str("protocol_version"), Some("4.1"));
    assert_eq!(session.adapt_version(), Some(4));

    shell.close();
    assert!(!shell.is_alive());

    kernel.join().unwrap();
}

#[test]
fn connection_refused() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let context = Arc::new(TcpContext::new().unwrap());
    let session = Arc::new(Session::with_username("client"));
    let mut iopub = IOPubChannel::new(context, session, ("127.0.0.1", port)).unwrap();

    assert!(iopub.start().is_err());
    assert!(!iopub.is_alive());
}
