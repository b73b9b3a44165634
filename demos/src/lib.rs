//! Runnable demos of the blocking kernel client, see `cargo run -p demos --example`.
//!
//! The demos connect through `TcpContext`, which speaks the length-prefixed
//! multipart framing of `kchan-codec` with unsigned messages. The kernel named
//! by the connection file has to serve that framing, a stock ZeroMQ kernel
//! doesn't.
