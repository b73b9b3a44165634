mod channels;
mod heartbeat;
mod helper;
mod shell;
mod tcp;
