use crate::config::Config;
use anyhow::{anyhow, Result};
use kchan_client::{is_empty, BlockingClient, ExecuteOptions, Message};
use kchan_codec::message::{INPUT_REQUEST, STATUS};
use log::{debug, warn};
use std::io::{self, BufRead, Write};
use std::time::Instant;

/// Output of the kernel produced by an iopub message.
#[derive(Debug, PartialEq)]
pub(crate) enum Output {
    Stdout(String),
    Stderr(String),
}

/// What an iopub message of the cell means for the console.
#[derive(Debug, PartialEq)]
pub(crate) enum Event {
    Print(Output),
    Idle,
    Other,
}

pub(crate) fn event_of(msg: &Message) -> Event {
    match msg.msg_type() {
        "stream" => {
            let text = msg.content_str("text").unwrap_or_default().to_owned();

            match msg.content_str("name") {
                Some("stderr") => Event::Print(Output::Stderr(text)),
                _ => Event::Print(Output::Stdout(text)),
            }
        }
        "execute_result" | "display_data" => match msg.content["data"]["text/plain"].as_str() {
            Some(text) => Event::Print(Output::Stdout(format!("{}\n", text))),
            None => Event::Other,
        },
        "error" => {
            let traceback = msg.content["traceback"]
                .as_array()
                .map(|lines| lines.iter().filter_map(|l| l.as_str()).collect::<Vec<_>>().join("\n"))
                .unwrap_or_default();

            if traceback.is_empty() {
                Event::Print(Output::Stderr(format!(
                    "{}: {}\n",
                    msg.content_str("ename").unwrap_or("Error"),
                    msg.content_str("evalue").unwrap_or_default()
                )))
            } else {
                Event::Print(Output::Stderr(format!("{}\n", traceback)))
            }
        }
        STATUS if msg.content_str("execution_state") == Some("idle") => Event::Idle,
        _ => Event::Other,
    }
}

fn print(output: Output) -> Result<()> {
    match output {
        Output::Stdout(text) => {
            let mut out = io::stdout().lock();
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }
        Output::Stderr(text) => {
            let mut err = io::stderr().lock();
            err.write_all(text.as_bytes())?;
            err.flush()?;
        }
    }

    Ok(())
}

/// Answers an input request of the kernel if there is one.
fn handle_stdin(client: &mut BlockingClient) -> Result<()> {
    let msg = match client.get_stdin_msg(false, None) {
        Ok(msg) => msg,
        Err(e) if is_empty(&e) => return Ok(()),
        Err(e) => return Err(e),
    };

    if msg.msg_type() != INPUT_REQUEST {
        debug!("Unexpected {} on stdin", msg.msg_type());
        return Ok(());
    }

    print(Output::Stdout(msg.content_str("prompt").unwrap_or_default().to_owned()))?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    client.input(line.trim_end_matches(['\r', '\n']))
}

/// Executes the code, prints its output until the kernel is idle and returns
/// the execute reply.
pub(crate) fn run_cell(client: &mut BlockingClient, config: &Config, code: &str) -> Result<Message> {
    let msg_id = client.execute(code, &ExecuteOptions::default())?;
    let deadline = Instant::now() + config.timeouts.reply();

    loop {
        if !client.is_alive() {
            return Err(anyhow!("Kernel died while executing the cell"));
        }

        handle_stdin(client)?;

        match client.get_iopub_msg(true, Some(config.timeouts.iopub())) {
            Ok(msg) if msg.is_child_of(&msg_id) => match event_of(&msg) {
                Event::Print(output) => print(output)?,
                Event::Idle => break,
                Event::Other => (),
            },
            Ok(msg) => debug!("Skipping {} of another request", msg.msg_type()),
            Err(e) if is_empty(&e) => {
                if Instant::now() >= deadline {
                    return Err(anyhow!("No answer for the cell in {:?}", config.timeouts.reply()));
                }
            }
            Err(e) => return Err(e),
        }
    }

    let reply = client.get_shell_reply(&msg_id, Some(config.timeouts.reply()))?;

    if reply.content_str("status") != Some("ok") {
        warn!("Cell finished with status {:?}", reply.content_str("status"));
    }

    Ok(reply)
}

/// Reads lines from the standard input and executes them until end of file.
pub(crate) fn repl(client: &mut BlockingClient, config: &Config) -> Result<()> {
    let mut count = 1u64;

    loop {
        print(Output::Stdout(format!("In [{}]: ", count)))?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        let code = line.trim_end();
        if code.is_empty() {
            continue;
        }

        let reply = run_cell(client, config, code)?;

        count = reply.content["execution_count"].as_u64().map_or(count + 1, |c| c + 1);
    }

    Ok(())
}
