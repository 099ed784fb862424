//! Terminal rendering of client events
//!
//! Message fragments are streamed inline: a new message prints its header and
//! first fragment, extensions of that same message continue the line.

use std::io::Write;

use console::style;
use crewlink_core::{ChatMessage, ClientEvent, Status, StreamPhase};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::TryRecvError;

#[derive(Default)]
pub struct Renderer {
    /// Index of the message whose text is still being written
    open: Option<usize>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::MessageAppended { index, message } => {
                self.close();
                print_header(&message);
                print!("{}", message.content);
                self.open = Some(index);
                flush();
            }
            ClientEvent::MessageExtended { index, delta, .. } => {
                if self.open == Some(index) {
                    print!("{}", delta);
                    flush();
                }
            }
            ClientEvent::StatusChanged { status } => {
                self.close();
                print_status(status);
            }
            ClientEvent::SessionChanged { session_id } => {
                self.close();
                println!("{}", style(format!("Session: {}", session_id)).dim());
            }
            ClientEvent::WorkspaceFilesChanged { files, .. } => {
                if !files.is_empty() {
                    self.close();
                    println!(
                        "{}",
                        style(format!("{} workspace file(s) available, /files to list", files.len())).dim()
                    );
                }
            }
            ClientEvent::QueryFinished { phase, .. } => {
                self.close();
                if phase == StreamPhase::TimedOut {
                    println!("{}", style("The query was cut off by the response deadline").yellow());
                }
            }
            ClientEvent::ResponseCleared => self.close(),
            ClientEvent::QuerySubmitted { .. } | ClientEvent::BusyChanged { .. } => {}
        }
    }

    /// Render whatever is already buffered on `rx`
    pub fn drain(&mut self, rx: &mut Receiver<ClientEvent>) {
        loop {
            match rx.try_recv() {
                Ok(event) => self.handle(event),
                Err(TryRecvError::Lagged(n)) => {
                    tracing::warn!("Display fell behind, skipped {} events", n);
                }
                Err(_) => break,
            }
        }
        self.close();
    }

    /// End the line of an in-progress message
    pub fn close(&mut self) {
        if self.open.take().is_some() {
            println!();
        }
    }
}

fn print_header(message: &ChatMessage) {
    if message.is_system() {
        println!("{} {}", style("[system]").red().bold(), style(&message.timestamp).dim());
    } else {
        println!(
            "{} {} {}",
            style(format!("[{}]", message.team)).cyan().bold(),
            style(&message.sender).green(),
            style(&message.timestamp).dim()
        );
    }
}

fn print_status(status: Status) {
    let text = status.message();
    match status {
        Status::Waiting => {}
        Status::Processing => println!("{}", style(text).dim()),
        Status::Completed => println!("{}", style(text).green()),
        Status::Timeout => println!("{}", style(text).yellow()),
        Status::Error | Status::SessionError | Status::SessionInitError => {
            println!("{}", style(text).red())
        }
    }
}

fn flush() {
    let _ = std::io::stdout().flush();
}
