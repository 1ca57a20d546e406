//! Terminal front-end for the coordinator
//!
//! Typed lines are utterances. Slash commands drive the session:
//! /connect, /disconnect, /reset, /listen, /stop, /book N, /quit

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::channel::{ConnectionState, TimeSlot};
use crate::session::{ConversationSnapshot, CoordinatorHandle, Role};

const HELP: &str = "Commands: /connect /disconnect /reset /listen /stop /book N /quit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Connect,
    Disconnect,
    Reset,
    Listen,
    Stop,
    /// Zero-based slot index
    Book(usize),
    Quit,
    Help,
    Say(String),
    Blank,
}

/// Parse one line of user input (slot numbers are shown 1-based)
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }

    if !line.starts_with('/') {
        return Input::Say(line.to_string());
    }

    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("/connect"), None) => Input::Connect,
        (Some("/disconnect"), None) => Input::Disconnect,
        (Some("/reset"), None) => Input::Reset,
        (Some("/listen"), None) => Input::Listen,
        (Some("/stop"), None) => Input::Stop,
        (Some("/quit"), None) => Input::Quit,
        (Some("/book"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Book(n - 1),
            _ => Input::Help,
        },
        _ => Input::Help,
    }
}

/// Read stdin until /quit or EOF, printing conversation updates as they land
pub async fn run(handle: CoordinatorHandle) -> Result<()> {
    println!("{}", HELP);

    let printer = tokio::spawn(render_updates(handle.subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let result = match parse_input(&line) {
            Input::Connect => handle.connect().await,
            Input::Disconnect => handle.disconnect().await,
            Input::Reset => handle.reset().await,
            Input::Listen => handle.start_listening().await,
            Input::Stop => handle.stop_listening().await,
            Input::Book(index) => handle.select_slot(index).await,
            Input::Say(text) => handle.submit(text).await,
            Input::Quit => break,
            Input::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Input::Blank => Ok(()),
        };

        if let Err(e) = result {
            println!("! {}", e);
        }
    }

    printer.abort();
    Ok(())
}

async fn render_updates(mut updates: watch::Receiver<ConversationSnapshot>) {
    let mut renderer = Renderer::default();

    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        for line in renderer.render(&snapshot) {
            println!("{}", line);
        }
    }
}

/// Remembers what has been printed and turns each snapshot into new lines
#[derive(Debug)]
struct Renderer {
    shown: usize,
    resets: u64,
    slots: Vec<TimeSlot>,
    connection: ConnectionState,
    listening: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            shown: 0,
            resets: 0,
            slots: Vec::new(),
            connection: ConnectionState::Disconnected,
            listening: false,
        }
    }
}

impl Renderer {
    fn render(&mut self, snapshot: &ConversationSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if snapshot.connection != self.connection {
            self.connection = snapshot.connection;
            lines.push(format!("[{}]", self.connection));
        }

        if snapshot.listening != self.listening {
            self.listening = snapshot.listening;
            if self.listening {
                lines.push("[listening...]".to_string());
            }
        }

        // The log may already be longer again by the time a reset is seen
        if snapshot.resets != self.resets || snapshot.messages.len() < self.shown {
            self.resets = snapshot.resets;
            lines.push("(conversation cleared)".to_string());
            self.shown = 0;
        }

        for message in &snapshot.messages[self.shown..] {
            let who = match message.role {
                Role::User => "you",
                Role::Agent => "agent",
            };
            lines.push(format!("{}: {}", who, message.content));
        }
        self.shown = snapshot.messages.len();

        if snapshot.proposed_slots != self.slots {
            self.slots = snapshot.proposed_slots.clone();
            for (i, slot) in self.slots.iter().enumerate() {
                lines.push(format!(
                    "  [{}] {} ({} min, ends {})",
                    i + 1,
                    slot.formatted_start,
                    slot.duration_minutes,
                    slot.formatted_end
                ));
            }
        }

        lines
    }
}
