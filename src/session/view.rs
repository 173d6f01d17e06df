use super::state::ConnectionState;
use super::transcript::{Role, Transcript};

/// Presentation of session state; the controller is its only caller
pub trait SessionView: Send {
    fn render_state(&mut self, state: ConnectionState);

    /// Short transient notice
    fn toast(&mut self, message: &str);

    fn render_transcript(&mut self, transcript: &Transcript);
}

/// Line-oriented view for the terminal client
pub struct ConsoleView {
    assistant_name: String,
}

impl ConsoleView {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
        }
    }

    fn speaker(&self, role: Role) -> &str {
        match role {
            Role::User => "You",
            Role::Assistant => &self.assistant_name,
        }
    }
}

impl SessionView for ConsoleView {
    fn render_state(&mut self, state: ConnectionState) {
        println!("[{}]", state.status_text());
    }

    fn toast(&mut self, message: &str) {
        println!("! {}", message);
    }

    fn render_transcript(&mut self, transcript: &Transcript) {
        if !transcript.is_visible() {
            return;
        }
        for entry in transcript.entries() {
            println!("  {}: {}", self.speaker(entry.role), entry.text);
        }
    }
}
