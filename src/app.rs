use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;

use crate::chat::AssistantClient;
use crate::config::Config;
use crate::conversation::Conversation;
use crate::store::{FileStorage, TranscriptStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Canned prompts offered while the conversation is still just the greeting.
pub const SUGGESTIONS: [&str; 3] = [
    "Check best rates across all lenders",
    "Calculate eligibility for ₹1 Cr loan",
    "Compare banks for 600 CIBIL score",
];

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Pending input and its cursor, in chars
    pub input: String,
    pub cursor: usize,

    pub conversation: Conversation<FileStorage>,
    pub client: AssistantClient,
    pub reply_task: Option<JoinHandle<Result<String>>>,

    // Chat viewport; dimensions are captured at render time for the
    // scroll arithmetic
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    pub animation_frame: u8,

    pub show_reset_confirm: bool,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let storage = FileStorage::in_user_data_dir()?;
        let conversation = Conversation::open(TranscriptStore::new(storage));
        let client = AssistantClient::new(config.endpoint());

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            cursor: 0,

            conversation,
            client,
            reply_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            show_reset_confirm: false,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.conversation.is_busy()
    }

    /// Hands the pending input to the conversation and spawns the request.
    /// Blank input and an already-outstanding request are both no-ops.
    pub fn send_pending_input(&mut self) {
        let Some(history) = self.conversation.begin_send(&self.input) else {
            return;
        };

        self.input.clear();
        self.cursor = 0;

        let client = self.client.clone();
        self.reply_task = Some(tokio::spawn(async move { client.ask(&history).await }));

        // Scroll so "Thinking..." is visible
        self.scroll_chat_to_bottom();
    }

    /// Applies a finished request, if any. Called from the event loop.
    pub async fn poll_reply(&mut self) {
        let finished = self
            .reply_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.reply_task.take() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(anyhow!("assistant task failed: {err}")),
            };
            self.conversation.complete_send(outcome);
            self.scroll_chat_to_bottom();
        }
    }

    /// Applies a confirmed reset: transcript, storage, and pending input.
    pub fn confirm_reset(&mut self) {
        self.conversation.reset();
        self.input.clear();
        self.cursor = 0;
        self.chat_scroll = 0;
        self.show_reset_confirm = false;
    }

    pub fn show_suggestions(&self) -> bool {
        self.conversation.transcript().is_welcome_only() && !self.is_busy()
    }

    /// Copies a canned prompt into the pending input.
    pub fn use_suggestion(&mut self, index: usize) {
        if let Some(text) = SUGGESTIONS.get(index) {
            self.input = (*text).to_string();
            self.cursor = self.input.chars().count();
            self.input_mode = InputMode::Editing;
        }
    }

    /// Advances the busy ellipsis one step per timer tick.
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    /// Scroll the chat viewport to its last line. Mirrors the line layout
    /// `ui::render_chat` produces, including soft wrapping.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Before the first draw the real area is unknown; assume a sane size
        let width = if self.chat_width == 0 {
            50
        } else {
            self.chat_width as usize
        };
        let visible = if self.chat_height == 0 {
            20
        } else {
            self.chat_height
        };

        let mut total: u16 = 0;
        for msg in self.conversation.transcript().messages() {
            total += 1; // speaker line
            total += wrapped_line_count(&msg.content, width);
            total += 1; // gap between messages
        }
        if self.is_busy() {
            total += 2; // speaker line plus the thinking indicator
        }

        self.chat_scroll = total.saturating_sub(visible);
    }
}

/// How many rows `text` occupies once soft-wrapped at `width` columns.
/// Counts chars, not bytes; an empty line still takes a row.
fn wrapped_line_count(text: &str, width: usize) -> u16 {
    text.lines()
        .map(|line| (line.chars().count() / width.max(1) + 1) as u16)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("store"));
        let app = App {
            should_quit: false,
            input_mode: InputMode::Editing,
            input: String::new(),
            cursor: 0,
            conversation: Conversation::open(TranscriptStore::new(storage)),
            client: AssistantClient::new("http://127.0.0.1:9"),
            reply_task: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            show_reset_confirm: false,
        };
        (app, dir)
    }

    #[tokio::test]
    async fn an_accepted_send_clears_the_pending_input() {
        let (mut app, _dir) = test_app();
        app.input = "What is the rate today?".to_string();
        app.cursor = app.input.chars().count();

        app.send_pending_input();

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.is_busy());
        assert!(app.reply_task.is_some());
        assert_eq!(app.conversation.transcript().len(), 2);
    }

    #[tokio::test]
    async fn a_refused_send_keeps_the_pending_input() {
        let (mut app, _dir) = test_app();
        app.input = "   ".to_string();
        app.cursor = 3;

        app.send_pending_input();

        assert_eq!(app.input, "   ");
        assert!(app.reply_task.is_none());
        assert_eq!(app.conversation.transcript().len(), 1);
    }

    #[test]
    fn confirming_a_reset_clears_input_and_popup() {
        let (mut app, _dir) = test_app();
        app.input = "half-typed".to_string();
        app.cursor = 4;
        app.show_reset_confirm = true;

        app.confirm_reset();

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(!app.show_reset_confirm);
        assert!(app.conversation.transcript().is_welcome_only());
    }

    #[test]
    fn suggestions_only_show_on_a_fresh_conversation() {
        let (mut app, _dir) = test_app();
        assert!(app.show_suggestions());

        app.use_suggestion(1);
        assert_eq!(app.input, SUGGESTIONS[1]);
        assert_eq!(app.cursor, SUGGESTIONS[1].chars().count());

        app.conversation.begin_send("Hello").unwrap();
        assert!(!app.show_suggestions());
    }

    #[test]
    fn wrapped_line_count_follows_the_render_layout() {
        assert_eq!(wrapped_line_count("short", 50), 1);
        assert_eq!(wrapped_line_count("a\n\nb", 50), 3);
        // 120 chars at width 50 wrap onto three rows
        assert_eq!(wrapped_line_count(&"x".repeat(120), 50), 3);
        // Multibyte chars count as one column each
        assert_eq!(wrapped_line_count(&"₹".repeat(10), 50), 1);
    }
}
