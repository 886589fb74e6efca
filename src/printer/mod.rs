//! Printers: notification lines and markdown (termimad), both on stderr.

use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::events::Notification;

pub struct EventPrinter {
    pub color: bool,
}

impl EventPrinter {
    pub fn render(&self, notification: &Notification) -> String {
        let json = serde_json::to_string(notification)
            .unwrap_or_else(|e| format!("<unserializable: {e}>"));
        let line = format!("Event: {json}");
        if !self.color {
            return line;
        }
        match notification {
            Notification::Status(_) => format!("{}", line.yellow()),
            Notification::Message(_) => format!("{}", line.green()),
            Notification::Citation(_) => format!("{}", line.cyan()),
        }
    }

    pub fn print(&self, notification: &Notification) {
        eprintln!("{}", self.render(notification));
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        eprintln!("{}", self.skin.term_text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MessageData;

    #[test]
    fn plain_render_prefixes_json() {
        let printer = EventPrinter { color: false };
        let n = Notification::Message(MessageData { content: "done".into() });
        assert_eq!(
            printer.render(&n),
            r#"Event: {"type":"message","data":{"content":"done"}}"#
        );
    }

    #[test]
    fn colored_render_keeps_payload() {
        let printer = EventPrinter { color: true };
        let n = Notification::Message(MessageData { content: "done".into() });
        assert!(printer.render(&n).contains(r#""content":"done""#));
    }
}
