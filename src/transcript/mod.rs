//! Pick the code block to run out of a chat transcript.

use serde::{Deserialize, Serialize};

use crate::{error::SelectError, execution::Language, normalize::normalize};

const FENCE: &str = "```";

const PYTHON_TAGS: &[&str] = &["python\n", "python3\n"];
const SHELL_TAGS: &[&str] = &["bash\n", "sh\n", "shell\n"];
const PYTHON_TOKENS: &[&str] = &["import ", "print(", "print "];
const SHELL_TOKENS: &[&str] = &["echo ", "if [", "; do", "esac\n"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request body of the transcript-invocation shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl TranscriptRequest {
    /// A single assistant message wrapping `code` in a fence tagged with `language`.
    pub fn from_code(language: Language, code: &str) -> Self {
        Self {
            messages: vec![ChatMessage::new(
                Role::Assistant,
                format!("{FENCE}{language}\n{code}\n{FENCE}\n"),
            )],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedCode {
    pub language: Language,
    pub code: String,
}

/// Locate the code to run in the last (assistant) message.
///
/// Tagged blocks are scanned newest first: the newest Python block is
/// remembered, but a Shell block ends the scan and wins. Without any tagged
/// block only the newest block is classified, by shebang then by tokens.
pub fn select_code(messages: &[ChatMessage]) -> Result<SelectedCode, SelectError> {
    let last = messages.last().ok_or(SelectError::NoMessages)?;
    if last.role != Role::Assistant {
        return Err(SelectError::NotFromAssistant);
    }

    let segments: Vec<&str> = last.content.split(FENCE).collect();
    if segments.len() < 3 || segments.len() % 2 != 1 {
        return Err(SelectError::MalformedBlocks);
    }

    let mut chosen: Option<(Language, &str)> = None;
    for &block in segments.iter().skip(1).step_by(2).rev() {
        if starts_with_any(block, SHELL_TAGS) {
            chosen = Some((Language::Shell, block));
            break;
        }
        if chosen.is_none() && starts_with_any(block, PYTHON_TAGS) {
            chosen = Some((Language::Python, block));
        }
    }

    let (language, block) = match chosen {
        Some(found) => found,
        None => {
            let newest = segments[segments.len() - 2];
            let language = classify_untagged(newest).ok_or(SelectError::NoRecognizableBlock)?;
            (language, newest)
        }
    };

    Ok(SelectedCode {
        language,
        code: normalize(strip_marker(block, language), language),
    })
}

fn starts_with_any(block: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| block.starts_with(p))
}

fn classify_untagged(block: &str) -> Option<Language> {
    let first_line = block.trim().lines().next().unwrap_or_default();
    if first_line.starts_with("#!") {
        if first_line.ends_with("python") || first_line.ends_with("python3") {
            return Some(Language::Python);
        }
        if first_line.ends_with("sh") {
            return Some(Language::Shell);
        }
    }
    if PYTHON_TOKENS.iter().any(|t| block.contains(t)) {
        return Some(Language::Python);
    }
    if SHELL_TOKENS.iter().any(|t| block.contains(t)) {
        return Some(Language::Shell);
    }
    None
}

/// Drop a first line that is only a language tag or a shebang.
fn strip_marker(block: &str, language: Language) -> &str {
    let trimmed = block.trim_start();
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let first = first.trim();
    if first.starts_with("#!") || language.aliases().contains(&first) {
        rest
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant(content: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::new(Role::Assistant, content)]
    }

    #[test]
    fn empty_transcript_is_invalid() {
        assert_eq!(select_code(&[]), Err(SelectError::NoMessages));
    }

    #[test]
    fn last_message_must_be_from_assistant() {
        let messages = vec![
            ChatMessage::new(Role::Assistant, "```python\nprint(1)\n```"),
            ChatMessage::new(Role::User, "thanks"),
        ];
        assert_eq!(select_code(&messages), Err(SelectError::NotFromAssistant));
    }

    #[test]
    fn unbalanced_or_missing_fences_are_invalid() {
        assert_eq!(
            select_code(&assistant("no code here")),
            Err(SelectError::MalformedBlocks)
        );
        assert_eq!(
            select_code(&assistant("```python\nprint(1)\n```\n```")),
            Err(SelectError::MalformedBlocks)
        );
    }

    #[test]
    fn single_python_block() {
        let selected = select_code(&assistant("```python\nprint(1+1)\n```")).unwrap();
        assert_eq!(selected.language, Language::Python);
        assert_eq!(selected.code, "print(1+1)");
    }

    #[test]
    fn shell_block_found_first_in_reverse_scan_wins() {
        let content = "First:\n```python\nprint(1)\n```\nThen:\n```bash\necho 2\n```\n";
        let selected = select_code(&assistant(content)).unwrap();
        assert_eq!(selected.language, Language::Shell);
        assert_eq!(selected.code, "echo 2");
    }

    #[test]
    fn older_shell_block_overrides_newer_python() {
        let content = "```sh\nls\n```\ntext\n```python\nprint(1)\n```";
        let selected = select_code(&assistant(content)).unwrap();
        assert_eq!(selected.language, Language::Shell);
        assert_eq!(selected.code, "ls");
    }

    #[test]
    fn newest_python_block_is_remembered() {
        let content = "```python\nprint('old')\n```\n and \n```python3\nprint('new')\n```";
        let selected = select_code(&assistant(content)).unwrap();
        assert_eq!(selected.language, Language::Python);
        assert_eq!(selected.code, "print('new')");
    }

    #[test]
    fn untagged_shebang_blocks() {
        let py = select_code(&assistant("```\n#!/usr/bin/env python3\nx = 1\n```")).unwrap();
        assert_eq!(py.language, Language::Python);
        assert_eq!(py.code, "x = 1");

        let sh = select_code(&assistant("```\n#!/bin/sh\nls\n```")).unwrap();
        assert_eq!(sh.language, Language::Shell);
        assert_eq!(sh.code, "ls");
    }

    #[test]
    fn untagged_token_heuristics() {
        let py = select_code(&assistant("```\nimport sys\n```")).unwrap();
        assert_eq!(py.language, Language::Python);

        let sh = select_code(&assistant("```\nfor f in *; do echo $f; done\n```")).unwrap();
        assert_eq!(sh.language, Language::Shell);
    }

    #[test]
    fn only_newest_untagged_block_is_considered() {
        let content = "```\nimport os\n```\nand\n```\nSELECT 1;\n```";
        assert_eq!(
            select_code(&assistant(content)),
            Err(SelectError::NoRecognizableBlock)
        );
    }

    #[test]
    fn unknown_language_tag_is_not_recognized() {
        assert_eq!(
            select_code(&assistant("```rust\nfn main() {}\n```")),
            Err(SelectError::NoRecognizableBlock)
        );
    }

    #[test]
    fn from_code_builds_a_selectable_transcript() {
        let request = TranscriptRequest::from_code(Language::Shell, "echo hi");
        let selected = select_code(&request.messages).unwrap();
        assert_eq!(selected.language, Language::Shell);
        assert_eq!(selected.code, "echo hi");
    }

    #[test]
    fn unknown_roles_deserialize() {
        let request: TranscriptRequest = serde_json::from_str(
            r#"{"messages":[{"role":"developer","content":"x"},{"role":"assistant"}]}"#,
        )
        .unwrap();
        assert_eq!(request.messages[0].role, Role::Other);
        assert_eq!(request.messages[1].content, "");
    }
}
