use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user, or tool results handed back on their behalf.
    User,
    /// The model.
    Assistant,
}

/// A complete message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote this message.
    pub role: Role,
    /// The message body.
    pub content: Content,
}

/// The body of a message, either plain text or a list of typed blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text.
    Text(String),
    /// Typed content blocks.
    Blocks(Vec<ContentBlock>),
}

/// A typed piece of message content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A text block.
    Text {
        /// The text.
        text: String,
    },
    /// A tool invocation issued by the model.
    ToolUse {
        /// The invocation identifier, used to correlate the result.
        id: String,
        /// Name of the tool to call.
        name: String,
        /// Input parameters of the call.
        input: Value,
    },
    /// The outcome of a tool invocation.
    ToolResult {
        /// The identifier of the invocation this result answers.
        tool_use_id: String,
        /// Serialized result payload.
        content: String,
        /// Whether the payload describes a failure.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl Message {
    /// Creates a plain-text user message.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
        }
    }

    /// Creates a plain-text assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
        }
    }

    /// Creates a message from content blocks.
    #[inline]
    pub fn with_blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: Content::Blocks(blocks),
        }
    }

    /// Returns the content blocks of this message. A plain-text body is
    /// viewed as a single text block.
    pub fn blocks(&self) -> Vec<ContentBlock> {
        match &self.content {
            Content::Text(text) => vec![ContentBlock::Text { text: text.clone() }],
            Content::Blocks(blocks) => blocks.clone(),
        }
    }

    /// Joins all text in this message, one line per text block.
    pub fn text(&self) -> String {
        match &self.content {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Iterates over the tool invocations in this message.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        let blocks = match &self.content {
            Content::Text(_) => &[][..],
            Content::Blocks(blocks) => blocks.as_slice(),
        };
        blocks.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            }
            _ => None,
        })
    }

    /// Returns `true` if this message answers tool invocations of the
    /// message before it.
    pub fn has_tool_results(&self) -> bool {
        match &self.content {
            Content::Text(_) => false,
            Content::Blocks(blocks) => blocks
                .iter()
                .any(|block| matches!(block, ContentBlock::ToolResult { .. })),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_shape() {
        let msg = Message::with_blocks(
            Role::Assistant,
            vec![
                ContentBlock::Text {
                    text: "Let me check.".to_owned(),
                },
                ContentBlock::ToolUse {
                    id: "toolu_1".to_owned(),
                    name: "list_data_sources".to_owned(),
                    input: json!({}),
                },
            ],
        );
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "assistant",
                "content": [
                    { "type": "text", "text": "Let me check." },
                    {
                        "type": "tool_use",
                        "id": "toolu_1",
                        "name": "list_data_sources",
                        "input": {}
                    }
                ]
            })
        );

        let results: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [
                { "type": "tool_result", "tool_use_id": "toolu_1", "content": "[]" },
                {
                    "type": "tool_result",
                    "tool_use_id": "toolu_2",
                    "content": "{\"error\":\"boom\"}",
                    "is_error": true
                }
            ]
        }))
        .unwrap();
        let Content::Blocks(blocks) = &results.content else {
            panic!("expected blocks");
        };
        assert!(matches!(
            &blocks[0],
            ContentBlock::ToolResult { is_error: false, .. }
        ));
        assert!(matches!(
            &blocks[1],
            ContentBlock::ToolResult { is_error: true, .. }
        ));

        let plain: Message =
            serde_json::from_value(json!({ "role": "user", "content": "hi" }))
                .unwrap();
        assert_eq!(plain, Message::user("hi"));

        assert!(results.has_tool_results());
        assert!(!msg.has_tool_results());
        assert!(!plain.has_tool_results());
    }

    #[test]
    fn test_text_joins_blocks() {
        let msg = Message::with_blocks(
            Role::Assistant,
            vec![
                ContentBlock::Text {
                    text: "first".to_owned(),
                },
                ContentBlock::ToolUse {
                    id: "1".to_owned(),
                    name: "get_file".to_owned(),
                    input: json!({ "file_id": "9" }),
                },
                ContentBlock::Text {
                    text: "second".to_owned(),
                },
            ],
        );
        assert_eq!(msg.text(), "first\nsecond");
        assert_eq!(msg.tool_uses().count(), 1);
        assert_eq!(Message::user("plain").text(), "plain");
    }
}
