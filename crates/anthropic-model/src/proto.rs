use app_insight_model::{Message, ModelRequest, ModelTool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AnthropicConfig;

// ------------------------------
// Types received from the server
// ------------------------------

/// One event of a streamed Messages response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    ContentBlockStart {
        index: usize,
        content_block: BlockStart,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDelta,
    },
    MessageStop,
    Error {
        error: ApiError,
    },
    /// `message_start`, `ping` and anything added later.
    #[serde(other)]
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockStart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MessageDelta {
    pub stop_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// The body of a failed HTTP response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Tool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

/// The conversation types already match the wire format, so they are
/// borrowed as they are.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool<'a>>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request<'a>(
    req: &'a ModelRequest,
    config: &'a AnthropicConfig,
) -> MessagesRequest<'a> {
    MessagesRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        system: req.system.as_deref(),
        messages: &req.messages,
        tools: req.tools.iter().map(create_tool).collect(),
        stream: true,
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool<'_> {
    Tool {
        name: &tool.name,
        description: &tool.description,
        input_schema: &tool.parameters,
    }
}

#[cfg(test)]
mod tests {
    use app_insight_model::{ContentBlock, Role};
    use serde_json::json;

    use super::*;
    use crate::AnthropicConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            system: Some("You are a helpful assistant.".to_owned()),
            messages: vec![
                Message::user("Hello"),
                Message::with_blocks(
                    Role::Assistant,
                    vec![ContentBlock::ToolUse {
                        id: "toolu_1".to_owned(),
                        name: "get_file".to_owned(),
                        input: json!({ "file_id": "9" }),
                    }],
                ),
                Message::with_blocks(
                    Role::User,
                    vec![ContentBlock::ToolResult {
                        tool_use_id: "toolu_1".to_owned(),
                        content: r#"{"error":"gone"}"#.to_owned(),
                        is_error: true,
                    }],
                ),
            ],
            tools: vec![ModelTool {
                name: "get_file".to_owned(),
                description: "Gets a file.".to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": { "file_id": { "type": "string" } },
                    "required": ["file_id"]
                }),
            }],
        };
        let config = AnthropicConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .with_max_tokens(1024)
            .build();

        let body = serde_json::to_value(create_request(&request, &config))
            .unwrap();
        assert_eq!(
            body,
            json!({
                "model": "custom",
                "max_tokens": 1024,
                "system": "You are a helpful assistant.",
                "messages": [
                    { "role": "user", "content": "Hello" },
                    {
                        "role": "assistant",
                        "content": [{
                            "type": "tool_use",
                            "id": "toolu_1",
                            "name": "get_file",
                            "input": { "file_id": "9" }
                        }]
                    },
                    {
                        "role": "user",
                        "content": [{
                            "type": "tool_result",
                            "tool_use_id": "toolu_1",
                            "content": "{\"error\":\"gone\"}",
                            "is_error": true
                        }]
                    }
                ],
                "tools": [{
                    "name": "get_file",
                    "description": "Gets a file.",
                    "input_schema": {
                        "type": "object",
                        "properties": { "file_id": { "type": "string" } },
                        "required": ["file_id"]
                    }
                }],
                "stream": true
            })
        );
    }

    #[test]
    fn test_parse_events() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"message_start","message":{"id":"msg_1","content":[]}}"#,
        )
        .unwrap();
        assert_eq!(event, StreamEvent::Ignored);

        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"content_block_start","index":1,
                "content_block":{"type":"tool_use","id":"toolu_1",
                "name":"get_file","input":{}}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::ContentBlockStart {
                index: 1,
                content_block: BlockStart::ToolUse {
                    id: "toolu_1".to_owned(),
                    name: "get_file".to_owned(),
                },
            }
        );

        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"content_block_delta","index":0,
                "delta":{"type":"thinking_delta","thinking":"hmm"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::ContentBlockDelta {
                index: 0,
                delta: BlockDelta::Other,
            }
        );
    }
}
