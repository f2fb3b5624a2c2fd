//! Tool-calling conversation loop

use serde::Serialize;

use super::client::{AssistantError, ChatBackend, ContentBlock, Message, Role};
use super::tools::AssistantTools;

/// Model turns allowed to request tools before the loop gives up
pub const MAX_TOOL_ROUNDS: usize = 5;

const SYSTEM_PROMPT: &str = "You are a nutrition assistant inside a personal food diary. \
Answer briefly and concretely. Use the tools to read the user's diary, ingredient library \
and goals instead of guessing. Amounts are grams for per_100g and per_kg ingredients and \
pieces for per_piece ingredients.";

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: serde_json::Value,
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub rounds: usize,
    /// True when the model still wanted tools after the last round
    pub truncated: bool,
}

pub struct ChatSession<'a> {
    backend: &'a dyn ChatBackend,
    tools: AssistantTools,
    system: String,
}

impl<'a> ChatSession<'a> {
    pub fn new(backend: &'a dyn ChatBackend, tools: AssistantTools, today: &str) -> Self {
        Self {
            backend,
            tools,
            system: format!("{} Today is {}.", SYSTEM_PROMPT, today),
        }
    }

    pub async fn ask(&self, question: &str) -> Result<ChatOutcome, AssistantError> {
        let definitions = self.tools.definitions();
        let mut messages = vec![Message::user(question)];
        let mut tool_calls = Vec::new();

        let mut round = 0;
        loop {
            round += 1;
            let reply = self.backend.send(&self.system, &messages, &definitions).await?;

            let mut results = Vec::new();
            for (id, name, input) in reply.tool_uses() {
                let (content, is_error) = match self.tools.execute(name, input) {
                    Ok(content) => (content, false),
                    Err(content) => (content, true),
                };
                tracing::debug!(round, tool = name, is_error, "assistant tool call");
                tool_calls.push(ToolCallRecord {
                    name: name.to_string(),
                    input: input.clone(),
                    is_error,
                });
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content,
                    is_error,
                });
            }

            if results.is_empty() {
                return Ok(ChatOutcome {
                    reply: reply.text(),
                    tool_calls,
                    rounds: round,
                    truncated: false,
                });
            }

            if round >= MAX_TOOL_ROUNDS {
                tracing::warn!(rounds = round, "assistant tool loop exhausted");
                return Ok(ChatOutcome {
                    reply: reply.text(),
                    tool_calls,
                    rounds: round,
                    truncated: true,
                });
            }

            messages.push(Message {
                role: Role::Assistant,
                content: reply.content,
            });
            messages.push(Message {
                role: Role::User,
                content: results,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::client::{ChatReply, ToolDefinition};
    use crate::tools::test_support::test_db;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned replies and records what it was sent
    struct ScriptedBackend {
        replies: Mutex<Vec<ChatReply>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedBackend {
        fn new(mut replies: Vec<ChatReply>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send(
            &self,
            _system: &str,
            messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<ChatReply, AssistantError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or(AssistantError::Http { status: 500, body: "script ended".into() })
        }
    }

    fn text(t: &str) -> ChatReply {
        ChatReply {
            content: vec![ContentBlock::Text { text: t.into() }],
            stop_reason: Some("end_turn".into()),
        }
    }

    fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ChatReply {
        ChatReply {
            content: vec![ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            }],
            stop_reason: Some("tool_use".into()),
        }
    }

    #[tokio::test]
    async fn test_plain_answer_single_round() {
        let (_dir, db) = test_db();
        let backend = ScriptedBackend::new(vec![text("Eat more greens.")]);
        let session = ChatSession::new(&backend, AssistantTools::new(db, 20), "2025-03-01");

        let outcome = session.ask("Any tips?").await.unwrap();
        assert_eq!(outcome.reply, "Eat more greens.");
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_tool_results_fed_back() {
        let (_dir, db) = test_db();
        let backend = ScriptedBackend::new(vec![
            tool_use("tu_1", "get_goals", json!({})),
            tool_use("tu_2", "get_day_summary", json!({"date": "bad"})),
            text("No goals set yet."),
        ]);
        let session = ChatSession::new(&backend, AssistantTools::new(db, 20), "2025-03-01");

        let outcome = session.ask("How am I doing?").await.unwrap();
        assert_eq!(outcome.reply, "No goals set yet.");
        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.tool_calls.len(), 2);
        assert!(!outcome.tool_calls[0].is_error);
        assert!(outcome.tool_calls[1].is_error);

        let seen = backend.seen.lock().unwrap();
        let second = &seen[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, Role::Assistant);
        assert_eq!(
            second[2].content[0],
            ContentBlock::ToolResult {
                tool_use_id: "tu_1".into(),
                content: "null".into(),
                is_error: false,
            }
        );
    }

    #[tokio::test]
    async fn test_loop_stops_after_max_rounds() {
        let (_dir, db) = test_db();
        let replies = (0..MAX_TOOL_ROUNDS)
            .map(|i| tool_use(&format!("tu_{}", i), "get_goals", json!({})))
            .collect();
        let backend = ScriptedBackend::new(replies);
        let session = ChatSession::new(&backend, AssistantTools::new(db, 20), "2025-03-01");

        let outcome = session.ask("Loop forever").await.unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.rounds, MAX_TOOL_ROUNDS);
        assert_eq!(outcome.tool_calls.len(), MAX_TOOL_ROUNDS);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let (_dir, db) = test_db();
        let backend = ScriptedBackend::new(Vec::new());
        let session = ChatSession::new(&backend, AssistantTools::new(db, 20), "2025-03-01");
        assert!(matches!(
            session.ask("hello").await,
            Err(AssistantError::Http { status: 500, .. })
        ));
    }
}
