//! The tool-augmented reasoning loop.

use crate::error::AgentError;
use crate::guidance;
use chrono::Utc;
use merlin_core::checkpoint::CheckpointStore;
use merlin_core::event::{DomainEvent, EventBus};
use merlin_core::message::ChatMessage;
use merlin_core::provider::{Provider, ProviderRequest};
use merlin_core::tool::{ToolCall, ToolKind};
use merlin_core::user::User;
use merlin_tools::{ToolContext, ToolRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Who a turn is for and which thread it continues.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Falls back to the orchestrator's default thread when absent
    pub thread_id: Option<String>,
    pub user: User,
}

impl TurnContext {
    pub fn new(user: User) -> Self {
        Self {
            thread_id: None,
            user,
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    fn tool_context(&self) -> ToolContext {
        ToolContext {
            user_id: self.user.id.clone(),
        }
    }
}

/// Runs turns against per-thread checkpoints.
///
/// A turn is: guidance, the thread's history, then the new messages. Each
/// step asks the provider for either tool calls or a final answer; tool
/// calls go to the registry and their text results are appended before the
/// next step. Only a completed turn is written back to the checkpoint.
pub struct AgentOrchestrator {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    checkpoints: Arc<dyn CheckpointStore>,
    model: String,
    temperature: f32,
    max_steps: u32,
    default_thread_id: String,
    event_bus: Arc<EventBus>,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            checkpoints,
            model: model.into(),
            temperature: 0.0,
            max_steps: 10,
            default_thread_id: "default-thread".into(),
            event_bus: Arc::new(EventBus::default()),
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of completion calls per turn.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max.max(1);
        self
    }

    pub fn with_default_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.default_thread_id = thread_id.into();
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// The thread a turn will run on.
    pub fn thread_id_for<'a>(&'a self, turn: &'a TurnContext) -> &'a str {
        turn.thread_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.default_thread_id)
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run one turn. Returns the thread after the turn; its last element is
    /// the final answer, which always ends with a "Tools Used:" line.
    pub async fn invoke(
        &self,
        messages: Vec<ChatMessage>,
        turn: &TurnContext,
    ) -> Result<Vec<ChatMessage>, AgentError> {
        self.invoke_with_instructions(messages, Vec::new(), turn).await
    }

    /// Like [`invoke`](Self::invoke), with `instructions` placed after the new
    /// messages for this turn only. Instructions are never checkpointed and
    /// are not part of the returned thread.
    pub async fn invoke_with_instructions(
        &self,
        messages: Vec<ChatMessage>,
        instructions: Vec<ChatMessage>,
        turn: &TurnContext,
    ) -> Result<Vec<ChatMessage>, AgentError> {
        let thread_id = self.thread_id_for(turn);
        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;

        let history = self.checkpoints.get(thread_id).await?;
        info!(
            thread_id,
            history = history.len(),
            new_messages = messages.len(),
            "Starting turn"
        );

        let kinds = self.tools.kinds();
        let guidance = ChatMessage::developer(guidance::policy(&turn.user, &kinds));
        let definitions = self.tools.definitions();
        let tool_ctx = turn.tool_context();

        let input_len = messages.len();
        let mut turn_messages = messages;
        let mut used: Vec<ToolKind> = Vec::new();

        for step in 1..=self.max_steps {
            debug!(thread_id, step, "Agent step");

            let mut context =
                Vec::with_capacity(1 + history.len() + instructions.len() + turn_messages.len());
            context.push(guidance.clone());
            context.extend(history.iter().cloned());
            context.extend(turn_messages[..input_len].iter().cloned());
            context.extend(instructions.iter().cloned());
            context.extend(turn_messages[input_len..].iter().cloned());

            let request = ProviderRequest::new(self.model.clone(), context)
                .with_tools(definitions.clone())
                .with_temperature(self.temperature);
            let response = self.provider.complete(request).await?;
            let mut message = response.message;

            if message.tool_calls.is_empty() {
                if message.content.trim().is_empty() {
                    return Err(AgentError::EmptyResponse);
                }
                message.content = guidance::ensure_trailer(&message.content, &used);
                turn_messages.push(message);

                self.checkpoints
                    .append(thread_id, turn_messages.clone())
                    .await?;

                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    thread_id: thread_id.to_string(),
                    model: response.model,
                    steps: step,
                    timestamp: Utc::now(),
                });
                info!(thread_id, steps = step, tools = used.len(), "Turn complete");

                let mut thread = history;
                thread.extend(turn_messages);
                return Ok(thread);
            }

            let calls = message.tool_calls.clone();
            turn_messages.push(message);

            for tc in &calls {
                let arguments = serde_json::from_str(&tc.arguments)
                    .unwrap_or_else(|_| serde_json::Value::String(tc.arguments.clone()));
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments,
                };

                let start = Instant::now();
                let result = self.tools.execute(&call, &tool_ctx).await;
                let duration_ms = start.elapsed().as_millis() as u64;

                if let Some(kind) = result.kind
                    && !used.contains(&kind)
                {
                    used.push(kind);
                }

                self.event_bus.publish(DomainEvent::ToolExecuted {
                    thread_id: thread_id.to_string(),
                    tool_name: tc.name.clone(),
                    success: result.success,
                    duration_ms,
                    timestamp: Utc::now(),
                });

                turn_messages.push(ChatMessage::tool_result(&tc.id, result.output));
            }
        }

        warn!(thread_id, max_steps = self.max_steps, "Step limit reached");
        Err(AgentError::StepLimit {
            steps: self.max_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use merlin_core::error::ProviderError;
    use merlin_core::message::Role;
    use serde_json::json;

    fn orchestrator(provider: Arc<SequentialMockProvider>) -> (AgentOrchestrator, Arc<merlin_memory::InMemoryCheckpointStore>) {
        let (tools, _) = memory_tools();
        let store = checkpoints();
        (
            AgentOrchestrator::new(provider, tools, store.clone(), "mock-model"),
            store,
        )
    }

    fn turn() -> TurnContext {
        TurnContext::new(test_user()).with_thread("t1")
    }

    #[tokio::test]
    async fn simple_answer_gets_trailer() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("Hello!")]));
        let (agent, _) = orchestrator(provider.clone());

        let thread = agent.invoke(vec![ChatMessage::user("Hi")], &turn()).await.unwrap();
        let last = thread.last().unwrap();
        assert!(last.is_final_answer());
        assert_eq!(last.content, "Hello!\n\nTools Used: none");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn guidance_precedes_history_precedes_new_turn() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("First.\nTools Used: none"),
            make_text_response("Second.\nTools Used: none"),
        ]));
        let (agent, store) = orchestrator(provider.clone());

        agent.invoke(vec![ChatMessage::user("one")], &turn()).await.unwrap();
        let thread = agent.invoke(vec![ChatMessage::user("two")], &turn()).await.unwrap();
        assert_eq!(thread.len(), 4);

        let request = &provider.requests()[1];
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::Developer, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(request.messages[1].content, "one");
        assert_eq!(request.messages[3].content, "two");
        assert!(!request.tools.is_empty());

        // guidance is never persisted
        let persisted = store.get("t1").await.unwrap();
        assert!(persisted.iter().all(|m| m.role != Role::Developer));
    }

    #[tokio::test]
    async fn tool_call_is_dispatched_and_trailer_names_it() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("saveMemory", json!({"content": "I like tea"}))],
            "Got it, I will remember that.",
        ));
        let (agent, _) = orchestrator(provider.clone());

        let thread = agent
            .invoke(vec![ChatMessage::user("Remember I like tea")], &turn())
            .await
            .unwrap();

        // user, assistant(tool call), tool result, final
        assert_eq!(thread.len(), 4);
        assert_eq!(thread[2].role, Role::Tool);
        assert_eq!(thread[2].content, "Memory saved successfully!");
        assert!(thread[3].content.ends_with("Tools Used: saveMemory"));

        let second = &provider.requests()[1];
        assert_eq!(second.messages.last().unwrap().role, Role::Tool);
    }

    #[tokio::test]
    async fn failing_tool_does_not_abort_the_turn() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("saveMemory", json!({"wrong": 1}))],
            "I could not save that.",
        ));
        let (agent, _) = orchestrator(provider);

        let thread = agent
            .invoke(vec![ChatMessage::user("Remember this")], &turn())
            .await
            .unwrap();
        assert!(thread[2].content.starts_with("Error saving memory:"));
        assert!(guidance::has_trailer(&thread.last().unwrap().content));
        assert!(thread.last().unwrap().content.ends_with("Tools Used: saveMemory"));
    }

    #[tokio::test]
    async fn unknown_tool_still_ends_with_trailer() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("launchRocket", json!({}))],
            "That is not something I can do.",
        ));
        let (agent, _) = orchestrator(provider);

        let thread = agent
            .invoke(vec![ChatMessage::user("Launch!")], &turn())
            .await
            .unwrap();
        assert!(thread.last().unwrap().content.ends_with("Tools Used: none"));
    }

    #[tokio::test]
    async fn step_limit_is_an_error_and_nothing_is_persisted() {
        let responses = (0..5)
            .map(|_| make_tool_call_response(vec![make_tool_call("retrieveMemories", json!({"content": "tea"}))], ""))
            .collect();
        let provider = Arc::new(SequentialMockProvider::new(responses));
        let (agent, store) = orchestrator(provider.clone());
        let agent = agent.with_max_steps(3);

        let err = agent
            .invoke(vec![ChatMessage::user("loop")], &turn())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::StepLimit { steps: 3 }));
        assert_eq!(provider.call_count(), 3);
        assert!(store.get("t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![Err(
            ProviderError::RateLimited { retry_after_secs: 5 },
        )]));
        let (agent, _) = orchestrator(provider);
        let err = agent
            .invoke(vec![ChatMessage::user("hi")], &turn())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn empty_final_answer_is_an_error() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("  ")]));
        let (agent, _) = orchestrator(provider);
        let err = agent
            .invoke(vec![ChatMessage::user("hi")], &turn())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[tokio::test]
    async fn missing_thread_uses_default() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("ok")]));
        let (agent, store) = orchestrator(provider);
        let agent = agent.with_default_thread("fallback");

        let turn = TurnContext::new(test_user());
        assert_eq!(agent.thread_id_for(&turn), "fallback");
        agent.invoke(vec![ChatMessage::user("hi")], &turn).await.unwrap();
        assert_eq!(store.get("fallback").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_thread_do_not_interleave() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_tool_call("saveMemory", json!({"content": "a"}))], ""),
            make_text_response("done a"),
            make_tool_call_response(vec![make_tool_call("saveMemory", json!({"content": "b"}))], ""),
            make_text_response("done b"),
        ]));
        let (agent, store) = orchestrator(provider);
        let agent = Arc::new(agent);

        let a = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.invoke(vec![ChatMessage::user("a")], &turn()).await })
        };
        let b = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.invoke(vec![ChatMessage::user("b")], &turn()).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let persisted = store.get("t1").await.unwrap();
        assert_eq!(persisted.len(), 8);
        // each turn is contiguous: user, tool call, tool result, final
        for chunk in persisted.chunks(4) {
            assert_eq!(chunk[0].role, Role::User);
            assert_eq!(chunk[1].tool_calls.len(), 1);
            assert_eq!(chunk[2].role, Role::Tool);
            assert!(chunk[3].is_final_answer());
        }
    }

    #[tokio::test]
    async fn events_are_published() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("saveMemory", json!({"content": "tea"}))],
            "Saved.",
        ));
        let (agent, _) = orchestrator(provider);
        let mut rx = agent.event_bus().subscribe();

        agent.invoke(vec![ChatMessage::user("tea")], &turn()).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(&*first, DomainEvent::ToolExecuted { tool_name, success: true, .. } if tool_name == "saveMemory"));
        let second = rx.recv().await.unwrap();
        assert!(matches!(&*second, DomainEvent::ResponseGenerated { steps: 2, .. }));
    }
}
