//! Fallback when a turn fails: let the model explain, or apologize.

use crate::error::AgentError;
use crate::orchestrator::{AgentOrchestrator, TurnContext};
use chrono::Utc;
use merlin_core::event::DomainEvent;
use merlin_core::exception::ExceptionSink;
use merlin_core::message::ChatMessage;
use std::sync::Arc;
use tracing::{info, warn};

/// Sent when neither the turn nor its explanation produced a usable reply.
pub const STATIC_APOLOGY: &str = "Sorry, something went wrong on my side and I couldn't finish your request. \
Please try again in a few minutes, or contact support if it keeps happening.\n\nTools Used: none";

/// What the user ends up receiving for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn completed normally
    Answered(String),
    /// The turn failed and the model explained the failure
    Explained(String),
    /// Both attempts failed
    Apologized,
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Answered(text) | TurnOutcome::Explained(text) => text,
            TurnOutcome::Apologized => STATIC_APOLOGY,
        }
    }

    pub fn is_recovered(&self) -> bool {
        !matches!(self, TurnOutcome::Answered(_))
    }
}

/// Wraps [`AgentOrchestrator::invoke`] so a failed turn never reaches the
/// user as raw error text.
pub struct ErrorRecoveryPath {
    agent: Arc<AgentOrchestrator>,
    sink: Arc<dyn ExceptionSink>,
}

impl ErrorRecoveryPath {
    pub fn new(agent: Arc<AgentOrchestrator>, sink: Arc<dyn ExceptionSink>) -> Self {
        Self { agent, sink }
    }

    pub fn agent(&self) -> &Arc<AgentOrchestrator> {
        &self.agent
    }

    /// Answer `message` on the turn's thread, recovering from failure.
    pub async fn run(&self, message: &str, turn: &TurnContext) -> TurnOutcome {
        let error = match self.agent.invoke(vec![ChatMessage::user(message)], turn).await {
            Ok(thread) => match final_text(&thread) {
                Some(text) => return TurnOutcome::Answered(text),
                None => AgentError::EmptyResponse,
            },
            Err(e) => e,
        };

        let thread_id = self.agent.thread_id_for(turn).to_string();
        let error_message = error.to_string();
        warn!(thread_id = %thread_id, error = %error_message, "Turn failed, asking for an explanation");
        self.agent.event_bus().publish(DomainEvent::RecoveryTriggered {
            thread_id: thread_id.clone(),
            error_message: error_message.clone(),
            timestamp: Utc::now(),
        });

        // The prompt carries the raw error, so it stays out of the checkpoint.
        let prompt = ChatMessage::developer(explanation_prompt(message, &error_message));
        match self
            .agent
            .invoke_with_instructions(vec![ChatMessage::user(message)], vec![prompt], turn)
            .await
        {
            Ok(thread) => match final_text(&thread) {
                Some(text) if !text.contains(&error_message) => {
                    info!(thread_id = %thread_id, "Failure explained");
                    return TurnOutcome::Explained(text);
                }
                Some(_) => warn!(thread_id = %thread_id, "Explanation leaked the raw error"),
                None => warn!(thread_id = %thread_id, "Explanation was empty"),
            },
            Err(e) => warn!(thread_id = %thread_id, error = %e, "Explanation turn failed"),
        }

        self.sink
            .capture_exception(&error, &format!("agent turn on thread {thread_id}"));
        TurnOutcome::Apologized
    }
}

fn final_text(thread: &[ChatMessage]) -> Option<String> {
    thread
        .last()
        .filter(|m| m.is_final_answer() && !m.content.trim().is_empty())
        .map(|m| m.content.clone())
}

fn explanation_prompt(user_message: &str, error_message: &str) -> String {
    format!(
        "The previous attempt to answer the user failed.\n\
         User message: {user_message}\n\
         Error: {error_message}\n\
         Explain to the user in plain, non-technical language that their request could not be completed. \
         Do not quote the error or mention internal details. \
         Suggest what they can do next, such as trying again later or contacting support. \
         Reply in the same language as the user message and end with the usual \"Tools Used:\" line."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use merlin_core::checkpoint::CheckpointStore;
    use merlin_core::error::ProviderError;
    use merlin_core::message::Role;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        captured: Mutex<Vec<(String, String)>>,
    }

    impl ExceptionSink for RecordingSink {
        fn capture_exception(&self, error: &(dyn std::error::Error + Send + Sync), context: &str) {
            self.captured
                .lock()
                .unwrap()
                .push((error.to_string(), context.to_string()));
        }
    }

    fn recovery(provider: Arc<SequentialMockProvider>) -> (ErrorRecoveryPath, Arc<RecordingSink>) {
        let (tools, _) = memory_tools();
        let agent = AgentOrchestrator::new(provider, tools, checkpoints(), "mock-model");
        let sink = Arc::new(RecordingSink::default());
        (ErrorRecoveryPath::new(Arc::new(agent), sink.clone()), sink)
    }

    fn turn() -> TurnContext {
        TurnContext::new(test_user()).with_thread("t1")
    }

    fn outage() -> ProviderError {
        ProviderError::Network("connection reset by upstream 10.0.0.7".into())
    }

    #[tokio::test]
    async fn successful_turn_is_answered() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("Hi Ada")]));
        let (path, sink) = recovery(provider.clone());

        let outcome = path.run("hello", &turn()).await;
        assert_eq!(outcome, TurnOutcome::Answered("Hi Ada\n\nTools Used: none".into()));
        assert!(!outcome.is_recovered());
        assert_eq!(provider.call_count(), 1);
        assert!(sink.captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_is_explained_by_the_model() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![
            Err(outage()),
            Ok(make_text_response(
                "I couldn't reach my services just now. Please try again later.\nTools Used: none",
            )),
        ]));
        let (path, sink) = recovery(provider.clone());
        let mut events = path.agent().event_bus().subscribe();

        let outcome = path.run("What do I like?", &turn()).await;
        assert!(matches!(outcome, TurnOutcome::Explained(_)));
        assert!(outcome.text().ends_with("Tools Used: none"));
        assert!(sink.captured.lock().unwrap().is_empty());

        let fallback = &provider.requests()[1];
        let prompt = fallback.messages.last().unwrap();
        assert_eq!(prompt.role, Role::Developer);
        assert!(prompt.content.contains("What do I like?"));
        assert!(prompt.content.contains("connection reset"));

        let event = events.recv().await.unwrap();
        assert!(matches!(&*event, DomainEvent::RecoveryTriggered { thread_id, .. } if thread_id == "t1"));
    }

    #[tokio::test]
    async fn explained_turn_keeps_error_out_of_the_thread() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![
            Err(outage()),
            Ok(make_text_response("I couldn't finish that. Please try again later.")),
            Ok(make_text_response("Sure, hello again.")),
        ]));
        let (tools, _) = memory_tools();
        let store = checkpoints();
        let agent = AgentOrchestrator::new(provider.clone(), tools, store.clone(), "mock-model");
        let path = ErrorRecoveryPath::new(Arc::new(agent), Arc::new(RecordingSink::default()));

        let outcome = path.run("What do I like?", &turn()).await;
        assert!(matches!(outcome, TurnOutcome::Explained(_)));

        let saved = store.get("t1").await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].role, Role::User);
        assert_eq!(saved[0].content, "What do I like?");
        assert!(saved.iter().all(|m| !m.content.contains("connection reset")));

        path.run("hello", &turn()).await;
        let next = &provider.requests()[2];
        assert!(next.messages.iter().all(|m| !m.content.contains("connection reset")));
    }

    #[tokio::test]
    async fn failed_explanation_falls_back_to_apology() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![
            Err(outage()),
            Err(ProviderError::Timeout("deadline".into())),
        ]));
        let (path, sink) = recovery(provider);

        let outcome = path.run("hello", &turn()).await;
        assert_eq!(outcome, TurnOutcome::Apologized);
        assert_eq!(outcome.text(), STATIC_APOLOGY);
        assert!(!outcome.text().contains("connection reset"));

        let captured = sink.captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].0.contains("connection reset"));
        assert!(captured[0].1.contains("t1"));
    }

    #[tokio::test]
    async fn explanation_echoing_the_error_is_replaced() {
        let raw = AgentError::Provider(outage()).to_string();
        let provider = Arc::new(SequentialMockProvider::scripted(vec![
            Err(outage()),
            Ok(make_text_response(&format!("Oops: {raw}"))),
        ]));
        let (path, sink) = recovery(provider);

        let outcome = path.run("hello", &turn()).await;
        assert_eq!(outcome, TurnOutcome::Apologized);
        assert_eq!(sink.captured.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn step_limit_triggers_recovery() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(
                vec![make_tool_call("retrieveMemories", serde_json::json!({"content": "x"}))],
                "",
            ),
            make_text_response("That took too long, please try again.\nTools Used: none"),
        ]));
        let (tools, _) = memory_tools();
        let agent = AgentOrchestrator::new(provider, tools, checkpoints(), "mock-model").with_max_steps(1);
        let path = ErrorRecoveryPath::new(Arc::new(agent), Arc::new(RecordingSink::default()));

        let outcome = path.run("find x", &turn()).await;
        assert!(matches!(outcome, TurnOutcome::Explained(_)));
    }
}
