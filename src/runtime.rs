//! Ingestion channel and single-slot task admission.
//!
//! Messages from the transport collaborator arrive as an ordered stream of
//! [`IngestMessage`]s. The runtime owns exactly one task slot: a prompt or
//! quick reply arriving while a task is in flight is dropped, not queued,
//! so two tool-call sequences never interleave against one automation
//! target.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::agent::Agent;
use crate::executor::ActionExecutor;
use crate::model::{self, ModelConfig};
use crate::notify::Notifier;

/// Logical message kinds delivered by the transport collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestMessage {
    /// Install or replace the API key used by the model client.
    Credential(String),
    /// Submit a new task.
    Prompt(String),
    /// User reply to the most recent delivered notification.
    QuickReply(String),
}

/// How the runtime turns a [`ModelConfig`] into a live client. Replaceable
/// so callers can wire in custom providers.
pub type ProviderFactory =
    Box<dyn Fn(&ModelConfig) -> Result<Box<dyn model::ModelClient>, model::ProviderError> + Send>;

/// Drives one [`Agent`] from an ingestion stream.
pub struct AgentRuntime<E: ActionExecutor, N: Notifier> {
    agent: Arc<Mutex<Agent<E, N>>>,
    model_config: ModelConfig,
    factory: ProviderFactory,
    /// True when a credential change has not yet been installed into the
    /// agent. Installation happens lazily, right before the next task, so
    /// credential messages never block on a running task.
    provider_dirty: bool,
    slot: Option<JoinHandle<()>>,
}

impl<E, N> AgentRuntime<E, N>
where
    E: ActionExecutor + Send + 'static,
    N: Notifier + Send + 'static,
{
    pub fn new(agent: Agent<E, N>, model_config: ModelConfig) -> Self {
        let provider_dirty = !model_config.api_key.is_empty();
        Self {
            agent: Arc::new(Mutex::new(agent)),
            model_config,
            factory: Box::new(|config| model::build_client(config)),
            provider_dirty,
            slot: None,
        }
    }

    /// Replace how provider clients are built from the current config.
    pub fn with_provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Shared handle to the agent, for inspection.
    pub fn agent(&self) -> Arc<Mutex<Agent<E, N>>> {
        self.agent.clone()
    }

    /// Consume the ingestion stream until the sender side closes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<IngestMessage>) {
        while let Some(message) = rx.recv().await {
            self.handle(message).await;
        }
        tracing::info!("ingestion channel closed, runtime stopping");
    }

    async fn handle(&mut self, message: IngestMessage) {
        match message {
            IngestMessage::Credential(key) => {
                self.model_config = self.model_config.clone().with_api_key(key);
                self.provider_dirty = true;
                tracing::info!("credential installed");
            }
            IngestMessage::Prompt(text) => {
                if self.slot_busy() {
                    tracing::warn!("task already in flight, dropping prompt");
                    return;
                }
                let provider = self.take_fresh_provider();
                let agent = self.agent.clone();
                self.slot = Some(tokio::spawn(async move {
                    let mut agent = agent.lock().await;
                    if let Some(provider) = provider {
                        agent.set_provider(provider);
                    }
                    if let Err(e) = agent.submit(&text).await {
                        tracing::error!(error = %e, "task failed");
                    }
                }));
            }
            IngestMessage::QuickReply(text) => {
                if self.slot_busy() {
                    tracing::warn!("task already in flight, dropping quick reply");
                    return;
                }
                let provider = self.take_fresh_provider();
                let agent = self.agent.clone();
                self.slot = Some(tokio::spawn(async move {
                    let mut agent = agent.lock().await;
                    if let Some(provider) = provider {
                        agent.set_provider(provider);
                    }
                    if let Err(e) = agent.resume(&text).await {
                        tracing::error!(error = %e, "quick reply failed");
                    }
                }));
            }
        }
    }

    fn slot_busy(&self) -> bool {
        self.slot
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Build a provider client for the latest credential, if it changed.
    fn take_fresh_provider(&mut self) -> Option<Box<dyn model::ModelClient>> {
        if !self.provider_dirty || self.model_config.api_key.is_empty() {
            return None;
        }
        match (self.factory)(&self.model_config) {
            Ok(client) => {
                self.provider_dirty = false;
                Some(client)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to build model client");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::conversation::ConversationState;
    use crate::executor::DryRunExecutor;
    use crate::model::{ModelClient, ModelTurnResult, ProviderError};
    use crate::notify::{Notifier, NotifyError};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Provider that takes a while, to hold the task slot open.
    struct SlowProvider {
        delay: Duration,
    }

    #[async_trait]
    impl ModelClient for SlowProvider {
        async fn send(
            &self,
            _state: &mut ConversationState,
        ) -> Result<ModelTurnResult, ProviderError> {
            tokio::time::sleep(self.delay).await;
            Ok(ModelTurnResult::FinalMessage("done".to_string()))
        }
    }

    struct CountingNotifier {
        delivered: Arc<StdMutex<u32>>,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn deliver(&self, _text: &str) -> Result<(), NotifyError> {
            *self.delivered.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn runtime_with_slow_provider(
        delay_ms: u64,
    ) -> (AgentRuntime<DryRunExecutor, CountingNotifier>, Arc<StdMutex<u32>>) {
        let delivered = Arc::new(StdMutex::new(0));
        let notifier = CountingNotifier {
            delivered: delivered.clone(),
        };
        let mut agent = Agent::new(DryRunExecutor::new(), notifier, AgentConfig::default());
        agent.set_provider(Box::new(SlowProvider {
            delay: Duration::from_millis(delay_ms),
        }));
        let runtime = AgentRuntime::new(agent, ModelConfig::openai(""));
        (runtime, delivered)
    }

    #[tokio::test]
    async fn test_prompt_while_busy_is_dropped() {
        let (runtime, delivered) = runtime_with_slow_provider(200);
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(runtime.run(rx));

        tx.send(IngestMessage::Prompt("first".to_string()))
            .await
            .unwrap();
        // Give the first task time to occupy the slot.
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(IngestMessage::Prompt("second".to_string()))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*delivered.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sequential_prompts_both_run() {
        let (runtime, delivered) = runtime_with_slow_provider(10);
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(runtime.run(rx));

        tx.send(IngestMessage::Prompt("first".to_string()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(IngestMessage::Prompt("second".to_string()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*delivered.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prompt_before_credential_is_rejected() {
        let delivered = Arc::new(StdMutex::new(0));
        let notifier = CountingNotifier {
            delivered: delivered.clone(),
        };
        let agent = Agent::new(DryRunExecutor::new(), notifier, AgentConfig::default());
        let runtime = AgentRuntime::new(agent, ModelConfig::openai(""));
        let agent = runtime.agent();
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(runtime.run(rx));

        tx.send(IngestMessage::Prompt("open settings".to_string()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(tx);
        handle.await.unwrap();

        // No provider was ever installed, so nothing ran.
        assert_eq!(*delivered.lock().unwrap(), 0);
        assert_eq!(agent.lock().await.phase(), crate::agent::Phase::Idle);
    }

    #[tokio::test]
    async fn test_credential_installs_provider_for_next_prompt() {
        let delivered = Arc::new(StdMutex::new(0));
        let notifier = CountingNotifier {
            delivered: delivered.clone(),
        };
        let agent = Agent::new(DryRunExecutor::new(), notifier, AgentConfig::default());

        let seen_keys = Arc::new(StdMutex::new(Vec::<String>::new()));
        let factory_keys = seen_keys.clone();
        let runtime = AgentRuntime::new(agent, ModelConfig::openai(""))
            .with_provider_factory(Box::new(move |config| {
                factory_keys.lock().unwrap().push(config.api_key.clone());
                Ok(Box::new(SlowProvider {
                    delay: Duration::from_millis(0),
                }))
            }));
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(runtime.run(rx));

        tx.send(IngestMessage::Credential("sk-test".to_string()))
            .await
            .unwrap();
        tx.send(IngestMessage::Prompt("open settings".to_string()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(tx);
        handle.await.unwrap();

        // The client was built once, with the installed key, and the
        // prompt ran with it.
        assert_eq!(seen_keys.lock().unwrap().as_slice(), &["sk-test".to_string()]);
        assert_eq!(*delivered.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_quick_reply_with_no_history_is_noop() {
        let (runtime, delivered) = runtime_with_slow_provider(10);
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(runtime.run(rx));

        tx.send(IngestMessage::QuickReply("hello?".to_string()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*delivered.lock().unwrap(), 0);
    }
}
