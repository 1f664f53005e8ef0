//! The agent orchestration loop.
//!
//! [`Agent`] turns a single user prompt into a possibly multi-step
//! conversation with the model: each requested tool call is executed
//! against the live UI, the refreshed accessibility tree is fed back as the
//! tool result, and the loop repeats until the model produces a terminal
//! message. The finished conversation is retained so a quick reply to the
//! delivered notification can resume it.

use thiserror::Error;
use uuid::Uuid;

use crate::conversation::{ConversationState, Turn};
use crate::executor::{ActionExecutor, ExecutorError};
use crate::model::{ModelClient, ModelTurnResult, ProviderError};
use crate::notify::Notifier;
use crate::tools::{self, ActionDecodeError, DeclaredAction, ToolInvocationRequest};
use crate::tree;

/// Fixed instruction text sent as the first turn of every task.
pub const SYSTEM_PROMPT: &str = "You are an iPhone using assistant that helps the user accomplish their tasks.
You have multiple tools available, and it might take multiple steps to complete a task.
Never ask the user what they want to do, just perform the action.";

/// Default bound on model round trips per task.
pub const DEFAULT_MAX_STEPS: u32 = 40;

/// Agent errors. Every tool-level failure is folded back into the
/// conversation instead; only these abort a task.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("No API key found")]
    ApiNotConfigured,
    #[error("a task is already running")]
    Busy,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("model did not produce a final message within {0} steps")]
    StepLimitReached(u32),
}

/// Loop phase. `Suspended` means a finished conversation is retained and a
/// quick reply can resume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Suspended,
}

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum model round trips before a task is aborted.
    pub max_steps: u32,
    /// Custom instruction text (defaults to [`SYSTEM_PROMPT`]).
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt: None,
        }
    }
}

impl AgentConfig {
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Failures local to one tool call; their text becomes the tool result.
#[derive(Error, Debug)]
enum ToolCallError {
    #[error(transparent)]
    Decode(#[from] ActionDecodeError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// The agent loop state machine.
pub struct Agent<E: ActionExecutor, N: Notifier> {
    provider: Option<Box<dyn ModelClient>>,
    executor: E,
    notifier: N,
    config: AgentConfig,
    phase: Phase,
    /// Snapshot of the finished conversation, as it existed before the most
    /// recent model turn. Resuming from it never duplicates or skips a turn.
    last_state: Option<ConversationState>,
    /// Bundle identifier of the current automation target. Mutated only by
    /// `openApp` handling.
    current_app: Option<String>,
}

impl<E: ActionExecutor, N: Notifier> Agent<E, N> {
    pub fn new(executor: E, notifier: N, config: AgentConfig) -> Self {
        Self {
            provider: None,
            executor,
            notifier,
            config,
            phase: Phase::Idle,
            last_state: None,
            current_app: None,
        }
    }

    /// Install or replace the provider client.
    pub fn set_provider(&mut self, provider: Box<dyn ModelClient>) {
        self.provider = Some(provider);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_state(&self) -> Option<&ConversationState> {
        self.last_state.as_ref()
    }

    pub fn current_app(&self) -> Option<&str> {
        self.current_app.as_deref()
    }

    /// Run a new task for the given prompt until the model produces a
    /// terminal message.
    pub async fn submit(&mut self, prompt: &str) -> Result<(), AgentError> {
        if self.phase == Phase::Running {
            return Err(AgentError::Busy);
        }
        if self.provider.is_none() {
            return Err(AgentError::ApiNotConfigured);
        }

        let mut system = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| SYSTEM_PROMPT.to_string());

        // When a target is already open, its current tree rides along as
        // additional system context.
        if self.current_app.is_some() {
            match self.executor.accessibility_tree().await {
                Ok(raw) => {
                    system.push_str(&format!(
                        "\nHere is the accessibility tree of the currently open app: {}\n\
                         Depending on the user's request, you can perform actions in the current app, or open a different app",
                        tree::compress(&raw)
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accessibility tree unavailable, starting task without screen context");
                }
            }
        }

        let mut state = ConversationState::new();
        state.push(Turn::System(system));
        state.push(Turn::User(prompt.to_string()));

        self.drive(state).await
    }

    /// Resume the finished conversation with a quick reply.
    ///
    /// A no-op when there is nothing to resume or a task is running; a
    /// concurrently live task is never interrupted.
    pub async fn resume(&mut self, reply: &str) -> Result<(), AgentError> {
        if self.phase == Phase::Running {
            tracing::warn!("quick reply ignored: a task is running");
            return Ok(());
        }
        let Some(mut state) = self.last_state.clone() else {
            tracing::warn!("quick reply ignored: no previous conversation to resume");
            return Ok(());
        };

        state.push(Turn::User(reply.to_string()));
        self.drive(state).await
    }

    async fn drive(&mut self, state: ConversationState) -> Result<(), AgentError> {
        let task_id = Uuid::new_v4();
        self.phase = Phase::Running;
        tracing::info!(%task_id, "task started");

        match self.run_to_completion(state).await {
            Ok(()) => {
                self.phase = Phase::Suspended;
                tracing::info!(%task_id, "task finished");
                Ok(())
            }
            Err(e) => {
                // The slot is freed; nothing is delivered for an aborted task.
                self.phase = Phase::Idle;
                tracing::error!(%task_id, error = %e, "task aborted");
                Err(e)
            }
        }
    }

    async fn run_to_completion(&mut self, mut state: ConversationState) -> Result<(), AgentError> {
        for _step in 0..self.config.max_steps {
            let result = self
                .provider
                .as_ref()
                .ok_or(AgentError::ApiNotConfigured)?
                .send(&mut state)
                .await?;

            // Snapshot before the model's turn is appended, so resumption
            // neither duplicates nor skips a turn.
            self.last_state = Some(state.clone());

            match result {
                ModelTurnResult::FinalMessage(text) => {
                    if let Err(e) = self.notifier.deliver(&text).await {
                        tracing::warn!(error = %e, "notification delivery failed");
                    }
                    return Ok(());
                }
                ModelTurnResult::ToolCalls(calls) => {
                    for call in calls {
                        tracing::debug!(tool = %call.name, "executing tool call");
                        let output = self.execute_call(&call).await;
                        let key = call.result_key();
                        state.push(Turn::ToolCall(call));
                        state.push(Turn::ToolResult { call: key, output });
                    }
                }
            }
        }
        Err(AgentError::StepLimitReached(self.config.max_steps))
    }

    /// Execute one tool call. Never fails out of the loop: every error is
    /// rendered into the result string for the model to self-correct on.
    async fn execute_call(&mut self, request: &ToolInvocationRequest) -> String {
        match self.perform(request).await {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(tool = %request.name, error = %e, "tool call failed");
                format!("Error executing function call: {e}")
            }
        }
    }

    async fn perform(&mut self, request: &ToolInvocationRequest) -> Result<String, ToolCallError> {
        let action = tools::decode(request)?;

        match &action {
            DeclaredAction::OpenApp { bundle_identifier } => {
                self.executor.open_app(bundle_identifier).await?;
                self.current_app = Some(bundle_identifier.clone());
            }
            DeclaredAction::FetchAccessibilityTree => {
                // Nothing to perform; the refreshed tree below is the result.
            }
            other => {
                if self.current_app.is_none() {
                    return Err(ExecutorError::NoAutomationTarget.into());
                }
                match other {
                    DeclaredAction::TapElement {
                        coordinate,
                        count,
                        long_press,
                    } => {
                        self.executor
                            .tap(*coordinate, count.unwrap_or(1), long_press.unwrap_or(false))
                            .await?
                    }
                    DeclaredAction::EnterText { coordinate, text } => {
                        self.executor.enter_text(*coordinate, text).await?
                    }
                    DeclaredAction::Scroll {
                        x,
                        y,
                        distance_x,
                        distance_y,
                    } => {
                        self.executor
                            .scroll(*x, *y, *distance_x, *distance_y)
                            .await?
                    }
                    DeclaredAction::Swipe { x, y, direction } => {
                        self.executor.swipe(*x, *y, *direction).await?
                    }
                    DeclaredAction::OpenApp { .. } | DeclaredAction::FetchAccessibilityTree => {
                        unreachable!("handled above")
                    }
                }
            }
        }

        // Whatever the action was, the model observes the UI through the
        // refreshed tree of the current target.
        if self.current_app.is_none() {
            return Err(ExecutorError::NoAutomationTarget.into());
        }
        let raw = self.executor.accessibility_tree().await?;
        Ok(tree::compress(&raw))
    }
}
