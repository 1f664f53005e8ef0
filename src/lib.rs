// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Pocket Agent
//!
//! LLM-driven agent for automating phone UI interactions.
//!
//! The agent reads the current app's accessibility tree, asks a model what
//! to do next, and performs the requested UI actions (tap, type, scroll,
//! swipe, open app) until the model produces a terminal message. That
//! message is delivered as a notification, and the user's quick reply to it
//! resumes the conversation where it left off.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pocket_agent::{
//!     Agent, AgentConfig, AgentRuntime, DryRunExecutor, IngestMessage,
//!     LogNotifier, ModelConfig,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let agent = Agent::new(DryRunExecutor::new(), LogNotifier, AgentConfig::default());
//!     let runtime = AgentRuntime::new(agent, ModelConfig::openai("sk-..."));
//!
//!     let (tx, rx) = mpsc::channel(32);
//!     tokio::spawn(runtime.run(rx));
//!
//!     tx.send(IngestMessage::Prompt("Open Settings".to_string())).await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod conversation;
pub mod executor;
pub mod model;
pub mod notify;
pub mod runtime;
pub mod settings;
pub mod tools;
pub mod tree;

pub use agent::{Agent, AgentConfig, AgentError, Phase, SYSTEM_PROMPT};
pub use conversation::{ConversationState, Turn};
pub use executor::{ActionExecutor, DryRunExecutor, ExecutorError, NO_APP_FOUND};
pub use model::{
    build_client, ModelClient, ModelConfig, ModelTurnResult, ProviderError, ProviderKind,
};
pub use notify::{LogNotifier, Notifier, NotifyError};
pub use runtime::{AgentRuntime, IngestMessage, ProviderFactory};
pub use settings::AppSettings;
pub use tools::{
    decode, ActionDecodeError, DeclaredAction, Rect, SwipeDirection, ToolInvocationRequest,
    ToolName,
};
pub use tree::compress;
