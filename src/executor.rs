//! Action executor capability interface.
//!
//! The agent loop depends only on this contract; the actual UI automation
//! primitives (tap and swipe synthesis, tree dumping) are owned by whatever
//! backend implements it. [`DryRunExecutor`] is a backend-free
//! implementation for development and for driving the CLI without a device.

use async_trait::async_trait;
use thiserror::Error;

use crate::tools::{Rect, SwipeDirection};

/// Result text surfaced to the model when a tool needs an open automation
/// target and none exists.
pub const NO_APP_FOUND: &str = "No app found to interact with, try to open an app first.";

/// Executor errors. All of them are recoverable at the loop level: their
/// `Display` text is folded back into the conversation as tool output.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("{NO_APP_FOUND}")]
    NoAutomationTarget,
    #[error("{0}")]
    Failed(String),
}

impl ExecutorError {
    pub fn failed(message: impl Into<String>) -> Self {
        ExecutorError::Failed(message.into())
    }
}

/// Capability interface for performing UI automation actions against the
/// current target.
///
/// The loop, not the executor, owns the notion of which target is current;
/// it only calls action methods after a successful [`open_app`] and reports
/// [`NO_APP_FOUND`] itself otherwise. `open_app` on `com.apple.springboard`
/// is expected to activate the already-running springboard rather than
/// launch it.
///
/// [`open_app`]: ActionExecutor::open_app
#[async_trait]
pub trait ActionExecutor: Send {
    /// Open or activate the app with the given bundle identifier and make
    /// it the current automation target.
    async fn open_app(&mut self, bundle_identifier: &str) -> Result<(), ExecutorError>;

    /// Tap at the midpoint of `coordinate`; `count` of 2 is a double tap,
    /// `long_press` holds for a press-and-hold.
    async fn tap(
        &mut self,
        coordinate: Rect,
        count: u32,
        long_press: bool,
    ) -> Result<(), ExecutorError>;

    /// Tap the field at `coordinate` and type `text` into it.
    async fn enter_text(&mut self, coordinate: Rect, text: &str) -> Result<(), ExecutorError>;

    /// Drag from `(x, y)` by the given distances.
    async fn scroll(
        &mut self,
        x: f64,
        y: f64,
        distance_x: f64,
        distance_y: f64,
    ) -> Result<(), ExecutorError>;

    /// Flick from `(x, y)` in the given direction.
    async fn swipe(&mut self, x: f64, y: f64, direction: SwipeDirection)
        -> Result<(), ExecutorError>;

    /// Raw (uncompressed) accessibility tree dump of the current target.
    async fn accessibility_tree(&mut self) -> Result<String, ExecutorError>;
}

/// Executor that logs every action instead of driving a device.
///
/// Serves a canned accessibility tree for whichever app was last opened,
/// which lets the full agent loop run end to end without an automation
/// backend.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    current_app: Option<String>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionExecutor for DryRunExecutor {
    async fn open_app(&mut self, bundle_identifier: &str) -> Result<(), ExecutorError> {
        tracing::info!(bundle_identifier, "dry-run: open app");
        self.current_app = Some(bundle_identifier.to_string());
        Ok(())
    }

    async fn tap(
        &mut self,
        coordinate: Rect,
        count: u32,
        long_press: bool,
    ) -> Result<(), ExecutorError> {
        let (x, y) = coordinate.midpoint();
        tracing::info!(x, y, count, long_press, "dry-run: tap");
        Ok(())
    }

    async fn enter_text(&mut self, coordinate: Rect, text: &str) -> Result<(), ExecutorError> {
        let (x, y) = coordinate.midpoint();
        tracing::info!(x, y, text, "dry-run: enter text");
        Ok(())
    }

    async fn scroll(
        &mut self,
        x: f64,
        y: f64,
        distance_x: f64,
        distance_y: f64,
    ) -> Result<(), ExecutorError> {
        tracing::info!(x, y, distance_x, distance_y, "dry-run: scroll");
        Ok(())
    }

    async fn swipe(
        &mut self,
        x: f64,
        y: f64,
        direction: SwipeDirection,
    ) -> Result<(), ExecutorError> {
        tracing::info!(x, y, %direction, "dry-run: swipe");
        Ok(())
    }

    async fn accessibility_tree(&mut self) -> Result<String, ExecutorError> {
        let app = self
            .current_app
            .as_deref()
            .ok_or(ExecutorError::NoAutomationTarget)?;
        Ok(format!(
            "Application, 0x600001d2c0a0, {{{{0.0, 0.0}}, {{390.0, 844.0}}}}, label: '{app}'\n\
             Other, 0x600001d2c1b0, {{{{0.0, 0.0}}, {{390.0, 844.0}}}}\n\
             StaticText, 0x600001d2c2c0, {{{{16.0, 60.0}}, {{200.0, 24.0}}}}, label: 'dry run'"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree;

    #[tokio::test]
    async fn test_dry_run_tree_requires_open_app() {
        let mut executor = DryRunExecutor::new();
        assert!(matches!(
            executor.accessibility_tree().await,
            Err(ExecutorError::NoAutomationTarget)
        ));

        executor.open_app("com.apple.Preferences").await.unwrap();
        let raw = executor.accessibility_tree().await.unwrap();
        assert!(raw.contains("com.apple.Preferences"));

        // The canned tree exercises the compressor like a real dump would.
        let compressed = tree::compress(&raw);
        assert!(!compressed.contains("0x"));
        assert_eq!(compressed.lines().count(), 2);
    }

    #[test]
    fn test_no_automation_target_message() {
        assert_eq!(ExecutorError::NoAutomationTarget.to_string(), NO_APP_FOUND);
    }
}
