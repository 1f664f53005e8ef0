//! Decoding of model tool invocations into typed actions.
//!
//! Providers hand back loosely typed argument bags. Those are decoded into
//! the closed [`DeclaredAction`] variant here, at the loop boundary, so
//! nothing deeper in the system ever touches a raw argument map. A decode
//! failure is recoverable: the loop reports it back to the model as tool
//! output instead of aborting the task.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::catalog::ToolName;

/// A tool invocation as requested by the model, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Provider-assigned call identifier, absent for providers that key
    /// tool results by name.
    pub call_id: Option<String>,
    /// Raw tool name as the model produced it.
    pub name: String,
    /// Raw argument bag, string-keyed and loosely typed.
    pub args: Map<String, Value>,
}

impl ToolInvocationRequest {
    pub fn new(call_id: Option<String>, name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            call_id,
            name: name.into(),
            args,
        }
    }

    /// Key under which the tool result is reported back: the provider call
    /// identifier when present, the tool name otherwise.
    pub fn result_key(&self) -> String {
        self.call_id.clone().unwrap_or_else(|| self.name.clone())
    }
}

/// Decode errors. Their `Display` text is what the model sees as tool output.
#[derive(Error, Debug, PartialEq)]
pub enum ActionDecodeError {
    #[error("Invalid tool {0}: unknown tool name")]
    UnknownTool(String),
    #[error("Invalid tool {tool}: missing required argument `{arg}`")]
    MissingArgument { tool: ToolName, arg: &'static str },
    #[error("Invalid tool {tool}: argument `{arg}` is not a valid {expected}")]
    BadArgument {
        tool: ToolName,
        arg: &'static str,
        expected: &'static str,
    },
    #[error("Invalid tool {tool}: malformed coordinate `{raw}`, expected {{{{x, y}}, {{w, h}}}}")]
    BadCoordinate { tool: ToolName, raw: String },
}

/// Swipe direction for the `swipe` tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Up => "up",
            SwipeDirection::Down => "down",
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        }
    }
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwipeDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(SwipeDirection::Up),
            "down" => Ok(SwipeDirection::Down),
            "left" => Ok(SwipeDirection::Left),
            "right" => Ok(SwipeDirection::Right),
            _ => Err(()),
        }
    }
}

static RECT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*\{\{\s*(-?[0-9]+(?:\.[0-9]+)?)\s*,\s*(-?[0-9]+(?:\.[0-9]+)?)\s*\}\s*,\s*\{\s*(-?[0-9]+(?:\.[0-9]+)?)\s*,\s*(-?[0-9]+(?:\.[0-9]+)?)\s*\}\}\s*$",
    )
    .expect("rect pattern compiles")
});

/// Element frame as serialized in accessibility trees: `{{x, y}, {w, h}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the rect, where taps and text entry land.
    pub fn midpoint(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl FromStr for Rect {
    type Err = ();

    /// Parse the exact `{{x, y}, {w, h}}` textual shape.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = RECT_PATTERN.captures(s).ok_or(())?;
        let field = |i: usize| caps[i].parse::<f64>().map_err(|_| ());
        Ok(Rect::new(field(1)?, field(2)?, field(3)?, field(4)?))
    }
}

/// Validated automation action, ready for the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredAction {
    EnterText {
        coordinate: Rect,
        text: String,
    },
    FetchAccessibilityTree,
    OpenApp {
        bundle_identifier: String,
    },
    TapElement {
        coordinate: Rect,
        count: Option<u32>,
        long_press: Option<bool>,
    },
    Scroll {
        x: f64,
        y: f64,
        distance_x: f64,
        distance_y: f64,
    },
    Swipe {
        x: f64,
        y: f64,
        direction: SwipeDirection,
    },
}

/// Decode a raw invocation request into a [`DeclaredAction`].
pub fn decode(request: &ToolInvocationRequest) -> Result<DeclaredAction, ActionDecodeError> {
    let tool: ToolName = request
        .name
        .parse()
        .map_err(|_| ActionDecodeError::UnknownTool(request.name.clone()))?;
    let args = &request.args;

    match tool {
        ToolName::EnterText => Ok(DeclaredAction::EnterText {
            coordinate: rect_arg(tool, args, "coordinate")?,
            text: string_arg(tool, args, "text")?,
        }),
        ToolName::FetchAccessibilityTree => Ok(DeclaredAction::FetchAccessibilityTree),
        ToolName::OpenApp => Ok(DeclaredAction::OpenApp {
            bundle_identifier: string_arg(tool, args, "bundle_identifier")?,
        }),
        ToolName::TapElement => Ok(DeclaredAction::TapElement {
            coordinate: rect_arg(tool, args, "coordinate")?,
            count: opt_u32_arg(tool, args, "count")?,
            long_press: opt_bool_arg(tool, args, "longPress")?,
        }),
        ToolName::Scroll => Ok(DeclaredAction::Scroll {
            x: number_arg(tool, args, "x")?,
            y: number_arg(tool, args, "y")?,
            distance_x: number_arg(tool, args, "distanceX")?,
            distance_y: number_arg(tool, args, "distanceY")?,
        }),
        ToolName::Swipe => {
            let raw = string_arg(tool, args, "direction")?;
            let direction = raw
                .parse()
                .map_err(|_| ActionDecodeError::BadArgument {
                    tool,
                    arg: "direction",
                    expected: "swipe direction (up, down, left, right)",
                })?;
            Ok(DeclaredAction::Swipe {
                x: number_arg(tool, args, "x")?,
                y: number_arg(tool, args, "y")?,
                direction,
            })
        }
    }
}

fn string_arg(
    tool: ToolName,
    args: &Map<String, Value>,
    name: &'static str,
) -> Result<String, ActionDecodeError> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ActionDecodeError::BadArgument {
            tool,
            arg: name,
            expected: "string",
        }),
        None => Err(ActionDecodeError::MissingArgument { tool, arg: name }),
    }
}

fn rect_arg(
    tool: ToolName,
    args: &Map<String, Value>,
    name: &'static str,
) -> Result<Rect, ActionDecodeError> {
    let raw = string_arg(tool, args, name)?;
    raw.parse()
        .map_err(|_| ActionDecodeError::BadCoordinate { tool, raw })
}

/// Numbers may arrive as JSON numbers or as numeric strings, depending on
/// the provider. Both are accepted.
fn number_arg(
    tool: ToolName,
    args: &Map<String, Value>,
    name: &'static str,
) -> Result<f64, ActionDecodeError> {
    let bad = || ActionDecodeError::BadArgument {
        tool,
        arg: name,
        expected: "number",
    };
    match args.get(name) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(bad),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| bad()),
        Some(_) => Err(bad()),
        None => Err(ActionDecodeError::MissingArgument { tool, arg: name }),
    }
}

fn opt_u32_arg(
    tool: ToolName,
    args: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<u32>, ActionDecodeError> {
    let bad = || ActionDecodeError::BadArgument {
        tool,
        arg: name,
        expected: "integer",
    };
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(|v| Some(v as u32)).ok_or_else(bad),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| bad()),
        Some(_) => Err(bad()),
    }
}

fn opt_bool_arg(
    tool: ToolName,
    args: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<bool>, ActionDecodeError> {
    let bad = || ActionDecodeError::BadArgument {
        tool,
        arg: name,
        expected: "boolean",
    };
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| bad()),
        Some(_) => Err(bad()),
    }
}
