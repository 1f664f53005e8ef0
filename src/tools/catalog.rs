//! Declarations for the fixed set of UI automation tools.
//!
//! The catalog is pure data: every model request carries the same ordered
//! list of declarations so the model always sees the same action surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of tool names the model may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolName {
    EnterText,
    FetchAccessibilityTree,
    OpenApp,
    TapElement,
    Scroll,
    Swipe,
}

impl ToolName {
    /// All tool names in declaration order.
    pub const ALL: [ToolName; 6] = [
        ToolName::EnterText,
        ToolName::FetchAccessibilityTree,
        ToolName::OpenApp,
        ToolName::TapElement,
        ToolName::Scroll,
        ToolName::Swipe,
    ];

    /// Wire name as sent to and received from providers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::EnterText => "enterText",
            ToolName::FetchAccessibilityTree => "fetchAccessibilityTree",
            ToolName::OpenApp => "openApp",
            ToolName::TapElement => "tapElement",
            ToolName::Scroll => "scroll",
            ToolName::Swipe => "swipe",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or(())
    }
}

/// JSON-schema primitive kind of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One named parameter of a tool declaration.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
}

/// Declaration of a single tool: name, description and parameter schema.
#[derive(Debug, Clone, Copy)]
pub struct ToolDeclaration {
    pub name: ToolName,
    pub description: &'static str,
    /// Ordered parameter schema. Empty for parameterless tools.
    pub params: &'static [ParamSpec],
    /// Names of parameters that must be present.
    pub required: &'static [&'static str],
}

const COORDINATE_DESC_TAP: &str = "Pass back the coordinate from the tree that corresponds to the element to tap. It should look like: {{0.0, 56.3}, {402.0, 44.0}}";
const COORDINATE_DESC_TEXT: &str = "Pass back the coordinate from the tree that corresponds to the element to enter text into. It should look like: {{0.0, 56.3}, {402.0, 44.0}}";

const BUNDLE_IDENTIFIER_DESC: &str = "The bundle identifier of the iOS app to open. Some common iOS apps:
System Settings = com.apple.Preferences
Camera = com.apple.camera
Photos = com.apple.mobileslideshow
Messages = com.apple.MobileSMS
Home Screen = com.apple.springboard
Home screen will allow you to open system level features like Control Center (swipe from top right), Notification Center (swipe from top center), Spotlight (swipe down from the middle) etc.";

static DECLARATIONS: [ToolDeclaration; 6] = [
    ToolDeclaration {
        name: ToolName::EnterText,
        description: "Enter text into a text field. Responds with an updated accessibility tree of the current app.",
        params: &[
            ParamSpec {
                name: "coordinate",
                kind: ParamKind::String,
                description: COORDINATE_DESC_TEXT,
            },
            ParamSpec {
                name: "text",
                kind: ParamKind::String,
                description: "The text to enter into the text field.",
            },
        ],
        required: &["coordinate", "text"],
    },
    ToolDeclaration {
        name: ToolName::FetchAccessibilityTree,
        description: "Get a refreshed accessibility tree of the current app. Useful when a tap will update the app UI",
        params: &[],
        required: &[],
    },
    ToolDeclaration {
        name: ToolName::OpenApp,
        description: "Opens a different app on the iPhone. Responds with an accessibility tree of the new app.",
        params: &[ParamSpec {
            name: "bundle_identifier",
            kind: ParamKind::String,
            description: BUNDLE_IDENTIFIER_DESC,
        }],
        required: &["bundle_identifier"],
    },
    ToolDeclaration {
        name: ToolName::TapElement,
        description: "Tap the element with the specified coordinate. Responds with an updated accessibility tree of the current app.",
        params: &[
            ParamSpec {
                name: "coordinate",
                kind: ParamKind::String,
                description: COORDINATE_DESC_TAP,
            },
            ParamSpec {
                name: "count",
                kind: ParamKind::Integer,
                description: "The number of times to tap the element. 1 for a single tap, 2 for a double tap. Defaults to 1",
            },
            ParamSpec {
                name: "longPress",
                kind: ParamKind::Boolean,
                description: "Whether to long press the element. Defaults to false",
            },
        ],
        required: &["coordinate"],
    },
    ToolDeclaration {
        name: ToolName::Scroll,
        description: "Scroll the current app's content by a specified distance in horizontal and vertical directions. Responds with an updated accessibility tree of the current app.",
        params: &[
            ParamSpec {
                name: "x",
                kind: ParamKind::Number,
                description: "The x coordinate of the element to scroll from, in absolute coordinates",
            },
            ParamSpec {
                name: "y",
                kind: ParamKind::Number,
                description: "The y coordinate of the element to scroll from, in absolute coordinates",
            },
            ParamSpec {
                name: "distanceX",
                kind: ParamKind::Number,
                description: "The distance to scroll in the x direction.",
            },
            ParamSpec {
                name: "distanceY",
                kind: ParamKind::Number,
                description: "The distance to scroll in the y direction.",
            },
        ],
        required: &["x", "y", "distanceX", "distanceY"],
    },
    ToolDeclaration {
        name: ToolName::Swipe,
        description: "Swipe in a specified direction from a given coordinate. Responds with an updated accessibility tree of the current app.",
        params: &[
            ParamSpec {
                name: "x",
                kind: ParamKind::Number,
                description: "The x coordinate of the element to swipe from, in absolute coordinates",
            },
            ParamSpec {
                name: "y",
                kind: ParamKind::Number,
                description: "The y coordinate of the element to swipe from, in absolute coordinates",
            },
            ParamSpec {
                name: "direction",
                kind: ParamKind::String,
                description: "The direction to swipe in. Valid values are 'up', 'down', 'left', 'right'.",
            },
        ],
        required: &["x", "y", "direction"],
    },
];

/// The full ordered tool catalog, used verbatim in every model request.
pub fn all_declarations() -> &'static [ToolDeclaration] {
    &DECLARATIONS
}

/// Look up a single declaration by name.
pub fn declaration(name: ToolName) -> &'static ToolDeclaration {
    &DECLARATIONS[ToolName::ALL
        .iter()
        .position(|n| *n == name)
        .expect("every tool name has a declaration")]
}
