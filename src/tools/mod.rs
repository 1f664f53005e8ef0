//! Tool catalog and action decoding.

mod action;
mod catalog;

pub use action::{
    decode, ActionDecodeError, DeclaredAction, Rect, SwipeDirection, ToolInvocationRequest,
};
pub use catalog::{all_declarations, declaration, ParamKind, ParamSpec, ToolDeclaration, ToolName};
