//! A2UI core crate.
//!
//! Everything a client needs to turn agent output into UI state, without any
//! rendering concerns:
//!
//! - `value` + `pointer`: immutable, structurally shared JSON data and
//!   RFC 6901 pointer reads/writes over it (`DataModel`).
//! - `expr`: the closed set of reductions (`length`, `any`, ...) used by
//!   `visibleIf` and `contentExpr`.
//! - `interpolate`: `{item.field}` / `{index}` rewriting for list templates.
//! - `message` + `parser`: the wire message types and whole-response parsing
//!   that tolerates markdown fences and surrounding prose.
//! - `stream`: incremental assembly of messages from a token stream.
//!
//! Data model writes never mutate: every update returns a new root that shares
//! unchanged subtrees with the previous one, so consumers can detect change by
//! pointer identity.

pub mod config;
pub mod error;
pub mod expr;
pub mod interpolate;
pub mod message;
pub mod parser;
pub mod pointer;
pub mod stream;
pub mod value;

pub use config::{A2uiConfig, AssemblerConfig, FinishMode, load_config};
pub use error::{ConfigError, ParseError, PointerError, StreamError};
pub use expr::{
    ContentExpr, Expression, VisibilityCondition, VisibleIf, evaluate, evaluate_named,
    resolve_content, resolve_visibility,
};
pub use interpolate::{has_placeholders, interpolate};
pub use message::{Component, ItemSource, Message, Surface, parse_message_value};
pub use parser::{messages_from_value, parse_messages};
pub use pointer::{DataModel, Pointer, escape_segment};
pub use stream::{MessageSink, StreamEvent, StreamingAssembler};
pub use value::DataValue;
