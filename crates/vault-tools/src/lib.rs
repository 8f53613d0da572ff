//! The tool surface an agent-protocol adapter binds to.
//!
//! [`ToolSurface`] exposes exactly the five verbs an agent is allowed:
//! `list`, `status`, `login`, `api_request`, `add`. Wiring this to a specific
//! agent transport (MCP or otherwise) is deliberately left to the caller —
//! see [`ToolSurface`]'s methods for the JSON-shaped request/response types.

pub mod tool_surface;

pub use tool_surface::{ApiRequestOutcome, CredentialStatus, LastAuditEvent, LoginOutcome, ToolSurface};
