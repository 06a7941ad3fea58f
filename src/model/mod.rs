// Canonical tool and backend model shared by the index, searchers, doc store
// and dispatch facade.

pub mod backend;
pub mod schema;
pub mod tool;

pub use backend::{identity_for_unregister, BackendKind, ToolBackend, PROVIDER_ID_SEPARATOR};
pub use schema::{json_eq, opt_json_eq, SchemaValue};
pub use tool::{mcp_fields_eq, normalize_tags, Icon, Tool, ToolAnnotations};
