//! Capability federation - discovery and invocation of external tool providers
//!
//! External providers expose a small remote-procedure surface (`tools/list`,
//! `tools/call`) over plain HTTP. This crate keeps the set of registered
//! providers, caches their catalogs, and executes remote tool calls on behalf
//! of the orchestrator. Remote failures of every kind (unreachable endpoint,
//! protocol-level error, timeout) are returned as structured values so the
//! orchestrator can hand them back to the model as data.

pub mod protocol;
pub mod registry;
pub mod transport;

pub use protocol::{RpcRequest, RpcResponse, ToolSpec, PROTOCOL_VERSION};
pub use registry::{InvokeError, ProviderRegistration, ProviderRegistry, RegistrationError};
pub use transport::{HttpRpcTransport, RpcTransport, TransportError};
