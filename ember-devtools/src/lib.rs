//! Ember developer tools
//!
//! Debugging support for the Ember script engine: a JSON message protocol
//! an external tool speaks, and a session that attaches to an
//! [`ember_js::Interpreter`] through its debug hook.
//!
//! # Modules
//!
//! - `protocol`: message set and the discriminator-keyed JSON codec
//! - `debugger`: breakpoints, stepping and exception pause state
//! - `session`: `DebugSession`, the `DebugHook` implementation
//! - `transport`: in-process channels and newline-delimited JSON streams
//!
//! # Example
//!
//! ```
//! use ember_devtools::{ChannelTransport, DebugSession, Message, Transport};
//! use ember_js::Interpreter;
//!
//! let (mut client, server) = ChannelTransport::pair();
//! let mut interp = Interpreter::new();
//! interp.set_debug_hook(Box::new(DebugSession::new(server)));
//! interp.run("console.log('hi')").unwrap();
//!
//! assert!(matches!(client.receive().unwrap(), Message::Hello(_)));
//! ```

pub mod debugger;
pub mod protocol;
pub mod session;
pub mod transport;

pub use debugger::{Breakpoint, Debugger, DebuggerState, StepAction};
pub use protocol::{CodecError, Message, MessageRegistry, PauseOnExceptions, PauseReason};
pub use session::DebugSession;
pub use transport::{ChannelTransport, LineTransport, Transport, TransportError};
