//! Call transports for ragcall.
//!
//! A transport owns the live session: it delivers completed user turns to
//! the turn hook and produces the agent's replies.
//!
//! Available transports:
//! - **Console**: stdin lines as user turns, replies on stdout

pub mod console;

pub use console::ConsoleTransport;
