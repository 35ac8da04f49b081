//! These models represent the objects passed through the gateway
//!
//! There are a few related formats we need to interact with:
//! - the chat history posted by the browser client, in openai chat shape
//! - openai messages/tools, sent from the gateway to the LLM
//! - streamed completion events, sent from the gateway back to the client
//!
//! The browser already speaks the openai chat shape, so unlike a provider-neutral
//! model the message type here matches the wire format closely. What it adds is a
//! closed set of roles: anything that does not fit is rejected when the payload
//! is deserialized rather than being checked ad hoc later on.
pub mod content;
pub mod message;
pub mod tool;
