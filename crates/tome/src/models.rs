//! These models represent the objects passed around by the engine
//!
//! There are several related formats we need to interact with:
//! - chat-completions messages/tools, sent from the engine to the LLM
//! - server-sent event frames, streamed from the engine to the client
//! - stored transcript rows, read and written through the transcript store
//!
//! These overlap to varying degrees. External data is converted into the
//! internal structs immediately at the boundary using to/from helpers, so
//! the rest of the engine only ever deals with the types in this module.
pub mod chunk;
pub mod event;
pub mod message;
