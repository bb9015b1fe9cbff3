//! Request middleware.

pub mod actor;

pub use actor::{ACTOR_HEADER, CurrentActor, actor_middleware};
