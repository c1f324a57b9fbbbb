

pub mod assistant;
pub mod search;


pub use assistant::{ChatReply, ReplyStatus, TravelAssistant};
