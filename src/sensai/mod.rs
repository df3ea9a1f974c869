// Gateway module for the SensAI assistant - follows the Train Station Pattern
// SensAI speaks Socket.IO over an Engine.IO v4 websocket

mod chat;
mod packet;

pub use chat::{sensai, socket_url};
pub use packet::{encode_event, learner_message, reply_text, Packet};
