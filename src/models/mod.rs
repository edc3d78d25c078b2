pub mod attachment;
pub mod conversation;
pub mod message;
pub mod topic;

pub use attachment::ImageAttachment;
pub use conversation::{Conversation, MessagePreview};
pub use message::{Message, MessageId, MessageType};
