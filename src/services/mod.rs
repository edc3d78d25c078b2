pub mod chat;
pub mod conversations;
pub mod events;
pub mod prompts;

pub use chat::{ChatError, ChatSession};
pub use conversations::{ConversationList, ListStatus};
pub use events::{PickerEvent, SelectionEvent};
pub use prompts::PromptPicker;
