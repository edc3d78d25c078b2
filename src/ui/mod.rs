pub mod chat_view;
pub mod input_area;
pub mod message_widget;
pub mod prompt_picker;
pub mod sidebar;
