/// Raised by the conversation selector when the active conversation changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    Selected(String),
    /// The selected conversation went away, e.g. it was deleted.
    Cleared,
}

/// Raised by the topic picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    TopicChanged(String),
    StarterChosen(String),
}
