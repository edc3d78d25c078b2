pub mod client;
pub mod error;
pub mod traits;
pub mod types;

pub use client::BackendClient;
pub use error::{ApiError, ErrorKind, Operation};
pub use traits::ChatBackend;
pub use types::{OutgoingMessage, SendMessageResponse};
