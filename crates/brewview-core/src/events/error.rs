use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Subscriber already registered: {0}")]
    DuplicateSubscriber(String),

    #[error("Unknown subscriber: {0}")]
    UnknownSubscriber(String),

    #[error("Malformed event: {0}")]
    Malformed(String),
}
