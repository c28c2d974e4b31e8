/// Client-side validation failures. These block submission and never
/// reach the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Owner id is required")]
    MissingOwner,

    #[error("Owner id must be an integer, got '{0}'")]
    InvalidOwner(String),

    #[error("Items must contain at least one integer")]
    EmptyItems,

    #[error("Task id must not be blank")]
    BlankHandle,
}
