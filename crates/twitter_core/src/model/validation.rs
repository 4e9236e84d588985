use std::error::Error;
use std::fmt::{Display, Formatter};

/// Model-level rejection raised before any row is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is empty after trim.
    BlankUsername,
    /// Tweet content is empty after trim.
    BlankTweetContent,
    /// Tag content is empty after trim.
    BlankTagContent,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankUsername => write!(f, "username must not be blank"),
            Self::BlankTweetContent => write!(f, "tweet content must not be blank"),
            Self::BlankTagContent => write!(f, "tag content must not be blank"),
        }
    }
}

impl Error for ValidationError {}
