//! Store error types.

use thiserror::Error;

/// Errors raised by the user store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("user '{0}' already exists")]
    UserExists(String),

    /// Usernames may only hold letters, digits, `_`, `-` and `.`.
    #[error("invalid username '{0}'")]
    InvalidUsername(String),

    #[error("password {0}")]
    WeakPassword(String),

    /// The current password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The email is malformed or belongs to a public webmail provider.
    #[error("invalid email '{email}': {reason}")]
    InvalidEmail { email: String, reason: String },

    /// The account cannot be deleted.
    #[error("user '{0}' is protected")]
    ProtectedUser(String),

    #[error("conversation '{0}' not found")]
    ConversationNotFound(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A store file exists but does not parse.
    #[error("corrupt store file {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Returns `true` if the caller supplied bad input, as opposed to the
    /// store itself failing.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            StoreError::Io { .. } | StoreError::Corrupt { .. } | StoreError::PasswordHash(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_user_errors() {
        assert!(StoreError::UserExists("ada".into()).is_user_error());
        assert!(StoreError::InvalidCredentials.is_user_error());
        assert!(!StoreError::Corrupt {
            path: "users.json".into(),
            reason: "eof".into()
        }
        .is_user_error());
    }
}
