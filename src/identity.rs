//! External user identity references
//!
//! Users live in the host system. This crate only needs an opaque id and a
//! display identifier, so any user type can take part by implementing
//! [`UserIdentity`].

use serde::{Deserialize, Serialize};

pub trait UserIdentity {
    /// Opaque, stable identifier
    fn user_id(&self) -> &str;

    /// Human-readable identifier (username, email, ...)
    fn user_identifier(&self) -> &str;
}

/// Owned identity reference as persisted next to organizations and memberships
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub identifier: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
        }
    }

    pub fn from_identity(user: &impl UserIdentity) -> Self {
        Self::new(user.user_id(), user.user_identifier())
    }
}

impl UserIdentity for UserRef {
    fn user_id(&self) -> &str {
        &self.id
    }

    fn user_identifier(&self) -> &str {
        &self.identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HostUser {
        pk: u64,
        pk_str: String,
        username: String,
    }

    impl UserIdentity for HostUser {
        fn user_id(&self) -> &str {
            &self.pk_str
        }

        fn user_identifier(&self) -> &str {
            &self.username
        }
    }

    #[test]
    fn test_from_identity() {
        let host = HostUser {
            pk: 7,
            pk_str: 7.to_string(),
            username: "carol".to_string(),
        };
        let user = UserRef::from_identity(&host);
        assert_eq!(user.id, host.pk.to_string());
        assert_eq!(user.user_identifier(), "carol");
    }
}
