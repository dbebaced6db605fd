use crate::collaborators::{CollaboratorError, SecretSource};

/// Implicit passphrase taken from configuration
#[derive(Clone, Default)]
pub struct StaticSecret {
    secret: Option<String>,
}

impl StaticSecret {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }
}

impl std::fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSecret")
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

impl SecretSource for StaticSecret {
    fn implicit_passphrase(&self) -> Result<String, CollaboratorError> {
        self.secret
            .clone()
            .ok_or_else(|| CollaboratorError::Unavailable("workflow secret is not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_counts_as_unset() {
        assert!(StaticSecret::new(Some(String::new())).implicit_passphrase().is_err());
        assert!(StaticSecret::new(None).implicit_passphrase().is_err());
        assert_eq!(
            StaticSecret::new(Some("s3cret".to_string())).implicit_passphrase().unwrap(),
            "s3cret"
        );
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let rendered = format!("{:?}", StaticSecret::new(Some("s3cret".to_string())));
        assert!(!rendered.contains("s3cret"));
    }
}
