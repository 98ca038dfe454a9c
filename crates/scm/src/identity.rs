use std::fmt;

/// Who authenticates and authors the commit.
#[derive(Clone)]
pub struct Identity {
    pub user_name: String,
    pub friendly_name: String,
    pub email: String,
    /// Personal access token. Used for git basic auth and the GraphQL API.
    pub secret: String,
}

impl Identity {
    pub fn new(
        user_name: impl Into<String>,
        friendly_name: impl Into<String>,
        email: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            friendly_name: friendly_name.into(),
            email: email.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_name", &self.user_name)
            .field("friendly_name", &self.friendly_name)
            .field("email", &self.email)
            .field("secret", &"***")
            .finish()
    }
}

/// Repository a session publishes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    /// `None` means the identity's user name owns the repository.
    pub owner: Option<String>,
    pub name: String,
    pub host: String,
}

impl RepoTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            owner: None,
            name: name.into(),
            host: "github.com".to_string(),
        }
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn on_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

/// Names of the empty fields, in declaration order.
pub(crate) fn missing_fields(identity: &Identity, target: &RepoTarget) -> Vec<&'static str> {
    let mut fields = vec![
        ("user_name", identity.user_name.as_str()),
        ("secret", identity.secret.as_str()),
        ("friendly_name", identity.friendly_name.as_str()),
        ("email", identity.email.as_str()),
        ("repo_name", target.name.as_str()),
        ("repo_host", target.host.as_str()),
    ];
    if let Some(owner) = &target.owner {
        fields.push(("repo_owner", owner.as_str()));
    }
    fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("alice", "Alice", "a@x.com", "tok")
    }

    #[test]
    fn complete_identity_has_no_missing_fields() {
        assert!(missing_fields(&alice(), &RepoTarget::new("repo1")).is_empty());
    }

    #[test]
    fn missing_fields_preserve_declaration_order() {
        let identity = Identity::new("", "", "", "");
        let missing = missing_fields(&identity, &RepoTarget::new(""));
        assert_eq!(
            missing,
            vec!["user_name", "secret", "friendly_name", "email", "repo_name"]
        );
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut identity = alice();
        identity.secret = "   ".to_string();
        assert_eq!(
            missing_fields(&identity, &RepoTarget::new("repo1")),
            vec!["secret"]
        );
    }

    #[test]
    fn empty_host_is_reported_before_owner() {
        let target = RepoTarget::new("repo1").on_host(" ").owned_by("");
        assert_eq!(
            missing_fields(&alice(), &target),
            vec!["repo_host", "repo_owner"]
        );
    }

    #[test]
    fn explicit_empty_owner_is_missing() {
        let target = RepoTarget::new("repo1").owned_by("");
        assert_eq!(missing_fields(&alice(), &target), vec!["repo_owner"]);
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", alice());
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("tok\""));
    }
}
