use std::fmt;

const SERVICE_ACCOUNT_PREFIX: &str = "system:serviceaccount:";

/// A named principal, qualified by its kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    pub name: String,
    pub kind: IdentityKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    User,
    Group,
    ServiceAccount,
}

/// The principal on whose behalf an admission request is made.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requester {
    pub identity: Identity,

    /// Groups the authenticator reported for the principal.
    pub groups: Vec<String>,
}

// === impl Identity ===

impl Identity {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IdentityKind::User,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IdentityKind::Group,
        }
    }

    pub fn service_account(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IdentityKind::ServiceAccount,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::ServiceAccount => "ServiceAccount",
        })
    }
}

// === impl Requester ===

impl Requester {
    /// Builds a requester from the authenticated user name and groups.
    ///
    /// Kubernetes reports service accounts as users named
    /// `system:serviceaccount:<namespace>:<name>`; these are classified as
    /// service accounts and all other names as users.
    pub fn from_user_info(username: impl Into<String>, groups: Vec<String>) -> Self {
        let name = username.into();
        let identity = if name.starts_with(SERVICE_ACCOUNT_PREFIX) {
            Identity::service_account(name)
        } else {
            Identity::user(name)
        };
        Self { identity, groups }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Iterates over the requester's own identity followed by an identity for
    /// each of its groups.
    pub fn identities(&self) -> impl Iterator<Item = Identity> + '_ {
        std::iter::once(self.identity.clone())
            .chain(self.groups.iter().map(|g| Identity::group(g.clone())))
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.identity, f)
    }
}
