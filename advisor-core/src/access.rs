use std::collections::BTreeSet;

use crate::types::ClientId;

/// Gate on `request_decrypt`.
///
/// An empty allowlist admits every client. Listing at least one client
/// switches to strict membership checks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    allowed: BTreeSet<ClientId>,
}

impl AccessPolicy {
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn allow_client(mut self, client: impl Into<String>) -> Self {
        self.allowed.insert(ClientId::new(client));
        self
    }

    pub fn is_permissive(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn permits(&self, client: &ClientId) -> bool {
        self.allowed.is_empty() || self.allowed.contains(client)
    }
}

impl<S: Into<String>> FromIterator<S> for AccessPolicy {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            allowed: iter.into_iter().map(ClientId::new).collect(),
        }
    }
}
