/// Allow-list of operator emails permitted to create, edit and delete.
/// Loaded from configuration at startup; matching is exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    allowed: Vec<String>,
}

impl AuthorizationPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: emails.into_iter().map(Into::into).collect(),
        }
    }

    pub fn permits(&self, email: &str) -> bool {
        self.allowed.iter().any(|a| a == email)
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }
}
