//! Credentials and the per-call authentication context

use base64::Engine as _;
use zeroize::Zeroizing;

/// Opaque credential forwarded to the remote OData system
///
/// The secret is zeroized on drop and never printed.
#[derive(Clone)]
pub enum Credential {
    Bearer(Zeroizing<String>),
    Basic {
        user: String,
        password: Zeroizing<String>,
    },
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(Zeroizing::new(token.into()))
    }

    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            user: user.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Parse an `Authorization` header value (`Bearer x` or `Basic base64`)
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        let (scheme, rest) = value.trim().split_once(' ')?;
        let rest = rest.trim();
        if rest.is_empty() {
            return None;
        }
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(Self::bearer(rest));
        }
        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(rest)
                .ok()?;
            let decoded = Zeroizing::new(String::from_utf8(decoded).ok()?);
            let (user, password) = decoded.split_once(':')?;
            return Some(Self::basic(user, password));
        }
        None
    }

    /// Value for the `Authorization` request header
    pub fn authorization_header(&self) -> Zeroizing<String> {
        match self {
            Self::Bearer(token) => Zeroizing::new(format!("Bearer {}", token.as_str())),
            Self::Basic { user, password } => {
                let raw = Zeroizing::new(format!("{}:{}", user, password.as_str()));
                let encoded = base64::engine::general_purpose::STANDARD.encode(raw.as_bytes());
                Zeroizing::new(format!("Basic {}", encoded))
            }
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::Basic { .. } => "basic",
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Credential::Bearer(<redacted>)"),
            Self::Basic { user, .. } => write!(f, "Credential::Basic({}, <redacted>)", user),
        }
    }
}

/// Authentication context for one tool call
///
/// Passed explicitly into every `executeOperation` so that concurrent sessions
/// sharing one registry never see each other's credentials. Absence is legal
/// for discovery and metadata calls.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    credential: Option<Credential>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { credential: None }
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
        }
    }

    pub fn from_token(token: Option<String>) -> Self {
        Self {
            credential: token.filter(|t| !t.trim().is_empty()).map(Credential::bearer),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Prefer this context, falling back to `other` when it carries no credential
    pub fn or(self, other: &AuthContext) -> AuthContext {
        if self.is_authenticated() {
            self
        } else {
            other.clone()
        }
    }
}
