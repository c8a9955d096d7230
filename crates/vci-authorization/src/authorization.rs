//! Issuance authorization grants and the authorization endpoint URL

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{errors::AuthorizationError, Result};

/// OAuth2 grant type for the authorization code flow
pub const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";

/// OAuth2 grant type for the OpenID4VCI pre-authorized code flow
pub const PRE_AUTHORIZED_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:pre-authorized_code";

/// Transaction code the user must supply alongside a pre-authorized code
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TxCode {
    /// Input character set, `numeric` or `text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<String>,

    /// Length of the code, for rendering an input field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    /// Guidance on how to obtain the code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The authorization the wallet holds for a credential issuance
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuanceAuthorization {
    /// Code returned on the redirect after the user authorized at the AS
    AuthorizationCode {
        /// The `code` redirect parameter
        authorization_code: String,
    },

    /// Code obtained out of band from a credential offer
    PreAuthorizationCode {
        /// The `pre-authorized_code` grant value
        pre_authorized_code: String,
        /// Transaction code expected with the token request, if any
        tx_code: Option<TxCode>,
    },
}

impl IssuanceAuthorization {
    /// An authorization code received on the redirect
    pub fn authorization_code(code: impl Into<String>) -> Result<Self> {
        Ok(Self::AuthorizationCode {
            authorization_code: non_empty(code.into(), "authorization code")?,
        })
    }

    /// A pre-authorized code from a credential offer
    pub fn pre_authorization_code(
        code: impl Into<String>,
        tx_code: Option<TxCode>,
    ) -> Result<Self> {
        Ok(Self::PreAuthorizationCode {
            pre_authorized_code: non_empty(code.into(), "pre-authorized code")?,
            tx_code,
        })
    }

    /// Whether this is the authorization code variant
    pub fn is_authorization_code(&self) -> bool {
        matches!(self, Self::AuthorizationCode { .. })
    }

    /// The `grant_type` a token request redeeming this authorization uses
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => AUTHORIZATION_CODE_GRANT,
            Self::PreAuthorizationCode { .. } => PRE_AUTHORIZED_CODE_GRANT,
        }
    }
}

fn non_empty(code: String, what: &str) -> Result<String> {
    if code.trim().is_empty() {
        return Err(AuthorizationError::InvalidAuthorizationCode {
            reason: format!("{what} cannot be empty"),
        });
    }
    Ok(code)
}

/// Authorization endpoint URL the user agent is sent to after PAR
///
/// Usually carries `client_id` and the `request_uri` returned by the PAR
/// endpoint as query parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationCodeUrl(Url);

impl AuthorizationCodeUrl {
    /// Wrap an authorization endpoint URL; only `https` is accepted
    pub fn new(url: Url) -> Result<Self> {
        if url.scheme() != "https" {
            return Err(AuthorizationError::InvalidAuthorizationCodeUrl {
                reason: format!("URL scheme must be https, got {}", url.scheme()),
            });
        }
        Ok(Self(url))
    }

    /// Parse and wrap an authorization endpoint URL
    ///
    /// ```
    /// use vci_authorization::AuthorizationCodeUrl;
    ///
    /// let url = AuthorizationCodeUrl::parse(concat!(
    ///     "https://as.example/authorize",
    ///     "?client_id=wallet&request_uri=urn:ietf:params:oauth:request_uri:6esc",
    /// ))
    /// .unwrap();
    /// assert_eq!(url.request_uri().as_deref(), Some("urn:ietf:params:oauth:request_uri:6esc"));
    /// assert!(AuthorizationCodeUrl::parse("http://as.example/authorize").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| AuthorizationError::InvalidAuthorizationCodeUrl {
            reason: e.to_string(),
        })?;
        Self::new(url)
    }

    /// The wrapped URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// The URL string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The `request_uri` query parameter, if present
    pub fn request_uri(&self) -> Option<String> {
        self.0
            .query_pairs()
            .find(|(name, _)| name == "request_uri")
            .map(|(_, value)| value.into_owned())
    }
}

impl fmt::Display for AuthorizationCodeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl TryFrom<Url> for AuthorizationCodeUrl {
    type Error = AuthorizationError;

    fn try_from(url: Url) -> Result<Self> {
        Self::new(url)
    }
}

impl From<AuthorizationCodeUrl> for Url {
    fn from(url: AuthorizationCodeUrl) -> Self {
        url.0
    }
}
