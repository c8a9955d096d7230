//! Pushed Authorization Request flow state
//!
//! The flow only moves forward:
//!
//! ```text
//! (initial) ──PAR accepted──▶ ParRequested
//! ParRequested ──code on redirect──▶ AuthorizationCodeRetrieved
//! ```
//!
//! [`AuthorizationCodeRetrieved`] can only hold an authorization code. Any
//! other [`IssuanceAuthorization`] is rejected when the state is built, so a
//! token request driven by this state never has to re-check the grant. A
//! rejected step leaves the current state untouched.

use tracing::debug;

use crate::{
    authorization::{AuthorizationCodeUrl, IssuanceAuthorization},
    credential::CredentialMetadata,
    errors::AuthorizationError,
    pkce::PkceVerifier,
    Result,
};

/// Reason reported when a non authorization-code grant reaches the code state
pub const AUTHORIZATION_CODE_REQUIRED: &str = "IssuanceAuthorization must be authorization code";

/// Reason reported when a flow already holding a code is advanced again
pub const AUTHORIZATION_CODE_ALREADY_RETRIEVED: &str = "authorization code already retrieved";

/// The PAR request was accepted and the user agent can be sent to the AS
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParRequested {
    /// Credentials the authorization was requested for
    pub credentials: Vec<CredentialMetadata>,
    /// Where to send the user agent
    pub authorization_code_url: AuthorizationCodeUrl,
    /// Verifier whose challenge went into the PAR request
    pub pkce_verifier: PkceVerifier,
    /// Correlation value the AS echoes back on the redirect
    pub state: String,
}

impl ParRequested {
    /// Record an accepted PAR request
    pub fn new(
        credentials: Vec<CredentialMetadata>,
        authorization_code_url: AuthorizationCodeUrl,
        pkce_verifier: PkceVerifier,
        state: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            authorization_code_url,
            pkce_verifier,
            state: state.into(),
        }
    }

    /// Whether the `state` returned on the redirect belongs to this request
    pub fn matches_state(&self, returned: &str) -> bool {
        self.state == returned
    }

    /// Move to [`AuthorizationCodeRetrieved`] with the code from the redirect
    ///
    /// Credentials and PKCE verifier carry over unchanged. On rejection this
    /// state is still intact, so a later redirect can be handled with it.
    pub fn authorization_code_retrieved(
        &self,
        authorization: IssuanceAuthorization,
    ) -> Result<AuthorizationCodeRetrieved> {
        AuthorizationCodeRetrieved::new(
            self.credentials.clone(),
            authorization,
            self.pkce_verifier.clone(),
        )
    }
}

/// The redirect delivered an authorization code
///
/// ```
/// use vci_authorization::{AuthorizationCodeRetrieved, IssuanceAuthorization, PkceVerifier};
///
/// let pre_authorized =
///     IssuanceAuthorization::pre_authorization_code("offer-code", None).unwrap();
/// let err = AuthorizationCodeRetrieved::new(vec![], pre_authorized, PkceVerifier::generate())
///     .unwrap_err();
/// assert_eq!(err.reason(), "IssuanceAuthorization must be authorization code");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationCodeRetrieved {
    credentials: Vec<CredentialMetadata>,
    authorization_code: String,
    pkce_verifier: PkceVerifier,
}

impl AuthorizationCodeRetrieved {
    /// Build the state; fails unless `authorization_code` is
    /// [`IssuanceAuthorization::AuthorizationCode`]
    pub fn new(
        credentials: Vec<CredentialMetadata>,
        authorization_code: IssuanceAuthorization,
        pkce_verifier: PkceVerifier,
    ) -> Result<Self> {
        let IssuanceAuthorization::AuthorizationCode { authorization_code } = authorization_code
        else {
            return Err(AuthorizationError::InvalidAuthorizationVariant {
                reason: AUTHORIZATION_CODE_REQUIRED.to_string(),
            });
        };

        debug!(
            credentials = credentials.len(),
            method = pkce_verifier.code_verifier_method(),
            "Authorization code retrieved"
        );

        Ok(Self {
            credentials,
            authorization_code,
            pkce_verifier,
        })
    }

    /// Credentials the authorization covers
    pub fn credentials(&self) -> &[CredentialMetadata] {
        &self.credentials
    }

    /// The authorization code value to redeem
    pub fn code(&self) -> &str {
        &self.authorization_code
    }

    /// The held authorization, always the authorization code variant
    pub fn authorization_code(&self) -> IssuanceAuthorization {
        IssuanceAuthorization::AuthorizationCode {
            authorization_code: self.authorization_code.clone(),
        }
    }

    /// Verifier to send with the token request
    pub fn pkce_verifier(&self) -> &PkceVerifier {
        &self.pkce_verifier
    }

    /// Take the state apart for the token request
    pub fn into_parts(self) -> (Vec<CredentialMetadata>, IssuanceAuthorization, PkceVerifier) {
        (
            self.credentials,
            IssuanceAuthorization::AuthorizationCode {
                authorization_code: self.authorization_code,
            },
            self.pkce_verifier,
        )
    }
}

/// Where an issuance that still lacks an access token stands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnauthorizedRequest {
    /// Waiting for the user to authorize at the AS
    Par(ParRequested),
    /// Holding a code, ready for the token request
    AuthorizationCode(AuthorizationCodeRetrieved),
}

impl UnauthorizedRequest {
    /// Credentials requested, whichever state the flow is in
    pub fn credentials(&self) -> &[CredentialMetadata] {
        match self {
            Self::Par(requested) => &requested.credentials,
            Self::AuthorizationCode(retrieved) => retrieved.credentials(),
        }
    }

    /// PKCE verifier bound to the flow
    pub fn pkce_verifier(&self) -> &PkceVerifier {
        match self {
            Self::Par(requested) => &requested.pkce_verifier,
            Self::AuthorizationCode(retrieved) => retrieved.pkce_verifier(),
        }
    }

    /// Advance a PAR state with the authorization from the redirect
    ///
    /// The state changes only on success. A flow already holding a code
    /// cannot advance again.
    pub fn handle_authorization(&mut self, authorization: IssuanceAuthorization) -> Result<()> {
        match self {
            Self::Par(requested) => {
                let retrieved = requested.authorization_code_retrieved(authorization)?;
                *self = Self::AuthorizationCode(retrieved);
                Ok(())
            }
            Self::AuthorizationCode(_) => Err(AuthorizationError::InvalidTransition {
                reason: AUTHORIZATION_CODE_ALREADY_RETRIEVED.to_string(),
            }),
        }
    }
}

impl From<ParRequested> for UnauthorizedRequest {
    fn from(requested: ParRequested) -> Self {
        Self::Par(requested)
    }
}

impl From<AuthorizationCodeRetrieved> for UnauthorizedRequest {
    fn from(retrieved: AuthorizationCodeRetrieved) -> Self {
        Self::AuthorizationCode(retrieved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Scope;
    use pretty_assertions::assert_eq;

    fn par_requested() -> ParRequested {
        ParRequested::new(
            vec![CredentialMetadata::Scope(Scope::new("pid"))],
            AuthorizationCodeUrl::parse("https://as.example/authorize?request_uri=urn:x")
                .unwrap(),
            PkceVerifier::generate(),
            "af0ifjsldkj",
        )
    }

    #[test]
    fn test_matches_state() {
        let requested = par_requested();
        assert!(requested.matches_state("af0ifjsldkj"));
        assert!(!requested.matches_state("af0ifjsldkJ"));
        assert!(!requested.matches_state(""));
    }

    #[test]
    fn test_transition_carries_credentials_and_verifier() {
        let requested = par_requested();
        let credentials = requested.credentials.clone();
        let verifier = requested.pkce_verifier.clone();

        let code = IssuanceAuthorization::authorization_code("abc").unwrap();
        let retrieved = requested.authorization_code_retrieved(code).unwrap();

        assert_eq!(retrieved.credentials(), credentials.as_slice());
        assert_eq!(retrieved.pkce_verifier(), &verifier);
        assert_eq!(retrieved.code(), "abc");
        assert_eq!(
            retrieved.authorization_code(),
            IssuanceAuthorization::AuthorizationCode {
                authorization_code: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_pre_authorized_code_rejected() {
        let requested = par_requested();
        let before = requested.clone();

        let err = requested
            .authorization_code_retrieved(IssuanceAuthorization::PreAuthorizationCode {
                pre_authorized_code: "xyz".to_string(),
                tx_code: None,
            })
            .unwrap_err();

        assert_eq!(
            err,
            AuthorizationError::InvalidAuthorizationVariant {
                reason: "IssuanceAuthorization must be authorization code".to_string()
            }
        );
        assert_eq!(requested, before);
    }

    #[test]
    fn test_into_parts() {
        let verifier = PkceVerifier::generate();
        let retrieved = AuthorizationCodeRetrieved::new(
            vec![],
            IssuanceAuthorization::authorization_code("code-1").unwrap(),
            verifier.clone(),
        )
        .unwrap();

        let (credentials, authorization, pkce_verifier) = retrieved.into_parts();
        assert!(credentials.is_empty());
        assert_eq!(authorization.grant_type(), "authorization_code");
        assert_eq!(pkce_verifier, verifier);
    }

    #[test]
    fn test_unauthorized_request_accessors() {
        let requested = par_requested();
        let verifier = requested.pkce_verifier.clone();

        let mut request = UnauthorizedRequest::from(requested);
        assert_eq!(request.credentials().len(), 1);
        assert_eq!(request.pkce_verifier(), &verifier);

        request
            .handle_authorization(IssuanceAuthorization::authorization_code("abc").unwrap())
            .unwrap();
        assert!(matches!(request, UnauthorizedRequest::AuthorizationCode(_)));
        assert_eq!(request.pkce_verifier(), &verifier);
    }

    #[test]
    fn test_code_state_cannot_advance_again() {
        let retrieved = AuthorizationCodeRetrieved::new(
            vec![],
            IssuanceAuthorization::authorization_code("abc").unwrap(),
            PkceVerifier::generate(),
        )
        .unwrap();

        let mut request = UnauthorizedRequest::from(retrieved.clone());
        let err = request
            .handle_authorization(IssuanceAuthorization::authorization_code("def").unwrap())
            .unwrap_err();

        assert_eq!(
            err,
            AuthorizationError::InvalidTransition {
                reason: "authorization code already retrieved".to_string()
            }
        );
        assert_eq!(request, UnauthorizedRequest::AuthorizationCode(retrieved));
    }

    #[test]
    fn test_debug_output_hides_verifier() {
        let requested = par_requested();
        let verifier = requested.pkce_verifier.code_verifier().to_string();
        let request = UnauthorizedRequest::from(requested);

        let debug = format!("{request:?}");
        assert!(debug.contains("PkceVerifier(S256, <redacted>)"));
        assert!(!debug.contains(&verifier));
    }

    #[test]
    fn test_rejected_grant_keeps_par_state() {
        let requested = par_requested();
        let verifier = requested.pkce_verifier.clone();
        let mut request = UnauthorizedRequest::from(requested.clone());

        let err = request
            .handle_authorization(
                IssuanceAuthorization::pre_authorization_code("xyz", None).unwrap(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AuthorizationError::InvalidAuthorizationVariant { .. }
        ));
        assert_eq!(request, UnauthorizedRequest::Par(requested));

        request
            .handle_authorization(IssuanceAuthorization::authorization_code("abc").unwrap())
            .unwrap();
        let UnauthorizedRequest::AuthorizationCode(retrieved) = &request else {
            panic!("expected the code state");
        };
        assert_eq!(retrieved.code(), "abc");
        assert_eq!(retrieved.pkce_verifier(), &verifier);
    }
}
