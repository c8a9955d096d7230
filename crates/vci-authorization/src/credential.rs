//! Credential metadata carried through the authorization flow
//!
//! These values describe *what* the wallet asked for. The flow never interprets
//! them; it only moves them from one state to the next.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An OAuth2 scope value naming a credential configuration
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// Wrap a scope value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The scope value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The detailed description of a W3C credential type
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialDefinition {
    /// JSON-LD contexts, only meaningful for the JSON-LD profiles
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,

    /// Credential types, most generic first
    #[serde(rename = "type")]
    pub type_: Vec<String>,
}

/// An ISO 18013-5 mobile document
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct MsoMdocProfile {
    /// Document type, e.g. `org.iso.18013.5.1.mDL`
    pub doctype: String,

    /// Scope the issuer associates with this configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A W3C credential secured as a JWT, not processed with JSON-LD
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct W3cSignedJwtProfile {
    /// Credential type description
    pub credential_definition: CredentialDefinition,

    /// Scope the issuer associates with this configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A W3C JSON-LD credential secured as a JWT
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct W3cJsonLdSignedJwtProfile {
    /// Credential type description
    pub credential_definition: CredentialDefinition,

    /// Scope the issuer associates with this configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A W3C JSON-LD credential secured with a Data Integrity proof
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct W3cJsonLdDataIntegrityProfile {
    /// Credential type description
    pub credential_definition: CredentialDefinition,

    /// Scope the issuer associates with this configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// An IETF SD-JWT VC
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SdJwtVcProfile {
    /// Verifiable credential type identifier
    pub vct: String,

    /// Scope the issuer associates with this configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A credential the wallet requested authorization for
///
/// Either a bare OAuth2 scope or a format-specific profile. Serialized with the
/// OpenID4VCI format identifier as the external tag:
///
/// ```
/// use vci_authorization::{CredentialMetadata, MsoMdocProfile};
///
/// let mdl = CredentialMetadata::MsoMdoc(MsoMdocProfile {
///     doctype: "org.iso.18013.5.1.mDL".to_string(),
///     scope: None,
/// });
/// assert_eq!(mdl.format(), Some("mso_mdoc"));
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum CredentialMetadata {
    /// Requested by scope alone
    #[serde(rename = "scope")]
    Scope(Scope),

    /// ISO mobile document
    #[serde(rename = "mso_mdoc")]
    MsoMdoc(MsoMdocProfile),

    /// W3C credential as JWT
    #[serde(rename = "jwt_vc_json")]
    W3cSignedJwt(W3cSignedJwtProfile),

    /// W3C JSON-LD credential as JWT
    #[serde(rename = "jwt_vc_json-ld")]
    W3cJsonLdSignedJwt(W3cJsonLdSignedJwtProfile),

    /// W3C JSON-LD credential with Data Integrity proof
    #[serde(rename = "ldp_vc")]
    W3cJsonLdDataIntegrity(W3cJsonLdDataIntegrityProfile),

    /// SD-JWT VC
    #[serde(rename = "vc+sd-jwt")]
    SdJwtVc(SdJwtVcProfile),
}

impl CredentialMetadata {
    /// OpenID4VCI credential format identifier, `None` for scope requests
    pub fn format(&self) -> Option<&'static str> {
        match self {
            Self::Scope(_) => None,
            Self::MsoMdoc(_) => Some("mso_mdoc"),
            Self::W3cSignedJwt(_) => Some("jwt_vc_json"),
            Self::W3cJsonLdSignedJwt(_) => Some("jwt_vc_json-ld"),
            Self::W3cJsonLdDataIntegrity(_) => Some("ldp_vc"),
            Self::SdJwtVc(_) => Some("vc+sd-jwt"),
        }
    }

    /// Scope value that requests this credential, if one is known
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::Scope(scope) => Some(scope.as_str()),
            Self::MsoMdoc(profile) => profile.scope.as_deref(),
            Self::W3cSignedJwt(profile) => profile.scope.as_deref(),
            Self::W3cJsonLdSignedJwt(profile) => profile.scope.as_deref(),
            Self::W3cJsonLdDataIntegrity(profile) => profile.scope.as_deref(),
            Self::SdJwtVc(profile) => profile.scope.as_deref(),
        }
    }
}

impl From<Scope> for CredentialMetadata {
    fn from(scope: Scope) -> Self {
        Self::Scope(scope)
    }
}
