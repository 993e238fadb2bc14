use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CRL reason code carried by a revoked OCSP answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
    /// Any code outside the RFC 5280 enumeration
    Unknown,
}

impl RevocationReason {
    /// Map an RFC 5280 `CRLReason` code; unassigned codes become [`Self::Unknown`]
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Unspecified,
            1 => Self::KeyCompromise,
            2 => Self::CaCompromise,
            3 => Self::AffiliationChanged,
            4 => Self::Superseded,
            5 => Self::CessationOfOperation,
            6 => Self::CertificateHold,
            8 => Self::RemoveFromCrl,
            9 => Self::PrivilegeWithdrawn,
            10 => Self::AaCompromise,
            _ => Self::Unknown,
        }
    }

    /// RFC 5280 code; [`Self::Unknown`] maps to the unassigned value 7
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::KeyCompromise => 1,
            Self::CaCompromise => 2,
            Self::AffiliationChanged => 3,
            Self::Superseded => 4,
            Self::CessationOfOperation => 5,
            Self::CertificateHold => 6,
            Self::Unknown => 7,
            Self::RemoveFromCrl => 8,
            Self::PrivilegeWithdrawn => 9,
            Self::AaCompromise => 10,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "Unspecified",
            Self::KeyCompromise => "Key compromise",
            Self::CaCompromise => "CA Compromise",
            Self::AffiliationChanged => "Affiliation changed",
            Self::Superseded => "Superseded",
            Self::CessationOfOperation => "Cessation of operation",
            Self::CertificateHold => "Certificate hold",
            Self::RemoveFromCrl => "Remove from CRL",
            Self::PrivilegeWithdrawn => "Privilege withdrawn",
            Self::AaCompromise => "AA compromise",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Revocation status of a certificate as reported by its OCSP responder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    /// `thisUpdate` of the OCSP answer
    pub last_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub revoked_on: Option<DateTime<Utc>>,
    pub revocation_reason: Option<RevocationReason>,
}

impl CertificateStatus {
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked_on.is_some()
    }
}
