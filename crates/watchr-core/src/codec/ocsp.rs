//! OCSP request building and response decoding (RFC 6960).
//!
//! The ASN.1 structures come from `x509-ocsp`. Requests are unsigned
//! single-certificate requests with a SHA-1 `CertID`. The responder signature
//! is not verified.

use chrono::{DateTime, TimeZone, Utc};
use der::asn1::{AnyRef, ObjectIdentifier, OctetString};
use der::{Decode, Encode};
use x509_cert::ext::pkix::crl::CrlReason;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_ocsp::{
    BasicOcspResponse, CertId, CertStatus, OcspGeneralizedTime, OcspRequest, Request,
    SingleResponse, TbsRequest, Version,
};
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::{GeneralName, X509Certificate};

use crate::error::{Result, WatchrError};
use crate::types::{serial_hex, Certificate, CertificateStatus, RevocationReason};

pub use x509_ocsp::OcspResponseStatus as ResponseStatus;

/// `id-ad-ocsp` access method in the Authority Information Access extension
pub const OCSP_ACCESS_METHOD: &str = "1.3.6.1.5.5.7.48.1";

/// `id-pkix-ocsp-basic` response type
pub const ID_PKIX_OCSP_BASIC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.1");

/// `id-sha1`, the `CertID` hash algorithm
pub const ID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");

/// `CertStatus` of a single response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertState {
    Good,
    Revoked {
        revoked_on: DateTime<Utc>,
        reason: Option<RevocationReason>,
    },
    Unknown,
}

/// One decoded `SingleResponse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleStatus {
    /// Serial number from the response `CertID`, big-endian bytes
    pub serial: Vec<u8>,
    pub state: CertState,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
}

impl SingleStatus {
    /// `Some(true)` if revoked, `Some(false)` if good, `None` if the responder does not know
    #[must_use]
    pub const fn is_revoked(&self) -> Option<bool> {
        match self.state {
            CertState::Good => Some(false),
            CertState::Revoked { .. } => Some(true),
            CertState::Unknown => None,
        }
    }

    /// Serial number in the same notation as [`Certificate::serial_number`]
    #[must_use]
    pub fn serial_hex(&self) -> String {
        serial_hex(&self.serial)
    }

    /// Convert into a [`CertificateStatus`], refusing indeterminate answers
    pub fn into_status(self) -> Result<CertificateStatus> {
        let (revoked_on, revocation_reason) = match self.state {
            CertState::Good => (None, None),
            CertState::Revoked { revoked_on, reason } => {
                (Some(revoked_on), Some(reason.unwrap_or(RevocationReason::Unspecified)))
            }
            CertState::Unknown => {
                return Err(WatchrError::UnknownRevocationState {
                    reason: "responder reported status unknown".to_string(),
                })
            }
        };

        Ok(CertificateStatus {
            last_update: self.this_update,
            next_update: self.next_update,
            revoked_on,
            revocation_reason,
        })
    }
}

/// Decoded basic OCSP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspResponse {
    pub produced_at: DateTime<Utc>,
    /// Every `SingleResponse`, in responder order; never empty
    pub responses: Vec<SingleStatus>,
}

impl OcspResponse {
    /// Take the answer about `serial`, given in [`Certificate::serial_number`] notation
    #[must_use]
    pub fn take(self, serial: &str) -> Option<SingleStatus> {
        self.responses
            .into_iter()
            .find(|single| single.serial_hex().eq_ignore_ascii_case(serial))
    }

    /// Serials the responder answered for
    #[must_use]
    pub fn serials(&self) -> Vec<String> {
        self.responses.iter().map(SingleStatus::serial_hex).collect()
    }
}

/// First OCSP responder URI listed in the Authority Information Access extension
pub fn responder_url(cert: &X509Certificate<'_>) -> Option<String> {
    cert.extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::AuthorityInfoAccess(aia) => aia.accessdescs.iter().find_map(|desc| {
                if desc.access_method.to_id_string() != OCSP_ACCESS_METHOD {
                    return None;
                }
                match &desc.access_location {
                    GeneralName::URI(uri) => Some((*uri).to_string()),
                    _ => None,
                }
            }),
            _ => None,
        })
}

/// Build a DER `OCSPRequest` asking about `leaf`, issued by `issuer`
pub fn build_request(leaf: &Certificate, issuer: &Certificate) -> Result<Vec<u8>> {
    let leaf_der = leaf.der()?;
    let issuer_der = issuer.der()?;
    build_request_der(&leaf_der, &issuer_der)
}

/// Build a DER `OCSPRequest` from raw DER certificates
pub fn build_request_der(leaf_der: &[u8], issuer_der: &[u8]) -> Result<Vec<u8>> {
    let (_, leaf) = x509_parser::parse_x509_certificate(leaf_der).map_err(WatchrError::parse)?;
    let (_, issuer) =
        x509_parser::parse_x509_certificate(issuer_der).map_err(WatchrError::parse)?;

    let req_cert = CertId {
        hash_algorithm: AlgorithmIdentifierOwned {
            oid: ID_SHA1,
            parameters: Some(AnyRef::NULL.into()),
        },
        issuer_name_hash: octets(&sha1(issuer.subject().as_raw()))?,
        issuer_key_hash: octets(&sha1(&issuer.public_key().subject_public_key.data))?,
        serial_number: SerialNumber::new(leaf.raw_serial()).map_err(WatchrError::parse)?,
    };

    let request = OcspRequest {
        tbs_request: TbsRequest {
            version: Version::V1,
            requestor_name: None,
            request_list: vec![Request {
                req_cert,
                single_request_extensions: None,
            }],
            request_extensions: None,
        },
        optional_signature: None,
    };

    request.to_der().map_err(WatchrError::parse)
}

/// Decode a DER `OCSPResponse`
pub fn decode_response(body: &[u8]) -> Result<OcspResponse> {
    let envelope = x509_ocsp::OcspResponse::from_der(body).map_err(malformed)?;

    match envelope.response_status {
        ResponseStatus::Successful => {}
        other => return Err(indeterminate(format!("responder answered {other:?}"))),
    }

    let bytes = envelope
        .response_bytes
        .ok_or_else(|| indeterminate("response carries no body"))?;
    if bytes.response_type != ID_PKIX_OCSP_BASIC {
        return Err(indeterminate(format!(
            "response type {} is not id-pkix-ocsp-basic",
            bytes.response_type
        )));
    }

    let basic = BasicOcspResponse::from_der(bytes.response.as_bytes()).map_err(malformed)?;
    let data = basic.tbs_response_data;
    if data.responses.is_empty() {
        return Err(indeterminate("response lists no certificates"));
    }

    Ok(OcspResponse {
        produced_at: timestamp(&data.produced_at)?,
        responses: data
            .responses
            .iter()
            .map(single_status)
            .collect::<Result<_>>()?,
    })
}

fn single_status(single: &SingleResponse) -> Result<SingleStatus> {
    let state = match &single.cert_status {
        CertStatus::Good(_) => CertState::Good,
        CertStatus::Revoked(info) => CertState::Revoked {
            revoked_on: timestamp(&info.revocation_time)?,
            reason: info.revocation_reason.map(revocation_reason),
        },
        CertStatus::Unknown(_) => CertState::Unknown,
    };

    Ok(SingleStatus {
        serial: single.cert_id.serial_number.as_bytes().to_vec(),
        state,
        this_update: timestamp(&single.this_update)?,
        next_update: single.next_update.as_ref().map(timestamp).transpose()?,
    })
}

fn revocation_reason(reason: CrlReason) -> RevocationReason {
    u8::try_from(reason as u32).map_or(RevocationReason::Unknown, RevocationReason::from_code)
}

fn timestamp(time: &OcspGeneralizedTime) -> Result<DateTime<Utc>> {
    let secs = i64::try_from(time.0.to_unix_duration().as_secs()).map_err(malformed)?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| malformed("time out of range"))
}

fn octets(bytes: &[u8]) -> Result<OctetString> {
    OctetString::new(bytes).map_err(WatchrError::parse)
}

fn malformed(e: impl std::fmt::Display) -> WatchrError {
    indeterminate(format!("malformed OCSP response: {e}"))
}

fn indeterminate(reason: impl Into<String>) -> WatchrError {
    WatchrError::UnknownRevocationState {
        reason: reason.into(),
    }
}

fn sha1(data: &[u8]) -> Vec<u8> {
    ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, data)
        .as_ref()
        .to_vec()
}

/// Encoders for OCSP responses, used to stand in for a responder in tests
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture {
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use der::asn1::{BitString, GeneralizedTime, Null, ObjectIdentifier, OctetString};
    use der::Encode;
    use x509_cert::ext::pkix::crl::CrlReason;
    use x509_cert::serial_number::SerialNumber;
    use x509_cert::spki::AlgorithmIdentifierOwned;
    use x509_ocsp::{
        BasicOcspResponse, CertId, CertStatus, OcspGeneralizedTime, ResponderId, ResponseBytes,
        ResponseData, RevokedInfo, SingleResponse, Version,
    };

    use super::{octets, CertState, ResponseStatus, SingleStatus, ID_PKIX_OCSP_BASIC, ID_SHA1};
    use crate::error::{Result, WatchrError};

    const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

    /// A successful basic response about `serial`
    pub fn basic_response(
        serial: &[u8],
        state: CertState,
        this_update: DateTime<Utc>,
        next_update: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>> {
        batched_response(
            &[SingleStatus {
                serial: serial.to_vec(),
                state,
                this_update,
                next_update,
            }],
            this_update,
        )
    }

    /// A successful basic response answering for every entry of `responses`
    pub fn batched_response(
        responses: &[SingleStatus],
        produced_at: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let basic = BasicOcspResponse {
            tbs_response_data: ResponseData {
                version: Version::V1,
                responder_id: ResponderId::ByKey(octets(&[0u8; 20])?),
                produced_at: generalized(produced_at)?,
                responses: responses
                    .iter()
                    .map(single_response)
                    .collect::<Result<_>>()?,
                response_extensions: None,
            },
            signature_algorithm: AlgorithmIdentifierOwned {
                oid: ECDSA_WITH_SHA256,
                parameters: None,
            },
            signature: BitString::from_bytes(&[]).map_err(WatchrError::parse)?,
            certs: None,
        };
        let basic = basic.to_der().map_err(WatchrError::parse)?;

        encode(x509_ocsp::OcspResponse {
            response_status: ResponseStatus::Successful,
            response_bytes: Some(ResponseBytes {
                response_type: ID_PKIX_OCSP_BASIC,
                response: OctetString::new(basic).map_err(WatchrError::parse)?,
            }),
        })
    }

    /// A response carrying only a non-successful status
    pub fn status_only(status: ResponseStatus) -> Result<Vec<u8>> {
        encode(x509_ocsp::OcspResponse {
            response_status: status,
            response_bytes: None,
        })
    }

    fn single_response(single: &SingleStatus) -> Result<SingleResponse> {
        let cert_status = match single.state {
            CertState::Good => CertStatus::Good(Null),
            CertState::Revoked { revoked_on, reason } => CertStatus::Revoked(RevokedInfo {
                revocation_time: generalized(revoked_on)?,
                revocation_reason: reason
                    .and_then(|reason| CrlReason::try_from(u32::from(reason.code())).ok()),
            }),
            CertState::Unknown => CertStatus::Unknown(Null),
        };

        Ok(SingleResponse {
            cert_id: CertId {
                hash_algorithm: AlgorithmIdentifierOwned {
                    oid: ID_SHA1,
                    parameters: None,
                },
                issuer_name_hash: octets(&[0u8; 20])?,
                issuer_key_hash: octets(&[0u8; 20])?,
                serial_number: SerialNumber::new(&single.serial).map_err(WatchrError::parse)?,
            },
            cert_status,
            this_update: generalized(single.this_update)?,
            next_update: single.next_update.map(generalized).transpose()?,
            single_extensions: None,
        })
    }

    fn generalized(at: DateTime<Utc>) -> Result<OcspGeneralizedTime> {
        let secs = u64::try_from(at.timestamp()).map_err(WatchrError::parse)?;
        let time = GeneralizedTime::from_unix_duration(Duration::from_secs(secs))
            .map_err(WatchrError::parse)?;
        Ok(OcspGeneralizedTime(time))
    }

    fn encode(response: x509_ocsp::OcspResponse) -> Result<Vec<u8>> {
        response.to_der().map_err(WatchrError::parse)
    }
}
