//! OCSP responder exchange.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::debug;
use watchr_core::codec::ocsp;
use watchr_core::{Certificate, CertificateStatus, Result, WatchrError};

use crate::constants::{OCSP_REQUEST_MEDIA_TYPE, OCSP_RESPONSE_MEDIA_TYPE};
use crate::WatchrClient;

/// OCSP revocation checks
pub struct OcspApi<'a> {
    client: &'a WatchrClient,
}

impl<'a> OcspApi<'a> {
    pub(crate) const fn new(client: &'a WatchrClient) -> Self {
        Self { client }
    }

    /// Ask the responder named in `leaf` whether it has been revoked.
    ///
    /// `issuer` must be the certificate that signed `leaf`; its name and key
    /// identify the leaf in the request.
    pub async fn check(&self, leaf: &Certificate, issuer: &Certificate) -> Result<CertificateStatus> {
        let url = leaf
            .ocsp_responder_url
            .as_deref()
            .ok_or(WatchrError::NoResponderUrl)?;
        let body = ocsp::build_request(leaf, issuer)?;

        let answer = self.post(url, body).await?;
        let response = ocsp::decode_response(&answer)?;
        let answered_for = response.serials();

        response
            .take(&leaf.serial_number)
            .ok_or_else(|| WatchrError::UnknownRevocationState {
                reason: format!(
                    "responder answered for serial {}, expected {}",
                    answered_for.join(", "),
                    leaf.serial_number
                ),
            })?
            .into_status()
    }

    /// POST a DER request and return the DER answer
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        debug!(url = %url, bytes = body.len(), "OCSP request");

        let response = self
            .client
            .http()
            .post(url)
            .header(CONTENT_TYPE, OCSP_REQUEST_MEDIA_TYPE)
            .header(ACCEPT, OCSP_RESPONSE_MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| self.client.transport_error(&e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if status != StatusCode::OK || !is_media_type(&content_type, OCSP_RESPONSE_MEDIA_TYPE) {
            return Err(WatchrError::Responder {
                status: status.as_u16(),
                content_type,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.client.transport_error(&e))?;
        debug!(url = %url, bytes = bytes.len(), "OCSP response");
        Ok(bytes.to_vec())
    }
}

/// Compare a `Content-Type` value against `expected`, ignoring parameters and case
fn is_media_type(header: &str, expected: &str) -> bool {
    header
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_ignores_parameters_and_case() {
        assert!(is_media_type("application/ocsp-response", OCSP_RESPONSE_MEDIA_TYPE));
        assert!(is_media_type(
            "Application/OCSP-Response; charset=binary",
            OCSP_RESPONSE_MEDIA_TYPE
        ));
        assert!(!is_media_type("text/html", OCSP_RESPONSE_MEDIA_TYPE));
        assert!(!is_media_type("", OCSP_RESPONSE_MEDIA_TYPE));
    }
}
