//! RDAP domain lookups (RFC 9082 / RFC 9083).

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tracing::debug;
use watchr_core::{validate_domain, RdapDomain, Result, WatchrError};

use crate::constants::RDAP_MEDIA_TYPE;
use crate::WatchrClient;

/// RDAP endpoints
pub struct RdapApi<'a> {
    client: &'a WatchrClient,
}

impl<'a> RdapApi<'a> {
    pub(crate) const fn new(client: &'a WatchrClient) -> Self {
        Self { client }
    }

    /// Look up `domain`. `Ok(None)` when the server has no record of it.
    pub async fn domain(&self, domain: &str) -> Result<Option<RdapDomain>> {
        validate_domain(domain)?;
        let name = domain.strip_suffix('.').unwrap_or(domain);
        let url = format!("{}/domain/{name}", self.client.config().rdap_base_url);
        debug!(url = %url, "GET request");

        let response = self
            .client
            .http()
            .get(&url)
            .header(ACCEPT, format!("{RDAP_MEDIA_TYPE}, application/json"))
            .send()
            .await
            .map_err(|e| self.client.transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(domain = %name, "RDAP server has no record");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(WatchrError::Http(format!(
                "RDAP server answered {status} for {name}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.client.transport_error(&e))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let record: RdapDomain = serde_json::from_str(&body)?;
        Ok((!record.is_empty()).then_some(record))
    }
}
