//! Raw records returned by the registry collaborators, before normalization.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// RDAP domain object (RFC 9083), limited to the members the resolver reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapDomain {
    #[serde(default)]
    pub ldh_name: Option<String>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub events: Vec<RdapEvent>,
    #[serde(default)]
    pub entities: Vec<RdapEntity>,
    #[serde(default)]
    pub nameservers: Vec<RdapNameserver>,
    #[serde(default, rename = "secureDNS")]
    pub secure_dns: Option<RdapSecureDns>,
}

impl RdapDomain {
    /// True when the server answered but carried no registration data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.entities.is_empty()
            && self.nameservers.is_empty()
            && self.status.is_empty()
    }

    /// Date string of the first event with `action`
    #[must_use]
    pub fn event_date(&self, action: &str) -> Option<&str> {
        self.events
            .iter()
            .find(|event| event.event_action == action)
            .map(|event| event.event_date.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapEvent {
    pub event_action: String,
    pub event_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapEntity {
    #[serde(default)]
    pub roles: Vec<String>,
    /// jCard: `["vcard", [[name, params, type, value], ...]]`
    #[serde(default)]
    pub vcard_array: Vec<Value>,
}

impl RdapEntity {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    fn properties(&self) -> &[Value] {
        self.vcard_array
            .get(1)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Text value of the first jCard property called `name`
    #[must_use]
    pub fn vcard_text(&self, name: &str) -> Option<&str> {
        self.properties()
            .iter()
            .find(|prop| prop.get(0).and_then(Value::as_str) == Some(name))
            .and_then(|prop| prop.get(3))
            .and_then(Value::as_str)
    }

    /// Formatted name (`fn`), falling back to the value of the second jCard property
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.vcard_text("fn").or_else(|| {
            self.properties()
                .get(1)
                .and_then(|prop| prop.get(3))
                .and_then(Value::as_str)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapNameserver {
    #[serde(default)]
    pub ldh_name: String,
    #[serde(default)]
    pub object_class_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapSecureDns {
    #[serde(default)]
    pub delegation_signed: bool,
    #[serde(default)]
    pub ds_data: Vec<RdapDsData>,
}

/// Registries disagree on casing and on quoting numbers; both spellings are accepted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapDsData {
    #[serde(default, alias = "keytag", deserialize_with = "lenient_number")]
    pub key_tag: Option<u16>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub algorithm: Option<u8>,
    #[serde(default, alias = "digesttype", deserialize_with = "lenient_number")]
    pub digest_type: Option<u8>,
    #[serde(default)]
    pub digest: Option<String>,
}

/// A number that may arrive quoted; out-of-range or malformed values become `None`
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + FromStr,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| T::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Parsed legacy WHOIS answer; dates are Unix timestamps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoisRecord {
    pub whois_server: String,
    pub registrar: String,
    pub owner: String,
    pub creation_date: Option<i64>,
    pub expiration_date: Option<i64>,
    pub updated_date: Option<i64>,
    pub name_servers: Vec<String>,
    pub states: Vec<String>,
    /// Raw DNSSEC marker, e.g. `signedDelegation` or `unsigned`
    pub dnssec: Option<String>,
}

impl WhoisRecord {
    /// True when none of the registration fields could be extracted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrar.is_empty()
            && self.creation_date.is_none()
            && self.expiration_date.is_none()
            && self.name_servers.is_empty()
            && self.states.is_empty()
    }
}
