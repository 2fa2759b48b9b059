//! ODPS request signing.
//!
//! Requests carry `Authorization: ODPS <access_id>:<signature>` where the
//! signature is base64(HMAC-SHA1(access_key, canonical string)). The
//! canonical string is the method, the `content-md5`, `content-type` and
//! `date` header values, every `x-odps-*` header as `key:value` (all sorted
//! by lowercase name), and finally the resource path with its sorted query
//! parameters.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;

type HmacSha1 = Hmac<Sha1>;

/// Signs requests with an AccessKey pair.
#[derive(Clone)]
pub struct Signer {
    access_id: String,
    access_key: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_id", &self.access_id)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
        }
    }

    /// Returns the `Authorization` header value for a request.
    ///
    /// `resource` is the path relative to the endpoint, e.g.
    /// `/projects/p/tables`. Params with an empty value sign as the bare key.
    pub fn authorization(
        &self,
        method: &str,
        headers: &[(&str, &str)],
        resource: &str,
        params: &[(&str, String)],
    ) -> String {
        let canonical = canonical_string(method, headers, resource, params);
        format!("ODPS {}:{}", self.access_id, self.sign(&canonical))
    }

    fn sign(&self, canonical: &str) -> String {
        let mut mac = HmacSha1::new_from_slice(self.access_key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(canonical.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

/// Builds the string to sign.
pub(crate) fn canonical_string(
    method: &str,
    headers: &[(&str, &str)],
    resource: &str,
    params: &[(&str, String)],
) -> String {
    let mut signed: BTreeMap<String, &str> = BTreeMap::new();
    signed.insert("content-md5".to_string(), "");
    signed.insert("content-type".to_string(), "");

    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        if matches!(name.as_str(), "content-type" | "content-md5" | "date")
            || name.starts_with("x-odps-")
        {
            signed.insert(name, *value);
        }
    }

    for (name, value) in params {
        if name.starts_with("x-odps-") {
            signed.insert(name.to_string(), value.as_str());
        }
    }

    let mut lines = vec![method.to_string()];
    for (name, value) in &signed {
        if name.starts_with("x-odps-") {
            lines.push(format!("{name}:{value}"));
        } else {
            lines.push(value.to_string());
        }
    }
    lines.push(canonical_resource(resource, params));

    lines.join("\n")
}

fn canonical_resource(resource: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return resource.to_string();
    }

    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let query = sorted
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                k.to_string()
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{resource}?{query}")
}
