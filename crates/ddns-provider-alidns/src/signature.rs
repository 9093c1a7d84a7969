//! Alibaba Cloud RPC request signing (signature version 1.0)
//!
//! ```text
//! CanonicalQuery = sorted "key=value" pairs, percent-encoded, joined by "&"
//! StringToSign   = "GET" + "&" + encode("/") + "&" + encode(CanonicalQuery)
//! Signature      = base64(HMAC-SHA1(AccessKeySecret + "&", StringToSign))
//! ```
//!
//! Percent-encoding follows RFC 3986: only `A-Z a-z 0-9 - _ . ~` stay
//! literal, a space becomes `%20`.

use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use std::collections::BTreeMap;

type HmacSha1 = Hmac<Sha1>;

const RFC3986_UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a query component
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, RFC3986_UNRESERVED).to_string()
}

/// Build the canonical query string
///
/// `BTreeMap` iteration order is the byte-wise key order the API expects.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the string to sign for a GET request
pub fn string_to_sign(canonical_query: &str) -> String {
    format!(
        "GET&{}&{}",
        percent_encode("/"),
        percent_encode(canonical_query)
    )
}

/// Sign `string_to_sign` with the access key secret
pub fn sign(access_key_secret: &str, string_to_sign: &str) -> String {
    let key = format!("{}&", access_key_secret);
    // HMAC accepts keys of any length, so this branch is unreachable
    let Ok(mut mac) = HmacSha1::new_from_slice(key.as_bytes()) else {
        return String::new();
    };
    mac.update(string_to_sign.as_bytes());
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
