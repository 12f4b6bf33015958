// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! AWS signature V4 header signing for admin requests.

use super::AdminError;
use hmac::{Hmac, Mac};
use http::{HeaderValue, Request};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::debug;

pub const SIGN_V4_ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const SERVICE_TYPE_S3: &str = "s3";
pub const AMZ_DATE_HEADER: &str = "x-amz-date";
pub const AMZ_CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";

const V4_IGNORED_HEADERS: [&str; 3] = ["accept-encoding", "authorization", "user-agent"];
const YYYYMMDD: &[BorrowedFormatItem<'_>] = format_description!("[year][month][day]");
const ISO8601_BASIC: &[BorrowedFormatItem<'_>] = format_description!("[year][month][day]T[hour][minute][second]Z");

pub fn hex(data: impl AsRef<[u8]>) -> String {
    hex_simd::encode_to_string(data, hex_simd::AsciiCase::Lower)
}

pub fn hex_sha256(data: &[u8]) -> String {
    hex(Sha256::digest(data))
}

fn hmac_sha256(key: impl AsRef<[u8]>, data: impl AsRef<[u8]>) -> [u8; 32] {
    // HMAC accepts keys of any length
    let mut m = <Hmac<Sha256> as Mac>::new_from_slice(key.as_ref()).expect("HMAC can take key of any size");
    m.update(data.as_ref());
    m.finalize().into_bytes().into()
}

fn format_time(t: OffsetDateTime, format: &[BorrowedFormatItem<'_>]) -> Result<String, AdminError> {
    t.format(format)
        .map_err(|e| AdminError::InvalidRequest(format!("cannot format signing time: {e}")))
}

pub fn get_signing_key(secret: &str, loc: &str, t: OffsetDateTime, service_type: &str) -> Result<[u8; 32], AdminError> {
    let date = hmac_sha256(format!("AWS4{secret}"), format_time(t, YYYYMMDD)?);
    let location = hmac_sha256(date, loc);
    let service = hmac_sha256(location, service_type);
    Ok(hmac_sha256(service, "aws4_request"))
}

pub fn get_signature(signing_key: [u8; 32], string_to_sign: &str) -> String {
    hex(hmac_sha256(signing_key, string_to_sign))
}

pub fn get_scope(location: &str, t: OffsetDateTime, service_type: &str) -> Result<String, AdminError> {
    Ok(format!("{}/{location}/{service_type}/aws4_request", format_time(t, YYYYMMDD)?))
}

fn trim_all(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn host_addr<B>(req: &Request<B>) -> String {
    if let Some(host) = req.headers().get(http::header::HOST).and_then(|h| h.to_str().ok()) {
        return host.to_string();
    }
    let uri = req.uri();
    match (uri.host(), uri.port_u16()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Lower-cased header names taking part in the signature, sorted, `host` included.
fn signed_header_names<B>(req: &Request<B>) -> Vec<String> {
    let mut names: Vec<String> = req
        .headers()
        .keys()
        .map(|k| k.as_str().to_lowercase())
        .filter(|k| !V4_IGNORED_HEADERS.contains(&k.as_str()))
        .collect();
    if !names.iter().any(|k| k == "host") {
        names.push("host".to_string());
    }
    names.sort();
    names.dedup();
    names
}

fn canonical_headers<B>(req: &Request<B>, names: &[String]) -> String {
    let mut buf = String::new();
    for name in names {
        buf.push_str(name);
        buf.push(':');
        if name == "host" {
            buf.push_str(&host_addr(req));
        } else {
            let values: Vec<String> = req
                .headers()
                .get_all(name.as_str())
                .iter()
                .map(|v| trim_all(v.to_str().unwrap_or_default()))
                .collect();
            buf.push_str(&values.join(","));
        }
        buf.push('\n');
    }
    buf
}

fn canonical_query<B>(req: &Request<B>) -> String {
    let Some(q) = req.uri().query() else {
        return String::new();
    };
    let mut params: Vec<(&str, &str)> = q
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| p.split_once('=').unwrap_or((p, "")))
        .collect();
    params.sort();
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
        .replace('+', "%20")
}

pub fn get_canonical_request<B>(req: &Request<B>, hashed_payload: &str) -> String {
    let names = signed_header_names(req);
    [
        req.method().to_string(),
        req.uri().path().to_string(),
        canonical_query(req),
        canonical_headers(req, &names),
        names.join(";"),
        hashed_payload.to_string(),
    ]
    .join("\n")
}

fn get_string_to_sign_v4(t: OffsetDateTime, location: &str, canonical_request: &str) -> Result<String, AdminError> {
    Ok([
        SIGN_V4_ALGORITHM.to_string(),
        format_time(t, ISO8601_BASIC)?,
        get_scope(location, t, SERVICE_TYPE_S3)?,
        hex_sha256(canonical_request.as_bytes()),
    ]
    .join("\n"))
}

fn header_value(value: &str) -> Result<HeaderValue, AdminError> {
    HeaderValue::from_str(value).map_err(|e| AdminError::InvalidRequest(format!("invalid header value: {e}")))
}

/// Signs `req` in place with an `Authorization` header.
///
/// Requests are left untouched when either credential is empty.
pub fn sign_v4(
    req: &mut Request<Vec<u8>>,
    access_key_id: &str,
    secret_access_key: &str,
    location: &str,
    t: OffsetDateTime,
) -> Result<(), AdminError> {
    if access_key_id.is_empty() || secret_access_key.is_empty() {
        return Ok(());
    }

    let hashed_payload = hex_sha256(req.body());
    let host = host_addr(req);
    let headers = req.headers_mut();
    headers.insert(http::header::HOST, header_value(&host)?);
    headers.insert(AMZ_DATE_HEADER, header_value(&format_time(t, ISO8601_BASIC)?)?);
    headers.insert(AMZ_CONTENT_SHA256_HEADER, header_value(&hashed_payload)?);

    let canonical_request = get_canonical_request(req, &hashed_payload);
    let string_to_sign = get_string_to_sign_v4(t, location, &canonical_request)?;
    debug!("sign_v4 canonical request:\n{canonical_request}");

    let signing_key = get_signing_key(secret_access_key, location, t, SERVICE_TYPE_S3)?;
    let signature = get_signature(signing_key, &string_to_sign);
    let credential = format!("{access_key_id}/{}", get_scope(location, t, SERVICE_TYPE_S3)?);
    let signed_headers = signed_header_names(req).join(";");

    let auth = format!("{SIGN_V4_ALGORITHM} Credential={credential}, SignedHeaders={signed_headers}, Signature={signature}");
    req.headers_mut().insert(http::header::AUTHORIZATION, header_value(&auth)?);
    Ok(())
}
