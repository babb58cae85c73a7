//! Converting between binary data and `data:` URLs.
//!
//! We only understand the narrow subset of RFC 2397 that we actually produce
//! and consume: a MIME type, an optional `;base64` marker, and a payload. Any
//! other `;`-delimited parameter (such as `;charset=utf-8`) is rejected as
//! malformed.

use std::{error, fmt, str::Utf8Error, sync::LazyLock};

use base64::{DecodeError, Engine as _, prelude::BASE64_STANDARD};
use percent_encoding::percent_decode_str;
use regex::Regex;
use schemars::JsonSchema;

use crate::prelude::*;

/// The MIME type we assume when a `data:` URL leaves it out.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Regex for parsing a `data:` URL. The payload may not contain a line
/// terminator, including the Unicode line and paragraph separators.
pub const DATA_URL_RE: &str =
    r"^data:(?P<mime_type>[^;,]*)(?P<base64>;base64)?,(?P<data>[^\n\r\x{2028}\x{2029}]*)$";

static DATA_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DATA_URL_RE).expect("built-in regex should be valid"));

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    let base64_data = BASE64_STANDARD.encode(data);
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// The decoded contents of a `data:` URL.
#[derive(Clone, Debug, PartialEq, Eq, JsonSchema, Serialize)]
pub struct DecodedPayload {
    /// The declared media type. Never empty.
    pub mime_type: String,

    /// Was the payload base64-encoded?
    pub is_base64: bool,

    /// The decoded text.
    pub text: String,
}

/// Why we couldn't decode a `data:` URL.
#[derive(Debug)]
pub enum DataUrlError {
    /// The input doesn't start with `data:`, so it's probably fetchable.
    NotADataUrl,

    /// The input starts with `data:` but doesn't have the expected structure.
    Malformed,

    /// The base64 payload could not be decoded.
    InvalidBase64(DecodeError),

    /// A `%` was not followed by two hex digits.
    InvalidPercentEscape {
        /// Byte offset of the `%` within the payload.
        offset: usize,
    },

    /// The decoded bytes were not UTF-8.
    InvalidUtf8(Utf8Error),
}

impl fmt::Display for DataUrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataUrlError::NotADataUrl => write!(f, "not a data URL"),
            DataUrlError::Malformed => write!(f, "malformed data URL"),
            DataUrlError::InvalidBase64(err) => {
                write!(f, "failed to decode base64 data URL: {err}")
            }
            DataUrlError::InvalidPercentEscape { offset } => write!(
                f,
                "failed to decode URL-encoded data: bad escape at offset {offset}"
            ),
            DataUrlError::InvalidUtf8(err) => {
                write!(f, "data URL payload is not valid UTF-8: {err}")
            }
        }
    }
}

impl error::Error for DataUrlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DataUrlError::InvalidBase64(err) => Some(err),
            DataUrlError::InvalidUtf8(err) => Some(err),
            _ => None,
        }
    }
}

/// Parse a `data:` URL, returning `None` if it isn't one or can't be decoded.
///
/// Callers that need to know *why* should use [`decode_data_url`]. Here we
/// only log the reason.
pub fn parse_data_url(url: &str) -> Option<DecodedPayload> {
    match decode_data_url(url) {
        Ok(payload) => Some(payload),
        Err(DataUrlError::NotADataUrl) => None,
        Err(err) => {
            warn!("{err}");
            None
        }
    }
}

/// Decode a `data:` URL, reporting exactly what went wrong.
pub fn decode_data_url(url: &str) -> Result<DecodedPayload, DataUrlError> {
    if !url.starts_with("data:") {
        return Err(DataUrlError::NotADataUrl);
    }

    let caps = DATA_URL.captures(url).ok_or(DataUrlError::Malformed)?;
    let mime_type = caps.name("mime_type").map_or("", |m| m.as_str());
    let is_base64 = caps.name("base64").is_some();
    let data = caps.name("data").map_or("", |m| m.as_str());

    let text = if is_base64 {
        let bytes = BASE64_STANDARD
            .decode(data)
            .map_err(DataUrlError::InvalidBase64)?;
        String::from_utf8(bytes)
            .map_err(|err| DataUrlError::InvalidUtf8(err.utf8_error()))?
    } else {
        percent_decode_strict(data)?
    };

    let mime_type = if mime_type.is_empty() {
        DEFAULT_MIME_TYPE
    } else {
        mime_type
    };
    Ok(DecodedPayload {
        mime_type: mime_type.to_owned(),
        is_base64,
        text,
    })
}

/// Percent-decode `data`, refusing stray `%` characters.
///
/// [`percent_decode_str`] passes malformed escapes through unchanged, so we
/// check them first.
fn percent_decode_strict(data: &str) -> Result<String, DataUrlError> {
    let bytes = data.as_bytes();
    for (offset, _) in data.match_indices('%') {
        let escape = bytes.get(offset + 1..offset + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(DataUrlError::InvalidPercentEscape { offset });
        }
    }
    percent_decode_str(data)
        .decode_utf8()
        .map(|text| text.into_owned())
        .map_err(DataUrlError::InvalidUtf8)
}
