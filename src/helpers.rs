use crate::classify;
use http::header::{HeaderMap, HeaderName, HeaderValue};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Appends a raw header field to `headers`; repeated fields are kept in order.
pub(crate) fn append_raw_header(headers: &mut HeaderMap, name: &[u8], value: &[u8]) -> Result<(), BoxError> {
    let name = HeaderName::from_bytes(name)?;
    let value = HeaderValue::from_bytes(value)?;

    headers.append(name, value);

    Ok(())
}

/// Removes the line breaks of folded lines and trims surrounding whitespace.
pub(crate) fn unfold(raw: &[u8]) -> Vec<u8> {
    let mut value: Vec<u8> = raw.iter().copied().filter(|&b| !classify::is_line_break(b)).collect();

    let end = value
        .iter()
        .rposition(|&b| !classify::is_wsp(b))
        .map_or(0, |idx| idx + 1);
    value.truncate(end);

    let start = value.iter().position(|&b| !classify::is_wsp(b)).unwrap_or(value.len());
    value.drain(..start);

    value
}
