pub(crate) const DEFAULT_MAX_DEPTH: usize = 64;
pub(crate) const DEFAULT_MAX_PARTS: usize = std::usize::MAX;
pub(crate) const DEFAULT_MAX_HEADER_SIZE: u64 = 64 * 1024;

pub(crate) const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

pub(crate) const ROOT_PART_NUMBER: &str = "1";

pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';

pub(crate) const CONTENT_TYPE: &str = "content-type";
pub(crate) const CONTENT_TRANSFER_ENCODING: &str = "content-transfer-encoding";
pub(crate) const CONTENT_DISPOSITION: &str = "content-disposition";

pub(crate) const BOUNDARY_PARAM: &str = "boundary";
pub(crate) const CHARSET_PARAM: &str = "charset";

pub(crate) const MULTIPART: &str = "multipart";
pub(crate) const MESSAGE: &str = "message";
pub(crate) const RFC822: &str = "rfc822";
pub(crate) const DIGEST: &str = "digest";

/// Builds the line that opens a part, `--` followed by the boundary.
pub(crate) fn delimiter(boundary: &str) -> Vec<u8> {
    let mut line = Vec::with_capacity(BOUNDARY_EXT.len() + boundary.len());
    line.extend_from_slice(BOUNDARY_EXT.as_bytes());
    line.extend_from_slice(boundary.as_bytes());
    line
}
