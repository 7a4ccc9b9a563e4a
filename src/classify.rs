//! Byte classification tables shared by every scanner.
//!
//! The tables are built at compile time and never change, so lookups need no synchronization.

const fn build(set: &[u8]) -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < set.len() {
        table[set[i] as usize] = true;
        i += 1;
    }
    table
}

const fn build_token() -> [bool; 256] {
    let mut table = [false; 256];
    let mut b = 0x21;
    while b < 0x7f {
        table[b] = true;
        b += 1;
    }
    let mut i = 0;
    while i < TSPECIALS.len() {
        table[TSPECIALS[i] as usize] = false;
        i += 1;
    }
    table
}

/// RFC 2045 tspecials.
const TSPECIALS: &[u8] = b"()<>@,;:\\\"/[]?=";

static WSP: [bool; 256] = build(b" \t");
static TOKEN_SPECIAL: [bool; 256] = build(TSPECIALS);
static LINE_BREAK: [bool; 256] = build(b"\r\n");
static TOKEN: [bool; 256] = build_token();

/// Space or horizontal tab.
#[inline]
pub fn is_wsp(b: u8) -> bool {
    WSP[b as usize]
}

/// One of the characters that terminate an unquoted token.
#[inline]
pub fn is_token_special(b: u8) -> bool {
    TOKEN_SPECIAL[b as usize]
}

/// CR or LF.
#[inline]
pub fn is_line_break(b: u8) -> bool {
    LINE_BREAK[b as usize]
}

/// A byte allowed inside an unquoted token: printable US-ASCII except space and tspecials.
#[inline]
pub fn is_token(b: u8) -> bool {
    TOKEN[b as usize]
}

/// A byte allowed in a header field name.
#[inline]
pub fn is_field_name(b: u8) -> bool {
    b > 0x20 && b < 0x7f && b != b':'
}
