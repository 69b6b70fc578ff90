//! Hashing and tokenization primitives shared by the filter parsers.

use std::borrow::Borrow;
use std::iter::FusedIterator;

pub type Hash = u32;

/// Rolling `hash * 31 + code` over the UTF-16 code units of `input`, wrapping at 32 bits.
///
/// The result is stable across platforms and matches values computed by other implementations
/// of the same filter format, so it can be persisted.
#[inline]
pub fn fast_hash(input: &str) -> Hash {
    if input.is_ascii() {
        hash_units(input.bytes().map(Hash::from))
    } else {
        hash_units(input.encode_utf16().map(Hash::from))
    }
}

#[inline]
fn hash_units(units: impl Iterator<Item = Hash>) -> Hash {
    units.fold(0, |hash, code| (hash << 5).wrapping_sub(hash).wrapping_add(code))
}

#[inline]
fn is_allowed_filter(ch: u8) -> bool {
    ch.is_ascii_alphanumeric()
}

#[inline]
fn is_allowed_css(ch: u8) -> bool {
    is_allowed_filter(ch) || ch == b'_' || ch == b'-' || ch == b'.' || ch == b'#'
}

/// Lazy sequence of token hashes over a pattern. Cloning it restarts the scan from the position
/// the clone was taken at; no state is shared between clones.
#[derive(Clone)]
pub struct Tokens<'a> {
    pattern: &'a str,
    position: usize,
    is_allowed_code: fn(u8) -> bool,
    skip_before_wildcard: bool,
}

impl<'a> Tokens<'a> {
    fn new(pattern: &'a str, is_allowed_code: fn(u8) -> bool, skip_before_wildcard: bool) -> Self {
        Tokens {
            pattern,
            position: 0,
            is_allowed_code,
            skip_before_wildcard,
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Hash;

    fn next(&mut self) -> Option<Hash> {
        let bytes = self.pattern.as_bytes();
        loop {
            while self.position < bytes.len() && !(self.is_allowed_code)(bytes[self.position]) {
                self.position += 1;
            }
            if self.position >= bytes.len() {
                return None;
            }

            let start = self.position;
            while self.position < bytes.len() && (self.is_allowed_code)(bytes[self.position]) {
                self.position += 1;
            }

            // Tokens directly followed by a wildcard may be truncated in actual URLs
            if self.skip_before_wildcard && bytes.get(self.position) == Some(&b'*') {
                continue;
            }

            // Allowed codes are all ASCII, so both ends are char boundaries
            return Some(fast_hash(&self.pattern[start..self.position]));
        }
    }
}

impl FusedIterator for Tokens<'_> {}

/// Hashes every maximal run of ASCII alphanumerics in `pattern`, except runs immediately
/// followed by `*`.
pub fn tokenize(pattern: &str) -> Tokens<'_> {
    Tokens::new(pattern, is_allowed_filter, true)
}

/// Like [`tokenize`], but runs may also contain `_`, `-`, `.` and `#`, and are kept even when
/// followed by `*`.
pub fn tokenize_css(pattern: &str) -> Tokens<'_> {
    Tokens::new(pattern, is_allowed_css, false)
}

/// Appends the tokens of `pattern` to an existing buffer.
pub fn tokenize_pooled(pattern: &str, tokens_buffer: &mut Vec<Hash>) {
    tokens_buffer.extend(tokenize(pattern));
}

pub fn bin_lookup<T, B>(arr: &[B], elt: &T) -> bool
where
    T: Ord + ?Sized,
    B: Borrow<T>,
{
    arr.binary_search_by(|candidate| candidate.borrow().cmp(elt)).is_ok()
}

#[cfg(test)]
#[path = "../tests/unit/utils.rs"]
mod unit_tests;
