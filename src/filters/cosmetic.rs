//! Tools for blocking at a page-content level, including CSS selector-based filtering and content
//! script injection.

use itertools::Itertools;
use memchr::memchr_iter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

use crate::filters::Filter;
use crate::url_parser::ResolvesDomain;
use crate::utils::{self, Hash};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CosmeticFilterError {
    #[error("missing ## or #@# separator")]
    MissingSharp,
    #[error("unhide rule without hostnames")]
    UnhideWithoutHostnames,
    #[error("empty selector")]
    EmptySelector,
    #[error("invalid script syntax")]
    InvalidScriptSyntax,
    #[error("punycode error")]
    PunycodeError,
}

bitflags::bitflags! {
    /// Boolean flags for cosmetic filter rules.
    #[derive(Serialize, Deserialize)]
    pub struct CosmeticFilterMask: u8 {
        const UNHIDE = 1 << 0;
        const SCRIPT_BLOCK = 1 << 1;
        const SCRIPT_INJECT = 1 << 2;
        // At least one hostname had to be converted to punycode
        const IS_UNICODE = 1 << 3;

        // Careful with checking for NONE - will always match
        const NONE = 0;
    }
}

/// Struct representing a parsed cosmetic filter rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticFilter {
    mask: CosmeticFilterMask,
    /// In source order. Negated (`~host`) and entity (`name.*`) patterns are kept verbatim.
    hostnames: Vec<String>,
    selector: String,
    raw_line: Option<Box<String>>,
    id: Hash,
}

/// Result of a successful [`match_cosmetic_filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosmeticMatch<'a> {
    /// The filter has no hostnames and applies to every page.
    Everywhere,
    /// The first hostname pattern of the filter that matched.
    Hostname(&'a str),
}

impl CosmeticFilter {
    /// Parse the rule in `line` into a `CosmeticFilter`. If `debug` is true, the original rule
    /// will be reported in the resulting `CosmeticFilter` struct as well.
    pub fn parse(line: &str, debug: bool) -> Result<CosmeticFilter, CosmeticFilterError> {
        let (sharp_index, unhide) =
            find_separator(line).ok_or(CosmeticFilterError::MissingSharp)?;

        let mut mask = CosmeticFilterMask::NONE;
        let suffix_start_index = if unhide {
            mask |= CosmeticFilterMask::UNHIDE;
            sharp_index + 3
        } else {
            sharp_index + 2
        };

        let mut hostnames = vec![];
        for part in line[..sharp_index].split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if !part.is_ascii() {
                mask |= CosmeticFilterMask::IS_UNICODE;
            }
            hostnames.push(normalize_hostname_pattern(part)?);
        }

        // Exceptions have to be scoped to some hostnames
        if unhide && hostnames.is_empty() {
            return Err(CosmeticFilterError::UnhideWithoutHostnames);
        }

        let raw_selector = line[suffix_start_index..].trim();
        let selector = if let Some(body) = raw_selector.strip_prefix("script:contains(") {
            mask |= CosmeticFilterMask::SCRIPT_BLOCK;
            let body = body
                .strip_suffix(')')
                .ok_or(CosmeticFilterError::InvalidScriptSyntax)?;
            // script:contains(/regex/)
            if body.len() >= 2 && body.starts_with('/') && body.ends_with('/') {
                String::from(&body[1..body.len() - 1])
            } else {
                String::from(body)
            }
        } else if let Some(arguments) = raw_selector
            .strip_prefix("script:inject(")
            .or_else(|| raw_selector.strip_prefix("+js("))
        {
            mask |= CosmeticFilterMask::SCRIPT_INJECT;
            let arguments = arguments
                .strip_suffix(')')
                .ok_or(CosmeticFilterError::InvalidScriptSyntax)?;
            arguments.split(',').map(str::trim).join(", ")
        } else {
            String::from(raw_selector)
        };

        if selector.is_empty() {
            return Err(CosmeticFilterError::EmptySelector);
        }

        let id = compute_filter_id(mask, &hostnames, &selector);
        Ok(CosmeticFilter {
            mask,
            hostnames,
            selector,
            raw_line: if debug {
                Some(Box::new(String::from(line)))
            } else {
                None
            },
            id,
        })
    }

    pub fn mask(&self) -> CosmeticFilterMask {
        self.mask
    }

    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    pub fn has_hostnames(&self) -> bool {
        !self.hostnames.is_empty()
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn raw_line(&self) -> Option<&str> {
        self.raw_line.as_deref().map(String::as_str)
    }

    pub fn is_unhide(&self) -> bool {
        self.mask.contains(CosmeticFilterMask::UNHIDE)
    }

    pub fn is_script_block(&self) -> bool {
        self.mask.contains(CosmeticFilterMask::SCRIPT_BLOCK)
    }

    pub fn is_script_inject(&self) -> bool {
        self.mask.contains(CosmeticFilterMask::SCRIPT_INJECT)
    }

    pub fn is_unicode(&self) -> bool {
        self.mask.contains(CosmeticFilterMask::IS_UNICODE)
    }

    /// See [`match_cosmetic_filter`].
    pub fn matches_hostname<'a, R: ResolvesDomain + ?Sized>(
        &'a self,
        hostname: &str,
        resolver: &R,
    ) -> Option<CosmeticMatch<'a>> {
        if self.hostnames.is_empty() {
            return Some(CosmeticMatch::Everywhere);
        }
        if hostname.is_empty() {
            return None;
        }
        self.hostnames
            .iter()
            .find(|pattern| match_hostname(hostname, pattern, resolver))
            .map(|pattern| CosmeticMatch::Hostname(pattern.as_str()))
    }
}

impl Filter for CosmeticFilter {
    fn get_id(&self) -> Hash {
        self.id
    }

    fn get_tokens(&self) -> Vec<Hash> {
        utils::tokenize_css(&self.selector).collect()
    }

    fn raw_line(&self) -> Option<&str> {
        CosmeticFilter::raw_line(self)
    }
}

impl fmt::Display for CosmeticFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        if let Some(raw_line) = self.raw_line() {
            return write!(f, "{}", raw_line);
        }
        write!(f, "{}", self.hostnames.join(","))?;
        write!(f, "{}", if self.is_unhide() { "#@#" } else { "##" })?;
        if self.is_script_block() {
            write!(f, "script:contains({})", self.selector)
        } else if self.is_script_inject() {
            write!(f, "script:inject({})", self.selector)
        } else {
            write!(f, "{}", self.selector)
        }
    }
}

/// Decides whether a cosmetic filter applies on a page served from `hostname`.
///
/// Filters without hostnames apply everywhere. Otherwise the first of the filter's hostname
/// patterns matching `hostname` is returned, and `None` means the filter does not apply. Negated
/// patterns (`~host`) are compared without their `~`: acting on the negation is up to the caller.
pub fn match_cosmetic_filter<'a, R: ResolvesDomain + ?Sized>(
    filter: &'a CosmeticFilter,
    hostname: &str,
    resolver: &R,
) -> Option<CosmeticMatch<'a>> {
    filter.matches_hostname(hostname, resolver)
}

/// Finds the first `##` or `#@#` in `line`, returning its index and whether it is an unhide
/// separator.
fn find_separator(line: &str) -> Option<(usize, bool)> {
    let bytes = line.as_bytes();
    memchr_iter(b'#', bytes).find_map(|index| {
        let rest = &bytes[index + 1..];
        if rest.starts_with(b"#") {
            Some((index, false))
        } else if rest.starts_with(b"@#") {
            Some((index, true))
        } else {
            None
        }
    })
}

/// Lowercases a hostname pattern and converts its hostname part to punycode, keeping the `~`
/// negation prefix and the `.*` entity suffix.
fn normalize_hostname_pattern(pattern: &str) -> Result<String, CosmeticFilterError> {
    let lowercase = pattern.to_lowercase();
    if lowercase.is_ascii() {
        return Ok(lowercase);
    }

    let (negation, rest) = match lowercase.strip_prefix('~') {
        Some(rest) => ("~", rest),
        None => ("", lowercase.as_str()),
    };
    let (core, entity) = match rest.strip_suffix(".*") {
        Some(core) => (core, ".*"),
        None => (rest, ""),
    };
    let core = idna::domain_to_ascii(core).map_err(|_| CosmeticFilterError::PunycodeError)?;
    Ok(format!("{}{}{}", negation, core, entity))
}

/// Checks if `hostname` matches `hostname_pattern`, which can appear as a domain selector in a
/// cosmetic filter: `hostname_pattern##selector`.
///
/// Entity patterns like `google.*` match any public suffix, so the suffix of `hostname` is
/// stripped before comparing.
fn match_hostname<R: ResolvesDomain + ?Sized>(
    hostname: &str,
    hostname_pattern: &str,
    resolver: &R,
) -> bool {
    if let Some(entity) = hostname_pattern.strip_suffix(".*") {
        if !resolver.is_valid_hostname(hostname) {
            return false;
        }
        let suffix = match resolver.get_public_suffix(hostname) {
            Some(suffix) => suffix,
            None => return false,
        };
        // Ignore the public suffix and the dot before it
        let hostname_without_suffix = hostname
            .get(..hostname.len() - suffix.len())
            .and_then(|prefix| prefix.strip_suffix('.'));
        match hostname_without_suffix {
            Some(prefix) if !prefix.is_empty() => check_hostnames_partial_match(prefix, entity),
            _ => false,
        }
    } else {
        check_hostnames_partial_match(hostname, hostname_pattern)
    }
}

/// Checks that `hostname_pattern` matches at the end of `hostname`, on a label boundary.
fn check_hostnames_partial_match(hostname: &str, hostname_pattern: &str) -> bool {
    let pattern = hostname_pattern.strip_prefix('~').unwrap_or(hostname_pattern);

    if hostname.ends_with(pattern) {
        let pattern_index = hostname.len() - pattern.len();
        pattern_index == 0 || hostname.as_bytes()[pattern_index - 1] == b'.'
    } else {
        false
    }
}

fn compute_filter_id(mask: CosmeticFilterMask, hostnames: &[String], selector: &str) -> Hash {
    let mut hash: Hash = (5408 * 33) ^ Hash::from(mask.bits);

    for h in hostnames {
        hash = hash.wrapping_mul(33) ^ utils::fast_hash(h);
    }

    hash = hash.wrapping_mul(33) ^ Hash::from(b'#');

    for c in selector.chars() {
        hash = hash.wrapping_mul(33) ^ (c as Hash);
    }

    hash
}

#[cfg(test)]
#[path = "../../tests/unit/filters/cosmetic.rs"]
mod unit_tests;
