//! Hostname extraction and the public suffix lookups needed to compute general domains.
//!
//! Full URL parsing is left to the embedder: URLs handed to this crate are expected to already be
//! normalised. The only structure recovered here is the host of a `scheme://authority/...` URL.

use memchr::{memchr as find_char, memmem, memrchr as find_char_reverse};

/// Public suffix service consumed by request construction and entity matching.
///
/// Implementations must be pure and cheap to call; they are invoked during matching.
pub trait ResolvesDomain: Send + Sync {
    /// Whether `hostname` is syntactically a domain name the resolver can reason about.
    fn is_valid_hostname(&self, hostname: &str) -> bool;

    /// The public suffix (effective TLD) of `hostname`, as a sub-slice of it. `None` when the
    /// hostname is malformed.
    fn get_public_suffix<'a>(&self, hostname: &'a str) -> Option<&'a str>;

    /// The registrable domain of `hostname`: its public suffix plus one more label, e.g.
    /// `sub.foo.co.uk` resolves to `foo.co.uk`. `None` for malformed hostnames and for hostnames
    /// that are themselves a public suffix.
    fn get_general_domain<'a>(&self, hostname: &'a str) -> Option<&'a str> {
        if !self.is_valid_hostname(hostname) {
            return None;
        }
        let suffix = self.get_public_suffix(hostname)?;
        if suffix.len() >= hostname.len() {
            return None;
        }
        let prefix = hostname
            .get(..hostname.len() - suffix.len())?
            .strip_suffix('.')?;
        let start = find_char_reverse(b'.', prefix.as_bytes()).map_or(0, |i| i + 1);
        if start == prefix.len() {
            return None;
        }
        Some(&hostname[start..])
    }
}

/// Resolver backed by the public suffix list embedded in the `addr` crate.
#[cfg(feature = "embedded-domain-resolver")]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResolver;

#[cfg(feature = "embedded-domain-resolver")]
impl ResolvesDomain for DefaultResolver {
    fn is_valid_hostname(&self, hostname: &str) -> bool {
        !hostname.is_empty() && addr::parse_domain_name(hostname).is_ok()
    }

    fn get_public_suffix<'a>(&self, hostname: &'a str) -> Option<&'a str> {
        let name = addr::parse_domain_name(hostname).ok()?;
        let suffix_len = name.suffix().len();
        if suffix_len == 0 || suffix_len > hostname.len() {
            return None;
        }
        Some(&hostname[hostname.len() - suffix_len..])
    }
}

/// Returns the host part of `url`, without credentials or port. IPv6 literals keep their
/// brackets.
pub fn get_url_host(url: &str) -> Option<&str> {
    let authority_start = memmem::find(url.as_bytes(), b"://")? + 3;
    let rest = &url[authority_start..];
    let authority_end = rest
        .find(|c: char| c == '/' || c == '?' || c == '#')
        .unwrap_or(rest.len());
    let authority = &rest[..authority_end];

    let host = match find_char_reverse(b'@', authority.as_bytes()) {
        Some(at) => &authority[at + 1..],
        None => authority,
    };

    let host = if host.starts_with('[') {
        let end = find_char(b']', host.as_bytes())?;
        &host[..=end]
    } else {
        match find_char(b':', host.as_bytes()) {
            Some(port) => &host[..port],
            None => host,
        }
    };

    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}
