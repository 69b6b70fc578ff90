//! Matching of parsed [`NetworkFilter`]s against [`Request`]s.
//!
//! Each filter carries the [`PatternShape`] it was parsed into, so matching is a single dispatch
//! to one comparison routine followed by the option checks.

use memchr::memmem;

use crate::filters::network::{NetworkFilter, PatternShape};
use crate::request::Request;
use crate::utils;

pub trait NetworkMatchable {
    fn matches(&self, request: &Request) -> bool;
}

impl NetworkMatchable for NetworkFilter {
    fn matches(&self, request: &Request) -> bool {
        check_options(self, request) && check_pattern(self, request)
    }
}

/// Whether `filter` applies to `request`: both its options and its pattern must match.
pub fn match_network_filter(filter: &NetworkFilter, request: &Request) -> bool {
    filter.matches(request)
}

/// Handle hostname anchored filters: the hostname from `||hostname` has to start a label of the
/// request's hostname, i.e. appear at index 0 or right after a `.`.
pub(crate) fn is_anchored_by_hostname(filter_hostname: &str, hostname: &str) -> bool {
    // Corner-case, if `filter_hostname` is empty, then it's a match
    if filter_hostname.is_empty() {
        return true;
    }

    match memmem::find(hostname.as_bytes(), filter_hostname.as_bytes()) {
        Some(0) => true,
        Some(match_index) => hostname.as_bytes()[match_index - 1] == b'.',
        None => false,
    }
}

/// Byte offset in the request URL right after the first occurrence of `hostname`.
fn get_url_after_hostname(request: &Request, hostname: &str) -> Option<usize> {
    memmem::find(request.url_lower_cased().as_bytes(), hostname.as_bytes())
        .map(|start| start + hostname.len())
}

// ---------------------------------------------------------------------------
// Filter matching
// ---------------------------------------------------------------------------

// pattern
fn check_pattern_plain_filter(filter: &NetworkFilter, request: &Request) -> bool {
    let request_url = request.get_url(filter.match_case());
    memmem::find(request_url.as_bytes(), filter.filter().as_bytes()).is_some()
}

// pattern|
fn check_pattern_right_anchor_filter(filter: &NetworkFilter, request: &Request) -> bool {
    request.get_url(filter.match_case()).ends_with(filter.filter())
}

// |pattern
fn check_pattern_left_anchor_filter(filter: &NetworkFilter, request: &Request) -> bool {
    request.get_url(filter.match_case()).starts_with(filter.filter())
}

// |pattern|
fn check_pattern_left_right_anchor_filter(filter: &NetworkFilter, request: &Request) -> bool {
    request.get_url(filter.match_case()) == filter.filter()
}

// pattern*^
fn check_pattern_regex_filter(filter: &NetworkFilter, request: &Request) -> bool {
    filter.get_regex().is_match(&request.get_url(filter.match_case()))
}

// ||pattern*^
// The regex only sees the URL after the hostname, so `||foo.com^bar` rejects `http://foo.com/x/bar`.
fn check_pattern_hostname_anchor_regex_filter(filter: &NetworkFilter, request: &Request) -> bool {
    if !is_anchored_by_hostname(filter.hostname(), request.hostname()) {
        return false;
    }
    match get_url_after_hostname(request, filter.hostname()) {
        Some(start) => {
            let request_url = request.get_url(filter.match_case());
            filter.get_regex().is_match(&request_url[start..])
        }
        None => false,
    }
}

// ||pattern|
fn check_pattern_hostname_right_anchor_filter(filter: &NetworkFilter, request: &Request) -> bool {
    if !is_anchored_by_hostname(filter.hostname(), request.hostname()) {
        return false;
    }
    match get_url_after_hostname(request, filter.hostname()) {
        Some(start) => &request.get_url(filter.match_case())[start..] == filter.filter(),
        None => false,
    }
}

// ||pattern
fn check_pattern_hostname_anchor_filter(filter: &NetworkFilter, request: &Request) -> bool {
    if !is_anchored_by_hostname(filter.hostname(), request.hostname()) {
        return false;
    }
    // Since this is not a regex, the filter pattern must follow the hostname
    // with nothing in between.
    match get_url_after_hostname(request, filter.hostname()) {
        Some(start) => request.get_url(filter.match_case())[start..].starts_with(filter.filter()),
        None => false,
    }
}

/// Specialize a network filter depending on its shape.
///
/// Shapes:
///   - `||hostname*^` and `||hostname/pattern|`
///   - `||hostname/pattern`
///   - `*^` with optional `|` anchors
///   - `|pattern|`, `|pattern`, `pattern|`
///   - plain `pattern`
pub(crate) fn check_pattern(filter: &NetworkFilter, request: &Request) -> bool {
    match filter.shape() {
        PatternShape::HostnameRegex => check_pattern_hostname_anchor_regex_filter(filter, request),
        PatternShape::HostnameRightAnchor => {
            check_pattern_hostname_right_anchor_filter(filter, request)
        }
        PatternShape::HostnameAnchored => check_pattern_hostname_anchor_filter(filter, request),
        PatternShape::Regex => check_pattern_regex_filter(filter, request),
        PatternShape::LeftRightAnchor => check_pattern_left_right_anchor_filter(filter, request),
        PatternShape::LeftAnchor => check_pattern_left_anchor_filter(filter, request),
        PatternShape::RightAnchor => check_pattern_right_anchor_filter(filter, request),
        PatternShape::Plain => check_pattern_plain_filter(filter, request),
    }
}

pub(crate) fn check_options(filter: &NetworkFilter, request: &Request) -> bool {
    // Bad cpt
    if !filter.check_cpt_allowed(request.request_type()) {
        return false;
    }

    // Source and destination general domains
    let is_first_party = request.source_gd() == request.host_gd();
    if (!filter.first_party() && is_first_party) || (!filter.third_party() && !is_first_party) {
        return false;
    }

    // Source URL must be among these domains to match
    if filter.has_opt_domains()
        && !utils::bin_lookup(filter.opt_domains(), request.source_gd())
        && !utils::bin_lookup(filter.opt_domains(), request.source_hostname())
    {
        return false;
    }

    // Source URL must not be among these domains to match
    if filter.has_opt_not_domains()
        && (utils::bin_lookup(filter.opt_not_domains(), request.source_gd())
            || utils::bin_lookup(filter.opt_not_domains(), request.source_hostname()))
    {
        return false;
    }

    true
}

#[cfg(test)]
#[path = "../../tests/unit/filters/network_matchers.rs"]
mod unit_tests;
