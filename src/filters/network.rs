//! Filters that take effect at the network request level, i.e. blocking or allowing requests by
//! URL pattern and request metadata.

use memchr::{memchr as find_char, memrchr as find_char_reverse};
use once_cell::sync::{Lazy, OnceCell};
use regex::{bytes::Regex as BytesRegex, bytes::RegexBuilder as BytesRegexBuilder, NoExpand, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

use crate::filters::Filter;
use crate::request;
use crate::utils::{self, Hash};

pub(crate) const TOKENS_BUFFER_SIZE: usize = 128;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetworkFilterError {
    #[error("failed to parse filter")]
    FilterParseError,
    #[error("negated important")]
    NegatedImportant,
    #[error("negated match-case")]
    NegatedOptionMatchCase,
    #[error("negated redirection")]
    NegatedRedirection,
    #[error("negated domain")]
    NegatedDomain,
    #[error("empty redirection")]
    EmptyRedirection,
    #[error("unrecognised option")]
    UnrecognisedOption,
    #[error("punycode error")]
    PunycodeError,
    #[error("no supported domains")]
    NoSupportedDomains,
}

bitflags::bitflags! {
    #[derive(Serialize, Deserialize)]
    pub struct NetworkFilterMask: u32 {
        const FROM_IMAGE = 1; // 1 << 0;
        const FROM_MEDIA = 1 << 1;
        const FROM_OBJECT = 1 << 2;
        const FROM_OBJECT_SUBREQUEST = 1 << 3;
        const FROM_OTHER = 1 << 4;
        const FROM_PING = 1 << 5;
        const FROM_SCRIPT = 1 << 6;
        const FROM_FONT = 1 << 7;
        const FROM_STYLESHEET = 1 << 8;
        const FROM_SUBDOCUMENT = 1 << 9;
        const FROM_WEBSOCKET = 1 << 10; // e.g.: ws, wss
        const FROM_XMLHTTPREQUEST = 1 << 11;
        // No positive content type option was given
        const FROM_ANY = 1 << 12;
        const IS_IMPORTANT = 1 << 13;
        const MATCH_CASE = 1 << 14;
        const IS_REDIRECT = 1 << 15;
        const THIRD_PARTY = 1 << 16;
        const FIRST_PARTY = 1 << 17;

        // Kind of pattern
        const IS_REGEX = 1 << 18;
        const IS_LEFT_ANCHOR = 1 << 19;
        const IS_RIGHT_ANCHOR = 1 << 20;
        const IS_HOSTNAME_ANCHOR = 1 << 21;
        const IS_EXCEPTION = 1 << 22;
        // Built from a hosts-file entry
        const IS_HOSTNAME = 1 << 23;

        const FROM_NETWORK_TYPES = Self::FROM_IMAGE.bits |
            Self::FROM_MEDIA.bits |
            Self::FROM_OBJECT.bits |
            Self::FROM_OBJECT_SUBREQUEST.bits |
            Self::FROM_OTHER.bits |
            Self::FROM_PING.bits |
            Self::FROM_SCRIPT.bits |
            Self::FROM_FONT.bits |
            Self::FROM_STYLESHEET.bits |
            Self::FROM_SUBDOCUMENT.bits |
            Self::FROM_WEBSOCKET.bits |
            Self::FROM_XMLHTTPREQUEST.bits;

        // Unless filter specifies otherwise, all these options are set by default
        const DEFAULT_OPTIONS = Self::THIRD_PARTY.bits |
            Self::FIRST_PARTY.bits;

        // Careful with checking for NONE - will always match
        const NONE = 0;
    }
}

impl fmt::Display for NetworkFilterMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:b}", &self.bits)
    }
}

impl From<request::RequestType> for NetworkFilterMask {
    fn from(request_type: request::RequestType) -> NetworkFilterMask {
        match request_type {
            request::RequestType::Font => NetworkFilterMask::FROM_FONT,
            request::RequestType::Image => NetworkFilterMask::FROM_IMAGE,
            request::RequestType::Media => NetworkFilterMask::FROM_MEDIA,
            request::RequestType::Object => NetworkFilterMask::FROM_OBJECT,
            request::RequestType::ObjectSubrequest => NetworkFilterMask::FROM_OBJECT_SUBREQUEST,
            request::RequestType::Other => NetworkFilterMask::FROM_OTHER,
            request::RequestType::Ping => NetworkFilterMask::FROM_PING,
            request::RequestType::Script => NetworkFilterMask::FROM_SCRIPT,
            request::RequestType::Stylesheet => NetworkFilterMask::FROM_STYLESHEET,
            request::RequestType::Subdocument => NetworkFilterMask::FROM_SUBDOCUMENT,
            request::RequestType::Websocket => NetworkFilterMask::FROM_WEBSOCKET,
            request::RequestType::Xmlhttprequest => NetworkFilterMask::FROM_XMLHTTPREQUEST,
        }
    }
}

/// The closed set of pattern layouts a network filter can have. It is decided once when the
/// filter is parsed, and selects the comparison routine used at match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternShape {
    /// `||hostname` followed by a pattern containing `*` or `^`
    HostnameRegex,
    /// `||hostname/pattern|`
    HostnameRightAnchor,
    /// `||hostname/pattern`
    HostnameAnchored,
    /// `pattern*^`, optionally with `|` anchors
    Regex,
    /// `|pattern|`
    LeftRightAnchor,
    /// `|pattern`
    LeftAnchor,
    /// `pattern|`
    RightAnchor,
    /// `pattern`
    Plain,
}

impl PatternShape {
    fn from_mask(mask: NetworkFilterMask) -> PatternShape {
        let is_regex = mask.contains(NetworkFilterMask::IS_REGEX);
        let is_left_anchor = mask.contains(NetworkFilterMask::IS_LEFT_ANCHOR);
        let is_right_anchor = mask.contains(NetworkFilterMask::IS_RIGHT_ANCHOR);

        if mask.contains(NetworkFilterMask::IS_HOSTNAME_ANCHOR) {
            if is_regex {
                PatternShape::HostnameRegex
            } else if is_right_anchor {
                PatternShape::HostnameRightAnchor
            } else {
                PatternShape::HostnameAnchored
            }
        } else if is_regex {
            PatternShape::Regex
        } else if is_left_anchor && is_right_anchor {
            PatternShape::LeftRightAnchor
        } else if is_left_anchor {
            PatternShape::LeftAnchor
        } else if is_right_anchor {
            PatternShape::RightAnchor
        } else {
            PatternShape::Plain
        }
    }
}

#[derive(Debug, Clone)]
pub enum CompiledRegex {
    Compiled(BytesRegex),
    MatchAll,
    RegexParsingError(regex::Error),
}

impl CompiledRegex {
    pub fn is_match(&self, pattern: &str) -> bool {
        match &self {
            CompiledRegex::MatchAll => true, // simple case for matching everything, e.g. for empty filter
            CompiledRegex::RegexParsingError(_e) => false, // no match if regex didn't even compile
            CompiledRegex::Compiled(r) => r.is_match(pattern.as_bytes()),
        }
    }
}

impl fmt::Display for CompiledRegex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            CompiledRegex::MatchAll => write!(f, ".*"),
            CompiledRegex::RegexParsingError(_e) => write!(f, "ERROR"),
            CompiledRegex::Compiled(r) => write!(f, "{}", r.as_str()),
        }
    }
}

#[derive(Clone, Copy)]
enum NetworkFilterLeftAnchor {
    /// A `||` token, which represents a match to the start of a domain or subdomain segment.
    DoublePipe,
    /// A `|` token, which represents a match to the exact start of the URL.
    SinglePipe,
}

#[derive(Clone, Copy)]
enum NetworkFilterRightAnchor {
    /// A `|` token, which represents a match to the exact end of the URL.
    SinglePipe,
}

/// Pattern for a network filter, describing what URLs to match against.
#[derive(Clone)]
struct NetworkFilterPattern<'a> {
    left_anchor: Option<NetworkFilterLeftAnchor>,
    pattern: &'a str,
    right_anchor: Option<NetworkFilterRightAnchor>,
}

/// Any option that appears on the right side of a network filter as initiated by a `$` character.
/// All `bool` arguments below are `true` if the option stands alone, or `false` if the option is
/// negated using a prepended `~`.
#[derive(Clone)]
enum NetworkFilterOption {
    Domain(Vec<(bool, String)>),
    Important,
    MatchCase,
    ThirdParty(bool),
    FirstParty(bool),
    Redirect(String),
    Image(bool),
    Media(bool),
    Object(bool),
    ObjectSubrequest(bool),
    Other(bool),
    Ping(bool),
    Script(bool),
    Font(bool),
    Stylesheet(bool),
    Subdocument(bool),
    XmlHttpRequest(bool),
    Websocket(bool),
}

/// Abstract syntax representation of a network filter: the raw pieces of the line, before any
/// interpretation of the pattern.
struct AbstractNetworkFilter<'a> {
    exception: bool,
    pattern: NetworkFilterPattern<'a>,
    options: Option<Vec<NetworkFilterOption>>,
}

impl<'a> AbstractNetworkFilter<'a> {
    fn parse(line: &'a str) -> Result<Self, NetworkFilterError> {
        let mut filter_index_start: usize = 0;
        let mut filter_index_end: usize = line.len();

        let mut exception = false;
        if line.starts_with("@@") {
            filter_index_start += 2;
            exception = true;
        }

        let maybe_options_index: Option<usize> = find_char_reverse(b'$', line.as_bytes());

        let mut options = None;
        if let Some(options_index) = maybe_options_index {
            if options_index < filter_index_start {
                return Err(NetworkFilterError::FilterParseError);
            }
            filter_index_end = options_index;

            // slicing here is safe; the first byte after '$' will be a character boundary
            let raw_options = &line[filter_index_end + 1..];

            options = Some(parse_filter_options(raw_options)?);
        }

        let left_anchor = if line[filter_index_start..filter_index_end].starts_with("||") {
            filter_index_start += 2;
            Some(NetworkFilterLeftAnchor::DoublePipe)
        } else if line[filter_index_start..filter_index_end].starts_with('|') {
            filter_index_start += 1;
            Some(NetworkFilterLeftAnchor::SinglePipe)
        } else {
            None
        };

        let right_anchor = if filter_index_end > filter_index_start
            && line[..filter_index_end].ends_with('|')
        {
            filter_index_end -= 1;
            Some(NetworkFilterRightAnchor::SinglePipe)
        } else {
            None
        };

        Ok(AbstractNetworkFilter {
            exception,
            pattern: NetworkFilterPattern {
                left_anchor,
                pattern: &line[filter_index_start..filter_index_end],
                right_anchor,
            },
            options,
        })
    }
}

/// Lowercases a hostname and converts it to punycode if it contains non-ASCII characters.
fn normalize_hostname(hostname: &str) -> Result<String, NetworkFilterError> {
    let lowercase = hostname.to_lowercase();
    if lowercase.is_ascii() {
        Ok(lowercase)
    } else {
        idna::domain_to_ascii(&lowercase).map_err(|_| NetworkFilterError::PunycodeError)
    }
}

fn parse_filter_options(raw_options: &str) -> Result<Vec<NetworkFilterOption>, NetworkFilterError> {
    let mut result = vec![];

    for raw_option in raw_options.split(',') {
        // Check for negation: ~option
        let negation = raw_option.starts_with('~');
        let maybe_negated_option = raw_option.trim_start_matches('~');

        // Check for options: option=value1|value2
        let (option, value) = match maybe_negated_option.split_once('=') {
            Some((option, value)) => (option, value),
            None => (maybe_negated_option, ""),
        };

        result.push(match (option, negation) {
            ("domain", true) => return Err(NetworkFilterError::NegatedDomain),
            ("domain", false) => {
                let mut domains: Vec<(bool, String)> = vec![];
                for domain in value.split('|') {
                    let (enabled, domain) = match domain.strip_prefix('~') {
                        Some(negated_domain) => (false, negated_domain),
                        None => (true, domain),
                    };
                    if domain.is_empty() {
                        continue;
                    }
                    domains.push((enabled, normalize_hostname(domain)?));
                }
                if domains.is_empty() {
                    return Err(NetworkFilterError::NoSupportedDomains);
                }
                NetworkFilterOption::Domain(domains)
            }
            ("important", true) => return Err(NetworkFilterError::NegatedImportant),
            ("important", false) => NetworkFilterOption::Important,
            ("match-case", true) => return Err(NetworkFilterError::NegatedOptionMatchCase),
            ("match-case", false) => NetworkFilterOption::MatchCase,
            ("third-party", negated) | ("3p", negated) => NetworkFilterOption::ThirdParty(!negated),
            ("first-party", negated) | ("1p", negated) => NetworkFilterOption::FirstParty(!negated),
            ("redirect", true) => return Err(NetworkFilterError::NegatedRedirection),
            ("redirect", false) => {
                // Ignore this filter if no redirection resource is specified
                if value.is_empty() {
                    return Err(NetworkFilterError::EmptyRedirection);
                }
                NetworkFilterOption::Redirect(String::from(value))
            }
            ("image", negated) => NetworkFilterOption::Image(!negated),
            ("media", negated) => NetworkFilterOption::Media(!negated),
            ("object", negated) => NetworkFilterOption::Object(!negated),
            ("object-subrequest", negated) => NetworkFilterOption::ObjectSubrequest(!negated),
            ("other", negated) => NetworkFilterOption::Other(!negated),
            ("ping", negated) | ("beacon", negated) => NetworkFilterOption::Ping(!negated),
            ("script", negated) => NetworkFilterOption::Script(!negated),
            ("font", negated) => NetworkFilterOption::Font(!negated),
            ("stylesheet", negated) | ("css", negated) => NetworkFilterOption::Stylesheet(!negated),
            ("subdocument", negated) | ("frame", negated) => {
                NetworkFilterOption::Subdocument(!negated)
            }
            ("xmlhttprequest", negated) | ("xhr", negated) => {
                NetworkFilterOption::XmlHttpRequest(!negated)
            }
            ("websocket", negated) => NetworkFilterOption::Websocket(!negated),
            (_, _) => return Err(NetworkFilterError::UnrecognisedOption),
        });
    }
    Ok(result)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkFilter {
    mask: NetworkFilterMask,
    shape: PatternShape,
    filter: String,
    hostname: String,
    /// Sorted and deduplicated, for binary search.
    opt_domains: Vec<String>,
    opt_not_domains: Vec<String>,
    redirect: String,
    raw_line: Option<Box<String>>,
    id: Hash,

    /// Built from `filter` the first time a regex-shaped filter is matched.
    #[serde(skip)]
    regex: OnceCell<CompiledRegex>,
}

impl PartialEq for NetworkFilter {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask
            && self.filter == other.filter
            && self.hostname == other.hostname
            && self.opt_domains == other.opt_domains
            && self.opt_not_domains == other.opt_not_domains
            && self.redirect == other.redirect
            && self.raw_line == other.raw_line
    }
}

impl Eq for NetworkFilter {}

impl NetworkFilter {
    /// Parse a single network filter line. The line is expected to be trimmed, and not to be a
    /// comment. If `debug` is true the original line is kept on the filter.
    pub fn parse(line: &str, debug: bool) -> Result<Self, NetworkFilterError> {
        let parsed = AbstractNetworkFilter::parse(line)?;

        // Represent options as a bitmask
        let mut mask = NetworkFilterMask::DEFAULT_OPTIONS;

        // Temporary masks for positive (e.g.: $script) and negative (e.g.: $~script)
        // content type options.
        let mut cpt_mask_positive: NetworkFilterMask = NetworkFilterMask::NONE;
        let mut cpt_mask_negative: NetworkFilterMask = NetworkFilterMask::NONE;

        let mut opt_domains: Vec<String> = vec![];
        let mut opt_not_domains: Vec<String> = vec![];
        let mut redirect = String::new();

        if parsed.exception {
            mask.set(NetworkFilterMask::IS_EXCEPTION, true);
        }

        if let Some(options) = parsed.options {
            macro_rules! apply_content_type {
                ($content_type:ident, $enabled:ident) => {
                    if $enabled {
                        cpt_mask_positive.set(NetworkFilterMask::$content_type, true);
                    } else {
                        cpt_mask_negative.set(NetworkFilterMask::$content_type, true);
                    }
                };
            }

            for option in options {
                match option {
                    NetworkFilterOption::Domain(domains) => {
                        for (enabled, domain) in domains {
                            if enabled {
                                opt_domains.push(domain);
                            } else {
                                opt_not_domains.push(domain);
                            }
                        }
                    }
                    NetworkFilterOption::Important => {
                        mask.set(NetworkFilterMask::IS_IMPORTANT, true)
                    }
                    NetworkFilterOption::MatchCase => mask.set(NetworkFilterMask::MATCH_CASE, true),
                    NetworkFilterOption::ThirdParty(false)
                    | NetworkFilterOption::FirstParty(true) => {
                        mask.set(NetworkFilterMask::THIRD_PARTY, false)
                    }
                    NetworkFilterOption::ThirdParty(true)
                    | NetworkFilterOption::FirstParty(false) => {
                        mask.set(NetworkFilterMask::FIRST_PARTY, false)
                    }
                    NetworkFilterOption::Redirect(value) => {
                        mask.set(NetworkFilterMask::IS_REDIRECT, true);
                        redirect = value;
                    }
                    NetworkFilterOption::Image(enabled) => apply_content_type!(FROM_IMAGE, enabled),
                    NetworkFilterOption::Media(enabled) => apply_content_type!(FROM_MEDIA, enabled),
                    NetworkFilterOption::Object(enabled) => {
                        apply_content_type!(FROM_OBJECT, enabled)
                    }
                    NetworkFilterOption::ObjectSubrequest(enabled) => {
                        apply_content_type!(FROM_OBJECT_SUBREQUEST, enabled)
                    }
                    NetworkFilterOption::Other(enabled) => apply_content_type!(FROM_OTHER, enabled),
                    NetworkFilterOption::Ping(enabled) => apply_content_type!(FROM_PING, enabled),
                    NetworkFilterOption::Script(enabled) => {
                        apply_content_type!(FROM_SCRIPT, enabled)
                    }
                    NetworkFilterOption::Font(enabled) => apply_content_type!(FROM_FONT, enabled),
                    NetworkFilterOption::Stylesheet(enabled) => {
                        apply_content_type!(FROM_STYLESHEET, enabled)
                    }
                    NetworkFilterOption::Subdocument(enabled) => {
                        apply_content_type!(FROM_SUBDOCUMENT, enabled)
                    }
                    NetworkFilterOption::XmlHttpRequest(enabled) => {
                        apply_content_type!(FROM_XMLHTTPREQUEST, enabled)
                    }
                    NetworkFilterOption::Websocket(enabled) => {
                        apply_content_type!(FROM_WEBSOCKET, enabled)
                    }
                }
            }
        }

        // If no positive types were set, then the filter should apply to all types. Explicitly
        // negated types are removed afterwards either way.
        if cpt_mask_positive.is_empty() {
            mask |= NetworkFilterMask::FROM_NETWORK_TYPES | NetworkFilterMask::FROM_ANY;
        } else {
            mask |= cpt_mask_positive;
        }
        mask &= !cpt_mask_negative;

        // Some rules have duplicate domain options
        opt_domains.sort_unstable();
        opt_domains.dedup();
        opt_not_domains.sort_unstable();
        opt_not_domains.dedup();

        if parsed.pattern.right_anchor.is_some() {
            mask.set(NetworkFilterMask::IS_RIGHT_ANCHOR, true);
        }

        let pattern = parsed.pattern.pattern;
        let (mut filter_index_start, mut filter_index_end) = (0, pattern.len());
        let mut hostname: &str = "";

        match parsed.pattern.left_anchor {
            Some(NetworkFilterLeftAnchor::DoublePipe) => {
                mask.set(NetworkFilterMask::IS_HOSTNAME_ANCHOR, true);
                // The hostname runs until the first character that cannot be part of one
                let hostname_end = pattern
                    .bytes()
                    .position(|c| !is_allowed_hostname(c))
                    .unwrap_or(pattern.len());
                hostname = &pattern[..hostname_end];
                filter_index_start = hostname_end;
            }
            Some(NetworkFilterLeftAnchor::SinglePipe) => {
                mask.set(NetworkFilterMask::IS_LEFT_ANCHOR, true)
            }
            None => (),
        }

        // Remove trailing '*'. A wildcard right before the end anchor means any end will do.
        if filter_index_end > filter_index_start && pattern.ends_with('*') {
            while filter_index_end > filter_index_start
                && pattern.as_bytes()[filter_index_end - 1] == b'*'
            {
                filter_index_end -= 1;
            }
            mask.set(NetworkFilterMask::IS_RIGHT_ANCHOR, false);
        }

        // Remove leading '*' if the filter is not hostname anchored and what follows is plain.
        // Otherwise the wildcard is kept and handled by the regex.
        if filter_index_end > filter_index_start
            && !mask.contains(NetworkFilterMask::IS_HOSTNAME_ANCHOR)
            && pattern[filter_index_start..].starts_with('*')
            && !check_is_regex(&pattern[filter_index_start + 1..filter_index_end])
        {
            mask.set(NetworkFilterMask::IS_LEFT_ANCHOR, false);
            filter_index_start += 1;
        }

        let filter_str = &pattern[filter_index_start..filter_index_end];
        mask.set(NetworkFilterMask::IS_REGEX, check_is_regex(filter_str));

        let filter = if mask.contains(NetworkFilterMask::MATCH_CASE) {
            String::from(filter_str)
        } else {
            filter_str.to_ascii_lowercase()
        };

        let hostname = normalize_hostname(hostname)?;

        Ok(NetworkFilter::new(
            mask,
            filter,
            hostname,
            opt_domains,
            opt_not_domains,
            redirect,
            if debug { Some(line) } else { None },
        ))
    }

    /// Given a hostname, produces an equivalent filter to a `||hostname` rule, to emulate the
    /// behavior of hosts-style blocking.
    pub fn parse_hosts_style(hostname: &str, debug: bool) -> Result<Self, NetworkFilterError> {
        // Make sure the hostname doesn't contain any invalid characters
        static INVALID_CHARS: Lazy<Regex> =
            Lazy::new(|| Regex::new("[/^*!?$&(){}\\[\\]+=~`\\s|@,'\"><:;#]").unwrap());
        if hostname.is_empty() || INVALID_CHARS.is_match(hostname) {
            return Err(NetworkFilterError::FilterParseError);
        }

        // This shouldn't be used to block an entire TLD, and the hostname shouldn't end with a dot
        if find_char(b'.', hostname.as_bytes()).is_none()
            || (hostname.starts_with('.') && find_char(b'.', hostname[1..].as_bytes()).is_none())
            || hostname.ends_with('.')
        {
            return Err(NetworkFilterError::FilterParseError);
        }

        let hostname = normalize_hostname(hostname.trim_start_matches('.'))?;

        let mask = NetworkFilterMask::DEFAULT_OPTIONS
            | NetworkFilterMask::FROM_NETWORK_TYPES
            | NetworkFilterMask::FROM_ANY
            | NetworkFilterMask::IS_HOSTNAME_ANCHOR
            | NetworkFilterMask::IS_HOSTNAME;

        let raw_line = if debug { Some(hostname.clone()) } else { None };
        Ok(NetworkFilter::new(
            mask,
            String::new(),
            hostname,
            vec![],
            vec![],
            String::new(),
            raw_line.as_deref(),
        ))
    }

    fn new(
        mask: NetworkFilterMask,
        filter: String,
        hostname: String,
        opt_domains: Vec<String>,
        opt_not_domains: Vec<String>,
        redirect: String,
        raw_line: Option<&str>,
    ) -> NetworkFilter {
        let id = compute_filter_id(
            mask,
            &filter,
            &hostname,
            &opt_domains,
            &opt_not_domains,
            &redirect,
        );
        NetworkFilter {
            shape: PatternShape::from_mask(mask),
            mask,
            filter,
            hostname,
            opt_domains,
            opt_not_domains,
            redirect,
            raw_line: raw_line.map(|line| Box::new(String::from(line))),
            id,
            regex: OnceCell::new(),
        }
    }

    pub fn get_id(&self) -> Hash {
        self.id
    }

    pub fn get_tokens(&self) -> Vec<Hash> {
        let mut tokens: Vec<Hash> = Vec::with_capacity(TOKENS_BUFFER_SIZE);

        // If there is only one domain and no domain negation, we also use this
        // domain as a token.
        if self.opt_domains.len() == 1 && self.opt_not_domains.is_empty() {
            tokens.push(utils::fast_hash(&self.opt_domains[0]));
        }

        utils::tokenize_pooled(&self.filter, &mut tokens);
        utils::tokenize_pooled(&self.hostname, &mut tokens);

        tokens.shrink_to_fit();
        tokens
    }

    /// The regex for this filter, compiled on first use and cached on the filter.
    pub fn get_regex(&self) -> &CompiledRegex {
        self.regex.get_or_init(|| {
            compile_regex(
                &self.filter,
                // The pattern of a hostname anchored filter has to follow the hostname directly
                self.is_left_anchor() || self.is_hostname_anchor(),
                self.is_right_anchor(),
            )
        })
    }

    pub fn mask(&self) -> NetworkFilterMask {
        self.mask
    }

    pub fn shape(&self) -> PatternShape {
        self.shape
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn opt_domains(&self) -> &[String] {
        &self.opt_domains
    }

    pub fn opt_not_domains(&self) -> &[String] {
        &self.opt_not_domains
    }

    pub fn has_opt_domains(&self) -> bool {
        !self.opt_domains.is_empty()
    }

    pub fn has_opt_not_domains(&self) -> bool {
        !self.opt_not_domains.is_empty()
    }

    pub fn redirect(&self) -> &str {
        &self.redirect
    }

    pub fn raw_line(&self) -> Option<&str> {
        self.raw_line.as_deref().map(String::as_str)
    }

    pub fn is_exception(&self) -> bool {
        self.mask.contains(NetworkFilterMask::IS_EXCEPTION)
    }

    pub fn is_hostname_anchor(&self) -> bool {
        self.mask.contains(NetworkFilterMask::IS_HOSTNAME_ANCHOR)
    }

    pub fn is_right_anchor(&self) -> bool {
        self.mask.contains(NetworkFilterMask::IS_RIGHT_ANCHOR)
    }

    pub fn is_left_anchor(&self) -> bool {
        self.mask.contains(NetworkFilterMask::IS_LEFT_ANCHOR)
    }

    pub fn is_hostname(&self) -> bool {
        self.mask.contains(NetworkFilterMask::IS_HOSTNAME)
    }

    pub fn match_case(&self) -> bool {
        self.mask.contains(NetworkFilterMask::MATCH_CASE)
    }

    pub fn is_important(&self) -> bool {
        self.mask.contains(NetworkFilterMask::IS_IMPORTANT)
    }

    pub fn is_redirect(&self) -> bool {
        self.mask.contains(NetworkFilterMask::IS_REDIRECT)
    }

    pub fn is_regex(&self) -> bool {
        self.mask.contains(NetworkFilterMask::IS_REGEX)
    }

    pub fn is_plain(&self) -> bool {
        !self.is_regex()
    }

    pub fn third_party(&self) -> bool {
        self.mask.contains(NetworkFilterMask::THIRD_PARTY)
    }

    pub fn first_party(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FIRST_PARTY)
    }

    pub fn from_any(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_ANY)
    }

    pub fn from_image(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_IMAGE)
    }

    pub fn from_media(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_MEDIA)
    }

    pub fn from_object(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_OBJECT)
    }

    pub fn from_object_subrequest(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_OBJECT_SUBREQUEST)
    }

    pub fn from_other(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_OTHER)
    }

    pub fn from_ping(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_PING)
    }

    pub fn from_script(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_SCRIPT)
    }

    pub fn from_font(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_FONT)
    }

    pub fn from_stylesheet(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_STYLESHEET)
    }

    pub fn from_subdocument(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_SUBDOCUMENT)
    }

    pub fn from_websocket(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_WEBSOCKET)
    }

    pub fn from_xml_http_request(&self) -> bool {
        self.mask.contains(NetworkFilterMask::FROM_XMLHTTPREQUEST)
    }

    pub(crate) fn check_cpt_allowed(&self, cpt: request::RequestType) -> bool {
        self.mask.contains(NetworkFilterMask::from(cpt))
    }
}

impl Filter for NetworkFilter {
    fn get_id(&self) -> Hash {
        self.id
    }

    fn get_tokens(&self) -> Vec<Hash> {
        NetworkFilter::get_tokens(self)
    }

    fn raw_line(&self) -> Option<&str> {
        NetworkFilter::raw_line(self)
    }
}

impl fmt::Display for NetworkFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        if let Some(raw_line) = self.raw_line() {
            return write!(f, "{}", raw_line);
        }
        if self.is_exception() {
            write!(f, "@@")?;
        }
        if self.is_hostname_anchor() {
            write!(f, "||{}", self.hostname)?;
        } else if self.is_left_anchor() {
            write!(f, "|")?;
        }
        write!(f, "{}", self.filter)?;
        if self.is_right_anchor() {
            write!(f, "|")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filter parsing helpers
// ---------------------------------------------------------------------------

/// Characters allowed in the hostname following a `||` anchor. Bytes of non-ASCII characters are
/// accepted so internationalized hostnames stay in one piece.
#[inline]
fn is_allowed_hostname(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'.' || ch == b'-' || ch == b'_' || !ch.is_ascii()
}

fn compute_filter_id(
    mask: NetworkFilterMask,
    filter: &str,
    hostname: &str,
    opt_domains: &[String],
    opt_not_domains: &[String],
    redirect: &str,
) -> Hash {
    let mut hash: Hash = (5408 * 33) ^ mask.bits;

    for c in redirect.chars() {
        hash = hash.wrapping_mul(33) ^ (c as Hash);
    }

    for d in opt_domains {
        hash = hash.wrapping_mul(33) ^ utils::fast_hash(d);
    }

    // Keep included and excluded domains from cancelling each other out
    hash = hash.wrapping_mul(33) ^ Hash::from(b'~');

    for d in opt_not_domains {
        hash = hash.wrapping_mul(33) ^ utils::fast_hash(d);
    }

    for c in filter.chars() {
        hash = hash.wrapping_mul(33) ^ (c as Hash);
    }

    hash = hash.wrapping_mul(33) ^ Hash::from(b'|');

    for c in hostname.chars() {
        hash = hash.wrapping_mul(33) ^ (c as Hash);
    }

    hash
}

/// Character class a `^` separator stands for. The end of the URL also counts as a separator.
const SEPARATOR_REGEX: &str = "(?:[,+|#/$?&;!*()]|$)";

/// Translates filter pattern syntax to regex syntax: regex metacharacters are escaped, `*`
/// becomes `.*` and `^` becomes the separator class.
pub fn pattern_to_regex(pattern: &str) -> String {
    // Escape special regex characters: |.$+?{}()[]\
    static SPECIAL_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"([\|\.\$\+\?\{\}\(\)\[\]\\])").unwrap());
    // * can match anything
    static WILDCARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*").unwrap());
    // ^ can match any separator or the end of the pattern
    static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^").unwrap());

    let repl = SPECIAL_RE.replace_all(pattern, "\\$1");
    let repl = WILDCARD_RE.replace_all(&repl, NoExpand(".*"));
    let repl = ANCHOR_RE.replace_all(&repl, NoExpand(SEPARATOR_REGEX));
    repl.into_owned()
}

/// Compiles a filter pattern to a regex. This is only performed *lazily* for
/// filters containing at least a * or ^ symbol.
pub(crate) fn compile_regex(pattern: &str, is_left_anchor: bool, is_right_anchor: bool) -> CompiledRegex {
    if pattern.is_empty() && !is_right_anchor {
        return CompiledRegex::MatchAll;
    }

    // Should match start or end of url
    let left_anchor = if is_left_anchor { "^" } else { "" };
    let right_anchor = if is_right_anchor { "$" } else { "" };
    let source = format!("{}{}{}", left_anchor, pattern_to_regex(pattern), right_anchor);

    match BytesRegexBuilder::new(&source).unicode(false).build() {
        Ok(compiled) => CompiledRegex::Compiled(compiled),
        Err(e) => {
            log::warn!("Could not compile regex `{}` for filter pattern `{}`: {}", source, pattern, e);
            CompiledRegex::RegexParsingError(e)
        }
    }
}

/// Check if the sub-string contained between the indices start and end is a
/// regex filter (it contains a '*' or '^' char).
fn check_is_regex(filter: &str) -> bool {
    find_char(b'*', filter.as_bytes()).is_some() || find_char(b'^', filter.as_bytes()).is_some()
}

#[cfg(test)]
#[path = "../../tests/unit/filters/network.rs"]
mod unit_tests;
