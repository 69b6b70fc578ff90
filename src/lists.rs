//! Parsing functions and collections for handling with multiple filter rules.

use itertools::{Either, Itertools};
use memchr::memchr as find_char;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filters::cosmetic::{CosmeticFilter, CosmeticFilterError};
use crate::filters::network::{NetworkFilter, NetworkFilterError};

/// Specifies the syntax of the filters a list is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterFormat {
    /// Rules in Adblock Plus syntax, with uBlock Origin and AdGuard extensions. Lines of a
    /// `/etc/hosts` file in the middle of such a list are understood as well.
    Standard,
    /// `/etc/hosts`-style lines: an optional address column followed by a hostname. Every
    /// hostname becomes a filter blocking it and its subdomains.
    Hosts,
}

impl Default for FilterFormat {
    fn default() -> Self {
        Self::Standard
    }
}

/// Describes the kinds of rules a list should be loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleTypes {
    All,
    NetworkOnly,
    CosmeticOnly,
}

impl Default for RuleTypes {
    fn default() -> Self {
        Self::All
    }
}

impl RuleTypes {
    fn loads_network_rules(&self) -> bool {
        matches!(self, Self::All | Self::NetworkOnly)
    }

    fn loads_cosmetic_rules(&self) -> bool {
        matches!(self, Self::All | Self::CosmeticOnly)
    }
}

/// Options for tweaking how a filter or list of filters is interpreted when parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Assume filters are in the given format when parsing.
    pub format: FilterFormat,
    /// Specifies the kinds of rules that should be parsed.
    pub rule_types: RuleTypes,
}

/// Metadata read from the header comments of a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterListMetadata {
    /// `! Title: ...`
    pub title: Option<String>,
    /// `! Homepage: ...`
    pub homepage: Option<String>,
}

impl FilterListMetadata {
    fn try_add(&mut self, line: &str) {
        if let Some(comment) = line.strip_prefix('!') {
            if let Some((key, value)) = comment.split_once(':') {
                let value = value.trim();
                match key.trim() {
                    "Title" if self.title.is_none() => self.title = Some(value.to_string()),
                    "Homepage" if self.homepage.is_none() => {
                        self.homepage = Some(value.to_string())
                    }
                    _ => (),
                }
            }
        }
    }
}

/// Successful result of parsing a single filter rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedFilter {
    Network(NetworkFilter),
    Cosmetic(CosmeticFilter),
}

impl From<NetworkFilter> for ParsedFilter {
    fn from(v: NetworkFilter) -> Self {
        ParsedFilter::Network(v)
    }
}

impl From<CosmeticFilter> for ParsedFilter {
    fn from(v: CosmeticFilter) -> Self {
        ParsedFilter::Cosmetic(v)
    }
}

/// Unsuccessful result of parsing a single filter rule.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FilterParseError {
    #[error("network filter error: {0}")]
    Network(#[from] NetworkFilterError),
    #[error("cosmetic filter error: {0}")]
    Cosmetic(#[from] CosmeticFilterError),
    #[error("unsupported")]
    Unsupported,
    #[error("empty")]
    Empty,
}

#[derive(Debug, PartialEq)]
pub(crate) enum FilterType {
    Network,
    Cosmetic,
    Hosts,
    NotSupported,
}

/// Parse a single filter rule. Comments, empty lines and syntax this crate does not support
/// result in an `Err` as well.
pub fn parse_filter(
    line: &str,
    debug: bool,
    opts: ParseOptions,
) -> Result<ParsedFilter, FilterParseError> {
    let filter = line.trim();

    if filter.is_empty() {
        return Err(FilterParseError::Empty);
    }

    match opts.format {
        FilterFormat::Standard => match detect_filter_type(filter) {
            FilterType::Network if opts.rule_types.loads_network_rules() => {
                NetworkFilter::parse(filter, debug)
                    .map(|f| f.into())
                    .map_err(|e| e.into())
            }
            FilterType::Hosts if opts.rule_types.loads_network_rules() => {
                parse_hosts_line(filter, debug).map(|f| f.into())
            }
            FilterType::Cosmetic if opts.rule_types.loads_cosmetic_rules() => {
                CosmeticFilter::parse(filter, debug)
                    .map(|f| f.into())
                    .map_err(|e| e.into())
            }
            _ => Err(FilterParseError::Unsupported),
        },
        FilterFormat::Hosts => {
            if !opts.rule_types.loads_network_rules() {
                return Err(FilterParseError::Unsupported);
            }
            parse_hosts_line(filter, debug).map(|f| f.into())
        }
    }
}

/// Parse an entire list of filters, ignoring any errors. Filters come out in list order.
pub fn parse_filters(
    list: impl IntoIterator<Item = impl AsRef<str>>,
    debug: bool,
    opts: ParseOptions,
) -> (Vec<NetworkFilter>, Vec<CosmeticFilter>) {
    list.into_iter()
        .map(|line| parse_filter(line.as_ref(), debug, opts))
        .filter_map(Result::ok)
        .partition_map(|filter| match filter {
            ParsedFilter::Network(f) => Either::Left(f),
            ParsedFilter::Cosmetic(f) => Either::Right(f),
        })
}

/// Splits the text of a list into lines and parses them with the default options.
pub fn parse_list(list: &str, debug: bool) -> (Vec<NetworkFilter>, Vec<CosmeticFilter>) {
    parse_filters(list.lines(), debug, ParseOptions::default())
}

/// Manages a set of rules to be added to a single collection, across any number of lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSet {
    debug: bool,
    network_filters: Vec<NetworkFilter>,
    cosmetic_filters: Vec<CosmeticFilter>,
}

impl FilterSet {
    /// Creates a new `FilterSet`. `debug` specifies whether or not to save information about the
    /// original raw filter rules alongside the more compact internal representation.
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..FilterSet::default()
        }
    }

    /// Adds the contents of an entire filter list to this `FilterSet`. Filters that cannot be
    /// parsed are skipped.
    pub fn add_filter_list(&mut self, filter_list: &str, opts: ParseOptions) -> FilterListMetadata {
        let mut metadata = FilterListMetadata::default();
        let (network_before, cosmetic_before) =
            (self.network_filters.len(), self.cosmetic_filters.len());
        let mut invalid = 0;

        for line in filter_list.lines() {
            let line = line.trim();
            if line.starts_with('!') {
                metadata.try_add(line);
            }
            match self.add_filter(line, opts) {
                Ok(()) | Err(FilterParseError::Empty) | Err(FilterParseError::Unsupported) => (),
                Err(_) => invalid += 1,
            }
        }

        log::debug!(
            "Loaded filter list {}: {} network filters, {} cosmetic filters, {} invalid lines",
            metadata.title.as_deref().unwrap_or("(untitled)"),
            self.network_filters.len() - network_before,
            self.cosmetic_filters.len() - cosmetic_before,
            invalid,
        );

        metadata
    }

    /// Adds a collection of filter rules to this `FilterSet`. Filters that cannot be parsed
    /// successfully are ignored. Returns any invalid filter rules.
    pub fn add_filters(
        &mut self,
        filters: impl IntoIterator<Item = impl AsRef<str>>,
        opts: ParseOptions,
    ) -> Vec<String> {
        let mut invalid = vec![];
        for line in filters {
            let line = line.as_ref();
            match self.add_filter(line, opts) {
                Ok(()) | Err(FilterParseError::Empty) | Err(FilterParseError::Unsupported) => (),
                Err(_) => invalid.push(line.to_string()),
            }
        }
        invalid
    }

    /// Adds the string representation of a single filter rule to this `FilterSet`.
    pub fn add_filter(&mut self, filter: &str, opts: ParseOptions) -> Result<(), FilterParseError> {
        match parse_filter(filter, self.debug, opts)? {
            ParsedFilter::Network(filter) => self.network_filters.push(filter),
            ParsedFilter::Cosmetic(filter) => self.cosmetic_filters.push(filter),
        }
        Ok(())
    }

    pub fn network_filters(&self) -> &[NetworkFilter] {
        &self.network_filters
    }

    pub fn cosmetic_filters(&self) -> &[CosmeticFilter] {
        &self.cosmetic_filters
    }

    /// Consumes this `FilterSet`, returning both collections in the order they were added.
    pub fn into_content(self) -> (Vec<NetworkFilter>, Vec<CosmeticFilter>) {
        (self.network_filters, self.cosmetic_filters)
    }
}

/// Addresses that commonly precede hostnames in a hosts file.
const HOSTS_ADDRESSES: [&str; 4] = ["127.0.0.1", "0.0.0.0", "::1", "::"];

/// Parses one line of a hosts file, e.g. `0.0.0.0 ads.example.com # comment`, into a filter
/// blocking the hostname.
fn parse_hosts_line(line: &str, debug: bool) -> Result<NetworkFilter, FilterParseError> {
    if line.starts_with('!') {
        return Err(FilterParseError::Unsupported);
    }
    // Drop trailing comments
    let line = match find_char(b'#', line.as_bytes()) {
        Some(index) => line[..index].trim_end(),
        None => line,
    };

    let mut columns = line.split_whitespace();
    let hostname = match (columns.next(), columns.next()) {
        (Some(address), Some(hostname)) if address.parse::<std::net::IpAddr>().is_ok() => hostname,
        (Some(hostname), None) => hostname,
        _ => return Err(FilterParseError::Unsupported),
    };

    Ok(NetworkFilter::parse_hosts_style(hostname, debug)?)
}

fn is_hosts_line(filter: &str) -> bool {
    HOSTS_ADDRESSES.iter().any(|address| {
        filter
            .strip_prefix(address)
            .map_or(false, |rest| rest.starts_with(char::is_whitespace))
    })
}

/// Given a single line, checks if this would likely be a cosmetic filter, a network filter or
/// something that is not supported. This check is performed before calling a more specific
/// parser to create an instance of `NetworkFilter` or `CosmeticFilter`.
pub(crate) fn detect_filter_type(filter: &str) -> FilterType {
    // Ignore comments
    if filter.len() == 1
        || filter.starts_with('!')
        || (filter.starts_with('#') && !filter.starts_with("##") && !filter.starts_with("#@#"))
        || filter.starts_with("[Adblock")
        // List headers like `[uBlock Origin]`
        || (filter.starts_with('[') && filter.ends_with(']'))
    {
        return FilterType::NotSupported;
    }

    if is_hosts_line(filter) {
        return FilterType::Hosts;
    }

    if filter.starts_with('|') || filter.starts_with("@@|") {
        return FilterType::Network;
    }

    // Check if filter is cosmetics
    let bytes = filter.as_bytes();
    let mut sharp_search = 0;
    while let Some(sharp_index) = find_char(b'#', &bytes[sharp_search..]).map(|i| i + sharp_search)
    {
        let after_sharp = &filter[sharp_index + 1..];

        // Ignore Adguard cosmetics
        // `#$#` `#@$#`
        // `#%#` `#@%#`
        // `#?#` `#@?#`
        if after_sharp.starts_with(/* #@$# */ "@$#")
            || after_sharp.starts_with(/* #@%# */ "@%#")
            || after_sharp.starts_with(/* #@?# */ "@?#")
            || after_sharp.starts_with(/* #%# */ "%#")
            || after_sharp.starts_with(/* #$# */ "$#")
            || after_sharp.starts_with(/* #?# */ "?#")
        {
            return FilterType::NotSupported;
        } else if after_sharp.starts_with(/* ## */ '#') || after_sharp.starts_with(/* #@# */ "@#")
        {
            // A `$` before the separator means this is the option part of a network filter
            if find_char(b'$', &bytes[..sharp_index]).is_none() {
                return FilterType::Cosmetic;
            }
            break;
        }
        sharp_search = sharp_index + 1;
    }

    // Ignore Adguard html filtering rules
    // `$$`
    if filter.contains("$$") {
        return FilterType::NotSupported;
    }

    // Everything else is a network filter
    FilterType::Network
}

#[cfg(test)]
#[path = "../tests/unit/lists.rs"]
mod tests;
