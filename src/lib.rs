//! Parsing and matching of content-blocking filter rules written in Adblock Plus syntax, as
//! used by EasyList, EasyPrivacy and uBlock Origin lists.
//!
//! [`lists`] turns the text of a list into [`filters::network::NetworkFilter`]s and
//! [`filters::cosmetic::CosmeticFilter`]s. Network filters are matched against a
//! [`request::Request`] with [`filters::network_matchers::match_network_filter`]; cosmetic filters
//! against the hostname of a page with [`filters::cosmetic::match_cosmetic_filter`].

pub mod filters;
pub mod lists;
pub mod request;
pub mod url_parser;
#[doc(hidden)]
pub mod utils;
