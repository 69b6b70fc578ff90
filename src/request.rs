//! Contains structures needed to describe network requests.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::url_parser::{self, ResolvesDomain};

/// The type of resource requested from the URL endpoint.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum RequestType {
    Font,
    Image,
    Media,
    Object,
    ObjectSubrequest,
    Other,
    Ping,
    Script,
    Stylesheet,
    Subdocument,
    Websocket,
    Xmlhttprequest,
}

impl RequestType {
    /// Maps a WebRequest / filter-option style resource type name. Unknown names fall back to
    /// [`RequestType::Other`].
    pub fn from_str_name(cpt: &str) -> RequestType {
        match cpt {
            "beacon" | "ping" => RequestType::Ping,
            "font" => RequestType::Font,
            "image" | "imageset" => RequestType::Image,
            "media" => RequestType::Media,
            "object" => RequestType::Object,
            "object_subrequest" | "object-subrequest" => RequestType::ObjectSubrequest,
            "script" => RequestType::Script,
            "stylesheet" => RequestType::Stylesheet,
            "sub_frame" | "subdocument" => RequestType::Subdocument,
            "websocket" => RequestType::Websocket,
            "xhr" | "xmlhttprequest" => RequestType::Xmlhttprequest,
            _ => RequestType::Other,
        }
    }

    /// Maps the numeric `nsIContentPolicy` content type codes.
    pub fn from_cpt_code(cpt: u32) -> RequestType {
        match cpt {
            2 => RequestType::Script,
            3 | 21 => RequestType::Image,
            4 => RequestType::Stylesheet,
            5 => RequestType::Object,
            7 => RequestType::Subdocument,
            10 | 19 => RequestType::Ping,
            11 => RequestType::Xmlhttprequest,
            12 => RequestType::ObjectSubrequest,
            14 => RequestType::Font,
            15 => RequestType::Media,
            16 => RequestType::Websocket,
            _ => RequestType::Other,
        }
    }
}

/// Possible failure reasons when creating a [`Request`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("hostname parsing failed")]
    HostnameParseError,
}

/// A network request as seen by the matching engine. Built once per request by the embedder and
/// never modified afterwards.
#[derive(Clone, Debug)]
pub struct Request {
    request_type: RequestType,
    url: String,
    url_lower_cased: String,
    hostname: String,
    source_hostname: String,
    source_gd: String,
    host_gd: String,
}

impl Request {
    /// Construct a new [`Request`] from fully resolved parts. `source_gd` and `host_gd` are the
    /// general (registrable) domains of `source_hostname` and `hostname`.
    pub fn new(
        url: &str,
        hostname: &str,
        source_hostname: &str,
        source_gd: &str,
        host_gd: &str,
        request_type: RequestType,
    ) -> Request {
        Request {
            request_type,
            url: url.to_owned(),
            url_lower_cased: url.to_ascii_lowercase(),
            hostname: hostname.to_ascii_lowercase(),
            source_hostname: source_hostname.to_ascii_lowercase(),
            source_gd: source_gd.to_ascii_lowercase(),
            host_gd: host_gd.to_ascii_lowercase(),
        }
    }

    /// If you already have the hostnames of the request and of its source, the general domains
    /// can be derived with a [`ResolvesDomain`]. Hostnames the resolver cannot handle are used as
    /// their own general domain.
    pub fn preparsed<R: ResolvesDomain + ?Sized>(
        url: &str,
        hostname: &str,
        source_hostname: &str,
        request_type: RequestType,
        resolver: &R,
    ) -> Request {
        let hostname = hostname.to_ascii_lowercase();
        let source_hostname = source_hostname.to_ascii_lowercase();
        let host_gd = resolver
            .get_general_domain(&hostname)
            .unwrap_or(hostname.as_str())
            .to_owned();
        let source_gd = resolver
            .get_general_domain(&source_hostname)
            .unwrap_or(source_hostname.as_str())
            .to_owned();

        Request::new(
            url,
            &hostname,
            &source_hostname,
            &source_gd,
            &host_gd,
            request_type,
        )
    }

    /// Extracts both hostnames from the given URLs. An empty or host-less `source_url` yields a
    /// request without source, which is always third-party.
    pub fn from_urls<R: ResolvesDomain + ?Sized>(
        url: &str,
        source_url: &str,
        request_type: &str,
        resolver: &R,
    ) -> Result<Request, RequestError> {
        let hostname = url_parser::get_url_host(url).ok_or(RequestError::HostnameParseError)?;
        let source_hostname = url_parser::get_url_host(source_url).unwrap_or_default();

        Ok(Request::preparsed(
            url,
            hostname,
            source_hostname,
            RequestType::from_str_name(request_type),
            resolver,
        ))
    }

    pub(crate) fn get_url(&self, case_sensitive: bool) -> Cow<'_, str> {
        if case_sensitive {
            Cow::Borrowed(&self.url)
        } else {
            Cow::Borrowed(&self.url_lower_cased)
        }
    }

    pub(crate) fn url_lower_cased(&self) -> &str {
        &self.url_lower_cased
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn source_hostname(&self) -> &str {
        &self.source_hostname
    }

    pub fn source_gd(&self) -> &str {
        &self.source_gd
    }

    pub fn host_gd(&self) -> &str {
        &self.host_gd
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn is_third_party(&self) -> bool {
        self.source_gd != self.host_gd
    }
}

#[cfg(test)]
#[path = "../tests/unit/request.rs"]
mod unit_tests;
