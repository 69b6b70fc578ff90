#![no_main]
#![allow(unused_must_use)] // workaround for "error: unused `Result` that must be used"

use adblock_parser::filters::network::NetworkFilter;
use adblock_parser::filters::network_matchers::match_network_filter;
use adblock_parser::request::Request;
use adblock_parser::url_parser::DefaultResolver;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(url) = std::str::from_utf8(data) {
        let filters: Vec<NetworkFilter> = ["||example.com^", "/ads/*^", "|https://", "swf|"]
            .iter()
            .filter_map(|f| NetworkFilter::parse(f, false).ok())
            .collect();
        for request in [
            Request::from_urls(&format!("https://{}", url), "https://example.com", "other", &DefaultResolver),
            Request::from_urls(url, "https://example.com", "script", &DefaultResolver),
            Request::from_urls(url, "", "", &DefaultResolver),
            Request::from_urls(url, url, url, &DefaultResolver),
        ]
        .iter()
        .flatten()
        {
            for filter in &filters {
                match_network_filter(filter, request);
            }
        }
    }
});
