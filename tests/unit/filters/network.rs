#[cfg(test)]
mod parse_tests {
    use super::super::*;

    #[derive(Debug, PartialEq)]
    struct NetworkFilterBreakdown {
        filter: String,
        hostname: String,
        opt_domains: Vec<String>,
        opt_not_domains: Vec<String>,
        redirect: String,
        shape: PatternShape,

        // filter type
        is_exception: bool,
        is_hostname_anchor: bool,
        is_right_anchor: bool,
        is_left_anchor: bool,
        is_regex: bool,
        is_plain: bool,
        is_important: bool,
        is_redirect: bool,
        is_hostname: bool,

        // Options
        first_party: bool,
        third_party: bool,
        match_case: bool,
        from_any: bool,
        from_font: bool,
        from_image: bool,
        from_media: bool,
        from_object: bool,
        from_object_subrequest: bool,
        from_other: bool,
        from_ping: bool,
        from_script: bool,
        from_stylesheet: bool,
        from_subdocument: bool,
        from_websocket: bool,
        from_xml_http_request: bool,
    }

    impl From<&NetworkFilter> for NetworkFilterBreakdown {
        fn from(filter: &NetworkFilter) -> NetworkFilterBreakdown {
            NetworkFilterBreakdown {
                filter: filter.filter().to_string(),
                hostname: filter.hostname().to_string(),
                opt_domains: filter.opt_domains().to_vec(),
                opt_not_domains: filter.opt_not_domains().to_vec(),
                redirect: filter.redirect().to_string(),
                shape: filter.shape(),

                // filter type
                is_exception: filter.is_exception(),
                is_hostname_anchor: filter.is_hostname_anchor(),
                is_right_anchor: filter.is_right_anchor(),
                is_left_anchor: filter.is_left_anchor(),
                is_regex: filter.is_regex(),
                is_plain: filter.is_plain(),
                is_important: filter.is_important(),
                is_redirect: filter.is_redirect(),
                is_hostname: filter.is_hostname(),

                // Options
                first_party: filter.first_party(),
                third_party: filter.third_party(),
                match_case: filter.match_case(),
                from_any: filter.from_any(),
                from_font: filter.from_font(),
                from_image: filter.from_image(),
                from_media: filter.from_media(),
                from_object: filter.from_object(),
                from_object_subrequest: filter.from_object_subrequest(),
                from_other: filter.from_other(),
                from_ping: filter.from_ping(),
                from_script: filter.from_script(),
                from_stylesheet: filter.from_stylesheet(),
                from_subdocument: filter.from_subdocument(),
                from_websocket: filter.from_websocket(),
                from_xml_http_request: filter.from_xml_http_request(),
            }
        }
    }

    fn default_network_filter_breakdown() -> NetworkFilterBreakdown {
        NetworkFilterBreakdown {
            filter: String::new(),
            hostname: String::new(),
            opt_domains: vec![],
            opt_not_domains: vec![],
            redirect: String::new(),
            shape: PatternShape::Plain,

            // filter type
            is_exception: false,
            is_hostname_anchor: false,
            is_right_anchor: false,
            is_left_anchor: false,
            is_regex: false,
            is_plain: true,
            is_important: false,
            is_redirect: false,
            is_hostname: false,

            // Options
            first_party: true,
            third_party: true,
            match_case: false,
            from_any: true,
            from_font: true,
            from_image: true,
            from_media: true,
            from_object: true,
            from_object_subrequest: true,
            from_other: true,
            from_ping: true,
            from_script: true,
            from_stylesheet: true,
            from_subdocument: true,
            from_websocket: true,
            from_xml_http_request: true,
        }
    }

    fn no_content_types(breakdown: &mut NetworkFilterBreakdown) {
        breakdown.from_any = false;
        breakdown.from_font = false;
        breakdown.from_image = false;
        breakdown.from_media = false;
        breakdown.from_object = false;
        breakdown.from_object_subrequest = false;
        breakdown.from_other = false;
        breakdown.from_ping = false;
        breakdown.from_script = false;
        breakdown.from_stylesheet = false;
        breakdown.from_subdocument = false;
        breakdown.from_websocket = false;
        breakdown.from_xml_http_request = false;
    }

    fn breakdown(line: &str) -> NetworkFilterBreakdown {
        NetworkFilterBreakdown::from(&NetworkFilter::parse(line, true).unwrap())
    }

    #[test]
    // pattern
    fn parses_plain_pattern() {
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            assert_eq!(defaults, breakdown("ads"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("/ads/foo-");
            assert_eq!(defaults, breakdown("/ads/foo-"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("/ads/foo-");
            defaults.is_important = true;
            assert_eq!(defaults, breakdown("/ads/foo-$important"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("foo.com/ads");
            defaults.is_exception = true;
            assert_eq!(defaults, breakdown("@@foo.com/ads"));
        }
    }

    #[test]
    // |pattern, pattern| and |pattern|
    fn parses_anchored_pattern() {
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("https://foo.com/ads");
            defaults.is_left_anchor = true;
            defaults.shape = PatternShape::LeftAnchor;
            assert_eq!(defaults, breakdown("|https://foo.com/ads"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("/ads.js");
            defaults.is_right_anchor = true;
            defaults.shape = PatternShape::RightAnchor;
            assert_eq!(defaults, breakdown("/ads.js|"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("https://foo.com/");
            defaults.is_left_anchor = true;
            defaults.is_right_anchor = true;
            defaults.shape = PatternShape::LeftRightAnchor;
            assert_eq!(defaults, breakdown("|https://foo.com/|"));
        }
    }

    #[test]
    // ||pattern
    fn parses_hostname_anchored_pattern() {
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.hostname = String::from("foo.com");
            defaults.filter = String::from("/bar");
            defaults.is_hostname_anchor = true;
            defaults.shape = PatternShape::HostnameAnchored;
            assert_eq!(defaults, breakdown("||foo.com/bar"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.hostname = String::from("foo.com");
            defaults.filter = String::from("/bar");
            defaults.is_hostname_anchor = true;
            defaults.is_right_anchor = true;
            defaults.shape = PatternShape::HostnameRightAnchor;
            assert_eq!(defaults, breakdown("||foo.com/bar|"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.hostname = String::from("foo.com");
            defaults.filter = String::from("^bar/*baz");
            defaults.is_hostname_anchor = true;
            defaults.is_right_anchor = true;
            defaults.is_regex = true;
            defaults.is_plain = false;
            defaults.is_important = true;
            defaults.shape = PatternShape::HostnameRegex;
            assert_eq!(defaults, breakdown("||foo.com^bar/*baz|$important"));
        }
        {
            // The leading wildcard is kept after a hostname
            let mut defaults = default_network_filter_breakdown();
            defaults.hostname = String::from("foo.com");
            defaults.filter = String::from("*bar^");
            defaults.is_hostname_anchor = true;
            defaults.is_regex = true;
            defaults.is_plain = false;
            defaults.shape = PatternShape::HostnameRegex;
            assert_eq!(defaults, breakdown("||foo.com*bar^"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.hostname = String::from("foo.com");
            defaults.is_hostname_anchor = true;
            defaults.shape = PatternShape::HostnameAnchored;
            assert_eq!(defaults, breakdown("||FOO.com*"));
        }
    }

    #[test]
    fn parses_wildcards() {
        {
            // Trailing wildcards are dropped, along with the right anchor
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("foo.com^bar/*baz");
            defaults.is_left_anchor = true;
            defaults.is_regex = true;
            defaults.is_plain = false;
            defaults.shape = PatternShape::Regex;
            assert_eq!(defaults, breakdown("|foo.com^bar/*baz*"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            assert_eq!(defaults, breakdown("ads*|"));
        }
        {
            // A leading wildcard is kept if the rest is a regex
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("*bar^");
            defaults.is_regex = true;
            defaults.is_plain = false;
            defaults.shape = PatternShape::Regex;
            assert_eq!(defaults, breakdown("*bar^"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads/banner");
            assert_eq!(defaults, breakdown("*ads/banner"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads/banner");
            assert_eq!(defaults, breakdown("|*ads/banner"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("/ads/*/banner");
            defaults.is_regex = true;
            defaults.is_plain = false;
            defaults.shape = PatternShape::Regex;
            assert_eq!(defaults, breakdown("/ads/*/banner"));
        }
    }

    #[test]
    fn parses_party_options() {
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            defaults.first_party = false;
            assert_eq!(defaults, breakdown("ads$third-party"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            defaults.third_party = false;
            assert_eq!(defaults, breakdown("ads$~third-party"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            defaults.first_party = false;
            assert_eq!(defaults, breakdown("ads$~first-party"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.third_party = false;
            assert_eq!(defaults, breakdown("$first-party,~third-party"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            defaults.first_party = false;
            assert_eq!(defaults, breakdown("ads$3p"));
        }
    }

    #[test]
    fn parses_content_type_options() {
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            no_content_types(&mut defaults);
            defaults.from_image = true;
            defaults.is_exception = true;
            assert_eq!(defaults, breakdown("@@ads$image"));
        }
        {
            // Negations alone keep every other type
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            defaults.from_image = false;
            assert_eq!(defaults, breakdown("ads$~image"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            no_content_types(&mut defaults);
            defaults.from_script = true;
            assert_eq!(defaults, breakdown("ads$script,~image"));
        }
        {
            // Negation wins over an explicit positive
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            no_content_types(&mut defaults);
            defaults.from_font = true;
            assert_eq!(defaults, breakdown("ads$script,font,~script"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            no_content_types(&mut defaults);
            defaults.from_xml_http_request = true;
            defaults.from_stylesheet = true;
            defaults.from_subdocument = true;
            defaults.from_ping = true;
            assert_eq!(defaults, breakdown("ads$xhr,css,frame,beacon"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            no_content_types(&mut defaults);
            defaults.from_media = true;
            defaults.from_object = true;
            defaults.from_object_subrequest = true;
            defaults.from_other = true;
            defaults.from_websocket = true;
            assert_eq!(
                defaults,
                breakdown("ads$media,object,object-subrequest,other,websocket")
            );
        }
    }

    #[test]
    fn parses_domain_options() {
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            defaults.opt_domains = vec![String::from("baz.com"), String::from("foo.com")];
            defaults.opt_not_domains = vec![String::from("bar.com")];
            assert_eq!(
                defaults,
                breakdown("ads$domain=foo.com|~bar.com|baz.com,domain=FOO.com")
            );
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            defaults.opt_domains = vec![String::from("xn--e1afmkfd.xn--p1ai")];
            assert_eq!(defaults, breakdown("ads$domain=пример.рф"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("ads");
            defaults.opt_not_domains = vec![String::from("foo.com")];
            assert_eq!(defaults, breakdown("ads$domain=~foo.com||"));
        }
    }

    #[test]
    fn parses_redirect_and_match_case() {
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.redirect = String::from("bar.js");
            defaults.is_redirect = true;
            assert_eq!(defaults, breakdown("$redirect=bar.js"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("/Ads/Banner");
            defaults.match_case = true;
            assert_eq!(defaults, breakdown("/Ads/Banner$match-case"));
        }
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.filter = String::from("/ads/banner");
            assert_eq!(defaults, breakdown("/Ads/Banner"));
        }
    }

    #[test]
    fn parses_punycode_hostname() {
        let mut defaults = default_network_filter_breakdown();
        defaults.hostname = String::from("xn--e1afmkfd.xn--p1ai");
        defaults.filter = String::from("^");
        defaults.is_hostname_anchor = true;
        defaults.is_regex = true;
        defaults.is_plain = false;
        defaults.shape = PatternShape::HostnameRegex;
        assert_eq!(defaults, breakdown("||пример.рф^"));
    }

    #[test]
    fn rejects_invalid_options() {
        assert_eq!(
            NetworkFilter::parse("ads$~redirect=foo.js", true).err(),
            Some(NetworkFilterError::NegatedRedirection)
        );
        assert_eq!(
            NetworkFilter::parse("ads$~redirect", true).err(),
            Some(NetworkFilterError::NegatedRedirection)
        );
        assert_eq!(
            NetworkFilter::parse("ads$~match-case", true).err(),
            Some(NetworkFilterError::NegatedOptionMatchCase)
        );
        assert_eq!(
            NetworkFilter::parse("ads$~important", true).err(),
            Some(NetworkFilterError::NegatedImportant)
        );
        assert_eq!(
            NetworkFilter::parse("ads$redirect=", true).err(),
            Some(NetworkFilterError::EmptyRedirection)
        );
        assert_eq!(
            NetworkFilter::parse("ads$domain=|", true).err(),
            Some(NetworkFilterError::NoSupportedDomains)
        );
        assert_eq!(
            NetworkFilter::parse("ads$~domain=foo.com", true).err(),
            Some(NetworkFilterError::NegatedDomain)
        );
        assert_eq!(
            NetworkFilter::parse("ads$foo", true).err(),
            Some(NetworkFilterError::UnrecognisedOption)
        );
        assert_eq!(
            NetworkFilter::parse("ads$", true).err(),
            Some(NetworkFilterError::UnrecognisedOption)
        );
        assert_eq!(
            NetworkFilter::parse("ads$script,", true).err(),
            Some(NetworkFilterError::UnrecognisedOption)
        );
    }

    #[test]
    fn parses_hosts_style() {
        {
            let mut defaults = default_network_filter_breakdown();
            defaults.hostname = String::from("ads.example.com");
            defaults.is_hostname_anchor = true;
            defaults.is_hostname = true;
            defaults.shape = PatternShape::HostnameAnchored;
            let filter = NetworkFilter::parse_hosts_style("Ads.Example.com", true).unwrap();
            assert_eq!(defaults, NetworkFilterBreakdown::from(&filter));
        }
        {
            let filter = NetworkFilter::parse_hosts_style(".example.com", false).unwrap();
            assert_eq!(filter.hostname(), "example.com");
            assert_eq!(filter.raw_line(), None);
        }
        assert!(NetworkFilter::parse_hosts_style("com", true).is_err());
        assert!(NetworkFilter::parse_hosts_style(".com", true).is_err());
        assert!(NetworkFilter::parse_hosts_style("example.com.", true).is_err());
        assert!(NetworkFilter::parse_hosts_style("example.com/ads", true).is_err());
        assert!(NetworkFilter::parse_hosts_style("", true).is_err());
    }

    #[test]
    fn keeps_raw_line_in_debug_mode() {
        let filter = NetworkFilter::parse("||foo.com^$script", true).unwrap();
        assert_eq!(filter.raw_line(), Some("||foo.com^$script"));
        assert_eq!(filter.to_string(), "||foo.com^$script");

        let filter = NetworkFilter::parse("@@||Foo.com^bar|$script", false).unwrap();
        assert_eq!(filter.raw_line(), None);
        assert_eq!(filter.to_string(), "@@||foo.com^bar|");
    }

    #[test]
    fn ids_depend_on_content() {
        let a = NetworkFilter::parse("||foo.com^$script", false).unwrap();
        let b = NetworkFilter::parse("||foo.com^$script", true).unwrap();
        let c = NetworkFilter::parse("||foo.com^$image", false).unwrap();
        let d = NetworkFilter::parse("ads$domain=foo.com", false).unwrap();
        let e = NetworkFilter::parse("ads$domain=~foo.com", false).unwrap();
        assert_eq!(a.get_id(), b.get_id());
        assert_ne!(a.get_id(), c.get_id());
        assert_ne!(d.get_id(), e.get_id());
    }

    #[test]
    fn get_tokens_works() {
        let filter = NetworkFilter::parse("||foo.com/bar$domain=x.com", false).unwrap();
        assert_eq!(
            filter.get_tokens(),
            vec![
                utils::fast_hash("x.com"),
                utils::fast_hash("bar"),
                utils::fast_hash("foo"),
                utils::fast_hash("com"),
            ]
        );

        let filter = NetworkFilter::parse("/ads/ban*ner$domain=x.com|y.com", false).unwrap();
        assert_eq!(
            filter.get_tokens(),
            vec![utils::fast_hash("ads"), utils::fast_hash("ner")]
        );
    }

    #[test]
    fn serialization_skips_compiled_regex() {
        let filter = NetworkFilter::parse("||foo.com^bar", false).unwrap();
        assert!(filter.get_regex().is_match("/bar"));

        let serialized = serde_json::to_string(&filter).unwrap();
        let deserialized: NetworkFilter = serde_json::from_str(&serialized).unwrap();
        assert_eq!(filter, deserialized);
        assert_eq!(deserialized.shape(), PatternShape::HostnameRegex);
        assert!(deserialized.get_regex().is_match("/bar"));
    }

    #[test]
    fn parsing_is_deterministic() {
        let lines = [
            "||foo.com^bar/*baz|$important",
            "ads$domain=foo.com|~bar.com|baz.com,script",
            "@@||foo.com/ads|",
            "/banner/*/img^",
            "|https://foo.com/*.js$~third-party",
            "||пример.рф/ads$third-party",
            "/ads.js$redirect=noop.js,image",
            "/Ads.js$match-case,domain=foo.*",
        ];
        for line in lines.iter() {
            for debug in [false, true].iter() {
                let first = NetworkFilter::parse(line, *debug);
                let second = NetworkFilter::parse(line, *debug);
                assert_eq!(first, second, "{}", line);
                if let (Ok(first), Ok(second)) = (first, second) {
                    assert_eq!(first.get_id(), second.get_id(), "{}", line);
                    assert_eq!(first.shape(), second.shape(), "{}", line);
                    assert_eq!(first.to_string(), second.to_string(), "{}", line);
                }
            }
        }
    }
}

#[cfg(test)]
mod compile_regex_tests {
    use super::super::*;

    #[test]
    fn translates_pattern_syntax() {
        assert_eq!(pattern_to_regex("foo.bar*baz"), r"foo\.bar.*baz");
        assert_eq!(pattern_to_regex("foo^"), r"foo(?:[,+|#/$?&;!*()]|$)");
        assert_eq!(
            pattern_to_regex("a|b$c+d?e{f}g(h)i[j]k\\"),
            r"a\|b\$c\+d\?e\{f\}g\(h\)i\[j\]k\\"
        );
    }

    #[test]
    fn compiles_with_anchors() {
        assert_eq!(compile_regex("foo*bar", false, false).to_string(), "foo.*bar");
        assert_eq!(compile_regex("foo*bar", true, false).to_string(), "^foo.*bar");
        assert_eq!(compile_regex("foo*bar", true, true).to_string(), "^foo.*bar$");
        assert_eq!(compile_regex("", false, false).to_string(), ".*");
    }

    #[test]
    fn separator_matches_end_of_url() {
        let regex = compile_regex("/ads^", false, false);
        assert!(regex.is_match("https://foo.com/ads"));
        assert!(regex.is_match("https://foo.com/ads?q=1"));
        assert!(regex.is_match("https://foo.com/ads/banner"));
        assert!(!regex.is_match("https://foo.com/adserver"));
    }

    #[test]
    fn regex_is_cached_on_filter() {
        let filter = NetworkFilter::parse("|https://*/ads^", false).unwrap();
        let first = filter.get_regex() as *const CompiledRegex;
        let second = filter.get_regex() as *const CompiledRegex;
        assert_eq!(first, second);
        assert_eq!(
            filter.get_regex().to_string(),
            r"^https://.*/ads(?:[,+|#/$?&;!*()]|$)"
        );
    }
}
