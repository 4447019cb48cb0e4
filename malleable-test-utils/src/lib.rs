//! Malleable Test Utilities
//!
//! Shared test infrastructure for the profile workspace:
//! - Proptest generators for the typed profile model
//! - Text and model fixtures for common scenarios
//! - Custom assertions for parse results

// Re-export the model for convenience
pub use malleable_dsl::{
    parse, parse_with_options, BlockKind, HttpConfig, HttpGet, HttpGetClient, HttpPost,
    HttpPostClient, HttpServer, HttpStager, HttpStagerClient, MultiParam, Pairs, Params,
    ParseError, ParseOptions, ProcessInject, Profile, SemanticError, Stage, Variants,
    DEFAULT_VARIANT,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating profile model values.
    //!
    //! Every generated [`Profile`] is printable, and printing it yields text
    //! that parses back to an equal model.

    use super::*;
    use proptest::prelude::*;

    // === Leaf Generators ===

    /// Generate a bare identifier usable as a setting name or verb.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_-]{0,12}".prop_map(|s| s.to_string())
    }

    /// Generate an arbitrary string value, including quotes, backslashes
    /// and control characters.
    pub fn arb_value() -> impl Strategy<Value = String> {
        prop::collection::vec(any::<char>(), 0..24).prop_map(|chars| chars.into_iter().collect())
    }

    /// Generate a variant name, biased towards the `"default"` key.
    pub fn arb_variant_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(DEFAULT_VARIANT.to_string()),
            arb_identifier(),
            arb_value(),
        ]
    }

    /// Generate a vendor keyword that cannot collide with a built-in block.
    pub fn arb_extension_keyword() -> impl Strategy<Value = String> {
        "x-[a-z]{1,8}".prop_map(|s| s.to_string())
    }

    // === Collection Generators ===

    pub fn arb_params() -> impl Strategy<Value = Params> {
        prop::collection::vec((arb_identifier(), arb_value()), 0..4)
            .prop_map(|entries| entries.into_iter().collect())
    }

    pub fn arb_pairs() -> impl Strategy<Value = Pairs> {
        prop::collection::vec((arb_value(), arb_value()), 0..3)
    }

    pub fn arb_multi_param() -> impl Strategy<Value = MultiParam> {
        (arb_identifier(), prop::collection::vec(arb_value(), 0..3))
            .prop_map(|(verb, values)| MultiParam { verb, values })
    }

    pub fn arb_verbs() -> impl Strategy<Value = Vec<MultiParam>> {
        prop::collection::vec(arb_multi_param(), 0..4)
    }

    pub fn arb_strings() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(arb_value(), 0..3)
    }

    /// Generate a keyed variant collection.
    pub fn arb_variants<T, S>(block: S) -> impl Strategy<Value = Variants<T>>
    where
        T: std::fmt::Debug,
        S: Strategy<Value = T>,
    {
        prop::collection::vec((arb_variant_name(), block), 0..3)
            .prop_map(|entries| entries.into_iter().collect())
    }

    // === Block Generators ===

    pub fn arb_http_config() -> impl Strategy<Value = HttpConfig> {
        (arb_params(), arb_pairs()).prop_map(|(params, headers)| HttpConfig { params, headers })
    }

    pub fn arb_http_server() -> impl Strategy<Value = HttpServer> {
        (arb_pairs(), arb_verbs()).prop_map(|(headers, output)| HttpServer { headers, output })
    }

    pub fn arb_http_get() -> impl Strategy<Value = HttpGet> {
        (
            arb_params(),
            arb_pairs(),
            arb_pairs(),
            arb_verbs(),
            arb_http_server(),
        )
            .prop_map(|(params, headers, uri_params, metadata, server)| HttpGet {
                params,
                client: HttpGetClient {
                    headers,
                    uri_params,
                    metadata,
                },
                server,
            })
    }

    pub fn arb_http_post() -> impl Strategy<Value = HttpPost> {
        (
            arb_params(),
            arb_pairs(),
            arb_pairs(),
            arb_verbs(),
            arb_verbs(),
            arb_http_server(),
        )
            .prop_map(|(params, headers, uri_params, output, id, server)| HttpPost {
                params,
                client: HttpPostClient {
                    headers,
                    uri_params,
                    output,
                    id,
                },
                server,
            })
    }

    pub fn arb_http_stager() -> impl Strategy<Value = HttpStager> {
        (arb_params(), arb_pairs(), arb_pairs(), arb_http_server()).prop_map(
            |(params, headers, uri_params, server)| HttpStager {
                params,
                client: HttpStagerClient {
                    headers,
                    uri_params,
                },
                server,
            },
        )
    }

    pub fn arb_stage() -> impl Strategy<Value = Stage> {
        (
            arb_params(),
            arb_strings(),
            arb_strings(),
            arb_strings(),
            arb_verbs(),
            arb_verbs(),
        )
            .prop_map(
                |(params, string, stringw, data, transform_x86, transform_x64)| Stage {
                    params,
                    string,
                    stringw,
                    data,
                    transform_x86,
                    transform_x64,
                },
            )
    }

    pub fn arb_process_inject() -> impl Strategy<Value = ProcessInject> {
        (arb_params(), arb_verbs(), arb_verbs(), arb_verbs()).prop_map(
            |(params, transform_x86, transform_x64, execute)| ProcessInject {
                params,
                transform_x86,
                transform_x64,
                execute,
            },
        )
    }

    // === Profile Generator ===

    /// Generate a whole profile, extension blocks included.
    ///
    /// Parse the printed text with [`super::fixtures::options_for`] so the
    /// extension keywords are accepted.
    pub fn arb_profile() -> impl Strategy<Value = Profile> {
        let head = (
            arb_params(),
            prop::option::of(arb_params()),
            prop::option::of(arb_params()),
            prop::option::of(arb_http_config()),
            arb_variants(arb_params()),
            arb_variants(arb_http_get()),
        );
        let tail = (
            arb_variants(arb_http_post()),
            arb_variants(arb_http_stager()),
            prop::option::of(arb_stage()),
            prop::option::of(arb_process_inject()),
            prop::option::of(arb_params()),
            prop::collection::vec((arb_extension_keyword(), arb_params()), 0..2),
        );

        (head, tail).prop_map(
            |(
                (globals, https_certificate, code_signer, http_config, dns_beacon, http_get),
                (http_post, http_stager, stage, process_inject, post_ex, extensions),
            )| Profile {
                globals,
                https_certificate,
                code_signer,
                http_config,
                dns_beacon,
                http_get,
                http_post,
                http_stager,
                stage,
                process_inject,
                post_ex,
                extensions: extensions.into_iter().collect(),
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built profiles and source texts for common testing scenarios.

    use super::*;

    /// A complete clean-template profile touching every block kind.
    pub const TEMPLATE_PROFILE: &str =
        include_str!("../../malleable-dsl/tests/fixtures/template.profile");

    /// Small profile with one default `http-get` block.
    pub const MINIMAL_HTTP_GET: &str = r#"
set sample_name "t.profile";
http-get {
    set uri "/a /b";
    client { header "Host" "x.com"; parameter "k" "v"; metadata { base64url; } }
    server { output { print; } }
}
"#;

    /// The model [`MINIMAL_HTTP_GET`] parses to.
    pub fn minimal_http_get() -> Profile {
        Profile::new()
            .with_global("sample_name", "t.profile")
            .with_http_get(
                DEFAULT_VARIANT,
                HttpGet::new()
                    .with_param("uri", "/a /b")
                    .with_client(
                        HttpGetClient::new()
                            .with_header("Host", "x.com")
                            .with_uri_param("k", "v")
                            .with_metadata(MultiParam::new("base64url")),
                    )
                    .with_server(HttpServer::new().with_output(MultiParam::new("print"))),
            )
    }

    /// A hand-built profile with one instance of every block kind.
    pub fn every_block() -> Profile {
        let params = |pairs: &[(&str, &str)]| -> Params {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        Profile::new()
            .with_global("sleeptime", "60000")
            .with_global("jitter", "20")
            .with_https_certificate(params(&[("CN", "example.com"), ("validity", "365")]))
            .with_code_signer(params(&[("alias", "server")]))
            .with_http_config(
                HttpConfig::new()
                    .with_param("block_useragents", "curl*,wget*")
                    .with_header("Server", "nginx"),
            )
            .with_dns_beacon("dns", params(&[("maxdns", "255")]))
            .with_http_get(
                DEFAULT_VARIANT,
                HttpGet::new().with_param("uri", "/get").with_client(
                    HttpGetClient::new().with_metadata(MultiParam::new("netbios")),
                ),
            )
            .with_http_post(
                "upload",
                HttpPost::new().with_param("uri", "/post").with_client(
                    HttpPostClient::new()
                        .with_output(MultiParam::new("print"))
                        .with_id(MultiParam::new("parameter").with_arg("id")),
                ),
            )
            .with_http_stager(
                DEFAULT_VARIANT,
                HttpStager::new()
                    .with_param("uri_x86", "/stage86")
                    .with_server(HttpServer::new().with_header("Content-Type", "text/plain")),
            )
            .with_stage(
                Stage::new()
                    .with_param("userwx", "false")
                    .with_string("marker")
                    .with_transform_x86(MultiParam::new("prepend").with_arg("\u{90}\u{90}")),
            )
            .with_process_inject(
                ProcessInject::new()
                    .with_param("min_alloc", "16384")
                    .with_execute(MultiParam::new("NtQueueApcThread-s")),
            )
            .with_post_ex(params(&[("amsi_disable", "true")]))
    }

    /// Options accepting every extension keyword used by `profile`.
    pub fn options_for(profile: &Profile) -> ParseOptions {
        profile
            .extensions
            .keys()
            .fold(ParseOptions::new(), |options, keyword| {
                options.with_extension_block(keyword.as_str())
            })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for parse results.

    use super::*;

    /// Assert that source text parses, returning the profile.
    #[track_caller]
    pub fn assert_parses(source: &str) -> Profile {
        match parse(source) {
            Ok(profile) => profile,
            Err(err) => panic!("Expected profile to parse, got: {}", err),
        }
    }

    /// Assert that printing `profile` and parsing the text yields an equal
    /// profile.
    #[track_caller]
    pub fn assert_round_trip(profile: &Profile) {
        let text = profile.to_text();
        match parse_with_options(&text, &fixtures::options_for(profile)) {
            Ok(reparsed) => assert_eq!(
                &reparsed, profile,
                "Round-trip changed the profile.\nPrinted:\n{}",
                text
            ),
            Err(err) => panic!("Printed profile failed to parse: {}\nPrinted:\n{}", err, text),
        }
    }

    /// Assert that a parse result is a lex error.
    #[track_caller]
    pub fn assert_lex_error<T: std::fmt::Debug>(result: &Result<T, ParseError>) {
        match result {
            Err(ParseError::Lex { .. }) => {}
            other => panic!("Expected Lex error, got: {:?}", other),
        }
    }

    /// Assert that a parse result is a syntax error.
    #[track_caller]
    pub fn assert_syntax_error<T: std::fmt::Debug>(result: &Result<T, ParseError>) {
        match result {
            Err(ParseError::Syntax { .. }) => {}
            other => panic!("Expected Syntax error, got: {:?}", other),
        }
    }

    /// Assert that a parse result rejects the given top-level or nested
    /// block keyword.
    #[track_caller]
    pub fn assert_unknown_block<T: std::fmt::Debug>(result: &Result<T, ParseError>, keyword: &str) {
        match result {
            Err(ParseError::Semantic(SemanticError::UnknownBlock { block, .. })) => {
                assert_eq!(block, keyword, "Wrong block in UnknownBlock error");
            }
            other => panic!("Expected UnknownBlock({}), got: {:?}", keyword, other),
        }
    }

    /// Assert that a parse result is an unknown-entry error.
    #[track_caller]
    pub fn assert_unknown_entry<T: std::fmt::Debug>(result: &Result<T, ParseError>) {
        match result {
            Err(ParseError::Semantic(SemanticError::UnknownEntry { .. })) => {}
            other => panic!("Expected UnknownEntry error, got: {:?}", other),
        }
    }

    /// Assert that a parse result is an arity error for `verb`.
    #[track_caller]
    pub fn assert_bad_params<T: std::fmt::Debug>(
        result: &Result<T, ParseError>,
        verb: &str,
        found: usize,
    ) {
        match result {
            Err(ParseError::Semantic(SemanticError::BadParams { verb: v, found: f, .. })) => {
                assert_eq!(v, verb, "Wrong verb in BadParams error");
                assert_eq!(*f, found, "Wrong argument count in BadParams error");
            }
            other => panic!("Expected BadParams({}, {}), got: {:?}", verb, found, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_minimal_fixture_matches_source() {
        let profile = assertions::assert_parses(fixtures::MINIMAL_HTTP_GET);
        assert_eq!(profile, fixtures::minimal_http_get());
    }

    #[test]
    fn test_every_block_fixture_round_trips() {
        let profile = fixtures::every_block();
        for kind in BlockKind::ALL {
            assert!(
                profile.to_text().contains(kind.keyword()),
                "missing {} block",
                kind
            );
        }
        assertions::assert_round_trip(&profile);
    }

    #[test]
    fn test_options_for_extensions() {
        let profile = Profile::new().with_extension("x-vendor", Params::new());
        let options = fixtures::options_for(&profile);
        assert!(options.is_extension_block("x-vendor"));
    }

    #[test]
    fn test_error_assertions() {
        assertions::assert_lex_error(&parse("set a \"b\"; $"));
        assertions::assert_syntax_error(&parse("http-get {"));
        assertions::assert_unknown_block(&parse("bogus-block { }"), "bogus-block");
        assertions::assert_unknown_entry(&parse("post-ex { print; }"));
        assertions::assert_bad_params(&parse("http-config { header \"a\"; }"), "header", 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_variant_names_are_keys(names in prop::collection::vec(generators::arb_variant_name(), 1..4)) {
            let profile = names.iter().fold(Profile::new(), |profile, name| {
                profile.with_dns_beacon(name.as_str(), Params::new())
            });
            for name in &names {
                prop_assert!(profile.dns_beacon.contains_key(name));
            }
        }

        #[test]
        fn prop_generated_extension_keywords_are_not_builtin(keyword in generators::arb_extension_keyword()) {
            prop_assert!(BlockKind::from_keyword(&keyword).is_none());
        }
    }
}
