//! Typed profile model
//!
//! Built by [`crate::compiler`] from the generic tree, or by hand through the
//! `with_*` helpers, and rendered back to text by [`crate::pretty_printer`].
//! All mappings preserve insertion order; equality ignores that order.

use crate::values::{parse_bool, split_comma_list, split_space_list};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `set` values of one block, by name.
pub type Params = IndexMap<String, String>;

/// Repeatable blocks by variant name.
pub type Variants<T> = IndexMap<String, T>;

/// `header`/`parameter` pairs in source order. Names may repeat.
pub type Pairs = Vec<(String, String)>;

/// Variant key used when a repeatable block carries no name.
pub const DEFAULT_VARIANT: &str = "default";

/// Resolve the key a (possibly unnamed) variant is stored under.
pub fn variant_key(name: Option<&str>) -> String {
    name.unwrap_or(DEFAULT_VARIANT).to_string()
}

// ============================================================================
// BLOCK KINDS
// ============================================================================

/// The fixed set of top-level block keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    HttpsCertificate,
    CodeSigner,
    HttpConfig,
    DnsBeacon,
    HttpGet,
    HttpPost,
    HttpStager,
    Stage,
    ProcessInject,
    PostEx,
}

impl BlockKind {
    /// All kinds, in the order the printer emits them.
    pub const ALL: [BlockKind; 10] = [
        BlockKind::HttpsCertificate,
        BlockKind::CodeSigner,
        BlockKind::HttpConfig,
        BlockKind::DnsBeacon,
        BlockKind::HttpGet,
        BlockKind::HttpPost,
        BlockKind::HttpStager,
        BlockKind::Stage,
        BlockKind::ProcessInject,
        BlockKind::PostEx,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            BlockKind::HttpsCertificate => "https-certificate",
            BlockKind::CodeSigner => "code-signer",
            BlockKind::HttpConfig => "http-config",
            BlockKind::DnsBeacon => "dns-beacon",
            BlockKind::HttpGet => "http-get",
            BlockKind::HttpPost => "http-post",
            BlockKind::HttpStager => "http-stager",
            BlockKind::Stage => "stage",
            BlockKind::ProcessInject => "process-inject",
            BlockKind::PostEx => "post-ex",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.keyword() == keyword)
    }

    /// Whether the kind is stored per variant name.
    pub fn is_variant(self) -> bool {
        matches!(
            self,
            BlockKind::DnsBeacon | BlockKind::HttpGet | BlockKind::HttpPost | BlockKind::HttpStager
        )
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One typed top-level block, ready to be stored in a [`Profile`].
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    HttpsCertificate(Params),
    CodeSigner(Params),
    HttpConfig(HttpConfig),
    DnsBeacon { name: String, params: Params },
    HttpGet { name: String, block: HttpGet },
    HttpPost { name: String, block: HttpPost },
    HttpStager { name: String, block: HttpStager },
    Stage(Stage),
    ProcessInject(ProcessInject),
    PostEx(Params),
    /// Vendor keyword enabled through [`crate::ParseOptions`].
    Extension { keyword: String, params: Params },
}

// ============================================================================
// SHARED RECORDS
// ============================================================================

/// A bare verb call such as `print;`, `append ".php";` or
/// `strrep "ReflectiveLoader" "";`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MultiParam {
    pub verb: String,
    pub values: Vec<String>,
}

impl MultiParam {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            values: Vec::new(),
        }
    }

    pub fn with_arg(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }
}

/// `server { header ...; output { ... } }`, shared by all HTTP blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpServer {
    pub headers: Pairs,
    pub output: Vec<MultiParam>,
}

impl HttpServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_output(mut self, step: MultiParam) -> Self {
        self.output.push(step);
        self
    }
}

// ============================================================================
// HTTP CONFIG
// ============================================================================

/// `http-config` block: settings plus default response headers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    pub params: Params,
    pub headers: Pairs,
}

impl HttpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `set headers "Server, Content-Type";`
    pub fn headers_order(&self) -> Vec<String> {
        list_param(&self.params, "headers", split_comma_list)
    }

    /// `set block_useragents "curl*,lynx*,wget*";`
    pub fn block_useragents(&self) -> Vec<String> {
        list_param(&self.params, "block_useragents", split_comma_list)
    }

    pub fn trust_x_forwarded_for(&self) -> Option<bool> {
        bool_param(&self.params, "trust_x_forwarded_for")
    }
}

// ============================================================================
// HTTP GET / POST / STAGER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpGetClient {
    pub headers: Pairs,
    pub uri_params: Pairs,
    pub metadata: Vec<MultiParam>,
}

impl HttpGetClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_uri_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.uri_params.push((name.into(), value.into()));
        self
    }

    pub fn with_metadata(mut self, step: MultiParam) -> Self {
        self.metadata.push(step);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpGet {
    pub params: Params,
    pub client: HttpGetClient,
    pub server: HttpServer,
}

impl HttpGet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_client(mut self, client: HttpGetClient) -> Self {
        self.client = client;
        self
    }

    pub fn with_server(mut self, server: HttpServer) -> Self {
        self.server = server;
        self
    }

    /// `set uri "/a /b";` split on whitespace.
    pub fn uris(&self) -> Vec<String> {
        list_param(&self.params, "uri", split_space_list)
    }

    pub fn verb(&self) -> Option<&str> {
        self.params.get("verb").map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpPostClient {
    pub headers: Pairs,
    pub uri_params: Pairs,
    pub output: Vec<MultiParam>,
    pub id: Vec<MultiParam>,
}

impl HttpPostClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_uri_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.uri_params.push((name.into(), value.into()));
        self
    }

    pub fn with_output(mut self, step: MultiParam) -> Self {
        self.output.push(step);
        self
    }

    pub fn with_id(mut self, step: MultiParam) -> Self {
        self.id.push(step);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpPost {
    pub params: Params,
    pub client: HttpPostClient,
    pub server: HttpServer,
}

impl HttpPost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_client(mut self, client: HttpPostClient) -> Self {
        self.client = client;
        self
    }

    pub fn with_server(mut self, server: HttpServer) -> Self {
        self.server = server;
        self
    }

    pub fn uris(&self) -> Vec<String> {
        list_param(&self.params, "uri", split_space_list)
    }

    pub fn verb(&self) -> Option<&str> {
        self.params.get("verb").map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpStagerClient {
    pub headers: Pairs,
    pub uri_params: Pairs,
}

impl HttpStagerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_uri_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.uri_params.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpStager {
    pub params: Params,
    pub client: HttpStagerClient,
    pub server: HttpServer,
}

impl HttpStager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_client(mut self, client: HttpStagerClient) -> Self {
        self.client = client;
        self
    }

    pub fn with_server(mut self, server: HttpServer) -> Self {
        self.server = server;
        self
    }

    pub fn uris_x86(&self) -> Vec<String> {
        list_param(&self.params, "uri_x86", split_space_list)
    }

    pub fn uris_x64(&self) -> Vec<String> {
        list_param(&self.params, "uri_x64", split_space_list)
    }
}

// ============================================================================
// STAGE / PROCESS INJECT
// ============================================================================

/// `stage` block. `string`, `stringw` and `data` lines keep their order
/// within each list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stage {
    pub params: Params,
    pub string: Vec<String>,
    pub stringw: Vec<String>,
    pub data: Vec<String>,
    pub transform_x86: Vec<MultiParam>,
    pub transform_x64: Vec<MultiParam>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_string(mut self, value: impl Into<String>) -> Self {
        self.string.push(value.into());
        self
    }

    pub fn with_stringw(mut self, value: impl Into<String>) -> Self {
        self.stringw.push(value.into());
        self
    }

    pub fn with_data(mut self, value: impl Into<String>) -> Self {
        self.data.push(value.into());
        self
    }

    pub fn with_transform_x86(mut self, step: MultiParam) -> Self {
        self.transform_x86.push(step);
        self
    }

    pub fn with_transform_x64(mut self, step: MultiParam) -> Self {
        self.transform_x64.push(step);
        self
    }

    pub fn userwx(&self) -> Option<bool> {
        bool_param(&self.params, "userwx")
    }

    pub fn cleanup(&self) -> Option<bool> {
        bool_param(&self.params, "cleanup")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessInject {
    pub params: Params,
    pub transform_x86: Vec<MultiParam>,
    pub transform_x64: Vec<MultiParam>,
    pub execute: Vec<MultiParam>,
}

impl ProcessInject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_transform_x86(mut self, step: MultiParam) -> Self {
        self.transform_x86.push(step);
        self
    }

    pub fn with_transform_x64(mut self, step: MultiParam) -> Self {
        self.transform_x64.push(step);
        self
    }

    pub fn with_execute(mut self, step: MultiParam) -> Self {
        self.execute.push(step);
        self
    }

    pub fn min_alloc(&self) -> Option<u64> {
        self.params.get("min_alloc").and_then(|v| v.trim().parse().ok())
    }
}

// ============================================================================
// PROFILE
// ============================================================================

/// A whole profile document.
///
/// Singleton blocks are `None` until they appear; variant collections are
/// empty until a block of that kind appears.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub globals: Params,
    pub https_certificate: Option<Params>,
    pub code_signer: Option<Params>,
    pub http_config: Option<HttpConfig>,
    pub dns_beacon: Variants<Params>,
    pub http_get: Variants<HttpGet>,
    pub http_post: Variants<HttpPost>,
    pub http_stager: Variants<HttpStager>,
    pub stage: Option<Stage>,
    pub process_inject: Option<ProcessInject>,
    pub post_ex: Option<Params>,
    /// Vendor parameter blocks by keyword.
    pub extensions: IndexMap<String, Params>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a typed block. Returns `true` when it replaced an earlier block
    /// with the same kind and name.
    pub fn insert_block(&mut self, block: Block) -> bool {
        match block {
            Block::HttpsCertificate(params) => self.https_certificate.replace(params).is_some(),
            Block::CodeSigner(params) => self.code_signer.replace(params).is_some(),
            Block::HttpConfig(config) => self.http_config.replace(config).is_some(),
            Block::DnsBeacon { name, params } => self.dns_beacon.insert(name, params).is_some(),
            Block::HttpGet { name, block } => self.http_get.insert(name, block).is_some(),
            Block::HttpPost { name, block } => self.http_post.insert(name, block).is_some(),
            Block::HttpStager { name, block } => self.http_stager.insert(name, block).is_some(),
            Block::Stage(stage) => self.stage.replace(stage).is_some(),
            Block::ProcessInject(inject) => self.process_inject.replace(inject).is_some(),
            Block::PostEx(params) => self.post_ex.replace(params).is_some(),
            Block::Extension { keyword, params } => {
                self.extensions.insert(keyword, params).is_some()
            }
        }
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    pub fn with_https_certificate(mut self, params: Params) -> Self {
        self.https_certificate = Some(params);
        self
    }

    pub fn with_code_signer(mut self, params: Params) -> Self {
        self.code_signer = Some(params);
        self
    }

    pub fn with_http_config(mut self, config: HttpConfig) -> Self {
        self.http_config = Some(config);
        self
    }

    pub fn with_dns_beacon(mut self, name: impl Into<String>, params: Params) -> Self {
        self.dns_beacon.insert(name.into(), params);
        self
    }

    pub fn with_http_get(mut self, name: impl Into<String>, block: HttpGet) -> Self {
        self.http_get.insert(name.into(), block);
        self
    }

    pub fn with_http_post(mut self, name: impl Into<String>, block: HttpPost) -> Self {
        self.http_post.insert(name.into(), block);
        self
    }

    pub fn with_http_stager(mut self, name: impl Into<String>, block: HttpStager) -> Self {
        self.http_stager.insert(name.into(), block);
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_process_inject(mut self, inject: ProcessInject) -> Self {
        self.process_inject = Some(inject);
        self
    }

    pub fn with_post_ex(mut self, params: Params) -> Self {
        self.post_ex = Some(params);
        self
    }

    pub fn with_extension(mut self, keyword: impl Into<String>, params: Params) -> Self {
        self.extensions.insert(keyword.into(), params);
        self
    }

    /// Render the profile as canonical source text.
    pub fn to_text(&self) -> String {
        crate::pretty_printer::pretty_print(self)
    }

    /// Dump the model as pretty JSON, maps in insertion order.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    // ------------------------------------------------------------------------
    // Global setting accessors
    // ------------------------------------------------------------------------

    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals.get(name).map(String::as_str)
    }

    pub fn sample_name(&self) -> Option<&str> {
        self.global("sample_name")
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.global("useragent")
    }

    /// `sleeptime` in milliseconds.
    pub fn sleep_time(&self) -> Option<u64> {
        self.global("sleeptime").and_then(|v| v.trim().parse().ok())
    }

    /// `jitter` as a percentage.
    pub fn jitter(&self) -> Option<u32> {
        self.global("jitter").and_then(|v| v.trim().parse().ok())
    }

    pub fn host_stage(&self) -> Option<bool> {
        bool_param(&self.globals, "host_stage")
    }

    pub fn headers_remove(&self) -> Vec<String> {
        list_param(&self.globals, "headers_remove", split_comma_list)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn bool_param(params: &Params, name: &str) -> Option<bool> {
    params.get(name).and_then(|v| parse_bool(v))
}

fn list_param(params: &Params, name: &str, split: fn(&str) -> Vec<String>) -> Vec<String> {
    params.get(name).map(|v| split(v)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kind_keywords_round_trip() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_keyword(kind.keyword()), Some(kind));
        }
        assert_eq!(BlockKind::from_keyword("client"), None);
        assert!(BlockKind::HttpGet.is_variant());
        assert!(!BlockKind::Stage.is_variant());
    }

    #[test]
    fn test_variant_key() {
        assert_eq!(variant_key(None), "default");
        assert_eq!(variant_key(Some("foo")), "foo");
    }

    #[test]
    fn test_insert_block_overwrites_same_name() {
        let mut profile = Profile::new();
        let first = HttpGet::new().with_param("uri", "/first");
        let second = HttpGet::new().with_param("uri", "/second");
        assert!(!profile.insert_block(Block::HttpGet {
            name: "default".to_string(),
            block: first,
        }));
        assert!(profile.insert_block(Block::HttpGet {
            name: "default".to_string(),
            block: second.clone(),
        }));
        assert_eq!(profile.http_get.len(), 1);
        assert_eq!(profile.http_get["default"], second);
    }

    #[test]
    fn test_equality_ignores_map_order() {
        let a = Profile::new().with_global("a", "1").with_global("b", "2");
        let b = Profile::new().with_global("b", "2").with_global("a", "1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_global_accessors() {
        let profile = Profile::new()
            .with_global("sleeptime", "37500")
            .with_global("jitter", "33")
            .with_global("host_stage", "false")
            .with_global("headers_remove", "Strict-Transport-Security, X-Frame-Options")
            .with_global("useragent", "Mozilla/5.0");
        assert_eq!(profile.sleep_time(), Some(37500));
        assert_eq!(profile.jitter(), Some(33));
        assert_eq!(profile.host_stage(), Some(false));
        assert_eq!(profile.user_agent(), Some("Mozilla/5.0"));
        assert_eq!(
            profile.headers_remove(),
            vec!["Strict-Transport-Security", "X-Frame-Options"]
        );
        assert_eq!(profile.sample_name(), None);
    }

    #[test]
    fn test_block_accessors() {
        let get = HttpGet::new()
            .with_param("uri", "/login /config /admin")
            .with_param("verb", "GET");
        assert_eq!(get.uris(), vec!["/login", "/config", "/admin"]);
        assert_eq!(get.verb(), Some("GET"));

        let config = HttpConfig::new()
            .with_param("block_useragents", "curl*,lynx*,wget*")
            .with_param("trust_x_forwarded_for", "false");
        assert_eq!(config.block_useragents(), vec!["curl*", "lynx*", "wget*"]);
        assert_eq!(config.trust_x_forwarded_for(), Some(false));
        assert!(config.headers_order().is_empty());

        let inject = ProcessInject::new().with_param("min_alloc", "16700");
        assert_eq!(inject.min_alloc(), Some(16700));
    }

    #[test]
    fn test_json_dump_keeps_order() -> Result<(), serde_json::Error> {
        let profile = Profile::new()
            .with_global("zeta", "1")
            .with_global("alpha", "2")
            .with_http_get("v1", HttpGet::new());
        let json = profile.to_json()?;
        let zeta = json.find("\"zeta\"").unwrap_or(usize::MAX);
        let alpha = json.find("\"alpha\"").unwrap_or(usize::MAX);
        assert!(zeta < alpha);

        let back: Profile = serde_json::from_str(&json)?;
        assert_eq!(back, profile);
        Ok(())
    }

    #[test]
    fn test_multi_param_builder() {
        let step = MultiParam::new("strrep").with_arg("beacon.dll").with_arg("");
        assert_eq!(step.verb, "strrep");
        assert_eq!(step.values, vec!["beacon.dll".to_string(), String::new()]);
    }
}
