//! Profile Compiler - Transform the generic tree into a typed Profile
//!
//! The parser knows nothing about block keywords. This module walks the
//! [`ProfileAst`], dispatches each top-level group on its keyword and checks
//! the shape of every block it recognizes.
//!
//! # Pipeline
//!
//! ```text
//! Source → Lexer → Parser → ProfileAst → ProfileCompiler → Profile → Printer
//!                                              ↓
//!                                      Validation (shape)
//! ```

use crate::config::ParseOptions;
use crate::error::{SemanticError, SemanticResult};
use crate::model::*;
use crate::parser::ast::*;
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Context name used in errors raised at the top level.
const TOP_LEVEL: &str = "profile";

/// A nested group keyword and the list its verb calls are collected into.
type Slot<'s> = (&'static str, &'s mut Vec<MultiParam>);

// ============================================================================
// PROFILE COMPILER
// ============================================================================

/// Transforms a parsed [`ProfileAst`] into a [`Profile`].
///
/// # Example
///
/// ```ignore
/// let ast = malleable_dsl::parse_tree(source, None)?;
/// let profile = ProfileCompiler::compile(&ast, &ParseOptions::default())?;
/// ```
pub struct ProfileCompiler<'a> {
    options: &'a ParseOptions,

    /// Profile being built
    profile: Profile,
}

/// Tracks the fixed sub-blocks already seen inside one parent.
#[derive(Debug, Default)]
struct SubBlocks {
    seen: HashSet<String>,
}

impl SubBlocks {
    fn register(&mut self, group: &Group, context: &str) -> SemanticResult<()> {
        if !self.seen.insert(group.kind.clone()) {
            return Err(SemanticError::DuplicateBlock {
                block: group.kind.clone(),
                context: context.to_string(),
                line: group.span.line,
                column: group.span.column,
            });
        }
        Ok(())
    }
}

impl<'a> ProfileCompiler<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            profile: Profile::new(),
        }
    }

    /// Compile a tree into a profile, stopping at the first shape error.
    pub fn compile(ast: &ProfileAst, options: &ParseOptions) -> SemanticResult<Profile> {
        let mut compiler = ProfileCompiler::new(options);

        for entry in &ast.entries {
            compiler.compile_entry(entry)?;
        }

        Ok(compiler.profile)
    }

    fn compile_entry(&mut self, entry: &Entry) -> SemanticResult<()> {
        match entry {
            Entry::Assignment(assignment) => {
                trace!(name = %assignment.name, "global setting");
                self.profile
                    .globals
                    .insert(assignment.name.clone(), assignment.value.clone());
            }
            Entry::FunctionCall(_) => return Err(unknown_entry(entry, TOP_LEVEL)),
            Entry::Group(group) => {
                let block = self.compile_block(group)?;
                if self.profile.insert_block(block) {
                    warn!(
                        block = %group.kind,
                        name = %variant_key(group.name.as_deref()),
                        line = group.span.line,
                        "block replaces an earlier one with the same name"
                    );
                }
            }
        }
        Ok(())
    }

    /// Dispatch one top-level group on its keyword.
    fn compile_block(&self, group: &Group) -> SemanticResult<Block> {
        let kind = match BlockKind::from_keyword(&group.kind) {
            Some(kind) => kind,
            None if self.options.is_extension_block(&group.kind) => {
                debug!(block = %group.kind, "dispatching extension block");
                Self::ignore_name(group);
                return Ok(Block::Extension {
                    keyword: group.kind.clone(),
                    params: Self::compile_params(group)?,
                });
            }
            None => return Err(unknown_block(group, TOP_LEVEL)),
        };

        let name = variant_key(group.name.as_deref());
        if kind.is_variant() {
            debug!(block = %kind, name = %name, "dispatching block");
        } else {
            debug!(block = %kind, "dispatching block");
            Self::ignore_name(group);
        }

        Ok(match kind {
            BlockKind::HttpsCertificate => Block::HttpsCertificate(Self::compile_params(group)?),
            BlockKind::CodeSigner => Block::CodeSigner(Self::compile_params(group)?),
            BlockKind::HttpConfig => Block::HttpConfig(Self::compile_http_config(group)?),
            BlockKind::DnsBeacon => Block::DnsBeacon {
                name,
                params: Self::compile_params(group)?,
            },
            BlockKind::HttpGet => Block::HttpGet {
                name,
                block: Self::compile_http_get(group)?,
            },
            BlockKind::HttpPost => Block::HttpPost {
                name,
                block: Self::compile_http_post(group)?,
            },
            BlockKind::HttpStager => Block::HttpStager {
                name,
                block: Self::compile_http_stager(group)?,
            },
            BlockKind::Stage => Block::Stage(Self::compile_stage(group)?),
            BlockKind::ProcessInject => Block::ProcessInject(Self::compile_process_inject(group)?),
            BlockKind::PostEx => Block::PostEx(Self::compile_params(group)?),
        })
    }

    fn ignore_name(group: &Group) {
        if let Some(name) = &group.name {
            warn!(
                block = %group.kind,
                name = %name,
                line = group.span.line,
                "name ignored on a block that allows only one instance"
            );
        }
    }

    // ------------------------------------------------------------------------
    // Shape helpers
    // ------------------------------------------------------------------------

    /// A block made only of `set` lines.
    fn compile_params(group: &Group) -> SemanticResult<Params> {
        let context = group.header();
        let mut params = Params::new();

        for entry in &group.entries {
            trace!(context = %context, %entry, "nested entry");
            match entry {
                Entry::Assignment(a) => {
                    params.insert(a.name.clone(), a.value.clone());
                }
                _ => return Err(unknown_entry(entry, &context)),
            }
        }

        Ok(params)
    }

    /// A block made only of verb calls, each kept verbatim.
    fn compile_verbs(group: &Group) -> SemanticResult<Vec<MultiParam>> {
        let context = group.header();
        let mut verbs = Vec::with_capacity(group.entries.len());

        for entry in &group.entries {
            trace!(context = %context, %entry, "nested entry");
            match entry {
                Entry::FunctionCall(call) => verbs.push(MultiParam {
                    verb: call.verb.clone(),
                    values: call.args.clone(),
                }),
                _ => return Err(unknown_entry(entry, &context)),
            }
        }

        Ok(verbs)
    }

    /// Fill the slot named by `sub.kind`. Returns `false` when no slot
    /// matches, leaving the error kind to the caller.
    fn fill_slot(
        sub: &Group,
        context: &str,
        seen: &mut SubBlocks,
        slots: &mut [Slot<'_>],
    ) -> SemanticResult<bool> {
        match slots.iter_mut().find(|(keyword, _)| *keyword == sub.kind) {
            Some((_, list)) => {
                seen.register(sub, context)?;
                **list = Self::compile_verbs(sub)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------------
    // http-config
    // ------------------------------------------------------------------------

    fn compile_http_config(group: &Group) -> SemanticResult<HttpConfig> {
        let context = group.header();
        let mut config = HttpConfig::new();

        for entry in &group.entries {
            trace!(context = %context, %entry, "nested entry");
            match entry {
                Entry::Assignment(a) => {
                    config.params.insert(a.name.clone(), a.value.clone());
                }
                Entry::FunctionCall(call) if call.verb == "header" => {
                    config.headers.push(pair(call)?);
                }
                _ => return Err(unknown_entry(entry, &context)),
            }
        }

        Ok(config)
    }

    // ------------------------------------------------------------------------
    // http-get / http-post / http-stager
    // ------------------------------------------------------------------------

    fn compile_http_get(group: &Group) -> SemanticResult<HttpGet> {
        let mut block = HttpGet::new();
        Self::compile_http_block(
            group,
            &mut block.params,
            &mut block.client,
            &mut block.server,
            Self::compile_get_client,
        )?;
        Ok(block)
    }

    fn compile_http_post(group: &Group) -> SemanticResult<HttpPost> {
        let mut block = HttpPost::new();
        Self::compile_http_block(
            group,
            &mut block.params,
            &mut block.client,
            &mut block.server,
            Self::compile_post_client,
        )?;
        Ok(block)
    }

    fn compile_http_stager(group: &Group) -> SemanticResult<HttpStager> {
        let mut block = HttpStager::new();
        Self::compile_http_block(
            group,
            &mut block.params,
            &mut block.client,
            &mut block.server,
            Self::compile_stager_client,
        )?;
        Ok(block)
    }

    /// Shared walk of an HTTP transaction block: `set` lines plus one
    /// `client` and one `server` group.
    fn compile_http_block<C>(
        group: &Group,
        params: &mut Params,
        client: &mut C,
        server: &mut HttpServer,
        compile_client: fn(&Group) -> SemanticResult<C>,
    ) -> SemanticResult<()> {
        let context = group.header();
        let mut seen = SubBlocks::default();

        for entry in &group.entries {
            trace!(context = %context, %entry, "nested entry");
            match entry {
                Entry::Assignment(a) => {
                    params.insert(a.name.clone(), a.value.clone());
                }
                Entry::Group(sub) if sub.kind == "client" => {
                    seen.register(sub, &context)?;
                    *client = compile_client(sub)?;
                }
                Entry::Group(sub) if sub.kind == "server" => {
                    seen.register(sub, &context)?;
                    *server = Self::compile_server(sub)?;
                }
                Entry::Group(sub) => return Err(unknown_block(sub, &context)),
                Entry::FunctionCall(_) => return Err(unknown_entry(entry, &context)),
            }
        }

        Ok(())
    }

    fn compile_get_client(group: &Group) -> SemanticResult<HttpGetClient> {
        let mut client = HttpGetClient::new();
        Self::compile_exchange(
            group,
            &mut client.headers,
            Some(&mut client.uri_params),
            &mut [("metadata", &mut client.metadata)],
        )?;
        Ok(client)
    }

    fn compile_post_client(group: &Group) -> SemanticResult<HttpPostClient> {
        let mut client = HttpPostClient::new();
        Self::compile_exchange(
            group,
            &mut client.headers,
            Some(&mut client.uri_params),
            &mut [("output", &mut client.output), ("id", &mut client.id)],
        )?;
        Ok(client)
    }

    fn compile_stager_client(group: &Group) -> SemanticResult<HttpStagerClient> {
        let mut client = HttpStagerClient::new();
        Self::compile_exchange(
            group,
            &mut client.headers,
            Some(&mut client.uri_params),
            &mut [],
        )?;
        Ok(client)
    }

    fn compile_server(group: &Group) -> SemanticResult<HttpServer> {
        let mut server = HttpServer::new();
        Self::compile_exchange(
            group,
            &mut server.headers,
            None,
            &mut [("output", &mut server.output)],
        )?;
        Ok(server)
    }

    /// Walk a `client` or `server` group. `parameter` lines are accepted
    /// only when `uri_params` is given.
    fn compile_exchange(
        group: &Group,
        headers: &mut Pairs,
        mut uri_params: Option<&mut Pairs>,
        slots: &mut [Slot<'_>],
    ) -> SemanticResult<()> {
        let context = group.header();
        let mut seen = SubBlocks::default();

        for entry in &group.entries {
            trace!(context = %context, %entry, "nested entry");
            match entry {
                Entry::FunctionCall(call) if call.verb == "header" => {
                    headers.push(pair(call)?);
                }
                Entry::FunctionCall(call) if call.verb == "parameter" => match uri_params.as_deref_mut() {
                    Some(uri_params) => uri_params.push(pair(call)?),
                    None => return Err(unknown_entry(entry, &context)),
                },
                Entry::Group(sub) => {
                    if !Self::fill_slot(sub, &context, &mut seen, slots)? {
                        return Err(unknown_entry(entry, &context));
                    }
                }
                _ => return Err(unknown_entry(entry, &context)),
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------------
    // stage / process-inject
    // ------------------------------------------------------------------------

    fn compile_stage(group: &Group) -> SemanticResult<Stage> {
        let context = group.header();
        let mut stage = Stage::new();
        let mut seen = SubBlocks::default();

        for entry in &group.entries {
            trace!(context = %context, %entry, "nested entry");
            match entry {
                Entry::Assignment(a) => {
                    stage.params.insert(a.name.clone(), a.value.clone());
                }
                Entry::FunctionCall(call) => {
                    let list = match call.verb.as_str() {
                        "string" => &mut stage.string,
                        "stringw" => &mut stage.stringw,
                        "data" => &mut stage.data,
                        _ => return Err(unknown_entry(entry, &context)),
                    };
                    list.push(single(call)?);
                }
                Entry::Group(sub) => {
                    let mut slots = [
                        ("transform-x86", &mut stage.transform_x86),
                        ("transform-x64", &mut stage.transform_x64),
                    ];
                    if !Self::fill_slot(sub, &context, &mut seen, &mut slots)? {
                        return Err(unknown_entry(entry, &context));
                    }
                }
            }
        }

        Ok(stage)
    }

    fn compile_process_inject(group: &Group) -> SemanticResult<ProcessInject> {
        let context = group.header();
        let mut inject = ProcessInject::new();
        let mut seen = SubBlocks::default();

        for entry in &group.entries {
            trace!(context = %context, %entry, "nested entry");
            match entry {
                Entry::Assignment(a) => {
                    inject.params.insert(a.name.clone(), a.value.clone());
                }
                Entry::Group(sub) => {
                    let mut slots = [
                        ("transform-x86", &mut inject.transform_x86),
                        ("transform-x64", &mut inject.transform_x64),
                        ("execute", &mut inject.execute),
                    ];
                    if !Self::fill_slot(sub, &context, &mut seen, &mut slots)? {
                        return Err(unknown_entry(entry, &context));
                    }
                }
                Entry::FunctionCall(_) => return Err(unknown_entry(entry, &context)),
            }
        }

        Ok(inject)
    }
}

/// Compile a tree with the given options.
pub fn compile(ast: &ProfileAst, options: &ParseOptions) -> SemanticResult<Profile> {
    ProfileCompiler::compile(ast, options)
}

// ============================================================================
// ARITY + ERROR HELPERS
// ============================================================================

/// `header`/`parameter` take exactly a name and a value.
fn pair(call: &FunctionCall) -> SemanticResult<(String, String)> {
    match call.args.as_slice() {
        [name, value] => Ok((name.clone(), value.clone())),
        _ => Err(bad_params(call, 2)),
    }
}

/// `string`/`stringw`/`data` take exactly one value.
fn single(call: &FunctionCall) -> SemanticResult<String> {
    match call.args.as_slice() {
        [value] => Ok(value.clone()),
        _ => Err(bad_params(call, 1)),
    }
}

fn bad_params(call: &FunctionCall, expected: usize) -> SemanticError {
    SemanticError::BadParams {
        verb: call.verb.clone(),
        expected,
        found: call.args.len(),
        entry: call.to_string(),
        line: call.span.line,
        column: call.span.column,
    }
}

fn unknown_entry(entry: &Entry, context: &str) -> SemanticError {
    let span = entry.span();
    SemanticError::UnknownEntry {
        entry: entry.to_string(),
        context: context.to_string(),
        line: span.line,
        column: span.column,
    }
}

fn unknown_block(group: &Group, context: &str) -> SemanticError {
    SemanticError::UnknownBlock {
        block: group.kind.clone(),
        context: context.to_string(),
        line: group.span.line,
        column: group.span.column,
    }
}
