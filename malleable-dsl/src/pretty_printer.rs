//! Pretty printer for profiles
//!
//! Blocks are emitted in a fixed order: globals, https-certificate,
//! code-signer, http-config, dns-beacon, http-get, http-post, http-stager,
//! stage, process-inject, post-ex, then extension blocks. Variants keep the
//! order of their collection. One tab per nesting level.

use crate::model::*;
use crate::values::quote;

/// Render a profile as source text that parses back to an equal profile.
pub fn pretty_print(profile: &Profile) -> String {
    let mut output = String::new();

    if !profile.globals.is_empty() {
        output.push_str(&pretty_print_params(&profile.globals, 0));
        output.push('\n');
    }

    if let Some(params) = &profile.https_certificate {
        output.push_str(&pretty_print_params_block("https-certificate", None, params));
    }

    if let Some(params) = &profile.code_signer {
        output.push_str(&pretty_print_params_block("code-signer", None, params));
    }

    if let Some(config) = &profile.http_config {
        output.push_str(&pretty_print_http_config(config));
    }

    for (name, params) in &profile.dns_beacon {
        output.push_str(&pretty_print_params_block(
            "dns-beacon",
            variant_name(name),
            params,
        ));
    }

    for (name, block) in &profile.http_get {
        output.push_str(&pretty_print_http_get(name, block));
    }

    for (name, block) in &profile.http_post {
        output.push_str(&pretty_print_http_post(name, block));
    }

    for (name, block) in &profile.http_stager {
        output.push_str(&pretty_print_http_stager(name, block));
    }

    if let Some(stage) = &profile.stage {
        output.push_str(&pretty_print_stage(stage));
    }

    if let Some(inject) = &profile.process_inject {
        output.push_str(&pretty_print_process_inject(inject));
    }

    if let Some(params) = &profile.post_ex {
        output.push_str(&pretty_print_params_block("post-ex", None, params));
    }

    for (keyword, params) in &profile.extensions {
        output.push_str(&pretty_print_params_block(keyword, None, params));
    }

    output
}

fn indent_str(level: usize) -> String {
    "\t".repeat(level)
}

/// The `"default"` variant is written without a name.
fn variant_name(key: &str) -> Option<&str> {
    if key == DEFAULT_VARIANT {
        None
    } else {
        Some(key)
    }
}

fn open_block(keyword: &str, name: Option<&str>, indent: usize) -> String {
    match name {
        Some(name) => format!("{}{} {} {{\n", indent_str(indent), keyword, quote(name)),
        None => format!("{}{} {{\n", indent_str(indent), keyword),
    }
}

fn close_block(indent: usize) -> String {
    format!("{}}}\n", indent_str(indent))
}

// ============================================================================
// LINES
// ============================================================================

fn pretty_print_params(params: &Params, indent: usize) -> String {
    let ind = indent_str(indent);
    params
        .iter()
        .map(|(name, value)| format!("{}set {} {};\n", ind, name, quote(value)))
        .collect()
}

fn pretty_print_pairs(verb: &str, pairs: &Pairs, indent: usize) -> String {
    let ind = indent_str(indent);
    pairs
        .iter()
        .map(|(name, value)| format!("{}{} {} {};\n", ind, verb, quote(name), quote(value)))
        .collect()
}

fn pretty_print_values(verb: &str, values: &[String], indent: usize) -> String {
    let ind = indent_str(indent);
    values
        .iter()
        .map(|value| format!("{}{} {};\n", ind, verb, quote(value)))
        .collect()
}

fn pretty_print_multi_param(step: &MultiParam) -> String {
    let mut line = step.verb.clone();
    for value in &step.values {
        line.push(' ');
        line.push_str(&quote(value));
    }
    line.push(';');
    line
}

fn pretty_print_verbs_block(keyword: &str, verbs: &[MultiParam], indent: usize) -> String {
    let inner = indent_str(indent + 1);
    let mut output = open_block(keyword, None, indent);
    for step in verbs {
        output.push_str(&format!("{}{}\n", inner, pretty_print_multi_param(step)));
    }
    output.push_str(&close_block(indent));
    output
}

// ============================================================================
// BLOCKS
// ============================================================================

fn pretty_print_params_block(keyword: &str, name: Option<&str>, params: &Params) -> String {
    let mut output = open_block(keyword, name, 0);
    output.push_str(&pretty_print_params(params, 1));
    output.push_str("}\n\n");
    output
}

fn pretty_print_http_config(config: &HttpConfig) -> String {
    let mut output = open_block("http-config", None, 0);
    output.push_str(&pretty_print_params(&config.params, 1));
    output.push_str(&pretty_print_pairs("header", &config.headers, 1));
    output.push_str("}\n\n");
    output
}

fn pretty_print_server(server: &HttpServer) -> String {
    let mut output = open_block("server", None, 1);
    output.push_str(&pretty_print_pairs("header", &server.headers, 2));
    output.push_str(&pretty_print_verbs_block("output", &server.output, 2));
    output.push_str(&close_block(1));
    output
}

/// Header lines shared by every `client` block.
fn pretty_print_client_lines(headers: &Pairs, uri_params: &Pairs) -> String {
    let mut output = pretty_print_pairs("header", headers, 2);
    output.push_str(&pretty_print_pairs("parameter", uri_params, 2));
    output
}

fn pretty_print_http_block(
    keyword: &str,
    name: &str,
    params: &Params,
    client: String,
    server: &HttpServer,
) -> String {
    let mut output = open_block(keyword, variant_name(name), 0);
    output.push_str(&pretty_print_params(params, 1));
    output.push('\n');
    output.push_str(&open_block("client", None, 1));
    output.push_str(&client);
    output.push_str(&close_block(1));
    output.push('\n');
    output.push_str(&pretty_print_server(server));
    output.push_str("}\n\n");
    output
}

fn pretty_print_http_get(name: &str, block: &HttpGet) -> String {
    let client = &block.client;
    let mut lines = pretty_print_client_lines(&client.headers, &client.uri_params);
    lines.push_str(&pretty_print_verbs_block("metadata", &client.metadata, 2));
    pretty_print_http_block("http-get", name, &block.params, lines, &block.server)
}

fn pretty_print_http_post(name: &str, block: &HttpPost) -> String {
    let client = &block.client;
    let mut lines = pretty_print_client_lines(&client.headers, &client.uri_params);
    lines.push_str(&pretty_print_verbs_block("output", &client.output, 2));
    lines.push_str(&pretty_print_verbs_block("id", &client.id, 2));
    pretty_print_http_block("http-post", name, &block.params, lines, &block.server)
}

fn pretty_print_http_stager(name: &str, block: &HttpStager) -> String {
    let client = &block.client;
    let lines = pretty_print_client_lines(&client.headers, &client.uri_params);
    pretty_print_http_block("http-stager", name, &block.params, lines, &block.server)
}

fn pretty_print_stage(stage: &Stage) -> String {
    let mut output = open_block("stage", None, 0);
    output.push_str(&pretty_print_params(&stage.params, 1));
    output.push('\n');
    output.push_str(&pretty_print_values("string", &stage.string, 1));
    output.push_str(&pretty_print_values("stringw", &stage.stringw, 1));
    output.push_str(&pretty_print_values("data", &stage.data, 1));
    output.push('\n');
    output.push_str(&pretty_print_verbs_block("transform-x86", &stage.transform_x86, 1));
    output.push_str(&pretty_print_verbs_block("transform-x64", &stage.transform_x64, 1));
    output.push_str("}\n\n");
    output
}

fn pretty_print_process_inject(inject: &ProcessInject) -> String {
    let mut output = open_block("process-inject", None, 0);
    output.push_str(&pretty_print_params(&inject.params, 1));
    output.push('\n');
    output.push_str(&pretty_print_verbs_block("transform-x86", &inject.transform_x86, 1));
    output.push_str(&pretty_print_verbs_block("transform-x64", &inject.transform_x64, 1));
    output.push_str(&pretty_print_verbs_block("execute", &inject.execute, 1));
    output.push_str("}\n\n");
    output
}
