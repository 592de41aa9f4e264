//! Compiler Explorer Client
//!
//! Submits patched sources to a Compiler Explorer instance and returns the
//! assembly listing.
//!
//! Every request uses the same optimization arguments and output filters;
//! only the compiler, the source text and the cache-bypass flag vary. Any
//! transport failure, non-JSON body, missing `asm` array or non-zero
//! compiler exit code is returned as an error and never retried.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Arguments passed to every compiler.
pub const USER_ARGUMENTS: &str = "-std=c++14 -O3";

/// Public Compiler Explorer instance.
pub const DEFAULT_BASE_URL: &str = "https://godbolt.org";

/// Errors from the compile service.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("request to {compiler} failed: {message}")]
    Transport { compiler: String, message: String },

    #[error("{compiler} answered HTTP {status}: {body}")]
    Status {
        compiler: String,
        status: u16,
        body: String,
    },

    #[error("malformed response from {compiler}: {message}")]
    Malformed { compiler: String, message: String },

    #[error("{compiler} exited with code {code}: {stderr}")]
    CompileFailed {
        compiler: String,
        code: i32,
        stderr: String,
    },
}

/// One line of an assembly listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmLine {
    pub text: String,
    /// Empty, or starts with a label/directive sigil (`_` or `.`).
    pub is_directive_or_label: bool,
    pub is_call: bool,
    pub callee: Option<String>,
}

impl AsmLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let is_directive_or_label = text.is_empty() || text.starts_with(['_', '.']);

        let (is_call, callee) = if is_directive_or_label {
            (false, None)
        } else {
            let mut tokens = text.split_whitespace();
            match tokens.next() {
                Some(mnemonic) if mnemonic.starts_with("call") => {
                    (true, tokens.next().map(str::to_string))
                }
                _ => (false, None),
            }
        };

        Self {
            text,
            is_directive_or_label,
            is_call,
            callee,
        }
    }
}

/// Something that turns source into assembly.
pub trait CompileService: Send + Sync {
    fn compile(&self, compiler: &str, source: &str) -> Result<Vec<AsmLine>, ExplorerError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompileRequest<'a> {
    bypass_cache: bool,
    source: &'a str,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestOptions {
    user_arguments: &'static str,
    compiler_options: serde_json::Map<String, serde_json::Value>,
    filters: Filters,
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Filters {
    binary: bool,
    execute: bool,
    labels: bool,
    directives: bool,
    comment_only: bool,
    trim: bool,
    intel: bool,
    demangle: bool,
}

impl Filters {
    const FIXED: Filters = Filters {
        binary: false,
        execute: false,
        labels: true,
        directives: true,
        comment_only: true,
        trim: false,
        intel: false,
        demangle: false,
    };
}

#[derive(Debug, Deserialize)]
struct CompileResponse {
    #[serde(default)]
    code: Option<i32>,
    asm: Vec<ResponseLine>,
    #[serde(default)]
    stderr: Vec<ResponseLine>,
}

#[derive(Debug, Deserialize)]
struct ResponseLine {
    text: String,
}

fn compile_request(source: &str, bypass_cache: bool) -> CompileRequest<'_> {
    CompileRequest {
        bypass_cache,
        source,
        options: RequestOptions {
            user_arguments: USER_ARGUMENTS,
            compiler_options: serde_json::Map::new(),
            filters: Filters::FIXED,
            tools: Vec::new(),
        },
    }
}

/// Parse a compile response body into assembly lines.
pub fn parse_response(compiler: &str, body: &str) -> Result<Vec<AsmLine>, ExplorerError> {
    let response: CompileResponse =
        serde_json::from_str(body).map_err(|e| ExplorerError::Malformed {
            compiler: compiler.to_string(),
            message: e.to_string(),
        })?;

    if let Some(code) = response.code.filter(|&c| c != 0) {
        let stderr = response
            .stderr
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ExplorerError::CompileFailed {
            compiler: compiler.to_string(),
            code,
            stderr,
        });
    }

    Ok(response.asm.into_iter().map(|l| AsmLine::new(l.text)).collect())
}

/// Blocking HTTP client for the Compiler Explorer REST API.
pub struct GodboltClient {
    base_url: String,
    agent: ureq::Agent,
    bypass_cache: bool,
}

impl GodboltClient {
    pub fn new(base_url: &str, timeout: Duration, bypass_cache: bool) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
            bypass_cache,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bypass_cache(&self) -> bool {
        self.bypass_cache
    }

    fn compile_url(&self, compiler: &str) -> String {
        format!("{}/api/compiler/{}/compile", self.base_url, compiler)
    }
}

impl CompileService for GodboltClient {
    fn compile(&self, compiler: &str, source: &str) -> Result<Vec<AsmLine>, ExplorerError> {
        tracing::debug!(
            compiler,
            bytes = source.len(),
            bypass = self.bypass_cache,
            "submitting compile request"
        );

        let response = self
            .agent
            .post(&self.compile_url(compiler))
            .set("Accept", "application/json")
            .send_json(compile_request(source, self.bypass_cache))
            .map_err(|e| match e {
                ureq::Error::Status(status, response) => ExplorerError::Status {
                    compiler: compiler.to_string(),
                    status,
                    body: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(t) => ExplorerError::Transport {
                    compiler: compiler.to_string(),
                    message: t.to_string(),
                },
            })?;

        let body = response
            .into_string()
            .map_err(|e| ExplorerError::Transport {
                compiler: compiler.to_string(),
                message: e.to_string(),
            })?;

        parse_response(compiler, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(compile_request("int x;", true)).unwrap();
        assert_eq!(body["bypassCache"], true);
        assert_eq!(body["source"], "int x;");
        assert_eq!(body["options"]["userArguments"], "-std=c++14 -O3");

        let filters = &body["options"]["filters"];
        assert_eq!(filters["binary"], false);
        assert_eq!(filters["execute"], false);
        assert_eq!(filters["labels"], true);
        assert_eq!(filters["directives"], true);
        assert_eq!(filters["commentOnly"], true);
        assert_eq!(filters["demangle"], false);
        assert!(body["options"]["tools"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_asm_line_flags() {
        let label = AsmLine::new("_ZN11wider_tests5TestsIoE4plusEPoPKo:");
        assert!(label.is_directive_or_label);
        assert!(!label.is_call);

        let directive = AsmLine::new(".LFB0:");
        assert!(directive.is_directive_or_label);

        assert!(AsmLine::new("").is_directive_or_label);

        let call = AsmLine::new("        call    __udivti3@PLT");
        assert!(call.is_call);
        assert_eq!(call.callee.as_deref(), Some("__udivti3@PLT"));

        let mov = AsmLine::new("        mov     rax, qword ptr [rdi]");
        assert!(!mov.is_directive_or_label);
        assert!(!mov.is_call);
        assert_eq!(mov.callee, None);
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "code": 0,
            "asm": [
                {"text": "_Z4plusPoPKo:", "source": null},
                {"text": "        add     qword ptr [rdi], rax"},
                {"text": "        ret"}
            ],
            "stderr": []
        }"#;
        let lines = parse_response("clang_trunk", body).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].is_directive_or_label);
        assert_eq!(lines[2].text, "        ret");
    }

    #[test]
    fn test_parse_response_without_asm_is_malformed() {
        let err = parse_response("gsnapshot", r#"{"code": 0}"#).unwrap_err();
        assert!(matches!(err, ExplorerError::Malformed { .. }));

        let err = parse_response("gsnapshot", "<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, ExplorerError::Malformed { .. }));
    }

    #[test]
    fn test_parse_response_compile_failure() {
        let body = r#"{
            "code": 1,
            "asm": [{"text": "<Compilation failed>"}],
            "stderr": [{"text": "error: unknown type"}, {"text": "1 error generated."}]
        }"#;
        match parse_response("clang_trunk", body).unwrap_err() {
            ExplorerError::CompileFailed { code, stderr, .. } => {
                assert_eq!(code, 1);
                assert_eq!(stderr, "error: unknown type\n1 error generated.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_client_url() {
        let client = GodboltClient::new("https://godbolt.org/", Duration::from_secs(1), false);
        assert_eq!(
            client.compile_url("clang_trunk"),
            "https://godbolt.org/api/compiler/clang_trunk/compile"
        );
        assert!(!client.bypass_cache());
    }
}
