use regex::Regex;
use std::sync::LazyLock;

use super::{CodegenError, GeneratedCode};

pub(crate) const REPLY_SEPARATOR: &str = "|||";

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*\n(.*?)\n?```").expect("valid regex"));
// a definition runs until the first blank line or unindented line
static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub\s+)?(?:def|fn)\s[^\n]*(?:\n[ \t]+[^\n]*)*").expect("valid regex")
});
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"));

/// Removes `<think>...</think>` reasoning blocks some models emit.
pub(crate) fn strip_reasoning(reply: &str) -> String {
    THINK_BLOCK.replace_all(reply, "").trim().to_string()
}

/// Turns a raw model reply into `(result, source)`.
///
/// The expected shape is `result|||source`; anything else is parsed
/// heuristically from code fences and the last number in the text.
pub fn parse_reply(reply: &str) -> Result<GeneratedCode, CodegenError> {
    let cleaned = strip_reasoning(reply);
    if cleaned.is_empty() {
        return Err(CodegenError::MalformedResponse("empty reply".into()));
    }

    if let Some((result, source)) = cleaned.split_once(REPLY_SEPARATOR) {
        return Ok(GeneratedCode::new(result.trim(), source.trim()));
    }

    Ok(parse_heuristic(&cleaned))
}

fn parse_heuristic(text: &str) -> GeneratedCode {
    let source = FENCED_BLOCK
        .captures(text)
        .and_then(|c| c.get(1))
        .or_else(|| DEFINITION.find(text))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    // numbers inside the code are not answers
    let prose = FENCED_BLOCK.replace_all(text, "");
    let result = NUMBER
        .find_iter(&prose)
        .last()
        .map(|m| m.as_str().to_string())
        .or_else(|| {
            prose
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default();

    GeneratedCode::new(result, source)
}
