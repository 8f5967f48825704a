use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{CodeGenerator, CodegenError, GeneratedCode, GenerationRequest};

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));
static NTH_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第(\d+)项").expect("valid regex"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("valid regex"));
static ASCII_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9_]*").expect("valid regex"));

const TIME_TOKENS: &[&str] = &["时间", "time", "现在", "当前", "日期", "date"];
const DATE_TOKENS: &[&str] = &["日期", "date"];
const FIBONACCI_TOKENS: &[&str] = &["斐波那契", "fibonacci"];
const FACTORIAL_TOKENS: &[&str] = &["阶乘", "factorial"];
const TRANSLATE_TOKENS: &[&str] = &["翻译", "translate"];
const ARITHMETIC_TOKENS: &[&str] = &[
    "计算", "平方根", "sqrt", "加法", "减法", "乘法", "除法", "compute", "calculate", "sum",
];
const CASE_TOKENS: &[&str] = &["大写", "小写", "upper", "lower"];
const CREATIVE_TOKENS: &[&str] = &["诗", "poem", "创作", "生成"];

/// Searched in order; the first phrase contained in the description wins.
const TRANSLATIONS: &[(&str, &str)] = &[
    ("hello", "你好"),
    ("good morning", "早上好"),
    ("good afternoon", "下午好"),
    ("good evening", "晚上好"),
    ("thank you", "谢谢"),
    ("goodbye", "再见"),
    ("yes", "是的"),
    ("no", "不是"),
    ("i love programming", "我爱编程"),
    ("python", "Python编程语言"),
];

const SPRING_POEM: &str = "春风轻拂绿柳梢，花开遍野鸟儿叫。";
const PROGRAMMING_POEM: &str = "代码如诗意飞扬，逻辑思维创辉煌。";
const DEFAULT_POEM: &str = "落红不是无情物，化作春泥更护花。";

type Rule = fn(&LocalCodeGenerator, &Context<'_>) -> Option<GeneratedCode>;

/// Category tokens paired with the branch that handles them, in priority order.
const RULES: &[(&str, &[&str], Rule)] = &[
    ("time", TIME_TOKENS, LocalCodeGenerator::current_time),
    ("fibonacci", FIBONACCI_TOKENS, LocalCodeGenerator::fibonacci),
    ("factorial", FACTORIAL_TOKENS, LocalCodeGenerator::factorial),
    ("translate", TRANSLATE_TOKENS, LocalCodeGenerator::translate),
    ("arithmetic", ARITHMETIC_TOKENS, LocalCodeGenerator::arithmetic),
    ("case", CASE_TOKENS, LocalCodeGenerator::convert_case),
    ("creative", CREATIVE_TOKENS, LocalCodeGenerator::creative),
];

/// Per-call view of the request the rules work on.
struct Context<'a> {
    description: &'a str,
    lower: String,
    name: &'a str,
}

impl Context<'_> {
    fn has_any(&self, tokens: &[&str]) -> bool {
        tokens.iter().any(|t| self.lower.contains(t))
    }

    fn integers(&self) -> Vec<u64> {
        INTEGER
            .find_iter(self.description)
            .filter_map(|m| m.as_str().parse().ok())
            .collect()
    }

    fn source(&self, ret: &str, body: &str) -> String {
        format!("fn {}() -> {ret} {{\n    {body}\n}}", self.name)
    }
}

fn system_clock() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Deterministic, offline generator keyed by lexical patterns.
///
/// Used for direct execution and whenever the remote backend is not
/// configured. The clock is injectable so time answers can be tested.
#[derive(Debug, Clone, Copy)]
pub struct LocalCodeGenerator {
    clock: fn() -> NaiveDateTime,
}

impl Default for LocalCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCodeGenerator {
    pub fn new() -> Self {
        Self {
            clock: system_clock,
        }
    }

    #[cfg(test)]
    pub fn with_clock(clock: fn() -> NaiveDateTime) -> Self {
        Self { clock }
    }

    /// Runs the first rule whose category matches; a matching rule that cannot
    /// extract what it needs falls through to the default answer.
    pub fn generate_local(&self, req: &GenerationRequest) -> GeneratedCode {
        let ctx = Context {
            description: &req.description,
            lower: req.description.to_lowercase(),
            name: if req.function_name.is_empty() {
                "task"
            } else {
                &req.function_name
            },
        };

        let matched = RULES.iter().find(|(_, tokens, _)| ctx.has_any(tokens));
        if let Some((category, _, rule)) = matched {
            debug!(category, "local generator rule matched");
            if let Some(out) = rule(self, &ctx) {
                return out;
            }
        }

        GeneratedCode::new(
            format!("handled locally: {}", req.description),
            ctx.source(
                "String",
                &format!("format!(\"handled locally: {{}}\", {:?})", req.description),
            ),
        )
    }

    fn current_time(&self, ctx: &Context<'_>) -> Option<GeneratedCode> {
        let fmt = if ctx.has_any(DATE_TOKENS) {
            "%Y-%m-%d"
        } else {
            "%Y-%m-%d %H:%M:%S"
        };
        let now = (self.clock)();
        Some(GeneratedCode::new(
            now.format(fmt).to_string(),
            ctx.source(
                "String",
                &format!("chrono::Local::now().format({fmt:?}).to_string()"),
            ),
        ))
    }

    fn fibonacci(&self, ctx: &Context<'_>) -> Option<GeneratedCode> {
        let n = NTH_TERM
            .captures(ctx.description)
            .and_then(|c| c[1].parse::<u64>().ok())
            .or_else(|| ctx.integers().first().copied())?;

        let result = fibonacci(n).map_or_else(|| "overflow".to_string(), |v| v.to_string());
        let body = format!(
            "let (mut a, mut b) = (0u128, 1u128);\n    \
             for _ in 0..{n} {{\n        \
             (a, b) = (b, a + b);\n    \
             }}\n    \
             a"
        );
        Some(GeneratedCode::new(result, ctx.source("u128", &body)))
    }

    fn factorial(&self, ctx: &Context<'_>) -> Option<GeneratedCode> {
        let n = *ctx.integers().first()?;
        let result = factorial(n).map_or_else(|| "overflow".to_string(), |v| v.to_string());
        Some(GeneratedCode::new(
            result,
            ctx.source("u128", &format!("(1..={n}u128).product()")),
        ))
    }

    fn translate(&self, ctx: &Context<'_>) -> Option<GeneratedCode> {
        let (result, source) = match TRANSLATIONS.iter().find(|(en, _)| ctx.lower.contains(en)) {
            Some((_, zh)) => (zh.to_string(), ctx.source("&'static str", &format!("{zh:?}"))),
            None => (
                "translation unavailable".to_string(),
                ctx.source("&'static str", "\"translation unavailable\""),
            ),
        };
        Some(GeneratedCode::new(result, source))
    }

    fn arithmetic(&self, ctx: &Context<'_>) -> Option<GeneratedCode> {
        let nums = ctx.integers();

        if ctx.has_any(&["平方根", "sqrt"]) {
            let n = *nums.first()?;
            let root = (n as f64).sqrt();
            return Some(GeneratedCode::new(
                format_float(root),
                ctx.source("f64", &format!("({n} as f64).sqrt()")),
            ));
        }

        if ctx.description.contains('+') || ctx.lower.contains("加法") || has_word(&ctx.lower, "add")
        {
            let (a, b) = (*nums.first()?, *nums.get(1)?);
            let sum = u128::from(a) + u128::from(b);
            return Some(GeneratedCode::new(
                sum.to_string(),
                ctx.source("u128", &format!("{a}u128 + {b}u128")),
            ));
        }

        let has_range = ctx.lower.contains('到') || has_word(&ctx.lower, "to");
        let wants_sum = ctx.lower.contains('和') || ctx.lower.contains("sum");
        if has_range && wants_sum {
            let (start, end) = (*nums.first()?, *nums.get(1)?);
            return Some(GeneratedCode::new(
                range_sum(start, end).to_string(),
                ctx.source("u128", &format!("({start}..={end}u128).sum()")),
            ));
        }

        None
    }

    fn convert_case(&self, ctx: &Context<'_>) -> Option<GeneratedCode> {
        let text = QUOTED
            .captures(ctx.description)
            .and_then(|c| c.get(1))
            .or_else(|| ASCII_WORD.find(ctx.description))?
            .as_str();

        let (result, method) = if ctx.has_any(&["大写", "upper"]) {
            (text.to_uppercase(), "to_uppercase")
        } else {
            (text.to_lowercase(), "to_lowercase")
        };
        Some(GeneratedCode::new(
            result,
            ctx.source("String", &format!("{text:?}.{method}()")),
        ))
    }

    fn creative(&self, ctx: &Context<'_>) -> Option<GeneratedCode> {
        let poem = if ctx.has_any(&["春天", "spring"]) {
            SPRING_POEM
        } else if ctx.has_any(&["编程", "program"]) {
            PROGRAMMING_POEM
        } else {
            DEFAULT_POEM
        };
        Some(GeneratedCode::new(
            poem,
            ctx.source("&'static str", &format!("{poem:?}")),
        ))
    }
}

#[async_trait::async_trait]
impl CodeGenerator for LocalCodeGenerator {
    fn name(&self) -> &str {
        "local"
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<GeneratedCode, CodegenError> {
        Ok(self.generate_local(req))
    }
}

/// F(0) = 0, F(1) = 1; `None` once the value no longer fits in `u128`.
fn fibonacci(n: u64) -> Option<u128> {
    let (mut a, mut b) = (0u128, Some(1u128));
    for _ in 0..n {
        let cur = b?;
        b = a.checked_add(cur);
        a = cur;
    }
    Some(a)
}

fn factorial(n: u64) -> Option<u128> {
    (1..=u128::from(n)).try_fold(1u128, |acc, i| acc.checked_mul(i))
}

/// Inclusive sum of `start..=end`; empty when `start > end`.
fn range_sum(start: u64, end: u64) -> u128 {
    if start > end {
        return 0;
    }
    let (s, e) = (u128::from(start), u128::from(end));
    (e - s + 1) * (s + e) / 2
}

fn format_float(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

/// Latin token not glued to other ASCII letters or digits.
fn has_word(lower: &str, word: &str) -> bool {
    lower.match_indices(word).any(|(start, _)| {
        let before = lower[..start].chars().next_back();
        let after = lower[start + word.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}
