//! 计算器工具
//!
//! 输入是整条任务文本：先把自然语言运算词（plus / minus / times / divided by / x percent of y、
//! sum of a and b、multiply a by b 等）规整为符号，再取唯一的算式片段，用递归下降求值。
//! 支持 + - * / % ^ 与括号；多个互不相连的数字片段视为歧义，不做猜测。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::tools::{Tool, ToolOutput};

#[derive(Error, Debug, PartialEq)]
enum CalcError {
    #[error("no arithmetic expression found")]
    NoExpression,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token after expression")]
    Trailing,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not finite")]
    NotFinite,
    #[error("ambiguous expression")]
    Ambiguous,
    #[error("expression nested too deeply")]
    TooDeep,
}

/// 括号与前缀符号的最大嵌套层数
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let s: String = chars[start..i].iter().collect();
                let n = s.parse::<f64>().map_err(|_| CalcError::InvalidNumber(s))?;
                tokens.push(Token::Num(n));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.peek();
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // 括号、前缀符号与指数的递归都经过这里，嵌套层数在此计数
    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let value = match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                self.unary().map(|v| -v)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        };
        self.depth -= 1;
        value
    }

    // 右结合：2^3^2 = 2^9
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exp = self.unary()?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let v = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(v),
                    Some(_) => Err(CalcError::Trailing),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(Token::Op(c)) => Err(CalcError::UnexpectedChar(c)),
            Some(Token::RParen) => Err(CalcError::UnexpectedChar(')')),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(CalcError::NoExpression);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::Trailing);
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

fn word_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"(\d+(?:\.\d+)?)\s*(?:%|percent)\s+of\s+", "($1/100)*"),
            (r"(\d+(?:\.\d+)?)\s*percent\b", "($1/100)"),
            (r"\bsum\s+of\s+(\d+(?:\.\d+)?)\s+and\s+(\d+(?:\.\d+)?)", "${1} + ${2}"),
            (r"\badd\s+(\d+(?:\.\d+)?)\s+(?:and|to)\s+(\d+(?:\.\d+)?)", "${1} + ${2}"),
            (r"\bsubtract\s+(\d+(?:\.\d+)?)\s+from\s+(\d+(?:\.\d+)?)", "${2} - ${1}"),
            (r"\bmultiply\s+(\d+(?:\.\d+)?)\s+(?:by|and)\s+(\d+(?:\.\d+)?)", "${1} * ${2}"),
            (r"\bdivide\s+(\d+(?:\.\d+)?)\s+by\s+(\d+(?:\.\d+)?)", "${1} / ${2}"),
            (r"\bmultiplied\s+by\b", "*"),
            (r"\bdivided\s+by\b", "/"),
            (r"\btimes\b", "*"),
            (r"\bplus\b", "+"),
            (r"\bminus\b", "-"),
            (r"\bmod(?:ulo)?\b", "%"),
        ]
        .into_iter()
        .filter_map(|(p, r)| Regex::new(p).ok().map(|re| (re, r)))
        .collect()
    })
}

fn expression_span() -> Option<&'static Regex> {
    static SPAN: OnceLock<Option<Regex>> = OnceLock::new();
    SPAN.get_or_init(|| Regex::new(r"[0-9.+\-*/^%() ]+").ok())
        .as_ref()
}

/// 把自然语言算式规整为符号形式，返回唯一的含数字片段
fn extract_expression(input: &str) -> Result<String, CalcError> {
    let mut text = input.to_lowercase();
    for (re, rep) in word_rules() {
        text = re.replace_all(&text, *rep).into_owned();
    }
    let span = expression_span().ok_or(CalcError::NoExpression)?;
    let mut candidates = span
        .find_iter(&text)
        .map(|m| m.as_str().trim().trim_end_matches('.').trim().to_string())
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()));
    let expr = candidates.next().ok_or(CalcError::NoExpression)?;
    if candidates.next().is_some() {
        return Err(CalcError::Ambiguous);
    }
    Ok(expr)
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let rounded = (v * 1e10).round() / 1e10;
        format!("{rounded}")
    }
}

/// 计算器工具
pub struct CalculatorTool {
    name: String,
}

impl CalculatorTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// 求值入口（同步），错误前缀为 CALC_ERROR
    pub fn calculate(&self, input: &str) -> Result<(String, String), String> {
        let expr = extract_expression(input).map_err(|e| format!("CALC_ERROR: {e}"))?;
        let value = evaluate(&expr).map_err(|e| format!("CALC_ERROR: {e}"))?;
        Ok((expr, format_number(value)))
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new("calculator")
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Evaluate the arithmetic in the input (+ - * / % ^, parentheses, 'x percent of y')."
    }

    async fn execute(&self, input: &str) -> Result<ToolOutput, String> {
        let (expression, result) = self.calculate(input)?;
        tracing::debug!(expression = %expression, result = %result, "calculator");
        Ok(ToolOutput::Record(serde_json::json!({
            "expression": expression,
            "response": result,
        })))
    }
}
