//! 用量与费用估算
//!
//! 本地模型没有真实计价，按模型族给出每 token 的模拟费率；后端未返回 token 数时按空白分词计数。

use serde::Serialize;

const LOCAL_LLM_RATE: f64 = 0.000_000_1;
const LOCAL_VISION_RATE: f64 = 0.000_000_2;
const LOCAL_WHISPER_RATE: f64 = 0.000_000_15;

/// 一次 LLM 调用的用量估算
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageEstimate {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

impl UsageEstimate {
    /// 合成失败时使用的零值
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.total_tokens == 0 && self.estimated_cost_usd == 0.0
    }
}

/// 模型名对应的每 token 费率
pub fn rate_for_model(model: &str) -> f64 {
    let model = model.to_lowercase();
    if model.contains("llava") {
        LOCAL_VISION_RATE
    } else if model.contains("whisper") {
        LOCAL_WHISPER_RATE
    } else {
        LOCAL_LLM_RATE
    }
}

/// 按费率估算费用，保留 8 位小数；rate_override 为配置中的自定义费率
pub fn estimate_cost(
    model: &str,
    input_tokens: u64,
    output_tokens: u64,
    rate_override: Option<f64>,
) -> UsageEstimate {
    let rate = rate_override.unwrap_or_else(|| rate_for_model(model));
    let total_tokens = input_tokens + output_tokens;
    let estimated_cost_usd = (total_tokens as f64 * rate * 1e8).round() / 1e8;
    UsageEstimate {
        model: model.to_string(),
        input_tokens,
        output_tokens,
        total_tokens,
        estimated_cost_usd,
    }
}

/// 粗略 token 数：空白分词后的词数
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
