//! 检索统计：相似度 min/max/avg、命中率、ROUGE-L

use serde::Serialize;

/// 一组分数的 min / max / avg；空集合时全为 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreStats {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}

impl ScoreStats {
    pub fn from_scores(scores: &[f32]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let avg = scores.iter().sum::<f32>() / scores.len() as f32;
        Self { min, max, avg }
    }
}

/// 分数不低于阈值的比例
pub fn hit_rate(scores: &[f32], threshold: f32) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().filter(|s| **s >= threshold).count() as f32 / scores.len() as f32
}

/// 按词的最长公共子序列长度
fn lcs_len(a: &[&str], b: &[&str]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            cur[j + 1] = if x == y {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// ROUGE-L F 值（大小写不敏感，按空白分词）
pub fn rouge_l(candidate: &str, reference: &str) -> f32 {
    let c = candidate.to_lowercase();
    let r = reference.to_lowercase();
    let cw: Vec<&str> = c.split_whitespace().collect();
    let rw: Vec<&str> = r.split_whitespace().collect();
    if cw.is_empty() || rw.is_empty() {
        return 0.0;
    }
    let lcs = lcs_len(&cw, &rw) as f32;
    if lcs == 0.0 {
        return 0.0;
    }
    let precision = lcs / cw.len() as f32;
    let recall = lcs / rw.len() as f32;
    2.0 * precision * recall / (precision + recall)
}
