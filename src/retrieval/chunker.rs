//! 文档分块
//!
//! 先规整空白，再按词数切出带重叠的窗口：下一窗口从上一窗口末尾回退 overlap_words 个词开始。

use std::collections::HashMap;

/// 文档块
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 块 ID（doc_id + 序号）
    pub id: String,
    pub text: String,
    /// 来源文档 ID
    pub doc_id: String,
    /// 在文档中的序号
    pub sequence: usize,
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    pub fn new(doc_id: impl Into<String>, sequence: usize, text: impl Into<String>) -> Self {
        let doc_id = doc_id.into();
        Self {
            id: format!("{doc_id}_{sequence}"),
            text: text.into(),
            doc_id,
            sequence,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// 分块参数（词数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: 250,
            overlap_words: 40,
        }
    }
}

/// 规整空白：换行、制表符转空格，连续空格折叠为一个
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按词数切分为重叠窗口；空文本返回空列表
pub fn chunk_words(text: &str, max_words: usize, overlap_words: usize) -> Vec<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let words: Vec<&str> = cleaned.split(' ').collect();
    let max_words = max_words.max(1);
    if words.len() <= max_words {
        return vec![words.join(" ")];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut end = max_words;
    while start < words.len() {
        let window = &words[start..end.min(words.len())];
        if !window.is_empty() {
            chunks.push(window.join(" "));
        }
        if end >= words.len() {
            break;
        }
        // 重叠不小于窗口时至少前进一个词
        start = end.saturating_sub(overlap_words).max(start + 1);
        end = start + max_words;
    }
    chunks
}

/// 文档分块器
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        chunk_words(text, self.config.max_words, self.config.overlap_words)
            .into_iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(doc_id, i, t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{i}")).collect()
    }

    #[test]
    fn test_300_words_two_chunks_with_overlap() {
        let words = numbered_words(300);
        let text = words.join(" ");
        let chunks = chunk_words(&text, 250, 40);
        assert_eq!(chunks.len(), 2);

        let first: Vec<&str> = chunks[0].split(' ').collect();
        let second: Vec<&str> = chunks[1].split(' ').collect();
        assert_eq!(first, words[0..250].iter().map(|s| s.as_str()).collect::<Vec<_>>());
        assert_eq!(second, words[210..300].iter().map(|s| s.as_str()).collect::<Vec<_>>());
        assert_eq!(second.len(), 90);
        assert_eq!(&first[210..], &second[..40]);

        let mut rebuilt: Vec<&str> = first.clone();
        rebuilt.extend_from_slice(&second[40..]);
        assert_eq!(rebuilt.join(" "), text);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_words("one  two\nthree\tfour", 250, 40);
        assert_eq!(chunks, vec!["one two three four".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_words("   \n\t ", 250, 40).is_empty());
    }

    #[test]
    fn test_overlap_not_smaller_than_window_still_advances() {
        let text = numbered_words(5).join(" ");
        let chunks = chunk_words(&text, 2, 5);
        assert_eq!(chunks.first().map(String::as_str), Some("w0 w1"));
        assert_eq!(chunks.last().map(String::as_str), Some("w3 w4"));
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_chunker_ids() {
        let chunker = Chunker::new(ChunkingConfig {
            max_words: 3,
            overlap_words: 1,
        });
        let chunks = chunker.chunk("doc1", "a b c d e");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "doc1_0");
        assert_eq!(chunks[1].text, "c d e");
        assert_eq!(chunks[1].sequence, 1);
        let tagged = chunks[0].clone().with_metadata("type", "text");
        assert_eq!(tagged.metadata.get("type").map(String::as_str), Some("text"));
    }
}
