//! `quick_search` results: a flat list of matching facts.

use serde::Serialize;

use super::common::{capture_count, capture_str, numbered_items, pattern, section_body};
use crate::error::Result;

const TOOL: &str = "quick_search";

const MAX_FACTS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSearchResult {
    pub query: String,
    pub count: u32,
    pub facts: Vec<String>,
}

pub fn extract_quick_search(text: &str) -> QuickSearchResult {
    parse(text).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "quick_search extraction failed");
        QuickSearchResult::default()
    })
}

fn parse(text: &str) -> Result<QuickSearchResult> {
    let query = pattern!(TOOL, r"搜索查询[:：][ \t]*(.+)")?;
    let count = pattern!(TOOL, r"找到[ \t]*(\d+)[ \t]*条")?;
    let facts_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*相关事实")?;

    // Without the heading every numbered line is taken as a fact.
    let facts = match section_body(text, facts_heading) {
        Some(body) => numbered_items(body, MAX_FACTS),
        None => numbered_items(text, MAX_FACTS),
    };

    Ok(QuickSearchResult {
        query: capture_str(query, text),
        count: capture_count(count, text),
        facts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sample() {
        let text = "搜索查询: 校园舆情\n找到 3 条相关信息\n\n### 相关事实:\n1. 学生会发布声明\n2. 校方回应\n3. 媒体跟进报道";
        let result = extract_quick_search(text);
        assert_eq!(result.query, "校园舆情");
        assert_eq!(result.count, 3);
        assert_eq!(result.facts, vec!["学生会发布声明", "校方回应", "媒体跟进报道"]);
    }

    #[test]
    fn test_fact_cap() {
        let mut text = String::from("搜索查询: x\n找到 20 条相关信息\n### 相关事实:\n");
        for i in 1..=20 {
            text.push_str(&format!("{}. fact number {}\n", i, i));
        }
        let result = extract_quick_search(&text);
        assert_eq!(result.count, 20);
        assert_eq!(result.facts.len(), 10);
        assert_eq!(result.facts[9], "fact number 10");
    }

    #[test]
    fn test_numbered_lines_without_heading() {
        let text: String = (1..=20).map(|i| format!("{}. line {}\n", i, i)).collect();
        assert_eq!(extract_quick_search(&text).facts.len(), 10);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_quick_search(""), QuickSearchResult::default());
        assert_eq!(
            extract_quick_search("no anchors at all"),
            QuickSearchResult::default()
        );
    }
}
