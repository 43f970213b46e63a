//! `insight_forge` results: multi-angle deep analysis.
//!
//! ```text
//! ## 未来预测深度分析
//! 分析问题: ...
//! - 相关预测事实: 12条
//! - 涉及实体: 5个
//! - 关系链: 3条
//! ### 分析的子问题
//! 1. ...
//! ### 【关键事实】(请在报告中引用这些原文)
//! 1. "..."
//! ### 【核心实体】
//! - **Name** (Type)
//! ### 【关系链】
//! - A --[relation]--> B
//! ```

use serde::Serialize;

use super::common::{capture_count, capture_str, numbered_items, pattern, section_body};
use super::EntityRef;
use crate::error::Result;

const TOOL: &str = "insight_forge";

const MAX_SUB_QUERIES: usize = 5;
const MAX_FACTS: usize = 10;
const MAX_ENTITIES: usize = 8;
const MAX_RELATIONS: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightForgeResult {
    pub query: String,
    pub stats: InsightStats,
    pub sub_queries: Vec<String>,
    pub facts: Vec<String>,
    pub entities: Vec<EntityRef>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsightStats {
    pub facts: u32,
    pub entities: u32,
    pub relationships: u32,
}

/// One `source --[relation]--> target` chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub source: String,
    pub relation: String,
    pub target: String,
}

/// Extract an insight record; any failure yields the empty record.
pub fn extract_insight_forge(text: &str) -> InsightForgeResult {
    parse(text).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "insight_forge extraction failed");
        InsightForgeResult::default()
    })
}

fn parse(text: &str) -> Result<InsightForgeResult> {
    // Stats lines are anchored at line start so the indented per-entity
    // "相关事实" counts further down are not picked up.
    let query = pattern!(TOOL, r"(?m)^(?:分析问题|原始问题)[:：][ \t]*(.+)$")?;
    let facts_count = pattern!(TOOL, r"(?m)^(?:-[ \t]*)?相关(?:预测)?事实[:：][ \t]*(\d+)")?;
    let entities_count = pattern!(TOOL, r"(?m)^(?:-[ \t]*)?涉及实体[:：][ \t]*(\d+)")?;
    let relations_count = pattern!(TOOL, r"(?m)^(?:-[ \t]*)?关系链[:：][ \t]*(\d+)")?;

    let sub_queries_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*分析的子问题")?;
    let facts_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*【关键事实】")?;
    let entities_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*【核心实体】")?;
    let relations_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*【关系链】")?;

    let entity_line = pattern!(TOOL, r"(?m)^[ \t]*[-*][ \t]*\*\*(.+?)\*\*[ \t]*[(（]([^)）]*)[)）]")?;
    let relation_line = pattern!(TOOL, r"(?m)^[ \t]*-[ \t]*(.+?)[ \t]*--\[(.+?)\]-->[ \t]*(.+?)[ \t]*$")?;

    let sub_queries = section_body(text, sub_queries_heading)
        .map(|body| numbered_items(body, MAX_SUB_QUERIES))
        .unwrap_or_default();

    let facts = section_body(text, facts_heading)
        .map(|body| numbered_items(body, MAX_FACTS))
        .unwrap_or_default();

    let entities = section_body(text, entities_heading)
        .map(|body| {
            entity_line
                .captures_iter(body)
                .map(|caps| EntityRef::new(&caps[1], &caps[2]))
                .filter(|entity| !entity.name.is_empty())
                .take(MAX_ENTITIES)
                .collect()
        })
        .unwrap_or_default();

    let relations = section_body(text, relations_heading)
        .map(|body| {
            relation_line
                .captures_iter(body)
                .map(|caps| Relation {
                    source: caps[1].trim().to_string(),
                    relation: caps[2].trim().to_string(),
                    target: caps[3].trim().to_string(),
                })
                .take(MAX_RELATIONS)
                .collect()
        })
        .unwrap_or_default();

    Ok(InsightForgeResult {
        query: capture_str(query, text),
        stats: InsightStats {
            facts: capture_count(facts_count, text),
            entities: capture_count(entities_count, text),
            relationships: capture_count(relations_count, text),
        },
        sub_queries,
        facts,
        entities,
        relations,
    })
}
