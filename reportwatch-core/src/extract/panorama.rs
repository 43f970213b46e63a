//! `panorama_search` results: breadth search including expired facts.

use serde::Serialize;

use super::common::{capture_count, capture_str, numbered_items, pattern, section_body};
use super::EntityRef;
use crate::error::Result;

const TOOL: &str = "panorama_search";

const MAX_FACTS: usize = 10;
const MAX_ENTITIES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanoramaResult {
    pub query: String,
    pub stats: PanoramaStats,
    pub active_facts: Vec<String>,
    pub historical_facts: Vec<String>,
    pub entities: Vec<EntityRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanoramaStats {
    pub nodes: u32,
    pub edges: u32,
    pub active_facts: u32,
    pub historical_facts: u32,
}

pub fn extract_panorama(text: &str) -> PanoramaResult {
    parse(text).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "panorama_search extraction failed");
        PanoramaResult::default()
    })
}

fn parse(text: &str) -> Result<PanoramaResult> {
    let query = pattern!(TOOL, r"(?m)^查询[:：][ \t]*(.+)$")?;
    let nodes = pattern!(TOOL, r"总节点数[:：][ \t]*(\d+)")?;
    let edges = pattern!(TOOL, r"总边数[:：][ \t]*(\d+)")?;
    let active_count = pattern!(TOOL, r"当前有效事实[:：][ \t]*(\d+)")?;
    let historical_count = pattern!(TOOL, r"历史/过期事实[:：][ \t]*(\d+)")?;

    let active_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*【当前有效事实】")?;
    let historical_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*【历史/过期事实】")?;
    let entities_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*【涉及实体】")?;
    let entity_line = pattern!(TOOL, r"(?m)^[ \t]*[-*][ \t]*\*\*(.+?)\*\*(?:[ \t]*[(（]([^)）]*)[)）])?")?;

    let facts_in = |heading: &regex::Regex| {
        section_body(text, heading)
            .map(|body| numbered_items(body, MAX_FACTS))
            .unwrap_or_default()
    };

    let entities = section_body(text, entities_heading)
        .map(|body| {
            entity_line
                .captures_iter(body)
                .map(|caps| {
                    EntityRef::new(&caps[1], caps.get(2).map(|m| m.as_str()).unwrap_or(""))
                })
                .filter(|entity| !entity.name.is_empty())
                .take(MAX_ENTITIES)
                .collect()
        })
        .unwrap_or_default();

    Ok(PanoramaResult {
        query: capture_str(query, text),
        stats: PanoramaStats {
            nodes: capture_count(nodes, text),
            edges: capture_count(edges, text),
            active_facts: capture_count(active_count, text),
            historical_facts: capture_count(historical_count, text),
        },
        active_facts: facts_in(active_heading),
        historical_facts: facts_in(historical_heading),
        entities,
    })
}
