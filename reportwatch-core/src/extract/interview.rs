//! `interview_agents` results: transcripts of simulated-agent interviews.
//!
//! The transcript is parsed in two phases. The document is first cut into
//! the selection reason, the interview records (split on `#### 采访 #`) and
//! the closing summary. Each record is then scanned for its own fields:
//!
//! ```text
//! #### 采访 #1: 学生代表
//! **张三** (学生)
//! _简介: ..._
//!
//! **Q:** 1. 第一个问题
//! 2. 第二个问题
//!
//! **A:** 【Twitter平台回答】
//! 问题1：...
//!
//! 【Reddit平台回答】
//! ...
//!
//! **关键引言:**
//! > "..."
//! ```

use serde::Serialize;

use super::common::{block_end, capture_str, clean_item, pattern, section_body};
use crate::error::Result;

const TOOL: &str = "interview_agents";

const RECORD_DELIMITER: &str = "#### 采访 #";
const TWITTER_MARKER: &str = "【Twitter平台回答】";
const REDDIT_MARKER: &str = "【Reddit平台回答】";
/// Written by the backend when a platform produced no reply
const NO_REPLY_PLACEHOLDER: &str = "（该平台未获得回复）";

const MAX_QUOTES: usize = 3;
const MIN_QUOTE_CHARS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewResult {
    pub topic: String,
    pub success_count: u32,
    pub total_count: u32,
    pub selection_reason: String,
    pub interviews: Vec<InterviewRecord>,
    pub summary: String,
}

/// One interviewed agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRecord {
    pub num: u32,
    pub title: String,
    pub name: String,
    pub role: String,
    pub bio: String,
    pub questions: Vec<String>,
    pub twitter_answer: String,
    pub reddit_answer: String,
    pub quotes: Vec<String>,
}

impl InterviewRecord {
    /// Whether both platforms answered
    pub fn is_dual_platform(&self) -> bool {
        !self.twitter_answer.is_empty() && !self.reddit_answer.is_empty()
    }

    /// Per-question answers for one platform's reply.
    pub fn split_answers(&self, answer: &str) -> Vec<String> {
        split_answer(answer, self.questions.len())
    }
}

pub fn extract_interview(text: &str) -> InterviewResult {
    parse(text).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "interview_agents extraction failed");
        InterviewResult::default()
    })
}

fn parse(text: &str) -> Result<InterviewResult> {
    let topic = pattern!(TOOL, r"\*\*采访主题[:：]?\*\*[:：]?[ \t]*(.+)")?;
    let counts = pattern!(TOOL, r"\*\*采访人数[:：]?\*\*[:：]?[ \t]*(\d+)[ \t]*/[ \t]*(\d+)")?;
    let reason_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*采访对象选择理由")?;
    let summary_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*采访摘要与核心观点")?;
    let transcript_heading = pattern!(TOOL, r"(?m)^#{2,4}[ \t]*采访实录")?;

    let (success_count, total_count) = counts
        .captures(text)
        .map(|caps| {
            (
                caps[1].parse().unwrap_or(0),
                caps[2].parse().unwrap_or(0),
            )
        })
        .unwrap_or((0, 0));

    let selection_reason = section_body(text, reason_heading)
        .map(|body| body.trim().to_string())
        .unwrap_or_default();

    let summary = match summary_heading.find(text) {
        Some(found) => text[found.end()..]
            .split_once('\n')
            .map(|(_, rest)| rest.trim().to_string())
            .unwrap_or_default(),
        None => String::new(),
    };

    // Records live between the transcript heading and the summary heading.
    let start = transcript_heading
        .find(text)
        .map(|found| found.end())
        .unwrap_or(0);
    let end = summary_heading
        .find(text)
        .map(|found| found.start())
        .filter(|end| *end >= start)
        .unwrap_or(text.len());

    let mut interviews = Vec::new();
    for chunk in text[start..end].split(RECORD_DELIMITER).skip(1) {
        let record = parse_record(chunk)?;
        if record.name.is_empty() && record.title.is_empty() {
            continue;
        }
        interviews.push(record);
    }

    Ok(InterviewResult {
        topic: capture_str(topic, text),
        success_count,
        total_count,
        selection_reason,
        interviews,
        summary,
    })
}

fn parse_record(chunk: &str) -> Result<InterviewRecord> {
    let header = pattern!(TOOL, r"\A(\d+)[ \t]*[:：]?[ \t]*(.*)")?;
    let identity = pattern!(TOOL, r"(?m)^\*\*([^*\n]+?)\*\*[ \t]*[(（]([^)）\n]*)[)）]")?;
    // Bios can span lines; the block form runs to the closing `_`.
    let bio_block = pattern!(TOOL, r"(?sm)^_简介[:：][ \t]*(.{0,1000}?)_[ \t]*$")?;
    let bio_line = pattern!(TOOL, r"(?m)^_简介[:：][ \t]*(.*?)_?[ \t]*$")?;
    let question_marker = pattern!(TOOL, r"\*\*Q[:：]?\*\*[:：]?")?;
    let answer_marker = pattern!(TOOL, r"\*\*A[:：]?\*\*[:：]?")?;
    let quotes_marker = pattern!(TOOL, r"\*\*关键引言[:：]?\*\*[:：]?")?;
    let numbered_question = pattern!(TOOL, r"(?m)^[ \t]*\d+[.、．][ \t]*(.+)$")?;

    let (num, title) = header
        .captures(chunk)
        .map(|caps| {
            (
                caps[1].parse().unwrap_or(0),
                caps[2].trim().to_string(),
            )
        })
        .unwrap_or_default();

    let (name, role) = identity
        .captures(chunk)
        .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()))
        .unwrap_or_default();

    let question_start = question_marker.find(chunk).map(|m| m.end());
    let answer_pos = answer_marker.find(chunk);
    let quotes_pos = quotes_marker.find(chunk);

    let questions = match question_start {
        Some(q_start) => {
            let q_end = answer_pos
                .map(|m| m.start())
                .filter(|end| *end >= q_start)
                .unwrap_or(chunk.len());
            let block = chunk[q_start..q_end].trim();
            let numbered: Vec<String> = numbered_question
                .captures_iter(block)
                .map(|caps| caps[1].trim().to_string())
                .filter(|q| !q.is_empty())
                .collect();
            if numbered.is_empty() && !block.is_empty() {
                vec![block.to_string()]
            } else {
                numbered
            }
        }
        None => Vec::new(),
    };

    let answer = match answer_pos {
        Some(found) => {
            let rest = &chunk[found.end()..];
            let a_end = quotes_pos
                .map(|m| m.start())
                .filter(|end| *end >= found.end())
                .map(|end| end - found.end())
                .unwrap_or_else(|| record_tail(rest));
            rest[..a_end].trim()
        }
        None => "",
    };
    let (twitter_answer, reddit_answer) = split_platforms(answer);

    let quotes = match quotes_pos {
        Some(found) => {
            let rest = &chunk[found.end()..];
            collect_quotes(&rest[..record_tail(rest)])
        }
        None => Vec::new(),
    };

    let bio = match capture_str(bio_block, chunk) {
        block if !block.is_empty() => block,
        _ => capture_str(bio_line, chunk),
    };

    Ok(InterviewRecord {
        num,
        title,
        name,
        role,
        bio,
        questions,
        twitter_answer,
        reddit_answer,
        quotes,
    })
}

/// Length of `rest` up to the record's closing `---` rule.
fn record_tail(rest: &str) -> usize {
    block_end(rest)
}

/// Separate the two labelled platform replies.
///
/// An unlabelled answer is treated as the Twitter reply.
fn split_platforms(answer: &str) -> (String, String) {
    let twitter_at = answer.find(TWITTER_MARKER);
    let reddit_at = answer.find(REDDIT_MARKER);

    let (twitter, reddit) = match (twitter_at, reddit_at) {
        (None, None) => (answer, ""),
        (Some(t), None) => (&answer[t + TWITTER_MARKER.len()..], ""),
        (None, Some(r)) => (&answer[..r], &answer[r + REDDIT_MARKER.len()..]),
        (Some(t), Some(r)) if t < r => (
            &answer[t + TWITTER_MARKER.len()..r],
            &answer[r + REDDIT_MARKER.len()..],
        ),
        (Some(t), Some(r)) => (
            &answer[t + TWITTER_MARKER.len()..],
            &answer[r + REDDIT_MARKER.len()..t],
        ),
    };

    (clean_answer(twitter), clean_answer(reddit))
}

fn clean_answer(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == NO_REPLY_PLACEHOLDER {
        return String::new();
    }
    unwrap_tool_call(trimmed).unwrap_or_else(|| trimmed.to_string())
}

/// Unwrap a reply that is a raw tool-call envelope
/// (`{"tool_name": ..., "arguments": {"content": ...}}`).
fn unwrap_tool_call(answer: &str) -> Option<String> {
    if !answer.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(answer).ok()?;
    let content = value
        .get("arguments")
        .and_then(|args| args.get("content"))
        .or_else(|| value.get("content"))?
        .as_str()?;
    Some(content.trim().to_string())
}

fn collect_quotes(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.trim().strip_prefix('>'))
        .map(clean_quote)
        .filter(|quote| keep_quote(quote))
        .take(MAX_QUOTES)
        .collect()
}

fn clean_quote(raw: &str) -> String {
    let quote = clean_item(raw);
    quote
        .trim_start_matches(|c: char| "，,；;：:、。！？".contains(c) || c.is_whitespace())
        .to_string()
}

/// Quotes that leak question numbering or are too short are noise.
fn keep_quote(quote: &str) -> bool {
    let leaks_numbering = quote
        .match_indices("问题")
        .any(|(at, marker)| {
            quote[at + marker.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        });
    !leaks_numbering && quote.chars().count() >= MIN_QUOTE_CHARS
}

/// Split one concatenated answer into `question_count` parts.
///
/// Parts are located by the markers for questions 2..N, either `问题k：`
/// or a `k.` at the start of a line, searched in order. When a marker is
/// missing or every part comes out empty, the whole answer is returned as
/// the answer to the first question and the rest are left empty.
pub fn split_answer(answer: &str, question_count: usize) -> Vec<String> {
    let answer = answer.trim();
    if question_count <= 1 {
        return vec![strip_question_prefix(answer, 1).to_string()];
    }

    let fallback = || {
        let mut parts = vec![String::new(); question_count];
        parts[0] = answer.to_string();
        parts
    };

    let mut bounds = Vec::with_capacity(question_count);
    let mut search_from = 0;
    for k in 2..=question_count {
        match find_marker(answer, k, search_from) {
            Some(at) => {
                bounds.push(at);
                search_from = at + answer[at..].chars().next().map_or(1, char::len_utf8);
            }
            None => return fallback(),
        }
    }

    bounds.push(answer.len());

    let mut parts = Vec::with_capacity(question_count);
    let mut start = 0;
    for (i, end) in bounds.into_iter().enumerate() {
        let part = strip_question_prefix(&answer[start..end], i + 1);
        parts.push(part.trim().to_string());
        start = end;
    }

    if parts.iter().all(String::is_empty) {
        return fallback();
    }
    parts
}

/// Byte offset of the marker for question `k` at or after `from`
fn find_marker(answer: &str, k: usize, from: usize) -> Option<usize> {
    let haystack = answer.get(from..)?;
    let labelled = [format!("问题{}：", k), format!("问题{}:", k)]
        .iter()
        .filter_map(|marker| haystack.find(marker.as_str()))
        .min();
    if let Some(at) = labelled {
        return Some(from + at);
    }

    let enumerated = format!("{}.", k);
    haystack
        .match_indices(enumerated.as_str())
        .find(|(at, _)| *at == 0 || haystack[..*at].ends_with('\n'))
        .map(|(at, _)| from + at)
}

fn strip_question_prefix(part: &str, k: usize) -> &str {
    let part = part.trim();
    for marker in [
        format!("问题{}：", k),
        format!("问题{}:", k),
        format!("{}.", k),
    ] {
        if let Some(rest) = part.strip_prefix(marker.as_str()) {
            return rest.trim_start();
        }
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"## 深度采访报告
**采访主题:** 校园政策调整的影响
**采访人数:** 2 / 5 位模拟Agent

### 采访对象选择理由
选择了立场差异最大的两位代表。

---

### 采访实录

#### 采访 #1: 学生代表
**张三** (学生)
_简介: 大三学生，关注校园政策_

**Q:** 1. 你如何看待新政策？
2. 你会采取什么行动？

**A:** 【Twitter平台回答】
问题1：我认为新政策过于仓促。
问题2：我会联系学生会反映意见。

【Reddit平台回答】
问题1：总体上持保留态度。
问题2：先观望一段时间。

**关键引言:**
> "我认为新政策过于仓促，缺乏充分讨论"
> "问题2：我会联系学生会反映意见"
> "太短了"

---

#### 采访 #2: 教师代表
**李四** (教师)
_简介: 资深讲师_

**Q:** 新政策对教学有何影响？

**A:** {"tool_name": "reply", "arguments": {"content": "影响有限，但需要时间适应。"}}

---

### 采访摘要与核心观点
学生普遍担忧，教师相对平静。"#;

    #[test]
    fn test_header_fields() {
        let result = extract_interview(SAMPLE);
        assert_eq!(result.topic, "校园政策调整的影响");
        assert_eq!(result.success_count, 2);
        assert_eq!(result.total_count, 5);
        assert_eq!(result.selection_reason, "选择了立场差异最大的两位代表。");
        assert_eq!(result.summary, "学生普遍担忧，教师相对平静。");
        assert_eq!(result.interviews.len(), 2);
    }

    #[test]
    fn test_dual_platform_record() {
        let result = extract_interview(SAMPLE);
        let record = &result.interviews[0];
        assert_eq!(record.num, 1);
        assert_eq!(record.title, "学生代表");
        assert_eq!(record.name, "张三");
        assert_eq!(record.role, "学生");
        assert_eq!(record.bio, "大三学生，关注校园政策");
        assert_eq!(record.questions, vec!["你如何看待新政策？", "你会采取什么行动？"]);
        assert!(record.is_dual_platform());
        assert!(record.twitter_answer.starts_with("问题1：我认为"));
        assert!(record.reddit_answer.ends_with("先观望一段时间。"));

        let parts = record.split_answers(&record.twitter_answer);
        assert_eq!(parts, vec!["我认为新政策过于仓促。", "我会联系学生会反映意见。"]);
    }

    #[test]
    fn test_quotes_are_filtered() {
        let result = extract_interview(SAMPLE);
        assert_eq!(
            result.interviews[0].quotes,
            vec!["我认为新政策过于仓促，缺乏充分讨论"]
        );
    }

    #[test]
    fn test_tool_call_envelope_is_unwrapped() {
        let result = extract_interview(SAMPLE);
        let record = &result.interviews[1];
        assert_eq!(record.questions, vec!["新政策对教学有何影响？"]);
        assert_eq!(record.twitter_answer, "影响有限，但需要时间适应。");
        assert_eq!(record.reddit_answer, "");
        assert!(record.quotes.is_empty());
    }

    #[test]
    fn test_no_reply_placeholder_is_empty() {
        let (twitter, reddit) =
            split_platforms("【Twitter平台回答】\n好的\n\n【Reddit平台回答】\n（该平台未获得回复）");
        assert_eq!(twitter, "好的");
        assert_eq!(reddit, "");
    }

    #[test]
    fn test_multiline_bio_is_kept_whole() {
        let text = "### 采访实录\n#### 采访 #1: 家长代表\n**王五** (家长)\n_简介: 两个孩子的家长\n长期关注住宿安全_\n\n**Q:** 看法？\n\n**A:** 支持。\n";
        let result = extract_interview(text);
        assert_eq!(result.interviews.len(), 1);
        assert_eq!(result.interviews[0].bio, "两个孩子的家长\n长期关注住宿安全");
    }

    #[test]
    fn test_unterminated_bio_stays_on_its_line() {
        let text = "### 采访实录\n#### 采访 #1: 家长代表\n**王五** (家长)\n_简介: 两个孩子的家长\n\n**Q:** 看法？\n\n**A:** 支持。\n";
        let result = extract_interview(text);
        assert_eq!(result.interviews[0].bio, "两个孩子的家长");
    }

    #[test]
    fn test_record_without_identity_is_dropped() {
        let text = "### 采访实录\n#### 采访 #\n**Q:** 问\n**A:** 答\n---\n";
        assert!(extract_interview(text).interviews.is_empty());
    }

    #[test]
    fn test_split_answer_with_enumerated_markers() {
        let parts = split_answer("1. first\n2. second\n3. third", 3);
        assert_eq!(parts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_split_answer_falls_back_when_markers_missing() {
        let parts = split_answer("问题1：only one answer here", 3);
        assert_eq!(parts, vec!["问题1：only one answer here", "", ""]);
    }

    #[test]
    fn test_split_answer_falls_back_when_parts_empty() {
        let parts = split_answer("问题2：问题3：", 3);
        assert_eq!(parts, vec!["问题2：问题3：", "", ""]);
    }

    #[test]
    fn test_split_answer_single_question() {
        assert_eq!(split_answer("问题1：just this", 1), vec!["just this"]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_interview(""), InterviewResult::default());
        assert_eq!(
            extract_interview("plain text without anchors"),
            InterviewResult::default()
        );
    }
}
