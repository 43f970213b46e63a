//! Minimal markdown to HTML renderer for generated section bodies.
//!
//! This is an ordered list of global substitutions, not a CommonMark parser.
//! Block passes run before inline emphasis so list and quote markers are
//! consumed first, and paragraph wrapping runs last so the cleanup pass can
//! pull block elements back out of the paragraphs.
//!
//! Rendering is total: a pass whose pattern cannot be used is skipped.

use regex::{Regex, Replacer};

use crate::error::Result;
use crate::extract::common::pattern;

const PASS: &str = "markdown";

/// Stand-in for newlines inside fenced code so line-based passes skip them
const CODE_NEWLINE: char = '\u{1}';

const PARAGRAPH_OPEN: &str = r#"<p class="md-p">"#;

/// Render markdown `text` to HTML.
pub fn render(text: &str) -> String {
    let mut html = escape_html(&text.replace("\r\n", "\n"));

    html = substitute(
        html,
        pattern!(PASS, r"(?s)```[A-Za-z0-9_+-]*[ \t]*\n?(.*?)```"),
        |caps: &regex::Captures| {
            let code = caps[1].trim_end_matches('\n').replace('\n', &CODE_NEWLINE.to_string());
            format!(r#"<pre class="code-block"><code>{}</code></pre>"#, code)
        },
    );
    html = substitute(
        html,
        pattern!(PASS, r"`([^`\n]+)`"),
        r#"<code class="inline-code">${1}</code>"#,
    );

    html = substitute(html, pattern!(PASS, r"(?m)^#### (.+)$"), r#"<h5 class="md-h5">${1}</h5>"#);
    html = substitute(html, pattern!(PASS, r"(?m)^### (.+)$"), r#"<h4 class="md-h4">${1}</h4>"#);
    html = substitute(html, pattern!(PASS, r"(?m)^## (.+)$"), r#"<h3 class="md-h3">${1}</h3>"#);
    html = substitute(html, pattern!(PASS, r"(?m)^# (.+)$"), r#"<h2 class="md-h2">${1}</h2>"#);

    html = substitute(
        html,
        pattern!(PASS, r"(?m)^&gt; ?(.*)$"),
        r#"<blockquote class="md-quote">${1}</blockquote>"#,
    );

    html = substitute(
        html,
        pattern!(PASS, r"(?m)^[ \t]*[-*] (.+)$"),
        r#"<li class="md-li">${1}</li>"#,
    );
    html = substitute(
        html,
        pattern!(PASS, r#"(?:<li class="md-li">[^\n]*</li>\n?)+"#),
        |caps: &regex::Captures| wrap_run("ul", "md-ul", &caps[0]),
    );

    html = substitute(
        html,
        pattern!(PASS, r"(?m)^[ \t]*\d+\. (.+)$"),
        r#"<li class="md-oli">${1}</li>"#,
    );
    html = substitute(
        html,
        pattern!(PASS, r#"(?:<li class="md-oli">[^\n]*</li>\n?)+"#),
        |caps: &regex::Captures| wrap_run("ol", "md-ol", &caps[0]),
    );

    html = substitute(html, pattern!(PASS, r"\*\*(.+?)\*\*"), "<strong>${1}</strong>");
    html = substitute(html, pattern!(PASS, r"\*([^*\n]+?)\*"), "<em>${1}</em>");
    // `_x_` only counts at a word start, so snake_case names survive.
    html = substitute(
        html,
        pattern!(PASS, r"(^|[^A-Za-z0-9_])_([^_\n]+?)_"),
        "${1}<em>${2}</em>",
    );

    html = substitute(html, pattern!(PASS, r"(?m)^---[ \t]*$"), r#"<hr class="md-hr">"#);

    html = substitute(
        html,
        pattern!(PASS, r"\n(?:[ \t]*\n)+"),
        format!("</p>{}", PARAGRAPH_OPEN).as_str(),
    );
    html = html.replace('\n', "<br>");

    html = format!("{}{}</p>", PARAGRAPH_OPEN, html);

    cleanup(html).replace(CODE_NEWLINE, "\n")
}

/// Take block elements out of the paragraphs that enclose them.
fn cleanup(html: String) -> String {
    let mut html = substitute(
        html,
        pattern!(PASS, r"(?:<br>)+(<(?:h[2-5]|ul|ol|blockquote|pre|hr)[ >])"),
        "${1}",
    );
    html = substitute(
        html,
        pattern!(PASS, r#"(</(?:h[2-5]|ul|ol|blockquote|pre)>|<hr class="md-hr">)(?:<br>)+"#),
        "${1}",
    );

    html = substitute(
        html,
        pattern!(
            PASS,
            r#"(?P<hr><hr class="md-hr">)|(?P<open><(?:h[2-5]|ul|ol|blockquote|pre)[ >])|(?P<close></(?:h[2-5]|ul|ol|blockquote|pre)>)"#
        ),
        |caps: &regex::Captures| {
            if let Some(hr) = caps.name("hr") {
                format!("</p>{}{}", hr.as_str(), PARAGRAPH_OPEN)
            } else if let Some(open) = caps.name("open") {
                format!("</p>{}", open.as_str())
            } else {
                format!("{}{}", &caps[0], PARAGRAPH_OPEN)
            }
        },
    );

    substitute(
        html,
        pattern!(PASS, r#"<p class="md-p">(?:<br>|\s)*</p>"#),
        "",
    )
}

fn wrap_run(tag: &str, class: &str, run: &str) -> String {
    format!(
        r#"<{tag} class="{class}">{items}</{tag}>"#,
        tag = tag,
        class = class,
        items = run.replace('\n', "")
    )
}

/// Escape text for use in HTML element content or a quoted attribute
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Apply one pass, or skip it when its pattern is unavailable.
fn substitute<R: Replacer>(html: String, re: Result<&'static Regex>, replacement: R) -> String {
    match re {
        Ok(re) => re.replace_all(&html, replacement).into_owned(),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping markdown pass");
            html
        }
    }
}
