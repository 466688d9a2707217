//! Server-rendered HTML for the single page.

use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

pub(crate) const UPLOAD_PROMPT: &str = "Please upload a PDF to get started.";
pub(crate) const QUESTION_PROMPT: &str = "Enter a question to ask your PDF.";
const TIP: &str = "Try asking summary-based or fact-based questions to see different routing behaviors!";

/// What the page shows below the form.
pub(crate) enum Notice<'a> {
    /// Instructional message for missing input.
    Info(&'static str),
    /// Rendered answer with the tool that produced it.
    Answer { tool: &'a str, markdown: &'a str },
    /// Raw error text from a failed request.
    Error(&'a str),
}

/// Render the full page.
pub(crate) fn render_page(question: &str, notice: Notice<'_>) -> String {
    let notice_html = match notice {
        Notice::Info(message) => format!(r#"<div class="info">{}</div>"#, encode_text(message)),
        Notice::Answer { tool, markdown } => format!(
            r#"<h2>Response</h2><p class="route">Answered by <code>{}</code></p><div class="answer">{}</div>"#,
            encode_text(tool),
            render_markdown(markdown)
        ),
        Notice::Error(message) => format!(
            r#"<div class="error"><strong>Error</strong><pre>{}</pre></div>"#,
            encode_text(message)
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>PDF Q&amp;A</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }}
.info {{ background: #e8f0fe; padding: .75rem; border-radius: .25rem; }}
.error {{ background: #fde8e8; padding: .75rem; border-radius: .25rem; }}
.error pre {{ white-space: pre-wrap; }}
#processing {{ display: none; }}
</style>
</head>
<body>
<h1>Ask Your PDF</h1>
<form method="post" action="/" enctype="multipart/form-data"
      onsubmit="document.getElementById('processing').style.display='block'">
<p><label>Upload a PDF file <input type="file" name="file" accept=".pdf,application/pdf"></label></p>
<p><label>Enter Query: <input type="text" name="question" size="60"
      placeholder="E.g., Summarize the document" value="{question}"></label></p>
<p><button type="submit">Ask</button></p>
</form>
<p id="processing">Processing...</p>
{notice_html}
<hr>
<p>Tip: {tip}</p>
</body>
</html>
"#,
        question = encode_double_quoted_attribute(question),
        tip = encode_text(TIP),
    )
}

/// Render answer Markdown, displaying any embedded raw HTML as text.
///
/// Link and image targets other than http(s), mailto and relative URLs are replaced with `#`.
pub(crate) fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: neutralize_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: neutralize_url(dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut output = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut output, events);
    output
}

fn neutralize_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        tracing::debug!(url = %url, "Dropping unsafe link target from answer");
        CowStr::Borrowed("#")
    }
}

/// Anything before the first `:` that is not cut by `/`, `?` or `#` is a scheme.
fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    let Some(colon) = url.find(':') else {
        return true;
    };
    let scheme = &url[..colon];
    if scheme.contains(['/', '?', '#']) {
        return true;
    }
    matches!(
        scheme.to_ascii_lowercase().as_str(),
        "http" | "https" | "mailto"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_is_rendered_and_html_escaped() {
        let rendered = render_markdown("**Total**: 42 <script>alert(1)</script>");
        assert!(rendered.contains("<strong>Total</strong>"));
        assert!(!rendered.contains("<script>"));
        assert!(rendered.contains("&lt;script&gt;"));
    }

    #[test]
    fn script_links_are_neutralized() {
        let rendered = render_markdown(
            "[click](javascript:alert(1)) ![img](JavaScript:x) [ok](https://example.com/a) [rel](/docs#x)",
        );
        assert!(!rendered.to_lowercase().contains("javascript:"));
        assert!(rendered.contains(r##"<a href="#">click</a>"##));
        assert!(rendered.contains(r##"<img src="#" alt="img" />"##));
        assert!(rendered.contains(r#"href="https://example.com/a""#));
        assert!(rendered.contains(r#"href="/docs#x""#));
    }

    #[test]
    fn url_schemes_are_classified() {
        assert!(is_safe_url("http://a"));
        assert!(is_safe_url("mailto:someone@example.com"));
        assert!(is_safe_url("page.html?x=a:b"));
        assert!(!is_safe_url("data:text/html;base64,AAAA"));
        assert!(!is_safe_url(" vbscript:msgbox"));
        assert!(!is_safe_url("java\tscript:alert(1)"));
    }

    #[test]
    fn question_value_is_escaped() {
        let page = render_page(r#"say "hi" <b>"#, Notice::Info(QUESTION_PROMPT));
        assert!(page.contains("value=\"say &quot;hi&quot; &lt;b&gt;\""));
        assert!(page.contains(QUESTION_PROMPT));
    }

    #[test]
    fn error_notice_shows_raw_text() {
        let page = render_page("q", Notice::Error("LLM authentication failed: <401>"));
        assert!(page.contains("LLM authentication failed: &lt;401&gt;"));
    }
}
