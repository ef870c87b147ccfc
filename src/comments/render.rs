//! Comment markup for the diff page.
//!
//! Comments are Markdown. Raw HTML in the source is shown as text, and
//! `javascript:` link targets are dropped. Mentions outside code and links
//! become profile links.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::comments::mention::link_mentions;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn is_script_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    url.starts_with("javascript:") || url.starts_with("vbscript:") || url.starts_with("data:")
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_script_url(&url) { CowStr::Borrowed("#") } else { url }
}

pub fn render_comment(content: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    // Inside code blocks and link text, mentions stay literal.
    let mut literal_depth = 0usize;

    let events = Parser::new_ext(content, options).map(|event| match event {
        Event::Start(Tag::CodeBlock(kind)) => {
            literal_depth += 1;
            Event::Start(Tag::CodeBlock(kind))
        }
        Event::End(TagEnd::CodeBlock) => {
            literal_depth = literal_depth.saturating_sub(1);
            Event::End(TagEnd::CodeBlock)
        }
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => {
            literal_depth += 1;
            Event::Start(Tag::Link { link_type, dest_url: safe_url(dest_url), title, id })
        }
        Event::End(TagEnd::Link) => {
            literal_depth = literal_depth.saturating_sub(1);
            Event::End(TagEnd::Link)
        }
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
            Event::Start(Tag::Image { link_type, dest_url: safe_url(dest_url), title, id })
        }
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Html(escape_html(&raw).into()),
        Event::Text(text) if literal_depth == 0 => {
            Event::Html(link_mentions(&escape_html(&text)).into())
        }
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}
