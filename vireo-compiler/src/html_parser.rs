//! Tokenizing HTML parser.
//!
//! Scans a template left to right and reports start tags, end tags, text and
//! comments to a [`ParseHandler`]. Malformed markup is recovered from the way
//! browsers do it (implicit closing, synthesized `<br>`/`<p>`) and reported
//! through [`ParseHandler::warn`].

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use thiserror::Error;
use vireo_dom::platform::{is_non_phrasing_tag, is_plain_text_element};

const NCNAME: &str = r"[a-zA-Z_][\w\-.]*";

lazy_static! {
    static ref ATTRIBUTE: Regex = Regex::new(
        r#"^\s*([^\s"'<>/=]+)(?:\s*(=)\s*(?:"([^"]*)"+|'([^']*)'+|([^\s"'=<>`]+)))?"#
    )
    .expect("attribute pattern");
    static ref START_TAG_OPEN: Regex =
        Regex::new(&format!("^<((?:{NCNAME}:)?{NCNAME})")).expect("start tag pattern");
    static ref START_TAG_CLOSE: Regex = Regex::new(r"^\s*(/?)>").expect("tag close pattern");
    static ref END_TAG: Regex =
        Regex::new(&format!("^</((?:{NCNAME}:)?{NCNAME})[^>]*>")).expect("end tag pattern");
    static ref DOCTYPE: Regex = Regex::new(r"(?i)^<!DOCTYPE [^>]+>").expect("doctype pattern");
    static ref ENCODED_ATTR: Regex = Regex::new("&(?:lt|gt|quot|amp);").expect("entity pattern");
    static ref ENCODED_ATTR_WITH_NEWLINES: Regex =
        Regex::new("&(?:lt|gt|quot|amp|#10|#9);").expect("entity pattern");
    static ref RAW_COMMENT: Regex = Regex::new(r"(?s)<!--(.*?)-->").expect("comment pattern");
    static ref RAW_CDATA: Regex =
        Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata pattern");
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ParseWarning {
    #[error("tag <{tag}> has no matching end tag.")]
    UnmatchedStartTag { tag: String, start: usize, end: usize },
    #[error("Mal-formatted tag at end of template: \"{rest}\"")]
    MalformedTail { rest: String, start: usize },
}

impl ParseWarning {
    /// Byte offset the warning points at.
    pub fn start(&self) -> usize {
        match self {
            ParseWarning::UnmatchedStartTag { start, .. } => *start,
            ParseWarning::MalformedTail { start, .. } => *start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attr {
    pub name: String,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// Receiver of parser events. Every callback is optional.
pub trait ParseHandler {
    fn start(&mut self, _tag: &str, _attrs: Vec<Attr>, _unary: bool, _start: usize, _end: usize) {}
    fn end(&mut self, _tag: &str, _start: usize, _end: usize) {}
    fn chars(&mut self, _text: &str, _start: usize, _end: usize) {}
    fn comment(&mut self, _text: &str, _start: usize, _end: usize) {}
    fn warn(&mut self, _warning: ParseWarning) {}
}

#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Browser-like implicit closing of `<p>` and repeated left-open tags.
    pub expect_html: bool,
    pub is_unary_tag: fn(&str) -> bool,
    pub can_be_left_open_tag: fn(&str) -> bool,
    pub should_keep_comment: bool,
    pub should_decode_newlines: bool,
    pub should_decode_newlines_for_href: bool,
}

fn no(_: &str) -> bool {
    false
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            expect_html: false,
            is_unary_tag: no,
            can_be_left_open_tag: no,
            should_keep_comment: false,
            should_decode_newlines: false,
            should_decode_newlines_for_href: false,
        }
    }
}

#[derive(Debug, Clone)]
struct StackFrame {
    tag: String,
    lower_cased_tag: String,
    start: usize,
    end: usize,
}

struct StartTagMatch {
    tag_name: String,
    attrs: Vec<RawAttr>,
    start: usize,
    end: usize,
    unary_slash: bool,
}

struct RawAttr {
    name: String,
    value: String,
    start: usize,
    end: usize,
}

/// Scan state for one template. Nothing is shared between parsers.
pub struct HtmlParser<'a, H: ParseHandler> {
    html: &'a str,
    options: &'a ParserOptions,
    handler: &'a mut H,
    index: usize,
    stack: Vec<StackFrame>,
    last_tag: Option<String>,
    raw_text_matchers: HashMap<String, Regex>,
}

pub fn parse_html<H: ParseHandler>(html: &str, options: &ParserOptions, handler: &mut H) {
    HtmlParser::new(html, options, handler).parse();
}

impl<'a, H: ParseHandler> HtmlParser<'a, H> {
    pub fn new(html: &'a str, options: &'a ParserOptions, handler: &'a mut H) -> Self {
        HtmlParser {
            html,
            options,
            handler,
            index: 0,
            stack: Vec::new(),
            last_tag: None,
            raw_text_matchers: HashMap::new(),
        }
    }

    pub fn parse(mut self) {
        let html = self.html;
        while self.index < html.len() {
            let last = self.index;
            let in_raw_text = self.last_tag.as_deref().is_some_and(is_plain_text_element);
            if in_raw_text {
                self.parse_raw_text();
            } else {
                self.parse_markup();
            }

            if self.index == last {
                let rest = &html[self.index..];
                self.handler.chars(rest, self.index, html.len());
                if cfg!(debug_assertions) && !self.stack.is_empty() {
                    self.handler.warn(ParseWarning::MalformedTail {
                        rest: rest.to_string(),
                        start: self.index,
                    });
                }
                self.index = html.len();
                break;
            }
        }

        // clean up any remaining tags
        let end = self.index;
        self.parse_end_tag(None, end, end);
    }

    fn advance(&mut self, n: usize) {
        self.index += n;
    }

    fn parse_markup(&mut self) {
        let html = self.html;
        let rest = &html[self.index..];
        let text_end = rest.find('<');

        if text_end == Some(0) {
            if rest.starts_with("<!--") {
                if let Some(comment_end) = comment_close(rest) {
                    if self.options.should_keep_comment {
                        self.handler.comment(
                            rest.get(4..comment_end).unwrap_or_default(),
                            self.index,
                            self.index + comment_end + 3,
                        );
                    }
                    self.advance(comment_end + 3);
                    return;
                }
            }

            // downlevel-revealed conditional comments
            if rest.starts_with("<![") {
                if let Some(cond_end) = rest.find("]>") {
                    self.advance(cond_end + 2);
                    return;
                }
            }

            if let Some(m) = DOCTYPE.find(rest) {
                self.advance(m.end());
                return;
            }

            if let Some(caps) = END_TAG.captures(rest) {
                let cur = self.index;
                self.advance(caps[0].len());
                self.parse_end_tag(Some(&caps[1]), cur, self.index);
                return;
            }

            if let Some(m) = self.parse_start_tag() {
                let tag = m.tag_name.clone();
                self.advance(m.end - m.start);
                self.handle_start_tag(m);
                if should_ignore_first_newline(&tag, &html[self.index..]) {
                    self.advance(1);
                }
                return;
            }
        }

        let text = match text_end {
            Some(mut text_end) => {
                let mut rest = &rest[text_end..];
                while !END_TAG.is_match(rest)
                    && !START_TAG_OPEN.is_match(rest)
                    && !rest.starts_with("<!--")
                    && !rest.starts_with("<![")
                {
                    // a lone '<' is plain text
                    let Some(next) = rest[1..].find('<') else {
                        break;
                    };
                    text_end += next + 1;
                    rest = &rest[next + 1..];
                }
                &html[self.index..self.index + text_end]
            }
            None => rest,
        };

        if !text.is_empty() {
            let start = self.index;
            self.advance(text.len());
            self.handler.chars(text, start, self.index);
        }
    }

    fn parse_raw_text(&mut self) {
        let html = self.html;
        let Some(tag) = self.last_tag.as_deref() else {
            return;
        };
        let stacked_tag = tag.to_ascii_lowercase();
        let matcher = self.raw_text_matcher(&stacked_tag);

        let start = self.index;
        let mut end_tag_length = 0;
        if let Some(caps) = matcher.captures(&html[start..]) {
            let body = &caps[1];
            end_tag_length = caps[2].len();
            let mut text = body.to_string();
            if !is_plain_text_element(&stacked_tag) && stacked_tag != "noscript" {
                text = RAW_COMMENT.replace_all(&text, "$1").into_owned();
                text = RAW_CDATA.replace_all(&text, "$1").into_owned();
            }
            if should_ignore_first_newline(&stacked_tag, &text) {
                text.remove(0);
            }
            if !text.is_empty() {
                self.handler.chars(&text, start, start + body.len());
            }
            self.advance(caps[0].len());
        }
        let end = self.index;
        self.parse_end_tag(Some(&stacked_tag), end - end_tag_length, end);
    }

    fn raw_text_matcher(&mut self, tag: &str) -> Regex {
        if let Some(re) = self.raw_text_matchers.get(tag) {
            return re.clone();
        }
        let pattern = format!(r"(?is)^(.*?)(</{}[^>]*>)", regex::escape(tag));
        let re = Regex::new(&pattern).expect("escaped tag name forms a valid pattern");
        self.raw_text_matchers.insert(tag.to_string(), re.clone());
        re
    }

    /// Matches a start tag at the current position without consuming it.
    fn parse_start_tag(&self) -> Option<StartTagMatch> {
        let html = self.html;
        let caps = START_TAG_OPEN.captures(&html[self.index..])?;
        let tag_name = caps[1].to_string();
        let mut pos = self.index + caps[0].len();
        let mut attrs = Vec::new();
        loop {
            let rest = &html[pos..];
            if let Some(close) = START_TAG_CLOSE.captures(rest) {
                let unary_slash = !close[1].is_empty();
                pos += close[0].len();
                return Some(StartTagMatch {
                    tag_name,
                    attrs,
                    start: self.index,
                    end: pos,
                    unary_slash,
                });
            }
            let attr = ATTRIBUTE.captures(rest)?;
            let full = &attr[0];
            let leading_ws = full.len() - full.trim_start().len();
            attrs.push(RawAttr {
                name: attr[1].to_string(),
                value: attr_value(&attr),
                start: pos + leading_ws,
                end: pos + full.len(),
            });
            pos += full.len();
        }
    }

    fn handle_start_tag(&mut self, m: StartTagMatch) {
        let tag_name = m.tag_name;
        if self.options.expect_html {
            if self.last_tag.as_deref() == Some("p") && is_non_phrasing_tag(&tag_name) {
                let at = self.index;
                self.parse_end_tag(Some("p"), at, at);
            }
            if (self.options.can_be_left_open_tag)(&tag_name)
                && self.last_tag.as_deref() == Some(tag_name.as_str())
            {
                let at = self.index;
                self.parse_end_tag(Some(&tag_name), at, at);
            }
        }

        let unary = (self.options.is_unary_tag)(&tag_name) || m.unary_slash;

        let attrs: Vec<Attr> = m
            .attrs
            .into_iter()
            .map(|a| {
                let decode_newlines = if tag_name == "a" && a.name == "href" {
                    self.options.should_decode_newlines_for_href
                } else {
                    self.options.should_decode_newlines
                };
                Attr {
                    value: decode_attr(&a.value, decode_newlines),
                    name: a.name,
                    start: a.start,
                    end: a.end,
                }
            })
            .collect();

        if !unary {
            self.stack.push(StackFrame {
                lower_cased_tag: tag_name.to_ascii_lowercase(),
                tag: tag_name.clone(),
                start: m.start,
                end: m.end,
            });
            self.last_tag = Some(tag_name.clone());
        }

        self.handler.start(&tag_name, attrs, unary, m.start, m.end);
    }

    /// Closes the nearest open `tag_name`, or everything when `None`.
    fn parse_end_tag(&mut self, tag_name: Option<&str>, start: usize, end: usize) {
        let lower = tag_name.map(str::to_ascii_lowercase);
        let pos = match &lower {
            Some(lower) => self
                .stack
                .iter()
                .rposition(|frame| &frame.lower_cased_tag == lower),
            None => Some(0),
        };

        match pos {
            Some(pos) => {
                for i in (pos..self.stack.len()).rev() {
                    let frame = &self.stack[i];
                    if cfg!(debug_assertions) && (i > pos || tag_name.is_none()) {
                        self.handler.warn(ParseWarning::UnmatchedStartTag {
                            tag: frame.tag.clone(),
                            start: frame.start,
                            end: frame.end,
                        });
                    }
                    self.handler.end(&frame.tag, start, end);
                }
                self.stack.truncate(pos);
                self.last_tag = self.stack.last().map(|f| f.tag.clone());
            }
            None => {
                let Some(tag) = tag_name else {
                    return;
                };
                match lower.as_deref() {
                    Some("br") => self.handler.start(tag, Vec::new(), true, start, end),
                    Some("p") => {
                        self.handler.start(tag, Vec::new(), false, start, end);
                        self.handler.end(tag, start, end);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn attr_value(caps: &Captures<'_>) -> String {
    caps.get(3)
        .or_else(|| caps.get(4))
        .or_else(|| caps.get(5))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Offset of the `-->` closing the comment that opens `rest`. `<!-->` and
/// `<!--->` close immediately.
fn comment_close(rest: &str) -> Option<usize> {
    let body = &rest[4..];
    if body.starts_with('>') {
        Some(2)
    } else if body.starts_with("->") {
        Some(3)
    } else {
        body.find("-->").map(|i| i + 4)
    }
}

fn should_ignore_first_newline(tag: &str, text: &str) -> bool {
    matches!(tag, "pre" | "textarea") && text.starts_with('\n')
}

fn decode_attr(value: &str, decode_newlines: bool) -> String {
    let re: &Regex = if decode_newlines {
        &ENCODED_ATTR_WITH_NEWLINES
    } else {
        &ENCODED_ATTR
    };
    re.replace_all(value, |caps: &Captures<'_>| {
        match &caps[0] {
            "&lt;" => "<",
            "&gt;" => ">",
            "&quot;" => "\"",
            "&amp;" => "&",
            "&#10;" => "\n",
            "&#9;" => "\t",
            other => other,
        }
        .to_string()
    })
    .into_owned()
}

/// One parser callback, as recorded by [`EventRecorder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ParseEvent {
    Start {
        tag: String,
        attrs: Vec<Attr>,
        unary: bool,
        start: usize,
        end: usize,
    },
    End {
        tag: String,
        start: usize,
        end: usize,
    },
    Chars {
        text: String,
    },
    Comment {
        text: String,
    },
    Warn {
        message: String,
    },
}

/// Handler that keeps every event in order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<ParseEvent>,
}

impl EventRecorder {
    pub fn warnings(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Warn { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl ParseHandler for EventRecorder {
    fn start(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, start: usize, end: usize) {
        self.events.push(ParseEvent::Start {
            tag: tag.to_string(),
            attrs,
            unary,
            start,
            end,
        });
    }

    fn end(&mut self, tag: &str, start: usize, end: usize) {
        self.events.push(ParseEvent::End {
            tag: tag.to_string(),
            start,
            end,
        });
    }

    fn chars(&mut self, text: &str, _start: usize, _end: usize) {
        self.events.push(ParseEvent::Chars {
            text: text.to_string(),
        });
    }

    fn comment(&mut self, text: &str, _start: usize, _end: usize) {
        self.events.push(ParseEvent::Comment {
            text: text.to_string(),
        });
    }

    fn warn(&mut self, warning: ParseWarning) {
        tracing::debug!(offset = warning.start(), "{warning}");
        self.events.push(ParseEvent::Warn {
            message: warning.to_string(),
        });
    }
}
