use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use thiserror::Error;

use crate::html_parser::{Attr, ParseHandler, ParseWarning, parse_html};
use crate::options::{CompilerOptions, base_options};
use crate::template_ast::{AttrKind, Element, Node, Span, TemplateAttr};

lazy_static! {
    static ref HTML_ENTITY: Regex =
        Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity pattern");
}

/// Authoring problems found while building the AST.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum TemplateError {
    #[error("Component template requires a root element, rather than just text.")]
    TextOnlyTemplate,
    #[error("Component template requires a root element.")]
    NoRootElement,
    #[error("text \"{0}\" outside root element will be ignored.")]
    TextOutsideRoot(String),
    #[error(
        "Component template should contain exactly one root element. \
         If you are using v-if on multiple elements, use v-else-if to chain them instead."
    )]
    MultipleRoots,
    #[error("Cannot use <{0}> as component root element because it may contain multiple nodes.")]
    MultiNodeRoot(String),
    #[error(
        "Cannot use v-for on stateful component root element because it renders multiple elements."
    )]
    ForOnRoot,
    #[error("{raw} used on element <{tag}> without corresponding v-if.")]
    ElseWithoutIf { raw: String, tag: String },
    #[error("text \"{0}\" between v-if and v-else(-if) will be ignored.")]
    TextBetweenBranches(String),
    #[error(
        "Templates should only be responsible for mapping the state to the UI. \
         Avoid placing tags with side-effects in your templates, such as <{0}>, \
         as they will not be parsed."
    )]
    SideEffectTag(String),
    #[error("duplicate attribute: {0}")]
    DuplicateAttribute(String),
    #[error(
        "{0}: Interpolation inside attributes has been removed. \
         Use v-bind or the colon shorthand instead."
    )]
    InterpolationInAttribute(String),
    #[error(transparent)]
    Markup(#[from] ParseWarning),
}

struct OpenElement {
    el: Element,
    /// Parsed for stack bookkeeping but left out of the tree.
    dropped: bool,
    v_pre_root: bool,
}

/// Builds the template AST from parser events.
pub struct AstBuilder<'a> {
    template: &'a str,
    options: &'a CompilerOptions,
    warn: &'a mut dyn FnMut(String, bool),
    stack: Vec<OpenElement>,
    roots: Vec<Node>,
    pre_depth: usize,
    in_v_pre: bool,
    warned_multiple_roots: bool,
    warned_text_only: bool,
}

/// Parses `template` into its root nodes. The first root is the component
/// root; any further roots are its `v-else-if`/`v-else` branches.
pub fn parse(
    template: &str,
    options: &CompilerOptions,
    warn: &mut dyn FnMut(String, bool),
) -> Vec<Node> {
    let mut builder = AstBuilder::new(template, options, warn);
    parse_html(template, &options.parser_options(), &mut builder);
    builder.finish()
}

/// Parses with the platform defaults, failing on any diagnostic.
pub fn parse_template_to_ast(input: &str) -> Result<Vec<Node>, String> {
    let options = base_options();
    let mut errors = Vec::new();
    let roots = parse(input.trim(), &options, &mut |msg, tip| {
        if !tip {
            errors.push(msg);
        }
    });
    if errors.is_empty() {
        Ok(roots)
    } else {
        Err(errors.join("\n"))
    }
}

impl<'a> AstBuilder<'a> {
    pub fn new(
        template: &'a str,
        options: &'a CompilerOptions,
        warn: &'a mut dyn FnMut(String, bool),
    ) -> Self {
        AstBuilder {
            template,
            options,
            warn,
            stack: Vec::new(),
            roots: Vec::new(),
            pre_depth: 0,
            in_v_pre: false,
            warned_multiple_roots: false,
            warned_text_only: false,
        }
    }

    pub fn finish(self) -> Vec<Node> {
        if self.roots.is_empty() && !self.template.trim().is_empty() && !self.warned_text_only {
            (self.warn)(TemplateError::NoRootElement.to_string(), false);
        }
        self.roots
    }

    fn report(&mut self, err: TemplateError) {
        tracing::debug!(error = ?err, "template diagnostic");
        (self.warn)(err.to_string(), false);
    }

    fn check_root_constraints(&mut self, el: &Element) {
        if el.tag == "slot" || el.tag == "template" {
            self.report(TemplateError::MultiNodeRoot(el.tag.clone()));
        }
        if el.has_directive("for") {
            self.report(TemplateError::ForOnRoot);
        }
    }

    fn close_element(&mut self, open: OpenElement, end: usize) {
        let OpenElement {
            mut el,
            dropped,
            v_pre_root,
        } = open;

        // trailing whitespace
        if self.pre_depth == 0 && matches!(el.children.last(), Some(Node::Text(t)) if t == " ") {
            el.children.pop();
        }
        if let Some(span) = el.span.as_mut() {
            span.end = end;
        }
        if (self.options.is_pre_tag)(&el.tag) {
            self.pre_depth = self.pre_depth.saturating_sub(1);
        }
        if v_pre_root {
            self.in_v_pre = false;
        }
        for module in &self.options.modules {
            module.transform_node(&mut el);
        }
        if dropped {
            return;
        }

        let warn = &mut *self.warn;
        match self.stack.last_mut() {
            Some(parent) => attach(&mut parent.el.children, el, warn),
            None => attach(&mut self.roots, el, warn),
        }
    }
}

/// Appends `el` to `siblings`, linking `v-else-if`/`v-else` to the
/// preceding `v-if` branch.
fn attach(siblings: &mut Vec<Node>, el: Element, warn: &mut dyn FnMut(String, bool)) {
    if el.is_conditional_branch() {
        while let Some(last) = siblings.last() {
            match last {
                Node::Element(_) => break,
                Node::Text(t) | Node::Interpolation(t) => {
                    if !t.trim().is_empty() {
                        warn(
                            TemplateError::TextBetweenBranches(t.trim().to_string()).to_string(),
                            false,
                        );
                    }
                    siblings.pop();
                }
                Node::Comment(_) => {
                    siblings.pop();
                }
            }
        }
        let chained = siblings
            .last()
            .and_then(Node::as_element)
            .is_some_and(|prev| prev.has_directive("if") || prev.has_directive("else-if"));
        if !chained {
            let raw = el
                .directive("else-if")
                .or_else(|| el.directive("else"))
                .map(TemplateAttr::raw)
                .unwrap_or_default();
            warn(
                TemplateError::ElseWithoutIf {
                    raw,
                    tag: el.tag.clone(),
                }
                .to_string(),
                false,
            );
            return;
        }
    }
    siblings.push(Node::Element(el));
}

impl ParseHandler for AstBuilder<'_> {
    fn start(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, start: usize, end: usize) {
        let ns = self
            .stack
            .last()
            .and_then(|p| p.el.ns.clone())
            .or_else(|| (self.options.get_tag_namespace)(tag).map(str::to_string));

        let mut el = Element::new(tag);
        el.ns = ns;
        el.self_closing = unary;
        if self.options.output_source_range {
            el.span = Some(Span { start, end });
        }

        let v_pre_root = !self.in_v_pre && attrs.iter().any(|a| a.name == "v-pre");
        if v_pre_root {
            self.in_v_pre = true;
        }

        let options = self.options;
        let (open, close) = options.delimiters();
        let mut seen = HashSet::new();
        for a in &attrs {
            if !seen.insert(a.name.as_str()) {
                self.report(TemplateError::DuplicateAttribute(a.name.clone()));
            }
            let span = options.output_source_range.then_some(Span {
                start: a.start,
                end: a.end,
            });
            let attr = if self.in_v_pre {
                static_attr(&a.name, &a.value, span)
            } else {
                classify_attr(&a.name, &a.value, span)
            };
            if attr.kind == AttrKind::Static
                && !self.in_v_pre
                && split_interpolations(&a.value, open, close).is_some()
            {
                self.report(TemplateError::InterpolationInAttribute(attr.raw()));
            }
            el.attrs.push(attr);
        }

        let mut dropped = is_forbidden_tag(&el);
        if dropped {
            self.report(TemplateError::SideEffectTag(el.tag.clone()));
        }

        if (self.options.is_pre_tag)(&el.tag) {
            self.pre_depth += 1;
        }

        if self.stack.is_empty() && !dropped {
            if self.roots.is_empty() || el.is_conditional_branch() {
                self.check_root_constraints(&el);
            } else {
                if !self.warned_multiple_roots {
                    self.warned_multiple_roots = true;
                    self.report(TemplateError::MultipleRoots);
                }
                dropped = true;
            }
        }

        let open = OpenElement {
            el,
            dropped,
            v_pre_root,
        };
        if unary {
            self.close_element(open, end);
        } else {
            self.stack.push(open);
        }
    }

    fn end(&mut self, _tag: &str, _start: usize, end: usize) {
        if let Some(open) = self.stack.pop() {
            self.close_element(open, end);
        }
    }

    fn chars(&mut self, text: &str, _start: usize, _end: usize) {
        if self.stack.is_empty() {
            if text == self.template {
                self.warned_text_only = true;
                self.report(TemplateError::TextOnlyTemplate);
            } else if !text.trim().is_empty() {
                self.report(TemplateError::TextOutsideRoot(text.trim().to_string()));
            }
            return;
        }

        let in_pre = self.pre_depth > 0;
        let in_v_pre = self.in_v_pre;
        let options = self.options;
        let (open, close) = options.delimiters();
        let Some(parent) = self.stack.last_mut() else {
            return;
        };
        let children = &mut parent.el.children;

        let text = if in_pre || !text.trim().is_empty() {
            if matches!(parent.el.tag.as_str(), "script" | "style") {
                text.to_string()
            } else {
                decode_html(text)
            }
        } else if children.is_empty() {
            // leading whitespace
            return;
        } else {
            " ".to_string()
        };

        if !in_v_pre && text != " " {
            if let Some(parts) = split_interpolations(&text, open, close) {
                children.extend(parts);
                return;
            }
        }
        if text == " " && matches!(children.last(), Some(Node::Text(t)) if t == " ") {
            return;
        }
        children.push(Node::Text(text));
    }

    fn comment(&mut self, text: &str, _start: usize, _end: usize) {
        if let Some(parent) = self.stack.last_mut() {
            parent.el.children.push(Node::Comment(text.to_string()));
        }
    }

    fn warn(&mut self, warning: ParseWarning) {
        self.report(warning.into());
    }
}

fn is_forbidden_tag(el: &Element) -> bool {
    el.tag == "style"
        || (el.tag == "script"
            && el
                .static_attr("type")
                .is_none_or(|t| t.value_str() == "text/javascript"))
}

fn static_attr(name: &str, value: &str, span: Option<Span>) -> TemplateAttr {
    TemplateAttr {
        name: name.to_string(),
        value: (!value.is_empty()).then(|| value.to_string()),
        kind: AttrKind::Static,
        arg: None,
        modifiers: Vec::new(),
        raw_name: name.to_string(),
        span,
    }
}

/// Sorts an attribute into static / bind / on / directive.
///
/// `:x` and `v-bind:x` bind, `@x` and `v-on:x` listen, `#name` is a slot
/// directive, `v-dir:arg.mod` is a directive; anything else is static.
fn classify_attr(raw_name: &str, value: &str, span: Option<Span>) -> TemplateAttr {
    let is_dynamic = raw_name.starts_with("v-")
        || raw_name.starts_with(':')
        || raw_name.starts_with('@')
        || raw_name.starts_with('#');
    if !is_dynamic {
        return static_attr(raw_name, value, span);
    }

    let mut parts = raw_name.split('.');
    let base = parts.next().unwrap_or_default();
    let modifiers: Vec<String> = parts.map(str::to_string).collect();

    let (kind, name, arg) = if let Some(n) = base
        .strip_prefix(':')
        .or_else(|| base.strip_prefix("v-bind:"))
    {
        (AttrKind::Bind, n.to_string(), None)
    } else if let Some(n) = base.strip_prefix('@').or_else(|| base.strip_prefix("v-on:")) {
        (AttrKind::On, n.to_string(), None)
    } else if let Some(n) = base.strip_prefix('#') {
        (AttrKind::Directive, "slot".to_string(), Some(n.to_string()))
    } else {
        let dir = &base[2..];
        let (dir, arg) = match dir.split_once(':') {
            Some((dir, arg)) => (dir, Some(arg.to_string())),
            None => (dir, None),
        };
        let name = match normalize_directive_name(dir).as_str() {
            "elseif" => "else-if".to_string(),
            other => other.to_string(),
        };
        (AttrKind::Directive, name, arg)
    };

    TemplateAttr {
        name,
        value: (!value.is_empty()).then(|| value.to_string()),
        kind,
        arg,
        modifiers,
        raw_name: raw_name.to_string(),
        span,
    }
}

fn normalize_directive_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == '_' {
            out.push('-');
        } else if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch.to_ascii_lowercase());
        }
    }
    // collapse duplicated dashes
    let mut prev_dash = false;
    let mut compact = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '-' {
            if !prev_dash {
                compact.push(c);
            }
            prev_dash = true;
        } else {
            compact.push(c);
            prev_dash = false;
        }
    }
    compact.trim_matches('-').to_string()
}

/// Splits text into static text and interpolation nodes. `None` when the
/// text holds no complete interpolation.
pub fn split_interpolations(text: &str, open: &str, close: &str) -> Option<Vec<Node>> {
    if open.is_empty() || close.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(o) = rest.find(open) {
        let after = &rest[o + open.len()..];
        let Some(c) = after.find(close) else {
            break;
        };
        if o > 0 {
            parts.push(Node::Text(rest[..o].to_string()));
        }
        parts.push(Node::Interpolation(after[..c].trim().to_string()));
        rest = &after[c + close.len()..];
    }
    if parts.is_empty() {
        return None;
    }
    if !rest.is_empty() {
        parts.push(Node::Text(rest.to_string()));
    }
    Some(parts)
}

fn decode_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    HTML_ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                match body {
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "amp" => Some('&'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
