//! Compiler configuration: web platform defaults plus per-call overrides,
//! flattened into one owned [`CompilerOptions`].

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use vireo_dom::platform;

use crate::directives::{self, DirectiveHandler};
use crate::html_parser::ParserOptions;
use crate::modules::{ClassModule, CompilerModule, StyleModule, gen_static_keys};

pub type TagPredicate = fn(&str) -> bool;
pub type MustUseProp = fn(&str, Option<&str>, &str) -> bool;
pub type TagNamespace = fn(&str) -> Option<&'static str>;
/// `warn(message, is_tip)`
pub type WarnFn = Rc<dyn Fn(&str, bool)>;

#[derive(Clone)]
pub struct CompilerOptions {
    pub expect_html: bool,
    pub modules: Vec<Rc<dyn CompilerModule>>,
    pub directives: BTreeMap<String, DirectiveHandler>,
    pub is_pre_tag: TagPredicate,
    pub is_unary_tag: TagPredicate,
    pub must_use_prop: MustUseProp,
    pub can_be_left_open_tag: TagPredicate,
    pub is_reserved_tag: TagPredicate,
    pub get_tag_namespace: TagNamespace,
    /// Comma-joined `module_data` keys safe to treat as static.
    pub static_keys: String,
    /// Receives diagnostics instead of the per-call collector.
    pub warn: Option<WarnFn>,
    pub should_decode_newlines: bool,
    pub should_decode_newlines_for_href: bool,
    pub output_source_range: bool,
    /// Keep comments in the AST.
    pub comments: bool,
    /// Interpolation delimiters, `{{` and `}}` by default.
    pub delimiters: Option<(String, String)>,
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("expect_html", &self.expect_html)
            .field("modules", &self.modules)
            .field("directives", &self.directives.keys().collect::<Vec<_>>())
            .field("static_keys", &self.static_keys)
            .field("warn", &self.warn.is_some())
            .field("output_source_range", &self.output_source_range)
            .field("comments", &self.comments)
            .field("delimiters", &self.delimiters)
            .finish_non_exhaustive()
    }
}

/// Web platform defaults.
pub fn base_options() -> CompilerOptions {
    let modules: Vec<Rc<dyn CompilerModule>> = vec![Rc::new(ClassModule), Rc::new(StyleModule)];
    let mut dirs: BTreeMap<String, DirectiveHandler> = BTreeMap::new();
    dirs.insert("text".into(), directives::text);
    dirs.insert("html".into(), directives::html);
    dirs.insert("cloak".into(), directives::cloak);

    CompilerOptions {
        expect_html: true,
        static_keys: gen_static_keys(&modules),
        modules,
        directives: dirs,
        is_pre_tag: platform::is_pre_tag,
        is_unary_tag: platform::is_unary_tag,
        must_use_prop: platform::must_use_prop,
        can_be_left_open_tag: platform::can_be_left_open_tag,
        is_reserved_tag: platform::is_reserved_tag,
        get_tag_namespace: platform::get_tag_namespace,
        warn: None,
        should_decode_newlines: false,
        should_decode_newlines_for_href: false,
        output_source_range: false,
        comments: false,
        delimiters: None,
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        base_options()
    }
}

/// Per-call overrides. Unset fields keep the compiler's base value.
#[derive(Clone, Default)]
pub struct CompileOptions {
    /// Appended after the base modules.
    pub modules: Option<Vec<Rc<dyn CompilerModule>>>,
    /// Shadows base directives of the same name.
    pub directives: Option<BTreeMap<String, DirectiveHandler>>,
    pub expect_html: Option<bool>,
    pub is_pre_tag: Option<TagPredicate>,
    pub is_unary_tag: Option<TagPredicate>,
    pub must_use_prop: Option<MustUseProp>,
    pub can_be_left_open_tag: Option<TagPredicate>,
    pub is_reserved_tag: Option<TagPredicate>,
    pub get_tag_namespace: Option<TagNamespace>,
    pub static_keys: Option<String>,
    pub warn: Option<WarnFn>,
    pub should_decode_newlines: Option<bool>,
    pub should_decode_newlines_for_href: Option<bool>,
    pub output_source_range: Option<bool>,
    pub comments: Option<bool>,
    pub delimiters: Option<(String, String)>,
}

macro_rules! overlay {
    ($out:ident, $layer:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = &$layer.$field {
                $out.$field = v.clone();
            }
        )+
    };
}

impl CompilerOptions {
    /// A fresh options value with `layer` applied on top of `self`.
    pub fn with_overrides(&self, layer: &CompileOptions) -> CompilerOptions {
        let mut out = self.clone();
        if let Some(modules) = &layer.modules {
            out.modules.extend(modules.iter().cloned());
        }
        if let Some(directives) = &layer.directives {
            for (name, handler) in directives {
                out.directives.insert(name.clone(), *handler);
            }
        }
        overlay!(
            out,
            layer,
            expect_html,
            is_pre_tag,
            is_unary_tag,
            must_use_prop,
            can_be_left_open_tag,
            is_reserved_tag,
            get_tag_namespace,
            static_keys,
            should_decode_newlines,
            should_decode_newlines_for_href,
            output_source_range,
            comments,
        );
        if layer.warn.is_some() {
            out.warn = layer.warn.clone();
        }
        if layer.delimiters.is_some() {
            out.delimiters = layer.delimiters.clone();
        }
        out
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            expect_html: self.expect_html,
            is_unary_tag: self.is_unary_tag,
            can_be_left_open_tag: self.can_be_left_open_tag,
            should_keep_comment: self.comments,
            should_decode_newlines: self.should_decode_newlines,
            should_decode_newlines_for_href: self.should_decode_newlines_for_href,
        }
    }

    pub fn delimiters(&self) -> (&str, &str) {
        match &self.delimiters {
            Some((open, close)) => (open.as_str(), close.as_str()),
            None => ("{{", "}}"),
        }
    }

    pub fn is_static_key(&self, key: &str) -> bool {
        self.static_keys.split(',').any(|k| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_static_keys_come_from_modules() {
        let base = base_options();
        assert_eq!(base.static_keys, "staticClass,staticStyle");
        assert!(base.is_static_key("staticStyle"));
        assert!(!base.is_static_key("classBinding"));
    }

    #[test]
    fn overrides_leave_base_untouched() {
        let base = base_options();
        let layer = CompileOptions {
            comments: Some(true),
            delimiters: Some(("${".into(), "}".into())),
            ..Default::default()
        };
        let merged = base.with_overrides(&layer);
        assert!(merged.comments);
        assert_eq!(merged.delimiters(), ("${", "}"));
        assert!(!base.comments);
        assert_eq!(base.delimiters(), ("{{", "}}"));
        assert_eq!(merged.modules.len(), base.modules.len());
    }
}
