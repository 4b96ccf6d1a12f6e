//! Static checks over template expressions, run in debug builds only.

use lazy_static::lazy_static;
use regex::Regex;
use vireo_dom::Expr;
use vireo_dom::expr::split_args;

use crate::template_ast::{AttrKind, Element, Node, TemplateAttr};
use crate::template_codegen::ForExpr;

const KEYWORDS: &str = "do,if,for,let,new,try,var,case,else,with,await,break,catch,class,const,\
    super,throw,while,yield,delete,export,import,return,switch,default,extends,finally,continue,\
    debugger,function,arguments";

lazy_static! {
    static ref PROHIBITED_KEYWORD: Regex = Regex::new(&format!(
        r"\b(?:{})\b",
        KEYWORDS.split(',').collect::<Vec<_>>().join("|")
    ))
    .expect("keyword pattern");
    static ref UNARY_OPERATOR: Regex =
        Regex::new(r"\b(?:delete|typeof|void)\s*\([^)]*\)").expect("unary operator pattern");
    static ref STRING_LITERAL: Regex =
        Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*""#).expect("string pattern");
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][\w$]*$").expect("identifier pattern");
    static ref CALL: Regex = Regex::new(r"(?s)^\s*([\w$.\[\]'\x22]+)\s*\((.*)\)\s*$").expect("call pattern");
}

/// Problems found in the expressions of `roots`, as error messages.
pub fn detect_errors(roots: &[Node]) -> Vec<String> {
    let mut errors = Vec::new();
    for node in roots {
        check_node(node, &mut errors);
    }
    errors
}

fn check_node(node: &Node, errors: &mut Vec<String>) {
    match node {
        Node::Element(el) => check_element(el, errors),
        Node::Interpolation(expr) => {
            check_expression(expr, &format!("{{{{{expr}}}}}"), errors);
        }
        Node::Text(_) | Node::Comment(_) => {}
    }
}

fn check_element(el: &Element, errors: &mut Vec<String>) {
    for attr in &el.attrs {
        let text = attr.raw();
        match attr.kind {
            AttrKind::Static => {}
            AttrKind::Bind => check_expression(attr.value_str(), &text, errors),
            AttrKind::On => check_event(attr, &text, errors),
            AttrKind::Directive => match attr.name.as_str() {
                "for" => check_for(attr.value_str(), &text, errors),
                "else" | "pre" | "cloak" | "once" | "slot" => {}
                _ if attr.value.is_some() => check_expression(attr.value_str(), &text, errors),
                _ => {}
            },
        }
    }
    for child in &el.children {
        check_node(child, errors);
    }
}

fn check_event(attr: &TemplateAttr, text: &str, errors: &mut Vec<String>) {
    let exp = attr.value_str();
    let stripped = STRING_LITERAL.replace_all(exp, "");
    if let Some(m) = UNARY_OPERATOR.find(&stripped) {
        if !preceded_by_dollar(&stripped, m.start()) {
            errors.push(format!(
                "avoid using JavaScript unary operator as property name: \"{}\" in expression {}",
                m.as_str(),
                text.trim()
            ));
            return;
        }
    }
    // handlers may be a method name or a call with argument expressions
    match CALL.captures(exp) {
        Some(call) => {
            check_expression(&call[1], text, errors);
            for arg in split_args(&call[2]) {
                check_expression(arg, text, errors);
            }
        }
        None => check_expression(exp, text, errors),
    }
}

fn check_for(exp: &str, text: &str, errors: &mut Vec<String>) {
    let Some(for_exp) = ForExpr::parse(exp) else {
        errors.push(format!("invalid v-for expression: {}", text.trim()));
        return;
    };
    check_expression(&for_exp.source, text, errors);
    let aliases = [Some(&for_exp.alias), for_exp.iterator1.as_ref(), for_exp.iterator2.as_ref()];
    for ident in aliases.into_iter().flatten() {
        if !IDENTIFIER.is_match(ident) || PROHIBITED_KEYWORD.is_match(ident) {
            errors.push(format!(
                "invalid v-for alias \"{ident}\" in expression: {}",
                text.trim()
            ));
        }
    }
}

fn check_expression(exp: &str, text: &str, errors: &mut Vec<String>) {
    let stripped = STRING_LITERAL.replace_all(exp, "");
    if let Some(m) = PROHIBITED_KEYWORD.find(&stripped) {
        if !preceded_by_dollar(&stripped, m.start()) {
            errors.push(format!(
                "avoid using JavaScript keyword as property name: \"{}\"\n  Raw expression: {}",
                m.as_str(),
                text.trim()
            ));
            return;
        }
    }
    if let Err(err) = Expr::parse(exp) {
        errors.push(format!(
            "invalid expression: {err} in\n\n    {}\n\n  Raw expression: {}\n",
            exp.trim(),
            text.trim()
        ));
    }
}

fn preceded_by_dollar(s: &str, at: usize) -> bool {
    at > 0 && s.as_bytes()[at - 1] == b'$'
}
