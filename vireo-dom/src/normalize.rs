use crate::{Child, VNode};

/// How the element factory treats the children it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Children are taken as given.
    #[default]
    None,
    /// Compiled templates: nested sequences from `v-for` or `<template>`
    /// blocks are flattened.
    Simple,
    /// Hand-written render functions: full flattening, primitives become
    /// text nodes and adjacent text is merged.
    Always,
}

/// Flattens the one level of nesting compiled render code produces.
pub fn simple_normalize_children(children: Vec<Child>) -> Vec<VNode> {
    if !children.iter().any(|c| matches!(c, Child::List(_))) {
        return into_vnodes(children);
    }
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Child::List(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    into_vnodes(flat)
}

/// Full normalization for render functions with unpredictable shapes.
pub fn normalize_children(children: Vec<Child>) -> Vec<VNode> {
    let mut res = Vec::with_capacity(children.len());
    normalize_into(children, &mut res);
    res
}

fn normalize_into(children: Vec<Child>, res: &mut Vec<VNode>) {
    for child in children {
        match child {
            Child::Empty | Child::Slot(_) => {}
            Child::List(inner) => normalize_into(inner, res),
            Child::Text(t) => push_text(res, t),
            Child::Node(VNode::Text(t)) => push_text(res, t),
            Child::Node(node) => res.push(node),
        }
    }
}

fn push_text(res: &mut Vec<VNode>, t: String) {
    if t.is_empty() {
        return;
    }
    // merge adjacent text nodes
    if let Some(VNode::Text(last)) = res.last_mut() {
        last.push_str(&t);
    } else {
        res.push(VNode::Text(t));
    }
}

/// Converts children into nodes without merging text. Sequences cannot be
/// represented inside a node's child list, so any remaining nesting is
/// spliced in place.
pub(crate) fn into_vnodes(children: Vec<Child>) -> Vec<VNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Child::Node(node) => out.push(node),
            Child::Text(t) => out.push(VNode::Text(t)),
            Child::List(inner) => out.extend(into_vnodes(inner)),
            Child::Empty | Child::Slot(_) => {}
        }
    }
    out
}

/// Assigns `ns` to `vnode` and, recursively, to descendants that have no
/// namespace yet. `foreignObject` resets the namespace for its subtree and
/// forces it onto every descendant except nested `svg` roots.
pub fn apply_ns(vnode: &mut VNode, ns: Option<String>, force: bool) {
    match vnode {
        VNode::Component(c) => c.ns = ns,
        VNode::Element {
            tag,
            ns: node_ns,
            children,
            ..
        } => {
            *node_ns = ns.clone();
            let (ns, force) = if tag == "foreignObject" {
                (None, true)
            } else {
                (ns, force)
            };
            for child in children.iter_mut() {
                let Some(child_tag) = child.tag() else {
                    continue;
                };
                if child.ns().is_none() || (force && child_tag != "svg") {
                    apply_ns(child, ns.clone(), force);
                }
            }
        }
        VNode::Text(_) | VNode::Comment(_) => {}
    }
}
