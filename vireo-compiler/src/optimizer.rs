//! Marks subtrees that never change between renders so code generation can
//! hoist them into static render functions.

use crate::options::CompilerOptions;
use crate::template_ast::{AttrKind, Element, Node};

pub fn optimize(roots: &mut [Node], options: &CompilerOptions) {
    for root in roots.iter_mut() {
        if let Node::Element(el) = root {
            mark_static(el, options, false);
            mark_static_roots(el);
        }
    }
}

fn mark_static(el: &mut Element, options: &CompilerOptions, in_for: bool) {
    let in_for = in_for || el.has_directive("for");
    let mut is_static = is_static_element(el, options, in_for);
    for child in el.children.iter_mut() {
        let child_static = match child {
            Node::Element(child) => {
                mark_static(child, options, in_for);
                child.is_static
            }
            Node::Text(_) | Node::Comment(_) => true,
            Node::Interpolation(_) => false,
        };
        is_static &= child_static;
    }
    el.is_static = is_static;
}

fn is_static_element(el: &Element, options: &CompilerOptions, in_for: bool) -> bool {
    !in_for
        && el.tag != "slot"
        && el.tag != "component"
        && (options.is_reserved_tag)(&el.tag)
        && el.attrs.iter().all(|a| a.kind == AttrKind::Static && a.name != "key")
        && el.module_data.keys().all(|k| options.is_static_key(k))
}

fn mark_static_roots(el: &mut Element) {
    if el.is_static {
        // a lone text child is cheaper to re-create than to hoist
        let only_text = matches!(el.children.as_slice(), [Node::Text(_)]);
        el.static_root = !el.children.is_empty() && !only_text;
        if el.static_root {
            return;
        }
    }
    for child in el.children.iter_mut() {
        if let Node::Element(child) = child {
            mark_static_roots(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::base_options;
    use crate::template_parse::parse_template_to_ast;

    fn optimized(src: &str) -> Element {
        let mut roots = parse_template_to_ast(src).unwrap();
        optimize(&mut roots, &base_options());
        match roots.remove(0) {
            Node::Element(el) => el,
            other => panic!("expected element, got {other:?}"),
        }
    }

    fn child(el: &Element, i: usize) -> &Element {
        el.children[i].as_element().unwrap()
    }

    #[test]
    fn static_subtree_becomes_static_root() {
        let root = optimized(
            r#"<div><ul class="list"><li>a</li><li>b</li></ul><p>{{ msg }}</p></div>"#,
        );
        assert!(!root.is_static);
        assert!(!root.static_root);
        let ul = child(&root, 0);
        assert!(ul.is_static);
        assert!(ul.static_root);
        // nested static nodes are not roots themselves
        assert!(child(ul, 0).is_static);
        assert!(!child(ul, 0).static_root);
        assert!(!child(&root, 1).is_static);
    }

    #[test]
    fn single_text_child_is_not_hoisted() {
        let root = optimized("<div><span>hi</span><b>{{ x }}</b></div>");
        let span = child(&root, 0);
        assert!(span.is_static);
        assert!(!span.static_root);
    }

    #[test]
    fn bindings_components_and_loops_are_dynamic() {
        let root = optimized(
            r#"<div><p :title="t">a</p><my-comp><i>x</i></my-comp><ul><li v-for="i in items"><b>x</b></li></ul><p :class="c">y</p></div>"#,
        );
        assert!(!child(&root, 0).is_static);
        assert!(!child(&root, 1).is_static);
        let li = child(child(&root, 2), 0);
        assert!(!child(li, 0).is_static);
        // classBinding is not a static key
        assert!(!child(&root, 3).is_static);
    }
}
