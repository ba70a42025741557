//! Small DOM toolkit over `markup5ever_rcdom`.
//!
//! Rendered HTML is parsed once into an `RcDom` tree and every later stage
//! (CSS inlining, diagram discovery and replacement, placeholder swapping)
//! mutates that tree in place. The helpers here keep parent pointers intact
//! so nodes can be replaced or moved after the parse.

use crate::error::MdbError;
use html5ever::tendril::TendrilSink;
use html5ever::{
    ns, parse_document, serialize, serialize::SerializeOpts, serialize::TraversalScope,
    Attribute, LocalName, ParseOpts, QualName,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Parse an HTML fragment and return a detached `<div>` holding its nodes.
pub fn parse_fragment(html: &str) -> Handle {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
    let container = create_element("div", vec![]);
    if let Some(body) = find_first(&dom.document, &|node: &Handle| is_element(node, "body")) {
        let children: Vec<Handle> = body.children.borrow_mut().drain(..).collect();
        for child in children {
            append_child(&container, child);
        }
    }
    container
}

/// Create an HTML element with attributes
pub fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node
pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.into()),
        },
    })
}

pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn is_element(node: &Handle, tag: &str) -> bool {
    matches!(&node.data, NodeData::Element { name, .. } if &*name.local == tag)
}

pub fn attr(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn set_attr(node: &Handle, key: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        if let Some(existing) = attrs.iter_mut().find(|a| &*a.name.local == key) {
            existing.value = value.into();
        } else {
            attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(key)),
                value: value.into(),
            });
        }
    }
}

pub fn remove_attr(node: &Handle, key: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs.borrow_mut().retain(|a| &*a.name.local != key);
    }
}

pub fn classes(node: &Handle) -> Vec<String> {
    attr(node, "class")
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &Handle, class: &str) -> bool {
    attr(node, "class")
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

pub fn add_class(node: &Handle, class: &str) {
    let mut current = classes(node);
    if !current.iter().any(|c| c == class) {
        current.push(class.to_string());
        set_attr(node, "class", &current.join(" "));
    }
}

/// Concatenated text of all descendant text nodes.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Swap `old` for `new` in its parent. Returns false when `old` is detached.
pub fn replace_node(old: &Handle, new: Handle) -> bool {
    let Some(parent) = parent_of(old) else {
        return false;
    };
    let mut children = parent.children.borrow_mut();
    let Some(index) = children.iter().position(|c| Rc::ptr_eq(c, old)) else {
        return false;
    };
    new.parent.set(Some(Rc::downgrade(&parent)));
    old.parent.set(None);
    children[index] = new;
    true
}

/// Insert `new` as the previous sibling of `reference`.
pub fn insert_before(reference: &Handle, new: Handle) -> bool {
    let Some(parent) = parent_of(reference) else {
        return false;
    };
    let mut children = parent.children.borrow_mut();
    let Some(index) = children.iter().position(|c| Rc::ptr_eq(c, reference)) else {
        return false;
    };
    new.parent.set(Some(Rc::downgrade(&parent)));
    children.insert(index, new);
    true
}

pub fn clear_children(node: &Handle) {
    for child in node.children.borrow_mut().drain(..) {
        child.parent.set(None);
    }
}

/// Move every child of `from` to the end of `to`.
pub fn move_children(from: &Handle, to: &Handle) {
    let children: Vec<Handle> = from.children.borrow_mut().drain(..).collect();
    for child in children {
        append_child(to, child);
    }
}

pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|c| matches!(c.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// All descendant elements of `root` in document order (root excluded).
pub fn descendants(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    collect_elements(root, &mut out);
    out
}

fn collect_elements(node: &Handle, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if matches!(child.data, NodeData::Element { .. }) {
            out.push(child.clone());
        }
        collect_elements(child, out);
    }
}

pub fn find_first(root: &Handle, pred: &dyn Fn(&Handle) -> bool) -> Option<Handle> {
    for child in root.children.borrow().iter() {
        if matches!(child.data, NodeData::Element { .. }) && pred(child) {
            return Some(child.clone());
        }
        if let Some(found) = find_first(child, pred) {
            return Some(found);
        }
    }
    None
}

/// Serialize a node together with its own tag.
pub fn serialize_node(node: &Handle) -> Result<String, MdbError> {
    let mut output = Vec::new();
    write_node(node, &mut output)?;
    into_string(output)
}

/// Serialize the children of a node, leaving out the node's own tag.
pub fn serialize_children(node: &Handle) -> Result<String, MdbError> {
    let mut output = Vec::new();
    for child in node.children.borrow().iter() {
        write_node(child, &mut output)?;
    }
    into_string(output)
}

fn write_node(node: &Handle, output: &mut Vec<u8>) -> Result<(), MdbError> {
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    let serializable = SerializableHandle::from(node.clone());
    serialize(output, &serializable, opts)
        .map_err(|e| MdbError::Serialization(format!("HTML serialization failed: {e}")))
}

fn into_string(output: Vec<u8>) -> Result<String, MdbError> {
    String::from_utf8(output)
        .map_err(|e| MdbError::Serialization(format!("UTF-8 conversion failed: {e}")))
}

/// Escape HTML special characters in text
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
