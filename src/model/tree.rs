use std::fmt;
use std::sync::Arc;

use crate::codec::RecordContext;
use crate::model::edit::ChangeHook;
use crate::model::{ElementId, ElementPath, PathSegment, Role, Value};
use crate::template::{KeySection, TemplateItem};
use crate::type_code::TypeCode;

/// One node of a decoded tree.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) item: Arc<TemplateItem>,
    pub(crate) role: Role,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) value: Value,
    /// Active section of a keyed element.
    pub(crate) section: Option<usize>,
    /// Padding bytes that followed a decoded string.
    pub(crate) padding: Vec<u8>,
}

impl Element {
    /// The template item this element was built from. Groups share their list's item.
    pub fn item(&self) -> &Arc<TemplateItem> {
        &self.item
    }

    pub fn code(&self) -> TypeCode {
        self.item.code
    }

    pub fn name(&self) -> &str {
        &self.item.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_group(&self) -> bool {
        self.role == Role::Group
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn section(&self) -> Option<&KeySection> {
        self.section.and_then(|i| self.item.sections().get(i))
    }

    pub fn section_index(&self) -> Option<usize> {
        self.section
    }
}

/// Arena of elements decoded from one record.
///
/// Elements refer to each other by [`ElementId`]; the arena owns every node and removed nodes
/// leave a slot that is reused by the next insertion.
pub struct ElementTree {
    nodes: Vec<Option<Element>>,
    free: Vec<usize>,
    roots: Vec<ElementId>,
    context: RecordContext,
    trailing: Vec<u8>,
    pub(crate) hook: Option<ChangeHook>,
}

impl fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementTree")
            .field("roots", &self.roots)
            .field("len", &self.len())
            .field("context", &self.context)
            .field("trailing", &self.trailing.len())
            .finish()
    }
}

impl ElementTree {
    pub(crate) fn new(context: RecordContext) -> Self {
        ElementTree {
            nodes: Vec::new(),
            free: Vec::new(),
            roots: Vec::new(),
            context,
            trailing: Vec::new(),
            hook: None,
        }
    }

    fn alloc(&mut self, element: Element) -> ElementId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(element);
                ElementId(slot)
            }
            None => {
                self.nodes.push(Some(element));
                ElementId(self.nodes.len() - 1)
            }
        }
    }

    /// Appends an element for `item` under `parent` (or as a root), holding the default value.
    pub(crate) fn add_field(
        &mut self,
        item: &Arc<TemplateItem>,
        parent: Option<ElementId>,
    ) -> ElementId {
        let id = self.alloc(Element {
            item: Arc::clone(item),
            role: Role::Field,
            parent,
            children: Vec::new(),
            value: item.kind.default_value(),
            section: None,
            padding: Vec::new(),
        });
        match parent.and_then(|p| self.node_mut(p)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Inserts an empty group into `list` at `at`, or at the end.
    pub(crate) fn add_group(&mut self, list: ElementId, at: Option<usize>) -> Option<ElementId> {
        let item = Arc::clone(&self.node(list)?.item);
        let id = self.alloc(Element {
            item,
            role: Role::Group,
            parent: Some(list),
            children: Vec::new(),
            value: Value::None,
            section: None,
            padding: Vec::new(),
        });
        let list = self.node_mut(list)?;
        match at {
            Some(at) if at < list.children.len() => list.children.insert(at, id),
            _ => list.children.push(id),
        }
        Some(id)
    }

    /// Frees `id` and everything below it. The caller detaches it from its parent.
    pub(crate) fn release(&mut self, id: ElementId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if let Some(element) = self.nodes.get_mut(id.0).and_then(Option::take) {
                pending.extend(element.children);
                self.free.push(id.0);
            }
        }
    }

    pub(crate) fn node(&self, id: ElementId) -> Option<&Element> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub(crate) fn set_trailing(&mut self, bytes: Vec<u8>) {
        self.trailing = bytes;
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.node(id)
    }

    /// Children of `id`: groups of a list, fields of a group, or the active section of a keyed
    /// element. Empty for stale ids.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.node(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn value(&self, id: ElementId) -> Option<&Value> {
        self.node(id).map(|e| &e.value)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).and_then(|e| e.parent)
    }

    pub fn context(&self) -> &RecordContext {
        &self.context
    }

    /// Bytes found after the last template element. They are written back unchanged.
    pub fn trailing_bytes(&self) -> &[u8] {
        &self.trailing
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth-first, pre-order traversal yielding `(depth, id)`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: self.roots.iter().rev().map(|&id| (0, id)).collect(),
        }
    }

    /// The first field, in traversal order, whose display name is `label`.
    pub fn find_by_label(&self, label: &str) -> Option<ElementId> {
        self.walk()
            .map(|(_, id)| id)
            .find(|&id| {
                self.node(id)
                    .is_some_and(|e| e.role == Role::Field && e.item.name == label)
            })
    }

    pub fn path(&self, id: ElementId) -> ElementPath {
        let mut segments = Vec::new();
        let mut current = Some(id);

        while let Some(id) = current {
            let Some(element) = self.node(id) else { break };
            let siblings = match element.parent {
                Some(parent) => self.children(parent),
                None => &self.roots,
            };
            let index = siblings.iter().position(|&s| s == id).unwrap_or(0);
            segments.push(match element.role {
                Role::Group => PathSegment::Group(index),
                Role::Field => PathSegment::Field {
                    index,
                    label: element.item.name.clone(),
                },
            });
            current = element.parent;
        }

        segments.reverse();
        ElementPath::new(segments)
    }
}

pub struct Walk<'a> {
    tree: &'a ElementTree,
    stack: Vec<(usize, ElementId)>,
}

impl Iterator for Walk<'_> {
    type Item = (usize, ElementId);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        let children = self.tree.children(id);
        self.stack
            .extend(children.iter().rev().map(|&child| (depth + 1, child)));
        Some((depth, id))
    }
}
