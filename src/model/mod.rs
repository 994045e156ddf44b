//! The decoded element tree.

mod edit;
mod tree;
mod value;

use std::fmt;

use serde::Serialize;

pub use self::edit::ChangeHook;
pub use self::tree::{Element, ElementTree, Walk};
pub use self::value::{MAC_EPOCH_OFFSET, MacDate, Point, Rect, Value};

pub(crate) use self::value::to_hex_string;

/// Handle to one element of an [`ElementTree`].
///
/// Ids are only meaningful for the tree that issued them, and an id goes stale when its
/// element is removed (slots are reused by later insertions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an element stands for a template item or for one repetition of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Field,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PathSegment {
    Field { index: usize, label: String },
    Group(usize),
}

/// Location of an element, from the root down: `/Entries[1]/Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ElementPath(Vec<PathSegment>);

impl ElementPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        ElementPath(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            match segment {
                PathSegment::Field { label, .. } if !label.is_empty() => write!(f, "/{}", label)?,
                PathSegment::Field { index, .. } => write!(f, "/#{}", index)?,
                PathSegment::Group(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = ElementPath::new(vec![
            PathSegment::Field {
                index: 1,
                label: "Entries".to_string(),
            },
            PathSegment::Group(2),
            PathSegment::Field {
                index: 0,
                label: String::new(),
            },
        ]);
        assert_eq!(path.to_string(), "/Entries[2]/#0");
        assert_eq!(ElementPath::default().to_string(), "/");
    }
}
