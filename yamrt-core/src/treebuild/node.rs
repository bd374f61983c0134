use crate::schema::{MAP_TAG, SEQ_TAG, STR_TAG};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use yamrt_common::{CollectionStyle, Comments, ScalarType, Span};

/// Handle of a node inside one [`Document`](super::Document).
///
/// Ids stay valid until their node is removed. A removed slot may be reused, and the generation
/// makes stale ids miss instead of reaching the new occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        NodeId {
            index: index as u32,
            generation,
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pair {
    pub key: NodeId,
    pub value: NodeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
    Alias,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Scalar {
        value: String,
        style: ScalarType,
    },
    Sequence {
        items: Vec<NodeId>,
        style: CollectionStyle,
    },
    Mapping {
        pairs: Vec<Pair>,
        style: CollectionStyle,
    },
    /// Reference to an anchored node. `target` is the definition in force where the alias was
    /// read; it is filled in by the composer and looked up by name otherwise.
    Alias {
        name: String,
        target: Option<NodeId>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub data: NodeData,
    pub tag: Option<String>,
    pub anchor: Option<String>,
    /// Tag the schema gave an untagged plain scalar.
    pub implicit_tag: Option<&'static str>,
    pub span: Span,
    pub comments: Comments,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Node {
            data,
            tag: None,
            anchor: None,
            implicit_tag: None,
            span: Span::default(),
            comments: Comments::default(),
            parent: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Scalar { .. } => NodeKind::Scalar,
            NodeData::Sequence { .. } => NodeKind::Sequence,
            NodeData::Mapping { .. } => NodeKind::Mapping,
            NodeData::Alias { .. } => NodeKind::Alias,
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self.data, NodeData::Scalar { .. })
    }

    #[must_use]
    pub fn is_alias(&self) -> bool {
        matches!(self.data, NodeData::Alias { .. })
    }

    #[must_use]
    pub fn scalar(&self) -> Option<&str> {
        match &self.data {
            NodeData::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn scalar_style(&self) -> Option<ScalarType> {
        match self.data {
            NodeData::Scalar { style, .. } => Some(style),
            _ => None,
        }
    }

    #[must_use]
    pub fn collection_style(&self) -> Option<CollectionStyle> {
        match self.data {
            NodeData::Sequence { style, .. } | NodeData::Mapping { style, .. } => Some(style),
            _ => None,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Sequence { items, .. } => items,
            _ => &[],
        }
    }

    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        match &self.data {
            NodeData::Mapping { pairs, .. } => pairs,
            _ => &[],
        }
    }

    #[must_use]
    pub fn alias_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Alias { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Explicit tag, else the schema tag, else the kind's default tag.
    ///
    /// Aliases have none.
    #[must_use]
    pub fn effective_tag(&self) -> Cow<'_, str> {
        if let Some(tag) = &self.tag {
            return Cow::Borrowed(tag);
        }
        match &self.data {
            NodeData::Scalar { style, .. } => match (style, self.implicit_tag) {
                (ScalarType::Plain, Some(tag)) => Cow::Borrowed(tag),
                _ => Cow::Borrowed(STR_TAG),
            },
            NodeData::Sequence { .. } => Cow::Borrowed(SEQ_TAG),
            NodeData::Mapping { .. } => Cow::Borrowed(MAP_TAG),
            NodeData::Alias { .. } => Cow::Borrowed(""),
        }
    }

    /// Child ids in document order; mapping pairs yield key then value.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        let (items, pairs): (&[NodeId], &[Pair]) = match &self.data {
            NodeData::Sequence { items, .. } => (items, &[]),
            NodeData::Mapping { pairs, .. } => (&[], pairs),
            _ => (&[], &[]),
        };
        items
            .iter()
            .copied()
            .chain(pairs.iter().flat_map(|p| [p.key, p.value]))
    }
}
