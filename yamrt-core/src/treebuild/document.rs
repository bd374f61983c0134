use crate::schema::{
    ResolveOptions, Resolved, Schema, BOOL_TAG, FLOAT_TAG, INT_TAG, NULL_TAG, STR_TAG,
};
use crate::treebuild::node::{Node, NodeData, NodeId, NodeKind, Pair};
use hashbrown::{HashMap, HashSet};
use yamrt_common::{
    CollectionStyle, Comments, Entry, Marker, ScalarType, SemanticErrorKind, Span, TagDirective,
    Version, YamlDoc, YamlError, YamlResult,
};

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// One YAML document as a node arena.
///
/// Nodes are addressed by [`NodeId`]. Freed slots go to a free list and are reused by later
/// allocations.
#[derive(Clone, Debug, Default)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: Option<NodeId>,
    anchors: HashMap<String, NodeId>,
    /// Version declared by a `%YAML` directive.
    pub version: Option<Version>,
    pub tag_directives: Vec<TagDirective>,
    pub schema: Schema,
    pub resolve_options: ResolveOptions,
    /// The source had a `---` marker.
    pub explicit_start: bool,
    /// The source had a `...` marker.
    pub explicit_end: bool,
    /// Comments around the document markers.
    pub comments: Comments,
    pub span: Span,
    pub(crate) resolved: bool,
}

fn invalid(id: NodeId, info: &str) -> YamlError {
    YamlError::semantic(
        SemanticErrorKind::InvalidNode,
        Marker::default(),
        format!("node {id}: {info}"),
    )
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Document::default()
    }

    #[must_use]
    pub fn with_schema(schema: Schema) -> Self {
        Document {
            schema,
            ..Document::default()
        }
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Makes a detached node the root. The previous root, if any, is detached, not removed.
    pub fn set_root(&mut self, id: NodeId) -> YamlResult<()> {
        if self.get(id)?.parent.is_some() {
            return Err(invalid(id, "node is attached to a parent"));
        }
        self.root = Some(id);
        Ok(())
    }

    pub(crate) fn set_root_unchecked(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// `true` once [`Document::resolve`] ran.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    #[must_use]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub(crate) fn get(&self, id: NodeId) -> YamlResult<&Node> {
        self.node(id).ok_or_else(|| invalid(id, "node was removed"))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> YamlResult<&mut Node> {
        self.node_mut(id)
            .ok_or_else(|| invalid(id, "node was removed"))
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId::new(self.slots.len() - 1, 0)
            }
        }
    }

    fn free_slot(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        Some(node)
    }

    pub fn create_scalar(&mut self, value: impl Into<String>, style: ScalarType) -> NodeId {
        let value = value.into();
        let implicit_tag = matches!(style, ScalarType::Plain | ScalarType::Any)
            .then(|| self.schema.resolve_with(&value, self.resolve_options).tag());
        let mut node = Node::new(NodeData::Scalar { value, style });
        node.implicit_tag = implicit_tag;
        self.insert(node)
    }

    pub fn create_sequence(&mut self, style: CollectionStyle) -> NodeId {
        self.insert(Node::new(NodeData::Sequence {
            items: Vec::new(),
            style,
        }))
    }

    pub fn create_mapping(&mut self, style: CollectionStyle) -> NodeId {
        self.insert(Node::new(NodeData::Mapping {
            pairs: Vec::new(),
            style,
        }))
    }

    /// Creates an alias to `name`, bound to the current definition of that anchor if there is one.
    pub fn create_alias(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let target = self.anchors.get(&name).copied();
        self.insert(Node::new(NodeData::Alias { name, target }))
    }

    fn check_detached(&self, parent: NodeId, child: NodeId) -> YamlResult<()> {
        if parent == child {
            return Err(invalid(child, "node cannot contain itself"));
        }
        let node = self.get(child)?;
        if node.parent.is_some() || self.root == Some(child) {
            return Err(invalid(child, "node is already attached"));
        }
        Ok(())
    }

    pub fn sequence_append(&mut self, seq: NodeId, item: NodeId) -> YamlResult<()> {
        self.check_detached(seq, item)?;
        match &mut self.get_mut(seq)?.data {
            NodeData::Sequence { items, .. } => items.push(item),
            _ => return Err(invalid(seq, "not a sequence")),
        }
        self.get_mut(item)?.parent = Some(seq);
        Ok(())
    }

    /// Adds a pair, rejecting a key equal to one already present.
    pub fn mapping_insert(&mut self, map: NodeId, key: NodeId, value: NodeId) -> YamlResult<()> {
        let existing = self.get(map)?.pairs().iter().map(|p| p.key).collect::<Vec<_>>();
        if existing.iter().any(|&k| self.node_eq(k, self, key)) {
            let mark = self.get(key)?.span.start;
            return Err(YamlError::semantic(
                SemanticErrorKind::DuplicateKey,
                mark,
                "duplicate key in mapping",
            ));
        }
        self.push_pair(map, key, value)
    }

    /// Adds a pair without checking for duplicate keys.
    pub(crate) fn push_pair(&mut self, map: NodeId, key: NodeId, value: NodeId) -> YamlResult<()> {
        self.check_detached(map, key)?;
        self.check_detached(map, value)?;
        if key == value {
            return Err(invalid(key, "key and value must be distinct nodes"));
        }
        match &mut self.get_mut(map)?.data {
            NodeData::Mapping { pairs, .. } => pairs.push(Pair { key, value }),
            _ => return Err(invalid(map, "not a mapping")),
        }
        self.get_mut(key)?.parent = Some(map);
        self.get_mut(value)?.parent = Some(map);
        Ok(())
    }

    /// Unlinks a node from its parent, keeping it in the arena.
    ///
    /// Detaching a mapping key or value drops the whole pair; the other half of the pair stays
    /// in the arena, detached.
    pub fn detach(&mut self, id: NodeId) -> YamlResult<()> {
        let parent = self.get(id)?.parent;
        let Some(parent) = parent else {
            if self.root == Some(id) {
                self.root = None;
            }
            return Ok(());
        };
        let mut orphan = None;
        match &mut self.get_mut(parent)?.data {
            NodeData::Sequence { items, .. } => items.retain(|&item| item != id),
            NodeData::Mapping { pairs, .. } => {
                if let Some(pos) = pairs.iter().position(|p| p.key == id || p.value == id) {
                    let pair = pairs.remove(pos);
                    orphan = Some(if pair.key == id { pair.value } else { pair.key });
                }
            }
            _ => {}
        }
        self.get_mut(id)?.parent = None;
        if let Some(other) = orphan {
            if let Some(node) = self.node_mut(other) {
                node.parent = None;
            }
        }
        Ok(())
    }

    /// Detaches a node and frees it together with every node it owns.
    pub fn remove(&mut self, id: NodeId) -> YamlResult<()> {
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.free_slot(current) else {
                continue;
            };
            if let Some(anchor) = &node.anchor {
                if self.anchors.get(anchor) == Some(&current) {
                    self.anchors.remove(anchor);
                }
            }
            for child in node.children() {
                // Shared nodes stay with their owner.
                if self.node(child).and_then(|c| c.parent) == Some(current) {
                    stack.push(child);
                }
            }
        }
        Ok(())
    }

    /// Names `id` with an anchor. Later aliases to `name` refer to it.
    pub fn set_anchor(&mut self, id: NodeId, name: impl Into<String>) -> YamlResult<()> {
        let name = name.into();
        self.get_mut(id)?.anchor = Some(name.clone());
        self.anchors.insert(name, id);
        Ok(())
    }

    /// Most recent node registered under `name`.
    #[must_use]
    pub fn anchor_lookup(&self, name: &str) -> Option<NodeId> {
        self.anchors
            .get(name)
            .copied()
            .filter(|&id| self.node(id).is_some())
    }

    pub fn anchors(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.anchors.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Value of the first pair whose key is the scalar `key`.
    #[must_use]
    pub fn mapping_lookup(&self, map: NodeId, key: &str) -> Option<NodeId> {
        self.node(map)?
            .pairs()
            .iter()
            .find(|p| self.node(p.key).and_then(Node::scalar) == Some(key))
            .map(|p| p.value)
    }

    /// Value of the first pair whose key equals node `key` of `other`.
    #[must_use]
    pub fn mapping_lookup_node(&self, map: NodeId, other: &Document, key: NodeId) -> Option<NodeId> {
        self.node(map)?
            .pairs()
            .iter()
            .find(|p| self.node_eq(p.key, other, key))
            .map(|p| p.value)
    }

    /// Follows an alias to its target. Other nodes map to themselves.
    #[must_use]
    pub fn follow(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..=self.slots.len() {
            match &self.node(current)?.data {
                NodeData::Alias { name, target } => {
                    current = target
                        .filter(|&t| self.node(t).is_some())
                        .or_else(|| self.anchor_lookup(name))?;
                }
                _ => return Some(current),
            }
        }
        None
    }

    /// Structural equality of node `a` here and node `b` in `other`.
    ///
    /// Scalars compare by effective tag and text; collections element by element; aliases by name.
    #[must_use]
    pub fn node_eq(&self, a: NodeId, other: &Document, b: NodeId) -> bool {
        let (Some(x), Some(y)) = (self.node(a), other.node(b)) else {
            return false;
        };
        if x.kind() != y.kind() || x.effective_tag() != y.effective_tag() {
            return false;
        }
        match (&x.data, &y.data) {
            (NodeData::Scalar { value: v1, .. }, NodeData::Scalar { value: v2, .. }) => v1 == v2,
            (NodeData::Alias { name: n1, .. }, NodeData::Alias { name: n2, .. }) => n1 == n2,
            (NodeData::Sequence { items: i1, .. }, NodeData::Sequence { items: i2, .. }) => {
                i1.len() == i2.len()
                    && i1.iter().zip(i2).all(|(&c1, &c2)| self.node_eq(c1, other, c2))
            }
            (NodeData::Mapping { pairs: p1, .. }, NodeData::Mapping { pairs: p2, .. }) => {
                p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(l, r)| {
                        self.node_eq(l.key, other, r.key) && self.node_eq(l.value, other, r.value)
                    })
            }
            _ => false,
        }
    }

    /// Deep copy of node `id` of `other` into this document, detached.
    ///
    /// Anchors travel with the copy. Aliases are rebound by name in this document.
    pub fn copy_node_from(&mut self, other: &Document, id: NodeId) -> YamlResult<NodeId> {
        let node = other.get(id)?;
        let mut copy = Node::new(NodeData::Scalar {
            value: String::new(),
            style: ScalarType::Plain,
        });
        copy.tag = node.tag.clone();
        copy.implicit_tag = node.implicit_tag;
        copy.span = node.span;
        copy.comments = node.comments.clone();
        copy.data = match &node.data {
            NodeData::Scalar { value, style } => NodeData::Scalar {
                value: value.clone(),
                style: *style,
            },
            NodeData::Alias { name, .. } => NodeData::Alias {
                name: name.clone(),
                target: self.anchors.get(name).copied(),
            },
            NodeData::Sequence { style, .. } => NodeData::Sequence {
                items: Vec::new(),
                style: *style,
            },
            NodeData::Mapping { style, .. } => NodeData::Mapping {
                pairs: Vec::new(),
                style: *style,
            },
        };
        let new_id = self.insert(copy);
        if let Some(anchor) = &node.anchor {
            self.set_anchor(new_id, anchor.clone())?;
        }
        match &node.data {
            NodeData::Sequence { items, .. } => {
                for &item in items {
                    let child = self.copy_node_from(other, item)?;
                    self.sequence_append(new_id, child)?;
                }
            }
            NodeData::Mapping { pairs, .. } => {
                for pair in pairs {
                    let key = self.copy_node_from(other, pair.key)?;
                    let value = self.copy_node_from(other, pair.value)?;
                    self.push_pair(new_id, key, value)?;
                }
            }
            _ => {}
        }
        Ok(new_id)
    }

    /// Deep copy of a node of this document, detached and without anchors.
    pub(crate) fn copy_within(&mut self, id: NodeId) -> YamlResult<NodeId> {
        let mut copy = self.get(id)?.clone();
        copy.parent = None;
        copy.anchor = None;
        let children = std::mem::replace(
            &mut copy.data,
            NodeData::Scalar {
                value: String::new(),
                style: ScalarType::Plain,
            },
        );
        copy.data = match &children {
            NodeData::Sequence { style, .. } => NodeData::Sequence {
                items: Vec::new(),
                style: *style,
            },
            NodeData::Mapping { style, .. } => NodeData::Mapping {
                pairs: Vec::new(),
                style: *style,
            },
            other => other.clone(),
        };
        let new_id = self.insert(copy);
        match children {
            NodeData::Sequence { items, .. } => {
                for item in items {
                    let child = self.copy_within(item)?;
                    self.sequence_append(new_id, child)?;
                }
            }
            NodeData::Mapping { pairs, .. } => {
                for pair in pairs {
                    let key = self.copy_within(pair.key)?;
                    let value = self.copy_within(pair.value)?;
                    self.push_pair(new_id, key, value)?;
                }
            }
            _ => {}
        }
        Ok(new_id)
    }

    /// Merges the root of `other` into this document.
    ///
    /// Mappings merge pair by pair (recursively for keys present in both), sequences are
    /// appended, and anything else replaces the current root.
    pub fn join(&mut self, other: &Document) -> YamlResult<()> {
        let Some(from) = other.root else {
            return Ok(());
        };
        match self.root {
            Some(to) => self.join_node(to, other, from),
            None => {
                let copy = self.copy_node_from(other, from)?;
                self.root = Some(copy);
                Ok(())
            }
        }
    }

    fn join_node(&mut self, to: NodeId, other: &Document, from: NodeId) -> YamlResult<()> {
        let to_kind = self.get(to)?.kind();
        let from_node = other.get(from)?;
        match (to_kind, from_node.kind()) {
            (NodeKind::Mapping, NodeKind::Mapping) => {
                for pair in from_node.pairs() {
                    match self.mapping_lookup_node(to, other, pair.key) {
                        Some(existing) => self.join_node(existing, other, pair.value)?,
                        None => {
                            let key = self.copy_node_from(other, pair.key)?;
                            let value = self.copy_node_from(other, pair.value)?;
                            self.push_pair(to, key, value)?;
                        }
                    }
                }
                Ok(())
            }
            (NodeKind::Sequence, NodeKind::Sequence) => {
                for &item in from_node.items() {
                    let copy = self.copy_node_from(other, item)?;
                    self.sequence_append(to, copy)?;
                }
                Ok(())
            }
            _ => self.replace_node(to, other, from),
        }
    }

    fn replace_node(&mut self, to: NodeId, other: &Document, from: NodeId) -> YamlResult<()> {
        let copy = self.copy_node_from(other, from)?;
        let parent = self.get(to)?.parent;
        match parent {
            None => {
                self.root = Some(copy);
                self.remove(to)?;
            }
            Some(parent) => {
                self.replace_child(parent, to, copy)?;
                self.get_mut(to)?.parent = None;
                self.remove(to)?;
            }
        }
        Ok(())
    }

    /// Puts `new` where `old` sits in `parent`. Does not touch the parent link of `old`.
    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> YamlResult<()> {
        match &mut self.get_mut(parent)?.data {
            NodeData::Sequence { items, .. } => {
                for item in items.iter_mut().filter(|item| **item == old) {
                    *item = new;
                }
            }
            NodeData::Mapping { pairs, .. } => {
                for pair in pairs.iter_mut() {
                    if pair.key == old {
                        pair.key = new;
                    }
                    if pair.value == old {
                        pair.value = new;
                    }
                }
            }
            _ => return Err(invalid(parent, "not a collection")),
        }
        if let Some(node) = self.node_mut(new) {
            if node.parent.is_none() {
                node.parent = Some(parent);
            }
        }
        Ok(())
    }

    /// Nodes reachable from `start`, in document order. Shared nodes are listed once.
    #[must_use]
    pub fn walk(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.node(id) else {
                continue;
            };
            order.push(id);
            let children: Vec<NodeId> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        order
    }

    /// Schema-resolved value of the root, `Null` for an empty document.
    pub fn root_value(&self) -> YamlResult<YamlDoc> {
        match self.root {
            Some(root) => self.to_value(root),
            None => Ok(YamlDoc::Null),
        }
    }

    /// Schema-resolved, alias-free value of node `id`.
    ///
    /// Aliases are followed. An explicit core tag whose text does not read as that kind is an
    /// `UnresolvedTag` error, and an alias that leads back into itself is `CycleInResolve`.
    pub fn to_value(&self, id: NodeId) -> YamlResult<YamlDoc> {
        let mut active = HashSet::new();
        self.value_of(id, &mut active)
    }

    fn value_of(&self, id: NodeId, active: &mut HashSet<NodeId>) -> YamlResult<YamlDoc> {
        let node = self.get(id)?;
        if !active.insert(id) {
            return Err(YamlError::semantic(
                SemanticErrorKind::CycleInResolve,
                node.span.start,
                "alias refers to one of its own ancestors",
            ));
        }
        let value = match &node.data {
            NodeData::Scalar { value, style } => self.scalar_value(node, value, *style)?,
            NodeData::Alias { name, .. } => {
                let target = self.follow(id).ok_or_else(|| {
                    YamlError::semantic(
                        SemanticErrorKind::UndefinedAlias,
                        node.span.start,
                        format!("no anchor named `{name}`"),
                    )
                })?;
                self.value_of(target, active)?
            }
            NodeData::Sequence { items, .. } => YamlDoc::Sequence(
                items
                    .iter()
                    .map(|&item| self.value_of(item, active))
                    .collect::<YamlResult<_>>()?,
            ),
            NodeData::Mapping { pairs, .. } => YamlDoc::Mapping(
                pairs
                    .iter()
                    .map(|p| {
                        Ok(Entry::new(
                            self.value_of(p.key, active)?,
                            self.value_of(p.value, active)?,
                        ))
                    })
                    .collect::<YamlResult<_>>()?,
            ),
        };
        active.remove(&id);
        Ok(value)
    }

    fn scalar_value(&self, node: &Node, value: &str, style: ScalarType) -> YamlResult<YamlDoc> {
        let resolved = match node.tag.as_deref() {
            Some(tag @ (NULL_TAG | BOOL_TAG | INT_TAG | FLOAT_TAG | STR_TAG)) => self
                .schema
                .resolve_tagged(tag, value, self.resolve_options)
                .ok_or_else(|| {
                    YamlError::semantic(
                        SemanticErrorKind::UnresolvedTag,
                        node.span.start,
                        format!("`{value}` cannot be read as <{tag}>"),
                    )
                })?,
            Some(_) => Resolved::Str,
            None if matches!(style, ScalarType::Plain | ScalarType::Any) => {
                self.schema.resolve_with(value, self.resolve_options)
            }
            None => Resolved::Str,
        };
        Ok(match resolved {
            Resolved::Null => YamlDoc::Null,
            Resolved::Bool(b) => YamlDoc::Bool(b),
            Resolved::Int(i) => YamlDoc::Integer(i),
            Resolved::BigInt(text) => YamlDoc::BigInteger(text),
            Resolved::Float(f) => YamlDoc::FloatingPoint(f),
            Resolved::Str => YamlDoc::String(value.to_string()),
        })
    }
}
