use crate::treebuild::document::Document;
use crate::treebuild::node::{NodeData, NodeId, NodeKind, Pair};
use hashbrown::{HashMap, HashSet};
use yamrt_common::{ScalarType, SemanticErrorKind, YamlError, YamlResult};

pub const MERGE_TAG: &str = "tag:yaml.org,2002:merge";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Open,
    Done,
}

impl Document {
    /// Replaces aliases by the nodes they name and expands merge keys.
    ///
    /// After this the document is a DAG: a node may be reachable from several parents but keeps
    /// its original owner. Merged pairs are deep copies; explicit keys win over merged ones and
    /// earlier merge sources win over later ones. On error, a reference cycle (`CycleInResolve`)
    /// among others, the document is left as it was.
    pub fn resolve(&mut self) -> YamlResult<()> {
        let before = self.clone();
        let result = self.resolve_in_place();
        if result.is_err() {
            *self = before;
        }
        result
    }

    fn resolve_in_place(&mut self) -> YamlResult<()> {
        let Some(root) = self.root() else {
            self.resolved = true;
            return Ok(());
        };

        let aliases: Vec<NodeId> = self
            .walk(root)
            .into_iter()
            .filter(|&id| self.node(id).is_some_and(|n| n.is_alias()))
            .collect();
        let mut replacement = HashMap::new();
        for &alias in &aliases {
            replacement.insert(alias, self.alias_target(alias)?);
        }
        self.check_cycles(root, &replacement)?;

        for (&alias, &target) in &replacement {
            match self.get(alias)?.parent() {
                Some(parent) => self.replace_child(parent, alias, target)?,
                None if self.root() == Some(alias) => self.set_root_unchecked(target),
                None => continue,
            }
            if let Some(node) = self.node_mut(alias) {
                node.set_parent(None);
            }
            self.remove(alias)?;
        }
        log::debug!("resolved {} aliases", replacement.len());

        let shared: HashSet<NodeId> = replacement.values().copied().collect();
        let mut done = HashSet::new();
        let mut dropped = Vec::new();
        let root = self.root().unwrap_or(root);
        for id in self.walk(root) {
            if !self.node(id).is_some_and(|n| n.kind() == NodeKind::Mapping) {
                continue;
            }
            self.expand_merges(id, &mut done, &mut dropped)?;
        }
        // Only free the `<<` pairs once every merge has read its sources.
        for &(map, pair) in &dropped {
            self.release_owned(pair.key, map, &shared)?;
            self.release_owned(pair.value, map, &shared)?;
        }
        if !dropped.is_empty() {
            log::debug!("expanded {} merge keys", dropped.len());
        }
        self.resolved = true;
        Ok(())
    }

    fn alias_target(&self, alias: NodeId) -> YamlResult<NodeId> {
        let mut current = alias;
        let mut seen = HashSet::new();
        loop {
            let node = self.get(current)?;
            let NodeData::Alias { name, target } = &node.data else {
                return Ok(current);
            };
            if !seen.insert(current) {
                return Err(YamlError::semantic(
                    SemanticErrorKind::CycleInResolve,
                    node.span.start,
                    format!("alias `{name}` refers to itself"),
                ));
            }
            current = target
                .filter(|&t| self.node(t).is_some())
                .or_else(|| self.anchor_lookup(name))
                .ok_or_else(|| {
                    YamlError::semantic(
                        SemanticErrorKind::UndefinedAlias,
                        node.span.start,
                        format!("no anchor named `{name}`"),
                    )
                })?;
        }
    }

    /// Depth-first search over the graph the aliases would form.
    fn check_cycles(&self, root: NodeId, replacement: &HashMap<NodeId, NodeId>) -> YamlResult<()> {
        let children = |id: NodeId| -> Vec<NodeId> {
            self.node(id)
                .map(|n| {
                    n.children()
                        .map(|c| replacement.get(&c).copied().unwrap_or(c))
                        .collect()
                })
                .unwrap_or_default()
        };
        let root = replacement.get(&root).copied().unwrap_or(root);
        let mut visits = HashMap::new();
        let mut stack = vec![(root, children(root), 0usize)];
        visits.insert(root, Visit::Open);
        while let Some(top) = stack.last_mut() {
            let id = top.0;
            let next = top.1.get(top.2).copied();
            top.2 += 1;
            if let Some(child) = next {
                match visits.get(&child) {
                    Some(Visit::Open) => {
                        let mark = self.node(child).map(|n| n.span.start).unwrap_or_default();
                        return Err(YamlError::semantic(
                            SemanticErrorKind::CycleInResolve,
                            mark,
                            format!("node {child} contains itself through an alias"),
                        ));
                    }
                    Some(Visit::Done) => {}
                    None => {
                        visits.insert(child, Visit::Open);
                        stack.push((child, children(child), 0));
                    }
                }
            } else {
                visits.insert(id, Visit::Done);
                stack.pop();
            }
        }
        Ok(())
    }

    fn is_merge_key(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| {
            n.scalar() == Some("<<")
                && n.scalar_style() == Some(ScalarType::Plain)
                && n.tag.as_deref().map_or(true, |t| t == MERGE_TAG)
        })
    }

    /// Mappings a merge value names, or `None` if it is not a valid merge value.
    fn merge_sources(&self, value: NodeId) -> Option<Vec<NodeId>> {
        let node = self.node(value)?;
        match &node.data {
            NodeData::Mapping { .. } => Some(vec![value]),
            NodeData::Sequence { items, .. } => items
                .iter()
                .map(|&item| match self.node(item)?.data {
                    NodeData::Mapping { .. } => Some(item),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// Expands the merge keys of `map`, and of its merge sources first. The `<<` pairs taken out
    /// of a mapping are pushed to `dropped` with their former owner.
    fn expand_merges(
        &mut self,
        map: NodeId,
        done: &mut HashSet<NodeId>,
        dropped: &mut Vec<(NodeId, Pair)>,
    ) -> YamlResult<()> {
        if !done.insert(map) {
            return Ok(());
        }
        let pairs = self.get(map)?.pairs().to_vec();
        let mut merges = Vec::new();
        for (idx, pair) in pairs.iter().enumerate() {
            if self.is_merge_key(pair.key) {
                if let Some(sources) = self.merge_sources(pair.value) {
                    merges.push((idx, sources));
                }
            }
        }
        if merges.is_empty() {
            return Ok(());
        }
        for (_, sources) in &merges {
            for &source in sources {
                self.expand_merges(source, done, dropped)?;
            }
        }

        let merge_positions: HashSet<usize> = merges.iter().map(|(idx, _)| *idx).collect();
        let explicit: Vec<NodeId> = pairs
            .iter()
            .enumerate()
            .filter(|(idx, _)| !merge_positions.contains(idx))
            .map(|(_, p)| p.key)
            .collect();

        let mut merged: Vec<Pair> = Vec::new();
        for (_, sources) in &merges {
            for &source in sources {
                let source_pairs = self.get(source)?.pairs().to_vec();
                for pair in source_pairs {
                    let taken = explicit
                        .iter()
                        .chain(merged.iter().map(|p| &p.key))
                        .any(|&k| self.node_eq(k, self, pair.key));
                    if taken {
                        continue;
                    }
                    let key = self.copy_within(pair.key)?;
                    let value = self.copy_within(pair.value)?;
                    merged.push(Pair { key, value });
                }
            }
        }

        let first_merge = merges[0].0;
        let mut rebuilt = Vec::with_capacity(pairs.len() + merged.len());
        for (idx, pair) in pairs.iter().enumerate() {
            if idx == first_merge {
                rebuilt.extend(merged.iter().copied());
            }
            if !merge_positions.contains(&idx) {
                rebuilt.push(*pair);
            }
        }
        for pair in &merged {
            for id in [pair.key, pair.value] {
                if let Some(node) = self.node_mut(id) {
                    node.set_parent(Some(map));
                }
            }
        }
        if let NodeData::Mapping { pairs: slot, .. } = &mut self.get_mut(map)?.data {
            *slot = rebuilt;
        }
        dropped.extend(merges.iter().map(|&(idx, _)| (map, pairs[idx])));
        Ok(())
    }

    /// Frees `id` if `owner` owns it. A node some alias pointed at may still be reachable
    /// elsewhere, so it only loses its owner.
    fn release_owned(
        &mut self,
        id: NodeId,
        owner: NodeId,
        shared: &HashSet<NodeId>,
    ) -> YamlResult<()> {
        match self.node_mut(id) {
            Some(node) if node.parent() == Some(owner) => {
                node.set_parent(None);
                if shared.contains(&id) {
                    Ok(())
                } else {
                    self.remove(id)
                }
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::treebuild::{Document, YamlLoader};
    use yamrt_common::{SemanticErrorKind, YamlDoc};

    fn load(input: &str) -> Document {
        YamlLoader::load_from_str(input)
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn aliases_share_their_target() {
        let mut doc = load("a: &x {k: v}\nb: *x\n");
        doc.resolve().unwrap();
        let root = doc.root().unwrap();
        let a = doc.mapping_lookup(root, "a").unwrap();
        let b = doc.mapping_lookup(root, "b").unwrap();
        assert_eq!(a, b);
        assert_eq!(doc.anchor_lookup("x"), Some(a));
        assert!(doc.is_resolved());
    }

    #[test]
    fn merge_keys() {
        let mut doc = load("defaults: &d {timeout: 30}\nserver: {<<: *d, host: example}\n");
        doc.resolve().unwrap();
        let value = doc.root_value().unwrap();
        let server = value.get("server").unwrap();
        assert_eq!(server.get("timeout"), Some(&YamlDoc::Integer(30)));
        assert_eq!(server.get("host").and_then(YamlDoc::as_str), Some("example"));
        assert!(server.get("<<").is_none());
    }

    #[test]
    fn merge_precedence() {
        let input = "\
a: &a {x: 1, y: 1}
b: &b {x: 2, z: 2}
c:
  <<: [*a, *b]
  y: 3
";
        let mut doc = load(input);
        doc.resolve().unwrap();
        let value = doc.root_value().unwrap();
        let c = value.get("c").unwrap();
        assert_eq!(c.get("x"), Some(&YamlDoc::Integer(1)));
        assert_eq!(c.get("y"), Some(&YamlDoc::Integer(3)));
        assert_eq!(c.get("z"), Some(&YamlDoc::Integer(2)));
    }

    #[test]
    fn merge_key_through_alias() {
        let mut doc = load("defaults: &d {timeout: 30}\nserver: {<<: *d, host: example}\n");
        let live = doc.len();
        doc.resolve().unwrap();
        assert!(doc.is_resolved());
        let root = doc.root().unwrap();
        let server = doc.mapping_lookup(root, "server").unwrap();
        let timeout = doc.mapping_lookup(server, "timeout").unwrap();
        assert_eq!(doc.to_value(timeout).unwrap(), YamlDoc::Integer(30));
        assert!(doc.mapping_lookup(server, "<<").is_none());
        // `<<` and the alias are freed, `timeout: 30` is copied in.
        assert_eq!(doc.len(), live);
        // The merge source is untouched.
        let defaults = doc.mapping_lookup(root, "defaults").unwrap();
        assert_eq!(doc.anchor_lookup("d"), Some(defaults));
        assert_eq!(doc.node(defaults).unwrap().pairs().len(), 1);
    }

    #[test]
    fn nested_merges() {
        let input = "\
base: &base {a: 1}
mid: &mid
  <<: *base
  b: 2
top:
  <<: *mid
  c: 3
";
        let mut doc = load(input);
        doc.resolve().unwrap();
        let value = doc.root_value().unwrap();
        let top = value.get("top").unwrap();
        for (key, expected) in [("a", 1), ("b", 2), ("c", 3)] {
            assert_eq!(top.get(key), Some(&YamlDoc::Integer(expected)), "{key}");
        }
        assert!(top.get("<<").is_none());
        assert!(value.get("mid").unwrap().get("<<").is_none());
    }

    #[test]
    fn inline_merge_source_shared_by_alias() {
        let input = "\
first: {<<: &inline {x: 1}, y: 2}
second: {<<: *inline}
plain: *inline
";
        let mut doc = load(input);
        doc.resolve().unwrap();
        let value = doc.root_value().unwrap();
        assert_eq!(value.get("first").unwrap().get("x"), Some(&YamlDoc::Integer(1)));
        assert_eq!(value.get("second").unwrap().get("x"), Some(&YamlDoc::Integer(1)));
        assert_eq!(value.get("plain").unwrap().get("x"), Some(&YamlDoc::Integer(1)));
    }

    #[test]
    fn failed_resolve_changes_nothing() {
        let input = "\
defaults: &d {timeout: 30}
server: {<<: *d, host: example}
link: *d
loop: &l [1, *l]
";
        let mut doc = load(input);
        let before = doc.clone();
        let err = doc.resolve().unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::CycleInResolve));
        assert!(!doc.is_resolved());
        assert_eq!(doc.len(), before.len());
        let (root, old_root) = (doc.root().unwrap(), before.root().unwrap());
        assert_eq!(root, old_root);
        assert!(doc.node_eq(root, &before, old_root));
        assert_eq!(doc.walk(root), before.walk(old_root));
        let server = doc.mapping_lookup(root, "server").unwrap();
        assert!(doc.mapping_lookup(server, "<<").is_some());
        assert!(doc.node(doc.mapping_lookup(root, "link").unwrap()).unwrap().is_alias());
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut doc = load("&a [1, *a]\n");
        let err = doc.resolve().unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::CycleInResolve));
        assert!(!doc.is_resolved());
        let err = doc.root_value().unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::CycleInResolve));
    }
}
