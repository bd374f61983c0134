use super::ast::{Chain, Expr, Literal, Predicate, Step};
use crate::treebuild::{Document, NodeData, NodeId};
use hashbrown::{HashMap, HashSet};
use std::cmp::Ordering;

/// Walks a document against an expression. Aliases are followed wherever a step lands on one.
pub(crate) struct Evaluator<'d> {
    doc: &'d Document,
    /// Pre-order position of every node reachable from the root.
    order: HashMap<NodeId, usize>,
}

impl<'d> Evaluator<'d> {
    pub(crate) fn new(doc: &'d Document) -> Self {
        let order = doc
            .root()
            .map(|root| doc.walk(root))
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect();
        Evaluator { doc, order }
    }

    pub(crate) fn eval(&self, expr: &Expr, start: NodeId) -> Vec<NodeId> {
        let mut found = self.expr(expr, start);
        self.normalize(&mut found);
        found
    }

    fn normalize(&self, ids: &mut Vec<NodeId>) {
        ids.sort_by_key(|id| (self.order.get(id).copied().unwrap_or(usize::MAX), *id));
        ids.dedup();
    }

    fn expr(&self, expr: &Expr, start: NodeId) -> Vec<NodeId> {
        match expr {
            Expr::Chain(chain) => self.chain(chain, start),
            Expr::Union(parts) => parts.iter().flat_map(|p| self.expr(p, start)).collect(),
            Expr::Or(parts) => parts
                .iter()
                .map(|p| self.expr(p, start))
                .find(|found| !found.is_empty())
                .unwrap_or_default(),
            Expr::And(parts) => {
                let mut last = Vec::new();
                for part in parts {
                    last = self.expr(part, start);
                    if last.is_empty() {
                        break;
                    }
                }
                last
            }
        }
    }

    fn chain(&self, chain: &Chain, start: NodeId) -> Vec<NodeId> {
        let first = if chain.absolute {
            self.doc.root()
        } else {
            self.doc.follow(start)
        };
        let mut current: Vec<NodeId> = first.into_iter().collect();
        for step in &chain.steps {
            let mut next = Vec::new();
            for &id in &current {
                self.step(step, id, &mut next);
            }
            self.normalize(&mut next);
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }

    fn step(&self, step: &Step, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.doc.node(id) else {
            return;
        };
        match step {
            Step::This => out.push(id),
            Step::Parent => out.extend(node.parent()),
            Step::Root => out.extend(self.doc.root()),
            Step::Children => out.extend(self.children(id)),
            Step::Descendants => self.descendants(id, out),
            Step::Key(key) => out.extend(self.key(id, key)),
            Step::Index(index) => {
                let len = node.items().len() as i64;
                let at = if *index < 0 { len + index } else { *index };
                if (0..len).contains(&at) {
                    out.extend(self.doc.follow(node.items()[at as usize]));
                }
            }
            Step::Slice(from, to) => {
                let items = node.items();
                let len = items.len() as i64;
                let clamp = |bound: i64| {
                    let bound = if bound < 0 { len + bound } else { bound };
                    bound.clamp(0, len) as usize
                };
                let from = clamp(from.unwrap_or(0));
                let to = clamp(to.unwrap_or(len));
                if from < to {
                    out.extend(items[from..to].iter().filter_map(|&i| self.doc.follow(i)));
                }
            }
            Step::Filter(predicate) => {
                if self.holds(predicate, id) {
                    out.push(id);
                }
            }
        }
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.doc.node(id) else {
            return Vec::new();
        };
        let raw: Vec<NodeId> = match &node.data {
            NodeData::Sequence { items, .. } => items.clone(),
            NodeData::Mapping { pairs, .. } => pairs.iter().map(|p| p.value).collect(),
            _ => Vec::new(),
        };
        raw.into_iter().filter_map(|c| self.doc.follow(c)).collect()
    }

    fn descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
    }

    fn key(&self, id: NodeId, key: &str) -> Option<NodeId> {
        let node = self.doc.node(id)?;
        let found = match &node.data {
            NodeData::Mapping { .. } => self.doc.mapping_lookup(id, key)?,
            NodeData::Sequence { items, .. } => *items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
        self.doc.follow(found)
    }

    fn holds(&self, predicate: &Predicate, id: NodeId) -> bool {
        let found = self.chain(&predicate.chain, id);
        let Some((op, literal)) = &predicate.compare else {
            return !found.is_empty();
        };
        found.iter().any(|&n| {
            self.doc
                .node(n)
                .and_then(|node| node.scalar())
                .and_then(|text| compare(text, literal))
                .is_some_and(|ordering| op.holds(ordering))
        })
    }
}

fn compare(text: &str, literal: &Literal) -> Option<Ordering> {
    match literal {
        Literal::Number(number) => text.trim().parse::<f64>().ok()?.partial_cmp(number),
        Literal::Text(expected) => Some(text.cmp(expected.as_str())),
    }
}
