use crate::escaper::escape_double_quoted;
use crate::treebuild::document::Document;
use crate::treebuild::node::{NodeData, NodeId};
use crate::treebuild::YamlLoader;

/// How [`Document::path_to_node`] treats aliases it has not seen resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PathFollow {
    /// Walk through aliases to their anchored node.
    #[default]
    Follow,
    /// Aliases are leaves.
    DontFollow,
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Index(usize),
    Key(String),
    /// Flow YAML text of a collection key.
    Complex(String),
}

fn parse_path(path: &str) -> Option<(bool, Vec<Segment>)> {
    let chars: Vec<char> = path.chars().collect();
    let mut pos = 0;
    let absolute = chars.first() == Some(&'/');
    if absolute {
        pos += 1;
    }
    let mut segments = Vec::new();
    while pos < chars.len() {
        let (segment, next) = match chars[pos] {
            '"' => double_quoted(&chars, pos + 1)?,
            '\'' => single_quoted(&chars, pos + 1)?,
            '[' => match index(&chars, pos + 1) {
                Some(found) => found,
                None => complex(&chars, pos)?,
            },
            '{' => complex(&chars, pos)?,
            _ => {
                let end = chars[pos..]
                    .iter()
                    .position(|&c| c == '/')
                    .map_or(chars.len(), |p| pos + p);
                let key: String = chars[pos..end].iter().collect();
                if key.is_empty() {
                    return None;
                }
                (Segment::Key(key), end)
            }
        };
        segments.push(segment);
        pos = next;
        match chars.get(pos) {
            None => {}
            Some('/') => pos += 1,
            Some(_) => return None,
        }
    }
    Some((absolute, segments))
}

fn double_quoted(chars: &[char], mut pos: usize) -> Option<(Segment, usize)> {
    let mut key = String::new();
    loop {
        match chars.get(pos)? {
            '"' => return Some((Segment::Key(key), pos + 1)),
            '\\' => {
                pos += 1;
                key.push(match chars.get(pos)? {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    c => *c,
                });
            }
            c => key.push(*c),
        }
        pos += 1;
    }
}

fn single_quoted(chars: &[char], mut pos: usize) -> Option<(Segment, usize)> {
    let mut key = String::new();
    loop {
        match chars.get(pos)? {
            '\'' if chars.get(pos + 1) == Some(&'\'') => {
                key.push('\'');
                pos += 1;
            }
            '\'' => return Some((Segment::Key(key), pos + 1)),
            c => key.push(*c),
        }
        pos += 1;
    }
}

fn index(chars: &[char], pos: usize) -> Option<(Segment, usize)> {
    let len = chars[pos..].iter().take_while(|c| c.is_ascii_digit()).count();
    if len == 0 || chars.get(pos + len) != Some(&']') {
        return None;
    }
    let digits: String = chars[pos..pos + len].iter().collect();
    Some((Segment::Index(digits.parse().ok()?), pos + len + 1))
}

/// Balanced `{...}` or `[...]`, skipping over quoted text.
fn complex(chars: &[char], start: usize) -> Option<(Segment, usize)> {
    let mut depth = 0usize;
    let mut pos = start;
    let mut quote: Option<char> = None;
    while let Some(&c) = chars.get(pos) {
        match (quote, c) {
            (Some('"'), '\\') => pos += 1,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{' | '[') => depth += 1,
            (None, '}' | ']') => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let text: String = chars[start..=pos].iter().collect();
                    return Some((Segment::Complex(text), pos + 1));
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

fn bare_key_ok(key: &str) -> bool {
    !key.is_empty()
        && key.trim() == key
        && !key.starts_with(['"', '\'', '[', '{'])
        && !key.contains(['/', '\\'])
        && !key.chars().any(char::is_control)
}

impl Document {
    /// Finds a node by path.
    ///
    /// Paths look like `/key/[0]/"quoted key"/{complex: key}`. A leading `/` starts at the root,
    /// anything else at `start` (or the root when there is none).
    #[must_use]
    pub fn path_to_node(&self, start: Option<NodeId>, path: &str, follow: PathFollow) -> Option<NodeId> {
        let (absolute, segments) = parse_path(path)?;
        let mut current = match start {
            Some(start) if !absolute => start,
            _ => self.root()?,
        };
        for segment in segments {
            current = self.step(current, follow)?;
            let node = self.node(current)?;
            current = match (&node.data, segment) {
                (NodeData::Sequence { items, .. }, Segment::Index(i)) => *items.get(i)?,
                (NodeData::Sequence { items, .. }, Segment::Key(key)) => {
                    *items.get(key.parse::<usize>().ok()?)?
                }
                (NodeData::Mapping { .. }, Segment::Key(key)) => self.mapping_lookup(current, &key)?,
                (NodeData::Mapping { .. }, Segment::Complex(text)) => {
                    let key_doc = YamlLoader::load_from_str(&text).ok()?.into_iter().next()?;
                    self.mapping_lookup_node(current, &key_doc, key_doc.root()?)?
                }
                _ => return None,
            };
        }
        self.step(current, follow)
    }

    fn step(&self, id: NodeId, follow: PathFollow) -> Option<NodeId> {
        match follow {
            PathFollow::Follow => self.follow(id),
            PathFollow::DontFollow => self.node(id).map(|_| id),
        }
    }

    /// Absolute path of a node attached under the root, in the syntax of
    /// [`Document::path_to_node`]. A mapping key reports the path of its value.
    #[must_use]
    pub fn node_path(&self, id: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = id;
        while Some(current) != self.root() {
            let parent = self.node(current)?.parent()?;
            let parent_node = self.node(parent)?;
            let segment = match &parent_node.data {
                NodeData::Sequence { items, .. } => {
                    format!("[{}]", items.iter().position(|&i| i == current)?)
                }
                NodeData::Mapping { pairs, .. } => {
                    let pair = pairs.iter().find(|p| p.key == current || p.value == current)?;
                    self.key_segment(pair.key)?
                }
                _ => return None,
            };
            segments.push(segment);
            current = parent;
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }

    fn key_segment(&self, key: NodeId) -> Option<String> {
        let node = self.node(key)?;
        match node.scalar() {
            Some(text) if bare_key_ok(text) => Some(text.to_string()),
            Some(text) => Some(format!("\"{}\"", escape_double_quoted(text))),
            None => crate::emitter::node_to_flow_string(self, key).ok(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    fn load(input: &str) -> Document {
        YamlLoader::load_from_str(input)
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    #[rstest]
    #[case("/a/[0]", vec![Segment::Key("a".into()), Segment::Index(0)])]
    #[case("/\"x/y\"/'it''s'", vec![Segment::Key("x/y".into()), Segment::Key("it's".into())])]
    #[case("/{a: [1]}/b", vec![Segment::Complex("{a: [1]}".into()), Segment::Key("b".into())])]
    #[case("/[a, b]", vec![Segment::Complex("[a, b]".into())])]
    fn path_syntax(#[case] path: &str, #[case] expected: Vec<Segment>) {
        assert_eq!(parse_path(path), Some((true, expected)));
    }

    #[test]
    fn bad_paths() {
        assert_eq!(parse_path("/a//b"), None);
        assert_eq!(parse_path("/\"open"), None);
        assert_eq!(parse_path("/{a"), None);
    }

    #[test]
    fn flow_in_block_lookup() {
        let doc = load("root:\n  list:\n    - {key: value}\n");
        let id = doc
            .path_to_node(None, "/root/list/[0]/key", PathFollow::Follow)
            .unwrap();
        assert_eq!(doc.node(id).and_then(|n| n.scalar()), Some("value"));
        assert_eq!(doc.node_path(id).as_deref(), Some("/root/list/[0]/key"));
        assert_eq!(doc.path_to_node(None, "/", PathFollow::Follow), doc.root());
        let list = doc.path_to_node(None, "/root/list", PathFollow::Follow);
        assert_eq!(doc.path_to_node(list, "0/key", PathFollow::Follow), Some(id));
    }

    #[test]
    fn aliases_follow_or_stop() {
        let doc = load("a: &x {k: v}\nb: *x\n");
        let through = doc.path_to_node(None, "/b/k", PathFollow::Follow).unwrap();
        assert_eq!(doc.node(through).and_then(|n| n.scalar()), Some("v"));
        assert_eq!(doc.path_to_node(None, "/b/k", PathFollow::DontFollow), None);
        let alias = doc.path_to_node(None, "/b", PathFollow::DontFollow).unwrap();
        assert!(doc.node(alias).is_some_and(|n| n.is_alias()));
    }

    #[test]
    fn quoted_and_complex_keys() {
        let doc = load("\"a/b\": 1\n? [x, y]\n: 2\n");
        let quoted = doc.path_to_node(None, "/\"a/b\"", PathFollow::Follow).unwrap();
        assert_eq!(doc.node_path(quoted).as_deref(), Some("/\"a/b\""));
        let complex = doc.path_to_node(None, "/[x, y]", PathFollow::Follow).unwrap();
        assert_eq!(doc.node(complex).and_then(|n| n.scalar()), Some("2"));
        assert_eq!(doc.node_path(complex).as_deref(), Some("/[x, y]"));
    }
}
