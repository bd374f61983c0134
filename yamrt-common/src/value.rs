/// Ordered sequence of one or more [`YamlDoc`]'s
pub type Sequence = Vec<YamlDoc>;

/// Sequence of key-value pairing of two [`YamlDoc`]s
pub type Mapping = Vec<Entry>;

/// A schema-resolved, alias-free value tree.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum YamlDoc {
    #[default]
    Null,
    String(String),
    Bool(bool),
    FloatingPoint(f64),
    Integer(i64),
    /// Integer outside the `i64` range, kept as written.
    BigInteger(String),
    // flow style like `[x, x, x]`
    // or block style like:
    //     - x
    //     - x
    Sequence(Sequence),

    // flow style like `{x: Y, a: B}`
    // or block style like:
    //     x: Y
    //     a: B
    Mapping(Mapping),
}

impl YamlDoc {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, YamlDoc::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            YamlDoc::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            YamlDoc::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            YamlDoc::FloatingPoint(f) => Some(*f),
            YamlDoc::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            YamlDoc::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            YamlDoc::Sequence(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            YamlDoc::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Value of the first entry whose key is the string `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&YamlDoc> {
        self.as_mapping()?
            .iter()
            .find(|entry| entry.key.as_str() == Some(key))
            .map(|entry| &entry.value)
    }

    #[must_use]
    pub fn index(&self, idx: usize) -> Option<&YamlDoc> {
        self.as_sequence()?.get(idx)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: YamlDoc,
    pub value: YamlDoc,
}

impl Entry {
    pub fn new(key: YamlDoc, value: YamlDoc) -> Self {
        Entry { key, value }
    }
}
