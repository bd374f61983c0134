use crate::schema::{ResolveOptions, Schema};
use yamrt_common::Version;

/// What happens when an anchor name is defined twice in one document.
///
/// Aliases always refer to the most recent definition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum AnchorPolicy {
    /// Redefinition is silent.
    #[default]
    Allow,
    /// Redefinition is logged and, in collect-errors mode, recorded as a diagnostic.
    Warn,
    /// Redefinition is a `DuplicateAnchor` error.
    Error,
}

/// Knobs shared by the parser and the composer.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseConfig {
    pub default_version: Version,
    /// Resolution schema. Derived from the document version when `None`.
    pub schema: Option<Schema>,
    pub depth_limit: usize,
    pub disable_depth_limit: bool,
    pub allow_duplicate_keys: bool,
    pub duplicate_anchors: AnchorPolicy,
    pub collect_errors: bool,
    /// Run alias and merge key resolution on every loaded document.
    pub resolve_on_load: bool,
    pub big_int_placeholder: bool,
    pub strict_json_numbers: bool,
    pub keep_comments: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            default_version: Version::V1_2,
            schema: None,
            depth_limit: 1024,
            disable_depth_limit: false,
            allow_duplicate_keys: false,
            duplicate_anchors: AnchorPolicy::Allow,
            collect_errors: false,
            resolve_on_load: false,
            big_int_placeholder: false,
            strict_json_numbers: false,
            keep_comments: true,
        }
    }
}

impl ParseConfig {
    #[must_use]
    pub fn with_default_version(mut self, version: Version) -> Self {
        self.default_version = version;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    #[must_use]
    pub fn with_disable_depth_limit(mut self, disable: bool) -> Self {
        self.disable_depth_limit = disable;
        self
    }

    #[must_use]
    pub fn with_allow_duplicate_keys(mut self, allow: bool) -> Self {
        self.allow_duplicate_keys = allow;
        self
    }

    #[must_use]
    pub fn with_duplicate_anchors(mut self, policy: AnchorPolicy) -> Self {
        self.duplicate_anchors = policy;
        self
    }

    #[must_use]
    pub fn with_collect_errors(mut self, collect: bool) -> Self {
        self.collect_errors = collect;
        self
    }

    #[must_use]
    pub fn with_resolve_on_load(mut self, resolve: bool) -> Self {
        self.resolve_on_load = resolve;
        self
    }

    #[must_use]
    pub fn with_big_int_placeholder(mut self, enabled: bool) -> Self {
        self.big_int_placeholder = enabled;
        self
    }

    #[must_use]
    pub fn with_strict_json_numbers(mut self, strict: bool) -> Self {
        self.strict_json_numbers = strict;
        self
    }

    #[must_use]
    pub fn with_keep_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    /// Depth beyond which documents are rejected, if any.
    #[must_use]
    pub fn effective_depth_limit(&self) -> Option<usize> {
        if self.disable_depth_limit {
            None
        } else {
            Some(self.depth_limit)
        }
    }

    /// Schema in force for a document declaring `version`.
    #[must_use]
    pub fn schema_for(&self, version: Version) -> Schema {
        self.schema.unwrap_or_else(|| Schema::for_version(version))
    }

    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            big_int_placeholder: self.big_int_placeholder,
            strict_json_numbers: self.strict_json_numbers,
        }
    }
}
