/// Overall output layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EmitterMode {
    /// Keep the collection and scalar styles of the input.
    #[default]
    Original,
    Block,
    /// Flow collections, one entry per line.
    Flow,
    FlowOneline,
    Json,
    /// JSON where scalars quoted in the input stay strings.
    JsonTp,
    JsonOneline,
    /// Block output without needless double quotes.
    DeJson,
    /// Block output with plain scalars where possible and document markers only when required.
    Pretty,
}

impl EmitterMode {
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(
            self,
            EmitterMode::Json | EmitterMode::JsonTp | EmitterMode::JsonOneline
        )
    }

    #[must_use]
    pub fn is_oneline(self) -> bool {
        matches!(self, EmitterMode::FlowOneline | EmitterMode::JsonOneline)
    }

    /// Collections are always written in flow style.
    #[must_use]
    pub fn forces_flow(self) -> bool {
        matches!(self, EmitterMode::Flow | EmitterMode::FlowOneline) || self.is_json()
    }

    /// Collections are always written in block style, unless empty.
    #[must_use]
    pub fn forces_block(self) -> bool {
        matches!(
            self,
            EmitterMode::Block | EmitterMode::DeJson | EmitterMode::Pretty
        )
    }
}

/// Tri-state for directives and document markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// Written when the input had them or the output needs them.
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitterConfig {
    pub mode: EmitterMode,
    /// Spaces per nesting level, 1 to 9.
    pub indent: usize,
    /// Preferred line width; 0 means 80 and `usize::MAX` never folds.
    pub width: usize,
    pub sort_keys: bool,
    pub output_comments: bool,
    /// Drop anchors. Aliases are still written.
    pub strip_labels: bool,
    pub strip_tags: bool,
    /// Drop `---` and `...` where the output stays readable without them.
    pub strip_doc: bool,
    /// Drop mapping pairs whose value is null.
    pub strip_empty_kv: bool,
    pub version_dir: Toggle,
    pub tag_dir: Toggle,
    pub doc_start_mark: Toggle,
    pub doc_end_mark: Toggle,
    /// JSON escapes and quoting, implied by the JSON modes.
    pub json_mode: bool,
    /// Indent `- ` entries of a sequence that is a mapping value.
    pub indented_seq_in_map: bool,
    /// Record failures in [`Emitter::diagnostics`](super::Emitter::diagnostics) instead of
    /// returning them. Nodes that cannot be written come out as `null`; out-of-order events end
    /// the output.
    pub collect_errors: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        EmitterConfig {
            mode: EmitterMode::Original,
            indent: 2,
            width: 80,
            sort_keys: false,
            output_comments: true,
            strip_labels: false,
            strip_tags: false,
            strip_doc: false,
            strip_empty_kv: false,
            version_dir: Toggle::Auto,
            tag_dir: Toggle::Auto,
            doc_start_mark: Toggle::Auto,
            doc_end_mark: Toggle::Auto,
            json_mode: false,
            indented_seq_in_map: false,
            collect_errors: false,
        }
    }
}

impl EmitterConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: EmitterMode) -> Self {
        self.mode = mode;
        self
    }

    /// Values outside `1..=9` are clamped.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.clamp(1, 9);
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub fn with_sort_keys(mut self, sort: bool) -> Self {
        self.sort_keys = sort;
        self
    }

    #[must_use]
    pub fn with_output_comments(mut self, output: bool) -> Self {
        self.output_comments = output;
        self
    }

    #[must_use]
    pub fn with_strip_labels(mut self, strip: bool) -> Self {
        self.strip_labels = strip;
        self
    }

    #[must_use]
    pub fn with_strip_tags(mut self, strip: bool) -> Self {
        self.strip_tags = strip;
        self
    }

    #[must_use]
    pub fn with_strip_doc(mut self, strip: bool) -> Self {
        self.strip_doc = strip;
        self
    }

    #[must_use]
    pub fn with_strip_empty_kv(mut self, strip: bool) -> Self {
        self.strip_empty_kv = strip;
        self
    }

    #[must_use]
    pub fn with_version_dir(mut self, toggle: Toggle) -> Self {
        self.version_dir = toggle;
        self
    }

    #[must_use]
    pub fn with_tag_dir(mut self, toggle: Toggle) -> Self {
        self.tag_dir = toggle;
        self
    }

    #[must_use]
    pub fn with_doc_start_mark(mut self, toggle: Toggle) -> Self {
        self.doc_start_mark = toggle;
        self
    }

    #[must_use]
    pub fn with_doc_end_mark(mut self, toggle: Toggle) -> Self {
        self.doc_end_mark = toggle;
        self
    }

    #[must_use]
    pub fn with_json_mode(mut self, json: bool) -> Self {
        self.json_mode = json;
        self
    }

    #[must_use]
    pub fn with_indented_seq_in_map(mut self, indented: bool) -> Self {
        self.indented_seq_in_map = indented;
        self
    }

    #[must_use]
    pub fn with_collect_errors(mut self, collect: bool) -> Self {
        self.collect_errors = collect;
        self
    }

    pub(crate) fn best_width(&self) -> usize {
        match self.width {
            0 => 80,
            w => w,
        }
    }

    pub(crate) fn json(&self) -> bool {
        self.json_mode || self.mode.is_json()
    }

    /// Document markers are only written when the output needs them.
    pub(crate) fn minimal_markers(&self) -> bool {
        self.strip_doc || self.mode == EmitterMode::Pretty || self.json()
    }
}
