pub const BLOCK1_INPUT: &str = r"
    - x
    - y
";
pub const BLOCK2_INPUT: &str = r"
- x
- y
";
pub const BLOCK_EVENTS: &str = r"
+DOC
+SEQ
=VAL :x
=VAL :y
-SEQ
-DOC";

pub const SEQ_PLAIN_INPUT: &str = r"
  - x
   - y
";
pub const SEQ_PLAIN_EVENTS: &str = r"
+DOC
+SEQ
=VAL :x - y
-SEQ
-DOC";

pub const SEQ_TAGS_INPUT: &str = r"
- !!int 1
- !!int -2
";
pub const SEQ_TAGS_EVENTS: &str = r"
+DOC
+SEQ
=VAL <tag:yaml.org,2002:int> :1
=VAL <tag:yaml.org,2002:int> :-2
-SEQ
-DOC";

pub const NESTED_SEQ_INPUT: &str = r"
- - a
  - b
- c
";
pub const NESTED_SEQ_EVENTS: &str = r"
+DOC
+SEQ
+SEQ
=VAL :a
=VAL :b
-SEQ
=VAL :c
-SEQ
-DOC";

pub const BLOCK_MAP_INPUT: &str = r"
a: 1
b:
  c: 2
  d: [x]
";
pub const BLOCK_MAP_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL :1
=VAL :b
+MAP
=VAL :c
=VAL :2
=VAL :d
+SEQ []
=VAL :x
-SEQ
-MAP
-MAP
-DOC";

pub const INDENTLESS_SEQ_INPUT: &str = r"
key:
- a
- b
other: c
";
pub const INDENTLESS_SEQ_EVENTS: &str = r"
+DOC
+MAP
=VAL :key
+SEQ
=VAL :a
=VAL :b
-SEQ
=VAL :other
=VAL :c
-MAP
-DOC";

pub const EMPTY_VALUES_INPUT: &str = r"
a:
b:
";
pub const EMPTY_VALUES_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL :
=VAL :b
=VAL :
-MAP
-DOC";

pub const COMPLEX_KEY_INPUT: &str = r"
? a
: b
? [c, d]
: e
";
pub const COMPLEX_KEY_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL :b
+SEQ []
=VAL :c
=VAL :d
-SEQ
=VAL :e
-MAP
-DOC";

pub const ANCHOR_INPUT: &str = r"
a: &x 1
b: *x
c: &y
  - z
";
pub const ANCHOR_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL &x :1
=VAL :b
=ALI *x
=VAL :c
+SEQ &y
=VAL :z
-SEQ
-MAP
-DOC";

pub const LITERAL_INPUT: &str = r"--- |
  line1
  line2
";
pub const LITERAL_EVENTS: &str = r"
+DOC ---
=VAL |line1\nline2\n
-DOC";

pub const FOLDED_INPUT: &str = r">
 folded
 text

 next
";
pub const FOLDED_EVENTS: &str = r"
+DOC
=VAL >folded text\nnext\n
-DOC";

pub const CHOMP_INPUT: &str = r"
- |-
  a
- |+
  b

- |
  c
";
pub const CHOMP_EVENTS: &str = r"
+DOC
+SEQ
=VAL |a
=VAL |b\n\n
=VAL |c\n
-SEQ
-DOC";

pub const MULTILINE_PLAIN_INPUT: &str = r"
a: first
  second

  third
";
pub const MULTILINE_PLAIN_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL :first second\nthird
-MAP
-DOC";

pub const BLOCK_ERR_INPUT: &str = r"
  - x
 - y
";
pub const WRONG_SEQ_INDENT_INPUT: &str = r"
a:
  - b
 - c
";
pub const NESTED_VALUE_ERR_INPUT: &str = r"
a: b: c
";

pub const FLOW_SEQ_INPUT: &str = "[a, b, c]";
pub const FLOW_SEQ_EVENTS: &str = r"
+DOC
+SEQ []
=VAL :a
=VAL :b
=VAL :c
-SEQ
-DOC";

pub const FLOW_MAP_INPUT: &str = "{a: 1, b: [x, y]}";
pub const FLOW_MAP_EVENTS: &str = r"
+DOC
+MAP {}
=VAL :a
=VAL :1
=VAL :b
+SEQ []
=VAL :x
=VAL :y
-SEQ
-MAP
-DOC";

pub const FLOW_PAIR_INPUT: &str = "[a: b, c]";
pub const FLOW_PAIR_EVENTS: &str = r"
+DOC
+SEQ []
+MAP {}
=VAL :a
=VAL :b
-MAP
=VAL :c
-SEQ
-DOC";

pub const FLOW_MISSING_VALUE_INPUT: &str = "{a, b: c}";
pub const FLOW_MISSING_VALUE_EVENTS: &str = r"
+DOC
+MAP {}
=VAL :a
=VAL :
=VAL :b
=VAL :c
-MAP
-DOC";

pub const FLOW_MULTILINE_INPUT: &str = r"
[
  a,
  [b, c],
  {d: e},
]
";
pub const FLOW_MULTILINE_EVENTS: &str = r"
+DOC
+SEQ []
=VAL :a
+SEQ []
=VAL :b
=VAL :c
-SEQ
+MAP {}
=VAL :d
=VAL :e
-MAP
-SEQ
-DOC";

pub const FLOW_IN_BLOCK_INPUT: &str = r"
root:
  list:
    - {key: value}
";
pub const FLOW_IN_BLOCK_EVENTS: &str = r"
+DOC
+MAP
=VAL :root
+MAP
=VAL :list
+SEQ
+MAP {}
=VAL :key
=VAL :value
-MAP
-SEQ
-MAP
-MAP
-DOC";

pub const FLOW_UNCLOSED_SEQ_INPUT: &str = "[a, b";
pub const FLOW_UNCLOSED_MAP_INPUT: &str = "{a: 1";
pub const FLOW_EXTRA_CLOSE_INPUT: &str = "[a]]";

pub const SINGLE_QUOTE_INPUT: &str = "'it''s'";
pub const SINGLE_QUOTE_EVENTS: &str = r"
+DOC
=VAL 'it's
-DOC";

pub const SINGLE_QUOTE_FOLD_INPUT: &str = "'a\n  b\n\n  c'";
pub const SINGLE_QUOTE_FOLD_EVENTS: &str = r"
+DOC
=VAL 'a b\nc
-DOC";

pub const DOUBLE_QUOTE_ESCAPES_INPUT: &str = r#""a\tb\n\x41é""#;
pub const DOUBLE_QUOTE_ESCAPES_EVENTS: &str = r#"
+DOC
=VAL "a\tb\nAé
-DOC"#;

pub const DOUBLE_QUOTE_LINE_JOIN_INPUT: &str = "\"a\\\n  b\"";
pub const DOUBLE_QUOTE_LINE_JOIN_EVENTS: &str = r#"
+DOC
=VAL "ab
-DOC"#;

pub const QUOTED_KEYS_INPUT: &str = r#"
"a b": 'c'
'd': "e"
"#;
pub const QUOTED_KEYS_EVENTS: &str = r#"
+DOC
+MAP
=VAL "a b
=VAL 'c
=VAL 'd
=VAL "e
-MAP
-DOC"#;

pub const BAD_ESCAPE_INPUT: &str = r#""\q""#;
pub const UNTERMINATED_QUOTE_INPUT: &str = "'abc";

pub const MULTI_DOC_INPUT: &str = r"a
--- b
...
";
pub const MULTI_DOC_EVENTS: &str = r"
+DOC
=VAL :a
-DOC
+DOC ---
=VAL :b
-DOC ...";

pub const DIRECTIVE_DOC_INPUT: &str = r"%YAML 1.2
---
a
";
pub const DIRECTIVE_DOC_EVENTS: &str = r"
+DOC ---
=VAL :a
-DOC";

pub const EMPTY_DOCS_INPUT: &str = r"---
---
";
pub const EMPTY_DOCS_EVENTS: &str = r"
+DOC ---
=VAL :
-DOC
+DOC ---
=VAL :
-DOC";

pub const COMMENT_ONLY_INPUT: &str = "# nothing here\n";
pub const COMMENT_ONLY_EVENTS: &str = "";

pub const TAG_DIRECTIVE_INPUT: &str = r"%TAG !e! tag:example.com,2000:app/
--- !e!foo bar
";
pub const TAG_DIRECTIVE_EVENTS: &str = r"
+DOC ---
=VAL <tag:example.com,2000:app/foo> :bar
-DOC";

pub const DIRECTIVE_WITHOUT_END_INPUT: &str = r"a: 1
%YAML 1.2
---
b
";

/// Every scalar kind the schemas care about, used by schema and emitter tests.
pub const SCALAR_KINDS_INPUT: &str = r"
null: ~
bool: true
yes11: yes
int: 42
octal: 0o17
old_octal: 017
hex: 0x1F
float: 3.5
inf: .inf
text: hello
quoted: '42'
";

/// A document mixing block and flow collections, comments, anchors and scalar styles.
pub const ROUNDTRIP_INPUT: &str = r"# configuration
server:
  host: example.org # primary
  ports: [80, 443]
  tls: &tls
    cert: 'server.pem'
    key: server.key
backup:
  tls: *tls
motd: |
  Welcome!
  Be nice.
";
