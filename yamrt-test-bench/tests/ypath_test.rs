use rstest::rstest;
use yamrt_core::{Document, NodeId, YPath, YamlLoader};
use yamrt_test_bench::consts::ROUNDTRIP_INPUT;

const INVENTORY: &str = "\
warehouses:
  - name: north
    stock:
      - {item: bolt, count: 120}
      - {item: nut, count: 15}
  - name: south
    stock:
      - {item: bolt, count: 4}
      - {item: washer, count: 300}
manager: &boss {name: kim}
deputy: *boss
";

fn texts(doc: &Document, ids: &[NodeId]) -> Vec<String> {
    ids.iter()
        .filter_map(|&id| doc.node(id)?.scalar().map(str::to_string))
        .collect()
}

fn run(expr: &str) -> Vec<String> {
    let docs = YamlLoader::load_from_str(INVENTORY).unwrap();
    let found = docs[0].ypath(expr).unwrap();
    texts(&docs[0], &found)
}

#[rstest]
#[case("/warehouses/*/name", &["north", "south"])]
#[case("/warehouses/[1]/stock/[0]/count", &["4"])]
#[case("/warehouses/*/stock/*[?count > 100]/item", &["bolt", "washer"])]
#[case("/warehouses/*[?name == south]/stock/*/item", &["bolt", "washer"])]
#[case("/warehouses/**/item", &["bolt", "nut", "bolt", "washer"])]
#[case("/deputy/name", &["kim"])]
#[case("/manager/name, /deputy/name", &["kim"])]
#[case("/missing || /manager/name", &["kim"])]
#[case("/warehouses/[0:1]/name", &["north"])]
fn inventory_queries(#[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(run(expr), expected);
}

#[test]
fn results_are_in_document_order() {
    let docs = YamlLoader::load_from_str(ROUNDTRIP_INPUT).unwrap();
    let doc = &docs[0];
    let found = doc.ypath("/motd, /server/host, /server/ports/*").unwrap();
    let order: Vec<usize> = found
        .iter()
        .map(|&id| doc.walk(doc.root().unwrap()).iter().position(|&w| w == id).unwrap())
        .collect();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(order, sorted);
    assert_eq!(texts(doc, &found)[..3], ["example.org", "80", "443"]);
}

#[test]
fn compiled_paths_are_reusable() {
    let docs = YamlLoader::load_from_str("---\na: 1\n---\na: 2\n").unwrap();
    let path: YPath = "/a".parse().unwrap();
    let found: Vec<String> = docs
        .iter()
        .flat_map(|doc| texts(doc, &path.eval_root(doc).collect::<Vec<_>>()))
        .collect();
    assert_eq!(found, ["1", "2"]);
}

#[test]
fn bad_expressions() {
    assert!(YPath::parse("/a[").is_err());
    assert!(YPath::parse("/a[?b ==]").is_err());
    assert!(YPath::parse("/a/'open").is_err());
}
