#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wikigraph::{
    convert, ConvertOptions, GraphReader, LinkRecord, NodeId, UnresolvedTargets, WikiGraphError,
};

fn paths(dir: &TempDir, name: &str) -> (PathBuf, PathBuf) {
    (
        dir.path().join(format!("{name}.graph")),
        dir.path().join(format!("{name}.titles")),
    )
}

fn records(items: &[(&str, &[&str])]) -> Vec<wikigraph::Result<LinkRecord>> {
    items
        .iter()
        .map(|(title, targets)| Ok(LinkRecord::new(*title, targets.iter().copied())))
        .collect()
}

fn build(
    dir: &TempDir,
    name: &str,
    items: &[(&str, &[&str])],
    options: &ConvertOptions,
) -> GraphReader {
    let (graph, map) = paths(dir, name);
    convert(records(items), &graph, &map, options).expect("convert");
    GraphReader::open(&graph, &map).expect("open")
}

fn neighbors(reader: &GraphReader, id: u32) -> Vec<u32> {
    reader
        .get_neighbors(NodeId(id))
        .expect("neighbors")
        .into_iter()
        .map(u32::from)
        .collect()
}

const ABC: &[(&str, &[&str])] = &[("A", &["B", "C"]), ("B", &[]), ("C", &["A"])];

#[test]
fn small_graph_answers_queries() {
    let dir = TempDir::new().expect("tempdir");
    let reader = build(&dir, "abc", ABC, &ConvertOptions::new().block_size(2));

    assert_eq!(reader.node_count(), 3);
    assert_eq!(reader.block_count(), 2);
    assert_eq!(neighbors(&reader, 0), vec![1, 2]);
    assert_eq!(neighbors(&reader, 1), Vec::<u32>::new());
    assert_eq!(neighbors(&reader, 2), vec![0]);
    assert_eq!(reader.get_title(NodeId(0)).unwrap(), "A");
    assert_eq!(reader.resolve_title("C").unwrap(), NodeId(2));
    reader.close();
}

#[test]
fn block_size_changes_layout_not_answers() {
    let dir = TempDir::new().expect("tempdir");
    let titles: Vec<String> = (0..40).map(|i| format!("Page {i}")).collect();
    let links: Vec<Vec<&str>> = (0..40)
        .map(|i| {
            (0..40)
                .filter(|j| (i * 7 + j * 3) % 5 == 0)
                .map(|j| titles[j].as_str())
                .collect()
        })
        .collect();
    let items: Vec<(&str, &[&str])> = titles
        .iter()
        .zip(&links)
        .map(|(title, targets)| (title.as_str(), targets.as_slice()))
        .collect();

    let small = build(&dir, "small", &items, &ConvertOptions::new().block_size(1));
    let large = build(&dir, "large", &items, &ConvertOptions::new().block_size(100));
    assert_eq!(small.block_count(), 40);
    assert_eq!(large.block_count(), 1);

    let small_bytes = fs::read(small.path()).unwrap();
    let large_bytes = fs::read(large.path()).unwrap();
    assert_ne!(small_bytes, large_bytes);

    for id in 0..40 {
        assert_eq!(neighbors(&small, id), neighbors(&large, id), "node {id}");
    }
}

#[test]
fn titles_form_a_bijection() {
    let dir = TempDir::new().expect("tempdir");
    let reader = build(
        &dir,
        "bijection",
        &[
            ("Zeta", &["Alpha", "Mu"]),
            ("Alpha", &["Zeta"]),
            ("Mu", &[]),
            ("Ünïcode title", &["Mu"]),
        ],
        &ConvertOptions::new().block_size(3),
    );
    for id in 0..reader.node_count() {
        let title = reader.get_title(NodeId(id)).unwrap();
        assert_eq!(reader.resolve_title(title).unwrap(), NodeId(id));
    }
    assert!(matches!(
        reader.resolve_title("Missing"),
        Err(WikiGraphError::UnknownTitle(_))
    ));
}

#[test]
fn out_of_range_ids_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let reader = build(&dir, "bounds", ABC, &ConvertOptions::new().block_size(2));

    assert!(matches!(
        reader.node(-1),
        Err(WikiGraphError::OutOfRange { node: -1, node_count: 3 })
    ));
    assert!(matches!(
        reader.node(3),
        Err(WikiGraphError::OutOfRange { node: 3, .. })
    ));
    assert_eq!(reader.node(2).unwrap(), NodeId(2));
    assert!(matches!(
        reader.get_neighbors(NodeId(3)),
        Err(WikiGraphError::OutOfRange { .. })
    ));
    assert!(matches!(
        reader.get_title(NodeId(3)),
        Err(WikiGraphError::OutOfRange { .. })
    ));
    // The reader stays usable after a rejected query.
    assert_eq!(neighbors(&reader, 0), vec![1, 2]);
}

#[test]
fn empty_input_produces_an_empty_store() {
    let dir = TempDir::new().expect("tempdir");
    let (graph, map) = paths(&dir, "empty");
    let summary = convert(Vec::new(), &graph, &map, &ConvertOptions::default()).unwrap();
    assert_eq!(summary.node_count, 0);
    assert_eq!(summary.block_count, 0);

    let reader = GraphReader::open(&graph, &map).unwrap();
    assert_eq!(reader.node_count(), 0);
    assert!(matches!(
        reader.get_neighbors(NodeId(0)),
        Err(WikiGraphError::OutOfRange { .. })
    ));
}

#[test]
fn unresolved_targets_follow_policy() {
    let dir = TempDir::new().expect("tempdir");
    let items: &[(&str, &[&str])] = &[("A", &["B", "Nowhere"]), ("B", &["Elsewhere", "A"])];

    let (graph, map) = paths(&dir, "skip");
    let summary = convert(records(items), &graph, &map, &ConvertOptions::default()).unwrap();
    assert_eq!(summary.node_count, 2);
    assert_eq!(summary.unresolved_links, 2);
    let reader = GraphReader::open(&graph, &map).unwrap();
    assert_eq!(neighbors(&reader, 0), vec![1]);
    assert_eq!(neighbors(&reader, 1), vec![0]);

    let insert = ConvertOptions::new().unresolved(UnresolvedTargets::Insert);
    let (graph, map) = paths(&dir, "insert");
    let summary = convert(records(items), &graph, &map, &insert).unwrap();
    assert_eq!(summary.node_count, 4);
    assert_eq!(summary.inserted_targets, 2);
    let reader = GraphReader::open(&graph, &map).unwrap();
    assert_eq!(reader.resolve_title("Nowhere").unwrap(), NodeId(2));
    assert_eq!(reader.resolve_title("Elsewhere").unwrap(), NodeId(3));
    assert_eq!(neighbors(&reader, 0), vec![1, 2]);
    assert_eq!(neighbors(&reader, 2), Vec::<u32>::new());
}

#[test]
fn strict_failure_leaves_no_output() {
    let dir = TempDir::new().expect("tempdir");
    let (graph, map) = paths(&dir, "strict");
    let err = convert(
        records(&[("A", &["B"]), ("B", &["Ghost"])]),
        &graph,
        &map,
        &ConvertOptions::new().strict_resolution(true),
    )
    .unwrap_err();
    match err {
        WikiGraphError::Resolution {
            source_title,
            target,
        } => {
            assert_eq!(source_title, "B");
            assert_eq!(target, "Ghost");
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(!graph.exists());
    assert!(!map.exists());
    let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "temporary files left behind");
}

#[test]
fn failed_conversion_keeps_previous_output() {
    let dir = TempDir::new().expect("tempdir");
    let (graph, map) = paths(&dir, "keep");
    convert(records(ABC), &graph, &map, &ConvertOptions::default()).unwrap();
    let before = fs::read(&graph).unwrap();

    let mut input = records(&[("X", &[])]);
    input.push(Err(WikiGraphError::Io(std::io::Error::other("disk gone"))));
    assert!(convert(input, &graph, &map, &ConvertOptions::default()).is_err());
    assert_eq!(fs::read(&graph).unwrap(), before);
    let reader = GraphReader::open(&graph, &map).unwrap();
    assert_eq!(neighbors(&reader, 0), vec![1, 2]);
}

#[test]
fn blocked_title_map_rolls_back_graph() {
    let dir = TempDir::new().expect("tempdir");
    let (graph, map) = paths(&dir, "pair");
    convert(records(ABC), &graph, &map, &ConvertOptions::default()).unwrap();
    let before = fs::read(&graph).unwrap();

    // A non-empty directory where the new title map should go.
    let blocked = dir.path().join("blocked.titles");
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("keep"), b"x").unwrap();
    assert!(convert(
        records(&[("X", &["Y"]), ("Y", &[])]),
        &graph,
        &blocked,
        &ConvertOptions::default(),
    )
    .is_err());

    assert_eq!(fs::read(&graph).unwrap(), before);
    let reader = GraphReader::open(&graph, &map).unwrap();
    assert_eq!(reader.get_title(NodeId(0)).unwrap(), "A");
    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    names.sort();
    assert_eq!(names, ["blocked.titles", "pair.graph", "pair.titles"]);
}

#[test]
fn malformed_records_are_counted_and_skipped() {
    let dir = TempDir::new().expect("tempdir");
    let (graph, map) = paths(&dir, "malformed");
    let mut input = records(&[("A", &["B"]), ("", &["A"]), ("B", &["A", ""])]);
    input.insert(
        1,
        Err(WikiGraphError::MalformedRecord {
            line: 2,
            reason: "not json".into(),
        }),
    );
    let summary = convert(input, &graph, &map, &ConvertOptions::default()).unwrap();
    assert_eq!(summary.records_read, 2);
    assert_eq!(summary.malformed_records, 2);
    assert_eq!(summary.invalid_links, 1);

    let reader = GraphReader::open(&graph, &map).unwrap();
    assert_eq!(reader.node_count(), 2);
    assert_eq!(neighbors(&reader, 1), vec![0]);
}

#[test]
fn duplicates_merge_and_self_loops_survive() {
    let dir = TempDir::new().expect("tempdir");
    let (graph, map) = paths(&dir, "dupes");
    let summary = convert(
        records(&[("A", &["A", "B", "B"]), ("B", &[]), ("A", &["B", "C"]), ("C", &[])]),
        &graph,
        &map,
        &ConvertOptions::new().verify_blocks(true),
    )
    .unwrap();
    assert_eq!(summary.merged_records, 1);
    assert_eq!(summary.duplicate_links, 2);
    assert_eq!(summary.self_loops, 1);
    assert_eq!(summary.edge_count, 3);

    let reader = GraphReader::open(&graph, &map).unwrap();
    assert_eq!(neighbors(&reader, 0), vec![0, 1, 2]);
}

#[test]
fn title_map_is_tab_separated_in_id_order() {
    let dir = TempDir::new().expect("tempdir");
    let (graph, map) = paths(&dir, "map");
    convert(records(ABC), &graph, &map, &ConvertOptions::default()).unwrap();
    assert_eq!(fs::read_to_string(&map).unwrap(), "0\tA\n1\tB\n2\tC\n");
}

#[test]
fn rejects_bad_options() {
    let dir = TempDir::new().expect("tempdir");
    let (graph, map) = paths(&dir, "opts");
    assert!(matches!(
        convert(records(ABC), &graph, &map, &ConvertOptions::new().block_size(0)),
        Err(WikiGraphError::Invalid(_))
    ));
    assert!(matches!(
        convert(records(ABC), &graph, &graph, &ConvertOptions::default()),
        Err(WikiGraphError::Invalid(_))
    ));
    assert!(!Path::new(&graph).exists());
}
