#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wikigraph::{
    admin::{verify, VerifyLevel},
    convert, ConvertOptions, GraphReader, LinkRecord, NodeId, WikiGraphError,
};

struct Fixture {
    _dir: TempDir,
    graph: PathBuf,
    map: PathBuf,
}

/// Six pages in three blocks of two.
fn fixture() -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let graph = dir.path().join("wiki.graph");
    let map = dir.path().join("wiki.titles");
    let input = vec![
        Ok(LinkRecord::new("A", ["B", "C", "D"])),
        Ok(LinkRecord::new("B", ["A"])),
        Ok(LinkRecord::new("C", ["E", "F"])),
        Ok(LinkRecord::new("D", ["A", "B", "C"])),
        Ok(LinkRecord::new("E", ["F"])),
        Ok(LinkRecord::new("F", ["A", "E"])),
    ];
    convert(input, &graph, &map, &ConvertOptions::new().block_size(2)).expect("convert");
    Fixture {
        _dir: dir,
        graph,
        map,
    }
}

fn edit(path: &Path, f: impl FnOnce(&mut Vec<u8>)) {
    let mut bytes = fs::read(path).expect("read graph");
    f(&mut bytes);
    fs::write(path, bytes).expect("write graph");
}

/// (offset, compressed length) of every block.
fn block_layout(fx: &Fixture) -> Vec<(usize, usize)> {
    let reader = GraphReader::open(&fx.graph, &fx.map).expect("open");
    let layout = reader
        .index()
        .spans()
        .map(|span| {
            let len = reader.compressed_block(&span).expect("block").len();
            (span.offset as usize, len)
        })
        .collect();
    reader.close();
    layout
}

fn open_err(fx: &Fixture) -> WikiGraphError {
    GraphReader::open(&fx.graph, &fx.map).expect_err("open should fail")
}

#[test]
fn damaged_block_is_isolated() {
    let fx = fixture();
    let layout = block_layout(&fx);
    assert_eq!(layout.len(), 3);
    let (offset, len) = layout[1];
    edit(&fx.graph, |bytes| bytes[offset + 4 + len - 1] ^= 0xff);

    let reader = GraphReader::open(&fx.graph, &fx.map).expect("open still succeeds");
    for id in [2, 3] {
        let err = reader.get_neighbors(NodeId(id)).unwrap_err();
        assert!(err.is_corruption(), "node {id}: {err}");
    }
    assert_eq!(
        reader.get_neighbors(NodeId(0)).unwrap(),
        vec![NodeId(1), NodeId(2), NodeId(3)]
    );
    assert_eq!(
        reader.get_neighbors(NodeId(5)).unwrap(),
        vec![NodeId(0), NodeId(4)]
    );
    assert_eq!(reader.get_title(NodeId(2)).unwrap(), "C");

    let fast = verify(&fx.graph, &fx.map, VerifyLevel::Fast).unwrap();
    assert!(fast.success);
    let full = verify(&fx.graph, &fx.map, VerifyLevel::Full).unwrap();
    assert!(!full.success);
    assert_eq!(full.counts.blocks_checked, 3);
    assert_eq!(full.counts.corrupt_blocks, 1);
    assert_eq!(full.findings.len(), 1);
}

#[test]
fn overlong_size_prefix_is_corruption() {
    let fx = fixture();
    let (offset, _) = block_layout(&fx)[2];
    edit(&fx.graph, |bytes| {
        bytes[offset..offset + 4].copy_from_slice(&u32::MAX.to_le_bytes())
    });

    let reader = GraphReader::open(&fx.graph, &fx.map).unwrap();
    assert!(reader.get_neighbors(NodeId(4)).unwrap_err().is_corruption());
    assert_eq!(reader.get_neighbors(NodeId(1)).unwrap(), vec![NodeId(0)]);
}

#[test]
fn bad_magic_fails_open() {
    let fx = fixture();
    edit(&fx.graph, |bytes| bytes[0] = b'X');
    assert!(matches!(open_err(&fx), WikiGraphError::Format(_)));
}

#[test]
fn unknown_version_fails_open() {
    let fx = fixture();
    edit(&fx.graph, |bytes| bytes[8..12].copy_from_slice(&2u32.to_le_bytes()));
    match open_err(&fx) {
        WikiGraphError::Format(reason) => assert!(reason.contains("version 2"), "{reason}"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn inflated_node_count_fails_open() {
    let fx = fixture();
    edit(&fx.graph, |bytes| bytes[15] = 0x80);
    match open_err(&fx) {
        WikiGraphError::Format(reason) => assert!(reason.contains("title map"), "{reason}"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn footer_outside_file_fails_open() {
    let fx = fixture();
    edit(&fx.graph, |bytes| {
        let at = bytes.len() - 8;
        bytes[at..].copy_from_slice(&u64::MAX.to_le_bytes());
    });
    assert!(matches!(open_err(&fx), WikiGraphError::Format(_)));
}

#[test]
fn misaligned_index_fails_open() {
    let fx = fixture();
    edit(&fx.graph, |bytes| {
        let at = bytes.len() - 8;
        let offset = u64::from_le_bytes(bytes[at..].try_into().unwrap());
        bytes[at..].copy_from_slice(&(offset + 1).to_le_bytes());
    });
    assert!(matches!(open_err(&fx), WikiGraphError::Format(_)));
}

#[test]
fn truncated_file_fails_open() {
    let fx = fixture();
    edit(&fx.graph, |bytes| bytes.truncate(20));
    assert!(matches!(open_err(&fx), WikiGraphError::Format(_)));
    edit(&fx.graph, |bytes| bytes.clear());
    assert!(matches!(open_err(&fx), WikiGraphError::Format(_)));
}

#[test]
fn node_count_mismatch_with_title_map_fails_open() {
    let fx = fixture();
    let text = fs::read_to_string(&fx.map).unwrap();
    let kept: String = text.lines().take(5).map(|line| format!("{line}\n")).collect();
    fs::write(&fx.map, kept).unwrap();
    assert!(matches!(open_err(&fx), WikiGraphError::Format(_)));
}

#[test]
fn missing_files_are_io_errors() {
    let fx = fixture();
    let dir = fx.graph.parent().unwrap().to_path_buf();
    assert!(matches!(
        GraphReader::open(dir.join("absent.graph"), &fx.map),
        Err(WikiGraphError::Io(_))
    ));
    assert!(matches!(
        GraphReader::open(&fx.graph, dir.join("absent.titles")),
        Err(WikiGraphError::Io(_))
    ));
}
