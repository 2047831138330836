//! Black-box end-to-end scenarios and law checks, driven entirely through
//! `userfs::FileSystem`'s public API against a real temp-file container.

use std::io::Read;

use tempfile::NamedTempFile;
use userfs::{FileSystem, FileType, FsError, SeekWhence};

fn formatted() -> (NamedTempFile, FileSystem) {
    let tmp = NamedTempFile::new().unwrap();
    let fs = FileSystem::format(tmp.path()).unwrap();
    (tmp, fs)
}

#[test]
fn scenario_1_write_seek_read() {
    let (_tmp, mut fs) = formatted();
    fs.create("/a", FileType::Regular).unwrap();
    let fd = fs.open("/a").unwrap();
    assert_eq!(fs.write(fd, b"hello").unwrap(), 5);
    assert_eq!(fs.seek(fd, 0, SeekWhence::Set).unwrap(), 0);
    let mut buf = [0u8; 5];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"hello");
}

#[test]
fn scenario_2_duplicate_create_is_already_exists() {
    let (_tmp, mut fs) = formatted();
    fs.create("/a", FileType::Regular).unwrap();
    assert!(matches!(
        fs.create("/a", FileType::Regular),
        Err(FsError::AlreadyExists)
    ));
}

#[test]
fn scenario_3_directory_must_be_empty_to_remove() {
    let (_tmp, mut fs) = formatted();
    fs.create("/d", FileType::Directory).unwrap();
    fs.create("/d/x", FileType::Regular).unwrap();

    let entries = fs.list("/d").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "x");

    assert!(matches!(fs.remove("/d"), Err(FsError::DirectoryNotEmpty)));
    fs.remove("/d/x").unwrap();
    fs.remove("/d").unwrap();
}

#[test]
fn scenario_4_large_write_crosses_into_indirect_tier() {
    let (_tmp, mut fs) = formatted();
    fs.create("/big", FileType::Regular).unwrap();
    let fd = fs.open("/big").unwrap();

    let len = 6 * 4096 + 1;
    let pattern: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
    assert_eq!(fs.write(fd, &pattern).unwrap(), len);

    fs.seek(fd, 0, SeekWhence::Set).unwrap();
    let mut buf = vec![0u8; len];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), len);
    assert_eq!(buf, pattern);
}

#[test]
fn scenario_5_link_then_remove_source_keeps_destination_readable() {
    let (_tmp, mut fs) = formatted();
    fs.create("/src", FileType::Regular).unwrap();
    let fd = fs.open("/src").unwrap();
    fs.write(fd, b"payload").unwrap();
    fs.close(fd).unwrap();

    fs.link("/src", "/dst").unwrap();
    fs.remove("/src").unwrap();

    let fd2 = fs.open("/dst").unwrap();
    let mut buf = [0u8; 7];
    assert_eq!(fs.read(fd2, &mut buf).unwrap(), 7);
    assert_eq!(&buf, b"payload");
}

#[test]
fn scenario_6_move_into_own_subtree_is_rejected() {
    let (_tmp, mut fs) = formatted();
    fs.create("/x", FileType::Regular).unwrap();
    fs.create("/d", FileType::Directory).unwrap();

    fs.move_entry("/x", "/d/y").unwrap();
    assert!(matches!(fs.open("/x"), Err(FsError::NotFound)));
    fs.open("/d/y").unwrap();

    assert!(matches!(
        fs.move_entry("/d", "/d/sub"),
        Err(FsError::InvalidArgument(_))
    ));
}

#[test]
fn law_l1_create_remove_preserves_counts() {
    let (_tmp, mut fs) = formatted();
    let free_before = fs.free_block_count();
    fs.create("/a", FileType::Regular).unwrap();
    fs.remove("/a").unwrap();
    assert_eq!(fs.free_block_count(), free_before);
}

#[test]
fn law_l2_write_then_read_back_matches() {
    let (_tmp, mut fs) = formatted();
    fs.create("/a", FileType::Regular).unwrap();
    let fd = fs.open("/a").unwrap();
    let s = b"the quick brown fox";
    let n = fs.write(fd, s).unwrap();
    fs.seek(fd, 0, SeekWhence::Set).unwrap();
    let mut d = vec![0u8; n];
    fs.read(fd, &mut d).unwrap();
    assert_eq!(&d[..], &s[..n]);
}

#[test]
fn law_l3_move_then_move_back_is_identity() {
    let (_tmp, mut fs) = formatted();
    let a_id = fs.create("/x", FileType::Regular).unwrap();
    fs.create("/d", FileType::Directory).unwrap();

    fs.move_entry("/x", "/d/y").unwrap();
    fs.move_entry("/d/y", "/x").unwrap();

    let entries = fs.list("/").unwrap();
    let x_entry = entries.iter().find(|e| e.name == "x").unwrap();
    assert_eq!(x_entry.inode_number, a_id);
}

#[test]
fn law_l4_link_then_remove_preserves_accessibility_and_link_count() {
    let (_tmp, mut fs) = formatted();
    fs.create("/a", FileType::Regular).unwrap();
    fs.link("/a", "/b").unwrap();
    fs.remove("/a").unwrap();
    fs.open("/b").unwrap();
}

#[test]
fn invariant_i5_cursor_never_exceeds_file_size() {
    let (_tmp, mut fs) = formatted();
    fs.create("/a", FileType::Regular).unwrap();
    let fd = fs.open("/a").unwrap();
    fs.write(fd, b"abc").unwrap();
    let pos = fs.seek(fd, 1000, SeekWhence::End).unwrap();
    assert!(pos <= 3);
}

#[test]
fn invariant_i6_round_trip_serialize_deserialize_byte_equal() {
    let (_tmp, mut fs) = formatted();
    fs.create("/a", FileType::Regular).unwrap();
    let fd = fs.open("/a").unwrap();
    fs.write(fd, b"roundtrip").unwrap();

    let copy = NamedTempFile::new().unwrap();
    fs.serialize(copy.path()).unwrap();

    let mut original_bytes = Vec::new();
    std::fs::File::open(_tmp.path())
        .unwrap()
        .read_to_end(&mut original_bytes)
        .unwrap();
    let mut copy_bytes = Vec::new();
    std::fs::File::open(copy.path())
        .unwrap()
        .read_to_end(&mut copy_bytes)
        .unwrap();
    assert_eq!(original_bytes, copy_bytes);

    let mut reloaded = FileSystem::deserialize(copy.path()).unwrap();
    let entries = reloaded.list("/").unwrap();
    assert_eq!(entries[0].name, "a");
}

#[test]
fn removed_file_descriptor_is_severed() {
    let (_tmp, mut fs) = formatted();
    fs.create("/a", FileType::Regular).unwrap();
    let fd = fs.open("/a").unwrap();
    fs.remove("/a").unwrap();
    assert!(fs.close(fd).is_err());
}

#[test]
fn directory_full_once_31_entries_exist() {
    let (_tmp, mut fs) = formatted();
    fs.create("/d", FileType::Directory).unwrap();
    for i in 0..31 {
        fs.create(&format!("/d/f{i}"), FileType::Regular).unwrap();
    }
    assert!(matches!(
        fs.create("/d/overflow", FileType::Regular),
        Err(FsError::DirectoryFull)
    ));
}
