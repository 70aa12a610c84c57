//! End-to-end scenarios, boundary behaviors, and concurrency tests driven
//! entirely through the public crate surface. Scenario numbering follows
//! the property list this crate is built against.

use std::sync::Arc;
use std::thread;

use tfs::{compat, Filesystem, OpenMode, Parameters};

fn init_logging() {
    let _ = env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .is_test(true)
        .try_init();
}

fn small_fs() -> Filesystem {
    Filesystem::init(Some(Parameters {
        max_inode_count: 3,
        max_block_count: 3,
        max_open_files_count: 3,
        block_size: 64,
    }))
    .unwrap()
}

// Scenario 1: existence rejection.
#[test]
fn scenario_existence_rejection() {
    let fs = small_fs();
    let h = compat::tfs_open(&fs, "/f1", OpenMode::CREAT);
    assert!(h >= 0);
    assert_eq!(compat::tfs_close(&fs, h), 0);
    assert_eq!(compat::tfs_open(&fs, "/f1", OpenMode::STRICT_CREATE), -1);
}

// Scenario 2: a path of total length MAX_FILE_NAME (40, leading slash
// included) is invalid when MAX_FILE_NAME == 40.
#[test]
fn scenario_invalid_name_length() {
    let fs = small_fs();
    let name = format!("/f{}", "1".repeat(38)); // 40 bytes total, slash included
    assert_eq!(name.len(), 40);
    assert_eq!(compat::tfs_open(&fs, &name, OpenMode::CREAT), -1);
}

// Scenario 3: parallel hardlink to a missing target never creates
// anything and always fails.
#[test]
fn scenario_parallel_hardlink_to_missing_target() {
    init_logging();
    let fs = Arc::new(Filesystem::init(None).unwrap());
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || compat::tfs_link(&fs, "/f1", "/l1"))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), -1);
    }
    assert_eq!(compat::tfs_open(&fs, "/l1", OpenMode::empty()), -1);
    assert_eq!(compat::tfs_open(&fs, "/f1", OpenMode::empty()), -1);
}

// Scenario 4: concurrent external copies into the same name race safely;
// whichever thread's write "wins" the final truncation, every thread that
// successfully opens afterward reads back exactly the source file's bytes,
// never garbage or a torn mix of two different contents. The fixture must
// fit within one block (copy_from_external_fs's short-count check is a hard
// error on a block-boundary clip, per SPEC_FULL.md §4 and the original's
// own short-count contract), so block_size here is sized to the fixture
// the same way the original's own test sizes its default 1024-byte blocks
// to a smaller fixture.
#[test]
fn scenario_external_copy_under_contention() {
    init_logging();
    let fixture = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/file_to_copy_over512.txt");
    let source = std::fs::read(fixture).unwrap();
    assert!(source.len() > 512);

    let fs = Arc::new(
        Filesystem::init(Some(Parameters {
            max_inode_count: 4,
            max_block_count: 4,
            max_open_files_count: 4,
            block_size: 1024,
        }))
        .unwrap(),
    );

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let fs = Arc::clone(&fs);
            let fixture = fixture.to_string();
            thread::spawn(move || compat::tfs_copy_from_external_fs(&fs, fixture.as_ref(), "/f1"))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 0);
    }

    let h = compat::tfs_open(&fs, "/f1", OpenMode::empty());
    assert!(h >= 0);
    let mut buf = [0u8; 599];
    let n = compat::tfs_read(&fs, h, &mut buf);
    assert!(n >= 0);
    let n = n as usize;
    assert_eq!(n, source.len());
    assert_eq!(&buf[..n], &source[..]);
}

// Scenario 5: symlink transparency.
#[test]
fn scenario_symlink_transparency() {
    let fs = small_fs();
    let h = fs.open("/t", OpenMode::CREAT).unwrap();
    fs.write(h, b"hi").unwrap();
    fs.close(h).unwrap();

    fs.symlink("/t", "/s").unwrap();
    let h2 = fs.open("/s", OpenMode::empty()).unwrap();
    let mut buf = [0u8; 2];
    assert_eq!(fs.read(h2, &mut buf).unwrap(), 2);
    assert_eq!(&buf, b"hi");
}

// Scenario 6: busy unlink, then ok after close.
#[test]
fn scenario_busy_unlink() {
    let fs = small_fs();
    let h = compat::tfs_open(&fs, "/t", OpenMode::CREAT);
    assert!(h >= 0);
    assert_eq!(compat::tfs_unlink(&fs, "/t"), -1);
    assert_eq!(compat::tfs_close(&fs, h), 0);
    assert_eq!(compat::tfs_unlink(&fs, "/t"), 0);
}

// Round-trip law: open(CREAT|TRUNC); write(data); close; open; read returns data.
#[test]
fn round_trip_write_then_read() {
    let fs = small_fs();
    let data = b"round trip data";
    let h = fs.open("/f", OpenMode::CREAT | OpenMode::TRUNC).unwrap();
    assert_eq!(fs.write(h, data).unwrap(), data.len());
    fs.close(h).unwrap();

    let h2 = fs.open("/f", OpenMode::empty()).unwrap();
    let mut buf = vec![0u8; data.len()];
    assert_eq!(fs.read(h2, &mut buf).unwrap(), data.len());
    assert_eq!(&buf, data);
}

// Linking then unlinking the link leaves the original resolvable.
#[test]
fn link_then_unlink_link_leaves_original() {
    let fs = small_fs();
    let h = fs.open("/a", OpenMode::CREAT).unwrap();
    fs.write(h, b"x").unwrap();
    fs.close(h).unwrap();

    fs.link("/a", "/b").unwrap();
    fs.unlink("/b").unwrap();

    let h2 = fs.open("/a", OpenMode::empty()).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(fs.read(h2, &mut buf).unwrap(), 1);
    assert_eq!(&buf, b"x");
}

// unlink(x); lookup(x) -> NotFound.
#[test]
fn unlink_then_lookup_not_found() {
    let fs = small_fs();
    fs.open("/x", OpenMode::CREAT).unwrap();
    fs.close(fs.open("/x", OpenMode::empty()).unwrap()).unwrap();
    fs.unlink("/x").unwrap();
    assert!(fs.open("/x", OpenMode::empty()).is_err());
}

// Boundary: writing block_size + k bytes writes exactly block_size bytes;
// a subsequent write at the now-full offset returns 0.
#[test]
fn write_clips_to_block_size_then_saturates_at_zero() {
    let fs = small_fs(); // block_size = 64
    let h = fs.open("/big", OpenMode::CREAT).unwrap();
    let oversized = vec![b'z'; 64 + 10];
    assert_eq!(fs.write(h, &oversized).unwrap(), 64);
    assert_eq!(fs.write(h, b"more").unwrap(), 0);
}

// Boundary: exceeding max_inode_count fails the excess allocation with
// NoSpace (surfaced as -1 at the compat boundary).
#[test]
fn inode_table_exhaustion_fails_the_excess() {
    let fs = small_fs(); // max_inode_count = 3, one of which is the root
    let mut opened = Vec::new();
    for i in 0..2 {
        let h = compat::tfs_open(&fs, &format!("/f{}", i), OpenMode::CREAT);
        assert!(h >= 0, "inode {} should have been created", i);
        opened.push(h);
    }
    assert_eq!(compat::tfs_open(&fs, "/overflow", OpenMode::CREAT), -1);
}

// Invariant: every open-file entry's inumber references a live inode —
// exercised by round-tripping through many create/close/unlink cycles and
// confirming no handle ever observes stale data from a deleted inode.
#[test]
fn reused_slots_never_see_stale_contents() {
    let fs = small_fs();
    for i in 0..20 {
        let h = fs.open("/recycled", OpenMode::CREAT | OpenMode::TRUNC).unwrap();
        let payload = format!("generation-{}", i);
        fs.write(h, payload.as_bytes()).unwrap();
        fs.close(h).unwrap();

        let h2 = fs.open("/recycled", OpenMode::empty()).unwrap();
        let mut buf = vec![0u8; payload.len()];
        fs.read(h2, &mut buf).unwrap();
        assert_eq!(buf, payload.as_bytes());
        fs.close(h2).unwrap();
        fs.unlink("/recycled").unwrap();
    }
}
