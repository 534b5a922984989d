use std::sync::Arc;

use tiny_fs::{
    BlockDevice, DeviceError, Error, FreeBlockList, Inode, ListEntry, Name, RamDisk, Rule, Session, SuperBlock,
    BLOCK_SIZE, INODE_COUNT, ROOT,
};

fn name(s: &str) -> Name {
    Name::new(s).unwrap()
}

fn mounted() -> (Arc<RamDisk>, Session) {
    let disk = Arc::new(RamDisk::new());
    let block_device: Arc<dyn BlockDevice> = disk.clone();
    tiny_fs::format(&block_device).unwrap();

    let mut session = Session::new();
    session.mount(block_device).unwrap();
    (disk, session)
}

fn sb(session: &Session) -> &SuperBlock {
    session.fs().unwrap().super_block()
}

fn bitmap(session: &Session) -> FreeBlockList {
    sb(session).free_list
}

fn inode(session: &Session, s: &str) -> Inode {
    let sb = sb(session);
    let cwd = session.fs().unwrap().cwd();
    sb.inodes[sb.find_child(cwd, &name(s)).unwrap()]
}

/// 把 `tag` 写进文件的每一块
fn fill(session: &mut Session, file: &str, blocks: u8, tag: &str) {
    for block in 0..blocks {
        session.set_buffer(format!("{tag}{block}").as_bytes()).unwrap();
        session.write(name(file), block).unwrap();
    }
}

fn read(session: &mut Session, file: &str, block: u8) -> Vec<u8> {
    session.read(name(file), block).unwrap();
    session.buffer().to_vec()
}

#[test]
fn create_duplicate_then_delete() {
    let (_, mut session) = mounted();
    let before = bitmap(&session);

    session.create(name("data"), 3).unwrap();
    let data = inode(&session, "data");
    assert_eq!(data.start_block(), 1);
    assert_eq!(data.size(), 3);
    assert_eq!(data.parent(), ROOT);
    assert!((1..4).all(|block_id| !bitmap(&session).is_free(block_id)));

    assert_eq!(
        session.create(name("data"), 2),
        Err(Error::NameConflict(name("data")))
    );

    session.delete(name("data")).unwrap();
    assert_eq!(bitmap(&session), before);
    assert!(sb(&session).inodes.iter().all(Inode::is_zeroed));
}

#[test]
fn same_name_in_different_directories() {
    let (_, mut session) = mounted();
    session.create(name("dir"), 0).unwrap();
    session.create(name("x"), 1).unwrap();
    session.cd(name("dir")).unwrap();
    session.create(name("x"), 1).unwrap();
    assert_eq!(session.create(name("x"), 0), Err(Error::NameConflict(name("x"))));

    assert_eq!(inode(&session, "x").start_block(), 2);
    assert_eq!(inode(&session, "x").parent(), 0);
}

#[test]
fn reserved_names_are_rejected() {
    let (_, mut session) = mounted();
    assert_eq!(session.create(name("."), 0), Err(Error::NameConflict(name("."))));
    assert_eq!(session.create(name(".."), 1), Err(Error::NameConflict(name(".."))));
    assert_eq!(bitmap(&session).find_run(127, FreeBlockList::DATA_BLOCKS), Some(1..128));
}

#[test]
fn inode_table_exhaustion() {
    let (_, mut session) = mounted();
    for i in 0..INODE_COUNT {
        session.create(name(&format!("d{i}")), 0).unwrap();
    }
    assert_eq!(
        session.create(name("extra"), 1),
        Err(Error::NoFreeInode(name("extra")))
    );
    assert!(bitmap(&session).is_free(1));
}

#[test]
fn whole_disk_file() {
    let (_, mut session) = mounted();
    session.create(name("big"), 127).unwrap();
    session.delete(name("big")).unwrap();

    session.create(name("small"), 1).unwrap();
    let before = sb(&session).clone();
    assert_eq!(
        session.create(name("big"), 127),
        Err(Error::NoSpace { name: name("big"), blocks: 127 })
    );
    assert_eq!(sb(&session), &before);
}

#[test]
fn operations_need_a_mount() {
    let mut session = Session::new();
    assert_eq!(session.create(name("a"), 1), Err(Error::NotMounted));
    assert_eq!(session.ls(), Err(Error::NotMounted));
    assert_eq!(session.defrag(), Err(Error::NotMounted));
    assert_eq!(session.read(name("a"), 0), Err(Error::NotMounted));
    // 缓冲区不依赖挂载
    session.set_buffer(b"still works").unwrap();
}

#[test]
fn recursive_delete_scrubs_everything() {
    let (disk, mut session) = mounted();
    session.create(name("keep"), 1).unwrap();
    session.create(name("d"), 0).unwrap();
    session.cd(name("d")).unwrap();
    session.create(name("f"), 2).unwrap();
    session.create(name("e"), 0).unwrap();
    session.cd(name("e")).unwrap();
    session.create(name("g"), 3).unwrap();
    fill(&mut session, "g", 3, "g");
    session.cd(name("..")).unwrap();
    fill(&mut session, "f", 2, "f");
    session.cd(name("..")).unwrap();

    session.delete(name("d")).unwrap();

    let sb = sb(&session);
    assert_eq!(sb.inodes.iter().filter(|inode| inode.is_used()).count(), 1);
    assert!(sb.inodes[1..].iter().all(Inode::is_zeroed));
    assert_eq!(sb.free_list.find_run(126, FreeBlockList::DATA_BLOCKS), Some(2..128));
    for block_id in 2..7 {
        assert_eq!(disk.block(block_id), [0; BLOCK_SIZE]);
    }
}

#[test]
fn delete_missing() {
    let (_, mut session) = mounted();
    assert_eq!(session.delete(name("nope")), Err(Error::NotFound(name("nope"))));
}

#[test]
fn grow_in_place_and_shrink() {
    let (disk, mut session) = mounted();
    session.create(name("a"), 2).unwrap();
    fill(&mut session, "a", 2, "a");

    session.resize(name("a"), 5).unwrap();
    assert_eq!(inode(&session, "a").extent(), 1..6);

    session.resize(name("a"), 1).unwrap();
    assert_eq!(inode(&session, "a").extent(), 1..2);
    assert!(bitmap(&session).is_range_free(2..128));
    assert_eq!(disk.block(2), [0; BLOCK_SIZE]);
    assert_eq!(&read(&mut session, "a", 0)[..2], b"a0");
}

#[test]
fn grow_relocates_and_preserves_content() {
    let (disk, mut session) = mounted();
    session.create(name("a"), 2).unwrap();
    session.create(name("b"), 1).unwrap();
    fill(&mut session, "a", 2, "a");
    let original: Vec<_> = (0..2).map(|block| read(&mut session, "a", block)).collect();

    session.resize(name("a"), 4).unwrap();
    assert_eq!(inode(&session, "a").extent(), 4..8);
    assert!(bitmap(&session).is_range_free(1..3));
    assert_eq!(disk.block(1), [0; BLOCK_SIZE]);
    assert_eq!(inode(&session, "b").extent(), 3..4);

    session.resize(name("a"), 2).unwrap();
    let shrunk: Vec<_> = (0..2).map(|block| read(&mut session, "a", block)).collect();
    assert_eq!(shrunk, original);
    assert_eq!(
        session.read(name("a"), 2),
        Err(Error::OutOfRange { name: name("a"), block: 2 })
    );
}

#[test]
fn failed_grow_restores_allocation() {
    let (disk, mut session) = mounted();
    session.create(name("a"), 60).unwrap();
    session.create(name("b"), 60).unwrap();
    fill(&mut session, "a", 3, "a");
    let sb_before = sb(&session).clone();
    let image_before = disk.image();

    assert_eq!(
        session.resize(name("a"), 70),
        Err(Error::ResizeFailure { name: name("a"), size: 70 })
    );
    assert_eq!(sb(&session), &sb_before);
    assert_eq!(disk.image(), image_before);
}

#[test]
fn resize_only_files() {
    let (_, mut session) = mounted();
    session.create(name("d"), 0).unwrap();
    assert_eq!(session.resize(name("d"), 3), Err(Error::FileNotFound(name("d"))));
    assert_eq!(session.read(name("d"), 0), Err(Error::FileNotFound(name("d"))));
}

#[test]
fn defrag_compacts_and_is_idempotent() {
    let (disk, mut session) = mounted();
    session.create(name("a"), 2).unwrap();
    session.create(name("b"), 3).unwrap();
    session.create(name("c"), 1).unwrap();
    session.create(name("d"), 0).unwrap();
    fill(&mut session, "b", 3, "b");
    fill(&mut session, "c", 1, "c");
    session.delete(name("a")).unwrap();

    session.defrag().unwrap();
    assert_eq!(inode(&session, "b").extent(), 1..4);
    assert_eq!(inode(&session, "c").extent(), 4..5);
    assert!(bitmap(&session).is_range_free(5..128));
    assert_eq!(disk.block(5), [0; BLOCK_SIZE]);
    assert_eq!(&read(&mut session, "b", 2)[..2], b"b2");
    assert_eq!(&read(&mut session, "c", 0)[..2], b"c0");

    let once = disk.image();
    session.defrag().unwrap();
    assert_eq!(disk.image(), once);
}

#[test]
fn cd_navigation() {
    let (_, mut session) = mounted();
    session.cd(name("..")).unwrap();
    session.cd(name(".")).unwrap();
    assert_eq!(session.fs().unwrap().cwd(), ROOT);

    session.create(name("f"), 1).unwrap();
    session.create(name("d"), 0).unwrap();
    assert_eq!(session.cd(name("f")), Err(Error::DirNotFound(name("f"))));
    assert_eq!(session.cd(name("zz")), Err(Error::DirNotFound(name("zz"))));
    assert_eq!(session.fs().unwrap().cwd(), ROOT);

    session.cd(name("d")).unwrap();
    assert_eq!(session.fs().unwrap().cwd(), 1);
    session.cd(name("..")).unwrap();
    assert_eq!(session.fs().unwrap().cwd(), ROOT);
}

#[test]
fn ls_counts() {
    let (_, mut session) = mounted();
    session.create(name("d"), 0).unwrap();
    session.create(name("f"), 3).unwrap();

    let root = session.ls().unwrap();
    let lines: Vec<String> = root.iter().map(ListEntry::to_string).collect();
    assert_eq!(lines, [".       4", "..      4", "d       2", "f       3 KB"]);

    session.cd(name("d")).unwrap();
    session.create(name("g"), 1).unwrap();
    let sub = session.ls().unwrap();
    assert_eq!(sub[0].count, 3);
    assert_eq!(sub[1].count, 4);
    assert_eq!(sub[2], ListEntry { name: name("g"), is_dir: false, count: 1 });
}

#[test]
fn rejected_mount_keeps_previous_state() {
    let (_, mut session) = mounted();
    session.create(name("d"), 0).unwrap();
    session.cd(name("d")).unwrap();
    let before = sb(&session).clone();

    let mut bad = SuperBlock::default();
    bad.inodes[0] = Inode::new(name("e"), true, 126, 0, 0);
    let bad_disk: Arc<dyn BlockDevice> = Arc::new(RamDisk::new());
    bad.store(&bad_disk).unwrap();

    assert_eq!(session.mount(bad_disk), Err(Error::Inconsistent(Rule::ParentIndex)));
    assert_eq!(sb(&session), &before);
    assert_eq!(session.fs().unwrap().cwd(), 0);
}

#[test]
fn truncated_image_fails_to_mount() {
    let (disk, mut session) = mounted();
    session.create(name("f"), 2).unwrap();
    let before = sb(&session).clone();

    let short: Arc<dyn BlockDevice> = Arc::new(RamDisk::from_image(&disk.image()[..100]));
    assert_eq!(
        session.mount(short),
        Err(Error::Device(DeviceError::OutOfRange { block_id: 0 }))
    );
    assert_eq!(sb(&session), &before);

    // 超级块完整但数据块被截掉
    let half: Arc<dyn BlockDevice> =
        Arc::new(RamDisk::from_image(&disk.image()[..2 * BLOCK_SIZE]));
    session.mount(half).unwrap();
    assert_eq!(sb(&session), &before);
    session.read(name("f"), 0).unwrap();
    assert_eq!(
        session.read(name("f"), 1),
        Err(Error::Device(DeviceError::OutOfRange { block_id: 2 }))
    );
}

#[test]
fn state_survives_remount() {
    let (disk, mut session) = mounted();
    session.create(name("d"), 0).unwrap();
    session.create(name("f"), 4).unwrap();
    session.set_buffer(b"kept").unwrap();
    let before = sb(&session).clone();

    session.mount(disk).unwrap();
    assert_eq!(sb(&session), &before);
    assert_eq!(session.fs().unwrap().cwd(), ROOT);
    assert_eq!(&session.buffer()[..4], b"kept");
}
