use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use block_dev::BlockDevice;
use tiny_fs_shell::{BlockFile, Shell};

fn format(path: &Path) {
    let block_dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::create(path).unwrap());
    tiny_fs::format(&block_dev).unwrap();
}

/// 执行脚本，返回标准输出与标准错误
fn run(script: &Path) -> (String, String) {
    let mut shell = Shell::new(Vec::new(), Vec::new());
    shell.run_script(script).unwrap();
    let (out, err) = shell.into_output();
    (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
}

fn write_script(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("commands");
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

#[test]
fn full_session() {
    let dir = tempfile::tempdir().unwrap();
    let disk = dir.path().join("disk0");
    let missing = dir.path().join("missing");
    format(&disk);

    let script = write_script(
        dir.path(),
        &[
            format!("M {}", disk.display()),
            "C data 3".into(),
            "C data 2".into(),
            "C dir 0".into(),
            "Y dir".into(),
            "C data 1".into(),
            "L".into(),
            "Y ..".into(),
            "B hello".into(),
            "W data 0".into(),
            "E data 5".into(),
            "B other".into(),
            "R data 0".into(),
            "L".into(),
            "".into(),
            "X bogus".into(),
            "D dir".into(),
            "L".into(),
            "R data 9".into(),
            format!("M {}", missing.display()),
        ],
    );

    let mut shell = Shell::new(Vec::new(), Vec::new());
    shell.run_script(&script).unwrap();
    let buffer = *shell.session().buffer();
    assert_eq!(shell.disk(), Some(disk.to_str().unwrap()));
    let sb = shell.session().fs().unwrap().super_block().clone();
    let (out, err) = shell.into_output();
    let (out, err) = (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap());

    assert_eq!(
        out.lines().collect::<Vec<_>>(),
        [
            ".       3",
            "..      4",
            "data    1 KB",
            ".       4",
            "..      4",
            "data    5 KB",
            "dir     3",
            ".       3",
            "..      3",
            "data    5 KB",
        ]
    );
    assert_eq!(
        err.lines().collect::<Vec<_>>(),
        [
            "Error: File or directory data already exists".to_owned(),
            format!("Command Error: {}, 16", script.display()),
            "Error: data does not have block 9".to_owned(),
            format!("Error: Cannot find disk {}", missing.display()),
        ]
    );

    // 搬迁之后内容不变
    assert_eq!(&buffer[..5], b"hello");
    assert!(buffer[5..].iter().all(|&b| b == 0));
    assert_eq!(sb.inodes[0].extent(), 5..10);

    // 写回磁盘的超级块与内存一致
    let image = fs::read(&disk).unwrap();
    assert_eq!(&image[..16], sb.free_list.as_bytes());
}

#[test]
fn commands_before_mount_and_inconsistent_disk() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad");
    format(&bad);
    let mut image = fs::read(&bad).unwrap();
    // 5号块标记为已分配，却不属于任何文件
    image[0] |= 0b0000_0100;
    fs::write(&bad, image).unwrap();

    let script = write_script(
        dir.path(),
        &[
            "L".into(),
            "C a 1".into(),
            "B still fine".into(),
            format!("M {}", bad.display()),
            "O".into(),
        ],
    );

    let (out, err) = run(&script);
    assert!(out.is_empty());
    assert_eq!(
        err.lines().collect::<Vec<_>>(),
        [
            "Error: No file system is mounted".to_owned(),
            "Error: No file system is mounted".to_owned(),
            format!("Error: File system in {} is inconsistent (error code: 1)", bad.display()),
            "Error: No file system is mounted".to_owned(),
        ]
    );
}
