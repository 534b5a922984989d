use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use block_dev::{BlockDevice, DeviceError};
use tiny_fs::{BLOCK_COUNT, BLOCK_SIZE};
use typed_bytesize::ByteSizeIec;

/// 以宿主机文件为载体的块设备。
///
/// 每次读写都重新打开镜像，定位后传输一整块，不做任何缓存。
#[derive(Debug)]
pub struct BlockFile {
    path: PathBuf,
}

impl BlockFile {
    /// 使用已存在的镜像
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if !fs::metadata(path)?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        Ok(Self {
            path: path.to_owned(),
        })
    }

    /// 创建（或截断）一个 128 块大小的镜像
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let image_size = ByteSizeIec::kib(128).0;
        debug_assert_eq!(image_size, (BLOCK_SIZE * BLOCK_COUNT) as u64);

        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        fd.set_len(image_size)?;
        log::info!("image {path:?}: {image_size} bytes");

        Ok(Self {
            path: path.to_owned(),
        })
    }

    fn seek_to(&self, block_id: usize, writable: bool) -> Result<File, DeviceError> {
        let unavailable = |err: io::Error| {
            log::error!("{:?}, block {block_id}: {err}", self.path);
            DeviceError::Unavailable { block_id }
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&self.path)
            .map_err(unavailable)?;
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .map_err(unavailable)?;
        Ok(file)
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let mut file = self.seek_to(block_id, false)?;

        let mut transferred = 0;
        while transferred < buf.len() {
            match file.read(&mut buf[transferred..]) {
                Ok(0) => break,
                Ok(n) => transferred += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    log::error!("reading block {block_id}: {err}");
                    break;
                }
            }
        }

        complete(block_id, transferred)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let mut file = self.seek_to(block_id, true)?;

        let mut transferred = 0;
        while transferred < buf.len() {
            match file.write(&buf[transferred..]) {
                Ok(0) => break,
                Ok(n) => transferred += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    log::error!("writing block {block_id}: {err}");
                    break;
                }
            }
        }

        complete(block_id, transferred)
    }
}

/// 不足一块即视为失败
fn complete(block_id: usize, transferred: usize) -> Result<(), DeviceError> {
    if transferred < BLOCK_SIZE {
        return Err(DeviceError::Incomplete {
            block_id,
            transferred,
            expected: BLOCK_SIZE,
        });
    }
    Ok(())
}
