use block_dev::DeviceError;

use crate::check::Rule;
use crate::layout::Name;

/// 文件系统操作的错误。
///
/// 除 [`Error::Device`] 外，出错时内存与磁盘上的状态都保持操作前的样子。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("no file system is mounted")]
    NotMounted,
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// 挂载时一致性检查未通过
    #[error("file system is inconsistent (error code: {})", .0.code())]
    Inconsistent(Rule),
    /// inode 表已满
    #[error("superblock is full, cannot create {0}")]
    NoFreeInode(Name),
    /// 找不到足够长的连续空闲块
    #[error("cannot allocate {blocks} blocks for {name}")]
    NoSpace { name: Name, blocks: u8 },
    /// 同目录下已有同名项，或使用了 `.`、`..`
    #[error("file or directory {0} already exists")]
    NameConflict(Name),
    #[error("file or directory {0} does not exist")]
    NotFound(Name),
    #[error("file {0} does not exist")]
    FileNotFound(Name),
    #[error("directory {0} does not exist")]
    DirNotFound(Name),
    #[error("{name} does not have block {block}")]
    OutOfRange { name: Name, block: u8 },
    /// 扩容失败，原有分配已恢复
    #[error("file {name} cannot expand to size {size}")]
    ResizeFailure { name: Name, size: u8 },
    #[error("buffer holds at most {max} bytes, got {len}")]
    BufferOverflow { len: usize, max: usize },
}
