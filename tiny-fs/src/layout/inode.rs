//! inode 记录的编解码。
//!
//! 每条记录占 8 字节：
//!
//! | 字节 | 内容 |
//! |------|------|
//! | 0 | `dir_parent`：第7位为目录标志，第0-6位为父目录编号 |
//! | 1 | `used_size`：第7位为占用标志，第0-6位为占用块数 |
//! | 2 | `start_block`：文件首块编号，目录恒为0 |
//! | 3..8 | `name`：5字节原始名字，不保证以 `\0` 结尾 |

use core::fmt;

use crate::NAME_LEN;

/// 标志位（目录、占用）
const FLAG_BIT: u8 = 0b1000_0000;
/// 父目录编号、块数所占的低7位
const FIELD_MASK: u8 = !FLAG_BIT;

/// 磁盘上的 inode 记录
///
/// 保留原始字节，一致性检查需要看到未解释的 `used_size`。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    dir_parent: u8,
    used_size: u8,
    start_block: u8,
    name: Name,
}

/// 5字节的文件名，剩余字节补0
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name([u8; NAME_LEN]);

impl Inode {
    /// 记录大小恒为8字节
    pub const SIZE: usize = 3 + NAME_LEN;

    /// 构造一个占用中的 inode。`parent` 与 `size` 只取低7位。
    pub fn new(name: Name, is_dir: bool, parent: u8, size: u8, start_block: u8) -> Self {
        let mut inode = Self {
            dir_parent: parent & FIELD_MASK,
            used_size: FLAG_BIT,
            start_block,
            name,
        };
        if is_dir {
            inode.dir_parent |= FLAG_BIT;
        }
        inode.set_size(size);
        inode
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut name = [0; NAME_LEN];
        name.copy_from_slice(&bytes[3..Self::SIZE]);
        Self {
            dir_parent: bytes[0],
            used_size: bytes[1],
            start_block: bytes[2],
            name: Name(name),
        }
    }

    pub fn write_bytes(&self, bytes: &mut [u8]) {
        bytes[0] = self.dir_parent;
        bytes[1] = self.used_size;
        bytes[2] = self.start_block;
        bytes[3..Self::SIZE].copy_from_slice(&self.name.0);
    }

    #[inline]
    pub fn is_used(&self) -> bool {
        self.used_size & FLAG_BIT != 0
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.dir_parent & FLAG_BIT != 0
    }

    /// 在用的普通文件
    #[inline]
    pub fn is_file(&self) -> bool {
        self.is_used() && !self.is_dir()
    }

    #[inline]
    pub fn parent(&self) -> u8 {
        self.dir_parent & FIELD_MASK
    }

    /// 占用的块数
    #[inline]
    pub fn size(&self) -> u8 {
        self.used_size & FIELD_MASK
    }

    /// 修改块数，保留占用标志
    #[inline]
    pub fn set_size(&mut self, size: u8) {
        self.used_size = (self.used_size & FLAG_BIT) | (size & FIELD_MASK);
    }

    #[inline]
    pub fn start_block(&self) -> u8 {
        self.start_block
    }

    #[inline]
    pub fn set_start_block(&mut self, start_block: u8) {
        self.start_block = start_block;
    }

    #[inline]
    pub fn name(&self) -> Name {
        self.name
    }

    /// 未解释的 `used_size` 字节
    #[inline]
    pub fn raw_used_size(&self) -> u8 {
        self.used_size
    }

    /// 所有字段（包括名字）都为0
    pub fn is_zeroed(&self) -> bool {
        *self == Self::default()
    }

    /// 文件占据的块区间 `[start_block, start_block + size)`
    #[inline]
    pub fn extent(&self) -> core::ops::Range<usize> {
        let start = self.start_block as usize;
        start..start + self.size() as usize
    }

    #[inline]
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Name {
    /// 由不超过5字节的非空字符串构造名字
    pub fn new(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > NAME_LEN {
            return None;
        }
        let mut raw = [0; NAME_LEN];
        raw[..bytes.len()].copy_from_slice(bytes);
        Some(Self(raw))
    }

    pub const fn from_raw(raw: [u8; NAME_LEN]) -> Self {
        Self(raw)
    }

    /// 至少有一个非零字节
    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.iter().any(|&c| c != 0)
    }

    /// 去掉结尾 `\0` 的有效字节
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&c| c == 0).unwrap_or(NAME_LEN);
        &self.0[..len]
    }

    /// `.` 与 `..` 不能作为文件名
    pub fn is_reserved(&self) -> bool {
        matches!(self.as_bytes(), b"." | b"..")
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(name) => f.pad(name),
            Err(_) => write!(f, "{}", self.as_bytes().escape_ascii()),
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.as_bytes().escape_ascii())
    }
}
