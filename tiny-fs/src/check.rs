//! # 一致性检查
//!
//! 挂载前对超级块做六项结构性检查，按固定顺序进行，遇到第一条不满足的规则即停止。
//! 规则的序号（1-6）即对外报告的错误码。

use alloc::vec::Vec;

use enumflags2::{bitflags, BitFlags};

use crate::layout::SuperBlock;
use crate::{BLOCK_COUNT, INODE_COUNT, ROOT};

/// 一致性规则，位序即检查顺序
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// 位图中空闲的块不属于任何文件；已分配的块（0号块除外）恰好属于一个文件
    BlockOwnership = 0b0000_0001,
    /// 同一目录下名字互不相同
    UniqueNames = 0b0000_0010,
    /// 在用 inode 有名字；空闲 inode 全为0
    InodeShape = 0b0000_0100,
    /// 文件首块在 1..=127 之内
    FileStart = 0b0000_1000,
    /// 目录的首块与大小都为0
    DirectoryZeroed = 0b0001_0000,
    /// 父目录编号不为126，且指向在用的目录
    ParentIndex = 0b0010_0000,
}

impl Rule {
    /// 规则序号，即挂载失败时报告的错误码
    pub fn code(self) -> u8 {
        (self as u8).trailing_zeros() as u8 + 1
    }

    pub fn holds(self, sb: &SuperBlock) -> bool {
        match self {
            Self::BlockOwnership => block_ownership(sb),
            Self::UniqueNames => unique_names(sb),
            Self::InodeShape => inode_shape(sb),
            Self::FileStart => file_start(sb),
            Self::DirectoryZeroed => directory_zeroed(sb),
            Self::ParentIndex => parent_index(sb),
        }
    }
}

/// 按顺序检查，返回第一条不满足的规则
pub fn check(sb: &SuperBlock) -> Result<(), Rule> {
    match BitFlags::<Rule>::all().iter().find(|rule| !rule.holds(sb)) {
        Some(rule) => Err(rule),
        None => Ok(()),
    }
}

/// 检查所有规则，返回全部不满足的规则
pub fn violations(sb: &SuperBlock) -> BitFlags<Rule> {
    BitFlags::<Rule>::all()
        .iter()
        .filter(|rule| !rule.holds(sb))
        .collect()
}

fn block_ownership(sb: &SuperBlock) -> bool {
    let mut owners = [0u8; BLOCK_COUNT];
    // 首块落在磁盘之外的文件留给规则4
    let claims = sb
        .inodes
        .iter()
        .filter(|inode| inode.is_used() && (inode.start_block() as usize) < BLOCK_COUNT);
    for inode in claims {
        for block_id in inode.extent() {
            // 0号块不参与比对，首块为0的文件留给规则4
            if block_id >= BLOCK_COUNT || (block_id != 0 && sb.free_list.is_free(block_id)) {
                return false;
            }
            owners[block_id] = owners[block_id].saturating_add(1);
        }
    }

    (1..BLOCK_COUNT)
        .filter(|&block_id| !sb.free_list.is_free(block_id))
        .all(|block_id| owners[block_id] == 1)
}

fn unique_names(sb: &SuperBlock) -> bool {
    let used: Vec<_> = sb.inodes.iter().filter(|inode| inode.is_used()).collect();
    used.iter().enumerate().all(|(i, inode)| {
        used[i + 1..]
            .iter()
            .all(|other| other.parent() != inode.parent() || other.name() != inode.name())
    })
}

fn inode_shape(sb: &SuperBlock) -> bool {
    sb.inodes.iter().all(|inode| {
        if inode.is_used() {
            inode.name().is_set()
        } else {
            inode.is_zeroed()
        }
    })
}

fn file_start(sb: &SuperBlock) -> bool {
    sb.inodes
        .iter()
        .filter(|inode| inode.is_file())
        .all(|inode| (1..BLOCK_COUNT as u8).contains(&inode.start_block()))
}

fn directory_zeroed(sb: &SuperBlock) -> bool {
    sb.inodes
        .iter()
        .filter(|inode| inode.is_used() && inode.is_dir())
        .all(|inode| inode.start_block() == 0 && inode.size() == 0)
}

fn parent_index(sb: &SuperBlock) -> bool {
    sb.inodes
        .iter()
        .filter(|inode| inode.is_used())
        .all(|inode| match inode.parent() {
            ROOT => true,
            parent if (parent as usize) < INODE_COUNT => {
                let parent = &sb.inodes[parent as usize];
                parent.is_used() && parent.is_dir()
            }
            _ => false,
        })
}
