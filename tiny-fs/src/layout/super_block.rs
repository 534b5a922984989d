use alloc::sync::Arc;

use block_dev::{BlockDevice, DeviceError};

use crate::layout::{FreeBlockList, Inode, Name};
use crate::{DataBlock, BLOCK_SIZE, INODE_COUNT};

/// 超级块：占据0号块，
/// - 前16字节为空闲块位图；
/// - 其后是 126 条 inode 记录，恰好填满一块。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    pub free_list: FreeBlockList,
    pub inodes: [Inode; INODE_COUNT],
}

const _: () = assert!(FreeBlockList::SIZE + INODE_COUNT * Inode::SIZE == BLOCK_SIZE);

impl Default for SuperBlock {
    fn default() -> Self {
        Self {
            free_list: FreeBlockList::default(),
            inodes: [Inode::default(); INODE_COUNT],
        }
    }
}

impl SuperBlock {
    /// 超级块所在块
    pub const BLOCK_ID: usize = 0;

    pub fn from_bytes(block: &DataBlock) -> Self {
        let (bitmap, table) = block.split_at(FreeBlockList::SIZE);
        let mut inodes = [Inode::default(); INODE_COUNT];
        for (inode, bytes) in inodes.iter_mut().zip(table.chunks_exact(Inode::SIZE)) {
            *inode = Inode::from_bytes(bytes);
        }

        Self {
            free_list: FreeBlockList::from_bytes(bitmap),
            inodes,
        }
    }

    pub fn to_bytes(&self) -> DataBlock {
        let mut block = [0; BLOCK_SIZE];
        let (bitmap, table) = block.split_at_mut(FreeBlockList::SIZE);
        bitmap.copy_from_slice(self.free_list.as_bytes());
        for (inode, bytes) in self.inodes.iter().zip(table.chunks_exact_mut(Inode::SIZE)) {
            inode.write_bytes(bytes);
        }
        block
    }

    /// 从块设备读出超级块
    pub fn load(block_device: &Arc<dyn BlockDevice>) -> Result<Self, DeviceError> {
        let mut block = [0; BLOCK_SIZE];
        block_device.read_block(Self::BLOCK_ID, &mut block)?;
        Ok(Self::from_bytes(&block))
    }

    /// 将整个超级块写回块设备
    pub fn store(&self, block_device: &Arc<dyn BlockDevice>) -> Result<(), DeviceError> {
        block_device.write_block(Self::BLOCK_ID, &self.to_bytes())
    }

    /// 编号最小的空闲 inode
    pub fn free_inode(&self) -> Option<usize> {
        self.inodes.iter().position(|inode| !inode.is_used())
    }

    /// `dir` 目录下的直接子项，按 inode 编号排列
    pub fn children(&self, dir: u8) -> impl Iterator<Item = (usize, &Inode)> + '_ {
        self.inodes
            .iter()
            .enumerate()
            .filter(move |(_, inode)| inode.is_used() && inode.parent() == dir)
    }

    /// 在 `dir` 目录下按名字查找子项
    pub fn find_child(&self, dir: u8, name: &Name) -> Option<usize> {
        self.children(dir)
            .find_map(|(index, inode)| (inode.name() == *name).then_some(index))
    }
}
