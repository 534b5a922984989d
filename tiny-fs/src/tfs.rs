//! # 文件系统层
//!
//! 目录树不占用数据块，而是由 inode 的父目录编号隐式构成：
//! 把所有在用 inode 按父目录编号分组即得到每个目录的内容，
//! 根目录没有 inode，以 [`ROOT`] 为编号。
//!
//! 所有修改操作都遵循同一顺序：先校验，再改位图，再改 inode，最后同步写回超级块。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use core::ops::Range;

use block_dev::{BlockDevice, DeviceError};

use crate::check;
use crate::layout::{FreeBlockList, Inode, Name, SuperBlock};
use crate::{DataBlock, Error, BLOCK_COUNT, BLOCK_SIZE, ROOT};

/// 已挂载的文件系统
pub struct TinyFileSystem {
    block_device: Arc<dyn BlockDevice>,
    sb: SuperBlock,
    /// 当前目录，inode 编号或 [`ROOT`]
    cwd: u8,
}

/// `ls` 的一行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntry {
    pub name: Name,
    pub is_dir: bool,
    /// 文件为占用块数；目录为子项数 + 2（`.` 与 `..`）
    pub count: u8,
}

/// 写出一个空白镜像：所有块清零，超级块只占用0号块。
pub fn format(block_device: &Arc<dyn BlockDevice>) -> Result<(), DeviceError> {
    let zero = [0; BLOCK_SIZE];
    for block_id in 0..BLOCK_COUNT {
        block_device.write_block(block_id, &zero)?;
    }

    let mut sb = SuperBlock::default();
    sb.free_list.alloc(SuperBlock::BLOCK_ID);
    sb.store(block_device)
}

impl TinyFileSystem {
    /// 读出超级块并做一致性检查，通过后才能使用。
    pub fn open(block_device: Arc<dyn BlockDevice>) -> Result<Self, Error> {
        let sb = SuperBlock::load(&block_device)?;
        if let Err(rule) = check::check(&sb) {
            log::warn!("consistency check failed: rule {} ({rule:?})", rule.code());
            return Err(Error::Inconsistent(rule));
        }

        log::info!(
            "mounted: {} inodes in use",
            sb.inodes.iter().filter(|inode| inode.is_used()).count()
        );
        Ok(Self {
            block_device,
            sb,
            cwd: ROOT,
        })
    }

    #[inline]
    pub fn super_block(&self) -> &SuperBlock {
        &self.sb
    }

    #[inline]
    pub fn cwd(&self) -> u8 {
        self.cwd
    }

    /// 在当前目录下创建项：`size` 为0时创建目录，否则创建占用 `size` 个连续块的文件。
    ///
    /// 返回新 inode 的编号。
    pub fn create(&mut self, name: Name, size: u8) -> Result<usize, Error> {
        let index = self.sb.free_inode().ok_or(Error::NoFreeInode(name))?;
        if name.is_reserved() || self.sb.find_child(self.cwd, &name).is_some() {
            return Err(Error::NameConflict(name));
        }

        let is_dir = size == 0;
        let start_block = if is_dir {
            0
        } else {
            let run = self
                .sb
                .free_list
                .find_run(size as usize, FreeBlockList::DATA_BLOCKS)
                .ok_or(Error::NoSpace { name, blocks: size })?;
            self.sb.free_list.alloc_range(run.clone());
            run.start as u8
        };

        self.sb.inodes[index] = Inode::new(name, is_dir, self.cwd, size, start_block);
        self.sync()?;

        log::info!("create {name}: inode {index}, blocks {start_block}+{size}");
        Ok(index)
    }

    /// 删除当前目录下的文件或目录，目录连同其所有后代一起删除。
    pub fn delete(&mut self, name: Name) -> Result<(), Error> {
        let index = self
            .sb
            .find_child(self.cwd, &name)
            .ok_or(Error::NotFound(name))?;
        self.remove(index)?;
        self.sync()?;

        log::info!("delete {name}: inode {index}");
        Ok(())
    }

    /// 调整文件占用的块数。
    ///
    /// 缩小时从尾部释放；扩大时先尝试原地延伸，不行再整体搬迁到首个足够长的空闲区间。
    /// 搬迁也找不到位置时恢复原有分配并报错。
    pub fn resize(&mut self, name: Name, size: u8) -> Result<(), Error> {
        let index = self.find_file(&name)?;
        let old = self.sb.inodes[index].extent();
        let new_len = size as usize;

        match new_len.cmp(&old.len()) {
            Ordering::Equal => return Ok(()),
            Ordering::Less => {
                let tail = old.start + new_len..old.end;
                self.zero_blocks(tail.clone())?;
                self.sb.free_list.dealloc_range(tail);
            }
            Ordering::Greater => {
                let grown = old.end..old.start + new_len;
                if self.sb.free_list.is_range_free(grown.clone()) {
                    self.sb.free_list.alloc_range(grown);
                } else {
                    self.sb.free_list.dealloc_range(old.clone());
                    let Some(run) = self
                        .sb
                        .free_list
                        .find_run(new_len, FreeBlockList::DATA_BLOCKS)
                    else {
                        self.sb.free_list.alloc_range(old);
                        return Err(Error::ResizeFailure { name, size });
                    };

                    self.move_blocks(old.clone(), run.start)?;
                    self.sb.free_list.alloc_range(run.clone());
                    self.zero_blocks(old.filter(|block_id| !run.contains(block_id)))?;
                    self.sb.inodes[index].set_start_block(run.start as u8);
                }
            }
        }

        self.sb.inodes[index].set_size(size);
        self.sync()?;

        log::info!("resize {name}: {} blocks from {}", size, self.sb.inodes[index].start_block());
        Ok(())
    }

    /// 碎片整理：按首块从小到大，把每个文件尽量向0号块方向挪动。
    pub fn defrag(&mut self) -> Result<(), Error> {
        let mut files: Vec<usize> = self
            .sb
            .inodes
            .iter()
            .enumerate()
            .filter(|(_, inode)| inode.is_file() && inode.size() > 0)
            .map(|(index, _)| index)
            .collect();
        files.sort_by_key(|&index| self.sb.inodes[index].start_block());

        for index in files {
            let old = self.sb.inodes[index].extent();
            let mut start = old.start;
            while start > 1 && self.sb.free_list.is_free(start - 1) {
                start -= 1;
            }
            if start == old.start {
                continue;
            }

            let new = start..start + old.len();
            self.move_blocks(old.clone(), start)?;
            self.sb.free_list.dealloc_range(old.clone());
            self.sb.free_list.alloc_range(new.clone());
            self.zero_blocks(old.filter(|block_id| !new.contains(block_id)))?;
            self.sb.inodes[index].set_start_block(start as u8);
        }

        self.sync()?;
        log::info!("defragmented");
        Ok(())
    }

    /// 切换当前目录：`.` 不动，`..` 回到上级（根目录下不动），其余必须是当前目录下的目录。
    pub fn cd(&mut self, name: Name) -> Result<(), Error> {
        match name.as_bytes() {
            b"." => {}
            b".." => {
                if self.cwd != ROOT {
                    self.cwd = self.sb.inodes[self.cwd as usize].parent();
                }
            }
            _ => {
                let index = self
                    .sb
                    .find_child(self.cwd, &name)
                    .filter(|&index| self.sb.inodes[index].is_dir())
                    .ok_or(Error::DirNotFound(name))?;
                self.cwd = index as u8;
            }
        }
        Ok(())
    }

    /// 列出当前目录：先是 `.` 与 `..`，然后按 inode 编号列出子项。
    pub fn ls(&self) -> Vec<ListEntry> {
        let parent = match self.cwd {
            ROOT => ROOT,
            cwd => self.sb.inodes[cwd as usize].parent(),
        };

        let mut entries = Vec::with_capacity(2);
        entries.push(ListEntry::dir(Name::from_raw(*b".\0\0\0\0"), self.entry_count(self.cwd)));
        entries.push(ListEntry::dir(Name::from_raw(*b"..\0\0\0"), self.entry_count(parent)));
        entries.extend(self.sb.children(self.cwd).map(|(index, inode)| {
            if inode.is_dir() {
                ListEntry::dir(inode.name(), self.entry_count(index as u8))
            } else {
                ListEntry {
                    name: inode.name(),
                    is_dir: false,
                    count: inode.size(),
                }
            }
        }));
        entries
    }

    /// 把文件的第 `block` 块读入 `buf`
    pub fn read_block(&self, name: Name, block: u8, buf: &mut DataBlock) -> Result<(), Error> {
        let block_id = self.file_block(name, block)?;
        self.block_device.read_block(block_id, buf)?;
        Ok(())
    }

    /// 把 `buf` 写入文件的第 `block` 块
    pub fn write_block(&self, name: Name, block: u8, buf: &DataBlock) -> Result<(), Error> {
        let block_id = self.file_block(name, block)?;
        self.block_device.write_block(block_id, buf)?;
        Ok(())
    }
}

impl TinyFileSystem {
    /// 同步写回超级块
    fn sync(&self) -> Result<(), Error> {
        self.sb.store(&self.block_device)?;
        Ok(())
    }

    /// 当前目录下名为 `name` 的文件（不含目录）
    fn find_file(&self, name: &Name) -> Result<usize, Error> {
        self.sb
            .find_child(self.cwd, name)
            .filter(|&index| !self.sb.inodes[index].is_dir())
            .ok_or(Error::FileNotFound(*name))
    }

    /// 文件内第 `block` 块在磁盘上的编号
    fn file_block(&self, name: Name, block: u8) -> Result<usize, Error> {
        let inode = &self.sb.inodes[self.find_file(&name)?];
        if block >= inode.size() {
            return Err(Error::OutOfRange { name, block });
        }
        Ok(inode.start_block() as usize + block as usize)
    }

    /// 目录的子项数 + 2
    fn entry_count(&self, dir: u8) -> u8 {
        self.sb.children(dir).count() as u8 + 2
    }

    /// 释放 inode；目录先递归释放所有子项，文件先清零并释放数据块。
    fn remove(&mut self, index: usize) -> Result<(), Error> {
        if self.sb.inodes[index].is_dir() {
            let children: Vec<usize> = self.sb.children(index as u8).map(|(child, _)| child).collect();
            for child in children {
                self.remove(child)?;
            }
        } else {
            let extent = self.sb.inodes[index].extent();
            self.zero_blocks(extent.clone())?;
            self.sb.free_list.dealloc_range(extent);
        }

        self.sb.inodes[index].clear();
        Ok(())
    }

    fn zero_blocks(&self, blocks: impl IntoIterator<Item = usize>) -> Result<(), Error> {
        let zero = [0; BLOCK_SIZE];
        for block_id in blocks {
            self.block_device.write_block(block_id, &zero)?;
        }
        Ok(())
    }

    /// 把 `from` 区间内的块依次复制到以 `to` 开头的区间。
    ///
    /// 区间可以重叠：向前挪时从头复制，向后挪时从尾复制。
    fn move_blocks(&self, from: Range<usize>, to: usize) -> Result<(), Error> {
        let mut buf = [0; BLOCK_SIZE];
        let mut copy = |offset: usize| -> Result<(), Error> {
            self.block_device.read_block(from.start + offset, &mut buf)?;
            self.block_device.write_block(to + offset, &buf)?;
            Ok(())
        };

        if to < from.start {
            (0..from.len()).try_for_each(&mut copy)?;
        } else {
            (0..from.len()).rev().try_for_each(&mut copy)?;
        }

        log::debug!("moved blocks {from:?} to {to}");
        Ok(())
    }
}

impl ListEntry {
    fn dir(name: Name, count: u8) -> Self {
        Self {
            name,
            is_dir: true,
            count,
        }
    }
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dir {
            write!(f, "{:<5} {:>3}", self.name, self.count)
        } else {
            write!(f, "{:<5} {:>3} KB", self.name, self.count)
        }
    }
}
