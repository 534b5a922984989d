#![cfg_attr(not(test), no_std)]

extern crate alloc;

/* tiny-fs 的整体架构，自上而下 */

// 会话层：挂载状态、当前目录与暂存缓冲区
mod session;

// 文件系统层：目录树与文件生命周期
mod tfs;

// 一致性检查：挂载时校验超级块
pub mod check;

// 磁盘数据结构层：超级块、位图与 inode 的字节布局
pub mod layout;

// 内存块设备
mod ram_disk;

mod error;

pub use block_dev::{BlockDevice, DeviceError};

pub use self::{
    check::Rule,
    error::Error,
    layout::{FreeBlockList, Inode, Name, SuperBlock},
    ram_disk::RamDisk,
    session::Session,
    tfs::{format, ListEntry, TinyFileSystem},
};

pub const BLOCK_SIZE: usize = 1024;
/// 磁盘总块数，0号块为超级块
pub const BLOCK_COUNT: usize = 128;
/// inode 表容量
pub const INODE_COUNT: usize = 126;
/// 根目录没有 inode，以此哨兵值作为其子项的父目录编号
pub const ROOT: u8 = 127;
/// 文件名的最大字节数
pub const NAME_LEN: usize = 5;
/// 单个文件最多占用的块数
pub const MAX_FILE_BLOCKS: u8 = 127;

pub type DataBlock = [u8; BLOCK_SIZE];
