//! # 磁盘数据结构层
//!
//! tiny-fs 的磁盘布局：
//! 超级块（空闲块位图 | inode 表） | 数据块 1..=127
//!
//! 所有结构都按字节显式编解码，不依赖内存布局。

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::FreeBlockList;

mod inode;
pub use inode::{Inode, Name};
