//! # 磁盘块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 每次读写都是一次完整的同步操作，驱动不得在调用之间缓存数据。

#![no_std]

use core::any::Any;

/// 块设备驱动特质
///
/// `buf` 的长度即块大小，驱动必须完整传输整个块，否则报错。
pub trait BlockDevice: Send + Sync + Any {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// 设备（磁盘镜像）无法打开或定位
    #[error("block device is unavailable (block {block_id})")]
    Unavailable { block_id: usize },
    /// 读写的字节数不足一块
    #[error("incomplete transfer on block {block_id}: {transferred} of {expected} bytes")]
    Incomplete {
        block_id: usize,
        transferred: usize,
        expected: usize,
    },
    /// 块编号超出设备容量
    #[error("block {block_id} is out of device range")]
    OutOfRange { block_id: usize },
}
