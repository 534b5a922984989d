//! 内存中的块设备，测试与工具链使用。

use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockDevice, DeviceError};
use spin::Mutex;

use crate::{DataBlock, BLOCK_COUNT, BLOCK_SIZE};

#[derive(Debug)]
pub struct RamDisk {
    blocks: Mutex<Vec<DataBlock>>,
}

impl RamDisk {
    /// 全零的 128 块磁盘
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(vec![[0; BLOCK_SIZE]; BLOCK_COUNT]),
        }
    }

    /// 以现成的镜像内容构造，只保留完整的块，
    /// 截断的镜像因此只有前面若干块，越界读写报 [`DeviceError::OutOfRange`]。
    pub fn from_image(image: &[u8]) -> Self {
        let blocks = image
            .chunks_exact(BLOCK_SIZE)
            .take(BLOCK_COUNT)
            .map(|bytes| {
                let mut block = [0; BLOCK_SIZE];
                block.copy_from_slice(bytes);
                block
            })
            .collect();
        Self {
            blocks: Mutex::new(blocks),
        }
    }

    /// 整个镜像的拷贝
    pub fn image(&self) -> Vec<u8> {
        self.blocks.lock().concat()
    }

    pub fn block(&self, block_id: usize) -> DataBlock {
        self.blocks.lock()[block_id]
    }
}

impl Default for RamDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let blocks = self.blocks.lock();
        let block = blocks.get(block_id).ok_or(DeviceError::OutOfRange { block_id })?;
        if buf.len() != BLOCK_SIZE {
            return Err(DeviceError::Incomplete {
                block_id,
                transferred: buf.len().min(BLOCK_SIZE),
                expected: BLOCK_SIZE,
            });
        }
        buf.copy_from_slice(block);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let mut blocks = self.blocks.lock();
        let block = blocks
            .get_mut(block_id)
            .ok_or(DeviceError::OutOfRange { block_id })?;
        if buf.len() != BLOCK_SIZE {
            return Err(DeviceError::Incomplete {
                block_id,
                transferred: buf.len().min(BLOCK_SIZE),
                expected: BLOCK_SIZE,
            });
        }
        block.copy_from_slice(buf);
        Ok(())
    }
}
