//! # 会话层
//!
//! 进程内唯一的可变状态都收拢在 [`Session`] 里，由调用者持有：
//! 当前挂载的文件系统（连同当前目录）以及一块大小的暂存缓冲区。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;

use crate::layout::Name;
use crate::{DataBlock, Error, ListEntry, TinyFileSystem, BLOCK_SIZE};

pub struct Session {
    fs: Option<TinyFileSystem>,
    /// 暂存缓冲区，跨挂载保留
    buffer: DataBlock,
}

impl Session {
    pub fn new() -> Self {
        Self {
            fs: None,
            buffer: [0; BLOCK_SIZE],
        }
    }

    /// 挂载块设备上的文件系统。
    ///
    /// 只有通过一致性检查才会替换当前挂载；失败时原有挂载保持不变。
    pub fn mount(&mut self, block_device: Arc<dyn BlockDevice>) -> Result<(), Error> {
        self.fs = Some(TinyFileSystem::open(block_device)?);
        Ok(())
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.fs.is_some()
    }

    pub fn fs(&self) -> Result<&TinyFileSystem, Error> {
        self.fs.as_ref().ok_or(Error::NotMounted)
    }

    fn fs_mut(&mut self) -> Result<&mut TinyFileSystem, Error> {
        self.fs.as_mut().ok_or(Error::NotMounted)
    }

    #[inline]
    pub fn buffer(&self) -> &DataBlock {
        &self.buffer
    }

    /// 清空缓冲区后放入新内容，最多一块
    pub fn set_buffer(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload.len() > BLOCK_SIZE {
            return Err(Error::BufferOverflow {
                len: payload.len(),
                max: BLOCK_SIZE,
            });
        }
        self.buffer.fill(0);
        self.buffer[..payload.len()].copy_from_slice(payload);
        Ok(())
    }

    pub fn create(&mut self, name: Name, size: u8) -> Result<(), Error> {
        self.fs_mut()?.create(name, size).map(|_| ())
    }

    pub fn delete(&mut self, name: Name) -> Result<(), Error> {
        self.fs_mut()?.delete(name)
    }

    /// 读文件的一块到缓冲区
    pub fn read(&mut self, name: Name, block: u8) -> Result<(), Error> {
        let fs = self.fs.as_ref().ok_or(Error::NotMounted)?;
        fs.read_block(name, block, &mut self.buffer)
    }

    /// 把缓冲区写入文件的一块
    pub fn write(&self, name: Name, block: u8) -> Result<(), Error> {
        self.fs()?.write_block(name, block, &self.buffer)
    }

    pub fn ls(&self) -> Result<Vec<ListEntry>, Error> {
        Ok(self.fs()?.ls())
    }

    pub fn resize(&mut self, name: Name, size: u8) -> Result<(), Error> {
        self.fs_mut()?.resize(name, size)
    }

    pub fn defrag(&mut self) -> Result<(), Error> {
        self.fs_mut()?.defrag()
    }

    pub fn cd(&mut self, name: Name) -> Result<(), Error> {
        self.fs_mut()?.cd(name)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
