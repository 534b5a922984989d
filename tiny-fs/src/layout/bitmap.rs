use core::ops::Range;

use crate::BLOCK_COUNT;

/// 空闲块位图：每一位对应一个块，置位表示已分配。
///
/// 字节内**高位在前**：第 `b` 块对应第 `b / 8` 字节的第 `7 - b % 8` 位。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlockList([u8; Self::SIZE]);

impl FreeBlockList {
    /// 位图大小恒为16字节
    pub const SIZE: usize = BLOCK_COUNT / 8;

    /// 数据块的默认搜索区间，跳过超级块
    pub const DATA_BLOCKS: Range<usize> = 1..BLOCK_COUNT;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut raw = [0; Self::SIZE];
        raw.copy_from_slice(&bytes[..Self::SIZE]);
        Self(raw)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.0
    }

    #[inline]
    pub fn is_free(&self, block_id: usize) -> bool {
        let (byte, mask) = Self::locate(block_id);
        self.0[byte] & mask == 0
    }

    /// 标记为已分配，重复分配无副作用
    #[inline]
    pub fn alloc(&mut self, block_id: usize) {
        let (byte, mask) = Self::locate(block_id);
        self.0[byte] |= mask;
    }

    /// 标记为空闲，重复释放无副作用
    #[inline]
    pub fn dealloc(&mut self, block_id: usize) {
        let (byte, mask) = Self::locate(block_id);
        self.0[byte] &= !mask;
    }

    pub fn alloc_range(&mut self, blocks: Range<usize>) {
        blocks.for_each(|block_id| self.alloc(block_id));
    }

    pub fn dealloc_range(&mut self, blocks: Range<usize>) {
        blocks.for_each(|block_id| self.dealloc(block_id));
    }

    /// 区间内的块全部空闲，且不越过磁盘末尾
    pub fn is_range_free(&self, blocks: Range<usize>) -> bool {
        blocks.end <= BLOCK_COUNT && blocks.into_iter().all(|block_id| self.is_free(block_id))
    }

    /// 在 `search` 区间内自低向高寻找第一段长度恰为 `len` 的连续空闲块（首次适配）。
    ///
    /// 遇到已分配块时重新计数；区间耗尽仍未凑够则返回空。
    pub fn find_run(&self, len: usize, search: Range<usize>) -> Option<Range<usize>> {
        if len == 0 {
            return None;
        }

        let mut run_start = search.start;
        let mut run_len = 0;
        for block_id in search.start..search.end.min(BLOCK_COUNT) {
            if !self.is_free(block_id) {
                run_len = 0;
                run_start = block_id + 1;
                continue;
            }
            run_len += 1;
            if run_len == len {
                return Some(run_start..run_start + len);
            }
        }

        None
    }

    /// 返回所在字节下标与位掩码
    #[inline]
    fn locate(block_id: usize) -> (usize, u8) {
        debug_assert!(block_id < BLOCK_COUNT);
        (block_id / 8, 1 << (7 - block_id % 8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first_within_byte() {
        let mut bitmap = FreeBlockList::default();
        bitmap.alloc(0);
        bitmap.alloc(9);
        assert_eq!(bitmap.as_bytes()[0], 0b1000_0000);
        assert_eq!(bitmap.as_bytes()[1], 0b0100_0000);
    }

    #[test]
    fn alloc_and_dealloc_are_idempotent() {
        let mut bitmap = FreeBlockList::default();
        for block_id in FreeBlockList::DATA_BLOCKS {
            bitmap.alloc(block_id);
            bitmap.alloc(block_id);
            assert!(!bitmap.is_free(block_id));
            bitmap.dealloc(block_id);
            bitmap.dealloc(block_id);
            assert!(bitmap.is_free(block_id));
        }
        assert_eq!(bitmap, FreeBlockList::default());
    }

    #[test]
    fn first_fit_skips_short_holes() {
        let mut bitmap = FreeBlockList::default();
        bitmap.alloc(0);
        bitmap.alloc(3);
        bitmap.alloc(6);

        assert_eq!(bitmap.find_run(2, FreeBlockList::DATA_BLOCKS), Some(1..3));
        assert_eq!(bitmap.find_run(3, FreeBlockList::DATA_BLOCKS), Some(7..10));
        assert_eq!(bitmap.find_run(121, FreeBlockList::DATA_BLOCKS), Some(7..128));
        assert_eq!(bitmap.find_run(122, FreeBlockList::DATA_BLOCKS), None);
        assert_eq!(bitmap.find_run(2, 4..6), Some(4..6));
        assert_eq!(bitmap.find_run(3, 4..6), None);
    }

    #[test]
    fn found_runs_never_contain_allocated_blocks() {
        let mut bitmap = FreeBlockList::default();
        for block_id in (0..BLOCK_COUNT).filter(|b| b % 5 == 0 || b % 7 == 0) {
            bitmap.alloc(block_id);
        }

        for len in 1..BLOCK_COUNT {
            let found = bitmap.find_run(len, FreeBlockList::DATA_BLOCKS);
            let exists = (1..=BLOCK_COUNT - len).any(|start| bitmap.is_range_free(start..start + len));
            assert_eq!(found.is_some(), exists, "len = {len}");
            if let Some(run) = found {
                assert_eq!(run.len(), len);
                assert!(bitmap.is_range_free(run));
            }
        }
    }
}
