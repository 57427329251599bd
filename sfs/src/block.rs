use derive_more::{Display, From, Into};

use crate::DATA_BLOCKS;

/// 数据区内的相对块号，取值`0..DATA_BLOCKS`。
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// FAT条目，磁盘上是一个小端`i32`。
///
/// - `-2`: 空闲
/// - `-1`: 链表上最后一块
/// - `>= 0`: 链表上下一块的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct FatEntry(i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    Free,
    Eof,
    OutOfRange(i32),
}

impl From<i32> for FatEntry {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<FatEntry> for i32 {
    fn from(entry: FatEntry) -> Self {
        entry.0
    }
}

impl From<BlockId> for FatEntry {
    fn from(id: BlockId) -> Self {
        Self(id.0 as i32)
    }
}

impl FatEntry {
    pub const FREE: Self = Self(-2);

    pub const EOF: Self = Self(-1);

    pub const fn is_free(self) -> bool {
        self.0 == Self::FREE.0
    }

    /// 把条目解释为下一块的编号
    pub fn validate(self) -> Result<BlockId, ChainError> {
        match self {
            FatEntry::FREE => Err(ChainError::Free),
            FatEntry::EOF => Err(ChainError::Eof),
            FatEntry(raw) if raw < 0 || raw as usize >= DATA_BLOCKS => {
                Err(ChainError::OutOfRange(raw))
            }
            FatEntry(raw) => Ok(BlockId(raw as u32)),
        }
    }
}
