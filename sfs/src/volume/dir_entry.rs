//! 根目录：固定容量的扁平目录项表。

use std::borrow::Cow;

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};
use block_dev::{BLOCK_SIZE, Block, BlockDevice};

use crate::util::STAMP_LEN;
use crate::{BlockId, ChainError, FatEntry, MAX_FILES, NAME_MAX, ROOT_BLOCKS, Result, Timestamp};

/// 名字字段的容量，含结尾的NUL
const NAME_CAP: usize = NAME_MAX + 1;

/// 首块指针的“无”
const NO_BLOCK: i32 = -1;

/// 目录项，磁盘上占64字节，空闲的目录项全为0。
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 1表示有效
    is_file: i32,

    /// 打开次数，仅作参考
    num_open: i32,

    _f_pointer: i32,

    name: [u8; NAME_CAP],

    first_block: i32,

    size: u64,

    time_created: [u8; STAMP_LEN],

    #[brw(pad_after = 6)]
    date_created: [u8; STAMP_LEN],
}

impl FileEntry {
    pub const SIZE: usize = 64;

    /// 调用者需保证`name`合法
    pub fn new(name: &str, created: &Timestamp) -> Self {
        let mut entry = Self {
            is_file: 1,
            first_block: NO_BLOCK,
            time_created: created.time,
            date_created: created.date,
            ..Default::default()
        };
        entry
            .name
            .iter_mut()
            .take(NAME_MAX)
            .zip(name.as_bytes())
            .for_each(|(b1, b2)| *b1 = *b2);
        entry
    }

    pub const fn is_valid(&self) -> bool {
        self.is_file != 0
    }

    /// 名字的字节，不含NUL
    pub fn name_bytes(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_CAP);
        &self.name[..len]
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    pub const fn size(&self) -> usize {
        self.size as usize
    }

    pub fn resize(&mut self, size: usize) {
        self.size = size as u64;
    }

    pub fn first_block(&self) -> Result<Option<BlockId>, ChainError> {
        match self.first_block {
            NO_BLOCK => Ok(None),
            raw => FatEntry::from(raw).validate().map(Some),
        }
    }

    pub fn set_first_block(&mut self, id: Option<BlockId>) {
        self.first_block = id.map_or(NO_BLOCK, |id| FatEntry::from(id).into());
    }

    pub fn open_count(&self) -> usize {
        self.num_open.max(0) as usize
    }

    pub fn record_open(&mut self) {
        self.num_open = self.num_open.saturating_add(1);
    }

    pub fn record_close(&mut self) {
        self.num_open = self.num_open.saturating_sub(1).max(0);
    }

    pub fn date_created(&self) -> Cow<'_, str> {
        stamp_str(&self.date_created)
    }

    pub fn time_created(&self) -> Cow<'_, str> {
        stamp_str(&self.time_created)
    }
}

fn stamp_str(stamp: &[u8; STAMP_LEN]) -> Cow<'_, str> {
    let len = stamp.iter().position(|&b| b == 0).unwrap_or(STAMP_LEN);
    String::from_utf8_lossy(&stamp[..len])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDir {
    entries: Vec<FileEntry>,
}

impl Default for RootDir {
    fn default() -> Self {
        Self::new()
    }
}

impl RootDir {
    pub fn new() -> Self {
        Self {
            entries: vec![FileEntry::default(); MAX_FILES],
        }
    }

    pub fn load(dev: &impl BlockDevice, start: usize) -> Result<Self> {
        let mut raw = vec![0u8; ROOT_BLOCKS * BLOCK_SIZE];
        let mut block: Block = [0; BLOCK_SIZE];
        for (i, chunk) in raw.chunks_exact_mut(BLOCK_SIZE).enumerate() {
            dev.read_block(start + i, &mut block)?;
            chunk.copy_from_slice(&block);
        }

        let mut cursor = Cursor::new(&raw[..]);
        let entries = (0..MAX_FILES)
            .map(|_| FileEntry::read(&mut cursor))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    pub fn store(&self, dev: &impl BlockDevice, start: usize) -> Result<()> {
        let mut raw = vec![0u8; ROOT_BLOCKS * BLOCK_SIZE];
        let mut cursor = Cursor::new(&mut raw[..]);
        for entry in &self.entries {
            entry.write(&mut cursor)?;
        }

        let mut block: Block = [0; BLOCK_SIZE];
        for (i, chunk) in raw.chunks_exact(BLOCK_SIZE).enumerate() {
            block.copy_from_slice(chunk);
            dev.write_block(start + i, &block)?;
        }

        Ok(())
    }

    /// 线性搜索有效目录项
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.is_valid() && entry.name_bytes() == name.as_bytes())
    }

    /// 第一个空槽
    pub fn free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|entry| !entry.is_valid())
    }

    pub fn get(&self, idx: usize) -> &FileEntry {
        &self.entries[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut FileEntry {
        &mut self.entries[idx]
    }

    pub fn insert(&mut self, idx: usize, entry: FileEntry) {
        self.entries[idx] = entry;
    }

    /// 清零
    pub fn clear(&mut self, idx: usize) {
        self.entries[idx] = FileEntry::default();
    }

    /// 有效目录项及其槽位
    pub fn iter(&self) -> impl Iterator<Item = (usize, &FileEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_valid())
    }
}
