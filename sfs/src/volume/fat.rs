//! 文件分配表
//!
//! 每个数据块对应一个条目，条目或为空闲、或为链尾、或指向同一文件的下一块。
//! 主表与镜像表在每次修改时同步更新，镜像只是冗余副本，从不用来校验或修复主表。

use block_dev::{BLOCK_SIZE, Block, BlockDevice, DeviceError};

use crate::{BlockId, ChainError, DATA_BLOCKS, FAT_BLOCKS, FatEntry};

const ENTRY_BYTES: usize = size_of::<i32>();

/// 一个块能容纳多少条FAT条目
const BLOCK_ENTRIES: usize = BLOCK_SIZE / ENTRY_BYTES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatArea {
    primary: Vec<FatEntry>,
    mirror: Vec<FatEntry>,
}

impl Default for FatArea {
    fn default() -> Self {
        Self::new()
    }
}

impl FatArea {
    /// 全部空闲的两张表
    pub fn new() -> Self {
        Self {
            primary: vec![FatEntry::FREE; DATA_BLOCKS],
            mirror: vec![FatEntry::FREE; DATA_BLOCKS],
        }
    }

    pub fn load(
        dev: &impl BlockDevice,
        primary_at: usize,
        mirror_at: usize,
    ) -> Result<Self, DeviceError> {
        Ok(Self {
            primary: load_table(dev, primary_at)?,
            mirror: load_table(dev, mirror_at)?,
        })
    }

    pub fn store(
        &self,
        dev: &impl BlockDevice,
        primary_at: usize,
        mirror_at: usize,
    ) -> Result<(), DeviceError> {
        store_table(dev, primary_at, &self.primary)?;
        store_table(dev, mirror_at, &self.mirror)
    }

    pub fn entry(&self, id: BlockId) -> FatEntry {
        self.primary[id.index()]
    }

    pub fn mirror_entry(&self, id: BlockId) -> FatEntry {
        self.mirror[id.index()]
    }

    /// 获取下一个块编号。
    /// 若`id`指向未分配块，则报错。
    /// `Ok(None)`表示`id`为链表上最后一块。
    pub fn next(&self, id: BlockId) -> Result<Option<BlockId>, ChainError> {
        match self.entry(id).validate() {
            Ok(next) => Ok(Some(next)),
            Err(ChainError::Eof) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 从`first`出发沿链走`n`步
    pub fn nth(&self, first: BlockId, n: usize) -> Result<BlockId, ChainError> {
        let mut id = first;
        for _ in 0..n {
            id = self.next(id)?.ok_or(ChainError::Eof)?;
        }
        log::trace!("block #{n} of chain {first} is {id}");
        Ok(id)
    }

    /// 首次适配：从0号开始找第一个空闲块，标记为链尾后返回。
    pub fn alloc(&mut self) -> Option<BlockId> {
        let idx = self.primary.iter().position(|entry| entry.is_free())?;
        let id = BlockId::new(idx as u32);
        self.set(id, FatEntry::EOF);
        log::trace!("allocated block {id}");
        Some(id)
    }

    /// 把`next`接在链尾`tail`之后，`next`成为新的链尾。
    pub fn couple(&mut self, tail: BlockId, next: BlockId) {
        self.set(tail, next.into());
        self.set(next, FatEntry::EOF);
    }

    /// 只保留链表的前`keep`块，释放其余的块。
    ///
    /// 返回新的首块，`keep == 0`时为`None`。
    pub fn truncate(&mut self, first: BlockId, keep: usize) -> Option<BlockId> {
        let mut tail = None;
        let mut current = Some(first);
        let mut kept = 0;

        while kept < keep {
            let Some(id) = current else { break };
            tail = Some(id);
            current = match self.next(id) {
                Ok(next) => next,
                Err(e) => {
                    log::error!("chain {first} breaks after block {id}: {e:?}");
                    None
                }
            };
            kept += 1;
        }

        if let Some(rest) = current {
            self.dealloc(rest);
        }

        let tail = tail?;
        self.set(tail, FatEntry::EOF);
        Some(first)
    }

    /// 释放整条链表。
    ///
    /// 每一步只做范围检查，遇到越界或空闲的条目就停下。
    pub fn dealloc(&mut self, first: BlockId) {
        let mut id = first;
        loop {
            let entry = self.entry(id);
            self.set(id, FatEntry::FREE);
            match entry.validate() {
                Ok(next) => id = next,
                Err(ChainError::Eof) => break,
                Err(e) => {
                    log::error!("invalid chain step after block {id}: {e:?}");
                    break;
                }
            }
        }
    }

    /// 链表上的所有块，遇到链尾或坏条目即结束
    pub fn chain(&self, first: Option<BlockId>) -> Chain<'_> {
        Chain {
            fat: self,
            current: first,
            steps: 0,
        }
    }

    pub fn free_count(&self) -> usize {
        self.primary.iter().filter(|entry| entry.is_free()).count()
    }

    fn set(&mut self, id: BlockId, entry: FatEntry) {
        self.primary[id.index()] = entry;
        self.mirror[id.index()] = entry;
    }
}

pub struct Chain<'a> {
    fat: &'a FatArea,
    current: Option<BlockId>,
    steps: usize,
}

impl Iterator for Chain<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        // 有环的链表最多也只走满整张表
        if self.steps == DATA_BLOCKS {
            return None;
        }
        let id = self.current?;
        self.current = self.fat.next(id).ok().flatten();
        self.steps += 1;
        Some(id)
    }
}

fn load_table(dev: &impl BlockDevice, start: usize) -> Result<Vec<FatEntry>, DeviceError> {
    let mut table = Vec::with_capacity(FAT_BLOCKS * BLOCK_ENTRIES);
    let mut block: Block = [0; BLOCK_SIZE];

    for i in 0..FAT_BLOCKS {
        dev.read_block(start + i, &mut block)?;
        table.extend(
            block
                .chunks_exact(ENTRY_BYTES)
                .map(|b| FatEntry::from(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))),
        );
    }
    table.truncate(DATA_BLOCKS);

    Ok(table)
}

fn store_table(
    dev: &impl BlockDevice,
    start: usize,
    table: &[FatEntry],
) -> Result<(), DeviceError> {
    for (i, entries) in table.chunks(BLOCK_ENTRIES).enumerate() {
        let mut block: Block = [0; BLOCK_SIZE];
        for (raw, &entry) in block.chunks_exact_mut(ENTRY_BYTES).zip(entries) {
            raw.copy_from_slice(&i32::from(entry).to_le_bytes());
        }
        dev.write_block(start + i, &block)?;
    }

    Ok(())
}
