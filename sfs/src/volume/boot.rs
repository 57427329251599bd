use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};
use block_dev::{BLOCK_SIZE, Block, BlockDevice};

use crate::{
    BOOT_BLOCK, DATA_BLOCKS, DATA_OFFSET, DISK_BLOCKS, Error, FAT_BLOCKS, FAT1_BLOCK, FAT2_BLOCK,
    ROOT_BLOCK, ROOT_BLOCKS, Result,
};

/// # 引导块
///
/// 位于#0块，记录各区域的位置与大小，余下部分填0。
/// 字段顺序与宽度即磁盘格式。
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootSector {
    /// 数据区起始块号
    data_offset: i32,

    boot_location: i32,

    /// 引导区的块数
    boot_size: i32,

    fat1_location: i32,

    /// 主FAT的块数
    fat1_size: i32,

    fat2_location: i32,

    /// 镜像FAT的块数
    fat2_size: i32,

    /// 根目录起始块号
    root_location: i32,

    /// 根目录中的文件数
    num_files: i32,
}

impl Default for BootSector {
    fn default() -> Self {
        Self::new()
    }
}

impl BootSector {
    pub const SIZE: usize = 9 * size_of::<i32>();

    pub const fn new() -> Self {
        Self {
            data_offset: DATA_OFFSET as i32,
            boot_location: BOOT_BLOCK as i32,
            boot_size: 1,
            fat1_location: FAT1_BLOCK as i32,
            fat1_size: FAT_BLOCKS as i32,
            fat2_location: FAT2_BLOCK as i32,
            fat2_size: FAT_BLOCKS as i32,
            root_location: ROOT_BLOCK as i32,
            num_files: 0,
        }
    }

    /// 读取并校验引导块
    pub fn load(dev: &impl BlockDevice) -> Result<Self> {
        let mut block: Block = [0; BLOCK_SIZE];
        dev.read_block(BOOT_BLOCK, &mut block)?;
        let boot = Self::read(&mut Cursor::new(&block[..]))?;
        boot.validate()?;
        Ok(boot)
    }

    pub fn store(&self, dev: &impl BlockDevice) -> Result<()> {
        let mut block: Block = [0; BLOCK_SIZE];
        self.write(&mut Cursor::new(&mut block[..]))?;
        dev.write_block(BOOT_BLOCK, &block)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let layout = [
            self.boot_size,
            self.fat1_location,
            self.fat1_size,
            self.fat2_location,
            self.fat2_size,
            self.root_location,
            self.data_offset,
        ];
        if layout.iter().any(|&field| field <= 0) {
            log::error!("non-positive layout field: {self:?}");
            return Err(Error::InvalidSuperblock);
        }
        if self.boot_location < 0 || self.num_files < 0 {
            log::error!("negative boot location or file count: {self:?}");
            return Err(Error::InvalidSuperblock);
        }
        // 两张表都必须容纳全部条目
        if self.fat1_size < FAT_BLOCKS as i32 || self.fat2_size < FAT_BLOCKS as i32 {
            log::error!("allocation table too small: {self:?}");
            return Err(Error::InvalidSuperblock);
        }

        // 各区域互不重叠，且都落在设备之内
        let mut regions = self.regions();
        regions.sort_unstable();
        let in_order = regions.windows(2).all(|pair| pair[0].1 <= pair[1].0);
        if !in_order || regions.iter().any(|&(_, end)| end > DISK_BLOCKS) {
            log::error!("overlapping or out-of-device regions: {self:?}");
            return Err(Error::InvalidSuperblock);
        }
        Ok(())
    }

    /// 各区域的`[start, end)`块号，调用前字段须已非负
    fn regions(&self) -> [(usize, usize); 5] {
        let region = |start: i32, len: usize| (start as usize, start as usize + len);
        [
            region(self.boot_location, self.boot_size as usize),
            region(self.fat1_location, self.fat1_size as usize),
            region(self.fat2_location, self.fat2_size as usize),
            region(self.root_location, ROOT_BLOCKS),
            region(self.data_offset, DATA_BLOCKS),
        ]
    }

    pub const fn data_offset(&self) -> usize {
        self.data_offset as usize
    }

    pub const fn fat1_location(&self) -> usize {
        self.fat1_location as usize
    }

    pub const fn fat2_location(&self) -> usize {
        self.fat2_location as usize
    }

    pub const fn root_location(&self) -> usize {
        self.root_location as usize
    }

    pub const fn num_files(&self) -> usize {
        self.num_files as usize
    }

    pub fn record_create(&mut self) {
        self.num_files = self.num_files.saturating_add(1);
    }

    pub fn record_delete(&mut self) {
        self.num_files = self.num_files.saturating_sub(1).max(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_bytes() {
        let mut buf = Cursor::new(Vec::new());
        BootSector::new().write(&mut buf).unwrap();
        let raw: Vec<i32> = buf
            .into_inner()
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(vec![4096, 0, 1, 100, 4, 200, 4, 300, 0], raw);
    }

    #[test]
    fn reject_non_positive() {
        let mut boot = BootSector::new();
        assert_eq!(Ok(()), boot.validate());
        boot.root_location = 0;
        assert_eq!(Err(Error::InvalidSuperblock), boot.validate());

        let zeroed = BootSector::read(&mut Cursor::new(&[0u8; BootSector::SIZE][..])).unwrap();
        assert_eq!(Err(Error::InvalidSuperblock), zeroed.validate());
    }

    #[test]
    fn reject_overlap() {
        let mut boot = BootSector::new();
        boot.fat2_location = 102;
        assert_eq!(Err(Error::InvalidSuperblock), boot.validate());

        let mut boot = BootSector::new();
        boot.root_location = 4096;
        assert_eq!(Err(Error::InvalidSuperblock), boot.validate());

        // 数据区越过设备末尾
        let mut boot = BootSector::new();
        boot.data_offset = 4097;
        assert_eq!(Err(Error::InvalidSuperblock), boot.validate());

        let mut boot = BootSector::new();
        boot.fat1_size = i32::MAX;
        assert_eq!(Err(Error::InvalidSuperblock), boot.validate());

        let mut boot = BootSector::new();
        boot.num_files = -1;
        assert_eq!(Err(Error::InvalidSuperblock), boot.validate());

        // 区域的先后顺序不限
        let mut boot = BootSector::new();
        boot.fat1_location = 200;
        boot.fat2_location = 100;
        assert_eq!(Ok(()), boot.validate());
    }

    #[test]
    fn file_count_saturates() {
        let mut boot = BootSector::new();
        boot.num_files = i32::MAX;
        boot.record_create();
        assert_eq!(i32::MAX as usize, boot.num_files());
    }

    #[test]
    fn file_count_floor() {
        let mut boot = BootSector::new();
        boot.record_delete();
        assert_eq!(0, boot.num_files());
        boot.record_create();
        boot.record_create();
        boot.record_delete();
        assert_eq!(1, boot.num_files());
    }
}
