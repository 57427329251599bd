//! 一个住在固定大小虚拟块设备里的极简FAT文件系统。
//!
//! 扁平的根目录、双份FAT、固定容量的描述符表，
//! 挂载时把元数据整体读入内存，卸载时整体写回。

mod block;
mod control;
mod error;
mod fd;
mod file;
mod util;
pub mod volume;

pub use block_dev::{BLOCK_SIZE, Block, BlockDevice, DeviceError, DiskDriver};

pub use self::{
    block::{BlockId, ChainError, FatEntry},
    control::{FileStat, FileSystem},
    error::{Error, Result},
    fd::Fd,
    util::Timestamp,
};

/// 数据区的块数，也是FAT的条目数
pub const DATA_BLOCKS: usize = 4096;
/// 根目录的容量
pub const MAX_FILES: usize = 64;
/// 描述符表的容量
pub const MAX_FDS: usize = 32;
/// 文件名的最大字节数（不含结尾的NUL）
pub const NAME_MAX: usize = 15;
/// 单个文件的最大字节数
pub const MAX_FILE_SIZE: usize = DATA_BLOCKS * BLOCK_SIZE;

/* 卷布局：块号 */

pub const BOOT_BLOCK: usize = 0;
pub const FAT1_BLOCK: usize = 100;
pub const FAT2_BLOCK: usize = 200;
pub const ROOT_BLOCK: usize = 300;
pub const DATA_OFFSET: usize = 4096;

/// 一张FAT占用的块数
pub const FAT_BLOCKS: usize = (DATA_BLOCKS * size_of::<i32>()).div_ceil(BLOCK_SIZE);
/// 根目录占用的块数
pub const ROOT_BLOCKS: usize = (MAX_FILES * volume::FileEntry::SIZE).div_ceil(BLOCK_SIZE);
/// 整个设备的块数
pub const DISK_BLOCKS: usize = DATA_OFFSET + DATA_BLOCKS;

const _: () = {
    assert!(BOOT_BLOCK < FAT1_BLOCK);
    assert!(FAT1_BLOCK + FAT_BLOCKS <= FAT2_BLOCK);
    assert!(FAT2_BLOCK + FAT_BLOCKS <= ROOT_BLOCK);
    assert!(ROOT_BLOCK + ROOT_BLOCKS <= DATA_OFFSET);
    assert!(DATA_BLOCKS <= i32::MAX as usize);
};
