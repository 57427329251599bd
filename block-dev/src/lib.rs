//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，
//! [`BlockDevice`] 是对读写块设备的抽象，[`DiskDriver`] 则负责按名字创建、打开块设备。
//!
//! 块号是整个设备上的绝对编号，文件系统自行区分元数据区与数据区。

#![no_std]

use core::any::Any;

use derive_more::Display;

/// 块的字节数
pub const BLOCK_SIZE: usize = 4096;

pub type Block = [u8; BLOCK_SIZE];

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    #[display(fmt = "device could not be created")]
    Create,
    #[display(fmt = "device could not be opened")]
    Open,
    #[display(fmt = "device could not be closed")]
    Close,
    #[display(fmt = "block read failed")]
    Read,
    #[display(fmt = "block write failed")]
    Write,
    #[display(fmt = "block number out of range")]
    OutOfRange,
}

impl core::error::Error for DeviceError {}

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    fn read_block(&self, block_id: usize, buf: &mut Block) -> Result<(), DeviceError>;

    fn write_block(&self, block_id: usize, buf: &Block) -> Result<(), DeviceError>;

    /// 写回并释放设备。
    fn close(self) -> Result<(), DeviceError>
    where
        Self: Sized;
}

/// 按名字管理块设备
pub trait DiskDriver {
    type Device: BlockDevice;

    /// 创建（或重建）名为`name`的设备，创建后处于关闭状态。
    fn create_disk(&mut self, name: &str) -> Result<(), DeviceError>;

    fn open_disk(&mut self, name: &str) -> Result<Self::Device, DeviceError>;
}
