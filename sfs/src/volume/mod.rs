//! 卷的布局
//!
//! 引导块(#0) | 主FAT(#100) | 镜像FAT(#200) | 根目录(#300) | 数据区(#4096)
//!
//! 数据区内的块用相对编号[`BlockId`](crate::BlockId)索引，
//! 绝对块号为`data_offset + id`。

mod boot;
mod dir_entry;
pub mod fat;

pub use self::{
    boot::BootSector,
    dir_entry::{FileEntry, RootDir},
    fat::{Chain, FatArea},
};
