use block_dev::{BlockDevice, DiskDriver};

use crate::fd::FdTable;
use crate::volume::{BootSector, FatArea, RootDir};
use crate::{Error, Fd, Result};

/// 文件系统会话。
///
/// 持有块设备驱动，同一时刻至多挂载一个卷；
/// 所有状态都属于会话本身，多个会话互不干扰。
pub struct FileSystem<D: DiskDriver> {
    driver: D,
    volume: Option<Volume<D::Device>>,
}

/// 已挂载的卷：设备与全部内存中的元数据
#[derive(Debug)]
pub(crate) struct Volume<B> {
    pub(crate) name: String,
    pub(crate) dev: B,
    pub(crate) boot: BootSector,
    pub(crate) fat: FatArea,
    pub(crate) root: RootDir,
    pub(crate) fds: FdTable,
}

/// `ls`所需的目录项信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub name: String,
    pub size: usize,
    pub first_block: Option<u32>,
    /// 占用的数据块数
    pub blocks: usize,
    /// 目录项里记录的打开次数
    pub open_count: usize,
    /// `mm/dd/yy`
    pub date_created: String,
    /// `hh:mm:ss`
    pub time_created: String,
}

impl<D: DiskDriver> FileSystem<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            volume: None,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn is_mounted(&self) -> bool {
        self.volume.is_some()
    }

    pub fn mounted_name(&self) -> Option<&str> {
        self.volume.as_ref().map(|volume| volume.name.as_str())
    }

    /// 创建设备并写入空的文件系统，随后关闭设备。
    ///
    /// 不触碰当前挂载的卷。
    pub fn make_fs(&mut self, name: &str) -> Result<()> {
        self.driver.create_disk(name)?;
        let dev = self.driver.open_disk(name)?;

        let boot = BootSector::new();
        let written = boot
            .store(&dev)
            .and_then(|()| {
                FatArea::new()
                    .store(&dev, boot.fat1_location(), boot.fat2_location())
                    .map_err(Error::from)
            })
            .and_then(|()| RootDir::new().store(&dev, boot.root_location()));
        let closed = dev.close();

        written?;
        closed?;
        log::info!("made file system on {name:?}");
        Ok(())
    }

    pub fn mount(&mut self, name: &str) -> Result<()> {
        if self.volume.is_some() {
            return Err(Error::AlreadyMounted);
        }

        let dev = self.driver.open_disk(name)?;
        let (boot, fat, root) = match load_metadata(&dev) {
            Ok(metadata) => metadata,
            Err(e) => {
                if let Err(close) = dev.close() {
                    log::warn!("closing {name:?} after failed mount: {close}");
                }
                return Err(e);
            }
        };

        log::info!("mounted {name:?} with {} files", boot.num_files());
        self.volume = Some(Volume {
            name: name.into(),
            dev,
            boot,
            fat,
            root,
            fds: FdTable::new(),
        });
        Ok(())
    }

    /// 强制关闭所有描述符，写回元数据并关闭设备。
    ///
    /// 写回失败时设备照样关闭，卷也照样卸下。
    pub fn unmount(&mut self, name: &str) -> Result<()> {
        let Some(mut volume) = self.volume.take() else {
            return Err(Error::NotMounted);
        };
        if volume.name != name {
            self.volume = Some(volume);
            return Err(Error::NameMismatch);
        }

        let opened: Vec<Fd> = volume.fds.opened().collect();
        for fd in opened {
            log::warn!("closing descriptor {fd} on unmount");
            if let Err(e) = volume.close(fd) {
                log::warn!("closing descriptor {fd}: {e}");
            }
        }

        let flushed = flush_metadata(&volume);
        let closed = volume.dev.close();

        flushed?;
        closed?;
        log::info!("unmounted {name:?}");
        Ok(())
    }

    pub(crate) fn volume(&self) -> Result<&Volume<D::Device>> {
        self.volume.as_ref().ok_or(Error::NotMounted)
    }

    pub(crate) fn volume_mut(&mut self) -> Result<&mut Volume<D::Device>> {
        self.volume.as_mut().ok_or(Error::NotMounted)
    }

    /// 所有有效目录项，按槽位顺序
    pub fn list(&self) -> Result<Vec<FileStat>> {
        let volume = self.volume()?;
        Ok(volume
            .root
            .iter()
            .map(|(_, entry)| {
                let first = entry.first_block().ok().flatten();
                FileStat {
                    name: entry.name().into_owned(),
                    size: entry.size(),
                    first_block: first.map(u32::from),
                    blocks: volume.fat.chain(first).count(),
                    open_count: entry.open_count(),
                    date_created: entry.date_created().into_owned(),
                    time_created: entry.time_created().into_owned(),
                }
            })
            .collect())
    }

    /// 打开的文件所占的数据块，按链表顺序
    pub fn chain(&self, fd: Fd) -> Result<Vec<u32>> {
        let volume = self.volume()?;
        let desc = volume.fds.get(fd).ok_or(Error::InvalidDescriptor)?;
        let first = volume.root.get(desc.entry()).first_block()?;
        Ok(volume.fat.chain(first).map(u32::from).collect())
    }

    pub fn free_blocks(&self) -> Result<usize> {
        Ok(self.volume()?.fat.free_count())
    }

    pub fn file_count(&self) -> Result<usize> {
        Ok(self.volume()?.boot.num_files())
    }
}

fn load_metadata(dev: &impl BlockDevice) -> Result<(BootSector, FatArea, RootDir)> {
    let boot = BootSector::load(dev)?;
    let fat = FatArea::load(dev, boot.fat1_location(), boot.fat2_location())?;
    let root = RootDir::load(dev, boot.root_location())?;
    Ok((boot, fat, root))
}

fn flush_metadata<B: BlockDevice>(volume: &Volume<B>) -> Result<()> {
    let boot = &volume.boot;
    boot.store(&volume.dev)?;
    volume
        .fat
        .store(&volume.dev, boot.fat1_location(), boot.fat2_location())?;
    volume.root.store(&volume.dev, boot.root_location())
}
