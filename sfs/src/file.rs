//! 目录与描述符操作，以及按字节读写文件。
//!
//! 文件内偏移`offset`落在链表第`offset / BLOCK_SIZE`块，
//! 每次读写都从首块起沿链走过去。

use block_dev::{BLOCK_SIZE, Block, BlockDevice, DiskDriver};

use crate::control::Volume;
use crate::volume::FileEntry;
use crate::{BlockId, Error, Fd, FileSystem, MAX_FILE_SIZE, NAME_MAX, Result, Timestamp};

impl<D: DiskDriver> FileSystem<D> {
    /// 在根目录下创建空文件，需要再`open`才能读写。
    pub fn create(&mut self, name: &str) -> Result<()> {
        self.volume_mut()?.create(name)
    }

    /// 删除未被打开的文件并释放其数据块
    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.volume_mut()?.delete(name)
    }

    pub fn open(&mut self, name: &str) -> Result<Fd> {
        self.volume_mut()?.open(name)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.volume_mut()
            .map_err(|_| Error::InvalidDescriptor)?
            .close(fd)
    }

    /// 从描述符的偏移处读到`buf`里，返回实际读取的字节数。
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        self.volume_mut()?.read(fd, buf)
    }

    /// 从描述符的偏移处写入`data`，返回实际写入的字节数。
    ///
    /// 磁盘写满或文件达到上限时只写入一部分，不算错误。
    pub fn write(&mut self, fd: Fd, data: &[u8]) -> Result<usize> {
        self.volume_mut()?.write(fd, data)
    }

    pub fn get_size(&self, fd: Fd) -> Result<usize> {
        self.volume()?.get_size(fd)
    }

    /// 只能在`[0, size]`内移动
    pub fn seek(&mut self, fd: Fd, offset: i64) -> Result<()> {
        self.volume_mut()?.seek(fd, offset)
    }

    /// 只能缩短文件。
    ///
    /// 打开同一文件的所有描述符，偏移都会被压到`length`以内，不只是`fd`本身。
    pub fn truncate(&mut self, fd: Fd, length: i64) -> Result<()> {
        self.volume_mut()?.truncate(fd, length)
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        Err(Error::EmptyName)
    } else if name.len() > NAME_MAX {
        Err(Error::NameTooLong)
    } else if !name.bytes().all(|b| b.is_ascii() && b != 0) {
        Err(Error::InvalidName)
    } else {
        Ok(())
    }
}

impl<B: BlockDevice> Volume<B> {
    pub(crate) fn create(&mut self, name: &str) -> Result<()> {
        check_name(name)?;
        if self.root.find(name).is_some() {
            return Err(Error::AlreadyExists);
        }
        let slot = self.root.free_slot().ok_or(Error::DirectoryFull)?;

        self.root.insert(slot, FileEntry::new(name, &Timestamp::now()));
        self.boot.record_create();
        log::debug!("created {name:?} at slot {slot}");
        Ok(())
    }

    pub(crate) fn delete(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let slot = self.root.find(name).ok_or(Error::NotFound)?;
        if self.fds.references(slot) {
            return Err(Error::FileInUse);
        }

        match self.root.get(slot).first_block() {
            Ok(Some(first)) => self.fat.dealloc(first),
            Ok(None) => {}
            Err(e) => log::error!("{name:?} has a bad first block: {e:?}"),
        }
        self.root.clear(slot);
        self.boot.record_delete();
        log::debug!("deleted {name:?} from slot {slot}");
        Ok(())
    }

    pub(crate) fn open(&mut self, name: &str) -> Result<Fd> {
        let slot = self.root.find(name).ok_or(Error::NotFound)?;
        let fd = self.fds.alloc(slot).ok_or(Error::NoFreeDescriptor)?;
        self.root.get_mut(slot).record_open();
        log::debug!("opened {name:?} as descriptor {fd}");
        Ok(fd)
    }

    pub(crate) fn close(&mut self, fd: Fd) -> Result<()> {
        let slot = self.fds.release(fd).ok_or(Error::InvalidDescriptor)?;
        self.root.get_mut(slot).record_close();
        Ok(())
    }

    /// 描述符指向的目录项槽位及当前偏移
    fn locate(&self, fd: Fd) -> Result<(usize, usize)> {
        self.fds
            .get(fd)
            .map(|desc| (desc.entry(), desc.offset()))
            .ok_or(Error::InvalidDescriptor)
    }

    fn set_offset(&mut self, fd: Fd, offset: usize) {
        if let Some(desc) = self.fds.get_mut(fd) {
            desc.set_offset(offset);
        }
    }

    pub(crate) fn get_size(&self, fd: Fd) -> Result<usize> {
        let (slot, _) = self.locate(fd)?;
        Ok(self.root.get(slot).size())
    }

    pub(crate) fn seek(&mut self, fd: Fd, offset: i64) -> Result<()> {
        let (slot, _) = self.locate(fd)?;
        let offset = usize::try_from(offset).map_err(|_| Error::NegativeOffset)?;
        if offset > self.root.get(slot).size() {
            return Err(Error::OffsetBeyondEnd);
        }
        self.set_offset(fd, offset);
        Ok(())
    }

    pub(crate) fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let (slot, offset) = self.locate(fd)?;
        let entry = self.root.get(slot);
        let size = entry.size();

        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len().min(size - offset);

        // 有数据的文件一定有首块
        let first = entry.first_block()?.ok_or(Error::CorruptChain)?;
        let mut block = self.fat.nth(first, offset / BLOCK_SIZE)?;
        let mut in_block = offset % BLOCK_SIZE;
        let mut data: Block = [0; BLOCK_SIZE];
        let mut read = 0;

        loop {
            self.read_data(block, &mut data)?;
            let n = (BLOCK_SIZE - in_block).min(len - read);
            buf[read..read + n].copy_from_slice(&data[in_block..in_block + n]);
            read += n;
            in_block = 0;

            if read == len {
                break;
            }
            block = self.fat.next(block)?.ok_or(Error::CorruptChain)?;
        }

        self.set_offset(fd, offset + read);
        Ok(read)
    }

    pub(crate) fn write(&mut self, fd: Fd, data: &[u8]) -> Result<usize> {
        let (slot, offset) = self.locate(fd)?;

        let len = data.len().min(MAX_FILE_SIZE.saturating_sub(offset));
        if len == 0 {
            if !data.is_empty() {
                log::warn!("descriptor {fd} is at the maximum file size");
            }
            return Ok(0);
        }

        let mut block = match self.reach_block(slot, offset / BLOCK_SIZE) {
            Ok(block) => block,
            Err(Error::DiskFull) => {
                log::warn!("disk full, nothing written through descriptor {fd}");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };
        let mut in_block = offset % BLOCK_SIZE;
        let mut buf: Block = [0; BLOCK_SIZE];
        let mut written = 0;

        loop {
            // 新分配的块不清零，范围外保留设备上原有的字节
            self.read_data(block, &mut buf)?;
            let n = (BLOCK_SIZE - in_block).min(len - written);
            buf[in_block..in_block + n].copy_from_slice(&data[written..written + n]);
            self.write_data(block, &buf)?;
            written += n;
            in_block = 0;

            if written == len {
                break;
            }
            block = match self.grow(block)? {
                Some(next) => next,
                None => {
                    log::warn!("disk full, short write of {written}/{len} bytes");
                    break;
                }
            };
        }

        let end = offset + written;
        self.set_offset(fd, end);
        let entry = self.root.get_mut(slot);
        if end > entry.size() {
            entry.resize(end);
        }

        Ok(written)
    }

    pub(crate) fn truncate(&mut self, fd: Fd, length: i64) -> Result<()> {
        let (slot, _) = self.locate(fd)?;
        let length = usize::try_from(length).map_err(|_| Error::NegativeLength)?;
        let size = self.root.get(slot).size();
        if length > size {
            return Err(Error::CannotExtend);
        }
        if length == size {
            return Ok(());
        }

        let keep = length.div_ceil(BLOCK_SIZE);
        if let Some(first) = self.root.get(slot).first_block()? {
            let first = self.fat.truncate(first, keep);
            self.root.get_mut(slot).set_first_block(first);
        }
        self.fds.clamp(slot, length);
        self.root.get_mut(slot).resize(length);

        log::debug!("truncated slot {slot} from {size} to {length} bytes, {keep} blocks kept");
        Ok(())
    }

    /// 定位链表上第`n`块，空文件先分配首块，链不够长就在尾部追加。
    fn reach_block(&mut self, slot: usize, n: usize) -> Result<BlockId> {
        let mut block = match self.root.get(slot).first_block()? {
            Some(first) => first,
            None => {
                let first = self.fat.alloc().ok_or(Error::DiskFull)?;
                self.root.get_mut(slot).set_first_block(Some(first));
                first
            }
        };
        for _ in 0..n {
            block = self.grow(block)?.ok_or(Error::DiskFull)?;
        }
        Ok(block)
    }

    /// 链上`block`的下一块，`block`是链尾时追加一块；磁盘满了返回`None`。
    fn grow(&mut self, block: BlockId) -> Result<Option<BlockId>> {
        if let Some(next) = self.fat.next(block)? {
            return Ok(Some(next));
        }
        let Some(next) = self.fat.alloc() else {
            return Ok(None);
        };
        self.fat.couple(block, next);
        Ok(Some(next))
    }

    fn read_data(&self, block: BlockId, buf: &mut Block) -> Result<()> {
        self.dev
            .read_block(self.boot.data_offset() + block.index(), buf)
            .map_err(|source| Error::BlockIo {
                block: block.into(),
                source,
            })
    }

    fn write_data(&self, block: BlockId, buf: &Block) -> Result<()> {
        self.dev
            .write_block(self.boot.data_offset() + block.index(), buf)
            .map_err(|source| Error::BlockIo {
                block: block.into(),
                source,
            })
    }
}
