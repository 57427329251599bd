use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use block_dev::{BLOCK_SIZE, Block, BlockDevice, DeviceError, DiskDriver};
use send_wrapper::SendWrapper;
use sfs::DISK_BLOCKS;

/// Byte length of a freshly created image.
pub const IMAGE_SIZE: u64 = (DISK_BLOCKS * BLOCK_SIZE) as u64;

/// A disk image on the host file system, accessed one block at a time.
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
}

impl BlockFile {
    pub fn new(fd: File) -> Self {
        Self {
            inner: SendWrapper::new(RefCell::new(fd)),
        }
    }

    fn locate(file: &mut File, block_id: usize, err: DeviceError) -> Result<(), DeviceError> {
        if block_id >= DISK_BLOCKS {
            return Err(DeviceError::OutOfRange);
        }
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .map_err(|e| {
                log::error!("seeking to block {block_id}: {e}");
                err
            })?;
        Ok(())
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut Block) -> Result<(), DeviceError> {
        let mut file = self.inner.borrow_mut();
        Self::locate(&mut file, block_id, DeviceError::Read)?;
        file.read_exact(buf).map_err(|e| {
            log::error!("reading block {block_id}: {e}");
            DeviceError::Read
        })
    }

    fn write_block(&self, block_id: usize, buf: &Block) -> Result<(), DeviceError> {
        let mut file = self.inner.borrow_mut();
        Self::locate(&mut file, block_id, DeviceError::Write)?;
        file.write_all(buf).map_err(|e| {
            log::error!("writing block {block_id}: {e}");
            DeviceError::Write
        })
    }

    fn close(self) -> Result<(), DeviceError> {
        self.inner.take().into_inner().sync_all().map_err(|e| {
            log::error!("syncing image: {e}");
            DeviceError::Close
        })
    }
}

/// Resolves disk names to image files under `root`.
#[derive(Debug, Default)]
pub struct FileDriver {
    root: PathBuf,
}

impl FileDriver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(Path::new(name))
    }
}

impl DiskDriver for FileDriver {
    type Device = BlockFile;

    fn create_disk(&mut self, name: &str) -> Result<(), DeviceError> {
        let path = self.path(name);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .and_then(|fd| fd.set_len(IMAGE_SIZE))
            .map_err(|e| {
                log::error!("creating {}: {e}", path.display());
                DeviceError::Create
            })?;
        log::debug!("created image {}", path.display());
        Ok(())
    }

    fn open_disk(&mut self, name: &str) -> Result<BlockFile, DeviceError> {
        let path = self.path(name);
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map(BlockFile::new)
            .map_err(|e| {
                log::error!("opening {}: {e}", path.display());
                DeviceError::Open
            })
    }
}
