#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use sfs::{BLOCK_SIZE, Block, BlockDevice, DISK_BLOCKS, DeviceError, DiskDriver, FileSystem};

/// 内存中的磁盘映像，只保存写过的块
#[derive(Debug, Default)]
pub struct Image {
    blocks: Mutex<BTreeMap<usize, Box<Block>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Image {
    pub fn raw_block(&self, block_id: usize) -> Block {
        self.blocks
            .lock()
            .unwrap()
            .get(&block_id)
            .map_or([0; BLOCK_SIZE], |block| **block)
    }

    pub fn put_raw_block(&self, block_id: usize, block: &Block) {
        self.blocks
            .lock()
            .unwrap()
            .insert(block_id, Box::new(*block));
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct RamDisk {
    image: Arc<Image>,
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut Block) -> Result<(), DeviceError> {
        if block_id >= DISK_BLOCKS {
            return Err(DeviceError::OutOfRange);
        }
        if self.image.fail_reads.load(Ordering::SeqCst) {
            return Err(DeviceError::Read);
        }
        *buf = self.image.raw_block(block_id);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &Block) -> Result<(), DeviceError> {
        if block_id >= DISK_BLOCKS {
            return Err(DeviceError::OutOfRange);
        }
        if self.image.fail_writes.load(Ordering::SeqCst) {
            return Err(DeviceError::Write);
        }
        self.image.put_raw_block(block_id, buf);
        Ok(())
    }

    fn close(self) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RamDrive {
    disks: HashMap<String, Arc<Image>>,
}

impl RamDrive {
    pub fn image(&self, name: &str) -> Arc<Image> {
        Arc::clone(&self.disks[name])
    }
}

impl DiskDriver for RamDrive {
    type Device = RamDisk;

    fn create_disk(&mut self, name: &str) -> Result<(), DeviceError> {
        self.disks.insert(name.into(), Arc::default());
        Ok(())
    }

    fn open_disk(&mut self, name: &str) -> Result<RamDisk, DeviceError> {
        let image = self.disks.get(name).ok_or(DeviceError::Open)?;
        Ok(RamDisk {
            image: Arc::clone(image),
        })
    }
}

/// 新建并挂载名为`name`的卷
pub fn mounted(name: &str) -> FileSystem<RamDrive> {
    let mut fs = FileSystem::new(RamDrive::default());
    fs.make_fs(name).unwrap();
    fs.mount(name).unwrap();
    fs
}

/// 可重复的伪随机内容
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i % 251) as u8).wrapping_add(seed))
        .collect()
}
