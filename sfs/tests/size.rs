use sfs::volume::{BootSector, FileEntry};
use sfs::{BLOCK_SIZE, DISK_BLOCKS, FAT_BLOCKS, MAX_FILE_SIZE, MAX_FILES, ROOT_BLOCKS};

#[test]
fn volume() {
    assert_eq!(36, BootSector::SIZE);
    assert_eq!(64, FileEntry::SIZE);
    assert_eq!(4, FAT_BLOCKS);
    assert_eq!(1, ROOT_BLOCKS);
    assert!(MAX_FILES * FileEntry::SIZE <= BLOCK_SIZE);
    assert_eq!(16 << 20, MAX_FILE_SIZE);
    assert_eq!(32 << 20, DISK_BLOCKS * BLOCK_SIZE);
}
