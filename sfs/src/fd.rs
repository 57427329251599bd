//! 描述符表

use derive_more::{Display, From, Into};

use crate::MAX_FDS;

/// 文件描述符，即描述符表的槽位号
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct Fd(usize);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    open: bool,
    /// 目录项的槽位
    entry: usize,
    offset: usize,
}

impl FileDescriptor {
    pub const fn entry(&self) -> usize {
        self.entry
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }
}

#[derive(Debug, Clone)]
pub struct FdTable {
    slots: [FileDescriptor; MAX_FDS],
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            slots: [FileDescriptor::default(); MAX_FDS],
        }
    }

    /// 占用第一个空闲槽，偏移量从0开始
    pub fn alloc(&mut self, entry: usize) -> Option<Fd> {
        let (fd, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| !slot.open)?;
        *slot = FileDescriptor {
            open: true,
            entry,
            offset: 0,
        };
        Some(Fd(fd))
    }

    /// 打开着的描述符
    pub fn get(&self, fd: Fd) -> Option<&FileDescriptor> {
        self.slots.get(fd.0).filter(|slot| slot.open)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Option<&mut FileDescriptor> {
        self.slots.get_mut(fd.0).filter(|slot| slot.open)
    }

    /// 关闭描述符，返回它指向的目录项
    pub fn release(&mut self, fd: Fd) -> Option<usize> {
        let slot = self.get_mut(fd)?;
        slot.open = false;
        Some(slot.entry)
    }

    pub fn references(&self, entry: usize) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.open && slot.entry == entry)
    }

    pub fn opened(&self) -> impl Iterator<Item = Fd> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.open)
            .map(|(fd, _)| Fd(fd))
    }

    /// 把指向`entry`的描述符偏移量压到`len`以内
    pub fn clamp(&mut self, entry: usize, len: usize) {
        for slot in self
            .slots
            .iter_mut()
            .filter(|slot| slot.open && slot.entry == entry)
        {
            slot.offset = slot.offset.min(len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_slots() {
        let mut fds = FdTable::new();
        assert_eq!(Some(Fd(0)), fds.alloc(3));
        assert_eq!(Some(Fd(1)), fds.alloc(3));
        assert_eq!(Some(3), fds.release(Fd(0)));
        assert_eq!(None, fds.release(Fd(0)));
        assert_eq!(Some(Fd(0)), fds.alloc(5));
        assert_eq!(0, fds.get(Fd(0)).unwrap().offset());
        assert_eq!(vec![Fd(0), Fd(1)], fds.opened().collect::<Vec<_>>());
    }

    #[test]
    fn full() {
        let mut fds = FdTable::new();
        for _ in 0..MAX_FDS {
            assert!(fds.alloc(0).is_some());
        }
        assert_eq!(None, fds.alloc(0));
        assert!(fds.get(Fd(MAX_FDS)).is_none());
    }

    #[test]
    fn clamp_only_matching() {
        let mut fds = FdTable::new();
        let a = fds.alloc(1).unwrap();
        let b = fds.alloc(2).unwrap();
        fds.get_mut(a).unwrap().set_offset(100);
        fds.get_mut(b).unwrap().set_offset(100);

        fds.clamp(1, 10);
        assert_eq!(10, fds.get(a).unwrap().offset());
        assert_eq!(100, fds.get(b).unwrap().offset());
        assert!(fds.references(2));
        assert!(!fds.references(3));
    }
}
