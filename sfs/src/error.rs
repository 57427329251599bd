use block_dev::DeviceError;
use derive_more::Display;

use crate::ChainError;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "file system is not mounted")]
    NotMounted,
    #[display(fmt = "a file system is already mounted")]
    AlreadyMounted,
    #[display(fmt = "disk name does not match the mounted disk")]
    NameMismatch,
    #[display(fmt = "invalid superblock")]
    InvalidSuperblock,
    #[display(fmt = "device error: {}", _0)]
    Device(DeviceError),
    #[display(fmt = "I/O error on data block {}: {}", block, source)]
    BlockIo { block: u32, source: DeviceError },
    #[display(fmt = "block chain is corrupt")]
    CorruptChain,
    #[display(fmt = "invalid file descriptor")]
    InvalidDescriptor,
    #[display(fmt = "no free file descriptor")]
    NoFreeDescriptor,
    #[display(fmt = "file not found")]
    NotFound,
    #[display(fmt = "file already exists")]
    AlreadyExists,
    #[display(fmt = "file name is empty")]
    EmptyName,
    #[display(fmt = "file name is too long")]
    NameTooLong,
    #[display(fmt = "file name must be ASCII without NUL")]
    InvalidName,
    #[display(fmt = "directory is full")]
    DirectoryFull,
    #[display(fmt = "file is in use")]
    FileInUse,
    #[display(fmt = "no free data block")]
    DiskFull,
    #[display(fmt = "offset is negative")]
    NegativeOffset,
    #[display(fmt = "offset is beyond the end of the file")]
    OffsetBeyondEnd,
    #[display(fmt = "truncate cannot extend a file")]
    CannotExtend,
    #[display(fmt = "length is negative")]
    NegativeLength,
    #[display(fmt = "malformed on-disk record")]
    Format,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Device(e) | Self::BlockIo { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

impl From<ChainError> for Error {
    fn from(e: ChainError) -> Self {
        log::debug!("chain error: {e:?}");
        Self::CorruptChain
    }
}

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        log::error!("{e}");
        Self::Format
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
