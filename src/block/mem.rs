//! 内存盘
//!
//! 以 `Vec<u8>` 作为存储的 [`SectorDevice`] 实现，记录物理读写次数。

use super::SectorDevice;
use crate::error::{Error, ErrorKind, Result};
use alloc::vec::Vec;

/// 内存扇区设备
#[derive(Debug, Clone)]
pub struct MemDisk {
    sector_size: usize,
    total_sectors: u64,
    storage: Vec<u8>,
    read_only: bool,
    /// 物理读取次数
    physical_reads: u64,
    /// 物理写入次数
    physical_writes: u64,
}

impl MemDisk {
    /// 创建全零内存盘
    ///
    /// # 错误
    ///
    /// 总字节数超出地址空间时返回 `InvalidInput`
    pub fn new(sector_size: usize, total_sectors: u64) -> Result<Self> {
        let bytes = usize::try_from(total_sectors)
            .ok()
            .and_then(|sectors| sectors.checked_mul(sector_size))
            .ok_or(Error::new(ErrorKind::InvalidInput, "disk size overflows usize"))?;

        Ok(Self {
            sector_size,
            total_sectors,
            storage: alloc::vec![0u8; bytes],
            read_only: false,
            physical_reads: 0,
            physical_writes: 0,
        })
    }

    /// 设置只读标志
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// 直接查看一个扇区的内容（绕过任何缓存）
    pub fn sector(&self, sector: u64) -> Option<&[u8]> {
        let range = self.range_of(sector).ok()?;
        Some(&self.storage[range])
    }

    /// 直接改写一个扇区的内容（模拟缓存之外的写入方）
    pub fn sector_mut(&mut self, sector: u64) -> Option<&mut [u8]> {
        let range = self.range_of(sector).ok()?;
        Some(&mut self.storage[range])
    }

    /// 物理读取次数
    pub fn physical_reads(&self) -> u64 {
        self.physical_reads
    }

    /// 物理写入次数
    pub fn physical_writes(&self) -> u64 {
        self.physical_writes
    }

    fn range_of(&self, sector: u64) -> Result<core::ops::Range<usize>> {
        if sector >= self.total_sectors {
            return Err(Error::new(ErrorKind::OutOfRange, "sector beyond end of disk"));
        }
        let start = sector as usize * self.sector_size;
        Ok(start..start + self.sector_size)
    }
}

impl SectorDevice for MemDisk {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn total_sectors(&self) -> u64 {
        self.total_sectors
    }

    fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.range_of(sector)?;
        if buf.len() != self.sector_size {
            return Err(Error::new(ErrorKind::InvalidInput, "buffer is not one sector long"));
        }
        buf.copy_from_slice(&self.storage[range]);
        self.physical_reads += 1;
        Ok(())
    }

    fn write_sector(&mut self, sector: u64, buf: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::new(ErrorKind::ReadOnly, "disk is read-only"));
        }
        let range = self.range_of(sector)?;
        if buf.len() != self.sector_size {
            return Err(Error::new(ErrorKind::InvalidInput, "buffer is not one sector long"));
        }
        self.storage[range].copy_from_slice(buf);
        self.physical_writes += 1;
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}
