//! 缓存读写路径
//!
//! `read`/`write` 在单个扇区内按字节范围拷贝；
//! `read_bytes`/`write_bytes` 将任意设备字节范围拆分为逐扇区的缓存访问。

use super::BufferCache;
use crate::block::SectorDevice;
use crate::error::{Error, ErrorKind, Result};

impl<D: SectorDevice> BufferCache<D> {
    /// 读取扇区中的一段字节
    ///
    /// 将扇区内 `[sector_offset, sector_offset + len)` 拷贝到
    /// `buf[buf_offset..buf_offset + len]`。未命中时先替换并从设备填充。
    ///
    /// # 参数
    ///
    /// * `sector` - 扇区号
    /// * `buf` - 目标缓冲区
    /// * `buf_offset` - 目标缓冲区内的起始偏移
    /// * `len` - 字节数
    /// * `sector_offset` - 扇区内的起始偏移
    ///
    /// # 返回
    ///
    /// 成功返回拷贝的字节数
    pub fn read(
        &self,
        sector: u64,
        buf: &mut [u8],
        buf_offset: usize,
        len: usize,
        sector_offset: usize,
    ) -> Result<usize> {
        self.check_range(buf.len(), buf_offset, len, sector_offset)?;
        self.ensure_open()?;
        self.check_sector(sector)?;
        if len == 0 {
            return Ok(0);
        }

        let entry = self.resolve(sector)?;
        buf[buf_offset..buf_offset + len]
            .copy_from_slice(&entry.data[sector_offset..sector_offset + len]);
        Ok(len)
    }

    /// 写入扇区中的一段字节
    ///
    /// 将 `buf[buf_offset..buf_offset + len]` 拷贝到扇区内 `sector_offset` 处并标记为脏。
    /// 数据不会同步写入设备，只在写回（替换、显式刷新或关闭）时落盘。
    ///
    /// # 返回
    ///
    /// 成功返回拷贝的字节数
    pub fn write(
        &self,
        sector: u64,
        buf: &[u8],
        buf_offset: usize,
        len: usize,
        sector_offset: usize,
    ) -> Result<usize> {
        self.check_range(buf.len(), buf_offset, len, sector_offset)?;
        self.ensure_writable()?;
        self.ensure_open()?;
        self.check_sector(sector)?;
        if len == 0 {
            return Ok(0);
        }

        let mut entry = self.resolve(sector)?;
        if !entry.is_dirty() {
            entry.mark_dirty();
            self.note_dirtied();
        }
        entry.data[sector_offset..sector_offset + len]
            .copy_from_slice(&buf[buf_offset..buf_offset + len]);
        Ok(len)
    }

    /// 按设备字节偏移读取，自动处理跨扇区情况
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let mut buf = [0u8; 100];
    /// cache.read_bytes(1000, &mut buf)?;
    /// ```
    pub fn read_bytes(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.check_span(offset, buf.len())?;
        let mut done = 0;
        while done < buf.len() {
            let (sector, sector_offset, chunk) = self.split(offset, done, buf.len())?;
            self.read(sector, buf, done, chunk, sector_offset)?;
            done += chunk;
        }
        Ok(done)
    }

    /// 按设备字节偏移写入，自动处理跨扇区情况
    ///
    /// 不完整的首尾扇区先从缓存（或设备）读入，其余字节保持不变。
    /// 范围越过设备末尾时整体拒绝，不修改任何扇区。
    pub fn write_bytes(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        self.check_span(offset, buf.len())?;
        self.ensure_writable()?;
        let mut done = 0;
        while done < buf.len() {
            let (sector, sector_offset, chunk) = self.split(offset, done, buf.len())?;
            self.write(sector, buf, done, chunk, sector_offset)?;
            done += chunk;
        }
        Ok(done)
    }

    /// 整个字节范围必须落在设备内
    fn check_span(&self, offset: u64, len: usize) -> Result<()> {
        let device_bytes = self
            .total_sectors()
            .checked_mul(self.sector_size() as u64)
            .unwrap_or(u64::MAX);
        let end = offset.checked_add(len as u64);
        if !matches!(end, Some(end) if end <= device_bytes) {
            return Err(Error::new(ErrorKind::OutOfRange, "byte range extends beyond end of device"));
        }
        Ok(())
    }

    /// 计算第 `done` 字节所在的扇区、扇区内偏移以及本扇区可处理的字节数
    fn split(&self, offset: u64, done: usize, total: usize) -> Result<(u64, usize, usize)> {
        let pos = offset
            .checked_add(done as u64)
            .ok_or(Error::new(ErrorKind::OutOfRange, "byte offset overflows"))?;
        let sector_size = self.sector_size() as u64;
        let sector_offset = (pos % sector_size) as usize;
        let chunk = (self.sector_size() - sector_offset).min(total - done);
        Ok((pos / sector_size, sector_offset, chunk))
    }

    fn check_range(
        &self,
        buf_len: usize,
        buf_offset: usize,
        len: usize,
        sector_offset: usize,
    ) -> Result<()> {
        let sector_end = sector_offset.checked_add(len);
        if !matches!(sector_end, Some(end) if end <= self.sector_size()) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "byte range crosses the sector boundary",
            ));
        }

        let buf_end = buf_offset.checked_add(len);
        if !matches!(buf_end, Some(end) if end <= buf_len) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "byte range exceeds the caller buffer",
            ));
        }
        Ok(())
    }
}
