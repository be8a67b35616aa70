//! 扇区设备接口

use crate::error::Result;

/// 扇区设备接口
///
/// 实现此 trait 以提供底层设备访问。每次调用同步传输恰好一个扇区。
///
/// # 示例
///
/// ```rust,ignore
/// use sector_bcache::{SectorDevice, Result};
///
/// struct MyDisk {
///     // ...
/// }
///
/// impl SectorDevice for MyDisk {
///     fn sector_size(&self) -> usize {
///         512
///     }
///
///     fn total_sectors(&self) -> u64 {
///         8192
///     }
///
///     fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> Result<()> {
///         // 读取一个扇区到 buf
///         Ok(())
///     }
///
///     fn write_sector(&mut self, sector: u64, buf: &[u8]) -> Result<()> {
///         // 将 buf 写入一个扇区
///         Ok(())
///     }
/// }
/// ```
pub trait SectorDevice {
    /// 扇区大小（字节）
    fn sector_size(&self) -> usize;

    /// 总扇区数
    fn total_sectors(&self) -> u64;

    /// 读取一个扇区
    ///
    /// # 参数
    ///
    /// * `sector` - 扇区号
    /// * `buf` - 目标缓冲区，长度恰为 `sector_size()`
    fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> Result<()>;

    /// 写入一个扇区
    ///
    /// # 参数
    ///
    /// * `sector` - 扇区号
    /// * `buf` - 源缓冲区，长度恰为 `sector_size()`
    fn write_sector(&mut self, sector: u64, buf: &[u8]) -> Result<()>;

    /// 刷新设备自身的写缓存
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// 是否只读
    fn is_read_only(&self) -> bool {
        false
    }
}
