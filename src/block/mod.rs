//! 扇区设备抽象
//!
//! block/device.rs 定义缓存所消费的设备接口，每次调用同步读写一个完整扇区。
//! block/mem.rs 提供基于内存的设备实现，可作为内存盘或测试替身。

mod device;
mod mem;

pub use device::SectorDevice;
pub use mem::MemDisk;
