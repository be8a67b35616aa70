//! sector_bcache: 以扇区为粒度的固定容量缓冲缓存
//!
//! 位于块设备与文件系统之间，拦截每一次扇区读写：
//! - 命中直接从内存返回
//! - 未命中按时钟（second-chance）算法替换，脏项先写回
//! - 每个缓存项独立加锁，不同扇区的访问完全并发
//! - 同一扇区绝不会被两个缓存项同时持有
//!
//! # 示例
//!
//! ```rust,ignore
//! use sector_bcache::{BufferCache, CacheConfig, MemDisk, Result};
//!
//! fn main() -> Result<()> {
//!     let cache = BufferCache::new(MemDisk::new(512, 1024)?, CacheConfig::default())?;
//!
//!     cache.write(3, b"hello", 0, 5, 0)?;
//!
//!     let mut buf = [0u8; 5];
//!     cache.read(3, &mut buf, 0, 5, 0)?;
//!
//!     // 写回所有脏项
//!     let disk = cache.into_device()?;
//!     assert_eq!(&disk.sector(3).unwrap()[..5], b"hello");
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`block`] - 扇区设备抽象
//! - [`cache`] - 缓冲缓存
//! - [`config`] - 缓存配置
//! - [`consts`] - 常量定义

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

/// 错误处理
pub mod error;

/// 扇区设备抽象
pub mod block;

/// 缓冲缓存
pub mod cache;

/// 缓存配置
pub mod config;

/// 常量定义
pub mod consts;

// ===== 公共导出 =====

pub use error::{Error, ErrorKind, Result};

pub use block::{MemDisk, SectorDevice};

pub use cache::{BufferCache, CacheStats, Entry, EntryFlags, LockedEntry, SlotId};

pub use config::CacheConfig;

pub use consts::{DEFAULT_CACHE_ENTRIES, DEFAULT_SECTOR_SIZE};
