//! 扇区缓存模块
//!
//! 固定容量、以扇区为粒度的缓冲缓存，位于扇区设备与文件系统之间。
//!
//! # 主要组件
//!
//! - [`BufferCache`] - 缓存项表、查找、时钟替换与写回
//! - [`Entry`] / [`LockedEntry`] - 单个缓存项及其加锁视图
//! - [`EntryFlags`] - 有效 / 脏 / 访问位
//! - [`SlotId`] - 槽位索引
//! - [`CacheStats`] - 统计信息
//!
//! # 替换策略
//!
//! 时钟（second-chance）算法：指针在表上循环前进，经过访问位已置位的项时清除该位，
//! 遇到无效项或访问位为空的项即选为牺牲项。新填入的项访问位为空，
//! 之后的每次命中都会置位，因此被再次访问过的项能躲过一轮扫描。
//!
//! # 写回
//!
//! 写入只修改缓存并标记为脏。脏项在以下时机写回设备：
//!
//! 1. 被选为牺牲项、复用之前
//! 2. [`BufferCache::flush_sector`] / [`BufferCache::flush_all`]
//! 3. [`BufferCache::shutdown`]
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use sector_bcache::{BufferCache, CacheConfig, MemDisk};
//!
//! let cache = BufferCache::new(MemDisk::new(512, 4096)?, CacheConfig::default())?;
//!
//! // 在扇区 7 的偏移 128 处写入 4 字节
//! cache.write(7, &[1, 2, 3, 4], 0, 4, 128)?;
//!
//! let mut out = [0u8; 4];
//! cache.read(7, &mut out, 0, 4, 128)?;
//!
//! let stats = cache.stats();
//! println!("hits={} misses={} dirty={}", stats.hits, stats.misses, stats.dirty_entries);
//!
//! cache.shutdown()?;
//! ```

mod buffer_cache;
mod entry;
mod io;

pub use buffer_cache::{BufferCache, CacheStats};
pub use entry::{Entry, EntryFlags, LockedEntry, SlotId};
