//! 缓存配置

use crate::consts::{DEFAULT_CACHE_ENTRIES, DEFAULT_DIRTY_WARN_PERCENT};
use crate::error::{Error, ErrorKind, Result};

/// 缓存配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 缓存项数量（每项容纳一个扇区）
    pub capacity: usize,
    /// 脏项占比超过该百分比时在未命中路径上打印告警
    pub dirty_warn_percent: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_ENTRIES,
            dirty_warn_percent: DEFAULT_DIRTY_WARN_PERCENT,
        }
    }
}

impl CacheConfig {
    /// 使用指定容量，其余取默认值
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "cache capacity must be at least one entry",
            ));
        }
        if self.dirty_warn_percent > 100 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "dirty warn percent must be within 0..=100",
            ));
        }
        Ok(())
    }
}
