//! 常量定义

/// 默认扇区大小（字节）
pub const DEFAULT_SECTOR_SIZE: usize = 512;

/// 默认缓存项数量
pub const DEFAULT_CACHE_ENTRIES: usize = 64;

/// 脏项比例告警阈值（百分比）
pub const DEFAULT_DIRTY_WARN_PERCENT: u8 = 80;

/// 时钟扫描在强制选择前允许的完整轮数
///
/// 第一轮清除所有引用位，第二轮必然遇到引用位为空的项，
/// 除非并发命中在扫描过程中不断重新置位。
pub const CLOCK_MAX_SWEEPS: usize = 2;
