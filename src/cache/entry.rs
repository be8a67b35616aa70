//! 缓存项结构
//!
//! 表中每个槽位持有一个 [`Entry`]，由各自的自旋锁保护。

use alloc::boxed::Box;
use bitflags::bitflags;
use core::fmt;
use core::ops::{Deref, DerefMut};
use spin::MutexGuard;

/// 槽位索引
///
/// 只由缓存自身构造，始终小于表容量。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// 槽位在表中的下标
    pub const fn index(self) -> usize {
        self.0
    }

    /// 时钟指针前进一格（在 `capacity` 处回绕）
    pub(crate) fn next(self, capacity: usize) -> Self {
        Self((self.0 + 1) % capacity)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// 缓存项标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u8 {
        /// 槽位持有有效数据
        const VALID      = 0x01;
        /// 数据与设备不一致，需要写回
        const DIRTY      = 0x02;
        /// 时钟算法的访问位
        const REFERENCED = 0x04;
    }
}

/// 缓存项
///
/// `sector` 仅在 `VALID` 置位时有意义；`DIRTY` 只会在 `VALID` 置位时出现。
pub struct Entry {
    /// 当前缓存的扇区号
    pub(crate) sector: u64,
    /// 状态标志
    pub(crate) flags: EntryFlags,
    /// 一个扇区的数据
    pub(crate) data: Box<[u8]>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("sector", &self.sector)
            .field("flags", &self.flags)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl Entry {
    /// 创建全零的无效项
    pub(crate) fn new(sector_size: usize) -> Self {
        Self {
            sector: 0,
            flags: EntryFlags::empty(),
            data: alloc::vec![0u8; sector_size].into_boxed_slice(),
        }
    }

    /// 当前缓存的扇区号（无效项返回 `None`）
    pub fn sector(&self) -> Option<u64> {
        self.is_valid().then_some(self.sector)
    }

    /// 扇区数据
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 状态标志
    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    /// 是否有效
    pub fn is_valid(&self) -> bool {
        self.flags.contains(EntryFlags::VALID)
    }

    /// 是否为脏
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(EntryFlags::DIRTY)
    }

    /// 访问位是否置位
    pub fn is_referenced(&self) -> bool {
        self.flags.contains(EntryFlags::REFERENCED)
    }

    /// 是否持有指定扇区
    pub(crate) fn holds(&self, sector: u64) -> bool {
        self.is_valid() && self.sector == sector
    }

    pub(crate) fn mark_referenced(&mut self) {
        self.flags.insert(EntryFlags::REFERENCED);
    }

    pub(crate) fn clear_referenced(&mut self) {
        self.flags.remove(EntryFlags::REFERENCED);
    }

    pub(crate) fn mark_dirty(&mut self) {
        debug_assert!(self.is_valid());
        self.flags.insert(EntryFlags::DIRTY);
    }

    pub(crate) fn mark_clean(&mut self) {
        self.flags.remove(EntryFlags::DIRTY);
    }

    /// 重新绑定到新扇区：有效、干净，数据待填充
    pub(crate) fn rebind(&mut self, sector: u64) {
        self.sector = sector;
        self.flags.insert(EntryFlags::VALID);
        self.flags.remove(EntryFlags::DIRTY);
    }

    /// 填充失败后作废
    pub(crate) fn invalidate(&mut self) {
        self.flags = EntryFlags::empty();
    }
}

/// 已加锁的缓存项
///
/// 持有期间独占该槽位的元数据和数据；丢弃时释放锁。
pub struct LockedEntry<'a> {
    slot: SlotId,
    guard: MutexGuard<'a, Entry>,
}

impl<'a> LockedEntry<'a> {
    pub(crate) fn new(slot: SlotId, guard: MutexGuard<'a, Entry>) -> Self {
        Self { slot, guard }
    }

    /// 所在槽位
    pub fn slot(&self) -> SlotId {
        self.slot
    }
}

impl Deref for LockedEntry<'_> {
    type Target = Entry;

    fn deref(&self) -> &Entry {
        &self.guard
    }
}

impl DerefMut for LockedEntry<'_> {
    fn deref_mut(&mut self) -> &mut Entry {
        &mut self.guard
    }
}

impl fmt::Debug for LockedEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedEntry")
            .field("slot", &self.slot)
            .field("entry", &*self.guard)
            .finish()
    }
}
