//! 扇区缓存实现
//!
//! 固定容量的缓存项表 + 时钟（second-chance）替换。
//!
//! # 锁
//!
//! ```text
//! struct BufferCache {
//!     entries: [Mutex<Entry>; N],   // 每项一把锁，保护元数据和数据
//!     tags:    [AtomicU64; N],      // 每个槽位所持扇区的无锁副本
//!     fill:    Mutex<SlotId>,       // 表级填充锁，同时持有时钟指针
//!     device:  Mutex<D>,            // 设备访问
//! }
//! ```
//!
//! 加锁顺序固定为 `fill` → 单个 `entries[i]` → `device`。
//! 命中路径只取对应项的锁；未命中路径在 `fill` 之下重新查找后再选牺牲项并填充，
//! 因此同一扇区不会被两个槽位同时缓存。
//!
//! `tags` 只在持有 `fill` 和对应项锁时改写。查找先无锁比对标签，
//! 只对标签匹配的槽位加锁并复核，所以命中不会排在无关槽位的填充之后。

use crate::{
    block::SectorDevice,
    config::CacheConfig,
    consts::CLOCK_MAX_SWEEPS,
    error::{Error, ErrorKind, Result},
};

use super::entry::{Entry, LockedEntry, SlotId};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use spin::Mutex;

/// 空槽位的标签值
const EMPTY_TAG: u64 = u64::MAX;

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 总访问次数
    pub total_accesses: u64,
    /// 缓存命中次数
    pub hits: u64,
    /// 缓存未命中次数
    pub misses: u64,
    /// 有效项被替换的次数
    pub evictions: u64,
    /// 脏项写回次数
    pub writebacks: u64,
    /// 当前脏项数量
    pub dirty_entries: usize,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_accesses as f64
        }
    }
}

#[derive(Default)]
struct StatCounters {
    total_accesses: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    writebacks: AtomicU64,
}

impl StatCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 扇区缓存
///
/// 在扇区设备与文件系统之间缓存整扇区数据。读写按字节范围进行，
/// 写入只落到缓存，直到被替换、显式刷新或关闭时才写回设备。
///
/// # 示例
///
/// ```rust,ignore
/// use sector_bcache::{BufferCache, CacheConfig, MemDisk};
///
/// let cache = BufferCache::new(MemDisk::new(512, 1024)?, CacheConfig::with_capacity(64))?;
///
/// cache.write(10, b"hello", 0, 5, 100)?;
/// let mut out = [0u8; 5];
/// cache.read(10, &mut out, 0, 5, 100)?;
/// assert_eq!(&out, b"hello");
///
/// let flushed = cache.shutdown()?;
/// ```
pub struct BufferCache<D> {
    /// 缓存项表，容量在构造时固定
    entries: Box<[Mutex<Entry>]>,

    /// 各槽位所持扇区，空槽位为 `EMPTY_TAG`
    tags: Box<[AtomicU64]>,

    /// 表级填充锁；内部值为时钟指针
    fill: Mutex<SlotId>,

    /// 底层设备
    pub(super) device: Mutex<D>,

    sector_size: usize,
    total_sectors: u64,
    read_only: bool,
    config: CacheConfig,

    /// 当前脏项数量
    dirty: AtomicUsize,

    /// 关闭后拒绝读写
    shut_down: AtomicBool,

    stats: StatCounters,
}

impl<D: SectorDevice> BufferCache<D> {
    /// 创建缓存
    ///
    /// 所有缓存项一次性分配并清零，时钟指针指向第一个槽位。
    ///
    /// # 参数
    ///
    /// * `device` - 底层扇区设备
    /// * `config` - 缓存配置
    pub fn new(device: D, config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let sector_size = device.sector_size();
        if sector_size == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "device reports a zero sector size",
            ));
        }

        let entries: Vec<Mutex<Entry>> = (0..config.capacity)
            .map(|_| Mutex::new(Entry::new(sector_size)))
            .collect();

        log::debug!(
            "[BCACHE] init: {} entries x {} bytes, device has {} sectors",
            config.capacity,
            sector_size,
            device.total_sectors()
        );

        let tags: Vec<AtomicU64> = (0..config.capacity)
            .map(|_| AtomicU64::new(EMPTY_TAG))
            .collect();

        Ok(Self {
            entries: entries.into_boxed_slice(),
            tags: tags.into_boxed_slice(),
            fill: Mutex::new(SlotId::new(0)),
            total_sectors: device.total_sectors(),
            read_only: device.is_read_only(),
            device: Mutex::new(device),
            sector_size,
            config,
            dirty: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            stats: StatCounters::default(),
        })
    }

    /// 使用默认容量创建缓存
    pub fn with_default_capacity(device: D) -> Result<Self> {
        Self::new(device, CacheConfig::default())
    }

    /// 关闭缓存
    ///
    /// 写回所有脏项并刷新设备。之后的 `read`/`write` 返回 `InvalidState`。
    /// 再次调用不会写回任何内容。
    ///
    /// # 返回
    ///
    /// 写回的缓存项数量
    pub fn shutdown(&self) -> Result<usize> {
        let flushed = self.flush_all()?;
        self.device.lock().flush()?;
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            log::debug!("[BCACHE] shutdown: {} entries written back", flushed);
        }
        Ok(flushed)
    }

    /// 关闭缓存并取回底层设备
    pub fn into_device(self) -> Result<D> {
        self.shutdown()?;
        Ok(self.device.into_inner())
    }

    /// 查找缓存项
    ///
    /// 线性扫描槽位标签，只对标签匹配的槽位加锁并复核，
    /// 返回持有 `sector` 的已加锁缓存项。未命中时不持有任何锁。
    ///
    /// 标签匹配但正在填充的槽位会等到填充结束；
    /// 加锁后发现已被换出或填充失败则继续扫描。
    pub fn lookup(&self, sector: u64) -> Option<LockedEntry<'_>> {
        if sector == EMPTY_TAG {
            return None;
        }
        self.tags.iter().enumerate().find_map(|(index, tag)| {
            if tag.load(Ordering::Acquire) != sector {
                return None;
            }
            let guard = self.entries[index].lock();
            guard
                .holds(sector)
                .then(|| LockedEntry::new(SlotId::new(index), guard))
        })
    }

    /// 选择牺牲项
    ///
    /// 取表级锁推进时钟指针，返回已加锁的牺牲项。调用者负责在复用前写回脏数据。
    pub fn select_victim(&self) -> LockedEntry<'_> {
        let mut hand = self.fill.lock();
        self.select_victim_locked(&mut hand)
    }

    /// 时钟扫描
    ///
    /// 对每个经过的槽位：无效或访问位为空则选中；否则清除访问位继续。
    /// 两轮之内找不到（只可能是并发命中不断置位）时强制选择指针下的槽位。
    pub(super) fn select_victim_locked(&self, hand: &mut SlotId) -> LockedEntry<'_> {
        let capacity = self.entries.len();

        for _ in 0..capacity * CLOCK_MAX_SWEEPS {
            let slot = *hand;
            *hand = slot.next(capacity);

            let mut entry = self.lock_slot(slot);
            if !entry.is_valid() || !entry.is_referenced() {
                return entry;
            }
            entry.clear_referenced();
        }

        let slot = *hand;
        *hand = slot.next(capacity);
        log::warn!(
            "[BCACHE] clock made {} sweeps without a cold entry, forcing slot {}",
            CLOCK_MAX_SWEEPS,
            slot
        );
        self.lock_slot(slot)
    }

    fn lock_slot(&self, slot: SlotId) -> LockedEntry<'_> {
        LockedEntry::new(slot, self.entries[slot.index()].lock())
    }

    /// 解析扇区对应的缓存项（命中或填充）
    ///
    /// 返回的缓存项已加锁且持有 `sector` 的最新数据。
    pub(super) fn resolve(&self, sector: u64) -> Result<LockedEntry<'_>> {
        self.ensure_open()?;
        self.check_sector(sector)?;

        StatCounters::bump(&self.stats.total_accesses);

        if let Some(mut entry) = self.lookup(sector) {
            StatCounters::bump(&self.stats.hits);
            entry.mark_referenced();
            log::trace!("[BCACHE] sector={} HIT slot={}", sector, entry.slot());
            return Ok(entry);
        }

        let mut hand = self.fill.lock();

        // 等待填充锁期间其他线程可能已经填入该扇区
        if let Some(mut entry) = self.lookup(sector) {
            StatCounters::bump(&self.stats.hits);
            entry.mark_referenced();
            log::trace!("[BCACHE] sector={} HIT slot={} (filled concurrently)", sector, entry.slot());
            return Ok(entry);
        }

        StatCounters::bump(&self.stats.misses);
        self.warn_if_dirty_heavy();

        let mut victim = self.select_victim_locked(&mut hand);
        if let Some(old) = victim.sector() {
            StatCounters::bump(&self.stats.evictions);
            log::debug!(
                "[BCACHE] sector={} MISS, evicting sector={} from slot={} (dirty={})",
                sector,
                old,
                victim.slot(),
                victim.is_dirty()
            );
        } else {
            log::debug!("[BCACHE] sector={} MISS, free slot={}", sector, victim.slot());
        }

        self.flush_entry(&mut victim)?;

        victim.rebind(sector);
        let tag = &self.tags[victim.slot().index()];
        tag.store(sector, Ordering::Release);
        if let Err(err) = self.device.lock().read_sector(sector, &mut victim.data) {
            log::error!("[BCACHE] fill of sector={} failed: {}", sector, err);
            victim.invalidate();
            tag.store(EMPTY_TAG, Ordering::Release);
            return Err(err);
        }
        drop(hand);

        Ok(victim)
    }

    /// 写回单个缓存项
    ///
    /// 仅当缓存项有效且为脏时写回并清除脏标志，否则什么也不做。
    /// 写入失败时缓存项保持为脏。
    ///
    /// # 返回
    ///
    /// 是否发生了写回
    pub fn flush_entry(&self, entry: &mut LockedEntry<'_>) -> Result<bool> {
        if !entry.is_valid() || !entry.is_dirty() {
            return Ok(false);
        }

        if let Err(err) = self.device.lock().write_sector(entry.sector, &entry.data) {
            log::error!("[BCACHE] write-back of sector={} failed: {}", entry.sector, err);
            return Err(err);
        }

        entry.mark_clean();
        self.dirty.fetch_sub(1, Ordering::Relaxed);
        StatCounters::bump(&self.stats.writebacks);
        log::debug!("[BCACHE] wrote back sector={} from slot={}", entry.sector, entry.slot());
        Ok(true)
    }

    /// 写回所有脏项
    ///
    /// 按表顺序逐项加锁、写回、解锁。不应与进行中的读写并发调用。
    ///
    /// # 返回
    ///
    /// 写回的缓存项数量
    pub fn flush_all(&self) -> Result<usize> {
        let mut flushed = 0;
        for index in 0..self.entries.len() {
            let mut entry = self.lock_slot(SlotId::new(index));
            if self.flush_entry(&mut entry)? {
                flushed += 1;
            }
        }
        if flushed > 0 {
            log::debug!("[BCACHE] flush_all wrote back {} entries", flushed);
        }
        Ok(flushed)
    }

    /// 写回指定扇区（如果已缓存且为脏）
    pub fn flush_sector(&self, sector: u64) -> Result<bool> {
        match self.lookup(sector) {
            Some(mut entry) => self.flush_entry(&mut entry),
            None => Ok(false),
        }
    }

    /// 扇区是否已缓存
    pub fn contains(&self, sector: u64) -> bool {
        self.lookup(sector).is_some()
    }

    /// 获取缓存统计信息
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_accesses: self.stats.total_accesses.load(Ordering::Relaxed),
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            writebacks: self.stats.writebacks.load(Ordering::Relaxed),
            dirty_entries: self.dirty_count(),
        }
    }

    /// 缓存容量（项数）
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// 扇区大小（字节）
    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    /// 设备总扇区数
    pub fn total_sectors(&self) -> u64 {
        self.total_sectors
    }

    /// 当前脏项数量
    pub fn dirty_count(&self) -> usize {
        self.dirty.load(Ordering::Relaxed)
    }

    /// 缓存是否已关闭
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub(super) fn ensure_open(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::new(ErrorKind::InvalidState, "cache has been shut down"));
        }
        Ok(())
    }

    pub(super) fn check_sector(&self, sector: u64) -> Result<()> {
        if sector >= self.total_sectors {
            return Err(Error::new(ErrorKind::OutOfRange, "sector beyond end of device"));
        }
        Ok(())
    }

    pub(super) fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::new(ErrorKind::ReadOnly, "device is read-only"));
        }
        Ok(())
    }

    /// 缓存项由干净变脏时调用
    pub(super) fn note_dirtied(&self) {
        self.dirty.fetch_add(1, Ordering::Relaxed);
    }

    fn warn_if_dirty_heavy(&self) {
        let dirty = self.dirty_count();
        let ratio = dirty * 100 / self.entries.len();
        if ratio > self.config.dirty_warn_percent as usize {
            log::warn!(
                "[BCACHE] High dirty ratio: {}/{} ({}%). Misses will write back before refill",
                dirty,
                self.entries.len(),
                ratio
            );
        }
    }
}

impl<D> core::fmt::Debug for BufferCache<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferCache")
            .field("capacity", &self.entries.len())
            .field("sector_size", &self.sector_size)
            .field("total_sectors", &self.total_sectors)
            .field("dirty", &self.dirty.load(Ordering::Relaxed))
            .field("shut_down", &self.shut_down.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemDisk;
    use alloc::vec;

    const SECTOR: usize = 512;

    fn cache_with(capacity: usize, sectors: u64) -> BufferCache<MemDisk> {
        BufferCache::new(MemDisk::new(SECTOR, sectors).unwrap(), CacheConfig::with_capacity(capacity)).unwrap()
    }

    fn touch(cache: &BufferCache<MemDisk>, sector: u64) {
        let mut out = [0u8; 1];
        cache.read(sector, &mut out, 0, 1, 0).unwrap();
    }

    /// 每个扇区最多对应一个有效项
    fn assert_unique(cache: &BufferCache<MemDisk>) {
        let mut seen = vec![];
        for slot in cache.entries.iter() {
            if let Some(sector) = slot.lock().sector() {
                assert!(!seen.contains(&sector), "sector {} cached twice", sector);
                seen.push(sector);
            }
        }
    }

    fn cached_sectors(cache: &BufferCache<MemDisk>) -> Vec<Option<u64>> {
        cache.entries.iter().map(|slot| slot.lock().sector()).collect()
    }

    #[test]
    fn test_cache_creation() {
        let cache = cache_with(8, 64);
        assert_eq!(cache.capacity(), 8);
        assert_eq!(cache.sector_size(), SECTOR);
        assert_eq!(cache.total_sectors(), 64);
        assert_eq!(cache.dirty_count(), 0);
        assert!(cached_sectors(&cache).iter().all(Option::is_none));
        assert!(!cache.is_shut_down());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = BufferCache::new(MemDisk::new(SECTOR, 8).unwrap(), CacheConfig::with_capacity(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_zero_sector_size_rejected() {
        let err = BufferCache::with_default_capacity(MemDisk::new(0, 8).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_default_capacity() {
        let cache = BufferCache::with_default_capacity(MemDisk::new(SECTOR, 8).unwrap()).unwrap();
        assert_eq!(cache.capacity(), crate::consts::DEFAULT_CACHE_ENTRIES);
    }

    #[test]
    fn test_lookup_miss_and_hit() {
        let cache = cache_with(4, 16);
        assert!(cache.lookup(3).is_none());

        touch(&cache, 3);
        let entry = cache.lookup(3).unwrap();
        assert_eq!(entry.sector(), Some(3));
        assert!(entry.is_valid());
        drop(entry);

        // 锁已在 drop 时释放，可以再次获取
        assert!(cache.contains(3));
    }

    #[test]
    fn test_lookup_skips_locked_unrelated_slot() {
        let cache = cache_with(4, 16);
        touch(&cache, 1);
        touch(&cache, 2);

        // 槽位 #0 持有扇区 1 且被锁住，查找排在它之后的扇区 2 不应等待
        let held = cache.lookup(1).unwrap();
        assert_eq!(held.slot(), SlotId::new(0));

        let entry = cache.lookup(2).unwrap();
        assert_eq!(entry.slot(), SlotId::new(1));
        drop(entry);

        // 未缓存的扇区同样立即返回
        assert!(cache.lookup(9).is_none());
        assert!(!cache.contains(9));
        drop(held);
    }

    #[test]
    fn test_failed_fill_clears_tag() {
        let cache = faulty_cache(2);
        cache.device.lock().fail_reads = true;

        let mut out = [0u8; 4];
        assert!(cache.read(5, &mut out, 0, 4, 0).is_err());
        assert!(cache.tags.iter().all(|tag| tag.load(Ordering::Acquire) == EMPTY_TAG));
    }

    #[test]
    fn test_select_victim_prefers_invalid() {
        let cache = cache_with(4, 16);
        let victim = cache.select_victim();
        assert_eq!(victim.slot().index(), 0);
        assert!(!victim.is_valid());
        drop(victim);

        let victim = cache.select_victim();
        assert_eq!(victim.slot().index(), 1);
    }

    #[test]
    fn test_select_victim_second_chance() {
        let cache = cache_with(4, 16);
        for sector in 1..=4 {
            touch(&cache, sector);
        }
        // 再次访问扇区 1，置位访问位
        touch(&cache, 1);

        let victim = cache.select_victim();
        assert_eq!(victim.sector(), Some(2));
        drop(victim);

        // 扇区 1 的访问位已被扫描清除
        assert!(!cache.lookup(1).unwrap().is_referenced());
    }

    #[test]
    fn test_clock_scenario() {
        let cache = cache_with(4, 16);
        for sector in [1, 2, 3, 4, 1, 5] {
            touch(&cache, sector);
        }

        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(3));
        assert!(cache.contains(4));
        assert!(cache.contains(5));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_clock_fairness() {
        let cache = cache_with(8, 64);
        for sector in 0..9 {
            touch(&cache, sector);
        }
        // 9 次不同扇区访问只替换一次，替换的是最早填入的扇区 0
        assert_eq!(cache.stats().evictions, 1);
        assert!(!cache.contains(0));
        for sector in 1..9 {
            assert!(cache.contains(sector));
        }
    }

    #[test]
    fn test_victim_search_is_total() {
        let cache = cache_with(3, 16);
        for sector in 0..3 {
            touch(&cache, sector);
            touch(&cache, sector);
        }
        // 所有项都被再次引用，仍然能选出牺牲项
        let victim = cache.select_victim();
        assert!(victim.is_valid());
        assert!(!victim.is_referenced());
    }

    #[test]
    fn test_uniqueness_under_churn() {
        let cache = cache_with(4, 32);
        let pattern = [1u64, 2, 3, 1, 4, 5, 2, 6, 1, 7, 3, 3, 8, 2, 1];
        for sector in pattern {
            touch(&cache, sector);
            assert_unique(&cache);
        }
    }

    #[test]
    fn test_flush_entry_noop_when_clean() {
        let cache = cache_with(4, 16);
        touch(&cache, 2);
        let mut entry = cache.lookup(2).unwrap();
        assert!(!cache.flush_entry(&mut entry).unwrap());
        drop(entry);

        let mut free = cache.select_victim();
        assert!(!free.is_valid());
        assert!(!cache.flush_entry(&mut free).unwrap());
        drop(free);

        assert_eq!(cache.stats().writebacks, 0);
    }

    #[test]
    fn test_flush_sector() {
        let cache = cache_with(4, 16);
        cache.write(6, &[0x5Au8; 4], 0, 4, 10).unwrap();
        assert_eq!(cache.dirty_count(), 1);

        assert!(cache.flush_sector(6).unwrap());
        assert!(!cache.flush_sector(6).unwrap());
        assert!(!cache.flush_sector(7).unwrap());
        assert_eq!(cache.dirty_count(), 0);
        assert!(cache.contains(6));
    }

    #[test]
    fn test_flush_all() {
        let cache = cache_with(8, 64);
        for sector in 0..5 {
            cache.write(sector, &[sector as u8 + 1; 8], 0, 8, 0).unwrap();
        }
        touch(&cache, 20);
        assert_eq!(cache.dirty_count(), 5);

        assert_eq!(cache.flush_all().unwrap(), 5);
        assert_eq!(cache.dirty_count(), 0);
        assert_eq!(cache.flush_all().unwrap(), 0);
        assert_eq!(cache.stats().writebacks, 5);
    }

    #[test]
    fn test_shutdown_persists_dirty_data() {
        let cache = cache_with(4, 16);
        cache.write(1, b"first", 0, 5, 0).unwrap();
        cache.write(9, b"second", 0, 6, 500).unwrap();
        cache.write(1, b"FIRST", 0, 5, 0).unwrap();

        let disk = cache.into_device().unwrap();
        assert_eq!(&disk.sector(1).unwrap()[..5], b"FIRST");
        assert_eq!(&disk.sector(9).unwrap()[500..506], b"second");
        assert_eq!(disk.physical_writes(), 2);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let cache = cache_with(4, 16);
        cache.write(3, &[1u8; 16], 0, 16, 0).unwrap();

        assert_eq!(cache.shutdown().unwrap(), 1);
        assert!(cache.is_shut_down());
        assert_eq!(cache.shutdown().unwrap(), 0);
    }

    #[test]
    fn test_io_after_shutdown_rejected() {
        let cache = cache_with(4, 16);
        cache.shutdown().unwrap();

        let mut out = [0u8; 4];
        let err = cache.read(0, &mut out, 0, 4, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let err = cache.write(0, &out, 0, 4, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_stats() {
        let cache = cache_with(4, 16);

        touch(&cache, 1);
        let stats = cache.stats();
        assert_eq!(stats.total_accesses, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);

        touch(&cache, 1);
        let stats = cache.stats();
        assert_eq!(stats.total_accesses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_rate(), 0.5);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    /// 可注入故障的设备
    struct FaultyDisk {
        inner: MemDisk,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl SectorDevice for FaultyDisk {
        fn sector_size(&self) -> usize {
            self.inner.sector_size()
        }

        fn total_sectors(&self) -> u64 {
            self.inner.total_sectors()
        }

        fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> Result<()> {
            if self.fail_reads {
                return Err(Error::new(ErrorKind::Io, "injected read failure"));
            }
            self.inner.read_sector(sector, buf)
        }

        fn write_sector(&mut self, sector: u64, buf: &[u8]) -> Result<()> {
            if self.fail_writes {
                return Err(Error::new(ErrorKind::Io, "injected write failure"));
            }
            self.inner.write_sector(sector, buf)
        }
    }

    fn faulty_cache(capacity: usize) -> BufferCache<FaultyDisk> {
        let disk = FaultyDisk {
            inner: MemDisk::new(SECTOR, 16).unwrap(),
            fail_reads: false,
            fail_writes: false,
        };
        BufferCache::new(disk, CacheConfig::with_capacity(capacity)).unwrap()
    }

    #[test]
    fn test_failed_fill_leaves_slot_invalid() {
        let cache = faulty_cache(2);
        cache.device.lock().fail_reads = true;

        let mut out = [0u8; 4];
        let err = cache.read(5, &mut out, 0, 4, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(cache.lookup(5).is_none());

        cache.device.lock().fail_reads = false;
        cache.read(5, &mut out, 0, 4, 0).unwrap();
        assert!(cache.lookup(5).is_some());
    }

    #[test]
    fn test_failed_writeback_keeps_dirty_victim() {
        let cache = faulty_cache(1);
        cache.write(2, b"keep", 0, 4, 0).unwrap();
        cache.device.lock().fail_writes = true;

        // 替换扇区 2 需要先写回，写回失败则整个读取失败
        let mut out = [0u8; 4];
        let err = cache.read(3, &mut out, 0, 4, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        let entry = cache.lookup(2).unwrap();
        assert!(entry.is_dirty());
        assert_eq!(&entry.data()[..4], b"keep");
        drop(entry);
        assert_eq!(cache.dirty_count(), 1);

        cache.device.lock().fail_writes = false;
        assert_eq!(cache.flush_all().unwrap(), 1);
        assert_eq!(&cache.device.lock().inner.sector(2).unwrap()[..4], b"keep");
    }

    #[test]
    fn test_concurrent_misses_same_sector() {
        use std::thread;

        let cache = cache_with(8, 64);
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        touch(&cache, 42);
                    }
                });
            }
        });

        assert_unique(&cache);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_concurrent_writers_disjoint_sectors() {
        use std::thread;

        let cache = cache_with(4, 64);
        thread::scope(|scope| {
            for worker in 0..4u64 {
                let cache = &cache;
                scope.spawn(move || {
                    for round in 0..32u64 {
                        let sector = worker * 8 + round % 8;
                        let byte = ((worker as u8) << 4) | (round % 8) as u8;
                        cache.write(sector, &[byte; 32], 0, 32, 64).unwrap();
                    }
                });
            }
        });
        assert_unique(&cache);

        let disk = cache.into_device().unwrap();
        for worker in 0..4u64 {
            for offset in 0..8u64 {
                let expected = ((worker as u8) << 4) | offset as u8;
                let data = disk.sector(worker * 8 + offset).unwrap();
                assert!(data[64..96].iter().all(|&b| b == expected));
                assert!(data[..64].iter().all(|&b| b == 0));
            }
        }
    }
}
