//! Physical memory window mapped from `/dev/mem`.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, IntoRawFd};
use std::path::PathBuf;
use std::ptr::NonNull;

use crate::err::MapError;
use crate::mems::MemoryWindow;
use crate::regs::{CONFPORT_BASE_ADDRESS, CONFPORT_SIZE_BYTES};

pub const DEFAULT_DEVICE: &str = "/dev/mem";

/// Where and how to map the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    pub device: PathBuf,
    /// Physical address of the first byte of the window.
    pub base: u64,
    pub size: usize,
    /// Pin all current and future process pages with `mlockall`.
    pub lock_pages: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            base: CONFPORT_BASE_ADDRESS,
            size: CONFPORT_SIZE_BYTES,
            lock_pages: true,
        }
    }
}

/// A live mapping of the physical window.
///
/// Either fully established (device open, window mapped, pages locked when
/// requested) or not constructed at all. Unlocking, unmapping and closing
/// happen exactly once, on [`DevMem::teardown`] or drop.
#[derive(Debug)]
pub struct DevMem {
    mapping: NonNull<u8>,
    map_len: usize,
    // Distance from the page boundary to the requested base
    page_offset: usize,
    size: usize,
    base: u64,
    file: Option<File>,
    locked: bool,
    released: bool,
}

impl DevMem {
    pub fn open(config: &MapConfig) -> Result<Self, MapError> {
        log::debug!(
            "mapping {} bytes at 0x{:x} from {}",
            config.size,
            config.base,
            config.device.display()
        );

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&config.device)
            .map_err(|e| MapError::open(&config.device, e))?;

        let page_size = page_size();
        let page_offset = (config.base % page_size as u64) as usize;
        let map_base = config.base - page_offset as u64;
        let map_len = config.size + page_offset;
        let file_offset = libc::off_t::try_from(map_base).map_err(|_| {
            MapError::map(
                config.base,
                config.size,
                io::Error::from_raw_os_error(libc::EOVERFLOW),
            )
        })?;

        // SAFETY: a fresh shared mapping of an open descriptor; the result is
        // checked against MAP_FAILED before use.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_POPULATE,
                file.as_raw_fd(),
                file_offset,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(MapError::map(
                config.base,
                config.size,
                io::Error::last_os_error(),
            ));
        }
        let mapping = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| {
            MapError::map(
                config.base,
                config.size,
                io::Error::from_raw_os_error(libc::EINVAL),
            )
        })?;

        // From here on, dropping `devmem` unmaps and closes.
        let mut devmem = DevMem {
            mapping,
            map_len,
            page_offset,
            size: config.size,
            base: config.base,
            file: Some(file),
            locked: false,
            released: false,
        };

        if config.lock_pages {
            // SAFETY: plain syscall without pointer arguments.
            if unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) } != 0 {
                return Err(MapError::Lock {
                    source: io::Error::last_os_error(),
                });
            }
            devmem.locked = true;
        }

        log::debug!("window mapped at {:p}", devmem.mapping);
        Ok(devmem)
    }

    /// Physical address of the first byte of the window.
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Unlock, unmap and close. Failures are logged, not returned.
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.locked {
            // SAFETY: plain syscall without pointer arguments.
            if unsafe { libc::munlockall() } != 0 {
                log::warn!("cannot unlock process pages: {}", io::Error::last_os_error());
            }
            self.locked = false;
        }

        // SAFETY: `mapping`/`map_len` are exactly what mmap returned, and
        // `released` guarantees this runs once.
        if unsafe { libc::munmap(self.mapping.as_ptr().cast(), self.map_len) } != 0 {
            log::warn!("cannot unmap window: {}", io::Error::last_os_error());
        }

        if let Some(file) = self.file.take() {
            let fd = file.into_raw_fd();
            // SAFETY: `fd` was just released from its owning File.
            if unsafe { libc::close(fd) } != 0 {
                log::warn!("cannot close device: {}", io::Error::last_os_error());
            }
        }
        log::debug!("window at 0x{:x} released", self.base);
    }

    fn byte_ptr(&self, offset: usize) -> *mut u8 {
        assert!(
            offset < self.size,
            "offset 0x{offset:x} outside {}-byte window",
            self.size
        );
        // SAFETY: page_offset + offset < map_len, so this stays inside the mapping.
        unsafe { self.mapping.as_ptr().add(self.page_offset + offset) }
    }
}

impl MemoryWindow for DevMem {
    fn size(&self) -> usize {
        self.size
    }

    fn load(&self, offset: usize) -> u8 {
        // SAFETY: byte_ptr bounds-checks; device memory needs volatile access.
        unsafe { std::ptr::read_volatile(self.byte_ptr(offset)) }
    }

    fn store(&mut self, offset: usize, value: u8) {
        // SAFETY: byte_ptr bounds-checks; device memory needs volatile access.
        unsafe { std::ptr::write_volatile(self.byte_ptr(offset), value) }
    }
}

impl Drop for DevMem {
    fn drop(&mut self) {
        self.release();
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as usize } else { 4096 }
}
