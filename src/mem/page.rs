//! Page-granular virtual memory primitives.
//!
//! Four operations over page-aligned address ranges: [`reserve`] an address
//! range without backing it, [`commit`] a sub-range with read/write pages,
//! [`decommit`] pages back to the OS while keeping the reservation, and
//! [`release`] the reservation itself. Reserving and committing disjoint
//! sub-ranges is equivalent to a single reserve+commit of their union, and
//! `release` frees a range regardless of how much of it is committed.

use std::ptr::NonNull;
use std::sync::OnceLock;

/// Size of a virtual memory page on this host.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(sys::query_page_size)
}

/// Reserve `size` bytes of address space. The pages are not accessible until
/// committed. Returns `None` when the address space is exhausted.
///
/// `size` must be a multiple of [`page_size`].
pub fn reserve(size: usize) -> Option<NonNull<u8>> {
    debug_assert!(size % page_size() == 0);
    NonNull::new(unsafe { sys::reserve(size) })
}

/// Back `[ptr, ptr+size)` with read/write pages.
///
/// # Safety
/// The range must lie within a reservation returned by [`reserve`], and
/// both `ptr` and `size` must be page-aligned.
pub unsafe fn commit(ptr: NonNull<u8>, size: usize) -> bool {
    sys::commit(ptr.as_ptr(), size)
}

/// Return the pages of `[ptr, ptr+size)` to the OS without releasing the
/// reservation. Their contents are lost; committing again yields zero pages.
///
/// # Safety
/// Same range requirements as [`commit`]; no live reference may point into
/// the range.
pub unsafe fn decommit(ptr: NonNull<u8>, size: usize) {
    sys::decommit(ptr.as_ptr(), size)
}

/// Release an entire reservation made by [`reserve`].
///
/// `size` must be the originally reserved size. (On Windows the OS tracks
/// the reservation length itself and the size is ignored.)
///
/// # Safety
/// `ptr` must be a reservation base that has not already been released, and
/// no live reference may point into it.
pub unsafe fn release(ptr: NonNull<u8>, size: usize) {
    sys::release(ptr.as_ptr(), size)
}

#[cfg(unix)]
mod sys {
    use std::ptr;

    pub fn query_page_size() -> usize {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        usize::try_from(size).unwrap_or(4096)
    }

    // MAP_NORESERVE keeps large reservations out of overcommit accounting
    // where the platform has it.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANON;

    pub unsafe fn reserve(size: usize) -> *mut u8 {
        let ptr = libc::mmap(ptr::null_mut(), size, libc::PROT_NONE, MAP_FLAGS, -1, 0);
        if ptr == libc::MAP_FAILED {
            ptr::null_mut()
        } else {
            ptr.cast()
        }
    }

    pub unsafe fn commit(ptr: *mut u8, size: usize) -> bool {
        libc::mprotect(ptr.cast(), size, libc::PROT_READ | libc::PROT_WRITE) == 0
    }

    pub unsafe fn decommit(ptr: *mut u8, size: usize) {
        libc::madvise(ptr.cast(), size, libc::MADV_DONTNEED);
        libc::mprotect(ptr.cast(), size, libc::PROT_NONE);
    }

    pub unsafe fn release(ptr: *mut u8, size: usize) {
        libc::munmap(ptr.cast(), size);
    }
}

#[cfg(windows)]
mod sys {
    use std::mem::MaybeUninit;
    use std::ptr;

    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE,
        PAGE_NOACCESS, PAGE_READWRITE,
    };
    use windows_sys::Win32::System::SystemInformation::GetSystemInfo;

    pub fn query_page_size() -> usize {
        let mut info = MaybeUninit::uninit();
        unsafe {
            GetSystemInfo(info.as_mut_ptr());
            info.assume_init().dwPageSize as usize
        }
    }

    pub unsafe fn reserve(size: usize) -> *mut u8 {
        VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS).cast()
    }

    pub unsafe fn commit(ptr: *mut u8, size: usize) -> bool {
        !VirtualAlloc(ptr.cast(), size, MEM_COMMIT, PAGE_READWRITE).is_null()
    }

    pub unsafe fn decommit(ptr: *mut u8, size: usize) {
        VirtualFree(ptr.cast(), size, MEM_DECOMMIT);
    }

    pub unsafe fn release(ptr: *mut u8, _size: usize) {
        VirtualFree(ptr.cast(), 0, MEM_RELEASE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_a_power_of_two() {
        assert!(page_size().is_power_of_two());
    }

    #[test]
    fn reserve_commit_write_release() {
        let size = page_size() * 4;
        let ptr = reserve(size).unwrap();
        unsafe {
            assert!(commit(ptr, page_size()));
            // Committed pages are zeroed and writable.
            assert_eq!(ptr.as_ptr().read(), 0);
            ptr.as_ptr().write(0xAB);
            assert_eq!(ptr.as_ptr().read(), 0xAB);
            release(ptr, size);
        }
    }

    #[test]
    fn commit_of_disjoint_ranges_is_cumulative() {
        let page = page_size();
        let ptr = reserve(page * 2).unwrap();
        unsafe {
            assert!(commit(ptr, page));
            let second = NonNull::new_unchecked(ptr.as_ptr().add(page));
            assert!(commit(second, page));
            ptr.as_ptr().write(1);
            second.as_ptr().write(2);
            assert_eq!(ptr.as_ptr().read(), 1);
            assert_eq!(second.as_ptr().read(), 2);
            release(ptr, page * 2);
        }
    }

    #[test]
    fn decommit_keeps_the_reservation_usable() {
        let page = page_size();
        let ptr = reserve(page).unwrap();
        unsafe {
            assert!(commit(ptr, page));
            ptr.as_ptr().write(7);
            decommit(ptr, page);
            // Recommitting after a decommit hands back zero pages.
            assert!(commit(ptr, page));
            assert_eq!(ptr.as_ptr().read(), 0);
            release(ptr, page);
        }
    }
}
