//! A chained reserve/commit bump allocator.
//!
//! An [`Arena`] owns a chain of virtual-memory mappings. Each mapping
//! reserves a large address range up front and commits pages lazily as the
//! bump position advances, so creating an arena is cheap regardless of the
//! reserve size. When the tail mapping is exhausted a new one is linked onto
//! the chain (recycled from a free list when possible), which makes `push`
//! infallible short of genuine address-space or memory exhaustion.
//!
//! Positions returned by [`Arena::pos`] are *global*: they address the whole
//! chain, so a position captured before a burst of allocations can be
//! restored with [`Arena::pop_to`] even if the burst spilled into new
//! mappings. Popped mappings land on a free list and are reused by later
//! growth instead of going back to the OS.
//!
//! There is no individual free and no resize; the only ways back are
//! [`Arena::pop_to`], [`Arena::clear`] and dropping the arena.

use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::{self, NonNull};

use crate::mem::page;
use crate::result::{Error, ZipResult};

/// Bytes at the start of every mapping occupied by its [`Header`].
/// Allocations start at or after this offset.
pub const ARENA_HEADER_SIZE: usize = 128;

/// Arena bookkeeping, laid out at offset 0 of each mapping.
///
/// `current`, `free_last`, `free_size` and `free_count` are meaningful on
/// the head arena only; tail and free-listed arenas leave them untouched.
#[repr(C)]
struct Header {
    /// Size of this mapping's reserved address range.
    reserved: usize,
    /// Prefix of the range currently backed by committed pages.
    committed: usize,
    /// Commit-grow granularity, page-rounded.
    commit_size: usize,
    /// Bump offset from the mapping base.
    /// `ARENA_HEADER_SIZE <= pos <= committed <= reserved` always holds.
    pos: usize,
    /// Sum of the reserved sizes of all predecessors in the active chain.
    base_pos: usize,
    /// Previous arena in the active chain, or the next-older free-list
    /// member once this arena has been retired.
    prev: *mut Header,
    current: *mut Header,
    free_last: *mut Header,
    free_size: usize,
    free_count: usize,
}

const _: () = assert!(std::mem::size_of::<Header>() <= ARENA_HEADER_SIZE);

const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Reserve and commit one mapping and write its header.
fn map_arena(reserve_size: usize, commit_size: usize, base_pos: usize) -> ZipResult<*mut Header> {
    let page = page::page_size();
    let reserved = align_up(reserve_size.max(ARENA_HEADER_SIZE), page);
    let commit_size = align_up(commit_size.max(1), page);
    let committed = commit_size.min(reserved);

    let base = page::reserve(reserved).ok_or(Error::OutOfMemory)?;
    if !unsafe { page::commit(base, committed) } {
        unsafe { page::release(base, reserved) };
        return Err(Error::OutOfMemory);
    }

    let header = base.as_ptr().cast::<Header>();
    unsafe {
        ptr::write(
            header,
            Header {
                reserved,
                committed,
                commit_size,
                pos: ARENA_HEADER_SIZE,
                base_pos,
                prev: ptr::null_mut(),
                current: ptr::null_mut(),
                free_last: ptr::null_mut(),
                free_size: 0,
                free_count: 0,
            },
        );
    }
    Ok(header)
}

/// A reserve/commit bump allocator with LIFO checkpoints.
///
/// The arena is single-owner and thread-confined; it is neither `Send` nor
/// `Sync`. Allocation hands out raw pointers — every consumer in this crate
/// wraps them behind safe borrow-checked types ([`ArenaBuf`], the slices
/// returned by extraction), which is what keeps [`pop_to`](Arena::pop_to)
/// sound: rewinding requires `&mut self`, so it cannot run while any such
/// borrow is alive.
///
/// ```
/// use zipflate::mem::Arena;
///
/// let mut arena = Arena::with_capacity(1 << 20, 1 << 16)?;
/// let mark = arena.pos();
/// arena.push(4096, 8)?;
/// arena.pop_to(mark);
/// assert_eq!(arena.pos(), mark);
/// # Ok::<(), zipflate::Error>(())
/// ```
pub struct Arena {
    head: NonNull<Header>,
    _confined: PhantomData<*mut u8>,
}

impl Arena {
    /// Create the head arena: reserve `reserve_size` bytes of address space
    /// and commit the first `commit_size` of them (both page-rounded).
    /// `commit_size` is also the granularity by which the committed region
    /// grows on demand.
    pub fn with_capacity(reserve_size: usize, commit_size: usize) -> ZipResult<Arena> {
        let head = map_arena(reserve_size, commit_size, 0)?;
        unsafe { (*head).current = head };
        Ok(Arena {
            head: unsafe { NonNull::new_unchecked(head) },
            _confined: PhantomData,
        })
    }

    /// Bump-allocate `size` bytes aligned to `align` (a power of two no
    /// larger than the page size). The returned range lies within committed
    /// pages and stays valid until a checkpoint at or below it is restored.
    pub fn push(&self, size: usize, align: usize) -> ZipResult<NonNull<u8>> {
        debug_assert!(align.is_power_of_two() && align <= page::page_size());
        unsafe {
            let head = self.head.as_ptr();
            // One attempt against the current tail, one growth, one retry.
            for attempt in 0..2 {
                let c = (*head).current;
                let start = align_up((*c).pos, align);
                let end = match start.checked_add(size) {
                    Some(end) => end,
                    None => return Err(Error::OutOfMemory),
                };
                if end <= (*c).reserved {
                    if end > (*c).committed {
                        let target = align_up(end, (*c).commit_size).min((*c).reserved);
                        let from = c.cast::<u8>().add((*c).committed);
                        let grow = target - (*c).committed;
                        if !page::commit(NonNull::new_unchecked(from), grow) {
                            return Err(Error::OutOfMemory);
                        }
                        (*c).committed = target;
                    }
                    (*c).pos = end;
                    return Ok(NonNull::new_unchecked(c.cast::<u8>().add(start)));
                }
                if attempt == 0 {
                    self.grow(size, align)?;
                }
            }
            Err(Error::OutOfMemory)
        }
    }

    /// Link a new tail arena: the most recently retired free-list member if
    /// it can hold a `(size, align)` request, a fresh mapping with the
    /// current tail's sizing otherwise.
    unsafe fn grow(&self, size: usize, align: usize) -> ZipResult<()> {
        let head = self.head.as_ptr();
        let c = (*head).current;
        let needed = align_up(ARENA_HEADER_SIZE, align).saturating_add(size);

        // LIFO recycling: only the last-retired arena is inspected. A miss
        // falls through to a fresh mapping, keeping growth O(1).
        let free = (*head).free_last;
        let new = if !free.is_null() && (*free).reserved >= needed {
            (*head).free_last = (*free).prev;
            (*head).free_size -= (*free).reserved;
            (*head).free_count -= 1;
            free
        } else {
            map_arena((*c).reserved, (*c).commit_size, 0)?
        };

        (*new).prev = c;
        (*new).base_pos = (*c).base_pos + (*c).reserved;
        (*new).pos = ARENA_HEADER_SIZE;
        (*head).current = new;
        Ok(())
    }

    /// Current global position: the total of predecessor reserves plus the
    /// tail's bump offset. Monotonically increasing under `push`; restored
    /// exactly by [`pop_to`](Arena::pop_to).
    pub fn pos(&self) -> usize {
        unsafe {
            let c = (*self.head.as_ptr()).current;
            (*c).base_pos + (*c).pos
        }
    }

    /// Rewind to a position previously returned by [`pos`](Arena::pos).
    /// Tail arenas that lie entirely above `pos` move to the free list.
    pub fn pop_to(&mut self, pos: usize) {
        unsafe { self.rewind_unchecked(pos) }
    }

    /// Rewind without the exclusive borrow.
    ///
    /// # Safety
    /// No pointer handed out at or above `pos` may be used again.
    pub(crate) unsafe fn rewind_unchecked(&self, pos: usize) {
        let head = self.head.as_ptr();
        let mut c = (*head).current;
        while c != head && (*c).base_pos >= pos {
            let prev = (*c).prev;
            (*c).prev = (*head).free_last;
            (*head).free_last = c;
            (*head).free_size += (*c).reserved;
            (*head).free_count += 1;
            c = prev;
        }
        (*head).current = c;
        if pos >= (*c).base_pos && pos < (*c).base_pos + (*c).reserved {
            (*c).pos = (pos - (*c).base_pos).max(ARENA_HEADER_SIZE);
        }
    }

    /// Retire every tail arena and reset the head: equivalent to rewinding
    /// to the head's first usable byte.
    pub fn clear(&mut self) {
        self.pop_to(ARENA_HEADER_SIZE);
    }

    /// Open a scoped checkpoint. Everything pushed through the guard (or
    /// through the `&Arena` it derefs to) is reclaimed when the guard drops,
    /// on every exit path.
    pub fn scratch(&mut self) -> Scratch<'_> {
        Scratch {
            saved: self.pos(),
            arena: self,
        }
    }

    /// Number of retired arenas currently on the free list.
    pub fn free_count(&self) -> usize {
        unsafe { (*self.head.as_ptr()).free_count }
    }

    /// Total reserved bytes held by the free list.
    pub fn free_size(&self) -> usize {
        unsafe { (*self.head.as_ptr()).free_size }
    }

    /// Total address space reserved by this arena: the active chain plus
    /// the free list. Grows only when a fresh mapping is created.
    pub fn footprint(&self) -> usize {
        unsafe {
            let head = self.head.as_ptr();
            let mut total = 0;
            let mut c = (*head).current;
            while !c.is_null() {
                total += (*c).reserved;
                c = if c == head { ptr::null_mut() } else { (*c).prev };
            }
            total + (*head).free_size
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe {
            let head = self.head.as_ptr();

            let mut c = (*head).current;
            while c != head {
                let prev = (*c).prev;
                let reserved = (*c).reserved;
                page::release(NonNull::new_unchecked(c.cast()), reserved);
                c = prev;
            }

            let mut f = (*head).free_last;
            while !f.is_null() {
                let prev = (*f).prev;
                let reserved = (*f).reserved;
                page::release(NonNull::new_unchecked(f.cast()), reserved);
                f = prev;
            }

            let reserved = (*head).reserved;
            page::release(NonNull::new_unchecked(head.cast()), reserved);
        }
    }
}

/// A scoped arena checkpoint.
///
/// Created by [`Arena::scratch`]; rewinds the arena to the captured position
/// when dropped. Holding the exclusive borrow for its whole lifetime is what
/// lets the rewind be unconditional: no allocation made before the guard can
/// be invalidated by it, and none made through it survives it.
pub struct Scratch<'a> {
    arena: &'a Arena,
    saved: usize,
}

impl Scratch<'_> {
    /// The position this guard will rewind to.
    pub fn saved_pos(&self) -> usize {
        self.saved
    }
}

impl Deref for Scratch<'_> {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        self.arena
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        unsafe { self.arena.rewind_unchecked(self.saved) }
    }
}
