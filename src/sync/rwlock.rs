use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// Spins before yielding the time slice to the OS scheduler
const SPINS_BEFORE_YIELD: u32 = 64;

/// Named spin lock owning the data it protects
///
/// `lock_read` and `lock_write` are semantically identical; both hand out
/// exclusive access. The lock is not reentrant.
pub struct ReadWriteLock<T: ?Sized> {
    name: &'static str,
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by `locked`; a guard only exists
// while the flag is held by its creator.
unsafe impl<T: ?Sized + Send> Send for ReadWriteLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for ReadWriteLock<T> {}

impl<T> ReadWriteLock<T> {
    pub const fn new(name: &'static str, data: T) -> Self {
        Self {
            name,
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> ReadWriteLock<T> {
    /// Name given at construction, used in logs and debugger output
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether some thread currently holds the lock
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn lock_read(&self) -> ScopedReadLock<'_, T> {
        self.acquire();
        ScopedReadLock {
            lock: self,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn lock_write(&self) -> ScopedWriteLock<'_, T> {
        self.acquire();
        ScopedWriteLock {
            lock: self,
            _marker: PhantomData,
        }
    }

    pub fn try_lock_read(&self) -> Option<ScopedReadLock<'_, T>> {
        self.try_acquire().then(|| ScopedReadLock {
            lock: self,
            _marker: PhantomData,
        })
    }

    pub fn try_lock_write(&self) -> Option<ScopedWriteLock<'_, T>> {
        self.try_acquire().then(|| ScopedWriteLock {
            lock: self,
            _marker: PhantomData,
        })
    }

    /// Run `f` with read access; the lock is released when `f` returns or unwinds
    pub fn with_read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock_read();
        f(&guard)
    }

    /// Run `f` with write access; the lock is released when `f` returns or unwinds
    pub fn with_write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock_write();
        f(&mut guard)
    }

    /// Exclusive access through `&mut self` needs no locking
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn acquire(&self) {
        let mut spins = 0u32;
        while !self.try_acquire() {
            // Wait on a plain load so contended threads don't bounce the cache line
            while self.locked.load(Ordering::Relaxed) {
                if spins < SPINS_BEFORE_YIELD {
                    spins += 1;
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
            }
        }
    }

    #[inline]
    fn release(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl<T: Default> Default for ReadWriteLock<T> {
    fn default() -> Self {
        Self::new("unnamed", T::default())
    }
}

impl<T: ?Sized> fmt::Debug for ReadWriteLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadWriteLock")
            .field("name", &self.name)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Guard returned by [`ReadWriteLock::lock_read`]
///
/// Shareable between threads only when `T: Sync`:
///
/// ```compile_fail
/// use std::cell::Cell;
/// use simpleai_kernel::sync::ScopedReadLock;
///
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<ScopedReadLock<'static, Cell<i32>>>();
/// ```
pub struct ScopedReadLock<'a, T: ?Sized> {
    lock: &'a ReadWriteLock<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<T: ?Sized> Deref for ScopedReadLock<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: the guard holds the lock flag
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for ScopedReadLock<'_, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Guard returned by [`ReadWriteLock::lock_write`]
///
/// ```compile_fail
/// use std::cell::Cell;
/// use simpleai_kernel::sync::ScopedWriteLock;
///
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<ScopedWriteLock<'static, Cell<i32>>>();
/// ```
pub struct ScopedWriteLock<'a, T: ?Sized> {
    lock: &'a ReadWriteLock<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<T: ?Sized> Deref for ScopedWriteLock<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: the guard holds the lock flag
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for ScopedWriteLock<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard holds the lock flag exclusively
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for ScopedWriteLock<'_, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
