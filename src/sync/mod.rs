//! Spin based locking primitives
//!
//! `ReadWriteLock` is a single mutual exclusion flag with two acquisition
//! names. Read and write acquisitions exclude each other *and themselves*:
//! this is not a multi-reader lock. Critical sections guarded by it are
//! expected to be short (map lookups, a position write), so waiting threads
//! spin instead of parking.

mod rwlock;

pub use rwlock::{ReadWriteLock, ScopedReadLock, ScopedWriteLock};
