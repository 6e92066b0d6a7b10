//! Versioned registers
//!
//! A [`Reg`] is a shared cell whose version bumps on every write. A
//! [`DerivedReg`] computes its value from other registers and only recomputes
//! when one of their versions has moved since it last looked. Nothing is
//! pushed: readers pull, so a derived value is always consistent with its
//! sources at the moment it is read.
//!
//! Handles are cheap to clone and share the same underlying cell, which is
//! how the chip hands the same register to several nodes.

use parking_lot::Mutex;
use std::sync::Arc;

/// Anything that carries a write version.
pub trait Versioned: Send + Sync {
    /// Current version. Strictly increases whenever the value may have changed.
    fn version(&self) -> u64;
}

/// A versioned source of `T` values, either plain or derived.
pub trait Readable<T>: Versioned {
    /// Current value.
    fn value(&self) -> T;
}

#[derive(Debug)]
struct Cell<T> {
    value: T,
    version: u64,
}

/// Plain register: a value plus a write counter.
#[derive(Debug)]
pub struct Reg<T> {
    cell: Arc<Mutex<Cell<T>>>,
}

impl<T> Clone for Reg<T> {
    fn clone(&self) -> Self {
        Reg {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Copy + Send + 'static> Reg<T> {
    /// Create a register. The initial value counts as the first write.
    pub fn new(value: T) -> Self {
        Reg {
            cell: Arc::new(Mutex::new(Cell { value, version: 1 })),
        }
    }

    /// Write a value. The version bumps even if the value is unchanged.
    pub fn set(&self, value: T) {
        let mut cell = self.cell.lock();
        cell.value = value;
        cell.version += 1;
    }

    /// Read the current value.
    pub fn value(&self) -> T {
        self.cell.lock().value
    }

    /// Read the current version.
    pub fn version(&self) -> u64 {
        self.cell.lock().version
    }
}

impl<T: Copy + Send + 'static> Versioned for Reg<T> {
    fn version(&self) -> u64 {
        Reg::version(self)
    }
}

impl<T: Copy + Send + 'static> Readable<T> for Reg<T> {
    fn value(&self) -> T {
        Reg::value(self)
    }
}

type Transform<T> = Box<dyn Fn() -> T + Send + Sync>;

struct DerivedState<T> {
    value: T,
    version: u64,
    seen: Vec<u64>,
}

struct DerivedInner<T> {
    sources: Vec<Box<dyn Versioned>>,
    transform: Transform<T>,
    state: Mutex<DerivedState<T>>,
}

impl<T: Copy> DerivedInner<T> {
    fn source_versions(&self) -> Vec<u64> {
        self.sources.iter().map(|s| s.version()).collect()
    }

    fn refresh<'a>(
        &self,
        state: &'a mut DerivedState<T>,
    ) -> &'a mut DerivedState<T> {
        let current = self.source_versions();
        if current != state.seen {
            state.value = (self.transform)();
            state.version += 1;
            state.seen = current;
        }
        state
    }
}

/// Register computed lazily from other registers.
///
/// The transform closure captures its own source handles; the `sources` list
/// passed alongside it is what gets version-checked.
pub struct DerivedReg<T> {
    inner: Arc<DerivedInner<T>>,
}

impl<T> Clone for DerivedReg<T> {
    fn clone(&self) -> Self {
        DerivedReg {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Copy + Send + 'static> DerivedReg<T> {
    /// Build from explicit sources and a transform reading them.
    pub fn new<F>(sources: Vec<Box<dyn Versioned>>, transform: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let seen = sources.iter().map(|s| s.version()).collect();
        let value = transform();
        DerivedReg {
            inner: Arc::new(DerivedInner {
                sources,
                transform: Box::new(transform),
                state: Mutex::new(DerivedState {
                    value,
                    version: 1,
                    seen,
                }),
            }),
        }
    }

    /// Derive from a single source.
    pub fn map<S, R, F>(source: &R, f: F) -> Self
    where
        S: 'static,
        R: Readable<S> + Clone + 'static,
        F: Fn(S) -> T + Send + Sync + 'static,
    {
        let src = source.clone();
        let sources: Vec<Box<dyn Versioned>> = vec![Box::new(source.clone())];
        DerivedReg::new(sources, move || f(src.value()))
    }

    /// Derive from two sources.
    pub fn map2<A, B, RA, RB, F>(a: &RA, b: &RB, f: F) -> Self
    where
        A: 'static,
        B: 'static,
        RA: Readable<A> + Clone + 'static,
        RB: Readable<B> + Clone + 'static,
        F: Fn(A, B) -> T + Send + Sync + 'static,
    {
        let (sa, sb) = (a.clone(), b.clone());
        let sources: Vec<Box<dyn Versioned>> = vec![Box::new(a.clone()), Box::new(b.clone())];
        DerivedReg::new(sources, move || f(sa.value(), sb.value()))
    }

    /// Override the value until the next source write.
    pub fn set(&self, value: T) {
        let mut state = self.inner.state.lock();
        state.seen = self.inner.source_versions();
        state.value = value;
        state.version += 1;
    }

    /// Read the value, recomputing first if any source moved.
    pub fn value(&self) -> T {
        let mut state = self.inner.state.lock();
        self.inner.refresh(&mut state).value
    }

    /// Read the version, recomputing first if any source moved.
    pub fn version(&self) -> u64 {
        let mut state = self.inner.state.lock();
        self.inner.refresh(&mut state).version
    }
}

impl<T: Copy + Send + 'static> Versioned for DerivedReg<T> {
    fn version(&self) -> u64 {
        DerivedReg::version(self)
    }
}

impl<T: Copy + Send + 'static> Readable<T> for DerivedReg<T> {
    fn value(&self) -> T {
        DerivedReg::value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_reg_version_bumps_on_every_write() {
        let r = Reg::new(5u8);
        assert_eq!(r.version(), 1);
        r.set(5);
        assert_eq!(r.version(), 2, "unchanged value still counts as a write");
        r.set(6);
        assert_eq!(r.value(), 6);
        assert_eq!(r.version(), 3);
    }

    #[test]
    fn test_clones_share_cell() {
        let r = Reg::new(0u16);
        let alias = r.clone();
        alias.set(0x123);
        assert_eq!(r.value(), 0x123);
    }

    #[test]
    fn test_derived_recomputes_only_after_source_write() {
        let lo = Reg::new(0x34u8);
        let hi = Reg::new(0x12u8);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (l, h) = (lo.clone(), hi.clone());
        let sources: Vec<Box<dyn Versioned>> = vec![Box::new(lo.clone()), Box::new(hi.clone())];
        let period = DerivedReg::new(sources, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ((h.value() as u32 & 0x0f) << 8) | l.value() as u32
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(period.value(), 0x234);
        assert_eq!(period.value(), 0x234);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no source write, no recompute");

        hi.set(0x0f);
        assert_eq!(period.value(), 0xf34);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_derived_version_tracks_sources() {
        let r = Reg::new(3u8);
        let d = DerivedReg::map(&r, |v: u8| v as u32 * 2);
        let v0 = d.version();
        assert_eq!(d.version(), v0);
        r.set(3);
        assert!(d.version() > v0, "source write must advance derived version");
        assert_eq!(d.value(), 6);
    }

    #[test]
    fn test_derived_direct_write_overrides_until_source_changes() {
        let r = Reg::new(1u8);
        let d = DerivedReg::map(&r, |v: u8| v + 1);
        d.set(100);
        assert_eq!(d.value(), 100);
        r.set(4);
        assert_eq!(d.value(), 5);
    }

    #[test]
    fn test_derived_chains() {
        let r = Reg::new(2u8);
        let d1 = DerivedReg::map(&r, |v: u8| v as u32 * 10);
        let d2 = DerivedReg::map(&d1, |v: u32| v + 1);
        assert_eq!(d2.value(), 21);
        r.set(3);
        assert_eq!(d2.value(), 31);
    }
}
