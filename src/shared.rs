use core::cell::Cell;

use critical_section::{CriticalSection, Mutex};

use crate::vthread::{dispatch, Continuation, Resume, ResumePoint, Step};

#[derive(Copy, Clone)]
struct Slot<P> {
    ip: Continuation<P>,
    /// set by an external write, cleared when an invocation starts
    overridden: bool,
}

/// Continuation cell that can live in a `static` and be touched from
/// several execution contexts.
///
/// The body itself runs outside of any critical section. Only reading the
/// saved position and storing the outcome are done with interrupts masked.
/// If `seek`, `restart` or `stop` is called while the body is running (e.g.
/// from an interrupt handler), the body's own outcome is dropped and the
/// external request is what the next invocation sees.
///
/// Invocations of one body still have to be serialized by the caller.
pub struct SharedVThread<P> {
    inner: Mutex<Cell<Slot<P>>>,
}

impl<P: ResumePoint> Default for SharedVThread<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ResumePoint> SharedVThread<P> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Slot {
                ip: Continuation::Entry,
                overridden: false,
            })),
        }
    }

    fn with_cs<F, R>(&self, cs: CriticalSection, f: F) -> R
    where
        F: FnOnce(&mut Slot<P>) -> R,
    {
        let cell = self.inner.borrow(cs);
        let mut slot = cell.get();
        let result = f(&mut slot);
        cell.set(slot);
        result
    }

    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Slot<P>) -> R,
    {
        critical_section::with(|cs| self.with_cs(cs, f))
    }

    fn overwrite(&self, ip: Continuation<P>) {
        self.with(|slot| {
            slot.ip = ip;
            slot.overridden = true;
        })
    }

    pub fn init(&self) {
        log::trace!("vthreads: init");
        self.overwrite(Continuation::Entry);
    }

    pub fn restart(&self) {
        self.init();
    }

    /// Make the next invocation resume at `mark`.
    pub fn seek(&self, mark: P) {
        log::trace!("vthreads: seek to {:?}", mark);
        self.overwrite(Continuation::At(mark));
    }

    pub fn stop(&self) {
        log::trace!("vthreads: stop");
        self.overwrite(Continuation::Terminal);
    }

    pub fn get(&self) -> Continuation<P> {
        self.with(|slot| slot.ip)
    }

    pub fn is_stopped(&self) -> bool {
        self.get().is_terminal()
    }

    /// Invoke the thread body once, see [`crate::VThread::run`].
    pub fn run<F>(&self, body: F) -> Continuation<P>
    where
        F: FnMut(Resume<P>) -> Step<P>,
    {
        let ip = self.with(|slot| {
            slot.overridden = false;
            slot.ip
        });
        if ip.is_terminal() {
            return ip;
        }

        let next = dispatch(ip, body);

        self.with(|slot| {
            if !slot.overridden {
                slot.ip = next;
            }
            slot.ip
        })
    }
}
