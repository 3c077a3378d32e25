use riot_rs_runqueue::{RunQueue, RunqueueId};

pub use riot_rs_runqueue::ThreadId;

use crate::arch;

/// all virtual threads share one round-robin queue
const RUNQUEUE: RunqueueId = 0;

/// A virtual thread as seen by [`ThreadSet`]: a body together with its
/// continuation cell.
pub trait VirtualThread {
    /// Invoke the body once.
    fn invoke(&mut self);
    fn is_stopped(&self) -> bool;
    fn restart(&mut self);
}

/// Fixed arena of virtual threads, invoked round-robin.
///
/// `N` must be smaller than 255, larger sets fail to compile.
pub struct ThreadSet<'a, const N: usize> {
    runqueue: RunQueue<1, N>,
    threads: [Option<&'a mut dyn VirtualThread>; N],
    queued: [bool; N],
}

impl<'a, const N: usize> Default for ThreadSet<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> ThreadSet<'a, N> {
    /// `ThreadId` is a `u8` and the runqueue reserves 0xFF
    const CAPACITY_CHECK: () = assert!(N < 255, "ThreadSet holds at most 254 threads");

    pub fn new() -> Self {
        let () = Self::CAPACITY_CHECK;
        Self {
            runqueue: RunQueue::new(),
            threads: core::array::from_fn(|_| None),
            queued: [false; N],
        }
    }

    /// Add a thread to the set.
    ///
    /// Returns `None` if all slots are taken. A thread that is already
    /// stopped only becomes runnable once it is restarted.
    pub fn spawn(&mut self, thread: &'a mut dyn VirtualThread) -> Option<ThreadId> {
        let slot = self.threads.iter().position(Option::is_none)?;
        let pid = slot as ThreadId;
        let runnable = !thread.is_stopped();
        self.threads[slot] = Some(thread);
        if runnable {
            self.enqueue(pid);
        }
        log::debug!("vthreads: spawned {}", pid);
        Some(pid)
    }

    fn enqueue(&mut self, pid: ThreadId) {
        if !self.queued[pid as usize] {
            self.runqueue.add(pid, RUNQUEUE);
            self.queued[pid as usize] = true;
        }
    }

    /// Invoke the next runnable thread.
    ///
    /// Returns the scheduled thread, or `None` if nothing is runnable. A
    /// thread found stopped, before or after its invocation, leaves the
    /// runqueue.
    pub fn run_once(&mut self) -> Option<ThreadId> {
        let pid = self.runqueue.get_next()?;
        let thread = self.threads[pid as usize].as_deref_mut()?;

        if !thread.is_stopped() {
            thread.invoke();
        }

        if thread.is_stopped() {
            // `pid` is the queue head, so it can be deleted directly
            self.runqueue.del(pid, RUNQUEUE);
            self.queued[pid as usize] = false;
            log::debug!("vthreads: {} stopped", pid);
        } else {
            self.runqueue.advance(RUNQUEUE);
        }
        Some(pid)
    }

    /// Invoke threads until none is runnable or `max` invocations were made.
    ///
    /// Returns the number of invocations.
    pub fn run_until_idle(&mut self, max: usize) -> usize {
        let mut count = 0;
        while count < max && self.run_once().is_some() {
            count += 1;
        }
        count
    }

    /// Put threads that were restarted behind the set's back (e.g. through a
    /// [`crate::SharedVThread`] from an interrupt handler) back on the
    /// runqueue.
    ///
    /// Returns how many threads were requeued.
    pub fn requeue_restarted(&mut self) -> usize {
        let mut count = 0;
        for slot in 0..N {
            let revived = match &self.threads[slot] {
                Some(thread) => !self.queued[slot] && !thread.is_stopped(),
                None => false,
            };
            if revived {
                self.enqueue(slot as ThreadId);
                count += 1;
            }
        }
        count
    }

    /// Restart thread `pid` and make it runnable.
    ///
    /// Returns `false` if there is no such thread.
    pub fn restart(&mut self, pid: ThreadId) -> bool {
        match self.threads.get_mut(pid as usize) {
            Some(Some(thread)) => thread.restart(),
            _ => return false,
        }
        self.enqueue(pid);
        log::debug!("vthreads: restarted {}", pid);
        true
    }

    pub fn is_runnable(&self, pid: ThreadId) -> bool {
        self.queued.get(pid as usize).copied().unwrap_or(false)
    }

    /// Number of runnable threads.
    pub fn runnable(&self) -> usize {
        self.queued.iter().filter(|queued| **queued).count()
    }

    /// Number of threads in the set, stopped ones included.
    pub fn len(&self) -> usize {
        self.threads.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drive the set forever, idling while nothing is runnable.
    pub fn run(&mut self) -> ! {
        loop {
            if self.run_once().is_none() && self.requeue_restarted() == 0 {
                arch::idle();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Resume, ResumePoint, SharedVThread, Step, VThread};

    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    enum Point {
        Loop,
    }

    impl ResumePoint for Point {}

    /// counts invocations, stops after `limit`
    struct Counter {
        vt: VThread<Point>,
        count: u32,
        limit: u32,
    }

    impl Counter {
        fn new(limit: u32) -> Self {
            Self {
                vt: VThread::new(),
                count: 0,
                limit,
            }
        }
    }

    impl VirtualThread for Counter {
        fn invoke(&mut self) {
            let Self { vt, count, limit } = self;
            vt.run(|_| {
                *count += 1;
                if *count >= *limit {
                    Step::Stop
                } else {
                    Step::Yield(Point::Loop)
                }
            });
        }

        fn is_stopped(&self) -> bool {
            self.vt.is_stopped()
        }

        fn restart(&mut self) {
            self.count = 0;
            self.vt.restart();
        }
    }

    #[test]
    fn round_robin_order() {
        let mut a = Counter::new(10);
        let mut b = Counter::new(10);
        let mut set = ThreadSet::<4>::new();
        let pa = set.spawn(&mut a).unwrap();
        let pb = set.spawn(&mut b).unwrap();

        assert_eq!(set.run_once(), Some(pa));
        assert_eq!(set.run_once(), Some(pb));
        assert_eq!(set.run_once(), Some(pa));
        assert_eq!(set.run_once(), Some(pb));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn stopped_threads_leave_the_queue() {
        let mut a = Counter::new(1);
        let mut b = Counter::new(3);
        {
            let mut set = ThreadSet::<4>::new();
            let pa = set.spawn(&mut a).unwrap();
            let pb = set.spawn(&mut b).unwrap();

            assert_eq!(set.run_until_idle(100), 4);
            assert!(!set.is_runnable(pa));
            assert!(!set.is_runnable(pb));
            assert_eq!(set.run_once(), None);
            assert_eq!(set.runnable(), 0);
        }
        assert_eq!(a.count, 1);
        assert_eq!(b.count, 3);
    }

    #[test]
    fn restart_requeues() {
        let mut a = Counter::new(2);
        let mut set = ThreadSet::<2>::new();
        let pa = set.spawn(&mut a).unwrap();

        assert_eq!(set.run_until_idle(10), 2);
        assert!(set.restart(pa));
        assert!(set.is_runnable(pa));
        assert_eq!(set.run_until_idle(10), 2);
        assert!(!set.restart(7));
        assert!(!set.restart(1));
    }

    #[test]
    fn full_set_rejects_spawn() {
        let mut a = Counter::new(1);
        let mut b = Counter::new(1);
        let mut set = ThreadSet::<1>::new();
        assert_eq!(set.spawn(&mut a), Some(0));
        assert_eq!(set.spawn(&mut b), None);
    }

    #[test]
    fn run_until_idle_honours_max() {
        let mut a = Counter::new(100);
        let mut set = ThreadSet::<1>::new();
        set.spawn(&mut a).unwrap();
        assert_eq!(set.run_until_idle(5), 5);
        assert_eq!(set.runnable(), 1);
    }

    struct Shared<'s> {
        vt: &'s SharedVThread<Point>,
        runs: u32,
    }

    impl VirtualThread for Shared<'_> {
        fn invoke(&mut self) {
            let runs = &mut self.runs;
            self.vt.run(|at| {
                *runs += 1;
                match at {
                    Resume::Entry => Step::Yield(Point::Loop),
                    Resume::At(Point::Loop) => Step::Stop,
                }
            });
        }

        fn is_stopped(&self) -> bool {
            self.vt.is_stopped()
        }

        fn restart(&mut self) {
            self.vt.restart();
        }
    }

    #[test]
    fn externally_restarted_thread_is_requeued() {
        let cell = SharedVThread::new();
        let mut thread = Shared { vt: &cell, runs: 0 };
        let mut set = ThreadSet::<2>::new();
        let pid = set.spawn(&mut thread).unwrap();

        assert_eq!(set.run_until_idle(10), 2);
        assert_eq!(set.requeue_restarted(), 0);

        cell.restart();
        assert_eq!(set.requeue_restarted(), 1);
        assert!(set.is_runnable(pid));
        assert_eq!(set.run_until_idle(10), 2);
    }

    #[test]
    fn largest_set_runs_every_thread() {
        let mut counters: Vec<Counter> = (0..254).map(|_| Counter::new(2)).collect();
        let mut set = ThreadSet::<254>::new();
        for (slot, counter) in counters.iter_mut().enumerate() {
            assert_eq!(set.spawn(counter), Some(slot as ThreadId));
        }
        assert_eq!(set.runnable(), 254);

        assert_eq!(set.run_until_idle(1000), 2 * 254);
        assert_eq!(set.runnable(), 0);
        assert!(set.restart(253));
        assert_eq!(set.run_once(), Some(253));
        drop(set);

        assert!(counters.iter().take(253).all(|counter| counter.count == 2));
        assert_eq!(counters[253].count, 1);
    }

    #[test]
    fn stopped_thread_is_not_queued_on_spawn() {
        let mut a = Counter::new(1);
        a.vt.stop();
        let mut set = ThreadSet::<1>::new();
        let pa = set.spawn(&mut a).unwrap();
        assert!(!set.is_runnable(pa));
        assert!(!set.is_empty());
    }
}
