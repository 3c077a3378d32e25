use core::fmt::Debug;

/// Closed set of resumption points of one thread body.
///
/// Implement this for a fieldless enum holding one variant per yield site
/// and one per mark. Each thread body gets its own enum, so a token of one
/// body can never be stored into the cell of another.
pub trait ResumePoint: Copy + Eq + Debug {}

/// Where a virtual thread continues on its next invocation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Continuation<P> {
    /// start of the thread body
    Entry,
    /// a yield site or mark
    At(P),
    /// stopped, invocations are no-ops until restarted
    Terminal,
}

impl<P: ResumePoint> Continuation<P> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Continuation::Terminal)
    }

    /// The point dispatch hands to the body, `None` if stopped.
    pub fn resume(self) -> Option<Resume<P>> {
        match self {
            Continuation::Entry => Some(Resume::Entry),
            Continuation::At(point) => Some(Resume::At(point)),
            Continuation::Terminal => None,
        }
    }
}

/// Position a thread body is entered at.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Resume<P> {
    Entry,
    At(P),
}

/// Outcome of one segment of a thread body.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Step<P> {
    /// Suspend. The next invocation resumes at the given point.
    Yield(P),
    /// Fall through into the segment at the given point within the same
    /// invocation, without suspending.
    Goto(P),
    /// Suspend. The next invocation starts from the beginning of the body.
    Restart,
    /// Stop the thread.
    Stop,
    /// The body ran off its end. The thread is stopped.
    End,
}

/// The continuation cell of a single virtual thread.
///
/// A fresh cell is already at [`Continuation::Entry`], so there is no way to
/// invoke a body before it was initialized.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct VThread<P> {
    ip: Continuation<P>,
}

impl<P: ResumePoint> Default for VThread<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ResumePoint> VThread<P> {
    pub const fn new() -> Self {
        Self {
            ip: Continuation::Entry,
        }
    }

    /// Set the cell to the start of the thread body.
    pub fn init(&mut self) {
        log::trace!("vthreads: init");
        self.ip = Continuation::Entry;
    }

    /// Alias of [`VThread::init`].
    pub fn restart(&mut self) {
        self.init();
    }

    pub fn get(&self) -> Continuation<P> {
        self.ip
    }

    pub fn set(&mut self, ip: Continuation<P>) {
        log::trace!("vthreads: set to {:?}", ip);
        self.ip = ip;
    }

    /// Make the next invocation resume at `mark`, whatever was saved before.
    pub fn seek(&mut self, mark: P) {
        log::trace!("vthreads: seek to {:?}", mark);
        self.ip = Continuation::At(mark);
    }

    /// Stop the thread from outside the body.
    pub fn stop(&mut self) {
        log::trace!("vthreads: stop");
        self.ip = Continuation::Terminal;
    }

    pub fn is_stopped(&self) -> bool {
        self.ip.is_terminal()
    }

    /// Invoke the thread body once.
    ///
    /// `body` is called with the saved position and returns how its segment
    /// ended. `Step::Goto` re-enters `body` at the new point right away; every
    /// other step is stored in the cell and ends the invocation. A stopped
    /// thread returns without calling `body`.
    pub fn run<F>(&mut self, body: F) -> Continuation<P>
    where
        F: FnMut(Resume<P>) -> Step<P>,
    {
        self.ip = dispatch(self.ip, body);
        self.ip
    }
}

/// Drive `body` from `ip` until it suspends, stops or ends.
pub(crate) fn dispatch<P, F>(ip: Continuation<P>, mut body: F) -> Continuation<P>
where
    P: ResumePoint,
    F: FnMut(Resume<P>) -> Step<P>,
{
    let mut at = match ip.resume() {
        Some(at) => at,
        None => return Continuation::Terminal,
    };

    loop {
        match body(at) {
            Step::Goto(point) => at = Resume::At(point),
            Step::Yield(point) => return Continuation::At(point),
            Step::Restart => return Continuation::Entry,
            Step::Stop | Step::End => return Continuation::Terminal,
        }
    }
}
