//! Stackless cooperative virtual threads.
//!
//! A virtual thread is a plain function that is called over and over by some
//! scheduler (a main loop, a timer interrupt, ...). Between calls it remembers
//! where it stopped in a single [`VThread`] cell, so it can suspend and resume
//! without a stack of its own and without allocating.
//!
//! Every thread body gets a closed enum of its resumption points. The body is
//! a `match` over [`Resume`], one arm per segment, and each arm says with a
//! [`Step`] how the segment ends:
//!
//! ```
//! use vthreads::{Resume, ResumePoint, Step, VThread};
//!
//! #[derive(Copy, Clone, PartialEq, Eq, Debug)]
//! enum Blink {
//!     On,
//!     Off,
//!     Cleanup,
//! }
//!
//! impl ResumePoint for Blink {}
//!
//! fn blink(vt: &mut VThread<Blink>, led: &mut bool) {
//!     vt.run(|at| match at {
//!         Resume::Entry => Step::Goto(Blink::On),
//!         Resume::At(Blink::On) => {
//!             *led = true;
//!             Step::Yield(Blink::Off)
//!         }
//!         Resume::At(Blink::Off) => {
//!             *led = false;
//!             Step::Yield(Blink::On)
//!         }
//!         Resume::At(Blink::Cleanup) => {
//!             *led = false;
//!             Step::Stop
//!         }
//!     });
//! }
//!
//! let mut vt = VThread::new();
//! let mut led = false;
//! blink(&mut vt, &mut led);
//! assert!(led);
//! blink(&mut vt, &mut led);
//! assert!(!led);
//!
//! vt.seek(Blink::Cleanup);
//! blink(&mut vt, &mut led);
//! assert!(vt.is_stopped());
//! ```
//!
//! Cells shared with interrupt handlers go into a [`SharedVThread`], and a
//! [`ThreadSet`] can drive a handful of threads round-robin.

#![cfg_attr(not(test), no_std)]

mod arch;

pub mod shared;
pub mod threadset;
pub mod vthread;

pub use shared::SharedVThread;
pub use threadset::{ThreadId, ThreadSet, VirtualThread};
pub use vthread::{Continuation, Resume, ResumePoint, Step, VThread};
