#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use cortex_m_semihosting::{
    debug::{self, EXIT_FAILURE, EXIT_SUCCESS},
    hprintln as println,
};

use panic_semihosting as _;

use vthreads::{Resume, ResumePoint, SharedVThread, Step, ThreadSet, VThread, VirtualThread};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Ping {
    Sent,
    Done,
}

impl ResumePoint for Ping {}

static PING: SharedVThread<Ping> = SharedVThread::new();
static PINGS: AtomicU32 = AtomicU32::new(0);

/// thread function with ambient state, callable from an interrupt handler
fn ping() {
    PING.run(|at| match at {
        Resume::Entry | Resume::At(Ping::Sent) => {
            let n = PINGS.fetch_add(1, Ordering::Relaxed) + 1;
            println!("ping {}", n);
            Step::Yield(Ping::Sent)
        }
        Resume::At(Ping::Done) => {
            println!("ping done");
            Step::Stop
        }
    });
}

struct PingThread;

impl VirtualThread for PingThread {
    fn invoke(&mut self) {
        ping();
    }

    fn is_stopped(&self) -> bool {
        PING.is_stopped()
    }

    fn restart(&mut self) {
        PING.restart();
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Count {
    Next,
}

impl ResumePoint for Count {}

struct CountThread {
    vt: VThread<Count>,
    n: u32,
}

impl VirtualThread for CountThread {
    fn invoke(&mut self) {
        let n = &mut self.n;
        self.vt.run(|_| {
            *n += 1;
            println!("count {}", n);
            if *n == 3 {
                // abort the other thread's wait
                PING.seek(Ping::Done);
                Step::Stop
            } else {
                Step::Yield(Count::Next)
            }
        });
    }

    fn is_stopped(&self) -> bool {
        self.vt.is_stopped()
    }

    fn restart(&mut self) {
        self.n = 0;
        self.vt.restart();
    }
}

#[entry]
fn main() -> ! {
    println!("main() spawning virtual threads");

    let mut ping = PingThread;
    let mut count = CountThread {
        vt: VThread::new(),
        n: 0,
    };

    let mut threads = ThreadSet::<4>::new();
    if threads.spawn(&mut ping).is_none() || threads.spawn(&mut count).is_none() {
        println!("main() thread set full");
        debug::exit(EXIT_FAILURE);
    }

    let invocations = threads.run_until_idle(32);
    println!("main() {} invocations, {} pings", invocations, PINGS.load(Ordering::Relaxed));

    assert!(PING.is_stopped());
    assert_eq!(PINGS.load(Ordering::Relaxed), 3);

    // exit via semihosting call
    debug::exit(EXIT_SUCCESS);

    // the cortex_m_rt `entry` macro requires `main()` to never return
    loop {}
}
