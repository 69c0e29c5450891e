use chrono::Utc;
use std::{
    fmt, hint,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// The generator reads the time source once per id (and repeatedly while it
/// waits for the clock to advance), so implementations should be cheap.
pub trait TimeSource: Send + Sync {
    /// Returns the current time in milliseconds since 1970-01-01T00:00:00Z.
    fn current_millis(&self) -> i64;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

/// Reads the system clock on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

struct Ticker {
    current: AtomicI64,
}

/// A cached clock refreshed once per millisecond by a background thread.
///
/// Reads are a single atomic load. The ticker thread exits once every
/// handle to the clock has been dropped.
#[derive(Clone)]
pub struct TickerClock {
    inner: Arc<Ticker>,
}

impl TickerClock {
    pub fn new() -> Self {
        let inner = Arc::new(Ticker {
            current: AtomicI64::new(Utc::now().timestamp_millis()),
        });

        let weak = Arc::downgrade(&inner);
        thread::spawn(move || {
            let start = Instant::now();
            let base = Utc::now().timestamp_millis();
            let mut tick: u64 = 0;
            loop {
                let Some(ticker) = weak.upgrade() else {
                    break;
                };
                ticker
                    .current
                    .store(base + start.elapsed().as_millis() as i64, Ordering::Relaxed);
                drop(ticker);

                tick += 1;
                let target = start + Duration::from_millis(tick);
                let now = Instant::now();
                if target > now {
                    thread::sleep(target - now);
                } else {
                    // fell behind, resync on the next whole millisecond
                    tick = start.elapsed().as_millis() as u64;
                }
            }
        });

        Self { inner }
    }
}

impl Default for TickerClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TickerClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickerClock")
            .field("current", &self.inner.current.load(Ordering::Relaxed))
            .finish()
    }
}

impl TimeSource for TickerClock {
    fn current_millis(&self) -> i64 {
        self.inner.current.load(Ordering::Relaxed)
    }
}

/// Where a fresh clock reading lies relative to the last one used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tick {
    Same,
    Advanced,
    /// The clock went backwards by the given number of milliseconds.
    Regressed(i64),
}

pub(crate) fn compare(last: i64, now: i64) -> Tick {
    match now.cmp(&last) {
        std::cmp::Ordering::Equal => Tick::Same,
        std::cmp::Ordering::Greater => Tick::Advanced,
        std::cmp::Ordering::Less => Tick::Regressed(last - now),
    }
}

/// Blocks until `time` reports a value strictly greater than `last`.
pub(crate) fn wait_until_after<T: TimeSource + ?Sized>(time: &T, last: i64) -> i64 {
    wait_until(time, last + 1)
}

/// Blocks until `time` reports a value of at least `target`.
pub(crate) fn wait_until<T: TimeSource + ?Sized>(time: &T, target: i64) -> i64 {
    let mut spins: u32 = 0;
    loop {
        let now = time.current_millis();
        if now >= target {
            return now;
        }
        let remaining = target - now;
        if remaining > 1 {
            thread::sleep(Duration::from_millis((remaining - 1) as u64));
        } else if spins < 64 {
            spins += 1;
            hint::spin_loop();
        } else {
            thread::yield_now();
        }
    }
}
