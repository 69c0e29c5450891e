//! A distributed unique ID generator in the style of [Twitter's Snowflake].
//!
//! Every id is a positive `i64` laid out as
//!
//! ```text
//! 0 | 41 bits time since epoch (ms) | 2 bits data center | 8 bits worker | 12 bits sequence
//! ```
//!
//! so a single generator hands out up to 4096 ids per millisecond, and up
//! to 1024 generators (4 data centers of 256 workers) can run side by side
//! without coordination as long as each gets a distinct pair of ids.
//!
//! ## Quickstart
//!
//! ```
//! use snowflake_sequence::Sequence;
//!
//! let seq = Sequence::with_config(1, 42, false, 5, false).unwrap();
//! let id = seq.next_id().unwrap();
//! assert!(id > 0);
//!
//! let parts = seq.decompose(id);
//! assert_eq!(parts.data_center_id, 1);
//! assert_eq!(parts.worker_id, 42);
//! ```
//!
//! `Sequence::new()` derives the worker id from the last byte of the host's
//! network address and the data center id from the process id. That is a
//! convenience: deployments running several generators must hand out
//! explicit ids.
//!
//! ## Clock rollback
//!
//! A clock that moves backwards by at most `time_offset` milliseconds is
//! absorbed by continuing on the last seen timestamp. Larger regressions
//! either block until the clock catches up (`clock == true`) or fail with
//! [`Error::ClockMovedBackwards`].
//!
//! ## Concurrent use
//!
//! Sequence is thread safe. `clone` it before moving to another thread:
//! ```
//! use snowflake_sequence::Sequence;
//! use std::thread;
//!
//! let seq = Sequence::with_data_center_id(2).unwrap();
//!
//! let mut children = Vec::new();
//! for _ in 0..10 {
//!     let thread_seq = seq.clone();
//!     children.push(thread::spawn(move || {
//!         println!("{}", thread_seq.next_id().unwrap());
//!     }));
//! }
//!
//! for child in children {
//!     child.join().unwrap();
//! }
//! ```
//!
//! [Twitter's Snowflake]: https://blog.twitter.com/2010/announcing-snowflake

mod builder;
mod clock;
mod error;
mod machine_id;
mod sequence;

pub use crate::sequence::*;
pub use builder::*;
pub use clock::{SystemClock, TickerClock, TimeSource};
pub use error::*;
pub use machine_id::{DEFAULT_MACHINE_BYTE, last_ip_address_byte};
