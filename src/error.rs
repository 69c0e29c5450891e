// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Convenience type alias for usage within the tests.
#[cfg(test)]
pub(crate) type BoxDynError = Box<dyn std::error::Error + 'static + Send + Sync>;

/// The error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("data_center_id `{0}` can't be greater than {max}", max = crate::MAX_DATA_CENTER_ID)]
    DataCenterIdTooLarge(i64),
    #[error("data_center_id `{0}` must be between 0 and {max}", max = crate::MAX_DATA_CENTER_ID)]
    DataCenterIdOutOfRange(i64),
    #[error("worker_id `{0}` can't be greater than {max}", max = crate::MAX_WORKER_ID)]
    WorkerIdTooLarge(i64),
    #[error("worker_id `{0}` must be between 0 and {max}", max = crate::MAX_WORKER_ID)]
    WorkerIdOutOfRange(i64),
    #[error("time_offset `{0}` must not be negative")]
    InvalidTimeOffset(i64),
    #[error(
        "random_sequence_limit `{0}` must be between 1 and {max}",
        max = crate::MAX_SEQUENCE + 1
    )]
    InvalidRandomSequenceLimit(u16),
    #[error("start_time `{0}` is ahead of current time")]
    StartTimeAheadOfCurrentTime(DateTime<Utc>),
    #[error(
        "clock moved backwards by {behind}ms (last timestamp {last}, now {now}), refusing to generate id"
    )]
    ClockMovedBackwards { last: i64, now: i64, behind: i64 },
    #[error("over the time limit")]
    OverTimeLimit,
    #[error("mutex is poisoned (i.e. a panic happened while it was locked)")]
    MutexPoisoned,
}

impl Error {
    /// Returns `true` if the error was raised while validating the
    /// generator's configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::DataCenterIdTooLarge(_)
                | Error::DataCenterIdOutOfRange(_)
                | Error::WorkerIdTooLarge(_)
                | Error::WorkerIdOutOfRange(_)
                | Error::InvalidTimeOffset(_)
                | Error::InvalidRandomSequenceLimit(_)
                | Error::StartTimeAheadOfCurrentTime(_)
        )
    }

    /// Returns `true` if the error reports a clock regression beyond the
    /// configured tolerance.
    pub fn is_clock_anomaly(&self) -> bool {
        matches!(self, Error::ClockMovedBackwards { .. })
    }
}
