use crate::Sequence;
use crate::clock::{SystemClock, TimeSource};
use crate::error::Error;
use crate::machine_id;
use crate::sequence::{
    DEFAULT_EPOCH_MILLIS, DEFAULT_RANDOM_SEQUENCE_LIMIT, DEFAULT_TIME_OFFSET, Internals,
    MAX_DATA_CENTER_ID, MAX_SEQUENCE, MAX_WORKER_ID, SharedSequence,
};
use chrono::prelude::*;
use std::sync::{Arc, Mutex};

/// A builder for building the [`Sequence`] generator.
pub struct Builder<T: TimeSource = SystemClock> {
    start_time: Option<DateTime<Utc>>,
    data_center_id: Option<i64>,
    worker_id: Option<i64>,
    clock: bool,
    time_offset: i64,
    random_sequence: bool,
    random_sequence_limit: u16,
    time: T,
}

impl Default for Builder<SystemClock> {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder<SystemClock> {
    /// Construct a new builder for the build of [`Sequence`].
    pub fn new() -> Self {
        Self {
            start_time: None,
            data_center_id: None,
            worker_id: None,
            clock: false,
            time_offset: DEFAULT_TIME_OFFSET,
            random_sequence: false,
            random_sequence_limit: DEFAULT_RANDOM_SEQUENCE_LIMIT,
            time: SystemClock,
        }
    }
}

impl<T: TimeSource> Builder<T> {
    /// Set the start time (epoch) ids are measured from.
    /// If the time is later than the current time, `finalize` will fail.
    pub fn start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Set the data center ID, `0..=3`.
    /// Derived from the process id when not set.
    pub fn data_center_id(mut self, data_center_id: i64) -> Self {
        self.data_center_id = Some(data_center_id);
        self
    }

    /// Set the worker ID, `0..=255`.
    /// Derived from the host's address when not set.
    pub fn worker_id(mut self, worker_id: i64) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    /// Wait for the clock to catch up instead of failing when it moves
    /// backwards by more than the time offset.
    pub fn clock(mut self, clock: bool) -> Self {
        self.clock = clock;
        self
    }

    /// Set the tolerated backward clock movement in milliseconds.
    pub fn time_offset(mut self, time_offset: i64) -> Self {
        self.time_offset = time_offset;
        self
    }

    /// Start each millisecond at a random sequence value.
    pub fn random_sequence(mut self, random_sequence: bool) -> Self {
        self.random_sequence = random_sequence;
        self
    }

    /// Set the exclusive upper bound of random starting sequence values.
    pub fn random_sequence_limit(mut self, random_sequence_limit: u16) -> Self {
        self.random_sequence_limit = random_sequence_limit;
        self
    }

    /// Replace the time source.
    pub fn time_source<U: TimeSource>(self, time: U) -> Builder<U> {
        Builder {
            start_time: self.start_time,
            data_center_id: self.data_center_id,
            worker_id: self.worker_id,
            clock: self.clock,
            time_offset: self.time_offset,
            random_sequence: self.random_sequence,
            random_sequence_limit: self.random_sequence_limit,
            time,
        }
    }

    /// Finish building and create a Sequence instance.
    /// Returns an error if any of the settings are out of range.
    pub fn finalize(self) -> Result<Sequence<T>, Error> {
        let (default_data_center_id, default_worker_id) = match (self.data_center_id, self.worker_id)
        {
            (Some(data_center_id), Some(worker_id)) => (data_center_id, worker_id),
            _ => machine_id::default_topology(),
        };

        let data_center_id = self.data_center_id.unwrap_or(default_data_center_id);
        if data_center_id > MAX_DATA_CENTER_ID {
            return Err(Error::DataCenterIdTooLarge(data_center_id));
        }
        if data_center_id < 0 {
            return Err(Error::DataCenterIdOutOfRange(data_center_id));
        }

        let worker_id = self.worker_id.unwrap_or(default_worker_id);
        if worker_id > MAX_WORKER_ID {
            return Err(Error::WorkerIdTooLarge(worker_id));
        }
        if worker_id < 0 {
            return Err(Error::WorkerIdOutOfRange(worker_id));
        }

        if self.time_offset < 0 {
            return Err(Error::InvalidTimeOffset(self.time_offset));
        }

        if self.random_sequence_limit == 0 || self.random_sequence_limit > MAX_SEQUENCE + 1 {
            return Err(Error::InvalidRandomSequenceLimit(self.random_sequence_limit));
        }

        let epoch = match self.start_time {
            Some(start_time) => {
                if start_time.timestamp_millis() > self.time.current_millis() {
                    return Err(Error::StartTimeAheadOfCurrentTime(start_time));
                }
                start_time.timestamp_millis()
            }
            None => DEFAULT_EPOCH_MILLIS,
        };

        tracing::debug!(
            data_center_id,
            worker_id,
            time_offset = self.time_offset,
            clock = self.clock,
            random_sequence = self.random_sequence,
            epoch,
            "sequence generator configured"
        );

        let shared = Arc::new(SharedSequence {
            epoch,
            data_center_id,
            worker_id,
            time_offset: self.time_offset,
            clock: self.clock,
            random_sequence: self.random_sequence,
            random_sequence_limit: self.random_sequence_limit,
            time: self.time,
            internals: Mutex::new(Internals {
                last_timestamp: -1,
                sequence: 0,
            }),
        });
        Ok(Sequence::new_inner(shared))
    }
}
