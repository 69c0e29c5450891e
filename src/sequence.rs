use crate::builder::Builder;
use crate::clock::{self, SystemClock, Tick, TimeSource};
use crate::error::*;
use crate::machine_id;
use rand::Rng;
use std::{
    any::Any,
    fmt,
    sync::{Arc, Mutex},
};
use tracing::{trace, warn};
use uuid::Uuid;

/// bit length of time
pub const BIT_LEN_TIME: u64 = 41;
/// bit length of the data center id
pub const BIT_LEN_DATA_CENTER_ID: u64 = 2;
/// bit length of worker id
pub const BIT_LEN_WORKER_ID: u64 = 8;
/// bit length of sequence number
pub const BIT_LEN_SEQUENCE: u64 = 63 - BIT_LEN_TIME - BIT_LEN_DATA_CENTER_ID - BIT_LEN_WORKER_ID;

pub const MAX_DATA_CENTER_ID: i64 = (1 << BIT_LEN_DATA_CENTER_ID) - 1;
pub const MAX_WORKER_ID: i64 = (1 << BIT_LEN_WORKER_ID) - 1;
pub const MAX_SEQUENCE: u16 = (1 << BIT_LEN_SEQUENCE) - 1;
/// exclusive bound of milliseconds since epoch that fit the time field
const MAX_ELAPSED_TIME: i64 = 1 << BIT_LEN_TIME;

pub(crate) const WORKER_ID_SHIFT: u64 = BIT_LEN_SEQUENCE;
pub(crate) const DATA_CENTER_ID_SHIFT: u64 = BIT_LEN_SEQUENCE + BIT_LEN_WORKER_ID;
pub(crate) const TIMESTAMP_SHIFT: u64 =
    BIT_LEN_SEQUENCE + BIT_LEN_WORKER_ID + BIT_LEN_DATA_CENTER_ID;

/// Twitter's Snowflake epoch, 2010-11-04T01:42:54.657Z, in milliseconds.
pub const DEFAULT_EPOCH_MILLIS: i64 = 1_288_834_974_657;
/// Default tolerance for backward clock movement, in milliseconds.
pub const DEFAULT_TIME_OFFSET: i64 = 5;
/// Default exclusive bound for randomized per-millisecond starting sequences.
pub const DEFAULT_RANDOM_SEQUENCE_LIMIT: u16 = 256;

/// Mutable counter state, guarded by the generator's mutex.
#[derive(Debug)]
pub(crate) struct Internals {
    pub(crate) last_timestamp: i64,
    pub(crate) sequence: u16,
}

/// State shared between clones of a [`Sequence`].
pub(crate) struct SharedSequence<T> {
    pub(crate) epoch: i64,
    pub(crate) data_center_id: i64,
    pub(crate) worker_id: i64,
    pub(crate) time_offset: i64,
    pub(crate) clock: bool,
    pub(crate) random_sequence: bool,
    pub(crate) random_sequence_limit: u16,
    pub(crate) time: T,
    pub(crate) internals: Mutex<Internals>,
}

/// A Snowflake-style unique id generator.
///
/// Ids are laid out as `time(41) | data center(2) | worker(8) | sequence(12)`
/// below a zero sign bit. The generator is thread-safe; `clone` it to share
/// the same counter between threads.
pub struct Sequence<T: TimeSource = SystemClock>(pub(crate) Arc<SharedSequence<T>>);

impl Sequence<SystemClock> {
    /// Create a generator with datacenter and worker ids derived from the
    /// host (see [`last_ip_address_byte`]) and default behavior.
    ///
    /// [`last_ip_address_byte`]: crate::last_ip_address_byte
    pub fn new() -> Result<Self, Error> {
        Builder::new().finalize()
    }

    /// Create a generator for the given data center, with a derived worker id.
    pub fn with_data_center_id(data_center_id: i64) -> Result<Self, Error> {
        Builder::new().data_center_id(data_center_id).finalize()
    }

    /// Create a generator for the given data center with explicit behavior
    /// flags and a derived worker id.
    pub fn with_options(
        data_center_id: i64,
        clock: bool,
        random_sequence: bool,
    ) -> Result<Self, Error> {
        Builder::new()
            .data_center_id(data_center_id)
            .clock(clock)
            .random_sequence(random_sequence)
            .finalize()
    }

    /// Create a fully specified generator.
    pub fn with_config(
        data_center_id: i64,
        worker_id: i64,
        clock: bool,
        time_offset: i64,
        random_sequence: bool,
    ) -> Result<Self, Error> {
        Builder::new()
            .data_center_id(data_center_id)
            .worker_id(worker_id)
            .clock(clock)
            .time_offset(time_offset)
            .random_sequence(random_sequence)
            .finalize()
    }

    /// Create a new [`Builder`] to construct a Sequence.
    pub fn builder() -> Builder<SystemClock> {
        Builder::new()
    }
}

impl<T: TimeSource> Sequence<T> {
    pub(crate) fn new_inner(shared: Arc<SharedSequence<T>>) -> Self {
        Self(shared)
    }

    /// Generate the next unique id.
    ///
    /// A clock regression within `time_offset` is absorbed by continuing on
    /// the last timestamp. A larger regression either waits for the clock to
    /// catch up (`clock == true`) or returns [`Error::ClockMovedBackwards`].
    pub fn next_id(&self) -> Result<i64, Error> {
        let shared = &*self.0;
        let mut internals = shared.internals.lock().map_err(|_| Error::MutexPoisoned)?;

        let last = internals.last_timestamp;
        let mut now = shared.time.current_millis();

        if let Tick::Regressed(behind) = clock::compare(last, now) {
            if behind <= shared.time_offset {
                trace!(behind, "absorbing clock regression within tolerance");
                now = last;
            } else if shared.clock {
                warn!(behind, last, now, "clock moved backwards, waiting for it to catch up");
                now = clock::wait_until(&shared.time, last);
            } else {
                warn!(behind, last, now, "clock moved backwards beyond tolerance");
                return Err(Error::ClockMovedBackwards { last, now, behind });
            }
        }

        match clock::compare(last, now) {
            Tick::Same => {
                internals.sequence = (internals.sequence + 1) & MAX_SEQUENCE;
                if internals.sequence == 0 {
                    trace!(last, "sequence exhausted, waiting for the next millisecond");
                    now = clock::wait_until_after(&shared.time, last);
                    internals.sequence = self.start_sequence();
                }
            }
            _ => internals.sequence = self.start_sequence(),
        }

        let elapsed = now - shared.epoch;
        if !(0..MAX_ELAPSED_TIME).contains(&elapsed) {
            return Err(Error::OverTimeLimit);
        }
        internals.last_timestamp = now;

        Ok(elapsed << TIMESTAMP_SHIFT
            | shared.data_center_id << DATA_CENTER_ID_SHIFT
            | shared.worker_id << WORKER_ID_SHIFT
            | i64::from(internals.sequence))
    }

    /// Break an id produced by this generator up into its parts.
    pub fn decompose(&self, id: i64) -> DecomposedId {
        decompose(id)
    }

    pub fn data_center_id(&self) -> i64 {
        self.0.data_center_id
    }

    pub fn worker_id(&self) -> i64 {
        self.0.worker_id
    }

    pub fn time_offset(&self) -> i64 {
        self.0.time_offset
    }

    /// The epoch ids are measured from, in milliseconds since the Unix epoch.
    pub fn epoch_millis(&self) -> i64 {
        self.0.epoch
    }

    fn start_sequence(&self) -> u16 {
        if self.0.random_sequence {
            rand::rng().random_range(0..self.0.random_sequence_limit)
        } else {
            0
        }
    }
}

impl Sequence {
    /// Last byte of the host's network address, cached for the process.
    pub fn last_ip_address_byte() -> u8 {
        machine_id::last_ip_address_byte()
    }
}

/// Returns a new `Sequence` referencing the same state as `self`.
impl<T: TimeSource> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: TimeSource> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("epoch", &self.0.epoch)
            .field("data_center_id", &self.0.data_center_id)
            .field("worker_id", &self.0.worker_id)
            .field("time_offset", &self.0.time_offset)
            .field("clock", &self.0.clock)
            .field("random_sequence", &self.0.random_sequence)
            .finish_non_exhaustive()
    }
}

/// Assigns identifiers to entities on behalf of a persistence layer.
///
/// The entity is passed through for generators that key off it; a
/// [`Sequence`] ignores it.
pub trait IdentifierGenerator {
    /// Generate a numeric id for `entity`.
    fn next_id(&self, entity: &dyn Any) -> Result<i64, Error>;

    /// Generate a random UUID for `entity`, as 32 hex digits without dashes.
    fn next_uuid(&self, _entity: &dyn Any) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl<T: TimeSource> IdentifierGenerator for Sequence<T> {
    fn next_id(&self, _entity: &dyn Any) -> Result<i64, Error> {
        Sequence::<T>::next_id(self)
    }
}

/// DecomposedId is the parts of a generated id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecomposedId {
    pub id: i64,
    pub msb: i64,
    /// Milliseconds since the generator's epoch.
    pub time: i64,
    pub data_center_id: i64,
    pub worker_id: i64,
    pub sequence: i64,
}

impl DecomposedId {
    /// Returns the timestamp in milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self, epoch_millis: i64) -> i64 {
        self.time + epoch_millis
    }
}

const MASK_SEQUENCE: i64 = MAX_SEQUENCE as i64;
const MASK_WORKER_ID: i64 = MAX_WORKER_ID << WORKER_ID_SHIFT;
const MASK_DATA_CENTER_ID: i64 = MAX_DATA_CENTER_ID << DATA_CENTER_ID_SHIFT;

/// Break an id up into its parts.
pub fn decompose(id: i64) -> DecomposedId {
    DecomposedId {
        id,
        msb: (id as u64 >> 63) as i64,
        time: (id as u64 >> TIMESTAMP_SHIFT) as i64 & (MAX_ELAPSED_TIME - 1),
        data_center_id: (id & MASK_DATA_CENTER_ID) >> DATA_CENTER_ID_SHIFT,
        worker_id: (id & MASK_WORKER_ID) >> WORKER_ID_SHIFT,
        sequence: id & MASK_SEQUENCE,
    }
}
