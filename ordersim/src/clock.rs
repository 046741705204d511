//! The durable virtual clock.
//!
//! The clock is a single record keyed by [`ClockKey::global`]. It exposes
//! exactly two operations, [`SimulationClock::read`] and
//! [`SimulationClock::advance`], and no read-modify-write.
//!
//! `advance` writes the absolute new time. Two invocations that read the
//! same base time both write `base + delta` and the later write wins, so a
//! stale reader never compounds an advance. It can undo a concurrent
//! invocation's advance; that lost update is tolerated.

use std::time::Duration;

use async_trait::async_trait;
use nutype::nutype;
use tracing::{debug, instrument};

use crate::config::OperationTimeoutMs;
use crate::deadline::within;
use crate::errors::{ClockError, ClockResult};
use crate::types::{SimulationState, VirtualTime};

/// Key of a clock record.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ClockKey(String);

impl ClockKey {
    /// Key of the singleton simulation clock.
    pub const GLOBAL: &'static str = "GLOBAL";

    /// The singleton simulation clock key.
    pub fn global() -> Self {
        Self::try_new(Self::GLOBAL).expect("GLOBAL is a valid clock key")
    }
}

/// Port to the clock backing store.
#[async_trait]
pub trait ClockStore: Send + Sync {
    /// Point read of the record under `key`.
    async fn load(&self, key: &ClockKey) -> ClockResult<Option<SimulationState>>;

    /// Unconditionally sets `simulated_time` of the record under `key`.
    ///
    /// When the record is absent it is created with the default speed
    /// factor.
    async fn set_time(&self, key: &ClockKey, time: VirtualTime) -> ClockResult<()>;
}

/// Repository over the singleton clock record.
#[derive(Debug, Clone)]
pub struct SimulationClock<C> {
    store: C,
    key: ClockKey,
    timeout: Duration,
}

impl<C> SimulationClock<C>
where
    C: ClockStore,
{
    /// Creates a clock over `store` using the default deadline.
    pub fn new(store: C) -> Self {
        Self::with_timeout(store, OperationTimeoutMs::default())
    }

    /// Creates a clock over `store` whose calls give up after `timeout`.
    pub fn with_timeout(store: C, timeout: OperationTimeoutMs) -> Self {
        Self {
            store,
            key: ClockKey::global(),
            timeout: timeout.as_duration(),
        }
    }

    /// The backing store.
    pub const fn store(&self) -> &C {
        &self.store
    }

    /// Reads the simulation state.
    ///
    /// A missing record yields `(2018-01-01T00:00:00, 60)` without creating
    /// it; seeding the record is the provisioning collaborator's job.
    #[instrument(name = "clock.read", skip(self))]
    pub async fn read(&self) -> ClockResult<SimulationState> {
        let stored = within(self.timeout, self.store.load(&self.key), ClockError::Timeout).await?;
        if stored.is_none() {
            debug!("no clock record, using simulation defaults");
        }
        Ok(stored.unwrap_or_default())
    }

    /// Persists `base + delta_minutes` with a blind absolute write and
    /// returns it.
    ///
    /// A zero delta still writes, which is idempotent.
    #[instrument(name = "clock.advance", skip(self), fields(base = %base))]
    pub async fn advance(&self, base: VirtualTime, delta_minutes: u64) -> ClockResult<VirtualTime> {
        let new_time = base
            .checked_add_minutes(delta_minutes)
            .ok_or(ClockError::TimeOverflow {
                base,
                minutes: delta_minutes,
            })?;

        within(
            self.timeout,
            self.store.set_time(&self.key, new_time),
            ClockError::Timeout,
        )
        .await?;

        debug!(new_time = %new_time, "clock advanced");
        Ok(new_time)
    }
}
