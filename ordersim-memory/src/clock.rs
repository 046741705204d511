use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ordersim::clock::{ClockKey, ClockStore};
use ordersim::errors::ClockResult;
use ordersim::types::{SimulationState, VirtualTime};
use parking_lot::RwLock;

/// Thread-safe in-memory clock table.
///
/// `set_time` is a blind overwrite: it never looks at the stored time, and
/// on an absent record it creates one with the default speed factor.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClockStore {
    records: Arc<RwLock<HashMap<ClockKey, SimulationState>>>,
    writes: Arc<AtomicU64>,
}

impl InMemoryClockStore {
    /// Create a store with no clock record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose global record holds `state`.
    pub fn with_state(state: SimulationState) -> Self {
        let store = Self::new();
        store.records.write().insert(ClockKey::global(), state);
        store
    }

    /// The global record, `None` if it was never written.
    pub fn state(&self) -> Option<SimulationState> {
        self.records.read().get(&ClockKey::global()).copied()
    }

    /// Number of `set_time` calls served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClockStore for InMemoryClockStore {
    async fn load(&self, key: &ClockKey) -> ClockResult<Option<SimulationState>> {
        Ok(self.records.read().get(key).copied())
    }

    async fn set_time(&self, key: &ClockKey, time: VirtualTime) -> ClockResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records
            .write()
            .entry(key.clone())
            .or_default()
            .simulated_time = time;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordersim::types::SpeedFactor;

    #[tokio::test]
    async fn absent_record_reads_as_none() {
        let store = InMemoryClockStore::new();
        assert_eq!(store.load(&ClockKey::global()).await, Ok(None));
        assert_eq!(store.state(), None);
    }

    #[tokio::test]
    async fn writing_an_absent_record_uses_the_default_speed() {
        let store = InMemoryClockStore::new();
        let time = VirtualTime::simulation_start().checked_add_minutes(5).unwrap();

        store.set_time(&ClockKey::global(), time).await.unwrap();

        let state = store.state().unwrap();
        assert_eq!(state.simulated_time, time);
        assert_eq!(state.speed_factor, SpeedFactor::default());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn writes_keep_the_configured_speed() {
        let speed = SpeedFactor::try_new(15).unwrap();
        let store =
            InMemoryClockStore::with_state(SimulationState::new(VirtualTime::default(), speed));
        let time = VirtualTime::simulation_start().checked_add_minutes(1).unwrap();

        store.set_time(&ClockKey::global(), time).await.unwrap();

        assert_eq!(store.state(), Some(SimulationState::new(time, speed)));
    }

    #[tokio::test]
    async fn blind_writes_can_move_the_clock_backwards() {
        let store = InMemoryClockStore::new();
        let later = VirtualTime::simulation_start().checked_add_minutes(90).unwrap();
        let earlier = VirtualTime::simulation_start().checked_add_minutes(30).unwrap();

        store.set_time(&ClockKey::global(), later).await.unwrap();
        store.set_time(&ClockKey::global(), earlier).await.unwrap();

        assert_eq!(store.state().unwrap().simulated_time, earlier);
    }
}
