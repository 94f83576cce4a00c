//! Request coalescing ("single flight").
//!
//! Concurrent callers asking for the same key while a computation for it is
//! in flight wait on that computation instead of starting their own. The
//! computation runs on its own task, so it finishes (and retires its key)
//! even if every caller goes away. Results are not memoized: the key is
//! retired as soon as the computation completes, successfully or not.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::counter;
use tokio::task::JoinError;
use tracing::debug;

const METRIC_LEADER: &str = "catalogd_cache_coalesce_leader_total";
const METRIC_JOINED: &str = "catalogd_cache_coalesce_joined_total";

type Flight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct InFlight<V, E> {
    token: u64,
    flight: Flight<V, E>,
}

pub struct CoalescingGroup<K, V, E> {
    name: &'static str,
    flights: Arc<DashMap<K, InFlight<V, E>>>,
    tokens: AtomicU64,
}

impl<K, V, E> CoalescingGroup<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            flights: Arc::new(DashMap::new()),
            tokens: AtomicU64::new(0),
        }
    }

    /// Run `compute` for `key`, or join the computation already in flight.
    ///
    /// `compute` is only invoked by the caller that starts a flight. Every
    /// participant receives a clone of the same `Ok` or `Err`.
    pub async fn run<F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let flight = match self.flights.entry(key.clone()) {
            Entry::Occupied(existing) => {
                counter!(METRIC_JOINED, "group" => self.name).increment(1);
                existing.get().flight.clone()
            }
            Entry::Vacant(slot) => {
                counter!(METRIC_LEADER, "group" => self.name).increment(1);
                let token = self.tokens.fetch_add(1, Ordering::Relaxed);
                let retire = RetireOnDrop {
                    flights: Arc::clone(&self.flights),
                    key,
                    token,
                };
                let work = compute();
                let handle = tokio::spawn(async move {
                    let _retire = retire;
                    work.await
                });
                let flight = async move { handle.await.unwrap_or_else(|err| Err(E::from(err))) }
                    .boxed()
                    .shared();
                slot.insert(InFlight {
                    token,
                    flight: flight.clone(),
                });
                debug!(group = self.name, token, "Started coalesced computation");
                flight
            }
        };
        flight.await
    }

    /// Number of keys with a computation in flight.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

/// Retires a flight's key when its task ends, including by panic. The token
/// guards against removing a newer flight registered under the same key.
struct RetireOnDrop<K: Eq + Hash, V, E> {
    flights: Arc<DashMap<K, InFlight<V, E>>>,
    key: K,
    token: u64,
}

impl<K: Eq + Hash, V, E> Drop for RetireOnDrop<K, V, E> {
    fn drop(&mut self) {
        self.flights
            .remove_if(&self.key, |_, in_flight| in_flight.token == self.token);
    }
}
