// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-flight lazy construction of the storage client.
//!
//! Building a network client involves discovery round trips, so it happens
//! at most once per process. Callers that arrive while construction is in
//! flight await the same shared future and observe the same client or the
//! same error. A failed construction leaves the cell empty, so the next
//! caller starts a fresh attempt.

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::TransportError;

type InitFuture<T> = Shared<BoxFuture<'static, Result<Arc<T>, TransportError>>>;
type Connect<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, TransportError>> + Send + Sync>;

enum Slot<T> {
    Empty,
    Pending(InitFuture<T>),
    Ready(Arc<T>),
}

/// Lazily constructed, shared client.
pub struct LazyClient<T> {
    connect: Connect<T>,
    slot: Mutex<Slot<T>>,
}

impl<T: Send + Sync + 'static> LazyClient<T> {
    /// Create a cell that runs `connect` on first use.
    pub fn new<F, Fut>(connect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        Self {
            connect: Box::new(move || connect().boxed()),
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Create a cell around an already constructed client.
    pub fn ready(client: T) -> Self {
        Self {
            connect: Box::new(|| {
                async { Err(TransportError::Init("client already constructed".to_string())) }
                    .boxed()
            }),
            slot: Mutex::new(Slot::Ready(Arc::new(client))),
        }
    }

    /// The client, if construction has already completed.
    pub fn get_if_ready(&self) -> Option<Arc<T>> {
        let slot = self.slot.lock().ok()?;
        match &*slot {
            Slot::Ready(client) => Some(client.clone()),
            _ => None,
        }
    }

    /// Get the client, constructing it if this is the first use.
    pub async fn get(&self) -> Result<Arc<T>, TransportError> {
        let pending = {
            let mut slot = self
                .slot
                .lock()
                .map_err(|_| TransportError::Init("client cell poisoned".to_string()))?;
            match &*slot {
                Slot::Ready(client) => return Ok(client.clone()),
                Slot::Pending(init) => init.clone(),
                Slot::Empty => {
                    let init = (self.connect)().map(|r| r.map(Arc::new)).boxed().shared();
                    *slot = Slot::Pending(init.clone());
                    init
                }
            }
        };

        let result = pending.clone().await;

        // Whoever finishes first settles the slot; later finishers see a
        // different slot state and leave it alone.
        if let Ok(mut slot) = self.slot.lock() {
            let settles = matches!(&*slot, Slot::Pending(current) if current.ptr_eq(&pending));
            if settles {
                *slot = match &result {
                    Ok(client) => Slot::Ready(client.clone()),
                    Err(_) => Slot::Empty,
                };
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::join_all;

    struct Client {
        serial: usize,
    }

    fn counting_cell(
        counter: Arc<AtomicUsize>,
        fail_first: bool,
    ) -> LazyClient<Client> {
        LazyClient::new(move || {
            let counter = counter.clone();
            async move {
                let serial = counter.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
                if fail_first && serial == 1 {
                    return Err(TransportError::Init("fullnode unreachable".to_string()));
                }
                Ok(Client { serial })
            }
        })
    }

    #[tokio::test]
    async fn concurrent_first_calls_construct_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cell = counting_cell(counter.clone(), false);

        let results = join_all((0..16).map(|_| cell.get())).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap().serial, 1);
        }
        assert!(cell.get_if_ready().is_some());
    }

    #[tokio::test]
    async fn concurrent_callers_share_the_init_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cell = counting_cell(counter.clone(), true);

        let results = join_all((0..8).map(|_| cell.get())).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(
                result.err(),
                Some(TransportError::Init("fullnode unreachable".to_string()))
            );
        }
        assert!(cell.get_if_ready().is_none());
    }

    #[tokio::test]
    async fn failed_init_is_retried_on_next_call() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cell = counting_cell(counter.clone(), true);

        assert!(cell.get().await.is_err());
        let client = cell.get().await.unwrap();

        assert_eq!(client.serial, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ready_cell_never_connects() {
        let cell = LazyClient::ready(Client { serial: 7 });
        assert_eq!(cell.get_if_ready().unwrap().serial, 7);
        assert_eq!(cell.get().await.unwrap().serial, 7);
    }
}
