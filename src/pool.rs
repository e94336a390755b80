//! Bounded, fair, async connection pool (spec section 4.7).
//!
//! Grounded on the shape of `bb8::ManageConnection`/`bb8::PooledConnection`
//! (the scope-guard-with-spawn-on-drop release pattern), but implemented
//! first-party: the pool internals (free queue, in-use count, FIFO waiter
//! hand-off, shrink-on-unusable-release) need to be directly owned and
//! testable here rather than delegated to an external crate.

use std::{
    collections::{HashMap, VecDeque},
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::{net::ToSocketAddrs, sync::{oneshot, Mutex}};

use crate::{connection::{Connection, ConnectionOptions}, KlickhouseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolStatus {
    Created,
    Opening,
    Opened,
    Closing,
    Closed,
}

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub minsize: usize,
    pub maxsize: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        PoolOptions {
            minsize: 1,
            maxsize: 10,
        }
    }
}

struct Waiter {
    response: oneshot::Sender<Option<Connection>>,
}

struct PoolState {
    status: PoolStatus,
    free: VecDeque<Connection>,
    in_use: HashMap<u64, Connection>,
    waiters: VecDeque<Waiter>,
}

struct PoolInner<A> {
    destination: A,
    options: ConnectionOptions,
    pool_options: PoolOptions,
    state: Mutex<PoolState>,
    next_id: AtomicU64,
}

/// A bounded pool of [`Connection`]s to a single destination. Cheaply
/// cloneable; every clone shares the same underlying free/in-use state.
pub struct Pool<A> {
    inner: Arc<PoolInner<A>>,
}

impl<A> Clone for Pool<A> {
    fn clone(&self) -> Self {
        Pool {
            inner: self.inner.clone(),
        }
    }
}

impl<A: ToSocketAddrs + Clone + Send + Sync + 'static> Pool<A> {
    pub fn new(destination: A, options: ConnectionOptions, pool_options: PoolOptions) -> Self {
        Pool {
            inner: Arc::new(PoolInner {
                destination,
                options,
                pool_options,
                state: Mutex::new(PoolState {
                    status: PoolStatus::Created,
                    free: VecDeque::new(),
                    in_use: HashMap::new(),
                    waiters: VecDeque::new(),
                }),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    async fn open_one(&self) -> Result<Connection> {
        Connection::connect(self.inner.destination.clone(), self.inner.options.clone()).await
    }

    /// Pre-creates `minsize` connections and marks the pool open. Calling
    /// this more than once is a no-op past the first successful call.
    pub async fn startup(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().await;
            if state.status != PoolStatus::Created {
                return Ok(());
            }
            state.status = PoolStatus::Opening;
        }
        let mut created = Vec::with_capacity(self.inner.pool_options.minsize);
        for _ in 0..self.inner.pool_options.minsize {
            created.push(self.open_one().await?);
        }
        let mut state = self.inner.state.lock().await;
        state.free.extend(created);
        state.status = PoolStatus::Opened;
        Ok(())
    }

    /// Closes every connection, free and checked out, and fails every
    /// waiter. Idempotent.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        if state.status == PoolStatus::Closed || state.status == PoolStatus::Closing {
            return;
        }
        state.status = PoolStatus::Closing;
        let free: Vec<_> = state.free.drain(..).collect();
        let in_use: Vec<_> = state.in_use.drain().map(|(_, c)| c).collect();
        let waiters: Vec<_> = state.waiters.drain(..).collect();
        drop(state);

        for waiter in waiters {
            let _ = waiter.response.send(None);
        }
        for conn in free.iter().chain(in_use.iter()) {
            conn.close().await;
        }

        self.inner.state.lock().await.status = PoolStatus::Closed;
    }

    /// Hands the oldest waiter, if any, a ready-to-use connection; returns
    /// it back if the waiter's receiver was already dropped (cancelled
    /// acquire), trying the next waiter in FIFO order.
    fn dispatch_to_waiter(state: &mut PoolState, mut conn: Connection) -> Option<Connection> {
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.response.send(Some(conn)) {
                Ok(()) => return None,
                Err(returned) => conn = returned.unwrap(),
            }
        }
        Some(conn)
    }

    /// Wakes the oldest waiter, if any, to retell it a slot is free (no
    /// connection handed over — the waiter re-enters `acquire` and either
    /// takes a freed slot or opens a new connection).
    fn wake_one_for_retry(state: &mut PoolState) {
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.response.send(None).is_ok() {
                return;
            }
        }
    }

    /// Acquires a connection, suspending if the pool is at `maxsize` and
    /// every connection is checked out. FIFO among waiters.
    pub async fn acquire(&self) -> Result<PooledConnection<A>> {
        let mut state = self.inner.state.lock().await;
        loop {
            if state.status != PoolStatus::Opened {
                return Err(KlickhouseError::PoolClosed);
            }

            if let Some(conn) = state.free.pop_front() {
                if conn.is_closed() {
                    continue;
                }
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                state.in_use.insert(id, conn.clone());
                return Ok(self.wrap(id, conn));
            }

            if state.free.len() + state.in_use.len() < self.inner.pool_options.maxsize {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                drop(state);
                return match self.open_one().await {
                    Ok(conn) => {
                        let mut state = self.inner.state.lock().await;
                        state.in_use.insert(id, conn.clone());
                        Ok(self.wrap(id, conn))
                    }
                    Err(e) => {
                        let mut state = self.inner.state.lock().await;
                        Self::wake_one_for_retry(&mut state);
                        Err(e)
                    }
                };
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(Waiter { response: tx });
            drop(state);

            match rx.await {
                Ok(Some(conn)) => {
                    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                    let mut state = self.inner.state.lock().await;
                    state.in_use.insert(id, conn.clone());
                    return Ok(self.wrap(id, conn));
                }
                Ok(None) | Err(_) => {
                    state = self.inner.state.lock().await;
                    continue;
                }
            }
        }
    }

    /// Returns a connection to the pool. Discards it (and shrinks the pool)
    /// if it's closed; otherwise resets transient context and either hands
    /// it straight to the oldest waiter or returns it to the free list.
    async fn release_by_id(&self, id: u64, conn: Connection) {
        let mut state = self.inner.state.lock().await;
        state.in_use.remove(&id);

        if state.status != PoolStatus::Opened || conn.is_closed() {
            Self::wake_one_for_retry(&mut state);
            drop(state);
            conn.close().await;
            return;
        }

        conn.reset_state();
        if let Some(conn) = Self::dispatch_to_waiter(&mut state, conn) {
            state.free.push_back(conn);
        }
    }

    /// Explicit release, for callers not using the [`Pool::connection`]
    /// scope guard.
    pub async fn release(&self, pooled: PooledConnection<A>) {
        let mut pooled = pooled;
        if let Some(conn) = pooled.connection.take() {
            self.release_by_id(pooled.id, conn).await;
        }
    }

    /// Acquires a connection wrapped in a scope guard that releases it back
    /// to the pool when dropped.
    pub async fn connection(&self) -> Result<PooledConnection<A>> {
        self.acquire().await
    }

    fn wrap(&self, id: u64, connection: Connection) -> PooledConnection<A> {
        PooledConnection {
            pool: self.clone(),
            id,
            connection: Some(connection),
        }
    }

    /// Total number of connections, free plus checked out.
    pub async fn size(&self) -> usize {
        let state = self.inner.state.lock().await;
        state.free.len() + state.in_use.len()
    }

    /// Number of idle, immediately acquirable connections.
    pub async fn freesize(&self) -> usize {
        self.inner.state.lock().await.free.len()
    }

    pub fn minsize(&self) -> usize {
        self.inner.pool_options.minsize
    }

    pub fn maxsize(&self) -> usize {
        self.inner.pool_options.maxsize
    }
}

/// A checked-out connection. Releases itself back to its pool (via a
/// spawned task) when dropped, or immediately via [`Pool::release`].
pub struct PooledConnection<A: ToSocketAddrs + Clone + Send + Sync + 'static> {
    pool: Pool<A>,
    id: u64,
    connection: Option<Connection>,
}

impl<A: ToSocketAddrs + Clone + Send + Sync + 'static> Deref for PooledConnection<A> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.connection
            .as_ref()
            .expect("connection already released")
    }
}

impl<A: ToSocketAddrs + Clone + Send + Sync + 'static> DerefMut for PooledConnection<A> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.connection
            .as_mut()
            .expect("connection already released")
    }
}

impl<A: ToSocketAddrs + Clone + Send + Sync + 'static> Drop for PooledConnection<A> {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.take() {
            let pool = self.pool.clone();
            let id = self.id;
            tokio::spawn(async move {
                pool.release_by_id(id, conn).await;
            });
        }
    }
}
