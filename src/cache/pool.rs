//! Reusable serialization buffers.
//!
//! Search responses are encoded into buffers borrowed from a [`BufferPool`].
//! The encoded body is shared by the query cache and every response that
//! serves it; once the cache generation holding it is flushed, its release
//! action hands the buffer back if no response still references it.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde::Serialize;

use super::generation::Release;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::pool";

pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
    buffer_capacity: usize,
}

impl BufferPool {
    pub fn new(max_idle: usize, buffer_capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            buffer_capacity,
        }
    }

    /// An empty buffer, reused when one is idle.
    pub fn take(&self) -> Vec<u8> {
        mutex_lock(&self.idle, SOURCE, "take")
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.buffer_capacity))
    }

    /// Return a buffer. Dropped instead when the pool is full or the buffer
    /// grew far past the configured size.
    pub fn give_back(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() > self.buffer_capacity.saturating_mul(4) {
            return;
        }
        buffer.clear();
        let mut idle = mutex_lock(&self.idle, SOURCE, "give_back");
        if idle.len() < self.max_idle {
            idle.push(buffer);
        }
    }

    pub fn idle(&self) -> usize {
        mutex_lock(&self.idle, SOURCE, "idle").len()
    }

    /// Serialize `value` as JSON into a pooled buffer.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<PooledBody, serde_json::Error> {
        let mut buffer = self.take();
        match serde_json::to_writer(&mut buffer, value) {
            Ok(()) => Ok(PooledBody(Arc::new(buffer))),
            Err(err) => {
                self.give_back(buffer);
                Err(err)
            }
        }
    }
}

/// An encoded response body backed by a pooled buffer.
#[derive(Debug, Clone)]
pub struct PooledBody(Arc<Vec<u8>>);

impl PooledBody {
    /// Zero-copy view usable as an HTTP body.
    pub fn bytes(&self) -> Bytes {
        Bytes::from_owner(self.clone())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Release action returning the buffer to `pool`. The buffer is only
    /// reclaimed if this is the last reference when the action runs.
    pub fn release_to(&self, pool: &Arc<BufferPool>) -> Release {
        let body = Arc::clone(&self.0);
        let pool = Arc::clone(pool);
        Box::new(move || {
            if let Ok(buffer) = Arc::try_unwrap(body) {
                pool.give_back(buffer);
            }
        })
    }
}

impl AsRef<[u8]> for PooledBody {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
