//! Reusable copy buffers

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// Size of each relay buffer
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Idle buffers kept around for reuse; extras are freed on release
const DEFAULT_MAX_IDLE: usize = 8;

/// Pool of fixed-size byte buffers.
///
/// Each relay direction takes one buffer for its whole copy loop, so the
/// loop itself never allocates.
#[derive(Debug)]
pub struct BufferPool {
    buffer_size: usize,
    max_idle: usize,
    idle: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            max_idle: DEFAULT_MAX_IDLE,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of buffers waiting for reuse
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Take a buffer; it goes back to the pool when the guard is dropped
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let buf = self
            .idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .unwrap_or_else(|| vec![0u8; self.buffer_size]);

        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    fn release(&self, buf: Vec<u8>) {
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

/// A buffer on loan from a [`BufferPool`]
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_are_default_size() {
        let pool = Arc::new(BufferPool::default());
        let buf = pool.acquire();
        assert_eq!(buf.len(), 2048);
        assert_eq!(pool.buffer_size(), 2048);
    }

    #[test]
    fn test_released_buffer_is_reused() {
        let pool = Arc::new(BufferPool::new(16));
        {
            let mut buf = pool.acquire();
            buf[0] = 0xAB;
        }
        assert_eq!(pool.idle(), 1);

        let buf = pool.acquire();
        assert_eq!(pool.idle(), 0);
        // Same allocation came back
        assert_eq!(buf[0], 0xAB);
    }

    #[test]
    fn test_idle_is_bounded() {
        let pool = Arc::new(BufferPool::new(4));
        let held: Vec<_> = (0..DEFAULT_MAX_IDLE + 4).map(|_| pool.acquire()).collect();
        drop(held);
        assert_eq!(pool.idle(), DEFAULT_MAX_IDLE);
    }

    #[test]
    fn test_pools_are_independent() {
        let a = Arc::new(BufferPool::new(8));
        let b = Arc::new(BufferPool::new(8));
        drop(a.acquire());
        assert_eq!(a.idle(), 1);
        assert_eq!(b.idle(), 0);
    }
}
