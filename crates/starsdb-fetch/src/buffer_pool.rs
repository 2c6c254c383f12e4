use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Pool of reusable byte buffers for cache decompression.
///
/// Buffers are cleared when handed out and returned when their guard drops.
/// Buffers that grew past the configured capacity are dropped instead of
/// being kept around.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::new()),
                capacity,
            }),
        }
    }

    pub fn take(&self) -> PooledBuffer {
        let buf = self
            .inner
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.inner.capacity.min(64 * 1024)));
        PooledBuffer {
            buf,
            pool: self.inner.clone(),
        }
    }

    /// Buffers currently idle in the pool.
    pub fn idle(&self) -> usize {
        self.inner.free.lock().len()
    }
}

pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        if buf.capacity() > self.pool.capacity {
            return;
        }
        buf.clear();
        self.pool.free.lock().push(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_are_reused_and_cleared() {
        let pool = BufferPool::new(1024);
        {
            let mut buf = pool.take();
            buf.extend_from_slice(b"hello");
        }
        assert_eq!(pool.idle(), 1);

        let buf = pool.take();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 5);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_oversized_buffers_are_not_kept() {
        let pool = BufferPool::new(16);
        {
            let mut buf = pool.take();
            buf.extend_from_slice(&[0u8; 1024]);
        }
        assert_eq!(pool.idle(), 0);
    }
}
