use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::trace;

/// Bounded-concurrency FIFO gate for outbound requests.
///
/// At most `ceiling` slots are held at once. Waiters are granted strictly in
/// the order they called [`AdmissionQueue::enqueue`]. A slot is released when
/// its [`AdmissionSlot`] is dropped, which makes release unconditional on
/// every exit path.
#[derive(Clone)]
pub struct AdmissionQueue {
    inner: Arc<Inner>,
}

struct Inner {
    ceiling: usize,
    state: Mutex<State>,
}

struct State {
    in_flight: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl AdmissionQueue {
    pub fn new(ceiling: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                ceiling: ceiling.max(1),
                state: Mutex::new(State {
                    in_flight: 0,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.inner.ceiling
    }

    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().in_flight
    }

    pub fn waiting(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }

    /// Join the queue. If a slot is free the returned future is already
    /// granted; otherwise it resolves once every earlier waiter has been served.
    pub fn enqueue(&self) -> Admission {
        let (tx, rx) = oneshot::channel();
        self.inner.state.lock().waiters.push_back(tx);
        self.inner.promote();

        Admission {
            rx,
            inner: self.inner.clone(),
            done: false,
        }
    }
}

impl Inner {
    /// Hand free slots to waiters at the head of the queue.
    ///
    /// The in-flight count is bumped under the lock before the waiter is
    /// signalled, so racing callers can never grant the same slot twice. No
    /// lock is held while signalling.
    fn promote(&self) {
        loop {
            let next = {
                let mut state = self.state.lock();
                if state.in_flight >= self.ceiling {
                    return;
                }
                match state.waiters.pop_front() {
                    Some(tx) => {
                        state.in_flight += 1;
                        tx
                    }
                    None => return,
                }
            };

            if next.send(()).is_err() {
                // Waiter gave up before being served.
                let mut state = self.state.lock();
                state.in_flight = state.in_flight.saturating_sub(1);
            }
        }
    }

    fn release(&self) {
        {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            trace!(in_flight = state.in_flight, waiting = state.waiters.len(), "admission slot released");
        }
        self.promote();
    }
}

/// Pending admission returned by [`AdmissionQueue::enqueue`].
pub struct Admission {
    rx: oneshot::Receiver<()>,
    inner: Arc<Inner>,
    done: bool,
}

impl Future for Admission {
    type Output = AdmissionSlot;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(_) => {
                this.done = true;
                Poll::Ready(AdmissionSlot {
                    inner: this.inner.clone(),
                })
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        // Granted but never observed: hand the slot back.
        self.rx.close();
        if self.rx.try_recv().is_ok() {
            self.inner.release();
        }
    }
}

/// A held admission slot. Dropping it releases the slot.
pub struct AdmissionSlot {
    inner: Arc<Inner>,
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.inner.release();
    }
}
