//! Events whose handlers can hold up or veto the initiator.
//!
//! Handlers register async gates with [`Cancellable::wait`]. The initiator
//! then awaits [`Cancellable::settle`] (or consumes [`Cancellable::results`])
//! and learns whether every gate finished, one of them cancelled, or one
//! failed outright.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::trace;

pub type Gate = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

/// Handed to every gate so it can veto the event.
#[derive(Clone, Debug)]
pub struct Canceller(CancellationToken);

impl Canceller {
    pub fn cancel(&self) { self.0.cancel() }

    pub fn is_cancelled(&self) -> bool { self.0.is_cancelled() }
}

pub struct Cancellable<E> {
    pub payload: E,
    gates: Vec<Gate>,
    token: CancellationToken,
}

#[derive(Debug)]
pub enum Settled<E> {
    Resolved(E),
    Cancelled,
    Failed(anyhow::Error),
}

impl<E> Settled<E> {
    pub fn is_resolved(&self) -> bool { matches!(self, Settled::Resolved(_)) }

    pub fn is_cancelled(&self) -> bool { matches!(self, Settled::Cancelled) }
}

impl<E> Cancellable<E> {
    pub fn new(payload: E) -> Self {
        Cancellable {
            payload,
            gates: Vec::new(),
            token: CancellationToken::new(),
        }
    }

    /// Registers a gate. The event resolves only after every gate completes.
    pub fn wait<F, Fut>(&mut self, gate: F)
    where
        F: FnOnce(Canceller) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let fut = gate(self.canceller());
        self.gates.push(Box::pin(fut));
    }

    pub fn canceller(&self) -> Canceller { Canceller(self.token.clone()) }

    /// Cancels synchronously from inside a handler.
    pub fn cancel(&self) { self.token.cancel() }

    pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }

    pub fn pending(&self) -> usize { self.gates.len() }

    /// Drives all gates concurrently. Cancellation wins over completion of
    /// the remaining gates; the first gate error wins over everything else.
    pub async fn settle(self) -> Settled<E> {
        let Cancellable { payload, gates, token } = self;
        let mut pending: Vec<Option<Gate>> = gates.into_iter().map(Some).collect();
        let mut cancelled = std::pin::pin!(token.cancelled());

        let outcome = std::future::poll_fn(|cx| {
            if cancelled.as_mut().poll(cx).is_ready() {
                return Poll::Ready(Ok(false));
            }
            let mut done = true;
            for slot in pending.iter_mut() {
                let Some(gate) = slot else { continue };
                match gate.as_mut().poll(cx) {
                    Poll::Ready(Ok(())) => *slot = None,
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                    Poll::Pending => done = false,
                }
                if token.is_cancelled() {
                    return Poll::Ready(Ok(false));
                }
            }
            if done { Poll::Ready(Ok(true)) } else { Poll::Pending }
        })
        .await;

        match outcome {
            Ok(true) => Settled::Resolved(payload),
            Ok(false) => {
                trace!("cancellable event vetoed");
                Settled::Cancelled
            }
            Err(err) => Settled::Failed(err),
        }
    }
}

impl<E: 'static> Cancellable<E> {
    /// Stream view of [`Cancellable::settle`]: yields the payload once on
    /// resolution, ends without an item on cancellation, and yields the error
    /// on failure.
    pub fn results(self) -> Results<E> {
        Results {
            settle: Some(Box::pin(self.settle())),
        }
    }
}

pub struct Results<E> {
    settle: Option<Pin<Box<dyn Future<Output = Settled<E>>>>>,
}

impl<E> Stream for Results<E> {
    type Item = anyhow::Result<E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(settle) = this.settle.as_mut() else {
            return Poll::Ready(None);
        };
        let Poll::Ready(settled) = settle.as_mut().poll(cx) else {
            return Poll::Pending;
        };
        this.settle = None;
        Poll::Ready(match settled {
            Settled::Resolved(payload) => Some(Ok(payload)),
            Settled::Cancelled => None,
            Settled::Failed(err) => Some(Err(err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use anyhow::anyhow;
    use tokio::sync::oneshot;
    use tokio_stream::StreamExt;

    use super::*;

    #[tokio::test]
    async fn resolves_without_gates() {
        let event = Cancellable::new(7);
        assert_eq!(event.pending(), 0);
        assert!(matches!(event.settle().await, Settled::Resolved(7)));
    }

    #[tokio::test]
    async fn resolves_after_every_gate() {
        let finished = Rc::new(Cell::new(0));
        let mut event = Cancellable::new("close");
        for _ in 0..3 {
            let finished = finished.clone();
            event.wait(move |_| async move {
                tokio::task::yield_now().await;
                finished.set(finished.get() + 1);
                Ok(())
            });
        }
        assert!(event.settle().await.is_resolved());
        assert_eq!(finished.get(), 3);
    }

    #[tokio::test]
    async fn gate_can_cancel() {
        let mut event = Cancellable::new(());
        event.wait(|canceller| async move {
            canceller.cancel();
            Ok(())
        });
        event.wait(|_| std::future::pending());
        assert!(event.settle().await.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_from_handler_before_settle() {
        let event = Cancellable::new(());
        event.cancel();
        assert!(event.is_cancelled());
        assert!(event.settle().await.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_while_waiting_on_external_signal() {
        let (tx, rx) = oneshot::channel::<bool>();
        let mut event = Cancellable::new(());
        event.wait(|canceller| async move {
            if !rx.await? {
                canceller.cancel();
            }
            Ok(())
        });
        event.wait(|_| std::future::pending());
        let (settled, _) = tokio::join!(event.settle(), async move {
            tokio::task::yield_now().await;
            let _ = tx.send(false);
        });
        assert!(settled.is_cancelled());
    }

    #[tokio::test]
    async fn failure_is_distinct_from_cancel() {
        let mut event = Cancellable::new(());
        event.wait(|_| async { Err(anyhow!("disk full")) });
        match event.settle().await {
            Settled::Failed(err) => assert_eq!(err.to_string(), "disk full"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn results_stream() {
        let event = Cancellable::new(1);
        let items: Vec<_> = event.results().collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(*items[0].as_ref().unwrap(), 1);

        let mut vetoed = Cancellable::new(2);
        vetoed.wait(|c| async move {
            c.cancel();
            Ok(())
        });
        let mut stream = vetoed.results();
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());

        let mut failing = Cancellable::new(3);
        failing.wait(|_| async { Err(anyhow!("boom")) });
        let items: Vec<_> = failing.results().collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
