//! # Request Scope
//!
//! A [`CallScope`] carries the deadline and cancellation signal of one
//! request through every collaborator call. Each call is raced against both;
//! once either fires, the pending call is dropped and the request fails with
//! `Cancelled` or `DeadlineExceeded`. [`CallScope::check`] is consulted
//! before issuing each new sub-call.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use verdict_core::DecisionError;

/// Deadline and cancellation signal for one request.
#[derive(Debug, Clone)]
pub struct CallScope {
    deadline: Option<Instant>,
    cancel_rx: watch::Receiver<bool>,
}

/// Cancels the [`CallScope`] it was created with, and all its clones.
#[derive(Debug)]
pub struct CancelHandle {
    cancel_tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

impl Default for CallScope {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl CallScope {
    /// A scope with no deadline that can never be cancelled.
    pub fn unbounded() -> Self {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            deadline: None,
            cancel_rx,
        }
    }

    /// A cancellable scope with no deadline.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancel_rx,
            },
            CancelHandle { cancel_tx },
        )
    }

    /// Bound this scope by `timeout` from now, keeping any earlier deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound this scope by `deadline`, keeping any earlier deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Fail if the scope is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), DecisionError> {
        if self.is_cancelled() {
            return Err(DecisionError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(DecisionError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run `fut` unless the scope is cancelled or its deadline passes first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, DecisionError>
    where
        F: Future,
    {
        self.check()?;

        let mut cancel_rx = self.cancel_rx.clone();
        let cancelled = async move {
            loop {
                if *cancel_rx.borrow_and_update() {
                    return;
                }
                if cancel_rx.changed().await.is_err() {
                    // Sender gone: cancellation can no longer happen.
                    std::future::pending::<()>().await;
                }
            }
        };
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(DecisionError::Cancelled),
            _ = expired => Err(DecisionError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
