//! Event subscriptions.
//!
//! Subscribing returns a [`Subscription`], a first-class cancel handle for
//! exactly one listener on exactly one event. Dropping the handle does not
//! unsubscribe.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chunknet_types::abi::{self, DynSolValue};
use chunknet_types::{DecodeError, EpochId, MetricId};

type Cancel = Box<dyn FnOnce() -> bool + Send>;

/// Handle removing one listener from one event.
pub struct Subscription {
    event: &'static str,
    cancel: Mutex<Option<Cancel>>,
}

impl Subscription {
    pub(crate) fn new<F>(event: &'static str, cancel: F) -> Self
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        Self {
            event,
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Name of the event this subscription listens to.
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has not run yet.
    pub fn is_active(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Remove the listener.
    ///
    /// Only the first call has an effect; it returns whether the binding
    /// still had the listener registered. Later calls return `false`.
    pub fn unsubscribe(&self) -> bool {
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match cancel {
            Some(cancel) => cancel(),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish()
    }
}

fn expect_args(args: &[DynSolValue], count: usize) -> Result<(), DecodeError> {
    if args.len() != count {
        return Err(DecodeError::FieldCount {
            expected: count,
            found: args.len(),
        });
    }
    Ok(())
}

/// Payload of `NewMetric` and `MetricInfoUpdated`.
pub(crate) fn decode_name(args: &[DynSolValue]) -> Result<String, DecodeError> {
    expect_args(args, 1)?;
    Ok(abi::as_str(&args[0])?.to_string())
}

/// Payload of `MetricUpdated`.
pub(crate) fn decode_metric_updated(
    args: &[DynSolValue],
) -> Result<(EpochId, MetricId), DecodeError> {
    expect_args(args, 2)?;
    Ok((abi::as_uint(&args[0])?, abi::as_uint(&args[1])?))
}
