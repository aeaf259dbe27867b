//! One-shot result channels between native modules and the scripting layer.
//!
//! Every call from the scripting layer gets a [`Promise`]. Settling consumes the promise, so a
//! call can't be settled twice, and a promise dropped without being settled is reported as a
//! rejection. Either way the shell hears about every call exactly once.

use std::collections::BTreeMap;
use std::fmt;

use crux_bridge::{BridgeValue, CallId, PromiseError, Settlement};
use futures::channel::oneshot;

/// Rejection code for calls whose promise was dropped unsettled.
pub const UNSETTLED_CODE: &str = "E_UNSETTLED";

/// The native half of a call. Settle it exactly once with [`Promise::resolve`] or
/// [`Promise::reject`].
#[must_use = "a promise dropped without being settled rejects its call"]
pub struct Promise {
    call_id: CallId,
    sender: oneshot::Sender<Settlement>,
}

impl Promise {
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn resolve(self, value: impl Into<BridgeValue>) {
        self.settle(Settlement::Resolved(value.into()));
    }

    pub fn reject(self, error: PromiseError) {
        self.settle(Settlement::Rejected(error));
    }

    pub fn settle(self, settlement: Settlement) {
        let call_id = self.call_id;
        if self.sender.send(settlement).is_err() {
            tracing::debug!(call_id, "settled a call nobody waits for");
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("call_id", &self.call_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Call {call_id} is already pending")]
pub struct DuplicateCall {
    pub call_id: CallId,
}

/// The receiving halves of all calls which haven't been reported to the shell yet.
#[derive(Default)]
pub struct PendingCalls {
    calls: BTreeMap<CallId, oneshot::Receiver<Settlement>>,
}

impl PendingCalls {
    /// Open a call, returning the promise which settles it.
    pub fn open(&mut self, call_id: CallId) -> Result<Promise, DuplicateCall> {
        if self.calls.contains_key(&call_id) {
            return Err(DuplicateCall { call_id });
        }
        let (sender, receiver) = oneshot::channel();
        self.calls.insert(call_id, receiver);
        Ok(Promise { call_id, sender })
    }

    pub fn contains(&self, call_id: CallId) -> bool {
        self.calls.contains_key(&call_id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Remove and return every call which has been settled or abandoned, ordered by call id.
    pub fn drain_settled(&mut self) -> Vec<(CallId, Settlement)> {
        let mut settled = Vec::new();
        self.calls
            .retain(|&call_id, receiver| match receiver.try_recv() {
                Ok(None) => true,
                Ok(Some(settlement)) => {
                    settled.push((call_id, settlement));
                    false
                }
                Err(oneshot::Canceled) => {
                    tracing::warn!(call_id, "promise dropped without being settled");
                    settled.push((
                        call_id,
                        Settlement::Rejected(PromiseError::new(
                            UNSETTLED_CODE,
                            "The native module dropped the call without settling it",
                        )),
                    ));
                    false
                }
            });
        settled
    }
}
