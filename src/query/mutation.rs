//! Mutation executor: runs write operations and invalidates what they touch.
//!
//! Each mutation declares, up front, which part of the key space its success
//! may have made stale. The state machine is
//! `idle → pending → (success → invalidation applied → idle) | (error → idle)`;
//! the invalidation step runs only after the transport call resolves
//! successfully, and failures propagate unchanged with no retry.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::debug;

use crate::query::cache::QueryCache;
use crate::query::key::QueryKey;
use crate::transport::TransportError;

/// Observable state of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Pending,
}

type RunFn<In, Out> =
    Arc<dyn Fn(In) -> BoxFuture<'static, Result<Out, TransportError>> + Send + Sync>;
type InvalidateFn<In, Out> = Arc<dyn Fn(&In, &Out) -> Vec<QueryKey> + Send + Sync>;

/// A write operation bound to the cache it must keep coherent.
pub struct Mutation<In, Out> {
    cache: QueryCache,
    run: RunFn<In, Out>,
    invalidates: InvalidateFn<In, Out>,
    state_tx: watch::Sender<MutationState>,
}

impl<In, Out> Mutation<In, Out>
where
    In: Clone + Send + 'static,
    Out: Send + 'static,
{
    /// Build a mutation from its transport call and its declared
    /// invalidation set (computed from the input and the server's result).
    pub fn new<F, Fut, Inv>(cache: QueryCache, run: F, invalidates: Inv) -> Self
    where
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, TransportError>> + Send + 'static,
        Inv: Fn(&In, &Out) -> Vec<QueryKey> + Send + Sync + 'static,
    {
        let (state_tx, _rx) = watch::channel(MutationState::Idle);
        Self {
            cache,
            run: Arc::new(move |input| run(input).boxed()),
            invalidates: Arc::new(invalidates),
            state_tx,
        }
    }

    /// Observe idle/pending transitions, e.g. to disable a submit button.
    pub fn state(&self) -> watch::Receiver<MutationState> {
        self.state_tx.subscribe()
    }

    /// Run the operation. On success the declared key-space subset is
    /// invalidated before the state returns to idle; on failure the
    /// classified transport error propagates untouched.
    pub async fn execute(&self, input: In) -> Result<Out, TransportError> {
        self.state_tx.send_replace(MutationState::Pending);

        let result = (self.run)(input.clone()).await;

        match result {
            Ok(output) => {
                for prefix in (self.invalidates)(&input, &output) {
                    debug!(%prefix, "mutation invalidating");
                    self.cache.invalidate(&prefix);
                }
                self.state_tx.send_replace(MutationState::Idle);
                Ok(output)
            }
            Err(err) => {
                self.state_tx.send_replace(MutationState::Idle);
                Err(err)
            }
        }
    }
}
