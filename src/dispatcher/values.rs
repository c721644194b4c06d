use std::sync::Arc;

use super::{Dispatcher, Outcome, run_pipeline};
use crate::collection::EndpointCollection;
use crate::error::Result;
use crate::request::RequestContext;
use crate::selector::EndpointSelector;

/// Dispatches conventionally routed endpoints. Every endpoint in the
/// collection is a candidate and the selectors decide which one applies,
/// usually with a [`ValueSelector`](crate::ValueSelector) over the same
/// collection.
///
pub struct ValueDispatcher {
    collection: Arc<EndpointCollection>,
    selectors: Vec<Arc<dyn EndpointSelector>>,
}

impl ValueDispatcher {
    pub fn new(
        collection: Arc<EndpointCollection>,
        selectors: Vec<Arc<dyn EndpointSelector>>,
    ) -> Self {
        Self {
            collection,
            selectors,
        }
    }

    pub fn collection(&self) -> &Arc<EndpointCollection> {
        &self.collection
    }
}

impl Dispatcher for ValueDispatcher {
    fn dispatch(&self, request: &mut RequestContext) -> Result<()> {
        let snapshot = self.collection.snapshot();

        if snapshot.endpoints().is_empty() {
            return Ok(());
        }

        match run_pipeline(&self.selectors, snapshot.endpoints().to_vec(), request)? {
            Outcome::Selected(endpoint) => {
                tracing::trace!(
                    endpoint = endpoint.display_name(),
                    "selected endpoint by route values",
                );
                request.set_endpoint(endpoint);
            }
            Outcome::Handled => {}
            Outcome::Empty => {
                tracing::trace!(path = request.path(), "no endpoint matched the route values");
            }
        }

        Ok(())
    }
}
