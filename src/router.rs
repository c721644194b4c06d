use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::request::RequestContext;

/// Routes requests through an ordered list of dispatchers.
///
#[derive(Clone, Default)]
pub struct Router {
    dispatchers: Vec<Arc<dyn Dispatcher>>,
}

impl Router {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, dispatcher: Arc<dyn Dispatcher>) -> &mut Self {
        self.dispatchers.push(dispatcher);
        self
    }

    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }

    /// Calls each dispatcher in order until one of them selects an endpoint
    /// or installs a handler.
    ///
    /// Returns `Ok(())` with neither set when nothing matched.
    ///
    pub fn route(&self, request: &mut RequestContext) -> Result<()> {
        for dispatcher in &self.dispatchers {
            dispatcher.dispatch(request)?;

            if request.is_handled() {
                return Ok(());
            }
        }

        tracing::trace!(
            method = %request.method(),
            path = request.path(),
            "request did not match any endpoint",
        );

        Ok(())
    }
}

impl FromIterator<Arc<dyn Dispatcher>> for Router {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Dispatcher>>>(iter: I) -> Self {
        Self {
            dispatchers: iter.into_iter().collect(),
        }
    }
}
