mod method;
mod values;

use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::request::RequestContext;

pub use method::MethodSelector;
pub use values::{ValueIndex, ValueSelector};

/// A step in the endpoint selection pipeline.
///
/// A selector narrows the candidates in `cx` and then calls
/// [`SelectorContext::invoke_next`] to hand them to the rest of the
/// pipeline. A selector that does not call `invoke_next` ends the pipeline
/// with whatever candidates it left behind.
///
pub trait EndpointSelector: Send + Sync {
    fn select(&self, cx: &mut SelectorContext) -> Result<()>;
}

/// The request scoped state of a single run through the pipeline.
///
pub struct SelectorContext<'a> {
    selectors: &'a [Arc<dyn EndpointSelector>],
    cursor: usize,
    candidates: Vec<Arc<Endpoint>>,
    request: &'a mut RequestContext,
}

/// A saved position in the pipeline and the candidates at that position.
///
#[derive(Clone)]
pub struct SelectorSnapshot {
    cursor: usize,
    candidates: Vec<Arc<Endpoint>>,
}

impl<'a> SelectorContext<'a> {
    pub fn new(
        selectors: &'a [Arc<dyn EndpointSelector>],
        candidates: Vec<Arc<Endpoint>>,
        request: &'a mut RequestContext,
    ) -> Self {
        Self {
            selectors,
            cursor: 0,
            candidates,
            request,
        }
    }

    pub fn candidates(&self) -> &[Arc<Endpoint>] {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut Vec<Arc<Endpoint>> {
        &mut self.candidates
    }

    pub fn set_candidates(&mut self, candidates: Vec<Arc<Endpoint>>) {
        self.candidates = candidates;
    }

    pub fn request(&self) -> &RequestContext {
        &*self.request
    }

    pub fn request_mut(&mut self) -> &mut RequestContext {
        &mut *self.request
    }

    /// Returns true if the pipeline has produced a candidate or a selector
    /// installed a handler.
    ///
    pub fn is_selected(&self) -> bool {
        !self.candidates.is_empty() || self.request.handler().is_some()
    }

    /// Calls the selector at the cursor and advances the cursor. Does
    /// nothing once every selector has run.
    ///
    pub fn invoke_next(&mut self) -> Result<()> {
        let selectors = self.selectors;

        match selectors.get(self.cursor) {
            Some(selector) => {
                self.cursor += 1;
                selector.select(self)
            }
            None => Ok(()),
        }
    }

    pub fn snapshot(&self) -> SelectorSnapshot {
        SelectorSnapshot {
            cursor: self.cursor,
            candidates: self.candidates.clone(),
        }
    }

    /// Moves the cursor and candidates back to where they were when
    /// `snapshot` was taken.
    ///
    pub fn restore(&mut self, snapshot: SelectorSnapshot) {
        self.cursor = snapshot.cursor;
        self.candidates = snapshot.candidates;
    }

    pub fn into_candidates(self) -> Vec<Arc<Endpoint>> {
        self.candidates
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use std::sync::{Arc, Mutex};

    use super::{EndpointSelector, SelectorContext};
    use crate::endpoint::Endpoint;
    use crate::error::Result;
    use crate::request::RequestContext;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl EndpointSelector for Record {
        fn select(&self, cx: &mut SelectorContext) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            cx.invoke_next()
        }
    }

    struct KeepFirst;

    impl EndpointSelector for KeepFirst {
        fn select(&self, cx: &mut SelectorContext) -> Result<()> {
            cx.candidates_mut().truncate(1);
            cx.invoke_next()
        }
    }

    fn endpoints(names: &[&str]) -> Vec<Arc<Endpoint>> {
        names
            .iter()
            .map(|name| Arc::new(Endpoint::builder(*name).build()))
            .collect()
    }

    #[test]
    fn test_invoke_next_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let selectors: Vec<Arc<dyn EndpointSelector>> = vec![
            Arc::new(Record {
                name: "first",
                log: Arc::clone(&log),
            }),
            Arc::new(KeepFirst),
            Arc::new(Record {
                name: "last",
                log: Arc::clone(&log),
            }),
        ];

        let mut request = RequestContext::new(Method::GET, "/");
        let mut cx = SelectorContext::new(&selectors, endpoints(&["a", "b"]), &mut request);

        cx.invoke_next().unwrap();
        // Past the end is a no-op.
        cx.invoke_next().unwrap();

        assert_eq!(*log.lock().unwrap(), ["first", "last"]);
        assert_eq!(cx.candidates().len(), 1);
    }

    #[test]
    fn test_restore_replays_snapshot() {
        let selectors: Vec<Arc<dyn EndpointSelector>> = vec![Arc::new(KeepFirst)];
        let mut request = RequestContext::new(Method::GET, "/");
        let mut cx = SelectorContext::new(&selectors, endpoints(&["a", "b", "c"]), &mut request);
        let snapshot = cx.snapshot();

        cx.invoke_next().unwrap();
        assert_eq!(cx.candidates().len(), 1);

        cx.restore(snapshot);
        assert_eq!(cx.candidates().len(), 3);

        cx.invoke_next().unwrap();
        assert_eq!(cx.into_candidates()[0].display_name(), "a");
    }
}
