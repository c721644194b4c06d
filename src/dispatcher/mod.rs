mod tree;
mod values;

use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::request::RequestContext;
use crate::selector::{EndpointSelector, SelectorContext};

pub use tree::{RouteTable, TreeDispatcher};
pub use values::ValueDispatcher;

/// Selects an endpoint for a request.
///
/// A dispatcher that cannot find an endpoint returns `Ok(())` and leaves the
/// request untouched so the next dispatcher can try.
///
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, request: &mut RequestContext) -> Result<()>;
}

/// The result of running the selector pipeline over one seed set.
enum Outcome {
    Handled,
    Selected(Arc<Endpoint>),
    Empty,
}

/// Runs `selectors` over `candidates` and reduces the surviving candidates
/// to a single endpoint.
///
fn run_pipeline(
    selectors: &[Arc<dyn EndpointSelector>],
    candidates: Vec<Arc<Endpoint>>,
    request: &mut RequestContext,
) -> Result<Outcome> {
    let mut cx = SelectorContext::new(selectors, candidates, request);

    cx.invoke_next()?;

    if cx.request().handler().is_some() {
        return Ok(Outcome::Handled);
    }

    let mut candidates = cx.into_candidates();

    match candidates.len() {
        0 => Ok(Outcome::Empty),
        1 => Ok(candidates.pop().map_or(Outcome::Empty, Outcome::Selected)),
        _ => Err(Error::ambiguous_match(
            candidates.iter().map(|endpoint| endpoint.display_name()),
        )),
    }
}
