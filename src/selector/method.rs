use std::sync::Arc;

use super::{EndpointSelector, SelectorContext};
use crate::endpoint::Endpoint;
use crate::error::Result;

/// Narrows candidates to the endpoints that accept the request method.
///
/// Endpoints without [`HttpMethods`](crate::HttpMethods) metadata accept any
/// method. They are only used when none of the method specific endpoints
/// produce a selection further down the pipeline.
///
#[derive(Debug, Default)]
pub struct MethodSelector;

impl MethodSelector {
    pub fn new() -> Self {
        Self
    }
}

impl EndpointSelector for MethodSelector {
    fn select(&self, cx: &mut SelectorContext) -> Result<()> {
        let method = cx.request().method().clone();
        let mut matched = Vec::new();
        let mut fallback: Vec<Arc<Endpoint>> = Vec::new();

        for endpoint in cx.candidates() {
            match endpoint.methods() {
                Some(methods) if methods.contains(&method) => matched.push(Arc::clone(endpoint)),
                Some(_) => {}
                None => fallback.push(Arc::clone(endpoint)),
            }
        }

        let snapshot = cx.snapshot();

        cx.set_candidates(matched);
        cx.invoke_next()?;

        if cx.is_selected() || fallback.is_empty() {
            return Ok(());
        }

        tracing::trace!(
            method = %method,
            fallback = fallback.len(),
            "no method specific endpoint selected. trying method agnostic endpoints",
        );

        cx.restore(snapshot);
        cx.set_candidates(fallback);
        cx.invoke_next()
    }
}
