use arc_swap::ArcSwapOption;
use std::sync::{Arc, Mutex, PoisonError};

use wayfinder_router::{Router, Segments, TreeBuilder};

use super::{Dispatcher, Outcome, run_pipeline};
use crate::collection::EndpointCollection;
use crate::constraint::{ConstraintResolver, ResolvedConstraint, match_constraints};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::request::RequestContext;
use crate::selector::EndpointSelector;

/// Dispatches requests by matching the path against the route templates of
/// the endpoints in a collection.
///
/// The routing table is built on the first request and rebuilt on the first
/// request after the collection changes. Concurrent requests wait for a
/// single build.
///
pub struct TreeDispatcher {
    collection: Arc<EndpointCollection>,
    selectors: Vec<Arc<dyn EndpointSelector>>,
    resolver: ConstraintResolver,
    table: ArcSwapOption<RouteTable>,
    build_lock: Mutex<()>,
}

/// The url matching trees built from a single version of a collection.
///
#[derive(Debug)]
pub struct RouteTable {
    version: u64,
    entries: usize,
    router: Router<RouteTag>,
}

/// The endpoints that share a route entry and the constraints of its
/// template.
#[derive(Debug)]
struct RouteTag {
    endpoints: Vec<Arc<Endpoint>>,
    constraints: Vec<ResolvedConstraint>,
}

impl TreeDispatcher {
    pub fn new(
        collection: Arc<EndpointCollection>,
        selectors: Vec<Arc<dyn EndpointSelector>>,
        resolver: ConstraintResolver,
    ) -> Self {
        Self {
            collection,
            selectors,
            resolver,
            table: ArcSwapOption::empty(),
            build_lock: Mutex::new(()),
        }
    }

    pub fn collection(&self) -> &Arc<EndpointCollection> {
        &self.collection
    }

    /// Returns the routing table for the current version of the collection,
    /// building it if necessary.
    ///
    /// # Errors
    ///
    /// Fails if an endpoint has no route pattern, a template is invalid, or a
    /// template references a constraint that cannot be resolved.
    ///
    pub fn table(&self) -> Result<Arc<RouteTable>> {
        if let Some(table) = self.current() {
            return Ok(table);
        }

        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(table) = self.current() {
            return Ok(table);
        }

        let snapshot = self.collection.snapshot();
        let table = Arc::new(RouteTable::build(
            snapshot.version(),
            snapshot.endpoints(),
            &self.resolver,
        )?);

        tracing::debug!(
            version = table.version,
            trees = table.router.trees().len(),
            endpoints = snapshot.endpoints().len(),
            "built routing table",
        );

        self.table.store(Some(Arc::clone(&table)));
        Ok(table)
    }

    fn current(&self) -> Option<Arc<RouteTable>> {
        let table = self.table.load_full()?;
        (table.version == self.collection.version()).then_some(table)
    }
}

impl Dispatcher for TreeDispatcher {
    fn dispatch(&self, request: &mut RequestContext) -> Result<()> {
        let table = self.table()?;
        let path = request.path().to_owned();
        let segments = Segments::new(&path);

        for (entry, captures) in table.router.matches(&segments) {
            let tag = entry.tag();
            let saved = request.values().clone();
            let values = request.values_mut();

            // Parameters the path omitted must not see values from earlier
            // in the request.
            for parameter in entry.template().parameters() {
                values.remove(parameter.name().as_str());
            }

            for (key, value) in captures {
                values.insert(key.as_str(), value);
            }

            if !match_constraints(request.values(), &tag.constraints) {
                *request.values_mut() = saved;
                continue;
            }

            match run_pipeline(&self.selectors, tag.endpoints.clone(), request)? {
                Outcome::Handled => return Ok(()),
                Outcome::Selected(endpoint) => {
                    tracing::trace!(
                        path = %path,
                        template = %entry.template(),
                        endpoint = endpoint.display_name(),
                        "selected endpoint",
                    );

                    request.set_endpoint(endpoint);
                    return Ok(());
                }
                Outcome::Empty => {
                    *request.values_mut() = saved;
                }
            }
        }

        tracing::trace!(path = %path, "no endpoint matched the request path");
        Ok(())
    }
}

impl RouteTable {
    fn build(
        version: u64,
        endpoints: &[Arc<Endpoint>],
        resolver: &ConstraintResolver,
    ) -> Result<Self> {
        let mut builder = TreeBuilder::new();

        for endpoint in endpoints {
            let pattern = endpoint
                .route()
                .ok_or_else(|| Error::MissingRoute(endpoint.display_name().to_owned()))?;

            builder.push(pattern.order, &pattern.template, Arc::clone(endpoint));
        }

        let mut entries = 0;
        let router = builder.build(|template, endpoints| {
            entries += 1;
            Ok::<_, Error>(RouteTag {
                endpoints,
                constraints: resolver.resolve(template)?,
            })
        })?;

        Ok(Self {
            version,
            entries,
            router,
        })
    }

    /// The collection version the table was built from.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the number of distinct (order, template) pairs in the table.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use std::sync::Arc;

    use super::TreeDispatcher;
    use crate::collection::EndpointCollection;
    use crate::constraint::ConstraintResolver;
    use crate::dispatcher::Dispatcher;
    use crate::endpoint::Endpoint;
    use crate::error::Error;
    use crate::request::RequestContext;
    use crate::selector::{EndpointSelector, MethodSelector};

    fn dispatcher(endpoints: Vec<Endpoint>) -> TreeDispatcher {
        let collection = EndpointCollection::from_endpoints(
            endpoints.into_iter().map(Arc::new).collect(),
        );
        let selectors: Vec<Arc<dyn EndpointSelector>> = vec![Arc::new(MethodSelector)];

        TreeDispatcher::new(Arc::new(collection), selectors, ConstraintResolver::default())
    }

    fn dispatch(dispatcher: &TreeDispatcher, path: &str) -> RequestContext {
        let mut request = RequestContext::new(Method::GET, path);

        dispatcher.dispatch(&mut request).unwrap();
        request
    }

    fn selected(request: &RequestContext) -> Option<&str> {
        request.endpoint().map(|endpoint| endpoint.display_name())
    }

    #[test]
    fn test_literal_preferred_over_parameter() {
        let dispatcher = dispatcher(vec![
            Endpoint::builder("Users.Show").route(0, "users/{id}").build(),
            Endpoint::builder("Users.Me").route(0, "users/me").build(),
        ]);

        assert_eq!(selected(&dispatch(&dispatcher, "/users/me")), Some("Users.Me"));
        assert_eq!(selected(&dispatch(&dispatcher, "/USERS/12")), Some("Users.Show"));
    }

    #[test]
    fn test_constraint_failure_falls_through() {
        let dispatcher = dispatcher(vec![
            Endpoint::builder("ById").route(0, "items/{id:int}").build(),
            Endpoint::builder("BySlug").route(0, "items/{slug}").build(),
        ]);

        let request = dispatch(&dispatcher, "/items/42");
        assert_eq!(selected(&request), Some("ById"));
        assert_eq!(request.values().get("id"), Some("42"));

        let request = dispatch(&dispatcher, "/items/hello");
        assert_eq!(selected(&request), Some("BySlug"));
        assert_eq!(request.values().get("id"), None);
    }

    #[test]
    fn test_omitted_parameter_ignores_existing_value() {
        let dispatcher = dispatcher(vec![
            Endpoint::builder("Items").route(0, "items/{id:int?}").build(),
        ]);

        let mut request = RequestContext::new(Method::GET, "/items");

        request.values_mut().insert("id", "abc");
        request.values_mut().insert("tenant", "acme");
        dispatcher.dispatch(&mut request).unwrap();

        assert_eq!(selected(&request), Some("Items"));
        assert_eq!(request.values().get("id"), None);
        assert_eq!(request.values().get("tenant"), Some("acme"));

        let mut request = RequestContext::new(Method::GET, "/items/x");

        request.values_mut().insert("id", "abc");
        dispatcher.dispatch(&mut request).unwrap();

        assert!(request.endpoint().is_none());
        assert_eq!(request.values().get("id"), Some("abc"));
    }

    #[test]
    fn test_values_rolled_back_without_match() {
        let dispatcher = dispatcher(vec![
            Endpoint::builder("Post")
                .route(0, "posts/{id}")
                .methods([Method::POST])
                .build(),
        ]);

        let request = dispatch(&dispatcher, "/posts/1");

        assert!(request.endpoint().is_none());
        assert!(request.values().is_empty());
    }

    #[test]
    fn test_ambiguous_match() {
        let dispatcher = dispatcher(vec![
            Endpoint::builder("First").route(0, "same").build(),
            Endpoint::builder("Second").route(0, "/Same/").build(),
        ]);

        let mut request = RequestContext::new(Method::GET, "/same");
        let error = dispatcher.dispatch(&mut request).unwrap_err();

        assert!(matches!(error, Error::AmbiguousMatch(_)));
        assert_eq!(
            error.ambiguous_names(),
            Some(&["First".to_owned(), "Second".to_owned()][..])
        );
    }

    #[test]
    fn test_missing_route_pattern() {
        let dispatcher = dispatcher(vec![Endpoint::builder("Conventional").build()]);

        assert!(matches!(dispatcher.table(), Err(Error::MissingRoute(name)) if name == "Conventional"));
    }

    #[test]
    fn test_table_rebuilt_after_version_bump() {
        let dispatcher = dispatcher(vec![Endpoint::builder("A").route(0, "a").build()]);
        let first = dispatcher.table().unwrap();

        assert!(Arc::ptr_eq(&first, &dispatcher.table().unwrap()));
        assert!(selected(&dispatch(&dispatcher, "/b")).is_none());

        dispatcher
            .collection()
            .push(Endpoint::builder("B").route(0, "b").build());

        let second = dispatcher.table().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
        assert_eq!(selected(&dispatch(&dispatcher, "/b")), Some("B"));
    }
}
