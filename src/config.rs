use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::collection::EndpointCollection;
use crate::constraint::ConstraintResolver;
use crate::dispatcher::{Dispatcher, TreeDispatcher, ValueDispatcher};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::metadata::{AuthorizationPolicy, CorsPolicy};
use crate::router::Router;
use crate::selector::{EndpointSelector, MethodSelector, ValueSelector};

/// A declarative description of a router.
///
/// ```json
/// {
///     "dispatchers": [
///         {
///             "kind": "tree",
///             "endpoints": [
///                 { "name": "Users.Show", "template": "users/{id:int}", "methods": ["GET"] }
///             ]
///         }
///     ]
/// }
/// ```
///
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    pub dispatchers: Vec<DispatcherConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    pub kind: DispatcherKind,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatcherKind {
    /// Match the request path against route templates.
    Tree,

    /// Match the route values of the request against required values.
    Values,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub name: String,

    #[serde(default)]
    pub order: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors: Option<String>,
}

impl RoutingConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a router with one dispatcher per entry in `dispatchers`.
    ///
    /// Routing tables are built eagerly so invalid templates and unknown
    /// constraints are reported here rather than on the first request.
    ///
    pub fn build(&self, resolver: &ConstraintResolver) -> Result<Router> {
        let mut router = Router::new();

        for config in &self.dispatchers {
            let endpoints = config
                .endpoints
                .iter()
                .map(|endpoint| endpoint.build().map(Arc::new))
                .collect::<Result<Vec<_>>>()?;

            let collection = Arc::new(EndpointCollection::from_endpoints(endpoints));
            let dispatcher: Arc<dyn Dispatcher> = match config.kind {
                DispatcherKind::Tree => {
                    let selectors: Vec<Arc<dyn EndpointSelector>> = vec![Arc::new(MethodSelector)];
                    let dispatcher = TreeDispatcher::new(collection, selectors, resolver.clone());

                    dispatcher.table()?;
                    Arc::new(dispatcher)
                }
                DispatcherKind::Values => {
                    let selectors: Vec<Arc<dyn EndpointSelector>> = vec![
                        Arc::new(MethodSelector),
                        Arc::new(ValueSelector::new(Arc::clone(&collection))),
                    ];

                    Arc::new(ValueDispatcher::new(collection, selectors))
                }
            };

            router.push(dispatcher);
        }

        Ok(router)
    }
}

impl EndpointConfig {
    fn build(&self) -> Result<Endpoint> {
        let mut builder = Endpoint::builder(&self.name);

        if let Some(template) = &self.template {
            builder = builder.route(self.order, template);
        }

        if !self.methods.is_empty() {
            let methods = self
                .methods
                .iter()
                .map(|name| Method::from_bytes(name.as_bytes()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| Error::InvalidMethod(self.methods.join(", ")))?;

            builder = builder.methods(methods);
        }

        for (key, value) in self.values.iter().flatten() {
            builder = builder.value(key, value);
        }

        if let Some(policy) = &self.authorization {
            builder = builder.metadata(AuthorizationPolicy {
                policy: policy.clone(),
            });
        }

        if let Some(policy) = &self.cors {
            builder = builder.metadata(CorsPolicy {
                policy: policy.clone(),
            });
        }

        Ok(builder.build())
    }
}
