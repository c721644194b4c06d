#![forbid(unsafe_code)]

mod address;
mod collection;
mod config;
mod constraint;
mod endpoint;
mod error;
mod metadata;
mod method;
mod request;
mod router;

pub mod dispatcher;
pub mod selector;

#[doc(inline)]
pub use self::{
    address::{Address, AddressTable},
    collection::{EndpointCollection, Snapshot},
    config::{DispatcherConfig, DispatcherKind, EndpointConfig, RoutingConfig},
    constraint::{
        ConstraintFactory, ConstraintResolver, ResolvedConstraint, RouteConstraint,
        match_constraints,
    },
    dispatcher::{Dispatcher, RouteTable, TreeDispatcher, ValueDispatcher},
    endpoint::{Endpoint, EndpointBuilder},
    error::{Ambiguous, Error, Result},
    metadata::{AuthorizationPolicy, CorsPolicy, Metadata, RoutePattern},
    method::HttpMethods,
    request::{RequestContext, RouteValues},
    router::Router,
    selector::{
        EndpointSelector, MethodSelector, SelectorContext, SelectorSnapshot, ValueIndex,
        ValueSelector,
    },
};

pub use http;
pub use wayfinder_router::{RouteTemplate, TemplateError};
