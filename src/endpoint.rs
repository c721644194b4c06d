use http::Method;
use std::any::Any;

use crate::metadata::{Metadata, RoutePattern};
use crate::method::HttpMethods;
use crate::request::RouteValues;

/// A routable destination.
///
/// An endpoint is immutable once built and is shared between collections,
/// routing tables and requests through an `Arc`.
///
#[derive(Debug)]
pub struct Endpoint {
    display_name: String,
    metadata: Metadata,
    values: Option<RouteValues>,
}

pub struct EndpointBuilder {
    display_name: String,
    metadata: Metadata,
    values: Option<RouteValues>,
}

impl Endpoint {
    pub fn builder(display_name: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder {
            display_name: display_name.into(),
            metadata: Metadata::new(),
            values: None,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns the last metadata item of type `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.metadata.get()
    }

    /// The route pattern of an endpoint that is routed by template.
    pub fn route(&self) -> Option<&RoutePattern> {
        self.metadata.get()
    }

    /// The methods the endpoint accepts. `None` means any method.
    pub fn methods(&self) -> Option<&HttpMethods> {
        self.metadata.get()
    }

    /// The fixed route values of a conventionally routed endpoint.
    pub fn required_values(&self) -> Option<&RouteValues> {
        self.values.as_ref()
    }
}

impl EndpointBuilder {
    pub fn route(mut self, order: i32, template: impl Into<String>) -> Self {
        self.metadata.push(RoutePattern {
            order,
            template: template.into(),
        });
        self
    }

    pub fn methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.metadata.push(HttpMethods::new(methods));
        self
    }

    pub fn metadata<T>(mut self, item: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.metadata.push(item);
        self
    }

    /// Adds a required route value. An empty value requires the key to be
    /// absent or empty.
    ///
    pub fn value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values
            .get_or_insert_with(RouteValues::new)
            .insert(key, value);
        self
    }

    pub fn build(self) -> Endpoint {
        Endpoint {
            display_name: self.display_name,
            metadata: self.metadata,
            values: self.values,
        }
    }
}
