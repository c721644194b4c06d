use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// An ordered list of metadata attached to an endpoint or address.
///
/// Items are queried by type. When more than one item of the same type is
/// present, [`Metadata::get`] returns the one that was pushed last.
///
#[derive(Clone, Default)]
pub struct Metadata {
    items: Vec<Arc<dyn Any + Send + Sync>>,
}

/// The order and template an endpoint is routed by.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoutePattern {
    #[serde(default)]
    pub order: i32,
    pub template: String,
}

/// Names the authorization policy that applies to an endpoint. Enforcing the
/// policy is the responsibility of the host.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AuthorizationPolicy {
    pub policy: String,
}

/// Names the cors policy that applies to an endpoint.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CorsPolicy {
    pub policy: String,
}

impl Metadata {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push<T>(&mut self, item: T)
    where
        T: Any + Send + Sync,
    {
        self.items.push(Arc::new(item));
    }

    pub fn push_shared(&mut self, item: Arc<dyn Any + Send + Sync>) {
        self.items.push(item);
    }

    /// Returns the last item of type `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.items.iter().rev().find_map(|item| item.downcast_ref::<T>())
    }

    /// Returns every item of type `T` in the order they were pushed.
    pub fn get_all<T: Any>(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|item| item.downcast_ref::<T>())
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.items.iter().any(|item| item.is::<T>())
    }
}

impl Debug for Metadata {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("len", &self.items.len())
            .finish()
    }
}

impl<T> Extend<T> for Metadata
where
    T: Any + Send + Sync,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}
