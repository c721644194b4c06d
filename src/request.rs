use http::Method;
use smallvec::SmallVec;
use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::endpoint::Endpoint;

/// A set of named route values. Keys are compared ASCII case-insensitively.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteValues {
    entries: SmallVec<[(String, String); 4]>,
}

/// The request scoped state that dispatchers and selectors read and write.
///
pub struct RequestContext {
    path: String,
    method: Method,
    values: RouteValues,
    endpoint: Option<Arc<Endpoint>>,
    handler: Option<Arc<dyn Any + Send + Sync>>,
}

impl RouteValues {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|index| self.entries[index].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Inserts `value` under `key` and returns the value it replaced. The
    /// spelling of an existing key is preserved.
    ///
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
        let value = value.into();

        match self.position(key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.entries.push((key.to_owned(), value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(other, _)| other.eq_ignore_ascii_case(key))
    }
}

impl<K, V> FromIterator<(K, V)> for RouteValues
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();

        for (key, value) in iter {
            values.insert(key.as_ref(), value);
        }

        values
    }
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            values: RouteValues::new(),
            endpoint: None,
            handler: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the route values bound so far. Values bound by a route
    /// template are only kept if the template produced a selection.
    ///
    pub fn values(&self) -> &RouteValues {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut RouteValues {
        &mut self.values
    }

    pub fn endpoint(&self) -> Option<&Arc<Endpoint>> {
        self.endpoint.as_ref()
    }

    pub fn set_endpoint(&mut self, endpoint: Arc<Endpoint>) {
        self.endpoint = Some(endpoint);
    }

    /// Returns the handler a selector installed to short-circuit dispatch.
    pub fn handler(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.handler.as_ref()
    }

    pub fn set_handler(&mut self, handler: Arc<dyn Any + Send + Sync>) {
        self.handler = Some(handler);
    }

    /// Returns true if an endpoint was selected or a handler was installed.
    pub fn is_handled(&self) -> bool {
        self.endpoint.is_some() || self.handler.is_some()
    }
}

impl Debug for RequestContext {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("values", &self.values)
            .field("endpoint", &self.endpoint.as_ref().map(|e| e.display_name()))
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::RouteValues;

    #[test]
    fn test_keys_ignore_case() {
        let mut values = RouteValues::new();

        assert_eq!(values.insert("Controller", "Home"), None);
        assert_eq!(values.insert("controller", "Users"), Some("Home".to_owned()));
        assert_eq!(values.get("CONTROLLER"), Some("Users"));
        assert_eq!(values.iter().next(), Some(("Controller", "Users")));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut values: RouteValues = [("id", "12"), ("slug", "hello")].into_iter().collect();

        assert_eq!(values.remove("ID"), Some("12".to_owned()));
        assert!(!values.contains_key("id"));
        assert_eq!(values.remove("id"), None);
    }
}
