use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::endpoint::Endpoint;

/// An ordered, versioned set of endpoints.
///
/// Every change publishes a new [`Snapshot`] with a greater version. Readers
/// never block and caches built from a snapshot compare versions only.
///
#[derive(Debug)]
pub struct EndpointCollection {
    current: ArcSwap<Snapshot>,
}

/// An immutable view of a collection at a single version.
///
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    endpoints: Vec<Arc<Endpoint>>,
}

impl EndpointCollection {
    pub fn new() -> Self {
        Self::from_endpoints(Vec::new())
    }

    pub fn from_endpoints(endpoints: Vec<Arc<Endpoint>>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot {
                version: 0,
                endpoints,
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    pub fn push(&self, endpoint: impl Into<Arc<Endpoint>>) {
        let endpoint = endpoint.into();

        self.current.rcu(|current| {
            let mut endpoints = current.endpoints.clone();

            endpoints.push(Arc::clone(&endpoint));
            current.next(endpoints)
        });
    }

    pub fn extend<I>(&self, iter: I)
    where
        I: IntoIterator<Item = Arc<Endpoint>>,
    {
        let added: Vec<_> = iter.into_iter().collect();

        if added.is_empty() {
            return;
        }

        self.current.rcu(|current| {
            let mut endpoints = current.endpoints.clone();

            endpoints.extend(added.iter().cloned());
            current.next(endpoints)
        });
    }

    /// Removes `endpoint` from the collection. Returns false without
    /// publishing a new version if it was not a member.
    ///
    pub fn remove(&self, endpoint: &Arc<Endpoint>) -> bool {
        let previous = self.current.rcu(|current| {
            if !current.contains(endpoint) {
                return Arc::clone(current);
            }

            let endpoints = current
                .endpoints
                .iter()
                .filter(|other| !Arc::ptr_eq(other, endpoint))
                .cloned()
                .collect();

            Arc::new(current.next(endpoints))
        });

        previous.contains(endpoint)
    }

    /// Replaces every endpoint in the collection.
    pub fn replace(&self, endpoints: Vec<Arc<Endpoint>>) {
        self.current.rcu(|current| current.next(endpoints.clone()));
    }
}

impl Default for EndpointCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    fn contains(&self, endpoint: &Arc<Endpoint>) -> bool {
        self.endpoints.iter().any(|other| Arc::ptr_eq(other, endpoint))
    }

    fn next(&self, endpoints: Vec<Arc<Endpoint>>) -> Snapshot {
        Snapshot {
            version: self.version + 1,
            endpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::EndpointCollection;
    use crate::endpoint::Endpoint;

    fn endpoint(name: &str) -> Arc<Endpoint> {
        Arc::new(Endpoint::builder(name).build())
    }

    #[test]
    fn test_mutations_bump_version() {
        let collection = EndpointCollection::new();
        let a = endpoint("a");

        collection.push(Arc::clone(&a));
        assert_eq!(collection.version(), 1);

        collection.extend([endpoint("b"), endpoint("c")]);
        assert_eq!(collection.version(), 2);
        assert_eq!(collection.snapshot().endpoints().len(), 3);

        assert!(collection.remove(&a));
        assert_eq!(collection.version(), 3);

        collection.replace(vec![endpoint("d")]);
        assert_eq!(collection.version(), 4);

        let names: Vec<_> = collection
            .snapshot()
            .endpoints()
            .iter()
            .map(|endpoint| endpoint.display_name().to_owned())
            .collect();

        assert_eq!(names, ["d"]);
    }

    #[test]
    fn test_noop_mutations_keep_version() {
        let collection = EndpointCollection::new();

        collection.extend([]);
        assert!(!collection.remove(&endpoint("missing")));
        assert_eq!(collection.version(), 0);
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let collection = EndpointCollection::new();

        collection.push(endpoint("a"));

        let snapshot = collection.snapshot();

        collection.push(endpoint("b"));

        assert_eq!(snapshot.version(), 1);
        assert_eq!(snapshot.endpoints().len(), 1);
    }
}
