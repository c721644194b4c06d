use arc_swap::ArcSwapOption;
use std::collections::HashMap;
use std::sync::Arc;

use super::{EndpointSelector, SelectorContext};
use crate::collection::EndpointCollection;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::request::RouteValues;

/// Narrows candidates to the endpoints whose required route values equal the
/// values of the request.
///
/// The lookup index is built from the collection on first use and rebuilt
/// whenever the collection version changes.
///
pub struct ValueSelector {
    collection: Arc<EndpointCollection>,
    index: ArcSwapOption<ValueIndex>,
}

/// Maps a tuple of required value strings to the endpoints that declare it.
///
#[derive(Debug)]
pub struct ValueIndex {
    version: u64,

    /// The union of required value keys, lowercased and sorted.
    keys: Vec<String>,

    exact: HashMap<Vec<String>, Vec<Arc<Endpoint>>>,
    folded: HashMap<Vec<String>, Vec<Arc<Endpoint>>>,
}

fn fold(tuple: &[String]) -> Vec<String> {
    tuple.iter().map(|value| value.to_ascii_lowercase()).collect()
}

impl ValueSelector {
    pub fn new(collection: Arc<EndpointCollection>) -> Self {
        Self {
            collection,
            index: ArcSwapOption::empty(),
        }
    }

    /// Returns the index for the current version of the collection.
    ///
    /// Two threads may build the index for the same version at the same
    /// time. Both results are equivalent and the last one stored wins.
    ///
    pub fn index(&self) -> Arc<ValueIndex> {
        let version = self.collection.version();

        if let Some(index) = self.index.load_full() {
            if index.version == version {
                return index;
            }
        }

        let snapshot = self.collection.snapshot();
        let index = Arc::new(ValueIndex::build(snapshot.version(), snapshot.endpoints()));

        tracing::debug!(
            version = index.version,
            keys = ?index.keys,
            "built route value index",
        );

        self.index.store(Some(Arc::clone(&index)));
        index
    }
}

impl EndpointSelector for ValueSelector {
    fn select(&self, cx: &mut SelectorContext) -> Result<()> {
        let index = self.index();
        let matches = index.lookup(cx.request().values());

        cx.candidates_mut()
            .retain(|candidate| matches.iter().any(|other| Arc::ptr_eq(candidate, other)));

        if cx.candidates().is_empty() {
            return Ok(());
        }

        cx.invoke_next()
    }
}

impl ValueIndex {
    fn build(version: u64, endpoints: &[Arc<Endpoint>]) -> Self {
        let mut keys: Vec<String> = Vec::new();

        for (key, _) in endpoints
            .iter()
            .filter_map(|endpoint| endpoint.required_values())
            .flat_map(RouteValues::iter)
        {
            let key = key.to_ascii_lowercase();

            if let Err(index) = keys.binary_search(&key) {
                keys.insert(index, key);
            }
        }

        let mut exact: HashMap<_, Vec<_>> = HashMap::new();
        let mut folded: HashMap<_, Vec<_>> = HashMap::new();

        for endpoint in endpoints {
            let Some(values) = endpoint.required_values() else {
                continue;
            };

            let tuple = value_tuple(&keys, values);

            folded
                .entry(fold(&tuple))
                .or_default()
                .push(Arc::clone(endpoint));

            exact.entry(tuple).or_default().push(Arc::clone(endpoint));
        }

        Self {
            version,
            keys,
            exact,
            folded,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the endpoints that declare `values`. Values are compared
    /// exactly first and then ASCII case-insensitively.
    ///
    pub fn lookup(&self, values: &RouteValues) -> &[Arc<Endpoint>] {
        let tuple = value_tuple(&self.keys, values);

        self.exact
            .get(&tuple)
            .or_else(|| self.folded.get(&fold(&tuple)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Reads the value of each key in `keys`. Absent values are empty.
fn value_tuple(keys: &[String], values: &RouteValues) -> Vec<String> {
    keys.iter()
        .map(|key| values.get(key).unwrap_or_default().to_owned())
        .collect()
}
