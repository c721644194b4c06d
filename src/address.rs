use std::collections::BTreeMap;
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::request::RouteValues;

/// A reverse routing record: the values that identify a destination.
///
#[derive(Debug)]
pub struct Address {
    display_name: String,
    values: RouteValues,
    metadata: Metadata,
}

/// Addresses grouped by priority. Groups are searched in order and an
/// address in an earlier group always wins over one in a later group.
///
#[derive(Debug, Default)]
pub struct AddressTable {
    groups: Vec<Vec<Arc<Address>>>,
}

impl Address {
    pub fn new(display_name: impl Into<String>, values: RouteValues, metadata: Metadata) -> Self {
        Self {
            display_name: display_name.into(),
            values,
            metadata,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn values(&self) -> &RouteValues {
        &self.values
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns true if every declared value equals the value of the same key
    /// in `values`, ignoring ASCII case. An empty declared value matches an
    /// absent key.
    ///
    pub fn matches(&self, values: &RouteValues) -> bool {
        self.values.iter().all(|(key, expected)| {
            let actual = values.get(key).unwrap_or_default();
            actual.eq_ignore_ascii_case(expected)
        })
    }
}

impl AddressTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a group with a lower priority than every existing group.
    pub fn push_group(&mut self, group: Vec<Arc<Address>>) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[Vec<Arc<Address>>] {
        &self.groups
    }

    /// Derives addresses from the endpoints that declare required values.
    ///
    /// Endpoints are grouped by the order of their route pattern, lowest
    /// first. Endpoints without a route pattern are in order 0.
    ///
    pub fn from_endpoints(endpoints: &[Arc<Endpoint>]) -> Self {
        let mut groups: BTreeMap<i32, Vec<Arc<Address>>> = BTreeMap::new();

        for endpoint in endpoints {
            let Some(values) = endpoint.required_values() else {
                continue;
            };

            let order = endpoint.route().map_or(0, |pattern| pattern.order);

            groups.entry(order).or_default().push(Arc::new(Address {
                display_name: endpoint.display_name().to_owned(),
                values: values.clone(),
                metadata: endpoint.metadata().clone(),
            }));
        }

        Self {
            groups: groups.into_values().collect(),
        }
    }

    /// Returns the address identified by `values`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AmbiguousAddress`] if more than one address in
    /// the first group with a match matches `values`.
    ///
    pub fn select(&self, values: &RouteValues) -> Result<Option<Arc<Address>>> {
        for group in &self.groups {
            let mut matches = group.iter().filter(|address| address.matches(values));

            let Some(first) = matches.next() else {
                continue;
            };

            if let Some(second) = matches.next() {
                let names = [first, second]
                    .into_iter()
                    .chain(matches)
                    .map(|address| address.display_name());

                return Err(Error::ambiguous_address(names));
            }

            return Ok(Some(Arc::clone(first)));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Address, AddressTable};
    use crate::endpoint::Endpoint;
    use crate::error::Error;
    use crate::metadata::Metadata;
    use crate::request::RouteValues;

    fn address(name: &str, values: &[(&str, &str)]) -> Arc<Address> {
        Arc::new(Address::new(
            name,
            values.iter().copied().collect(),
            Metadata::new(),
        ))
    }

    fn values(values: &[(&str, &str)]) -> RouteValues {
        values.iter().copied().collect()
    }

    #[test]
    fn test_select_ignores_case() {
        let mut table = AddressTable::new();

        table.push_group(vec![
            address("Home.Index", &[("controller", "Home"), ("action", "Index")]),
            address("Home.About", &[("controller", "Home"), ("action", "About")]),
        ]);

        let selected = table
            .select(&values(&[("Controller", "HOME"), ("action", "about")]))
            .unwrap();

        assert_eq!(selected.unwrap().display_name(), "Home.About");
        assert!(table.select(&values(&[("controller", "Users")])).unwrap().is_none());
    }

    #[test]
    fn test_earlier_group_wins() {
        let mut table = AddressTable::new();

        table.push_group(vec![address("Specific", &[("page", "Index"), ("area", "Admin")])]);
        table.push_group(vec![address("General", &[("page", "Index")])]);

        let specific = table
            .select(&values(&[("page", "Index"), ("area", "admin")]))
            .unwrap();
        let general = table.select(&values(&[("page", "Index")])).unwrap();

        assert_eq!(specific.unwrap().display_name(), "Specific");
        assert_eq!(general.unwrap().display_name(), "General");
    }

    #[test]
    fn test_ambiguous_address() {
        let mut table = AddressTable::new();

        table.push_group(vec![
            address("A", &[("page", "Index")]),
            address("B", &[("page", "index")]),
        ]);

        let error = table.select(&values(&[("page", "INDEX")])).unwrap_err();

        assert!(matches!(error, Error::AmbiguousAddress(_)));
        assert_eq!(
            error.ambiguous_names(),
            Some(&["A".to_owned(), "B".to_owned()][..])
        );
    }

    #[test]
    fn test_from_endpoints() {
        let endpoints = vec![
            Arc::new(
                Endpoint::builder("Fallback")
                    .route(10, "{*path}")
                    .value("page", "Index")
                    .build(),
            ),
            Arc::new(Endpoint::builder("Home").value("page", "Index").build()),
            Arc::new(Endpoint::builder("Unaddressable").route(0, "x").build()),
        ];

        let table = AddressTable::from_endpoints(&endpoints);

        assert_eq!(table.groups().len(), 2);

        let selected = table.select(&values(&[("page", "index")])).unwrap();

        assert_eq!(selected.unwrap().display_name(), "Home");
    }
}
