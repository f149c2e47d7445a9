//! Endpoint descriptors supplied by the resolver.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque endpoint attributes (locality, etc.).
///
/// Equality, ordering and hashing compare content, so two updates carrying
/// separately allocated but identical attributes describe the same endpoint.
/// Attributes never influence ring placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attributes(Arc<BTreeMap<String, String>>);

impl Attributes {
    /// Look up an attribute value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns true if no attributes are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Attributes {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(Arc::new(map))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(Arc::new(
            iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }
}

/// Identity of a backend: its address plus attribute content.
///
/// Weight is deliberately not part of the key; a weight change rebuilds the
/// ring but keeps the backend and its connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub address: String,
    pub attributes: Attributes,
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)?;
        if !self.attributes.is_empty() {
            f.write_str(" {")?;
            for (i, (k, v)) in self.attributes.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

/// One weighted backend address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    weight: u32,
    attributes: Attributes,
}

impl Endpoint {
    /// Create an endpoint with weight 1 and no attributes.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            weight: 1,
            attributes: Attributes::default(),
        }
    }

    /// Set the weight.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The identity key for this endpoint.
    pub fn key(&self) -> EndpointKey {
        EndpointKey {
            address: self.address.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_content_equality() {
        let a: Attributes = [("zone", "a")].into_iter().collect();
        let b: Attributes = [("zone", "a")].into_iter().collect();
        assert!(!Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);

        let e1 = Endpoint::new("10.0.0.1:1").with_attributes(a);
        let e2 = Endpoint::new("10.0.0.1:1").with_attributes(b).with_weight(5);
        assert_eq!(e1.key(), e2.key());
    }

    #[test]
    fn test_key_display() {
        let attrs: Attributes = [("zone", "a"), ("rack", "7")].into_iter().collect();
        let key = Endpoint::new("10.0.0.1:1").with_attributes(attrs).key();
        assert_eq!(key.to_string(), "10.0.0.1:1 {rack=7, zone=a}");
    }
}
