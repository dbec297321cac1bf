use std::collections::BTreeMap;

use crate::Error;

#[derive(Debug, Clone, PartialEq)]
struct Attribute {
    value: f64,
    /// Given in the sequence description or set by the user
    observed: bool,
    hidden: bool,
}

/// Named numeric properties of a sequence node or pulse. Values either come
/// from the sequence description (or `set`), or are declared with a default
/// and later derived by `prepare`. Hidden attributes are derived values that
/// cannot be set from the outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Attributes {
    allowed: &'static [&'static str],
    entries: BTreeMap<&'static str, Attribute>,
}

impl Attributes {
    pub fn new(allowed: &'static [&'static str]) -> Self {
        Self {
            allowed,
            entries: BTreeMap::new(),
        }
    }

    /// Attributes as given by a sequence description. Fails on names that are
    /// not in `allowed`.
    pub fn from_source(
        allowed: &'static [&'static str],
        node: &str,
        values: BTreeMap<String, f64>,
    ) -> Result<Self, Error> {
        let mut attributes = Self::new(allowed);
        for (name, value) in values {
            let name = attributes.lookup(node, &name)?;
            attributes.entries.insert(
                name,
                Attribute {
                    value,
                    observed: true,
                    hidden: false,
                },
            );
        }
        Ok(attributes)
    }

    fn lookup(&self, node: &str, name: &str) -> Result<&'static str, Error> {
        self.allowed
            .iter()
            .find(|&&allowed| allowed == name)
            .copied()
            .ok_or_else(|| Error::UnknownAttribute {
                node: node.to_owned(),
                attribute: name.to_owned(),
            })
    }

    /// Current value of `name`, inserting `default` if it has none yet.
    pub fn declare(&mut self, name: &'static str, default: f64) -> f64 {
        self.entries
            .entry(name)
            .or_insert(Attribute {
                value: default,
                observed: false,
                hidden: false,
            })
            .value
    }

    /// Stores a value computed by `prepare`. Does not count as observed.
    pub fn set_derived(&mut self, name: &'static str, value: f64) {
        self.declare(name, value);
        if let Some(attribute) = self.entries.get_mut(name) {
            attribute.value = value;
        }
    }

    pub fn hide(&mut self, name: &'static str) {
        self.declare(name, 0.0);
        if let Some(attribute) = self.entries.get_mut(name) {
            attribute.hidden = true;
        }
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|a| a.hidden)
    }

    /// True if the attribute was given in the description or set by the user.
    pub fn has_source(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|a| a.observed)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.get(name).map(|a| a.value)
    }

    /// Overrides an attribute from the outside. Hidden attributes are derived
    /// by `prepare` and are rejected.
    pub fn set(&mut self, node: &str, name: &str, value: f64) -> Result<(), Error> {
        let name = self.lookup(node, name)?;
        if self.is_hidden(name) {
            return Err(Error::HiddenAttribute {
                node: node.to_owned(),
                attribute: name.to_owned(),
            });
        }
        self.entries.insert(
            name,
            Attribute {
                value,
                observed: true,
                hidden: false,
            },
        );
        Ok(())
    }

    /// Attributes that are not hidden, in alphabetical order.
    pub fn visible(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.entries
            .iter()
            .filter(|(_, a)| !a.hidden)
            .map(|(&name, a)| (name, a.value))
    }
}
