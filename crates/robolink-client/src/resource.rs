//! Resource names and the cached resource snapshot.
//!
//! A [`ResourceSnapshot`] is built off to the side from a listing and then
//! swapped in whole, so readers only ever see a complete set of stubs.

use std::collections::HashMap;
use std::fmt;

use robolink_proto::robot as pb;
use serde::{Deserialize, Serialize};

use crate::components::ResourceClient;
use crate::error::{ClientError, Result};

/// Namespace used by all built-in resource kinds.
pub const RDK_NAMESPACE: &str = "rdk";

/// Resource kind for hardware components.
pub const KIND_COMPONENT: &str = "component";

/// Resource kind for services.
pub const KIND_SERVICE: &str = "service";

/// Separator between remote prefixes and the local name.
const REMOTE_SEPARATOR: char = ':';

/// Fully qualified resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName {
    /// Namespace, e.g. `rdk`.
    pub namespace: String,
    /// Kind, e.g. `component` or `service`.
    pub kind: String,
    /// Subtype, e.g. `arm`.
    pub subtype: String,
    /// Name, possibly prefixed with remote names (`remote1:arm1`).
    pub name: String,
}

impl ResourceName {
    /// Build a name from its four parts.
    pub fn new(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        subtype: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
            subtype: subtype.into(),
            name: name.into(),
        }
    }

    /// Name of a built-in component (`rdk:component:<subtype>/<name>`).
    pub fn component(subtype: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(RDK_NAMESPACE, KIND_COMPONENT, subtype, name)
    }

    /// Name of a built-in service (`rdk:service:<subtype>/<name>`).
    pub fn service(subtype: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(RDK_NAMESPACE, KIND_SERVICE, subtype, name)
    }

    /// The name with any remote prefixes stripped.
    #[must_use]
    pub fn short_name(&self) -> &str {
        match self.name.rfind(REMOTE_SEPARATOR) {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    /// Returns `true` if the resource lives on a remote of the robot.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.name.contains(REMOTE_SEPARATOR)
    }

    /// Same resource addressed by its short name.
    #[must_use]
    pub fn to_short(&self) -> Self {
        Self {
            name: self.short_name().to_string(),
            ..self.clone()
        }
    }

    /// Check that every part is present and the triplet has no separators.
    pub fn validate(&self) -> Result<()> {
        for (part, value) in [
            ("namespace", &self.namespace),
            ("kind", &self.kind),
            ("subtype", &self.subtype),
        ] {
            if value.is_empty() {
                return Err(ClientError::InvalidResourceName(format!(
                    "{self}: {part} is empty"
                )));
            }
            if value.contains(REMOTE_SEPARATOR) {
                return Err(ClientError::InvalidResourceName(format!(
                    "{self}: {part} must not contain '{REMOTE_SEPARATOR}'"
                )));
            }
        }
        if self.name.is_empty() {
            return Err(ClientError::InvalidResourceName(format!(
                "{self}: name is empty"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}/{}",
            self.namespace, self.kind, self.subtype, self.name
        )
    }
}

impl std::str::FromStr for ResourceName {
    type Err = ClientError;

    /// Parse `namespace:kind:subtype/name`.
    fn from_str(s: &str) -> Result<Self> {
        let (triplet, name) = s
            .split_once('/')
            .ok_or_else(|| ClientError::InvalidResourceName(format!("{s}: missing '/'")))?;
        let mut parts = triplet.splitn(3, REMOTE_SEPARATOR);
        let (Some(namespace), Some(kind), Some(subtype)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ClientError::InvalidResourceName(format!(
                "{s}: expected namespace:kind:subtype"
            )));
        };
        let parsed = Self::new(namespace, kind, subtype, name);
        parsed.validate()?;
        Ok(parsed)
    }
}

impl From<pb::ResourceName> for ResourceName {
    fn from(value: pb::ResourceName) -> Self {
        Self {
            namespace: value.namespace,
            kind: value.r#type,
            subtype: value.subtype,
            name: value.name,
        }
    }
}

impl From<ResourceName> for pb::ResourceName {
    fn from(value: ResourceName) -> Self {
        Self {
            namespace: value.namespace,
            r#type: value.kind,
            subtype: value.subtype,
            name: value.name,
        }
    }
}

/// Immutable view of the robot's resources at one refresh.
#[derive(Debug, Default)]
pub struct ResourceSnapshot {
    names: Vec<ResourceName>,
    stubs: HashMap<ResourceName, ResourceClient>,
    short_names: HashMap<ResourceName, ResourceName>,
}

impl ResourceSnapshot {
    /// The empty snapshot, used before the first refresh and after close.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from a listing, creating one stub per name.
    ///
    /// Duplicate names keep their first occurrence. A short name shared by
    /// resources on different remotes is left out of the short-name map.
    pub fn build<F>(listing: Vec<ResourceName>, mut make_stub: F) -> Result<Self>
    where
        F: FnMut(&ResourceName) -> Result<ResourceClient>,
    {
        let mut names = Vec::with_capacity(listing.len());
        let mut stubs = HashMap::with_capacity(listing.len());
        let mut short_counts: HashMap<ResourceName, Vec<ResourceName>> = HashMap::new();

        for name in listing {
            if stubs.contains_key(&name) {
                continue;
            }
            let stub = make_stub(&name)?;
            if name.is_remote() {
                short_counts.entry(name.to_short()).or_default().push(name.clone());
            }
            stubs.insert(name.clone(), stub);
            names.push(name);
        }

        let short_names = short_counts
            .into_iter()
            .filter(|(short, full)| full.len() == 1 && !stubs.contains_key(short))
            .filter_map(|(short, mut full)| full.pop().map(|f| (short, f)))
            .collect();

        Ok(Self {
            names,
            stubs,
            short_names,
        })
    }

    /// Names in listing order.
    #[must_use]
    pub fn names(&self) -> &[ResourceName] {
        &self.names
    }

    /// Look up a stub by full name, falling back to a unique short name.
    #[must_use]
    pub fn get(&self, name: &ResourceName) -> Option<&ResourceClient> {
        self.stubs.get(name).or_else(|| {
            self.short_names
                .get(name)
                .and_then(|full| self.stubs.get(full))
        })
    }

    /// First resource whose name or short name is `name`, of any subtype.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&ResourceClient> {
        self.names
            .iter()
            .find(|n| n.name == name || n.short_name() == name)
            .and_then(|n| self.stubs.get(n))
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the snapshot holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::GenericClient;

    fn generic(name: &ResourceName) -> Result<ResourceClient> {
        Ok(ResourceClient::Generic(GenericClient::new(name.clone())))
    }

    #[test]
    fn test_display_and_parse() {
        let name = ResourceName::component("arm", "arm1");
        assert_eq!(name.to_string(), "rdk:component:arm/arm1");

        let parsed: ResourceName = "rdk:component:arm/arm1".parse().unwrap();
        assert_eq!(parsed, name);

        let remote: ResourceName = "rdk:component:motor/left:m1".parse().unwrap();
        assert_eq!(remote.name, "left:m1");
        assert_eq!(remote.short_name(), "m1");
        assert!(remote.is_remote());

        assert!("rdk:component/arm1".parse::<ResourceName>().is_err());
        assert!("rdk:component:arm".parse::<ResourceName>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(ResourceName::service("motion", "builtin").validate().is_ok());
        assert!(ResourceName::component("", "x").validate().is_err());
        assert!(ResourceName::component("arm", "").validate().is_err());
        assert!(ResourceName::new("rdk", "comp:onent", "arm", "a").validate().is_err());
    }

    #[test]
    fn test_proto_conversion() {
        let name = ResourceName::component("base", "rover");
        let proto: pb::ResourceName = name.clone().into();
        assert_eq!(proto.r#type, "component");
        assert_eq!(ResourceName::from(proto), name);
    }

    #[test]
    fn test_snapshot_lookup() {
        let listing = vec![
            ResourceName::component("arm", "arm1"),
            ResourceName::component("motor", "left:m1"),
            ResourceName::component("arm", "arm1"),
        ];
        let snapshot = ResourceSnapshot::build(listing, generic).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get(&ResourceName::component("arm", "arm1")).is_some());
        assert!(snapshot.get(&ResourceName::component("motor", "left:m1")).is_some());
        assert!(snapshot.get(&ResourceName::component("motor", "m1")).is_some());
        assert!(snapshot.get(&ResourceName::component("motor", "m2")).is_none());

        let found = snapshot.find_by_name("m1").unwrap();
        assert_eq!(found.name(), &ResourceName::component("motor", "left:m1"));
        assert!(snapshot.find_by_name("arm2").is_none());
    }

    #[test]
    fn test_snapshot_drops_colliding_short_names() {
        let listing = vec![
            ResourceName::component("motor", "left:m1"),
            ResourceName::component("motor", "right:m1"),
            ResourceName::component("sensor", "left:imu"),
        ];
        let snapshot = ResourceSnapshot::build(listing, generic).unwrap();

        assert!(snapshot.get(&ResourceName::component("motor", "m1")).is_none());
        assert!(snapshot.get(&ResourceName::component("motor", "right:m1")).is_some());
        assert!(snapshot.get(&ResourceName::component("sensor", "imu")).is_some());
    }

    #[test]
    fn test_snapshot_build_propagates_stub_errors() {
        let listing = vec![ResourceName::component("arm", "arm1")];
        let result = ResourceSnapshot::build(listing, |name| {
            Err(ClientError::InvalidResourceName(name.to_string()))
        });
        assert!(result.is_err());
        assert!(ResourceSnapshot::empty().is_empty());
    }
}
