//! Typed identifier newtypes.
//!
//! Device and instance identifiers are opaque names handed out by the host
//! platform (`ZWayVDev_zway_7-0-48-1`, `hallway`, …).

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_name_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a name.
            #[must_use]
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Borrow the inner name.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_name_id!(
    /// Reference to a device in the registry (sensor, light, …).
    DeviceId
);

define_name_id!(
    /// Identifier of one configured automation instance.
    InstanceId
);

impl InstanceId {
    /// Identifier of the virtual switch this instance exposes.
    #[must_use]
    pub fn virtual_device_id(&self) -> DeviceId {
        DeviceId(format!("MotionTrigger_{}", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_device_id_as_plain_string() {
        let id = DeviceId::new("ZWayVDev_zway_7-0-48-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ZWayVDev_zway_7-0-48-1\"");
    }

    #[test]
    fn should_prefix_virtual_device_id_with_module_name() {
        let instance = InstanceId::new("12");
        assert_eq!(instance.virtual_device_id().as_str(), "MotionTrigger_12");
    }
}
