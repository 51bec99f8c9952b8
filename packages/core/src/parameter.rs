//! Validated configuration values
//!
//! A [`ConfigurationParameter`] holds one value together with the predicate that
//! decides which values may be stored. A fresh parameter rejects every write until
//! a validator is installed, so the owning application has to state explicitly
//! which values it accepts.

use parking_lot::Mutex;
use std::net::{Ipv4Addr, Ipv6Addr};

use blackbox_utils::{Namespace, StorageResult};

use crate::error::{Error, Result};

pub type Validator<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Slot<T> {
    value: T,
    validator: Validator<T>,
}

pub struct ConfigurationParameter<T> {
    key: &'static str,
    slot: Mutex<Slot<T>>,
}

impl<T> ConfigurationParameter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(key: &'static str, value: T) -> Self {
        Self {
            key,
            slot: Mutex::new(Slot {
                value,
                validator: Box::new(|_| false),
            }),
        }
    }

    /// Storage key of the parameter inside its configuration namespace
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn value(&self) -> T {
        self.slot.lock().value.clone()
    }

    /// Store `value` if the validator accepts it, otherwise keep the current value
    pub fn set_value(&self, value: T) -> Result<()> {
        let mut slot = self.slot.lock();
        if !(slot.validator)(&value) {
            return Err(Error::Validation {
                parameter: self.key,
            });
        }
        slot.value = value;
        Ok(())
    }

    pub fn is_valid(&self, value: &T) -> bool {
        (self.slot.lock().validator)(value)
    }

    pub fn set_value_validator(&self, validator: impl Fn(&T) -> bool + Send + Sync + 'static) {
        self.slot.lock().validator = Box::new(validator);
    }

    pub fn set_valid_values(&self, values: Vec<T>) {
        self.set_value_validator(move |value| values.contains(value));
    }

    pub fn disable_value_validation(&self) {
        self.set_value_validator(|_| true);
    }
}

impl<T> ConfigurationParameter<T>
where
    T: PersistedValue + Clone + PartialEq + Send + Sync + 'static,
{
    /// Load the persisted value if one exists; absent keys keep the current value
    pub fn load(&self, namespace: &Namespace) -> Result<()> {
        if let Some(value) = T::read(namespace, self.key)? {
            self.offer(namespace, value);
        }
        Ok(())
    }

    pub fn save(&self, namespace: &Namespace) -> Result<()> {
        self.value().write(namespace, self.key)?;
        Ok(())
    }

    /// Set a value coming from storage, logging instead of failing on rejection
    pub(crate) fn offer(&self, namespace: &Namespace, value: T) {
        if self.set_value(value).is_err() {
            log::warn!(
                "Ignoring stored value of {}/{}: rejected by validator",
                namespace.name(),
                self.key
            );
        }
    }
}

/// Mapping between a parameter type and its typed storage representation
pub trait PersistedValue: Sized {
    fn read(namespace: &Namespace, key: &str) -> StorageResult<Option<Self>>;

    fn write(&self, namespace: &Namespace, key: &str) -> StorageResult<()>;
}

impl PersistedValue for bool {
    fn read(namespace: &Namespace, key: &str) -> StorageResult<Option<Self>> {
        Ok(namespace.read_u8(key)?.map(|value| value != 0))
    }

    fn write(&self, namespace: &Namespace, key: &str) -> StorageResult<()> {
        namespace.write_u8(key, u8::from(*self))
    }
}

impl PersistedValue for u8 {
    fn read(namespace: &Namespace, key: &str) -> StorageResult<Option<Self>> {
        namespace.read_u8(key)
    }

    fn write(&self, namespace: &Namespace, key: &str) -> StorageResult<()> {
        namespace.write_u8(key, *self)
    }
}

impl PersistedValue for u16 {
    fn read(namespace: &Namespace, key: &str) -> StorageResult<Option<Self>> {
        namespace.read_u16(key)
    }

    fn write(&self, namespace: &Namespace, key: &str) -> StorageResult<()> {
        namespace.write_u16(key, *self)
    }
}

impl PersistedValue for u32 {
    fn read(namespace: &Namespace, key: &str) -> StorageResult<Option<Self>> {
        namespace.read_u32(key)
    }

    fn write(&self, namespace: &Namespace, key: &str) -> StorageResult<()> {
        namespace.write_u32(key, *self)
    }
}

impl PersistedValue for String {
    fn read(namespace: &Namespace, key: &str) -> StorageResult<Option<Self>> {
        namespace.read_string(key)
    }

    fn write(&self, namespace: &Namespace, key: &str) -> StorageResult<()> {
        namespace.write_string(key, self)
    }
}

// First octet in the low byte.
impl PersistedValue for Ipv4Addr {
    fn read(namespace: &Namespace, key: &str) -> StorageResult<Option<Self>> {
        Ok(namespace
            .read_u32(key)?
            .map(|value| Ipv4Addr::from(value.to_le_bytes())))
    }

    fn write(&self, namespace: &Namespace, key: &str) -> StorageResult<()> {
        namespace.write_u32(key, u32::from_le_bytes(self.octets()))
    }
}

impl PersistedValue for Ipv6Addr {
    fn read(namespace: &Namespace, key: &str) -> StorageResult<Option<Self>> {
        Ok(namespace.read_blob(key)?.and_then(|blob| {
            let octets: [u8; 16] = blob.try_into().ok()?;
            Some(Ipv6Addr::from(octets))
        }))
    }

    fn write(&self, namespace: &Namespace, key: &str) -> StorageResult<()> {
        namespace.write_blob(key, &self.octets())
    }
}

/// Persist a `#[repr(u8)]` enum through its primitive value
macro_rules! persisted_as_u8 {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::parameter::PersistedValue for $ty {
                fn read(
                    namespace: &blackbox_utils::Namespace,
                    key: &str,
                ) -> blackbox_utils::StorageResult<Option<Self>> {
                    Ok(namespace
                        .read_u8(key)?
                        .and_then(|value| <$ty>::try_from(value).ok()))
                }

                fn write(
                    &self,
                    namespace: &blackbox_utils::Namespace,
                    key: &str,
                ) -> blackbox_utils::StorageResult<()> {
                    namespace.write_u8(key, u8::from(*self))
                }
            }
        )*
    };
}

pub(crate) use persisted_as_u8;

#[cfg(test)]
mod tests {
    use super::*;
    use blackbox_utils::MemoryStore;

    #[test]
    fn test_default_validator_rejects_everything() {
        let parameter = ConfigurationParameter::new("baudRate", 9600u32);
        assert!(matches!(
            parameter.set_value(115200),
            Err(Error::Validation {
                parameter: "baudRate"
            })
        ));
        assert_eq!(parameter.value(), 9600);
    }

    #[test]
    fn test_valid_values_membership() {
        let parameter = ConfigurationParameter::new("dataBits", 8u16);
        parameter.set_valid_values(vec![7, 8]);

        assert!(parameter.set_value(7).is_ok());
        assert!(parameter.set_value(9).is_err());
        assert_eq!(parameter.value(), 7);
    }

    #[test]
    fn test_custom_validator_and_disable() {
        let parameter = ConfigurationParameter::new("port", 502u16);
        parameter.set_value_validator(|port| *port >= 1024);

        assert!(parameter.set_value(80).is_err());
        assert!(parameter.set_value(5020).is_ok());

        parameter.disable_value_validation();
        assert!(parameter.set_value(80).is_ok());
        assert_eq!(parameter.value(), 80);
    }

    #[test]
    fn test_load_keeps_value_when_absent_or_rejected() {
        let store = MemoryStore::new();
        let namespace = Namespace::new(&store, "uart");

        let parameter = ConfigurationParameter::new("baudRate", 9600u32);
        parameter.load(&namespace).unwrap();
        assert_eq!(parameter.value(), 9600);

        namespace.write_u32("baudRate", 1).unwrap();
        parameter.set_valid_values(vec![9600, 115200]);
        parameter.load(&namespace).unwrap();
        assert_eq!(parameter.value(), 9600);

        namespace.write_u32("baudRate", 115200).unwrap();
        parameter.load(&namespace).unwrap();
        assert_eq!(parameter.value(), 115200);
    }

    #[test]
    fn test_address_persistence_layout() {
        let store = MemoryStore::new();
        let namespace = Namespace::new(&store, "eth");

        Ipv4Addr::new(192, 168, 1, 10)
            .write(&namespace, "ip4Address")
            .unwrap();
        assert_eq!(
            namespace.read_u32("ip4Address").unwrap(),
            Some(u32::from_le_bytes([192, 168, 1, 10]))
        );

        let global: Ipv6Addr = "2001:db8::1".parse().unwrap();
        global.write(&namespace, "ip6GlobAddr").unwrap();
        assert_eq!(
            Ipv6Addr::read(&namespace, "ip6GlobAddr").unwrap(),
            Some(global)
        );
    }
}
