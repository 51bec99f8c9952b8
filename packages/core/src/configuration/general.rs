use parking_lot::Mutex;

use blackbox_utils::{KeyValueStore, Namespace};

use super::Configuration;
use crate::error::Result;

pub const DEFAULT_GENERAL_NAMESPACE: &str = "plbbConfig";
const DEVICE_NAME_KEY: &str = "devName";

/// Device-wide settings that are not bound to any entity
pub struct GeneralConfiguration {
    namespace: String,
    device_name: Mutex<String>,
}

impl GeneralConfiguration {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            device_name: Mutex::new(String::new()),
        }
    }

    pub fn device_name(&self) -> String {
        self.device_name.lock().clone()
    }

    pub fn set_device_name(&self, name: impl Into<String>) {
        *self.device_name.lock() = name.into();
    }
}

impl Default for GeneralConfiguration {
    fn default() -> Self {
        Self::new(DEFAULT_GENERAL_NAMESPACE)
    }
}

impl Configuration for GeneralConfiguration {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn load(&self, store: &dyn KeyValueStore) -> Result<()> {
        let namespace = Namespace::new(store, &self.namespace);
        if let Some(name) = namespace.read_string(DEVICE_NAME_KEY)? {
            self.set_device_name(name);
        }
        Ok(())
    }

    fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let namespace = Namespace::new(store, &self.namespace);
        namespace.write_string(DEVICE_NAME_KEY, &self.device_name())?;
        Ok(())
    }

    // Nothing live to push to.
    fn apply(&self) -> Result<()> {
        Ok(())
    }
}
