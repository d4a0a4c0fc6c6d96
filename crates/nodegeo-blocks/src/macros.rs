/// Implements [`Block::properties`](nodegeo_core::Block::properties) and
/// [`Block::set_properties`](nodegeo_core::Block::set_properties) through the
/// block's own serde impls. A null document resets to defaults.
macro_rules! serde_properties {
    () => {
        fn properties(&self) -> serde_json::Value {
            serde_json::to_value(self).unwrap_or_default()
        }

        fn set_properties(&mut self, properties: serde_json::Value) -> Result<(), serde_json::Error> {
            let properties = if properties.is_null() {
                serde_json::Value::Object(Default::default())
            } else {
                properties
            };
            *self = serde_json::from_value(properties)?;
            Ok(())
        }
    };
}
