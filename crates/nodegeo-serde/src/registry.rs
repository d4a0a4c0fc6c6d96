//! Block registry for class-name based deserialization.

use std::collections::HashMap;

use nodegeo_blocks::*;
use nodegeo_core::{Block, BoxedBlock};
use serde_json::Value as JsonValue;

use crate::error::SerdeError;

/// Factory building a block from its saved properties.
type BlockFactory = Box<dyn Fn(JsonValue) -> Result<BoxedBlock, SerdeError> + Send + Sync>;

/// Maps class names to block factories.
pub struct BlockRegistry {
    factories: HashMap<String, BlockFactory>,
}

impl BlockRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry holding every block of the standard library.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register::<BoxBlock>();
        registry.register::<SphereBlock>();
        registry.register::<PlaneBlock>();
        registry.register::<CylinderBlock>();
        registry.register::<PointListBlock>();
        registry.register::<MeshBlock>();

        registry.register::<GeometryInputBlock>();
        registry.register::<GeometryOutputBlock>();

        registry.register::<MathBlock>();
        registry.register::<RandomBlock>();
        registry.register::<VectorConverterBlock>();

        registry.register::<TranslationBlock>();
        registry.register::<ScalingBlock>();
        registry.register::<RotationBlock>();
        registry.register::<MatrixComposeBlock>();

        registry.register::<SetPositionsBlock>();
        registry.register::<SetNormalsBlock>();
        registry.register::<SetColorsBlock>();
        registry.register::<SetTangentsBlock>();
        registry.register::<SetUvsBlock>();

        registry.register::<ComputeNormalsBlock>();
        registry.register::<GeometryTransformBlock>();
        registry.register::<MergeGeometryBlock>();
        registry.register::<GeometryInfoBlock>();

        registry.register::<InstantiateBlock>();
        registry.register::<InstantiateOnFacesBlock>();
        registry.register::<InstantiateOnVerticesBlock>();
        registry.register::<InstantiateOnVolumeBlock>();

        registry
    }

    /// Registers a block type under its [`Block::class_name`].
    ///
    /// Loading starts from `B::default()` and applies the saved properties
    /// through [`Block::set_properties`].
    pub fn register<B>(&mut self)
    where
        B: Block + Default,
    {
        let class_name = B::default().class_name();
        self.register_factory(class_name, |properties| {
            let mut block = B::default();
            block.set_properties(properties)?;
            Ok(Box::new(block) as BoxedBlock)
        });
    }

    /// Registers a custom factory.
    pub fn register_factory<F>(&mut self, class_name: &str, factory: F)
    where
        F: Fn(JsonValue) -> Result<BoxedBlock, SerdeError> + Send + Sync + 'static,
    {
        self.factories
            .insert(class_name.to_string(), Box::new(factory));
    }

    /// Builds a block by class name.
    pub fn create(&self, class_name: &str, properties: JsonValue) -> Result<BoxedBlock, SerdeError> {
        let factory = self
            .factories
            .get(class_name)
            .ok_or_else(|| SerdeError::UnknownBlockType(class_name.to_string()))?;
        factory(properties)
    }

    /// Checks if a class name is registered.
    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Iterates over registered class names.
    pub fn registered_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_cover_every_block() {
        let registry = BlockRegistry::with_defaults();
        assert_eq!(registry.len(), 28);
        for name in ["BoxBlock", "SetColorsBlock", "InstantiateOnVolumeBlock"] {
            assert!(registry.contains(name), "{name}");
        }
    }

    #[test]
    fn test_create_applies_properties() {
        let registry = BlockRegistry::with_defaults();
        let block = registry
            .create("RandomBlock", json!({ "lockMode": "Once" }))
            .unwrap();
        let random = block.as_any().downcast_ref::<RandomBlock>().unwrap();
        assert_eq!(random.lock_mode, RandomLock::Once);
    }

    #[test]
    fn test_missing_properties_default() {
        let registry = BlockRegistry::with_defaults();
        let block = registry.create("InstantiateOnVerticesBlock", json!(null)).unwrap();
        let block = block
            .as_any()
            .downcast_ref::<InstantiateOnVerticesBlock>()
            .unwrap();
        assert!(block.remove_duplicated_positions);
        assert!(block.evaluate_context);
    }

    #[test]
    fn test_unknown_type() {
        let registry = BlockRegistry::with_defaults();
        let result = registry.create("TeapotBlock", json!({}));
        assert!(matches!(result, Err(SerdeError::UnknownBlockType(name)) if name == "TeapotBlock"));
    }

    #[test]
    fn test_bad_property_is_an_error() {
        let registry = BlockRegistry::with_defaults();
        let result = registry.create("MathBlock", json!({ "operation": "Modulo" }));
        assert!(matches!(result, Err(SerdeError::Json(_))));
    }

    #[test]
    fn test_custom_factory() {
        let mut registry = BlockRegistry::new();
        assert!(registry.is_empty());
        registry.register_factory("Unit", |_| Ok(Box::new(BoxBlock::default()) as BoxedBlock));
        let block = registry.create("Unit", json!({})).unwrap();
        assert_eq!(block.class_name(), "BoxBlock");
        assert_eq!(registry.registered_types().collect::<Vec<_>>(), vec!["Unit"]);
    }
}
