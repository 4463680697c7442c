use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GeometryError, Result};
use crate::geometry::{Geometry, GeometryQuery, SharedGeometry};
use crate::media::MediumTable;

/// Named geometries of one definition, plus the media they refer to.
///
/// The registry hands out shared handles; a composite that looks up a child
/// holds the same instance as the registry.
#[derive(Debug, Default)]
pub struct GeometryRegistry {
    geometries: HashMap<String, SharedGeometry>,
    order: Vec<String>,
    pub media: MediumTable,
}

impl GeometryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `geometry` under its own name and return the shared handle.
    pub fn insert(&mut self, geometry: Geometry) -> Result<SharedGeometry> {
        let name = geometry.name().to_string();
        if self.geometries.contains_key(&name) {
            return Err(GeometryError::DuplicateName(name));
        }
        let shared = Arc::new(geometry);
        self.order.push(name.clone());
        self.geometries.insert(name, Arc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, name: &str) -> Option<SharedGeometry> {
        self.geometries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.geometries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Geometries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedGeometry> {
        self.order.iter().filter_map(|name| self.geometries.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spheres::Spheres;
    use nalgebra::Point3;

    #[test]
    fn lookup_shares_the_instance() {
        let mut registry = GeometryRegistry::new();
        let sphere = Spheres::new("ball", Point3::origin(), vec![1.0]).unwrap();
        let inserted = registry.insert(sphere.into()).unwrap();
        let found = registry.get("ball").unwrap();
        assert!(Arc::ptr_eq(&inserted, &found));
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = GeometryRegistry::new();
        let a = Spheres::new("ball", Point3::origin(), vec![1.0]).unwrap();
        let b = Spheres::new("ball", Point3::origin(), vec![2.0]).unwrap();
        registry.insert(a.into()).unwrap();
        let err = registry.insert(b.into()).unwrap_err();
        assert!(matches!(err, GeometryError::DuplicateName(_)));
        assert!(!err.is_fatal());
        assert_eq!(registry.len(), 1);
    }
}
