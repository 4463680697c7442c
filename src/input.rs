//! Typed key/value access to TOML geometry definitions.
//!
//! A definition file looks like:
//!
//! ```toml
//! "simulation geometry" = "phantom"
//!
//! [[geometry]]
//! name = "phantom"
//! library = "egs_spheres"
//! midpoint = [0, 0, 0]
//! radii = [1, 2]
//! [geometry."media input"]
//! media = ["H2O", "AIR"]
//! "set medium" = [[1, 1, 1]]
//! ```
//!
//! Keys keep their traditional spelling, spaces included.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use toml::{Table, Value};

use crate::error::GeometryError;

/// Parameters of a single geometry (or of a nested input block).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryInput {
    table: Table,
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        // integral floats are accepted, e.g. `closed = 1.0`
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

impl GeometryInput {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        Ok(Self::new(text.parse::<Table>()?))
    }

    pub fn has(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.table.get(key)?.as_str().map(str::to_string)
    }

    /// A list of strings, written either as an array or as one
    /// whitespace-separated string.
    pub fn get_strings(&self, key: &str) -> Option<Vec<String>> {
        match self.table.get(key)? {
            Value::String(s) => Some(s.split_whitespace().map(str::to_string).collect()),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        as_f64(self.table.get(key)?)
    }

    /// A list of numbers; a scalar is a list of one.
    pub fn get_f64s(&self, key: &str) -> Option<Vec<f64>> {
        match self.table.get(key)? {
            Value::Array(items) => items.iter().map(as_f64).collect(),
            other => as_f64(other).map(|f| vec![f]),
        }
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        as_i64(self.table.get(key)?).and_then(|i| i32::try_from(i).ok())
    }

    pub fn get_i64s(&self, key: &str) -> Option<Vec<i64>> {
        match self.table.get(key)? {
            Value::Array(items) => items.iter().map(as_i64).collect(),
            other => as_i64(other).map(|i| vec![i]),
        }
    }

    pub fn get_i32s(&self, key: &str) -> Option<Vec<i32>> {
        self.get_i64s(key)?
            .into_iter()
            .map(|i| i32::try_from(i).ok())
            .collect()
    }

    pub fn get_table(&self, key: &str) -> Option<GeometryInput> {
        self.table.get(key)?.as_table().cloned().map(Self::new)
    }

    /// Repeated items such as `"set medium"`: an array of arrays, or a single array.
    /// Rows that are not all numeric are returned as `None`.
    pub fn get_rows(&self, key: &str) -> Vec<Option<Vec<f64>>> {
        let Some(Value::Array(items)) = self.table.get(key) else {
            return Vec::new();
        };
        if items.iter().all(|v| as_f64(v).is_some()) {
            return vec![items.iter().map(as_f64).collect()];
        }
        items
            .iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(as_f64).collect(),
                _ => None,
            })
            .collect()
    }

    /// Rows of mixed type, as used by `"set label"`.
    pub fn get_raw_rows(&self, key: &str) -> Vec<Vec<Value>> {
        let Some(Value::Array(items)) = self.table.get(key) else {
            return Vec::new();
        };
        if items.iter().all(|v| !v.is_array()) {
            return vec![items.clone()];
        }
        items
            .iter()
            .filter_map(|row| row.as_array().cloned())
            .collect()
    }

    pub fn require_string(&self, key: &str) -> crate::error::Result<String> {
        self.get_string(key).ok_or_else(|| GeometryError::missing(key))
    }

    pub fn require_f64(&self, key: &str) -> crate::error::Result<f64> {
        self.get_f64(key).ok_or_else(|| GeometryError::missing(key))
    }

    pub fn require_f64s(&self, key: &str) -> crate::error::Result<Vec<f64>> {
        self.get_f64s(key).ok_or_else(|| GeometryError::missing(key))
    }
}

/// A whole geometry definition file.
#[derive(Debug, Clone)]
pub struct Definition {
    pub geometries: Vec<GeometryInput>,
    pub simulation_geometry: Option<String>,
    pub boundary_tolerance: Option<f64>,
    /// Directory relative file names (STL, TetGen) are resolved against.
    pub base_dir: PathBuf,
}

impl Definition {
    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let root = GeometryInput::parse(text).context("invalid geometry definition")?;
        let geometries = match root.table.get("geometry") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_table()
                        .cloned()
                        .map(GeometryInput::new)
                        .context("every [[geometry]] entry must be a table")
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => anyhow::bail!("`geometry` must be an array of tables"),
            None => Vec::new(),
        };
        Ok(Self {
            geometries,
            simulation_geometry: root.get_string("simulation geometry"),
            boundary_tolerance: root.get_f64("boundary tolerance"),
            base_dir: base_dir.into(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read geometry definition {:?}", path))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&text, base_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let input = GeometryInput::parse(
            r#"
            name = "wedge"
            "number of repetitions" = 4
            axis = [0, 0, 0, 0, 0, 1.5]
            geometries = "a b  c"
            angles = 30
            "#,
        )
        .unwrap();
        assert_eq!(input.get_string("name").as_deref(), Some("wedge"));
        assert_eq!(input.get_i32("number of repetitions"), Some(4));
        assert_eq!(input.get_f64("number of repetitions"), Some(4.0));
        assert_eq!(input.get_f64s("axis").unwrap()[5], 1.5);
        assert_eq!(input.get_strings("geometries").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(input.get_f64s("angles"), Some(vec![30.0]));
        assert!(input.get_f64("name").is_none());
        assert!(input.require_f64("radii").is_err());
    }

    #[test]
    fn rows_accept_single_and_nested() {
        let input = GeometryInput::parse(
            r#"
            "set medium" = [[0, 2, 1], [3, 1]]
            "set relative density" = [1, 0.5]
            "set label" = [["target", 1, 2], ["shield", 0]]
            "#,
        )
        .unwrap();
        assert_eq!(
            input.get_rows("set medium"),
            vec![Some(vec![0.0, 2.0, 1.0]), Some(vec![3.0, 1.0])]
        );
        assert_eq!(input.get_rows("set relative density"), vec![Some(vec![1.0, 0.5])]);
        assert_eq!(input.get_raw_rows("set label").len(), 2);
    }

    #[test]
    fn definition_collects_geometries() {
        let def = Definition::parse(
            r#"
            "simulation geometry" = "s"
            "boundary tolerance" = 1e-9
            [[geometry]]
            name = "s"
            library = "egs_spheres"
            radii = [1]
            "#,
            ".",
        )
        .unwrap();
        assert_eq!(def.geometries.len(), 1);
        assert_eq!(def.simulation_geometry.as_deref(), Some("s"));
        assert_eq!(def.boundary_tolerance, Some(1e-9));
    }
}
