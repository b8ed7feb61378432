//! Logical variable names and how to read them.
//!
//! Every variable a run may touch is declared up front. Lookups of an
//! undeclared name fail with a configuration error before any file is
//! opened.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use zonal_common::{ZonalError, ZonalResult};

fn default_longitude() -> String {
    "lon".to_string()
}

fn default_latitude() -> String {
    "lat".to_string()
}

/// How to read one logical variable from its source files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Logical name, used for output columns and paths
    pub name: String,
    /// Name of the 2-D data variable inside each file
    pub layer: String,
    /// 1-D longitude coordinate variable
    #[serde(default = "default_longitude")]
    pub longitude: String,
    /// 1-D latitude coordinate variable
    #[serde(default = "default_latitude")]
    pub latitude: String,
    /// Overrides the file's own fill value
    #[serde(default)]
    pub nodata: Option<f32>,
    /// Input subdirectory, relative to the configured input root
    #[serde(default)]
    pub input_dir: Option<String>,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer: layer.into(),
            longitude: default_longitude(),
            latitude: default_latitude(),
            nodata: None,
            input_dir: None,
        }
    }

    /// Input subdirectory, defaulting to the logical name.
    pub fn input_dir(&self) -> &str {
        self.input_dir.as_deref().unwrap_or(&self.name)
    }
}

/// Validated set of variable specs keyed by logical name.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    specs: BTreeMap<String, VariableSpec>,
}

impl VariableRegistry {
    pub fn new(specs: impl IntoIterator<Item = VariableSpec>) -> ZonalResult<Self> {
        let mut map = BTreeMap::new();
        for spec in specs {
            if spec.name.trim().is_empty() {
                return Err(ZonalError::configuration("variable name must not be empty"));
            }
            for (what, value) in [
                ("layer", &spec.layer),
                ("longitude", &spec.longitude),
                ("latitude", &spec.latitude),
            ] {
                if value.trim().is_empty() {
                    return Err(ZonalError::configuration(format!(
                        "variable '{}' has an empty {what} name",
                        spec.name
                    )));
                }
            }
            if map.contains_key(&spec.name) {
                return Err(ZonalError::configuration(format!(
                    "variable '{}' declared twice",
                    spec.name
                )));
            }
            map.insert(spec.name.clone(), spec);
        }
        Ok(Self { specs: map })
    }

    pub fn get(&self, name: &str) -> ZonalResult<&VariableSpec> {
        self.specs.get(name).ok_or_else(|| {
            ZonalError::configuration(format!(
                "unknown variable '{name}' (known: {})",
                self.names().join(", ")
            ))
        })
    }

    /// Resolve several names at once, failing on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> ZonalResult<Vec<&VariableSpec>> {
        names.iter().map(|n| self.get(n.as_ref())).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> VariableRegistry {
        VariableRegistry::new([
            VariableSpec::new("pm25", "GWRPM25"),
            VariableSpec::new("so4", "SO4"),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let reg = registry();
        assert_eq!(reg.get("so4").unwrap().layer, "SO4");
        assert_eq!(reg.get("pm25").unwrap().input_dir(), "pm25");
        assert_eq!(reg.names(), vec!["pm25", "so4"]);
    }

    #[test]
    fn test_unknown_name_is_configuration_error() {
        let reg = registry();
        let err = reg.resolve_all(&["pm25", "no3"]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no3"));
    }

    #[test]
    fn test_rejects_duplicates_and_blanks() {
        assert!(VariableRegistry::new([
            VariableSpec::new("a", "A"),
            VariableSpec::new("a", "B"),
        ])
        .is_err());
        assert!(VariableRegistry::new([VariableSpec::new("a", " ")]).is_err());
    }
}
