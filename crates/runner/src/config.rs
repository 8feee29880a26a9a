use std::path::PathBuf;

/// Where the rule grid comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridSource {
    /// A grid previously persisted as JSON.
    Json(PathBuf),
    /// The raw conditions and values tables, exported as CSV.
    Tables { conditions: PathBuf, values: PathBuf },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("set either VALGRID_GRID_PATH or both VALGRID_CONDITIONS_CSV and VALGRID_VALUES_CSV")]
    NoGridSource,
}

/// Runner configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// JSON array of flattened survey records.
    pub records_path: PathBuf,
    pub grid: GridSource,
    /// When set, the grid in use is also written here as JSON.
    pub grid_out: Option<PathBuf>,
    /// Directory receiving the partition and summary files.
    pub output_dir: PathBuf,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `VALGRID_RECORDS_PATH`   | --      |
    /// | `VALGRID_GRID_PATH`      | --      |
    /// | `VALGRID_CONDITIONS_CSV` | --      |
    /// | `VALGRID_VALUES_CSV`     | --      |
    /// | `VALGRID_GRID_OUT`       | unset   |
    /// | `VALGRID_OUTPUT_DIR`     | `.`     |
    ///
    /// `VALGRID_GRID_PATH` takes precedence over the CSV pair.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        let records_path =
            var("VALGRID_RECORDS_PATH").ok_or(ConfigError::Missing("VALGRID_RECORDS_PATH"))?;

        let grid = match (
            var("VALGRID_GRID_PATH"),
            var("VALGRID_CONDITIONS_CSV"),
            var("VALGRID_VALUES_CSV"),
        ) {
            (Some(path), _, _) => GridSource::Json(path),
            (None, Some(conditions), Some(values)) => GridSource::Tables { conditions, values },
            _ => return Err(ConfigError::NoGridSource),
        };

        Ok(Self {
            records_path,
            grid,
            grid_out: var("VALGRID_GRID_OUT"),
            output_dir: var("VALGRID_OUTPUT_DIR").unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn json_grid_takes_precedence() {
        let config = RunnerConfig::from_lookup(lookup(&[
            ("VALGRID_RECORDS_PATH", "r.json"),
            ("VALGRID_GRID_PATH", "g.json"),
            ("VALGRID_CONDITIONS_CSV", "c.csv"),
            ("VALGRID_VALUES_CSV", "v.csv"),
        ]))
        .unwrap();
        assert_eq!(config.grid, GridSource::Json("g.json".into()));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.grid_out, None);
    }

    #[test]
    fn tables_need_both_files() {
        let err = RunnerConfig::from_lookup(lookup(&[
            ("VALGRID_RECORDS_PATH", "r.json"),
            ("VALGRID_CONDITIONS_CSV", "c.csv"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::NoGridSource);
    }

    #[test]
    fn records_path_is_required() {
        let err = RunnerConfig::from_lookup(lookup(&[("VALGRID_GRID_PATH", "g.json")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("VALGRID_RECORDS_PATH"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = RunnerConfig::from_lookup(lookup(&[
            ("VALGRID_RECORDS_PATH", "r.json"),
            ("VALGRID_CONDITIONS_CSV", "c.csv"),
            ("VALGRID_VALUES_CSV", "v.csv"),
            ("VALGRID_GRID_PATH", "  "),
            ("VALGRID_OUTPUT_DIR", "out"),
        ]))
        .unwrap();
        assert_eq!(
            config.grid,
            GridSource::Tables {
                conditions: "c.csv".into(),
                values: "v.csv".into()
            }
        );
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }
}
