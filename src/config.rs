use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::data::filter::{FilterRanges, FilterSelection};
use crate::predict::feature::{
    DEFAULT_EXCLUDED_COLUMNS, FeatureAssembler, FeatureBinding, FeatureSchema, default_bindings,
};
use crate::views::DEFAULT_PRICE_BIN_EDGES;

// ---------------------------------------------------------------------------
// Dashboard configuration (dashboard.toml)
// ---------------------------------------------------------------------------

/// Everything read from `dashboard.toml`. Every section may be omitted.
///
/// ```toml
/// [dataset]
/// path = "clicks.csv"
/// delimiter = ";"
///
/// [model]
/// path = "clicks_clf.json"
///
/// [filters]
/// price_min = 1.0
/// price_max = 100.0
///
/// [[features.columns]]
/// name = "price"
/// dtype = "float"
/// source = "price"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
    pub filters: FilterConfig,
    pub features: FeatureConfig,
    pub views: ViewConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub delimiter: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("clicks.csv"),
            delimiter: ";".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("clicks_clf.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub price_min: f64,
    pub price_max: f64,
    /// Selection shown before the user touches any control.
    pub initial: FilterSelection,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            price_min: 1.0,
            price_max: 100.0,
            initial: FilterSelection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub excluded_columns: Vec<String>,
    pub columns: Vec<FeatureBinding>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS.iter().map(|s| s.to_string()).collect(),
            columns: default_bindings(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub price_bin_edges: Vec<f64>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            price_bin_edges: DEFAULT_PRICE_BIN_EDGES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportImageConfig {
    pub title: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub images: Vec<ReportImageConfig>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            images: vec![
                ReportImageConfig {
                    title: "Amount of clothing type sold on a specific day".to_string(),
                    path: PathBuf::from("graph3.png"),
                },
                ReportImageConfig {
                    title: "Average price of items grouped by colours".to_string(),
                    path: PathBuf::from("graph4.png"),
                },
            ],
        }
    }
}

impl AppConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::from_toml(&text).with_context(|| format!("in {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text).context("parsing config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter()?;
        self.feature_schema()?;
        if !(self.filters.price_min.is_finite()
            && self.filters.price_max.is_finite()
            && self.filters.price_min <= self.filters.price_max)
        {
            bail!(
                "price range {}..={} is empty",
                self.filters.price_min,
                self.filters.price_max
            );
        }
        let edges = &self.views.price_bin_edges;
        if edges.len() < 2 || edges.windows(2).any(|w| !(w[0] < w[1])) {
            bail!("price_bin_edges must hold at least two increasing values, got {edges:?}");
        }
        Ok(())
    }

    /// The dataset delimiter as a single byte.
    pub fn delimiter(&self) -> Result<u8> {
        match self.dataset.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => bail!(
                "delimiter must be one ASCII character, got {:?}",
                self.dataset.delimiter
            ),
        }
    }

    pub fn feature_schema(&self) -> Result<FeatureSchema> {
        FeatureSchema::new(self.features.columns.clone())
            .map_err(|e| anyhow::anyhow!("invalid [features] columns: {e}"))
    }

    pub fn excluded_columns(&self) -> BTreeSet<String> {
        self.features.excluded_columns.iter().cloned().collect()
    }

    pub fn filter_ranges(&self) -> FilterRanges {
        FilterRanges::with_price(self.filters.price_min, self.filters.price_max)
    }

    pub fn assembler(&self) -> Result<FeatureAssembler> {
        Ok(FeatureAssembler::new(
            self.feature_schema()?,
            self.excluded_columns(),
            self.filter_ranges(),
        ))
    }
}
