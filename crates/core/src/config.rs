use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/trending.db".to_string(),
        }
    }
}

/// Charset detection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_sample_bytes")]
    pub sample_bytes: usize,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            sample_bytes: default_sample_bytes(),
            min_confidence: default_min_confidence(),
            fallback: default_fallback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            extension: default_extension(),
            exclude: Vec::new(),
            include_hidden: default_include_hidden(),
        }
    }
}

/// One CSV export to upload into a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub collection: String,
    pub csv: String,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default = "default_category_field")]
    pub category_field: String,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_title_field")]
    pub title_field: String,
    #[serde(default)]
    pub alphabetic_titles_only: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            title_field: default_title_field(),
            alphabetic_titles_only: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            collections: Vec::new(),
            top_n: default_top_n(),
        }
    }
}

fn default_sample_bytes() -> usize {
    100_000
}

fn default_min_confidence() -> f32 {
    0.5
}

fn default_fallback() -> String {
    "latin1".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_extension() -> String {
    ".csv".to_string()
}

fn default_include_hidden() -> bool {
    true
}

fn default_category_field() -> String {
    "category_id".to_string()
}

fn default_title_field() -> String {
    "title".to_string()
}

fn default_top_n() -> usize {
    10
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
