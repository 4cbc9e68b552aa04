use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// User configuration from `CostSheet Config.yaml`
///
/// Every section falls back to its defaults, so a partial file (or no file at all)
/// still produces a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserConfig {
    pub rates: RateSettings,
    pub export: ExportSettings,
    pub columns: ColumnLabels,
    pub import: ImportSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateSettings {
    /// Destination currency units per source currency unit
    pub exchange_rate: f64,

    /// Freight cost per cubic meter, in destination currency
    pub shipping_rate: f64,

    /// Label of the destination currency, used in the exported header
    pub currency: String,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            exchange_rate: 36.0,
            shipping_rate: 50000.0,
            currency: "DZD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportSettings {
    /// Where exported sheets are written. Falls back to the downloads folder.
    pub output_dir: Option<Utf8PathBuf>,
}

/// Header labels recognised in supplier sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLabels {
    pub item: String,
    pub alt_name: String,
    pub price: String,
    pub cartons: String,
    pub units_per_carton: String,
    pub volume: String,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            item: "ITEM".to_string(),
            alt_name: "品名".to_string(),
            price: "Price(RMB)".to_string(),
            cartons: "Ctn".to_string(),
            units_per_carton: "Qty".to_string(),
            volume: "CBM".to_string(),
        }
    }
}

impl ColumnLabels {
    /// Labels whose presence marks a row as the header row
    pub fn sentinels(&self) -> [&str; 2] {
        [self.item.as_str(), self.price.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub header_scan_limit: u32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            header_scan_limit: default_header_scan_limit(),
        }
    }
}

fn default_header_scan_limit() -> u32 {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub debug_mode: bool,
    pub console_output: bool,
    pub log_dir: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            debug_mode: false,
            console_output: true,
            log_dir: "logs".to_string(),
        }
    }
}
