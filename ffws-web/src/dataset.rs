use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Everything needed to scrape one table shape. Purely declarative; the
/// same pipeline runs every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Short name used in logs and file names.
    pub dataset: &'static str,
    pub url: Cow<'static, str>,
    /// CSS selector of the data table; doubles as the readiness signal.
    pub selector: &'static str,
    /// Body rows with fewer cells are skipped.
    pub min_columns: usize,
    /// Record field for each cell position.
    pub fields: &'static [&'static str],
}

impl ExtractionRequest {
    /// Same request against a different URL (mirrors, test fixtures).
    pub fn with_url(self, url: &str) -> Result<Self, url::ParseError> {
        let parsed = url::Url::parse(url)?;
        Ok(Self {
            url: Cow::Owned(parsed.into()),
            ..self
        })
    }
}

pub const WATER_LEVEL_FIELDS: &[&str] = &[
    "station", "current", "wl_30min", "wl_1hr", "wl_2hr", "alert", "alarm", "critical",
];

pub const RAINFALL_FIELDS: &[&str] = &[
    "station", "current_rf", "rf_30min", "rf_1hr", "rf_3hr", "rf_6hr", "rf_12hr", "rf_24hr",
];

const TABLE_SELECTOR: &str = "table.table-type1";

pub const WATER_LEVEL: ExtractionRequest = ExtractionRequest {
    dataset: "water_level",
    url: Cow::Borrowed("https://pasig-marikina-tullahanffws.pagasa.dost.gov.ph/water/table.do"),
    selector: TABLE_SELECTOR,
    min_columns: 8,
    fields: WATER_LEVEL_FIELDS,
};

pub const RAINFALL: ExtractionRequest = ExtractionRequest {
    dataset: "rainfall",
    url: Cow::Borrowed("https://pasig-marikina-tullahanffws.pagasa.dost.gov.ph/rainfall/table.do"),
    selector: TABLE_SELECTOR,
    min_columns: 8,
    fields: RAINFALL_FIELDS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    WaterLevel,
    Rainfall,
}

impl Dataset {
    pub const ALL: [Dataset; 2] = [Dataset::WaterLevel, Dataset::Rainfall];

    /// The built-in request for this dataset.
    pub fn request(self) -> ExtractionRequest {
        match self {
            Dataset::WaterLevel => WATER_LEVEL,
            Dataset::Rainfall => RAINFALL,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dataset::WaterLevel => "water_level",
            Dataset::Rainfall => "rainfall",
        }
    }

    /// Human label, e.g. for "No water level data available".
    pub fn label(self) -> &'static str {
        match self {
            Dataset::WaterLevel => "water level",
            Dataset::Rainfall => "rainfall",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "water_level" | "water" => Ok(Dataset::WaterLevel),
            "rainfall" | "rain" => Ok(Dataset::Rainfall),
            other => Err(format!("unknown dataset `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_adapters_share_shape() {
        for dataset in Dataset::ALL {
            let request = dataset.request();
            assert_eq!(request.selector, "table.table-type1");
            assert_eq!(request.min_columns, 8);
            assert_eq!(request.fields.len(), 8);
            assert_eq!(request.fields[0], "station");
            assert_eq!(request.dataset, dataset.name());
        }
    }

    #[test]
    fn adapters_differ_in_url_and_fields() {
        assert_ne!(WATER_LEVEL.url, RAINFALL.url);
        assert!(WATER_LEVEL.url.ends_with("/water/table.do"));
        assert!(RAINFALL.url.ends_with("/rainfall/table.do"));
        assert!(RAINFALL.fields.contains(&"rf_24hr"));
        assert!(WATER_LEVEL.fields.contains(&"critical"));
    }

    #[test]
    fn url_override_keeps_the_shape() {
        let mirrored = WATER_LEVEL.with_url("http://127.0.0.1:8080/water/table.do").unwrap();
        assert_eq!(mirrored.url, "http://127.0.0.1:8080/water/table.do");
        assert_eq!(mirrored.fields, WATER_LEVEL_FIELDS);
        assert!(RAINFALL.with_url("not a url").is_err());
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("water-level".parse::<Dataset>().unwrap(), Dataset::WaterLevel);
        assert_eq!("Rainfall".parse::<Dataset>().unwrap(), Dataset::Rainfall);
        assert!("tides".parse::<Dataset>().is_err());
    }
}
