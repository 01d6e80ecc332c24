use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of document channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Vat,
    Tax,
    Payments,
    Certificates,
    Registration,
    Legal,
    Financial,
    Insurance,
    General,
    Unclassifiable,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Vat,
        Category::Tax,
        Category::Payments,
        Category::Certificates,
        Category::Registration,
        Category::Legal,
        Category::Financial,
        Category::Insurance,
        Category::General,
        Category::Unclassifiable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Vat => "VAT",
            Category::Tax => "TAX",
            Category::Payments => "PAYMENTS",
            Category::Certificates => "CERTIFICATES",
            Category::Registration => "REGISTRATION",
            Category::Legal => "LEGAL",
            Category::Financial => "FINANCIAL",
            Category::Insurance => "INSURANCE",
            Category::General => "GENERAL",
            Category::Unclassifiable => "UNCLASSIFIABLE",
        }
    }

    /// Case-insensitive parse of a category name
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_uppercase();
        Self::ALL.into_iter().find(|c| c.as_str() == wanted)
    }

    /// Like [`Category::parse`], but anything unknown lands in GENERAL
    pub fn parse_lenient(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Category::General)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification verdict for one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub confidence: f64,
    pub reasoning: String,
    pub subcategory: String,
}

impl Classification {
    pub const DEFAULT_CONFIDENCE: f64 = 0.5;

    /// Reads a model response. Returns None when the object has no `category`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        let category = obj.get("category")?;

        let category = category
            .as_str()
            .map(Category::parse_lenient)
            .unwrap_or(Category::General);
        let confidence = obj
            .get("confidence")
            .and_then(|v| v.as_f64())
            .unwrap_or(Self::DEFAULT_CONFIDENCE)
            .clamp(0.0, 1.0);
        let reasoning = obj
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or("Classification completed")
            .to_string();
        let subcategory = obj
            .get("subcategory")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string();

        Some(Self {
            category,
            confidence,
            reasoning,
            subcategory,
        })
    }

    /// Used when the model answered with an object that lacks a category
    pub fn unrecognized() -> Self {
        Self {
            category: Category::General,
            confidence: Self::DEFAULT_CONFIDENCE,
            reasoning: "Classification failed".to_string(),
            subcategory: "Unknown".to_string(),
        }
    }

    /// Used when every classification attempt failed
    pub fn fallback() -> Self {
        Self {
            confidence: 0.0,
            ..Self::unrecognized()
        }
    }
}

/// Per-channel aggregate for the classify-only strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    pub count: usize,
    pub files: Vec<String>,
    pub avg_confidence: f64,
    pub subcategories: BTreeMap<String, usize>,
}

impl ChannelStats {
    fn new() -> Self {
        Self {
            count: 0,
            files: Vec::new(),
            avg_confidence: 0.0,
            subcategories: BTreeMap::new(),
        }
    }
}

/// Category → stats, kept in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct ChannelSummary {
    channels: Vec<(Category, ChannelStats)>,
}

impl ChannelSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one classification in. All fields of the channel change together.
    pub fn record(&mut self, filename: &str, classification: &Classification) {
        let position = match self
            .channels
            .iter()
            .position(|(c, _)| *c == classification.category)
        {
            Some(position) => position,
            None => {
                self.channels
                    .push((classification.category, ChannelStats::new()));
                self.channels.len() - 1
            }
        };
        let stats = &mut self.channels[position].1;

        stats.count += 1;
        stats.files.push(filename.to_string());
        let n = stats.count as f64;
        stats.avg_confidence = (stats.avg_confidence * (n - 1.0) + classification.confidence) / n;
        *stats
            .subcategories
            .entry(classification.subcategory.clone())
            .or_insert(0) += 1;
    }

    pub fn get(&self, category: Category) -> Option<&ChannelStats> {
        self.channels
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, stats)| stats)
    }

    /// Channels observed so far, in order of first appearance
    pub fn categories(&self) -> Vec<Category> {
        self.channels.iter().map(|(c, _)| *c).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Serialize for ChannelSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len()))?;
        for (category, stats) in &self.channels {
            map.serialize_entry(category.as_str(), stats)?;
        }
        map.end()
    }
}
