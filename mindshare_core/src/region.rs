use anyhow::Result;
use log::{info, warn};
use ron::de::from_str;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, fs, path::Path, str::FromStr};
use utoipa::ToSchema;

const GLOBAL_MENTIONS: [&str; 2] = ["@base", "@carv_official"];
const CAMPAIGN_HASHTAG: &str = "#CarvMindshare";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Region {
    Turkey,
    Ukraine,
    Russia,
    Japan,
    Korea,
    Indonesia,
    Philippines,
    Persia,
    Africa,
}

impl Region {
    pub const ALL: [Region; 9] = [
        Region::Turkey,
        Region::Ukraine,
        Region::Russia,
        Region::Japan,
        Region::Korea,
        Region::Indonesia,
        Region::Philippines,
        Region::Persia,
        Region::Africa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Turkey => "Turkey",
            Region::Ukraine => "Ukraine",
            Region::Russia => "Russia",
            Region::Japan => "Japan",
            Region::Korea => "Korea",
            Region::Indonesia => "Indonesia",
            Region::Philippines => "Philippines",
            Region::Persia => "Persia",
            Region::Africa => "Africa",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Region::ALL
            .into_iter()
            .find(|region| region.as_str().eq_ignore_ascii_case(key))
            .ok_or_else(|| anyhow::anyhow!("Unknown region: {}", s))
    }
}

/// Hashtags and mentions that count toward a region's campaign score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegionRule {
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
}

impl RegionRule {
    fn campaign(hashtags: [&str; 2], extra_mentions: &[&str]) -> Self {
        let hashtags = std::iter::once(CAMPAIGN_HASHTAG)
            .chain(hashtags)
            .map(str::to_string)
            .collect();
        let mentions = GLOBAL_MENTIONS
            .iter()
            .chain(extra_mentions)
            .map(|m| m.to_string())
            .collect();

        Self { hashtags, mentions }
    }
}

#[derive(Debug, Deserialize)]
struct RegionTable {
    default_region: Region,
    regions: Vec<RegionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegionEntry {
    pub region: Region,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
}

/// Read-only region table, built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RegionRules {
    rules: HashMap<Region, RegionRule>,
    default_region: Region,
}

impl RegionRules {
    pub fn new(rules: HashMap<Region, RegionRule>, default_region: Region) -> Result<Self> {
        if !rules.contains_key(&default_region) {
            return Err(anyhow::anyhow!(
                "Default region {} has no rule in the region table",
                default_region
            ));
        }

        Ok(Self {
            rules,
            default_region,
        })
    }

    /// The campaign table shipped with the service.
    pub fn builtin() -> Self {
        let rules = HashMap::from([
            (
                Region::Turkey,
                RegionRule::campaign(["#CarvTurkey", "#NexusTR"], &["@Carv_TR"]),
            ),
            (
                Region::Ukraine,
                RegionRule::campaign(["#CarvUA", "#NexusUkraine"], &[]),
            ),
            (
                Region::Russia,
                RegionRule::campaign(["#CarvRU", "#NexusRussia"], &["@Carv_RU"]),
            ),
            (
                Region::Japan,
                RegionRule::campaign(["#CarvJP", "#NexusJapan"], &[]),
            ),
            (
                Region::Korea,
                RegionRule::campaign(["#CarvKR", "#NexusKorea"], &["@CARV_KR"]),
            ),
            (
                Region::Indonesia,
                RegionRule::campaign(["#CarvID", "#NexusIndo"], &["@CARV_IDN"]),
            ),
            (
                Region::Philippines,
                RegionRule::campaign(["#CarvPH", "#NexusPH"], &[]),
            ),
            (
                Region::Persia,
                RegionRule::campaign(["#CarvIR", "#NexusPersia"], &["@CarvPersian"]),
            ),
            (
                Region::Africa,
                RegionRule::campaign(["#CarvAfrica", "#NexusAfrica"], &[]),
            ),
        ]);

        Self {
            rules,
            default_region: Region::Turkey,
        }
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        let table: RegionTable = from_str(source)
            .map_err(|e| anyhow::anyhow!("Failed to parse region table: {}", e))?;

        let mut rules = HashMap::new();
        for entry in table.regions {
            let rule = RegionRule {
                hashtags: entry.hashtags,
                mentions: entry.mentions,
            };
            if rules.insert(entry.region, rule).is_some() {
                return Err(anyhow::anyhow!(
                    "Region {} appears more than once in the region table",
                    entry.region
                ));
            }
        }

        Self::new(rules, table.default_region)
    }

    /// Loads the table from a RON file, falling back to the built-in table when the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(
                "Region table {} not found, using built-in campaign table",
                path.display()
            );
            return Ok(Self::builtin());
        }

        let source = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read region table {}: {}", path.display(), e))?;
        let rules = Self::from_ron(&source)?;

        info!(
            "Loaded {} region rules from {} (default: {})",
            rules.rules.len(),
            path.display(),
            rules.default_region
        );

        Ok(rules)
    }

    pub fn default_region(&self) -> Region {
        self.default_region
    }

    /// Returns the region for `key` only when it parses and has a rule in this table.
    pub fn resolve(&self, key: &str) -> Option<Region> {
        key.parse::<Region>()
            .ok()
            .filter(|region| self.rules.contains_key(region))
    }

    pub fn rule(&self, region: Region) -> Option<&RegionRule> {
        self.rules.get(&region)
    }

    /// Table entries in enumeration order.
    pub fn entries(&self) -> Vec<RegionEntry> {
        Region::ALL
            .into_iter()
            .filter_map(|region| {
                self.rules.get(&region).map(|rule| RegionEntry {
                    region,
                    hashtags: rule.hashtags.clone(),
                    mentions: rule.mentions.clone(),
                })
            })
            .collect()
    }
}
