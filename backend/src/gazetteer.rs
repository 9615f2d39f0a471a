use std::{
    collections::HashSet,
    fs::File,
    io::{self, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::address::normalize_for_match;
use crate::models::{BoundingBox, Coordinate, SRI_LANKA_BOUNDS};

#[derive(Debug, thiserror::Error)]
pub enum GazetteerError {
    #[error("failed to read gazetteer file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid gazetteer definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("gazetteer is empty")]
    Empty,
    #[error("gazetteer key {0:?} is blank")]
    BlankKey(String),
    #[error("gazetteer key {0:?} appears more than once")]
    DuplicateKey(String),
    #[error("{label} ({lat}, {lng}) lies outside the service area")]
    OutOfBounds { label: String, lat: f64, lng: f64 },
    #[error("compound rule #{0} has no tokens")]
    EmptyRule(usize),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub key: String,
    pub lat: f64,
    pub lng: f64,
}

/// Override that fires when every token appears in the address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompoundRule {
    pub all_of: Vec<String>,
    pub lat: f64,
    pub lng: f64,
}

impl CompoundRule {
    fn matches(&self, address: &str) -> bool {
        self.all_of.iter().all(|token| address.contains(token.as_str()))
    }

    fn label(&self) -> String {
        self.all_of.join(" + ")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GazetteerFile {
    pub entries: Vec<GazetteerEntry>,
    #[serde(default)]
    pub rules: Vec<CompoundRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GazetteerMatch {
    pub label: String,
    pub coordinate: Coordinate,
    pub via_rule: bool,
}

/// Read-only place-name table. Build once, share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
    rules: Vec<CompoundRule>,
    /// Entry indices by descending key length; ties keep declaration order.
    scan_order: Vec<usize>,
}

impl Gazetteer {
    pub fn builtin() -> Self {
        let entries = BUILTIN_ENTRIES
            .iter()
            .map(|&(key, lat, lng)| GazetteerEntry {
                key: key.to_string(),
                lat,
                lng,
            })
            .collect();
        let rules = BUILTIN_RULES
            .iter()
            .map(|&(all_of, lat, lng)| CompoundRule {
                all_of: all_of.iter().map(|t| t.to_string()).collect(),
                lat,
                lng,
            })
            .collect();
        Self::index(entries, rules)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GazetteerError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, GazetteerError> {
        let file: GazetteerFile = serde_json::from_reader(reader)?;
        Self::from_gazetteer_file(file, SRI_LANKA_BOUNDS)
    }

    pub fn from_gazetteer_file(
        file: GazetteerFile,
        bounds: BoundingBox,
    ) -> Result<Self, GazetteerError> {
        if file.entries.is_empty() {
            return Err(GazetteerError::Empty);
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(file.entries.len());
        for entry in file.entries {
            let key = normalize_for_match(&entry.key);
            if key.is_empty() {
                return Err(GazetteerError::BlankKey(entry.key));
            }
            if !seen.insert(key.clone()) {
                return Err(GazetteerError::DuplicateKey(key));
            }
            check_bounds(&key, entry.lat, entry.lng, bounds)?;
            entries.push(GazetteerEntry { key, ..entry });
        }

        let mut rules = Vec::with_capacity(file.rules.len());
        for (idx, rule) in file.rules.into_iter().enumerate() {
            let all_of: Vec<String> = rule
                .all_of
                .iter()
                .map(|token| normalize_for_match(token))
                .filter(|token| !token.is_empty())
                .collect();
            if all_of.is_empty() {
                return Err(GazetteerError::EmptyRule(idx));
            }
            let rule = CompoundRule { all_of, ..rule };
            check_bounds(&rule.label(), rule.lat, rule.lng, bounds)?;
            rules.push(rule);
        }

        Ok(Self::index(entries, rules))
    }

    fn index(entries: Vec<GazetteerEntry>, rules: Vec<CompoundRule>) -> Self {
        let mut scan_order: Vec<usize> = (0..entries.len()).collect();
        // sort_by_key is stable, so equal lengths keep declaration order
        scan_order.sort_by_key(|&idx| std::cmp::Reverse(entries[idx].key.chars().count()));
        Self {
            entries,
            rules,
            scan_order,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GazetteerEntry] {
        &self.entries
    }

    pub fn rules(&self) -> &[CompoundRule] {
        &self.rules
    }

    /// Exact-match lookup: compound rules first, then the longest contained key.
    ///
    /// Blank or unknown addresses yield `None`; this never fails.
    pub fn lookup(&self, address: &str) -> Option<GazetteerMatch> {
        let normalized = normalize_for_match(address);
        if normalized.is_empty() {
            return None;
        }

        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&normalized)) {
            tracing::debug!("Gazetteer rule [{}] matched {:?}", rule.label(), address);
            return Some(GazetteerMatch {
                label: rule.label(),
                coordinate: Coordinate::new(rule.lat, rule.lng),
                via_rule: true,
            });
        }

        let entry = self
            .scan_order
            .iter()
            .map(|&idx| &self.entries[idx])
            .find(|entry| normalized.contains(entry.key.as_str()))?;
        tracing::debug!("Gazetteer key {:?} matched {:?}", entry.key, address);
        Some(GazetteerMatch {
            label: entry.key.clone(),
            coordinate: Coordinate::new(entry.lat, entry.lng),
            via_rule: false,
        })
    }
}

fn check_bounds(label: &str, lat: f64, lng: f64, bounds: BoundingBox) -> Result<(), GazetteerError> {
    let coord = Coordinate::new(lat, lng);
    if coord.is_finite() && bounds.contains(coord) {
        Ok(())
    } else {
        Err(GazetteerError::OutOfBounds {
            label: label.to_string(),
            lat,
            lng,
        })
    }
}

const BUILTIN_RULES: &[(&[&str], f64, f64)] = &[
    (&["maradana", "baseline road"], 6.9337, 79.8641),
    (&["moratuwa", "galle road"], 6.7795, 79.8830),
    (&["dehiwala", "galle road"], 6.8565, 79.8620),
    (&["colombo 03", "galle road"], 6.9105, 79.8500),
    (&["kandy", "peradeniya road"], 7.2820, 80.6220),
    (&["negombo", "colombo road"], 7.1950, 79.8560),
];

const BUILTIN_ENTRIES: &[(&str, f64, f64)] = &[
    ("colombo", 6.9271, 79.8612),
    ("colombo 01", 6.9344, 79.8428),
    ("colombo 02", 6.9177, 79.8500),
    ("colombo 03", 6.9115, 79.8500),
    ("colombo 04", 6.8892, 79.8567),
    ("colombo 05", 6.8795, 79.8652),
    ("colombo 06", 6.8740, 79.8606),
    ("colombo 07", 6.9110, 79.8650),
    ("colombo 08", 6.9147, 79.8778),
    ("colombo 09", 6.9350, 79.8770),
    ("colombo 10", 6.9337, 79.8641),
    ("colombo 11", 6.9366, 79.8500),
    ("colombo 12", 6.9410, 79.8580),
    ("colombo 13", 6.9450, 79.8600),
    ("colombo 14", 6.9480, 79.8720),
    ("colombo 15", 6.9600, 79.8720),
    ("colombo fort", 6.9344, 79.8428),
    ("pettah", 6.9366, 79.8500),
    ("slave island", 6.9177, 79.8500),
    ("kollupitiya", 6.9115, 79.8500),
    ("bambalapitiya", 6.8892, 79.8567),
    ("havelock town", 6.8795, 79.8652),
    ("wellawatte", 6.8740, 79.8606),
    ("cinnamon gardens", 6.9110, 79.8650),
    ("borella", 6.9147, 79.8778),
    ("dematagoda", 6.9350, 79.8770),
    ("maradana", 6.9337, 79.8641),
    ("kotahena", 6.9450, 79.8600),
    ("grandpass", 6.9480, 79.8720),
    ("mattakkuliya", 6.9600, 79.8720),
    ("dehiwala", 6.8511, 79.8650),
    ("mount lavinia", 6.8389, 79.8653),
    ("ratmalana", 6.8200, 79.8800),
    ("moratuwa", 6.7730, 79.8816),
    ("panadura", 6.7132, 79.9026),
    ("kalutara", 6.5854, 79.9607),
    ("nugegoda", 6.8649, 79.8997),
    ("maharagama", 6.8480, 79.9265),
    ("kottawa", 6.8412, 79.9650),
    ("homagama", 6.8440, 80.0024),
    ("piliyandala", 6.8018, 79.9227),
    ("sri jayawardenepura kotte", 6.8868, 79.9187),
    ("battaramulla", 6.9000, 79.9180),
    ("rajagiriya", 6.9100, 79.8950),
    ("malabe", 6.9061, 79.9696),
    ("kaduwela", 6.9333, 80.0000),
    ("kelaniya", 6.9553, 79.9220),
    ("wattala", 6.9897, 79.8918),
    ("ja-ela", 7.0744, 79.8919),
    ("negombo", 7.2083, 79.8358),
    ("gampaha", 7.0917, 79.9999),
    ("avissawella", 6.9553, 80.2100),
    ("kandy", 7.2906, 80.6337),
    ("peradeniya", 7.2690, 80.5970),
    ("matale", 7.4675, 80.6234),
    ("kegalle", 7.2513, 80.3464),
    ("kurunegala", 7.4863, 80.3647),
    ("puttalam", 8.0362, 79.8283),
    ("anuradhapura", 8.3114, 80.4037),
    ("polonnaruwa", 7.9403, 81.0188),
    ("trincomalee", 8.5874, 81.2152),
    ("batticaloa", 7.7310, 81.6747),
    ("jaffna", 9.6615, 80.0255),
    ("nuwara eliya", 6.9497, 80.7891),
    ("badulla", 6.9934, 81.0550),
    ("ratnapura", 6.6828, 80.3992),
    ("galle", 6.0535, 80.2210),
    ("matara", 5.9549, 80.5550),
    ("hambantota", 6.1241, 81.1185),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_valid() {
        let file = GazetteerFile {
            entries: Gazetteer::builtin().entries().to_vec(),
            rules: Gazetteer::builtin().rules().to_vec(),
        };
        let checked = Gazetteer::from_gazetteer_file(file, SRI_LANKA_BOUNDS).unwrap();
        assert_eq!(checked.len(), BUILTIN_ENTRIES.len());
        assert_eq!(checked.rules().len(), BUILTIN_RULES.len());
    }

    #[test]
    fn every_key_resolves_to_itself() {
        let gazetteer = Gazetteer::builtin();
        for entry in gazetteer.entries() {
            for address in [entry.key.clone(), format!("No. 5, {}", entry.key.to_uppercase())] {
                let found = gazetteer.lookup(&address).expect("key should match");
                assert_eq!(found.label, entry.key, "address {address:?}");
                assert_eq!(found.coordinate, Coordinate::new(entry.lat, entry.lng));
            }
        }
    }

    #[test]
    fn compound_rule_takes_precedence() {
        let gazetteer = Gazetteer::builtin();
        let found = gazetteer
            .lookup("Maradana, Baseline Road, Colombo 10")
            .unwrap();
        assert!(found.via_rule);
        assert_eq!(found.label, "maradana + baseline road");
        assert_eq!(found.coordinate, Coordinate::new(6.9337, 79.8641));
    }

    #[test]
    fn moratuwa_galle_road_override() {
        let gazetteer = Gazetteer::builtin();
        let found = gazetteer.lookup("234 Galle Road, Moratuwa").unwrap();
        assert!(found.via_rule);
        assert_eq!(found.coordinate, Coordinate::new(6.7795, 79.8830));

        let plain = gazetteer.lookup("Station Road, Moratuwa").unwrap();
        assert!(!plain.via_rule);
        assert_eq!(plain.coordinate, Coordinate::new(6.7730, 79.8816));
    }

    #[test]
    fn longer_key_beats_generic_prefix() {
        let gazetteer = Gazetteer::builtin();
        let found = gazetteer.lookup("Ward Place, Colombo 7").unwrap();
        assert_eq!(found.label, "colombo 07");
        assert_eq!(found.coordinate, Coordinate::new(6.9110, 79.8650));
    }

    #[test]
    fn equal_length_keys_keep_declaration_order() {
        let file = GazetteerFile {
            entries: vec![
                GazetteerEntry { key: "abcd".into(), lat: 7.0, lng: 80.0 },
                GazetteerEntry { key: "wxyz".into(), lat: 8.0, lng: 81.0 },
            ],
            rules: Vec::new(),
        };
        let gazetteer = Gazetteer::from_gazetteer_file(file, SRI_LANKA_BOUNDS).unwrap();
        assert_eq!(gazetteer.lookup("wxyz abcd").unwrap().label, "abcd");
    }

    #[test]
    fn unknown_and_blank_addresses_do_not_match() {
        let gazetteer = Gazetteer::builtin();
        assert_eq!(gazetteer.lookup("Unknown Village XYZ"), None);
        assert_eq!(gazetteer.lookup(""), None);
        assert_eq!(gazetteer.lookup("   ,  "), None);
    }

    #[test]
    fn rejects_duplicate_keys_after_normalisation() {
        let file = GazetteerFile {
            entries: vec![
                GazetteerEntry { key: "Kandy".into(), lat: 7.29, lng: 80.63 },
                GazetteerEntry { key: " kandy ".into(), lat: 7.30, lng: 80.64 },
            ],
            rules: Vec::new(),
        };
        assert!(matches!(
            Gazetteer::from_gazetteer_file(file, SRI_LANKA_BOUNDS),
            Err(GazetteerError::DuplicateKey(key)) if key == "kandy"
        ));
    }

    #[test]
    fn rejects_entries_outside_bounds() {
        let file = GazetteerFile {
            entries: vec![GazetteerEntry { key: "chennai".into(), lat: 13.08, lng: 80.27 }],
            rules: Vec::new(),
        };
        assert!(matches!(
            Gazetteer::from_gazetteer_file(file, SRI_LANKA_BOUNDS),
            Err(GazetteerError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn rejects_empty_table_and_rules() {
        let empty = GazetteerFile { entries: Vec::new(), rules: Vec::new() };
        assert!(matches!(
            Gazetteer::from_gazetteer_file(empty, SRI_LANKA_BOUNDS),
            Err(GazetteerError::Empty)
        ));

        let blank_rule = GazetteerFile {
            entries: vec![GazetteerEntry { key: "kandy".into(), lat: 7.29, lng: 80.63 }],
            rules: vec![CompoundRule { all_of: vec!["  ".into()], lat: 7.0, lng: 80.0 }],
        };
        assert!(matches!(
            Gazetteer::from_gazetteer_file(blank_rule, SRI_LANKA_BOUNDS),
            Err(GazetteerError::EmptyRule(0))
        ));
    }

    #[test]
    fn loads_from_reader() {
        let json = r#"{
            "entries": [{"key": "Galle Fort", "lat": 6.0267, "lng": 80.2170}],
            "rules": [{"all_of": ["galle fort", "church street"], "lat": 6.0260, "lng": 80.2175}]
        }"#;
        let gazetteer = Gazetteer::from_reader(json.as_bytes()).unwrap();
        assert_eq!(gazetteer.lookup("Galle Fort").unwrap().label, "galle fort");
        assert!(gazetteer.lookup("Church Street, Galle Fort").unwrap().via_rule);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gazetteer.json");
        std::fs::write(&path, r#"{"entries": [{"key": "jaffna", "lat": 9.66, "lng": 80.02}]}"#)
            .unwrap();
        let gazetteer = Gazetteer::from_file(&path).unwrap();
        assert_eq!(gazetteer.len(), 1);
        assert!(matches!(
            Gazetteer::from_file(dir.path().join("missing.json")),
            Err(GazetteerError::Io(_))
        ));
    }
}
