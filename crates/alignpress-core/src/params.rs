//! Per-strategy detector parameters.
//!
//! Two explicit layouts exist:
//!
//! ```json
//! {"layout": "shared", "values": {"threshold": "otsu"}}
//! {"layout": "per_detector", "detectors": {"contour": {"invert": true}}, "fallback": {}}
//! ```
//!
//! Untagged maps (the historical format, where a strategy's params may be
//! nested under its name next to flat keys) are accepted through
//! [`DetectorParams::from_legacy`].

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Flat key/value parameters handed to one strategy.
pub type ParamMap = serde_json::Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum DetectorParams {
    /// Every strategy sees the same map.
    Shared { values: ParamMap },
    /// Strategies listed in `detectors` get their own map; everyone else sees `fallback`.
    PerDetector {
        detectors: BTreeMap<String, ParamMap>,
        #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
        fallback: ParamMap,
    },
}

impl Default for DetectorParams {
    fn default() -> Self {
        DetectorParams::Shared {
            values: ParamMap::new(),
        }
    }
}

impl DetectorParams {
    pub fn shared(values: ParamMap) -> Self {
        DetectorParams::Shared { values }
    }

    /// Interpret an untagged map.
    ///
    /// Object-valued entries are treated as per-strategy namespaces; the whole
    /// map (namespaces included) stays the fallback so a strategy without its
    /// own entry sees exactly the map it used to.
    pub fn from_legacy(map: ParamMap) -> Self {
        let detectors: BTreeMap<String, ParamMap> = map
            .iter()
            .filter_map(|(k, v)| v.as_object().map(|o| (k.clone(), o.clone())))
            .collect();
        if detectors.is_empty() {
            DetectorParams::Shared { values: map }
        } else {
            DetectorParams::PerDetector {
                detectors,
                fallback: map,
            }
        }
    }

    /// Effective parameters for the strategy called `name`.
    pub fn for_detector(&self, name: &str) -> &ParamMap {
        match self {
            DetectorParams::Shared { values } => values,
            DetectorParams::PerDetector {
                detectors,
                fallback,
            } => detectors.get(name).unwrap_or(fallback),
        }
    }

    /// Set `key` in the map that `detector` resolves to.
    pub fn insert_for(&mut self, detector: &str, key: &str, value: Value) {
        let target = match self {
            DetectorParams::Shared { values } => values,
            DetectorParams::PerDetector {
                detectors,
                fallback,
            } => match detectors.get_mut(detector) {
                Some(own) => own,
                None => fallback,
            },
        };
        target.insert(key.to_owned(), value);
    }
}

#[derive(Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
enum TaggedParams {
    Shared {
        #[serde(default)]
        values: ParamMap,
    },
    PerDetector {
        #[serde(default)]
        detectors: BTreeMap<String, ParamMap>,
        #[serde(default)]
        fallback: ParamMap,
    },
}

impl<'de> Deserialize<'de> for DetectorParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(DetectorParams::default()),
            Value::Object(map) if map.get("layout").is_some_and(Value::is_string) => {
                let tagged: TaggedParams =
                    serde_json::from_value(Value::Object(map)).map_err(D::Error::custom)?;
                Ok(match tagged {
                    TaggedParams::Shared { values } => DetectorParams::Shared { values },
                    TaggedParams::PerDetector {
                        detectors,
                        fallback,
                    } => DetectorParams::PerDetector {
                        detectors,
                        fallback,
                    },
                })
            }
            Value::Object(map) => Ok(DetectorParams::from_legacy(map)),
            other => Err(D::Error::custom(format!(
                "detector params must be a JSON object, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> ParamMap {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn legacy_nested_entry_wins_for_its_strategy() {
        let params = DetectorParams::from_legacy(map(json!({
            "threshold": "fixed",
            "contour": {"invert": true}
        })));
        assert_eq!(params.for_detector("contour"), &map(json!({"invert": true})));
        // a strategy without its own entry sees the whole historical map
        let marker = params.for_detector("marker");
        assert_eq!(marker["threshold"], json!("fixed"));
        assert!(marker.contains_key("contour"));
    }

    #[test]
    fn legacy_flat_map_is_shared() {
        let params = DetectorParams::from_legacy(map(json!({"min_area": 800})));
        assert!(matches!(params, DetectorParams::Shared { .. }));
        assert_eq!(params.for_detector("anything")["min_area"], json!(800));
    }

    #[test]
    fn tagged_layouts_deserialize() {
        let shared: DetectorParams =
            serde_json::from_value(json!({"layout": "shared", "values": {"invert": true}}))
                .unwrap();
        assert_eq!(shared.for_detector("contour")["invert"], json!(true));

        let per: DetectorParams = serde_json::from_value(json!({
            "layout": "per_detector",
            "detectors": {"marker": {"dictionary": "DICT_4X4_50"}},
            "fallback": {"morph_k": 5}
        }))
        .unwrap();
        assert_eq!(per.for_detector("marker")["dictionary"], json!("DICT_4X4_50"));
        assert_eq!(per.for_detector("contour")["morph_k"], json!(5));
    }

    #[test]
    fn untagged_json_goes_through_legacy_shim() {
        let params: DetectorParams =
            serde_json::from_value(json!({"aruco": {"dictionary": "DICT_5X5_50"}})).unwrap();
        assert!(matches!(params, DetectorParams::PerDetector { .. }));
        assert!(serde_json::from_value::<DetectorParams>(json!([1, 2])).is_err());
        assert_eq!(
            serde_json::from_value::<DetectorParams>(Value::Null).unwrap(),
            DetectorParams::default()
        );
    }

    #[test]
    fn insert_targets_the_resolved_map() {
        let mut params = DetectorParams::from_legacy(map(json!({"marker": {"dictionary": "D"}})));
        params.insert_for("marker", "expected_id", json!(7));
        assert_eq!(params.for_detector("marker")["expected_id"], json!(7));
        assert!(!params.for_detector("contour").contains_key("expected_id"));

        let mut shared = DetectorParams::default();
        shared.insert_for("marker", "expected_id", json!(3));
        assert_eq!(shared.for_detector("contour")["expected_id"], json!(3));
    }

    #[test]
    fn tagged_output_round_trips() {
        let params = DetectorParams::from_legacy(map(json!({"contour": {"invert": true}})));
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["layout"], json!("per_detector"));
        let back: DetectorParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
