//! Freezer option handling.
//!
//! Dist specs write freezer options the way humans like them
//! (`target-dir = ...`); the freezer wants a single camel-style token
//! (`targetDir`). The `includes`/`excludes` keys are lifted out of the map and
//! merged into the module lists, and `optimize` is carried separately as the
//! freezer's internal `optimizeFlag`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::SpecError;
use crate::{ALTERNATE_RUNTIME_PACKAGE, RUNTIME_SUPPORT_PACKAGE};

/// Option name users write to request bytecode optimization.
pub const OPTIMIZE_OPTION: &str = "optimize";

/// Name the freezer expects for the optimization level.
pub const OPTIMIZE_FLAG: &str = "optimizeFlag";

/// Normalise an option name into the freezer's camel-style form.
///
/// Components are split on `-`; every component after the first has its
/// first character upper-cased and all are joined. Empty components
/// contribute nothing.
///
/// ```
/// use bootdist_schema::normalise_option_name;
///
/// assert_eq!(normalise_option_name("target-dir"), "targetDir");
/// assert_eq!(normalise_option_name("a--b"), "aB");
/// ```
pub fn normalise_option_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, bit) in name.split('-').enumerate() {
        if i == 0 {
            out.push_str(bit);
            continue;
        }
        let mut chars = bit.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Freezer options after normalisation, ready to hand to a freezer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FreezerOptions {
    /// Modules the freezer must include.
    pub includes: Vec<String>,
    /// Modules the freezer must leave out.
    pub excludes: Vec<String>,
    /// Remaining options, keyed by normalised name.
    pub options: BTreeMap<String, toml::Value>,
    /// Optimization level, moved out of the general map.
    #[serde(rename = "optimizeFlag", skip_serializing_if = "Option::is_none")]
    pub optimize_flag: Option<toml::Value>,
}

impl FreezerOptions {
    /// Build normalised options from a dist spec's lists and raw option map.
    ///
    /// `includes`/`excludes` entries in `raw` are appended to the explicit
    /// lists. The runtime support package is added to the includes and the
    /// alternate-runtime package to the excludes, unless either already
    /// appears in one of the lists.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidOption`] if `includes` or `excludes` in
    /// `raw` is not an array of strings.
    pub fn from_spec(
        includes: &[String],
        excludes: &[String],
        raw: &BTreeMap<String, toml::Value>,
    ) -> Result<Self, SpecError> {
        let mut includes = includes.to_vec();
        let mut excludes = excludes.to_vec();
        let mut options = BTreeMap::new();
        let mut optimize_flag = None;

        for (name, value) in raw {
            match name.as_str() {
                "includes" => includes.extend(string_list(name, value)?),
                "excludes" => excludes.extend(string_list(name, value)?),
                _ => {
                    let normalised = normalise_option_name(name);
                    if normalised == OPTIMIZE_OPTION {
                        optimize_flag = Some(value.clone());
                    } else {
                        options.insert(normalised, value.clone());
                    }
                }
            }
        }

        let mentioned = |name: &str, inc: &[String], exc: &[String]| {
            inc.iter().chain(exc).any(|m| m == name)
        };
        if !mentioned(RUNTIME_SUPPORT_PACKAGE, &includes, &excludes) {
            includes.push(RUNTIME_SUPPORT_PACKAGE.to_string());
        }
        if !mentioned(ALTERNATE_RUNTIME_PACKAGE, &includes, &excludes) {
            excludes.push(ALTERNATE_RUNTIME_PACKAGE.to_string());
        }

        Ok(Self {
            includes,
            excludes,
            options,
            optimize_flag,
        })
    }
}

fn string_list(name: &str, value: &toml::Value) -> Result<Vec<String>, SpecError> {
    let invalid = || SpecError::InvalidOption {
        name: name.to_string(),
        reason: "expected an array of module names".to_string(),
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, toml::Value)]) -> BTreeMap<String, toml::Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn normalises_hyphenated_names() {
        assert_eq!(normalise_option_name("target-dir"), "targetDir");
        assert_eq!(normalise_option_name("include-msvcr"), "includeMsvcr");
        assert_eq!(normalise_option_name("a--b"), "aB");
        assert_eq!(normalise_option_name("plain"), "plain");
        assert_eq!(normalise_option_name("trailing-"), "trailing");
    }

    #[test]
    fn optimize_moves_to_internal_flag() {
        let opts =
            FreezerOptions::from_spec(&[], &[], &raw(&[("optimize", toml::Value::Integer(2))]))
                .unwrap();
        assert_eq!(opts.optimize_flag, Some(toml::Value::Integer(2)));
        assert!(!opts.options.contains_key("optimize"));
        assert!(!opts.options.contains_key(OPTIMIZE_FLAG));
    }

    #[test]
    fn list_options_merge_into_module_lists() {
        let incs = toml::Value::Array(vec![toml::Value::String("json".into())]);
        let excs = toml::Value::Array(vec![toml::Value::String("tkinter".into())]);
        let opts = FreezerOptions::from_spec(
            &["app".to_string()],
            &[],
            &raw(&[("includes", incs), ("excludes", excs)]),
        )
        .unwrap();
        assert_eq!(opts.includes, vec!["app", "json", RUNTIME_SUPPORT_PACKAGE]);
        assert_eq!(opts.excludes, vec!["tkinter", ALTERNATE_RUNTIME_PACKAGE]);
        assert!(opts.options.is_empty());
    }

    #[test]
    fn explicit_mentions_suppress_defaults() {
        let opts = FreezerOptions::from_spec(
            &[ALTERNATE_RUNTIME_PACKAGE.to_string()],
            &[RUNTIME_SUPPORT_PACKAGE.to_string()],
            &BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(opts.includes, vec![ALTERNATE_RUNTIME_PACKAGE]);
        assert_eq!(opts.excludes, vec![RUNTIME_SUPPORT_PACKAGE]);
    }

    #[test]
    fn rejects_non_list_includes() {
        let err = FreezerOptions::from_spec(
            &[],
            &[],
            &raw(&[("includes", toml::Value::String("json".into()))]),
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::InvalidOption { .. }));
    }
}
