//! Busbar legality rules.
//!
//! Two layers decide whether a candidate split of a substation is kept:
//!
//! 1. **One-line rule** ([`satisfies_line_rule`]): each busbar must hold at
//!    least one line endpoint, otherwise the objects on it are islanded.
//! 2. **Exclusion table** ([`LegalityRules`]): grid-specific rules keyed by
//!    `(substation, subset size)`, each a structural predicate over the set
//!    of objects placed on busbar 1.
//!
//! Rule files are TOML (or JSON) arrays of entries:
//!
//! ```toml
//! [[rule]]
//! substation = 2
//! subset_size = 2
//! kind = "forbid_all"
//! objects = [{ kind = "load", id = 1 }, { kind = "generator", id = 1 }]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tutor_core::{ObjectRef, SubstationId, TutorError, TutorResult};

/// True when both sides carry at least one line endpoint.
pub fn satisfies_line_rule(busbar_one: &[ObjectRef], busbar_two: &[ObjectRef]) -> bool {
    busbar_one.iter().any(ObjectRef::is_line_endpoint)
        && busbar_two.iter().any(ObjectRef::is_line_endpoint)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    /// Excluded when busbar 1 holds every listed object.
    ForbidAll,
    /// Excluded when busbar 1 holds none of the listed objects.
    RequireAny,
}

/// One entry of the exclusion table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub substation: SubstationId,
    pub subset_size: usize,
    pub kind: PredicateKind,
    pub objects: Vec<ObjectRef>,
}

impl ExclusionRule {
    pub fn forbid_all(substation: usize, subset_size: usize, objects: Vec<ObjectRef>) -> Self {
        Self {
            substation: SubstationId::new(substation),
            subset_size,
            kind: PredicateKind::ForbidAll,
            objects,
        }
    }

    pub fn require_any(substation: usize, subset_size: usize, objects: Vec<ObjectRef>) -> Self {
        Self {
            substation: SubstationId::new(substation),
            subset_size,
            kind: PredicateKind::RequireAny,
            objects,
        }
    }

    pub fn excludes(&self, busbar_one: &[ObjectRef]) -> bool {
        match self.kind {
            PredicateKind::ForbidAll => self.objects.iter().all(|o| busbar_one.contains(o)),
            PredicateKind::RequireAny => !self.objects.iter().any(|o| busbar_one.contains(o)),
        }
    }

    fn check(&self) -> TutorResult<()> {
        if self.subset_size == 0 {
            return Err(TutorError::invalid(format!(
                "rule for substation {} has subset_size 0",
                self.substation
            )));
        }
        if self.objects.is_empty() {
            return Err(TutorError::invalid(format!(
                "rule for substation {} (size {}) lists no objects",
                self.substation, self.subset_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleFile {
    #[serde(default, rename = "rule")]
    rules: Vec<ExclusionRule>,
}

/// Exclusion table keyed by `(substation, subset size)`.
///
/// An empty table leaves only the one-line rule in force.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegalityRules {
    table: BTreeMap<(SubstationId, usize), Vec<ExclusionRule>>,
}

impl LegalityRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = ExclusionRule>) -> TutorResult<Self> {
        let mut table = Self::new();
        for rule in rules {
            rule.check()?;
            table.insert(rule);
        }
        Ok(table)
    }

    pub fn insert(&mut self, rule: ExclusionRule) {
        self.table
            .entry((rule.substation, rule.subset_size))
            .or_default()
            .push(rule);
    }

    pub fn with_rule(mut self, rule: ExclusionRule) -> Self {
        self.insert(rule);
        self
    }

    pub fn rules_for(&self, substation: SubstationId, subset_size: usize) -> &[ExclusionRule] {
        self.table
            .get(&(substation, subset_size))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when any rule for this substation and subset size rejects the
    /// busbar-1 object set.
    pub fn is_excluded(&self, substation: SubstationId, busbar_one: &[ObjectRef]) -> bool {
        self.rules_for(substation, busbar_one.len())
            .iter()
            .any(|rule| rule.excludes(busbar_one))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExclusionRule> {
        self.table.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Operating rules for substations 1, 2 and 5 of `rte_case14_realistic`.
    ///
    /// They keep the local generator or load off an isolated busbar.
    pub fn rte_case14_realistic() -> Self {
        Self::new()
            .with_rule(ExclusionRule::forbid_all(
                2,
                2,
                vec![ObjectRef::load(1), ObjectRef::generator(1)],
            ))
            .with_rule(ExclusionRule::require_any(
                1,
                4,
                vec![ObjectRef::generator(0), ObjectRef::load(0)],
            ))
            .with_rule(ExclusionRule::require_any(
                5,
                4,
                vec![ObjectRef::generator(2), ObjectRef::load(4)],
            ))
    }

    pub fn preset(name: &str) -> TutorResult<Self> {
        match name {
            "rte_case14_realistic" => Ok(Self::rte_case14_realistic()),
            "none" => Ok(Self::new()),
            other => Err(TutorError::invalid(format!(
                "unknown rule preset '{}'; expected rte_case14_realistic or none",
                other
            ))),
        }
    }

    pub fn from_toml_str(data: &str) -> TutorResult<Self> {
        let file: RuleFile = toml::from_str(data)
            .map_err(|e| TutorError::invalid(format!("parsing rule table toml: {}", e)))?;
        Self::from_rules(file.rules)
    }

    pub fn from_json_str(data: &str) -> TutorResult<Self> {
        let file: RuleFile = serde_json::from_str(data)
            .map_err(|e| TutorError::invalid(format!("parsing rule table json: {}", e)))?;
        Self::from_rules(file.rules)
    }

    /// Load a rule table, choosing the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> TutorResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&data),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml_str(&data),
            _ => Self::from_toml_str(&data).or_else(|_| Self::from_json_str(&data)),
        }
    }

    pub fn to_toml_string(&self) -> TutorResult<String> {
        let file = RuleFile {
            rules: self.iter().cloned().collect(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_rule() {
        let a = [ObjectRef::load(0), ObjectRef::line_or(0)];
        let b = [ObjectRef::generator(0), ObjectRef::line_ex(3)];
        let c = [ObjectRef::load(1), ObjectRef::generator(1)];
        assert!(satisfies_line_rule(&a, &b));
        assert!(!satisfies_line_rule(&a, &c));
        assert!(!satisfies_line_rule(&c, &b));
    }

    #[test]
    fn test_forbid_all() {
        let rule = ExclusionRule::forbid_all(2, 2, vec![ObjectRef::load(1), ObjectRef::generator(1)]);
        assert!(rule.excludes(&[ObjectRef::generator(1), ObjectRef::load(1)]));
        assert!(!rule.excludes(&[ObjectRef::load(1), ObjectRef::line_or(2)]));
    }

    #[test]
    fn test_require_any() {
        let rule = ExclusionRule::require_any(1, 4, vec![ObjectRef::generator(0), ObjectRef::load(0)]);
        let without = [
            ObjectRef::line_or(2),
            ObjectRef::line_or(3),
            ObjectRef::line_or(4),
            ObjectRef::line_ex(0),
        ];
        let with = [
            ObjectRef::load(0),
            ObjectRef::line_or(2),
            ObjectRef::line_or(3),
            ObjectRef::line_ex(0),
        ];
        assert!(rule.excludes(&without));
        assert!(!rule.excludes(&with));
    }

    #[test]
    fn test_table_is_keyed_by_subset_size() {
        let rules = LegalityRules::rte_case14_realistic();
        assert_eq!(rules.len(), 3);
        let pair = [ObjectRef::load(1), ObjectRef::generator(1)];
        assert!(rules.is_excluded(SubstationId::new(2), &pair));
        // same objects on another substation are not covered
        assert!(!rules.is_excluded(SubstationId::new(3), &pair));
        // a larger subset holding both is a different key
        let triple = [ObjectRef::load(1), ObjectRef::generator(1), ObjectRef::line_or(5)];
        assert!(!rules.is_excluded(SubstationId::new(2), &triple));
    }

    #[test]
    fn test_toml_round_trip() {
        let rules = LegalityRules::rte_case14_realistic();
        let text = rules.to_toml_string().unwrap();
        let parsed = LegalityRules::from_toml_str(&text).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_json_rules() {
        let json = r#"{ "rule": [
            { "substation": 4, "subset_size": 3, "kind": "require_any",
              "objects": [ { "kind": "load", "id": 3 } ] }
        ] }"#;
        let rules = LegalityRules::from_json_str(json).unwrap();
        assert_eq!(rules.rules_for(SubstationId::new(4), 3).len(), 1);
    }

    #[test]
    fn test_empty_rule_rejected() {
        let json = r#"{ "rule": [
            { "substation": 4, "subset_size": 3, "kind": "forbid_all", "objects": [] }
        ] }"#;
        assert!(matches!(
            LegalityRules::from_json_str(json),
            Err(TutorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_preset() {
        assert!(LegalityRules::preset("ieee118").is_err());
        assert!(LegalityRules::preset("none").unwrap().is_empty());
    }
}
