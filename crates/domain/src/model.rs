//! Domain models and value objects

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use time::{Date, Month};

use crate::fingerprint::{Fingerprint, fingerprint_value};

/// Value stored in place of a digest that has never been written
pub const DIGEST_SENTINEL: &str = "-1";

/// Rule version sent with every cost category definition
pub const RULE_VERSION: &str = "CostCategoryExpression.v1";

/// Dimension matched by every generated rule
pub const LINKED_ACCOUNT_DIMENSION: &str = "LINKED_ACCOUNT";

/// A single key/value tag attached to an account or unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagAssignment {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl TagAssignment {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Account id to allowed tags, in account enumeration order.
///
/// Iteration order is insertion order, which makes rule construction
/// deterministic. The fingerprint ignores that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountTagMap {
    entries: Vec<(String, Vec<TagAssignment>)>,
    positions: HashMap<String, usize>,
}

impl AccountTagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append tags for an account, creating the entry on first use
    pub fn extend_account(
        &mut self,
        account_id: impl Into<String>,
        tags: impl IntoIterator<Item = TagAssignment>,
    ) {
        let account_id = account_id.into();
        let mut tags = tags.into_iter().peekable();
        if tags.peek().is_none() {
            return;
        }

        match self.positions.get(&account_id) {
            Some(&index) => self.entries[index].1.extend(tags),
            None => {
                self.positions.insert(account_id.clone(), self.entries.len());
                self.entries.push((account_id, tags.collect()));
            }
        }
    }

    pub fn get(&self, account_id: &str) -> Option<&[TagAssignment]> {
        self.positions
            .get(account_id)
            .map(|&index| self.entries[index].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TagAssignment])> {
        self.entries
            .iter()
            .map(|(id, tags)| (id.as_str(), tags.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object form: `{"<account>": [{"Key": .., "Value": ..}, ..]}`
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (account_id, tags) in &self.entries {
            let tags = tags
                .iter()
                .map(|tag| json!({ "Key": tag.key, "Value": tag.value }))
                .collect();
            object.insert(account_id.clone(), Value::Array(tags));
        }
        Value::Object(object)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint_value(&self.to_json())
    }
}

impl<A: Into<String>> FromIterator<(A, Vec<TagAssignment>)> for AccountTagMap {
    fn from_iter<I: IntoIterator<Item = (A, Vec<TagAssignment>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (account_id, tags) in iter {
            map.extend_account(account_id, tags);
        }
        map
    }
}

impl Serialize for AccountTagMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (account_id, tags) in &self.entries {
            map.serialize_entry(account_id, tags)?;
        }
        map.end()
    }
}

/// Organizational unit ids, kept sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitIdSet(BTreeSet<String>);

impl UnitIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the id was already present
    pub fn insert(&mut self, unit_id: impl Into<String>) -> bool {
        self.0.insert(unit_id.into())
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.0.contains(unit_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sorted_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let ids = self
            .sorted_ids()
            .map(|id| Value::String(id.to_string()))
            .collect();
        fingerprint_value(&Value::Array(ids))
    }
}

impl<S: Into<String>> FromIterator<S> for UnitIdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Everything collected from the organization in one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgSnapshot {
    pub accounts: AccountTagMap,
    pub units: UnitIdSet,
}

/// Storage keys under which the two digests live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestKeys {
    pub accounts: String,
    pub units: String,
}

/// Digests as read back from storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestPair {
    pub accounts: String,
    pub units: String,
}

impl DigestPair {
    /// Pair as read before any run has completed
    pub fn never_written() -> Self {
        Self {
            accounts: DIGEST_SENTINEL.to_string(),
            units: DIGEST_SENTINEL.to_string(),
        }
    }
}

/// Error building a model value from configuration
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid month {0}: expected 1-12")]
    InvalidMonth(u8),
    #[error("Invalid effective start date: {0}")]
    InvalidDate(String),
}

/// First day of the month from which categories take effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveStart {
    date: Date,
}

impl EffectiveStart {
    pub fn new(year: i32, month: u8) -> Result<Self, ModelError> {
        let month = Month::try_from(month).map_err(|_| ModelError::InvalidMonth(month))?;
        let date = Date::from_calendar_date(year, month, 1)
            .map_err(|e| ModelError::InvalidDate(e.to_string()))?;
        Ok(Self { date })
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> Month {
        self.date.month()
    }

    /// ISO-8601 first-of-month midnight UTC, e.g. `2024-03-01T00:00:00Z`
    pub fn to_iso8601(&self) -> String {
        format!("{:04}-{:02}-01T00:00:00Z", self.year(), u8::from(self.month()))
    }
}

impl fmt::Display for EffectiveStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Tag proving a remote definition is managed by this tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipMarker {
    pub key: String,
    pub value: String,
}

impl OwnershipMarker {
    pub const DEFAULT_KEY: &'static str = "aws-finops-managed";
    pub const DEFAULT_VALUE: &'static str = "true";

    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, key: &str, value: &str) -> bool {
        self.key == key && self.value == value
    }
}

impl Default for OwnershipMarker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEY, Self::DEFAULT_VALUE)
    }
}

/// One label of a cost category: a tag value and the accounts carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostCategoryRule {
    pub value: String,
    pub accounts: Vec<String>,
}

impl CostCategoryRule {
    /// Rule document in the shape the categorization API expects
    pub fn to_remote_json(&self) -> Value {
        json!({
            "Value": self.value,
            "Rule": {
                "Dimensions": {
                    "Key": LINKED_ACCOUNT_DIMENSION,
                    "Values": self.accounts,
                    "MatchOptions": ["EQUALS"],
                }
            },
            "Type": "REGULAR",
        })
    }
}

/// A complete cost category, named after a tag key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostCategoryDefinition {
    pub name: String,
    pub rules: Vec<CostCategoryRule>,
}

impl CostCategoryDefinition {
    pub fn rules_json(&self) -> Value {
        Value::Array(self.rules.iter().map(CostCategoryRule::to_remote_json).collect())
    }

    pub fn rule(&self, value: &str) -> Option<&CostCategoryRule> {
        self.rules.iter().find(|rule| rule.value == value)
    }
}

/// Definitions already owned by this tool, name to remote id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteDefinitionIndex(BTreeMap<String, String>);

impl RemoteDefinitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, remote_id: impl Into<String>) {
        self.0.insert(name.into(), remote_id.into());
    }

    pub fn remote_id(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<N: Into<String>, I: Into<String>> FromIterator<(N, I)> for RemoteDefinitionIndex {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, id)| (name.into(), id.into()))
                .collect(),
        )
    }
}

/// Names touched by a publish cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
}

/// Result of a single sync run
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Both digests matched; nothing was written
    UpToDate { digests: DigestPair },
    /// Dry run: definitions were built but not published
    Planned {
        definitions: Vec<CostCategoryDefinition>,
        digests: DigestPair,
    },
    /// Definitions were published and the new digests persisted
    Published {
        report: PublishReport,
        digests: DigestPair,
    },
}

/// Lifecycle request intent sent by the provisioning system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
    /// Any other request type; handled like a scheduled invocation
    #[serde(other)]
    Unknown,
}

/// Provisioning lifecycle event (CloudFormation custom resource request).
///
/// Every field is optional: a scheduled invocation carries none of them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    #[serde(default)]
    pub request_type: Option<RequestType>,
    /// Presigned, so kept secret
    #[serde(default, rename = "ResponseURL")]
    pub response_url: Option<SecretString>,
    #[serde(default)]
    pub stack_id: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub logical_resource_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn effective_start_formats_first_of_month() {
        let start = EffectiveStart::new(2024, 3).unwrap();
        assert_eq!(start.to_iso8601(), "2024-03-01T00:00:00Z");
    }

    #[test]
    fn effective_start_rejects_bad_month() {
        assert!(matches!(
            EffectiveStart::new(2024, 13),
            Err(ModelError::InvalidMonth(13))
        ));
        assert!(EffectiveStart::new(2024, 0).is_err());
    }

    #[test]
    fn account_tag_map_keeps_insertion_order_and_skips_untagged() {
        let mut map = AccountTagMap::new();
        map.extend_account("222", vec![TagAssignment::new("Team", "a")]);
        map.extend_account("111", vec![TagAssignment::new("Team", "b")]);
        map.extend_account("333", vec![]);

        let ids: Vec<_> = map.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["222", "111"]);
        assert!(map.get("333").is_none());
    }

    #[test]
    fn account_tag_map_serializes_like_remote_tags() {
        let map: AccountTagMap =
            [("111", vec![TagAssignment::new("CostCenter", "Eng")])].into_iter().collect();
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            json!({ "111": [{ "Key": "CostCenter", "Value": "Eng" }] })
        );
        assert_eq!(serde_json::to_value(&map).unwrap(), map.to_json());
    }

    #[test]
    fn rule_renders_linked_account_dimension() {
        let rule = CostCategoryRule {
            value: "Eng".to_string(),
            accounts: vec!["111".to_string(), "222".to_string()],
        };
        assert_eq!(
            rule.to_remote_json(),
            json!({
                "Value": "Eng",
                "Rule": {
                    "Dimensions": {
                        "Key": "LINKED_ACCOUNT",
                        "Values": ["111", "222"],
                        "MatchOptions": ["EQUALS"]
                    }
                },
                "Type": "REGULAR"
            })
        );
    }

    #[test]
    fn lifecycle_event_parses_cloudformation_request() {
        let event: LifecycleEvent = serde_json::from_value(json!({
            "RequestType": "Delete",
            "ResponseURL": "https://example.com/presigned",
            "StackId": "stack",
            "RequestId": "req",
            "LogicalResourceId": "Sync",
            "ResourceProperties": {}
        }))
        .unwrap();

        assert_eq!(event.request_type, Some(RequestType::Delete));
        assert_eq!(
            event.response_url.as_ref().map(|url| url.expose_secret()),
            Some("https://example.com/presigned")
        );
        assert_eq!(event.logical_resource_id.as_deref(), Some("Sync"));
    }

    #[test]
    fn lifecycle_event_debug_hides_response_url() {
        let event = LifecycleEvent {
            response_url: Some(SecretString::new("https://bucket/secret-signature".into())),
            ..Default::default()
        };
        let rendered = format!("{event:?}");
        assert!(!rendered.contains("secret-signature"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn lifecycle_event_tolerates_unknown_request_type() {
        let event: LifecycleEvent =
            serde_json::from_value(json!({ "RequestType": "Other" })).unwrap();
        assert_eq!(event.request_type, Some(RequestType::Unknown));
    }

    #[test]
    fn account_tag_map_merges_repeated_account() {
        let mut map = AccountTagMap::new();
        map.extend_account("111", vec![TagAssignment::new("Team", "a")]);
        map.extend_account("222", vec![TagAssignment::new("Team", "b")]);
        map.extend_account("111", vec![TagAssignment::new("CostCenter", "Eng")]);

        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get("111").unwrap(),
            &[
                TagAssignment::new("Team", "a"),
                TagAssignment::new("CostCenter", "Eng")
            ]
        );
        let ids: Vec<_> = map.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["111", "222"]);
    }

    #[test]
    fn lifecycle_event_accepts_empty_scheduled_event() {
        let event: LifecycleEvent = serde_json::from_value(json!({})).unwrap();
        assert!(event.request_type.is_none());
    }
}
