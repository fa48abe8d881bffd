//! Data models for the routing-queue snapshot.
//!
//! These mirror the JSON returned by the lead-routing API's `/queue`
//! endpoint, plus the small value types the rest of the crate derives
//! from them (size buckets, workspace labels).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the owner-routing queue that is kept out of every derived view.
pub const EXISTING_CUSTOMER_OWNER: &str = "Existing Customer - Owner";

/// Workspace label for the sales business unit.
pub const SALES_LABEL: &str = "Sales";

/// Workspace label for the customer-success business unit.
pub const CS_LABEL: &str = "CS";

/// Envelope of `GET /queue`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueuePage {
    /// Queues on this page.
    #[serde(default)]
    pub elements: Vec<Queue>,
    /// Total number of queues the service knows about, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl QueuePage {
    /// Look up a queue by its identifier.
    pub fn find_queue(&self, queue_id: &str) -> Option<&Queue> {
        self.elements.iter().find(|q| q.id == queue_id)
    }

    /// First member id registered under `rep_name` in any queue.
    ///
    /// Names are the only handle the dashboard has on a rep, so the first
    /// occurrence wins.
    pub fn member_id_for_rep(&self, rep_name: &str) -> Option<&str> {
        self.elements
            .iter()
            .flat_map(|q| q.members.iter())
            .find(|m| m.name == rep_name)
            .map(|m| m.id.as_str())
    }
}

/// A routing queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub workspace_id: String,
    /// Members in the order the service returned them.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Targeting rules; only used for size classification.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Queue {
    /// Whether the queue takes part in any derived view at all.
    pub fn is_live(&self) -> bool {
        self.active && !self.members.is_empty()
    }

    /// Find a member of this queue by id.
    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }
}

/// A rep's membership in one queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    /// Display name. Not unique, but it is the join key for rep views.
    pub name: String,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub initial_order: i64,
    /// Primary ("main") rep flag.
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub mandatory: bool,
}

/// A queue targeting rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    /// Usually a string such as `"11-30"`, but the service does not promise it.
    #[serde(default)]
    pub value: Option<Value>,
}

impl Rule {
    /// Whether this is the employee-count rule used for size buckets.
    pub fn is_employee_range(&self) -> bool {
        self.entity.as_deref() == Some("Contact")
            && self.field.as_deref() == Some("numofemployeesrange")
            && self.operator.as_deref() == Some("=")
    }
}

/// Company-size bucket derived from a queue's employee-count rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeBucket {
    #[serde(rename = "1-50")]
    Small,
    #[serde(rename = "51-100")]
    Medium,
    #[serde(rename = "101 and above")]
    Large,
    #[serde(rename = "No Size")]
    Unsized,
}

impl SizeBucket {
    /// All buckets, in the order filters present them.
    pub const ALL: [SizeBucket; 4] = [
        SizeBucket::Small,
        SizeBucket::Medium,
        SizeBucket::Large,
        SizeBucket::Unsized,
    ];

    /// Bucket for the first number of an employee range.
    pub fn from_lower_bound(first: i64) -> Self {
        if first <= 50 {
            SizeBucket::Small
        } else if first <= 100 {
            SizeBucket::Medium
        } else {
            SizeBucket::Large
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizeBucket::Small => "1-50",
            SizeBucket::Medium => "51-100",
            SizeBucket::Large => "101 and above",
            SizeBucket::Unsized => "No Size",
        }
    }
}

impl fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for SizeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        SizeBucket::ALL
            .into_iter()
            .find(|b| b.label().to_lowercase() == normalized)
            .or(match normalized.as_str() {
                "small" => Some(SizeBucket::Small),
                "medium" => Some(SizeBucket::Medium),
                "large" | "101+" => Some(SizeBucket::Large),
                "none" | "unsized" => Some(SizeBucket::Unsized),
                _ => None,
            })
            .ok_or_else(|| {
                format!(
                    "unknown size bucket '{}' (expected one of: 1-50, 51-100, 101 and above, No Size)",
                    s
                )
            })
    }
}

/// Static lookup from workspace id to human label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceDirectory {
    labels: BTreeMap<String, String>,
}

impl WorkspaceDirectory {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    /// Label for `workspace_id`, or the raw id when it is not mapped.
    pub fn label<'a>(&'a self, workspace_id: &'a str) -> &'a str {
        self.labels
            .get(workspace_id)
            .map(String::as_str)
            .unwrap_or(workspace_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_queue_deserialize_camel_case() {
        let queue: Queue = serde_json::from_value(json!({
            "id": "q1",
            "name": "Inbound",
            "active": true,
            "workspaceId": "ws-sales",
            "members": [
                {"id": "m1", "name": "Ada", "weight": 40, "order": 2, "initialOrder": 1, "main": true}
            ],
            "rules": [
                {"entity": "Contact", "field": "numofemployeesrange", "operator": "=", "value": "11-30"}
            ],
            "somethingElse": 12
        }))
        .unwrap();

        assert_eq!(queue.workspace_id, "ws-sales");
        assert!(queue.is_live());
        assert_eq!(queue.members[0].initial_order, 1);
        assert!(queue.members[0].main);
        assert!(!queue.members[0].mandatory);
        assert!(queue.rules[0].is_employee_range());
    }

    #[test]
    fn test_queue_without_members_is_not_live() {
        let queue: Queue = serde_json::from_value(json!({
            "id": "q1", "name": "Empty", "active": true, "workspaceId": "ws"
        }))
        .unwrap();
        assert!(!queue.is_live());
    }

    #[test]
    fn test_size_bucket_from_lower_bound() {
        assert_eq!(SizeBucket::from_lower_bound(1), SizeBucket::Small);
        assert_eq!(SizeBucket::from_lower_bound(50), SizeBucket::Small);
        assert_eq!(SizeBucket::from_lower_bound(51), SizeBucket::Medium);
        assert_eq!(SizeBucket::from_lower_bound(100), SizeBucket::Medium);
        assert_eq!(SizeBucket::from_lower_bound(101), SizeBucket::Large);
    }

    #[test]
    fn test_size_bucket_parse() {
        assert_eq!("1-50".parse::<SizeBucket>(), Ok(SizeBucket::Small));
        assert_eq!("101 and above".parse::<SizeBucket>(), Ok(SizeBucket::Large));
        assert_eq!("no size".parse::<SizeBucket>(), Ok(SizeBucket::Unsized));
        assert!("tiny".parse::<SizeBucket>().is_err());
    }

    #[test]
    fn test_size_bucket_serializes_as_label() {
        let json = serde_json::to_string(&SizeBucket::Large).unwrap();
        assert_eq!(json, "\"101 and above\"");
    }

    #[test]
    fn test_workspace_label_falls_back_to_id() {
        let dir = WorkspaceDirectory::new(
            [("ws-1".to_string(), "Sales".to_string())].into_iter().collect(),
        );
        assert_eq!(dir.label("ws-1"), "Sales");
        assert_eq!(dir.label("ws-2"), "ws-2");
    }

    #[test]
    fn test_member_id_for_rep_takes_first_match() {
        let page: QueuePage = serde_json::from_value(json!({
            "elements": [
                {"id": "q1", "name": "A", "active": true, "workspaceId": "ws",
                 "members": [{"id": "m1", "name": "Ada"}]},
                {"id": "q2", "name": "B", "active": false, "workspaceId": "ws",
                 "members": [{"id": "m9", "name": "Ada"}, {"id": "m2", "name": "Bo"}]}
            ]
        }))
        .unwrap();

        assert_eq!(page.member_id_for_rep("Ada"), Some("m1"));
        assert_eq!(page.member_id_for_rep("Bo"), Some("m2"));
        assert_eq!(page.member_id_for_rep("Cy"), None);
        assert_eq!(page.find_queue("q2").map(|q| q.name.as_str()), Some("B"));
    }
}
