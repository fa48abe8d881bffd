//! Queue aggregation and statistics.
//!
//! This module turns a raw queue snapshot plus the three dashboard filters
//! (workspace, rep, size bucket) into the pivots and counters the reports
//! are rendered from. Everything here is pure: same input, same output,
//! same ordering.

use crate::analysis::participation::ParticipationMatrix;
use crate::models::{
    Queue, SizeBucket, WorkspaceDirectory, CS_LABEL, EXISTING_CUSTOMER_OWNER, SALES_LABEL,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Filter selections. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsFilter {
    /// Workspace label, e.g. `Sales`.
    pub workspace: Option<String>,
    /// Rep display name.
    pub rep: Option<String>,
    pub size: Option<SizeBucket>,
}

impl StatsFilter {
    fn matches_rep(&self, name: &str) -> bool {
        self.rep.as_deref().map_or(true, |rep| rep == name)
    }
}

/// One member row of a queue in the per-queue pivot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRow {
    pub name: String,
    pub weight: i64,
    pub order: i64,
    pub initial_order: i64,
    pub member_id: String,
    pub queue_id: String,
}

/// One queue membership of a rep in the per-rep pivot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueAssignment {
    pub queue_name: String,
    pub weight: i64,
    pub order: i64,
    pub initial_order: i64,
    pub member_id: String,
    pub queue_id: String,
}

/// An eligible queue with its (rep-filtered) members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueView {
    pub name: String,
    pub queue_id: String,
    pub workspace: String,
    pub size: SizeBucket,
    /// Sorted ascending by `order`.
    pub members: Vec<MemberRow>,
}

/// Everything the reports need, derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Number of eligible queues.
    pub total_queues: usize,
    /// Members across eligible queues, regardless of the rep filter.
    pub total_reps: usize,
    /// Member count -> number of queues with that many members.
    pub queues_by_size: BTreeMap<usize, usize>,
    /// Queue name -> member count.
    pub reps_by_queue: BTreeMap<String, usize>,
    pub main_reps: usize,
    pub mandatory_reps: usize,
    /// Eligible queues by descending member count.
    pub queue_pivot: Vec<QueueView>,
    /// Rep name -> queues, each list sorted by `order`.
    pub rep_pivot: BTreeMap<String, Vec<QueueAssignment>>,
    pub workspaces: BTreeSet<String>,
    /// Queue id -> admin console URL (empty when no admin URL is configured).
    pub queue_links: BTreeMap<String, String>,
    /// Rep x queue weights over eligible queues.
    pub participation: ParticipationMatrix,
    pub sales_queues: Vec<String>,
    pub cs_queues: Vec<String>,
    /// Reps with at least one membership in a CS queue.
    pub cs_users: BTreeSet<String>,
}

impl Statistics {
    /// Rep pivot entries ordered by how many queues each rep is in (most first).
    pub fn reps_by_queue_count(&self) -> Vec<(&str, &[QueueAssignment])> {
        let mut reps: Vec<_> = self
            .rep_pivot
            .iter()
            .map(|(name, queues)| (name.as_str(), queues.as_slice()))
            .collect();
        reps.sort_by_key(|(_, queues)| std::cmp::Reverse(queues.len()));
        reps
    }
}

/// Classify a queue into a size bucket from its employee-count rule.
///
/// The first employee-range rule with a value decides; a value whose first
/// number does not parse yields [`SizeBucket::Unsized`].
pub fn classify_size(queue: &Queue) -> SizeBucket {
    for rule in queue.rules.iter().filter(|r| r.is_employee_range()) {
        match &rule.value {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(Value::String(s)) => {
                return parse_lower_bound(s)
                    .map(SizeBucket::from_lower_bound)
                    .unwrap_or(SizeBucket::Unsized);
            }
            Some(_) => return SizeBucket::Unsized,
        }
    }
    SizeBucket::Unsized
}

/// First number of a hyphenated range: `"11-30"` -> `11`.
fn parse_lower_bound(range: &str) -> Option<i64> {
    range.split('-').next()?.trim().parse().ok()
}

/// Builds [`Statistics`] from snapshots.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    workspaces: WorkspaceDirectory,
    admin_base_url: Option<String>,
}

impl Aggregator {
    pub fn new(workspaces: WorkspaceDirectory) -> Self {
        Self {
            workspaces,
            admin_base_url: None,
        }
    }

    /// Also produce `queue_links` pointing at this admin console.
    pub fn with_admin_base_url(mut self, url: impl Into<String>) -> Self {
        self.admin_base_url = Some(url.into());
        self
    }

    pub fn workspaces(&self) -> &WorkspaceDirectory {
        &self.workspaces
    }

    /// Admin console URL for a queue, if an admin base URL is configured.
    pub fn queue_link(&self, queue: &Queue) -> Option<String> {
        self.admin_base_url.as_ref().map(|base| {
            format!(
                "{}/admin-center/meetings/{}/queues/edit/{}",
                base.trim_end_matches('/'),
                queue.workspace_id,
                queue.id
            )
        })
    }

    fn is_eligible(&self, queue: &Queue, filter: &StatsFilter) -> bool {
        queue.is_live()
            && queue.name != EXISTING_CUSTOMER_OWNER
            && filter
                .workspace
                .as_deref()
                .map_or(true, |ws| self.workspaces.label(&queue.workspace_id) == ws)
            && filter.size.map_or(true, |size| classify_size(queue) == size)
    }

    /// Compute all derived views for `queues` under `filter`.
    pub fn aggregate(&self, queues: &[Queue], filter: &StatsFilter) -> Statistics {
        let mut eligible: Vec<&Queue> = queues
            .iter()
            .filter(|q| self.is_eligible(q, filter))
            .collect();
        // sort_by_key is stable; ties keep snapshot order
        eligible.sort_by_key(|q| std::cmp::Reverse(q.members.len()));

        let mut stats = Statistics {
            total_queues: eligible.len(),
            total_reps: eligible.iter().map(|q| q.members.len()).sum(),
            ..Statistics::default()
        };

        for queue in &eligible {
            let label = self.workspaces.label(&queue.workspace_id);
            stats.workspaces.insert(label.to_string());

            *stats.queues_by_size.entry(queue.members.len()).or_default() += 1;
            stats
                .reps_by_queue
                .insert(queue.name.clone(), queue.members.len());
            stats.main_reps += queue.members.iter().filter(|m| m.main).count();
            stats.mandatory_reps += queue.members.iter().filter(|m| m.mandatory).count();

            let mut members: Vec<MemberRow> = queue
                .members
                .iter()
                .filter(|m| filter.matches_rep(&m.name))
                .map(|m| MemberRow {
                    name: m.name.clone(),
                    weight: m.weight,
                    order: m.order,
                    initial_order: m.initial_order,
                    member_id: m.id.clone(),
                    queue_id: queue.id.clone(),
                })
                .collect();
            members.sort_by_key(|m| m.order);

            for m in &members {
                stats
                    .rep_pivot
                    .entry(m.name.clone())
                    .or_default()
                    .push(QueueAssignment {
                        queue_name: queue.name.clone(),
                        weight: m.weight,
                        order: m.order,
                        initial_order: m.initial_order,
                        member_id: m.member_id.clone(),
                        queue_id: m.queue_id.clone(),
                    });
            }

            if !members.is_empty() {
                stats.queue_pivot.push(QueueView {
                    name: queue.name.clone(),
                    queue_id: queue.id.clone(),
                    workspace: label.to_string(),
                    size: classify_size(queue),
                    members,
                });
            }

            if let Some(link) = self.queue_link(queue) {
                stats.queue_links.insert(queue.id.clone(), link);
            }

            match label {
                SALES_LABEL => stats.sales_queues.push(queue.name.clone()),
                CS_LABEL => stats.cs_queues.push(queue.name.clone()),
                _ => {}
            }

            for member in &queue.members {
                stats
                    .participation
                    .insert(&member.name, &queue.name, member.weight);
                if label == CS_LABEL {
                    stats.cs_users.insert(member.name.clone());
                }
            }
        }

        for assignments in stats.rep_pivot.values_mut() {
            assignments.sort_by_key(|a| a.order);
        }

        stats.sales_queues.sort();
        stats.cs_queues.sort();

        prune_owner_only_reps(queues, &mut stats.participation);

        stats
    }
}

/// Drop reps whose only membership is the owner queue.
///
/// Looks at the owner queue by name, ignoring active state and filters.
fn prune_owner_only_reps(queues: &[Queue], participation: &mut ParticipationMatrix) {
    let Some(owner) = queues.iter().find(|q| q.name == EXISTING_CUSTOMER_OWNER) else {
        return;
    };

    let owner_only: Vec<&str> = owner
        .members
        .iter()
        .map(|m| m.name.as_str())
        .filter(|name| {
            participation.contains_rep(name)
                && participation
                    .queues_for(name)
                    .all(|q| q == EXISTING_CUSTOMER_OWNER)
        })
        .collect();

    for rep in owner_only {
        participation.remove_rep(rep);
    }
}

/// The choices a caller can pick filters from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Every workspace label in the snapshot.
    pub workspaces: Vec<String>,
    /// Every rep name in the snapshot.
    pub reps: Vec<String>,
    /// Size buckets that have at least one live queue, in display order.
    pub sizes: Vec<SizeBucket>,
}

impl FilterOptions {
    pub fn from_queues(queues: &[Queue], workspaces: &WorkspaceDirectory) -> Self {
        let labels: BTreeSet<String> = queues
            .iter()
            .map(|q| workspaces.label(&q.workspace_id).to_string())
            .collect();
        let reps: BTreeSet<String> = queues
            .iter()
            .flat_map(|q| q.members.iter().map(|m| m.name.clone()))
            .collect();
        let live_sizes: BTreeSet<SizeBucket> = queues
            .iter()
            .filter(|q| q.is_live())
            .map(classify_size)
            .collect();

        Self {
            workspaces: labels.into_iter().collect(),
            reps: reps.into_iter().collect(),
            sizes: SizeBucket::ALL
                .into_iter()
                .filter(|s| live_sizes.contains(s))
                .collect(),
        }
    }
}
