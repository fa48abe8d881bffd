//! Markdown and JSON report generation.
//!
//! Renders [`Statistics`], filter options and audit rows for the terminal
//! or a file. Section selection mirrors the tabs of the dashboard.

use crate::analysis::{FilterOptions, MemberRow, ParticipationTable, Statistics, StatsFilter};
use crate::audit::{ActionKind, AuditEntry};
use crate::cli::{Section, SortKey};
use crate::models::SizeBucket;
use anyhow::Result;
use serde::Serialize;

const ALL: &str = "All";

/// Row order of the per-queue rep tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberSort {
    pub key: SortKey,
    pub descending: bool,
}

impl MemberSort {
    /// Stable: rows with equal keys keep their pivot order in both directions.
    fn sorted<'a>(&self, members: &'a [MemberRow]) -> Vec<&'a MemberRow> {
        let mut rows: Vec<&MemberRow> = members.iter().collect();
        rows.sort_by(|a, b| {
            let ordering = match self.key {
                SortKey::Name => a.name.cmp(&b.name),
                SortKey::Weight => a.weight.cmp(&b.weight),
                SortKey::Order => a.order.cmp(&b.order),
            };
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        rows
    }
}

/// Generate the Markdown statistics report, limited to `section`.
pub fn generate_markdown_report(
    stats: &Statistics,
    filter: &StatsFilter,
    section: Section,
    sort: MemberSort,
) -> String {
    let mut output = String::new();

    output.push_str("# Queue Report\n\n");
    output.push_str(&generate_filter_line(filter));

    let wanted = |s: Section| section == Section::All || section == s;

    if wanted(Section::Overall) {
        output.push_str(&generate_overall_section(stats));
    }
    if wanted(Section::Queues) {
        output.push_str(&generate_queues_section(stats, sort));
    }
    if wanted(Section::Reps) {
        output.push_str(&generate_reps_section(stats));
    }
    if wanted(Section::Participation) {
        output.push_str(&generate_participation_section(stats));
    }
    if wanted(Section::RepsByQueue) {
        output.push_str(&generate_reps_by_queue_section(stats));
    }
    if wanted(Section::QueuesBySize) {
        output.push_str(&generate_queues_by_size_section(stats));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_filter_line(filter: &StatsFilter) -> String {
    format!(
        "*Workspace: {} | Rep: {} | Size: {}*\n\n",
        filter.workspace.as_deref().unwrap_or(ALL),
        filter.rep.as_deref().unwrap_or(ALL),
        filter.size.map_or(ALL, |s| s.label()),
    )
}

/// Escape a value for use inside a Markdown table cell.
fn cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn generate_overall_section(stats: &Statistics) -> String {
    let mut section = String::new();

    section.push_str("## Overall\n\n");
    section.push_str("| Queues | Reps | Main Reps | Mandatory Reps |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        stats.total_queues, stats.total_reps, stats.main_reps, stats.mandatory_reps
    ));

    if !stats.workspaces.is_empty() {
        let names: Vec<&str> = stats.workspaces.iter().map(String::as_str).collect();
        section.push_str(&format!("**Workspaces:** {}\n\n", names.join(", ")));
    }

    section
}

fn generate_queues_section(stats: &Statistics, sort: MemberSort) -> String {
    let mut section = String::new();

    section.push_str("## Queues and Their Reps\n\n");

    if stats.queue_pivot.is_empty() {
        section.push_str("No queues match the current filters.\n\n");
        return section;
    }

    for queue in &stats.queue_pivot {
        match stats.queue_links.get(&queue.queue_id) {
            Some(link) => section.push_str(&format!("### [{}]({})\n\n", queue.name, link)),
            None => section.push_str(&format!("### {}\n\n", queue.name)),
        }
        section.push_str(&format!(
            "*Workspace: {} | Size: {} | Reps: {} | ID: `{}`*\n\n",
            queue.workspace,
            queue.size,
            queue.members.len(),
            queue.queue_id
        ));

        section.push_str("| Rep | Weight | Order | Initial Order | Member ID |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---|\n");
        for member in sort.sorted(&queue.members) {
            section.push_str(&format!(
                "| {} | {} | {} | {} | `{}` |\n",
                cell(&member.name),
                member.weight,
                member.order,
                member.initial_order,
                member.member_id
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_reps_section(stats: &Statistics) -> String {
    let mut section = String::new();

    section.push_str("## Employees and Their Queues\n\n");

    if stats.rep_pivot.is_empty() {
        section.push_str("No reps match the current filters.\n\n");
        return section;
    }

    for (rep, assignments) in stats.reps_by_queue_count() {
        let noun = if assignments.len() == 1 { "queue" } else { "queues" };
        section.push_str(&format!("### {} ({} {})\n\n", rep, assignments.len(), noun));

        section.push_str("| Queue | Weight | Order | Initial Order | Member ID |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---|\n");
        for a in assignments {
            section.push_str(&format!(
                "| {} | {} | {} | {} | `{}` |\n",
                cell(&a.queue_name),
                a.weight,
                a.order,
                a.initial_order,
                a.member_id
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_participation_section(stats: &Statistics) -> String {
    let mut section = String::new();

    section.push_str("## Participation\n\n");

    if stats.participation.is_empty() {
        section.push_str("No participation data.\n\n");
        return section;
    }

    let sales = stats.participation.sales_table(&stats.sales_queues);
    section.push_str("### Sales\n\n");
    section.push_str(&generate_participation_table(&sales));

    let cs = stats.participation.cs_table(&stats.cs_queues, &stats.cs_users);
    section.push_str("### CS\n\n");
    section.push_str(&generate_participation_table(&cs));

    if !stats.cs_users.is_empty() {
        section.push_str("**CS users:** ");
        let users: Vec<&str> = stats.cs_users.iter().map(String::as_str).collect();
        section.push_str(&users.join(", "));
        section.push_str("\n\n");
    }

    section
}

fn generate_participation_table(table: &ParticipationTable) -> String {
    if table.is_empty() {
        return "No participation data.\n\n".to_string();
    }

    let mut out = String::new();

    out.push_str("| Rep |");
    for queue in &table.queues {
        out.push_str(&format!(" {} |", cell(queue)));
    }
    out.push('\n');

    out.push_str("|:---|");
    out.push_str(&":---:|".repeat(table.queues.len()));
    out.push('\n');

    for row in &table.rows {
        out.push_str(&format!("| {} |", cell(&row.rep)));
        for weight in &row.weights {
            out.push_str(&format!(" {} |", weight));
        }
        out.push('\n');
    }
    out.push('\n');

    out
}

fn generate_reps_by_queue_section(stats: &Statistics) -> String {
    let mut section = String::new();

    section.push_str("## Reps by Queue\n\n");

    if stats.reps_by_queue.is_empty() {
        section.push_str("No queues match the current filters.\n\n");
        return section;
    }

    section.push_str("| Queue | Reps |\n");
    section.push_str("|:---|:---:|\n");

    let mut queues: Vec<_> = stats.reps_by_queue.iter().collect();
    queues.sort_by_key(|(_, count)| std::cmp::Reverse(**count));

    for (queue, count) in queues {
        section.push_str(&format!("| {} | {} |\n", cell(queue), count));
    }
    section.push('\n');

    section
}

fn generate_queues_by_size_section(stats: &Statistics) -> String {
    let mut section = String::new();

    section.push_str("## Queues by Size\n\n");

    if stats.queues_by_size.is_empty() {
        section.push_str("No queues match the current filters.\n\n");
        return section;
    }

    section.push_str("| Reps in Queue | Queues |\n");
    section.push_str("|:---:|:---:|\n");
    for (size, count) in &stats.queues_by_size {
        section.push_str(&format!("| {} | {} |\n", size, count));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by queueboard v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    workspace: &'a str,
    rep: &'a str,
    size: &'a str,
    sales_participation: ParticipationTable,
    cs_participation: ParticipationTable,
    statistics: &'a Statistics,
}

/// Generate a JSON report with the statistics and both participation tables.
pub fn generate_json_report(stats: &Statistics, filter: &StatsFilter) -> Result<String> {
    let report = JsonReport {
        workspace: filter.workspace.as_deref().unwrap_or(ALL),
        rep: filter.rep.as_deref().unwrap_or(ALL),
        size: filter.size.map_or(ALL, |s| s.label()),
        sales_participation: stats.participation.sales_table(&stats.sales_queues),
        cs_participation: stats
            .participation
            .cs_table(&stats.cs_queues, &stats.cs_users),
        statistics: stats,
    };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}

/// List the values each stats filter accepts.
pub fn generate_filters_markdown(options: &FilterOptions) -> String {
    let mut output = String::new();

    output.push_str("## Workspaces\n\n");
    push_choices(&mut output, options.workspaces.iter().map(String::as_str));

    output.push_str("## Reps\n\n");
    push_choices(&mut output, options.reps.iter().map(String::as_str));

    output.push_str("## Sizes\n\n");
    push_choices(&mut output, options.sizes.iter().map(SizeBucket::label));

    output
}

fn push_choices<'a>(output: &mut String, choices: impl Iterator<Item = &'a str>) {
    output.push_str(&format!("- {}\n", ALL));
    for choice in choices {
        output.push_str(&format!("- {}\n", choice));
    }
    output.push('\n');
}

/// Render audit rows as a Markdown table, newest first.
pub fn generate_audit_markdown(entries: &[AuditEntry]) -> String {
    let mut output = String::new();

    output.push_str("# Audit Log\n\n");

    if entries.is_empty() {
        output.push_str("No audit entries match the current filters.\n\n");
        output.push_str("Actions: ");
        let labels: Vec<&str> = ActionKind::ALL.iter().map(ActionKind::label).collect();
        output.push_str(&labels.join(", "));
        output.push('\n');
        return output;
    }

    output.push_str("| Timestamp | User | Action | Queue | Rep | Details |\n");
    output.push_str("|:---|:---|:---|:---|:---|:---|\n");
    for entry in entries.iter().rev() {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            entry.formatted_timestamp(),
            cell(&entry.user),
            entry.action,
            cell(&entry.queue),
            cell(&entry.rep),
            cell(&entry.details)
        ));
    }
    output.push_str(&format!("\n*{} entries*\n", entries.len()));

    output
}

pub fn generate_audit_json(entries: &[AuditEntry]) -> Result<String> {
    serde_json::to_string_pretty(entries).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Aggregator;
    use crate::models::{QueuePage, WorkspaceDirectory};
    use chrono::NaiveDateTime;

    fn fixture_stats(filter: &StatsFilter) -> Statistics {
        let page: QueuePage =
            serde_json::from_str(include_str!("../../fixtures/queues.json")).unwrap();
        let workspaces = WorkspaceDirectory::new(
            [("ws-sales", "Sales"), ("ws-cs", "CS")]
                .into_iter()
                .map(|(id, label)| (id.to_string(), label.to_string()))
                .collect(),
        );
        Aggregator::new(workspaces)
            .with_admin_base_url("https://admin.example.com")
            .aggregate(&page.elements, filter)
    }

    #[test]
    fn test_generate_markdown_report_has_every_section() {
        let filter = StatsFilter::default();
        let markdown = generate_markdown_report(
            &fixture_stats(&filter),
            &filter,
            Section::All,
            MemberSort::default(),
        );

        assert!(markdown.contains("# Queue Report"));
        assert!(markdown.contains("*Workspace: All | Rep: All | Size: All*"));
        assert!(markdown.contains("## Overall"));
        assert!(markdown.contains("## Queues and Their Reps"));
        assert!(markdown.contains("## Employees and Their Queues"));
        assert!(markdown.contains("## Participation"));
        assert!(markdown.contains("### Sales"));
        assert!(markdown.contains("### CS"));
        assert!(markdown.contains("## Reps by Queue"));
        assert!(markdown.contains("## Queues by Size"));
        assert!(markdown.contains(
            "### [Mid-Market Inbound](https://admin.example.com/admin-center/meetings/ws-sales/queues/edit/q-mm)"
        ));
        assert!(!markdown.contains("Existing Customer - Owner"));
    }

    #[test]
    fn test_single_section() {
        let filter = StatsFilter::default();
        let markdown =
            generate_markdown_report(
                &fixture_stats(&filter),
                &filter,
                Section::QueuesBySize,
                MemberSort::default(),
            );

        assert!(markdown.contains("## Queues by Size"));
        assert!(!markdown.contains("## Overall"));
        assert!(!markdown.contains("## Participation"));
    }

    #[test]
    fn test_empty_filter_result() {
        let filter = StatsFilter {
            size: Some(SizeBucket::Small),
            ..StatsFilter::default()
        };
        let markdown = generate_markdown_report(
            &fixture_stats(&filter),
            &filter,
            Section::All,
            MemberSort::default(),
        );

        assert!(markdown.contains("Size: 1-50"));
        assert!(markdown.contains("No queues match the current filters."));
        assert!(markdown.contains("No participation data."));
    }

    fn row(name: &str, weight: i64, order: i64) -> MemberRow {
        MemberRow {
            name: name.to_string(),
            weight,
            order,
            initial_order: order,
            member_id: format!("id-{}", name.to_lowercase()),
            queue_id: "q1".to_string(),
        }
    }

    fn names(rows: &[&MemberRow]) -> Vec<String> {
        rows.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_member_sort_keys_and_direction() {
        let members = vec![row("Cy", 20, 0), row("Ada", 50, 2), row("Bo", 20, 1)];

        let by_order = MemberSort::default().sorted(&members);
        assert_eq!(names(&by_order), vec!["Cy", "Bo", "Ada"]);

        let by_name = MemberSort {
            key: SortKey::Name,
            descending: false,
        };
        assert_eq!(names(&by_name.sorted(&members)), vec!["Ada", "Bo", "Cy"]);

        // Equal weights keep pivot order in both directions
        let by_weight = MemberSort {
            key: SortKey::Weight,
            descending: false,
        };
        assert_eq!(names(&by_weight.sorted(&members)), vec!["Cy", "Bo", "Ada"]);
        let by_weight_desc = MemberSort {
            key: SortKey::Weight,
            descending: true,
        };
        assert_eq!(names(&by_weight_desc.sorted(&members)), vec!["Ada", "Cy", "Bo"]);
    }

    #[test]
    fn test_queues_section_applies_sort() {
        let stats = Statistics {
            queue_pivot: vec![crate::analysis::QueueView {
                name: "Inbound".to_string(),
                queue_id: "q1".to_string(),
                workspace: "Sales".to_string(),
                size: SizeBucket::Small,
                members: vec![row("Ada", 50, 0), row("Bo", 20, 1), row("Cy", 30, 2)],
            }],
            queue_links: [("q1".to_string(), "https://admin.example.com/q1".to_string())]
                .into_iter()
                .collect(),
            ..Statistics::default()
        };
        let sort = MemberSort {
            key: SortKey::Name,
            descending: true,
        };
        let out = generate_queues_section(&stats, sort);

        let cy = out.find("| Cy |").unwrap();
        let bo = out.find("| Bo |").unwrap();
        let ada = out.find("| Ada |").unwrap();
        assert!(cy < bo && bo < ada);
        assert!(out.contains("### [Inbound](https://admin.example.com/q1)"));
    }

    #[test]
    fn test_participation_table_layout() {
        let table = ParticipationTable {
            queues: vec!["A".to_string(), "B|C".to_string()],
            rows: vec![crate::analysis::ParticipationRow {
                rep: "Ada".to_string(),
                weights: vec![40, 0],
            }],
        };
        let out = generate_participation_table(&table);

        assert!(out.contains("| Rep | A | B\\|C |"));
        assert!(out.contains("|:---|:---:|:---:|"));
        assert!(out.contains("| Ada | 40 | 0 |"));
    }

    #[test]
    fn test_generate_json_report() {
        let filter = StatsFilter {
            workspace: Some("Sales".to_string()),
            ..StatsFilter::default()
        };
        let json = generate_json_report(&fixture_stats(&filter), &filter).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["workspace"], "Sales");
        assert_eq!(value["size"], "All");
        assert!(value["statistics"]["queue_pivot"].is_array());
        assert!(value["sales_participation"]["queues"].is_array());
    }

    #[test]
    fn test_generate_filters_markdown() {
        let options = FilterOptions {
            workspaces: vec!["CS".to_string(), "Sales".to_string()],
            reps: vec!["Ada".to_string()],
            sizes: vec![SizeBucket::Small, SizeBucket::Unsized],
        };
        let out = generate_filters_markdown(&options);

        assert!(out.contains("## Workspaces\n\n- All\n- CS\n- Sales\n"));
        assert!(out.contains("- Ada"));
        assert!(out.contains("- 1-50\n- No Size\n"));
    }

    #[test]
    fn test_generate_audit_markdown_newest_first() {
        let entry = |at: &str, rep: &str| AuditEntry {
            timestamp: NaiveDateTime::parse_from_str(at, crate::audit::TIMESTAMP_FORMAT).unwrap(),
            user: "ops".to_string(),
            action: ActionKind::WeightUpdate,
            queue: "Inbound".to_string(),
            rep: rep.to_string(),
            details: "Updated weight to 40".to_string(),
        };
        let out = generate_audit_markdown(&[
            entry("2024-05-01 09:00:00", "Ada"),
            entry("2024-05-02 09:00:00", "Bo"),
        ]);

        let ada = out.find("| Ada |").unwrap();
        let bo = out.find("| Bo |").unwrap();
        assert!(bo < ada);
        assert!(out.contains("| 2024-05-02 09:00:00 | ops | Updated weight | Inbound | Bo |"));
        assert!(out.contains("*2 entries*"));

        assert!(generate_audit_markdown(&[]).contains("No audit entries"));
    }
}
