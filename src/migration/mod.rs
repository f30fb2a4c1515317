//! Registered feature migrations.
//!
//! Each entry names the SQL files it applies, in order. The files under `sql/`
//! are compiled into the binary, so the catalog works from any working
//! directory; a SQL directory given in the configuration replaces them.
//! Summaries are operator notes printed after a successful run.

use std::path::Path;

use crate::error::{MigrateError, MigrateResult};
use crate::models::{MigrationDef, MigrationPlan};

/// Bootstrap definition of the `exec_sql` procedure. Applied by hand, since
/// the runner needs the procedure to exist.
pub const EXEC_SQL_BOOTSTRAP: &str = "000_exec_sql_function.sql";

/// Catalog name of the bootstrap, for `show`.
pub const EXEC_SQL_BOOTSTRAP_NAME: &str = "exec-sql";

/// SQL files compiled into the binary, by file name.
const BUNDLED: &[(&str, &str)] = &[
    (
        EXEC_SQL_BOOTSTRAP,
        include_str!("../../sql/000_exec_sql_function.sql"),
    ),
    (
        "001_feedback_queue.sql",
        include_str!("../../sql/001_feedback_queue.sql"),
    ),
    (
        "002_approval_workflows.sql",
        include_str!("../../sql/002_approval_workflows.sql"),
    ),
    (
        "003_hr_management.sql",
        include_str!("../../sql/003_hr_management.sql"),
    ),
    (
        "004_recurring_billing.sql",
        include_str!("../../sql/004_recurring_billing.sql"),
    ),
    (
        "005_workflow_builder.sql",
        include_str!("../../sql/005_workflow_builder.sql"),
    ),
    (
        "006a_drop_ticket_timeline_trigger.sql",
        include_str!("../../sql/006a_drop_ticket_timeline_trigger.sql"),
    ),
    (
        "006b_ticket_timeline.sql",
        include_str!("../../sql/006b_ticket_timeline.sql"),
    ),
];

/// Bundled text of a catalog SQL file.
pub fn bundled_sql(file_name: &str) -> Option<&'static str> {
    BUNDLED
        .iter()
        .find(|(name, _)| *name == file_name)
        .map(|(_, sql)| *sql)
}

const MIGRATIONS: &[MigrationDef] = &[
    MigrationDef {
        name: EXEC_SQL_BOOTSTRAP_NAME,
        title: "exec_sql procedure",
        steps: &[EXEC_SQL_BOOTSTRAP],
        summary: &["exec_sql(sql text): runs migration SQL, granted to service_role only"],
    },
    MigrationDef {
        name: "feedback-queue",
        title: "Feedback queue",
        steps: &["001_feedback_queue.sql"],
        summary: &[
            "feedback_items: submissions with status, priority and assignee",
            "feedback_comments: threaded replies on feedback items",
            "updated_at trigger on feedback_items",
        ],
    },
    MigrationDef {
        name: "approval-workflows",
        title: "Approval workflows",
        steps: &["002_approval_workflows.sql"],
        summary: &[
            "approval_requests: requests awaiting a decision",
            "approval_steps: ordered approvers per request",
            "advance_approval(): moves a request to its next step",
        ],
    },
    MigrationDef {
        name: "hr-management",
        title: "HR management",
        steps: &["003_hr_management.sql"],
        summary: &[
            "departments, employees",
            "leave_requests with approval status",
            "RLS policies restricting employees to their own leave requests",
        ],
    },
    MigrationDef {
        name: "recurring-billing",
        title: "Recurring billing",
        steps: &["004_recurring_billing.sql"],
        summary: &[
            "billing_plans, subscriptions",
            "recurring_invoices with next_run_at scheduling",
            "schedule_next_invoice(): advances next_run_at by the plan interval",
        ],
    },
    MigrationDef {
        name: "workflow-builder",
        title: "Workflow builder",
        steps: &["005_workflow_builder.sql"],
        summary: &[
            "workflows, workflow_nodes, workflow_edges",
            "workflow_runs: execution history per workflow",
        ],
    },
    MigrationDef {
        name: "ticket-timeline",
        title: "Ticket timeline",
        steps: &[
            "006a_drop_ticket_timeline_trigger.sql",
            "006b_ticket_timeline.sql",
        ],
        summary: &[
            "ticket_events: timeline entries for ticket changes",
            "log_ticket_event(): records status and assignee changes",
            "ticket_timeline_trigger on tickets",
        ],
    },
];

/// The migration registration list.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    entries: &'static [MigrationDef],
}

impl Catalog {
    /// Migrations shipped with this tool.
    pub fn builtin() -> Self {
        Self {
            entries: MIGRATIONS,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static MigrationDef> {
        self.entries.iter()
    }

    /// Look up a migration by name.
    pub fn find(&self, name: &str) -> MigrateResult<&'static MigrationDef> {
        let wanted = name.trim().to_lowercase().replace('_', "-");
        self.entries
            .iter()
            .find(|def| def.name == wanted)
            .ok_or_else(|| MigrateError::UnknownMigration(name.to_string()))
    }

    /// Look up a migration and resolve its files against `sql_dir`, or leave
    /// them as bundled file names.
    pub fn plan(&self, name: &str, sql_dir: Option<&Path>) -> MigrateResult<MigrationPlan> {
        self.find(name)
            .map(|def| MigrationPlan::from_def(def, sql_dir))
    }
}
