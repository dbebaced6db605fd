/// Column schema normalization
///
/// Brings a workflow's data table into canonical shape: the legacy
/// `dataColumns` list is folded into `table`, and every column ends up with a
/// non-empty `id`. Both steps are idempotent.

use crate::workflow::types::Workflow;

/// Normalize the column schema of a candidate workflow
///
/// A non-empty `data_columns` replaces `table` outright and is then cleared.
/// Columns without an id get their name as id. Never fails.
pub fn normalize_columns(mut workflow: Workflow) -> Workflow {
    if !workflow.data_columns.is_empty() {
        tracing::debug!(
            workflow_id = %workflow.id,
            columns = workflow.data_columns.len(),
            "Migrating legacy dataColumns into table"
        );
        workflow.table = std::mem::take(&mut workflow.data_columns);
    }

    for column in workflow.table.iter_mut().filter(|column| column.id.is_empty()) {
        column.id = column.name.clone();
    }

    workflow
}
