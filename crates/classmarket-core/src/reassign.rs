//! Class reassignment - retire one class and collapse every dependent
//! onto a freshly created replacement
//!
//! Fixed sequence, each step's postcondition a precondition for the next:
//! delete the source classes by name, create the destination class, then
//! blanket-repoint students, teachers, products and purchases (in that
//! order) onto the new class id.
//!
//! There is no rollback. Every completed step is recorded in a journal;
//! on a partial failure the journal is emitted as structured warnings so
//! an operator can manually complete or revert, and already-repointed
//! collections stay repointed.

use anyhow::{Context, Result};
use classmarket_state::{ClassRecord, Dependent, Match, StoreHandle};
use tracing::{info, warn};

/// Parameters for one reassignment run
#[derive(Debug, Clone)]
pub struct ReassignSpec {
    /// Name of the class(es) to retire; not guaranteed unique
    pub source_name: String,
    /// Name of the replacement class to create
    pub target_name: String,
    /// Description for the replacement class
    pub target_description: String,
}

impl ReassignSpec {
    /// Build a spec; a missing description falls back to the target name
    pub fn new(source_name: &str, target_name: &str, description: Option<&str>) -> Self {
        ReassignSpec {
            source_name: source_name.to_string(),
            target_name: target_name.to_string(),
            target_description: description.unwrap_or(target_name).to_string(),
        }
    }
}

/// One completed step of the procedure
#[derive(Debug, Clone)]
pub enum ReassignStep {
    SourceClassesDeleted { name: String, count: u64 },
    TargetClassCreated { id: String, name: String },
    DependentsRepointed { collection: Dependent, count: u64 },
}

impl std::fmt::Display for ReassignStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReassignStep::SourceClassesDeleted { name, count } => {
                write!(f, "deleted {} class(es) named '{}'", count, name)
            }
            ReassignStep::TargetClassCreated { id, name } => {
                write!(f, "created class '{}' (id: {})", name, id)
            }
            ReassignStep::DependentsRepointed { collection, count } => {
                write!(f, "repointed {} {}", count, collection.label().to_lowercase())
            }
        }
    }
}

/// Compensating-action log of completed steps
///
/// The store offers no multi-collection transaction here, so this journal
/// is the partial-failure record: what it lists has happened and will not
/// be undone.
#[derive(Debug, Default)]
pub struct ReassignJournal {
    steps: Vec<ReassignStep>,
}

impl ReassignJournal {
    fn record(&mut self, step: ReassignStep) {
        info!(step = %step, "reassignment step completed");
        self.steps.push(step);
    }

    /// Steps completed so far, in execution order
    pub fn steps(&self) -> &[ReassignStep] {
        &self.steps
    }

    fn emit_partial_failure(&self, error: &anyhow::Error) {
        warn!(
            completed_steps = self.steps.len(),
            error = %error,
            "reassignment aborted; store may be partially repointed"
        );
        for step in &self.steps {
            warn!(step = %step, "already applied, not rolled back");
        }
    }
}

/// Result of a fully successful reassignment
#[derive(Debug)]
pub struct ReassignOutcome {
    /// How many source classes were deleted (zero is legal)
    pub deleted_classes: u64,
    /// The freshly created destination class, id assigned
    pub target: ClassRecord,
    /// Modified count per dependent collection, in execution order
    pub repointed: Vec<(Dependent, u64)>,
    /// Journal of every completed step, in execution order
    pub journal: ReassignJournal,
}

impl ReassignOutcome {
    /// Render the outcome as line-oriented text
    pub fn render(&self, spec: &ReassignSpec) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Deleted {} class(es) named '{}'\n",
            self.deleted_classes, spec.source_name
        ));
        let id = self
            .target
            .id
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "Created class '{}' (id: {})\n",
            self.target.name, id
        ));
        for (collection, count) in &self.repointed {
            out.push_str(&format!("{} repointed: {}\n", collection.label(), count));
        }
        out.push_str("Reassignment complete\n");
        out
    }
}

/// Run the retire-and-repoint sequence
///
/// Every fallible operation is attempted exactly once; the first error
/// aborts the run after emitting the journal of completed steps.
pub async fn run_reassignment(
    handle: &StoreHandle,
    spec: &ReassignSpec,
) -> Result<ReassignOutcome> {
    info!(
        source = %spec.source_name,
        target = %spec.target_name,
        "starting class reassignment"
    );

    let mut journal = ReassignJournal::default();
    match execute(handle, spec, &mut journal).await {
        Ok((deleted_classes, target, repointed)) => Ok(ReassignOutcome {
            deleted_classes,
            target,
            repointed,
            journal,
        }),
        Err(error) => {
            journal.emit_partial_failure(&error);
            Err(error)
        }
    }
}

async fn execute(
    handle: &StoreHandle,
    spec: &ReassignSpec,
    journal: &mut ReassignJournal,
) -> Result<(u64, ClassRecord, Vec<(Dependent, u64)>)> {
    // Step 1: retire the source classes. Name match may hit zero or
    // several records.
    let deleted_classes = handle
        .delete_classes(&Match::NameEquals(spec.source_name.clone()))
        .await
        .with_context(|| format!("failed to delete classes named '{}'", spec.source_name))?;
    journal.record(ReassignStep::SourceClassesDeleted {
        name: spec.source_name.clone(),
        count: deleted_classes,
    });

    // Step 2: create the destination and capture its assigned id.
    let target = handle
        .insert_class(ClassRecord::new(
            &spec.target_name,
            &spec.target_description,
        ))
        .await
        .with_context(|| format!("failed to create class '{}'", spec.target_name))?;
    let target_id = target
        .id
        .clone()
        .context("store did not assign an id to the new class")?;
    journal.record(ReassignStep::TargetClassCreated {
        id: target_id.to_string(),
        name: target.name.clone(),
    });

    // Step 3: blanket repoint, fixed order. The match-all predicate is
    // deliberate and explicit.
    let mut repointed = Vec::with_capacity(Dependent::ALL.len());
    for collection in Dependent::ALL {
        let count = handle
            .repoint_class_refs(collection, &Match::All, &target_id)
            .await
            .with_context(|| format!("failed to repoint {}", collection.label()))?;
        journal.record(ReassignStep::DependentsRepointed { collection, count });
        repointed.push((collection, count));
    }

    // Step 4: overall success.
    info!(target = %target_id, "class reassignment complete");

    Ok((deleted_classes, target, repointed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_keeps_steps_in_execution_order() {
        let mut journal = ReassignJournal::default();
        journal.record(ReassignStep::SourceClassesDeleted {
            name: "A".to_string(),
            count: 2,
        });
        journal.record(ReassignStep::DependentsRepointed {
            collection: Dependent::Students,
            count: 3,
        });

        let steps = journal.steps();
        assert_eq!(steps.len(), 2);
        assert!(matches!(
            steps[0],
            ReassignStep::SourceClassesDeleted { count: 2, .. }
        ));
        assert!(matches!(
            steps[1],
            ReassignStep::DependentsRepointed {
                collection: Dependent::Students,
                count: 3,
            }
        ));

        // Emitting the partial-failure warnings consumes nothing.
        journal.emit_partial_failure(&anyhow::anyhow!("store went away"));
        assert_eq!(journal.steps().len(), 2);
    }

    #[test]
    fn test_step_display_names_the_action() {
        let step = ReassignStep::SourceClassesDeleted {
            name: "A".to_string(),
            count: 2,
        };
        assert_eq!(step.to_string(), "deleted 2 class(es) named 'A'");

        let step = ReassignStep::DependentsRepointed {
            collection: Dependent::Purchases,
            count: 3,
        };
        assert_eq!(step.to_string(), "repointed 3 purchases");
    }
}
