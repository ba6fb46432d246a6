// src/config/validate.rs

use crate::config::model::CommandSequence;
use crate::errors::{Result, SequenceError};

/// Check the structural invariants a sequence must satisfy before it runs.
///
/// - at least one group,
/// - no empty group.
///
/// Action names and step options are checked per step by the dispatcher.
pub fn validate_sequence(sequence: &CommandSequence) -> Result<()> {
    ensure_has_groups(sequence)?;
    ensure_groups_have_steps(sequence)?;
    Ok(())
}

fn ensure_has_groups(sequence: &CommandSequence) -> Result<()> {
    if sequence.groups.is_empty() {
        return Err(SequenceError::NoGroups {
            sequence: sequence.name.clone(),
        });
    }
    Ok(())
}

fn ensure_groups_have_steps(sequence: &CommandSequence) -> Result<()> {
    match sequence.groups.iter().find(|g| g.steps.is_empty()) {
        Some(group) => Err(SequenceError::EmptyGroup {
            group: group.name.clone(),
        }),
        None => Ok(()),
    }
}
