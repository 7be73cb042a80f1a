use serde::Serialize;

use crate::error::AutomationError;
use crate::schema::field_model::{FieldSchema, SchemaPage};
use crate::translate::assignment::Assignment;

/// Assignments of one form page, in the order they are applied.
#[derive(Debug, Clone, Serialize)]
pub struct PageStep<'a> {
    pub page: &'a SchemaPage,
    pub assignments: Vec<&'a Assignment>,
}

/// Every page of the schema in order, each with its assignments.
///
/// Pages without assignments are still visited: the form only renders
/// when every tab has been opened.
#[derive(Debug, Clone, Serialize)]
pub struct FillPlan<'a> {
    pub steps: Vec<PageStep<'a>>,
}

impl<'a> FillPlan<'a> {
    pub fn build(schema: &'a FieldSchema, assignments: &'a [Assignment]) -> Result<Self, AutomationError> {
        let mut steps: Vec<PageStep<'a>> = schema
            .pages
            .iter()
            .map(|page| PageStep {
                page,
                assignments: Vec::new(),
            })
            .collect();

        for assignment in assignments {
            let step = steps.get_mut(assignment.page()).ok_or_else(|| {
                AutomationError::PageUnavailable {
                    page: format!("#{} (for '{}')", assignment.page(), assignment.key()),
                }
            })?;
            step.assignments.push(assignment);
        }

        Ok(FillPlan { steps })
    }

    pub fn assignment_count(&self) -> usize {
        self.steps.iter().map(|s| s.assignments.len()).sum()
    }
}
