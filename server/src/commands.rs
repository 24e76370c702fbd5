//! Resource and feedback operations.
//!
//! Each operation validates its input before touching the stores, then runs a
//! single load / mutate / save cycle on one collection.
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{Feedback, Resource, ResourceFilter};
use crate::state::AppState;
use crate::validation::{validate_feedback_text, validate_resource_payload};

pub fn list_resources(
    state: &AppState,
    filter: &ResourceFilter,
) -> Result<Vec<Resource>, AppError> {
    let resources = state.resources.read()?;

    Ok(resources.into_iter().filter(|r| filter.matches(r)).collect())
}

pub fn get_resource(state: &AppState, id: &str) -> Result<Resource, AppError> {
    state
        .resources
        .read()?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| resource_not_found(id))
}

pub fn create_resource(
    state: &AppState,
    payload: Map<String, Value>,
) -> Result<Resource, AppError> {
    validate_resource_payload(&payload)?;
    let resource = Resource::from_payload(payload).map_err(invalid_resource)?;

    let created = resource.clone();
    state.resources.modify(|resources| {
        resources.push(resource);
        Ok::<_, AppError>(())
    })?;

    info!("Created resource {}", created.id);
    Ok(created)
}

pub fn update_resource(
    state: &AppState,
    id: &str,
    patch: Map<String, Value>,
) -> Result<Resource, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation(
            "No data provided for the update.".to_string(),
        ));
    }

    let updated = state.resources.modify(|resources| {
        let index = resources
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| resource_not_found(id))?;

        let merged = resources[index].merged(patch).map_err(invalid_resource)?;
        ensure_resource_invariants(&merged)?;

        resources[index] = merged.clone();
        Ok::<_, AppError>(merged)
    })?;

    info!("Updated resource {id}");
    Ok(updated)
}

pub fn delete_resource(state: &AppState, id: &str) -> Result<(), AppError> {
    state.resources.modify(|resources| {
        let index = resources
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| resource_not_found(id))?;

        resources.remove(index);
        Ok::<_, AppError>(())
    })?;

    info!("Deleted resource {id}");
    Ok(())
}

/// The parent resource is not looked up: feedback may reference any id.
pub fn create_feedback(
    state: &AppState,
    resource_id: &str,
    feedback_text: Option<&str>,
    user_id: Option<String>,
) -> Result<Feedback, AppError> {
    let text = validate_feedback_text(feedback_text)?;
    let feedback = Feedback::new(resource_id.to_string(), text, user_id);

    let created = feedback.clone();
    state.feedback.modify(|entries| {
        entries.push(feedback);
        Ok::<_, AppError>(())
    })?;

    debug!("Created feedback {} for resource {resource_id}", created.id);
    Ok(created)
}

pub fn update_feedback(
    state: &AppState,
    resource_id: &str,
    feedback_id: &str,
    feedback_text: Option<&str>,
) -> Result<Feedback, AppError> {
    let text = validate_feedback_text(feedback_text)?;

    state.feedback.modify(|entries| {
        let entry = entries
            .iter_mut()
            .find(|f| f.belongs_to(resource_id, feedback_id))
            .ok_or_else(|| feedback_not_found(resource_id, feedback_id))?;

        entry.revise(text);
        Ok(entry.clone())
    })
}

pub fn delete_feedback(
    state: &AppState,
    resource_id: &str,
    feedback_id: &str,
) -> Result<(), AppError> {
    state.feedback.modify(|entries| {
        let before = entries.len();
        entries.retain(|f| !f.belongs_to(resource_id, feedback_id));

        if entries.len() == before {
            return Err(feedback_not_found(resource_id, feedback_id));
        }
        Ok(())
    })?;

    debug!("Deleted feedback {feedback_id} for resource {resource_id}");
    Ok(())
}

fn ensure_resource_invariants(resource: &Resource) -> Result<(), AppError> {
    if resource.id.is_empty() || resource.title.is_empty() || resource.kind.is_empty() {
        return Err(AppError::Validation(
            "Resource id, title and type must not be empty.".to_string(),
        ));
    }
    Ok(())
}

fn invalid_resource(e: serde_json::Error) -> AppError {
    AppError::Validation(format!("Invalid resource: {e}"))
}

fn resource_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Resource with ID {id} not found."))
}

fn feedback_not_found(resource_id: &str, feedback_id: &str) -> AppError {
    AppError::NotFound(format!(
        "Feedback with ID {feedback_id} for resource {resource_id} not found."
    ))
}
