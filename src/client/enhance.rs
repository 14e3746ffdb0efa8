use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::Notifier;
use super::api::PlannerApi;
use super::draft::DraftStore;
use super::form::ProjectForm;
use crate::errors::ClientError;
use crate::models::Enhancement;

/// Shortest idea, in characters after trimming, worth sending for enhancement.
pub const MIN_IDEA_LENGTH: usize = 10;

/// Requests an AI rewrite of a project idea. At most one request is in flight
/// per enhancer (and its clones).
#[derive(Clone)]
pub struct IdeaEnhancer {
    api: Arc<dyn PlannerApi>,
    notifier: Arc<dyn Notifier>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the request ends, including on cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl IdeaEnhancer {
    pub fn new(api: Arc<dyn PlannerApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn enhance(&self, description: &str) -> Result<Enhancement, ClientError> {
        let idea = description.trim();
        let actual = idea.chars().count();
        if actual < MIN_IDEA_LENGTH {
            return Err(ClientError::InputTooShort {
                min: MIN_IDEA_LENGTH,
                actual,
            });
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Enhancement already in flight");
            return Err(ClientError::EnhanceInFlight);
        }
        let _guard = InFlight(&self.in_flight);

        match self.api.enhance_idea(idea).await {
            Ok(enhancement) => {
                tracing::info!(
                    features = enhancement.suggested_features.len(),
                    "Received enhanced idea"
                );
                Ok(enhancement)
            }
            Err(e) => {
                tracing::error!(error = %e, "Idea enhancement failed");
                self.notifier
                    .alert(&format!("Failed to enhance idea: {}", e.user_message()));
                Err(e)
            }
        }
    }

    /// Replace the form's description with the enhanced one and save the draft.
    pub fn accept(
        &self,
        enhancement: Enhancement,
        form: &mut ProjectForm,
        drafts: &DraftStore,
    ) -> Result<(), ClientError> {
        form.description = enhancement.enhanced_description;
        drafts.save(form).map_err(ClientError::Storage)
    }

    /// Drop a suggestion, leaving the form as it was.
    pub fn discard(&self, enhancement: Enhancement) {
        tracing::debug!(
            features = enhancement.suggested_features.len(),
            "Discarded enhanced idea"
        );
    }
}
