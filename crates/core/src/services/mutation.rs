//! Poll mutation engine.
//!
//! An update is planned first, against a snapshot of the poll, its options and
//! their live ballot counts. Planning is pure: it walks removals, renames,
//! additions and scalar fields in that order, each step seeing the effects of
//! the previous one, and fails before anything is written. Only a complete
//! plan is applied, in one transaction together with its history entries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use quickpoll_common::{AppError, AppResult, IdGenerator};
use quickpoll_db::{
    entities::{poll, poll_edit_history, poll_option},
    repositories::{
        IndividualVoteRepository, PollEditHistoryRepository, PollOptionRepository, PollRepository,
    },
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use validator::Validate;

use super::capability;
use super::poll::{PollWithOptions, ensure_not_blank, new_option_models, validate_option_text};

/// Input for changing an option's text.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionTextUpdate {
    /// Option to rename.
    pub id: String,
    /// New text.
    pub text: String,
}

/// Input for updating a poll.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePollInput {
    /// Secret proving edit rights.
    pub modification_code: String,
    /// New question.
    #[validate(length(min = 1, max = 500))]
    pub question: Option<String>,
    /// New listing visibility.
    pub is_public: Option<bool>,
    /// New multi-select setting.
    pub allow_multiple_selections: Option<bool>,
    /// Texts of options to append.
    #[serde(default)]
    pub options_to_add: Vec<String>,
    /// Option texts to replace.
    #[serde(default)]
    pub options_to_update: Vec<OptionTextUpdate>,
    /// Options to delete; each must have no ballots.
    #[serde(default)]
    pub option_ids_to_remove: Vec<String>,
}

impl UpdatePollInput {
    fn validate_texts(&self) -> AppResult<()> {
        if let Some(question) = &self.question {
            ensure_not_blank("question", question)?;
        }
        for text in &self.options_to_add {
            validate_option_text(text)?;
        }
        for update in &self.options_to_update {
            validate_option_text(&update.text)?;
        }
        Ok(())
    }
}

/// Aspect of a poll recorded in its edit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryField {
    /// Question text.
    Question,
    /// Listing visibility.
    IsPublic,
    /// Multi-select setting.
    AllowMultipleSelections,
    /// An option was renamed.
    OptionTextUpdated,
    /// An option was added.
    OptionAdded,
    /// An option was removed.
    OptionRemoved,
}

impl HistoryField {
    /// Tag stored in `field_changed`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::IsPublic => "is_public",
            Self::AllowMultipleSelections => "allow_multiple_selections",
            Self::OptionTextUpdated => "option_text_updated",
            Self::OptionAdded => "option_added",
            Self::OptionRemoved => "option_removed",
        }
    }
}

/// What a poll looked like when the update started.
#[derive(Debug, Clone, Copy)]
pub struct PollSnapshot<'a> {
    /// The locked poll row.
    pub poll: &'a poll::Model,
    /// Its options in creation order.
    pub options: &'a [poll_option::Model],
    /// Live ballots per option ID; options without ballots may be absent.
    pub ballot_counts: &'a HashMap<String, u64>,
}

/// An option that will be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRemoval {
    /// Option being removed.
    pub option_id: String,
    /// Text of the removed option.
    pub text: String,
}

/// An option whose text will change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRename {
    /// Option being renamed.
    pub option_id: String,
    /// Text before the rename.
    pub old_text: String,
    /// Text after the rename.
    pub new_text: String,
}

/// A scalar field moving from one value to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange<T> {
    /// Stored value.
    pub old: T,
    /// Requested value.
    pub new: T,
}

/// Effective changes of an update, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Options to delete.
    pub removals: Vec<OptionRemoval>,
    /// Options whose text changes.
    pub renames: Vec<OptionRename>,
    /// Texts of new options.
    pub additions: Vec<String>,
    /// Question change.
    pub question: Option<FieldChange<String>>,
    /// Visibility change.
    pub is_public: Option<FieldChange<bool>>,
    /// Multi-select change.
    pub allow_multiple_selections: Option<FieldChange<bool>>,
}

/// A history row before it is stamped with a poll and a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDraft {
    /// Changed aspect.
    pub field: HistoryField,
    /// Affected option, if it still exists.
    pub option_id: Option<String>,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change.
    pub new_value: Option<String>,
    /// Human-readable summary.
    pub description: Option<String>,
}

impl UpdatePlan {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
            && self.renames.is_empty()
            && self.additions.is_empty()
            && self.question.is_none()
            && self.is_public.is_none()
            && self.allow_multiple_selections.is_none()
    }

    /// History entries for this plan, one per effective change.
    ///
    /// `added_ids` are the IDs assigned to `additions`, index for index.
    /// Removed options are referenced by description only since their rows
    /// are gone once the plan is applied.
    #[must_use]
    pub fn history(&self, added_ids: &[String]) -> Vec<HistoryDraft> {
        let removals = self.removals.iter().map(|removal| HistoryDraft {
            field: HistoryField::OptionRemoved,
            option_id: None,
            old_value: Some(removal.text.clone()),
            new_value: None,
            description: Some(format!(
                "Option '{}' (ID: {}) removed.",
                removal.text, removal.option_id
            )),
        });

        let renames = self.renames.iter().map(|rename| HistoryDraft {
            field: HistoryField::OptionTextUpdated,
            option_id: Some(rename.option_id.clone()),
            old_value: Some(rename.old_text.clone()),
            new_value: Some(rename.new_text.clone()),
            description: None,
        });

        let additions = self
            .additions
            .iter()
            .zip(added_ids)
            .map(|(text, id)| HistoryDraft {
                field: HistoryField::OptionAdded,
                option_id: Some(id.clone()),
                old_value: None,
                new_value: Some(text.clone()),
                description: Some(format!("Option '{text}' added.")),
            });

        let scalars = [
            self.question
                .as_ref()
                .map(|c| scalar_draft(HistoryField::Question, &c.old, &c.new)),
            self.is_public
                .as_ref()
                .map(|c| scalar_draft(HistoryField::IsPublic, &c.old, &c.new)),
            self.allow_multiple_selections
                .as_ref()
                .map(|c| scalar_draft(HistoryField::AllowMultipleSelections, &c.old, &c.new)),
        ];

        removals
            .chain(renames)
            .chain(additions)
            .chain(scalars.into_iter().flatten())
            .collect()
    }
}

fn scalar_draft<T: ToString>(field: HistoryField, old: &T, new: &T) -> HistoryDraft {
    HistoryDraft {
        field,
        option_id: None,
        old_value: Some(old.to_string()),
        new_value: Some(new.to_string()),
        description: None,
    }
}

/// Plan an update against a snapshot.
///
/// Errors, in the order the steps run:
/// - removing an unknown option is `InvalidRequest`, removing an option with
///   live ballots is `UpdateNotAllowed`;
/// - renaming an unknown (or just removed) option is `InvalidRequest`, taking
///   another surviving option's text in any case is `DuplicateOptionText`;
/// - adding a text already present in any case is `DuplicateOptionText`;
/// - ending with fewer than two options is `UpdateNotAllowed`, with more than
///   `max_options` it is `InvalidRequest`.
pub fn plan_update(
    snapshot: PollSnapshot<'_>,
    input: &UpdatePollInput,
    max_options: usize,
) -> AppResult<UpdatePlan> {
    let mut plan = UpdatePlan::default();
    let mut working: Vec<(String, String)> = snapshot
        .options
        .iter()
        .map(|o| (o.id.clone(), o.text.clone()))
        .collect();

    for option_id in &input.option_ids_to_remove {
        let Some(pos) = working.iter().position(|(id, _)| id == option_id) else {
            return Err(AppError::InvalidRequest(format!(
                "Option ID {option_id} to remove not found in this poll."
            )));
        };

        if snapshot.ballot_counts.get(option_id).copied().unwrap_or(0) > 0 {
            return Err(AppError::UpdateNotAllowed(format!(
                "Cannot remove option ID {option_id} ('{}') as it has votes.",
                working[pos].1
            )));
        }

        let (option_id, text) = working.remove(pos);
        plan.removals.push(OptionRemoval { option_id, text });
    }

    for update in &input.options_to_update {
        let Some(pos) = working.iter().position(|(id, _)| *id == update.id) else {
            return Err(AppError::InvalidRequest(format!(
                "Option ID {} to update not found in this poll.",
                update.id
            )));
        };

        if working[pos].1 == update.text {
            continue;
        }

        let lowered = update.text.to_lowercase();
        let collides = working
            .iter()
            .enumerate()
            .any(|(i, (_, text))| i != pos && text.to_lowercase() == lowered);
        if collides {
            return Err(AppError::DuplicateOptionText(update.text.clone()));
        }

        let old_text = std::mem::replace(&mut working[pos].1, update.text.clone());
        plan.renames.push(OptionRename {
            option_id: update.id.clone(),
            old_text,
            new_text: update.text.clone(),
        });
    }

    let mut taken: HashSet<String> = working.iter().map(|(_, t)| t.to_lowercase()).collect();
    for text in &input.options_to_add {
        if !taken.insert(text.to_lowercase()) {
            return Err(AppError::DuplicateOptionText(text.clone()));
        }
        plan.additions.push(text.clone());
    }

    let remaining = working.len() + plan.additions.len();
    if remaining < 2 {
        return Err(AppError::UpdateNotAllowed(format!(
            "A poll needs at least 2 options; this update would leave {remaining}."
        )));
    }
    if remaining > max_options {
        return Err(AppError::InvalidRequest(format!(
            "A poll can have at most {max_options} options; this update would leave {remaining}."
        )));
    }

    let poll = snapshot.poll;
    plan.question = input
        .question
        .as_ref()
        .filter(|q| **q != poll.question)
        .map(|q| FieldChange {
            old: poll.question.clone(),
            new: q.clone(),
        });
    plan.is_public = input
        .is_public
        .filter(|v| *v != poll.is_public)
        .map(|v| FieldChange {
            old: poll.is_public,
            new: v,
        });
    plan.allow_multiple_selections = input
        .allow_multiple_selections
        .filter(|v| *v != poll.allow_multiple_selections)
        .map(|v| FieldChange {
            old: poll.allow_multiple_selections,
            new: v,
        });

    Ok(plan)
}

/// Applies validated updates to polls.
#[derive(Clone)]
pub struct PollMutationService {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
    max_options: usize,
}

impl PollMutationService {
    /// Create a new mutation service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, id_gen: IdGenerator, max_options: usize) -> Self {
        Self {
            db,
            id_gen,
            max_options,
        }
    }

    /// Update a poll on behalf of the holder of its modification code.
    ///
    /// The poll row stays exclusively locked until commit, so no ballot can
    /// land on an option between its zero-ballot check and its removal.
    pub async fn update_poll(
        &self,
        poll_id: &str,
        input: UpdatePollInput,
    ) -> AppResult<PollWithOptions> {
        input.validate()?;
        input.validate_texts()?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        let poll_repo = PollRepository::new(&txn);
        let poll = poll_repo.get_for_update(poll_id).await?;
        capability::authorize(&poll, &input.modification_code)?;

        let option_repo = PollOptionRepository::new(&txn);
        let options = option_repo.find_by_poll(poll_id).await?;
        let ballot_counts = IndividualVoteRepository::new(&txn)
            .count_by_option(poll_id)
            .await?;

        let snapshot = PollSnapshot {
            poll: &poll,
            options: &options,
            ballot_counts: &ballot_counts,
        };
        let plan = match plan_update(snapshot, &input, self.max_options) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(poll_id = poll_id, error = %e, "Poll update rejected");
                return Err(e);
            }
        };

        if plan.is_empty() {
            txn.commit()
                .await
                .map_err(|e| AppError::Persistence(e.to_string()))?;
            tracing::info!(poll_id = poll_id, "Poll update made no effective changes");
            return Ok(PollWithOptions { poll, options });
        }

        let now = Utc::now();

        for removal in &plan.removals {
            option_repo.delete(&removal.option_id).await?;
        }
        for rename in &plan.renames {
            option_repo.update_text(&rename.option_id, &rename.new_text).await?;
        }

        let added_ids: Vec<String> = plan.additions.iter().map(|_| self.id_gen.generate()).collect();
        option_repo
            .insert_many(new_option_models(poll_id, &added_ids, &plan.additions, now))
            .await?;

        let mut active: poll::ActiveModel = poll.into();
        if let Some(change) = &plan.question {
            active.question = Set(change.new.clone());
        }
        if let Some(change) = &plan.is_public {
            active.is_public = Set(change.new);
        }
        if let Some(change) = &plan.allow_multiple_selections {
            active.allow_multiple_selections = Set(change.new);
        }
        active.updated_at = Set(now.into());
        let poll = poll_repo.update(active).await?;

        let history: Vec<poll_edit_history::ActiveModel> = plan
            .history(&added_ids)
            .into_iter()
            .map(|draft| poll_edit_history::ActiveModel {
                poll_id: Set(poll_id.to_string()),
                edited_at: Set(now.into()),
                field_changed: Set(draft.field.as_str().to_string()),
                option_id_changed: Set(draft.option_id),
                old_value: Set(draft.old_value),
                new_value: Set(draft.new_value),
                change_description: Set(draft.description),
                ..Default::default()
            })
            .collect();
        let entries = history.len();
        PollEditHistoryRepository::new(&txn)
            .insert_many(history)
            .await?;

        let options = option_repo.find_by_poll(poll_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        tracing::info!(poll_id = poll_id, history_entries = entries, "Poll updated");

        Ok(PollWithOptions { poll, options })
    }
}
