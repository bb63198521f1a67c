//! Conditional visibility
//!
//! Per-session state machine driven by value-change events. Every field
//! starts visible, conditional ones included; only a matching `hide` rule
//! hides a field and only a matching `show` rule reveals it again. Changing a
//! dropdown away from a value never undoes what that value's rules did.
//!
//! When several dropdowns target the same field the last processed event
//! wins. Such overrides are reported as [`VisibilityConflict`] but never
//! reconciled.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::aggregates::FormSchema;
use crate::domain::value_objects::{AnswerValue, Answers, ConditionAction, FieldKind};

/// Which fields are currently shown, keyed by field id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibilityState(BTreeMap<String, bool>);

impl VisibilityState {
    /// Initial state: every field of the schema visible
    pub fn all_visible(schema: &FormSchema) -> Self {
        Self(schema.fields().iter().map(|f| (f.id.clone(), true)).collect())
    }

    /// Fields the state has never heard of count as visible
    pub fn is_visible(&self, field_id: &str) -> bool {
        self.0.get(field_id).copied().unwrap_or(true)
    }

    pub fn set(&mut self, field_id: impl Into<String>, visible: bool) {
        self.0.insert(field_id.into(), visible);
    }

    pub fn hidden_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, v)| !**v).map(|(k, _)| k.as_str())
    }

    pub fn visible_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }
}

/// A respondent changed one field's value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldChange {
    pub field_id: String,
    pub value: AnswerValue,
}

impl FieldChange {
    pub fn new(field_id: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        Self { field_id: field_id.into(), value: value.into() }
    }
}

/// A rule overrode visibility last set by a different controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibilityConflict {
    pub target_id: String,
    pub previous_controller: String,
    pub controller: String,
    pub visible: bool,
}

/// Side effect of processing one change
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisibilityEffect {
    Shown { target_id: String },
    /// Target hidden; `cleared` is the answer that was dropped, if any
    Hidden { target_id: String, cleared: Option<AnswerValue> },
    /// Navigation hint for the renderer
    SkipTo { target_id: String, message: Option<String> },
    Conflict(VisibilityConflict),
    /// Change to a field the schema does not define
    UnknownField { field_id: String },
    /// Change to a hidden field, discarded so it cannot leak into the answers
    IgnoredHidden { field_id: String },
}

/// Visibility engine for one respondent session
#[derive(Clone, Debug)]
pub struct VisibilityEngine {
    schema: Arc<FormSchema>,
    state: VisibilityState,
    answers: Answers,
    // target id -> dropdown that last changed its visibility
    last_controller: HashMap<String, String>,
}

impl VisibilityEngine {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        let state = VisibilityState::all_visible(&schema);
        Self {
            schema,
            state,
            answers: Answers::new(),
            last_controller: HashMap::new(),
        }
    }

    /// Fresh session fed `changes` in order
    pub fn replay(schema: Arc<FormSchema>, changes: impl IntoIterator<Item = FieldChange>) -> Self {
        let mut engine = Self::new(schema);
        for change in changes {
            engine.apply(change);
        }
        engine
    }

    /// Visibility obtained by feeding `answers` to a fresh session in schema order
    pub fn evaluate(schema: Arc<FormSchema>, answers: &Answers) -> VisibilityState {
        let changes: Vec<FieldChange> = schema
            .fields()
            .iter()
            .filter_map(|f| {
                answers
                    .get(&f.id)
                    .map(|value| FieldChange { field_id: f.id.clone(), value: value.clone() })
            })
            .collect();
        Self::replay(schema, changes).state
    }

    pub fn schema(&self) -> &Arc<FormSchema> { &self.schema }
    pub fn state(&self) -> &VisibilityState { &self.state }
    pub fn answers(&self) -> &Answers { &self.answers }

    pub fn is_visible(&self, field_id: &str) -> bool {
        self.state.is_visible(field_id)
    }

    /// Hand the session over for submission
    pub fn into_parts(self) -> (VisibilityState, Answers) {
        (self.state, self.answers)
    }

    /// Process one value change; the transition completes before returning
    pub fn apply(&mut self, change: FieldChange) -> Vec<VisibilityEffect> {
        let schema = Arc::clone(&self.schema);
        let Some(field) = schema.field_by_id(&change.field_id) else {
            warn!(field_id = %change.field_id, "change for unknown field ignored");
            return vec![VisibilityEffect::UnknownField { field_id: change.field_id }];
        };

        if !self.state.is_visible(&field.id) {
            debug!(field_id = %field.id, "change for hidden field ignored");
            return vec![VisibilityEffect::IgnoredHidden { field_id: change.field_id }];
        }

        let FieldChange { field_id, value } = change;
        let selected = match (&field.kind, &value) {
            (FieldKind::Dropdown(_), AnswerValue::Text(v)) => Some(v.clone()),
            _ => None,
        };
        self.answers.insert(field_id.clone(), value);

        let Some(selected) = selected else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        for rule in field.conditions().iter().filter(|r| r.matches(&selected)) {
            match rule.action {
                ConditionAction::Show => {
                    self.set_visibility(&field_id, &rule.target_id, true, &mut effects);
                    effects.push(VisibilityEffect::Shown { target_id: rule.target_id.clone() });
                }
                ConditionAction::Hide => {
                    self.set_visibility(&field_id, &rule.target_id, false, &mut effects);
                    let cleared = self.answers.remove(&rule.target_id);
                    effects.push(VisibilityEffect::Hidden {
                        target_id: rule.target_id.clone(),
                        cleared,
                    });
                }
                ConditionAction::SkipTo => {
                    effects.push(VisibilityEffect::SkipTo {
                        target_id: rule.target_id.clone(),
                        message: rule.message.clone(),
                    });
                }
            }
        }

        debug!(
            field_id = %field_id,
            value = %selected,
            effects = effects.len(),
            "visibility transition"
        );
        effects
    }

    fn set_visibility(
        &mut self,
        controller: &str,
        target_id: &str,
        visible: bool,
        effects: &mut Vec<VisibilityEffect>,
    ) {
        if let Some(previous) = self.last_controller.get(target_id) {
            if previous != controller && self.state.is_visible(target_id) != visible {
                warn!(
                    target_id,
                    previous_controller = %previous,
                    controller,
                    visible,
                    "visibility overridden by another controller"
                );
                effects.push(VisibilityEffect::Conflict(VisibilityConflict {
                    target_id: target_id.to_string(),
                    previous_controller: previous.clone(),
                    controller: controller.to_string(),
                    visible,
                }));
            }
        }
        self.state.set(target_id, visible);
        self.last_controller.insert(target_id.to_string(), controller.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ConditionRule, FieldDefinition, OptionDefinition};
    use proptest::prelude::*;

    fn colours() -> Vec<OptionDefinition> {
        vec![OptionDefinition::new("red", "Red"), OptionDefinition::new("blue", "Blue")]
    }

    fn scenario_a() -> Arc<FormSchema> {
        Arc::new(FormSchema::create(
            "Scenario A",
            vec![
                FieldDefinition::dropdown("A", "Colour", colours())
                    .with_rule(ConditionRule::new("blue", ConditionAction::Show, "B")),
                FieldDefinition::text("B", "Why blue?").conditional(),
            ],
        ))
    }

    fn hide_schema() -> Arc<FormSchema> {
        Arc::new(FormSchema::create(
            "Hide",
            vec![
                FieldDefinition::dropdown("employed", "Employed?", vec![
                    OptionDefinition::new("yes", "Yes"),
                    OptionDefinition::new("no", "No"),
                ])
                .with_rule(ConditionRule::new("no", ConditionAction::Hide, "employer"))
                .with_rule(ConditionRule::new("yes", ConditionAction::Show, "employer"))
                .with_rule(
                    ConditionRule::new("no", ConditionAction::SkipTo, "notes")
                        .with_message("Skip the employer section"),
                ),
                FieldDefinition::text("employer", "Employer").required().conditional(),
                FieldDefinition::text("notes", "Notes"),
            ],
        ))
    }

    #[test]
    fn test_scenario_a_conditional_field_starts_visible_and_has_no_implicit_undo() {
        let mut engine = VisibilityEngine::new(scenario_a());
        assert!(engine.is_visible("B"));

        let effects = engine.apply(FieldChange::new("A", "blue"));
        assert_eq!(effects, vec![VisibilityEffect::Shown { target_id: "B".into() }]);
        assert!(engine.is_visible("B"));

        let effects = engine.apply(FieldChange::new("A", "red"));
        assert!(effects.is_empty());
        assert!(engine.is_visible("B"));
    }

    #[test]
    fn test_hide_clears_stale_answer() {
        let mut engine = VisibilityEngine::new(hide_schema());
        engine.apply(FieldChange::new("employer", "Acme"));
        assert_eq!(engine.answers().get("employer"), Some(&AnswerValue::text("Acme")));

        let effects = engine.apply(FieldChange::new("employed", "no"));
        assert!(!engine.is_visible("employer"));
        assert!(!engine.answers().contains_key("employer"));
        assert!(effects.contains(&VisibilityEffect::Hidden {
            target_id: "employer".into(),
            cleared: Some(AnswerValue::text("Acme")),
        }));
        assert!(effects.contains(&VisibilityEffect::SkipTo {
            target_id: "notes".into(),
            message: Some("Skip the employer section".into()),
        }));
    }

    #[test]
    fn test_show_after_hide_restores_visibility_without_answer() {
        let mut engine = VisibilityEngine::new(hide_schema());
        engine.apply(FieldChange::new("employer", "Acme"));
        engine.apply(FieldChange::new("employed", "no"));
        engine.apply(FieldChange::new("employed", "yes"));

        assert!(engine.is_visible("employer"));
        assert!(!engine.answers().contains_key("employer"));
    }

    #[test]
    fn test_skip_to_does_not_touch_visibility() {
        let mut engine = VisibilityEngine::new(hide_schema());
        engine.apply(FieldChange::new("notes", "hello"));
        engine.apply(FieldChange::new("employed", "no"));
        assert!(engine.is_visible("notes"));
        assert_eq!(engine.answers().get("notes"), Some(&AnswerValue::text("hello")));
    }

    #[test]
    fn test_changes_to_hidden_or_unknown_fields_are_ignored() {
        let mut engine = VisibilityEngine::new(hide_schema());
        engine.apply(FieldChange::new("employed", "no"));

        let effects = engine.apply(FieldChange::new("employer", "Sneaky"));
        assert_eq!(effects, vec![VisibilityEffect::IgnoredHidden { field_id: "employer".into() }]);
        assert!(!engine.answers().contains_key("employer"));

        let effects = engine.apply(FieldChange::new("ghost", "boo"));
        assert_eq!(effects, vec![VisibilityEffect::UnknownField { field_id: "ghost".into() }]);
    }

    #[test]
    fn test_last_event_wins_between_controllers() {
        let yes_no = || vec![OptionDefinition::new("yes", "Yes"), OptionDefinition::new("no", "No")];
        let schema = Arc::new(FormSchema::create(
            "Conflict",
            vec![
                FieldDefinition::dropdown("X", "X", yes_no())
                    .with_rule(ConditionRule::new("yes", ConditionAction::Hide, "T")),
                FieldDefinition::dropdown("Y", "Y", yes_no())
                    .with_rule(ConditionRule::new("yes", ConditionAction::Show, "T")),
                FieldDefinition::text("T", "Target"),
            ],
        ));

        let mut engine = VisibilityEngine::new(Arc::clone(&schema));
        engine.apply(FieldChange::new("X", "yes"));
        assert!(!engine.is_visible("T"));

        let effects = engine.apply(FieldChange::new("Y", "yes"));
        assert!(engine.is_visible("T"));
        assert!(effects.contains(&VisibilityEffect::Conflict(VisibilityConflict {
            target_id: "T".into(),
            previous_controller: "X".into(),
            controller: "Y".into(),
            visible: true,
        })));

        // Opposite arrival order, opposite outcome
        let engine = VisibilityEngine::replay(
            schema,
            vec![FieldChange::new("Y", "yes"), FieldChange::new("X", "yes")],
        );
        assert!(!engine.is_visible("T"));
    }

    #[test]
    fn test_non_dropdown_changes_only_record_answers() {
        let mut engine = VisibilityEngine::new(hide_schema());
        let effects = engine.apply(FieldChange::new("notes", "no"));
        assert!(effects.is_empty());
        assert!(engine.is_visible("employer"));
    }

    #[test]
    fn test_into_parts() {
        let engine = VisibilityEngine::replay(
            hide_schema(),
            vec![FieldChange::new("employed", "no"), FieldChange::new("notes", "n/a")],
        );
        let (state, answers) = engine.into_parts();
        assert_eq!(state.hidden_ids().collect::<Vec<_>>(), vec!["employer"]);
        assert_eq!(answers.len(), 2);
    }

    fn arb_changes() -> impl Strategy<Value = Vec<FieldChange>> {
        let change = prop_oneof![
            prop_oneof![Just("yes"), Just("no"), Just("maybe")]
                .prop_map(|v| FieldChange::new("employed", v)),
            "[a-z]{0,5}".prop_map(|v| FieldChange::new("employer", v)),
            "[a-z]{0,5}".prop_map(|v| FieldChange::new("notes", v)),
        ];
        prop::collection::vec(change, 0..20)
    }

    proptest! {
        #[test]
        fn prop_matching_hide_excludes_target_and_clears_answer(changes in arb_changes()) {
            let mut engine = VisibilityEngine::replay(hide_schema(), changes);
            engine.apply(FieldChange::new("employed", "no"));
            prop_assert!(!engine.is_visible("employer"));
            prop_assert!(!engine.answers().contains_key("employer"));
            prop_assert!(!engine.state().visible_ids().any(|id| id == "employer"));
        }

        #[test]
        fn prop_reapplying_unchanged_answers_is_stable(changes in arb_changes()) {
            let engine = VisibilityEngine::replay(hide_schema(), changes);
            let answers = engine.answers().clone();

            let first = VisibilityEngine::evaluate(hide_schema(), &answers);
            let second = VisibilityEngine::evaluate(hide_schema(), &answers);
            prop_assert_eq!(&first, &second);

            // Feeding the same value again produces no new transition
            let mut again = engine.clone();
            if let Some(value) = answers.get("employed").cloned() {
                again.apply(FieldChange { field_id: "employed".into(), value });
                prop_assert_eq!(again.state(), engine.state());
            }
        }
    }
}
