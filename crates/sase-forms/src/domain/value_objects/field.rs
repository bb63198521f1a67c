//! Field definitions
//!
//! A field is one question on a form. Its type-specific configuration is a
//! closed tagged enum, so every consumer matches on it exhaustively and adding
//! a field type is a compile-time visible change.

use serde::{Deserialize, Serialize};

/// One question on a form, in display order within its schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub is_required: bool,
    /// Set when another field's rule targets this one
    #[serde(default)]
    pub is_conditional: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Type-specific configuration, tagged by `type` on the wire
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text(TextConfig),
    Dropdown(DropdownConfig),
    Table(TableConfig),
    File,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<TextValidation>,
}

/// Pattern rule attached to a text field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextValidation {
    pub pattern: PatternKind,
    /// Author-supplied regex, only meaningful for [`PatternKind::Custom`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Email,
    Phone,
    Number,
    Custom,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropdownConfig {
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionRule>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub value: String,
    pub label: String,
}

impl OptionDefinition {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self { value: value.into(), label: label.into() }
    }
}

/// Trigger value on a dropdown mapped to an action on another field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRule {
    pub option_value: String,
    pub action: ConditionAction,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConditionRule {
    pub fn new(
        option_value: impl Into<String>,
        action: ConditionAction,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            option_value: option_value.into(),
            action,
            target_id: target_id.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Rules fire on exact equality with the controller's new value
    pub fn matches(&self, value: &str) -> bool {
        self.option_value == value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionAction {
    Show,
    Hide,
    /// Navigation hint only, never touches visibility or data
    SkipTo,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

impl ColumnDefinition {
    pub fn text(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: ColumnKind::Text }
    }

    pub fn dropdown(name: impl Into<String>, options: Vec<OptionDefinition>) -> Self {
        Self { name: name.into(), kind: ColumnKind::Dropdown { options } }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Dropdown {
        #[serde(default)]
        options: Vec<OptionDefinition>,
    },
}

impl FieldKind {
    /// Wire name of the field type
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text(_) => "text",
            FieldKind::Dropdown(_) => "dropdown",
            FieldKind::Table(_) => "table",
            FieldKind::File => "file",
        }
    }
}

impl FieldDefinition {
    pub fn new(id: impl Into<String>, question: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            is_required: false,
            is_conditional: false,
            kind,
        }
    }

    pub fn text(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self::new(id, question, FieldKind::Text(TextConfig::default()))
    }

    pub fn dropdown(
        id: impl Into<String>,
        question: impl Into<String>,
        options: Vec<OptionDefinition>,
    ) -> Self {
        Self::new(
            id,
            question,
            FieldKind::Dropdown(DropdownConfig { options, conditions: vec![] }),
        )
    }

    pub fn table(
        id: impl Into<String>,
        question: impl Into<String>,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        Self::new(id, question, FieldKind::Table(TableConfig { columns }))
    }

    pub fn file(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self::new(id, question, FieldKind::File)
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn conditional(mut self) -> Self {
        self.is_conditional = true;
        self
    }

    /// Attach a rule; ignored on non-dropdown fields
    pub fn with_rule(mut self, rule: ConditionRule) -> Self {
        if let FieldKind::Dropdown(config) = &mut self.kind {
            config.conditions.push(rule);
        }
        self
    }

    /// Attach a pattern rule; ignored on non-text fields
    pub fn with_validation(mut self, validation: TextValidation) -> Self {
        if let FieldKind::Text(config) = &mut self.kind {
            config.validation = Some(validation);
        }
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        if let FieldKind::Text(config) = &mut self.kind {
            config.min_length = min;
            config.max_length = max;
        }
        self
    }

    /// Rules attached to this field, empty unless it is a dropdown
    pub fn conditions(&self) -> &[ConditionRule] {
        match &self.kind {
            FieldKind::Dropdown(config) => &config.conditions,
            FieldKind::Text(_) | FieldKind::Table(_) | FieldKind::File => &[],
        }
    }

    pub fn is_dropdown(&self) -> bool {
        matches!(self.kind, FieldKind::Dropdown(_))
    }
}

impl TextValidation {
    pub fn builtin(pattern: PatternKind) -> Self {
        Self { pattern, custom_rule: None, error_message: None }
    }

    pub fn custom(rule: impl Into<String>) -> Self {
        Self {
            pattern: PatternKind::Custom,
            custom_rule: Some(rule.into()),
            error_message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dropdown_wire_format() {
        let raw = json!({
            "id": "A",
            "type": "dropdown",
            "question": "Pick a colour",
            "isRequired": true,
            "options": [
                { "value": "red", "label": "Red" },
                { "value": "blue", "label": "Blue" }
            ],
            "conditions": [
                { "optionValue": "blue", "action": "skip_to", "targetId": "B", "message": "Jump ahead" }
            ]
        });

        let field: FieldDefinition = serde_json::from_value(raw).unwrap();
        assert!(field.is_required);
        assert!(!field.is_conditional);
        assert_eq!(field.kind.name(), "dropdown");
        assert_eq!(field.conditions().len(), 1);
        assert_eq!(field.conditions()[0].action, ConditionAction::SkipTo);
        assert_eq!(field.conditions()[0].message.as_deref(), Some("Jump ahead"));
    }

    #[test]
    fn test_file_field_without_extra_config() {
        let field: FieldDefinition =
            serde_json::from_value(json!({ "id": "cv", "type": "file", "question": "Upload CV" }))
                .unwrap();
        assert_eq!(field.kind, FieldKind::File);
        assert!(field.conditions().is_empty());
    }

    #[test]
    fn test_table_columns_wire_format() {
        let raw = json!({
            "id": "team",
            "type": "table",
            "question": "Team members",
            "columns": [
                { "name": "name", "type": "text" },
                { "name": "role", "type": "dropdown", "options": [{ "value": "dev", "label": "Developer" }] }
            ]
        });

        let field: FieldDefinition = serde_json::from_value(raw).unwrap();
        match &field.kind {
            FieldKind::Table(config) => {
                assert_eq!(config.columns[0].kind, ColumnKind::Text);
                assert!(matches!(config.columns[1].kind, ColumnKind::Dropdown { ref options } if options.len() == 1));
            }
            other => panic!("expected table, got {}", other.name()),
        }
    }

    #[test]
    fn test_unknown_field_type_is_rejected() {
        let result: Result<FieldDefinition, _> =
            serde_json::from_value(json!({ "id": "x", "type": "slider", "question": "?" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_pattern_wire_format() {
        let field = FieldDefinition::text("zip", "Zip code")
            .with_validation(TextValidation::custom(r"^\d{5}$").with_message("Five digits"));
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["validation"]["pattern"], "custom");
        assert_eq!(value["validation"]["customRule"], r"^\d{5}$");
        assert_eq!(value["validation"]["errorMessage"], "Five digits");
    }

    #[test]
    fn test_rule_only_attaches_to_dropdowns() {
        let field = FieldDefinition::text("t", "Text")
            .with_rule(ConditionRule::new("x", ConditionAction::Hide, "y"));
        assert!(field.conditions().is_empty());
    }
}
