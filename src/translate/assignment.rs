use serde::Serialize;

use crate::schema::field_model::{FieldDescriptor, FieldOption};

/// Form-native value, already normalised for replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FormValue {
    /// Typed into a text input (dates already `DD.MM.YYYY`, date parts
    /// already split)
    Text(String),
    /// Selected from a dropdown or picked in a radio group
    Choice(FieldOption),
    /// Desired state of every option of a checkbox field
    Checks(Vec<CheckState>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckState {
    pub option: FieldOption,
    pub checked: bool,
}

/// One leaf field paired with the value the filler writes into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub field: FieldDescriptor,
    pub value: FormValue,
}

impl Assignment {
    pub fn key(&self) -> &str {
        &self.field.key
    }

    pub fn page(&self) -> usize {
        self.field.page
    }

    /// Value as shown in plan output and traces.
    pub fn display_value(&self) -> String {
        match &self.value {
            FormValue::Text(text) => text.clone(),
            FormValue::Choice(option) => format!("{} ({})", option.value, option.label),
            FormValue::Checks(states) => {
                let checked: Vec<&str> = states
                    .iter()
                    .filter(|s| s.checked)
                    .map(|s| s.option.value.as_str())
                    .collect();
                format!("[{}]", checked.join(", "))
            }
        }
    }
}
