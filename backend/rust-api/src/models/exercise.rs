use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::null_as_default;
use super::richtext::{plain_text, RichText};
use super::EntityRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name_exercise: String,
    #[serde(default)]
    pub description_exercise: Option<RichText>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub example_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub solution_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub expected_output: String,
    #[serde(rename = "isCorrect", default, deserialize_with = "null_as_default")]
    pub is_correct: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hints: Vec<Hint>,
    #[serde(default)]
    pub topic: Option<EntityRef>,
}

impl Exercise {
    /// Matches a path segment against the numeric id or the documentId.
    pub fn is_identified_by(&self, key: &str) -> bool {
        self.document_id == key || key.parse::<i64>().map_or(false, |id| id == self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hint_text: String,
}

/// Create/edit exercise form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExerciseForm {
    #[serde(default)]
    pub name_exercise: String,
    #[serde(default)]
    pub description_exercise: String,
    #[serde(default)]
    pub example_code: String,
    #[serde(default)]
    pub solution_code: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(rename = "isCorrect", default)]
    pub is_correct: bool,
    /// documentId of the owning topic
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

impl Validate for ExerciseForm {
    /// Checks run in groups and stop at the first failing group.
    fn validate(&self) -> Result<(), ValidationErrors> {
        let groups: [(&[(&'static str, &str)], &'static str); 3] = [
            (
                &[
                    ("name_exercise", self.name_exercise.as_str()),
                    ("description_exercise", self.description_exercise.as_str()),
                    ("topic", self.topic.as_str()),
                ],
                "Please complete all required fields (Name, Description and Topic)",
            ),
            (
                &[
                    ("example_code", self.example_code.as_str()),
                    ("solution_code", self.solution_code.as_str()),
                ],
                "Please complete the example code and the solution",
            ),
            (
                &[("expected_output", self.expected_output.as_str())],
                "Please complete the expected output",
            ),
        ];

        for (fields, message) in groups {
            let mut errors = ValidationErrors::new();
            for &(field, value) in fields {
                if value.is_empty() {
                    errors.add(
                        field,
                        ValidationError::new("required").with_message(message.into()),
                    );
                }
            }
            if !errors.is_empty() {
                return Err(errors);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ExercisePayload {
    pub name_exercise: String,
    pub description_exercise: RichText,
    pub example_code: String,
    pub solution_code: String,
    pub expected_output: String,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    pub topic: String,
    pub hints: Vec<Hint>,
}

impl From<ExerciseForm> for ExercisePayload {
    fn from(form: ExerciseForm) -> Self {
        Self {
            description_exercise: RichText::from_lines(&form.description_exercise),
            hints: form
                .hints
                .into_iter()
                .filter(|hint| !hint.trim().is_empty())
                .map(|hint_text| Hint {
                    id: None,
                    hint_text,
                })
                .collect(),
            name_exercise: form.name_exercise,
            example_code: form.example_code,
            solution_code: form.solution_code,
            expected_output: form.expected_output,
            is_correct: form.is_correct,
            topic: form.topic,
        }
    }
}

/// Exercise as shown in the admin list and edit form
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseView {
    pub id: i64,
    pub document_id: String,
    pub name_exercise: String,
    pub description_exercise: String,
    pub example_code: String,
    pub solution_code: String,
    pub expected_output: String,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    pub topic: Option<String>,
    pub hints: Vec<String>,
}

impl From<Exercise> for ExerciseView {
    fn from(exercise: Exercise) -> Self {
        Self {
            id: exercise.id,
            description_exercise: plain_text(&exercise.description_exercise, "\n"),
            document_id: exercise.document_id,
            name_exercise: exercise.name_exercise,
            example_code: exercise.example_code,
            solution_code: exercise.solution_code,
            expected_output: exercise.expected_output,
            is_correct: exercise.is_correct,
            topic: exercise.topic.map(|t| t.document_id),
            hints: exercise.hints.into_iter().map(|h| h.hint_text).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_form() -> ExerciseForm {
        ExerciseForm {
            name_exercise: "Suma".to_string(),
            description_exercise: "Suma dos números".to_string(),
            example_code: "print(1)".to_string(),
            solution_code: "print(1 + 2)".to_string(),
            expected_output: "3".to_string(),
            is_correct: false,
            topic: "topic-doc".to_string(),
            hints: vec!["usa +".to_string(), "  ".to_string(), String::new()],
        }
    }

    #[test]
    fn validation_stops_at_first_failing_group() {
        let form = ExerciseForm {
            topic: String::new(),
            solution_code: String::new(),
            ..complete_form()
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("topic"));
        assert!(!fields.contains_key("solution_code"));
    }

    #[test]
    fn expected_output_is_required() {
        let form = ExerciseForm {
            expected_output: String::new(),
            ..complete_form()
        };
        assert!(form
            .validate()
            .unwrap_err()
            .field_errors()
            .contains_key("expected_output"));
    }

    #[test]
    fn payload_drops_blank_hints() {
        let payload = ExercisePayload::from(complete_form());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["hints"], json!([{"hint_text": "usa +"}]));
        assert_eq!(json["topic"], "topic-doc");
        assert_eq!(json["isCorrect"], false);
    }

    #[test]
    fn blank_description_encodes_as_empty_array() {
        let payload = ExercisePayload::from(ExerciseForm {
            description_exercise: "  ".to_string(),
            ..complete_form()
        });
        assert_eq!(
            serde_json::to_value(&payload).unwrap()["description_exercise"],
            json!([])
        );
    }

    #[test]
    fn identified_by_id_or_document_id() {
        let exercise: Exercise = serde_json::from_value(json!({
            "id": 12,
            "documentId": "ex-doc",
            "expected_output": null,
            "hints": null
        }))
        .unwrap();

        assert!(exercise.is_identified_by("12"));
        assert!(exercise.is_identified_by("ex-doc"));
        assert!(!exercise.is_identified_by("13"));
        assert_eq!(exercise.expected_output, "");
    }
}
