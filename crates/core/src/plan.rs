use serde::{Deserialize, Serialize};

use crate::errors::ExchangeError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryType {
    Task,
    Question,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Structured suggestion returned by the model in plan mode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandPlan {
    pub query_type: QueryType,
    pub commands_to_execute: Vec<String>,
    pub information_retrieval_command: String,
    pub requires_answer_extraction: bool,
}

impl CommandPlan {
    /// Parses a plan out of a model reply, tolerating Markdown fences and
    /// surrounding prose.
    pub fn parse(reply: &str) -> Result<Self, ExchangeError> {
        let cleaned = strip_code_fence(reply.trim());

        let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) else {
            return Err(ExchangeError::InvalidPlan(format!(
                "no JSON object in reply `{}`",
                preview(cleaned)
            )));
        };
        if end <= start {
            return Err(ExchangeError::InvalidPlan(format!(
                "no JSON object in reply `{}`",
                preview(cleaned)
            )));
        }

        serde_json::from_str::<Self>(&cleaned[start..=end])
            .map_err(|error| ExchangeError::InvalidPlan(error.to_string()))
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        let kind = match self.query_type {
            QueryType::Task => "configuration task",
            QueryType::Question => "information request",
            QueryType::Unknown => "unclassified request",
        };
        lines.push(format!("Plan ({kind}):"));

        if self.commands_to_execute.is_empty() {
            lines.push("  (no commands to enter)".to_string());
        } else {
            for (index, command) in self.commands_to_execute.iter().enumerate() {
                lines.push(format!("  {:>2}. {command}", index + 1));
            }
        }

        let retrieval = self.information_retrieval_command.trim();
        if !retrieval.is_empty() {
            let label = match self.query_type {
                QueryType::Task => "Verify with",
                QueryType::Question | QueryType::Unknown => "Answer with",
            };
            lines.push(format!("{label}: {retrieval}"));
            if self.requires_answer_extraction {
                lines.push(
                    "  (output is verbose; paste it into `otai extract` for a short answer)"
                        .to_string(),
                );
            }
        }

        lines.join("\n")
    }
}

fn strip_code_fence(text: &str) -> &str {
    let mut text = text;
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn preview(text: &str) -> String {
    let preview: String = text.chars().take(80).collect();
    if preview.len() < text.len() {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandPlan, QueryType};
    use crate::errors::ExchangeError;

    #[test]
    fn parses_fenced_task_plan() {
        let reply = "```json\n{\"query_type\": \"TASK\", \"commands_to_execute\": [\"configure terminal\", \"vlan 100\", \"name Management\", \"end\"], \"information_retrieval_command\": \"show vlan brief\", \"requires_answer_extraction\": false}\n```";

        let plan = CommandPlan::parse(reply).expect("plan should parse");

        assert_eq!(plan.query_type, QueryType::Task);
        assert_eq!(plan.commands_to_execute.len(), 4);
        assert_eq!(plan.information_retrieval_command, "show vlan brief");
        assert!(!plan.requires_answer_extraction);
    }

    #[test]
    fn missing_keys_take_defaults() {
        let plan = CommandPlan::parse("Here you go: {\"information_retrieval_command\": \"show ip int brief\"} hope that helps")
            .expect("plan should parse");

        assert_eq!(plan.query_type, QueryType::Unknown);
        assert!(plan.commands_to_execute.is_empty());
        assert_eq!(plan.information_retrieval_command, "show ip int brief");
    }

    #[test]
    fn unrecognized_query_type_is_unknown() {
        let plan = CommandPlan::parse("{\"query_type\": \"CHITCHAT\"}").expect("plan should parse");
        assert_eq!(plan.query_type, QueryType::Unknown);
    }

    #[test]
    fn reply_without_json_is_invalid_plan() {
        let error = CommandPlan::parse("interface Gi0/1\n no shutdown").expect_err("should fail");
        assert!(matches!(error, ExchangeError::InvalidPlan(ref message) if message.contains("no JSON object")));
    }

    #[test]
    fn broken_json_is_invalid_plan() {
        let error = CommandPlan::parse("{\"query_type\": \"TASK\", }").expect_err("should fail");
        assert_eq!(error.error_class(), "invalid_plan");
    }

    #[test]
    fn render_lists_commands_and_verification() {
        let plan = CommandPlan {
            query_type: QueryType::Task,
            commands_to_execute: vec!["configure terminal".to_owned(), "vlan 100".to_owned()],
            information_retrieval_command: "show vlan brief".to_owned(),
            requires_answer_extraction: false,
        };

        assert_eq!(
            plan.render(),
            "Plan (configuration task):\n   1. configure terminal\n   2. vlan 100\nVerify with: show vlan brief"
        );
    }

    #[test]
    fn render_question_without_commands() {
        let plan = CommandPlan {
            query_type: QueryType::Question,
            commands_to_execute: Vec::new(),
            information_retrieval_command: "show vlan id 100".to_owned(),
            requires_answer_extraction: true,
        };

        let rendered = plan.render();
        assert!(rendered.starts_with("Plan (information request):\n  (no commands to enter)"));
        assert!(rendered.contains("Answer with: show vlan id 100"));
        assert!(rendered.contains("otai extract"));
    }
}
