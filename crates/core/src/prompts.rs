//! Prompt templates sent to the model.
//!
//! The model only ever suggests commands; nothing here is executed against a
//! device.

/// Instructional preamble for plain-text command suggestions.
pub fn command_preamble(device_model: &str) -> String {
    format!(
        "You are an expert network engineer who generates Cisco device commands.\n\
         Respond with Cisco IOS-style configuration commands for a {device_model} that \
         accomplish the user's request.\n\
         Rules:\n\
         - Output only the commands, one per line, in the order they must be entered.\n\
         - Include explicit mode changes (enable, configure terminal, interface ..., end).\n\
         - Do not wrap the commands in Markdown code fences.\n\
         - If the request is ambiguous, output a single line starting with `!` that \
         explains what information is missing."
    )
}

/// Preamble asking for a JSON command plan instead of free text.
pub fn plan_preamble(device_model: &str) -> String {
    format!(
        r#"You are an expert Cisco IOS command and information retrieval assistant.
Translate the user's natural language request into Cisco IOS commands, or pick the
'show' command that answers the user's question. The device is a {device_model}.

Output ONLY a JSON object with these keys:
1. "query_type": "TASK" for configuration changes or actions, "QUESTION" for information retrieval.
2. "commands_to_execute": list of strings.
   - TASK: the IOS commands that perform the task, including mode changes.
   - QUESTION: empty, or preparatory commands only (for example "end" to reach privileged EXEC). Never the show command itself.
3. "information_retrieval_command": a single string.
   - TASK: a show command that verifies the change.
   - QUESTION: the show command whose output answers the question.
   - Empty string when nothing obvious applies.
4. "requires_answer_extraction": boolean. true when a QUESTION's show output is verbose and a short answer should be extracted from it; false otherwise.

Example request: "Create VLAN 100 named Management"
{{"query_type": "TASK", "commands_to_execute": ["configure terminal", "vlan 100", "name Management", "end"], "information_retrieval_command": "show vlan brief", "requires_answer_extraction": false}}

Example request: "What is the name of VLAN 100?"
{{"query_type": "QUESTION", "commands_to_execute": [], "information_retrieval_command": "show vlan id 100", "requires_answer_extraction": true}}

Example request: "Show me all configured VLANs."
{{"query_type": "QUESTION", "commands_to_execute": [], "information_retrieval_command": "show vlan brief", "requires_answer_extraction": false}}

If the request is unclear, answer with query_type "QUESTION", an empty command list, an
empty information_retrieval_command and requires_answer_extraction false.
Only output the JSON object. No other text."#
    )
}

/// The user turn that accompanies a preamble sent as the system instruction.
pub fn user_turn(user_text: &str) -> String {
    format!("User request: \"{}\"", user_text.trim())
}

pub fn answer_extraction_prompt(question: &str, device_output: &str) -> String {
    format!(
        "You are an information extraction assistant.\n\
         Given the user's question and the raw output of a Cisco 'show' command, extract a \
         concise natural language answer to the question.\n\
         If the information is not present in the output, say that the information is not found.\n\
         Do not include apologies or pleasantries.\n\n\
         Question: {}\n\n\
         Device output:\n---\n{}\n---\n\n\
         Answer:",
        question.trim(),
        device_output.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::{answer_extraction_prompt, command_preamble, plan_preamble, user_turn};

    #[test]
    fn command_preamble_names_device_and_ios_style() {
        let preamble = command_preamble("Cisco 3750");
        assert!(preamble.contains("Cisco IOS-style configuration commands for a Cisco 3750"));
    }

    #[test]
    fn user_turn_quotes_trimmed_text() {
        let request = user_turn("  enable interface 1 \n");
        assert_eq!(request, "User request: \"enable interface 1\"");
    }

    #[test]
    fn plan_preamble_lists_every_plan_key() {
        let preamble = plan_preamble("Cisco 2960X");
        for key in [
            "query_type",
            "commands_to_execute",
            "information_retrieval_command",
            "requires_answer_extraction",
        ] {
            assert!(preamble.contains(key), "missing key {key}");
        }
        assert!(preamble.contains("Cisco 2960X"));
    }

    #[test]
    fn extraction_prompt_carries_question_and_output() {
        let prompt = answer_extraction_prompt("What is VLAN 100 called?", "100  Management  active\n");
        assert!(prompt.contains("Question: What is VLAN 100 called?"));
        assert!(prompt.contains("---\n100  Management  active\n---"));
    }
}
