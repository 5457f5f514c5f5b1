//! Instruction prompts for schema-constrained extraction.

use biodata_core::Field;

const SYSTEM_PROMPT: &str = "You are a precise information extraction engine. \
You read biodata documents and reply with ONLY valid JSON matching the requested schema. \
You never add commentary, never guess, and use null for anything not stated in the text.";

pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Build the user prompt for one record or chunk.
pub fn user_prompt(text: &str) -> String {
    let mut schema = String::new();
    for field in Field::ALL {
        schema.push_str(&format!("  \"{}\": {}\n", field.key(), field.description()));
    }

    format!(
        "Extract the following fields from the biodata text below.\n\n\
         Schema (every key must be present):\n{{\n{schema}}}\n\n\
         Rules:\n\
         - If a field is not present in the text, set it to null.\n\
         - Do not infer or fabricate values that are not written in the text.\n\
         - Dates must use the format YYYY-MM-DD.\n\
         - Return a single JSON object and nothing else: no markdown, no explanation.\n\n\
         Text:\n---\n{text}\n---"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_field_and_embeds_text() {
        let prompt = user_prompt("Name: Asha Patel\nAge: 28");
        for field in Field::ALL {
            assert!(prompt.contains(&format!("\"{}\"", field.key())), "missing {field}");
        }
        assert!(prompt.contains("YYYY-MM-DD"));
        assert!(prompt.contains("null"));
        assert!(prompt.contains("---\nName: Asha Patel\nAge: 28\n---"));
    }

    #[test]
    fn system_prompt_demands_json() {
        assert!(system_prompt().contains("ONLY valid JSON"));
    }
}
