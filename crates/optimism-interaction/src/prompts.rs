//! Prompt templates rendered with minijinja.

use minijinja::{Environment, context};
use optimism_core::formalization::INCOMPLETE_MARKER;
use optimism_core::{OptimismError, Result};

const FORMALIZATION_TEMPLATE: &str = r#"You are an operations research analyst. Below is a conversation between a user and an assistant about a decision problem.

Conversation:
{{ transcript }}

Write one structured problem definition with these sections:
- Objective: what is minimised or maximised.
- Decision variables: names, meaning, domains.
- Constraints: each as a short statement.
- Parameters: known values mentioned in the conversation.

If the conversation does not contain enough detail to state the objective, the decision variables and at least one constraint, begin your answer with {{ marker }} on its own line, then list what is still missing. Do not invent values that were not mentioned."#;

const CONNECTION_PROBE: &str = "Reply with the single word: ok";

/// Builds the formalization prompt for a rendered transcript.
pub fn formalization_prompt(transcript: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("formalization", FORMALIZATION_TEMPLATE)
        .map_err(template_error)?;
    env.get_template("formalization")
        .and_then(|template| {
            template.render(context! {
                transcript => transcript,
                marker => INCOMPLETE_MARKER,
            })
        })
        .map_err(template_error)
}

/// Minimal prompt used to check that a provider answers at all.
pub fn connection_probe() -> &'static str {
    CONNECTION_PROBE
}

fn template_error(err: minijinja::Error) -> OptimismError {
    OptimismError::internal(format!("Prompt template error: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formalization_prompt_embeds_transcript_and_marker() {
        let prompt =
            formalization_prompt("User: Minimise cost\n\nAssistant: How many depots?").unwrap();
        assert!(prompt.contains("User: Minimise cost\n\nAssistant: How many depots?"));
        assert!(prompt.contains("begin your answer with [INCOMPLETE]"));
    }

    #[test]
    fn test_transcript_is_not_reinterpreted() {
        let prompt = formalization_prompt("User: use {{ x }} as the variable").unwrap();
        assert!(prompt.contains("use {{ x }} as the variable"));
    }
}
