// Prompt templates for the feedback flow: the chat-facing session prompts and the
// extraction prompt sent to the LLM.

use crate::feedback::metrics::{Metric, MetricScope};
use crate::models::user::RelationInfo;

pub const EXTRACTION_TOOL_NAME: &str = "insert_evaluation";

pub const EXTRACTION_TOOL_DESCRIPTION: &str =
    "Process and store evaluation criteria for each given target";

pub const EXTRACTION_SYSTEM: &str = "\
You are an HR analyst turning free-text peer feedback into structured evaluations. \
Produce one evaluation per subject the author talks about: a Person evaluation for each colleague \
and a Company evaluation for remarks about the workplace itself. \
Score every metric as an integer from 0 to 10 and give it a weight between 0 and 1 expressing \
how strongly the text speaks to that metric; use weight 0 when the text says nothing about it. \
Never invent subjects: Person evaluations may only use the user IDs listed in the relations. \
Record sentiment-bearing words with a weight between 0 (negative) and 1 (positive) and the number \
of times they appear.";

pub const EXTRACTION_PROMPT: &str = r#"Evaluate the following feedback written by {author_name} about their colleagues at {company_name}.

METRICS:
{metric_descriptions}

RELATIONS (the only people that may be evaluated):
{relations}

FEEDBACK:
{feedback_text}

Call the `insert_evaluation` tool exactly once with every evaluation you derived."#;

pub fn build_extraction_prompt(
    author_name: &str,
    company_name: &str,
    relations: &[RelationInfo],
    feedback_text: &str,
) -> String {
    EXTRACTION_PROMPT
        .replace("{author_name}", author_name)
        .replace("{company_name}", company_name)
        .replace("{metric_descriptions}", &metric_descriptions())
        .replace("{relations}", &relation_lines(relations))
        .replace("{feedback_text}", feedback_text)
}

fn metric_descriptions() -> String {
    Metric::ALL
        .iter()
        .map(|m| {
            let scope = match m.scope() {
                MetricScope::Company => "company",
                MetricScope::Person => "person",
            };
            format!("- {} ({scope}): {}", m.score_key(), m.description())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn relation_lines(relations: &[RelationInfo]) -> String {
    if relations.is_empty() {
        return "- (none)".to_string();
    }
    relations
        .iter()
        .map(|r| format!("- {} (user id {}, {})", r.user_name, r.user_id, r.relationship))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greeting returned when a session opens.
pub fn initiate_prompt(user_name: &str, company_name: &str, relations: &[RelationInfo]) -> String {
    let mut prompt = format!(
        "Hi {user_name}! Let's talk about how things are going at {company_name}.\n"
    );
    if relations.is_empty() {
        prompt.push_str("You have no registered colleagues yet, so tell me about the company itself.\n");
    } else {
        prompt.push_str("You can share feedback about the company and about:\n");
        for r in relations {
            prompt.push_str(&format!("- {} ({})\n", r.user_name, r.relationship));
        }
    }
    prompt.push_str("Write as much as you like. When you're done, ask me to evaluate.");
    prompt
}

/// Acknowledgement for one turn, nudging toward colleagues not mentioned so far.
pub fn continue_prompt(relations: &[RelationInfo], accumulated_text: &str) -> String {
    let text = accumulated_text.to_lowercase();
    let unmentioned: Vec<&str> = relations
        .iter()
        .filter(|r| !text.contains(&r.user_name.to_lowercase()))
        .map(|r| r.user_name.as_str())
        .collect();

    if unmentioned.is_empty() {
        "Thanks, noted. Anything else? When you're done, ask me to evaluate.".to_string()
    } else {
        format!(
            "Thanks, noted. Anything you'd like to say about {}? When you're done, ask me to evaluate.",
            unmentioned.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn relation(name: &str, relationship: &str) -> RelationInfo {
        RelationInfo {
            user_id: Uuid::new_v4(),
            user_name: name.to_string(),
            relationship: relationship.to_string(),
        }
    }

    #[test]
    fn test_initiate_prompt_lists_relations() {
        let prompt = initiate_prompt(
            "Alice",
            "Acme",
            &[relation("Bob", "peer"), relation("Carol", "manager")],
        );
        assert!(prompt.contains("Hi Alice"));
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains("- Bob (peer)"));
        assert!(prompt.contains("- Carol (manager)"));
    }

    #[test]
    fn test_initiate_prompt_without_relations() {
        let prompt = initiate_prompt("Alice", "Acme", &[]);
        assert!(prompt.contains("no registered colleagues"));
    }

    #[test]
    fn test_continue_prompt_nudges_unmentioned() {
        let relations = [relation("Bob", "peer"), relation("Carol", "manager")];
        let prompt = continue_prompt(&relations, "bob is very supportive");
        assert!(prompt.contains("Carol"));
        assert!(!prompt.contains("Bob"));
    }

    #[test]
    fn test_continue_prompt_all_mentioned() {
        let relations = [relation("Bob", "peer")];
        let prompt = continue_prompt(&relations, "Bob is great");
        assert!(prompt.starts_with("Thanks, noted. Anything else?"));
    }

    #[test]
    fn test_extraction_prompt_carries_ids_and_text() {
        let bob = relation("Bob", "peer");
        let prompt = build_extraction_prompt("Alice", "Acme", &[bob.clone()], "Bob helps a lot");
        assert!(prompt.contains(&bob.user_id.to_string()));
        assert!(prompt.contains("Bob helps a lot"));
        assert!(prompt.contains("Person_GrowthSupport"));
        assert!(!prompt.contains("{feedback_text}"));
    }
}
