//! Prompt builder for per-file review.
//!
//! Combines a file's rendered diff with optional related context and asks
//! the model for zero or more ANCHOR/SEVERITY/TITLE/BODY/PATCH blocks,
//! parsed downstream by [`super::policy`].

use super::context::PrimaryContext;

/// Final prompt we send to the LLM provider.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const SYSTEM: &str = r#"You are a senior code reviewer.
Review only the added/changed lines shown in the diff; do not comment on unrelated code.
Be concise and actionable — prefer specific, minimal suggestions over generic advice.
Respect the project's existing style; do not propose unrelated reformatting.
If the change looks correct, emit no blocks.

Respond with zero or more blocks, each shaped exactly like:
ANCHOR: <start>-<end>
SEVERITY: High|Medium|Low
TITLE: <one line>
BODY: <short explanation>
PATCH: ```diff
<optional unified diff suggestion>
```

<start>-<end> must be new-file line numbers and must fall entirely inside one
of the allowed windows listed below."#;

/// Assemble a system+user prompt pair for one changed file.
pub fn build_prompt(primary: &PrimaryContext, related: &str) -> Prompt {
    let windows = primary
        .allowed
        .iter()
        .map(|a| format!("{}-{}", a.start, a.end))
        .collect::<Vec<_>>()
        .join(", ");

    let related_section = if related.trim().is_empty() {
        String::new()
    } else {
        format!("\n\n# Related Context\n{}\n", related)
    };

    let user = format!(
        "# File\n{}\n\n# Allowed anchor windows\n{}\n\n# Diff\n```\n{}\n```{}\n",
        primary.path, windows, primary.diff_text, related_section
    );

    Prompt {
        system: SYSTEM.to_string(),
        user,
    }
}
