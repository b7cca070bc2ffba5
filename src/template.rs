//! Template engine for `{{variable}}` substitution.
//!
//! Prompt slot texts reference variables with double-brace placeholders
//! (`{{featureId}}`, `{{previousContext}}`, ...). Rendering substitutes each
//! placeholder from a supplied variable context and reports the names it
//! could not resolve; it never fails outright.
//!
//! # Syntax
//!
//! - `{{name}}` - Substitutes the value of variable `name`. Whitespace
//!   around the name is tolerated (`{{ name }}`).
//! - Anything else, including an unclosed `{{`, a lone `{`, or an empty
//!   `{{}}`, passes through literally and is not reported as missing.
//!
//! # Semantics
//!
//! - A placeholder whose variable is absent from the context is left in the
//!   output verbatim and its name is recorded in [`Rendered::missing`].
//!   Callers decide whether that is acceptable for a given slot.
//! - Substitution is textual and single-pass: a substituted value is never
//!   re-scanned for placeholders, so values containing `{{...}}` cannot
//!   trigger further expansion.

use std::collections::{BTreeSet, HashMap};

/// Variables supplied to a render call, name to value.
pub type VariableContext = HashMap<String, String>;

/// The outcome of rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    /// The template with every resolvable placeholder substituted.
    pub text: String,
    /// Names of placeholders that had no value in the context.
    pub missing: BTreeSet<String>,
}

impl Rendered {
    /// True when every placeholder in the template was resolved.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Render a template string by substituting `{{variable}}` placeholders.
///
/// # Arguments
///
/// * `template` - The template string containing `{{variable}}` placeholders
/// * `context` - A map of variable names to their values
///
/// # Examples
///
/// ```
/// use automode::template::{render, vars};
///
/// let rendered = render("Hello {{name}}", &vars([("name", "World")]));
/// assert_eq!(rendered.text, "Hello World");
/// assert!(rendered.missing.is_empty());
///
/// let rendered = render("Hi {{x}}", &Default::default());
/// assert_eq!(rendered.text, "Hi {{x}}");
/// assert!(rendered.missing.contains("x"));
/// ```
pub fn render(template: &str, context: &VariableContext) -> Rendered {
    let mut text = String::with_capacity(template.len());
    let mut missing = BTreeSet::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        text.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        match after_open.find("}}") {
            Some(close) => {
                let raw_name = &after_open[..close];
                let name = raw_name.trim();

                if is_valid_name(name) {
                    match context.get(name) {
                        Some(value) => text.push_str(value),
                        None => {
                            // Unresolved: placeholder stays verbatim.
                            text.push_str(&rest[open..open + 2 + close + 2]);
                            missing.insert(name.to_string());
                        }
                    }
                } else {
                    // Empty or malformed name, literal passthrough.
                    text.push_str(&rest[open..open + 2 + close + 2]);
                }

                rest = &after_open[close + 2..];
            }
            None => {
                // Unclosed {{: everything from here on is literal.
                text.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    text.push_str(rest);
    Rendered { text, missing }
}

/// Extract the distinct variable names a template references.
///
/// Returns the trimmed names of every well-formed `{{name}}` placeholder,
/// in sorted order. Malformed placeholders are skipped, matching what
/// [`render`] would substitute.
pub fn extract_variables(template: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        match after_open.find("}}") {
            Some(close) => {
                let name = after_open[..close].trim();
                if is_valid_name(name) {
                    names.insert(name.to_string());
                }
                rest = &after_open[close + 2..];
            }
            None => break,
        }
    }

    names
}

/// A placeholder name must be non-empty and free of braces and newlines.
///
/// Content like `{{}}` or `{{a{b}}` is treated as literal text rather than
/// a placeholder, so a stray brace in prose cannot eat half the template.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['{', '}', '\n'])
}

/// Helper to create a variable context from a list of key-value pairs.
pub fn vars<I, K, V>(pairs: I) -> VariableContext
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
