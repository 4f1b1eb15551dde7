//! Fact interpolation for plan values.
//!
//! Plan strings may reference host facts using `${fact}` syntax.
//!
//! # Syntax
//!
//! - `${home}`, `${user}`, `${shell}` - replaced with the resolved fact
//! - `$${escaped}` - produces literal `${escaped}` in output
//!
//! # Example
//!
//! ```yaml
//! dest: "${home}/.dotfiles"
//! # With home=/home/dev, produces: /home/dev/.dotfiles
//! ```

use crate::error::{Result, RigupError};
use crate::facts::HostFacts;

/// A segment of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Fact reference: ${name}
    Fact(String),
}

/// Parse a string containing `${fact}` interpolations.
pub fn parse_interpolation(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current_literal = String::new();

    while let Some(c) = chars.next() {
        if c == '$' {
            match chars.peek() {
                Some('$') => {
                    // Escaped: $$ becomes $
                    chars.next();
                    if chars.peek() == Some(&'{') {
                        // $${...} -> literal ${...}
                        chars.next();
                        current_literal.push('$');
                        current_literal.push('{');
                        while let Some(&c) = chars.peek() {
                            chars.next();
                            current_literal.push(c);
                            if c == '}' {
                                break;
                            }
                        }
                    } else {
                        current_literal.push('$');
                    }
                }
                Some('{') => {
                    chars.next();

                    if !current_literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                    }

                    let mut name = String::new();
                    while let Some(c) = chars.next() {
                        if c == '}' {
                            break;
                        }
                        name.push(c);
                    }

                    segments.push(Segment::Fact(name));
                }
                _ => {
                    current_literal.push(c);
                }
            }
        } else {
            current_literal.push(c);
        }
    }

    if !current_literal.is_empty() {
        segments.push(Segment::Literal(current_literal));
    }

    segments
}

/// Resolve all `${fact}` references in a string against the host facts.
///
/// # Errors
///
/// Returns [`RigupError::UnknownFact`] when the string references a fact
/// the host did not resolve (including `${shell}` on hosts with no SHELL
/// in the environment).
pub fn resolve_string(input: &str, facts: &HostFacts) -> Result<String> {
    let mut result = String::with_capacity(input.len());

    for segment in parse_interpolation(input) {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Fact(name) => {
                let value = facts.get(&name).ok_or_else(|| RigupError::UnknownFact {
                    name: name.clone(),
                    input: input.to_string(),
                })?;
                result.push_str(&value);
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn facts() -> HostFacts {
        HostFacts {
            home: PathBuf::from("/home/dev"),
            user: "dev".to_string(),
            login_shell: Some(PathBuf::from("/bin/bash")),
            elevated: false,
        }
    }

    #[test]
    fn parse_plain_literal() {
        let segments = parse_interpolation("no facts here");
        assert_eq!(segments, vec![Segment::Literal("no facts here".to_string())]);
    }

    #[test]
    fn parse_single_fact() {
        let segments = parse_interpolation("${home}/.dotfiles");
        assert_eq!(
            segments,
            vec![
                Segment::Fact("home".to_string()),
                Segment::Literal("/.dotfiles".to_string()),
            ]
        );
    }

    #[test]
    fn parse_escaped_reference() {
        let segments = parse_interpolation("$${home}");
        assert_eq!(segments, vec![Segment::Literal("${home}".to_string())]);
    }

    #[test]
    fn parse_lone_dollar() {
        let segments = parse_interpolation("echo $PATH");
        assert_eq!(segments, vec![Segment::Literal("echo $PATH".to_string())]);
    }

    #[test]
    fn resolve_home_and_user() {
        let result = resolve_string("chown ${user} ${home}/.zshrc", &facts()).unwrap();
        assert_eq!(result, "chown dev /home/dev/.zshrc");
    }

    #[test]
    fn resolve_unknown_fact_errors() {
        let err = resolve_string("${hostname}", &facts()).unwrap_err();
        assert!(matches!(err, RigupError::UnknownFact { .. }));
        assert!(err.to_string().contains("hostname"));
    }

    #[test]
    fn resolve_missing_shell_errors() {
        let mut facts = facts();
        facts.login_shell = None;
        let err = resolve_string("${shell}", &facts).unwrap_err();
        assert!(matches!(err, RigupError::UnknownFact { .. }));
    }

    #[test]
    fn resolve_escaped_passes_through() {
        let result = resolve_string("echo $${home}", &facts()).unwrap();
        assert_eq!(result, "echo ${home}");
    }

    #[test]
    fn resolve_shell_env_vars_untouched() {
        // Plain shell variables use bare $ and must survive interpolation.
        let result = resolve_string("export PATH=$PATH:${home}/bin", &facts()).unwrap();
        assert_eq!(result, "export PATH=$PATH:/home/dev/bin");
    }
}
