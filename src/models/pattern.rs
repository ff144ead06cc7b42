use serde::{Deserialize, Serialize};
use std::fmt;

/// Case-insensitive LIKE-style pattern for food names.
///
/// `%` matches any run of characters and `_` matches exactly one. A query
/// without wildcards matches names containing it anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePattern {
    pattern: String,
}

impl NamePattern {
    pub fn parse(query: &str) -> Self {
        let trimmed = query.trim().to_lowercase();
        let pattern = if trimmed.contains(|c: char| c == '%' || c == '_') {
            trimmed
        } else {
            format!("%{}%", trimmed)
        };
        Self { pattern }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, name: &str) -> bool {
        let pattern: Vec<char> = self.pattern.chars().collect();
        let name: Vec<char> = name.to_lowercase().chars().collect();
        like_match(&pattern, &name)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

// Iterative wildcard match with single-star backtracking.
fn like_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
