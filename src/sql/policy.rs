use log::debug;
use sqlparser::{
    dialect::SQLiteDialect,
    tokenizer::{Token, Tokenizer, Whitespace},
};

use crate::{
    core::{ErrorKind, SQLError},
    lesson::ExerciseMode,
};

/// Statement categories refused for lessons that only read data.
pub const READ_ONLY_DENYLIST: &[&str] =
    &["insert", "update", "delete", "drop", "alter", "create", "attach"];

/// Mutation-teaching lessons may alter their private copy, but never reach
/// outside it.
pub const MUTATION_DENYLIST: &[&str] = &["attach"];

pub const DEFAULT_MAX_JOINS: usize = 3;

/// Pre-execution filter applied to every statement, student or reference.
#[derive(Debug, Clone, Copy)]
pub struct PolicyGuard {
    max_joins: usize,
}

impl Default for PolicyGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_JOINS)
    }
}

impl PolicyGuard {
    pub fn new(max_joins: usize) -> Self {
        Self { max_joins }
    }

    pub fn denylist(mode: ExerciseMode) -> &'static [&'static str] {
        match mode {
            ExerciseMode::ReadOnly => READ_ONLY_DENYLIST,
            ExerciseMode::MutationTeaching => MUTATION_DENYLIST,
        }
    }

    /// Returns the statement unchanged when it passes the rules for `mode`.
    pub fn check<'a>(&self, statement: &'a str, mode: ExerciseMode) -> Result<&'a str, SQLError> {
        let words = match keywords(statement) {
            Some(words) => Classified::Tokens(words),
            None => {
                debug!("Statement does not tokenize, matching on raw text");
                Classified::Text(statement.to_lowercase())
            }
        };

        if let Some(token) = Self::denylist(mode).iter().find(|t| words.contains(t)) {
            return Err(SQLError::new(
                ErrorKind::PolicyViolation,
                format!("Operation not allowed: {token}"),
            ));
        }

        if words.count("join") > self.max_joins {
            return Err(SQLError::new(ErrorKind::PolicyViolation, "Too many JOINs"));
        }

        Ok(statement)
    }
}

enum Classified {
    /// Lower-cased unquoted words of a statement that tokenized cleanly.
    Tokens(Vec<String>),
    /// Lower-cased raw text, matched by substring.
    Text(String),
}

impl Classified {
    fn contains(&self, token: &str) -> bool {
        match self {
            Classified::Tokens(words) => words.iter().any(|w| w == token),
            Classified::Text(text) => text.contains(token),
        }
    }

    fn count(&self, token: &str) -> usize {
        match self {
            Classified::Tokens(words) => words.iter().filter(|w| *w == token).count(),
            Classified::Text(text) => text.matches(token).count(),
        }
    }
}

/// Unquoted words of `statement`, lower-cased. Literals, quoted identifiers
/// and comments are not words. `None` if the statement does not tokenize
/// the way SQLite would read it.
fn keywords(statement: &str) -> Option<Vec<String>> {
    let dialect = SQLiteDialect {};
    let tokens = Tokenizer::new(&dialect, statement).tokenize().ok()?;
    // SQLite ends a block comment at the first `*/`, sqlparser nests them.
    let nested_comment = tokens.iter().any(|token| {
        matches!(token, Token::Whitespace(Whitespace::MultiLineComment(body)) if body.contains("/*"))
    });
    if nested_comment {
        return None;
    }
    Some(
        tokens
            .into_iter()
            .filter_map(|token| match token {
                Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_lowercase()),
                _ => None,
            })
            .collect(),
    )
}
