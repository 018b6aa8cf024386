//! Query parsing and FTS5 MATCH rendering
//!
//! User input is tokenized into terms, phrases, boolean operators, groups and
//! NEAR constructs, validated, and rendered back as a MATCH expression where
//! every term is quoted. Quoting keeps FTS5 from interpreting punctuation
//! (`INV-2024-001`, `c++`, `a:b`) as query syntax.

use crate::{Error, Result};
use std::collections::HashMap;

/// A word or quoted phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    pub prefix: bool,
    pub phrase: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Term(Term),
    And,
    Or,
    Not,
    Near,
    LParen,
    RParen,
    NearGroup {
        terms: Vec<Term>,
        distance: Option<usize>,
    },
}

/// Rendering knobs for [`ParsedQuery::to_fts`]
#[derive(Debug, Default)]
pub struct RenderOptions<'a> {
    pub near_distance: usize,
    /// Restrict every atom to one column (`clean_content` for `--clean`)
    pub column: Option<&'a str>,
    /// Lowercased bare word -> fuzzy alternatives
    pub expansions: Option<&'a HashMap<String, Vec<String>>>,
}

/// A validated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    tokens: Vec<Token>,
}

impl ParsedQuery {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = lex(input)?;
        let tokens = merge_near(tokens)?;
        let tokens = validate(tokens)?;
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Every term text, lowercased, in query order
    pub fn terms(&self) -> Vec<String> {
        let mut out = Vec::new();
        for token in &self.tokens {
            match token {
                Token::Term(t) => out.push(t.text.to_lowercase()),
                Token::NearGroup { terms, .. } => {
                    out.extend(terms.iter().map(|t| t.text.to_lowercase()))
                }
                _ => {}
            }
        }
        out
    }

    /// Unquoted, non-prefix words outside NEAR groups; candidates for fuzzy expansion
    pub fn bare_words(&self) -> Vec<String> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Term(term) if !term.phrase && !term.prefix => Some(term.text.to_lowercase()),
                _ => None,
            })
            .collect()
    }

    /// Render as an FTS5 MATCH expression
    pub fn to_fts(&self, opts: &RenderOptions<'_>) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.tokens.len());

        for token in &self.tokens {
            let part = match token {
                Token::Term(term) => with_column(opts.column, render_term(term, opts.expansions)),
                Token::NearGroup { terms, distance } => {
                    let inner = terms.iter().map(quote_term).collect::<Vec<_>>().join(" ");
                    let group = format!(
                        "NEAR({}, {})",
                        inner,
                        distance.unwrap_or(opts.near_distance)
                    );
                    with_column(opts.column, group)
                }
                Token::And => "AND".to_string(),
                Token::Or => "OR".to_string(),
                Token::Not => "NOT".to_string(),
                Token::LParen => "(".to_string(),
                Token::RParen => ")".to_string(),
                Token::Near => continue,
            };
            parts.push(part);
        }

        parts.join(" ")
    }
}

fn with_column(column: Option<&str>, atom: String) -> String {
    match column {
        Some(col) => format!("{} : {}", col, atom),
        None => atom,
    }
}

fn quote_term(term: &Term) -> String {
    let mut out = format!("\"{}\"", term.text.replace('"', "\"\""));
    if term.prefix {
        out.push('*');
    }
    out
}

fn render_term(term: &Term, expansions: Option<&HashMap<String, Vec<String>>>) -> String {
    let quoted = quote_term(term);
    if term.phrase || term.prefix {
        return quoted;
    }
    match expansions.and_then(|e| e.get(&term.text.to_lowercase())) {
        Some(alts) if !alts.is_empty() => {
            let mut options = vec![quoted];
            options.extend(alts.iter().map(|a| format!("\"{}\"", a.replace('"', "\"\""))));
            format!("({})", options.join(" OR "))
        }
        _ => quoted,
    }
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == '"')
                    .map(|p| i + 1 + p)
                    .ok_or_else(|| Error::Query("unterminated quote".to_string()))?;
                let text: String = chars[i + 1..end].iter().collect();
                i = end + 1;
                let prefix = chars.get(i) == Some(&'*');
                if prefix {
                    i += 1;
                }
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if has_alnum(&text) {
                    tokens.push(Token::Term(Term { text, prefix, phrase: true }));
                }
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '(' | ')' | '"') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                if word == "NEAR" && chars.get(i) == Some(&'(') {
                    let close = chars[i + 1..]
                        .iter()
                        .position(|&ch| ch == ')')
                        .map(|p| i + 1 + p)
                        .ok_or_else(|| Error::Query("unclosed NEAR(".to_string()))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    tokens.push(lex_near_group(&inner)?);
                    i = close + 1;
                    continue;
                }

                match word.as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    "NOT" => tokens.push(Token::Not),
                    "NEAR" => tokens.push(Token::Near),
                    _ => {
                        let prefix = word.ends_with('*');
                        let text = word.trim_end_matches('*').to_string();
                        if has_alnum(&text) {
                            tokens.push(Token::Term(Term { text, prefix, phrase: false }));
                        }
                    }
                }
            }
        }
    }

    Ok(tokens)
}

fn lex_near_group(inner: &str) -> Result<Token> {
    let (body, distance) = match inner.rsplit_once(',') {
        Some((body, n)) => {
            let n = n
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::Query(format!("invalid NEAR distance '{}'", n.trim())))?;
            (body, Some(n))
        }
        None => (inner, None),
    };

    let mut terms = Vec::new();
    for token in lex(body)? {
        match token {
            Token::Term(t) => terms.push(t),
            _ => return Err(Error::Query("NEAR() may only contain terms".to_string())),
        }
    }
    if terms.is_empty() {
        return Err(Error::Query("empty NEAR()".to_string()));
    }
    Ok(Token::NearGroup { terms, distance })
}

/// `a NEAR b NEAR c` -> one NEAR group
fn merge_near(tokens: Vec<Token>) -> Result<Vec<Token>> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if token != Token::Near {
            out.push(token);
            continue;
        }

        let right = match iter.next() {
            Some(Token::Term(t)) => t,
            _ => return Err(Error::Query("NEAR needs a term on both sides".to_string())),
        };
        match out.pop() {
            Some(Token::Term(left)) => out.push(Token::NearGroup {
                terms: vec![left, right],
                distance: None,
            }),
            Some(Token::NearGroup { mut terms, distance }) => {
                terms.push(right);
                out.push(Token::NearGroup { terms, distance });
            }
            _ => return Err(Error::Query("NEAR needs a term on both sides".to_string())),
        }
    }
    Ok(out)
}

fn validate(tokens: Vec<Token>) -> Result<Vec<Token>> {
    #[derive(PartialEq)]
    enum Prev {
        Start,
        Operand,
        Operator,
        Open,
    }

    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut prev = Prev::Start;
    let mut depth = 0usize;
    let mut operands = 0usize;

    for token in tokens {
        match token {
            Token::Term(_) | Token::NearGroup { .. } => {
                operands += 1;
                prev = Prev::Operand;
                out.push(token);
            }
            Token::LParen => {
                depth += 1;
                prev = Prev::Open;
                out.push(token);
            }
            Token::RParen => {
                if depth == 0 {
                    return Err(Error::Query("unbalanced ')'".to_string()));
                }
                if prev != Prev::Operand {
                    return Err(Error::Query("empty group or dangling operator before ')'".to_string()));
                }
                depth -= 1;
                out.push(token);
            }
            Token::Not if out.last() == Some(&Token::And) => {
                // `a AND NOT b` is spelled `a NOT b` in FTS5
                out.pop();
                out.push(Token::Not);
                prev = Prev::Operator;
            }
            Token::Not if prev != Prev::Operand => {
                // FTS5 NOT is binary: it subtracts from the matches on its left
                return Err(Error::Query(
                    "NOT must follow a positive term, as in `budget NOT draft`".to_string(),
                ));
            }
            Token::And | Token::Or | Token::Not => {
                if prev != Prev::Operand {
                    let name = if token == Token::And { "AND" } else { "OR" };
                    return Err(Error::Query(format!("{} must follow a term", name)));
                }
                prev = Prev::Operator;
                out.push(token);
            }
            Token::Near => return Err(Error::Query("NEAR needs a term on both sides".to_string())),
        }
    }

    if operands == 0 {
        return Err(Error::Query("query has no search terms".to_string()));
    }
    if depth != 0 {
        return Err(Error::Query("unbalanced '('".to_string()));
    }
    if prev == Prev::Operator {
        return Err(Error::Query("query ends with an operator".to_string()));
    }
    Ok(out)
}

fn has_alnum(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}
