//! Tokenizer for filter expressions
//!
//! Splits query text into words, quoted strings, `field:value` terms,
//! parentheses and the `OR` keyword. Values are not interpreted here.

use super::FilterError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Unquoted word
    Word(String),
    /// Double-quoted string with escapes resolved
    Quoted(String),
    /// `name:value`. `quoted` is set when the value was written in quotes,
    /// in which case it is taken literally (no operators or ranges).
    Field {
        name: String,
        value: String,
        quoted: bool,
    },
    /// `OR` keyword (case-insensitive, whole word, unquoted)
    Or,
    LParen,
    RParen,
}

pub(crate) struct Lexer<'src> {
    chars: std::iter::Peekable<std::str::Chars<'src>>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            chars: source.chars().peekable(),
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>, FilterError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, FilterError> {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}

        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };

        let token = match c {
            '(' => {
                self.chars.next();
                Token::LParen
            }
            ')' => {
                self.chars.next();
                Token::RParen
            }
            '"' => Token::Quoted(self.scan_quoted()?),
            _ => self.scan_word()?,
        };
        Ok(Some(token))
    }

    fn scan_quoted(&mut self) -> Result<String, FilterError> {
        // opening quote
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(FilterError::UnterminatedQuote),
                Some('"') => return Ok(out),
                Some('\\') => match self.chars.next() {
                    Some(escaped @ ('"' | '\\')) => out.push(escaped),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(FilterError::UnterminatedQuote),
                },
                Some(other) => out.push(other),
            }
        }
    }

    fn scan_word(&mut self) -> Result<Token, FilterError> {
        let mut word = String::new();
        while let Some(c) = self
            .chars
            .next_if(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '"'))
        {
            word.push(c);
        }

        if let Some((name, value)) = word.split_once(':') {
            if is_field_name(name) {
                let name = name.to_string();
                // `cat:"Dining & Drinks"`
                if value.is_empty() && self.chars.peek() == Some(&'"') {
                    let value = self.scan_quoted()?;
                    return Ok(Token::Field {
                        name,
                        value,
                        quoted: true,
                    });
                }
                return Ok(Token::Field {
                    name,
                    value: value.to_string(),
                    quoted: false,
                });
            }
        }

        if word.eq_ignore_ascii_case("or") {
            return Ok(Token::Or);
        }
        Ok(Token::Word(word))
    }
}

/// A run of ASCII letters/underscores before `:` is treated as a field name.
/// Anything else (e.g. `12:30`) stays a plain word.
fn is_field_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic() || c == '_')
}
