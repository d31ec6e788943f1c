use std::fmt;

use crate::error::{Error, Result};

/// The atoms of the command language.
///
/// Keywords are not distinguished from identifiers here: the language is
/// positional, so whether `drop` is a keyword or a column name depends on
/// where it sits. Statement-level code asks [Token::is_word].
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word, lowercased: keyword, table/column name or literal.
    Word(String),
    /// A single-quoted literal, case and spaces preserved (e.g. `'Bob Dylan'`).
    Quoted(String),

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Wildcard `*`
    Star,
    /// Equal to
    Equal,
    /// Lower than
    Lower,
    /// Greater than
    Greater,
    /// Lower than or equal to
    LowerEqual,
    /// Greater than or equal to
    GreaterEqual,
}

impl Token {
    /// Returns true if this token is the bare word `word`.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Self::Word(w) if w == word)
    }

    /// The literal text of a word or quoted token.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Word(w) | Self::Quoted(w) => Some(w),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) => f.write_str(w),
            Self::Quoted(q) => write!(f, "'{q}'"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::Star => f.write_str("*"),
            Self::Equal => f.write_str("="),
            Self::Lower => f.write_str("<"),
            Self::Greater => f.write_str(">"),
            Self::LowerEqual => f.write_str("<="),
            Self::GreaterEqual => f.write_str(">="),
        }
    }
}

/// A lexical scanner that converts raw command text into a flat sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens.
    ///
    /// Commas separate like whitespace and produce no token.
    ///
    /// # Errors
    /// Returns a parse error on an unterminated quoted literal.
    ///
    /// # Example
    /// ```
    /// # use oxyrel::tokenizer::{Tokenizer, Token};
    /// let tokens = Tokenizer::new("SELECT * FROM t WHERE id>=2").tokenize().unwrap();
    /// assert_eq!(tokens[0], Token::Word("select".into()));
    /// assert_eq!(tokens[1], Token::Star);
    /// assert_eq!(tokens[6], Token::GreaterEqual);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_separators();

            if self.is_at_end() {
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token> {
        let token = match self.current_char() {
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '*' => Token::Star,
            '=' => Token::Equal,
            '<' => return Ok(self.read_comparison(Token::Lower, Token::LowerEqual)),
            '>' => return Ok(self.read_comparison(Token::Greater, Token::GreaterEqual)),
            '\'' => return self.read_quoted(),
            _ => return Ok(self.read_word()),
        };
        self.advance();
        Ok(token)
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_separators(&mut self) {
        while !self.is_at_end() && is_separator(self.current_char()) {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads `<` / `>`, folding a following `=` into the same token.
    fn read_comparison(&mut self, single: Token, with_equal: Token) -> Token {
        if self.peek_char() == Some('=') {
            self.position += 2;
            return with_equal;
        }
        self.advance();
        single
    }

    /// Reads a bare word up to the next separator or symbol and lowercases it.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        while !self.is_at_end() && !ends_word(self.current_char()) {
            word.push(self.current_char());
            self.advance();
        }

        Token::Word(word.to_lowercase())
    }

    /// Reads a literal enclosed in single quotes.
    fn read_quoted(&mut self) -> Result<Token> {
        self.advance(); // Skip the opening quote

        let mut text = String::new();
        while !self.is_at_end() && self.current_char() != '\'' {
            text.push(self.current_char());
            self.advance();
        }

        if self.is_at_end() {
            return Err(Error::parse("unterminated quoted literal"));
        }

        // Skip the closing quote
        self.advance();

        Ok(Token::Quoted(text))
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

fn ends_word(c: char) -> bool {
    is_separator(c) || matches!(c, '(' | ')' | '*' | '=' | '<' | '>' | '\'')
}

/// Tokenizes `input` in one call.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Tokenizer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str) -> Token {
        Token::Word(w.into())
    }

    #[test]
    fn test_tokenize_simple() {
        let tokens = tokenize("CREATE person").unwrap();

        assert_eq!(tokens, vec![word("create"), word("person")]);
    }

    #[test]
    fn test_tokenize_with_parens_and_commas() {
        let tokens = tokenize("(id,name)").unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::LeftParen,
                word("id"),
                word("name"),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_glued_operators() {
        let tokens = tokenize("id>0 and id<=5 or name=bob").unwrap();

        assert_eq!(
            tokens,
            vec![
                word("id"),
                Token::Greater,
                word("0"),
                word("and"),
                word("id"),
                Token::LowerEqual,
                word("5"),
                word("or"),
                word("name"),
                Token::Equal,
                word("bob"),
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers_stay_words() {
        let tokens = tokenize("-4 1.25").unwrap();

        assert_eq!(tokens, vec![word("-4"), word("1.25")]);
    }

    #[test]
    fn test_tokenize_quoted_keeps_case_and_spaces() {
        let tokens = tokenize("values ( 'Bob Dylan' )").unwrap();

        assert_eq!(
            tokens,
            vec![
                word("values"),
                Token::LeftParen,
                Token::Quoted("Bob Dylan".into()),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_multiline() {
        let tokens = tokenize("select *\n  from\tperson").unwrap();

        assert_eq!(
            tokens,
            vec![word("select"), Token::Star, word("from"), word("person")]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let result = tokenize("'hello");

        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_is_word_and_text() {
        assert!(word("alter").is_word("alter"));
        assert!(!Token::Quoted("alter".into()).is_word("alter"));
        assert_eq!(Token::Quoted("x".into()).text(), Some("x"));
        assert_eq!(Token::LeftParen.text(), None);
    }
}
