//! Turns source text into a stream of tokens, one per call
//!
//! The lexer is a single pass over an indexed character buffer. It never
//! fails: anything it does not recognize comes back as a
//! [`TokenKind::Unknown`] token carrying the offending character, which the
//! parser rejects later. Line comments are not recognized here; the driver
//! strips `//` comments before the source reaches the lexer.

/// Lexical category of a [`Token`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// The `int` keyword
    Int,
    /// The `if` keyword
    If,
    Identifier,
    IntegerLiteral,
    /// A lone `=`
    Assign,
    Plus,
    Minus,
    /// The `==` comparison operator
    Equal,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Eof,
    /// A character with no lexical meaning
    Unknown,
}

/// A token: its kind plus the matched source text (empty for EOF)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>) -> Token {
        Token {
            kind,
            lexeme: lexeme.into(),
        }
    }
}

/// A cursor over the source characters
pub struct Lexer {
    source: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a lexer over the given source text
    pub fn new(source: &str) -> Lexer {
        Lexer {
            source: source.chars().collect(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let current = self.peek();
        if current.is_some() {
            self.position += 1;
        }
        current
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.advance();
        }
    }

    /// Accumulate a maximal run of characters matching the predicate
    fn take_while<P>(&mut self, pred: P) -> String
    where
        P: Fn(char) -> bool,
    {
        let mut lexeme = String::new();
        while self.peek().is_some_and(&pred) {
            // The predicate matched, so the character is there to take
            lexeme.push(self.advance().unwrap());
        }
        lexeme
    }

    /// Produce the next token from the source
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let current = match self.peek() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, ""),
        };

        if current.is_ascii_digit() {
            let number = self.take_while(|c| c.is_ascii_digit());
            return Token::new(TokenKind::IntegerLiteral, number);
        }

        if current.is_ascii_alphabetic() || current == '_' {
            let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let kind = match word.as_str() {
                "int" => TokenKind::Int,
                "if" => TokenKind::If,
                _ => TokenKind::Identifier,
            };
            return Token::new(kind, word);
        }

        self.advance();
        match current {
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::Equal, "==")
                } else {
                    Token::new(TokenKind::Assign, "=")
                }
            }
            '+' => Token::new(TokenKind::Plus, "+"),
            '-' => Token::new(TokenKind::Minus, "-"),
            '(' => Token::new(TokenKind::LParen, "("),
            ')' => Token::new(TokenKind::RParen, ")"),
            '{' => Token::new(TokenKind::LBrace, "{"),
            '}' => Token::new(TokenKind::RBrace, "}"),
            ';' => Token::new(TokenKind::Semicolon, ";"),
            _ => Token::new(TokenKind::Unknown, current.to_string()),
        }
    }
}

/// Tokenize an entire source string. The returned stream always ends with
/// exactly one EOF token
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}
