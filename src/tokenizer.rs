use crate::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    And,
    Array,
    Begin,
    Boolean,
    Char,
    Div,
    Do,
    Else,
    End,
    False,
    If,
    Integer,
    Mod,
    Not,
    Of,
    Or,
    Procedure,
    Program,
    Readln,
    Then,
    True,
    Var,
    While,
    Writeln,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    GreatEqual,
    Great,
    Plus,
    Minus,
    Star,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Semicolon,
    Colon,
    Range,
    Assign,
    Comma,
    Dot,
    Identifier,
    Constant,
    Str,
    Eof,
}

// Stream names in id order; the position in this table is the token id.
const KIND_NAMES: [(TokenKind, &str); 46] = [
    (TokenKind::And, "SAND"),
    (TokenKind::Array, "SARRAY"),
    (TokenKind::Begin, "SBEGIN"),
    (TokenKind::Boolean, "SBOOLEAN"),
    (TokenKind::Char, "SCHAR"),
    (TokenKind::Div, "SDIVD"),
    (TokenKind::Do, "SDO"),
    (TokenKind::Else, "SELSE"),
    (TokenKind::End, "SEND"),
    (TokenKind::False, "SFALSE"),
    (TokenKind::If, "SIF"),
    (TokenKind::Integer, "SINTEGER"),
    (TokenKind::Mod, "SMOD"),
    (TokenKind::Not, "SNOT"),
    (TokenKind::Of, "SOF"),
    (TokenKind::Or, "SOR"),
    (TokenKind::Procedure, "SPROCEDURE"),
    (TokenKind::Program, "SPROGRAM"),
    (TokenKind::Readln, "SREADLN"),
    (TokenKind::Then, "STHEN"),
    (TokenKind::True, "STRUE"),
    (TokenKind::Var, "SVAR"),
    (TokenKind::While, "SWHILE"),
    (TokenKind::Writeln, "SWRITELN"),
    (TokenKind::Equal, "SEQUAL"),
    (TokenKind::NotEqual, "SNOTEQUAL"),
    (TokenKind::Less, "SLESS"),
    (TokenKind::LessEqual, "SLESSEQUAL"),
    (TokenKind::GreatEqual, "SGREATEQUAL"),
    (TokenKind::Great, "SGREAT"),
    (TokenKind::Plus, "SPLUS"),
    (TokenKind::Minus, "SMINUS"),
    (TokenKind::Star, "SSTAR"),
    (TokenKind::LeftParen, "SLPAREN"),
    (TokenKind::RightParen, "SRPAREN"),
    (TokenKind::LeftBracket, "SLBRACKET"),
    (TokenKind::RightBracket, "SRBRACKET"),
    (TokenKind::Semicolon, "SSEMICOLON"),
    (TokenKind::Colon, "SCOLON"),
    (TokenKind::Range, "SRANGE"),
    (TokenKind::Assign, "SASSIGN"),
    (TokenKind::Comma, "SCOMMA"),
    (TokenKind::Dot, "SDOT"),
    (TokenKind::Identifier, "SIDENTIFIER"),
    (TokenKind::Constant, "SCONSTANT"),
    (TokenKind::Str, "SSTRING"),
];

const KEYWORDS: [(&str, TokenKind); 24] = [
    ("and", TokenKind::And),
    ("array", TokenKind::Array),
    ("begin", TokenKind::Begin),
    ("boolean", TokenKind::Boolean),
    ("char", TokenKind::Char),
    ("div", TokenKind::Div),
    ("do", TokenKind::Do),
    ("else", TokenKind::Else),
    ("end", TokenKind::End),
    ("false", TokenKind::False),
    ("if", TokenKind::If),
    ("integer", TokenKind::Integer),
    ("mod", TokenKind::Mod),
    ("not", TokenKind::Not),
    ("of", TokenKind::Of),
    ("or", TokenKind::Or),
    ("procedure", TokenKind::Procedure),
    ("program", TokenKind::Program),
    ("readln", TokenKind::Readln),
    ("then", TokenKind::Then),
    ("true", TokenKind::True),
    ("var", TokenKind::Var),
    ("while", TokenKind::While),
    ("writeln", TokenKind::Writeln),
];

impl TokenKind {
    /// Name used in the token-stream format, e.g. `SIDENTIFIER`.
    pub fn name(self) -> &'static str {
        KIND_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("SEOF", |(_, name)| name)
    }

    pub fn id(self) -> Option<usize> {
        KIND_NAMES.iter().position(|(kind, _)| *kind == self)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        KIND_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(kind, _)| *kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind, line: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            line,
        }
    }

    pub fn eof(line: usize) -> Self {
        Self::new("", TokenKind::Eof, line)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tokenizer {
    pub source: Vec<u8>,
    pub index: usize,
    pub line: usize,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.bytes().collect(),
            index: 0,
            line: 1,
        }
    }

    pub fn tokenize(&mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = vec![];
        while let Some(c) = self.peek() {
            match c {
                b'\'' => tokens.push(self.string()?),
                b'0'..=b'9' => tokens.push(self.number()),
                b'a'..=b'z' | b'A'..=b'Z' => tokens.push(self.ident()),
                b' ' | b'\t' | b'\r' => self.advance(),
                b'\n' => self.newline(),
                b'{' => self.handle_comment()?,
                c => tokens.push(self.punct(c)?),
            }
        }
        tokens.push(Token::eof(self.line));

        Ok(tokens)
    }

    // comment = "{" any* "}", may span lines
    fn handle_comment(&mut self) -> CompileResult<()> {
        let opened_at = self.line;
        self.advance();
        while let Some(c) = self.peek() {
            match c {
                b'}' => {
                    self.advance();
                    return Ok(());
                }
                b'\n' => self.newline(),
                _ => self.advance(),
            }
        }
        Err(CompileError::Lexical {
            line: opened_at,
            message: "{ is not closed".to_string(),
        })
    }

    fn ident(&mut self) -> Token {
        let start = self.index;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }
        let text = self.text(start);
        let kind = KEYWORDS
            .iter()
            .find(|(word, _)| *word == text)
            .map_or(TokenKind::Identifier, |(_, kind)| *kind);
        Token::new(text, kind, self.line)
    }

    fn number(&mut self) -> Token {
        let start = self.index;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        Token::new(self.text(start), TokenKind::Constant, self.line)
    }

    // string = "'" (any | "''")* "'", on a single line
    fn string(&mut self) -> CompileResult<Token> {
        let start = self.index;
        self.advance();
        loop {
            match self.peek() {
                Some(b'\'') if self.peek_next() == Some(b'\'') => self.advance_n(2),
                Some(b'\'') => {
                    self.advance();
                    break;
                }
                Some(b'\n') | None => {
                    return Err(CompileError::Lexical {
                        line: self.line,
                        message: "' is not closed".to_string(),
                    })
                }
                // The token stream separates columns with tabs.
                Some(b'\t') => {
                    return Err(CompileError::Lexical {
                        line: self.line,
                        message: "tab in a string".to_string(),
                    })
                }
                Some(_) => self.advance(),
            }
        }
        Ok(Token::new(self.text(start), TokenKind::Str, self.line))
    }

    fn punct(&mut self, c: u8) -> CompileResult<Token> {
        let start = self.index;
        let kind = match (c, self.peek_next()) {
            (b'<', Some(b'>')) => TokenKind::NotEqual,
            (b'<', Some(b'=')) => TokenKind::LessEqual,
            (b'>', Some(b'=')) => TokenKind::GreatEqual,
            (b':', Some(b'=')) => TokenKind::Assign,
            (b'.', Some(b'.')) => TokenKind::Range,
            (b'=', _) => TokenKind::Equal,
            (b'<', _) => TokenKind::Less,
            (b'>', _) => TokenKind::Great,
            (b'+', _) => TokenKind::Plus,
            (b'-', _) => TokenKind::Minus,
            (b'*', _) => TokenKind::Star,
            (b'/', _) => TokenKind::Div,
            (b'(', _) => TokenKind::LeftParen,
            (b')', _) => TokenKind::RightParen,
            (b'[', _) => TokenKind::LeftBracket,
            (b']', _) => TokenKind::RightBracket,
            (b';', _) => TokenKind::Semicolon,
            (b':', _) => TokenKind::Colon,
            (b',', _) => TokenKind::Comma,
            (b'.', _) => TokenKind::Dot,
            _ => {
                return Err(CompileError::Lexical {
                    line: self.line,
                    message: format!(
                        "undefined token that begins with \"{}\" is included",
                        c as char
                    ),
                })
            }
        };
        let length = match kind {
            TokenKind::NotEqual
            | TokenKind::LessEqual
            | TokenKind::GreatEqual
            | TokenKind::Assign
            | TokenKind::Range => 2,
            _ => 1,
        };
        self.advance_n(length);
        Ok(Token::new(self.text(start), kind, self.line))
    }

    fn text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.source[start..self.index]).to_string()
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn advance_n(&mut self, steps: usize) {
        self.index += steps;
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.get(self.index + 1).copied()
    }

    fn newline(&mut self) {
        self.advance();
        self.line += 1;
    }
}

pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    Tokenizer::new(source).tokenize()
}
