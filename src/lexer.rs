use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    If,
    Else,
    While,
    Do,
    For,
    Break,
    Continue,
    Return,
    Import,
    New,
    This,
    Super,
    True,
    False,
    Null,
}

impl Keyword {
    pub fn is_primitive_type(self) -> bool {
        matches!(
            self,
            Keyword::Boolean
                | Keyword::Char
                | Keyword::Byte
                | Keyword::Short
                | Keyword::Int
                | Keyword::Long
                | Keyword::Float
                | Keyword::Double
                | Keyword::Void
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumberLiteral {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number(NumberLiteral),
    String(String),
    Char(char),
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Question,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Ampersand,
    Pipe,
    Caret,
    DoubleAmpersand,
    DoublePipe,
    Bang,
    BangEqual,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

/// Pull-based lexer: tokens are produced on demand so a malformed character
/// late in the input does not prevent earlier units from running.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
            finished: false,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn peek_second(&mut self) -> Option<char> {
        self.peek();
        self.chars.clone().next().map(|(_, ch)| ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if let Some((idx, ch)) = self.peek() {
            if ch == expected {
                self.peeked = None;
                self.current = idx + ch.len_utf8();
                return true;
            }
        }
        false
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), Diagnostic> {
        loop {
            match self.peek() {
                Some((_, ch)) if ch.is_whitespace() => {
                    self.bump();
                }
                Some((start, '/')) => match self.peek_second() {
                    Some('/') => {
                        while let Some((_, ch)) = self.peek() {
                            if ch == '\n' {
                                break;
                            }
                            self.bump();
                        }
                    }
                    Some('*') => {
                        self.bump();
                        self.bump();
                        let mut closed = false;
                        while let Some((_, ch)) = self.bump() {
                            if ch == '*' && self.match_next('/') {
                                closed = true;
                                break;
                            }
                        }
                        if !closed {
                            return Err(Diagnostic::new(
                                DiagnosticKind::Lexer,
                                "unterminated block comment",
                            )
                            .with_span(SourceSpan::new(start, self.current))
                            .at_end_of_input());
                        }
                    }
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    fn identifier_or_keyword(&mut self, start: usize) -> Token {
        while let Some((_, ch)) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.bump();
            } else {
                break;
            }
        }
        let end = self.current;
        let lexeme = self.source[start..end].to_string();
        let kind = keyword_for(&lexeme).unwrap_or(TokenKind::Identifier);
        Token {
            kind,
            lexeme,
            span: SourceSpan { start, end },
        }
    }

    fn number_literal(&mut self, start: usize, first: char) -> Result<Token, Diagnostic> {
        if first == '0' && matches!(self.peek(), Some((_, 'x' | 'X'))) {
            self.bump();
            while let Some((_, ch)) = self.peek() {
                if ch.is_ascii_hexdigit() || ch == '_' {
                    self.bump();
                } else {
                    break;
                }
            }
            let digits = self.source[start + 2..self.current].replace('_', "");
            let long = self.match_next('L') || self.match_next('l');
            let span = SourceSpan::new(start, self.current);
            let kind = if long {
                i64::from_str_radix(&digits, 16).map(NumberLiteral::Long).ok()
            } else {
                u32::from_str_radix(&digits, 16)
                    .map(|n| NumberLiteral::Int(n as i32))
                    .ok()
            };
            return kind
                .map(|number| Token {
                    kind: TokenKind::Number(number),
                    lexeme: self.source[start..self.current].to_string(),
                    span,
                })
                .ok_or_else(|| {
                    Diagnostic::new(DiagnosticKind::Lexer, "malformed hexadecimal literal")
                        .with_span(span)
                });
        }

        let mut floating = false;
        while let Some((_, ch)) = self.peek() {
            match ch {
                '0'..='9' | '_' => {
                    self.bump();
                }
                '.' if !floating && self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                    floating = true;
                    self.bump();
                }
                'e' | 'E' => {
                    floating = true;
                    self.bump();
                    if let Some((_, '+' | '-')) = self.peek() {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
        let digits = self.source[start..self.current].replace('_', "");
        let suffix = match self.peek() {
            Some((_, ch @ ('L' | 'l' | 'F' | 'f' | 'D' | 'd'))) => {
                self.bump();
                Some(ch.to_ascii_lowercase())
            }
            _ => None,
        };
        let span = SourceSpan::new(start, self.current);
        let number = match (suffix, floating) {
            (Some('l'), false) => digits.parse().map(NumberLiteral::Long).ok(),
            (Some('f'), _) => digits.parse().map(NumberLiteral::Float).ok(),
            (Some('d'), _) | (None, true) => digits.parse().map(NumberLiteral::Double).ok(),
            (None, false) => digits.parse().map(NumberLiteral::Int).ok(),
            _ => None,
        };
        number
            .map(|number| Token {
                kind: TokenKind::Number(number),
                lexeme: self.source[start..self.current].to_string(),
                span,
            })
            .ok_or_else(|| {
                Diagnostic::new(
                    DiagnosticKind::Lexer,
                    format!("malformed numeric literal `{}`", &self.source[start..self.current]),
                )
                .with_span(span)
            })
    }

    fn escape(&mut self, start: usize) -> Result<char, Diagnostic> {
        match self.bump() {
            Some((_, 'n')) => Ok('\n'),
            Some((_, 'r')) => Ok('\r'),
            Some((_, 't')) => Ok('\t'),
            Some((_, '0')) => Ok('\0'),
            Some((_, '\'')) => Ok('\''),
            Some((_, '"')) => Ok('"'),
            Some((_, '\\')) => Ok('\\'),
            Some((idx, other)) => Err(Diagnostic::new(
                DiagnosticKind::Lexer,
                format!("invalid escape sequence `\\{other}`"),
            )
            .with_span(SourceSpan::new(idx - 1, idx + other.len_utf8()))),
            None => Err(
                Diagnostic::new(DiagnosticKind::Lexer, "unterminated escape sequence")
                    .with_span(SourceSpan::new(start, self.current)),
            ),
        }
    }

    fn string_literal(&mut self, start: usize) -> Result<Token, Diagnostic> {
        let mut value = String::new();
        while let Some((_, ch)) = self.bump() {
            match ch {
                '"' => {
                    return Ok(Token {
                        kind: TokenKind::String(value),
                        lexeme: self.source[start..self.current].to_string(),
                        span: SourceSpan::new(start, self.current),
                    });
                }
                '\\' => value.push(self.escape(start)?),
                '\n' => break,
                _ => value.push(ch),
            }
        }
        Err(
            Diagnostic::new(DiagnosticKind::Lexer, "unterminated string literal")
                .with_span(SourceSpan::new(start, self.current)),
        )
    }

    fn char_literal(&mut self, start: usize) -> Result<Token, Diagnostic> {
        let value = match self.bump() {
            Some((_, '\\')) => self.escape(start)?,
            Some((_, '\'')) | Some((_, '\n')) | None => {
                return Err(Diagnostic::new(DiagnosticKind::Lexer, "empty character literal")
                    .with_span(SourceSpan::new(start, self.current)));
            }
            Some((_, ch)) => ch,
        };
        if !self.match_next('\'') {
            return Err(
                Diagnostic::new(DiagnosticKind::Lexer, "unterminated character literal")
                    .with_span(SourceSpan::new(start, self.current)),
            );
        }
        Ok(Token {
            kind: TokenKind::Char(value),
            lexeme: self.source[start..self.current].to_string(),
            span: SourceSpan::new(start, self.current),
        })
    }

    fn simple_token(&mut self, start: usize, kind: TokenKind) -> Token {
        let end = self.current;
        Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan { start, end },
        }
    }

    fn either(&mut self, start: usize, next: char, matched: TokenKind, single: TokenKind) -> Token {
        if self.match_next(next) {
            self.simple_token(start, matched)
        } else {
            self.simple_token(start, single)
        }
    }

    /// Produces the next token, or `Eof` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Token, Diagnostic> {
        if self.finished {
            return Ok(self.eof());
        }
        self.skip_whitespace_and_comments()?;
        let (start, ch) = match self.bump() {
            Some(pair) => pair,
            None => {
                self.finished = true;
                return Ok(self.eof());
            }
        };

        let token = match ch {
            'a'..='z' | 'A'..='Z' | '_' | '$' => self.identifier_or_keyword(start),
            '0'..='9' => self.number_literal(start, ch)?,
            '"' => self.string_literal(start)?,
            '\'' => self.char_literal(start)?,
            '(' => self.simple_token(start, TokenKind::LParen),
            ')' => self.simple_token(start, TokenKind::RParen),
            '{' => self.simple_token(start, TokenKind::LBrace),
            '}' => self.simple_token(start, TokenKind::RBrace),
            '[' => self.simple_token(start, TokenKind::LBracket),
            ']' => self.simple_token(start, TokenKind::RBracket),
            ',' => self.simple_token(start, TokenKind::Comma),
            '.' => self.simple_token(start, TokenKind::Dot),
            ';' => self.simple_token(start, TokenKind::Semicolon),
            ':' => self.simple_token(start, TokenKind::Colon),
            '?' => self.simple_token(start, TokenKind::Question),
            '^' => self.simple_token(start, TokenKind::Caret),
            '+' => {
                if self.match_next('+') {
                    self.simple_token(start, TokenKind::PlusPlus)
                } else {
                    self.either(start, '=', TokenKind::PlusAssign, TokenKind::Plus)
                }
            }
            '-' => {
                if self.match_next('-') {
                    self.simple_token(start, TokenKind::MinusMinus)
                } else {
                    self.either(start, '=', TokenKind::MinusAssign, TokenKind::Minus)
                }
            }
            '*' => self.either(start, '=', TokenKind::StarAssign, TokenKind::Star),
            '/' => self.either(start, '=', TokenKind::SlashAssign, TokenKind::Slash),
            '%' => self.either(start, '=', TokenKind::PercentAssign, TokenKind::Percent),
            '=' => self.either(start, '=', TokenKind::EqualEqual, TokenKind::Assign),
            '!' => self.either(start, '=', TokenKind::BangEqual, TokenKind::Bang),
            '&' => self.either(start, '&', TokenKind::DoubleAmpersand, TokenKind::Ampersand),
            '|' => self.either(start, '|', TokenKind::DoublePipe, TokenKind::Pipe),
            '<' => self.either(start, '=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.either(start, '=', TokenKind::GreaterEqual, TokenKind::Greater),
            other => {
                return Err(Diagnostic::new(
                    DiagnosticKind::Lexer,
                    format!("unexpected character `{other}`"),
                )
                .with_span(SourceSpan::new(start, self.current)));
            }
        };
        Ok(token)
    }

    fn eof(&self) -> Token {
        Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: SourceSpan::new(self.source.len(), self.source.len()),
        }
    }
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "boolean" => Kw::Boolean,
        "char" => Kw::Char,
        "byte" => Kw::Byte,
        "short" => Kw::Short,
        "int" => Kw::Int,
        "long" => Kw::Long,
        "float" => Kw::Float,
        "double" => Kw::Double,
        "void" => Kw::Void,
        "if" => Kw::If,
        "else" => Kw::Else,
        "while" => Kw::While,
        "do" => Kw::Do,
        "for" => Kw::For,
        "break" => Kw::Break,
        "continue" => Kw::Continue,
        "return" => Kw::Return,
        "import" => Kw::Import,
        "new" => Kw::New,
        "this" => Kw::This,
        "super" => Kw::Super,
        "true" => Kw::True,
        "false" => Kw::False,
        "null" => Kw::Null,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}
