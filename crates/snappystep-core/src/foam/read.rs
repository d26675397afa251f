use super::{FoamDict, FoamError, FoamValue};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LBrace,
    RBrace,
    LParen,
    RParen,
    Semi,
    Word(String),
    Str(String),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, FoamError> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            let line = self.line;
            let token = match c {
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                '/' => {
                    self.bump();
                    match self.chars.peek().copied() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                            continue;
                        }
                        Some('*') => {
                            self.bump();
                            self.skip_block_comment(line)?;
                            continue;
                        }
                        _ => self.word_from(String::from('/')),
                    }
                }
                '{' => self.single(Token::LBrace),
                '}' => self.single(Token::RBrace),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                ';' => self.single(Token::Semi),
                '"' => {
                    self.bump();
                    self.string(line)?
                }
                _ => self.word_from(String::new()),
            };
            tokens.push(Spanned { token, line });
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn skip_block_comment(&mut self, start_line: usize) -> Result<(), FoamError> {
        let mut prev = '\0';
        while let Some(c) = self.bump() {
            if prev == '*' && c == '/' {
                return Ok(());
            }
            prev = c;
        }
        Err(FoamError::Syntax {
            line: start_line,
            message: "unterminated block comment".to_string(),
        })
    }

    fn string(&mut self, start_line: usize) -> Result<Token, FoamError> {
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '"' => return Ok(Token::Str(out)),
                '\\' => {
                    if let Some(next) = self.bump() {
                        if next != '"' && next != '\\' {
                            out.push('\\');
                        }
                        out.push(next);
                    }
                }
                _ => out.push(c),
            }
        }
        Err(FoamError::Syntax {
            line: start_line,
            message: "unterminated string".to_string(),
        })
    }

    fn word_from(&mut self, mut word: String) -> Token {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | '(' | ')' | ';' | '"') {
                break;
            }
            word.push(c);
            self.bump();
        }
        classify_word(word)
    }
}

fn classify_word(word: String) -> Token {
    let numeric_start = word
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    if numeric_start {
        if let Ok(v) = word.parse::<i64>() {
            return Token::Int(v);
        }
        if let Ok(v) = word.parse::<f64>() {
            if v.is_finite() {
                return Token::Float(v);
            }
        }
    }
    Token::Word(word)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        self.pos += 1;
        token
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn error(&self, message: impl Into<String>) -> FoamError {
        FoamError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    fn dict_body(&mut self, nested: bool) -> Result<FoamDict, FoamError> {
        let mut dict = FoamDict::new();
        loop {
            match self.peek() {
                None if nested => return Err(self.error("missing '}'")),
                None => return Ok(dict),
                Some(Token::RBrace) if nested => {
                    self.pos += 1;
                    return Ok(dict);
                }
                Some(Token::Semi) => {
                    self.pos += 1;
                }
                Some(Token::Word(_)) | Some(Token::Str(_)) => {
                    let key = match self.next() {
                        Some(Token::Word(w)) | Some(Token::Str(w)) => w,
                        _ => return Err(self.error("expected a keyword")),
                    };
                    let value = if key.starts_with('#') {
                        self.directive_value()?
                    } else {
                        self.entry_value()?
                    };
                    dict.insert(key, value);
                }
                Some(other) => {
                    return Err(self.error(format!("unexpected {other:?}, expected a keyword")))
                }
            }
        }
    }

    fn directive_value(&mut self) -> Result<FoamValue, FoamError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(FoamValue::Str(s)),
            Some(Token::Word(w)) => Ok(FoamValue::Word(w)),
            _ => Err(self.error("directive needs an argument")),
        }
    }

    fn entry_value(&mut self) -> Result<FoamValue, FoamError> {
        if self.peek() == Some(&Token::LBrace) {
            self.pos += 1;
            return Ok(FoamValue::Dict(self.dict_body(true)?));
        }
        let mut values = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Semi) => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("missing ';'")),
                _ => values.push(self.value()?),
            }
        }
        match values.len() {
            0 => Ok(FoamValue::Seq(Vec::new())),
            1 => Ok(values.remove(0)),
            _ => Ok(FoamValue::Seq(values)),
        }
    }

    fn value(&mut self) -> Result<FoamValue, FoamError> {
        match self.next() {
            Some(Token::Word(w)) => Ok(FoamValue::Word(w)),
            Some(Token::Str(s)) => Ok(FoamValue::Str(s)),
            Some(Token::Float(v)) => Ok(FoamValue::Float(v)),
            Some(Token::Int(v)) => {
                // Count-prefixed list, e.g. `3(1 2 3)`.
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    return self.list();
                }
                Ok(FoamValue::Int(v))
            }
            Some(Token::LParen) => self.list(),
            Some(Token::LBrace) => Ok(FoamValue::Dict(self.dict_body(true)?)),
            Some(other) => Err(self.error(format!("unexpected {other:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn list(&mut self) -> Result<FoamValue, FoamError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(FoamValue::List(items));
                }
                None => return Err(self.error("missing ')'")),
                // A keyword followed by '{' inside a list is a named dictionary item.
                Some(Token::Word(_)) if self.peek_at(1) == Some(&Token::LBrace) => {
                    let name = self.value()?;
                    let dict = self.value()?;
                    items.push(FoamValue::Seq(vec![name, dict]));
                }
                _ => items.push(self.value()?),
            }
        }
    }
}

/// Parses dictionary text into a [`FoamDict`].
pub fn parse(source: &str) -> Result<FoamDict, FoamError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.dict_body(false)
}
