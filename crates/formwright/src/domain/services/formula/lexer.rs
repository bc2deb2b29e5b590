use unscanny::Scanner;

use super::FormulaError;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Question,
    Colon,
    Comma,
    LParen,
    RParen,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) struct Lexer<'a> {
    s: Scanner<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            s: Scanner::new(text),
        }
    }

    /// Tokenize the whole input; the last token is always [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, FormulaError> {
        let mut tokens = Vec::new();
        loop {
            self.s.eat_whitespace();
            let offset = self.s.cursor();
            let token = self.next_token(offset)?;
            let done = token == Token::Eof;
            tokens.push(Spanned { token, offset });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self, start: usize) -> Result<Token, FormulaError> {
        let token = match self.s.eat() {
            None => Token::Eof,
            Some(c) if c.is_ascii_digit() => self.number(start)?,
            Some('.') if self.s.at(|c: char| c.is_ascii_digit()) => self.number(start)?,
            Some(c) if is_identifier_start(c) => self.identifier(start),
            Some(quote @ ('"' | '\'')) => self.string(start, quote)?,

            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Star,
            Some('/') => Token::Slash,
            Some('%') => Token::Percent,
            Some('^') => Token::Caret,
            Some('?') => Token::Question,
            Some(':') => Token::Colon,
            Some(',') => Token::Comma,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some('&') if self.s.eat_if('&') => Token::And,
            Some('&') => Token::Amp,
            Some('|') if self.s.eat_if('|') => Token::Or,
            Some('=') if self.s.eat_if('=') => Token::EqEq,
            Some('!') if self.s.eat_if('=') => Token::NotEq,
            Some('!') => Token::Not,
            Some('<') if self.s.eat_if('=') => Token::Le,
            Some('<') => Token::Lt,
            Some('>') if self.s.eat_if('=') => Token::Ge,
            Some('>') => Token::Gt,
            Some(c) => {
                return Err(FormulaError::syntax(start, format!("unexpected character {c:?}")))
            }
        };
        Ok(token)
    }

    fn number(&mut self, start: usize) -> Result<Token, FormulaError> {
        self.s.eat_while(|c: char| c.is_ascii_digit());
        if self.s.eat_if('.') {
            self.s.eat_while(|c: char| c.is_ascii_digit());
        }
        if self.s.at(['e', 'E']) {
            let before = self.s.cursor();
            self.s.eat();
            self.s.eat_if(['+', '-']);
            if self.s.eat_while(|c: char| c.is_ascii_digit()).is_empty() {
                self.s.jump(before);
            }
        }

        let text = self.s.from(start);
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::syntax(start, format!("invalid number {text:?}")))
    }

    fn identifier(&mut self, start: usize) -> Token {
        self.s.eat_while(is_identifier_continue);
        match self.s.from(start) {
            "true" => Token::True,
            "false" => Token::False,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            name => Token::Ident(name.to_string()),
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token, FormulaError> {
        let mut value = String::new();
        loop {
            match self.s.eat() {
                None => return Err(FormulaError::syntax(start, "unterminated string")),
                Some(c) if c == quote => return Ok(Token::Str(value)),
                Some('\\') => match self.s.eat() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('\\' | '"' | '\'')) => value.push(c),
                    _ => {
                        return Err(FormulaError::syntax(
                            self.s.cursor(),
                            "invalid escape sequence",
                        ))
                    }
                },
                Some(c) => value.push(c),
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
