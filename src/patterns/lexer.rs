//! Tokenizer for the PAL pattern IR language.
//!
//! Keywords match case-insensitively: mined files mix spellings
//! (`FILE:` in the grammar, `File:` in real exports). Identifiers may carry
//! dots, dashes and path separators so file names in descriptor headers lex
//! as a single token.

use std::fmt;

/// One lexical token with no location; see [`Spanned`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Int(u64),
    Num(String),
    Ident(String),

    Plus,
    Minus,
    Percent,
    LBrace,
    RBrace,
    Colon,
    Greater,

    If,
    Then,
    Of,
    And,
    Ago,
    Bars,
    Bar,
    Days,
    Buy,
    Sell,
    Next,
    On,
    The,
    With,
    Profit,
    Target,
    At,
    Entry,
    Price,
    Stop,
    Loss,
    File,
    Index,
    Date,
    Pl,
    Ps,
    Trades,
    Cl,
    Volatility,
    Portfolio,
    Normal,
    Very,
    Long,
    Short,
    Filter,

    Open,
    High,
    Low,
    Close,
    Volume,
    Roc1,
    Ibs1,
    Ibs2,
    Ibs3,
    Meander,
    VChartLow,
    VChartHigh,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(v) => write!(f, "{v}"),
            Token::Num(s) | Token::Ident(s) => f.write_str(s),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Percent => f.write_str("%"),
            Token::LBrace => f.write_str("{"),
            Token::RBrace => f.write_str("}"),
            Token::Colon => f.write_str(":"),
            Token::Greater => f.write_str(">"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A token plus its 1-based source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

/// A character the lexer could not start a token from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: u32,
    pub column: u32,
    pub found: char,
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word.to_ascii_uppercase().as_str() {
        "IF" => Token::If,
        "THEN" => Token::Then,
        "OF" => Token::Of,
        "AND" => Token::And,
        "AGO" => Token::Ago,
        "BARS" => Token::Bars,
        "BAR" => Token::Bar,
        "DAYS" | "DAY" => Token::Days,
        "BUY" => Token::Buy,
        "SELL" => Token::Sell,
        "NEXT" => Token::Next,
        "ON" => Token::On,
        "THE" => Token::The,
        "WITH" => Token::With,
        "PROFIT" => Token::Profit,
        "TARGET" => Token::Target,
        "AT" => Token::At,
        "ENTRY" => Token::Entry,
        "PRICE" => Token::Price,
        "STOP" => Token::Stop,
        "LOSS" => Token::Loss,
        "FILE" => Token::File,
        "INDEX" => Token::Index,
        "DATE" => Token::Date,
        "PL" => Token::Pl,
        "PS" => Token::Ps,
        "TRADES" => Token::Trades,
        "CL" => Token::Cl,
        "VOLATILITY" => Token::Volatility,
        "PORTFOLIO" => Token::Portfolio,
        "NORMAL" => Token::Normal,
        "VERY" => Token::Very,
        "LONG" => Token::Long,
        "SHORT" => Token::Short,
        "FILTER" => Token::Filter,
        "OPEN" => Token::Open,
        "HIGH" => Token::High,
        "LOW" => Token::Low,
        "CLOSE" => Token::Close,
        "VOLUME" => Token::Volume,
        "ROC1" => Token::Roc1,
        "IBS1" => Token::Ibs1,
        "IBS2" => Token::Ibs2,
        "IBS3" => Token::Ibs3,
        "MEANDER" => Token::Meander,
        "VCHARTLOW" => Token::VChartLow,
        "VCHARTHIGH" => Token::VChartHigh,
        _ => return None,
    };
    Some(token)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/' | '\\')
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> char {
        let c = self.chars[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }
}

/// Tokenizes the whole input. Unrecognized characters are reported and
/// skipped so the parser can keep going.
pub fn tokenize(input: &str) -> (Vec<Spanned>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lx = Lexer {
        chars: input.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };

    while let Some(c) = lx.peek() {
        let start_line = lx.line;
        let start_column = lx.column;

        if c.is_whitespace() {
            lx.bump();
            continue;
        }

        let simple = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '%' => Some(Token::Percent),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            ':' => Some(Token::Colon),
            '>' => Some(Token::Greater),
            _ => None,
        };
        if let Some(token) = simple {
            lx.bump();
            tokens.push(Spanned { token, line: start_line, column: start_column });
            continue;
        }

        if c.is_ascii_digit() {
            let mut text = String::new();
            let mut is_float = false;
            while let Some(d) = lx.peek() {
                if d.is_ascii_digit() {
                    text.push(lx.bump());
                } else if d == '.' && !is_float && lx.chars.get(lx.pos + 1).is_some_and(char::is_ascii_digit) {
                    is_float = true;
                    text.push(lx.bump());
                } else {
                    break;
                }
            }
            let token = if is_float {
                Token::Num(text)
            } else {
                match text.parse::<u64>() {
                    Ok(v) => Token::Int(v),
                    Err(_) => Token::Num(text),
                }
            };
            tokens.push(Spanned { token, line: start_line, column: start_column });
            continue;
        }

        if is_ident_start(c) {
            let mut text = String::new();
            while let Some(d) = lx.peek() {
                if is_ident_continue(d) {
                    text.push(lx.bump());
                } else {
                    break;
                }
            }
            let token = keyword(&text).unwrap_or(Token::Ident(text));
            tokens.push(Spanned { token, line: start_line, column: start_column });
            continue;
        }

        errors.push(LexError { line: start_line, column: start_column, found: c });
        lx.bump();
    }

    (tokens, errors)
}
