//! Recursive-descent parser for PAL pattern IR files.
//!
//! The grammar is small and LALR(1); a hand-written descent keeps the token
//! handling and the recovery policy in one place. On a syntax error the
//! parser records a located diagnostic and resynchronizes at the next `{`
//! (the start of a pattern descriptor), so one bad record never loses the
//! rest of the file.

use std::path::Path;
use std::sync::Arc;

use crate::error::{PalError, ParseError};
use crate::num::Decimal;
use crate::patterns::ast::{
    AstFactory, Descriptor, Entry, EntryTiming, Pattern, PatternExpr, PortfolioAttr, PriceBarKind,
    ProfitTarget, Side, StopLoss, VolatilityAttr,
};
use crate::patterns::lexer::{tokenize, Spanned, Token};

/// Owns the parsed patterns, the diagnostics and the interning factory for
/// one or more IR inputs.
pub struct PalParseDriver {
    factory: Arc<AstFactory>,
    patterns: Vec<Arc<Pattern>>,
    diagnostics: Vec<ParseError>,
}

impl Default for PalParseDriver {
    fn default() -> Self {
        PalParseDriver::new()
    }
}

impl PalParseDriver {
    pub fn new() -> Self {
        PalParseDriver::with_factory(Arc::new(AstFactory::new()))
    }

    /// Share `factory` to intern leaves across files.
    pub fn with_factory(factory: Arc<AstFactory>) -> Self {
        PalParseDriver {
            factory,
            patterns: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Parses every pattern record in `input`, collecting records that parse
    /// and diagnostics for those that do not.
    pub fn parse_str(&mut self, input: &str) {
        let (tokens, lex_errors) = tokenize(input);
        for e in lex_errors {
            self.diagnostics.push(ParseError {
                line: e.line,
                column: e.column,
                expected: "a token".to_string(),
                found: format!("'{}'", e.found),
            });
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            factory: self.factory.as_ref(),
        };
        while !parser.at_end() {
            match parser.parse_pattern() {
                Ok(pattern) => self.patterns.push(Arc::new(pattern)),
                Err(err) => {
                    self.diagnostics.push(err);
                    parser.recover_to_next_pattern();
                }
            }
        }
    }

    pub fn parse_file(&mut self, path: &Path) -> Result<(), PalError> {
        let text = std::fs::read_to_string(path)?;
        self.parse_str(&text);
        Ok(())
    }

    pub fn patterns(&self) -> &[Arc<Pattern>] {
        &self.patterns
    }

    pub fn long_patterns(&self) -> impl Iterator<Item = &Arc<Pattern>> {
        self.patterns.iter().filter(|p| p.is_long())
    }

    pub fn short_patterns(&self) -> impl Iterator<Item = &Arc<Pattern>> {
        self.patterns.iter().filter(|p| p.is_short())
    }

    pub fn diagnostics(&self) -> &[ParseError] {
        &self.diagnostics
    }

    pub fn factory(&self) -> &Arc<AstFactory> {
        &self.factory
    }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    factory: &'a AstFactory,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(spanned) => ParseError {
                line: spanned.line,
                column: spanned.column,
                expected: expected.to_string(),
                found: format!("'{}'", spanned.token),
            },
            None => {
                let (line, column) = self
                    .tokens
                    .last()
                    .map_or((1, 1), |s| (s.line, s.column));
                ParseError {
                    line,
                    column,
                    expected: expected.to_string(),
                    found: "end of input".to_string(),
                }
            }
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(spanned) if spanned.token == *token => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error_here(expected)),
        }
    }

    /// Skip to the next `{`, the only safe resynchronization point.
    fn recover_to_next_pattern(&mut self) {
        // Step past the current position so an error on `{` itself moves on.
        self.advance();
        while let Some(spanned) = self.peek() {
            if spanned.token == Token::LBrace {
                return;
            }
            self.pos += 1;
        }
    }

    fn parse_int(&mut self, what: &str) -> Result<u64, ParseError> {
        match self.peek() {
            Some(Spanned { token: Token::Int(v), .. }) => {
                let v = *v;
                self.pos += 1;
                Ok(v)
            }
            _ => Err(self.error_here(what)),
        }
    }

    fn parse_number(&mut self, what: &str) -> Result<Decimal, ParseError> {
        let err = self.error_here(what);
        match self.peek() {
            Some(Spanned { token: Token::Int(v), .. }) => {
                let v = *v;
                self.pos += 1;
                Ok(Decimal::from_int(v as i64))
            }
            Some(Spanned { token: Token::Num(text), .. }) => {
                let parsed = text.parse::<Decimal>().map_err(|_| err)?;
                self.pos += 1;
                Ok(parsed)
            }
            _ => Err(err),
        }
    }

    /// `{ FILE: id INDEX: int INDEX DATE: int PL: num % PS: num % TRADES: int CL: int }`
    fn parse_descriptor(&mut self) -> Result<Descriptor, ParseError> {
        self.expect(&Token::LBrace, "'{' starting a pattern descriptor")?;
        self.expect(&Token::File, "FILE")?;
        self.expect(&Token::Colon, "':' after FILE")?;
        let file = match self.peek().map(|s| &s.token) {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                name
            }
            Some(Token::Int(v)) => {
                let v = *v;
                self.pos += 1;
                v.to_string()
            }
            _ => return Err(self.error_here("a file name")),
        };
        self.expect(&Token::Index, "INDEX")?;
        self.expect(&Token::Colon, "':' after INDEX")?;
        let index = self.parse_int("a pattern index")? as u32;
        self.expect(&Token::Index, "INDEX DATE")?;
        self.expect(&Token::Date, "DATE")?;
        self.expect(&Token::Colon, "':' after INDEX DATE")?;
        let index_date = self.parse_int("an index date")?;
        self.expect(&Token::Pl, "PL")?;
        self.expect(&Token::Colon, "':' after PL")?;
        let pl_pct = self.parse_number("a PL percentage")?;
        self.expect(&Token::Percent, "'%' after the PL value")?;
        self.expect(&Token::Ps, "PS")?;
        self.expect(&Token::Colon, "':' after PS")?;
        let ps_pct = self.parse_number("a PS percentage")?;
        self.expect(&Token::Percent, "'%' after the PS value")?;
        self.expect(&Token::Trades, "TRADES")?;
        self.expect(&Token::Colon, "':' after TRADES")?;
        let trades = self.parse_int("a trade count")? as u32;
        self.expect(&Token::Cl, "CL")?;
        self.expect(&Token::Colon, "':' after CL")?;
        let consecutive_losses = self.parse_int("a consecutive-loss count")? as u32;
        self.expect(&Token::RBrace, "'}' closing the descriptor")?;
        Ok(Descriptor {
            file,
            index,
            index_date,
            pl_pct,
            ps_pct,
            trades,
            consecutive_losses,
        })
    }

    fn parse_volatility_attr(&mut self) -> Result<VolatilityAttr, ParseError> {
        if self.peek().map(|s| &s.token) != Some(&Token::Volatility) {
            return Ok(VolatilityAttr::None);
        }
        self.pos += 1;
        self.expect(&Token::Colon, "':' after VOLATILITY")?;
        match self.peek().map(|s| &s.token) {
            Some(Token::Low) => {
                self.pos += 1;
                Ok(VolatilityAttr::Low)
            }
            Some(Token::Normal) => {
                self.pos += 1;
                Ok(VolatilityAttr::Normal)
            }
            Some(Token::High) => {
                self.pos += 1;
                Ok(VolatilityAttr::High)
            }
            Some(Token::Very) => {
                self.pos += 1;
                self.expect(&Token::High, "HIGH after VERY")?;
                Ok(VolatilityAttr::VeryHigh)
            }
            _ => Err(self.error_here("LOW, NORMAL, HIGH or VERY HIGH")),
        }
    }

    fn parse_portfolio_attr(&mut self) -> Result<PortfolioAttr, ParseError> {
        if self.peek().map(|s| &s.token) != Some(&Token::Portfolio) {
            return Ok(PortfolioAttr::None);
        }
        self.pos += 1;
        self.expect(&Token::Colon, "':' after PORTFOLIO")?;
        let attr = match self.peek().map(|s| &s.token) {
            Some(Token::Long) => PortfolioAttr::LongFilter,
            Some(Token::Short) => PortfolioAttr::ShortFilter,
            _ => return Err(self.error_here("LONG or SHORT")),
        };
        self.pos += 1;
        self.expect(&Token::Filter, "FILTER")?;
        Ok(attr)
    }

    fn parse_price_bar_kind(&mut self) -> Result<PriceBarKind, ParseError> {
        let kind = match self.peek().map(|s| &s.token) {
            Some(Token::Open) => PriceBarKind::Open,
            Some(Token::High) => PriceBarKind::High,
            Some(Token::Low) => PriceBarKind::Low,
            Some(Token::Close) => PriceBarKind::Close,
            Some(Token::Volume) => PriceBarKind::Volume,
            Some(Token::Roc1) => PriceBarKind::Roc1,
            Some(Token::Ibs1) => PriceBarKind::Ibs1,
            Some(Token::Ibs2) => PriceBarKind::Ibs2,
            Some(Token::Ibs3) => PriceBarKind::Ibs3,
            Some(Token::Meander) => PriceBarKind::Meander,
            Some(Token::VChartLow) => PriceBarKind::VChartLow,
            Some(Token::VChartHigh) => PriceBarKind::VChartHigh,
            _ => return Err(self.error_here("a price series reference")),
        };
        self.pos += 1;
        Ok(kind)
    }

    /// `kind OF int BARS AGO`; `BAR` and `DAYS` are accepted offset units.
    fn parse_price_bar_ref(&mut self) -> Result<Arc<crate::patterns::ast::PriceBarRef>, ParseError> {
        let kind = self.parse_price_bar_kind()?;
        self.expect(&Token::Of, "OF")?;
        let offset = self.parse_int("a bar offset")? as u32;
        match self.peek().map(|s| &s.token) {
            Some(Token::Bars | Token::Bar | Token::Days) => self.pos += 1,
            _ => return Err(self.error_here("BARS")),
        }
        self.expect(&Token::Ago, "AGO")?;
        Ok(self.factory.price_bar_ref(kind, offset))
    }

    fn parse_comparison(&mut self) -> Result<PatternExpr, ParseError> {
        let lhs = self.parse_price_bar_ref()?;
        self.expect(&Token::Greater, "'>'")?;
        let rhs = self.parse_price_bar_ref()?;
        Ok(self.factory.greater_than(lhs, rhs))
    }

    /// Left-leaning conjunction chain.
    fn parse_conditions(&mut self) -> Result<PatternExpr, ParseError> {
        let mut expr = self.parse_comparison()?;
        while self.peek().map(|s| &s.token) == Some(&Token::And) {
            // THEN may only follow a complete comparison, so AND always
            // introduces another one here; the entry statement's AND appears
            // after WITH and never reaches this loop.
            self.pos += 1;
            let rhs = self.parse_comparison()?;
            expr = self.factory.and(expr, rhs);
        }
        Ok(expr)
    }

    /// `(BUY|SELL) NEXT BAR ON THE OPEN`
    fn parse_entry(&mut self) -> Result<Entry, ParseError> {
        let side = match self.peek().map(|s| &s.token) {
            Some(Token::Buy) => Side::Long,
            Some(Token::Sell) => Side::Short,
            _ => return Err(self.error_here("BUY or SELL")),
        };
        self.pos += 1;
        self.expect(&Token::Next, "NEXT")?;
        self.expect(&Token::Bar, "BAR")?;
        self.expect(&Token::On, "ON")?;
        self.expect(&Token::The, "THE")?;
        self.expect(&Token::Open, "OPEN")?;
        Ok(Entry {
            side,
            timing: EntryTiming::NextBarOnOpen,
        })
    }

    fn parse_signed_pct(&mut self, what: &str) -> Result<Decimal, ParseError> {
        match self.peek().map(|s| &s.token) {
            Some(Token::Plus | Token::Minus) => self.pos += 1,
            _ => return Err(self.error_here("'+' or '-'")),
        }
        let value = self.parse_number(what)?;
        self.expect(&Token::Percent, "'%'")?;
        Ok(value)
    }

    /// `PROFIT TARGET AT ENTRY PRICE (+|-) num %`
    fn parse_profit_target(&mut self, side: Side) -> Result<ProfitTarget, ParseError> {
        self.expect(&Token::Profit, "PROFIT")?;
        self.expect(&Token::Target, "TARGET")?;
        self.expect(&Token::At, "AT")?;
        self.expect(&Token::Entry, "ENTRY")?;
        self.expect(&Token::Price, "PRICE")?;
        let pct = self.parse_signed_pct("a profit target percentage")?;
        Ok(ProfitTarget { side, pct })
    }

    /// `STOP LOSS AT ENTRY PRICE (+|-) num %`
    fn parse_stop_loss(&mut self, side: Side) -> Result<StopLoss, ParseError> {
        self.expect(&Token::Stop, "STOP")?;
        self.expect(&Token::Loss, "LOSS")?;
        self.expect(&Token::At, "AT")?;
        self.expect(&Token::Entry, "ENTRY")?;
        self.expect(&Token::Price, "PRICE")?;
        let pct = self.parse_signed_pct("a stop loss percentage")?;
        Ok(StopLoss { side, pct })
    }

    fn parse_pattern(&mut self) -> Result<Pattern, ParseError> {
        let descriptor = self.parse_descriptor()?;
        self.expect(&Token::If, "IF")?;
        let volatility = self.parse_volatility_attr()?;
        let portfolio = self.parse_portfolio_attr()?;
        let condition = self.parse_conditions()?;
        self.expect(&Token::Then, "THEN")?;
        let entry = self.parse_entry()?;
        self.expect(&Token::With, "WITH")?;
        let target = self.parse_profit_target(entry.side)?;
        self.expect(&Token::And, "AND joining profit target and stop loss")?;
        let stop = self.parse_stop_loss(entry.side)?;
        Ok(Pattern {
            descriptor,
            condition,
            entry,
            target,
            stop,
            volatility,
            portfolio,
        })
    }
}
