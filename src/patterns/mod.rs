//! The PAL pattern DSL front end: AST, lexer and parse driver.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    AstFactory, Descriptor, Entry, EntryTiming, Pattern, PatternExpr, PortfolioAttr, PriceBarKind,
    PriceBarRef, ProfitTarget, Side, StopLoss, VolatilityAttr,
};
pub use parser::PalParseDriver;
