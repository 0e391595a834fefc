//! Typed pattern AST.
//!
//! Patterns are tagged variants rather than a class hierarchy; consumers
//! match on the node kind. Price-bar leaves are interned by
//! `(kind, bar_offset)` through an [`AstFactory`], so identical leaves are
//! shared across every pattern built by the same factory. The factory is an
//! explicit handle passed to the parse driver — two drivers with separate
//! factories never contend, and callers that want cross-file interning share
//! one factory.

use std::sync::Arc;

use dashmap::DashMap;

use crate::num::Decimal;

/// What a price-bar reference reads from the bar `bar_offset` bars back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceBarKind {
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

/// A reference to one series value, `bar_offset` bars before the evaluation
/// bar. Immutable and interned.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PriceBarRef {
    kind: PriceBarKind,
    bar_offset: u32,
}

impl PriceBarRef {
    pub fn kind(&self) -> PriceBarKind {
        self.kind
    }

    pub fn bar_offset(&self) -> u32 {
        self.bar_offset
    }
}

/// Boolean condition tree: comparisons joined by conjunction. `And` chains
/// built by the parser lean left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternExpr {
    GreaterThan {
        lhs: Arc<PriceBarRef>,
        rhs: Arc<PriceBarRef>,
    },
    And {
        lhs: Box<PatternExpr>,
        rhs: Box<PatternExpr>,
    },
}

impl PatternExpr {
    /// Number of comparison leaves in the tree.
    pub fn num_comparisons(&self) -> usize {
        match self {
            PatternExpr::GreaterThan { .. } => 1,
            PatternExpr::And { lhs, rhs } => lhs.num_comparisons() + rhs.num_comparisons(),
        }
    }

    /// Largest bar offset referenced anywhere in the tree — how much history
    /// evaluating the pattern needs.
    pub fn max_bar_offset(&self) -> u32 {
        match self {
            PatternExpr::GreaterThan { lhs, rhs } => lhs.bar_offset.max(rhs.bar_offset),
            PatternExpr::And { lhs, rhs } => lhs.max_bar_offset().max(rhs.max_bar_offset()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

/// When an entry executes. The IR currently only expresses next-bar-on-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTiming {
    NextBarOnOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub side: Side,
    pub timing: EntryTiming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitTarget {
    pub side: Side,
    pub pct: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopLoss {
    pub side: Side,
    pub pct: Decimal,
}

/// Provenance of a mined pattern: where it came from and the mining-time
/// performance figures. Carried through unchanged for diff tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub file: String,
    pub index: u32,
    pub index_date: u64,
    pub pl_pct: Decimal,
    pub ps_pct: Decimal,
    pub trades: u32,
    pub consecutive_losses: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolatilityAttr {
    #[default]
    None,
    Low,
    Normal,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortfolioAttr {
    #[default]
    None,
    LongFilter,
    ShortFilter,
}

/// One complete mined trading rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub descriptor: Descriptor,
    pub condition: PatternExpr,
    pub entry: Entry,
    pub target: ProfitTarget,
    pub stop: StopLoss,
    pub volatility: VolatilityAttr,
    pub portfolio: PortfolioAttr,
}

impl Pattern {
    pub fn is_long(&self) -> bool {
        self.entry.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.entry.side == Side::Short
    }

    pub fn max_bar_offset(&self) -> u32 {
        self.condition.max_bar_offset()
    }
}

/// Interning factory for AST leaves. Safe to share across threads; pattern
/// loading is a batch operation, so a concurrent map rather than a global.
#[derive(Debug, Default)]
pub struct AstFactory {
    refs: DashMap<(PriceBarKind, u32), Arc<PriceBarRef>>,
}

impl AstFactory {
    pub fn new() -> Self {
        AstFactory::default()
    }

    /// The canonical leaf for `(kind, bar_offset)`.
    pub fn price_bar_ref(&self, kind: PriceBarKind, bar_offset: u32) -> Arc<PriceBarRef> {
        self.refs
            .entry((kind, bar_offset))
            .or_insert_with(|| Arc::new(PriceBarRef { kind, bar_offset }))
            .clone()
    }

    pub fn greater_than(&self, lhs: Arc<PriceBarRef>, rhs: Arc<PriceBarRef>) -> PatternExpr {
        PatternExpr::GreaterThan { lhs, rhs }
    }

    pub fn and(&self, lhs: PatternExpr, rhs: PatternExpr) -> PatternExpr {
        PatternExpr::And {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Number of distinct leaves interned so far.
    pub fn num_interned(&self) -> usize {
        self.refs.len()
    }
}
