//! Position tracking and realized PnL / drawdown bookkeeping.
//!
//! PnL is a cumulative sum of per-trade percentage returns. Drawdown is the
//! distance from the running PnL high-water mark, sampled only when a trade
//! closes; open positions are never marked to market.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

impl Position {
    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long)
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Position::Short)
    }
}

/// Percentage return of closing a position opened at `entry` at `exit`.
pub fn trade_return_pct(side: Position, entry: f64, exit: f64) -> f64 {
    match side {
        Position::Long => (exit / entry - 1.0) * 100.0,
        Position::Short => (entry / exit - 1.0) * 100.0,
        Position::Flat => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub side: Position,
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl_pct: f64,
}

/// Outcome of one strategy run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestResult {
    pub pnl: f64,
    pub max_drawdown: f64,
    pub trades: Vec<ClosedTrade>,
}

#[derive(Debug, Clone, Default)]
pub struct PnlTracker {
    position: Position,
    entry_price: f64,
    entry_timestamp: i64,
    running_pnl: f64,
    peak_pnl: f64,
    max_drawdown: f64,
    trades: Vec<ClosedTrade>,
}

impl PnlTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn running_pnl(&self) -> f64 {
        self.running_pnl
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// Flip to long at `price`, realizing any open short first.
    pub fn enter_long(&mut self, timestamp: i64, price: f64) {
        if self.position.is_short() {
            self.close(timestamp, price);
        }
        self.open(Position::Long, timestamp, price);
    }

    /// Flip to short at `price`, realizing any open long first.
    pub fn enter_short(&mut self, timestamp: i64, price: f64) {
        if self.position.is_long() {
            self.close(timestamp, price);
        }
        self.open(Position::Short, timestamp, price);
    }

    fn open(&mut self, side: Position, timestamp: i64, price: f64) {
        self.position = side;
        self.entry_price = price;
        self.entry_timestamp = timestamp;
    }

    fn close(&mut self, timestamp: i64, price: f64) {
        let pnl_pct = trade_return_pct(self.position, self.entry_price, price);
        self.running_pnl += pnl_pct;
        self.update_drawdown();

        tracing::debug!(
            side = ?self.position,
            entry = self.entry_price,
            exit = price,
            pnl_pct,
            running_pnl = self.running_pnl,
            "trade closed"
        );

        self.trades.push(ClosedTrade {
            side: self.position,
            entry_timestamp: self.entry_timestamp,
            exit_timestamp: timestamp,
            entry_price: self.entry_price,
            exit_price: price,
            pnl_pct,
        });
        self.position = Position::Flat;
    }

    fn update_drawdown(&mut self) {
        if self.running_pnl > self.peak_pnl {
            self.peak_pnl = self.running_pnl;
        }
        let drawdown = self.peak_pnl - self.running_pnl;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    /// Final result. A position still open is left unrealized.
    pub fn finish(self) -> BacktestResult {
        BacktestResult {
            pnl: self.running_pnl,
            max_drawdown: self.max_drawdown,
            trades: self.trades,
        }
    }
}
