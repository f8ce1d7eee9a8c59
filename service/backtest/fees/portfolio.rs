use std::collections::BTreeMap;

use parse_display::Display;
use serde::Serialize;
use trading_model::core::Date;
use trading_model::Sid;

/// Held position as the fee engine sees it. `amount` is negative for shorts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSnapshot {
    pub sid: Sid,
    pub amount: f64,
    pub cost_basis: f64,
    pub last_sale_price: f64,
}

impl PositionSnapshot {
    pub fn market_value(&self) -> f64 {
        self.amount * self.last_sale_price
    }
    pub fn is_short(&self) -> bool {
        self.amount < 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[display(style = "snake_case")]
pub enum FeeKind {
    Margin,
    Management,
    Performance,
    Borrow,
}

/// Money taken out of the portfolio on `date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeCharge {
    pub date: Date,
    pub kind: FeeKind,
    pub amount: f64,
}

/// Read side of a portfolio plus the call fees are posted through.
pub trait PortfolioView {
    fn cash(&self) -> f64;
    /// Portfolio value when the current session opened.
    fn start_of_day_value(&self) -> f64;
    fn portfolio_value(&self) -> f64;
    fn positions(&self) -> Vec<PositionSnapshot>;
    fn record_fee(&mut self, charge: FeeCharge);
}

/// One session of the portfolio ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyLedger {
    pub trading_pnl: f64,
    pub fees: f64,
}

impl DailyLedger {
    /// trading pnl net of fees
    pub fn pnl(&self) -> f64 {
        self.trading_pnl - self.fees
    }
}

/// Cash plus marked positions, driven by hand in tests and replays.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPortfolio {
    cash: f64,
    positions: BTreeMap<Sid, PositionSnapshot>,
    start_of_day_value: f64,
    session: Option<Date>,
    ledger: BTreeMap<Date, DailyLedger>,
    fees: Vec<FeeCharge>,
}

impl InMemoryPortfolio {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            start_of_day_value: cash,
            ..Default::default()
        }
    }
    /// Opens `session`, the current value becomes its start of day value.
    pub fn start_session(&mut self, session: Date) {
        self.start_of_day_value = self.portfolio_value();
        self.session = Some(session);
        self.ledger.entry(session).or_default();
    }
    pub fn set_position(&mut self, position: PositionSnapshot) {
        if position.amount == 0.0 {
            self.positions.remove(&position.sid);
        } else {
            self.positions.insert(position.sid, position);
        }
    }
    /// Settled gain or loss of the current session's trading.
    pub fn record_trading_pnl(&mut self, amount: f64) {
        self.cash += amount;
        if let Some(day) = self.session.and_then(|s| self.ledger.get_mut(&s)) {
            day.trading_pnl += amount;
        }
    }
    pub fn fees(&self) -> &[FeeCharge] {
        &self.fees
    }
    pub fn total_fees(&self) -> f64 {
        self.fees.iter().map(|f| f.amount).sum()
    }
    pub fn daily_ledger(&self, session: Date) -> Option<&DailyLedger> {
        self.ledger.get(&session)
    }
}

impl PortfolioView for InMemoryPortfolio {
    fn cash(&self) -> f64 {
        self.cash
    }
    fn start_of_day_value(&self) -> f64 {
        self.start_of_day_value
    }
    fn portfolio_value(&self) -> f64 {
        self.cash + self.positions.values().map(|p| p.market_value()).sum::<f64>()
    }
    fn positions(&self) -> Vec<PositionSnapshot> {
        self.positions.values().copied().collect()
    }
    fn record_fee(&mut self, charge: FeeCharge) {
        self.cash -= charge.amount;
        self.ledger.entry(charge.date).or_default().fees += charge.amount;
        self.fees.push(charge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn test_fees_kept_apart_from_trading_pnl() -> eyre::Result<()> {
        let day = Date::from_ymd(2020, 1, 8)?;
        let mut portfolio = InMemoryPortfolio::new(1000.0);
        portfolio.set_position(PositionSnapshot {
            sid: 1,
            amount: -10.0,
            cost_basis: 20.0,
            last_sale_price: 25.0,
        });
        portfolio.start_session(day);
        assert_float_eq!(portfolio.start_of_day_value(), 750.0, abs <= 1e-9);
        portfolio.record_trading_pnl(50.0);
        portfolio.record_fee(FeeCharge {
            date: day,
            kind: FeeKind::Borrow,
            amount: 5.0,
        });
        let ledger = portfolio.daily_ledger(day).cloned().unwrap_or_default();
        assert_float_eq!(ledger.trading_pnl, 50.0, abs <= 1e-9);
        assert_float_eq!(ledger.fees, 5.0, abs <= 1e-9);
        assert_float_eq!(ledger.pnl(), 45.0, abs <= 1e-9);
        assert_float_eq!(portfolio.portfolio_value(), 795.0, abs <= 1e-9);
        assert_eq!(FeeKind::Borrow.to_string(), "borrow");
        Ok(())
    }
}
