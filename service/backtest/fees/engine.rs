use eyre::{bail, Result};
use tracing::{debug, info, warn};
use trading_model::core::Date;
use trading_model::AssetError;

use super::{parse_borrow_fee_rows, BorrowFeeProvider, DateRule, FeeCharge, FeeKind, PortfolioView, PositionSnapshot};
use crate::config::FeesConfig;

/// Margin interest day count.
pub const MARGIN_DAY_COUNT: f64 = 360.0;
/// Management fee day count.
pub const MANAGEMENT_DAY_COUNT: f64 = 365.0;
/// Borrow fee day count.
pub const BORROW_DAY_COUNT: f64 = 360.0;

/// What a fee remembers between sessions. Only moves when the fee fires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccrualState {
    /// Session of the last firing, or the first session seen.
    pub last_accrual: Option<Date>,
    pub high_water_mark: Option<f64>,
}

/// Fee charged at an annual `rate` whenever `rule` fires.
#[derive(Debug)]
pub struct ScheduledFee {
    pub rate: f64,
    rule: Box<dyn DateRule>,
    state: AccrualState,
}

impl ScheduledFee {
    pub fn new(rate: f64, rule: Box<dyn DateRule>) -> Self {
        Self {
            rate,
            rule,
            state: AccrualState::default(),
        }
    }
    pub fn state(&self) -> &AccrualState {
        &self.state
    }

    /// `value * rate / day_count` for every calendar day since the last firing.
    fn accrue_interest(&mut self, session: Date, value: f64, day_count: f64) -> Option<f64> {
        let Some(last) = self.state.last_accrual else {
            self.state.last_accrual = Some(session);
            return None;
        };
        if !self.rule.should_trigger(session) {
            return None;
        }
        let days = last.days_until(session);
        if days <= 0 {
            return None;
        }
        self.state.last_accrual = Some(session);
        let amount = value * self.rate / day_count * days as f64;
        (amount > 0.0).then_some(amount)
    }

    /// `rate` of the gain above the high water mark. The mark never goes down.
    fn accrue_performance(&mut self, session: Date, opening_value: f64, value: f64) -> Option<f64> {
        let mark = *self.state.high_water_mark.get_or_insert(opening_value);
        self.state.last_accrual.get_or_insert(session);
        if !self.rule.should_trigger(session) {
            return None;
        }
        let gain = value - mark;
        let amount = if gain > 0.0 { self.rate * gain } else { 0.0 };
        self.state.high_water_mark = Some(mark.max(value - amount));
        self.state.last_accrual = Some(session);
        (amount > 0.0).then_some(amount)
    }
}

/// Borrow fees of short positions, queried every session.
pub struct BorrowAccrual {
    provider: Box<dyn BorrowFeeProvider>,
    data_start: Date,
    last_end: Option<Date>,
}

impl BorrowAccrual {
    pub fn new(provider: Box<dyn BorrowFeeProvider>, data_start: Date) -> Self {
        Self {
            provider,
            data_start,
            last_end: None,
        }
    }
    pub fn last_end(&self) -> Option<Date> {
        self.last_end
    }

    fn accrue(&mut self, session: Date, positions: &[PositionSnapshot]) -> Option<f64> {
        let start = self.last_end.map_or(session, |d| d.succ()).max(self.data_start);
        self.last_end = Some(session);
        if start > session {
            return None;
        }
        let shorts: Vec<&PositionSnapshot> = positions.iter().filter(|p| p.is_short()).collect();
        if shorts.is_empty() {
            return None;
        }
        let sids: Vec<_> = shorts.iter().map(|p| p.sid).collect();

        let mut buf: Vec<u8> = vec![];
        let fetched = self.provider.fetch(&mut buf, start, session, &sids);
        let rates = match fetched.and_then(|_| parse_borrow_fee_rows(&buf)) {
            Ok(rates) => rates,
            Err(err) => {
                match err.downcast_ref::<AssetError>() {
                    Some(AssetError::ProviderDataUnavailable(_)) => {
                        warn!("No borrow fee data for {start}..{session}, charging nothing: {err}")
                    }
                    _ => warn!("Borrow fee query for {start}..{session} failed, charging nothing: {err:?}"),
                }
                return None;
            }
        };
        let days = (start.days_until(session) + 1) as f64;
        let amount: f64 = shorts
            .iter()
            .filter_map(|p| {
                let rate = rates.get(&p.sid)?;
                Some(p.amount.abs() * p.last_sale_price * rate / BORROW_DAY_COUNT * days)
            })
            .sum();
        debug!("Borrow fees for {} shorts over {days} days: {amount}", shorts.len());
        (amount > 0.0).then_some(amount)
    }
}

/// Decides, session by session, which fees are charged and how much.
///
/// Call [`FeeAccrualEngine::handle_session`] once per session after the day's
/// trades settled. Fees are evaluated in the order margin, management,
/// performance, borrow, and each one is posted before the next is computed.
#[derive(Default)]
pub struct FeeAccrualEngine {
    margin: Option<ScheduledFee>,
    management: Option<ScheduledFee>,
    performance: Option<ScheduledFee>,
    borrow: Option<BorrowAccrual>,
}

impl FeeAccrualEngine {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_margin(mut self, rate: f64, rule: Box<dyn DateRule>) -> Self {
        self.margin = Some(ScheduledFee::new(rate, rule));
        self
    }
    pub fn with_management(mut self, rate: f64, rule: Box<dyn DateRule>) -> Self {
        self.management = Some(ScheduledFee::new(rate, rule));
        self
    }
    pub fn with_performance(mut self, rate: f64, rule: Box<dyn DateRule>) -> Self {
        self.performance = Some(ScheduledFee::new(rate, rule));
        self
    }
    pub fn with_borrow(mut self, provider: Box<dyn BorrowFeeProvider>, data_start: Date) -> Self {
        self.borrow = Some(BorrowAccrual::new(provider, data_start));
        self
    }

    /// Rules are built over `sessions`, the trading calendar of the run.
    pub fn from_config(
        config: &FeesConfig,
        sessions: &[Date],
        provider: Option<Box<dyn BorrowFeeProvider>>,
    ) -> Result<Self> {
        let scheduled = |c: &crate::config::FeeRuleConfig| ScheduledFee::new(c.rate, c.rule.build(sessions, c.days_offset));
        let borrow = match (&config.borrow, provider) {
            (Some(borrow), Some(provider)) => Some(BorrowAccrual::new(provider, borrow.data_start)),
            (Some(_), None) => bail!("borrow fees are enabled without a borrow fee provider"),
            (None, _) => None,
        };
        Ok(Self {
            margin: config.margin.as_ref().map(scheduled),
            management: config.management.as_ref().map(scheduled),
            performance: config.performance.as_ref().map(scheduled),
            borrow,
        })
    }

    pub fn state(&self, kind: FeeKind) -> Option<&AccrualState> {
        match kind {
            FeeKind::Margin => self.margin.as_ref().map(|f| f.state()),
            FeeKind::Management => self.management.as_ref().map(|f| f.state()),
            FeeKind::Performance => self.performance.as_ref().map(|f| f.state()),
            FeeKind::Borrow => None,
        }
    }
    pub fn borrow(&self) -> Option<&BorrowAccrual> {
        self.borrow.as_ref()
    }

    /// Posts the fees due on `session` to `portfolio` and returns them.
    pub fn handle_session(&mut self, session: Date, portfolio: &mut dyn PortfolioView) -> Vec<FeeCharge> {
        let mut charges = vec![];
        let mut post = |portfolio: &mut dyn PortfolioView, kind: FeeKind, amount: Option<f64>| {
            if let Some(amount) = amount {
                let charge = FeeCharge {
                    date: session,
                    kind,
                    amount,
                };
                info!("Charged {kind} fee of {amount:.2} on {session}");
                portfolio.record_fee(charge.clone());
                charges.push(charge);
            }
        };

        if let Some(fee) = &mut self.margin {
            let amount = fee.accrue_interest(session, portfolio.start_of_day_value(), MARGIN_DAY_COUNT);
            post(portfolio, FeeKind::Margin, amount);
        }
        if let Some(fee) = &mut self.management {
            let amount = fee.accrue_interest(session, portfolio.portfolio_value(), MANAGEMENT_DAY_COUNT);
            post(portfolio, FeeKind::Management, amount);
        }
        if let Some(fee) = &mut self.performance {
            let amount = fee.accrue_performance(session, portfolio.start_of_day_value(), portfolio.portfolio_value());
            post(portfolio, FeeKind::Performance, amount);
        }
        if let Some(borrow) = &mut self.borrow {
            let amount = borrow.accrue(session, &portfolio.positions());
            post(portfolio, FeeKind::Borrow, amount);
        }
        charges
    }
}
