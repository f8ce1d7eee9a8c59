use std::collections::HashMap;
use std::sync::Arc;

use trading_model::core::Time;
use trading_model::{Future, Sid};

/// Chain membership filter for one root symbol.
pub type ChainPredicate = Arc<dyn Fn(&Future) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainContract {
    pub sid: Sid,
    pub start_date: Time,
    pub auto_close_date: Time,
}

/// Futures of one root symbol ordered by auto close date.
#[derive(Debug, Clone)]
pub struct OrderedContracts {
    root_symbol: String,
    contracts: Vec<ChainContract>,
    position: HashMap<Sid, usize>,
}

impl OrderedContracts {
    /// `futures` in any order; the predicate drops contracts that do not belong in the chain.
    pub fn new(root_symbol: impl Into<String>, futures: &[Future], predicate: Option<&ChainPredicate>) -> Self {
        let mut contracts: Vec<ChainContract> = futures
            .iter()
            .filter(|f| predicate.map_or(true, |p| (**p)(*f)))
            .map(|f| ChainContract {
                sid: f.sid,
                start_date: f.start_date,
                auto_close_date: f.auto_close_date,
            })
            .collect();
        contracts.sort_by_key(|c| (c.auto_close_date, c.sid));
        let position = contracts.iter().enumerate().map(|(i, c)| (c.sid, i)).collect();
        Self {
            root_symbol: root_symbol.into(),
            contracts,
            position,
        }
    }
    pub fn root_symbol(&self) -> &str {
        &self.root_symbol
    }
    pub fn contracts(&self) -> &[ChainContract] {
        &self.contracts
    }
    pub fn len(&self) -> usize {
        self.contracts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
    /// Start of the first contract, [`Time::NAT`] for an empty chain.
    pub fn start_date(&self) -> Time {
        self.contracts.first().map_or(Time::NAT, |c| c.start_date)
    }
    /// Auto close of the last contract, [`Time::NAT`] for an empty chain.
    pub fn end_date(&self) -> Time {
        self.contracts.last().map_or(Time::NAT, |c| c.auto_close_date)
    }
    /// First contract still open at `dt`.
    pub fn contract_before_auto_close(&self, dt: Time) -> Option<Sid> {
        self.contracts.iter().find(|c| dt < c.auto_close_date).map(|c| c.sid)
    }
    /// Contract `offset` places after `sid`, if it already started by `start_cap`.
    pub fn contract_at_offset(&self, sid: Sid, offset: usize, start_cap: Time) -> Option<Sid> {
        let i = *self.position.get(&sid)?;
        let contract = self.contracts.get(i.checked_add(offset)?)?;
        (contract.start_date <= start_cap).then_some(contract.sid)
    }
    /// `starting_sid` and the contracts after it that started by `dt`.
    pub fn active_chain(&self, starting_sid: Sid, dt: Time) -> Vec<Sid> {
        let Some(&i) = self.position.get(&starting_sid) else {
            return vec![];
        };
        self.contracts[i..]
            .iter()
            .filter(|c| c.start_date <= dt)
            .map(|c| c.sid)
            .collect()
    }
}
