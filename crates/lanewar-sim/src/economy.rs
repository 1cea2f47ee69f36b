//! Soul currency.
//!
//! Picks cost souls and slain enemies may drop them. The engine talks to
//! the balance through `SoulBank` so a host can back it with its own store.

pub trait SoulBank {
    fn balance(&self) -> u32;

    fn can_afford(&self, cost: u32) -> bool {
        self.balance() >= cost
    }

    /// Deduct `cost`. Returns false and leaves the balance untouched when
    /// the bank cannot cover it.
    fn spend(&mut self, cost: u32) -> bool;

    fn earn(&mut self, amount: u32);
}

/// In-memory soul balance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoulLedger {
    souls: u32,
}

impl SoulLedger {
    pub fn new(souls: u32) -> Self {
        Self { souls }
    }
}

impl SoulBank for SoulLedger {
    fn balance(&self) -> u32 {
        self.souls
    }

    fn spend(&mut self, cost: u32) -> bool {
        match self.souls.checked_sub(cost) {
            Some(rest) => {
                self.souls = rest;
                true
            }
            None => false,
        }
    }

    fn earn(&mut self, amount: u32) {
        self.souls = self.souls.saturating_add(amount);
    }
}
