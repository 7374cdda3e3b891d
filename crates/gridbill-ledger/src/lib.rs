//! Gridbill Ledger
//!
//! Accumulates energy cost and profit per tracked source. Meter readings
//! come in as cumulative register values; deltas are priced through the
//! tariff engine and booked into cost/profit accumulators, with the
//! electricity-specific registers (netting credit, break-even overage split,
//! solar bonus) layered on top.
//!
//! [`AccumulationLedger`] is the synchronous core; [`LedgerService`] wraps
//! it in a single-consumer command loop for async callers.

pub mod dispatch;
pub mod ledger;
pub mod meter;
pub mod netting;
pub mod overage;
pub mod solar_bonus;

pub use dispatch::{Command, LedgerHandle, LedgerService, PriceBoard};
pub use ledger::{
    AccumulationLedger, FixedCostCategory, FixedCostOutcome, FixedCostState, LedgerSnapshot,
    Notice, NoticeKind, PendingReading, ReadingOutcome, SourceEntry, Summary,
};
pub use meter::{DeltaOutcome, MeterField, MeterState};
pub use netting::NettingState;
pub use overage::{BreakEvenPolicy, NetConsumptionPolicy, ProductionSplit};
pub use solar_bonus::{DaylightOracle, FixedDaylightWindow, SolarBonusTracker};
