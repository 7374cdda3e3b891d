//! The accumulation ledger
//!
//! Owns all per-source meter state plus the cross-source registers (netting
//! credit, solar bonus, daily fixed costs) and applies every reading through
//! the pricing engine. The ledger is driven single-threaded by the dispatch
//! loop; configuration swaps go through a lock so readers elsewhere can hold
//! a consistent [`TariffConfig`] snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use gridbill_common::{
    ConfigError, LedgerError, Result, SourceDescriptor, SourceId, SourceKind,
    ACCUMULATOR_PRECISION,
};
use gridbill_tariff::{
    ContractYearTracker, PriceClass, PricingEngine, ResolvedPrice, TariffConfig,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::meter::{DeltaOutcome, MeterField, MeterState};
use crate::netting::NettingState;
use crate::overage::{BreakEvenPolicy, NetConsumptionPolicy, ProductionSplit};
use crate::solar_bonus::{DaylightOracle, FixedDaylightWindow, SolarBonusTracker};

/// What happened to a submitted meter reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingOutcome {
    /// First reading, baseline established, nothing accumulated
    Baseline,
    /// Register unchanged, only the reading timestamp advanced
    NoChange,
    /// Delta priced and accumulated. `amount` is the signed euro effect of
    /// this delta (owed for consumption and gas, earned for production).
    Recorded { delta: Decimal, amount: Decimal },
    /// Register went backwards, treated as a meter reset and re-baselined
    Rebaselined { previous: Decimal },
    /// No base price available, the reading is parked until one arrives
    Deferred,
}

/// A reading parked while its base price was unavailable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingReading {
    pub reading: Decimal,
    pub at: DateTime<Utc>,
}

/// One tracked source with its accumulated state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub descriptor: SourceDescriptor,
    pub meter: MeterState,
    pub pending: Option<PendingReading>,
}

/// Daily fixed cost categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedCostCategory {
    Electricity,
    Gas,
}

impl fmt::Display for FixedCostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedCostCategory::Electricity => write!(f, "electricity"),
            FixedCostCategory::Gas => write!(f, "gas"),
        }
    }
}

/// Accumulated fixed costs for one category
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FixedCostState {
    /// Last day a fixed cost was booked, guards against double application
    pub last_applied: Option<NaiveDate>,
    pub total_euro: Decimal,
}

/// Result of a daily fixed cost application
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedCostOutcome {
    Applied(Decimal),
    AlreadyApplied,
}

/// Kinds of events worth surfacing to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    MeterReset,
    ContractYearRollover,
}

/// An operator-facing event raised by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub kind: NoticeKind,
    pub source: Option<SourceId>,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, source: Option<SourceId>, at: DateTime<Utc>, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            at,
            kind,
            source,
            message,
        }
    }
}

/// Rolled-up totals across the whole ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_energy_cost: Decimal,
    pub total_energy_profit: Decimal,
    pub total_fixed_cost: Decimal,
    pub total_bonus: Decimal,
    pub netting_credit: Decimal,
    /// `energy cost + fixed cost - energy profit - bonus`
    pub net_total_cost: Decimal,
}

/// Serializable image of the full ledger state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub config: TariffConfig,
    pub sources: BTreeMap<SourceId, SourceEntry>,
    pub netting: NettingState,
    pub solar: SolarBonusTracker,
    pub fixed_electricity: FixedCostState,
    pub fixed_gas: FixedCostState,
}

/// Tracks cost and profit accumulation for every registered source
pub struct AccumulationLedger {
    config: RwLock<Arc<TariffConfig>>,
    sources: BTreeMap<SourceId, SourceEntry>,
    netting: NettingState,
    solar: SolarBonusTracker,
    fixed_electricity: FixedCostState,
    fixed_gas: FixedCostState,
    policy: Box<dyn BreakEvenPolicy>,
    daylight: Box<dyn DaylightOracle>,
    notices: Vec<Notice>,
}

impl fmt::Debug for AccumulationLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccumulationLedger")
            .field("sources", &self.sources.len())
            .field("netting", &self.netting)
            .field("solar", &self.solar)
            .field("notices", &self.notices.len())
            .finish()
    }
}

impl AccumulationLedger {
    pub fn new(config: TariffConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(Arc::new(config)),
            sources: BTreeMap::new(),
            netting: NettingState::default(),
            solar: SolarBonusTracker::default(),
            fixed_electricity: FixedCostState::default(),
            fixed_gas: FixedCostState::default(),
            policy: Box::new(NetConsumptionPolicy),
            daylight: Box::new(FixedDaylightWindow::default()),
            notices: Vec::new(),
        })
    }

    /// Replaces the break-even classification rule
    pub fn with_policy(mut self, policy: impl BreakEvenPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replaces the daylight rule used for solar bonus eligibility
    pub fn with_daylight(mut self, oracle: impl DaylightOracle + 'static) -> Self {
        self.daylight = Box::new(oracle);
        self
    }

    /// Current configuration snapshot, cheap to clone and stable for the
    /// caller even while an update lands concurrently
    pub fn config(&self) -> Arc<TariffConfig> {
        self.config.read().clone()
    }

    /// Validates and swaps in a new configuration wholesale
    pub fn update_config(&self, config: TariffConfig) -> Result<()> {
        config.validate()?;
        info!("tariff configuration updated");
        *self.config.write() = Arc::new(config);
        Ok(())
    }

    pub fn register_source(&mut self, descriptor: SourceDescriptor) -> Result<()> {
        if descriptor.meter.as_str().is_empty() {
            return Err(ConfigError::MissingMeter {
                source_id: descriptor.id.to_string(),
                kind: descriptor.kind.to_string(),
            }
            .into());
        }
        if self.sources.contains_key(&descriptor.id) {
            return Err(ConfigError::DuplicateSource(descriptor.id.to_string()).into());
        }
        info!(source = %descriptor.id, kind = %descriptor.kind, "source registered");
        self.sources.insert(
            descriptor.id.clone(),
            SourceEntry {
                descriptor,
                meter: MeterState::default(),
                pending: None,
            },
        );
        Ok(())
    }

    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        self.sources
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    pub fn meter_state(&self, source: &SourceId) -> Result<MeterState> {
        Ok(self.entry(source)?.meter.clone())
    }

    pub fn pending(&self, source: &SourceId) -> Option<PendingReading> {
        self.sources.get(source).and_then(|entry| entry.pending)
    }

    /// Reads one accumulator by name, for external state restoration flows
    pub fn source_field(&self, source: &SourceId, field: MeterField) -> Result<Decimal> {
        Ok(self.entry(source)?.meter.get(field))
    }

    /// Overwrites one accumulator by name
    pub fn set_source_field(
        &mut self,
        source: &SourceId,
        field: MeterField,
        value: Decimal,
    ) -> Result<()> {
        self.entry_mut(source)?.meter.set(field, value);
        Ok(())
    }

    /// Zeroes the accumulators of every source, keeping baselines so the
    /// next delta still computes against the physical meter
    pub fn reset_all_meters(&mut self) {
        info!("all meter accumulators reset");
        for entry in self.sources.values_mut() {
            entry.meter.reset_totals();
        }
    }

    /// Zeroes the accumulators of the named sources only
    pub fn reset_selected_meters(&mut self, sources: &[SourceId]) -> Result<()> {
        // validate the whole batch before mutating anything
        for source in sources {
            self.entry(source)?;
        }
        for source in sources {
            info!(%source, "meter accumulators reset");
            self.entry_mut(source)?.meter.reset_totals();
        }
        Ok(())
    }

    /// Quotes the current consumer-facing unit price for a source
    pub fn current_price(
        &self,
        source: &SourceId,
        base: Option<Decimal>,
    ) -> Result<ResolvedPrice> {
        let kind = self.entry(source)?.descriptor.kind;
        let config = self.config();
        let engine = PricingEngine::new(&config);
        Ok(engine.resolve_unit_price(base, kind, false)?)
    }

    /// Applies one meter reading
    ///
    /// `base` is the resolved base price at the time of the reading, `None`
    /// while any price component is missing. A missing price parks the
    /// reading without advancing the baseline, so the delta is not lost.
    #[instrument(skip_all, fields(source = %source, %reading))]
    pub fn record_reading(
        &mut self,
        source: &SourceId,
        base: Option<Decimal>,
        reading: Decimal,
        at: DateTime<Utc>,
    ) -> Result<ReadingOutcome> {
        let config = self.config();
        self.roll_contract_year(&config, at);

        let (kind, outcome) = {
            let entry = self.entry(source)?;
            (entry.descriptor.kind, entry.meter.delta(reading))
        };

        match outcome {
            DeltaOutcome::Baseline => {
                let entry = self.entry_mut(source)?;
                entry.meter.advance(reading, at);
                entry.pending = None;
                info!("baseline established");
                Ok(ReadingOutcome::Baseline)
            }
            DeltaOutcome::NoChange => {
                self.entry_mut(source)?.meter.advance(reading, at);
                Ok(ReadingOutcome::NoChange)
            }
            DeltaOutcome::Reset { previous } => {
                let entry = self.entry_mut(source)?;
                entry.meter.advance(reading, at);
                entry.pending = None;
                warn!(%previous, "meter register went backwards, re-baselined");
                self.notices.push(Notice::new(
                    NoticeKind::MeterReset,
                    Some(source.clone()),
                    at,
                    format!("meter register fell from {previous} to {reading}, re-baselined"),
                ));
                Ok(ReadingOutcome::Rebaselined { previous })
            }
            DeltaOutcome::Delta(delta) => {
                let Some(base) = base else {
                    self.entry_mut(source)?.pending = Some(PendingReading { reading, at });
                    debug!("base price unavailable, reading parked");
                    return Ok(ReadingOutcome::Deferred);
                };
                let amount = match kind {
                    SourceKind::ElectricityConsumption => {
                        self.record_consumption(source, &config, base, delta)?
                    }
                    SourceKind::ElectricityProduction => {
                        self.record_production(source, &config, base, delta, at)?
                    }
                    SourceKind::Gas => self.record_gas(source, &config, base, delta)?,
                };
                let entry = self.entry_mut(source)?;
                entry.meter.advance(reading, at);
                entry.pending = None;
                debug!(%delta, %amount, "reading recorded");
                Ok(ReadingOutcome::Recorded { delta, amount })
            }
        }
    }

    fn record_consumption(
        &mut self,
        source: &SourceId,
        config: &TariffConfig,
        base: Decimal,
        delta: Decimal,
    ) -> Result<Decimal> {
        let engine = PricingEngine::new(config);
        let unit_price = engine.consumption_unit_price(base);

        let amount = if config.netting_enabled {
            // the tax portion settles against the credit register first
            let liability = delta * engine.consumption_tax_unit_price();
            let drawn = self.netting.draw(liability);
            delta * engine.consumption_energy_unit_price(base) + liability - drawn
        } else {
            delta * unit_price
        };
        // bucket by the price actually charged; drawn credit can flip a
        // positive gross price into a net payout
        let class = PriceClass::of(amount);

        let entry = self.entry_mut(source)?;
        entry.meter.add_units(delta, class);
        entry.meter.add_euro(amount, SourceKind::ElectricityConsumption);
        Ok(amount)
    }

    fn record_production(
        &mut self,
        source: &SourceId,
        config: &TariffConfig,
        base: Decimal,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Decimal> {
        let net_consumption = self.net_consumption_kwh();
        let engine = PricingEngine::new(config);

        let split = if config.overage_compensation_enabled {
            self.policy.split(delta, net_consumption)
        } else {
            ProductionSplit::all_break_even(delta)
        };
        let break_even_price = engine.production_unit_price(base);
        let surplus_price = engine.surplus_unit_price(base);
        let amount = split.break_even_kwh * break_even_price + split.surplus_kwh * surplus_price;

        if config.netting_enabled {
            self.netting
                .accrue(split.break_even_kwh * engine.consumption_tax_unit_price());
        }

        let eligible = config.solar_bonus_enabled
            && engine.production_break_even_price(base) > Decimal::ZERO
            && self.daylight.is_daylight(at);
        self.solar.accrue(
            delta,
            engine.solar_bonus_unit_rate(base),
            config.solar_bonus_annual_kwh_limit,
            eligible,
        );

        let entry = self.entry_mut(source)?;
        if split.break_even_kwh > Decimal::ZERO {
            entry
                .meter
                .add_units(split.break_even_kwh, PriceClass::of(break_even_price));
            entry.meter.add_euro(
                split.break_even_kwh * break_even_price,
                SourceKind::ElectricityProduction,
            );
        }
        if split.surplus_kwh > Decimal::ZERO {
            entry
                .meter
                .add_units(split.surplus_kwh, PriceClass::of(surplus_price));
            entry.meter.add_euro(
                split.surplus_kwh * surplus_price,
                SourceKind::ElectricityProduction,
            );
        }
        Ok(amount)
    }

    fn record_gas(
        &mut self,
        source: &SourceId,
        config: &TariffConfig,
        base: Decimal,
        delta: Decimal,
    ) -> Result<Decimal> {
        let engine = PricingEngine::new(config);
        let unit_price = engine.gas_unit_price(base);
        let amount = delta * unit_price;

        let entry = self.entry_mut(source)?;
        entry.meter.add_units(delta, PriceClass::of(unit_price));
        entry.meter.add_euro(amount, SourceKind::Gas);
        Ok(amount)
    }

    /// Books the fixed daily cost for one category, at most once per day
    pub fn apply_daily_fixed_cost(
        &mut self,
        category: FixedCostCategory,
        day: NaiveDate,
    ) -> FixedCostOutcome {
        let config = self.config();
        self.roll_contract_year(&config, day.and_time(NaiveTime::MIN).and_utc());
        let engine = PricingEngine::new(&config);
        let (state, amount) = match category {
            FixedCostCategory::Electricity => {
                (&mut self.fixed_electricity, engine.electricity_daily_cost())
            }
            FixedCostCategory::Gas => (&mut self.fixed_gas, engine.gas_daily_cost()),
        };
        if state.last_applied == Some(day) {
            return FixedCostOutcome::AlreadyApplied;
        }
        state.last_applied = Some(day);
        state.total_euro = (state.total_euro + amount).round_dp(ACCUMULATOR_PRECISION);
        debug!(%category, %day, %amount, "daily fixed cost booked");
        FixedCostOutcome::Applied(amount)
    }

    pub fn netting_credit(&self) -> Decimal {
        self.netting.credit()
    }

    pub fn solar(&self) -> &SolarBonusTracker {
        &self.solar
    }

    pub fn fixed_cost(&self, category: FixedCostCategory) -> &FixedCostState {
        match category {
            FixedCostCategory::Electricity => &self.fixed_electricity,
            FixedCostCategory::Gas => &self.fixed_gas,
        }
    }

    /// Takes all outstanding notices, oldest first
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn summary(&self) -> Summary {
        let mut total_energy_cost = Decimal::ZERO;
        let mut total_energy_profit = Decimal::ZERO;
        for entry in self.sources.values() {
            total_energy_cost += entry.meter.total_cost;
            total_energy_profit += entry.meter.total_profit;
        }
        let total_fixed_cost = self.fixed_electricity.total_euro + self.fixed_gas.total_euro;
        let total_bonus = self.solar.total_bonus_euro;
        Summary {
            total_energy_cost,
            total_energy_profit,
            total_fixed_cost,
            total_bonus,
            netting_credit: self.netting.credit(),
            net_total_cost: (total_energy_cost + total_fixed_cost
                - total_energy_profit
                - total_bonus)
                .round_dp(ACCUMULATOR_PRECISION),
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            config: self.config().as_ref().clone(),
            sources: self.sources.clone(),
            netting: self.netting.clone(),
            solar: self.solar.clone(),
            fixed_electricity: self.fixed_electricity.clone(),
            fixed_gas: self.fixed_gas.clone(),
        }
    }

    /// Rebuilds a ledger from a snapshot, re-validating the configuration
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self> {
        snapshot.config.validate()?;
        Ok(Self {
            config: RwLock::new(Arc::new(snapshot.config)),
            sources: snapshot.sources,
            netting: snapshot.netting,
            solar: snapshot.solar,
            fixed_electricity: snapshot.fixed_electricity,
            fixed_gas: snapshot.fixed_gas,
            policy: Box::new(NetConsumptionPolicy),
            daylight: Box::new(FixedDaylightWindow::default()),
            notices: Vec::new(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: LedgerSnapshot = serde_json::from_str(json)?;
        Self::restore(snapshot)
    }

    /// Total electricity drawn minus total electricity produced, the
    /// headroom the break-even policy works against
    fn net_consumption_kwh(&self) -> Decimal {
        let mut net = Decimal::ZERO;
        for entry in self.sources.values() {
            match entry.descriptor.kind {
                SourceKind::ElectricityConsumption => net += entry.meter.total_kwh,
                SourceKind::ElectricityProduction => net -= entry.meter.total_kwh,
                SourceKind::Gas => {}
            }
        }
        net
    }

    /// Advances the contract-year window and resets annual state on rollover.
    /// Notices carry the triggering event's timestamp so replayed event
    /// streams produce identical output.
    fn roll_contract_year(&mut self, config: &TariffConfig, at: DateTime<Utc>) {
        let tracker = ContractYearTracker::new(config.contract_start_date);
        let window = tracker.current_window(at.date_naive());
        if !self.solar.align_to(window) {
            return;
        }
        info!(start = %window.start, "contract year rolled over");
        self.notices.push(Notice::new(
            NoticeKind::ContractYearRollover,
            None,
            at,
            format!("contract year rolled over, new period starts {}", window.start),
        ));
        if config.reset_on_contract_anniversary {
            for entry in self.sources.values_mut() {
                entry.meter.reset_totals();
            }
            self.netting.reset();
            self.fixed_electricity.total_euro = Decimal::ZERO;
            self.fixed_gas.total_euro = Decimal::ZERO;
        }
    }

    fn entry(&self, source: &SourceId) -> Result<&SourceEntry> {
        self.sources
            .get(source)
            .ok_or_else(|| LedgerError::UnknownSource(source.to_string()).into())
    }

    fn entry_mut(&mut self, source: &SourceId) -> Result<&mut SourceEntry> {
        self.sources
            .get_mut(source)
            .ok_or_else(|| LedgerError::UnknownSource(source.to_string()).into())
    }
}
