//! Command dispatch
//!
//! All mutations funnel through one mpsc channel consumed by a single task,
//! which gives per-source ordering for free. Raw price components live on a
//! shared [`PriceBoard`] so the latest values are readable without a round
//! trip through the service.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use gridbill_common::{EntityId, GridbillError, Result, SourceDescriptor, SourceId};
use gridbill_tariff::{PriceResolver, ResolvedPrice, TariffConfig};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::ledger::{
    AccumulationLedger, FixedCostCategory, FixedCostOutcome, LedgerSnapshot, Notice,
    ReadingOutcome, Summary,
};
use crate::meter::{MeterField, MeterState};

const COMMAND_BUFFER: usize = 256;

/// Latest raw values of every price component entity
///
/// `None` marks a component that reported itself unavailable, which blocks
/// base price resolution for every source using it.
#[derive(Debug, Default)]
pub struct PriceBoard {
    prices: DashMap<EntityId, Option<Decimal>>,
}

impl PriceBoard {
    pub fn update(&self, entity: EntityId, value: Option<Decimal>) {
        self.prices.insert(entity, value);
    }

    pub fn get(&self, entity: &EntityId) -> Option<Decimal> {
        self.prices.get(entity).and_then(|value| *value)
    }

    /// Resolves the base price for a source's component list
    pub fn resolve_base(&self, components: &[EntityId]) -> Option<Decimal> {
        let values: Vec<Option<Decimal>> =
            components.iter().map(|entity| self.get(entity)).collect();
        PriceResolver::resolve(&values)
    }
}

/// Messages understood by the ledger service
#[derive(Debug)]
pub enum Command {
    MeterReading {
        source: SourceId,
        reading: Decimal,
        at: DateTime<Utc>,
    },
    PriceUpdate {
        entity: EntityId,
        value: Option<Decimal>,
    },
    RegisterSource {
        descriptor: SourceDescriptor,
        reply: oneshot::Sender<Result<()>>,
    },
    UpdateConfig {
        config: TariffConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    ApplyDailyFixedCost {
        category: FixedCostCategory,
        day: NaiveDate,
        reply: oneshot::Sender<FixedCostOutcome>,
    },
    /// Zero accumulators; `None` means every source
    ResetMeters {
        sources: Option<Vec<SourceId>>,
        reply: oneshot::Sender<Result<()>>,
    },
    SetMeterValue {
        source: SourceId,
        field: MeterField,
        value: Decimal,
        reply: oneshot::Sender<Result<()>>,
    },
    GetSummary {
        reply: oneshot::Sender<Summary>,
    },
    GetMeterState {
        source: SourceId,
        reply: oneshot::Sender<Result<MeterState>>,
    },
    GetCurrentPrice {
        source: SourceId,
        reply: oneshot::Sender<Result<ResolvedPrice>>,
    },
    DrainNotices {
        reply: oneshot::Sender<Vec<Notice>>,
    },
    Snapshot {
        reply: oneshot::Sender<LedgerSnapshot>,
    },
    Shutdown,
}

/// Cloneable front door to a running ledger service
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    tx: mpsc::Sender<Command>,
    prices: Arc<PriceBoard>,
}

impl LedgerHandle {
    /// Submits a meter reading, priced against the current board
    pub async fn submit_reading(
        &self,
        source: SourceId,
        reading: Decimal,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.send(Command::MeterReading {
            source,
            reading,
            at,
        })
        .await
    }

    /// Publishes a new raw price component value. Parked readings that were
    /// waiting on this component get retried.
    pub async fn update_price(&self, entity: EntityId, value: Option<Decimal>) -> Result<()> {
        self.send(Command::PriceUpdate { entity, value }).await
    }

    pub async fn register_source(&self, descriptor: SourceDescriptor) -> Result<()> {
        self.request(|reply| Command::RegisterSource { descriptor, reply })
            .await?
    }

    pub async fn update_config(&self, config: TariffConfig) -> Result<()> {
        self.request(|reply| Command::UpdateConfig { config, reply })
            .await?
    }

    pub async fn apply_daily_fixed_cost(
        &self,
        category: FixedCostCategory,
        day: NaiveDate,
    ) -> Result<FixedCostOutcome> {
        self.request(|reply| Command::ApplyDailyFixedCost {
            category,
            day,
            reply,
        })
        .await
    }

    pub async fn reset_all_meters(&self) -> Result<()> {
        self.request(|reply| Command::ResetMeters {
            sources: None,
            reply,
        })
        .await?
    }

    pub async fn reset_selected_meters(&self, sources: Vec<SourceId>) -> Result<()> {
        self.request(|reply| Command::ResetMeters {
            sources: Some(sources),
            reply,
        })
        .await?
    }

    pub async fn set_meter_value(
        &self,
        source: SourceId,
        field: MeterField,
        value: Decimal,
    ) -> Result<()> {
        self.request(|reply| Command::SetMeterValue {
            source,
            field,
            value,
            reply,
        })
        .await?
    }

    pub async fn summary(&self) -> Result<Summary> {
        self.request(|reply| Command::GetSummary { reply }).await
    }

    pub async fn meter_state(&self, source: SourceId) -> Result<MeterState> {
        self.request(|reply| Command::GetMeterState { source, reply })
            .await?
    }

    pub async fn current_price(&self, source: SourceId) -> Result<ResolvedPrice> {
        self.request(|reply| Command::GetCurrentPrice { source, reply })
            .await?
    }

    pub async fn drain_notices(&self) -> Result<Vec<Notice>> {
        self.request(|reply| Command::DrainNotices { reply }).await
    }

    pub async fn snapshot(&self) -> Result<LedgerSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    /// Direct read access to the latest raw component prices
    pub fn prices(&self) -> &PriceBoard {
        &self.prices
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| GridbillError::Internal("ledger service stopped".into()))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await
            .map_err(|_| GridbillError::Internal("ledger service stopped".into()))
    }
}

/// Single-consumer task driving an [`AccumulationLedger`]
pub struct LedgerService {
    ledger: AccumulationLedger,
    prices: Arc<PriceBoard>,
    /// Source id to price component routing, kept in sync with the ledger
    routes: BTreeMap<SourceId, Vec<EntityId>>,
    rx: mpsc::Receiver<Command>,
}

impl LedgerService {
    /// Spawns the service on the current runtime and returns its handle
    pub fn spawn(ledger: AccumulationLedger) -> (LedgerHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let prices = Arc::new(PriceBoard::default());
        let routes = ledger
            .descriptors()
            .into_iter()
            .map(|descriptor| (descriptor.id, descriptor.price_components))
            .collect();
        let service = Self {
            ledger,
            prices: prices.clone(),
            routes,
            rx,
        };
        let handle = LedgerHandle { tx, prices };
        (handle, tokio::spawn(service.run()))
    }

    async fn run(mut self) {
        info!(sources = self.routes.len(), "ledger service started");
        while let Some(command) = self.rx.recv().await {
            if !self.handle(command) {
                break;
            }
        }
        info!("ledger service stopped");
    }

    /// Returns false when the loop should exit
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::MeterReading {
                source,
                reading,
                at,
            } => {
                let base = self.base_for(&source);
                if let Err(err) = self.ledger.record_reading(&source, base, reading, at) {
                    warn!(%source, %err, "reading rejected");
                }
            }
            Command::PriceUpdate { entity, value } => {
                self.prices.update(entity.clone(), value);
                self.retry_parked(&entity);
            }
            Command::RegisterSource { descriptor, reply } => {
                let route = (descriptor.id.clone(), descriptor.price_components.clone());
                let result = self.ledger.register_source(descriptor);
                if result.is_ok() {
                    self.routes.insert(route.0, route.1);
                }
                let _ = reply.send(result);
            }
            Command::UpdateConfig { config, reply } => {
                let _ = reply.send(self.ledger.update_config(config));
            }
            Command::ApplyDailyFixedCost {
                category,
                day,
                reply,
            } => {
                let _ = reply.send(self.ledger.apply_daily_fixed_cost(category, day));
            }
            Command::ResetMeters { sources, reply } => {
                let result = match sources {
                    None => {
                        self.ledger.reset_all_meters();
                        Ok(())
                    }
                    Some(sources) => self.ledger.reset_selected_meters(&sources),
                };
                let _ = reply.send(result);
            }
            Command::SetMeterValue {
                source,
                field,
                value,
                reply,
            } => {
                let _ = reply.send(self.ledger.set_source_field(&source, field, value));
            }
            Command::GetSummary { reply } => {
                let _ = reply.send(self.ledger.summary());
            }
            Command::GetMeterState { source, reply } => {
                let _ = reply.send(self.ledger.meter_state(&source));
            }
            Command::GetCurrentPrice { source, reply } => {
                let base = self.base_for(&source);
                let _ = reply.send(self.ledger.current_price(&source, base));
            }
            Command::DrainNotices { reply } => {
                let _ = reply.send(self.ledger.drain_notices());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.ledger.snapshot());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn base_for(&self, source: &SourceId) -> Option<Decimal> {
        let components = self.routes.get(source)?;
        self.prices.resolve_base(components)
    }

    /// Re-prices readings that were parked waiting for this component
    fn retry_parked(&mut self, entity: &EntityId) {
        let waiting: Vec<SourceId> = self
            .routes
            .iter()
            .filter(|(source, components)| {
                components.contains(entity) && self.ledger.pending(source).is_some()
            })
            .map(|(source, _)| source.clone())
            .collect();
        for source in waiting {
            let Some(base) = self.base_for(&source) else {
                continue;
            };
            let Some(parked) = self.ledger.pending(&source) else {
                continue;
            };
            debug!(%source, "retrying parked reading");
            match self
                .ledger
                .record_reading(&source, Some(base), parked.reading, parked.at)
            {
                Ok(ReadingOutcome::Recorded { delta, amount }) => {
                    debug!(%source, %delta, %amount, "parked reading recorded");
                }
                Ok(_) => {}
                Err(err) => warn!(%source, %err, "parked reading rejected"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gridbill_common::SourceKind;
    use rust_decimal_macros::dec;

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap()
    }

    fn descriptor() -> SourceDescriptor {
        SourceDescriptor::new("grid", SourceKind::ElectricityConsumption, "sensor.energy")
            .with_price_component("sensor.price")
    }

    async fn running_service() -> (LedgerHandle, tokio::task::JoinHandle<()>) {
        let ledger = AccumulationLedger::new(TariffConfig::default()).unwrap();
        let (handle, task) = LedgerService::spawn(ledger);
        handle.register_source(descriptor()).await.unwrap();
        (handle, task)
    }

    #[tokio::test]
    async fn test_readings_are_priced_from_the_board() {
        let (handle, task) = running_service().await;
        let grid = SourceId::new("grid");

        handle
            .update_price(EntityId::new("sensor.price"), Some(dec!(0.10)))
            .await
            .unwrap();
        handle
            .submit_reading(grid.clone(), dec!(1000), noon(1))
            .await
            .unwrap();
        handle
            .submit_reading(grid.clone(), dec!(1002), noon(2))
            .await
            .unwrap();

        let meter = handle.meter_state(grid).await.unwrap();
        assert_eq!(meter.total_kwh, dec!(2));
        assert!(meter.total_cost > Decimal::ZERO);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_parked_reading_retried_on_price_update() {
        let (handle, task) = running_service().await;
        let grid = SourceId::new("grid");

        handle
            .update_price(EntityId::new("sensor.price"), Some(dec!(0.10)))
            .await
            .unwrap();
        handle
            .submit_reading(grid.clone(), dec!(1000), noon(1))
            .await
            .unwrap();
        // component drops out, next reading must park
        handle
            .update_price(EntityId::new("sensor.price"), None)
            .await
            .unwrap();
        handle
            .submit_reading(grid.clone(), dec!(1005), noon(2))
            .await
            .unwrap();
        let meter = handle.meter_state(grid.clone()).await.unwrap();
        assert_eq!(meter.total_kwh, Decimal::ZERO);

        // price comes back, the parked delta lands
        handle
            .update_price(EntityId::new("sensor.price"), Some(dec!(0.12)))
            .await
            .unwrap();
        let meter = handle.meter_state(grid).await.unwrap();
        assert_eq!(meter.total_kwh, dec!(5));

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_current_price_quote() {
        let (handle, task) = running_service().await;

        let err = handle.current_price(SourceId::new("grid")).await.unwrap_err();
        assert!(matches!(err, GridbillError::Pricing(_)));

        handle
            .update_price(EntityId::new("sensor.price"), Some(dec!(0.10)))
            .await
            .unwrap();
        let quote = handle.current_price(SourceId::new("grid")).await.unwrap();
        assert_eq!(quote.base, dec!(0.10));
        assert!(quote.unit_price > quote.base);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_operator_overrides() {
        let (handle, task) = running_service().await;
        let grid = SourceId::new("grid");

        handle
            .set_meter_value(grid.clone(), MeterField::TotalCost, dec!(12.5))
            .await
            .unwrap();
        assert_eq!(
            handle.meter_state(grid.clone()).await.unwrap().total_cost,
            dec!(12.5)
        );

        handle.reset_all_meters().await.unwrap();
        assert_eq!(
            handle.meter_state(grid.clone()).await.unwrap().total_cost,
            Decimal::ZERO
        );

        let err = handle
            .set_meter_value(SourceId::new("nope"), MeterField::TotalKwh, dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GridbillError::Ledger(_)));

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_board_is_readable_from_the_handle() {
        let (handle, task) = running_service().await;
        handle
            .update_price(EntityId::new("sensor.price"), Some(dec!(0.08)))
            .await
            .unwrap();
        // queries drain the queue, so the board write has landed after one
        let _ = handle.summary().await.unwrap();
        assert_eq!(
            handle.prices().get(&EntityId::new("sensor.price")),
            Some(dec!(0.08))
        );
        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
