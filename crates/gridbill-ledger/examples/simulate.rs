//! Feeds a ledger service with a simulated day of spot prices and meter
//! readings, then prints the resulting statement.
//!
//! Run with `RUST_LOG=debug cargo run --example simulate` to watch every
//! pricing decision.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use gridbill_common::{EntityId, SourceDescriptor, SourceId, SourceKind};
use gridbill_ledger::{AccumulationLedger, FixedCostCategory, LedgerService};
use gridbill_tariff::presets;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = presets::by_name("zonneplan").expect("known preset");
    let ledger = AccumulationLedger::new(config)?;
    let (handle, task) = LedgerService::spawn(ledger);

    handle
        .register_source(
            SourceDescriptor::new("grid", SourceKind::ElectricityConsumption, "sensor.grid")
                .with_price_component("sensor.epex"),
        )
        .await?;
    handle
        .register_source(
            SourceDescriptor::new("solar", SourceKind::ElectricityProduction, "sensor.solar")
                .with_price_component("sensor.epex"),
        )
        .await?;

    let grid = SourceId::new("grid");
    let solar = SourceId::new("solar");
    let epex = EntityId::new("sensor.epex");

    // hourly spot prices, dipping negative around midday
    let spot: [Decimal; 12] = [
        dec!(0.09),
        dec!(0.08),
        dec!(0.06),
        dec!(0.03),
        dec!(-0.01),
        dec!(-0.02),
        dec!(0.01),
        dec!(0.05),
        dec!(0.09),
        dec!(0.12),
        dec!(0.14),
        dec!(0.11),
    ];

    let mut grid_register = dec!(10000);
    let mut solar_register = dec!(2500);
    for (hour, price) in spot.into_iter().enumerate() {
        let at = Utc
            .with_ymd_and_hms(2025, 6, 21, 8 + hour as u32, 0, 0)
            .single()
            .expect("valid timestamp");
        handle.update_price(epex.clone(), Some(price)).await?;

        grid_register += dec!(0.4);
        solar_register += dec!(1.1);
        handle.submit_reading(grid.clone(), grid_register, at).await?;
        handle.submit_reading(solar.clone(), solar_register, at).await?;
    }
    handle
        .apply_daily_fixed_cost(
            FixedCostCategory::Electricity,
            Utc::now().date_naive(),
        )
        .await?;

    let summary = handle.summary().await?;
    println!("energy cost   : {:.4} EUR", summary.total_energy_cost);
    println!("energy profit : {:.4} EUR", summary.total_energy_profit);
    println!("fixed cost    : {:.4} EUR", summary.total_fixed_cost);
    println!("solar bonus   : {:.4} EUR", summary.total_bonus);
    println!("net total     : {:.4} EUR", summary.net_total_cost);

    for notice in handle.drain_notices().await? {
        println!("notice: {}", notice.message);
    }

    handle.shutdown().await?;
    task.await?;
    Ok(())
}
