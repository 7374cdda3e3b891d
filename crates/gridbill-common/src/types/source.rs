//! Tracked sources and their host entity links
//!
//! A source couples one cumulative meter with zero or more raw price
//! components. The ids are opaque strings handed to us by the host platform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a tracked source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Electricity drawn from the grid
    ElectricityConsumption,
    /// Electricity fed back into the grid (e.g. solar)
    ElectricityProduction,
    /// Gas consumption
    Gas,
}

impl SourceKind {
    /// Whether this kind participates in electricity-only features
    /// (netting, overage compensation, solar bonus)
    pub fn is_electricity(&self) -> bool {
        matches!(
            self,
            SourceKind::ElectricityConsumption | SourceKind::ElectricityProduction
        )
    }

    /// Native unit of the linked meter
    pub fn unit(&self) -> &'static str {
        match self {
            SourceKind::ElectricityConsumption | SourceKind::ElectricityProduction => "kWh",
            SourceKind::Gas => "m³",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::ElectricityConsumption => write!(f, "electricity_consumption"),
            SourceKind::ElectricityProduction => write!(f, "electricity_production"),
            SourceKind::Gas => write!(f, "gas"),
        }
    }
}

/// Unique id of a tracked source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of a host entity we read from (meter or raw price component)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tracked source: one cumulative meter plus its price components
///
/// The price components are summed in order by the resolver. An empty list
/// means no base price can ever resolve, so delta readings for the source
/// stay parked and nothing accumulates until pricing is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique source id
    pub id: SourceId,
    /// Source kind
    pub kind: SourceKind,
    /// Linked cumulative meter entity
    pub meter: EntityId,
    /// Raw price component entities, summed into the base price
    pub price_components: Vec<EntityId>,
}

impl SourceDescriptor {
    pub fn new(id: impl Into<String>, kind: SourceKind, meter: impl Into<String>) -> Self {
        Self {
            id: SourceId::new(id),
            kind,
            meter: EntityId::new(meter),
            price_components: Vec::new(),
        }
    }

    /// Add a price component
    pub fn with_price_component(mut self, component: impl Into<String>) -> Self {
        self.price_components.push(EntityId::new(component));
        self
    }

    /// Whether any live pricing is configured for this source
    pub fn has_pricing(&self) -> bool {
        !self.price_components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_units() {
        assert_eq!(SourceKind::ElectricityConsumption.unit(), "kWh");
        assert_eq!(SourceKind::Gas.unit(), "m³");
    }

    #[test]
    fn test_kind_is_electricity() {
        assert!(SourceKind::ElectricityProduction.is_electricity());
        assert!(!SourceKind::Gas.is_electricity());
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = SourceDescriptor::new(
            "home_solar",
            SourceKind::ElectricityProduction,
            "sensor.solar_energy",
        )
        .with_price_component("sensor.epex_spot")
        .with_price_component("sensor.imbalance_fee");

        assert_eq!(descriptor.price_components.len(), 2);
        assert!(descriptor.has_pricing());
    }

    #[test]
    fn test_descriptor_without_pricing() {
        let descriptor =
            SourceDescriptor::new("gas_main", SourceKind::Gas, "sensor.gas_meter");
        assert!(!descriptor.has_pricing());
    }

    #[test]
    fn test_source_id_serde_transparent() {
        let id = SourceId::new("home_solar");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"home_solar\"");
    }
}
