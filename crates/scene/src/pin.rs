use foundation::geo::LngLat;
use foundation::ids::PinId;
use serde::Deserialize;

/// Raw contractor record as delivered by the directory service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContractorRecord {
    pub id: u64,
    pub lat: f64,
    pub lng: f64,
    pub service_type: String,
    pub is_verified: bool,
    pub subscription_tier: String,
}

/// Contractor subscription level, parsed leniently from the directory's
/// free-form tier string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubscriptionTier {
    Basic,
    Pro,
    Premium,
}

impl SubscriptionTier {
    /// Unknown tier strings fall back to `Basic` rather than rejecting
    /// the record; the tier only affects presentation.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pro" => SubscriptionTier::Pro,
            "premium" | "elite" => SubscriptionTier::Premium,
            _ => SubscriptionTier::Basic,
        }
    }
}

/// A contractor's geolocation marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub id: PinId,
    pub position: LngLat,
    pub category: String,
    pub verified: bool,
    pub tier: SubscriptionTier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinDataError {
    NonFiniteCoordinates,
}

impl std::fmt::Display for PinDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinDataError::NonFiniteCoordinates => {
                write!(f, "pin has non-finite coordinates")
            }
        }
    }
}

impl std::error::Error for PinDataError {}

/// One record that could not become a pin.
#[derive(Debug, Clone, PartialEq)]
pub struct PinRejection {
    pub id: PinId,
    pub reason: PinDataError,
}

/// Result of validating a batch of contractor records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PinIngest {
    pub pins: Vec<Pin>,
    pub rejected: Vec<PinRejection>,
}

/// Converts directory records into pins.
///
/// Records with NaN or infinite coordinates are reported in `rejected`
/// instead of aborting the batch; everything else becomes a pin in input
/// order.
pub fn pins_from_records(records: &[ContractorRecord]) -> PinIngest {
    let mut out = PinIngest::default();
    for record in records {
        let position = LngLat::new(record.lng, record.lat);
        if !position.is_finite() {
            out.rejected.push(PinRejection {
                id: PinId(record.id),
                reason: PinDataError::NonFiniteCoordinates,
            });
            continue;
        }
        out.pins.push(Pin {
            id: PinId(record.id),
            position,
            category: record.service_type.clone(),
            verified: record.is_verified,
            tier: SubscriptionTier::parse(&record.subscription_tier),
        });
    }
    out
}
