use indexmap::IndexMap;
use model::carpark::{
    format_distance, marker_label, AggregatedRecord, CarparkAvailability, LotStatus,
    ProximityResult,
};

/// Joins proximity results with live availability.
///
/// Results keep their order and are cut to `limit`. Carparks the feed knows
/// nothing about are kept with an empty `live_status`. Marker labels follow
/// the position after truncation.
pub fn aggregate(
    results: &[ProximityResult],
    availability: Option<&CarparkAvailability>,
    limit: Option<usize>,
) -> Vec<AggregatedRecord> {
    results
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(index, result)| {
            let mut live_status = IndexMap::new();
            if let Some(lots) = availability.and_then(|availability| availability.get(&result.id)) {
                for lot in &lots.lots {
                    live_status
                        .entry(lot.lot_type.clone())
                        .or_insert_with(|| LotStatus::from(lot));
                }
            }
            AggregatedRecord {
                id: result.id.clone(),
                marker_label: marker_label(index),
                position: result.position,
                address: result.address.clone(),
                distance_m: result.distance_m,
                distance_label: format_distance(result.distance_m),
                live_status,
            }
        })
        .collect()
}
