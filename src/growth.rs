// Crop growth across the farm grid

use crate::models::Bed;
use tracing::debug;

/// Advance every growing plant by one unit. Does nothing during a drought.
///
/// Returns the number of plants that grew.
pub fn advance(field: &mut [Bed], is_drought: bool) -> usize {
    if is_drought {
        debug!("Drought, growth skipped");
        return 0;
    }

    let mut grown = 0;
    for plant in field.iter_mut().filter_map(|bed| bed.plant.as_mut()) {
        if plant.current_growth < plant.target_growth {
            plant.current_growth += 1;
            grown += 1;
        }
    }

    debug!(grown, "Advanced growth");
    grown
}
