use crate::categories::CategoryFilter;
use crate::models::Poi;
use crate::selection::Selection;

/// POIs to display for the current result, selection and category toggles.
///
/// Pure and order-preserving. With a polygon selection only POIs inside the
/// ring survive (envelope check first, then ray casting). Category toggles
/// apply in every mode, but POIs whose category is missing or unknown are
/// always kept.
pub fn visible_pois<'a>(
    pois: &'a [Poi],
    selection: &Selection,
    categories: &CategoryFilter,
) -> Vec<&'a Poi> {
    let polygon = selection.polygon();
    let envelope = polygon.and_then(|p| p.envelope());

    pois.iter()
        .filter(|poi| match (polygon, envelope) {
            (Some(polygon), Some(env)) => {
                let location = poi.location();
                env.contains(&location) && polygon.contains(&location)
            }
            (Some(_), None) => false,
            _ => true,
        })
        .filter(|poi| categories.admits(poi.category.as_deref()))
        .collect()
}
