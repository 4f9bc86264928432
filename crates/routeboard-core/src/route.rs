//! Route map points

use std::collections::HashSet;

use crate::intervals::normalize_technician;
use crate::{RoutePoint, VisitRecord};

/// Visits with a position fix, restricted to `valid_technicians` and ordered
/// by technician then arrival. Visits without an arrival sort last within
/// their technician.
pub fn route_points(visits: &[VisitRecord], valid_technicians: &[String]) -> Vec<RoutePoint> {
    let valid: HashSet<&str> = valid_technicians.iter().map(String::as_str).collect();

    let mut points: Vec<RoutePoint> = visits
        .iter()
        .filter_map(|visit| {
            let (latitude, longitude) = (visit.latitude?, visit.longitude?);
            let technician = normalize_technician(visit.technician.as_deref());
            if !valid.contains(technician.as_str()) {
                return None;
            }
            Some(RoutePoint {
                technician,
                latitude,
                longitude,
                arrival: visit.arrival,
                departure: visit.departure,
                company_name: visit.company_name.clone(),
                service_code: visit.service_code.clone(),
            })
        })
        .collect();

    points.sort_by(|a, b| {
        a.technician
            .cmp(&b.technician)
            .then_with(|| a.arrival.is_none().cmp(&b.arrival.is_none()))
            .then_with(|| a.arrival.cmp(&b.arrival))
    });
    points
}
