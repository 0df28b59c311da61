//! Nearest-airport ranking. A full scan and sort per call; the directory is
//! small enough that no spatial index is needed.

use crate::{
    geo,
    models::{Airport, RankedAirport},
};

use super::{rules::Budget, state::GameState};

/// Annotate every airport with its distance from `origin` and return the
/// `k` nearest, ascending. Equal distances keep their input order.
pub fn rank_nearest(
    airports: &[Airport],
    origin: &Airport,
    k: usize,
    budget: Budget,
    minutes_per_100km: f64,
) -> Vec<RankedAirport> {
    let mut ranked: Vec<RankedAirport> = airports
        .iter()
        .map(|airport| annotate(airport, origin, budget, minutes_per_100km))
        .collect();
    sort_and_truncate(&mut ranked, k);
    ranked
}

/// The `k` nearest airports the player can still fly to: neither current
/// nor visited, and within both budgets.
pub fn reachable_destinations(
    state: &GameState,
    airports: &[Airport],
    origin: &Airport,
    k: usize,
    minutes_per_100km: f64,
) -> Vec<RankedAirport> {
    let budget = state.budget();
    let mut ranked: Vec<RankedAirport> = airports
        .iter()
        .filter(|airport| is_unvisited(state, airport))
        .map(|airport| annotate(airport, origin, budget, minutes_per_100km))
        .filter(|entry| entry.reachable)
        .collect();
    sort_and_truncate(&mut ranked, k);
    ranked
}

/// Whether any unvisited airport in `airports` still fits the budget.
pub fn has_reachable_destination(
    state: &GameState,
    airports: &[Airport],
    origin: &Airport,
    minutes_per_100km: f64,
) -> bool {
    let budget = state.budget();
    airports
        .iter()
        .filter(|airport| is_unvisited(state, airport))
        .any(|airport| annotate(airport, origin, budget, minutes_per_100km).reachable)
}

fn is_unvisited(state: &GameState, airport: &Airport) -> bool {
    airport.ident != state.current_airport && !state.has_visited(&airport.ident)
}

fn annotate(
    airport: &Airport,
    origin: &Airport,
    budget: Budget,
    minutes_per_100km: f64,
) -> RankedAirport {
    let distance = geo::distance_km(origin.coordinates(), airport.coordinates());
    let flight_time = geo::flight_time_minutes(distance, minutes_per_100km);
    RankedAirport {
        id: airport.ident.clone(),
        name: airport.name.clone(),
        latitude: airport.latitude,
        longitude: airport.longitude,
        distance,
        flight_time,
        active: airport.ident == origin.ident,
        reachable: budget.covers(distance, flight_time),
    }
}

fn sort_and_truncate(ranked: &mut Vec<RankedAirport>, k: usize) {
    // `sort_by` is stable, which fixes the tie-break to input order.
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked.truncate(k);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        directory::{fixtures, AirportDirectory},
        game::rules::Difficulty,
        geo::MINUTES_PER_100_KM,
    };

    fn ids(ranked: &[RankedAirport]) -> Vec<&str> {
        ranked.iter().map(|entry| entry.id.as_str()).collect()
    }

    #[test]
    fn ranks_by_geodesic_distance() {
        let directory = fixtures::triangle();
        let airports = directory.eligible();
        let origin = directory.lookup("A").unwrap();

        let ranked = rank_nearest(&airports, &origin, 5, Budget::unlimited(), MINUTES_PER_100_KM);

        // A degree of longitude at 60°N is about half a degree of latitude.
        assert_eq!(ids(&ranked), vec!["A", "C", "B"]);
        assert_eq!(ranked[0].distance, 0.0);
        assert!(ranked[0].active);
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].distance <= pair[1].distance));
        assert_eq!(
            ranked[2].flight_time,
            geo::flight_time_minutes(ranked[2].distance, MINUTES_PER_100_KM)
        );
    }

    #[test]
    fn ranking_is_deterministic_and_truncated() {
        let directory = fixtures::triangle();
        let airports = directory.eligible();
        let origin = directory.lookup("B").unwrap();
        let first = rank_nearest(&airports, &origin, 2, Budget::unlimited(), MINUTES_PER_100_KM);
        let second = rank_nearest(&airports, &origin, 2, Budget::unlimited(), MINUTES_PER_100_KM);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn ties_keep_input_order() {
        let airports = vec![
            fixtures::airport("O", 60.0, 25.0),
            fixtures::airport("X", 61.0, 25.0),
            fixtures::airport("Y", 61.0, 25.0),
        ];
        let ranked = rank_nearest(&airports, &airports[0], 3, Budget::unlimited(), 15.0);
        assert_eq!(ids(&ranked), vec!["O", "X", "Y"]);

        let reversed: Vec<_> = airports.iter().rev().cloned().collect();
        let ranked = rank_nearest(&reversed, &airports[0], 3, Budget::unlimited(), 15.0);
        assert_eq!(ids(&ranked), vec!["O", "Y", "X"]);
    }

    #[test]
    fn reachable_skips_visited_and_out_of_budget() {
        let directory = fixtures::triangle();
        let airports = directory.eligible();
        let origin = directory.lookup("A").unwrap();
        let mut state = GameState::new(
            "Aino".to_string(),
            "A".to_string(),
            vec!["B".to_string()],
            Difficulty::Normal,
            Budget {
                time: 420.0,
                distance: 100.0,
            },
        );

        let reachable = reachable_destinations(&state, &airports, &origin, 5, 15.0);
        assert_eq!(ids(&reachable), vec!["C"]);
        assert!(has_reachable_destination(&state, &airports, &origin, 15.0));

        state.visited_airports.push("C".to_string());
        assert!(reachable_destinations(&state, &airports, &origin, 5, 15.0).is_empty());
        assert!(!has_reachable_destination(&state, &airports, &origin, 15.0));

        let ranked = rank_nearest(&airports, &origin, 5, state.budget(), 15.0);
        assert!(!ranked.iter().find(|entry| entry.id == "B").unwrap().reachable);
    }
}
