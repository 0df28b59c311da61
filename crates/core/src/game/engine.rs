#![allow(missing_docs)]

use std::sync::Arc;

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    directory::{normalize_ident, AirportDirectory},
    error::{GameError, GameResult},
    geo,
    models::{Airport, RankedAirport},
};

use super::{
    ranking::{has_reachable_destination, rank_nearest, reachable_destinations},
    rules::{Difficulty, FailurePolicy, GameRules},
    state::{GameState, Outcome},
};

/// Result of [`GameEngine::start_game`].
#[derive(Debug, Clone, Serialize)]
pub struct NewGame {
    pub state: GameState,
    /// Nearest airports around the start.
    pub locations: Vec<RankedAirport>,
}

/// Result of [`GameEngine::fly_to`].
#[derive(Debug, Clone, Serialize)]
pub struct FlightReport {
    pub outcome: Outcome,
    /// Identifier of the requested destination.
    pub destination: String,
    /// Length of the requested hop in kilometres.
    pub distance: f64,
    /// Flight time of the requested hop in minutes.
    pub flight_time: f64,
    /// False when the hop was refused, so `distance` and `flight_time`
    /// describe a flight that never happened.
    pub flown: bool,
    /// Nearest airports around the player's location after the move.
    pub locations: Vec<RankedAirport>,
    /// Snapshot taken just before a restart wiped the game.
    #[serde(skip)]
    pub abandoned: Option<GameState>,
}

/// Applies the travel-budget rules to explicit [`GameState`] values.
#[derive(Clone)]
pub struct GameEngine {
    directory: Arc<dyn AirportDirectory>,
    rules: GameRules,
}

impl GameEngine {
    pub fn new(directory: Arc<dyn AirportDirectory>, rules: GameRules) -> Self {
        Self { directory, rules }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn directory(&self) -> &Arc<dyn AirportDirectory> {
        &self.directory
    }

    /// Begin a game at `start_airport` with goals drawn from `rng`.
    pub fn start_game<R: Rng + ?Sized>(
        &self,
        player_name: &str,
        start_airport: &str,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> GameResult<NewGame> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(GameError::MissingParameter("player"));
        }
        if start_airport.trim().is_empty() {
            return Err(GameError::MissingParameter("loc"));
        }
        let start = self.directory.lookup(start_airport)?;

        let candidates = self.goal_candidates(&start);
        if candidates.is_empty() {
            return Err(GameError::NoGoalCandidates(start.ident));
        }
        let goals: Vec<String> = candidates
            .choose_multiple(rng, self.rules.goal_count.max(1))
            .cloned()
            .collect();

        let budget = self.rules.budget_for(difficulty);
        let state = GameState::new(
            player_name.to_string(),
            start.ident.clone(),
            goals,
            difficulty,
            budget,
        );
        info!(
            player = %state.player_name,
            start = %state.start_airport,
            goals = ?state.goal_airports,
            %difficulty,
            "Game started"
        );

        let locations = self.nearby(&state, &start);
        Ok(NewGame { state, locations })
    }

    /// Fly the player to `destination`.
    ///
    /// A hop that does not fit the remaining budget never deducts anything:
    /// under [`FailurePolicy::Reject`] the state is left as it was and the
    /// call fails; under [`FailurePolicy::Restart`] the state is reset to its
    /// starting values.
    ///
    /// Under [`FailurePolicy::Reject`] a game whose budget no longer covers
    /// any unvisited airport ends as lost with [`Outcome::Stranded`], either
    /// right after the hop that used the budget up or when a later hop is
    /// refused.
    pub fn fly_to(&self, state: &mut GameState, destination: &str) -> GameResult<FlightReport> {
        if state.is_finished() {
            return Err(GameError::GameFinished);
        }
        if destination.trim().is_empty() {
            return Err(GameError::MissingParameter("dest"));
        }

        let target = self.directory.lookup(destination)?;
        let origin = self.directory.lookup(&state.current_airport)?;
        let distance = geo::distance_km(origin.coordinates(), target.coordinates());
        let flight_time = geo::flight_time_minutes(distance, self.rules.minutes_per_100km);

        if !state.budget().covers(distance, flight_time) {
            return match self.rules.failure_policy {
                FailurePolicy::Reject if self.is_stranded(state, &origin) => {
                    state.strand();
                    info!(
                        player = %state.player_name,
                        at = %origin.ident,
                        "No reachable airports left, game lost"
                    );
                    Ok(FlightReport {
                        outcome: Outcome::Stranded,
                        destination: target.ident,
                        distance,
                        flight_time,
                        flown: false,
                        locations: self.nearby(state, &origin),
                        abandoned: None,
                    })
                }
                FailurePolicy::Reject => {
                    debug!(
                        player = %state.player_name,
                        from = %origin.ident,
                        to = %target.ident,
                        distance,
                        flight_time,
                        "Hop rejected"
                    );
                    Err(GameError::InsufficientBudget {
                        required_distance: distance,
                        required_time: flight_time,
                        remaining_distance: state.remaining_distance,
                        remaining_time: state.remaining_time,
                    })
                }
                FailurePolicy::Restart => {
                    let start = self.directory.lookup(&state.start_airport)?;
                    let abandoned = state.clone();
                    state.restart();
                    info!(
                        player = %state.player_name,
                        hops = abandoned.hops(),
                        "Budget exhausted, game restarted"
                    );
                    Ok(FlightReport {
                        outcome: Outcome::Restart,
                        destination: target.ident,
                        distance,
                        flight_time,
                        flown: false,
                        locations: self.nearby(state, &start),
                        abandoned: Some(abandoned),
                    })
                }
            };
        }

        let mut outcome = state.commit(&target.ident, distance, flight_time);
        if outcome != Outcome::Victory
            && self.rules.failure_policy == FailurePolicy::Reject
            && self.is_stranded(state, &target)
        {
            state.strand();
            outcome = Outcome::Stranded;
        }
        info!(
            player = %state.player_name,
            to = %target.ident,
            distance,
            flight_time,
            outcome = outcome.as_str(),
            "Flight completed"
        );

        Ok(FlightReport {
            outcome,
            destination: target.ident.clone(),
            distance,
            flight_time,
            flown: true,
            locations: self.nearby(state, &target),
            abandoned: None,
        })
    }

    /// Nearest airports around the player's current location.
    pub fn locations(&self, state: &GameState) -> GameResult<Vec<RankedAirport>> {
        let origin = self.directory.lookup(&state.current_airport)?;
        Ok(self.nearby(state, &origin))
    }

    /// Nearest unvisited airports the player can afford to reach.
    pub fn reachable(&self, state: &GameState) -> GameResult<Vec<RankedAirport>> {
        let origin = self.directory.lookup(&state.current_airport)?;
        Ok(reachable_destinations(
            state,
            &self.directory.eligible(),
            &origin,
            self.rules.nearby_count,
            self.rules.minutes_per_100km,
        ))
    }

    fn nearby(&self, state: &GameState, origin: &Airport) -> Vec<RankedAirport> {
        rank_nearest(
            &self.directory.eligible(),
            origin,
            self.rules.nearby_count,
            state.budget(),
            self.rules.minutes_per_100km,
        )
    }

    /// True when neither an eligible airport nor a remaining goal fits the
    /// budget from `origin`.
    fn is_stranded(&self, state: &GameState, origin: &Airport) -> bool {
        let mut candidates = self.directory.eligible();
        candidates.extend(
            state
                .goal_airports
                .iter()
                .filter_map(|goal| self.directory.lookup(goal).ok()),
        );
        !has_reachable_destination(state, &candidates, origin, self.rules.minutes_per_100km)
    }

    /// Known goal idents other than the start, deduplicated in pool order.
    fn goal_candidates(&self, start: &Airport) -> Vec<String> {
        let pool: Vec<String> = if self.rules.goal_pool.is_empty() {
            self.directory
                .eligible()
                .into_iter()
                .map(|airport| airport.ident)
                .collect()
        } else {
            self.rules
                .goal_pool
                .iter()
                .filter_map(|ident| match self.directory.lookup(ident) {
                    Ok(airport) => Some(airport.ident),
                    Err(_) => {
                        warn!(%ident, "Ignoring unknown goal airport");
                        None
                    }
                })
                .collect()
        };

        let mut candidates: Vec<String> = Vec::with_capacity(pool.len());
        for ident in pool {
            if normalize_ident(&ident) != start.ident && !candidates.contains(&ident) {
                candidates.push(ident);
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        directory::{fixtures, load_directory, DirectoryFilter},
        game::{rules::Budget, state::GameStatus},
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn engine_with(rules: GameRules) -> GameEngine {
        let directory =
            load_directory(None, DirectoryFilter::default()).expect("embedded dataset loads");
        GameEngine::new(Arc::new(directory), rules)
    }

    fn triangle_engine(rules: GameRules) -> GameEngine {
        GameEngine::new(Arc::new(fixtures::triangle()), rules)
    }

    fn triangle_rules(goals: &[&str], time: f64, distance: f64) -> GameRules {
        GameRules {
            starting_time: time,
            starting_distance: distance,
            goal_count: goals.len(),
            goal_pool: goals.iter().map(|goal| goal.to_string()).collect(),
            ..GameRules::default()
        }
    }

    #[test]
    fn start_game_initializes_state() {
        let engine = engine_with(GameRules::default());
        let mut rng = StdRng::seed_from_u64(7);
        let game = engine
            .start_game("Aino", "efhk", Difficulty::Normal, &mut rng)
            .unwrap();

        let state = &game.state;
        assert_eq!(state.player_name, "Aino");
        assert_eq!(state.current_airport, "EFHK");
        assert_eq!(state.visited_airports, vec!["EFHK"]);
        assert_eq!(state.remaining_time, 420.0);
        assert_eq!(state.remaining_distance, 3000.0);
        assert_eq!(state.goal_airports.len(), 1);
        assert!(crate::game::DEFAULT_GOAL_POOL.contains(&state.goal_airports[0].as_str()));
        assert_eq!(game.locations.len(), 5);
        assert_eq!(game.locations[0].id, "EFHK");
        assert!(game.locations[0].active);
    }

    #[test]
    fn goal_selection_follows_the_rng() {
        let engine = engine_with(GameRules {
            goal_count: 3,
            ..GameRules::default()
        });
        let first = engine
            .start_game("A", "EFHK", Difficulty::Normal, &mut StdRng::seed_from_u64(42))
            .unwrap();
        let second = engine
            .start_game("A", "EFHK", Difficulty::Normal, &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(first.state.goal_airports, second.state.goal_airports);
        assert_eq!(first.state.goal_airports.len(), 3);
    }

    #[test]
    fn goals_exclude_the_start_and_clamp_to_pool() {
        let engine = engine_with(GameRules {
            goal_count: 10,
            ..GameRules::default()
        });
        let game = engine
            .start_game("A", "EFIV", Difficulty::Normal, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(game.state.goal_airports.len(), 4);
        assert!(!game.state.is_goal("EFIV"));
    }

    #[test]
    fn start_game_validates_input() {
        let engine = engine_with(GameRules::default());
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            engine
                .start_game("Aino", "ZZZZ", Difficulty::Normal, &mut rng)
                .unwrap_err(),
            GameError::NotFound("ZZZZ".to_string())
        );
        assert_eq!(
            engine
                .start_game("  ", "EFHK", Difficulty::Normal, &mut rng)
                .unwrap_err(),
            GameError::MissingParameter("player")
        );
        assert_eq!(
            engine
                .start_game("Aino", "", Difficulty::Normal, &mut rng)
                .unwrap_err(),
            GameError::MissingParameter("loc")
        );
    }

    #[test]
    fn start_game_fails_without_candidates() {
        let engine = triangle_engine(triangle_rules(&["A"], 420.0, 3000.0));
        assert_eq!(
            engine
                .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(0))
                .unwrap_err(),
            GameError::NoGoalCandidates("A".to_string())
        );
    }

    #[test]
    fn difficulty_sets_budget() {
        let engine = engine_with(GameRules::default());
        let game = engine
            .start_game("A", "EFHK", Difficulty::Hard, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(game.state.remaining_time, 300.0);
        assert_eq!(game.state.remaining_distance, 2000.0);
        assert_eq!(game.state.difficulty, Difficulty::Hard);
    }

    #[test]
    fn fly_to_deducts_exactly_once() {
        let engine = triangle_engine(triangle_rules(&["B"], 420.0, 3000.0));
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut rng)
            .unwrap()
            .state;
        let before = state.clone();

        let report = engine.fly_to(&mut state, "C").unwrap();

        assert_eq!(report.outcome, Outcome::Continue);
        assert_eq!(state.remaining_distance, before.remaining_distance - report.distance);
        assert_eq!(state.remaining_time, before.remaining_time - report.flight_time);
        assert_eq!(report.flight_time, report.distance / 100.0 * 15.0);
        assert_eq!(state.current_airport, "C");
        assert_eq!(state.visited_airports.len(), before.visited_airports.len() + 1);
        assert_eq!(state.visited_airports.last(), Some(&state.current_airport));
        assert_eq!(report.locations[0].id, "C");
    }

    #[test]
    fn reaching_last_goal_is_victory() {
        let engine = triangle_engine(triangle_rules(&["B", "C"], 420.0, 3000.0));
        let mut state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .state;

        let report = engine.fly_to(&mut state, "C").unwrap();
        assert_eq!(report.outcome, Outcome::GoalReached);
        assert_eq!(state.goal_airports, vec!["B"]);

        let report = engine.fly_to(&mut state, "b").unwrap();
        assert_eq!(report.outcome, Outcome::Victory);
        assert_eq!(report.destination, "B");
        assert_eq!(state.status, GameStatus::Won);
        assert_eq!(
            engine.fly_to(&mut state, "A").unwrap_err(),
            GameError::GameFinished
        );
    }

    #[test]
    fn rejected_hop_leaves_state_untouched() {
        let engine = triangle_engine(triangle_rules(&["B"], 420.0, 100.0));
        let mut state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .state;
        let before = state.clone();

        let err = engine.fly_to(&mut state, "B").unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientBudget { remaining_distance, .. } if remaining_distance == 100.0
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn time_budget_alone_can_reject() {
        // 111 km needs ~16.7 minutes.
        let engine = triangle_engine(triangle_rules(&["B"], 10.0, 3000.0));
        let mut state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .state;
        assert!(matches!(
            engine.fly_to(&mut state, "B"),
            Err(GameError::InsufficientBudget { .. })
        ));
        assert!(state.remaining_time >= 0.0);
    }

    #[test]
    fn restart_policy_resets_whole_game() {
        let engine = triangle_engine(GameRules {
            failure_policy: FailurePolicy::Restart,
            ..triangle_rules(&["B"], 420.0, 100.0)
        });
        let mut state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .state;
        engine.fly_to(&mut state, "C").unwrap();
        let mid_game = state.clone();

        let report = engine.fly_to(&mut state, "B").unwrap();
        assert_eq!(report.outcome, Outcome::Restart);
        assert_eq!(report.abandoned, Some(mid_game));
        assert_eq!(state.current_airport, "A");
        assert_eq!(state.visited_airports, vec!["A"]);
        assert_eq!(
            state.budget(),
            Budget {
                time: 420.0,
                distance: 100.0
            }
        );
        assert_eq!(report.locations[0].id, "A");
    }

    #[test]
    fn hop_that_uses_up_the_budget_strands_the_game() {
        // A to C is about 56 km; from C the only unvisited airport is 124 km away.
        let engine = triangle_engine(triangle_rules(&["B"], 420.0, 60.0));
        let mut state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .state;

        let report = engine.fly_to(&mut state, "C").unwrap();
        assert_eq!(report.outcome, Outcome::Stranded);
        assert!(report.flown);
        assert_eq!(state.status, GameStatus::Lost);
        assert_eq!(state.current_airport, "C");
        assert_eq!(state.remaining_distance, 60.0 - report.distance);
        assert_eq!(
            engine.fly_to(&mut state, "B").unwrap_err(),
            GameError::GameFinished
        );
    }

    #[test]
    fn refused_hop_with_nothing_reachable_ends_the_game() {
        let engine = engine_with(GameRules {
            starting_distance: 10.0,
            ..GameRules::default()
        });
        let mut state = engine
            .start_game("Aino", "EFHK", Difficulty::Normal, &mut StdRng::seed_from_u64(5))
            .unwrap()
            .state;
        assert!(engine.reachable(&state).unwrap().is_empty());
        let before = state.clone();

        let report = engine.fly_to(&mut state, "EFOU").unwrap();
        assert_eq!(report.outcome, Outcome::Stranded);
        assert!(!report.flown);
        assert_eq!(report.destination, "EFOU");
        assert_eq!(state.status, GameStatus::Lost);
        assert!(state.is_finished());
        assert_eq!(state.budget(), before.budget());
        assert_eq!(state.visited_airports, before.visited_airports);
        assert_eq!(report.locations[0].id, "EFHK");
    }

    #[test]
    fn restart_policy_never_strands() {
        let engine = triangle_engine(GameRules {
            failure_policy: FailurePolicy::Restart,
            ..triangle_rules(&["B"], 420.0, 60.0)
        });
        let mut state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .state;

        let report = engine.fly_to(&mut state, "C").unwrap();
        assert_eq!(report.outcome, Outcome::Continue);
        assert_eq!(state.status, GameStatus::Active);
        let report = engine.fly_to(&mut state, "B").unwrap();
        assert_eq!(report.outcome, Outcome::Restart);
        assert!(!report.flown);
    }

    #[test]
    fn fly_to_unknown_destination_is_not_found() {
        let engine = triangle_engine(triangle_rules(&["B"], 420.0, 3000.0));
        let mut state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .state;
        let before = state.clone();
        assert_eq!(
            engine.fly_to(&mut state, "Q").unwrap_err(),
            GameError::NotFound("Q".to_string())
        );
        assert_eq!(
            engine.fly_to(&mut state, " ").unwrap_err(),
            GameError::MissingParameter("dest")
        );
        assert_eq!(state, before);
    }

    #[test]
    fn reachable_lists_affordable_unvisited_airports() {
        let engine = triangle_engine(triangle_rules(&["B"], 420.0, 100.0));
        let state = engine
            .start_game("Aino", "A", Difficulty::Normal, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .state;
        let reachable = engine.reachable(&state).unwrap();
        assert_eq!(reachable.len(), 1);
        assert_eq!(reachable[0].id, "C");
    }
}
