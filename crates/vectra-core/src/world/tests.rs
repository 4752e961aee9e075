use super::*;
use crate::config::{GridConfig, ModelConfig};
use crate::grid::MidgeGrid;
use crate::vector::{Culicoides, VectorSpecies};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Vector profile with every rate pinned to zero; midge dynamics must be the
/// identity under it.
struct InertVector;

impl VectorSpecies for InertVector {
    fn biting_rate(&self, _temp_c: f64) -> f64 {
        0.0
    }
    fn mortality_rate(&self, _temp_c: f64) -> f64 {
        0.0
    }
    fn incubation_rate(&self, _temp_c: f64) -> f64 {
        0.0
    }
}

/// Immortal vector with a fixed incubation rate, to isolate the staged
/// progression from mortality.
struct ImmortalVector;

impl VectorSpecies for ImmortalVector {
    fn biting_rate(&self, _temp_c: f64) -> f64 {
        0.0
    }
    fn mortality_rate(&self, _temp_c: f64) -> f64 {
        0.0
    }
    fn incubation_rate(&self, _temp_c: f64) -> f64 {
        0.1
    }
}

fn base_config() -> ModelConfig {
    let mut config = ModelConfig::default();
    config.sim.dt = 0.25;
    config.sim.start_day_of_year = 90;
    config.epi.num_eip_stages = 4;
    config.epi.num_sheep_stages = 3;
    config.epi.num_cattle_stages = 3;
    config.grid = GridConfig {
        midge_rows: 8,
        midge_cols: 8,
        weather_rows: 8,
        weather_cols: 8,
        midge_cell_size: 1000.0,
    };
    config
}

fn farm_at(id: u32, position: [f64; 2], config: &ModelConfig) -> Farm {
    let mut farm = Farm::new(
        id,
        position,
        0,
        100.0,
        50.0,
        config.epi.num_sheep_stages,
        config.epi.num_cattle_stages,
    );
    farm.temp_cell = (4, 4);
    farm.rain_cell = (4, 4);
    farm.midge_cell = (4, 4);
    farm
}

fn build_state(
    farms: Vec<Farm>,
    movements: MovementNetwork,
    config: ModelConfig,
    temp_c: f64,
    species: Box<dyn VectorSpecies>,
) -> SimulationState {
    let grid = config.grid;
    let midges = MidgeGrid::new(
        grid.midge_rows,
        grid.midge_cols,
        grid.midge_cell_size,
        config.epi.num_eip_stages,
    );
    let temperature = WeatherGrid::constant(grid.weather_rows, grid.weather_cols, temp_c);
    let rainfall = WeatherGrid::constant(grid.weather_rows, grid.weather_cols, 2.0);
    SimulationState::try_new(farms, midges, temperature, rainfall, movements, config, species)
        .expect("test state must validate")
}

fn rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

#[test]
fn cold_cell_applies_survival_only() {
    let config = base_config();
    let mut state = build_state(
        Vec::new(),
        MovementNetwork::new(),
        config,
        0.0,
        Box::new(Culicoides),
    );
    state.midges.seed_infectious(4, 4, 10.0);
    state.simulate_day(&mut rng(1));

    // mortality(0) = 0.009, incubation(0) = 0: pure survival, no staging.
    assert_relative_eq!(
        state.midges.infectious_at(4, 4),
        10.0 * (-0.009f64).exp(),
        epsilon = 1e-12
    );
    assert_eq!(state.midges.latent_mass(), 0.0);
    state.check_invariants().expect("invariants hold");
}

#[test]
fn hot_cell_progresses_latent_mass_through_stages() {
    let config = base_config();
    let mut state = build_state(
        Vec::new(),
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );
    let cell = state.midges.idx(4, 4);
    state.midges.latent[0][cell] = 100.0;
    state.simulate_day(&mut rng(1));

    let survival = (-0.009 * (0.16f64 * 20.0).exp()).exp();
    let incubation: f64 = 4.0 * 0.018 * 6.6;
    let pmf0 = (-incubation).exp();
    let pmf = [
        pmf0,
        incubation * pmf0,
        incubation * incubation / 2.0 * pmf0,
        incubation * incubation * incubation / 6.0 * pmf0,
    ];
    for (stage, &expected_pmf) in pmf.iter().enumerate() {
        assert_relative_eq!(
            state.midges.latent[stage][cell],
            100.0 * survival * expected_pmf,
            epsilon = 1e-9
        );
    }
    let tail = 1.0 - (pmf[0] + pmf[1] + pmf[2] + pmf[3]);
    assert_relative_eq!(
        state.midges.infectious_at(4, 4),
        100.0 * survival * tail,
        epsilon = 1e-9
    );
    state.check_invariants().expect("invariants hold");
}

#[test]
fn midge_step_is_identity_under_inert_vector() {
    let config = base_config();
    let mut state = build_state(
        Vec::new(),
        MovementNetwork::new(),
        config,
        25.0,
        Box::new(InertVector),
    );
    let cell = state.midges.idx(4, 4);
    state.midges.latent[0][cell] = 30.0;
    state.midges.latent[2][cell] = 7.5;
    state.midges.infectious[cell] = 12.0;

    state.midge_mortality_and_incubation();

    assert_eq!(state.midges.latent[0][cell], 30.0);
    assert_eq!(state.midges.latent[2][cell], 7.5);
    assert_eq!(state.midges.infectious[cell], 12.0);
}

#[test]
fn staged_progression_conserves_midge_mass() {
    let config = base_config();
    let mut state = build_state(
        Vec::new(),
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(ImmortalVector),
    );
    let cell = state.midges.idx(4, 4);
    state.midges.latent[0][cell] = 40.0;
    state.midges.latent[1][cell] = 10.0;
    state.midges.latent[3][cell] = 2.5;
    let before = state.midges.latent_mass() + state.midges.infectious_mass();

    state.midge_mortality_and_incubation();

    let after = state.midges.latent_mass() + state.midges.infectious_mass();
    assert_relative_eq!(after, before, epsilon = 1e-9);
}

#[test]
fn diffusion_conserves_mass_away_from_boundary() {
    let config = base_config();
    let mut state = build_state(
        Vec::new(),
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(InertVector),
    );
    state.midges.set_uniform_diffusion(200_000.0);
    let cell = state.midges.idx(4, 4);
    state.midges.latent[1][cell] = 500.0;
    state.midges.infectious[cell] = 250.0;

    state.simulate_day(&mut rng(1));

    assert_relative_eq!(state.midges.latent_mass(), 500.0, epsilon = 1e-9);
    assert_relative_eq!(state.midges.infectious_mass(), 250.0, epsilon = 1e-9);
    assert!(state.midges.infectious_at(3, 4) > 0.0, "mass spread outwards");
    state.check_invariants().expect("scratch zeroed, densities non-negative");
}

#[test]
fn zero_transmission_probabilities_freeze_infection_counts() {
    let mut config = base_config();
    config.epi.p_h = 0.0;
    config.epi.p_v = 0.0;
    let mut farm = farm_at(0, [4500.0, 4500.0], &config);
    farm.sheep.seed_infection(20.0);
    farm.ever_been_infected = true;
    let mut state = build_state(
        vec![farm],
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );
    state.midges.seed_infectious(4, 4, 1000.0);

    let mut generator = rng(9);
    for _ in 0..5 {
        state.simulate_day(&mut generator);
        assert_eq!(state.daily.new_sheep_infections, 0);
        assert_eq!(state.daily.new_cattle_infections, 0);
        assert_eq!(state.midges.latent_mass(), 0.0);
        state.check_invariants().expect("invariants hold");
    }
    // Susceptibles only ever leave through infection.
    assert_eq!(state.farms[0].sheep.susceptible, 80.0);
    assert_eq!(state.farms[0].cattle.susceptible, 50.0);
}

#[test]
fn no_control_never_applies_bans_or_zones() {
    let mut config = base_config();
    config.control.no_control = true;
    config.epi.detection_prob_cattle = 1.0;
    let mut near = farm_at(0, [4500.0, 4500.0], &config);
    near.cattle.seed_infection(30.0);
    near.ever_been_infected = true;
    let other = farm_at(1, [4700.0, 4500.0], &config);
    let mut state = build_state(
        vec![near, other],
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );

    let mut generator = rng(5);
    for _ in 0..10 {
        state.simulate_day(&mut generator);
        for farm in &state.farms {
            assert!(!farm.movement_banned);
            assert!(!farm.protection_zone);
            assert!(!farm.surveillance_zone);
        }
    }
    // Detection itself still happens and is bookkept.
    assert!(state.outbreak.btv_observed);
    assert!(state.farms[0].detected);
    assert!(!state.outbreak.restriction_zones_implemented);
    assert!(!state.outbreak.active_surveillance_performed);
    state.check_invariants().expect("invariants hold");
}

#[test]
fn zero_risk_edges_never_fire() {
    let config = base_config();
    let mut source = farm_at(0, [2000.0, 2000.0], &config);
    source.sheep.seed_infection(10.0);
    source.ever_been_infected = true;
    let target = farm_at(1, [6000.0, 6000.0], &config);
    let mut movements = MovementNetwork::new();
    movements.push(0, 1, 0.0);
    movements.push(1, 0, 0.0);
    let mut state = build_state(
        vec![source, target],
        movements,
        config,
        20.0,
        Box::new(Culicoides),
    );

    let mut generator = rng(17);
    for _ in 0..20 {
        state.simulate_day(&mut generator);
    }
    assert_eq!(state.totals.movement_transmissions, 0);
    assert_eq!(state.totals.interrupted_movements, 0);
    assert_eq!(state.totals.risky_moves_blocked, 0);
    assert_eq!(state.farms[1].sheep.moved_in, 0.0);
}

#[test]
fn movement_without_infection_transfers_nothing() {
    let config = base_config();
    let source = farm_at(0, [2000.0, 2000.0], &config);
    let target = farm_at(1, [6000.0, 6000.0], &config);
    let mut movements = MovementNetwork::new();
    movements.push(0, 1, 1.0);
    let mut state = build_state(
        vec![source, target],
        movements,
        config,
        20.0,
        Box::new(Culicoides),
    );

    state.movement_step(&mut rng(3));

    assert_eq!(state.totals.movement_transmissions, 0);
    assert_eq!(state.totals.interrupted_movements, 0);
    assert_eq!(state.farms[0].sheep.total(), 100.0);
    assert_eq!(state.farms[1].sheep.total(), 100.0);
    assert!(!state.farms[1].first_infected_due_to_movement);
}

#[test]
fn forced_movement_carries_infected_animals_in_stage() {
    let mut config = base_config();
    config.epi.recovery_rate_sheep = 0.0;
    let mut source = farm_at(0, [2000.0, 2000.0], &config);
    // Sheep-only source, everything infected in stage 1: the species pick and
    // the per-animal infection draw are both forced.
    source.cattle = Herd::new(0.0, config.epi.num_cattle_stages);
    source.sheep.seed_infection(100.0);
    source.sheep.infectious[1] = source.sheep.infectious[0];
    source.sheep.infectious[0] = 0.0;
    source.ever_been_infected = true;
    let target = farm_at(1, [6000.0, 6000.0], &config);
    let mut movements = MovementNetwork::new();
    movements.push(0, 1, 1.0);
    let mut state = build_state(
        vec![source, target],
        movements,
        config,
        20.0,
        Box::new(Culicoides),
    );

    state.movement_step(&mut rng(21));

    let moved = state.farms[0].sheep.moved_out;
    assert!(moved >= 1.0);
    assert_eq!(state.farms[1].sheep.moved_in, moved);
    // Transfers stay in the sampled Erlang stage.
    assert_eq!(state.farms[1].sheep.infectious[1], moved);
    assert_eq!(state.farms[1].sheep.infectious[0], 0.0);
    assert_eq!(state.farms[0].sheep.infectious[1], 100.0 - moved);
    assert_eq!(state.totals.movement_transmissions, 1);
    assert!(state.farms[1].first_infected_due_to_movement);
    assert!(state.farms[1].ever_been_infected);
    state.check_invariants().expect("conservation holds");
}

#[test]
fn interruptions_block_and_count_risky_moves() {
    let config = base_config();

    // Banned source with infection: interrupted and counted risky.
    let mut source = farm_at(0, [2000.0, 2000.0], &config);
    source.movement_banned = true;
    source.sheep.seed_infection(5.0);
    source.ever_been_infected = true;
    let target = farm_at(1, [6000.0, 6000.0], &config);
    let mut movements = MovementNetwork::new();
    movements.push(0, 1, 1.0);
    let mut state = build_state(
        vec![source, target],
        movements.clone(),
        config,
        20.0,
        Box::new(Culicoides),
    );
    state.movement_step(&mut rng(4));
    assert_eq!(state.totals.interrupted_movements, 1);
    assert_eq!(state.totals.risky_moves_blocked, 1);
    assert_eq!(state.totals.movement_transmissions, 0);

    // Protection zone may not leak into unzoned farms.
    let mut source = farm_at(0, [2000.0, 2000.0], &config);
    source.protection_zone = true;
    source.free_area = false;
    let target = farm_at(1, [6000.0, 6000.0], &config);
    let mut state = build_state(
        vec![source, target],
        movements.clone(),
        config,
        20.0,
        Box::new(Culicoides),
    );
    state.movement_step(&mut rng(4));
    assert_eq!(state.totals.interrupted_movements, 1);
    assert_eq!(state.totals.risky_moves_blocked, 0);

    // Surveillance zone into the free area is blocked; into another
    // restricted farm it is not.
    let mut source = farm_at(0, [2000.0, 2000.0], &config);
    source.surveillance_zone = true;
    source.free_area = false;
    let mut target = farm_at(1, [6000.0, 6000.0], &config);
    target.surveillance_zone = true;
    target.free_area = false;
    let mut state = build_state(
        vec![source, target],
        movements,
        config,
        20.0,
        Box::new(Culicoides),
    );
    state.movement_step(&mut rng(4));
    assert_eq!(state.totals.interrupted_movements, 0);
}

#[test]
fn passive_detection_rate_matches_closed_form() {
    let mut config = base_config();
    config.control.no_control = true;
    config.epi.detection_prob_cattle = 0.01;
    config.epi.detection_prob_sheep = 0.0;
    config.epi.recovery_rate_cattle = 0.0;
    config.epi.recovery_rate_sheep = 0.0;
    config.epi.p_h = 0.0;
    config.epi.p_v = 0.0;
    let mut farm = farm_at(0, [4500.0, 4500.0], &config);
    farm.sheep = Herd::new(0.0, config.epi.num_sheep_stages);
    farm.cattle.seed_infection(10.0);
    farm.ever_been_infected = true;
    let mut state = build_state(
        vec![farm],
        MovementNetwork::new(),
        config,
        0.0,
        Box::new(Culicoides),
    );

    let reps: u32 = 100_000;
    let mut detections = 0u32;
    let mut generator = rng(2024);
    for _ in 0..reps {
        state.simulate_day(&mut generator);
        detections += state.daily.detections;
        state.farms[0].detected = false;
    }

    let observed = f64::from(detections) / f64::from(reps);
    let expected = 1.0 - 0.99f64.powi(10);
    // Three-sigma band for 1e5 Bernoulli replicates.
    assert_abs_diff_eq!(observed, expected, epsilon = 0.0028);
}

#[test]
fn detection_cascades_into_local_ban_and_outbreak_flags() {
    let mut config = base_config();
    config.control.ban_radius = 2000.0;
    let centre = farm_at(0, [4000.0, 4000.0], &config);
    let near = farm_at(1, [4500.0, 4000.0], &config);
    let far = farm_at(2, [9000.0, 9000.0], &config);
    let mut state = build_state(
        vec![centre, near, far],
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );

    state.trigger_detection(0);

    assert!(state.farms[0].detected && state.farms[0].ever_been_detected);
    assert!(state.farms[0].movement_banned && !state.farms[0].free_area);
    assert!(state.farms[1].movement_banned && !state.farms[1].free_area);
    assert!(!state.farms[2].movement_banned && state.farms[2].free_area);
    assert_eq!(state.farms[0].local_farms.as_deref(), Some(&[1usize][..]));
    assert_eq!(state.daily.detections, 1);
    assert!(state.outbreak.btv_observed);
    assert_eq!(state.outbreak.first_detected_farm, Some(0));

    // Re-triggering the same farm is a no-op.
    state.trigger_detection(0);
    assert_eq!(state.daily.detections, 1);
    state.check_invariants().expect("outbreak flags consistent");
}

#[test]
fn county_and_total_bans_escalate_past_no_farm_ban() {
    let mut config = base_config();
    config.control.ban_radius = 100.0;
    config.control.no_farm_ban = true;
    config.control.county_ban = true;
    let mut a = farm_at(0, [2000.0, 2000.0], &config);
    a.county = 1;
    let mut b = farm_at(1, [6000.0, 6000.0], &config);
    b.county = 1;
    let mut c = farm_at(2, [7000.0, 2000.0], &config);
    c.county = 2;
    let mut state = build_state(
        vec![a, b, c],
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );

    state.trigger_detection(0);

    // no_farm_ban suppresses the detected farm's own ban; the county
    // escalation still applies to both county-1 farms.
    assert!(state.farms[0].movement_banned, "county ban covers the detected farm");
    assert!(state.farms[1].movement_banned);
    assert!(!state.farms[2].movement_banned);

    let mut config = base_config();
    config.control.ban_radius = 100.0;
    config.control.no_farm_ban = true;
    config.control.total_ban = true;
    let a = farm_at(0, [2000.0, 2000.0], &config);
    let b = farm_at(1, [6000.0, 6000.0], &config);
    let c = farm_at(2, [7000.0, 2000.0], &config);
    let mut state = build_state(
        vec![a, b, c],
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );
    state.trigger_detection(1);
    assert!(state.farms.iter().all(|f| f.movement_banned));
}

#[test]
fn restriction_zones_classify_by_distance() {
    let mut config = base_config();
    config.control.ban_radius = 100.0;
    config.control.pz_radius = 3000.0;
    config.control.sz_radius = 10_000.0;
    let origin = farm_at(0, [0.0, 0.0], &config);
    let mut inner = farm_at(1, [2500.0, 0.0], &config);
    inner.sheep.seed_infection(5.0);
    inner.ever_been_infected = true;
    let middle = farm_at(2, [6000.0, 0.0], &config);
    let outer = farm_at(3, [20_000.0, 0.0], &config);
    let mut state = build_state(
        vec![origin, inner, middle, outer],
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );

    state.trigger_detection(0);
    state.control_step();

    assert!(state.outbreak.restriction_zones_implemented);
    assert!(state.farms[0].protection_zone);
    assert!(state.farms[1].protection_zone && !state.farms[1].surveillance_zone);
    assert!(state.farms[2].surveillance_zone && !state.farms[2].protection_zone);
    assert!(!state.farms[3].protection_zone && !state.farms[3].surveillance_zone);
    assert!(state.farms[3].free_area);

    // Active surveillance swept the three farms within 15 km and found the
    // infected one.
    assert!(state.outbreak.active_surveillance_performed);
    assert_eq!(state.totals.farms_checked, 3);
    assert_relative_eq!(state.totals.tests, 450.0);
    assert_relative_eq!(state.totals.positive_tests, 5.0);
    assert!(state.farms[1].detected);
    assert!(!state.farms[3].detected);

    // Both one-shot actions stay one-shot.
    let checked = state.totals.farms_checked;
    state.control_step();
    assert_eq!(state.totals.farms_checked, checked);
}

#[test]
fn active_season_gates_latent_seeding() {
    let mut config = base_config();
    config.epi.transmission_scalar = 1.0;
    config.epi.p_v = 0.1;
    let mut farm = farm_at(0, [4500.0, 4500.0], &config);
    farm.cattle.seed_infection(8.0);
    farm.sheep.seed_infection(4.0);
    farm.ever_been_infected = true;
    farm.regression.intercept = 1.2;
    let mut state = build_state(
        vec![farm],
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );
    state.farms[0].overdispersion = 0.0;
    let cell = state.midges.idx(4, 4);

    state.day_of_year = 30;
    state.host_to_midge(0);
    assert_eq!(state.midges.latent[0][cell], 0.0);

    state.day_of_year = 200;
    state.host_to_midge(0);
    let eff_infected = 8.0 + 0.15 * 4.0;
    let expected = 0.1 * eff_infected * (1.2f64).exp().min(5000.0);
    assert_relative_eq!(state.midges.latent[0][cell], expected, epsilon = 1e-12);
}

#[test]
fn clock_advances_and_day_of_year_wraps() {
    let mut config = base_config();
    config.sim.start_day_of_year = 364;
    let mut state = build_state(
        Vec::new(),
        MovementNetwork::new(),
        config,
        10.0,
        Box::new(Culicoides),
    );
    assert_eq!(state.day(), 0);
    assert_eq!(state.day_of_year(), 364);

    let mut generator = rng(1);
    state.simulate_day(&mut generator);
    assert_eq!(state.day(), 1);
    assert_eq!(state.day_of_year(), 0);
    state.simulate_day(&mut generator);
    assert_eq!(state.day(), 2);
    assert_eq!(state.day_of_year(), 1);
}

#[test]
fn outbreak_flags_are_monotonic_and_ban_days_accumulate() {
    let mut config = base_config();
    config.control.ban_radius = 100.0;
    // No onward transmission, so day one's detection stays the only one.
    config.epi.p_v = 0.0;
    config.epi.p_h = 0.0;
    let mut infected = farm_at(0, [4000.0, 4000.0], &config);
    infected.cattle.seed_infection(10.0);
    infected.ever_been_infected = true;
    let other = farm_at(1, [9000.0, 9000.0], &config);
    let mut state = build_state(
        vec![infected, other],
        MovementNetwork::new(),
        config,
        20.0,
        Box::new(Culicoides),
    );

    state.trigger_detection(0);
    assert_eq!(state.outbreak.days_since_last_detection, 0);

    let mut generator = rng(33);
    let mut previous_ban_days = state.totals.ban_days;
    for _ in 0..4 {
        state.simulate_day(&mut generator);
        assert!(state.outbreak.btv_observed);
        assert_eq!(state.outbreak.first_detected_farm, Some(0));
        // One farm is banned, so every control step adds one ban-day.
        assert_eq!(state.totals.ban_days, previous_ban_days + 1);
        previous_ban_days = state.totals.ban_days;
        state.check_invariants().expect("invariants hold");
    }
    assert!(state.outbreak.days_since_last_detection > 0);
}

#[test]
fn busy_multi_day_run_preserves_invariants() {
    let mut config = base_config();
    config.control.ban_radius = 1500.0;
    config.control.pz_radius = 2000.0;
    config.control.sz_radius = 6000.0;
    let mut farms = Vec::new();
    for row in 0..4 {
        for col in 0..4 {
            let idx = row * 4 + col;
            let mut farm = farm_at(
                idx as u32,
                [1000.0 + 1500.0 * col as f64, 1000.0 + 1500.0 * row as f64],
                &config,
            );
            farm.county = (idx % 3) as u32;
            farm.midge_cell = (1 + row as usize, 1 + col as usize);
            farm.temp_cell = (1 + row as usize, 1 + col as usize);
            farm.rain_cell = (1 + row as usize, 1 + col as usize);
            farm.regression.intercept = -1.0;
            farms.push(farm);
        }
    }
    farms[5].sheep.seed_infection(15.0);
    farms[5].ever_been_infected = true;
    let mut movements = MovementNetwork::new();
    for idx in 0..16usize {
        movements.push(idx, (idx + 1) % 16, 0.4);
    }
    let mut state = build_state(farms, movements, config, 22.0, Box::new(Culicoides));
    state.midges.set_uniform_diffusion(100_000.0);
    state.midges.seed_infectious(2, 2, 400.0);

    let mut generator = rng(7);
    for day in 0..40 {
        state.simulate_day(&mut generator);
        if let Err(violation) = state.check_invariants() {
            panic!("day {day}: {violation}");
        }
        assert_eq!(state.day(), day + 1);
    }
    // The seeded outbreak must have produced some activity.
    assert!(state.daily.new_sheep_infections > 0 || state.outbreak.btv_observed || state.totals.movement_transmissions > 0 || state.midges.latent_mass() > 0.0);
}

#[test]
fn identical_seeds_reproduce_identical_runs() {
    let build = || {
        let mut config = base_config();
        config.control.ban_radius = 1500.0;
        let mut source = farm_at(0, [4000.0, 4000.0], &config);
        source.sheep.seed_infection(10.0);
        source.ever_been_infected = true;
        source.regression.intercept = -0.5;
        let target = farm_at(1, [5000.0, 4000.0], &config);
        let mut movements = MovementNetwork::new();
        movements.push(0, 1, 0.5);
        movements.push(1, 0, 0.5);
        let mut state = build_state(
            vec![source, target],
            movements,
            config,
            22.0,
            Box::new(Culicoides),
        );
        state.midges.seed_infectious(4, 4, 200.0);
        state
    };

    let summary_a = build()
        .run_days(&mut rng(99), 25, 5)
        .expect("run succeeds");
    let summary_b = build()
        .run_days(&mut rng(99), 25, 5)
        .expect("run succeeds");
    let json_a = serde_json::to_string(&summary_a).expect("serialize");
    let json_b = serde_json::to_string(&summary_b).expect("serialize");
    assert_eq!(json_a, json_b);
    assert_eq!(summary_a.samples.len(), 5);
}

#[test]
fn run_days_rejects_bad_arguments() {
    let config = base_config();
    let mut state = build_state(
        Vec::new(),
        MovementNetwork::new(),
        config,
        10.0,
        Box::new(Culicoides),
    );
    assert_eq!(
        state.run_days(&mut rng(1), 10, 0),
        Err(RunError::InvalidSampleEvery)
    );
    assert_eq!(
        state.run_days(&mut rng(1), SimulationState::MAX_RUN_DAYS + 1, 1),
        Err(RunError::TooManyDays {
            max: SimulationState::MAX_RUN_DAYS,
            actual: SimulationState::MAX_RUN_DAYS + 1,
        })
    );
}

#[test]
fn construction_rejects_inconsistent_inputs() {
    let config = base_config();
    let grid = config.grid;
    let make_parts = || {
        (
            MidgeGrid::new(
                grid.midge_rows,
                grid.midge_cols,
                grid.midge_cell_size,
                config.epi.num_eip_stages,
            ),
            WeatherGrid::constant(grid.weather_rows, grid.weather_cols, 10.0),
            WeatherGrid::constant(grid.weather_rows, grid.weather_cols, 2.0),
        )
    };

    // Farm with the wrong Erlang chain length.
    let (midges, temperature, rainfall) = make_parts();
    let bad_farm = Farm::new(0, [1000.0, 1000.0], 0, 10.0, 10.0, 7, 3);
    let err = SimulationState::try_new(
        vec![bad_farm],
        midges,
        temperature,
        rainfall,
        MovementNetwork::new(),
        config,
        Box::new(Culicoides),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        StateInitError::FarmStageMismatch { species: "sheep", .. }
    ));

    // Midge grid dimensions diverge from the config.
    let (_, temperature, rainfall) = make_parts();
    let wrong_grid = MidgeGrid::new(6, 8, grid.midge_cell_size, config.epi.num_eip_stages);
    let err = SimulationState::try_new(
        Vec::new(),
        wrong_grid,
        temperature,
        rainfall,
        MovementNetwork::new(),
        config,
        Box::new(Culicoides),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        StateInitError::GridDimensionMismatch { grid: "midge", .. }
    ));

    // Movement edge referencing a missing farm.
    let (midges, temperature, rainfall) = make_parts();
    let mut movements = MovementNetwork::new();
    movements.push(0, 3, 0.5);
    let err = SimulationState::try_new(
        vec![farm_at(0, [1000.0, 1000.0], &config)],
        midges,
        temperature,
        rainfall,
        movements,
        config,
        Box::new(Culicoides),
    )
    .unwrap_err();
    assert_eq!(err, StateInitError::EdgeEndpointOutOfRange { edge: 0 });

    // Self-loop edge.
    let (midges, temperature, rainfall) = make_parts();
    let mut movements = MovementNetwork::new();
    movements.push(0, 0, 0.5);
    let err = SimulationState::try_new(
        vec![farm_at(0, [1000.0, 1000.0], &config)],
        midges,
        temperature,
        rainfall,
        movements,
        config,
        Box::new(Culicoides),
    )
    .unwrap_err();
    assert_eq!(err, StateInitError::EdgeSelfLoop { edge: 0 });

    // Diffusion coefficient past the explicit-Euler stability limit.
    let (mut midges, temperature, rainfall) = make_parts();
    midges.set_uniform_diffusion(3_000_000.0);
    let err = SimulationState::try_new(
        Vec::new(),
        midges,
        temperature,
        rainfall,
        MovementNetwork::new(),
        config,
        Box::new(Culicoides),
    )
    .unwrap_err();
    assert!(matches!(err, StateInitError::DiffusionUnstable { .. }));
}
