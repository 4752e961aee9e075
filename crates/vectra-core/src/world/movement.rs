use super::SimulationState;
use crate::rng;
use rand::Rng;

impl SimulationState {
    /// Iterate the directed edge list in stored order, sampling whether each
    /// link fires today, applying control interruptions, and stochastically
    /// transferring infected animals.
    pub(crate) fn movement_step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for edge in 0..self.movements.len() {
            let src = self.movements.from[edge];
            let dst = self.movements.to[edge];
            if rng::uniform(rng) > self.movements.risk[edge] {
                continue;
            }
            if self.movement_interrupted(src, dst) {
                self.totals.interrupted_movements += 1;
                if self.farms[src].is_infected() {
                    self.totals.risky_moves_blocked += 1;
                }
                continue;
            }
            self.transfer_shipment(src, dst, rng);
        }
    }

    /// A move is blocked if either endpoint is banned, if it would leave a
    /// protection zone, or if it would carry from a surveillance zone into
    /// the free area.
    fn movement_interrupted(&self, src: usize, dst: usize) -> bool {
        let (from, to) = (&self.farms[src], &self.farms[dst]);
        from.movement_banned
            || to.movement_banned
            || (from.protection_zone && !to.protection_zone)
            || (from.surveillance_zone && to.free_area)
    }

    fn transfer_shipment<R: Rng + ?Sized>(&mut self, src: usize, dst: usize, rng: &mut R) {
        let total_sheep = self.farms[src].sheep.total();
        let total_cattle = self.farms[src].cattle.total();
        if total_sheep + total_cattle < 1.0 {
            return;
        }
        let cattle_move = rng::uniform(rng) > total_sheep / (total_sheep + total_cattle);
        let movement = &self.config.movement;
        let (k, p, herd_total) = if cattle_move {
            (movement.shipment_k_cattle, movement.shipment_p_cattle, total_cattle)
        } else {
            (movement.shipment_k_sheep, movement.shipment_p_sheep, total_sheep)
        };
        let size = (1 + rng::neg_binomial(rng, k, p)).min(herd_total as u64);

        let dst_had_infection = self.farms[dst].is_infected();
        let (src_farm, dst_farm) = pair_mut(&mut self.farms, src, dst);
        let (src_herd, dst_herd) = if cattle_move {
            (&mut src_farm.cattle, &mut dst_farm.cattle)
        } else {
            (&mut src_farm.sheep, &mut dst_farm.sheep)
        };

        // Each shipped animal is infected with the source's current infected
        // fraction; the total stays fixed while the infected count runs down.
        let total = src_herd.total();
        let mut infected = src_herd.infected();
        let mut moved_infected = 0u64;
        for _ in 0..size {
            if rng::uniform(rng) < infected / total {
                let stage = sample_stage(rng, &src_herd.infectious, infected);
                let moved = src_herd.infectious[stage].min(1.0);
                src_herd.infectious[stage] -= moved;
                src_herd.moved_out += moved;
                dst_herd.infectious[stage] += moved;
                dst_herd.moved_in += moved;
                infected -= 1.0;
                moved_infected += 1;
            }
        }

        if moved_infected > 0 {
            self.totals.movement_transmissions += 1;
            let dest = &mut self.farms[dst];
            dest.ever_been_infected = true;
            if !dst_had_infection {
                dest.first_infected_due_to_movement = true;
            }
        }
    }
}

/// Pick an Erlang stage by proportional sampling against the stage masses.
fn sample_stage<R: Rng + ?Sized>(rng: &mut R, stages: &[f64], infected: f64) -> usize {
    let mut target = rng::uniform(rng) * infected;
    for (stage, &mass) in stages.iter().enumerate() {
        if target < mass {
            return stage;
        }
        target -= mass;
    }
    stages
        .iter()
        .rposition(|&mass| mass > 0.0)
        .unwrap_or(stages.len() - 1)
}

/// Disjoint mutable borrows of two slice elements. Endpoint distinctness is
/// validated at construction (no self-loop edges).
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b, "pair_mut requires distinct indices");
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
