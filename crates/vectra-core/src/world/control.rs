use super::SimulationState;
use crate::spatial;

/// Fixed radius of the one-shot active surveillance sweep, metres.
const SURVEILLANCE_RADIUS: f64 = 15_000.0;

impl SimulationState {
    /// Start-of-day control actions. Reacts to the previous day's
    /// detections: restriction zones and active surveillance each run once
    /// after the outbreak has been observed.
    pub(crate) fn control_step(&mut self) {
        if self.config.control.no_control || !self.outbreak.btv_observed {
            return;
        }
        if self.config.control.restriction_zones && !self.outbreak.restriction_zones_implemented {
            self.implement_restriction_zones();
        }
        if !self.outbreak.active_surveillance_performed {
            self.perform_active_surveillance();
        }
    }

    /// Handle a detection event on one farm: flags, counters, movement
    /// bans, and first-detection bookkeeping. Idempotent per farm.
    pub(crate) fn trigger_detection(&mut self, idx: usize) {
        if self.farms[idx].detected {
            return;
        }
        {
            let farm = &mut self.farms[idx];
            farm.detected = true;
            farm.ever_been_detected = true;
        }
        self.daily.detections += 1;
        self.outbreak.days_since_last_detection = 0;
        tracing::info!(farm = self.farms[idx].id, day = self.day, "infection detected");

        if !self.config.control.no_control {
            if !self.config.control.no_farm_ban {
                let farm = &mut self.farms[idx];
                farm.movement_banned = true;
                farm.free_area = false;
            }
            self.apply_local_ban(idx);
        }

        if !self.outbreak.btv_observed {
            self.outbreak.btv_observed = true;
            self.outbreak.first_detected_farm = Some(idx);
        }
    }

    /// Ban movement around a newly detected farm. The neighbour list is
    /// computed on the farm's first detection and cached for good.
    fn apply_local_ban(&mut self, idx: usize) {
        if self.farms[idx].local_farms.is_none() {
            let mut local = spatial::farms_within(
                &self.farm_tree,
                self.farms[idx].position,
                self.config.control.ban_radius,
            );
            local.retain(|&other| other != idx);
            self.farms[idx].local_farms = Some(local);
        }

        if !self.config.control.no_farm_ban {
            let local = self.farms[idx].local_farms.clone().unwrap_or_default();
            for other in local {
                let farm = &mut self.farms[other];
                farm.movement_banned = true;
                farm.free_area = false;
            }
        }
        if self.config.control.county_ban {
            let county = self.farms[idx].county;
            for farm in &mut self.farms {
                if farm.county == county {
                    farm.movement_banned = true;
                    farm.free_area = false;
                }
            }
        }
        if self.config.control.total_ban {
            for farm in &mut self.farms {
                farm.movement_banned = true;
                farm.free_area = false;
            }
        }
    }

    /// Classify every farm against the protection and surveillance radii
    /// around the first-detected farm.
    fn implement_restriction_zones(&mut self) {
        let Some(centre_idx) = self.outbreak.first_detected_farm else {
            return;
        };
        let centre = self.farms[centre_idx].position;
        let pz_sq = self.config.control.pz_radius * self.config.control.pz_radius;
        let sz_sq = self.config.control.sz_radius * self.config.control.sz_radius;
        for farm in &mut self.farms {
            let dx = farm.position[0] - centre[0];
            let dy = farm.position[1] - centre[1];
            let dist_sq = dx * dx + dy * dy;
            if dist_sq <= pz_sq {
                farm.protection_zone = true;
                farm.free_area = false;
            } else if dist_sq <= sz_sq {
                farm.surveillance_zone = true;
                farm.free_area = false;
            }
        }
        self.outbreak.restriction_zones_implemented = true;
        tracing::info!(
            centre = self.farms[centre_idx].id,
            day = self.day,
            "restriction zones implemented"
        );
    }

    /// One-shot test sweep of every farm within the fixed surveillance
    /// radius of the first-detected farm. Positives are marked detected;
    /// they do not re-enter the ban cascade.
    fn perform_active_surveillance(&mut self) {
        let Some(centre_idx) = self.outbreak.first_detected_farm else {
            return;
        };
        let centre = self.farms[centre_idx].position;
        let inside = spatial::farms_within(&self.farm_tree, centre, SURVEILLANCE_RADIUS);
        for other in inside {
            let farm = &mut self.farms[other];
            self.totals.farms_checked += 1;
            self.totals.tests += farm.sheep.total() + farm.cattle.total();
            let infected = farm.sheep.infected() + farm.cattle.infected();
            if infected > 0.0 {
                farm.detected = true;
                farm.ever_been_detected = true;
                self.totals.positive_tests +=
                    infected + farm.sheep.recovered + farm.cattle.recovered;
            }
        }
        self.outbreak.active_surveillance_performed = true;
        tracing::info!(
            centre = self.farms[centre_idx].id,
            day = self.day,
            "active surveillance performed"
        );
    }
}
