/// Vector species profile: three pure temperature → rate functions bundled
/// behind one interface so alternate vectors can be substituted per run.
///
/// Rates are per day; temperatures are in °C.
pub trait VectorSpecies {
    /// Daily biting rate on hosts.
    fn biting_rate(&self, temp_c: f64) -> f64;
    /// Daily mortality rate.
    fn mortality_rate(&self, temp_c: f64) -> f64;
    /// Daily progression rate through the extrinsic incubation period.
    fn incubation_rate(&self, temp_c: f64) -> f64;
}

/// The default profile: *Culicoides* biting midges.
#[derive(Clone, Copy, Debug, Default)]
pub struct Culicoides;

impl VectorSpecies for Culicoides {
    fn biting_rate(&self, temp_c: f64) -> f64 {
        if temp_c > 3.7 && temp_c < 41.9 {
            0.0002 * temp_c * (temp_c - 3.7) * (41.9 - temp_c).powf(0.37)
        } else {
            0.0
        }
    }

    fn mortality_rate(&self, temp_c: f64) -> f64 {
        if temp_c > -2.0 {
            0.009 * (0.16 * temp_c).exp()
        } else {
            // Effectively total daily mortality below the survival threshold.
            100.0
        }
    }

    fn incubation_rate(&self, temp_c: f64) -> f64 {
        (0.018 * (temp_c - 13.4)).max(0.0)
    }
}
