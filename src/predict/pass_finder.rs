use chrono::{DateTime, Duration, Utc};

use crate::predict::error::{PropagationError, VisibilityError};
use crate::predict::ground_station::{GroundStation, LookAngles};
use crate::predict::propagation::Propagator;
use crate::predict::types::{ContactWindow, OrbitalElementSet};

pub const DEFAULT_SAMPLING_STEP_SECONDS: i64 = 30;
pub const DEFAULT_REFINE_TOLERANCE_MS: i64 = 500;

const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_895;

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityParams {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Coarse scan step used to bracket mask crossings.
    pub sampling_step: Duration,
    /// Bisection stops once the AOS/LOS bracket is this narrow.
    pub refine_tolerance: Duration,
}

impl VisibilityParams {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            sampling_step: Duration::seconds(DEFAULT_SAMPLING_STEP_SECONDS),
            refine_tolerance: Duration::milliseconds(DEFAULT_REFINE_TOLERANCE_MS),
        }
    }

    pub fn with_step(mut self, sampling_step: Duration) -> Self {
        self.sampling_step = sampling_step;
        self
    }

    pub fn with_tolerance(mut self, refine_tolerance: Duration) -> Self {
        self.refine_tolerance = refine_tolerance;
        self
    }

    pub fn validate(&self) -> Result<(), VisibilityError> {
        self.validate_horizon()?;
        self.validate_sampling()
    }

    pub fn validate_horizon(&self) -> Result<(), VisibilityError> {
        if self.end <= self.start {
            return Err(VisibilityError::EmptyHorizon {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn validate_sampling(&self) -> Result<(), VisibilityError> {
        if self.sampling_step <= Duration::zero() {
            return Err(VisibilityError::InvalidSamplingStep(
                "sampling step must be positive".into(),
            ));
        }
        if self.refine_tolerance <= Duration::zero() || self.refine_tolerance > self.sampling_step {
            return Err(VisibilityError::InvalidSamplingStep(
                "refine tolerance must be positive and no larger than the sampling step".into(),
            ));
        }
        Ok(())
    }
}

pub fn validate_mask(min_elevation_deg: f64) -> Result<(), VisibilityError> {
    if !(0.0..90.0).contains(&min_elevation_deg) {
        return Err(VisibilityError::InvalidMask(min_elevation_deg));
    }
    Ok(())
}

/// Find every pass of `elements` above `station`'s mask within the horizon.
pub fn find_windows(
    elements: &OrbitalElementSet,
    station: &GroundStation,
    params: &VisibilityParams,
) -> Result<Vec<ContactWindow>, VisibilityError> {
    params.validate_horizon()?;
    validate_mask(station.min_elevation_deg)?;
    params.validate_sampling()?;
    let propagator = Propagator::new(elements)?;
    find_windows_with(&propagator, station, params)
}

/// Same as [`find_windows`] with an already initialised propagator.
pub fn find_windows_with(
    propagator: &Propagator,
    station: &GroundStation,
    params: &VisibilityParams,
) -> Result<Vec<ContactWindow>, VisibilityError> {
    params.validate_horizon()?;
    validate_mask(station.min_elevation_deg)?;
    params.validate_sampling()?;

    let scan = Scan {
        propagator,
        station,
        mask: station.min_elevation_deg,
        tolerance: params.refine_tolerance,
    };

    let mut windows = Vec::new();
    let mut open: Option<OpenPass> = None;
    let mut prev = params.start;
    let mut cursor = params.start;

    loop {
        let angles = scan.look(cursor)?;
        let visible = angles.elevation_deg >= scan.mask;

        open = match (open.take(), visible) {
            (None, false) => None,
            (None, true) if cursor == params.start => Some(OpenPass {
                aos: cursor,
                aos_azimuth_deg: angles.azimuth_deg,
                clipped_start: true,
                peak_time: cursor,
                peak_elevation_deg: angles.elevation_deg,
            }),
            (None, true) => {
                let (aos, aos_azimuth_deg) = scan.refine_crossing(prev, cursor, Crossing::Rising)?;
                Some(OpenPass {
                    aos,
                    aos_azimuth_deg,
                    clipped_start: false,
                    peak_time: cursor,
                    peak_elevation_deg: angles.elevation_deg,
                })
            }
            (Some(mut pass), true) => {
                if angles.elevation_deg > pass.peak_elevation_deg {
                    pass.peak_time = cursor;
                    pass.peak_elevation_deg = angles.elevation_deg;
                }
                Some(pass)
            }
            (Some(pass), false) => {
                let (los, los_azimuth_deg) = scan.refine_crossing(prev, cursor, Crossing::Setting)?;
                if let Some(window) =
                    scan.close(pass, los, los_azimuth_deg, false, windows.len(), params)?
                {
                    windows.push(window);
                }
                None
            }
        };

        if cursor >= params.end {
            break;
        }
        prev = cursor;
        cursor = (cursor + params.sampling_step).min(params.end);
    }

    // Still above the mask when the horizon closes.
    if let Some(pass) = open {
        let angles = scan.look(params.end)?;
        if let Some(window) =
            scan.close(pass, params.end, angles.azimuth_deg, true, windows.len(), params)?
        {
            windows.push(window);
        }
    }

    log::debug!(
        "{} passes for satellite {} over station {}",
        windows.len(),
        propagator.element_set().satellite_id,
        station.id
    );

    Ok(windows)
}

struct OpenPass {
    aos: DateTime<Utc>,
    aos_azimuth_deg: f64,
    clipped_start: bool,
    peak_time: DateTime<Utc>,
    peak_elevation_deg: f64,
}

#[derive(Clone, Copy, PartialEq)]
enum Crossing {
    Rising,
    Setting,
}

struct Scan<'a> {
    propagator: &'a Propagator,
    station: &'a GroundStation,
    mask: f64,
    tolerance: Duration,
}

impl Scan<'_> {
    fn look(&self, timestamp: DateTime<Utc>) -> Result<LookAngles, PropagationError> {
        let state = self.propagator.propagate(timestamp)?;
        Ok(self.station.look_angles(state.position_km))
    }

    /// Bisect a mask crossing inside `[before, after]`. The returned
    /// instant is always on the visible side of the bracket.
    fn refine_crossing(
        &self,
        before: DateTime<Utc>,
        after: DateTime<Utc>,
        crossing: Crossing,
    ) -> Result<(DateTime<Utc>, f64), PropagationError> {
        let mut low = before;
        let mut high = after;

        while high - low > self.tolerance {
            let mid = low + (high - low) / 2;
            let above = self.look(mid)?.elevation_deg >= self.mask;
            match (crossing, above) {
                (Crossing::Rising, true) | (Crossing::Setting, false) => high = mid,
                (Crossing::Rising, false) | (Crossing::Setting, true) => low = mid,
            }
        }

        let edge = match crossing {
            Crossing::Rising => high,
            Crossing::Setting => low,
        };
        Ok((edge, round2(self.look(edge)?.azimuth_deg)))
    }

    /// Golden-section search for the elevation maximum in `[lo, hi]`.
    fn refine_peak(
        &self,
        lo: DateTime<Utc>,
        hi: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, f64), PropagationError> {
        let at = |offset_s: f64| lo + Duration::nanoseconds((offset_s * 1e9).round() as i64);
        // The peak is searched five times finer than the mask crossings.
        let tolerance_s = self.tolerance.num_milliseconds() as f64 / 5000.0;

        let mut a = 0.0;
        let mut b = (hi - lo).num_milliseconds() as f64 / 1000.0;
        let mut c = b - GOLDEN_RATIO_CONJUGATE * (b - a);
        let mut d = a + GOLDEN_RATIO_CONJUGATE * (b - a);
        let mut fc = self.look(at(c))?.elevation_deg;
        let mut fd = self.look(at(d))?.elevation_deg;

        while b - a > tolerance_s {
            if fc > fd {
                b = d;
                d = c;
                fd = fc;
                c = b - GOLDEN_RATIO_CONJUGATE * (b - a);
                fc = self.look(at(c))?.elevation_deg;
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + GOLDEN_RATIO_CONJUGATE * (b - a);
                fd = self.look(at(d))?.elevation_deg;
            }
        }

        let best = (a + b) / 2.0;
        Ok((at(best), self.look(at(best))?.elevation_deg))
    }

    fn close(
        &self,
        pass: OpenPass,
        los: DateTime<Utc>,
        los_azimuth_deg: f64,
        clipped_end: bool,
        ordinal: usize,
        params: &VisibilityParams,
    ) -> Result<Option<ContactWindow>, PropagationError> {
        // Grazing pass shorter than the refinement tolerance.
        if los <= pass.aos {
            return Ok(None);
        }

        let lo = (pass.peak_time - params.sampling_step).max(pass.aos);
        let hi = (pass.peak_time + params.sampling_step).min(los);
        let (mut tca, mut peak) = (pass.peak_time, pass.peak_elevation_deg);
        if hi > lo {
            let (refined_time, refined_peak) = self.refine_peak(lo, hi)?;
            if refined_peak > peak {
                tca = refined_time;
                peak = refined_peak;
            }
        }

        let satellite_id = self.propagator.element_set().satellite_id;
        Ok(Some(ContactWindow {
            id: format!("{}/{}/{}", satellite_id, self.station.id, ordinal),
            satellite_id,
            station_id: self.station.id.clone(),
            aos: pass.aos,
            los,
            tca,
            peak_elevation_deg: peak,
            aos_azimuth_deg: round2(pass.aos_azimuth_deg),
            los_azimuth_deg: round2(los_azimuth_deg),
            duration_seconds: (los - pass.aos).num_milliseconds() as f64 / 1000.0,
            clipped_start: pass.clipped_start,
            clipped_end,
        }))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::propagation::tests::circular_leo;

    fn new_york() -> GroundStation {
        GroundStation::new("nyc", 40.7, -74.0).with_mask(10.0)
    }

    fn day_params(set: &OrbitalElementSet) -> VisibilityParams {
        VisibilityParams::new(set.epoch, set.epoch + Duration::hours(24))
    }

    fn elevation(set: &OrbitalElementSet, station: &GroundStation, t: DateTime<Utc>) -> f64 {
        let state = Propagator::new(set).unwrap().propagate(t).unwrap();
        station.look_angles(state.position_km).elevation_deg
    }

    #[test]
    fn leo_over_new_york_has_a_handful_of_passes() {
        let set = circular_leo(42, 51.6, 550.0);
        let station = new_york();
        let windows = find_windows(&set, &station, &day_params(&set)).unwrap();

        assert!(
            (3..=8).contains(&windows.len()),
            "expected a handful of passes, got {}",
            windows.len()
        );
        for w in windows.iter().filter(|w| !w.is_clipped()) {
            assert!(
                w.duration_seconds > 30.0 && w.duration_seconds < 13.0 * 60.0,
                "pass {} lasts {} s",
                w.id,
                w.duration_seconds
            );
        }
        assert!(windows.iter().any(|w| w.duration_seconds >= 5.0 * 60.0));
        assert!(windows.iter().all(|w| w.peak_elevation_deg <= 90.0));
    }

    #[test]
    fn windows_are_valid_and_ordered() {
        let set = circular_leo(42, 51.6, 550.0);
        let station = new_york();
        let windows = find_windows(&set, &station, &day_params(&set)).unwrap();

        for (i, w) in windows.iter().enumerate() {
            assert!(w.aos < w.los);
            assert!(w.peak_elevation_deg >= station.min_elevation_deg);
            assert!(w.aos <= w.tca && w.tca <= w.los);
            assert_eq!(w.id, format!("42/nyc/{}", i));
        }
        for pair in windows.windows(2) {
            assert!(pair[0].los < pair[1].aos, "windows for one pair must not overlap");
        }
    }

    #[test]
    fn boundaries_are_refined_below_one_second() {
        let set = circular_leo(42, 51.6, 550.0);
        let station = new_york();
        let windows = find_windows(&set, &station, &day_params(&set)).unwrap();
        let one_second = Duration::seconds(1);

        for w in windows.iter().filter(|w| !w.is_clipped()) {
            assert!(elevation(&set, &station, w.aos) >= station.min_elevation_deg);
            assert!(elevation(&set, &station, w.aos - one_second) < station.min_elevation_deg);
            assert!(elevation(&set, &station, w.los) >= station.min_elevation_deg);
            assert!(elevation(&set, &station, w.los + one_second) < station.min_elevation_deg);
        }
    }

    #[test]
    fn peak_is_refined_beyond_coarse_samples() {
        let set = circular_leo(42, 51.6, 550.0);
        let station = new_york();
        let windows = find_windows(&set, &station, &day_params(&set)).unwrap();

        for w in &windows {
            let mut t = w.aos;
            let mut sampled_max = f64::MIN;
            while t <= w.los {
                sampled_max = sampled_max.max(elevation(&set, &station, t));
                t += Duration::seconds(5);
            }
            assert!(
                w.peak_elevation_deg >= sampled_max - 0.05,
                "peak {} below sampled {}",
                w.peak_elevation_deg,
                sampled_max
            );
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let set = circular_leo(42, 51.6, 550.0);
        let station = new_york();
        let first = find_windows(&set, &station, &day_params(&set)).unwrap();
        let second = find_windows(&set, &station, &day_params(&set)).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn horizon_edges_produce_clipped_windows() {
        let set = circular_leo(42, 51.6, 550.0);
        let station = new_york();
        let full = find_windows(&set, &station, &day_params(&set)).unwrap();
        let pass = full.iter().find(|w| !w.is_clipped()).unwrap();

        let from_tca = VisibilityParams::new(pass.tca, pass.tca + Duration::hours(1));
        let windows = find_windows(&set, &station, &from_tca).unwrap();
        assert!(windows[0].clipped_start);
        assert!(!windows[0].clipped_end);
        assert_eq!(windows[0].aos, pass.tca);

        let until_tca = VisibilityParams::new(pass.aos - Duration::minutes(20), pass.tca);
        let windows = find_windows(&set, &station, &until_tca).unwrap();
        let last = windows.last().unwrap();
        assert!(last.clipped_end);
        assert!(!last.clipped_start);
        assert_eq!(last.los, pass.tca);
    }

    #[test]
    fn unreachable_station_yields_no_windows() {
        let set = circular_leo(42, 51.6, 550.0);
        let station = GroundStation::new("mcmurdo", -85.0, 166.7).with_mask(10.0);
        let windows = find_windows(&set, &station, &day_params(&set)).unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn rejects_invalid_masks() {
        let set = circular_leo(42, 51.6, 550.0);
        for mask in [90.0, 95.0, -0.5] {
            let station = new_york().with_mask(mask);
            assert_eq!(
                find_windows(&set, &station, &day_params(&set)),
                Err(VisibilityError::InvalidMask(mask))
            );
        }
    }

    #[test]
    fn empty_horizon_fails_before_propagation() {
        let mut set = circular_leo(42, 51.6, 550.0);
        set.eccentricity = 3.0;
        let params = VisibilityParams::new(set.epoch, set.epoch - Duration::hours(1));
        assert!(matches!(
            find_windows(&set, &new_york(), &params),
            Err(VisibilityError::EmptyHorizon { .. })
        ));
        let params = VisibilityParams::new(set.epoch, set.epoch);
        assert!(matches!(
            find_windows(&set, &new_york(), &params),
            Err(VisibilityError::EmptyHorizon { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_step() {
        let set = circular_leo(42, 51.6, 550.0);
        let params = day_params(&set).with_step(Duration::zero());
        assert!(matches!(
            find_windows(&set, &new_york(), &params),
            Err(VisibilityError::InvalidSamplingStep(_))
        ));
    }
}
