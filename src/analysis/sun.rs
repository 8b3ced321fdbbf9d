use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::math::Vector3;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Sun elevation at sunrise and sunset, allowing for refraction and the
/// solar disc.
const HORIZON_ZENITH_DEG: f64 = 90.833;

/// Local daylight hours of one day, in seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Daylight {
    pub sunrise: f64,
    pub sunset: f64,
}

impl Daylight {
    /// Sun above the horizon all day.
    pub const ALL_DAY: Self = Self {
        sunrise: 0.0,
        sunset: SECONDS_PER_DAY,
    };

    /// Daylight length in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        (self.sunset - self.sunrise).max(0.0)
    }
}

/// Where the sun is.
pub trait SunModel {
    /// Unit vector from the scene toward the sun at `seconds` after local
    /// midnight on `date`, in model coordinates (z up).
    fn direction(&self, date: NaiveDate, seconds: f64) -> Vector3;

    /// Sunrise and sunset on `date`.
    fn daylight(&self, date: NaiveDate) -> Daylight;
}

/// Geographic placement of the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteLocation {
    /// Degrees, north positive.
    pub latitude: f64,
    /// Degrees, east positive.
    pub longitude: f64,
    /// Offset of local clock time from UTC, in hours.
    pub utc_offset_hours: f64,
    /// Angle in degrees from the model's +y axis to true north, clockwise
    /// seen from above.
    pub north_angle: f64,
}

impl Default for SiteLocation {
    /// Boulder, Colorado.
    fn default() -> Self {
        Self {
            latitude: 40.01,
            longitude: -105.27,
            utc_offset_hours: -7.0,
            north_angle: 0.0,
        }
    }
}

/// Solar position from the NOAA general approximation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolarModel {
    site: SiteLocation,
}

/// Declination (radians) and equation of time (minutes) for one instant.
struct SolarAngles {
    declination: f64,
    eq_time: f64,
}

impl SolarModel {
    #[must_use]
    pub fn new(site: SiteLocation) -> Self {
        Self { site }
    }

    #[must_use]
    pub fn site(&self) -> &SiteLocation {
        &self.site
    }

    fn angles(date: NaiveDate, seconds: f64) -> SolarAngles {
        let year_days = if date.leap_year() { 366.0 } else { 365.0 };
        let hour = seconds / 3600.0;
        let gamma = 2.0 * PI / year_days * (f64::from(date.ordinal0()) + (hour - 12.0) / 24.0);
        let eq_time = 229.18
            * (0.000_075 + 0.001_868 * gamma.cos()
                - 0.032_077 * gamma.sin()
                - 0.014_615 * (2.0 * gamma).cos()
                - 0.040_849 * (2.0 * gamma).sin());
        let declination = 0.006_918 - 0.399_912 * gamma.cos() + 0.070_257 * gamma.sin()
            - 0.006_758 * (2.0 * gamma).cos()
            + 0.000_907 * (2.0 * gamma).sin()
            - 0.002_697 * (3.0 * gamma).cos()
            + 0.001_48 * (3.0 * gamma).sin();
        SolarAngles {
            declination,
            eq_time,
        }
    }

    /// Rotates an (east, north, up) vector into model coordinates.
    fn to_model(&self, east: f64, north: f64, up: f64) -> Vector3 {
        let theta = self.site.north_angle.to_radians();
        let north_axis = Vector3::new(theta.sin(), theta.cos(), 0.0);
        let east_axis = Vector3::new(theta.cos(), -theta.sin(), 0.0);
        east_axis * east + north_axis * north + Vector3::z() * up
    }
}

impl SunModel for SolarModel {
    fn direction(&self, date: NaiveDate, seconds: f64) -> Vector3 {
        let SolarAngles {
            declination,
            eq_time,
        } = Self::angles(date, seconds);
        let time_offset = eq_time + 4.0 * self.site.longitude - 60.0 * self.site.utc_offset_hours;
        let true_solar_minutes = seconds / 60.0 + time_offset;
        let hour_angle = (true_solar_minutes / 4.0 - 180.0).to_radians();
        let lat = self.site.latitude.to_radians();

        let east = -declination.cos() * hour_angle.sin();
        let north =
            lat.cos() * declination.sin() - lat.sin() * declination.cos() * hour_angle.cos();
        let up = lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos();
        self.to_model(east, north, up).normalize()
    }

    fn daylight(&self, date: NaiveDate) -> Daylight {
        let SolarAngles {
            declination,
            eq_time,
        } = Self::angles(date, SECONDS_PER_DAY / 2.0);
        let lat = self.site.latitude.to_radians();
        let cos_ha = HORIZON_ZENITH_DEG.to_radians().cos() / (lat.cos() * declination.cos())
            - lat.tan() * declination.tan();
        if cos_ha <= -1.0 {
            return Daylight::ALL_DAY;
        }
        if cos_ha >= 1.0 || !cos_ha.is_finite() {
            let noon = SECONDS_PER_DAY / 2.0;
            return Daylight {
                sunrise: noon,
                sunset: noon,
            };
        }
        let ha = cos_ha.acos().to_degrees();
        let local = |utc_minutes: f64| {
            ((utc_minutes + 60.0 * self.site.utc_offset_hours) * 60.0).clamp(0.0, SECONDS_PER_DAY)
        };
        Daylight {
            sunrise: local(720.0 - 4.0 * (self.site.longitude + ha) - eq_time),
            sunset: local(720.0 - 4.0 * (self.site.longitude - ha) - eq_time),
        }
    }
}

/// A sun that never moves, for controlled scenes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSun {
    direction: Vector3,
    daylight: Daylight,
}

impl FixedSun {
    /// A sun shining from `direction` all day.
    #[must_use]
    pub fn new(direction: Vector3) -> Self {
        Self {
            direction: direction.normalize(),
            daylight: Daylight::ALL_DAY,
        }
    }

    #[must_use]
    pub fn with_daylight(mut self, daylight: Daylight) -> Self {
        self.daylight = daylight;
        self
    }
}

impl SunModel for FixedSun {
    fn direction(&self, _date: NaiveDate, _seconds: f64) -> Vector3 {
        self.direction
    }

    fn daylight(&self, _date: NaiveDate) -> Daylight {
        self.daylight
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, month, day).unwrap()
    }

    #[test]
    fn summer_noon_sun_is_high_and_south() {
        let model = SolarModel::default();
        // Solar noon in Boulder falls a few minutes after 12:00 standard time.
        let dir = model.direction(date(6, 21), 12.0 * 3600.0);
        assert_relative_eq!(dir.norm(), 1.0, epsilon = 1e-12);
        let elevation = dir.z.asin().to_degrees();
        assert!(elevation > 70.0 && elevation < 74.0, "elevation {elevation}");
        assert!(dir.y < 0.0);
    }

    #[test]
    fn morning_sun_is_in_the_east() {
        let dir = SolarModel::default().direction(date(3, 21), 8.0 * 3600.0);
        assert!(dir.x > 0.0);
        assert!(dir.z > 0.0);
    }

    #[test]
    fn midnight_sun_is_below_horizon() {
        let dir = SolarModel::default().direction(date(3, 21), 0.0);
        assert!(dir.z < 0.0);
    }

    #[test]
    fn north_angle_rotates_azimuth() {
        let site = SiteLocation {
            north_angle: 90.0,
            ..SiteLocation::default()
        };
        let plain = SolarModel::default().direction(date(6, 21), 13.0 * 3600.0);
        let turned = SolarModel::new(site).direction(date(6, 21), 13.0 * 3600.0);
        // True north now lies along +x, so the southern sun moves to -x.
        assert_relative_eq!(turned.x, plain.y, epsilon = 1e-12);
        assert_relative_eq!(turned.z, plain.z, epsilon = 1e-12);
    }

    #[test]
    fn summer_days_are_longer() {
        let model = SolarModel::default();
        let june = model.daylight(date(6, 21));
        let december = model.daylight(date(12, 21));
        assert!(june.duration() > 14.5 * 3600.0);
        assert!(december.duration() < 9.5 * 3600.0);
        assert!(june.sunrise > 4.0 * 3600.0 && june.sunrise < 5.0 * 3600.0);
    }

    #[test]
    fn polar_day_and_night() {
        let arctic = SolarModel::new(SiteLocation {
            latitude: 78.0,
            longitude: 15.0,
            utc_offset_hours: 1.0,
            north_angle: 0.0,
        });
        assert_eq!(arctic.daylight(date(6, 21)), Daylight::ALL_DAY);
        assert_relative_eq!(arctic.daylight(date(12, 21)).duration(), 0.0);
    }

    #[test]
    fn fixed_sun_ignores_time() {
        let sun = FixedSun::new(Vector3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(sun.direction(date(1, 1), 0.0), Vector3::z());
        assert_eq!(sun.daylight(date(1, 1)), Daylight::ALL_DAY);
    }
}
