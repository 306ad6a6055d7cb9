//! Geographic coordinates.
//!
//! Coordinates are stored as `u32` axis values: the micro-degree range
//! ±180·10⁶ is spread over the full 32-bit range (latitudes are doubled
//! first, halving their effective range to ±90°).
use crate::ext::io::*;
use anyhow::Result;
use std::io::{Read, Write};

pub const MICRO_DEGREES_TO_RAD: f64 = 1.7453292519943295e-8;
/// Quadratic mean earth radius in centimeters.
pub const QUADRATIC_MEAN_RADIUS_CM: f64 = 637279756.0856;

/// Conversion between micro-degrees and the fixed-point axis encoding.
pub struct GeoAxis<const IS_LATITUDE: bool>;

pub type Latitude = GeoAxis<true>;
pub type Longitude = GeoAxis<false>;

impl<const IS_LATITUDE: bool> GeoAxis<IS_LATITUDE> {
    pub fn to_micro_degrees(value: u32) -> i32 {
        let v = (((u64::from(value) * 360_000_000) >> 32) as i64 - 180_000_000) as i32;
        if IS_LATITUDE {
            v / 2
        } else {
            v
        }
    }

    /// Input range: -180 000 000 to +180 000 000.
    pub fn from_micro_degrees(micro_degrees: i32) -> u32 {
        let micro_degrees = if IS_LATITUDE {
            micro_degrees * 2
        } else {
            micro_degrees
        };
        ((((micro_degrees as i64 + 180_000_000) as u64) << 32) / 360_000_000) as u32
    }
}

/// A point in the fixed-point axis encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeoPoint {
    pub latitude: u32,
    pub longitude: u32,
}

impl GeoPoint {
    pub fn new(latitude: u32, longitude: u32) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    /// Builds a point from micro-degree coordinates.
    pub fn from_micro_degrees(latitude: i32, longitude: i32) -> Self {
        GeoPoint {
            latitude: Latitude::from_micro_degrees(latitude),
            longitude: Longitude::from_micro_degrees(longitude),
        }
    }

    /// Axis 0 is the latitude, axis 1 the longitude.
    pub fn axis_value(&self, axis: u32) -> u32 {
        if axis % 2 == 0 {
            self.latitude
        } else {
            self.longitude
        }
    }

    /// Great-circle (Haversine) distance to `other` in centimeters.
    pub fn distance(&self, other: &GeoPoint) -> u32 {
        let lat_arc = MICRO_DEGREES_TO_RAD
            * f64::from(
                Latitude::to_micro_degrees(self.latitude)
                    - Latitude::to_micro_degrees(other.latitude),
            );
        let long_arc = MICRO_DEGREES_TO_RAD
            * f64::from(
                Longitude::to_micro_degrees(self.longitude)
                    - Longitude::to_micro_degrees(other.longitude),
            );
        let lat_h = (lat_arc * 0.5).sin().powi(2);
        let long_h = (long_arc * 0.5).sin().powi(2);
        let tmp = (MICRO_DEGREES_TO_RAD * f64::from(Latitude::to_micro_degrees(self.latitude)))
            .cos()
            * (MICRO_DEGREES_TO_RAD * f64::from(Latitude::to_micro_degrees(other.latitude))).cos();
        (QUADRATIC_MEAN_RADIUS_CM * 2.0 * (lat_h + tmp * long_h).sqrt().asin()) as u32
    }

    /// Subtracts `diff` on both axes, clamping at the axis minimum.
    pub fn saturating_sub(&self, diff: &GeoPoint) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude.saturating_sub(diff.latitude),
            longitude: self.longitude.saturating_sub(diff.longitude),
        }
    }

    /// Adds `diff` on both axes, clamping at the axis maximum.
    pub fn saturating_add(&self, diff: &GeoPoint) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude.saturating_add(diff.latitude),
            longitude: self.longitude.saturating_add(diff.longitude),
        }
    }

    /// Axis-aligned rectangle approximately containing a circle of
    /// `radius_cm` centimeters around this point.
    ///
    /// The half-widths are `asin(r / R)` converted to micro-degrees, the
    /// longitude one scaled by the latitude circle radius. They are applied
    /// as axis deltas; the subtraction of `from_micro_degrees(0)` removes
    /// the encoding's range bias.
    pub fn enclosing_pseudo_rectangle(&self, radius_cm: u32) -> (GeoPoint, GeoPoint) {
        let radius_cm = f64::from(radius_cm);
        let lat_half_width = ((radius_cm / QUADRATIC_MEAN_RADIUS_CM).min(1.0).asin()
            / MICRO_DEGREES_TO_RAD) as i32;
        let long_radius_cm = (f64::from(Latitude::to_micro_degrees(self.latitude))
            * MICRO_DEGREES_TO_RAD)
            .cos()
            * QUADRATIC_MEAN_RADIUS_CM;
        let long_half_width =
            ((radius_cm / long_radius_cm).min(1.0).asin() / MICRO_DEGREES_TO_RAD) as i32;
        let diff = GeoPoint {
            latitude: Latitude::from_micro_degrees(lat_half_width)
                .wrapping_sub(Latitude::from_micro_degrees(0)),
            longitude: Longitude::from_micro_degrees(long_half_width)
                .wrapping_sub(Longitude::from_micro_degrees(0)),
        };
        (self.saturating_sub(&diff), self.saturating_add(&diff))
    }
}

/// A geo point tied to an article's final URL-order index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArticleGeoPoint {
    pub point: GeoPoint,
    pub index: u32,
}

impl ArticleGeoPoint {
    /// Serialized size: latitude, longitude, index as `u32 le`.
    pub const DISK_SIZE: usize = 12;

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u32(self.point.latitude)?;
        out.write_u32(self.point.longitude)?;
        out.write_u32(self.index)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<ArticleGeoPoint> {
        let latitude = reader.read_u32()?;
        let longitude = reader.read_u32()?;
        let index = reader.read_u32()?;
        Ok(ArticleGeoPoint {
            point: GeoPoint {
                latitude,
                longitude,
            },
            index,
        })
    }
}

const GEO_META_TAG: &[u8] = b"<meta name=\"geo.position\" content=\"";

/// Extracts the geo position from an article body.
///
/// Looks for the literal `geo.position` meta tag and parses `LAT;LON` past
/// the opening quote. Returns [None] on any parse failure; article bodies
/// are arbitrary HTML and a malformed tag is not an error.
pub fn extract_geo_position(body: &[u8]) -> Option<(i32, i32)> {
    let tag_start = body
        .windows(GEO_META_TAG.len())
        .position(|window| window == GEO_META_TAG)?;
    let rest = &body[tag_start + GEO_META_TAG.len()..];
    let (latitude, rest) = parse_coordinate_micro_degrees(rest)?;
    let rest = rest.strip_prefix(b";")?;
    let (longitude, _) = parse_coordinate_micro_degrees(rest)?;
    Some((latitude, longitude))
}

/// Parses one decimal coordinate into micro-degrees.
///
/// Accepts an optional `-`, digits, an optional `.` and more digits. Values
/// are scaled to six fractional digits; fractional digits past the sixth
/// are consumed but ignored. Returns the value and the unconsumed rest, or
/// [None] when no digit was seen.
pub fn parse_coordinate_micro_degrees(text: &[u8]) -> Option<(i32, &[u8])> {
    let mut rest = text;
    let negative = if let Some(stripped) = rest.strip_prefix(b"-") {
        rest = stripped;
        true
    } else {
        false
    };
    let mut value: i64 = 0;
    let mut beyond_decimal = 0u32;
    let mut seen_digit = false;
    while let Some((&byte, tail)) = rest.split_first() {
        match byte {
            b'.' => {
                if beyond_decimal > 0 {
                    break;
                }
                beyond_decimal = 1;
            }
            b'0'..=b'9' => {
                seen_digit = true;
                if beyond_decimal < 7 {
                    value = value * 10 + i64::from(byte - b'0');
                    if beyond_decimal > 0 {
                        beyond_decimal += 1;
                    }
                }
            }
            _ => break,
        }
        rest = tail;
    }
    if !seen_digit {
        return None;
    }
    if beyond_decimal == 0 {
        beyond_decimal = 1;
    }
    while beyond_decimal < 7 {
        value *= 10;
        beyond_decimal += 1;
    }
    if negative {
        value = -value;
    }
    i32::try_from(value).ok().map(|value| (value, rest))
}
