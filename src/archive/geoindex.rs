//! Serialized 2-D k-d tree over article geo points.
//!
//! The stream starts with three `u32 le` header fields: the number of
//! indices (always 1), the start offset of the tree (12) and its end
//! offset. Internal nodes are `median value, right subtree offset`; leaves
//! are a zero marker, a point count and the point records. Offsets are
//! absolute within the stream, back-patched after the left subtree is
//! written.
use crate::archive::geo::{ArticleGeoPoint, GeoPoint};
use crate::ext::io::*;
use anyhow::Result;
use std::io::Seek;

/// Ranges smaller than this are always serialized as a leaf.
const LEAF_LIMIT: usize = 10;
/// Size of the stream header in bytes.
pub const HEADER_SIZE: u32 = 12;

/// Builds the serialized index over `points`. The slice is reordered while
/// the tree is balanced.
pub fn build(points: &mut [ArticleGeoPoint]) -> Result<Vec<u8>> {
    let mut out = MemWriter::new();
    out.write_u32(1)?;
    out.write_u32(HEADER_SIZE)?;
    out.write_u32(0)?;
    // Without any point the payload stays empty and the end offset equals
    // the header size.
    if !points.is_empty() {
        write_part(&mut out, points, 0)?;
    }
    let size = out.stream_position()? as u32;
    out.write_u32_at(8, size)?;
    Ok(out.into_inner())
}

fn write_leaf(out: &mut MemWriter, points: &[ArticleGeoPoint]) -> Result<()> {
    out.write_u32(0)?;
    out.write_u32(points.len() as u32)?;
    for point in points {
        point.write_to(out)?;
    }
    Ok(())
}

fn write_part(out: &mut MemWriter, points: &mut [ArticleGeoPoint], depth: u32) -> Result<()> {
    let all_equal = points.windows(2).all(|pair| pair[0].point == pair[1].point);
    if points.len() < LEAF_LIMIT || all_equal {
        return write_leaf(out, points);
    }
    let axis = depth % 2;
    points.sort_by_key(|p| p.point.axis_value(axis));
    let mut median = points.len() / 2;
    let mut median_value = points[median].point.axis_value(axis);
    if median_value == 0 {
        // Zero is the leaf marker and cannot appear as a pivot.
        eprintln!("dropping point from geo index: median value zero, too many small coordinates");
        crate::COUNTER.inc_warning();
        return write_part(out, &mut points[1..], depth);
    }
    if median_value == points[0].point.axis_value(axis) {
        // The pivot equals the first value; move it forward so the split
        // stays strictly `< median` vs `>= median`.
        while median < points.len() && points[median].point.axis_value(axis) == median_value {
            median += 1;
        }
        if median == points.len() {
            // Nothing discriminates on this axis.
            return write_leaf(out, points);
        }
        median_value = points[median].point.axis_value(axis);
    } else {
        while median > 0 && points[median - 1].point.axis_value(axis) == median_value {
            median -= 1;
        }
    }
    out.write_u32(median_value)?;
    let patch_pos = out.stream_position()?;
    out.write_u32(0)?;
    let (left, right) = points.split_at_mut(median);
    write_part(out, left, depth + 1)?;
    let right_start = out.stream_position()? as u32;
    out.write_u32_at(patch_pos, right_start)?;
    write_part(out, right, depth + 1)
}

/// Collects the points of the serialized `index` lying in the closed
/// rectangle `[min, max]` into `results`, up to `limit` entries in total.
/// Returns `true` when the search stopped because the limit was reached.
pub fn find_in_area(
    index: &[u8],
    min: &GeoPoint,
    max: &GeoPoint,
    limit: usize,
    results: &mut Vec<ArticleGeoPoint>,
) -> Result<bool> {
    let mut reader = MemReaderRef::new(index);
    let index_count = reader.read_u32()?;
    if index_count < 1 {
        return Ok(false);
    }
    let start = reader.read_u32()?;
    let end = reader.read_u32()?;
    if end as usize > index.len() || start > end {
        anyhow::bail!("corrupt geo index header");
    }
    if start == end {
        return Ok(false);
    }
    search_node(index, start as usize, 0, min, max, limit, results)
}

fn search_node(
    index: &[u8],
    pos: usize,
    depth: u32,
    min: &GeoPoint,
    max: &GeoPoint,
    limit: usize,
    results: &mut Vec<ArticleGeoPoint>,
) -> Result<bool> {
    let mut reader = MemReaderRef::new(index);
    reader.seek(std::io::SeekFrom::Start(pos as u64))?;
    let marker = reader.read_u32()?;
    if marker == 0 {
        let count = reader.read_u32()?;
        for _ in 0..count {
            let point = ArticleGeoPoint::read_from(&mut reader)?;
            if point.point.latitude >= min.latitude
                && point.point.latitude <= max.latitude
                && point.point.longitude >= min.longitude
                && point.point.longitude <= max.longitude
            {
                if results.len() >= limit {
                    return Ok(true);
                }
                results.push(point);
            }
        }
        return Ok(false);
    }
    let median_value = marker;
    let right_pos = reader.read_u32()? as usize;
    let axis = depth % 2;
    if min.axis_value(axis) < median_value
        && search_node(index, pos + 8, depth + 1, min, max, limit, results)?
    {
        return Ok(true);
    }
    if max.axis_value(axis) >= median_value
        && search_node(index, right_pos, depth + 1, min, max, limit, results)?
    {
        return Ok(true);
    }
    Ok(false)
}

/// Returns up to `limit` points ordered by distance from `point`, widening
/// the search radius from 100 m until enough candidates are found or the
/// radius reaches 10,000 km.
pub fn find_closest(
    index: &[u8],
    point: &GeoPoint,
    limit: usize,
) -> Result<Vec<ArticleGeoPoint>> {
    let mut candidates = Vec::new();
    let mut radius_cm: u32 = 10_000;
    loop {
        candidates.clear();
        let (min, max) = point.enclosing_pseudo_rectangle(radius_cm);
        let have_more = find_in_area(index, &min, &max, 4 * limit, &mut candidates)?;
        if candidates.len() >= limit || have_more || radius_cm >= 1_000_000_000 {
            break;
        }
        radius_cm = radius_cm.saturating_mul(2);
    }
    let mut by_distance: Vec<(u32, usize)> = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| (point.distance(&candidate.point), i))
        .collect();
    by_distance.sort();
    Ok(by_distance
        .into_iter()
        .take(limit)
        .map(|(_, i)| candidates[i])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat_micro: i32, long_micro: i32, index: u32) -> ArticleGeoPoint {
        ArticleGeoPoint {
            point: GeoPoint::from_micro_degrees(lat_micro, long_micro),
            index,
        }
    }

    #[test]
    fn test_empty_point_set_is_header_only() {
        let data = build(&mut []).unwrap();
        assert_eq!(data.len(), HEADER_SIZE as usize);
        let mut reader = MemReaderRef::new(&data);
        assert_eq!(reader.read_u32().unwrap(), 1);
        assert_eq!(reader.read_u32().unwrap(), 12);
        assert_eq!(reader.read_u32().unwrap(), 12);
        let mut results = Vec::new();
        let limited = find_in_area(
            &data,
            &GeoPoint::new(0, 0),
            &GeoPoint::new(u32::MAX, u32::MAX),
            10,
            &mut results,
        )
        .unwrap();
        assert!(!limited);
        assert!(results.is_empty());
    }

    #[test]
    fn test_small_range_is_a_leaf() {
        let mut points = vec![point(1_000_000, 2_000_000, 0), point(3_000_000, 4_000_000, 1)];
        let data = build(&mut points).unwrap();
        let mut reader = MemReaderRef::new(&data);
        assert_eq!(reader.read_u32().unwrap(), 1);
        assert_eq!(reader.read_u32().unwrap(), 12);
        assert_eq!(reader.read_u32().unwrap(), data.len() as u32);
        assert_eq!(reader.read_u32().unwrap(), 0); // leaf marker
        assert_eq!(reader.read_u32().unwrap(), 2); // point count
    }

    #[test]
    fn test_split_encoding_and_backpatch() {
        // 20 distinct points spread over the latitude axis.
        let mut points: Vec<ArticleGeoPoint> =
            (0..20).map(|i| point(i * 1_000_000, 0, i as u32)).collect();
        let data = build(&mut points).unwrap();
        let mut reader = MemReaderRef::new(&data);
        reader.seek(std::io::SeekFrom::Start(12)).unwrap();
        let median = reader.read_u32().unwrap();
        assert_ne!(median, 0);
        let right_pos = reader.read_u32().unwrap();
        // The left child starts right behind the node and must be a leaf
        // with the 10 points below the median.
        assert_eq!(reader.read_u32().unwrap(), 0);
        assert_eq!(reader.read_u32().unwrap(), 10);
        // The right child offset points behind the left leaf.
        assert_eq!(right_pos as usize, 12 + 8 + 8 + 10 * 12);
        reader
            .seek(std::io::SeekFrom::Start(right_pos as u64))
            .unwrap();
        assert_eq!(reader.read_u32().unwrap(), 0);
        assert_eq!(reader.read_u32().unwrap(), 10);
    }

    #[test]
    fn test_area_search_finds_inserted_points() {
        let mut points: Vec<ArticleGeoPoint> = (0..50)
            .map(|i| point(i * 1_000_000, i * 500_000, i as u32))
            .collect();
        let data = build(&mut points).unwrap();
        let min = GeoPoint::from_micro_degrees(9_500_000, 0);
        let max = GeoPoint::from_micro_degrees(20_500_000, 30_000_000);
        let mut results = Vec::new();
        let limited = find_in_area(&data, &min, &max, 100, &mut results).unwrap();
        assert!(!limited);
        let mut found: Vec<u32> = results.iter().map(|p| p.index).collect();
        found.sort();
        assert_eq!(found, (10..=20).collect::<Vec<u32>>());
    }

    #[test]
    fn test_area_search_reports_limit() {
        let mut points: Vec<ArticleGeoPoint> = (0..50)
            .map(|i| point(i * 1_000_000, i * 500_000, i as u32))
            .collect();
        let data = build(&mut points).unwrap();
        let min = GeoPoint::new(0, 0);
        let max = GeoPoint::new(u32::MAX, u32::MAX);
        let mut results = Vec::new();
        let limited = find_in_area(&data, &min, &max, 5, &mut results).unwrap();
        assert!(limited);
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_find_closest_orders_by_distance() {
        let mut points = vec![
            point(48_137_154, 11_576_124, 0), // Munich
            point(52_520_008, 13_404_954, 1), // Berlin
            point(48_208_174, 16_373_819, 2), // Vienna
            point(45_464_204, 9_189_982, 3),  // Milan
            point(48_856_614, 2_352_222, 4),  // Paris
            point(50_110_922, 8_682_127, 5),  // Frankfurt
            point(47_376_887, 8_541_694, 6),  // Zurich
            point(51_507_351, -127_758, 7),   // London
            point(41_902_783, 12_496_366, 8), // Rome
            point(53_551_085, 9_993_682, 9),  // Hamburg
            point(47_070_714, 15_439_504, 10), // Graz
        ];
        let data = build(&mut points).unwrap();
        let munich = GeoPoint::from_micro_degrees(48_137_154, 11_576_124);
        let closest = find_closest(&data, &munich, 3).unwrap();
        assert_eq!(closest.len(), 3);
        assert_eq!(closest[0].index, 0);
        let d1 = munich.distance(&closest[1].point);
        let d2 = munich.distance(&closest[2].point);
        assert!(d1 <= d2);
    }

    #[test]
    fn test_all_equal_points_form_a_leaf() {
        let mut points: Vec<ArticleGeoPoint> =
            (0..30).map(|i| point(10_000_000, 20_000_000, i)).collect();
        let data = build(&mut points).unwrap();
        let mut reader = MemReaderRef::new(&data);
        reader.seek(std::io::SeekFrom::Start(12)).unwrap();
        assert_eq!(reader.read_u32().unwrap(), 0);
        assert_eq!(reader.read_u32().unwrap(), 30);
    }
}
