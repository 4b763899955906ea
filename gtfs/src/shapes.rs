use std::collections::BTreeMap;

use anyhow::Result;
use geo::{Coord, LineString};
use serde::Deserialize;

use super::ShapeID;

pub fn load<R: std::io::Read>(reader: R) -> Result<BTreeMap<ShapeID, LineString<f64>>> {
    let mut pts_per_shape: BTreeMap<ShapeID, Vec<(usize, Coord<f64>)>> = BTreeMap::new();
    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = rec?;
        pts_per_shape
            .entry(rec.shape_id)
            .or_insert_with(Vec::new)
            .push((
                rec.shape_pt_sequence,
                Coord {
                    x: rec.shape_pt_lon,
                    y: rec.shape_pt_lat,
                },
            ));
    }

    // Sort by shape_pt_sequence, in case the file isn't in order
    let mut results = BTreeMap::new();
    for (shape_id, mut pts) in pts_per_shape {
        pts.sort_by_key(|(seq, _)| *seq);
        let mut pts: Vec<Coord<f64>> = pts.into_iter().map(|(_, pt)| pt).collect();
        pts.dedup();
        if pts.len() < 2 {
            warn!("{shape_id} has fewer than 2 distinct points, skipping it");
            continue;
        }
        results.insert(shape_id, LineString::new(pts));
    }
    Ok(results)
}

#[derive(Deserialize)]
struct Record {
    shape_id: ShapeID,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: usize,
}
