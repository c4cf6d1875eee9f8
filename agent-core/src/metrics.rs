//! Flattens a `CollectedTick` into an ordered, stable list of metric
//! points ready for the wire. Invalid samples contribute zero points —
//! never a zero-valued one standing in for a missing reading.

use crate::samples::CollectedTick;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: &'static str,
    pub value: f64,
    pub unit: &'static str,
}

pub fn project(tick: &CollectedTick) -> Vec<MetricPoint> {
    let mut points = Vec::with_capacity(5);

    if tick.cpu.valid {
        points.push(MetricPoint { name: "cpu.usage", value: tick.cpu.usage_percent, unit: "%" });
    }
    if tick.mem.valid {
        if !tick.mem.used_percent.is_nan() {
            points.push(MetricPoint {
                name: "mem.used_percent",
                value: tick.mem.used_percent,
                unit: "%",
            });
        }
        points.push(MetricPoint {
            name: "mem.used_bytes",
            value: tick.mem.used_bytes as f64,
            unit: "bytes",
        });
    }
    if tick.disk.valid {
        points.push(MetricPoint {
            name: "disk.used_percent",
            value: tick.disk.used_percent,
            unit: "%",
        });
    }
    if tick.proc.valid {
        points.push(MetricPoint { name: "proc.count", value: tick.proc.count as f64, unit: "count" });
    }

    points
}
