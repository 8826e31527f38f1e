//! Distinct trajectory colors.

use std::collections::BTreeMap;

use crate::model::Trajectory;

const LIGHTNESS: f64 = 0.5;
const SATURATION: f64 = 0.8;

/// Generates `n` colors spread evenly around the hue circle, as `#rrggbb`.
///
/// The output only depends on `n`.
pub fn generate(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let hue = (i as f64 / n as f64).rem_euclid(1.0);
            let (r, g, b) = hls_to_rgb(hue, LIGHTNESS, SATURATION);
            format!("#{r:02x}{g:02x}{b:02x}")
        })
        .collect()
}

/// Pairs every trajectory name with a color, in name order.
pub fn assign<'a>(
    trajectories: impl IntoIterator<Item = &'a Trajectory>,
) -> BTreeMap<String, String> {
    let mut names: Vec<&str> = trajectories.into_iter().map(|x| x.name()).collect();
    names.sort_unstable();
    names.dedup();

    let colors = generate(names.len());
    names
        .into_iter()
        .map(str::to_owned)
        .zip(colors)
        .collect()
}

/// Channels are truncated, not rounded, to [0, 255].
fn hls_to_rgb(h: f64, l: f64, s: f64) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = channel(l);
        return (v, v, v);
    }

    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        channel(hue_value(m1, m2, h + 1.0 / 3.0)),
        channel(hue_value(m1, m2, h)),
        channel(hue_value(m1, m2, h - 1.0 / 3.0)),
    )
}

fn hue_value(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

fn channel(x: f64) -> u8 {
    (x * 255.0) as u8
}
