//! Decoder and sampling parameters.
//!
//! Everything here is plain data with serde support so presets can live in
//! JSON next to the model that emits the sequences. Missing fields take their
//! defaults.

use crate::error::{Error, Result};
use crate::model::Vec2;
use serde::{Deserialize, Serialize};

/// Number of control points carried by each connection record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    Quadratic,
    Cubic,
}

impl Arity {
    pub fn control_points(self) -> usize {
        match self {
            Arity::Quadratic => 1,
            Arity::Cubic => 2,
        }
    }

    /// Neighbor index plus two components per control point.
    pub fn record_width(self) -> usize {
        1 + 2 * self.control_points()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    /// Round half away from zero.
    Nearest,
    /// Drop the fractional part, like an integer cast.
    Truncate,
}

/// Affine map from the quantized control-point space into target pixels:
/// `((v - coeff_offset) * source_step + source_origin - target_origin) / target_step`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rescale {
    pub source_origin: [f64; 2],
    pub source_step: [f64; 2],
    pub target_origin: [f64; 2],
    pub target_step: [f64; 2],
    pub rounding: Rounding,
}

impl Default for Rescale {
    fn default() -> Self {
        Rescale {
            source_origin: [0.0, 0.0],
            source_step: [1.0, 1.0],
            target_origin: [0.0, 0.0],
            target_step: [1.0, 1.0],
            rounding: Rounding::Nearest,
        }
    }
}

impl Rescale {
    pub fn apply(&self, x: i64, y: i64, coeff_offset: i64) -> Vec2 {
        let off = coeff_offset as f64;
        Vec2 {
            x: self.axis(0, x as f64 - off),
            y: self.axis(1, y as f64 - off),
        }
    }

    fn axis(&self, i: usize, v: f64) -> f64 {
        let metric = v * self.source_step[i] + self.source_origin[i];
        let px = (metric - self.target_origin[i]) / self.target_step[i];
        match self.rounding {
            Rounding::Nearest => px.round(),
            Rounding::Truncate => px.trunc(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for i in 0..2 {
            let vals = [
                self.source_origin[i],
                self.source_step[i],
                self.target_origin[i],
                self.target_step[i],
            ];
            if vals.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidConfig("rescale parameters must be finite".into()));
            }
            if self.target_step[i] == 0.0 {
                return Err(Error::InvalidConfig("target_step must be non-zero".into()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub node_separator: i64,
    pub connect_separator: i64,
    /// Closes each connection record of a polyline-edge sequence.
    pub line_separator: i64,
    /// Everything up to and including the first occurrence is discarded.
    pub preamble_separator: Option<i64>,
    pub index_offset: i64,
    pub coeff_offset: i64,
    pub arity: Arity,
    pub rescale: Rescale,
    /// Collapse pass-through nodes after decoding.
    pub junction_only: bool,
    /// Re-cut runs to this arc length after decoding.
    pub resegment_distance: Option<f64>,
    /// Samples per curve when flattening runs for re-segmentation.
    pub resegment_samples: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            node_separator: 572,
            connect_separator: 571,
            line_separator: 569,
            preamble_separator: None,
            index_offset: 0,
            coeff_offset: 0,
            arity: Arity::Quadratic,
            rescale: Rescale::default(),
            junction_only: false,
            resegment_distance: None,
            resegment_samples: 50,
        }
    }
}

impl DecoderConfig {
    /// Sequences that carry a preamble and offset index/control tokens.
    pub fn offset_quadratic() -> Self {
        DecoderConfig {
            preamble_separator: Some(569),
            index_offset: 250,
            coeff_offset: 350,
            ..Default::default()
        }
    }

    pub fn offset_cubic() -> Self {
        DecoderConfig { arity: Arity::Cubic, ..Self::offset_quadratic() }
    }

    pub fn validate(&self) -> Result<()> {
        let seps = [self.node_separator, self.connect_separator, self.line_separator];
        if seps[0] == seps[1] || seps[0] == seps[2] || seps[1] == seps[2] {
            return Err(Error::InvalidConfig("node, connect and line separators must differ".into()));
        }
        self.rescale.validate()?;
        if let Some(d) = self.resegment_distance {
            if !d.is_finite() || d <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "resegment_distance must be positive, got {}",
                    d
                )));
            }
        }
        if self.resegment_samples < 2 {
            return Err(Error::InvalidConfig("resegment_samples must be at least 2".into()));
        }
        Ok(())
    }
}

/// Sampling density used to turn chains into point sets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Keypoints kept per edge (`K`).
    pub keypoints_per_edge: usize,
    /// Dense curve evaluations per edge the keypoints are picked from.
    pub dense_samples: usize,
}

impl Default for SampleConfig {
    fn default() -> Self {
        SampleConfig { keypoints_per_edge: 10, dense_samples: 50 }
    }
}

impl SampleConfig {
    pub fn new(keypoints_per_edge: usize, dense_samples: usize) -> Self {
        SampleConfig { keypoints_per_edge, dense_samples }
    }

    pub fn validate(&self) -> Result<()> {
        if self.keypoints_per_edge == 0 {
            return Err(Error::InvalidConfig("keypoints_per_edge must be positive".into()));
        }
        if self.dense_samples < 2 {
            return Err(Error::InvalidConfig("dense_samples must be at least 2".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_json_takes_defaults() {
        let cfg: DecoderConfig = serde_json::from_value(json!({
            "index_offset": 250,
            "arity": "cubic",
            "rescale": { "target_step": [0.5, 0.5] }
        }))
        .unwrap();
        assert_eq!(cfg.index_offset, 250);
        assert_eq!(cfg.arity, Arity::Cubic);
        assert_eq!(cfg.node_separator, 572);
        assert_eq!(cfg.rescale.source_step, [1.0, 1.0]);
        assert_eq!(cfg.rescale.target_step, [0.5, 0.5]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rescale_maps_into_pixels() {
        let r = Rescale {
            source_origin: [-48.0, -32.0],
            source_step: [0.5, 0.5],
            target_origin: [-48.0, -32.0],
            target_step: [0.25, 0.25],
            rounding: Rounding::Nearest,
        };
        // (10 * 0.5 - 48 + 48) / 0.25 = 20
        assert_eq!(r.apply(360, 360, 350), Vec2::new(20.0, 20.0));
    }

    #[test]
    fn truncate_differs_from_nearest() {
        let mut r = Rescale { target_step: [2.0, 2.0], ..Default::default() };
        assert_eq!(r.apply(3, -3, 0), Vec2::new(2.0, -2.0));
        r.rounding = Rounding::Truncate;
        assert_eq!(r.apply(3, -3, 0), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = DecoderConfig::default();
        cfg.resegment_distance = Some(0.0);
        assert!(cfg.validate().is_err());
        let mut cfg = DecoderConfig::default();
        cfg.rescale.target_step = [0.0, 1.0];
        assert!(cfg.validate().is_err());
        let cfg = DecoderConfig { line_separator: 571, ..Default::default() };
        assert!(cfg.validate().is_err());
        assert!(SampleConfig::new(0, 50).validate().is_err());
        assert!(SampleConfig::new(4, 1).validate().is_err());
    }
}
