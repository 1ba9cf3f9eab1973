//! Force-directed placement for the market bubble chart.
//!
//! Bubble diameter follows price on a log scale, color follows the 24h change.
//! Positions start on a jittered grid and are relaxed for a fixed number of
//! passes: overlapping pairs repel proportionally to their overlap, then each
//! bubble is clamped back inside the container.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};
use crate::models::Cryptocurrency;
use crate::validation::validate_dimensions;

const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    /// Smallest bubble diameter in pixels
    pub min_size: f64,
    /// Largest bubble diameter in pixels
    pub max_size: f64,
    /// Extra gap kept between neighbouring bubbles
    pub separation_padding: f64,
    /// Gap kept between a bubble and the container edge
    pub edge_padding: f64,
    pub iterations: usize,
    /// Fraction of the overlap corrected per pass
    pub repulsion_strength: f64,
    /// Width of the uniform jitter applied to initial grid positions
    pub jitter: f64,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            min_size: 50.0,
            max_size: 140.0,
            separation_padding: 10.0,
            edge_padding: 20.0,
            iterations: 100,
            repulsion_strength: 0.7,
            jitter: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 1.0 };
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BubblePlacement {
    pub symbol: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub size: f64,
    pub fill_color: Rgba,
    pub text_color: Rgba,
}

/// Diameter for `price` given the price range of the rendered set.
pub fn bubble_size(price: f64, min_price: f64, max_price: f64, config: &BubbleConfig) -> f64 {
    let log_min = min_price.ln();
    let log_max = max_price.ln();
    let span = log_max - log_min;

    if !span.is_finite() || span <= f64::EPSILON {
        return (config.min_size + config.max_size) / 2.0;
    }

    let percentage = ((price.ln() - log_min) / span).clamp(0.0, 1.0);
    config.min_size + percentage * (config.max_size - config.min_size)
}

pub fn bubble_color(price_change: f64) -> Rgba {
    let opacity = (price_change.abs() / 10.0).clamp(0.3, 0.9);
    if price_change < 0.0 {
        Rgba { r: 239, g: 68, b: 68, a: opacity }
    } else {
        Rgba { r: 34, g: 197, b: 94, a: opacity }
    }
}

pub fn text_color(_price_change: f64) -> Rgba {
    Rgba::WHITE
}

fn clamp_axis(value: f64, radius: f64, padding: f64, dimension: f64) -> f64 {
    let lo = radius + padding;
    let hi = dimension - radius - padding;
    if lo > hi {
        // container smaller than the bubble on this axis
        return dimension / 2.0;
    }
    value.clamp(lo, hi)
}

fn clamp_into(position: &mut Point, radius: f64, padding: f64, width: f64, height: f64) {
    position.x = clamp_axis(position.x, radius, padding, width);
    position.y = clamp_axis(position.y, radius, padding, height);
}

/// Jittered grid: `ceil(sqrt(n))` columns, one cell per entity.
pub fn initial_positions<R: Rng>(
    count: usize,
    width: f64,
    height: f64,
    jitter: f64,
    rng: &mut R,
) -> Vec<Point> {
    if count == 0 {
        return Vec::new();
    }
    let cols = (count as f64).sqrt().ceil() as usize;
    let cell_w = width / cols as f64;
    let cell_h = height / cols as f64;
    let half = jitter / 2.0;

    (0..count)
        .map(|index| {
            let row = index / cols;
            let col = index % cols;
            let (dx, dy) = if half > 0.0 {
                (rng.gen_range(-half..=half), rng.gen_range(-half..=half))
            } else {
                (0.0, 0.0)
            };
            Point {
                x: cell_w * col as f64 + cell_w / 2.0 + dx,
                y: cell_h * row as f64 + cell_h / 2.0 + dy,
            }
        })
        .collect()
}

/// Runs the repulsion and clamp passes in place. `radii` must match `positions`.
pub fn relax(
    positions: &mut [Point],
    radii: &[f64],
    width: f64,
    height: f64,
    config: &BubbleConfig,
) {
    debug_assert_eq!(positions.len(), radii.len());
    let count = positions.len();

    for i in 0..count {
        clamp_into(&mut positions[i], radii[i], config.edge_padding, width, height);
    }

    for _ in 0..config.iterations {
        for i in 0..count {
            for j in 0..count {
                if i == j {
                    continue;
                }
                let dx = positions[i].x - positions[j].x;
                let dy = positions[i].y - positions[j].y;
                let distance = (dx * dx + dy * dy).sqrt();
                let min_distance = radii[i] + radii[j] + config.separation_padding;

                if distance >= min_distance {
                    continue;
                }

                let (ux, uy) = if distance > f64::EPSILON {
                    (dx / distance, dy / distance)
                } else {
                    // coincident centers: split along a per-index direction
                    let angle = GOLDEN_ANGLE * i as f64;
                    (angle.cos(), angle.sin())
                };
                let push = (min_distance - distance) * config.repulsion_strength;
                positions[i].x += ux * push;
                positions[i].y += uy * push;
            }

            clamp_into(&mut positions[i], radii[i], config.edge_padding, width, height);
        }
    }
}

pub struct BubbleLayoutEngine {
    config: BubbleConfig,
}

impl BubbleLayoutEngine {
    pub fn new(config: BubbleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BubbleConfig {
        &self.config
    }

    /// Diameters for every entity, in input order.
    pub fn sizes(&self, entities: &[Cryptocurrency]) -> Result<Vec<f64>> {
        for crypto in entities {
            if !crypto.price.is_finite() || crypto.price <= 0.0 {
                return Err(Error::ValidationError(format!(
                    "Price for {} must be positive, got {}",
                    crypto.symbol, crypto.price
                )));
            }
        }

        let min_price = entities.iter().map(|c| c.price).fold(f64::INFINITY, f64::min);
        let max_price = entities.iter().map(|c| c.price).fold(f64::NEG_INFINITY, f64::max);

        Ok(entities
            .iter()
            .map(|c| bubble_size(c.price, min_price, max_price, &self.config))
            .collect())
    }

    pub fn layout<R: Rng>(
        &self,
        entities: &[Cryptocurrency],
        width: f64,
        height: f64,
        rng: &mut R,
    ) -> Result<Vec<BubblePlacement>> {
        // unmeasured container
        if entities.is_empty() || width == 0.0 || height == 0.0 {
            return Ok(Vec::new());
        }
        validate_dimensions(width, height)?;

        let sizes = self.sizes(entities)?;
        let radii: Vec<f64> = sizes.iter().map(|s| s / 2.0).collect();

        let mut positions =
            initial_positions(entities.len(), width, height, self.config.jitter, rng);
        relax(&mut positions, &radii, width, height, &self.config);

        debug!(
            "Laid out {} bubbles in {}x{} over {} passes",
            entities.len(),
            width,
            height,
            self.config.iterations
        );

        Ok(entities
            .iter()
            .zip(positions)
            .zip(sizes)
            .map(|((crypto, position), size)| BubblePlacement {
                symbol: crypto.symbol.clone(),
                x: position.x,
                y: position.y,
                radius: size / 2.0,
                size,
                fill_color: bubble_color(crypto.price_change_24h),
                text_color: text_color(crypto.price_change_24h),
            })
            .collect())
    }
}

impl Default for BubbleLayoutEngine {
    fn default() -> Self {
        Self::new(BubbleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::top_cryptocurrencies;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn coin(symbol: &str, price: f64, change: f64) -> Cryptocurrency {
        Cryptocurrency::new(symbol, symbol, price, 1_000_000.0, change)
    }

    fn assert_contained(placements: &[BubblePlacement], width: f64, height: f64, padding: f64) {
        for p in placements {
            let margin = p.radius + padding - 1e-9;
            assert!(p.x >= margin, "{} x={} r={}", p.symbol, p.x, p.radius);
            assert!(p.x <= width - margin, "{} x={} r={}", p.symbol, p.x, p.radius);
            assert!(p.y >= margin, "{} y={} r={}", p.symbol, p.y, p.radius);
            assert!(p.y <= height - margin, "{} y={} r={}", p.symbol, p.y, p.radius);
        }
    }

    #[test]
    fn test_size_is_log_scaled_and_bounded() {
        let config = BubbleConfig::default();
        assert_eq!(bubble_size(1.0, 1.0, 100.0, &config), 50.0);
        assert_eq!(bubble_size(100.0, 1.0, 100.0, &config), 140.0);
        let mid = bubble_size(10.0, 1.0, 100.0, &config);
        assert!((mid - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_prices_get_mid_range_size() {
        let engine = BubbleLayoutEngine::default();
        let coins = vec![coin("A", 5.0, 0.0), coin("B", 5.0, 1.0), coin("C", 5.0, -1.0)];
        let sizes = engine.sizes(&coins).unwrap();
        assert!(sizes.iter().all(|s| *s == 95.0));
    }

    #[test]
    fn test_colors() {
        assert_eq!(bubble_color(-2.0), Rgba { r: 239, g: 68, b: 68, a: 0.3 });
        assert_eq!(bubble_color(-50.0).a, 0.9);
        assert_eq!(bubble_color(5.0), Rgba { r: 34, g: 197, b: 94, a: 0.5 });
        assert_eq!(bubble_color(0.0).g, 197);
        assert_eq!(bubble_color(0.0).a, 0.3);
        assert_eq!(bubble_color(5.0).to_string(), "rgba(34, 197, 94, 0.5)");
        assert_eq!(text_color(-3.0), Rgba::WHITE);
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let engine = BubbleLayoutEngine::default();
        let mut rng = StdRng::seed_from_u64(7);
        let coins = [coin("A", 1.0, 0.0), coin("B", 0.0, 0.0)];
        let result = engine.layout(&coins, 800.0, 600.0, &mut rng);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_rejects_unusable_dimensions() {
        let engine = BubbleLayoutEngine::default();
        let mut rng = StdRng::seed_from_u64(3);
        let coins = top_cryptocurrencies();
        for (width, height) in [(f64::NAN, 600.0), (800.0, f64::INFINITY), (-800.0, 600.0)] {
            let result = engine.layout(&coins, width, height, &mut rng);
            assert!(
                matches!(result, Err(Error::ValidationError(_))),
                "{}x{} accepted",
                width,
                height
            );
        }
    }

    #[test]
    fn test_empty_input_and_unmeasured_container() {
        let engine = BubbleLayoutEngine::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(engine.layout(&[], 800.0, 600.0, &mut rng).unwrap().is_empty());
        let coins = top_cryptocurrencies();
        assert!(engine.layout(&coins, 0.0, 600.0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_layout_is_contained() {
        let engine = BubbleLayoutEngine::default();
        let mut rng = StdRng::seed_from_u64(42);
        let placements = engine.layout(&top_cryptocurrencies(), 1200.0, 700.0, &mut rng).unwrap();

        assert_eq!(placements.len(), 20);
        assert_contained(&placements, 1200.0, 700.0, engine.config().edge_padding);

        let btc = placements.iter().find(|p| p.symbol == "BTC").unwrap();
        let shib = placements.iter().find(|p| p.symbol == "SHIB").unwrap();
        assert_eq!(btc.size, 140.0);
        assert_eq!(shib.size, 50.0);
    }

    #[test]
    fn test_coincident_bubbles_are_separated() {
        let config = BubbleConfig::default();
        let mut positions = vec![Point { x: 400.0, y: 300.0 }, Point { x: 400.0, y: 300.0 }];
        relax(&mut positions, &[30.0, 30.0], 800.0, 600.0, &config);
        assert!(positions[0].distance(&positions[1]) >= 70.0 - 1e-6);
    }

    #[test]
    fn test_tiny_container_centers_bubble() {
        let config = BubbleConfig::default();
        let mut positions = vec![Point { x: 5.0, y: 5.0 }];
        relax(&mut positions, &[70.0], 100.0, 100.0, &config);
        assert_eq!(positions[0], Point { x: 50.0, y: 50.0 });
    }

    proptest! {
        #[test]
        fn prop_layout_stays_in_container(
            prices in prop::collection::vec(0.0001f64..100_000.0, 1..25),
            width in 400.0f64..2000.0,
            height in 400.0f64..1200.0,
            seed in any::<u64>(),
        ) {
            let engine = BubbleLayoutEngine::default();
            let coins: Vec<_> = prices.iter().enumerate()
                .map(|(i, p)| coin(&format!("C{}", i), *p, 0.0))
                .collect();
            let mut rng = StdRng::seed_from_u64(seed);
            let placements = engine.layout(&coins, width, height, &mut rng).unwrap();
            prop_assert_eq!(placements.len(), coins.len());
            assert_contained(&placements, width, height, engine.config().edge_padding);
        }

        #[test]
        fn prop_radius_monotonic_in_price(
            prices in prop::collection::vec(0.0001f64..100_000.0, 2..25),
        ) {
            let engine = BubbleLayoutEngine::default();
            let coins: Vec<_> = prices.iter().enumerate()
                .map(|(i, p)| coin(&format!("C{}", i), *p, 0.0))
                .collect();
            let sizes = engine.sizes(&coins).unwrap();
            for i in 0..coins.len() {
                for j in 0..coins.len() {
                    if coins[i].price <= coins[j].price {
                        prop_assert!(sizes[i] <= sizes[j] + 1e-9);
                    }
                }
                prop_assert!(sizes[i] >= 50.0 && sizes[i] <= 140.0);
            }
        }

        #[test]
        fn prop_close_pair_never_gets_closer(
            x1 in 200.0f64..600.0, y1 in 200.0f64..400.0,
            x2 in 200.0f64..600.0, y2 in 200.0f64..400.0,
            r1 in 25.0f64..70.0, r2 in 25.0f64..70.0,
        ) {
            let config = BubbleConfig::default();
            let mut positions = vec![Point { x: x1, y: y1 }, Point { x: x2, y: y2 }];
            let before = positions[0].distance(&positions[1]);
            relax(&mut positions, &[r1, r2], 800.0, 600.0, &config);
            let after = positions[0].distance(&positions[1]);
            if before < r1 + r2 + config.separation_padding {
                prop_assert!(after >= before - 1e-9, "before={} after={}", before, after);
            }
        }
    }
}
