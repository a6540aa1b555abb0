//! Motion clustering: pointer telemetry to automatic zoom blocks.
//!
//! # Algorithm
//!
//! 1. **Window** the pointer stream with a sliding window (default 1.5s, half-window step).
//! 2. **Cluster** each window with weighted k-means (k=2, k-means++ seeding).
//!    Later samples weigh more, so centroids lean toward where the pointer is going.
//! 3. **Score** each cluster by density (bounding-box area vs. frame) and
//!    stability (observed vs. expected sample count). Reject clusters too broad to zoom into.
//! 4. **Merge** a candidate into its predecessor when both are spatially and temporally close.
//! 5. **Emit** zoom blocks with a scale tier, transition padding, and an end buffer.
//! 6. **Coalesce** blocks separated by short gaps (duration-weighted targets).
//!
//! The random source is injected so output is reproducible for a fixed seed.

use rand::Rng;

use reelsync_project_model::event::TelemetryEvent;
use reelsync_project_model::timeline::{ZoomBlock, ZoomMode};

/// Configuration for the motion cluster detector.
#[derive(Debug, Clone)]
pub struct MotionClusterConfig {
    /// Sliding window length (ms).
    pub window_ms: f64,

    /// Distance the window advances per step (ms).
    pub window_step_ms: f64,

    /// Minimum positions in a window (and in a cluster) to consider it.
    pub min_events: usize,

    /// Maximum Lloyd iterations per window.
    pub kmeans_iterations: usize,

    /// Extra weight given to the newest sample in a window; the oldest gets 1.0.
    pub recency_weight: f64,

    /// Area ratio at which density saturates to 1.0.
    pub density_reference_area: f64,

    /// Minimum density to qualify.
    pub min_density: f64,

    /// Sampling rate a steady pointer is expected to produce (events/s).
    pub expected_events_per_sec: f64,

    /// Minimum stability to qualify.
    pub min_stability: f64,

    /// Largest cluster extent (fraction of frame width or height) worth zooming into.
    pub max_cluster_fraction: f64,

    /// Maximum normalized centroid distance for two clusters to be one camera move.
    pub merge_distance: f64,

    /// Maximum time gap (ms) for candidate merging.
    pub merge_gap_ms: f64,

    /// Ease-in padding for each block (ms).
    pub intro_ms: f64,

    /// Ease-out padding for each block (ms).
    pub outro_ms: f64,

    /// Time added after the last clustered sample (ms).
    pub end_buffer_ms: f64,

    /// Blocks shorter than this are dropped (ms).
    pub min_block_ms: f64,

    /// Blocks closer than this are coalesced (ms).
    pub block_merge_gap_ms: f64,

    /// Margin kept around a cluster when capping the scale to fit the video.
    pub fit_margin: f64,
}

impl Default for MotionClusterConfig {
    fn default() -> Self {
        Self {
            window_ms: 1500.0,
            window_step_ms: 750.0,
            min_events: 5,
            kmeans_iterations: 20,
            recency_weight: 1.0,
            density_reference_area: 0.005,
            min_density: 0.05,
            expected_events_per_sec: 20.0,
            min_stability: 0.3,
            max_cluster_fraction: 0.5,
            merge_distance: 0.15,
            merge_gap_ms: 500.0,
            intro_ms: 400.0,
            outro_ms: 400.0,
            end_buffer_ms: 300.0,
            min_block_ms: 1000.0,
            block_merge_gap_ms: 500.0,
            fit_margin: 1.2,
        }
    }
}

/// Discrete zoom tiers keyed by cluster area ratio.
const SCALE_TIERS: [(f64, f64); 2] = [(0.02, 2.5), (0.08, 2.0)];
const WIDE_SCALE: f64 = 1.5;

/// Screen and output dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub screen_width: f64,
    pub screen_height: f64,
    pub video_width: f64,
    pub video_height: f64,
}

impl FrameGeometry {
    /// Geometry where the video has the screen's own dimensions.
    pub fn same_size(width: f64, height: f64) -> Self {
        Self {
            screen_width: width,
            screen_height: height,
            video_width: width,
            video_height: height,
        }
    }

    /// Fraction of the video frame the letterboxed screen occupies, per axis.
    fn content_fraction(&self) -> (f64, f64) {
        if self.screen_width <= 0.0
            || self.screen_height <= 0.0
            || self.video_width <= 0.0
            || self.video_height <= 0.0
        {
            return (1.0, 1.0);
        }
        let fit = (self.video_width / self.screen_width).min(self.video_height / self.screen_height);
        (
            self.screen_width * fit / self.video_width,
            self.screen_height * fit / self.video_height,
        )
    }
}

/// Normalized bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    fn of(points: &[WeightedPoint]) -> Self {
        points.iter().fold(
            Bounds {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |b, p| Bounds {
                min_x: b.min_x.min(p.x),
                min_y: b.min_y.min(p.y),
                max_x: b.max_x.max(p.x),
                max_y: b.max_y.max(p.y),
            },
        )
    }

    fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// A qualifying cluster before conversion to a zoom block.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterCandidate {
    pub start_ms: f64,
    pub end_ms: f64,
    /// Weighted centroid, normalized.
    pub centroid: (f64, f64),
    pub bounds: Bounds,
    pub event_count: usize,
    pub total_weight: f64,
    pub density: f64,
    pub stability: f64,
}

#[derive(Debug, Clone, Copy)]
struct WeightedPoint {
    t: f64,
    x: f64,
    y: f64,
    w: f64,
}

/// The motion cluster detector.
pub struct MotionClusterDetector {
    config: MotionClusterConfig,
}

impl MotionClusterDetector {
    /// Create a new detector with the given configuration.
    pub fn new(config: MotionClusterConfig) -> Self {
        Self { config }
    }

    /// Create a detector with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MotionClusterConfig::default())
    }

    pub fn config(&self) -> &MotionClusterConfig {
        &self.config
    }

    /// Detect zoom blocks in a chronological telemetry stream.
    ///
    /// Events without a position are ignored. The result is ordered by start
    /// time and non-overlapping.
    pub fn detect<R: Rng>(
        &self,
        events: &[TelemetryEvent],
        geometry: &FrameGeometry,
        total_duration_ms: f64,
        rng: &mut R,
    ) -> Vec<ZoomBlock> {
        self.detect_with_candidates(events, geometry, total_duration_ms, rng)
            .0
    }

    /// Detect zoom blocks and return the merged cluster candidates as diagnostics.
    pub fn detect_with_candidates<R: Rng>(
        &self,
        events: &[TelemetryEvent],
        geometry: &FrameGeometry,
        total_duration_ms: f64,
        rng: &mut R,
    ) -> (Vec<ZoomBlock>, Vec<ClusterCandidate>) {
        let points = normalize_positions(events, geometry);
        if points.len() < self.config.min_events {
            tracing::debug!(
                positions = points.len(),
                min = self.config.min_events,
                "Not enough pointer telemetry for zoom detection"
            );
            return (vec![], vec![]);
        }

        let candidates = self.collect_candidates(&points, rng);
        let blocks = candidates
            .iter()
            .filter_map(|c| self.candidate_to_block(c, geometry, total_duration_ms))
            .collect::<Vec<_>>();
        let blocks = self.coalesce_blocks(blocks);

        tracing::debug!(
            positions = points.len(),
            candidates = candidates.len(),
            blocks = blocks.len(),
            "Zoom detection complete"
        );

        (blocks, candidates)
    }

    /// Slide the window across the stream and merge qualifying clusters.
    fn collect_candidates<R: Rng>(
        &self,
        points: &[WeightedPoint],
        rng: &mut R,
    ) -> Vec<ClusterCandidate> {
        let first_t = points[0].t;
        let last_t = points[points.len() - 1].t;
        let step = self.config.window_step_ms.max(1.0);

        let mut merged: Vec<ClusterCandidate> = vec![];
        let mut window_start = first_t;

        loop {
            let window_end = window_start + self.config.window_ms;
            let lo = points.partition_point(|p| p.t < window_start);
            let hi = points.partition_point(|p| p.t < window_end);

            if hi - lo >= self.config.min_events {
                let window = self.apply_recency_weights(&points[lo..hi]);
                let mut found = self.cluster_window(&window, rng);
                found.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));

                for candidate in found {
                    if let Some(prev) = merged.last_mut() {
                        if self.should_merge(prev, &candidate) {
                            merge_candidate(prev, &candidate);
                            continue;
                        }
                    }
                    merged.push(candidate);
                }
            }

            if window_end > last_t {
                break;
            }

            // Skip the grid windows that would hold no samples.
            let next_start = window_start + step;
            let Some(next) = points.get(points.partition_point(|p| p.t < next_start)) else {
                break;
            };
            let empty = ((next.t - self.config.window_ms - window_start) / step)
                .floor()
                .max(0.0);
            window_start += step * (empty + 1.0);
        }

        merged
    }

    fn apply_recency_weights(&self, points: &[WeightedPoint]) -> Vec<WeightedPoint> {
        let last = points.len().saturating_sub(1).max(1) as f64;
        points
            .iter()
            .enumerate()
            .map(|(i, p)| WeightedPoint {
                w: 1.0 + self.config.recency_weight * (i as f64 / last),
                ..*p
            })
            .collect()
    }

    /// Run k-means on one window and score the resulting clusters.
    fn cluster_window<R: Rng>(
        &self,
        window: &[WeightedPoint],
        rng: &mut R,
    ) -> Vec<ClusterCandidate> {
        let mut groups = weighted_kmeans(window, 2, self.config.kmeans_iterations, rng);

        if groups.len() == 2 {
            let a = weighted_centroid(&groups[0]);
            let b = weighted_centroid(&groups[1]);
            if distance(a, b) < self.config.merge_distance {
                groups = vec![window.to_vec()];
            }
        }

        groups
            .iter()
            .filter(|g| g.len() >= self.config.min_events)
            .filter_map(|g| self.score_cluster(g))
            .collect()
    }

    /// Score a cluster; `None` when it fails a threshold.
    fn score_cluster(&self, points: &[WeightedPoint]) -> Option<ClusterCandidate> {
        let bounds = Bounds::of(points);
        if bounds.width() > self.config.max_cluster_fraction
            || bounds.height() > self.config.max_cluster_fraction
        {
            tracing::trace!(
                width = bounds.width(),
                height = bounds.height(),
                "Cluster too broad to zoom into"
            );
            return None;
        }

        let density = self.density(&bounds);
        let start_ms = points.iter().map(|p| p.t).fold(f64::INFINITY, f64::min);
        let end_ms = points.iter().map(|p| p.t).fold(f64::NEG_INFINITY, f64::max);
        let stability = self.stability(points.len(), end_ms - start_ms);

        if density < self.config.min_density || stability < self.config.min_stability {
            return None;
        }

        Some(ClusterCandidate {
            start_ms,
            end_ms,
            centroid: weighted_centroid(points),
            bounds,
            event_count: points.len(),
            total_weight: points.iter().map(|p| p.w).sum(),
            density,
            stability,
        })
    }

    fn density(&self, bounds: &Bounds) -> f64 {
        let area = bounds.area();
        if area <= f64::EPSILON {
            return 1.0;
        }
        (self.config.density_reference_area / area).min(1.0)
    }

    fn stability(&self, count: usize, span_ms: f64) -> f64 {
        let rate = self.config.expected_events_per_sec.max(f64::EPSILON);
        // One expected sample interval is the shortest meaningful span.
        let span_secs = span_ms.max(1000.0 / rate) / 1000.0;
        (count as f64 / (span_secs * rate)).min(1.0)
    }

    fn should_merge(&self, prev: &ClusterCandidate, next: &ClusterCandidate) -> bool {
        let gap = next.start_ms - prev.end_ms;
        gap < self.config.merge_gap_ms
            && distance(prev.centroid, next.centroid) < self.config.merge_distance
    }

    fn scale_for(&self, bounds: &Bounds, geometry: &FrameGeometry) -> f64 {
        let area = bounds.area();
        let tier = SCALE_TIERS
            .iter()
            .find(|(max_area, _)| area < *max_area)
            .map(|(_, scale)| *scale)
            .unwrap_or(WIDE_SCALE);

        let (fw, fh) = geometry.content_fraction();
        let margin = self.config.fit_margin;
        let fit_x = 1.0 / (bounds.width() * margin * fw).max(f64::EPSILON);
        let fit_y = 1.0 / (bounds.height() * margin * fh).max(f64::EPSILON);

        tier.min(fit_x).min(fit_y).max(1.0)
    }

    fn candidate_to_block(
        &self,
        candidate: &ClusterCandidate,
        geometry: &FrameGeometry,
        total_duration_ms: f64,
    ) -> Option<ZoomBlock> {
        let start_time = candidate.start_ms.max(0.0);
        let mut end_time = candidate.end_ms + self.config.end_buffer_ms;
        if total_duration_ms > 0.0 {
            end_time = end_time.min(total_duration_ms);
        }
        if end_time - start_time < self.config.min_block_ms {
            return None;
        }

        Some(ZoomBlock {
            id: String::new(),
            start_time,
            end_time,
            intro_ms: self.config.intro_ms,
            outro_ms: self.config.outro_ms,
            scale: self.scale_for(&candidate.bounds, geometry),
            target_x: candidate.centroid.0.clamp(0.0, 1.0),
            target_y: candidate.centroid.1.clamp(0.0, 1.0),
            mode: ZoomMode::Auto,
        })
    }

    /// Merge blocks separated by less than the block gap and assign ids.
    fn coalesce_blocks(&self, mut blocks: Vec<ZoomBlock>) -> Vec<ZoomBlock> {
        blocks.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let mut out: Vec<ZoomBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            if let Some(prev) = out.last_mut() {
                if block.start_time - prev.end_time < self.config.block_merge_gap_ms {
                    let wa = prev.duration().max(0.0);
                    let wb = block.duration().max(0.0);
                    let total = (wa + wb).max(f64::EPSILON);
                    prev.target_x = (prev.target_x * wa + block.target_x * wb) / total;
                    prev.target_y = (prev.target_y * wa + block.target_y * wb) / total;
                    prev.scale = prev.scale.max(block.scale);
                    if block.end_time > prev.end_time {
                        prev.end_time = block.end_time;
                        prev.outro_ms = block.outro_ms;
                    }
                    continue;
                }
            }
            out.push(block);
        }

        for (i, block) in out.iter_mut().enumerate() {
            block.id = format!("auto-zoom-{i}");
        }
        out
    }
}

fn normalize_positions(events: &[TelemetryEvent], geometry: &FrameGeometry) -> Vec<WeightedPoint> {
    let sw = geometry.screen_width.max(1.0);
    let sh = geometry.screen_height.max(1.0);
    events
        .iter()
        .filter_map(|e| {
            e.position().map(|(x, y)| WeightedPoint {
                t: e.timestamp_ms as f64,
                x: x / sw,
                y: y / sh,
                w: 1.0,
            })
        })
        .collect()
}

fn merge_candidate(prev: &mut ClusterCandidate, next: &ClusterCandidate) {
    let total = (prev.total_weight + next.total_weight).max(f64::EPSILON);
    prev.centroid = (
        (prev.centroid.0 * prev.total_weight + next.centroid.0 * next.total_weight) / total,
        (prev.centroid.1 * prev.total_weight + next.centroid.1 * next.total_weight) / total,
    );
    prev.start_ms = prev.start_ms.min(next.start_ms);
    prev.end_ms = prev.end_ms.max(next.end_ms);
    prev.bounds = prev.bounds.union(&next.bounds);
    prev.event_count += next.event_count;
    prev.total_weight += next.total_weight;
    prev.density = prev.density.max(next.density);
    prev.stability = prev.stability.max(next.stability);
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn weighted_centroid(points: &[WeightedPoint]) -> (f64, f64) {
    let total: f64 = points.iter().map(|p| p.w).sum();
    if total <= 0.0 {
        return (0.5, 0.5);
    }
    let x: f64 = points.iter().map(|p| p.x * p.w).sum();
    let y: f64 = points.iter().map(|p| p.y * p.w).sum();
    (x / total, y / total)
}

/// Pick an index with probability proportional to `scores`; `None` if all are zero.
fn weighted_pick<R: Rng>(scores: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = scores.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let mut target = rng.random::<f64>() * total;
    for (i, score) in scores.iter().enumerate() {
        if target < *score {
            return Some(i);
        }
        target -= score;
    }
    scores.iter().rposition(|s| *s > 0.0)
}

/// Weighted k-means with k-means++ seeding. Returns the non-empty clusters,
/// each holding its points in input (chronological) order.
fn weighted_kmeans<R: Rng>(
    points: &[WeightedPoint],
    k: usize,
    iterations: usize,
    rng: &mut R,
) -> Vec<Vec<WeightedPoint>> {
    if points.is_empty() || k == 0 {
        return vec![];
    }

    let weights: Vec<f64> = points.iter().map(|p| p.w).collect();
    let mut centroids: Vec<(f64, f64)> = vec![];
    if let Some(first) = weighted_pick(&weights, rng) {
        centroids.push((points[first].x, points[first].y));
    }

    while centroids.len() < k {
        let scores: Vec<f64> = points
            .iter()
            .map(|p| {
                let d = centroids
                    .iter()
                    .map(|c| distance(*c, (p.x, p.y)).powi(2))
                    .fold(f64::INFINITY, f64::min);
                d * p.w
            })
            .collect();
        match weighted_pick(&scores, rng) {
            Some(i) => centroids.push((points[i].x, points[i].y)),
            // Every point coincides with a centroid already.
            None => break,
        }
    }

    if centroids.is_empty() {
        return vec![points.to_vec()];
    }

    let mut assignment = vec![usize::MAX; points.len()];
    for _ in 0..iterations.max(1) {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .map(|(ci, c)| (ci, distance(*c, (p.x, p.y))))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(ci, _)| ci)
                .unwrap_or(0);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }

        for (ci, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<WeightedPoint> = points
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == ci)
                .map(|(p, _)| *p)
                .collect();
            if !members.is_empty() {
                *centroid = weighted_centroid(&members);
            }
        }

        if !changed {
            break;
        }
    }

    (0..centroids.len())
        .map(|ci| {
            points
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == ci)
                .map(|(p, _)| *p)
                .collect::<Vec<_>>()
        })
        .filter(|g| !g.is_empty())
        .collect()
}
