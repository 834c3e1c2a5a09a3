//! Divider placement over a completed allocation.
//!
//! Within each larger-block the sub-groups (one per divider-block) are
//! laid out left to right in order of their leftmost placement. Each
//! sub-group is allotted its widest per-run width; consecutive
//! sub-groups are separated by the divider allowance, and a divider
//! fixture is placed on every run at each boundary except after the last
//! sub-group.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::config::PartitionConfig;
use super::types::{BlockSpan, PartitionOutcome, WidthTable};
use crate::layout::blocks::{block_widths, distinct_divider_blocks};
use crate::layout::{
    BlockKey, Fixture, FixtureId, FixtureKind, Layout, LayoutIndex, PlacementId,
};

/// Computes width tables and applies or reverses divider placement.
///
/// # Usage
///
/// ```ignore
/// let table = Partitioner::width_table(&layout, &config.partition);
/// let outcome = Partitioner::apply(&mut layout, &config.partition);
/// Partitioner::restore(&mut layout);
/// ```
pub struct Partitioner;

/// Shelf segments of each run, ordered by position.
fn run_segments(layout: &Layout) -> BTreeMap<FixtureId, Vec<Fixture>> {
    let mut runs: BTreeMap<FixtureId, Vec<Fixture>> = BTreeMap::new();
    for fixture in layout.fixtures.iter().filter(|f| !f.is_divider()) {
        runs.entry(fixture.leftmost).or_default().push(fixture.clone());
    }
    for segments in runs.values_mut() {
        segments.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.id.cmp(&b.id)));
    }
    runs
}

/// Segment of a run holding `x`; past either end, the nearest one.
fn segment_at(segments: &[Fixture], head: FixtureId, x: f64) -> FixtureId {
    segments
        .iter()
        .find(|f| f.contains_x(x))
        .or_else(|| segments.iter().rev().find(|f| f.x <= x))
        .or_else(|| segments.first())
        .map_or(head, |f| f.id)
}

struct Member {
    id: PlacementId,
    run: FixtureId,
    rank: u32,
    width: f64,
}

/// Non-excluded placements with their run and consumed width, grouped by
/// block when classified.
fn members(layout: &Layout) -> (BTreeMap<BlockKey, Vec<Member>>, Vec<Member>) {
    let index = LayoutIndex::build(layout);
    let mut blocks: BTreeMap<BlockKey, Vec<Member>> = BTreeMap::new();
    let mut loose = Vec::new();
    for placement in layout.placements.iter().filter(|p| !p.excluded) {
        let Some(r) = index.resolve(placement.id) else {
            continue;
        };
        let member = Member {
            id: placement.id,
            run: r.run,
            rank: placement.rank,
            width: r.consumed_width(),
        };
        match index.block_of(placement.id) {
            Some(key) => blocks.entry(key.clone()).or_default().push(member),
            None => loose.push(member),
        }
    }
    for list in blocks.values_mut() {
        list.sort_by_key(|m| (m.rank, m.id));
    }
    (blocks, loose)
}

impl Partitioner {
    /// Per-sub-group size table. Never mutates the layout.
    pub fn width_table(layout: &Layout, config: &PartitionConfig) -> WidthTable {
        let allowance = config.divider_allowance();
        let mut groups: BTreeMap<String, Vec<BlockSpan>> = BTreeMap::new();

        for (key, width) in block_widths(layout) {
            let min_width = width.per_run.values().copied().fold(f64::INFINITY, f64::min);
            let span = BlockSpan {
                min_width: if min_width.is_finite() { min_width } else { 0.0 },
                max_width: width.max_width(),
                start: 0.0,
                end: 0.0,
                min_x: width.min_x,
                runs: width.per_run.keys().copied().collect(),
                key,
            };
            groups.entry(span.key.larger.clone()).or_default().push(span);
        }

        for spans in groups.values_mut() {
            spans.sort_by(|a, b| a.min_x.total_cmp(&b.min_x).then_with(|| a.key.cmp(&b.key)));
            let mut offset = 0.0;
            for (i, span) in spans.iter_mut().enumerate() {
                if i > 0 {
                    offset += allowance;
                }
                span.start = offset;
                span.end = offset + span.size();
                offset = span.end;
            }
        }

        WidthTable { groups }
    }

    /// Inserts divider fixtures and re-lays placements by sub-group.
    ///
    /// A layout with a single divider-block is left undivided. Runs whose
    /// remaining width goes negative are recorded in
    /// `layout.flags.capacity_underflow`.
    pub fn apply(layout: &mut Layout, config: &PartitionConfig) -> PartitionOutcome {
        let table = Self::width_table(layout, config);
        if distinct_divider_blocks(layout) <= 1 {
            log::debug!("layout {}: single divider-block, left undivided", layout.id);
            return PartitionOutcome {
                table,
                skipped: true,
                ..PartitionOutcome::default()
            };
        }

        let segments = run_segments(layout);
        let (blocks, loose) = members(layout);

        // New positions, computed before any mutation.
        let mut moves: Vec<(PlacementId, FixtureId, f64)> = Vec::new();
        let mut new_dividers: Vec<Fixture> = Vec::new();
        let mut next_id = layout.next_fixture_id();

        for (larger, spans) in &table.groups {
            let origin = spans.iter().map(|s| s.min_x).fold(f64::INFINITY, f64::min);
            if !origin.is_finite() {
                continue;
            }

            for span in spans {
                let Some(list) = blocks.get(&span.key) else {
                    continue;
                };
                let mut cursor: BTreeMap<FixtureId, f64> = BTreeMap::new();
                for m in list {
                    let x = cursor.entry(m.run).or_insert(origin + span.start);
                    let head_segments = segments.get(&m.run).map_or(&[][..], Vec::as_slice);
                    moves.push((m.id, segment_at(head_segments, m.run, *x), *x));
                    *x += m.width + config.position_step;
                }
            }

            // A run holding a single sub-group stays undivided.
            let mut groups_on_run: BTreeMap<FixtureId, usize> = BTreeMap::new();
            for run in spans.iter().flat_map(|s| s.runs.iter().copied()) {
                *groups_on_run.entry(run).or_insert(0) += 1;
            }
            let runs: BTreeSet<FixtureId> = groups_on_run
                .into_iter()
                .filter(|&(_, n)| n >= 2)
                .map(|(run, _)| run)
                .collect();
            for boundary in table.boundaries(larger) {
                for &run in &runs {
                    let head = layout.fixture(run);
                    new_dividers.push(Fixture {
                        id: next_id,
                        kind: FixtureKind::Divider,
                        x: origin + boundary,
                        y: head.map_or(0.0, |f| f.y),
                        width: config.divider_width,
                        height: config.divider_height,
                        depth: head.map_or(0.0, |f| f.depth),
                        leftmost: run,
                    });
                    next_id = FixtureId(next_id.0 + 1);
                }
            }
        }

        let underflow_runs = underflow(layout, &table, &loose);

        for &(id, fixture, x) in &moves {
            if let Some(p) = layout.placement_mut(id) {
                p.fixture = fixture;
                p.x = x;
            }
        }
        let dividers: Vec<FixtureId> = new_dividers.iter().map(|f| f.id).collect();
        layout.fixtures.extend(new_dividers);

        if !underflow_runs.is_empty() {
            log::warn!(
                "layout {}: partitioned width exceeds capacity on runs {:?}",
                layout.id,
                underflow_runs
            );
        }
        layout.flags.capacity_underflow = underflow_runs.clone();

        log::info!(
            "layout {}: {} divider(s) placed, {} placement(s) re-laid",
            layout.id,
            dividers.len(),
            moves.len()
        );

        PartitionOutcome {
            table,
            dividers,
            underflow_runs,
            relaid: moves.len(),
            skipped: false,
        }
    }

    /// Removes divider fixtures and packs non-excluded placements from
    /// the left of their run in rank order, stepping over excluded ones.
    ///
    /// Returns the number of dividers removed.
    pub fn restore(layout: &mut Layout) -> usize {
        let heads: HashMap<FixtureId, FixtureId> =
            layout.fixtures.iter().map(|f| (f.id, f.leftmost)).collect();
        let before = layout.fixtures.len();
        layout.fixtures.retain(|f| !f.is_divider());
        let removed = before - layout.fixtures.len();
        layout.flags.capacity_underflow.clear();

        // Placements stranded on a removed divider go back to its run.
        for p in &mut layout.placements {
            if let Some(&head) = heads.get(&p.fixture) {
                if layout.fixtures.iter().all(|f| f.id != p.fixture) {
                    p.fixture = head;
                }
            }
        }

        let segments = run_segments(layout);
        let blocked = excluded_extents(layout);
        let (blocks, loose) = members(layout);
        let mut by_run: BTreeMap<FixtureId, Vec<Member>> = BTreeMap::new();
        for m in blocks.into_values().flatten().chain(loose) {
            by_run.entry(m.run).or_default().push(m);
        }

        let mut moves = Vec::new();
        for (run, mut list) in by_run {
            list.sort_by_key(|m| (m.rank, m.id));
            let run_segments = segments.get(&run).map_or(&[][..], Vec::as_slice);
            let run_blocked = blocked.get(&run).map_or(&[][..], Vec::as_slice);
            let mut x = run_segments.first().map_or(0.0, |f| f.x);
            for m in list {
                x = clear_of(x, m.width, run_blocked);
                moves.push((m.id, segment_at(run_segments, run, x), x));
                x += m.width;
            }
        }
        for (id, fixture, x) in moves {
            if let Some(p) = layout.placement_mut(id) {
                p.fixture = fixture;
                p.x = x;
            }
        }

        log::debug!("layout {}: removed {removed} divider(s)", layout.id);
        removed
    }
}

/// Occupied `[start, end)` extents of excluded placements per run, by start.
fn excluded_extents(layout: &Layout) -> BTreeMap<FixtureId, Vec<(f64, f64)>> {
    let index = LayoutIndex::build(layout);
    let mut out: BTreeMap<FixtureId, Vec<(f64, f64)>> = BTreeMap::new();
    for placement in layout.placements.iter().filter(|p| p.excluded) {
        if let Some(r) = index.resolve(placement.id) {
            out.entry(r.run)
                .or_default()
                .push((placement.x, placement.x + r.consumed_width()));
        }
    }
    for extents in out.values_mut() {
        extents.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    }
    out
}

/// First position at or after `x` where `width` fits between extents.
fn clear_of(mut x: f64, width: f64, blocked: &[(f64, f64)]) -> f64 {
    const EPS: f64 = 1e-9;
    for &(start, end) in blocked {
        if x < end - EPS && x + width > start + EPS {
            x = end;
        }
    }
    x
}

/// Runs where capacity minus partitioned extents and unpartitioned
/// consumption goes negative.
fn underflow(layout: &Layout, table: &WidthTable, loose: &[Member]) -> Vec<FixtureId> {
    let index = LayoutIndex::build(layout);
    let mut out = Vec::new();
    for run in index.runs() {
        let partitioned: f64 = table
            .groups
            .iter()
            .filter(|(_, spans)| spans.iter().any(|s| s.runs.contains(&run)))
            .map(|(larger, _)| table.extent(larger))
            .sum();
        let unpartitioned: f64 = loose.iter().filter(|m| m.run == run).map(|m| m.width).sum();
        let excluded: f64 = layout
            .placements
            .iter()
            .filter(|p| p.excluded)
            .filter_map(|p| index.resolve(p.id))
            .filter(|r| r.run == run)
            .map(|r| r.consumed_width())
            .sum();
        let remaining = index.run_capacity(run) - partitioned - unpartitioned - excluded;
        if remaining < -1e-9 {
            out.push(run);
        }
    }
    out
}
